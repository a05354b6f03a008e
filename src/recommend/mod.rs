//! Recommendation engine — completion-backed and rule-based variants, plus
//! the relevance filter guarding the completion service.

pub mod engine;
pub mod rules;

pub use engine::{FALLBACK_RECOMMENDATION, FitAnalysis, LlmRecommender, Recommender, analyze_fit};
pub use rules::{REDIRECT_MESSAGE, Verdict, is_relevant_question, recommendation_text, score};
