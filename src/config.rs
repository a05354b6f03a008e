//! Configuration types.

/// Advisor configuration.
#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    /// Bot name for identification.
    pub name: String,
    /// Completion model identifier.
    pub model: String,
    /// How many recent conversation exchanges to include in the prompt.
    pub history_limit: usize,
    /// Max tokens for open-question answers.
    pub answer_max_tokens: u32,
    /// Max tokens for the post-survey recommendation.
    pub recommendation_max_tokens: u32,
    /// Sampling temperature for conversational calls.
    pub temperature: f64,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            name: "program-advisor".to_string(),
            model: "gpt-4o".to_string(),
            history_limit: 5,
            answer_max_tokens: 1500,
            recommendation_max_tokens: 500,
            temperature: 0.7,
        }
    }
}
