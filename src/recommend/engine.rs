//! Completion-backed recommendation engine.
//!
//! `Recommender` is the single capability "produce a recommendation from a
//! profile"; the LLM-backed implementation here and the deterministic rule
//! scorer in [`super::rules`] are its two variants, and tests substitute a
//! fixed fake.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::context;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::store::{Database, UserProfile};

/// Fallback recommendation when the completion service fails or returns
/// nothing.
pub const FALLBACK_RECOMMENDATION: &str = "📊 На основе вашего профиля я рекомендую изучить \
подробнее обе программы и задать конкретные вопросы о содержании курсов.";

/// Produce a personalized recommendation from a completed profile.
#[async_trait]
pub trait Recommender: Send + Sync {
    /// Never fails: implementations degrade to a fixed fallback string.
    async fn recommend(&self, profile: &UserProfile) -> String;
}

/// Recommender backed by the completion service.
pub struct LlmRecommender {
    llm: Arc<dyn LlmProvider>,
    db: Arc<dyn Database>,
    max_tokens: u32,
}

impl LlmRecommender {
    pub fn new(llm: Arc<dyn LlmProvider>, db: Arc<dyn Database>, max_tokens: u32) -> Self {
        Self {
            llm,
            db,
            max_tokens,
        }
    }
}

#[async_trait]
impl Recommender for LlmRecommender {
    async fn recommend(&self, profile: &UserProfile) -> String {
        let programs = match self.db.list_programs().await {
            Ok(programs) => programs,
            Err(e) => {
                warn!(error = %e, "Failed to load programs for recommendation");
                Vec::new()
            }
        };
        let program_data = context::format_programs(&programs);

        // The length bound is prompt instruction only, not enforced.
        let prompt = format!(
            "Вы эксперт по образовательным программам ИТМО. На основе профиля пользователя \
             дайте персональную рекомендацию.\n\n\
             ПРОФИЛЬ ПОЛЬЗОВАТЕЛЯ:\n\
             - Образование: {}\n\
             - Опыт работы: {}\n\
             - Карьерные цели: {}\n\n\
             ДОСТУПНЫЕ ПРОГРАММЫ:\n{}\n\n\
             Дайте краткую (до 200 слов) персональную рекомендацию:\n\
             1. Какая программа больше подходит и почему\n\
             2. На что обратить внимание при поступлении\n\
             3. Какие навыки стоит развивать\n\n\
             Отвечайте только на русском языке, будьте конкретны и полезны.",
            profile.education_background, profile.work_experience, profile.career_goals, program_data,
        );

        let request = CompletionRequest::new(vec![ChatMessage::user(prompt)])
            .with_max_tokens(self.max_tokens)
            .with_temperature(0.7);

        match self.llm.complete(request).await {
            Ok(response) if !response.content.trim().is_empty() => response.content,
            Ok(_) => {
                warn!("Recommendation call returned empty content");
                FALLBACK_RECOMMENDATION.to_string()
            }
            Err(e) => {
                warn!(error = %e, "Recommendation call failed");
                FALLBACK_RECOMMENDATION.to_string()
            }
        }
    }
}

/// Structured program-fit verdict from the completion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitAnalysis {
    pub recommended_program: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub elective_courses: Vec<String>,
}

impl Default for FitAnalysis {
    fn default() -> Self {
        Self {
            recommended_program: "Не удалось определить".to_string(),
            confidence: 0.0,
            reasoning: "Ошибка анализа профиля".to_string(),
            elective_courses: Vec::new(),
        }
    }
}

/// Ask the completion service which program fits better, as structured JSON.
///
/// Any failure — call error, empty content, malformed JSON — degrades to
/// the default analysis.
pub async fn analyze_fit(llm: &Arc<dyn LlmProvider>, profile: &UserProfile) -> FitAnalysis {
    let profile_text = format!(
        "Бэкграунд: {}\nОпыт: {} лет\nИнтересы: {}",
        profile.background,
        profile.experience_years,
        if profile.interests.is_empty() {
            "не указаны".to_string()
        } else {
            profile.interests.join(", ")
        },
    );

    let system_prompt = "Проанализируйте профиль студента и определите, какая программа ИТМО \
         лучше подходит:\n\
         1. \"Искусственный интеллект\" - техническая программа\n\
         2. \"Управление ИИ-продуктами\" - продуктовая программа\n\n\
         Ответьте в JSON формате:\n\
         {\n\
           \"recommended_program\": \"название программы\",\n\
           \"confidence\": 0.0,\n\
           \"reasoning\": \"объяснение выбора\",\n\
           \"elective_courses\": [\"список рекомендуемых курсов\"]\n\
         }";

    let request = CompletionRequest::new(vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user(profile_text),
    ])
    .with_temperature(0.3)
    .with_json_response();

    match llm.complete(request).await {
        Ok(response) => match serde_json::from_str::<FitAnalysis>(response.content.trim()) {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!(error = %e, "Failed to parse fit analysis JSON");
                FitAnalysis::default()
            }
        },
        Err(e) => {
            warn!(error = %e, "Fit analysis call failed");
            FitAnalysis::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::CompletionResponse;
    use crate::store::LibSqlBackend;

    /// Provider returning a scripted response or a scripted failure.
    pub struct FakeLlm {
        pub response: Option<String>,
    }

    #[async_trait]
    impl LlmProvider for FakeLlm {
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            match &self.response {
                Some(content) => Ok(CompletionResponse {
                    content: content.clone(),
                    model: "fake".to_string(),
                }),
                None => Err(LlmError::RequestFailed {
                    provider: "fake".to_string(),
                    reason: "offline".to_string(),
                }),
            }
        }

        fn model_name(&self) -> &str {
            "fake"
        }
    }

    async fn memory_db() -> Arc<dyn Database> {
        Arc::new(LibSqlBackend::new_memory().await.unwrap())
    }

    #[tokio::test]
    async fn recommend_returns_llm_text() {
        let llm: Arc<dyn LlmProvider> = Arc::new(FakeLlm {
            response: Some("Вам подходит программа ИИ".to_string()),
        });
        let recommender = LlmRecommender::new(llm, memory_db().await, 500);
        let profile = UserProfile::new("42", "alice");
        assert_eq!(
            recommender.recommend(&profile).await,
            "Вам подходит программа ИИ"
        );
    }

    #[tokio::test]
    async fn recommend_falls_back_on_error() {
        let llm: Arc<dyn LlmProvider> = Arc::new(FakeLlm { response: None });
        let recommender = LlmRecommender::new(llm, memory_db().await, 500);
        let profile = UserProfile::new("42", "alice");
        assert_eq!(recommender.recommend(&profile).await, FALLBACK_RECOMMENDATION);
    }

    #[tokio::test]
    async fn recommend_falls_back_on_empty_content() {
        let llm: Arc<dyn LlmProvider> = Arc::new(FakeLlm {
            response: Some("   ".to_string()),
        });
        let recommender = LlmRecommender::new(llm, memory_db().await, 500);
        let profile = UserProfile::new("42", "alice");
        assert_eq!(recommender.recommend(&profile).await, FALLBACK_RECOMMENDATION);
    }

    #[tokio::test]
    async fn analyze_fit_parses_json() {
        let llm: Arc<dyn LlmProvider> = Arc::new(FakeLlm {
            response: Some(
                r#"{"recommended_program": "Искусственный интеллект", "confidence": 0.9,
                    "reasoning": "технический профиль", "elective_courses": ["Computer Vision"]}"#
                    .to_string(),
            ),
        });
        let profile = UserProfile::new("42", "alice");
        let analysis = analyze_fit(&llm, &profile).await;
        assert_eq!(analysis.recommended_program, "Искусственный интеллект");
        assert_eq!(analysis.confidence, 0.9);
        assert_eq!(analysis.elective_courses, vec!["Computer Vision"]);
    }

    #[tokio::test]
    async fn analyze_fit_defaults_on_malformed_json() {
        let llm: Arc<dyn LlmProvider> = Arc::new(FakeLlm {
            response: Some("not json at all".to_string()),
        });
        let profile = UserProfile::new("42", "alice");
        let analysis = analyze_fit(&llm, &profile).await;
        assert_eq!(analysis.recommended_program, "Не удалось определить");
        assert_eq!(analysis.confidence, 0.0);
    }

    #[tokio::test]
    async fn analyze_fit_defaults_on_call_failure() {
        let llm: Arc<dyn LlmProvider> = Arc::new(FakeLlm { response: None });
        let profile = UserProfile::new("42", "alice");
        let analysis = analyze_fit(&llm, &profile).await;
        assert_eq!(analysis.reasoning, "Ошибка анализа профиля");
    }
}
