//! Survey machine — consumes inbound messages while the survey is open,
//! stores answers verbatim, and hands the completed profile to the
//! recommender.

use std::sync::Arc;

use tracing::warn;

use crate::recommend::Recommender;
use crate::store::{Database, UserProfile};
use crate::survey::SurveyStep;

/// Generic error for a failed survey step. The step is not advanced.
pub const SURVEY_ERROR: &str = "Произошла ошибка при обработке опроса. Попробуйте еще раз.";

/// Defensive fallback for a message routed here after completion.
pub const SURVEY_DONE_ERROR: &str = "Произошла ошибка в опросе. Попробуйте еще раз.";

const WELCOME_AND_QUESTION_1: &str = "👋 Привет! Я помощник по выбору магистерских программ \
ИТМО в области ИИ.\n\n\
Чтобы дать вам персональные рекомендации, мне нужно узнать о вашем бэкграунде.\n\n\
📚 **Вопрос 1 из 4:** Расскажите о своем образовании. Какую степень и по какой специальности \
вы получили?\n\n\
Например: \"Бакалавр информатики\", \"Инженер-программист\", \"Экономист\" и т.д.";

const QUESTION_2: &str = "💼 **Вопрос 2 из 4:** Расскажите о своем опыте работы. Сколько лет \
вы работаете и в какой сфере?\n\n\
Например: \"3 года разработчиком Python\", \"1 год аналитиком данных\", \"только начинаю \
карьеру\" и т.д.";

const QUESTION_3: &str = "🎯 **Вопрос 3 из 4:** Какие у вас карьерные цели? Кем вы видите себя \
после окончания магистратуры?\n\n\
Например: \"ML-инженер\", \"продакт-менеджер ИИ-продуктов\", \"исследователь\" и т.д.";

/// Drives the 4-step onboarding sequence for one profile at a time.
pub struct SurveyMachine {
    db: Arc<dyn Database>,
    recommender: Arc<dyn Recommender>,
}

impl SurveyMachine {
    pub fn new(db: Arc<dyn Database>, recommender: Arc<dyn Recommender>) -> Self {
        Self { db, recommender }
    }

    /// Consume one inbound message and advance the survey.
    ///
    /// The mutated profile is persisted before this returns; on a
    /// persistence failure the in-memory profile is left at its prior step
    /// and a generic error string is returned.
    pub async fn advance(&self, profile: &mut UserProfile, inbound_text: &str) -> String {
        let mut next = profile.clone();

        let response = match profile.survey_step {
            SurveyStep::NotStarted => {
                // The triggering message is ignored as content: any first
                // message, including a button press, starts the survey.
                next.survey_step = SurveyStep::AwaitingEducation;
                WELCOME_AND_QUESTION_1.to_string()
            }
            SurveyStep::AwaitingEducation => {
                next.education_background = inbound_text.to_string();
                next.survey_step = SurveyStep::AwaitingExperience;
                QUESTION_2.to_string()
            }
            SurveyStep::AwaitingExperience => {
                next.work_experience = inbound_text.to_string();
                next.survey_step = SurveyStep::AwaitingGoals;
                QUESTION_3.to_string()
            }
            SurveyStep::AwaitingGoals => {
                next.career_goals = inbound_text.to_string();
                next.survey_step = SurveyStep::Complete;
                String::new() // composed below, after the profile commits
            }
            SurveyStep::Complete => {
                // Unreachable from the normal routing path.
                return SURVEY_DONE_ERROR.to_string();
            }
        };

        if let Err(e) = self.db.upsert_profile(&next).await {
            warn!(user_id = %profile.telegram_user_id, error = %e, "Failed to persist survey step");
            return SURVEY_ERROR.to_string();
        }

        let completed = next.survey_step.is_terminal();
        *profile = next;

        if !completed {
            return response;
        }

        // Final step: generate the recommendation from the now-complete
        // profile and summarize all three answers.
        let recommendation = self.recommender.recommend(profile).await;
        format!(
            "✅ **Спасибо за ответы!**\n\n\
             На основе вашего профиля:\n\
             📚 Образование: {}\n\
             💼 Опыт: {}\n\
             🎯 Цели: {}\n\n\
             {}\n\n\
             Теперь вы можете задавать любые вопросы о программах ИТМО! Я отвечу с учетом \
             вашего бэкграунда.",
            profile.education_background,
            profile.work_experience,
            profile.career_goals,
            recommendation,
        )
    }

    /// Restart the survey without clearing stored answers; they are
    /// overwritten on the next pass.
    pub async fn reset(&self, profile: &mut UserProfile) -> Result<(), crate::error::DatabaseError> {
        let mut next = profile.clone();
        next.survey_step = SurveyStep::NotStarted;
        self.db.upsert_profile(&next).await?;
        *profile = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::DatabaseError;
    use crate::store::{Conversation, LibSqlBackend, Program};

    struct FixedRecommender;

    #[async_trait]
    impl Recommender for FixedRecommender {
        async fn recommend(&self, _profile: &UserProfile) -> String {
            "РЕКОМЕНДАЦИЯ".to_string()
        }
    }

    async fn machine() -> (SurveyMachine, Arc<dyn Database>) {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let machine = SurveyMachine::new(Arc::clone(&db), Arc::new(FixedRecommender));
        (machine, db)
    }

    #[tokio::test]
    async fn first_message_content_is_ignored() {
        let (machine, _db) = machine().await;
        let mut profile = UserProfile::new("42", "alice");

        let response = machine.advance(&mut profile, "любой первый текст").await;
        assert!(response.contains("Вопрос 1 из 4"));
        assert_eq!(profile.survey_step, SurveyStep::AwaitingEducation);
        assert_eq!(profile.education_background, "");
    }

    #[tokio::test]
    async fn full_walk_stores_answers_verbatim() {
        let (machine, db) = machine().await;
        let mut profile = UserProfile::new("42", "alice");
        db.upsert_profile(&profile).await.unwrap();

        machine.advance(&mut profile, "/start").await;

        let response = machine.advance(&mut profile, "Бакалавр информатики").await;
        assert!(response.contains("Вопрос 2 из 4"));
        assert_eq!(profile.education_background, "Бакалавр информатики");

        let response = machine.advance(&mut profile, "3 года разработчиком").await;
        assert!(response.contains("Вопрос 3 из 4"));
        assert_eq!(profile.work_experience, "3 года разработчиком");

        let response = machine.advance(&mut profile, "ML-инженер").await;
        assert_eq!(profile.career_goals, "ML-инженер");
        assert_eq!(profile.survey_step, SurveyStep::Complete);
        assert!(profile.survey_complete());

        // Summary echoes all three answers plus the recommendation
        assert!(response.contains("Бакалавр информатики"));
        assert!(response.contains("3 года разработчиком"));
        assert!(response.contains("ML-инженер"));
        assert!(response.contains("РЕКОМЕНДАЦИЯ"));

        // And everything was persisted
        let stored = db.get_profile("42").await.unwrap().unwrap();
        assert_eq!(stored.survey_step, SurveyStep::Complete);
        assert_eq!(stored.career_goals, "ML-инженер");
    }

    #[tokio::test]
    async fn complete_step_is_a_defensive_error() {
        let (machine, _db) = machine().await;
        let mut profile = UserProfile::new("42", "alice");
        profile.survey_step = SurveyStep::Complete;

        let response = machine.advance(&mut profile, "что-нибудь").await;
        assert_eq!(response, SURVEY_DONE_ERROR);
        assert_eq!(profile.survey_step, SurveyStep::Complete);
    }

    #[tokio::test]
    async fn reset_restarts_without_clearing_answers() {
        let (machine, _db) = machine().await;
        let mut profile = UserProfile::new("42", "alice");

        machine.advance(&mut profile, "go").await;
        machine.advance(&mut profile, "образование").await;
        machine.advance(&mut profile, "опыт").await;
        machine.advance(&mut profile, "цели").await;
        assert_eq!(profile.survey_step, SurveyStep::Complete);

        machine.reset(&mut profile).await.unwrap();
        assert_eq!(profile.survey_step, SurveyStep::NotStarted);
        // Prior answers survive until overwritten
        assert_eq!(profile.education_background, "образование");

        machine.advance(&mut profile, "again").await;
        machine.advance(&mut profile, "новое образование").await;
        assert_eq!(profile.education_background, "новое образование");
    }

    /// Database whose writes always fail.
    struct FailingDb;

    #[async_trait]
    impl Database for FailingDb {
        async fn upsert_profile(&self, _profile: &UserProfile) -> Result<(), DatabaseError> {
            Err(DatabaseError::Query("disk full".to_string()))
        }
        async fn get_profile(&self, _id: &str) -> Result<Option<UserProfile>, DatabaseError> {
            Ok(None)
        }
        async fn upsert_program(&self, _program: &Program) -> Result<(), DatabaseError> {
            Err(DatabaseError::Query("disk full".to_string()))
        }
        async fn get_program_by_url(&self, _url: &str) -> Result<Option<Program>, DatabaseError> {
            Ok(None)
        }
        async fn list_programs(&self) -> Result<Vec<Program>, DatabaseError> {
            Ok(Vec::new())
        }
        async fn count_programs(&self) -> Result<usize, DatabaseError> {
            Ok(0)
        }
        async fn insert_conversation(
            &self,
            _user_id: &str,
            _username: &str,
            _message: &str,
            _response: &str,
            _context: Option<&serde_json::Value>,
        ) -> Result<String, DatabaseError> {
            Err(DatabaseError::Query("disk full".to_string()))
        }
        async fn recent_conversations(
            &self,
            _user_id: &str,
            _limit: usize,
        ) -> Result<Vec<Conversation>, DatabaseError> {
            Ok(Vec::new())
        }
        async fn count_conversations(&self) -> Result<usize, DatabaseError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn persistence_failure_does_not_advance_the_step() {
        let machine = SurveyMachine::new(Arc::new(FailingDb), Arc::new(FixedRecommender));
        let mut profile = UserProfile::new("42", "alice");

        let response = machine.advance(&mut profile, "hello").await;
        assert_eq!(response, SURVEY_ERROR);
        assert_eq!(profile.survey_step, SurveyStep::NotStarted);
    }
}
