//! Advisor service — routes every inbound message to the right handler.
//!
//! Routing order: slash commands, free-form profile updates, keyboard
//! buttons, then the general path (survey gating, relevance filter,
//! LLM-backed answering). Every exchange is archived to the conversation
//! log regardless of which branch produced the response.

use std::sync::Arc;

use tracing::warn;

use crate::config::AdvisorConfig;
use crate::context;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::recommend::{self, LlmRecommender, recommendation_text};
use crate::store::{Database, UserProfile};
use crate::survey::SurveyMachine;

/// /start greeting, sent alongside the reply keyboard.
pub const WELCOME_MESSAGE: &str = "🎓 Добро пожаловать в бот помощник по магистерским \
     программам ИТМО в области ИИ!\n\n\
     Я помогу вам выбрать между двумя программами:\n\
     • **Искусственный интеллект** - техническая программа\n\
     • **Управление ИИ-продуктами/AI Product** - продуктовая программа\n\n\
     🔄 **Как это работает:**\n\
     1. Сначала я задам вам несколько вопросов о вашем бэкграунде\n\
     2. На основе ваших ответов дам персональную рекомендацию\n\
     3. Затем отвечу на любые вопросы о программах с учетом вашего профиля\n\n\
     📝 **Начнем с опроса!** Просто напишите любое сообщение, и я начну задавать вопросы \
     о вашем образовании и опыте.";

/// /profile instructions for the free-form profile-update format.
pub const PROFILE_INSTRUCTIONS: &str = "👤 Расскажите о своем бэкграунде для персональных \
     рекомендаций:\n\n\
     1. Ваш опыт (напишите одно из):\n   \
     • technical - технический бэкграунд (программирование, математика, инженерия)\n   \
     • product - продуктовый бэкграунд (менеджмент, маркетинг, бизнес)\n   \
     • mixed - смешанный опыт\n   \
     • beginner - начинающий в области ИИ\n\n\
     2. Количество лет опыта работы (число)\n\n\
     3. Ваши интересы (через запятую):\n   \
     • машинное обучение\n   \
     • продуктовый менеджмент\n   \
     • data science\n   \
     • deep learning\n   \
     • computer vision\n   \
     • nlp\n   \
     • стартапы\n\n\
     Пример: technical, 3, машинное обучение, computer vision, стартапы";

const ASK_QUESTION_PROMPT: &str = "💡 Задайте любой вопрос о программах ИТМО в области ИИ:\n\n\
     • Содержание курсов и дисциплины\n\
     • Требования к поступлению\n\
     • Стоимость и сроки обучения\n\
     • Карьерные перспективы\n\
     • Сравнение программ\n\
     • Преподаватели и партнеры\n\n\
     Просто напишите ваш вопрос!";

/// Static side-by-side comparison, shown once both programs are stored.
const PROGRAM_COMPARISON: &str = "🔄 Сравнение программ ИТМО:\n\n\
     **1. Искусственный интеллект**\n\
     • Фокус: Технические аспекты ИИ и ML\n\
     • Роли: ML Engineer, Data Engineer, Data Scientist\n\
     • Партнеры: X5 Group, Ozon Банк, МТС, Sber AI, Яндекс\n\
     • Бюджетных мест: 51-80 (разные направления)\n\
     • Особенности: Научная деятельность, публикации\n\n\
     **2. Управление ИИ-продуктами**\n\
     • Фокус: Продуктовый менеджмент ИИ-решений\n\
     • Роли: AI Product Manager, AI Project Manager\n\
     • Партнеры: Альфа-Банк, АльфаФутуре\n\
     • Бюджетных мест: 14\n\
     • Особенности: Бизнес-применение ИИ, стартапы\n\n\
     **Общее:**\n\
     • Длительность: 2 года\n\
     • Стоимость: 599,000 ₽/год\n\
     • Язык: русский\n\
     • Формат: очное + онлайн";

const PROGRAMS_LOADING: &str = "Данные о программах загружаются. Попробуйте позже.";
const PROFILE_NOT_FOUND: &str = "Профиль не найден. Используйте /profile для создания.";
const ANSWER_ERROR: &str =
    "Извините, произошла ошибка. Попробуйте позже или задайте вопрос по-другому.";
const EMPTY_ANSWER_ERROR: &str = "Извините, произошла ошибка при генерации ответа.";

const BACKGROUND_KEYWORDS: [&str; 4] = ["technical", "product", "mixed", "beginner"];

/// The advisor: one instance serves all users on all channels.
pub struct AdvisorService {
    config: AdvisorConfig,
    db: Arc<dyn Database>,
    llm: Arc<dyn LlmProvider>,
    survey: SurveyMachine,
}

impl AdvisorService {
    pub fn new(config: AdvisorConfig, db: Arc<dyn Database>, llm: Arc<dyn LlmProvider>) -> Self {
        let recommender = Arc::new(LlmRecommender::new(
            Arc::clone(&llm),
            Arc::clone(&db),
            config.recommendation_max_tokens,
        ));
        let survey = SurveyMachine::new(Arc::clone(&db), recommender);
        Self {
            config,
            db,
            llm,
            survey,
        }
    }

    /// Handle one inbound message from `user_id` and return the response
    /// text. Never fails: every error path degrades to a Russian-language
    /// apology string, and the exchange is archived either way.
    pub async fn handle_message(&self, user_id: &str, username: &str, text: &str) -> String {
        let text = text.trim();

        let response = match text {
            "/start" => WELCOME_MESSAGE.to_string(),
            "/profile" => PROFILE_INSTRUCTIONS.to_string(),
            _ if is_profile_update(text) => self.update_profile(user_id, username, text).await,
            "📝 Начать опрос" | "Начать опрос" => self.restart_survey(user_id, username).await,
            "📊 Сравнить программы" | "Сравнить программы" => self.compare_programs().await,
            "👤 Мой профиль" | "Мой профиль" => self.render_profile(user_id).await,
            "❓ Задать вопрос" | "Задать вопрос" => ASK_QUESTION_PROMPT.to_string(),
            _ => self.respond(user_id, username, text).await,
        };

        self.archive(user_id, username, text, &response).await;
        response
    }

    /// General path: get-or-create the profile, run the survey until it is
    /// complete, then answer relevant questions via the LLM.
    async fn respond(&self, user_id: &str, username: &str, text: &str) -> String {
        let mut profile = match self.get_or_create_profile(user_id, username).await {
            Ok(p) => p,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Failed to load profile");
                return ANSWER_ERROR.to_string();
            }
        };

        // The survey owns every message until it has all three answers.
        if !profile.survey_step.is_terminal() {
            return self.survey.advance(&mut profile, text).await;
        }

        if !recommend::is_relevant_question(text) {
            return recommend::REDIRECT_MESSAGE.to_string();
        }

        self.answer_question(&profile, text).await
    }

    /// Answer an open question with full program, profile, and history
    /// context in the system prompt.
    async fn answer_question(&self, profile: &UserProfile, question: &str) -> String {
        let programs = match self.db.list_programs().await {
            Ok(programs) => programs,
            Err(e) => {
                warn!(error = %e, "Failed to load programs for context");
                Vec::new()
            }
        };

        let history = match self
            .db
            .recent_conversations(&profile.telegram_user_id, self.config.history_limit)
            .await
        {
            Ok(history) => history,
            Err(e) => {
                warn!(error = %e, "Failed to load conversation history");
                Vec::new()
            }
        };

        let system_prompt = format!(
            "Вы - помощник по выбору магистерских программ ИТМО в области искусственного \
             интеллекта.\n\
             Отвечайте только на вопросы, связанные с двумя программами:\n\
             1. \"Искусственный интеллект\"\n\
             2. \"Управление ИИ-продуктами/AI Product\"\n\n\
             ДАННЫЕ О ПРОГРАММАХ:\n{}\n\n\
             ПРОФИЛЬ ПОЛЬЗОВАТЕЛЯ:\n{}\n\n\
             ИСТОРИЯ РАЗГОВОРА:\n{}\n\n\
             ПРАВИЛА:\n\
             - Отвечайте только на русском языке\n\
             - Используйте только информацию из предоставленных данных о программах\n\
             - Если информации нет в данных, честно скажите об этом\n\
             - Давайте персональные рекомендации на основе профиля пользователя\n\
             - Будьте дружелюбны и полезны\n\
             - Если вопрос не связан с этими программами, вежливо перенаправьте",
            context::format_programs(&programs),
            context::format_profile(profile),
            context::format_history(&history),
        );

        let request = CompletionRequest::new(vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user(question),
        ])
        .with_temperature(self.config.temperature)
        .with_max_tokens(self.config.answer_max_tokens);

        match self.llm.complete(request).await {
            Ok(response) if response.content.trim().is_empty() => EMPTY_ANSWER_ERROR.to_string(),
            Ok(response) => response.content,
            Err(e) => {
                warn!(error = %e, "LLM completion failed");
                ANSWER_ERROR.to_string()
            }
        }
    }

    /// Reset the survey and immediately re-enter it, so the first question
    /// comes back in the same response.
    async fn restart_survey(&self, user_id: &str, username: &str) -> String {
        let mut profile = match self.get_or_create_profile(user_id, username).await {
            Ok(p) => p,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Failed to load profile for survey restart");
                return crate::survey::SURVEY_ERROR.to_string();
            }
        };

        if let Err(e) = self.survey.reset(&mut profile).await {
            warn!(user_id = %user_id, error = %e, "Failed to reset survey");
            return crate::survey::SURVEY_ERROR.to_string();
        }

        self.survey.advance(&mut profile, "начать опрос").await
    }

    /// Apply a free-form "background, years, interests..." profile update.
    async fn update_profile(&self, user_id: &str, username: &str, text: &str) -> String {
        let parts: Vec<&str> = text.split(',').map(str::trim).collect();
        if parts.len() < 3 {
            return "Неверный формат. Используйте: бэкграунд, годы опыта, интересы".to_string();
        }

        let background = parts[0].to_lowercase();
        let experience_years: i64 = match parts[1].parse() {
            Ok(years) => years,
            Err(_) => return "Неверный формат годов опыта. Укажите число.".to_string(),
        };
        let interests: Vec<String> = parts[2..].iter().map(|s| s.to_string()).collect();

        let mut profile = match self.get_or_create_profile(user_id, username).await {
            Ok(p) => p,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Failed to load profile for update");
                return "Ошибка при обновлении профиля. Попробуйте еще раз.".to_string();
            }
        };

        profile.background = background;
        profile.experience_years = experience_years;
        profile.interests = interests;
        profile.username = username.to_string();

        if let Err(e) = self.db.upsert_profile(&profile).await {
            warn!(user_id = %user_id, error = %e, "Failed to persist profile update");
            return "Ошибка при обновлении профиля. Попробуйте еще раз.".to_string();
        }

        format!("✅ Профиль обновлен!\n\n{}", recommendation_text(&profile))
    }

    /// The «📊 Сравнить программы» button: static comparison once both
    /// program pages have been extracted at least once.
    async fn compare_programs(&self) -> String {
        match self.db.count_programs().await {
            Ok(count) if count >= 2 => PROGRAM_COMPARISON.to_string(),
            Ok(_) => PROGRAMS_LOADING.to_string(),
            Err(e) => {
                warn!(error = %e, "Failed to count programs");
                "Ошибка получения данных о программах.".to_string()
            }
        }
    }

    /// The «👤 Мой профиль» button.
    async fn render_profile(&self, user_id: &str) -> String {
        match self.db.get_profile(user_id).await {
            Ok(Some(profile)) => {
                let interests = if profile.interests.is_empty() {
                    "не указаны".to_string()
                } else {
                    profile.interests.join(", ")
                };
                format!(
                    "👤 Ваш профиль:\n\n\
                     Бэкграунд: {}\n\
                     Опыт: {} лет\n\
                     Интересы: {}\n\n\
                     Для обновления профиля используйте /profile",
                    profile.background, profile.experience_years, interests,
                )
            }
            Ok(None) => PROFILE_NOT_FOUND.to_string(),
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Failed to load profile");
                "Ошибка получения профиля.".to_string()
            }
        }
    }

    async fn get_or_create_profile(
        &self,
        user_id: &str,
        username: &str,
    ) -> Result<UserProfile, crate::error::DatabaseError> {
        if let Some(profile) = self.db.get_profile(user_id).await? {
            return Ok(profile);
        }
        let profile = UserProfile::new(user_id, username);
        self.db.upsert_profile(&profile).await?;
        Ok(profile)
    }

    /// Append the exchange to the conversation log. Logging failures are
    /// reported but never surface to the user.
    async fn archive(&self, user_id: &str, username: &str, message: &str, response: &str) {
        if let Err(e) = self
            .db
            .insert_conversation(user_id, username, message, response, None)
            .await
        {
            warn!(user_id = %user_id, error = %e, "Failed to archive conversation");
        }
    }
}

/// A message is a profile update when it has at least three comma-separated
/// parts and mentions one of the background keywords anywhere.
fn is_profile_update(message: &str) -> bool {
    if message.split(',').count() < 3 {
        return false;
    }
    let lower = message.to_lowercase();
    BACKGROUND_KEYWORDS
        .iter()
        .any(|keyword| lower.contains(keyword))
}
