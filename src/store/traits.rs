//! Unified `Database` trait — single async interface for all persistence.
//!
//! Three independently keyed aggregates: user profiles (by Telegram user
//! id), programs (by canonical URL), and the append-only conversation log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DatabaseError;
use crate::survey::SurveyStep;

/// Persisted profile of one Telegram identity.
///
/// Created on the first inbound message from an unseen identity; mutated by
/// the survey machine (the three free-text answers) and by the free-form
/// profile-update path (background, years, interests). Never deleted.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub telegram_user_id: String,
    pub username: String,
    pub survey_step: SurveyStep,
    /// Verbatim answer to survey question 1.
    pub education_background: String,
    /// Verbatim answer to survey question 2.
    pub work_experience: String,
    /// Verbatim answer to survey question 3.
    pub career_goals: String,
    /// One of "technical", "product", "mixed", "beginner", or empty.
    pub background: String,
    pub experience_years: i64,
    pub interests: Vec<String>,
    pub preferred_language: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Fresh profile at survey step zero.
    pub fn new(telegram_user_id: &str, username: &str) -> Self {
        let now = Utc::now();
        Self {
            telegram_user_id: telegram_user_id.to_string(),
            username: username.to_string(),
            survey_step: SurveyStep::NotStarted,
            education_background: String::new(),
            work_experience: String::new(),
            career_goals: String::new(),
            background: String::new(),
            experience_years: 0,
            interests: Vec::new(),
            preferred_language: "ru".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The survey is complete iff all three free-text answers are stored.
    pub fn survey_complete(&self) -> bool {
        self.survey_step.is_terminal()
            && !self.education_background.is_empty()
            && !self.work_experience.is_empty()
            && !self.career_goals.is_empty()
    }
}

/// Persisted, extracted description of one of the two fixed programs.
///
/// The URL is the stable identity; re-extraction overwrites all derived
/// fields in place. Optional text fields hold the empty string when the
/// extraction pattern did not match.
#[derive(Debug, Clone)]
pub struct Program {
    pub name: String,
    pub url: String,
    pub description: String,
    pub duration: String,
    pub language: String,
    pub cost: String,
    pub budget_places: i64,
    pub contract_places: i64,
    pub career_prospects: String,
    pub admission_requirements: String,
    /// Raw extracted page text.
    pub curriculum: String,
    pub partners: Vec<String>,
    pub team_members: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only log entry of one inbound/outbound exchange.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: String,
    pub telegram_user_id: String,
    pub username: String,
    pub message: String,
    pub response: String,
    pub context: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Backend-agnostic database trait covering profiles, programs, and
/// conversations.
#[async_trait]
pub trait Database: Send + Sync {
    // ── Profiles ────────────────────────────────────────────────────

    /// Insert or update a profile, keyed by Telegram user id.
    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), DatabaseError>;

    /// Look up a profile by Telegram user id.
    async fn get_profile(
        &self,
        telegram_user_id: &str,
    ) -> Result<Option<UserProfile>, DatabaseError>;

    // ── Programs ────────────────────────────────────────────────────

    /// Insert or update a program, keyed by URL. Re-running extraction
    /// must never create a duplicate row for the same URL.
    async fn upsert_program(&self, program: &Program) -> Result<(), DatabaseError>;

    /// Look up a program by URL.
    async fn get_program_by_url(&self, url: &str) -> Result<Option<Program>, DatabaseError>;

    /// All stored programs, insertion order.
    async fn list_programs(&self) -> Result<Vec<Program>, DatabaseError>;

    /// Number of stored programs.
    async fn count_programs(&self) -> Result<usize, DatabaseError>;

    // ── Conversations ───────────────────────────────────────────────

    /// Append one exchange to the conversation log. Returns the generated
    /// UUID string.
    async fn insert_conversation(
        &self,
        telegram_user_id: &str,
        username: &str,
        message: &str,
        response: &str,
        context: Option<&serde_json::Value>,
    ) -> Result<String, DatabaseError>;

    /// Most recent conversations for a user, newest first, up to `limit`.
    async fn recent_conversations(
        &self,
        telegram_user_id: &str,
        limit: usize,
    ) -> Result<Vec<Conversation>, DatabaseError>;

    /// Total number of logged exchanges.
    async fn count_conversations(&self) -> Result<usize, DatabaseError>;
}
