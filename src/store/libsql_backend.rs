//! libSQL backend — async `Database` trait implementation.
//!
//! Supports local file and in-memory databases. All writes are
//! read-then-write with no optimistic concurrency control; the last writer
//! wins on a profile race between near-simultaneous messages.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::store::traits::{Conversation, Database, Program, UserProfile};
use crate::survey::SurveyStep;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run the schema.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        Ok(backend)
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Create the schema if it does not exist yet.
    async fn init_schema(&self) -> Result<(), DatabaseError> {
        self.conn()
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS profiles (
                    telegram_user_id TEXT PRIMARY KEY,
                    username TEXT NOT NULL DEFAULT '',
                    survey_step INTEGER NOT NULL DEFAULT 0,
                    education_background TEXT NOT NULL DEFAULT '',
                    work_experience TEXT NOT NULL DEFAULT '',
                    career_goals TEXT NOT NULL DEFAULT '',
                    background TEXT NOT NULL DEFAULT '',
                    experience_years INTEGER NOT NULL DEFAULT 0,
                    interests TEXT NOT NULL DEFAULT '[]',
                    preferred_language TEXT NOT NULL DEFAULT 'ru',
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS programs (
                    url TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    duration TEXT NOT NULL DEFAULT '',
                    language TEXT NOT NULL DEFAULT '',
                    cost TEXT NOT NULL DEFAULT '',
                    budget_places INTEGER NOT NULL DEFAULT 0,
                    contract_places INTEGER NOT NULL DEFAULT 0,
                    career_prospects TEXT NOT NULL DEFAULT '',
                    admission_requirements TEXT NOT NULL DEFAULT '',
                    curriculum TEXT NOT NULL DEFAULT '',
                    partners TEXT NOT NULL DEFAULT '[]',
                    team_members TEXT NOT NULL DEFAULT '[]',
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS conversations (
                    id TEXT PRIMARY KEY,
                    telegram_user_id TEXT NOT NULL,
                    username TEXT NOT NULL DEFAULT '',
                    message TEXT NOT NULL,
                    response TEXT NOT NULL DEFAULT '',
                    context TEXT,
                    created_at TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_conversations_user
                    ON conversations(telegram_user_id, created_at);",
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Schema init failed: {e}")))?;
        Ok(())
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    // Try RFC 3339 first (our canonical write format)
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    // Try SQLite datetime() output with fractional seconds
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    // Try SQLite datetime() output without fractional seconds
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Serialize a string list to its JSON column representation.
fn list_to_json(list: &[String]) -> String {
    serde_json::to_string(list).unwrap_or_else(|_| "[]".to_string())
}

/// Parse a JSON list column. Malformed rows degrade to an empty list.
fn json_to_list(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}

/// Map a libsql Row to a UserProfile.
///
/// Column order: 0:telegram_user_id, 1:username, 2:survey_step,
/// 3:education_background, 4:work_experience, 5:career_goals, 6:background,
/// 7:experience_years, 8:interests, 9:preferred_language, 10:created_at,
/// 11:updated_at
fn row_to_profile(row: &libsql::Row) -> Result<UserProfile, libsql::Error> {
    let interests_json: String = row.get(8)?;
    let created_str: String = row.get(10)?;
    let updated_str: String = row.get(11)?;
    Ok(UserProfile {
        telegram_user_id: row.get(0)?,
        username: row.get(1)?,
        survey_step: SurveyStep::from_int(row.get::<i64>(2)?),
        education_background: row.get(3)?,
        work_experience: row.get(4)?,
        career_goals: row.get(5)?,
        background: row.get(6)?,
        experience_years: row.get(7)?,
        interests: json_to_list(&interests_json),
        preferred_language: row.get(9)?,
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

/// Map a libsql Row to a Program.
///
/// Column order: 0:url, 1:name, 2:description, 3:duration, 4:language,
/// 5:cost, 6:budget_places, 7:contract_places, 8:career_prospects,
/// 9:admission_requirements, 10:curriculum, 11:partners, 12:team_members,
/// 13:created_at, 14:updated_at
fn row_to_program(row: &libsql::Row) -> Result<Program, libsql::Error> {
    let partners_json: String = row.get(11)?;
    let team_json: String = row.get(12)?;
    let created_str: String = row.get(13)?;
    let updated_str: String = row.get(14)?;
    Ok(Program {
        url: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        duration: row.get(3)?,
        language: row.get(4)?,
        cost: row.get(5)?,
        budget_places: row.get(6)?,
        contract_places: row.get(7)?,
        career_prospects: row.get(8)?,
        admission_requirements: row.get(9)?,
        curriculum: row.get(10)?,
        partners: json_to_list(&partners_json),
        team_members: json_to_list(&team_json),
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

/// Map a libsql Row to a Conversation.
///
/// Column order: 0:id, 1:telegram_user_id, 2:username, 3:message,
/// 4:response, 5:context, 6:created_at
fn row_to_conversation(row: &libsql::Row) -> Result<Conversation, libsql::Error> {
    let context_str: Option<String> = row.get(5).ok();
    let created_str: String = row.get(6)?;
    Ok(Conversation {
        id: row.get(0)?,
        telegram_user_id: row.get(1)?,
        username: row.get(2)?,
        message: row.get(3)?,
        response: row.get(4)?,
        context: context_str.and_then(|s| serde_json::from_str(&s).ok()),
        created_at: parse_datetime(&created_str),
    })
}

const PROFILE_COLUMNS: &str = "telegram_user_id, username, survey_step, education_background, \
     work_experience, career_goals, background, experience_years, interests, \
     preferred_language, created_at, updated_at";

const PROGRAM_COLUMNS: &str = "url, name, description, duration, language, cost, budget_places, \
     contract_places, career_prospects, admission_requirements, curriculum, \
     partners, team_members, created_at, updated_at";

// ── Database trait implementation ───────────────────────────────────

#[async_trait]
impl Database for LibSqlBackend {
    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        self.conn()
            .execute(
                "INSERT INTO profiles (telegram_user_id, username, survey_step,
                    education_background, work_experience, career_goals, background,
                    experience_years, interests, preferred_language, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
                 ON CONFLICT(telegram_user_id) DO UPDATE SET
                    username = excluded.username,
                    survey_step = excluded.survey_step,
                    education_background = excluded.education_background,
                    work_experience = excluded.work_experience,
                    career_goals = excluded.career_goals,
                    background = excluded.background,
                    experience_years = excluded.experience_years,
                    interests = excluded.interests,
                    preferred_language = excluded.preferred_language,
                    updated_at = excluded.updated_at",
                params![
                    profile.telegram_user_id.as_str(),
                    profile.username.as_str(),
                    profile.survey_step.as_int(),
                    profile.education_background.as_str(),
                    profile.work_experience.as_str(),
                    profile.career_goals.as_str(),
                    profile.background.as_str(),
                    profile.experience_years,
                    list_to_json(&profile.interests),
                    profile.preferred_language.as_str(),
                    now,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_profile failed: {e}")))?;
        debug!(user_id = %profile.telegram_user_id, step = %profile.survey_step, "Profile upserted");
        Ok(())
    }

    async fn get_profile(
        &self,
        telegram_user_id: &str,
    ) -> Result<Option<UserProfile>, DatabaseError> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE telegram_user_id = ?1");
        let mut rows = self
            .conn()
            .query(&sql, params![telegram_user_id])
            .await
            .map_err(|e| DatabaseError::Query(format!("get_profile failed: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
        {
            Some(row) => {
                let profile = row_to_profile(&row)
                    .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
                Ok(Some(profile))
            }
            None => Ok(None),
        }
    }

    async fn upsert_program(&self, program: &Program) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        self.conn()
            .execute(
                "INSERT INTO programs (url, name, description, duration, language, cost,
                    budget_places, contract_places, career_prospects, admission_requirements,
                    curriculum, partners, team_members, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)
                 ON CONFLICT(url) DO UPDATE SET
                    name = excluded.name,
                    description = excluded.description,
                    duration = excluded.duration,
                    language = excluded.language,
                    cost = excluded.cost,
                    budget_places = excluded.budget_places,
                    contract_places = excluded.contract_places,
                    career_prospects = excluded.career_prospects,
                    admission_requirements = excluded.admission_requirements,
                    curriculum = excluded.curriculum,
                    partners = excluded.partners,
                    team_members = excluded.team_members,
                    updated_at = excluded.updated_at",
                params![
                    program.url.as_str(),
                    program.name.as_str(),
                    program.description.as_str(),
                    program.duration.as_str(),
                    program.language.as_str(),
                    program.cost.as_str(),
                    program.budget_places,
                    program.contract_places,
                    program.career_prospects.as_str(),
                    program.admission_requirements.as_str(),
                    program.curriculum.as_str(),
                    list_to_json(&program.partners),
                    list_to_json(&program.team_members),
                    now,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_program failed: {e}")))?;
        debug!(url = %program.url, "Program upserted");
        Ok(())
    }

    async fn get_program_by_url(&self, url: &str) -> Result<Option<Program>, DatabaseError> {
        let sql = format!("SELECT {PROGRAM_COLUMNS} FROM programs WHERE url = ?1");
        let mut rows = self
            .conn()
            .query(&sql, params![url])
            .await
            .map_err(|e| DatabaseError::Query(format!("get_program_by_url failed: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
        {
            Some(row) => {
                let program = row_to_program(&row)
                    .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
                Ok(Some(program))
            }
            None => Ok(None),
        }
    }

    async fn list_programs(&self) -> Result<Vec<Program>, DatabaseError> {
        let sql = format!("SELECT {PROGRAM_COLUMNS} FROM programs ORDER BY created_at ASC");
        let mut rows = self
            .conn()
            .query(&sql, ())
            .await
            .map_err(|e| DatabaseError::Query(format!("list_programs failed: {e}")))?;

        let mut programs = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
        {
            programs
                .push(row_to_program(&row).map_err(|e| DatabaseError::Serialization(e.to_string()))?);
        }
        Ok(programs)
    }

    async fn count_programs(&self) -> Result<usize, DatabaseError> {
        let mut rows = self
            .conn()
            .query("SELECT COUNT(*) FROM programs", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("count_programs failed: {e}")))?;
        let count = match rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
        {
            Some(row) => row
                .get::<i64>(0)
                .map_err(|e| DatabaseError::Serialization(e.to_string()))?,
            None => 0,
        };
        Ok(count as usize)
    }

    async fn insert_conversation(
        &self,
        telegram_user_id: &str,
        username: &str,
        message: &str,
        response: &str,
        context: Option<&serde_json::Value>,
    ) -> Result<String, DatabaseError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let context_str = context.map(|c| c.to_string());
        self.conn()
            .execute(
                "INSERT INTO conversations (id, telegram_user_id, username, message,
                    response, context, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id.as_str(),
                    telegram_user_id,
                    username,
                    message,
                    response,
                    context_str,
                    now,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_conversation failed: {e}")))?;
        debug!(id = %id, user_id = telegram_user_id, "Conversation logged");
        Ok(id)
    }

    async fn recent_conversations(
        &self,
        telegram_user_id: &str,
        limit: usize,
    ) -> Result<Vec<Conversation>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, telegram_user_id, username, message, response, context, created_at
                 FROM conversations WHERE telegram_user_id = ?1
                 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
                params![telegram_user_id, limit as i64],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("recent_conversations failed: {e}")))?;

        let mut conversations = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
        {
            conversations.push(
                row_to_conversation(&row)
                    .map_err(|e| DatabaseError::Serialization(e.to_string()))?,
            );
        }
        Ok(conversations)
    }

    async fn count_conversations(&self) -> Result<usize, DatabaseError> {
        let mut rows = self
            .conn()
            .query("SELECT COUNT(*) FROM conversations", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("count_conversations failed: {e}")))?;
        let count = match rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
        {
            Some(row) => row
                .get::<i64>(0)
                .map_err(|e| DatabaseError::Serialization(e.to_string()))?,
            None => 0,
        };
        Ok(count as usize)
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_program(url: &str, name: &str) -> Program {
        let now = Utc::now();
        Program {
            url: url.to_string(),
            name: name.to_string(),
            description: "про ИИ".to_string(),
            duration: "2 года".to_string(),
            language: "русский".to_string(),
            cost: "599 000 ₽".to_string(),
            budget_places: 51,
            contract_places: 100,
            career_prospects: "ML Engineer".to_string(),
            admission_requirements: "экзамены".to_string(),
            curriculum: "raw page text".to_string(),
            partners: Vec::new(),
            team_members: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn profile_roundtrip() {
        let db = LibSqlBackend::new_memory().await.unwrap();

        let mut profile = UserProfile::new("42", "alice");
        profile.survey_step = SurveyStep::AwaitingExperience;
        profile.education_background = "Бакалавр информатики".to_string();
        profile.interests = vec!["nlp".to_string(), "стартапы".to_string()];
        db.upsert_profile(&profile).await.unwrap();

        let loaded = db.get_profile("42").await.unwrap().unwrap();
        assert_eq!(loaded.username, "alice");
        assert_eq!(loaded.survey_step, SurveyStep::AwaitingExperience);
        assert_eq!(loaded.education_background, "Бакалавр информатики");
        assert_eq!(loaded.interests, vec!["nlp", "стартапы"]);
        assert_eq!(loaded.preferred_language, "ru");
    }

    #[tokio::test]
    async fn missing_profile_is_none() {
        let db = LibSqlBackend::new_memory().await.unwrap();
        assert!(db.get_profile("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn profile_upsert_updates_in_place() {
        let db = LibSqlBackend::new_memory().await.unwrap();

        let mut profile = UserProfile::new("42", "alice");
        db.upsert_profile(&profile).await.unwrap();

        profile.background = "technical".to_string();
        profile.experience_years = 3;
        db.upsert_profile(&profile).await.unwrap();

        let loaded = db.get_profile("42").await.unwrap().unwrap();
        assert_eq!(loaded.background, "technical");
        assert_eq!(loaded.experience_years, 3);
    }

    #[tokio::test]
    async fn program_upsert_by_url_never_duplicates() {
        let db = LibSqlBackend::new_memory().await.unwrap();

        let url = "https://example.org/program/master/ai";
        db.upsert_program(&sample_program(url, "ИИ")).await.unwrap();

        let mut updated = sample_program(url, "Искусственный интеллект");
        updated.budget_places = 80;
        db.upsert_program(&updated).await.unwrap();

        assert_eq!(db.count_programs().await.unwrap(), 1);
        let loaded = db.get_program_by_url(url).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Искусственный интеллект");
        assert_eq!(loaded.budget_places, 80);
    }

    #[tokio::test]
    async fn list_programs_returns_both() {
        let db = LibSqlBackend::new_memory().await.unwrap();
        db.upsert_program(&sample_program("https://a.example/ai", "ИИ"))
            .await
            .unwrap();
        db.upsert_program(&sample_program("https://a.example/ai_product", "AI Product"))
            .await
            .unwrap();
        assert_eq!(db.list_programs().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn recent_conversations_ordering_and_limit() {
        let db = LibSqlBackend::new_memory().await.unwrap();

        for i in 0..7 {
            db.insert_conversation("42", "alice", &format!("q{i}"), &format!("a{i}"), None)
                .await
                .unwrap();
        }
        db.insert_conversation("other", "bob", "hi", "hello", None)
            .await
            .unwrap();

        let recent = db.recent_conversations("42", 5).await.unwrap();
        assert_eq!(recent.len(), 5);
        // Newest first
        assert_eq!(recent[0].message, "q6");
        assert_eq!(recent[4].message, "q2");
        assert!(recent.iter().all(|c| c.telegram_user_id == "42"));

        assert_eq!(db.count_conversations().await.unwrap(), 8);
    }

    #[tokio::test]
    async fn conversation_context_roundtrip() {
        let db = LibSqlBackend::new_memory().await.unwrap();
        let ctx = serde_json::json!({"intent": "compare"});
        db.insert_conversation("42", "alice", "сравни", "вот", Some(&ctx))
            .await
            .unwrap();

        let recent = db.recent_conversations("42", 1).await.unwrap();
        assert_eq!(recent[0].context.as_ref().unwrap()["intent"], "compare");
    }

    #[tokio::test]
    async fn local_file_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("advisor.db");

        {
            let db = LibSqlBackend::new_local(&path).await.unwrap();
            db.upsert_profile(&UserProfile::new("42", "alice")).await.unwrap();
        }

        let db = LibSqlBackend::new_local(&path).await.unwrap();
        let loaded = db.get_profile("42").await.unwrap().unwrap();
        assert_eq!(loaded.username, "alice");
    }

    #[test]
    fn parse_datetime_formats() {
        assert_ne!(
            parse_datetime("2025-01-01T12:00:00+00:00"),
            DateTime::<Utc>::MIN_UTC
        );
        assert_ne!(parse_datetime("2025-01-01 12:00:00"), DateTime::<Utc>::MIN_UTC);
        assert_eq!(parse_datetime("garbage"), DateTime::<Utc>::MIN_UTC);
    }
}
