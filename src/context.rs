//! Conversation context formatting — pure rendering of stored state into
//! the completion-service prompt.
//!
//! Deterministic given identical stored state: the survey machine and the
//! recommendation engine are testable without the completion service.

use crate::store::{Conversation, Program, UserProfile};

/// How many recent exchanges the prompt carries.
pub const HISTORY_LIMIT: usize = 5;

/// Render all program records into one text block with fixed field order.
/// Every optional field falls back to a literal "not specified" token.
pub fn format_programs(programs: &[Program]) -> String {
    if programs.is_empty() {
        return "Данные о программах не загружены.".to_string();
    }

    let mut out = String::new();
    for program in programs {
        out.push_str(&format!(
            "ПРОГРАММА: {}\n\
             URL: {}\n\
             Описание: {}\n\
             Длительность: {}\n\
             Язык: {}\n\
             Стоимость: {}\n\
             Бюджетных мест: {}\n\
             Контрактных мест: {}\n\
             Карьерные перспективы: {}\n\
             Требования к поступлению: {}\n\n---\n",
            program.name,
            program.url,
            or_fallback(&program.description, "Не указано"),
            or_fallback(&program.duration, "Не указана"),
            or_fallback(&program.language, "Не указан"),
            or_fallback(&program.cost, "Не указана"),
            program.budget_places,
            program.contract_places,
            or_fallback(&program.career_prospects, "Не указаны"),
            or_fallback(&program.admission_requirements, "Не указаны"),
        ));
    }
    out
}

/// Render a profile's free-text fields with localized fallbacks.
pub fn format_profile(profile: &UserProfile) -> String {
    format!(
        "Образование: {}\n\
         Опыт работы: {}\n\
         Карьерные цели: {}\n\
         Бэкграунд: {}",
        or_fallback(&profile.education_background, "не указано"),
        or_fallback(&profile.work_experience, "не указан"),
        or_fallback(&profile.career_goals, "не указаны"),
        or_fallback(&profile.background, "не определен"),
    )
}

/// Render recent exchanges oldest-first as alternating user/bot lines.
///
/// `conversations` arrives newest-first, as the store returns it.
pub fn format_history(conversations: &[Conversation]) -> String {
    if conversations.is_empty() {
        return "Нет предыдущих сообщений".to_string();
    }

    conversations
        .iter()
        .rev()
        .map(|conv| format!("Пользователь: {}\nБот: {}\n", conv.message, conv.response))
        .collect::<Vec<_>>()
        .join("\n")
}

fn or_fallback<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() { fallback } else { value }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn empty_program() -> Program {
        let now = Utc::now();
        Program {
            name: "Искусственный интеллект".to_string(),
            url: "https://a.example/ai".to_string(),
            description: String::new(),
            duration: String::new(),
            language: String::new(),
            cost: String::new(),
            budget_places: 0,
            contract_places: 0,
            career_prospects: String::new(),
            admission_requirements: String::new(),
            curriculum: String::new(),
            partners: Vec::new(),
            team_members: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn conversation(message: &str, response: &str) -> Conversation {
        Conversation {
            id: "x".to_string(),
            telegram_user_id: "42".to_string(),
            username: "alice".to_string(),
            message: message.to_string(),
            response: response.to_string(),
            context: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn no_programs_sentinel() {
        assert_eq!(format_programs(&[]), "Данные о программах не загружены.");
    }

    #[test]
    fn unset_fields_render_fallback_tokens_not_gaps() {
        let rendered = format_programs(&[empty_program()]);
        assert!(rendered.contains("Описание: Не указано"));
        assert!(rendered.contains("Длительность: Не указана"));
        assert!(rendered.contains("Язык: Не указан"));
        assert!(rendered.contains("Стоимость: Не указана"));
        assert!(rendered.contains("Бюджетных мест: 0"));
        assert!(rendered.contains("Карьерные перспективы: Не указаны"));
        assert!(rendered.contains("Требования к поступлению: Не указаны"));
    }

    #[test]
    fn populated_fields_render_verbatim() {
        let mut program = empty_program();
        program.duration = "2 года".to_string();
        program.budget_places = 51;
        let rendered = format_programs(&[program]);
        assert!(rendered.contains("Длительность: 2 года"));
        assert!(rendered.contains("Бюджетных мест: 51"));
    }

    #[test]
    fn profile_fallbacks() {
        let profile = UserProfile::new("42", "alice");
        let rendered = format_profile(&profile);
        assert!(rendered.contains("Образование: не указано"));
        assert!(rendered.contains("Опыт работы: не указан"));
        assert!(rendered.contains("Карьерные цели: не указаны"));
        assert!(rendered.contains("Бэкграунд: не определен"));
    }

    #[test]
    fn profile_renders_stored_answers() {
        let mut profile = UserProfile::new("42", "alice");
        profile.education_background = "Бакалавр информатики".to_string();
        let rendered = format_profile(&profile);
        assert!(rendered.contains("Образование: Бакалавр информатики"));
    }

    #[test]
    fn empty_history_sentinel() {
        assert_eq!(format_history(&[]), "Нет предыдущих сообщений");
    }

    #[test]
    fn history_renders_oldest_first() {
        // Store order: newest first
        let conversations = vec![conversation("второй", "ответ2"), conversation("первый", "ответ1")];
        let rendered = format_history(&conversations);
        let first_pos = rendered.find("первый").unwrap();
        let second_pos = rendered.find("второй").unwrap();
        assert!(first_pos < second_pos);
        assert!(rendered.contains("Пользователь: первый"));
        assert!(rendered.contains("Бот: ответ1"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let programs = vec![empty_program()];
        assert_eq!(format_programs(&programs), format_programs(&programs));
    }
}
