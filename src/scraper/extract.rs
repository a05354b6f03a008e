//! Pattern extraction — raw program-page text to structured fields.
//!
//! Every rule targets its own output field and degrades independently: a
//! pattern that does not match leaves the field at its empty/zero default.
//! The section boundaries are the current structure of the two fixed
//! program pages, which is the contract this module reproduces.

use std::sync::LazyLock;

use regex::Regex;

/// Structured fields extracted from one program page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramFields {
    pub description: String,
    pub duration: String,
    pub language: String,
    pub cost: String,
    pub budget_places: i64,
    pub contract_places: i64,
    pub career_prospects: String,
    pub admission_requirements: String,
    /// Not parsed from free text; placeholder for a future structured source.
    pub partners: Vec<String>,
    /// Not parsed from free text; placeholder for a future structured source.
    pub team_members: Vec<String>,
}

struct ExtractionRules {
    duration: Regex,
    language: Regex,
    cost: Regex,
    budget_places: Regex,
    contract_places: Regex,
    description: Regex,
    career: Regex,
    admission: Regex,
}

impl ExtractionRules {
    fn new() -> Self {
        Self {
            duration: Regex::new(r"(?i)длительность[:\s]*(\d+\s*год[а-я]*)").unwrap(),
            language: Regex::new(r"(?i)язык обучения[:\s]*([а-я]+)").unwrap(),
            cost: Regex::new(r"(\d+\s*\d+\s*₽)").unwrap(),
            budget_places: Regex::new(r"(\d+)\s*бюджетных").unwrap(),
            contract_places: Regex::new(r"(\d+)\s*контрактных").unwrap(),
            // The regex crate has no lookahead; the terminating marker is
            // consumed by a non-capturing group instead.
            description: Regex::new(r"(?is)о программе(.*?)(?:партнеры программы|команда|учебный план)")
                .unwrap(),
            career: Regex::new(r"(?is)карьера(.*?)(?:ты сможешь работать|партнеры|отзывы)")
                .unwrap(),
            admission: Regex::new(r"(?is)как поступить(.*)$").unwrap(),
        }
    }

    fn capture<'a>(&self, regex: &Regex, content: &'a str) -> Option<&'a str> {
        regex
            .captures(content)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }
}

static RULES: LazyLock<ExtractionRules> = LazyLock::new(ExtractionRules::new);

/// Extract structured program fields from raw page text.
///
/// Pure and idempotent: identical input always yields identical output,
/// and no missing marker is an error.
pub fn extract(content: &str) -> ProgramFields {
    let rules = &*RULES;

    let mut fields = ProgramFields::default();

    if let Some(duration) = rules.capture(&rules.duration, content) {
        fields.duration = duration.to_string();
    }
    if let Some(language) = rules.capture(&rules.language, content) {
        fields.language = language.to_string();
    }
    if let Some(cost) = rules.capture(&rules.cost, content) {
        fields.cost = cost.to_string();
    }
    if let Some(budget) = rules.capture(&rules.budget_places, content) {
        fields.budget_places = budget.parse().unwrap_or(0);
    }
    if let Some(contract) = rules.capture(&rules.contract_places, content) {
        fields.contract_places = contract.parse().unwrap_or(0);
    }
    if let Some(description) = rules.capture(&rules.description, content) {
        fields.description = description.trim().to_string();
    }
    if let Some(career) = rules.capture(&rules.career, content) {
        fields.career_prospects = career.trim().to_string();
    }
    if let Some(admission) = rules.capture(&rules.admission, content) {
        fields.admission_requirements = admission.trim().to_string();
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PAGE: &str = "\
Магистратура
О программе
Программа готовит инженеров машинного обучения
для промышленности и науки.
Партнеры программы
X5 Group, Sber AI
Длительность: 2 года
Язык обучения: русский
Стоимость: 599 000 ₽
51 бюджетных мест
100 контрактных мест
Карьера
Выпускники работают инженерами и исследователями.
Партнеры
Как поступить
Вступительные экзамены проходят дистанционно.";

    #[test]
    fn extracts_all_fields_from_sample() {
        let fields = extract(SAMPLE_PAGE);
        assert_eq!(fields.duration, "2 года");
        assert_eq!(fields.language, "русский");
        assert_eq!(fields.cost, "599 000 ₽");
        assert_eq!(fields.budget_places, 51);
        assert_eq!(fields.contract_places, 100);
        assert!(fields.description.contains("готовит инженеров"));
        assert!(!fields.description.contains("О программе"));
        assert!(fields.career_prospects.contains("инженерами и исследователями"));
        assert!(fields
            .admission_requirements
            .contains("Вступительные экзамены"));
    }

    #[test]
    fn missing_markers_yield_defaults() {
        let fields = extract("совсем другой текст без маркеров");
        assert_eq!(fields, ProgramFields::default());
    }

    #[test]
    fn empty_input_yields_defaults() {
        assert_eq!(extract(""), ProgramFields::default());
    }

    #[test]
    fn extraction_is_idempotent() {
        let first = extract(SAMPLE_PAGE);
        let second = extract(SAMPLE_PAGE);
        assert_eq!(first, second);
    }

    #[test]
    fn each_field_degrades_independently() {
        let fields = extract("Длительность: 2 года и больше ничего");
        assert_eq!(fields.duration, "2 года");
        assert_eq!(fields.language, "");
        assert_eq!(fields.cost, "");
        assert_eq!(fields.budget_places, 0);
    }

    #[test]
    fn description_stops_at_first_section_marker() {
        let content = "о программе вводный текст учебный план дисциплины";
        let fields = extract(content);
        assert_eq!(fields.description, "вводный текст");
    }

    #[test]
    fn description_spans_newlines() {
        let content = "О программе\nстрока один\nстрока два\nКоманда\nлюди";
        let fields = extract(content);
        assert!(fields.description.contains("строка один"));
        assert!(fields.description.contains("строка два"));
        assert!(!fields.description.contains("люди"));
    }

    #[test]
    fn admission_runs_to_end_of_input() {
        let content = "Как поступить\nшаг один\nшаг два";
        let fields = extract(content);
        assert_eq!(fields.admission_requirements, "шаг один\nшаг два");
    }

    #[test]
    fn career_section_without_terminator_is_empty() {
        // The career rule requires a following section marker, matching the
        // fixed pages' structure.
        let fields = extract("Карьера высокие зарплаты и ничего после");
        assert_eq!(fields.career_prospects, "");
    }

    #[test]
    fn partners_and_team_always_empty() {
        let fields = extract(SAMPLE_PAGE);
        assert!(fields.partners.is_empty());
        assert!(fields.team_members.is_empty());
    }
}
