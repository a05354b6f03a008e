//! Rule-based recommendation and the pre-LLM relevance filter.
//!
//! Runs before (or instead of) the completion service to short-circuit the
//! obvious cases:
//! - interest/background keyword scoring → deterministic program verdict
//! - off-topic questions → fixed redirect, the LLM call is skipped entirely
//!
//! Keywords match as raw case-insensitive substrings of the original text,
//! not tokenized words. Partial-word hits are part of the contract.

use crate::store::UserProfile;

/// Interest keywords pointing at the technical program.
const AI_KEYWORDS: [&str; 5] = [
    "машинное обучение",
    "deep learning",
    "computer vision",
    "nlp",
    "data science",
];

/// Interest keywords pointing at the product program.
const PRODUCT_KEYWORDS: [&str; 3] = ["продуктовый менеджмент", "стартапы", "бизнес"];

/// Vocabulary that marks a question as on-topic for the two programs.
const RELEVANT_KEYWORDS: [&str; 23] = [
    "итмо",
    "itmo",
    "магистр",
    "программа",
    "искусственный интеллект",
    "ai product",
    "машинное обучение",
    "ml",
    "ai",
    "поступление",
    "экзамен",
    "бюджет",
    "контракт",
    "карьера",
    "работа",
    "курс",
    "дисциплина",
    "проект",
    "партнер",
    "стоимость",
    "длительность",
    "требования",
    "диплом",
];

/// Deterministic program verdict for a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The technical "Искусственный интеллект" program.
    ArtificialIntelligence,
    /// The product "Управление ИИ-продуктами" program.
    AiProduct,
    /// Neither bucket clearly wins; both options are presented neutrally.
    Ambiguous,
}

fn count_matches(interests: &[String], keywords: &[&str]) -> usize {
    interests
        .iter()
        .filter(|interest| {
            let interest = interest.to_lowercase();
            keywords.iter().any(|kw| interest.contains(kw))
        })
        .count()
}

/// Score a profile against the two program archetypes.
///
/// Pure function of (background, interests): identical inputs always yield
/// an identical verdict.
pub fn score(profile: &UserProfile) -> Verdict {
    let ai_count = count_matches(&profile.interests, &AI_KEYWORDS);
    let product_count = count_matches(&profile.interests, &PRODUCT_KEYWORDS);

    if profile.background == "technical" && ai_count > product_count {
        Verdict::ArtificialIntelligence
    } else if profile.background == "product" || product_count > ai_count {
        Verdict::AiProduct
    } else {
        Verdict::Ambiguous
    }
}

/// Render the verdict as the personalized recommendation text.
pub fn recommendation_text(profile: &UserProfile) -> String {
    let body = match score(profile) {
        Verdict::ArtificialIntelligence => {
            "**Программа \"Искусственный интеллект\"** больше подходит для вас:\n\n\
             ✅ Технический бэкграунд идеально подходит для углубленного изучения ML\n\
             ✅ Больше технических курсов и проектов\n\
             ✅ Роли: ML Engineer, Data Engineer, Data Scientist\n\
             ✅ Научная деятельность и публикации\n\n\
             Рекомендуемые выборные дисциплины:\n\
             • Deep Learning и нейронные сети\n\
             • Computer Vision\n\
             • Natural Language Processing\n\
             • MLOps и развертывание моделей"
        }
        Verdict::AiProduct => {
            "**Программа \"Управление ИИ-продуктами\"** больше подходит для вас:\n\n\
             ✅ Фокус на продуктовом менеджменте и бизнес-применении ИИ\n\
             ✅ Проекты с реальными компаниями\n\
             ✅ Роли: AI Product Manager, AI Project Manager\n\
             ✅ Изучение вывода ИИ-продуктов на рынок\n\n\
             Рекомендуемые выборные дисциплины:\n\
             • Продуктовая аналитика\n\
             • AI Product Strategy\n\
             • Управление командами разработки\n\
             • Монетизация AI-продуктов"
        }
        Verdict::Ambiguous => {
            "**Обе программы могут подойти**, но рассмотрите:\n\n\
             **\"Искусственный интеллект\"** если хотите:\n\
             • Глубже изучить технологии ML/AI\n\
             • Заниматься исследованиями\n\
             • Работать ML Engineer'ом\n\n\
             **\"Управление ИИ-продуктами\"** если хотите:\n\
             • Управлять AI-продуктами\n\
             • Работать на стыке технологий и бизнеса\n\
             • Развивать продуктовые навыки"
        }
    };
    format!("🎯 Персональная рекомендация:\n\n{body}")
}

/// Whether a question is on-topic for the two programs.
///
/// Irrelevant questions must never reach the completion service.
pub fn is_relevant_question(message: &str) -> bool {
    let message = message.to_lowercase();
    RELEVANT_KEYWORDS.iter().any(|kw| message.contains(kw))
}

/// Fixed redirect for off-topic questions.
pub const REDIRECT_MESSAGE: &str = "🤔 Я специализируюсь на вопросах о магистерских программах \
ИТМО в области искусственного интеллекта:\n\n\
• Искусственный интеллект\n\
• Управление ИИ-продуктами/AI Product\n\n\
Пожалуйста, задайте вопрос об этих программах, их содержании, поступлении или карьерных перспективах.";

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_with(background: &str, interests: &[&str]) -> UserProfile {
        let mut profile = UserProfile::new("1", "test");
        profile.background = background.to_string();
        profile.interests = interests.iter().map(|s| s.to_string()).collect();
        profile
    }

    #[test]
    fn technical_with_ai_interests_gets_ai_program() {
        let profile = profile_with("technical", &["computer vision", "nlp"]);
        assert_eq!(score(&profile), Verdict::ArtificialIntelligence);
    }

    #[test]
    fn product_background_gets_product_program() {
        let profile = profile_with("product", &["стартапы"]);
        assert_eq!(score(&profile), Verdict::AiProduct);
    }

    #[test]
    fn product_background_wins_even_with_ai_interests() {
        // Background == product short-circuits the count comparison.
        let profile = profile_with("product", &["deep learning", "nlp"]);
        assert_eq!(score(&profile), Verdict::AiProduct);
    }

    #[test]
    fn mixed_background_no_interests_is_ambiguous() {
        let profile = profile_with("mixed", &[]);
        assert_eq!(score(&profile), Verdict::Ambiguous);
    }

    #[test]
    fn technical_with_tie_is_ambiguous() {
        let profile = profile_with("technical", &["машинное обучение", "стартапы"]);
        assert_eq!(score(&profile), Verdict::Ambiguous);
    }

    #[test]
    fn unknown_background_with_product_majority_gets_product() {
        let profile = profile_with("beginner", &["бизнес", "стартапы"]);
        assert_eq!(score(&profile), Verdict::AiProduct);
    }

    #[test]
    fn scoring_is_deterministic() {
        let profile = profile_with("technical", &["data science"]);
        let first = score(&profile);
        for _ in 0..10 {
            assert_eq!(score(&profile), first);
        }
    }

    #[test]
    fn keyword_matches_inside_longer_interest() {
        // Substring match against the whole interest string, not tokens.
        let profile = profile_with("technical", &["прикладное машинное обучение в медицине"]);
        assert_eq!(score(&profile), Verdict::ArtificialIntelligence);
    }

    #[test]
    fn interest_matching_is_case_insensitive() {
        let profile = profile_with("technical", &["Computer Vision"]);
        assert_eq!(score(&profile), Verdict::ArtificialIntelligence);
    }

    #[test]
    fn recommendation_text_mentions_the_winning_program() {
        let profile = profile_with("technical", &["nlp"]);
        assert!(recommendation_text(&profile).contains("Искусственный интеллект"));

        let profile = profile_with("product", &[]);
        assert!(recommendation_text(&profile).contains("Управление ИИ-продуктами"));

        let profile = profile_with("mixed", &[]);
        assert!(recommendation_text(&profile).contains("Обе программы"));
    }

    #[test]
    fn cost_question_is_relevant() {
        assert!(is_relevant_question("Какая стоимость обучения?"));
    }

    #[test]
    fn english_terms_are_relevant() {
        assert!(is_relevant_question("Tell me about the AI Product track"));
    }

    #[test]
    fn small_talk_is_not_relevant() {
        assert!(!is_relevant_question("Как дела? Хорошая погода сегодня"));
    }

    #[test]
    fn relevance_is_case_insensitive() {
        assert!(is_relevant_question("ИТМО"));
        assert!(is_relevant_question("СТОИМОСТЬ?"));
    }

    #[test]
    fn relevance_matches_substrings_inside_words() {
        // "ml" embedded in "html" counts; matching is raw substring.
        assert!(is_relevant_question("посоветуй html редактор"));
    }
}
