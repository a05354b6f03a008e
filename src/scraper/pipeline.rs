//! Scraping pipeline — fetch the two fixed program pages, extract fields,
//! and upsert each Program record by URL.
//!
//! Persistence is per program: one failed fetch or write never rolls back
//! or blocks the sibling program.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::scraper::extract::extract;
use crate::scraper::fetch::ContentFetcher;
use crate::store::{Database, Program};

/// The two fixed programs this advisor covers.
pub const FIXED_PROGRAMS: [(&str, &str); 2] = [
    (
        "Искусственный интеллект",
        "https://abit.itmo.ru/program/master/ai",
    ),
    (
        "Управление ИИ-продуктами/AI Product",
        "https://abit.itmo.ru/program/master/ai_product",
    ),
];

/// Fetch, extract, and store both program pages.
///
/// Returns the number of programs successfully refreshed. A program whose
/// fetch yields no text is skipped with a warning, leaving any prior
/// record untouched.
pub async fn refresh_programs(
    db: &Arc<dyn Database>,
    fetcher: &dyn ContentFetcher,
) -> usize {
    let mut refreshed = 0;

    for (name, url) in FIXED_PROGRAMS {
        info!(program = name, url, "Scraping program page");

        let content = match fetcher.fetch(url).await {
            Ok(text) => text,
            Err(e) => {
                warn!(program = name, url, error = %e, "Fetch failed, keeping prior record");
                continue;
            }
        };
        if content.is_empty() {
            warn!(program = name, url, "No content scraped, keeping prior record");
            continue;
        }

        let fields = extract(&content);
        let now = Utc::now();
        let program = Program {
            name: name.to_string(),
            url: url.to_string(),
            description: fields.description,
            duration: fields.duration,
            language: fields.language,
            cost: fields.cost,
            budget_places: fields.budget_places,
            contract_places: fields.contract_places,
            career_prospects: fields.career_prospects,
            admission_requirements: fields.admission_requirements,
            curriculum: content,
            partners: fields.partners,
            team_members: fields.team_members,
            created_at: now,
            updated_at: now,
        };

        match db.upsert_program(&program).await {
            Ok(()) => {
                info!(program = name, "Program stored");
                refreshed += 1;
            }
            Err(e) => {
                warn!(program = name, error = %e, "Failed to store program");
            }
        }
    }

    refreshed
}
