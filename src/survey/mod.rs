//! Onboarding survey — the mandatory 4-question gate for every new
//! participant.

pub mod machine;
pub mod state;

pub use machine::{SURVEY_DONE_ERROR, SURVEY_ERROR, SurveyMachine};
pub use state::SurveyStep;
