//! Survey state machine — tracks which onboarding question the user is on.

use serde::{Deserialize, Serialize};

/// The steps of the onboarding survey.
///
/// Progresses linearly: NotStarted → AwaitingEducation → AwaitingExperience →
/// AwaitingGoals → Complete. The stored DB column is the integer step (0–4);
/// the enum exists so transition logic never compares raw integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurveyStep {
    NotStarted,
    AwaitingEducation,
    AwaitingExperience,
    AwaitingGoals,
    Complete,
}

impl SurveyStep {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: SurveyStep) -> bool {
        use SurveyStep::*;
        matches!(
            (self, target),
            (NotStarted, AwaitingEducation)
                | (AwaitingEducation, AwaitingExperience)
                | (AwaitingExperience, AwaitingGoals)
                | (AwaitingGoals, Complete)
        )
    }

    /// Whether this step is terminal (survey is done).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Get the next step in the linear progression, if any.
    pub fn next(&self) -> Option<SurveyStep> {
        use SurveyStep::*;
        match self {
            NotStarted => Some(AwaitingEducation),
            AwaitingEducation => Some(AwaitingExperience),
            AwaitingExperience => Some(AwaitingGoals),
            AwaitingGoals => Some(Complete),
            Complete => None,
        }
    }

    /// The integer step stored in the profiles table.
    pub fn as_int(&self) -> i64 {
        match self {
            Self::NotStarted => 0,
            Self::AwaitingEducation => 1,
            Self::AwaitingExperience => 2,
            Self::AwaitingGoals => 3,
            Self::Complete => 4,
        }
    }

    /// Parse the stored integer step. Values past the terminal step clamp
    /// to `Complete`; negatives clamp to `NotStarted`.
    pub fn from_int(step: i64) -> SurveyStep {
        match step {
            i64::MIN..=0 => Self::NotStarted,
            1 => Self::AwaitingEducation,
            2 => Self::AwaitingExperience,
            3 => Self::AwaitingGoals,
            _ => Self::Complete,
        }
    }
}

impl Default for SurveyStep {
    fn default() -> Self {
        Self::NotStarted
    }
}

impl std::fmt::Display for SurveyStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotStarted => "not_started",
            Self::AwaitingEducation => "awaiting_education",
            Self::AwaitingExperience => "awaiting_experience",
            Self::AwaitingGoals => "awaiting_goals",
            Self::Complete => "complete",
        };
        write!(f, "{s}")
    }
}
