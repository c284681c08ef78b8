use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{SCORE_DISCARD, SCORE_GOOD, SCORE_MEDIUM, SCORE_PRIORITY};

/// Commercial value of a lead, derived only from its structural score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadClassification {
    Priority,
    Good,
    Medium,
    Discard,
    /// Score outside the known tiers
    Undefined,
}

impl LeadClassification {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadClassification::Priority => "priority",
            LeadClassification::Good => "good",
            LeadClassification::Medium => "medium",
            LeadClassification::Discard => "discard",
            LeadClassification::Undefined => "undefined",
        }
    }
}

impl fmt::Display for LeadClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn classify(score: u32) -> LeadClassification {
    match score {
        SCORE_PRIORITY => LeadClassification::Priority,
        SCORE_GOOD => LeadClassification::Good,
        SCORE_MEDIUM => LeadClassification::Medium,
        SCORE_DISCARD => LeadClassification::Discard,
        _ => LeadClassification::Undefined,
    }
}
