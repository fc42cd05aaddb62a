use std::fmt;

use serde::{Deserialize, Serialize};

/// Go/no-go verdict shared by the matcher and the bidding engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Bid,
    Review,
    Skip,
}

impl Recommendation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bid => "BID",
            Self::Review => "REVIEW",
            Self::Skip => "SKIP",
        }
    }

    pub fn participates(self) -> bool {
        matches!(self, Self::Bid)
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much historical data backs an estimate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}
