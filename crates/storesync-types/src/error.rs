//! Error ledger model.
//!
//! [`ErrorRecord`] rows are append-only except for the `resolved` flag;
//! they feed operator reporting and the per-run error breakdown.

use serde::{Deserialize, Serialize};

/// Classification of a recorded failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Pre-admission rejection; never retried.
    Validation,
    /// Transactional write failure; retried until attempts run out.
    Processing,
    /// Source fetch or destination connection failure; aborts the run.
    Connectivity,
}

impl ErrorKind {
    /// Wire-format string for storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Processing => "processing",
            Self::Connectivity => "connectivity",
        }
    }

    /// Parse the stored wire format.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "validation" => Some(Self::Validation),
            "processing" => Some(Self::Processing),
            "connectivity" => Some(Self::Connectivity),
            _ => None,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the error ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub id: i64,
    /// Natural key of the item involved, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub natural_key: Option<String>,
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    /// ISO-8601 UTC timestamp.
    pub created_at: String,
    pub resolved: bool,
}
