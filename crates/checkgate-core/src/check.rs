//! Check run status and conclusion types
//!
//! These mirror the lifecycle GitHub stores server-side: a check run is
//! queued, then in progress, then completed with a terminal conclusion.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::{Error, Result};

/// Status of a GitHub check run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    /// Created but not yet picked up for evaluation
    Queued,
    /// Evaluation has started
    InProgress,
    /// Terminal state, carries a conclusion
    Completed,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl FromStr for CheckStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "queued" => Ok(Self::Queued),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            _ => Err(Error::Parse(format!("Invalid check status: {}", s))),
        }
    }
}

/// Terminal conclusion of a completed check run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckConclusion {
    Success,
    Failure,
}

impl CheckConclusion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

impl FromStr for CheckConclusion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "success" => Ok(Self::Success),
            "failure" => Ok(Self::Failure),
            _ => Err(Error::Parse(format!("Invalid check conclusion: {}", s))),
        }
    }
}
