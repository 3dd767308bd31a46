//! Daytime windows for habit-gated tasks.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Part of the day a habit completion must fall into.
///
/// - morning: [06:00, 12:00)
/// - afternoon: [12:00, 18:00)
/// - evening: [18:00, 24:00) and [00:00, 06:00)
/// - any: always
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DaytimeWindow {
    Morning,
    Afternoon,
    Evening,
    Any,
}

impl DaytimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
            Self::Any => "any",
        }
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        let hour = time.hour();
        match self {
            Self::Morning => (6..12).contains(&hour),
            Self::Afternoon => (12..18).contains(&hour),
            Self::Evening => hour >= 18 || hour < 6,
            Self::Any => true,
        }
    }
}

impl fmt::Display for DaytimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DaytimeWindow {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "morning" => Ok(Self::Morning),
            "afternoon" => Ok(Self::Afternoon),
            "evening" => Ok(Self::Evening),
            "any" | "" => Ok(Self::Any),
            other => Err(DomainError::parse(format!("Unknown daytime window: {}", other))),
        }
    }
}

/// Whether a completion at `time` satisfies `window`.
///
/// No window, or no reported time, always passes.
pub fn within_daytime(window: Option<DaytimeWindow>, time: Option<NaiveTime>) -> bool {
    match (window, time) {
        (Some(window), Some(time)) => window.contains(time),
        _ => true,
    }
}
