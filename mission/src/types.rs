//! Enumerations shared by every mission-tree node.
//!
//! The stored form always uses the plain string values (`"weekly"`,
//! `"not started"`, ...), never the Rust variant names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::error::MissionError;

/// Regeneration budget of variants that can never be regenerated.
pub const NOT_REGENERABLE: i64 = -1;

/// Default regeneration budget of a weekly mission.
pub const WEEKLY_MISSION_REGENERATION_MAX: i64 = 3;

/// Sentinel for an unbounded regeneration budget (ongoing projects).
pub const UNLIMITED_REGENERATION: i64 = i64::MAX;

/// Structural rank of a node in the mission tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum MissionLevel {
    /// Top-level root, contains missions
    Project,
    /// Mid-level node, contains steps
    Mission,
    /// Leaf actionable item
    Step,
}

impl MissionLevel {
    /// Get the stored string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Mission => "mission",
            Self::Step => "step",
        }
    }

    /// All levels, root first.
    pub fn all() -> [Self; 3] {
        [Self::Project, Self::Mission, Self::Step]
    }

    /// Level a direct child of this level must have, if any.
    pub fn child_level(&self) -> Option<Self> {
        match self {
            Self::Project => Some(Self::Mission),
            Self::Mission => Some(Self::Step),
            Self::Step => None,
        }
    }
}

impl fmt::Display for MissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MissionLevel {
    type Err = MissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| MissionError::UnknownEnumValue {
                field: "level",
                value: s.to_string(),
                expected: Self::all().iter().map(|l| l.as_str()).collect(),
            })
    }
}

/// How long a project or mission is expected to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum MissionPeriodType {
    /// Estimated to complete within one week
    Weekly,
    /// No clear duration, deadline is flexible
    Ongoing,
}

impl MissionPeriodType {
    /// Get the stored string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Ongoing => "ongoing",
        }
    }

    /// All period types.
    pub fn all() -> [Self; 2] {
        [Self::Weekly, Self::Ongoing]
    }
}

impl fmt::Display for MissionPeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MissionPeriodType {
    type Err = MissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|period| period.as_str() == s)
            .ok_or_else(|| MissionError::UnknownEnumValue {
                field: "type",
                value: s.to_string(),
                expected: Self::all().iter().map(|p| p.as_str()).collect(),
            })
    }
}

/// Progress of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub enum MissionStatus {
    #[default]
    #[serde(rename = "not started")]
    NotStarted,
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "done")]
    Done,
    #[serde(rename = "expired")]
    Expired,
}

impl MissionStatus {
    /// Get the stored string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not started",
            Self::InProgress => "in progress",
            Self::Done => "done",
            Self::Expired => "expired",
        }
    }

    /// All statuses.
    pub fn all() -> [Self; 4] {
        [Self::NotStarted, Self::InProgress, Self::Done, Self::Expired]
    }
}

impl fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MissionStatus {
    type Err = MissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| MissionError::UnknownEnumValue {
                field: "status",
                value: s.to_string(),
                expected: Self::all().iter().map(|s| s.as_str()).collect(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&MissionStatus::NotStarted).unwrap();
        assert_eq!(json, "\"not started\"");

        let parsed: MissionStatus = serde_json::from_str("\"in progress\"").unwrap();
        assert_eq!(parsed, MissionStatus::InProgress);
    }

    #[test]
    fn test_from_str_matches_as_str() {
        for level in MissionLevel::all() {
            assert_eq!(level.as_str().parse::<MissionLevel>().unwrap(), level);
        }
        for period in MissionPeriodType::all() {
            assert_eq!(period.as_str().parse::<MissionPeriodType>().unwrap(), period);
        }
        for status in MissionStatus::all() {
            assert_eq!(status.as_str().parse::<MissionStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_unknown_enum_value() {
        let err = "monthly".parse::<MissionPeriodType>().unwrap_err();
        assert!(matches!(
            err,
            MissionError::UnknownEnumValue { field: "type", ref value, .. } if value == "monthly"
        ));

        // Variant names are not accepted, only stored values
        assert!("NotStarted".parse::<MissionStatus>().is_err());
    }
}
