//! Error type for the mission entity model.

use crate::types::{MissionLevel, MissionPeriodType};

/// Errors raised while building, linking or converting mission nodes.
///
/// All of these indicate a data-integrity problem and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MissionError {
    /// The (level, period type) pair does not name a concrete variant
    #[error("No mission variant for level `{level}` with period type {period:?}")]
    InvalidVariant {
        level: MissionLevel,
        period: Option<MissionPeriodType>,
    },

    /// A stored string does not match any enumeration member
    #[error("Unknown value `{value}` for `{field}`, expected one of {expected:?}")]
    UnknownEnumValue {
        field: &'static str,
        value: String,
        expected: Vec<&'static str>,
    },

    /// The child cannot sit directly under the parent
    #[error("A {child} cannot be attached under a {parent}")]
    InvalidChildType {
        parent: MissionLevel,
        child: MissionLevel,
    },

    /// Descendants must share the period type of their ancestors
    #[error("Period type mismatch: parent is {parent}, child is {child}")]
    PeriodMismatch {
        parent: MissionPeriodType,
        child: MissionPeriodType,
    },

    /// Persistable form requested before a child was given an id
    #[error("Child `{title}` has no id yet, persist it before its parent")]
    MissingChildId { title: String },

    /// Mapping could not be read as a mission record
    #[error("Invalid mission mapping: {0}")]
    InvalidMapping(String),
}
