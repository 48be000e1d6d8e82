//! Mission entity model for Proact
//!
//! Missions form a three-level tree:
//!
//! - **Project**: root for one period (weekly or ongoing), contains missions
//! - **Mission**: a personalised environmental action, contains steps
//! - **Step**: a single actionable item
//!
//! # Key Components
//!
//! - [`MissionNode`]: a node of any level, with impact statistics that
//!   accumulate from children as they are attached
//! - [`MissionKind`]: the concrete variant selected by (level, period type),
//!   which fixes the regeneration budget default
//! - [`MissionRecord`]: the plain-value form written to the document store
//!
//! # Example
//!
//! ```
//! use mission::{MissionFields, MissionLevel, MissionNode, MissionPeriodType};
//!
//! let mut mission = MissionNode::create(
//!     MissionLevel::Mission,
//!     Some(MissionPeriodType::Weekly),
//!     MissionFields::titled("Bike to work"),
//! )?;
//! let step = MissionNode::create(
//!     MissionLevel::Step,
//!     None,
//!     MissionFields::titled("Pump the tires").with_impact(5, 2),
//! )?;
//! mission.attach_child(step)?;
//! assert_eq!(mission.eco_points(), 5);
//! # Ok::<(), mission::MissionError>(())
//! ```

pub mod error;
pub mod node;
pub mod record;
pub mod types;

// Re-export main types
pub use error::MissionError;
pub use node::{MissionChild, MissionFields, MissionKind, MissionNode};
pub use record::MissionRecord;
pub use types::*;
