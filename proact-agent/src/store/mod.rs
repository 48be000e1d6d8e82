//! Mission storage.
//!
//! The orchestrator only sees the [`MissionStore`] trait; an in-memory
//! implementation is provided for local runs and tests.

pub mod memory;
pub mod traits;

pub use memory::InMemoryMissionStore;
pub use traits::{MissionStore, StoreError, UserProfile};
