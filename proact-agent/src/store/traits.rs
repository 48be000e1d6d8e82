//! Storage collaborator interface.

use async_trait::async_trait;
use mission::{MissionError, MissionNode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Errors from the document store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No user with this id
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// No mission with this id
    #[error("Mission not found: {0}")]
    MissionNotFound(String),

    /// A node could not be converted to or from its stored form
    #[error("Mission conversion failed: {0}")]
    Mission(#[from] MissionError),

    /// The store itself failed
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// What the store knows about a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserProfile {
    pub username: String,
    pub location: Option<String>,
    pub occupation: Option<String>,
    pub interests: Vec<String>,
}

impl UserProfile {
    /// Profile facts rendered into the prompt, keyed by name.
    pub fn personal_info(&self) -> BTreeMap<String, String> {
        let mut info = BTreeMap::new();
        if let Some(location) = self.location.as_deref().filter(|v| !v.is_empty()) {
            info.insert("location".to_string(), location.to_string());
        }
        if let Some(occupation) = self.occupation.as_deref().filter(|v| !v.is_empty()) {
            info.insert("occupation".to_string(), occupation.to_string());
        }
        info
    }
}

/// Document store holding users and their mission trees.
#[async_trait]
pub trait MissionStore: Send + Sync {
    /// Fetch a user's profile.
    async fn get_user_by_id(&self, user_id: &str) -> Result<UserProfile, StoreError>;

    /// Fetch the user's top-level missions, with children resolved inline
    /// down to `depth` levels. Deeper children stay id references.
    async fn get_user_past_missions(
        &self,
        user_id: &str,
        depth: usize,
    ) -> Result<Vec<MissionNode>, StoreError>;

    /// Store a node whose children already carry ids, write the new id back
    /// onto the node and return it. With `dry_run` an id is assigned but
    /// nothing is written.
    ///
    /// Each call is a single write. Storing a tree is not atomic: if a
    /// parent write fails, children stored before it stay behind as
    /// top-level documents of the user.
    async fn add_mission_to_store(
        &self,
        node: &mut MissionNode,
        user_id: &str,
        dry_run: bool,
    ) -> Result<String, StoreError>;
}
