//! In-memory document store.
//!
//! Keeps every node as its persistable mapping under a generated id, the
//! same way a document database would, so reads go through the full
//! mapping round trip.

use async_trait::async_trait;
use dashmap::DashMap;
use mission::{MissionChild, MissionNode};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::traits::{MissionStore, StoreError, UserProfile};

struct StoredMission {
    owner: String,
    document: Map<String, Value>,
}

/// Document store backed by concurrent maps.
#[derive(Default)]
pub struct InMemoryMissionStore {
    users: DashMap<String, UserProfile>,
    missions: DashMap<String, StoredMission>,
    /// Top-level mission ids per user, oldest first
    user_missions: DashMap<String, Vec<String>>,
}

impl InMemoryMissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with users.
    pub fn with_users(users: impl IntoIterator<Item = (String, UserProfile)>) -> Self {
        let store = Self::new();
        for (id, profile) in users {
            store.insert_user(id, profile);
        }
        store
    }

    /// Add or replace a user.
    pub fn insert_user(&self, user_id: impl Into<String>, profile: UserProfile) {
        let user_id = user_id.into();
        self.user_missions.entry(user_id.clone()).or_default();
        self.users.insert(user_id, profile);
    }

    /// Number of stored nodes, at any level.
    pub fn mission_count(&self) -> usize {
        self.missions.len()
    }

    /// Stored mapping of a node.
    pub fn document(&self, mission_id: &str) -> Option<Map<String, Value>> {
        self.missions.get(mission_id).map(|m| m.document.clone())
    }

    /// Ids of the user's top-level missions, oldest first.
    pub fn user_mission_ids(&self, user_id: &str) -> Vec<String> {
        self.user_missions
            .get(user_id)
            .map(|ids| ids.clone())
            .unwrap_or_default()
    }

    /// Owner of a stored node.
    pub fn owner_of(&self, mission_id: &str) -> Option<String> {
        self.missions.get(mission_id).map(|m| m.owner.clone())
    }

    fn load(&self, mission_id: &str, depth: usize) -> Result<MissionNode, StoreError> {
        let document = self
            .missions
            .get(mission_id)
            .map(|m| m.document.clone())
            .ok_or_else(|| StoreError::MissionNotFound(mission_id.to_string()))?;

        let mut node = MissionNode::from_mapping(document)?;
        node.id = Some(mission_id.to_string());

        if depth > 0 {
            for slot in node.steps_mut() {
                if let MissionChild::Ref(child_id) = slot {
                    let child = self.load(child_id, depth - 1)?;
                    *slot = MissionChild::Node(child);
                }
            }
        }

        Ok(node)
    }
}

#[async_trait]
impl MissionStore for InMemoryMissionStore {
    async fn get_user_by_id(&self, user_id: &str) -> Result<UserProfile, StoreError> {
        self.users
            .get(user_id)
            .map(|u| u.clone())
            .ok_or_else(|| StoreError::UserNotFound(user_id.to_string()))
    }

    async fn get_user_past_missions(
        &self,
        user_id: &str,
        depth: usize,
    ) -> Result<Vec<MissionNode>, StoreError> {
        if !self.users.contains_key(user_id) {
            return Err(StoreError::UserNotFound(user_id.to_string()));
        }

        let missions = self
            .user_mission_ids(user_id)
            .iter()
            .map(|id| self.load(id, depth))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(user_id, depth, count = missions.len(), "Loaded past missions");
        Ok(missions)
    }

    async fn add_mission_to_store(
        &self,
        node: &mut MissionNode,
        user_id: &str,
        dry_run: bool,
    ) -> Result<String, StoreError> {
        if !self.users.contains_key(user_id) {
            return Err(StoreError::UserNotFound(user_id.to_string()));
        }

        let document = node.to_persistable_form()?;
        let mission_id = uuid::Uuid::new_v4().to_string();

        if dry_run {
            debug!(user_id, %mission_id, level = %node.level(), "Dry run, mission not written");
        } else {
            // Publish the root id only once its document exists
            self.missions.insert(
                mission_id.clone(),
                StoredMission {
                    owner: user_id.to_string(),
                    document,
                },
            );
            let child_ids: Vec<&str> = node.steps().iter().filter_map(MissionChild::id).collect();
            let mut roots = self.user_missions.entry(user_id.to_string()).or_default();
            roots.retain(|id| !child_ids.contains(&id.as_str()));
            roots.push(mission_id.clone());
            drop(roots);
            info!(user_id, %mission_id, level = %node.level(), "Mission stored");
        }

        node.id = Some(mission_id.clone());
        Ok(mission_id)
    }
}
