//! Generation log.
//!
//! Records every prompt → conversation → parse attempt so failed
//! generations can be diagnosed after the fact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Maximum entries in the log before pruning.
const MAX_LOG_ENTRIES: usize = 10_000;

/// How an attempt ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Missions parsed
    Succeeded { missions: usize },
    /// Reply was not JSON, attempt will be repeated
    Malformed { reason: String },
    /// Backend refused the exchange
    Rejected { reason: String },
    /// Any other terminal failure
    Failed { reason: String },
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// One generation attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Unique entry ID
    pub entry_id: String,
    pub user_id: String,
    /// 1-based attempt number within its request
    pub attempt: u32,
    pub outcome: AttemptOutcome,
    /// Length of the raw model answer, when one was received
    pub raw_len: Option<usize>,
    /// Backend submissions in the conversation
    pub rounds: usize,
    /// Processing duration in ms
    pub duration_ms: u64,
    pub recorded_at: DateTime<Utc>,
}

impl AttemptRecord {
    /// Create a record stamped now.
    pub fn new(user_id: impl Into<String>, attempt: u32, outcome: AttemptOutcome) -> Self {
        Self {
            entry_id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            attempt,
            outcome,
            raw_len: None,
            rounds: 0,
            duration_ms: 0,
            recorded_at: Utc::now(),
        }
    }

    /// Attach conversation details.
    pub fn with_conversation(mut self, raw_len: usize, rounds: usize) -> Self {
        self.raw_len = Some(raw_len);
        self.rounds = rounds;
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

/// Bounded log of generation attempts.
pub struct GenerationLog {
    /// Entries, newest first
    entries: Arc<RwLock<VecDeque<AttemptRecord>>>,
    max_entries: usize,
}

impl GenerationLog {
    pub fn new() -> Self {
        Self::with_max_entries(MAX_LOG_ENTRIES)
    }

    /// Create with custom max entries.
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::new())),
            max_entries,
        }
    }

    /// Record an attempt and return its entry id.
    pub async fn record(&self, record: AttemptRecord) -> String {
        let entry_id = record.entry_id.clone();

        let mut entries = self.entries.write().await;
        entries.push_front(record);
        while entries.len() > self.max_entries {
            entries.pop_back();
        }

        entry_id
    }

    /// Most recent entries, newest first.
    pub async fn recent(&self, limit: usize) -> Vec<AttemptRecord> {
        let entries = self.entries.read().await;
        entries.iter().take(limit).cloned().collect()
    }

    /// Entries for a user, newest first.
    pub async fn for_user(&self, user_id: &str, limit: usize) -> Vec<AttemptRecord> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .take(limit)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

impl Default for GenerationLog {
    fn default() -> Self {
        Self::new()
    }
}
