//! MissionGenerator - main entry point for mission generation.
//!
//! Builds the prompt from the user's profile and history, drives the
//! conversation, parses the reply and, on request, persists the result.
//! Only unparseable replies are regenerated, and never more than the
//! configured number of attempts.

use futures::future::{BoxFuture, FutureExt};
use mission::{MissionNode, MissionPeriodType};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::audit::{AttemptOutcome, AttemptRecord, GenerationLog};
use crate::backend::GeminiBackend;
use crate::config::{AgentConfig, GenerationConfig};
use crate::conversation::{ConversationDriver, ConversationError};
use crate::parser::{parse_missions, ParseError};
use crate::prompt::{MissionPrompt, PeriodPhrasing, PromptBuilder};
use crate::store::{MissionStore, StoreError};
use crate::tools::{register_search_tool, ToolRegistry};

/// How many levels of past missions are loaded for the prompt.
pub const PAST_MISSION_DEPTH: usize = 1;

/// Error types for mission generation.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Every attempt produced an unparseable reply
    #[error("No parseable missions for user {user_id} after {attempts} attempts")]
    GenerationExhausted { attempts: u32, user_id: String },

    /// The conversation failed
    #[error("Conversation failed on attempt {attempt} for user {user_id}: {source}")]
    Conversation {
        attempt: u32,
        user_id: String,
        source: ConversationError,
    },

    /// The reply was JSON but not usable
    #[error("Unusable reply on attempt {attempt} for user {user_id}: {source}")]
    Parse {
        attempt: u32,
        user_id: String,
        source: ParseError,
    },

    /// Storage error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Persisting stopped after some nodes were already written; `written`
    /// lists their ids in write order
    #[error("Persisting missions for user {user_id} failed after writing {written:?}: {source}")]
    PartiallyPersisted {
        user_id: String,
        written: Vec<String>,
        source: StoreError,
    },

    /// Cancelled by the caller
    #[error("Generation cancelled")]
    Cancelled,

    /// Request validation error
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The generator could not be built from configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// A request for new missions.
#[derive(Debug, Clone)]
pub struct MissionRequest {
    pub user_id: String,
    pub period: MissionPeriodType,
    /// Missions to ask for; the configured default when unset
    pub count: Option<usize>,
    /// Attempt bound; the configured default when unset
    pub max_attempts: Option<u32>,
    /// Write the missions to the store
    pub persist: bool,
    /// Assign ids without writing
    pub dry_run: bool,
}

impl MissionRequest {
    pub fn new(user_id: impl Into<String>, period: MissionPeriodType) -> Self {
        Self {
            user_id: user_id.into(),
            period,
            count: None,
            max_attempts: None,
            persist: false,
            dry_run: false,
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Persist the generated missions.
    pub fn persisted(mut self) -> Self {
        self.persist = true;
        self
    }

    /// Go through persistence without writing anything.
    pub fn dry_run(mut self) -> Self {
        self.persist = true;
        self.dry_run = true;
        self
    }
}

/// Builds mission prompts from the store alone, without a backend.
pub struct MissionPrompter {
    store: Arc<dyn MissionStore>,
    config: GenerationConfig,
}

impl MissionPrompter {
    pub fn new(store: Arc<dyn MissionStore>) -> Self {
        Self {
            store,
            config: GenerationConfig::default(),
        }
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    /// The prompt a request for this user would send.
    pub async fn build(
        &self,
        user_id: &str,
        period: MissionPeriodType,
        count: usize,
    ) -> Result<String, GenerationError> {
        build_prompt(self.store.as_ref(), &self.config, user_id, period, count).await
    }
}

async fn build_prompt(
    store: &dyn MissionStore,
    config: &GenerationConfig,
    user_id: &str,
    period: MissionPeriodType,
    count: usize,
) -> Result<String, GenerationError> {
    let profile = store.get_user_by_id(user_id).await?;
    let past = store
        .get_user_past_missions(user_id, PAST_MISSION_DEPTH)
        .await?;

    let limits = match period {
        MissionPeriodType::Weekly => config.weekly_limits,
        MissionPeriodType::Ongoing => config.ongoing_limits,
    };

    let prompt = PromptBuilder::build_mission_prompt(&MissionPrompt {
        count,
        personal_info: profile.personal_info(),
        interests: profile.interests,
        past_missions: PromptBuilder::past_missions_as_strings(&past),
        phrasing: PeriodPhrasing::for_period(period, &limits),
    });

    debug!(user_id, past_missions = past.len(), %prompt, "Mission prompt built");
    Ok(prompt)
}

/// Main entry point for mission generation.
pub struct MissionGenerator {
    driver: ConversationDriver,
    store: Arc<dyn MissionStore>,
    config: GenerationConfig,
    log: Arc<GenerationLog>,
}

impl MissionGenerator {
    /// Create a generator with default configuration.
    pub fn new(driver: ConversationDriver, store: Arc<dyn MissionStore>) -> Self {
        Self {
            driver,
            store,
            config: GenerationConfig::default(),
            log: Arc::new(GenerationLog::new()),
        }
    }

    /// Build the Gemini-backed generator described by `config`.
    ///
    /// The search tool is registered only when a search key is configured.
    pub fn from_config(
        config: &AgentConfig,
        store: Arc<dyn MissionStore>,
    ) -> Result<Self, GenerationError> {
        let api_key = config
            .gemini
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| GenerationError::Configuration("no Gemini API key configured".to_string()))?;

        let backend = GeminiBackend::new(api_key, &config.gemini.model)
            .map_err(|e| GenerationError::Configuration(e.to_string()))?
            .with_base_url(&config.gemini.base_url);

        let mut tools = ToolRegistry::new();
        register_search_tool(&mut tools, &config.search);
        let tools_names = tools.names();

        let mut driver = ConversationDriver::new(Arc::new(backend), Arc::new(tools))
            .with_config(config.conversation.clone());
        if let Some(temperature) = config.gemini.temperature {
            driver = driver.with_temperature(temperature);
        }

        info!(
            backend = driver.backend_id(),
            tools = ?tools_names,
            "Mission generator ready"
        );
        Ok(Self::new(driver, store).with_config(config.generation.clone()))
    }

    /// Create with configuration.
    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an existing log.
    pub fn with_log(mut self, log: Arc<GenerationLog>) -> Self {
        self.log = log;
        self
    }

    pub fn log(&self) -> &Arc<GenerationLog> {
        &self.log
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// The prompt a request for this user would send.
    pub async fn preview_prompt(
        &self,
        user_id: &str,
        period: MissionPeriodType,
        count: usize,
    ) -> Result<String, GenerationError> {
        build_prompt(self.store.as_ref(), &self.config, user_id, period, count).await
    }

    /// Generate missions for a user.
    ///
    /// With `persist` set, every returned mission and step carries its
    /// storage id.
    pub async fn generate_missions(
        &self,
        request: &MissionRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<MissionNode>, GenerationError> {
        let user_id = request.user_id.as_str();
        let count = request.count.unwrap_or(self.config.default_count);
        let max_attempts = request.max_attempts.unwrap_or(self.config.max_attempts);

        if count == 0 {
            return Err(GenerationError::InvalidRequest("count must be at least 1".to_string()));
        }
        if max_attempts == 0 {
            return Err(GenerationError::InvalidRequest(
                "max_attempts must be at least 1".to_string(),
            ));
        }

        let prompt =
            build_prompt(self.store.as_ref(), &self.config, user_id, request.period, count).await?;
        info!(
            user_id,
            period = %request.period,
            count,
            max_attempts,
            backend = self.driver.backend_id(),
            "Generating missions"
        );

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return Err(GenerationError::Cancelled);
            }

            let start = Instant::now();
            let conversation = match self.driver.run(&prompt, cancel).await {
                Ok(conversation) => conversation,
                Err(ConversationError::Cancelled(reason)) => {
                    warn!(user_id, attempt, %reason, "Generation cancelled");
                    self.record(user_id, attempt, AttemptOutcome::Failed { reason }, start, None)
                        .await;
                    return Err(GenerationError::Cancelled);
                }
                Err(e) => {
                    let outcome = match &e {
                        ConversationError::BackendRejected(reason) => AttemptOutcome::Rejected {
                            reason: reason.clone(),
                        },
                        other => AttemptOutcome::Failed {
                            reason: other.to_string(),
                        },
                    };
                    error!(user_id, attempt, error = %e, "Conversation failed");
                    self.record(user_id, attempt, outcome, start, None).await;
                    return Err(GenerationError::Conversation {
                        attempt,
                        user_id: user_id.to_string(),
                        source: e,
                    });
                }
            };

            let conversation_stats = Some((conversation.text.len(), conversation.rounds));
            match parse_missions(&conversation.text, request.period) {
                Ok(mut missions) => {
                    self.record(
                        user_id,
                        attempt,
                        AttemptOutcome::Succeeded {
                            missions: missions.len(),
                        },
                        start,
                        conversation_stats,
                    )
                    .await;
                    info!(user_id, attempt, count = missions.len(), "Successfully generated missions");

                    if request.persist {
                        if cancel.is_cancelled() {
                            return Err(GenerationError::Cancelled);
                        }
                        let mut written = Vec::new();
                        for mission in missions.iter_mut() {
                            let stored = self
                                .persist_tree(mission, user_id, request.dry_run, &mut written)
                                .await;
                            if let Err(source) = stored {
                                if written.is_empty() {
                                    return Err(source.into());
                                }
                                error!(
                                    user_id,
                                    written = written.len(),
                                    error = %source,
                                    "Persisting missions failed partway"
                                );
                                return Err(GenerationError::PartiallyPersisted {
                                    user_id: user_id.to_string(),
                                    written,
                                    source,
                                });
                            }
                        }
                        info!(
                            user_id,
                            count = missions.len(),
                            dry_run = request.dry_run,
                            "Missions persisted"
                        );
                    }

                    return Ok(missions);
                }
                Err(e) if e.is_retryable() => {
                    warn!(
                        user_id,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Could not parse missions, regenerating"
                    );
                    debug!(user_id, attempt, raw = %conversation.text, "Unparseable answer");
                    self.record(
                        user_id,
                        attempt,
                        AttemptOutcome::Malformed {
                            reason: e.to_string(),
                        },
                        start,
                        conversation_stats,
                    )
                    .await;
                }
                Err(e) => {
                    error!(user_id, attempt, error = %e, "Reply cannot be turned into missions");
                    debug!(user_id, attempt, raw = %conversation.text, "Unusable answer");
                    self.record(
                        user_id,
                        attempt,
                        AttemptOutcome::Failed {
                            reason: e.to_string(),
                        },
                        start,
                        conversation_stats,
                    )
                    .await;
                    return Err(GenerationError::Parse {
                        attempt,
                        user_id: user_id.to_string(),
                        source: e,
                    });
                }
            }
        }

        error!(user_id, attempts = max_attempts, "Giving up on mission generation");
        Err(GenerationError::GenerationExhausted {
            attempts: max_attempts,
            user_id: user_id.to_string(),
        })
    }

    /// Persist a node children first, so each child has an id before its
    /// parent's stored form lists it. Ids actually written are appended to
    /// `written`.
    fn persist_tree<'a>(
        &'a self,
        node: &'a mut MissionNode,
        user_id: &'a str,
        dry_run: bool,
        written: &'a mut Vec<String>,
    ) -> BoxFuture<'a, Result<String, StoreError>> {
        async move {
            for slot in node.steps_mut() {
                if let Some(child) = slot.as_node_mut() {
                    if child.id.is_none() {
                        self.persist_tree(child, user_id, dry_run, &mut *written)
                            .await?;
                    }
                }
            }
            let id = self.store.add_mission_to_store(node, user_id, dry_run).await?;
            if !dry_run {
                written.push(id.clone());
            }
            Ok(id)
        }
        .boxed()
    }

    async fn record(
        &self,
        user_id: &str,
        attempt: u32,
        outcome: AttemptOutcome,
        start: Instant,
        conversation: Option<(usize, usize)>,
    ) {
        let mut record = AttemptRecord::new(user_id, attempt, outcome)
            .with_duration_ms(start.elapsed().as_millis() as u64);
        if let Some((raw_len, rounds)) = conversation {
            record = record.with_conversation(raw_len, rounds);
        }
        self.log.record(record).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{GenerateRequest, GenerateResponse, LlmBackend, LlmError};
    use crate::backend::{MockBackend, MockReply};
    use crate::config::ConversationConfig;
    use crate::store::{InMemoryMissionStore, UserProfile};
    use async_trait::async_trait;
    use mission::MissionChild;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const VALID: &str = r#"[
        {"title": "Bike to class", "description": "Skip the bus.", "steps": ["Check tires", "Plan a route"]},
        {"title": "Compost", "description": "Less landfill.", "steps": ["Buy a bin"]}
    ]"#;

    fn users() -> InMemoryMissionStore {
        InMemoryMissionStore::with_users([(
            "user-1".to_string(),
            UserProfile {
                username: "sam".to_string(),
                location: Some("NYC".to_string()),
                occupation: Some("Student".to_string()),
                interests: vec!["Biking".to_string()],
            },
        )])
    }

    fn store() -> Arc<InMemoryMissionStore> {
        Arc::new(users())
    }

    /// Backend that answers with `VALID` after a delay.
    struct SlowBackend {
        delay: Duration,
    }

    #[async_trait]
    impl LlmBackend for SlowBackend {
        fn id(&self) -> &str {
            "slow"
        }

        async fn generate(&self, _request: GenerateRequest) -> Result<GenerateResponse, LlmError> {
            tokio::time::sleep(self.delay).await;
            Ok(GenerateResponse::text_only(VALID))
        }
    }

    /// Store whose writes start failing after a fixed number succeed.
    struct FailingStore {
        inner: InMemoryMissionStore,
        successful_writes: usize,
        writes: AtomicUsize,
    }

    #[async_trait]
    impl MissionStore for FailingStore {
        async fn get_user_by_id(&self, user_id: &str) -> Result<UserProfile, StoreError> {
            self.inner.get_user_by_id(user_id).await
        }

        async fn get_user_past_missions(
            &self,
            user_id: &str,
            depth: usize,
        ) -> Result<Vec<MissionNode>, StoreError> {
            self.inner.get_user_past_missions(user_id, depth).await
        }

        async fn add_mission_to_store(
            &self,
            node: &mut MissionNode,
            user_id: &str,
            dry_run: bool,
        ) -> Result<String, StoreError> {
            if self.writes.fetch_add(1, Ordering::SeqCst) >= self.successful_writes {
                return Err(StoreError::Backend("disk full".to_string()));
            }
            self.inner.add_mission_to_store(node, user_id, dry_run).await
        }
    }

    fn generator(backend: Arc<MockBackend>, store: Arc<InMemoryMissionStore>) -> MissionGenerator {
        let driver = ConversationDriver::new(backend, Arc::new(ToolRegistry::new()));
        MissionGenerator::new(driver, store)
    }

    #[tokio::test]
    async fn test_retries_until_parseable() {
        let backend = Arc::new(
            MockBackend::default()
                .then_text("Here are some missions!")
                .then_text("[{\"title\": ")
                .then_text(VALID),
        );
        let generator = generator(backend.clone(), store());

        let request = MissionRequest::new("user-1", MissionPeriodType::Weekly)
            .with_count(2)
            .with_max_attempts(5);
        let missions = generator
            .generate_missions(&request, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(missions.len(), 2);
        assert_eq!(backend.call_count(), 3);

        let attempts = generator.log().for_user("user-1", 10).await;
        assert_eq!(attempts.len(), 3);
        assert!(attempts[0].outcome.is_success());
        assert_eq!(attempts[0].attempt, 3);
        assert!(matches!(attempts[1].outcome, AttemptOutcome::Malformed { .. }));
        assert!(matches!(attempts[2].outcome, AttemptOutcome::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_exhaustion_persists_nothing() {
        let backend = Arc::new(MockBackend::default().with_response("not json"));
        let store = store();
        let generator = generator(backend.clone(), store.clone());

        let request = MissionRequest::new("user-1", MissionPeriodType::Weekly)
            .with_max_attempts(3)
            .persisted();
        let err = generator
            .generate_missions(&request, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GenerationError::GenerationExhausted { attempts: 3, ref user_id } if user_id == "user-1"
        ));
        assert_eq!(backend.call_count(), 3);
        assert_eq!(store.mission_count(), 0);
        assert_eq!(generator.log().len().await, 3);
    }

    #[tokio::test]
    async fn test_persist_assigns_ids_children_first() {
        let backend = Arc::new(MockBackend::default().then_text(VALID));
        let store = store();
        let generator = generator(backend, store.clone());

        let request = MissionRequest::new("user-1", MissionPeriodType::Weekly).persisted();
        let missions = generator
            .generate_missions(&request, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(store.mission_count(), 5);
        let roots = store.user_mission_ids("user-1");
        assert_eq!(roots.len(), 2);

        let first = &missions[0];
        let first_id = first.id.clone().unwrap();
        assert_eq!(roots[0], first_id);

        let step_ids: Vec<_> = first
            .steps()
            .iter()
            .map(|c| c.id().unwrap().to_string())
            .collect();
        let document = store.document(&first_id).unwrap();
        assert_eq!(document["steps"], json!(step_ids));
        assert_eq!(document["type"], json!("weekly"));
        assert!(first.steps().iter().all(|c| matches!(c, MissionChild::Node(_))));
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let backend = Arc::new(MockBackend::default().then_text(VALID));
        let store = store();
        let generator = generator(backend, store.clone());

        let request = MissionRequest::new("user-1", MissionPeriodType::Ongoing).dry_run();
        let missions = generator
            .generate_missions(&request, &CancellationToken::new())
            .await
            .unwrap();

        assert!(missions.iter().all(|m| m.id.is_some()));
        assert!(missions[0].step_nodes().all(|s| s.id.is_some()));
        assert_eq!(store.mission_count(), 0);
    }

    #[tokio::test]
    async fn test_rejection_is_terminal() {
        let backend = Arc::new(
            MockBackend::default()
                .then(MockReply::Reject("API key not valid".to_string()))
                .with_response(VALID),
        );
        let generator = generator(backend.clone(), store());

        let request = MissionRequest::new("user-1", MissionPeriodType::Weekly);
        let err = generator
            .generate_missions(&request, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GenerationError::Conversation {
                attempt: 1,
                source: ConversationError::BackendRejected(_),
                ..
            }
        ));
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_wrong_shape_is_terminal() {
        let backend = Arc::new(MockBackend::default().with_response(r#"{"missions": []}"#));
        let generator = generator(backend.clone(), store());

        let request = MissionRequest::new("user-1", MissionPeriodType::Weekly);
        let err = generator
            .generate_missions(&request, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GenerationError::Parse {
                source: ParseError::UnexpectedShape(_),
                ..
            }
        ));
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let backend = Arc::new(MockBackend::default().with_response(VALID));
        let generator = generator(backend.clone(), store());

        let request = MissionRequest::new("nobody", MissionPeriodType::Weekly);
        let err = generator
            .generate_missions(&request, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::Store(StoreError::UserNotFound(_))));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_persists_nothing() {
        let backend = Arc::new(MockBackend::default().with_response(VALID));
        let store = store();
        let generator = generator(backend, store.clone());

        let cancel = CancellationToken::new();
        cancel.cancel();

        let request = MissionRequest::new("user-1", MissionPeriodType::Weekly).persisted();
        let err = generator.generate_missions(&request, &cancel).await.unwrap_err();

        assert!(matches!(err, GenerationError::Cancelled));
        assert_eq!(store.mission_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backend_call_persists_nothing() {
        let store = store();
        let driver = ConversationDriver::new(
            Arc::new(SlowBackend {
                delay: Duration::from_secs(30),
            }),
            Arc::new(ToolRegistry::new()),
        );
        let generator = MissionGenerator::new(driver, store.clone());

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let request = MissionRequest::new("user-1", MissionPeriodType::Weekly).persisted();
        let err = generator.generate_missions(&request, &cancel).await.unwrap_err();

        assert!(matches!(err, GenerationError::Cancelled));
        assert_eq!(store.mission_count(), 0);
        let entries = generator.log().recent(10).await;
        assert_eq!(entries.len(), 1);
        assert!(matches!(entries[0].outcome, AttemptOutcome::Failed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_call_is_cancelled() {
        let store = store();
        let driver = ConversationDriver::new(
            Arc::new(SlowBackend {
                delay: Duration::from_secs(30),
            }),
            Arc::new(ToolRegistry::new()),
        )
        .with_config(ConversationConfig {
            max_rounds: 5,
            call_timeout_ms: Some(100),
        });
        let generator = MissionGenerator::new(driver, store.clone());

        let request = MissionRequest::new("user-1", MissionPeriodType::Weekly).persisted();
        let err = generator
            .generate_missions(&request, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::Cancelled));
        assert_eq!(store.mission_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_write_reports_stored_ids() {
        let store = Arc::new(FailingStore {
            inner: users(),
            successful_writes: 3,
            writes: AtomicUsize::new(0),
        });
        let backend = Arc::new(MockBackend::default().with_response(VALID));
        let driver = ConversationDriver::new(backend, Arc::new(ToolRegistry::new()));
        let generator = MissionGenerator::new(driver, store.clone());

        let request = MissionRequest::new("user-1", MissionPeriodType::Weekly).persisted();
        let err = generator
            .generate_missions(&request, &CancellationToken::new())
            .await
            .unwrap_err();

        // two steps and their mission made it, the second mission's step did not
        match err {
            GenerationError::PartiallyPersisted {
                written, source, ..
            } => {
                assert_eq!(written.len(), 3);
                assert!(matches!(source, StoreError::Backend(_)));
                for id in &written {
                    assert!(store.inner.document(id).is_some());
                }
            }
            other => panic!("expected a partial write, got {other:?}"),
        }
        assert_eq!(store.inner.mission_count(), 3);
    }

    #[tokio::test]
    async fn test_first_failed_write_is_a_store_error() {
        let store = Arc::new(FailingStore {
            inner: users(),
            successful_writes: 0,
            writes: AtomicUsize::new(0),
        });
        let backend = Arc::new(MockBackend::default().with_response(VALID));
        let driver = ConversationDriver::new(backend, Arc::new(ToolRegistry::new()));
        let generator = MissionGenerator::new(driver, store);

        let request = MissionRequest::new("user-1", MissionPeriodType::Weekly).persisted();
        let err = generator
            .generate_missions(&request, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::Store(StoreError::Backend(_))));
    }

    #[tokio::test]
    async fn test_prompter_matches_generator_preview() {
        let store = store();
        let backend = Arc::new(MockBackend::default());
        let generator = generator(backend.clone(), store.clone());
        let prompter = MissionPrompter::new(store).with_config(generator.config().clone());

        let preview = generator
            .preview_prompt("user-1", MissionPeriodType::Ongoing, 3)
            .await
            .unwrap();
        let built = prompter
            .build("user-1", MissionPeriodType::Ongoing, 3)
            .await
            .unwrap();

        assert_eq!(preview, built);
        assert!(built.contains("suggest 3 missions"));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_history_reaches_next_prompt() {
        let backend = Arc::new(MockBackend::default().with_response(VALID));
        let store = store();
        let generator = generator(backend.clone(), store);

        let first = generator.preview_prompt("user-1", MissionPeriodType::Weekly, 2).await.unwrap();
        assert!(first.contains("I have not completed any missions yet."));

        let request = MissionRequest::new("user-1", MissionPeriodType::Weekly).persisted();
        generator
            .generate_missions(&request, &CancellationToken::new())
            .await
            .unwrap();

        let second = generator.preview_prompt("user-1", MissionPeriodType::Weekly, 2).await.unwrap();
        assert!(second.contains("1. Bike to class\n- Check tires\n- Plan a route"));
        assert!(second.contains("2. Compost\n- Buy a bin"));
    }

    #[tokio::test]
    async fn test_invalid_request() {
        let generator = generator(Arc::new(MockBackend::default()), store());

        let request = MissionRequest::new("user-1", MissionPeriodType::Weekly).with_count(0);
        let err = generator
            .generate_missions(&request, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::InvalidRequest(_)));
    }
}
