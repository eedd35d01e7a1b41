// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns one host event into either nothing or a bounded context block.
//!
//! The pipeline per event is: load session state, classify, check cooldown,
//! search or build a save reminder, check the circuit breaker, log, persist.
//! Any error along the way produces a pass-through response.

use std::path::PathBuf;
use std::sync::Arc;

use hindsight_config::model::TriggerConfig;
use hindsight_core::recording::record_hint;
use hindsight_core::types::truncate_chars;
use hindsight_core::{Clock, HindsightError, SystemClock};
use hindsight_memory::{MemoryService, Scope, SearchHit};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::breaker::CircuitBreaker;
use crate::classifier::{Classification, TriggerClassifier};
use crate::hint_log::{HintLog, HintRecord};
use crate::rules::{Intent, RuleMatch, TriggerCategory};
use crate::session::{Phase, SessionStore};

/// Inbound event from the host agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookEvent {
    pub prompt: String,
    #[serde(default = "default_session_id")]
    pub session_id: String,
    #[serde(default)]
    pub cwd: PathBuf,
}

fn default_session_id() -> String {
    "default".to_string()
}

/// Reply to the host. Both fields empty means pass-through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
    /// Short user-visible line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl HookResponse {
    pub fn pass_through() -> Self {
        Self::default()
    }

    pub fn is_pass_through(&self) -> bool {
        self.additional_context.is_none() && self.summary.is_none()
    }
}

pub struct InjectionOrchestrator {
    classifier: TriggerClassifier,
    memory: MemoryService,
    sessions: SessionStore,
    hints: HintLog,
    breaker: CircuitBreaker,
    max_results: usize,
    max_hint_chars: usize,
    clock: Arc<dyn Clock>,
}

impl InjectionOrchestrator {
    pub fn new(memory: MemoryService, config: &TriggerConfig) -> Result<Self, HindsightError> {
        Ok(Self {
            classifier: TriggerClassifier::from_config(config)?,
            memory,
            sessions: SessionStore::new(&config.state_dir),
            hints: HintLog::new(
                &config.hint_log_path,
                config.max_hint_chars,
                config.breaker_window,
            ),
            breaker: CircuitBreaker::from_config(config),
            max_results: config.max_results,
            max_hint_chars: config.max_hint_chars,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn hints(&self) -> &HintLog {
        &self.hints
    }

    /// Handle one event. Never fails.
    pub async fn handle(&self, event: &HookEvent) -> HookResponse {
        match self.try_handle(event).await {
            Ok(response) => response,
            Err(e) => {
                warn!(session = %event.session_id, error = %e, "hook failed, passing through");
                HookResponse::pass_through()
            }
        }
    }

    async fn try_handle(&self, event: &HookEvent) -> Result<HookResponse, HindsightError> {
        let mut state = self.sessions.load(&event.session_id).await;
        state.begin_turn();

        let matched = match self.classifier.classify(&event.prompt) {
            Classification::Matched(m) => m,
            Classification::TooShort | Classification::NoMatch => {
                // Turn cooldowns count every prompt, so the turn is persisted here too.
                state.phase = Phase::Idle;
                self.sessions.save(&state).await?;
                return Ok(HookResponse::pass_through());
            }
        };
        state.phase = Phase::Classified;
        let category = matched.category;
        let now = self.clock.now();

        if state.is_cooling(category, matched.cooldown, now) {
            debug!(session = %event.session_id, category = %category, "category cooling down");
            record_hint(category.as_str(), "cooldown");
            state.phase = Phase::Cooldown;
            self.sessions.save(&state).await?;
            return Ok(HookResponse::pass_through());
        }

        let scope = Scope::from_cwd(&event.cwd);
        let Some(response) = self.build_response(&matched, event, &scope).await? else {
            record_hint(category.as_str(), "empty");
            self.sessions.save(&state).await?;
            return Ok(HookResponse::pass_through());
        };
        let content = response.additional_context.clone().unwrap_or_default();

        let history = self.hints.recent(self.breaker.window).await?;
        let suppress = self.breaker.should_suppress(
            &history,
            &event.session_id,
            category,
            self.hints.clip(&content),
            now,
        );
        self.hints
            .append(&HintRecord {
                timestamp: now,
                session_id: event.session_id.clone(),
                category,
                content,
                suppressed: suppress,
            })
            .await?;
        if let Err(e) = self.hints.compact().await {
            warn!(error = %e, "hint log compaction failed");
        }

        if suppress {
            warn!(session = %event.session_id, category = %category, "repeated hint suppressed");
            record_hint(category.as_str(), "suppressed");
            self.sessions.save(&state).await?;
            return Ok(HookResponse::pass_through());
        }

        state.mark_fired(category, now);
        self.sessions.save(&state).await?;
        info!(session = %event.session_id, category = %category, scope = %scope, "hint emitted");
        record_hint(category.as_str(), "emitted");
        Ok(response)
    }

    async fn build_response(
        &self,
        matched: &RuleMatch,
        event: &HookEvent,
        scope: &Scope,
    ) -> Result<Option<HookResponse>, HindsightError> {
        match matched.category.intent() {
            Intent::Read => {
                let (found_in, hits) = self.search_with_fallback(scope, &event.prompt).await?;
                if hits.is_empty() {
                    return Ok(None);
                }
                Ok(Some(HookResponse {
                    additional_context: Some(self.format_hits(&found_in, &hits)),
                    summary: Some(format!(
                        "hindsight: {} {} from {found_in}",
                        hits.len(),
                        if hits.len() == 1 { "memory" } else { "memories" }
                    )),
                }))
            }
            Intent::Write => Ok(Some(HookResponse {
                additional_context: Some(save_reminder(matched.category, scope)),
                summary: Some(format!("hindsight: save reminder ({})", matched.category)),
            })),
        }
    }

    /// Search the project scope, then global if the project has nothing.
    async fn search_with_fallback(
        &self,
        scope: &Scope,
        query: &str,
    ) -> Result<(Scope, Vec<SearchHit>), HindsightError> {
        let hits = self.memory.search(scope, query, Some(self.max_results)).await?;
        if !hits.is_empty() || scope.is_global() {
            return Ok((scope.clone(), hits));
        }
        let hits = self
            .memory
            .search(&Scope::Global, query, Some(self.max_results))
            .await?;
        Ok((Scope::Global, hits))
    }

    /// One `[category|NN%] content` line per hit.
    fn format_hits(&self, scope: &Scope, hits: &[SearchHit]) -> String {
        let mut block = format!("Relevant memories ({scope}):");
        for hit in hits.iter().take(self.max_results) {
            let flat = hit.content.split_whitespace().collect::<Vec<_>>().join(" ");
            let (text, cut) = truncate_chars(&flat, self.max_hint_chars);
            let percent = (hit.similarity * 100.0).round() as i64;
            block.push_str(&format!(
                "\n[{}|{percent}%] {text}{}",
                hit.category,
                if cut { "…" } else { "" }
            ));
        }
        block
    }
}

fn save_reminder(category: TriggerCategory, scope: &Scope) -> String {
    let memory_category = category
        .memory_category()
        .map_or("context", |c| c.as_str());
    format!(
        "This looks like a {category} worth remembering. Once it is settled, save the final \
         wording with `hindsight save --scope {scope} --category {memory_category} \"...\"`."
    )
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use hindsight_config::model::{MemoryConfig, TriggerRuleConfig};
    use hindsight_core::{
        AdapterType, Embedder, EmbeddingInput, EmbeddingOutput, HealthStatus, PluginAdapter,
    };
    use hindsight_memory::{MemoryCategory, Metadata};
    use hindsight_storage::Database;

    use super::*;

    struct TopicEmbedder {
        down: AtomicBool,
    }

    #[async_trait]
    impl PluginAdapter for TopicEmbedder {
        fn name(&self) -> &str {
            "topic"
        }

        fn version(&self) -> semver::Version {
            semver::Version::new(0, 1, 0)
        }

        fn adapter_type(&self) -> AdapterType {
            AdapterType::Embedding
        }

        async fn health_check(&self) -> Result<HealthStatus, HindsightError> {
            Ok(HealthStatus::Healthy)
        }
    }

    #[async_trait]
    impl Embedder for TopicEmbedder {
        async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, HindsightError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(HindsightError::provider("down"));
            }
            let embeddings = input
                .texts
                .iter()
                .map(|t| {
                    let t = t.to_lowercase();
                    vec![
                        if t.contains("retry") { 1.0 } else { 0.0 },
                        if t.contains("sqlite") { 1.0 } else { 0.0 },
                        0.01,
                    ]
                })
                .collect();
            Ok(EmbeddingOutput {
                embeddings,
                dimensions: 3,
            })
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        memory: MemoryService,
        embedder: Arc<TopicEmbedder>,
        config: TriggerConfig,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory().await.unwrap();
        let embedder = Arc::new(TopicEmbedder {
            down: AtomicBool::new(false),
        });
        let memory = MemoryService::new(db, Some(embedder.clone()), MemoryConfig::default());
        let config = TriggerConfig {
            state_dir: dir.path().join("sessions").to_string_lossy().into_owned(),
            hint_log_path: dir.path().join("hints.jsonl").to_string_lossy().into_owned(),
            ..TriggerConfig::default()
        };
        Fixture {
            _dir: dir,
            memory,
            embedder,
            config,
        }
    }

    fn event(prompt: &str, cwd: &str) -> HookEvent {
        HookEvent {
            prompt: prompt.to_string(),
            session_id: "sess-1".to_string(),
            cwd: Path::new(cwd).to_path_buf(),
        }
    }

    async fn remember(memory: &MemoryService, scope: Scope, content: &str) {
        memory
            .save(&scope, MemoryCategory::Pattern, content, Metadata::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn short_prompt_passes_through_and_stays_idle() {
        let f = fixture().await;
        let orch = InjectionOrchestrator::new(f.memory.clone(), &f.config).unwrap();
        let resp = orch.handle(&event("fix it", "/work/atlas")).await;
        assert!(resp.is_pass_through());
        let state = orch.sessions().load("sess-1").await;
        assert_eq!(state.phase, Phase::Idle);
        assert_eq!(state.turn, 1);
    }

    #[tokio::test]
    async fn read_intent_injects_annotated_project_memories() {
        let f = fixture().await;
        remember(&f.memory, Scope::Project("atlas".into()), "Retry uploads with backoff").await;
        let orch = InjectionOrchestrator::new(f.memory.clone(), &f.config).unwrap();

        let resp = orch
            .handle(&event("How did we handle retry logic last time?", "/work/atlas"))
            .await;
        let block = resp.additional_context.unwrap();
        assert!(block.starts_with("Relevant memories (atlas):"));
        assert!(block.contains("[pattern|100%] Retry uploads with backoff"));
        assert_eq!(resp.summary.as_deref(), Some("hindsight: 1 memory from atlas"));

        let state = orch.sessions().load("sess-1").await;
        assert_eq!(state.phase, Phase::Cooldown);
    }

    #[tokio::test]
    async fn empty_project_falls_back_to_global() {
        let f = fixture().await;
        remember(&f.memory, Scope::Global, "Retry idempotent calls only").await;
        let orch = InjectionOrchestrator::new(f.memory.clone(), &f.config).unwrap();

        let resp = orch
            .handle(&event("How did we handle retry logic last time?", "/work/atlas"))
            .await;
        assert!(
            resp.additional_context
                .unwrap()
                .starts_with("Relevant memories (global):")
        );
    }

    #[tokio::test]
    async fn no_results_and_provider_outage_pass_through() {
        let f = fixture().await;
        let orch = InjectionOrchestrator::new(f.memory.clone(), &f.config).unwrap();
        let resp = orch
            .handle(&event("How did we handle retry logic last time?", "/work/atlas"))
            .await;
        assert!(resp.is_pass_through());

        remember(&f.memory, Scope::Project("atlas".into()), "Retry uploads").await;
        f.embedder.down.store(true, Ordering::SeqCst);
        let resp = orch
            .handle(&event("How did we handle retry logic last time?", "/work/atlas"))
            .await;
        assert!(resp.is_pass_through());
    }

    #[tokio::test]
    async fn write_intent_emits_save_reminder_without_saving() {
        let f = fixture().await;
        let orch = InjectionOrchestrator::new(f.memory.clone(), &f.config).unwrap();
        let resp = orch
            .handle(&event("We decided to keep sqlite for the cache", "/work/atlas"))
            .await;
        let reminder = resp.additional_context.unwrap();
        assert!(reminder.contains("--scope atlas --category decision"));
        assert_eq!(resp.summary.as_deref(), Some("hindsight: save reminder (decision)"));
        assert_eq!(f.memory.stats().await.unwrap().memories, 0);
    }

    #[tokio::test]
    async fn cooldown_blocks_refiring_within_turns() {
        let f = fixture().await;
        let orch = InjectionOrchestrator::new(f.memory.clone(), &f.config).unwrap();
        let prompt = "We decided to keep sqlite for the cache";

        assert!(!orch.handle(&event(prompt, "/work/atlas")).await.is_pass_through());
        assert!(orch.handle(&event(prompt, "/work/atlas")).await.is_pass_through());
        assert_eq!(orch.sessions().load("sess-1").await.phase, Phase::Cooldown);
        // Decision cooldown is two turns.
        assert!(!orch.handle(&event(prompt, "/work/atlas")).await.is_pass_through());
    }

    #[tokio::test]
    async fn short_prompts_count_toward_turn_cooldown() {
        let f = fixture().await;
        let orch = InjectionOrchestrator::new(f.memory.clone(), &f.config).unwrap();
        let prompt = "We decided to keep sqlite for the cache";

        assert!(!orch.handle(&event(prompt, "/work/atlas")).await.is_pass_through());
        assert!(orch.handle(&event("ok", "/work/atlas")).await.is_pass_through());
        assert!(!orch.handle(&event(prompt, "/work/atlas")).await.is_pass_through());
        assert_eq!(orch.sessions().load("sess-1").await.turn, 3);
    }

    #[tokio::test]
    async fn breaker_suppresses_fourth_identical_hint() {
        let mut f = fixture().await;
        f.config.rules = vec![
            TriggerRuleConfig {
                category: "decision".into(),
                keywords: vec!["decided".into()],
                patterns: vec![],
                priority: "medium".into(),
                cooldown_turns: None,
                cooldown_secs: None,
                min_chars: None,
            },
            TriggerRuleConfig {
                category: "preference".into(),
                keywords: vec!["prefer".into()],
                patterns: vec![],
                priority: "medium".into(),
                cooldown_turns: None,
                cooldown_secs: None,
                min_chars: None,
            },
        ];
        let orch = InjectionOrchestrator::new(f.memory.clone(), &f.config).unwrap();
        let prompt = "We decided to keep sqlite for the cache";

        for _ in 0..3 {
            assert!(!orch.handle(&event(prompt, "/work/atlas")).await.is_pass_through());
        }
        assert!(orch.handle(&event(prompt, "/work/atlas")).await.is_pass_through());

        let other = orch
            .handle(&event("I prefer small focused commits", "/work/atlas"))
            .await;
        assert!(!other.is_pass_through());

        let log = orch.hints().recent(10).await.unwrap();
        assert_eq!(log.len(), 5);
        assert!(log[3].suppressed);
    }

    #[tokio::test]
    async fn io_failure_degrades_to_pass_through() {
        let mut f = fixture().await;
        let blocker = f._dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();
        f.config.state_dir = blocker.join("sessions").to_string_lossy().into_owned();
        let orch = InjectionOrchestrator::new(f.memory.clone(), &f.config).unwrap();

        let resp = orch
            .handle(&event("We decided to keep sqlite for the cache", "/work/atlas"))
            .await;
        assert!(resp.is_pass_through());
    }

    #[test]
    fn event_json_defaults() {
        let ev: HookEvent = serde_json::from_str(r#"{"prompt":"hello there"}"#).unwrap();
        assert_eq!(ev.session_id, "default");
        assert_eq!(ev.cwd, PathBuf::new());
        assert_eq!(
            serde_json::to_string(&HookResponse::pass_through()).unwrap(),
            "{}"
        );
    }
}
