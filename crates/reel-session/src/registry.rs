//! Process-wide table of runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, info};

use reel_models::{ProgressEvent, Run, RunId, RunMode, Stage};

use crate::channel::ProgressChannel;
use crate::error::{SessionError, SessionResult};

/// Registry configuration.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// How long a finished run stays queryable
    pub retention: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            retention: Duration::from_secs(60),
        }
    }
}

impl RegistryConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            retention: Duration::from_secs(
                std::env::var("REEL_RUN_RETENTION_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
        }
    }
}

/// Cooperative cancellation flag shared between a run and its owner.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct RunEntry {
    run: Run,
    cancel: CancellationFlag,
}

/// Table of live and recently finished runs.
///
/// Construct one per process and pass it by reference (usually as
/// `Arc<SessionRegistry>`) to whoever starts or observes runs.
pub struct SessionRegistry {
    runs: RwLock<HashMap<RunId, RunEntry>>,
    channel: ProgressChannel,
    config: RegistryConfig,
}

impl SessionRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            runs: RwLock::new(HashMap::new()),
            channel: ProgressChannel::new(),
            config,
        }
    }

    /// Progress channel for this registry's runs.
    pub fn channel(&self) -> &ProgressChannel {
        &self.channel
    }

    /// Retention applied to finished runs.
    pub fn retention(&self) -> Duration {
        self.config.retention
    }

    /// Register a new pending run and seed its progress state.
    pub async fn create(&self, mode: RunMode) -> RunId {
        let id = RunId::new();
        let run = Run::new(id.clone(), mode);
        let seed = ProgressEvent::new(Stage::Init, 0, run.message.clone());

        self.runs.write().await.insert(
            id.clone(),
            RunEntry {
                run,
                cancel: CancellationFlag::new(),
            },
        );
        self.channel.publish(&id, seed).await;

        info!(run_id = %id, mode = mode.as_str(), "Run created");
        id
    }

    /// Snapshot of a run.
    pub async fn get(&self, id: &RunId) -> Option<Run> {
        self.runs.read().await.get(id).map(|e| e.run.clone())
    }

    /// Mutate a run in place.
    pub async fn update<F>(&self, id: &RunId, patch: F) -> SessionResult<()>
    where
        F: FnOnce(&mut Run),
    {
        let mut runs = self.runs.write().await;
        let entry = runs.get_mut(id).ok_or_else(|| SessionError::not_found(id))?;
        patch(&mut entry.run);
        Ok(())
    }

    /// Fold `event` into the run state and publish it to the observer.
    pub async fn record(&self, id: &RunId, event: ProgressEvent) -> SessionResult<()> {
        self.update(id, |run| run.apply_event(&event)).await?;
        self.channel.publish(id, event).await;
        Ok(())
    }

    /// Remove the run after `after` has elapsed.
    ///
    /// The timer holds only a weak reference, so dropping the registry
    /// cancels pending expiries.
    pub fn expire_after(self: &Arc<Self>, id: &RunId, after: Duration) {
        let registry = Arc::downgrade(self);
        let id = id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if let Some(registry) = registry.upgrade() {
                registry.remove(&id).await;
                debug!(run_id = %id, "Run expired");
            }
        });
    }

    /// Remove a run and its progress state now.
    pub async fn remove(&self, id: &RunId) -> Option<Run> {
        let removed = self.runs.write().await.remove(id).map(|e| e.run);
        self.channel.remove(id).await;
        removed
    }

    /// Cancellation flag of a run.
    pub async fn cancel_flag(&self, id: &RunId) -> Option<CancellationFlag> {
        self.runs.read().await.get(id).map(|e| e.cancel.clone())
    }

    /// Request cooperative cancellation. Returns false for unknown runs.
    pub async fn cancel(&self, id: &RunId) -> bool {
        match self.runs.read().await.get(id) {
            Some(entry) => {
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.runs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.runs.read().await.is_empty()
    }

    /// Cancel every run and drop all state.
    pub async fn shutdown(&self) {
        let mut runs = self.runs.write().await;
        for entry in runs.values() {
            entry.cancel.cancel();
        }
        let count = runs.len();
        runs.clear();
        drop(runs);
        self.channel.clear().await;
        info!(runs = count, "Session registry cleared");
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}
