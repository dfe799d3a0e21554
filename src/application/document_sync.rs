use crate::domain::models::Document;
use crate::infrastructure::dashboard_client::DashboardRemote;
use crate::infrastructure::error::InfraError;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Duration, Instant, MissedTickBehavior};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);
pub const DEFAULT_PUSH_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    Replaced,
    Unchanged,
    /// A debounced push is pending; local edits win until it lands.
    Deferred,
    Failed,
}

#[derive(Debug)]
struct LocalState {
    document: Arc<Document>,
    loading: bool,
    last_seen: Option<String>,
    /// Bumped by every mutation that changed the document.
    revision: u64,
}

struct SyncShared {
    state: Mutex<LocalState>,
    pending_push: Mutex<Option<JoinHandle<()>>>,
}

/// Local copy of the singleton document kept in step with the remote store
/// by polling pulls and debounced whole-document pushes.
#[derive(Clone)]
pub struct SyncClient {
    remote: Arc<dyn DashboardRemote>,
    shared: Arc<SyncShared>,
    push_debounce: Duration,
}

impl SyncClient {
    pub fn new(remote: Arc<dyn DashboardRemote>) -> Self {
        Self {
            remote,
            shared: Arc::new(SyncShared {
                state: Mutex::new(LocalState {
                    document: Arc::new(Document::default()),
                    loading: true,
                    last_seen: None,
                    revision: 0,
                }),
                pending_push: Mutex::new(None),
            }),
            push_debounce: DEFAULT_PUSH_DEBOUNCE,
        }
    }

    pub fn with_push_debounce(mut self, push_debounce: Duration) -> Self {
        self.push_debounce = push_debounce;
        self
    }

    pub fn remote(&self) -> &Arc<dyn DashboardRemote> {
        &self.remote
    }

    fn state(&self) -> Result<MutexGuard<'_, LocalState>, InfraError> {
        self.shared
            .state
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("sync state lock poisoned: {error}")))
    }

    pub fn snapshot(&self) -> Arc<Document> {
        self.state()
            .map(|state| Arc::clone(&state.document))
            .unwrap_or_default()
    }

    pub fn is_loading(&self) -> bool {
        self.state().map(|state| state.loading).unwrap_or(true)
    }

    pub fn has_pending_push(&self) -> bool {
        self.shared
            .pending_push
            .lock()
            .map(|pending| pending.as_ref().is_some_and(|handle| !handle.is_finished()))
            .unwrap_or(false)
    }

    /// Fetches the remote document and replaces the local copy only when its
    /// serialization differs from the last one seen. Local edits made while
    /// the fetch was in flight win over the fetched copy.
    pub async fn pull(&self) -> PullOutcome {
        if self.has_pending_push() {
            tracing::debug!("pull deferred: local changes pending push");
            return PullOutcome::Deferred;
        }
        let Ok(revision) = self.state().map(|state| state.revision) else {
            return PullOutcome::Failed;
        };

        let remote_document = match self.remote.fetch_document().await {
            Ok(document) => document,
            Err(error) => {
                tracing::warn!(error = %error, "document pull failed; keeping local state");
                return PullOutcome::Failed;
            }
        };
        let serialized = match remote_document.canonical_json() {
            Ok(serialized) => serialized,
            Err(error) => {
                tracing::warn!(error = %error, "document pull could not be serialized");
                return PullOutcome::Failed;
            }
        };

        let Ok(mut state) = self.state() else {
            return PullOutcome::Failed;
        };
        if state.revision != revision || self.has_pending_push() {
            tracing::debug!("pull deferred: document edited during fetch");
            return PullOutcome::Deferred;
        }
        if state.last_seen.as_deref() == Some(serialized.as_str()) {
            state.loading = false;
            return PullOutcome::Unchanged;
        }

        let was_loading = state.loading;
        state.document = Arc::new(remote_document);
        state.last_seen = Some(serialized);
        state.loading = false;
        drop(state);

        if was_loading {
            tracing::info!("initial document loaded");
        } else {
            tracing::info!("remote document changed; local state replaced");
        }
        PullOutcome::Replaced
    }

    /// Applies `change` to a copy of the local document. The copy replaces the
    /// local state only when `change` succeeds and actually altered something;
    /// only then is a debounced push scheduled.
    pub fn mutate<T, F>(&self, change: F) -> Result<T, InfraError>
    where
        F: FnOnce(&mut Document) -> Result<T, InfraError>,
    {
        let (result, changed) = {
            let mut state = self.state()?;
            if state.loading {
                return Err(InfraError::NotLoaded);
            }
            let mut next = Document::clone(&state.document);
            let result = change(&mut next)?;
            let changed = next != *state.document;
            if changed {
                state.document = Arc::new(next);
                state.revision = state.revision.wrapping_add(1);
            }
            (result, changed)
        };
        if changed {
            self.schedule_push();
        }
        Ok(result)
    }

    /// Cancels any pending push and schedules a new one after the debounce window.
    pub fn schedule_push(&self) {
        let Ok(mut pending) = self.shared.pending_push.lock() else {
            return;
        };
        if let Some(previous) = pending.take() {
            previous.abort();
        }

        let client = self.clone();
        let debounce = self.push_debounce;
        *pending = Some(tokio::spawn(async move {
            sleep(debounce).await;
            if let Err(error) = client.push_now().await {
                tracing::warn!(error = %error, "document push failed; local state kept");
            }
        }));
    }

    pub async fn push_now(&self) -> Result<(), InfraError> {
        let document = self.snapshot();
        let serialized = document.canonical_json()?;
        self.remote.push_document(&document).await?;
        self.state()?.last_seen = Some(serialized);
        tracing::debug!("document pushed");
        Ok(())
    }

    /// Pulls once, then keeps polling until the returned handle is dropped.
    pub async fn start(&self, poll_interval: Duration) -> PollHandle {
        self.pull().await;

        let client = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + poll_interval, poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                client.pull().await;
            }
        });
        PollHandle { handle }
    }
}

/// Owns the polling task; dropping it stops polling.
#[derive(Debug)]
pub struct PollHandle {
    handle: JoinHandle<()>,
}

impl PollHandle {
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
