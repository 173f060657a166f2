//! Periodic chat polling with change detection
//!
//! The poller re-fetches the chat list on a fixed interval, compares each
//! chat against its last-known snapshot and publishes at most one aggregated
//! "new chats" and one aggregated "new messages" event per tick.
//!
//! Starting takes a silent baseline first so that chats which already
//! existed are not announced. A chat first seen after the baseline is always
//! reported as new, even if it is old on the server side.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::{DashboardError, Result};
use crate::events::{DashboardEvent, EventBus};
use crate::snapshot::{ChatSnapshot, SnapshotStore};
use crate::source::{ChatQuery, ChatSource};

pub const DEFAULT_POLLING_FREQUENCY: Duration = Duration::from_millis(10_000);

/// What a single check of the chat list did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The fetch failed; snapshots were left untouched
    Skipped,
    /// Snapshots were recorded without emitting anything, because the
    /// baseline fetch at start had failed
    Baseline { recorded: usize },
    Checked {
        new_chats: usize,
        chats_with_new_messages: usize,
        /// Chats ignored for lacking an ID
        skipped: usize,
        /// The open chat received messages; it is not refreshed here
        current_chat_updated: bool,
    },
}

struct PollState {
    polling: bool,
    /// Bumped on every start so a stop during the baseline fetch wins
    generation: u64,
    timer: Option<JoinHandle<()>>,
    frequency: Duration,
    current_chat: Option<String>,
    baseline_pending: bool,
}

struct Inner<S> {
    source: S,
    events: EventBus,
    query: ChatQuery,
    state: Mutex<PollState>,
    snapshots: Mutex<SnapshotStore>,
}

/// Chat change detector driven by a repeating timer
pub struct ChatPoller<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for ChatPoller<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: ChatSource> ChatPoller<S> {
    pub fn new(source: S, events: EventBus, query: ChatQuery) -> Self {
        Self::with_frequency(source, events, query, DEFAULT_POLLING_FREQUENCY)
    }

    /// Create a poller with a custom interval; a zero interval falls back
    /// to the default
    pub fn with_frequency(source: S, events: EventBus, query: ChatQuery, frequency: Duration) -> Self {
        let frequency = if frequency.is_zero() {
            DEFAULT_POLLING_FREQUENCY
        } else {
            frequency
        };

        Self {
            inner: Arc::new(Inner {
                source,
                events,
                query,
                state: Mutex::new(PollState {
                    polling: false,
                    generation: 0,
                    timer: None,
                    frequency,
                    current_chat: None,
                    baseline_pending: false,
                }),
                snapshots: Mutex::new(SnapshotStore::new()),
            }),
        }
    }

    pub fn source(&self) -> &S {
        &self.inner.source
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// Start polling; a no-op when already polling
    ///
    /// Records a silent baseline of the current chats, then schedules a
    /// check every polling interval. If the baseline fetch fails the first
    /// successful tick records the baseline instead.
    pub async fn start_polling(&self) {
        let generation = {
            let mut state = self.inner.state.lock().await;
            if state.polling {
                debug!("Chat polling already running");
                return;
            }
            state.polling = true;
            state.generation += 1;
            state.generation
        };

        let baseline_ok = self.load_baseline().await;

        let mut state = self.inner.state.lock().await;
        if !state.polling || state.generation != generation {
            debug!("Chat polling stopped during baseline fetch");
            return;
        }
        state.baseline_pending = !baseline_ok;

        let frequency = state.frequency;
        state.timer = Some(tokio::spawn(run_timer(
            Arc::downgrade(&self.inner),
            frequency,
        )));

        info!(
            frequency_ms = frequency.as_millis() as u64,
            "Chat polling started"
        );
    }

    /// Stop polling; a no-op when already stopped
    ///
    /// Snapshots are kept. A check already in flight still completes.
    pub async fn stop_polling(&self) {
        let mut state = self.inner.state.lock().await;
        if !state.polling {
            return;
        }
        state.polling = false;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        info!("Chat polling stopped");
    }

    pub async fn is_polling(&self) -> bool {
        self.inner.state.lock().await.polling
    }

    pub async fn polling_frequency(&self) -> Duration {
        self.inner.state.lock().await.frequency
    }

    /// Change the polling interval
    ///
    /// While polling, the loop is restarted (re-running the baseline);
    /// otherwise the interval applies to the next start.
    pub async fn set_polling_frequency(&self, frequency: Duration) -> Result<()> {
        if frequency.is_zero() {
            return Err(DashboardError::InvalidPollingFrequency(0));
        }

        let was_polling = {
            let mut state = self.inner.state.lock().await;
            state.frequency = frequency;
            state.polling
        };

        if was_polling {
            self.stop_polling().await;
            self.start_polling().await;
        }
        Ok(())
    }

    /// Record which chat the user has open
    pub async fn set_current_chat(&self, chat_id: Option<&str>) {
        self.inner.state.lock().await.current_chat = chat_id.map(str::to_string);
    }

    pub async fn current_chat(&self) -> Option<String> {
        self.inner.state.lock().await.current_chat.clone()
    }

    /// Forget every snapshot and the open chat
    pub async fn clear(&self) {
        self.inner.snapshots.lock().await.clear();
        self.inner.state.lock().await.current_chat = None;
        debug!("Chat poller state cleared");
    }

    pub async fn snapshot(&self, chat_id: &str) -> Option<ChatSnapshot> {
        self.inner.snapshots.lock().await.get(chat_id).copied()
    }

    pub async fn snapshot_count(&self) -> usize {
        self.inner.snapshots.lock().await.len()
    }

    /// Run one check of the chat list
    ///
    /// Always fetches fresh. A failed fetch is logged and leaves every
    /// snapshot as it was.
    pub async fn check_for_updates(&self) -> TickOutcome {
        let chats = match self.inner.source.get_chats_fresh(&self.inner.query).await {
            Ok(chats) => chats,
            Err(e) => {
                warn!(error = %e, "Chat poll failed, skipping tick");
                return TickOutcome::Skipped;
            }
        };

        let (baseline_pending, current_chat) = {
            let mut state = self.inner.state.lock().await;
            (
                std::mem::take(&mut state.baseline_pending),
                state.current_chat.clone(),
            )
        };

        if baseline_pending {
            let recorded = self.inner.snapshots.lock().await.record_baseline(&chats);
            debug!(recorded, "Recorded delayed chat baseline");
            return TickOutcome::Baseline { recorded };
        }

        let changes = self.inner.snapshots.lock().await.diff(&chats);

        let current_chat_updated = current_chat
            .as_deref()
            .map(|id| {
                changes
                    .chats_with_new_messages
                    .iter()
                    .any(|c| c.chat.chat_id() == Some(id))
            })
            .unwrap_or(false);

        let outcome = TickOutcome::Checked {
            new_chats: changes.new_chats.len(),
            chats_with_new_messages: changes.chats_with_new_messages.len(),
            skipped: changes.skipped,
            current_chat_updated,
        };

        if changes.skipped > 0 {
            debug!(skipped = changes.skipped, "Skipped chats without an ID");
        }

        if !changes.new_chats.is_empty() {
            info!(count = changes.new_chats.len(), "New chats detected");
            self.inner.events.emit(DashboardEvent::NewChatsDetected {
                new_chats: changes.new_chats,
                all_chats: chats,
            });
        }

        if !changes.chats_with_new_messages.is_empty() {
            info!(
                count = changes.chats_with_new_messages.len(),
                current_chat_updated, "New messages detected"
            );
            self.inner.events.emit(DashboardEvent::NewMessagesDetected {
                chats_with_new_messages: changes.chats_with_new_messages,
            });
        }

        outcome
    }

    async fn load_baseline(&self) -> bool {
        match self.inner.source.get_chats_fresh(&self.inner.query).await {
            Ok(chats) => {
                let recorded = self.inner.snapshots.lock().await.record_baseline(&chats);
                debug!(recorded, "Recorded chat baseline");
                true
            }
            Err(e) => {
                warn!(error = %e, "Baseline chat fetch failed, deferring to first tick");
                false
            }
        }
    }
}

/// Fire a check every `frequency` until aborted or the poller is dropped
///
/// Each check runs as its own task, so a slow fetch does not delay the
/// timer and a stop does not cancel a check already under way.
async fn run_timer<S: ChatSource>(inner: Weak<Inner<S>>, frequency: Duration) {
    let mut interval = tokio::time::interval_at(Instant::now() + frequency, frequency);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let Some(inner) = inner.upgrade() else {
            debug!("Chat poller dropped, timer exiting");
            break;
        };
        let poller = ChatPoller { inner };
        tokio::spawn(async move {
            poller.check_for_updates().await;
        });
    }
}
