// Matchmaking queue: per-(scope, mode) FIFO of waiting players with expiring entries.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::AbortHandle;
use uuid::Uuid;

use crate::metrics;
use crate::rating::RatingChange;
use crate::sim::{MatchResult, Snapshot};

/// How long an entry waits for an opponent before it is dropped.
pub const QUEUE_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    Ranked,
    Friendly,
}

impl MatchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchMode::Ranked => "ranked",
            MatchMode::Friendly => "friendly",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ranked" => Some(MatchMode::Ranked),
            "friendly" => Some(MatchMode::Friendly),
            _ => None,
        }
    }

    pub fn is_ranked(self) -> bool {
        self == MatchMode::Ranked
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QueueKey {
    pub scope: String,
    pub mode: MatchMode,
}

/// Messages delivered to a player through their reply sink.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueNotice {
    Queued {
        entry_id: Uuid,
        timeout_secs: u64,
    },
    MatchFound {
        opponent: String,
    },
    TimedOut {
        waited_secs: i64,
    },
    Snapshot(Snapshot),
    Finished {
        result: MatchResult,
        rating: Option<RatingChange>,
        rating_error: Option<String>,
    },
    Error {
        message: String,
    },
}

impl QueueNotice {
    /// No further notices follow this one for the same request.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueueNotice::TimedOut { .. } | QueueNotice::Finished { .. } | QueueNotice::Error { .. }
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("reply channel closed")]
    Closed,
}

/// Where the queue delivers notices for a waiting player.
///
/// The channel behind a sink may disappear at any time (the player disconnected).
/// Callers go through [`notify`], which logs and drops delivery failures.
pub trait ReplySink: Send + Sync {
    fn update(&self, notice: QueueNotice) -> Result<(), SinkError>;
}

impl ReplySink for UnboundedSender<QueueNotice> {
    fn update(&self, notice: QueueNotice) -> Result<(), SinkError> {
        self.send(notice).map_err(|_| SinkError::Closed)
    }
}

/// Deliver a notice, swallowing sink errors.
pub fn notify(sink: &dyn ReplySink, notice: QueueNotice) {
    if let Err(e) = sink.update(notice) {
        metrics::SINK_FAILURES_TOTAL.inc();
        tracing::warn!(error = %e, "Dropping queue notification");
    }
}

/// A player waiting for (or just paired with) an opponent.
#[derive(Clone)]
pub struct QueueEntry {
    pub id: Uuid,
    pub scope: String,
    pub mode: MatchMode,
    pub player_id: String,
    pub enqueued_at: DateTime<Utc>,
    pub sink: Arc<dyn ReplySink>,
}

impl fmt::Debug for QueueEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueEntry")
            .field("id", &self.id)
            .field("scope", &self.scope)
            .field("mode", &self.mode)
            .field("player_id", &self.player_id)
            .field("enqueued_at", &self.enqueued_at)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum EnqueueOutcome {
    /// The player already has a waiting entry for this key; nothing changed.
    AlreadyQueued,
    /// Paired with the oldest waiting entry, which has been removed.
    Matched(QueueEntry),
    /// No opponent yet; the new entry is waiting.
    Queued(QueueEntry),
}

/// Depth of one queue key.
#[derive(Debug, Clone, Serialize)]
pub struct QueueStatus {
    pub scope: String,
    pub mode: MatchMode,
    pub depth: usize,
}

struct Waiting {
    entry: QueueEntry,
    expiry: AbortHandle,
}

type Queues = HashMap<QueueKey, VecDeque<Waiting>>;

/// Thread-safe matchmaking queue.
///
/// Every mutation (enqueue, pop, leave, expire) runs under one lock, so an entry
/// is removed exactly once: either paired or expired, never both.
#[derive(Clone)]
pub struct MatchQueue {
    inner: Arc<Mutex<Queues>>,
    timeout: Duration,
}

impl MatchQueue {
    pub fn new() -> Self {
        Self::with_timeout(QUEUE_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Pair `player_id` with the oldest waiting player, or start waiting.
    ///
    /// Must be called from within a tokio runtime; a queued entry spawns its
    /// expiry timer.
    pub fn enqueue_or_match(
        &self,
        scope: &str,
        mode: MatchMode,
        player_id: &str,
        sink: Arc<dyn ReplySink>,
    ) -> EnqueueOutcome {
        let key = QueueKey {
            scope: scope.to_string(),
            mode,
        };

        let mut queues = self.inner.lock().unwrap();
        let waiting = queues.entry(key.clone()).or_default();

        if waiting.iter().any(|w| w.entry.player_id == player_id) {
            return EnqueueOutcome::AlreadyQueued;
        }

        if let Some(oldest) = waiting.pop_front() {
            // Cancelled under the lock: a timer that already woke will find the
            // entry gone and do nothing.
            oldest.expiry.abort();
            if waiting.is_empty() {
                queues.remove(&key);
            }
            refresh_depth(&queues, mode);
            drop(queues);

            metrics::QUEUE_MATCHED_TOTAL
                .with_label_values(&[mode.as_str()])
                .inc();
            tracing::info!(
                scope,
                mode = %mode,
                home = %oldest.entry.player_id,
                away = player_id,
                "Queue paired players"
            );
            notify(
                oldest.entry.sink.as_ref(),
                QueueNotice::MatchFound {
                    opponent: player_id.to_string(),
                },
            );
            return EnqueueOutcome::Matched(oldest.entry);
        }

        let entry = QueueEntry {
            id: Uuid::new_v4(),
            scope: scope.to_string(),
            mode,
            player_id: player_id.to_string(),
            enqueued_at: Utc::now(),
            sink,
        };

        let queue = self.clone();
        let timeout = self.timeout;
        let expire_key = key.clone();
        let entry_id = entry.id;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            queue.expire(&expire_key, entry_id);
        });

        waiting.push_back(Waiting {
            entry: entry.clone(),
            expiry: timer.abort_handle(),
        });
        refresh_depth(&queues, mode);
        drop(queues);

        metrics::QUEUE_ENQUEUED_TOTAL
            .with_label_values(&[mode.as_str()])
            .inc();
        tracing::info!(scope, mode = %mode, player = player_id, "Player queued");
        notify(
            entry.sink.as_ref(),
            QueueNotice::Queued {
                entry_id: entry.id,
                timeout_secs: self.timeout.as_secs(),
            },
        );
        EnqueueOutcome::Queued(entry)
    }

    /// Withdraw a waiting player. Returns false if they were not queued.
    pub fn leave(&self, scope: &str, mode: MatchMode, player_id: &str) -> bool {
        let key = QueueKey {
            scope: scope.to_string(),
            mode,
        };
        let mut queues = self.inner.lock().unwrap();
        let Some(removed) = take_where(&mut queues, &key, |e| e.player_id == player_id) else {
            return false;
        };
        removed.expiry.abort();
        refresh_depth(&queues, mode);
        tracing::info!(scope, mode = %mode, player = player_id, "Player left queue");
        true
    }

    /// Timer callback. A no-op unless the entry is still waiting.
    fn expire(&self, key: &QueueKey, entry_id: Uuid) {
        let mut queues = self.inner.lock().unwrap();
        let Some(removed) = take_where(&mut queues, key, |e| e.id == entry_id) else {
            return;
        };
        refresh_depth(&queues, key.mode);
        drop(queues);

        let entry = removed.entry;
        metrics::QUEUE_EXPIRED_TOTAL
            .with_label_values(&[key.mode.as_str()])
            .inc();
        tracing::info!(
            scope = %entry.scope,
            mode = %entry.mode,
            player = %entry.player_id,
            "Queue entry expired without an opponent"
        );
        notify(
            entry.sink.as_ref(),
            QueueNotice::TimedOut {
                waited_secs: (Utc::now() - entry.enqueued_at).num_seconds(),
            },
        );
    }

    /// Number of players waiting for one key.
    pub fn depth(&self, scope: &str, mode: MatchMode) -> usize {
        let queues = self.inner.lock().unwrap();
        queues
            .get(&QueueKey {
                scope: scope.to_string(),
                mode,
            })
            .map_or(0, VecDeque::len)
    }

    pub fn is_queued(&self, scope: &str, mode: MatchMode, player_id: &str) -> bool {
        let queues = self.inner.lock().unwrap();
        queues
            .get(&QueueKey {
                scope: scope.to_string(),
                mode,
            })
            .is_some_and(|q| q.iter().any(|w| w.entry.player_id == player_id))
    }

    /// Depth of every non-empty key, sorted by scope then mode.
    pub fn status(&self) -> Vec<QueueStatus> {
        let queues = self.inner.lock().unwrap();
        let mut status: Vec<QueueStatus> = queues
            .iter()
            .filter(|(_, q)| !q.is_empty())
            .map(|(key, q)| QueueStatus {
                scope: key.scope.clone(),
                mode: key.mode,
                depth: q.len(),
            })
            .collect();
        status.sort_by(|a, b| {
            a.scope
                .cmp(&b.scope)
                .then_with(|| a.mode.as_str().cmp(b.mode.as_str()))
        });
        status
    }
}

impl Default for MatchQueue {
    fn default() -> Self {
        Self::new()
    }
}

fn take_where(
    queues: &mut Queues,
    key: &QueueKey,
    pred: impl Fn(&QueueEntry) -> bool,
) -> Option<Waiting> {
    let waiting = queues.get_mut(key)?;
    let idx = waiting.iter().position(|w| pred(&w.entry))?;
    let removed = waiting.remove(idx);
    if waiting.is_empty() {
        queues.remove(key);
    }
    removed
}

fn refresh_depth(queues: &Queues, mode: MatchMode) {
    let depth: usize = queues
        .iter()
        .filter(|(k, _)| k.mode == mode)
        .map(|(_, q)| q.len())
        .sum();
    metrics::QUEUE_DEPTH
        .with_label_values(&[mode.as_str()])
        .set(depth as i64);
}
