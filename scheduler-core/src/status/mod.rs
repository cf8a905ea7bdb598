//! Inflight patch cache and writer pool for scheduling-condition updates
//! (spec §4.6). Concurrency model grounded directly on the teacher's
//! `SchedulingQueue`: a fixed tokio worker pool draining a dirty-set
//! wakeup channel, shared state behind `tokio::sync::Mutex`, generalized
//! from "pod priority queue" to "pending condition patch per pod group."
//!
//! A pod group re-patched before its previous write lands only ever writes
//! its latest condition list once — the pending map is keyed by pod-group
//! uid, and a fresh `enqueue` simply overwrites whatever hadn't been
//! flushed yet, the same coalescing the teacher gets from pods overwriting
//! their own heap entry by priority.

pub mod conditions;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};
use tokio::time::sleep;

use common::Uid;

use crate::config::BackoffConfig;
use crate::model::SchedulingCondition;

/// Seam to the out-of-scope status store (spec Non-goals: outward-facing
/// API server plumbing is not this crate's concern, only the interface).
pub trait StatusWriter: Send + Sync {
    fn write_conditions(&self, pod_group: &Uid, conditions: &[SchedulingCondition]) -> anyhow::Result<()>;
}

struct Pending {
    conditions: Vec<SchedulingCondition>,
    attempts: u32,
}

struct Inner {
    pending: Mutex<HashMap<Uid, Pending>>,
    dirty: Mutex<VecDeque<Uid>>,
    notify: Notify,
}

/// A running pool of status-writer workers plus the handle used to enqueue
/// patches. Dropping all clones of the handle does not stop the workers;
/// callers own the `Arc` for the session's lifetime.
#[derive(Clone)]
pub struct StatusUpdater {
    inner: Arc<Inner>,
}

impl StatusUpdater {
    pub fn spawn<W: StatusWriter + 'static>(writer: Arc<W>, workers: usize, backoff: BackoffConfig) -> Self {
        let inner = Arc::new(Inner {
            pending: Mutex::new(HashMap::new()),
            dirty: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        });
        for _ in 0..workers.max(1) {
            let inner = inner.clone();
            let writer = writer.clone();
            tokio::spawn(Self::worker_loop(inner, writer, backoff));
        }
        Self { inner }
    }

    /// Stages `conditions` (the pod group's full, already-collapsed list
    /// via `conditions::apply_condition`) for write, replacing whatever
    /// this pod group had pending.
    pub async fn enqueue(&self, pod_group: Uid, conditions: Vec<SchedulingCondition>) {
        let mut pending = self.inner.pending.lock().await;
        let already_dirty = pending.contains_key(&pod_group);
        pending.insert(pod_group.clone(), Pending { conditions, attempts: 0 });
        drop(pending);
        if !already_dirty {
            self.inner.dirty.lock().await.push_back(pod_group);
            self.inner.notify.notify_one();
        }
    }

    async fn worker_loop<W: StatusWriter>(inner: Arc<Inner>, writer: Arc<W>, backoff: BackoffConfig) {
        loop {
            let uid = Self::next_dirty(&inner).await;
            let Some(patch) = inner.pending.lock().await.remove(&uid) else {
                continue;
            };

            if let Err(err) = writer.write_conditions(&uid, &patch.conditions) {
                log::warn!("status write failed for {uid}: {err:#}, scheduling retry");
                Self::schedule_retry(&inner, uid, patch, &backoff);
            }
        }
    }

    async fn next_dirty(inner: &Inner) -> Uid {
        loop {
            if let Some(uid) = inner.dirty.lock().await.pop_front() {
                return uid;
            }
            inner.notify.notified().await;
        }
    }

    /// Re-marks `uid` dirty after an exponential backoff delay, unless a
    /// fresher patch has since arrived (in which case that patch's own
    /// `enqueue` call already handled re-dirtying and this one is a no-op).
    fn schedule_retry(inner: &Arc<Inner>, uid: Uid, patch: Pending, backoff: &BackoffConfig) {
        let attempts = patch.attempts + 1;
        let delay = backoff
            .base
            .saturating_mul(2_u32.saturating_pow(attempts))
            .min(backoff.max);
        let inner = inner.clone();
        tokio::spawn(async move {
            sleep(delay).await;
            let mut pending = inner.pending.lock().await;
            let newly_dirty = !pending.contains_key(&uid);
            pending.entry(uid.clone()).or_insert(Pending {
                conditions: patch.conditions,
                attempts,
            });
            drop(pending);
            if newly_dirty {
                inner.dirty.lock().await.push_back(uid);
                inner.notify.notify_one();
            }
        });
    }
}
