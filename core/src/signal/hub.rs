//! Process-wide coordination hub for concurrent workers.

use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::json;
use tokio::sync::watch;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::types::{Signal, SignalType};

/// Signals retained for diagnostics; oldest evicted first.
const MAX_HISTORY: usize = 100;

type Subscriber = Arc<dyn Fn(&Signal) + Send + Sync>;

/// Handle returned by [`SignalHub::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// RAII concurrency permit. Dropping it releases the slot back to the pool
/// it was acquired from, even if that pool has since been replaced.
pub struct SlotPermit {
    _permit: Option<OwnedSemaphorePermit>,
}

/// Coordination hub shared by every concurrent worker of a batch run.
///
/// Owns the pause/stop/cache-disabled switches, a bounded signal history, a
/// subscriber registry and the concurrency permit pool. Constructed
/// explicitly and shared via `Arc`; there is no hidden global instance.
/// `reset()` restores a fresh run's defaults between batches.
pub struct SignalHub {
    paused: watch::Sender<bool>,
    stopped: AtomicBool,
    cache_disabled: AtomicBool,

    history: Mutex<VecDeque<Signal>>,
    subscribers: Mutex<HashMap<SignalType, Vec<(u64, Subscriber)>>>,
    next_sub_id: AtomicU64,

    // Replaced wholesale by set_concurrency; workers clone the Arc before
    // awaiting so outstanding permits survive a swap.
    pool: Mutex<Arc<Semaphore>>,
    concurrency: AtomicUsize,
}

impl Default for SignalHub {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalHub {
    pub fn new() -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            paused,
            stopped: AtomicBool::new(false),
            cache_disabled: AtomicBool::new(false),
            history: Mutex::new(VecDeque::with_capacity(MAX_HISTORY)),
            subscribers: Mutex::new(HashMap::new()),
            next_sub_id: AtomicU64::new(1),
            // Until a limit is installed, admission is effectively unbounded.
            pool: Mutex::new(Arc::new(Semaphore::new(Semaphore::MAX_PERMITS))),
            concurrency: AtomicUsize::new(0),
        }
    }

    // ========== state transitions ==========

    pub fn pause(&self) {
        self.paused.send_replace(true);
        self.broadcast(Signal::new(SignalType::Pause));
    }

    pub fn resume(&self) {
        self.paused.send_replace(false);
        self.broadcast(Signal::new(SignalType::Resume));
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.broadcast(Signal::new(SignalType::Stop));
    }

    pub fn disable_cache(&self) {
        self.cache_disabled.store(true, Ordering::SeqCst);
        self.broadcast(Signal::new(SignalType::DisableCache));
    }

    pub fn enable_cache(&self) {
        self.cache_disabled.store(false, Ordering::SeqCst);
    }

    /// Restore defaults and clear history between independent batch runs so
    /// stale pause/stop state cannot leak into the next one. Subscribers and
    /// the permit pool survive a reset.
    pub fn reset(&self) {
        self.paused.send_replace(false);
        self.stopped.store(false, Ordering::SeqCst);
        self.cache_disabled.store(false, Ordering::SeqCst);
        self.lock_history().clear();
    }

    // ========== state queries ==========

    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    /// Cheap stop check; workers call this at every safe cancellation point.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn is_cache_disabled(&self) -> bool {
        self.cache_disabled.load(Ordering::SeqCst)
    }

    /// Suspend until resumed. Returns immediately when not paused.
    pub async fn wait_if_paused(&self) {
        let mut rx = self.paused.subscribe();
        // Error means the sender is gone, which cannot outlive self.
        let _ = rx.wait_for(|paused| !*paused).await;
    }

    // ========== concurrency control ==========

    /// Install a fresh permit pool of the given size. Permits already held
    /// from the previous pool stay valid until released; the new limit
    /// applies to new acquisitions only.
    pub fn set_concurrency(&self, limit: usize) {
        let limit = limit.max(1);
        *self.lock_pool() = Arc::new(Semaphore::new(limit));
        self.concurrency.store(limit, Ordering::SeqCst);
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency.load(Ordering::SeqCst)
    }

    /// Acquire an execution slot; suspends until one is free.
    pub async fn acquire_slot(&self) -> SlotPermit {
        let sem = self.lock_pool().clone();
        match sem.acquire_owned().await {
            Ok(permit) => SlotPermit {
                _permit: Some(permit),
            },
            // The hub never closes its pools; treat a closed pool as an
            // immediately-released slot rather than panicking a worker.
            Err(_) => SlotPermit { _permit: None },
        }
    }

    /// Free permits in the current pool (diagnostics only).
    pub fn available_slots(&self) -> usize {
        self.lock_pool().available_permits()
    }

    // ========== broadcast ==========

    /// Subscribe to one signal type. The callback may fire concurrently from
    /// any worker; it must not block.
    pub fn subscribe(
        &self,
        signal_type: SignalType,
        callback: impl Fn(&Signal) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = self.next_sub_id.fetch_add(1, Ordering::Relaxed);
        self.lock_subscribers()
            .entry(signal_type)
            .or_default()
            .push((id, Arc::new(callback)));
        SubscriptionId(id)
    }

    pub fn unsubscribe(&self, signal_type: SignalType, id: SubscriptionId) {
        if let Some(subs) = self.lock_subscribers().get_mut(&signal_type) {
            subs.retain(|(sub_id, _)| *sub_id != id.0);
        }
    }

    /// Tell peers a provider started rate limiting. Peers are free to ignore
    /// it or throttle themselves; nothing is enforced.
    pub fn broadcast_rate_limit(&self, source: &str, retry_after_secs: u64) {
        self.broadcast(
            Signal::new(SignalType::RateLimitHit)
                .with_payload(json!({ "retry_after_secs": retry_after_secs }))
                .with_source(source),
        );
    }

    pub fn broadcast_api_switch(&self, old_api: &str, new_api: &str) {
        self.broadcast(
            Signal::new(SignalType::SwitchApi)
                .with_payload(json!({ "old_api": old_api, "new_api": new_api })),
        );
    }

    /// Snapshot of the bounded signal history, oldest first.
    pub fn history(&self) -> Vec<Signal> {
        self.lock_history().iter().cloned().collect()
    }

    fn broadcast(&self, signal: Signal) {
        {
            let mut h = self.lock_history();
            if h.len() == MAX_HISTORY {
                h.pop_front();
            }
            h.push_back(signal.clone());
        }

        // Snapshot under the lock, invoke outside it: a subscriber is allowed
        // to call back into the hub.
        let subs: Vec<Subscriber> = self
            .lock_subscribers()
            .get(&signal.signal_type)
            .map(|v| v.iter().map(|(_, cb)| cb.clone()).collect())
            .unwrap_or_default();

        for cb in subs {
            if catch_unwind(AssertUnwindSafe(|| cb(&signal))).is_err() {
                tracing::warn!(
                    signal = ?signal.signal_type,
                    "Signal subscriber panicked; continuing"
                );
            }
        }
    }

    fn lock_history(&self) -> MutexGuard<'_, VecDeque<Signal>> {
        match self.history.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_subscribers(&self) -> MutexGuard<'_, HashMap<SignalType, Vec<(u64, Subscriber)>>> {
        match self.subscribers.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_pool(&self) -> MutexGuard<'_, Arc<Semaphore>> {
        match self.pool.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
