//! Pre-allocated result aggregation for high fan-out.
//!
//! When hundreds of concurrent requests come back out of order, appending and
//! re-sorting fragments allocation storms. Instead, every result gets a slot
//! reserved before launch and is written straight into place; ordered
//! extraction is then a single pass over the prepared order.

mod indexed;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

pub use indexed::IndexedResultBuffer;

/// Payloads report an approximate byte size for slot accounting.
pub trait ByteSized {
    fn byte_len(&self) -> usize {
        0
    }
}

impl ByteSized for String {
    fn byte_len(&self) -> usize {
        self.len()
    }
}

/// Terminal-or-pending state of one slot. Terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug)]
struct Slot<T> {
    status: SlotStatus,
    payload: Option<T>,
    byte_size: usize,
}

/// Aggregate counters returned by [`ResultBuffer::finalize`] and passed to
/// the completion callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferStats {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub success_rate: f64,
}

struct Inner<T> {
    /// Slot ids in prepare order; extraction follows this, never arrival.
    order: Vec<String>,
    slots: HashMap<String, Slot<T>>,
    completed: usize,
    failed: usize,
    prepared: bool,
}

type CompleteCallback = Box<dyn Fn(BufferStats) + Send + Sync>;

/// Write-once-per-slot result buffer.
///
/// `prepare()` fixes the slot set; `write()` moves a slot to a terminal
/// state exactly once. Writes for distinct ids are independent and
/// commutative; a second write to the same id is ignored, never an
/// overwrite, so a stale late arrival cannot clobber the first result.
pub struct ResultBuffer<T> {
    inner: Mutex<Inner<T>>,
    on_complete: Mutex<Option<CompleteCallback>>,
}

impl<T: Clone + ByteSized> Default for ResultBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + ByteSized> ResultBuffer<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                order: Vec::new(),
                slots: HashMap::new(),
                completed: 0,
                failed: 0,
                prepared: false,
            }),
            on_complete: Mutex::new(None),
        }
    }

    /// Callback fired once, when the final slot reaches a terminal state.
    /// Invoked after the buffer's lock is released, so it may call back in.
    pub fn set_on_complete(&self, callback: impl Fn(BufferStats) + Send + Sync + 'static) {
        *self.lock_callback() = Some(Box::new(callback));
    }

    /// Allocate one pending slot per id, in the given order, discarding any
    /// previous state. Must be called before any `write`.
    pub fn prepare<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut inner = self.lock();
        inner.order.clear();
        inner.slots.clear();
        inner.completed = 0;
        inner.failed = 0;
        inner.prepared = true;

        for id in ids {
            let id = id.into();
            if inner.slots.contains_key(&id) {
                continue;
            }
            inner.order.push(id.clone());
            inner.slots.insert(
                id,
                Slot {
                    status: SlotStatus::Pending,
                    payload: None,
                    byte_size: 0,
                },
            );
        }
    }

    /// Record a payload into its slot and mark it terminal.
    ///
    /// Returns true iff this write made the buffer fully resolved. Unknown
    /// ids return false with no side effects; writes to an already-terminal
    /// slot are ignored and do not change the counters.
    ///
    /// Panics if called before `prepare()` — that is a programming error,
    /// not a runtime condition.
    pub fn write(&self, id: &str, payload: T, success: bool) -> bool {
        let (became_done, stats) = {
            let mut inner = self.lock();
            assert!(inner.prepared, "ResultBuffer::write before prepare()");

            let Some(slot) = inner.slots.get_mut(id) else {
                return false;
            };
            if slot.status != SlotStatus::Pending {
                return false;
            }

            slot.byte_size = payload.byte_len();
            slot.payload = Some(payload);
            slot.status = if success {
                SlotStatus::Completed
            } else {
                SlotStatus::Failed
            };

            if success {
                inner.completed += 1;
            } else {
                inner.failed += 1;
            }

            let done = inner.completed + inner.failed >= inner.order.len();
            (done, Self::stats_of(&inner))
        };

        // Callback outside the lock to avoid re-entrant deadlock.
        if became_done {
            if let Some(cb) = self.lock_callback().as_ref() {
                cb(stats);
            }
        }

        became_done
    }

    /// (completed, failed, total) snapshot.
    pub fn progress(&self) -> (usize, usize, usize) {
        let inner = self.lock();
        (inner.completed, inner.failed, inner.order.len())
    }

    pub fn is_all_done(&self) -> bool {
        let inner = self.lock();
        inner.completed + inner.failed >= inner.order.len()
    }

    /// Successfully completed payloads, in prepare order.
    pub fn completed_payloads_in_order(&self) -> Vec<T> {
        let inner = self.lock();
        inner
            .order
            .iter()
            .filter_map(|id| {
                let slot = inner.slots.get(id)?;
                if slot.status == SlotStatus::Completed {
                    slot.payload.clone()
                } else {
                    None
                }
            })
            .collect()
    }

    /// Every slot in prepare order, `None` standing in for slots that never
    /// reached `Completed`.
    pub fn all_payloads_ordered(&self) -> Vec<(String, Option<T>)> {
        let inner = self.lock();
        inner
            .order
            .iter()
            .map(|id| {
                let payload = inner
                    .slots
                    .get(id)
                    .and_then(|s| s.payload.clone());
                (id.clone(), payload)
            })
            .collect()
    }

    /// Total bytes held across terminal slots.
    pub fn byte_size(&self) -> usize {
        let inner = self.lock();
        inner.slots.values().map(|s| s.byte_size).sum()
    }

    pub fn finalize(&self) -> BufferStats {
        let inner = self.lock();
        Self::stats_of(&inner)
    }

    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.order.clear();
        inner.slots.clear();
        inner.completed = 0;
        inner.failed = 0;
        inner.prepared = false;
    }

    fn stats_of(inner: &Inner<T>) -> BufferStats {
        let total = inner.order.len();
        BufferStats {
            total,
            completed: inner.completed,
            failed: inner.failed,
            success_rate: if total > 0 {
                inner.completed as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_callback(&self) -> MutexGuard<'_, Option<CompleteCallback>> {
        match self.on_complete.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
