//! Per-file indexed variant of the result buffer.
//!
//! Groups slots by source file so one file's completion can be observed (and
//! its output flushed) while sibling files are still in flight.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct FileGroup {
    /// item_index -> translated text; `None` until first write.
    results: HashMap<u32, Option<String>>,
    pending: usize,
    completed: usize,
}

/// Index-keyed result collector grouped by an outer key (file path).
///
/// First write per index counts toward completion; rewrites are kept but
/// never double-credited, so `write_batch` with overlapping indices stays
/// accurate.
#[derive(Default)]
pub struct IndexedResultBuffer {
    files: Mutex<HashMap<String, FileGroup>>,
}

impl IndexedResultBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve slots for every translatable index of one file.
    pub fn prepare_file(&self, file_path: &str, indices: &[u32]) {
        let mut files = self.lock();
        let group = FileGroup {
            results: indices.iter().map(|&i| (i, None)).collect(),
            pending: indices.len(),
            completed: 0,
        };
        files.insert(file_path.to_string(), group);
    }

    /// Write one result. Returns true iff the file is now complete.
    pub fn write_result(&self, file_path: &str, index: u32, text: String) -> bool {
        let mut files = self.lock();
        let Some(group) = files.get_mut(file_path) else {
            return false;
        };
        let Some(slot) = group.results.get_mut(&index) else {
            return false;
        };
        if slot.is_none() {
            group.completed += 1;
        }
        *slot = Some(text);
        group.completed >= group.pending
    }

    /// Apply a batch of results under one lock acquisition. Indices unknown
    /// to the file are skipped; each slot is credited at most once.
    pub fn write_batch(&self, file_path: &str, results: &HashMap<u32, String>) -> bool {
        let mut files = self.lock();
        let Some(group) = files.get_mut(file_path) else {
            return false;
        };
        for (index, text) in results {
            if let Some(slot) = group.results.get_mut(index) {
                if slot.is_none() {
                    group.completed += 1;
                }
                *slot = Some(text.clone());
            }
        }
        group.completed >= group.pending
    }

    /// (completed, total) for one file; (0, 0) if unknown.
    pub fn file_progress(&self, file_path: &str) -> (usize, usize) {
        let files = self.lock();
        files
            .get(file_path)
            .map(|g| (g.completed, g.pending))
            .unwrap_or((0, 0))
    }

    /// All results written so far for one file.
    pub fn file_results(&self, file_path: &str) -> HashMap<u32, String> {
        let files = self.lock();
        files
            .get(file_path)
            .map(|g| {
                g.results
                    .iter()
                    .filter_map(|(&i, t)| t.clone().map(|t| (i, t)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_file_complete(&self, file_path: &str) -> bool {
        let files = self.lock();
        files
            .get(file_path)
            .map(|g| g.completed >= g.pending)
            .unwrap_or(false)
    }

    /// (completed, total) summed over every prepared file.
    pub fn total_progress(&self) -> (usize, usize) {
        let files = self.lock();
        let completed = files.values().map(|g| g.completed).sum();
        let pending = files.values().map(|g| g.pending).sum();
        (completed, pending)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, FileGroup>> {
        match self.files.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
