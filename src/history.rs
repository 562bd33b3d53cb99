// Spin history: settled results, newest first, capped.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::types::{Category, Degrees, SessionId, Timestamp};

/// One settled spin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub session: SessionId,
    pub face_id: String,
    pub category: Category,
    pub final_angle: Degrees,
    pub at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinHistory {
    entries: VecDeque<HistoryEntry>,
    limit: usize,
}

impl SpinHistory {
    pub fn new(limit: usize) -> Self {
        SpinHistory {
            entries: VecDeque::with_capacity(limit.min(64)),
            limit,
        }
    }

    /// Add a result at the front, dropping the oldest beyond the limit.
    pub fn record(&mut self, entry: HistoryEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.limit);
    }

    pub fn remove(&mut self, index: usize) -> Option<HistoryEntry> {
        self.entries.remove(index)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
