//! Execution history of scheduled runs, kept in memory for the status API.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::run::RunSummary;

const MAX_ENTRIES: usize = 30;

/// A record of a scheduled detection run.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub summary: Option<RunSummary>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    Success,
    Failed,
}

/// Most recent runs, newest first. Cheap to clone and share.
#[derive(Debug, Clone, Default)]
pub struct RunHistory {
    entries: Arc<RwLock<VecDeque<HistoryEntry>>>,
}

impl RunHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, entry: HistoryEntry) {
        let mut entries = self.entries.write().await;
        entries.push_front(entry);
        entries.truncate(MAX_ENTRIES);
    }

    pub async fn latest(&self) -> Option<HistoryEntry> {
        self.entries.read().await.front().cloned()
    }

    pub async fn list(&self) -> Vec<HistoryEntry> {
        self.entries.read().await.iter().cloned().collect()
    }
}
