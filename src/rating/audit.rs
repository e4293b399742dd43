//! Append-only audit log of rating updates
//!
//! Every applied match produces one [`MatchAuditEntry`]. Entries are never
//! mutated once appended; downstream reporting (history charts, per-team
//! timelines) reads them back from the sink. A scope rebuild drops the scope's
//! entries before replaying it again.

use crate::error::{RatingError, Result};
use crate::types::{MatchAuditEntry, MatchUpdateRecord, ScopeId, TeamId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Sink for match update records
pub trait UpdateSink: Send + Sync {
    /// Append one match's records
    fn append(&self, entry: MatchAuditEntry) -> Result<()>;

    /// Drop every entry of a scope, returning how many were removed
    fn clear_scope(&self, scope_id: &ScopeId) -> Result<usize>;
}

/// One point of a team's rating history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamHistoryPoint {
    pub played_at: DateTime<Utc>,
    pub record: MatchUpdateRecord,
}

/// In-memory audit log
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    entries: RwLock<Vec<MatchAuditEntry>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> Result<Vec<MatchAuditEntry>> {
        self.entries.read().map(|entries| entries.clone()).map_err(|_| {
            RatingError::StorageError {
                message: "Failed to acquire audit log read lock".to_string(),
            }
            .into()
        })
    }

    /// Entries of one scope in append order
    pub fn entries(&self, scope_id: &ScopeId) -> Result<Vec<MatchAuditEntry>> {
        Ok(self
            .snapshot()?
            .into_iter()
            .filter(|entry| &entry.scope_id == scope_id)
            .collect())
    }

    /// Before/after series for one team, for history charts
    pub fn team_history(
        &self,
        scope_id: &ScopeId,
        team_id: &TeamId,
    ) -> Result<Vec<TeamHistoryPoint>> {
        let history = self
            .entries(scope_id)?
            .into_iter()
            .filter_map(|entry| {
                let played_at = entry.played_at;
                // A team filling several slots is committed from its last record
                entry
                    .records
                    .into_iter()
                    .filter(|record| &record.team_id == team_id)
                    .last()
                    .map(|record| TeamHistoryPoint { played_at, record })
            })
            .collect();

        Ok(history)
    }

    /// Total number of entries across all scopes
    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl UpdateSink for InMemoryAuditLog {
    fn append(&self, entry: MatchAuditEntry) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| RatingError::StorageError {
            message: "Failed to acquire audit log write lock".to_string(),
        })?;

        entries.push(entry);
        Ok(())
    }

    fn clear_scope(&self, scope_id: &ScopeId) -> Result<usize> {
        let mut entries = self.entries.write().map_err(|_| RatingError::StorageError {
            message: "Failed to acquire audit log write lock".to_string(),
        })?;

        let before = entries.len();
        entries.retain(|entry| &entry.scope_id != scope_id);
        Ok(before - entries.len())
    }
}
