//! Test fixtures and mock implementations for integration testing
#![allow(dead_code)]

use alliance_rating::config::{RatingConstants, ReplaySettings};
use alliance_rating::error::{RatingError, Result};
use alliance_rating::metrics::ReplayMetrics;
use alliance_rating::rating::{InMemoryRatingStore, RatingStore, UpdateSink};
use alliance_rating::replay::{MatchRecord, MatchReplayEngine};
use alliance_rating::service::RatingService;
use alliance_rating::types::{MatchAuditEntry, ScopeId, TeamId, TeamRatingState};
use chrono::{DateTime, Duration, TimeZone, Utc};
use mockall::mock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Fixed reference time so histories are reproducible
pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 23, 8, 30, 0).unwrap() + Duration::minutes(minutes)
}

pub fn match_record(
    minute: i64,
    alliance_a: &[&str],
    alliance_b: &[&str],
    score_a: u32,
    score_b: u32,
) -> MatchRecord {
    MatchRecord::new(Uuid::new_v4(), at(minute), alliance_a, alliance_b, score_a, score_b)
}

/// Pseudo-random 3v3 history over `teams` teams, fully determined by `seed`
pub fn generated_history(teams: usize, matches: usize, seed: u64) -> Vec<MatchRecord> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let mut next = move |bound: usize| -> usize {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((state >> 33) as usize) % bound
    };

    let ids: Vec<String> = (1..=teams).map(|n| format!("{}", n * 7)).collect();

    (0..matches)
        .map(|i| {
            let mut picked: Vec<&str> = Vec::with_capacity(6);
            while picked.len() < 6 {
                let candidate = ids[next(ids.len())].as_str();
                if !picked.contains(&candidate) {
                    picked.push(candidate);
                }
            }
            let score_a = next(120) as u32;
            let score_b = next(120) as u32;
            MatchRecord::new(
                Uuid::from_u128(i as u128 + 1),
                at(i as i64 * 8),
                &picked[..3],
                &picked[3..],
                score_a,
                score_b,
            )
        })
        .collect()
}

/// Update sink that captures every appended entry
#[derive(Debug, Default)]
pub struct CapturingSink {
    entries: Arc<Mutex<Vec<MatchAuditEntry>>>,
}

impl CapturingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<MatchAuditEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn count_for_scope(&self, scope_id: &str) -> usize {
        self.entries()
            .iter()
            .filter(|entry| entry.scope_id == scope_id)
            .count()
    }
}

impl UpdateSink for CapturingSink {
    fn append(&self, entry: MatchAuditEntry) -> Result<()> {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
        Ok(())
    }

    fn clear_scope(&self, scope_id: &ScopeId) -> Result<usize> {
        let mut removed = 0;
        if let Ok(mut entries) = self.entries.lock() {
            let before = entries.len();
            entries.retain(|entry| &entry.scope_id != scope_id);
            removed = before - entries.len();
        }
        Ok(removed)
    }
}

/// Update sink that rejects every entry
#[derive(Debug, Default)]
pub struct FailingSink;

impl UpdateSink for FailingSink {
    fn append(&self, _entry: MatchAuditEntry) -> Result<()> {
        Err(RatingError::StorageError {
            message: "audit log unavailable".to_string(),
        }
        .into())
    }

    fn clear_scope(&self, _scope_id: &ScopeId) -> Result<usize> {
        Ok(0)
    }
}

mock! {
    pub Store {}

    impl RatingStore for Store {
        fn get(&self, scope_id: &ScopeId, team_id: &TeamId) -> Result<Option<TeamRatingState>>;
        fn get_or_create(
            &self,
            scope_id: &ScopeId,
            team_id: &TeamId,
            constants: &RatingConstants,
        ) -> Result<TeamRatingState>;
        fn store(&self, scope_id: &ScopeId, state: TeamRatingState) -> Result<()>;
        fn store_many(&self, scope_id: &ScopeId, states: Vec<TeamRatingState>) -> Result<()>;
        fn scope_ratings(&self, scope_id: &ScopeId) -> Result<HashMap<TeamId, TeamRatingState>>;
        fn reset_team(
            &self,
            scope_id: &ScopeId,
            team_id: &TeamId,
            constants: &RatingConstants,
        ) -> Result<TeamRatingState>;
        fn clear_scope(&self, scope_id: &ScopeId) -> Result<usize>;
        fn scopes(&self) -> Result<Vec<ScopeId>>;
    }
}

/// Service over an in-memory store and a capturing sink
pub fn create_test_service(
    settings: ReplaySettings,
) -> (RatingService, Arc<InMemoryRatingStore>, Arc<CapturingSink>) {
    let store = Arc::new(InMemoryRatingStore::new());
    let sink = Arc::new(CapturingSink::new());
    let service = RatingService::new(
        MatchReplayEngine::default(),
        store.clone(),
        sink.clone(),
        ReplayMetrics::new().unwrap(),
        settings,
    );
    (service, store, sink)
}

/// Service over arbitrary collaborators with default settings
pub fn service_with(store: Arc<dyn RatingStore>, sink: Arc<dyn UpdateSink>) -> RatingService {
    RatingService::new(
        MatchReplayEngine::default(),
        store,
        sink,
        ReplayMetrics::new().unwrap(),
        ReplaySettings::default(),
    )
}
