//! Scoped rating service
//!
//! Drives the replay engine against injected collaborators: a rating store, an
//! audit sink and metrics. Each scope has its own async lock, so only one
//! writer touches a scope's ratings at a time, while different scopes are
//! rebuilt in parallel on blocking worker threads.

use crate::config::ReplaySettings;
use crate::error::{RatingError, Result};
use crate::metrics::ReplayMetrics;
use crate::rating::audit::UpdateSink;
use crate::rating::storage::RatingStore;
use crate::rating::updater::{confidence_from_uncertainty, DEFAULT_CONFIDENCE_BASE};
use crate::replay::engine::{
    MatchReplayEngine, ReplayControl, ReplaySession, SkippedMatch, StepOutcome,
};
use crate::replay::history::{sort_chronologically, MatchRecord};
use crate::types::{ScopeId, TeamId, TeamRatingState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Outcome of replaying (part of) one scope's history
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaySummary {
    pub scope_id: ScopeId,
    pub applied: usize,
    pub skipped: Vec<SkippedMatch>,
    /// Index to pass back in to resume an interrupted replay
    pub next_index: usize,
    pub interrupted: bool,
}

impl ReplaySummary {
    /// Error out if the replay stopped before the end of its history
    pub fn ensure_complete(&self) -> Result<()> {
        if self.interrupted {
            return Err(RatingError::ReplayInterrupted {
                scope_id: self.scope_id.clone(),
                next_index: self.next_index,
            }
            .into());
        }
        Ok(())
    }
}

/// One row of a scope leaderboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub team_id: TeamId,
    pub rating: f64,
    pub uncertainty: f64,
    pub matches_played: u32,
    /// Display confidence in percent
    pub confidence: u8,
}

/// Per-scope state held under the scope lock
#[derive(Debug, Default)]
struct ScopeCursor {
    /// Timestamp of the last match committed to the scope
    last_played_at: Option<DateTime<Utc>>,
}

/// Rating service over a store, an audit sink and the replay engine
#[derive(Clone)]
pub struct RatingService {
    engine: MatchReplayEngine,
    store: Arc<dyn RatingStore>,
    sink: Arc<dyn UpdateSink>,
    metrics: ReplayMetrics,
    settings: ReplaySettings,
    scope_locks: Arc<Mutex<HashMap<ScopeId, Arc<AsyncMutex<ScopeCursor>>>>>,
}

impl RatingService {
    pub fn new(
        engine: MatchReplayEngine,
        store: Arc<dyn RatingStore>,
        sink: Arc<dyn UpdateSink>,
        metrics: ReplayMetrics,
        settings: ReplaySettings,
    ) -> Self {
        Self {
            engine,
            store,
            sink,
            metrics,
            settings,
            scope_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn engine(&self) -> &MatchReplayEngine {
        &self.engine
    }

    pub fn metrics(&self) -> &ReplayMetrics {
        &self.metrics
    }

    fn scope_lock(&self, scope_id: &ScopeId) -> Result<Arc<AsyncMutex<ScopeCursor>>> {
        let mut locks = self
            .scope_locks
            .lock()
            .map_err(|_| RatingError::InternalError {
                message: "Failed to acquire scope lock registry".to_string(),
            })?;

        Ok(locks
            .entry(scope_id.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(ScopeCursor::default())))
            .clone())
    }

    /// Apply a single new match to a scope's current ratings
    pub async fn ingest_match(
        &self,
        scope_id: &ScopeId,
        record: MatchRecord,
    ) -> Result<StepOutcome> {
        let lock = self.scope_lock(scope_id)?;
        let mut cursor = lock.lock().await;

        let mut seed = HashMap::new();
        for team_id in record.participants() {
            if let Some(state) = self.store.get(scope_id, team_id)? {
                seed.insert(team_id.clone(), state);
            }
        }

        let matches = std::slice::from_ref(&record);
        let mut session =
            ReplaySession::new(self.engine.calculator(), scope_id.clone(), matches, seed)
                .with_last_played_at(cursor.last_played_at);

        match session.step() {
            Some(outcome) => {
                self.commit(scope_id, &outcome, session.ratings())?;
                cursor.last_played_at = session.last_played_at();
                self.metrics.record_out_of_order(session.out_of_order());
                Ok(outcome)
            }
            None => Err(RatingError::InternalError {
                message: "Single-match session produced no step".to_string(),
            }
            .into()),
        }
    }

    /// Clear a scope and replay its whole history from default ratings
    pub async fn rebuild_scope(
        &self,
        scope_id: &ScopeId,
        history: Vec<MatchRecord>,
        control: ReplayControl,
    ) -> Result<ReplaySummary> {
        self.run_scope(scope_id.clone(), history, 0, true, control).await
    }

    /// Continue an interrupted rebuild from the ratings already committed
    pub async fn resume_scope(
        &self,
        scope_id: &ScopeId,
        history: Vec<MatchRecord>,
        start_index: usize,
        control: ReplayControl,
    ) -> Result<ReplaySummary> {
        self.run_scope(scope_id.clone(), history, start_index, false, control)
            .await
    }

    /// Rebuild several independent scopes concurrently
    pub async fn rebuild_scopes(
        &self,
        histories: HashMap<ScopeId, Vec<MatchRecord>>,
        control: ReplayControl,
    ) -> Result<Vec<ReplaySummary>> {
        let permits = Arc::new(Semaphore::new(self.settings.max_concurrent_scopes));
        let mut tasks = JoinSet::new();

        for (scope_id, history) in histories {
            let service = self.clone();
            let permits = permits.clone();
            let control = control.clone();

            tasks.spawn(async move {
                service
                    .run_scope_bounded(permits, scope_id, history, control)
                    .await
            });
        }

        let mut summaries = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let summary = joined.map_err(|e| RatingError::InternalError {
                message: format!("Scope replay task failed: {}", e),
            })??;
            summaries.push(summary);
        }

        summaries.sort_by(|a, b| a.scope_id.cmp(&b.scope_id));
        Ok(summaries)
    }

    /// Seed a fresh default state for one team
    pub async fn reset_team(
        &self,
        scope_id: &ScopeId,
        team_id: &TeamId,
    ) -> Result<TeamRatingState> {
        let lock = self.scope_lock(scope_id)?;
        let _guard = lock.lock().await;

        self.store
            .reset_team(scope_id, team_id, self.engine.constants())
    }

    /// Scopes that currently hold ratings, sorted by id
    pub fn scopes(&self) -> Result<Vec<ScopeId>> {
        self.store.scopes()
    }

    /// Ratings of a scope, highest first
    pub fn leaderboard(&self, scope_id: &ScopeId) -> Result<Vec<LeaderboardEntry>> {
        let mut states: Vec<TeamRatingState> =
            self.store.scope_ratings(scope_id)?.into_values().collect();

        states.sort_by(|a, b| {
            b.rating
                .partial_cmp(&a.rating)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.team_id.cmp(&b.team_id))
        });

        Ok(states
            .into_iter()
            .enumerate()
            .map(|(i, state)| LeaderboardEntry {
                rank: i + 1,
                confidence: confidence_from_uncertainty(state.uncertainty, DEFAULT_CONFIDENCE_BASE),
                team_id: state.team_id,
                rating: state.rating,
                uncertainty: state.uncertainty,
                matches_played: state.matches_played,
            })
            .collect())
    }

    async fn run_scope_bounded(
        &self,
        permits: Arc<Semaphore>,
        scope_id: ScopeId,
        history: Vec<MatchRecord>,
        control: ReplayControl,
    ) -> Result<ReplaySummary> {
        let _permit = permits.acquire_owned().await?;
        self.run_scope(scope_id, history, 0, true, control).await
    }

    async fn run_scope(
        &self,
        scope_id: ScopeId,
        mut history: Vec<MatchRecord>,
        start_index: usize,
        reset: bool,
        control: ReplayControl,
    ) -> Result<ReplaySummary> {
        let lock = self.scope_lock(&scope_id)?;
        let mut cursor = lock.lock_owned().await;

        if self.settings.sort_input {
            sort_chronologically(&mut history);
        }
        if reset {
            let cleared = self.store.clear_scope(&scope_id)?;
            let dropped = self.sink.clear_scope(&scope_id)?;
            cursor.last_played_at = None;
            debug!(scope_id = %scope_id, cleared, dropped, "Cleared scope before rebuild");
        }

        let service = self.clone();
        tokio::task::spawn_blocking(move || {
            service.replay_blocking(
                &scope_id,
                &history,
                start_index,
                &control,
                &mut *cursor,
            )
        })
        .await
        .map_err(|e| RatingError::InternalError {
            message: format!("Replay worker failed: {}", e),
        })?
    }

    /// Replay on the current thread, committing after every match
    fn replay_blocking(
        &self,
        scope_id: &ScopeId,
        history: &[MatchRecord],
        start_index: usize,
        control: &ReplayControl,
        cursor: &mut ScopeCursor,
    ) -> Result<ReplaySummary> {
        let timer = self.metrics.start_timer();
        self.metrics.active_replays.inc();

        let result = self.drive(scope_id, history, start_index, control, cursor);

        self.metrics.active_replays.dec();
        let duration = timer.stop();
        self.metrics.record_replay(duration);

        if let Ok(summary) = &result {
            info!(
                scope_id = %scope_id,
                applied = summary.applied,
                skipped = summary.skipped.len(),
                interrupted = summary.interrupted,
                elapsed_ms = duration.as_millis() as u64,
                "Scope replay finished"
            );
        }

        result
    }

    fn drive(
        &self,
        scope_id: &ScopeId,
        history: &[MatchRecord],
        start_index: usize,
        control: &ReplayControl,
        cursor: &mut ScopeCursor,
    ) -> Result<ReplaySummary> {
        let seed = self.store.scope_ratings(scope_id)?;
        let mut session = ReplaySession::resume(
            self.engine.calculator(),
            scope_id.clone(),
            history,
            seed,
            start_index,
        )
        .with_last_played_at(cursor.last_played_at);

        let mut summary = ReplaySummary {
            scope_id: scope_id.clone(),
            applied: 0,
            skipped: Vec::new(),
            next_index: start_index,
            interrupted: false,
        };

        loop {
            if control.is_stopped() && session.next_index() < history.len() {
                warn!(
                    scope_id = %scope_id,
                    next_index = session.next_index(),
                    "Replay interrupted between matches"
                );
                summary.interrupted = true;
                break;
            }

            let Some(outcome) = session.step() else {
                break;
            };

            self.commit(scope_id, &outcome, session.ratings())?;
            cursor.last_played_at = session.last_played_at();
            match outcome {
                StepOutcome::Applied(_) => summary.applied += 1,
                StepOutcome::Skipped(skipped) => summary.skipped.push(skipped),
            }

            let interval = self.settings.progress_interval;
            if interval > 0 && session.next_index() % interval == 0 {
                info!(
                    scope_id = %scope_id,
                    processed = session.next_index(),
                    total = history.len(),
                    "Replay progress"
                );
            }
        }

        self.metrics.record_out_of_order(session.out_of_order());
        summary.next_index = session.next_index();
        Ok(summary)
    }

    /// Persist one step: changed ratings first, then the audit entry
    fn commit(
        &self,
        scope_id: &ScopeId,
        outcome: &StepOutcome,
        ratings: &HashMap<TeamId, TeamRatingState>,
    ) -> Result<()> {
        match outcome {
            StepOutcome::Applied(entry) => {
                let mut changed: Vec<TeamRatingState> = Vec::with_capacity(entry.records.len());
                for record in &entry.records {
                    if changed.iter().any(|s| s.team_id == record.team_id) {
                        continue;
                    }
                    if let Some(state) = ratings.get(&record.team_id) {
                        changed.push(state.clone());
                    }
                }

                self.store.store_many(scope_id, changed)?;
                self.sink.append(entry.clone())?;
                self.metrics
                    .record_applied(entry, self.engine.constants());
            }
            StepOutcome::Skipped(_) => self.metrics.record_skipped(),
        }
        Ok(())
    }
}
