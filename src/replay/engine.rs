//! Sequential match replay
//!
//! Replay is a fold over an ordered match list: each step reads the current
//! rating of every participant from the accumulator, rates the match, and
//! commits the new states before the next step. Because every step consumes
//! the previous step's output, a history can only be reproduced by replaying
//! it in exactly the same order.

use crate::config::RatingConstants;
use crate::error::{RatingError, Result};
use crate::rating::calculator::{CreditSurpriseCalculator, RatingCalculator};
use crate::replay::history::MatchRecord;
use crate::types::{MatchAuditEntry, MatchId, ScopeId, TeamId, TeamRatingState};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifecycle of a replay session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayState {
    Idle,
    /// `match_index` is the next match to be processed
    Processing { match_index: usize },
    Done,
}

/// A match that could not be rated and was left out of the replay
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedMatch {
    pub index: usize,
    pub match_id: MatchId,
    pub reason: RatingError,
}

/// Result of processing one match
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Applied(MatchAuditEntry),
    Skipped(SkippedMatch),
}

/// Final state and audit trail of a completed replay
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayReport {
    pub final_states: HashMap<TeamId, TeamRatingState>,
    pub entries: Vec<MatchAuditEntry>,
    pub skipped: Vec<SkippedMatch>,
}

impl ReplayReport {
    /// Number of matches that produced rating updates
    pub fn applied(&self) -> usize {
        self.entries.len()
    }
}

/// Cooperative stop flag, honoured only between matches
#[derive(Debug, Clone, Default)]
pub struct ReplayControl {
    stopped: Arc<AtomicBool>,
}

impl ReplayControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every replay sharing this control to stop at the next match boundary
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Step-by-step replay over a borrowed match list
pub struct ReplaySession<'a> {
    calculator: &'a dyn RatingCalculator,
    scope_id: ScopeId,
    matches: &'a [MatchRecord],
    ratings: HashMap<TeamId, TeamRatingState>,
    next_index: usize,
    state: ReplayState,
    last_played_at: Option<DateTime<Utc>>,
    out_of_order: usize,
}

impl<'a> ReplaySession<'a> {
    /// Start a replay from `seed` at the first match
    pub fn new(
        calculator: &'a dyn RatingCalculator,
        scope_id: impl Into<ScopeId>,
        matches: &'a [MatchRecord],
        seed: HashMap<TeamId, TeamRatingState>,
    ) -> Self {
        Self::resume(calculator, scope_id, matches, seed, 0)
    }

    /// Continue a replay from the last committed state.
    ///
    /// `seed` must be the state committed after match `start_index - 1`.
    pub fn resume(
        calculator: &'a dyn RatingCalculator,
        scope_id: impl Into<ScopeId>,
        matches: &'a [MatchRecord],
        seed: HashMap<TeamId, TeamRatingState>,
        start_index: usize,
    ) -> Self {
        Self {
            calculator,
            scope_id: scope_id.into(),
            matches,
            ratings: seed,
            next_index: start_index,
            state: ReplayState::Idle,
            last_played_at: None,
            out_of_order: 0,
        }
    }

    /// Compare the first match against a timestamp committed before this session
    pub fn with_last_played_at(mut self, last_played_at: Option<DateTime<Utc>>) -> Self {
        self.last_played_at = last_played_at;
        self
    }

    pub fn state(&self) -> ReplayState {
        self.state
    }

    /// Index of the next match to be processed
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    pub fn scope_id(&self) -> &ScopeId {
        &self.scope_id
    }

    /// Ratings committed so far
    pub fn ratings(&self) -> &HashMap<TeamId, TeamRatingState> {
        &self.ratings
    }

    /// Timestamp of the most recently processed match
    pub fn last_played_at(&self) -> Option<DateTime<Utc>> {
        self.last_played_at
    }

    /// Matches seen so far that were older than their predecessor
    pub fn out_of_order(&self) -> usize {
        self.out_of_order
    }

    /// Process the next match. Returns `None` once the list is exhausted.
    pub fn step(&mut self) -> Option<StepOutcome> {
        let index = self.next_index;
        let matches = self.matches;
        let Some(record) = matches.get(index) else {
            self.state = ReplayState::Done;
            return None;
        };

        self.state = ReplayState::Processing { match_index: index };
        let outcome = self.apply(index, record);
        self.next_index += 1;

        self.state = if self.next_index < matches.len() {
            ReplayState::Processing {
                match_index: self.next_index,
            }
        } else {
            ReplayState::Done
        };

        Some(outcome)
    }

    /// Replay every remaining match
    pub fn run_to_end(mut self) -> ReplayReport {
        let mut report = ReplayReport::default();

        while let Some(outcome) = self.step() {
            match outcome {
                StepOutcome::Applied(entry) => report.entries.push(entry),
                StepOutcome::Skipped(skipped) => report.skipped.push(skipped),
            }
        }

        report.final_states = self.ratings;
        report
    }

    fn apply(&mut self, index: usize, record: &MatchRecord) -> StepOutcome {
        if let Some(previous) = self.last_played_at {
            if record.played_at < previous {
                self.out_of_order += 1;
                warn!(
                    scope_id = %self.scope_id,
                    match_id = %record.match_id,
                    index,
                    "Match is older than its predecessor; replaying in the given order"
                );
            }
        }
        self.last_played_at = Some(record.played_at);

        if let Err(reason) = record.validate() {
            warn!(
                scope_id = %self.scope_id,
                match_id = %record.match_id,
                index,
                "Skipping malformed match: {}",
                reason
            );
            return StepOutcome::Skipped(SkippedMatch {
                index,
                match_id: record.match_id,
                reason,
            });
        }

        let calculator = self.calculator;
        let ratings = &mut self.ratings;
        let outcome = match record.resolve(|team_id| {
            ratings
                .entry(team_id.clone())
                .or_insert_with(|| calculator.initial_state(team_id))
                .clone()
        }) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    scope_id = %self.scope_id,
                    match_id = %record.match_id,
                    "Skipping unresolvable match: {}",
                    e
                );
                return StepOutcome::Skipped(SkippedMatch {
                    index,
                    match_id: record.match_id,
                    reason: RatingError::InternalError {
                        message: e.to_string(),
                    },
                });
            }
        };

        let records = calculator.rate_match(&outcome);

        // Every update is computed from the pre-match snapshot. A team listed
        // in two slots therefore ends up counted once, with the later slot's
        // record winning.
        let snapshots = outcome
            .alliance_a
            .members()
            .iter()
            .chain(outcome.alliance_b.members());
        for (snapshot, update) in snapshots.zip(&records) {
            self.ratings
                .insert(snapshot.team_id.clone(), snapshot.advanced(update));
        }

        debug!(
            scope_id = %self.scope_id,
            match_id = %record.match_id,
            index,
            result = record.result().label(),
            "Applied match"
        );

        StepOutcome::Applied(MatchAuditEntry {
            scope_id: self.scope_id.clone(),
            match_id: record.match_id,
            played_at: record.played_at,
            result: record.result(),
            records,
        })
    }
}

/// Orchestrates replays with a shared rating calculator
#[derive(Clone)]
pub struct MatchReplayEngine {
    calculator: Arc<dyn RatingCalculator>,
}

impl MatchReplayEngine {
    pub fn new(calculator: Arc<dyn RatingCalculator>) -> Self {
        Self { calculator }
    }

    /// Engine backed by the credit-and-surprise model
    pub fn with_constants(constants: RatingConstants) -> Result<Self> {
        let calculator = CreditSurpriseCalculator::new(constants)?;
        Ok(Self::new(Arc::new(calculator)))
    }

    pub fn calculator(&self) -> &dyn RatingCalculator {
        self.calculator.as_ref()
    }

    pub fn constants(&self) -> &RatingConstants {
        self.calculator.constants()
    }

    /// Open a step-by-step session
    pub fn session<'a>(
        &'a self,
        scope_id: impl Into<ScopeId>,
        matches: &'a [MatchRecord],
        seed: HashMap<TeamId, TeamRatingState>,
    ) -> ReplaySession<'a> {
        ReplaySession::new(self.calculator.as_ref(), scope_id, matches, seed)
    }

    /// Replay `matches` in the given order starting from `seed`
    pub fn replay(
        &self,
        scope_id: impl Into<ScopeId>,
        matches: &[MatchRecord],
        seed: HashMap<TeamId, TeamRatingState>,
    ) -> ReplayReport {
        let session = self.session(scope_id, matches, seed);
        let scope_id = session.scope_id().clone();
        let report = session.run_to_end();

        info!(
            scope_id = %scope_id,
            applied = report.applied(),
            skipped = report.skipped.len(),
            teams = report.final_states.len(),
            "Replay finished"
        );

        report
    }
}

impl Default for MatchReplayEngine {
    fn default() -> Self {
        Self::new(Arc::new(CreditSurpriseCalculator::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MatchResult;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 20, 10, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn record(minute: i64, a: &[&str], b: &[&str], score_a: u32, score_b: u32) -> MatchRecord {
        MatchRecord::new(Uuid::new_v4(), at(minute), a, b, score_a, score_b)
    }

    fn history() -> Vec<MatchRecord> {
        vec![
            record(0, &["1", "2", "3"], &["4", "5", "6"], 80, 60),
            record(10, &["1", "4", "5"], &["2", "3", "6"], 40, 70),
            record(20, &["2", "4", "6"], &["1", "3", "5"], 55, 55),
        ]
    }

    #[test]
    fn test_session_state_machine() {
        let engine = MatchReplayEngine::default();
        let matches = history();
        let mut session = engine.session("event", &matches, HashMap::new());

        assert_eq!(session.state(), ReplayState::Idle);

        assert!(session.step().is_some());
        assert_eq!(session.state(), ReplayState::Processing { match_index: 1 });

        assert!(session.step().is_some());
        assert!(session.step().is_some());
        assert_eq!(session.state(), ReplayState::Done);
        assert!(session.step().is_none());
        assert_eq!(session.state(), ReplayState::Done);
    }

    #[test]
    fn test_empty_history_is_done_immediately() {
        let engine = MatchReplayEngine::default();
        let mut session = engine.session("event", &[], HashMap::new());
        assert!(session.step().is_none());
        assert_eq!(session.state(), ReplayState::Done);
    }

    #[test]
    fn test_teams_created_with_defaults_and_counted() {
        let engine = MatchReplayEngine::default();
        let report = engine.replay("event", &history(), HashMap::new());

        assert_eq!(report.applied(), 3);
        assert_eq!(report.final_states.len(), 6);
        for state in report.final_states.values() {
            assert_eq!(state.matches_played, 3);
        }

        let first = &report.entries[0];
        assert_eq!(first.result, MatchResult::AllianceAWins);
        assert_eq!(first.records.len(), 6);
        for record in &first.records {
            assert_eq!(record.rating_before, 100.0);
            assert_eq!(record.uncertainty_before, 50.0);
        }
    }

    #[test]
    fn test_each_match_reads_previous_commit() {
        let engine = MatchReplayEngine::default();
        let report = engine.replay("event", &history(), HashMap::new());

        let after_first = report.entries[0]
            .records
            .iter()
            .find(|r| r.team_id == "1")
            .unwrap()
            .clone();
        let in_second = report.entries[1]
            .records
            .iter()
            .find(|r| r.team_id == "1")
            .unwrap();

        assert_eq!(in_second.rating_before, after_first.rating_after);
        assert_eq!(in_second.uncertainty_before, after_first.uncertainty_after);
    }

    #[test]
    fn test_malformed_match_is_skipped_not_fatal() {
        let engine = MatchReplayEngine::default();
        let mut matches = history();
        matches.insert(1, record(5, &["1", "2"], &[], 10, 0));

        let report = engine.replay("event", &matches, HashMap::new());

        assert_eq!(report.applied(), 3);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].index, 1);
        assert!(matches!(
            report.skipped[0].reason,
            RatingError::MissingTeamSlot { .. }
        ));
        assert_eq!(report.final_states["1"].matches_played, 3);
    }

    #[test]
    fn test_resume_matches_uninterrupted_replay() {
        let engine = MatchReplayEngine::default();
        let matches = history();

        let full = engine.replay("event", &matches, HashMap::new());

        let mut session = engine.session("event", &matches, HashMap::new());
        session.step();
        let committed = session.ratings().clone();
        let resumed =
            ReplaySession::resume(engine.calculator(), "event", &matches, committed, 1)
                .run_to_end();

        assert_eq!(resumed.final_states, full.final_states);
        assert_eq!(resumed.entries[..], full.entries[1..]);
    }

    #[test]
    fn test_seeded_state_is_used() {
        let engine = MatchReplayEngine::default();
        let mut seed = HashMap::new();
        seed.insert(
            "1".to_string(),
            TeamRatingState {
                team_id: "1".to_string(),
                rating: 180.0,
                uncertainty: 15.0,
                matches_played: 42,
            },
        );

        let report = engine.replay("event", &history()[..1], seed);
        let record = &report.entries[0].records[0];
        assert_eq!(record.team_id, "1");
        assert_eq!(record.rating_before, 180.0);
        assert_eq!(report.final_states["1"].matches_played, 43);
    }

    #[test]
    fn test_duplicate_team_counted_once() {
        let engine = MatchReplayEngine::default();
        let matches = vec![record(0, &["1", "1", "2"], &["3", "4", "5"], 10, 5)];
        let report = engine.replay("event", &matches, HashMap::new());

        assert_eq!(report.entries[0].records.len(), 6);
        assert_eq!(report.final_states["1"].matches_played, 1);
        assert_eq!(
            report.final_states["1"].rating,
            report.entries[0].records[1].rating_after
        );
    }

    #[test]
    fn test_two_team_alliance_rated_as_padded_trio() {
        let engine = MatchReplayEngine::default();
        let mut seed = HashMap::new();
        seed.insert("1".to_string(), TeamRatingState::with_values("1", 140.0, 20.0));
        seed.insert("2".to_string(), TeamRatingState::with_values("2", 100.0, 50.0));

        let matches = vec![record(0, &["1", "2"], &["3", "4", "5"], 60, 40)];
        let report = engine.replay("event", &matches, seed);
        let records = &report.entries[0].records;

        assert_eq!(records.len(), 6);
        let ids: Vec<&str> = records[..3].iter().map(|r| r.team_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "1"]);

        // Strengths 7 and 2: the duplicated slot pairs "1" with itself
        let strong_share = 0.7 * 7.0 / 9.0 + 0.15;
        let weak_share = 0.7 * 2.0 / 9.0 + 0.15;
        assert!((records[0].credit_factor - 0.5).abs() < 1e-9);
        assert!((records[1].credit_factor - weak_share).abs() < 1e-9);
        assert!((records[2].credit_factor - (0.5 + strong_share) / 2.0).abs() < 1e-9);

        assert_eq!(report.final_states["1"].rating, records[2].rating_after);
        assert_eq!(report.final_states["1"].matches_played, 1);
        assert_eq!(report.final_states["2"].matches_played, 1);
    }

    #[test]
    fn test_out_of_order_matches_are_counted() {
        let engine = MatchReplayEngine::default();
        let mut matches = history();
        matches.swap(0, 1);

        let mut session = engine.session("event", &matches, HashMap::new());
        while session.step().is_some() {}
        assert_eq!(session.out_of_order(), 1);
        assert_eq!(session.last_played_at(), Some(at(20)));
    }

    #[test]
    fn test_earlier_timestamp_carries_into_new_session() {
        let engine = MatchReplayEngine::default();
        let matches = history();

        let mut session = engine
            .session("event", &matches[..1], HashMap::new())
            .with_last_played_at(Some(at(30)));
        session.step();
        assert_eq!(session.out_of_order(), 1);
    }

    #[test]
    fn test_out_of_order_history_is_still_replayed() {
        let engine = MatchReplayEngine::default();
        let mut matches = history();
        matches.reverse();

        let report = engine.replay("event", &matches, HashMap::new());
        assert_eq!(report.applied(), 3);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_replay_control() {
        let control = ReplayControl::new();
        let shared = control.clone();
        assert!(!control.is_stopped());
        shared.stop();
        assert!(control.is_stopped());
    }
}
