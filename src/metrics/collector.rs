//! Metrics collection using Prometheus
//!
//! Counters and histograms describing replay and ingestion activity.

use crate::config::RatingConstants;
use crate::rating::updater::is_regime_change;
use crate::types::{MatchAuditEntry, MatchResult};
use anyhow::Result;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Metrics for the rating engine and its orchestration
#[derive(Clone)]
pub struct ReplayMetrics {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Matches applied, by result
    pub matches_processed_total: IntCounterVec,

    /// Matches skipped as malformed
    pub matches_skipped_total: IntCounter,

    /// Per-team rating updates written
    pub team_updates_total: IntCounter,

    /// Updates that widened uncertainty because of a regime change
    pub regime_changes_total: IntCounter,

    /// Matches older than the match committed before them
    pub matches_out_of_order_total: IntCounter,

    /// Replays currently running
    pub active_replays: IntGauge,

    /// Time to rebuild one scope
    pub replay_duration_seconds: Histogram,

    /// Distribution of committed ratings
    pub rating_distribution: Histogram,
}

impl ReplayMetrics {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        Self::with_registry(Arc::new(Registry::new()))
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let matches_processed_total = IntCounterVec::new(
            Opts::new(
                "alliance_rating_matches_processed_total",
                "Matches applied to ratings",
            ),
            &["result"],
        )?;
        registry.register(Box::new(matches_processed_total.clone()))?;

        let matches_skipped_total = IntCounter::new(
            "alliance_rating_matches_skipped_total",
            "Malformed matches skipped during replay",
        )?;
        registry.register(Box::new(matches_skipped_total.clone()))?;

        let team_updates_total = IntCounter::new(
            "alliance_rating_team_updates_total",
            "Per-team rating updates written",
        )?;
        registry.register(Box::new(team_updates_total.clone()))?;

        let regime_changes_total = IntCounter::new(
            "alliance_rating_regime_changes_total",
            "Updates that widened uncertainty after a surprising result",
        )?;
        registry.register(Box::new(regime_changes_total.clone()))?;

        let matches_out_of_order_total = IntCounter::new(
            "alliance_rating_matches_out_of_order_total",
            "Matches played earlier than their predecessor in the scope",
        )?;
        registry.register(Box::new(matches_out_of_order_total.clone()))?;

        let active_replays =
            IntGauge::new("alliance_rating_active_replays", "Replays currently running")?;
        registry.register(Box::new(active_replays.clone()))?;

        let replay_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "alliance_rating_replay_duration_seconds",
                "Time to rebuild one rating scope",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0]),
        )?;
        registry.register(Box::new(replay_duration_seconds.clone()))?;

        let rating_distribution = Histogram::with_opts(
            HistogramOpts::new(
                "alliance_rating_rating_distribution",
                "Committed team ratings",
            )
            .buckets(vec![25.0, 50.0, 75.0, 100.0, 125.0, 150.0, 200.0, 300.0]),
        )?;
        registry.register(Box::new(rating_distribution.clone()))?;

        Ok(Self {
            registry,
            matches_processed_total,
            matches_skipped_total,
            team_updates_total,
            regime_changes_total,
            matches_out_of_order_total,
            active_replays,
            replay_duration_seconds,
            rating_distribution,
        })
    }

    /// Record an applied match
    pub fn record_applied(&self, entry: &MatchAuditEntry, constants: &RatingConstants) {
        let result = match entry.result {
            MatchResult::AllianceAWins | MatchResult::AllianceBWins => "decided",
            MatchResult::Tie => "tie",
        };

        self.matches_processed_total
            .with_label_values(&[result])
            .inc();
        self.team_updates_total.inc_by(entry.records.len() as u64);

        for record in &entry.records {
            if is_regime_change(record.surprise_factor, constants) {
                self.regime_changes_total.inc();
            }
            self.rating_distribution.observe(record.rating_after);
        }
    }

    /// Record a skipped match
    pub fn record_skipped(&self) {
        self.matches_skipped_total.inc();
    }

    /// Record matches that arrived older than their predecessor
    pub fn record_out_of_order(&self, count: usize) {
        self.matches_out_of_order_total.inc_by(count as u64);
    }

    /// Record a finished scope rebuild
    pub fn record_replay(&self, duration: Duration) {
        self.replay_duration_seconds
            .observe(duration.as_secs_f64());
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }

    /// Render every registered metric in the Prometheus text format
    pub fn gather_text(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MatchUpdateRecord;
    use chrono::Utc;
    use uuid::Uuid;

    fn entry(result: MatchResult, surprises: &[f64]) -> MatchAuditEntry {
        MatchAuditEntry {
            scope_id: "event".to_string(),
            match_id: Uuid::new_v4(),
            played_at: Utc::now(),
            result,
            records: surprises
                .iter()
                .enumerate()
                .map(|(i, &surprise)| MatchUpdateRecord {
                    team_id: i.to_string(),
                    rating_before: 100.0,
                    rating_after: 105.0,
                    uncertainty_before: 50.0,
                    uncertainty_after: 48.0,
                    credit_factor: 0.5,
                    expected_outcome: 1.0 - surprise,
                    surprise_factor: surprise,
                })
                .collect(),
        }
    }

    #[test]
    fn test_metrics_creation() {
        let metrics = ReplayMetrics::new().expect("Failed to create metrics");
        assert_eq!(metrics.team_updates_total.get(), 0);
        assert_eq!(metrics.active_replays.get(), 0);
    }

    #[test]
    fn test_record_applied_counts_updates_and_regime_changes() {
        let metrics = ReplayMetrics::new().expect("Failed to create metrics");
        let constants = RatingConstants::default();

        metrics.record_applied(&entry(MatchResult::AllianceAWins, &[0.2, 0.2, 0.9]), &constants);
        metrics.record_applied(&entry(MatchResult::Tie, &[0.1, 0.1]), &constants);
        metrics.record_skipped();

        assert_eq!(metrics.team_updates_total.get(), 5);
        assert_eq!(metrics.regime_changes_total.get(), 1);
        assert_eq!(metrics.matches_skipped_total.get(), 1);
        assert_eq!(
            metrics
                .matches_processed_total
                .with_label_values(&["decided"])
                .get(),
            1
        );
        assert_eq!(
            metrics
                .matches_processed_total
                .with_label_values(&["tie"])
                .get(),
            1
        );
    }

    #[test]
    fn test_regime_changes_follow_configured_threshold() {
        let metrics = ReplayMetrics::new().expect("Failed to create metrics");
        let constants = RatingConstants {
            regime_change_threshold: 0.5,
            ..RatingConstants::default()
        };

        metrics.record_applied(&entry(MatchResult::AllianceBWins, &[0.5, 0.6, 0.9]), &constants);
        assert_eq!(metrics.regime_changes_total.get(), 2);
    }

    #[test]
    fn test_gather_text_exposes_metrics() {
        let metrics = ReplayMetrics::new().expect("Failed to create metrics");
        metrics.record_skipped();
        metrics.record_out_of_order(2);
        metrics.record_replay(Duration::from_millis(3));

        let text = metrics.gather_text().unwrap();
        assert!(text.contains("alliance_rating_matches_skipped_total 1"));
        assert!(text.contains("alliance_rating_matches_out_of_order_total 2"));
        assert!(text.contains("alliance_rating_replay_duration_seconds"));
    }

    #[test]
    fn test_metrics_timer() {
        let metrics = ReplayMetrics::new().expect("Failed to create metrics");
        let timer = metrics.start_timer();

        std::thread::sleep(Duration::from_millis(10));
        assert!(timer.elapsed() >= Duration::from_millis(10));
        assert!(timer.stop() >= Duration::from_millis(10));
    }
}
