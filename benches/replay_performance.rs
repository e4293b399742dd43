//! Performance benchmarks for rating calculations and replay

use alliance_rating::config::{RatingConstants, ReplaySettings};
use alliance_rating::metrics::ReplayMetrics;
use alliance_rating::rating::{compute_match_update, Alliance, InMemoryAuditLog, InMemoryRatingStore};
use alliance_rating::replay::{MatchRecord, MatchReplayEngine, ReplayControl};
use alliance_rating::service::RatingService;
use alliance_rating::types::TeamRatingState;
use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

fn trio(ids: [&str; 3], ratings: [f64; 3], uncertainties: [f64; 3]) -> Alliance {
    Alliance::new(
        (0..3)
            .map(|i| TeamRatingState::with_values(ids[i], ratings[i], uncertainties[i]))
            .collect(),
    )
    .unwrap()
}

/// Round-robin style 3v3 history over 30 teams
fn history(matches: usize) -> Vec<MatchRecord> {
    let start = Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap();
    let ids: Vec<String> = (1..=30).map(|n| (n * 11).to_string()).collect();

    (0..matches)
        .map(|i| {
            let pick = |offset: usize| ids[(i * 7 + offset * 5) % ids.len()].as_str();
            MatchRecord::new(
                Uuid::from_u128(i as u128),
                start + Duration::minutes(i as i64 * 6),
                &[pick(0), pick(1), pick(2)],
                &[pick(3), pick(4), pick(5)],
                ((i * 37) % 150) as u32,
                ((i * 53) % 150) as u32,
            )
        })
        .collect()
}

fn bench_match_update(c: &mut Criterion) {
    let constants = RatingConstants::default();
    let winners = trio(["254", "1678", "971"], [140.0, 110.0, 90.0], [20.0, 35.0, 45.0]);
    let losers = trio(["118", "148", "2056"], [130.0, 95.0, 80.0], [15.0, 40.0, 50.0]);

    c.bench_function("compute_match_update_3v3", |b| {
        b.iter(|| black_box(compute_match_update(&winners, &losers, &constants)))
    });
}

fn bench_replay(c: &mut Criterion) {
    let engine = MatchReplayEngine::default();
    let matches = history(1000);

    c.bench_function("replay_1000_matches", |b| {
        b.iter(|| black_box(engine.replay("bench", &matches, HashMap::new())))
    });
}

fn bench_scope_rebuilds(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let matches = history(250);

    c.bench_function("rebuild_8_scopes_250_matches", |b| {
        b.iter(|| {
            rt.block_on(async {
                let service = RatingService::new(
                    MatchReplayEngine::default(),
                    Arc::new(InMemoryRatingStore::new()),
                    Arc::new(InMemoryAuditLog::new()),
                    ReplayMetrics::new().unwrap(),
                    ReplaySettings::default(),
                );
                let histories = (0..8)
                    .map(|i| (format!("scope_{}", i), matches.clone()))
                    .collect();

                black_box(service.rebuild_scopes(histories, ReplayControl::new()).await)
            })
        })
    });
}

criterion_group!(benches, bench_match_update, bench_replay, bench_scope_rebuilds);
criterion_main!(benches);
