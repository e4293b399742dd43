//! Deterministic replay of match histories

pub mod engine;
pub mod history;

pub use engine::{
    MatchReplayEngine, ReplayControl, ReplayReport, ReplaySession, ReplayState, SkippedMatch,
    StepOutcome,
};
pub use history::{is_chronological, sort_chronologically, MatchRecord};
