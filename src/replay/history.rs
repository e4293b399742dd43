//! Match history records as supplied by collaborators
//!
//! A record names up to three teams per alliance. Unfilled slots are `None`;
//! resolution fills them with a copy of the side's first filled slot so the
//! rating model always sees full trios.

use crate::error::{RatingError, Result};
use crate::rating::alliance::Alliance;
use crate::types::{MatchId, MatchOutcome, MatchResult, Side, TeamId, TeamRatingState};
use crate::utils::generate_match_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Slots per alliance in the source data
pub const ALLIANCE_SLOTS: usize = 3;

/// One played match, identified by team ids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    #[serde(default = "generate_match_id")]
    pub match_id: MatchId,
    pub played_at: DateTime<Utc>,
    pub alliance_a: [Option<TeamId>; ALLIANCE_SLOTS],
    pub alliance_b: [Option<TeamId>; ALLIANCE_SLOTS],
    pub score_a: u32,
    pub score_b: u32,
}

impl MatchRecord {
    /// Build a record from team id lists; extra ids beyond three are dropped
    pub fn new(
        match_id: MatchId,
        played_at: DateTime<Utc>,
        alliance_a: &[&str],
        alliance_b: &[&str],
        score_a: u32,
        score_b: u32,
    ) -> Self {
        Self {
            match_id,
            played_at,
            alliance_a: to_slots(alliance_a),
            alliance_b: to_slots(alliance_b),
            score_a,
            score_b,
        }
    }

    pub fn result(&self) -> MatchResult {
        MatchResult::from_scores(self.score_a, self.score_b)
    }

    /// Filled team ids of one side, in slot order
    pub fn teams(&self, side: Side) -> Vec<&TeamId> {
        let slots = match side {
            Side::A => &self.alliance_a,
            Side::B => &self.alliance_b,
        };
        slots.iter().flatten().collect()
    }

    /// All filled team ids, side A first
    pub fn participants(&self) -> Vec<&TeamId> {
        let mut teams = self.teams(Side::A);
        teams.extend(self.teams(Side::B));
        teams
    }

    /// Reject records with an empty alliance
    pub fn validate(&self) -> std::result::Result<(), RatingError> {
        for side in [Side::A, Side::B] {
            if self.teams(side).is_empty() {
                return Err(RatingError::MissingTeamSlot {
                    match_id: self.match_id,
                    side,
                });
            }
        }
        Ok(())
    }

    /// Resolve team ids into rating snapshots using `lookup`.
    ///
    /// Short sides are padded to three slots with copies of their first
    /// filled slot, so every resolved alliance is a trio.
    pub fn resolve<F>(&self, mut lookup: F) -> Result<MatchOutcome>
    where
        F: FnMut(&TeamId) -> TeamRatingState,
    {
        self.validate()?;

        let side_a = self.teams(Side::A).into_iter().map(&mut lookup).collect();
        let side_b = self.teams(Side::B).into_iter().map(&mut lookup).collect();

        let alliance_a = Alliance::new(pad_to_trio(side_a))?;
        let alliance_b = Alliance::new(pad_to_trio(side_b))?;

        Ok(MatchOutcome {
            alliance_a,
            alliance_b,
            score_a: self.score_a,
            score_b: self.score_b,
        })
    }
}

/// Fill unfilled slots with copies of the first filled one
fn pad_to_trio(mut members: Vec<TeamRatingState>) -> Vec<TeamRatingState> {
    if let Some(first) = members.first().cloned() {
        if members.len() < ALLIANCE_SLOTS {
            members.resize(ALLIANCE_SLOTS, first);
        }
    }
    members
}

fn to_slots(ids: &[&str]) -> [Option<TeamId>; ALLIANCE_SLOTS] {
    let mut slots: [Option<TeamId>; ALLIANCE_SLOTS] = Default::default();
    for (slot, id) in slots.iter_mut().zip(ids) {
        *slot = Some(id.to_string());
    }
    slots
}

/// Stable sort by `played_at`; equal timestamps keep their input order
pub fn sort_chronologically(matches: &mut [MatchRecord]) {
    matches.sort_by_key(|record| record.played_at);
}

/// Whether timestamps never decrease along the slice
pub fn is_chronological(matches: &[MatchRecord]) -> bool {
    matches
        .windows(2)
        .all(|pair| pair[0].played_at <= pair[1].played_at)
}
