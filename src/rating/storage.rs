//! Rating storage interface and implementations
//!
//! Ratings are keyed by `(scope, team)`. Each scope is an independent rating
//! space; the engine never keeps ratings of its own, it reads and writes them
//! through this interface.

use crate::config::RatingConstants;
use crate::error::{RatingError, Result};
use crate::types::{ScopeId, TeamId, TeamRatingState};
use std::collections::HashMap;
use std::sync::RwLock;

/// Trait for rating storage operations
pub trait RatingStore: Send + Sync {
    /// Get a team's rating in a scope
    fn get(&self, scope_id: &ScopeId, team_id: &TeamId) -> Result<Option<TeamRatingState>>;

    /// Get a team's rating, creating it from `constants` on first reference
    fn get_or_create(
        &self,
        scope_id: &ScopeId,
        team_id: &TeamId,
        constants: &RatingConstants,
    ) -> Result<TeamRatingState>;

    /// Store or overwrite a team's rating
    fn store(&self, scope_id: &ScopeId, state: TeamRatingState) -> Result<()>;

    /// Store several ratings of one scope at once
    fn store_many(&self, scope_id: &ScopeId, states: Vec<TeamRatingState>) -> Result<()>;

    /// All ratings of a scope
    fn scope_ratings(&self, scope_id: &ScopeId) -> Result<HashMap<TeamId, TeamRatingState>>;

    /// Replace a team's rating with a fresh default state
    fn reset_team(
        &self,
        scope_id: &ScopeId,
        team_id: &TeamId,
        constants: &RatingConstants,
    ) -> Result<TeamRatingState>;

    /// Remove every rating of a scope, returning how many were removed
    fn clear_scope(&self, scope_id: &ScopeId) -> Result<usize>;

    /// Known scopes
    fn scopes(&self) -> Result<Vec<ScopeId>>;
}

type ScopeMap = HashMap<ScopeId, HashMap<TeamId, TeamRatingState>>;

/// In-memory rating store
#[derive(Debug, Default)]
pub struct InMemoryRatingStore {
    ratings: RwLock<ScopeMap>,
}

impl InMemoryRatingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, ScopeMap>> {
        self.ratings.read().map_err(|_| {
            RatingError::StorageError {
                message: "Failed to acquire ratings read lock".to_string(),
            }
            .into()
        })
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, ScopeMap>> {
        self.ratings.write().map_err(|_| {
            RatingError::StorageError {
                message: "Failed to acquire ratings write lock".to_string(),
            }
            .into()
        })
    }
}

impl RatingStore for InMemoryRatingStore {
    fn get(&self, scope_id: &ScopeId, team_id: &TeamId) -> Result<Option<TeamRatingState>> {
        let ratings = self.read()?;
        Ok(ratings
            .get(scope_id)
            .and_then(|scope| scope.get(team_id))
            .cloned())
    }

    fn get_or_create(
        &self,
        scope_id: &ScopeId,
        team_id: &TeamId,
        constants: &RatingConstants,
    ) -> Result<TeamRatingState> {
        let mut ratings = self.write()?;
        let state = ratings
            .entry(scope_id.clone())
            .or_default()
            .entry(team_id.clone())
            .or_insert_with(|| TeamRatingState::new(team_id.clone(), constants));

        Ok(state.clone())
    }

    fn store(&self, scope_id: &ScopeId, state: TeamRatingState) -> Result<()> {
        let mut ratings = self.write()?;
        ratings
            .entry(scope_id.clone())
            .or_default()
            .insert(state.team_id.clone(), state);
        Ok(())
    }

    fn store_many(&self, scope_id: &ScopeId, states: Vec<TeamRatingState>) -> Result<()> {
        let mut ratings = self.write()?;
        let scope = ratings.entry(scope_id.clone()).or_default();
        for state in states {
            scope.insert(state.team_id.clone(), state);
        }
        Ok(())
    }

    fn scope_ratings(&self, scope_id: &ScopeId) -> Result<HashMap<TeamId, TeamRatingState>> {
        let ratings = self.read()?;
        Ok(ratings.get(scope_id).cloned().unwrap_or_default())
    }

    fn reset_team(
        &self,
        scope_id: &ScopeId,
        team_id: &TeamId,
        constants: &RatingConstants,
    ) -> Result<TeamRatingState> {
        let fresh = TeamRatingState::new(team_id.clone(), constants);
        self.store(scope_id, fresh.clone())?;
        Ok(fresh)
    }

    fn clear_scope(&self, scope_id: &ScopeId) -> Result<usize> {
        let mut ratings = self.write()?;
        Ok(ratings.remove(scope_id).map(|scope| scope.len()).unwrap_or(0))
    }

    fn scopes(&self) -> Result<Vec<ScopeId>> {
        let ratings = self.read()?;
        let mut scopes: Vec<ScopeId> = ratings.keys().cloned().collect();
        scopes.sort();
        Ok(scopes)
    }
}
