//! Application state and component wiring
//!
//! Builds the rating engine, the in-memory store and audit log, and the
//! metrics registry from an [`AppConfig`], and hands them to a
//! [`RatingService`].

use crate::config::{validate_config, AppConfig};
use crate::metrics::ReplayMetrics;
use crate::rating::{InMemoryAuditLog, InMemoryRatingStore};
use crate::replay::MatchReplayEngine;
use crate::service::rating::RatingService;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Current team ratings per scope
    store: Arc<InMemoryRatingStore>,

    /// Per-match update records
    audit_log: Arc<InMemoryAuditLog>,

    metrics: ReplayMetrics,

    service: RatingService,
}

impl AppState {
    /// Initialize the application with all dependencies
    pub fn new(config: AppConfig) -> Result<Self, ServiceError> {
        validate_config(&config).map_err(|e| ServiceError::Configuration {
            message: e.to_string(),
        })?;

        info!(
            "Initializing {} (k={}, w={}, u_match={})",
            config.service.name, config.rating.k, config.rating.w, config.rating.u_match
        );

        let engine = MatchReplayEngine::with_constants(config.rating.clone()).map_err(|e| {
            ServiceError::Initialization {
                message: format!("Failed to create rating engine: {}", e),
            }
        })?;

        let metrics = ReplayMetrics::new().map_err(|e| ServiceError::Initialization {
            message: format!("Failed to create metrics collector: {}", e),
        })?;

        let store = Arc::new(InMemoryRatingStore::new());
        let audit_log = Arc::new(InMemoryAuditLog::new());

        let service = RatingService::new(
            engine,
            store.clone(),
            audit_log.clone(),
            metrics.clone(),
            config.replay.clone(),
        );

        Ok(Self {
            config,
            store,
            audit_log,
            metrics,
            service,
        })
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn service(&self) -> &RatingService {
        &self.service
    }

    pub fn store(&self) -> Arc<InMemoryRatingStore> {
        self.store.clone()
    }

    pub fn audit_log(&self) -> Arc<InMemoryAuditLog> {
        self.audit_log.clone()
    }

    pub fn metrics(&self) -> &ReplayMetrics {
        &self.metrics
    }
}
