use serde::Serialize;

use crate::config::AppConfig;
use crate::db::Database;
use crate::events::EventHub;

/// Shared application state passed to all API handlers via axum's State extractor.
pub struct AppState {
    pub db: Database,
    pub config: AppConfig,
    pub event_hub: EventHub,
    pub status: tokio::sync::RwLock<DaemonStatus>,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig, event_hub: EventHub) -> Self {
        Self { db, config, event_hub, status: tokio::sync::RwLock::new(DaemonStatus::idle()) }
    }
}

/// The daemon's operating state, serialized to the API as a lowercase string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DaemonState {
    Idle,
    Ingesting,
    Planning,
}

#[derive(Debug, Clone, Serialize)]
pub struct DaemonStatus {
    pub state: DaemonState,
    pub detail: Option<String>,
}

impl DaemonStatus {
    pub const fn idle() -> Self {
        Self { state: DaemonState::Idle, detail: None }
    }

    pub fn ingesting(detail: impl Into<String>) -> Self {
        Self { state: DaemonState::Ingesting, detail: Some(detail.into()) }
    }

    pub const fn planning() -> Self {
        Self { state: DaemonState::Planning, detail: None }
    }
}
