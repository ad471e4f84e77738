use std::sync::Arc;

use printdesk_core::service::SolicitationService;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Solicitation lifecycle over the configured store and file area.
    pub service: Arc<SolicitationService>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Database pool, absent when running on the in-memory store.
    pub pool: Option<printdesk_db::DbPool>,
}
