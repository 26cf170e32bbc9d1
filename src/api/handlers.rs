//! API Handlers
//!
//! HTTP request handlers for each order service endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use tracing::debug;

use crate::cache::OrderCache;
use crate::error::{ApiError, CacheError};
use crate::models::{is_valid_order_id, HealthResponse, Order, StatsResponse};

/// Application state shared across all handlers.
///
/// Holds an explicit handle to the order cache; the cache does its own
/// per-shard locking, so handlers share it without an outer lock.
#[derive(Clone)]
pub struct AppState {
    /// Shared order cache
    pub cache: Arc<OrderCache>,
}

impl AppState {
    /// Creates a new AppState around the given cache.
    pub fn new(cache: OrderCache) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Builds the order cache with parameters from the Config.
    pub fn from_config(config: &crate::config::Config) -> Result<Self, CacheError> {
        Ok(Self::new(OrderCache::from_config(&config.cache)?))
    }
}

/// Query string for GET /order
#[derive(Debug, Deserialize)]
pub struct OrderQuery {
    pub id: Option<String>,
}

/// Handler for GET /order/:id
///
/// Returns the cached order or 404.
pub async fn get_order_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    lookup_order(&state, id)
}

/// Handler for GET /order?id=
///
/// Query-string form of [`get_order_handler`].
pub async fn query_order_handler(
    State(state): State<AppState>,
    Query(query): Query<OrderQuery>,
) -> Result<Json<Order>, ApiError> {
    match query.id.filter(|id| !id.is_empty()) {
        Some(id) => lookup_order(&state, id),
        None => Err(ApiError::MissingId),
    }
}

fn lookup_order(state: &AppState, id: String) -> Result<Json<Order>, ApiError> {
    if !is_valid_order_id(&id) {
        return Err(ApiError::InvalidId(id));
    }

    match state.cache.get(&id) {
        Some(order) => Ok(Json(order)),
        None => {
            debug!("order {} not found", id);
            Err(ApiError::NotFound(id))
        }
    }
}

/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.stats();
    Json(StatsResponse::new(&stats, state.cache.shard_count()))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
