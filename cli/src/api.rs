//! HTTP query API over the balance store.
//!
//! - `GET /`                        — `{ electrs_height, indexer_height }`
//! - `GET /addresses?page=&limit=`  — balances, largest first

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use balindex_core::error::IndexerError;
use balindex_core::source::BlockSource;
use balindex_core::store::BalanceStore;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 1_000;

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn BalanceStore>,
    source: Arc<dyn BlockSource>,
}

impl AppState {
    pub fn new(store: Arc<dyn BalanceStore>, source: Arc<dyn BlockSource>) -> Self {
        Self { store, source }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/addresses", get(list_addresses))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Raw query parameters; anything unparseable falls back to the default.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageParams {
    /// `(page, limit)` with page ≥ 1 and 1 ≤ limit ≤ [`MAX_LIMIT`].
    pub fn resolve(&self) -> (u64, u64) {
        let page = parse_or(self.page.as_deref(), DEFAULT_PAGE).max(1);
        let limit = parse_or(self.limit.as_deref(), DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        (page, limit)
    }
}

/// Missing, unparseable or zero → `default`; negative → 1.
fn parse_or(raw: Option<&str>, default: u64) -> u64 {
    match raw.map(|s| s.trim().parse::<i64>()) {
        Some(Ok(0)) => default,
        Some(Ok(n)) if n < 0 => 1,
        Some(Ok(n)) => n as u64,
        _ => default,
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddressRow {
    pub address: String,
    pub balance: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddressPage {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub data: Vec<AddressRow>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub electrs_height: u64,
    pub indexer_height: u64,
}

/// Any failure behind a handler. Details go to the log, not the client.
pub struct ApiError(IndexerError);

impl From<IndexerError> for ApiError {
    fn from(e: IndexerError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "status": "error" })),
        )
            .into_response()
    }
}

pub async fn health(State(state): State<AppState>) -> Result<Json<Health>, ApiError> {
    let (electrs_height, indexer_height) =
        tokio::try_join!(state.source.tip_height(), state.store.last_height())?;
    Ok(Json(Health {
        electrs_height,
        indexer_height,
    }))
}

pub async fn list_addresses(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<AddressPage>, ApiError> {
    let (page, limit) = params.resolve();
    let (records, total) = state.store.balance_page(page, limit).await?;

    let data = records
        .into_iter()
        .map(|r| AddressRow {
            address: r.address,
            balance: r.balance.to_string(),
        })
        .collect();

    Ok(Json(AddressPage {
        page,
        limit,
        total,
        data,
    }))
}
