//! Axum REST API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::config::{Config, Network};
use crate::db;
use crate::errors::IndexerError;
use crate::events::EventRecord;
use crate::summary::{self, LedgerSummary};

#[derive(Clone)]
pub struct ApiState {
    pub pool: SqlitePool,
    pub config: Config,
}

// ─────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct FunderEventsResponse {
    pub funder: String,
    pub count: usize,
    pub events: Vec<EventRecord>,
}

#[derive(Serialize)]
pub struct AllEventsResponse {
    pub count: usize,
    pub events: Vec<EventRecord>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct NetworkResponse {
    pub network: Network,
    pub development: bool,
    pub confirmations: u32,
    pub rpc_url: String,
    pub contract_id: String,
}

#[derive(Serialize)]
pub struct SummaryResponse {
    pub contract_id: String,
    pub last_indexed_ledger: i64,
    #[serde(flatten)]
    pub summary: LedgerSummary,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn internal_error(e: IndexerError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /network`
pub async fn network(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let config = &state.config;
    Json(NetworkResponse {
        network: config.network,
        development: config.network.is_development(),
        confirmations: config.confirmations,
        rpc_url: config.rpc_url.clone(),
        contract_id: config.contract_id.clone(),
    })
}

/// `GET /funders/:address/events`
///
/// Returns every indexed event whose actor is `address`: its contributions,
/// plus withdrawals if it is the owner.
pub async fn get_funder_events(
    State(state): State<Arc<ApiState>>,
    Path(funder): Path<String>,
) -> Response {
    match db::get_events_for_actor(&state.pool, &funder).await {
        Ok(events) => {
            let count = events.len();
            (
                StatusCode::OK,
                Json(FunderEventsResponse {
                    funder,
                    count,
                    events,
                }),
            )
                .into_response()
        }
        Err(e) => internal_error(e),
    }
}

/// `GET /events`
///
/// Returns all indexed events.
pub async fn get_all_events(State(state): State<Arc<ApiState>>) -> Response {
    match db::get_all_events(&state.pool).await {
        Ok(events) => {
            let count = events.len();
            (StatusCode::OK, Json(AllEventsResponse { count, events })).into_response()
        }
        Err(e) => internal_error(e),
    }
}

/// `GET /summary`
///
/// The current funding round as seen by the indexer.
pub async fn get_summary(State(state): State<Arc<ApiState>>) -> Response {
    let events = match db::get_all_events(&state.pool).await {
        Ok(events) => events,
        Err(e) => return internal_error(e),
    };
    let last_indexed_ledger = match db::get_last_ledger(&state.pool).await {
        Ok(ledger) => ledger,
        Err(e) => return internal_error(e),
    };

    Json(SummaryResponse {
        contract_id: state.config.contract_id.clone(),
        last_indexed_ledger,
        summary: summary::summarize(&events),
    })
    .into_response()
}
