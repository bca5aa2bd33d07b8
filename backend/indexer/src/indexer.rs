//! Long-running background task that polls the Soroban RPC and writes
//! decoded FundMe events to the database.
//!
//! Events are only stored once they are `confirmations` ledgers deep. Anything
//! newer is held back and fetched again on a later poll.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::db;
use crate::errors::Result;
use crate::events::FundMeEvent;
use crate::rpc;

pub struct IndexerState {
    pub pool: SqlitePool,
    pub config: Config,
    pub client: Client,
}

/// Where the next poll starts.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Position {
    ledger: u32,
    cursor: Option<String>,
}

/// Run the indexer loop until `shutdown` is cancelled.
///
/// An unreadable cursor is fatal: `shutdown` is cancelled so the API stops
/// too.
pub async fn run(state: Arc<IndexerState>, shutdown: CancellationToken) -> Result<()> {
    info!(
        "Indexer starting on {} — contract: {}",
        state.config.network, state.config.contract_id
    );

    let mut position = match resume_position(&state.pool, &state.config).await {
        Ok(position) => position,
        Err(e) => {
            error!("Cannot read indexer cursor: {e}");
            shutdown.cancel();
            return Err(e);
        }
    };

    info!("Resuming from ledger {}", position.ledger);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            polled = poll_once(&state.pool, &state.client, &state.config, &position) => {
                match polled {
                    Ok(next) => position = next,
                    Err(e) => error!("Indexer poll error: {e}"),
                }
            }
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(Duration::from_secs(state.config.poll_interval_secs)) => {}
        }
    }

    info!("Indexer stopped at ledger {}", position.ledger);
    Ok(())
}

/// Load the cursor from the DB; fall back to config `start_ledger`.
async fn resume_position(pool: &SqlitePool, config: &Config) -> Result<Position> {
    let last_ledger = db::get_last_ledger(pool).await?;
    let cursor = db::get_cursor_string(pool).await?;

    Ok(Position {
        ledger: if last_ledger > 0 {
            last_ledger as u32
        } else {
            config.start_ledger
        },
        cursor,
    })
}

/// Perform a single poll iteration and return the next position.
async fn poll_once(
    pool: &SqlitePool,
    client: &Client,
    config: &Config,
    position: &Position,
) -> Result<Position> {
    let (raw_events, next_cursor, latest_ledger) = rpc::fetch_events(
        client,
        &config.rpc_url,
        &config.contract_id,
        position.ledger,
        position.cursor.as_deref(),
        config.events_per_page,
    )
    .await?;

    let latest_ledger = match latest_ledger {
        Some(l) => l,
        None => rpc::fetch_latest_ledger(client, &config.rpc_url).await?,
    };

    let decoded = rpc::decode_events(&raw_events, &config.contract_id);
    let (confirmed, held_from) = split_confirmed(decoded, latest_ledger, config.confirmations);

    if !confirmed.is_empty() {
        let inserted = db::insert_events(pool, &confirmed).await?;
        info!(
            "Polled {} raw events → {} new records stored",
            raw_events.len(),
            inserted
        );
    }

    let next = match held_from {
        // Re-scan the unconfirmed ledgers from scratch next time.
        Some(ledger) => {
            debug!("Holding back events from ledger {ledger} until confirmed");
            Position {
                ledger,
                cursor: None,
            }
        }
        // Advance the ledger cursor:
        // - If there is a next_cursor string, the next call paginates from it.
        // - Otherwise advance to the latest known ledger.
        None => Position {
            ledger: (latest_ledger as u32).max(position.ledger),
            cursor: next_cursor,
        },
    };

    // Persist cursor so restarts are deterministic.
    db::save_cursor(pool, next.ledger as i64, next.cursor.as_deref()).await?;

    Ok(next)
}

/// Split `events` into those at least `confirmations` ledgers below `latest`
/// and the first ledger that is still too recent, if any.
fn split_confirmed(
    events: Vec<FundMeEvent>,
    latest: u64,
    confirmations: u32,
) -> (Vec<FundMeEvent>, Option<u32>) {
    let safe = latest.saturating_sub(confirmations as u64) as i64;
    let (confirmed, pending): (Vec<_>, Vec<_>) =
        events.into_iter().partition(|e| e.ledger <= safe);
    let held_from = pending.iter().map(|e| e.ledger as u32).min();
    (confirmed, held_from)
}
