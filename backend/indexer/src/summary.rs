//! Off-chain view of the FundMe ledger, rebuilt from indexed events.
//!
//! A `withdrawn` event closes a funding round: only `funded` events after the
//! most recent withdrawal count toward the current totals, mirroring the
//! contract's reset.

use serde::Serialize;
use tracing::warn;

use crate::events::{EventKind, EventRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunderTotal {
    pub funder: String,
    /// Decimal string of the funder's accumulated amount.
    pub total: String,
    pub contributions: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerSummary {
    /// Roster length: one entry per contribution, duplicates included.
    pub roster_length: u32,
    pub total_funded: String,
    /// Funders in order of first contribution in the current round.
    pub funders: Vec<FunderTotal>,
    pub withdrawals: u32,
    pub lifetime_withdrawn: String,
}

/// Fold `events` (ordered by ledger, then id) into a [`LedgerSummary`].
pub fn summarize(events: &[EventRecord]) -> LedgerSummary {
    let mut round: Vec<(String, i128, u32)> = Vec::new();
    let mut roster_length = 0u32;
    let mut withdrawals = 0u32;
    let mut lifetime_withdrawn = 0i128;

    for event in events {
        match event.kind() {
            EventKind::Funded => {
                let (Some(funder), Some(amount)) = (event.actor.clone(), event.amount_value())
                else {
                    warn!("Skipping malformed funded event {}", event.event_id);
                    continue;
                };
                roster_length += 1;
                match round.iter_mut().find(|(f, _, _)| *f == funder) {
                    Some((_, total, count)) => {
                        *total = total.saturating_add(amount);
                        *count += 1;
                    }
                    None => round.push((funder, amount, 1)),
                }
            }
            EventKind::Withdrawn => {
                withdrawals += 1;
                lifetime_withdrawn =
                    lifetime_withdrawn.saturating_add(event.amount_value().unwrap_or(0));
                round.clear();
                roster_length = 0;
            }
            EventKind::Unknown => {}
        }
    }

    let total_funded = round
        .iter()
        .fold(0i128, |acc, (_, amount, _)| acc.saturating_add(*amount));

    LedgerSummary {
        roster_length,
        total_funded: total_funded.to_string(),
        funders: round
            .into_iter()
            .map(|(funder, total, contributions)| FunderTotal {
                funder,
                total: total.to_string(),
                contributions,
            })
            .collect(),
        withdrawals,
        lifetime_withdrawn: lifetime_withdrawn.to_string(),
    }
}
