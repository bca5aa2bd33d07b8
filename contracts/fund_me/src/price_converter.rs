//! # Price Converter
//!
//! Reads the native/USD price from the feed bound at construction and turns
//! native amounts into USD values. All values here are fixed-point with
//! [`PRECISION`] decimals:
//!
//! ```text
//! rate      = answer * 10^(PRECISION - feed_decimals)
//! usd_value = native_amount * rate / 10^PRECISION      (truncated)
//! ```
//!
//! A feed that cannot answer, or answers with a non-positive price, yields
//! [`Error::OracleUnavailable`]. The ledger never admits a contribution on an
//! unknown price.

use soroban_sdk::{contractclient, contracttype, Address, Env, U256};

use crate::Error;

/// Decimals used by every USD value and every native amount.
pub const PRECISION: u32 = 18;

/// `10^PRECISION`.
pub const PRECISION_FACTOR: i128 = 1_000_000_000_000_000_000;

/// Answer of a single price round, as published by the feed.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RoundData {
    pub round_id: u64,
    pub answer: i128,
    pub started_at: u64,
    pub updated_at: u64,
    pub answered_in_round: u64,
}

/// Read-only aggregator interface the ledger depends on.
#[contractclient(name = "PriceFeedClient")]
pub trait PriceFeed {
    fn decimals(env: Env) -> u32;
    fn latest_round_data(env: Env) -> RoundData;
}

/// Latest price of one native unit in USD, rescaled to [`PRECISION`].
pub fn get_conversion_rate(env: &Env, price_feed: &Address) -> Result<i128, Error> {
    let feed = PriceFeedClient::new(env, price_feed);

    let round = match feed.try_latest_round_data() {
        Ok(Ok(round)) => round,
        _ => return Err(Error::OracleUnavailable),
    };
    let decimals = match feed.try_decimals() {
        Ok(Ok(decimals)) => decimals,
        _ => return Err(Error::OracleUnavailable),
    };

    if round.answer <= 0 {
        return Err(Error::OracleUnavailable);
    }

    rescale(round.answer, decimals)
}

/// USD value of `native_amount` at `rate`, truncated toward zero.
pub fn get_conversion_amount(env: &Env, native_amount: i128, rate: i128) -> Result<i128, Error> {
    if native_amount < 0 || rate < 0 {
        return Err(Error::InvalidAmount);
    }

    // Both factors fit in 127 bits, so the product cannot overflow 256 bits.
    let product = U256::from_u128(env, native_amount as u128)
        .mul(&U256::from_u128(env, rate as u128));
    let usd_value = product.div(&U256::from_u128(env, PRECISION_FACTOR as u128));

    usd_value
        .to_u128()
        .and_then(|v| i128::try_from(v).ok())
        .ok_or(Error::Overflow)
}

/// USD value of `native_amount` at the feed's latest price.
pub fn convert_to_stable(env: &Env, price_feed: &Address, native_amount: i128) -> Result<i128, Error> {
    let rate = get_conversion_rate(env, price_feed)?;
    get_conversion_amount(env, native_amount, rate)
}

fn rescale(answer: i128, decimals: u32) -> Result<i128, Error> {
    let rate = if decimals <= PRECISION {
        10i128
            .checked_pow(PRECISION - decimals)
            .and_then(|factor| answer.checked_mul(factor))
            .ok_or(Error::Overflow)?
    } else {
        match 10i128.checked_pow(decimals - PRECISION) {
            Some(factor) => answer / factor,
            None => 0,
        }
    };

    // A price too small to survive rescaling is as unusable as no price.
    if rate <= 0 {
        return Err(Error::OracleUnavailable);
    }
    Ok(rate)
}
