//! # Storage
//!
//! Typed helpers over the two Soroban storage tiers used by FundMe.
//!
//! ## Instance storage (contract-lifetime TTL)
//!
//! | Key           | Type      | Description                         |
//! |---------------|-----------|-------------------------------------|
//! | `Owner`       | `Address` | Sole address allowed to withdraw    |
//! | `PriceFeed`   | `Address` | Native/USD price feed contract      |
//! | `NativeAsset` | `Address` | Token contract of the native asset  |
//! | `FunderCount` | `u32`     | Length of the funder roster         |
//!
//! Instance TTL is bumped by **7 days** whenever it falls below 1 day remaining.
//!
//! ## Persistent storage (per-entry TTL)
//!
//! | Key                     | Type      | Description                        |
//! |-------------------------|-----------|------------------------------------|
//! | `Funder(index)`         | `Address` | Roster entry, in contribution order |
//! | `AmountFunded(address)` | `i128`    | Amount recorded for a funder        |
//!
//! Persistent TTL is bumped by **30 days** whenever it falls below 7 days remaining.
//!
//! The roster and the amount map are maintained together: every address in
//! the roster has an `AmountFunded` entry, and both are cleared in the same
//! withdrawal.

use soroban_sdk::{contracttype, Address, Env, Vec};

use crate::Error;

// ── TTL Constants ────────────────────────────────────────────────────

/// Approximate ledgers per day (~5 seconds per ledger).
const DAY_IN_LEDGERS: u32 = 17_280;

/// Instance storage: bump by 7 days when below 1 day remaining.
const INSTANCE_BUMP_AMOUNT: u32 = 7 * DAY_IN_LEDGERS;
const INSTANCE_LIFETIME_THRESHOLD: u32 = DAY_IN_LEDGERS;

/// Persistent storage: bump by 30 days when below 7 days remaining.
const PERSISTENT_BUMP_AMOUNT: u32 = 30 * DAY_IN_LEDGERS;
const PERSISTENT_LIFETIME_THRESHOLD: u32 = 7 * DAY_IN_LEDGERS;

// ── Storage Keys ─────────────────────────────────────────────────────

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DataKey {
    /// Owner address (Instance).
    Owner,
    /// Price feed contract address (Instance).
    PriceFeed,
    /// Native asset token contract address (Instance).
    NativeAsset,
    /// Number of roster entries (Instance).
    FunderCount,
    /// Roster entry by position (Persistent).
    Funder(u32),
    /// Recorded contribution by funder (Persistent).
    AmountFunded(Address),
}

// ── Instance Storage Helpers ─────────────────────────────────────────

/// Extend instance storage TTL if it falls below the threshold.
fn bump_instance(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
}

fn read_address(env: &Env, key: &DataKey) -> Result<Address, Error> {
    bump_instance(env);
    env.storage()
        .instance()
        .get(key)
        .ok_or(Error::NotInitialized)
}

/// Write the immutable references. Called once, from the constructor.
pub fn init(env: &Env, owner: &Address, price_feed: &Address, native_asset: &Address) {
    let instance = env.storage().instance();
    instance.set(&DataKey::Owner, owner);
    instance.set(&DataKey::PriceFeed, price_feed);
    instance.set(&DataKey::NativeAsset, native_asset);
    instance.set(&DataKey::FunderCount, &0u32);
    bump_instance(env);
}

pub fn get_owner(env: &Env) -> Result<Address, Error> {
    read_address(env, &DataKey::Owner)
}

pub fn get_price_feed(env: &Env) -> Result<Address, Error> {
    read_address(env, &DataKey::PriceFeed)
}

pub fn get_native_asset(env: &Env) -> Result<Address, Error> {
    read_address(env, &DataKey::NativeAsset)
}

// ─────────────────────────────────────────────────────────
// Funder roster
// ─────────────────────────────────────────────────────────

pub fn get_funder_count(env: &Env) -> u32 {
    bump_instance(env);
    env.storage()
        .instance()
        .get(&DataKey::FunderCount)
        .unwrap_or(0)
}

/// Roster entry at `index`.
pub fn get_funder(env: &Env, index: u32) -> Result<Address, Error> {
    if index >= get_funder_count(env) {
        return Err(Error::IndexOutOfRange);
    }
    let key = DataKey::Funder(index);
    let funder = env
        .storage()
        .persistent()
        .get(&key)
        .ok_or(Error::IndexOutOfRange)?;
    bump_persistent(env, &key);
    Ok(funder)
}

/// Append `funder` to the roster. Returns the new roster length.
pub fn push_funder(env: &Env, funder: &Address) -> Result<u32, Error> {
    let index = get_funder_count(env);
    let count = index.checked_add(1).ok_or(Error::Overflow)?;

    let key = DataKey::Funder(index);
    env.storage().persistent().set(&key, funder);
    bump_persistent(env, &key);
    env.storage().instance().set(&DataKey::FunderCount, &count);
    Ok(count)
}

/// Load the whole roster with a single read of its length.
///
/// A missing entry fails with `IndexOutOfRange`, as [`get_funder`] does.
pub fn load_funders(env: &Env) -> Result<Vec<Address>, Error> {
    let count = get_funder_count(env);
    let mut funders = Vec::new(env);
    for index in 0..count {
        let funder = env
            .storage()
            .persistent()
            .get(&DataKey::Funder(index))
            .ok_or(Error::IndexOutOfRange)?;
        funders.push_back(funder);
    }
    Ok(funders)
}

/// Drop the first `count` roster entries and reset the length to zero.
pub fn clear_funders(env: &Env, count: u32) {
    for index in 0..count {
        remove_persistent(env, &DataKey::Funder(index));
    }
    bump_instance(env);
    env.storage().instance().set(&DataKey::FunderCount, &0u32);
}

// ── Persistent Storage Helpers ───────────────────────────────────────

/// Extend the TTL for a persistent storage key.
fn bump_persistent(env: &Env, key: &DataKey) {
    env.storage()
        .persistent()
        .extend_ttl(key, PERSISTENT_LIFETIME_THRESHOLD, PERSISTENT_BUMP_AMOUNT);
}

fn remove_persistent(env: &Env, key: &DataKey) {
    if env.storage().persistent().has(key) {
        env.storage().persistent().remove(key);
    }
}

// ─────────────────────────────────────────────────────────
// Contribution records
// ─────────────────────────────────────────────────────────

/// Amount recorded for `funder`; zero when there is no record.
pub fn get_amount_funded(env: &Env, funder: &Address) -> i128 {
    let key = DataKey::AmountFunded(funder.clone());
    match env.storage().persistent().get(&key) {
        Some(amount) => {
            bump_persistent(env, &key);
            amount
        }
        None => 0,
    }
}

/// Add `amount` to the record of `funder`. Returns the new total.
pub fn add_amount_funded(env: &Env, funder: &Address, amount: i128) -> Result<i128, Error> {
    let total = get_amount_funded(env, funder)
        .checked_add(amount)
        .ok_or(Error::Overflow)?;

    let key = DataKey::AmountFunded(funder.clone());
    env.storage().persistent().set(&key, &total);
    bump_persistent(env, &key);
    Ok(total)
}

/// Reset the record of `funder` to zero.
pub fn clear_amount_funded(env: &Env, funder: &Address) {
    remove_persistent(env, &DataKey::AmountFunded(funder.clone()));
}

/// `true` if `funder` has a record, even a zero one.
#[cfg(test)]
pub fn has_amount_funded(env: &Env, funder: &Address) -> bool {
    env.storage()
        .persistent()
        .has(&DataKey::AmountFunded(funder.clone()))
}
