//! # FundMe Contract
//!
//! A minimal crowdfunding ledger. Contributions are paid in the native asset,
//! valued in USD through an external price feed, and admitted only when worth
//! at least [`MINIMUM_USD`]. A single owner fixed at construction withdraws
//! the whole balance, which resets the ledger for the next funding round.
//!
//! | Phase      | Entry Point(s)                                              |
//! |------------|-------------------------------------------------------------|
//! | Bootstrap  | `__constructor`                                             |
//! | Funding    | [`FundMe::fund`]                                            |
//! | Withdrawal | [`FundMe::withdraw`], [`FundMe::cheaper_withdraw`]          |
//! | Queries    | `get_owner`, `get_price_feed`, `get_native_asset`, `get_address_to_amount_funded`, `get_funder`, `get_funder_count`, `get_balance`, `get_conversion_rate`, `minimum_usd` |
//!
//! ## Architecture
//!
//! Price lookups and USD conversion live in [`price_converter`]. Storage
//! access is fully delegated to [`storage`]. This file holds the entry points,
//! the owner check and the payout.
//!
//! ## Atomicity
//!
//! Every entry point runs as one host invocation: when it returns an
//! [`Error`], all storage writes and token movements made during the call are
//! rolled back. Withdrawals reset the bookkeeping before moving funds, and the
//! host forbids contract re-entry, so a payout recipient never sees the
//! pre-reset ledger.

#![no_std]

use soroban_sdk::{contract, contracterror, contractimpl, token, Address, Env};

pub mod events;
pub mod price_converter;
mod storage;

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod test_events;
#[cfg(test)]
mod test_withdraw;

pub use price_converter::{PriceFeedClient, RoundData};

/// Minimum contribution, in USD with 18 decimals (50 USD).
pub const MINIMUM_USD: i128 = 50 * price_converter::PRECISION_FACTOR;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    /// Withdrawal attempted by an address other than the owner.
    NotOwner = 1,
    /// "You need to spend more ETH!": the contribution is worth less than
    /// [`MINIMUM_USD`].
    InsufficientValue = 2,
    /// The payout to the owner was rejected by the asset contract.
    TransferFailed = 3,
    /// The price feed could not answer, or answered with a non-positive price.
    OracleUnavailable = 4,
    /// Funder roster read past its end.
    IndexOutOfRange = 5,
    InvalidAmount = 6,
    Overflow = 7,
    NotInitialized = 8,
}

#[contract]
pub struct FundMe;

#[contractimpl]
impl FundMe {
    // ─────────────────────────────────────────────────────────
    // Construction
    // ─────────────────────────────────────────────────────────

    /// Bind the owner, the USD price feed and the native asset contract.
    ///
    /// None of them can change afterwards. The deployer passes its own
    /// address as `owner`.
    pub fn __constructor(env: Env, owner: Address, price_feed: Address, native_asset: Address) {
        storage::init(&env, &owner, &price_feed, &native_asset);
    }

    // ─────────────────────────────────────────────────────────
    // Funding
    // ─────────────────────────────────────────────────────────

    /// Contribute `amount` of the native asset.
    ///
    /// - `funder` must authorize; anyone may contribute.
    /// - Fails with `InsufficientValue` when `amount` is worth less than
    ///   [`MINIMUM_USD`]; exactly the minimum is accepted.
    /// - Repeat contributions accumulate, and each one appends `funder` to
    ///   the roster again.
    pub fn fund(env: Env, funder: Address, amount: i128) -> Result<(), Error> {
        funder.require_auth();

        if amount < 0 {
            return Err(Error::InvalidAmount);
        }

        let price_feed = storage::get_price_feed(&env)?;
        let usd_value = price_converter::convert_to_stable(&env, &price_feed, amount)?;
        if usd_value < MINIMUM_USD {
            return Err(Error::InsufficientValue);
        }

        let asset = token::Client::new(&env, &storage::get_native_asset(&env)?);
        asset.transfer(&funder, &env.current_contract_address(), &amount);

        let total_funded = storage::add_amount_funded(&env, &funder, amount)?;
        storage::push_funder(&env, &funder)?;

        events::emit_funded(&env, funder, amount, total_funded);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────
    // Withdrawal
    // ─────────────────────────────────────────────────────────

    /// Send the whole balance to the owner and reset the ledger.
    ///
    /// Every funder's recorded amount returns to zero and the roster is
    /// emptied before the payout. Fails with `NotOwner` for any other caller
    /// and with `TransferFailed` when the payout is rejected; in both cases
    /// nothing changes.
    pub fn withdraw(env: Env, caller: Address) -> Result<(), Error> {
        let owner = Self::require_owner(&env, &caller)?;
        let balance = Self::held_balance(&env)?;

        // The roster length is re-read from storage on every iteration.
        let mut index = 0;
        while index < storage::get_funder_count(&env) {
            let funder = storage::get_funder(&env, index)?;
            storage::clear_amount_funded(&env, &funder);
            index += 1;
        }
        let funder_count = storage::get_funder_count(&env);
        storage::clear_funders(&env, funder_count);

        Self::pay_out(&env, &owner, balance, funder_count)
    }

    /// Same effects as [`FundMe::withdraw`], but the roster is read once
    /// and walked in memory.
    pub fn cheaper_withdraw(env: Env, caller: Address) -> Result<(), Error> {
        let owner = Self::require_owner(&env, &caller)?;
        let balance = Self::held_balance(&env)?;

        let funders = storage::load_funders(&env)?;
        for funder in funders.iter() {
            storage::clear_amount_funded(&env, &funder);
        }
        storage::clear_funders(&env, funders.len());

        Self::pay_out(&env, &owner, balance, funders.len())
    }

    // ─────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────

    pub fn get_owner(env: Env) -> Result<Address, Error> {
        storage::get_owner(&env)
    }

    pub fn get_price_feed(env: Env) -> Result<Address, Error> {
        storage::get_price_feed(&env)
    }

    pub fn get_native_asset(env: Env) -> Result<Address, Error> {
        storage::get_native_asset(&env)
    }

    /// Amount recorded for `funder` in the current round; zero if none.
    pub fn get_address_to_amount_funded(env: Env, funder: Address) -> i128 {
        storage::get_amount_funded(&env, &funder)
    }

    /// Roster entry at `index`. Fails with `IndexOutOfRange` past the end.
    pub fn get_funder(env: Env, index: u32) -> Result<Address, Error> {
        storage::get_funder(&env, index)
    }

    pub fn get_funder_count(env: Env) -> u32 {
        storage::get_funder_count(&env)
    }

    /// Native asset currently held by the contract.
    pub fn get_balance(env: Env) -> Result<i128, Error> {
        Self::held_balance(&env)
    }

    /// Current USD price of one native unit, with 18 decimals.
    pub fn get_conversion_rate(env: Env) -> Result<i128, Error> {
        let price_feed = storage::get_price_feed(&env)?;
        price_converter::get_conversion_rate(&env, &price_feed)
    }

    pub fn minimum_usd(_env: Env) -> i128 {
        MINIMUM_USD
    }

    // ─────────────────────────────────────────────────────────
    // Internal Helpers
    // ─────────────────────────────────────────────────────────

    fn require_owner(env: &Env, caller: &Address) -> Result<Address, Error> {
        caller.require_auth();
        let owner = storage::get_owner(env)?;
        if *caller != owner {
            return Err(Error::NotOwner);
        }
        Ok(owner)
    }

    fn held_balance(env: &Env) -> Result<i128, Error> {
        let asset = token::Client::new(env, &storage::get_native_asset(env)?);
        Ok(asset.balance(&env.current_contract_address()))
    }

    fn pay_out(env: &Env, owner: &Address, amount: i128, funder_count: u32) -> Result<(), Error> {
        if amount > 0 {
            let asset = token::Client::new(env, &storage::get_native_asset(env)?);
            match asset.try_transfer(&env.current_contract_address(), owner, &amount) {
                Ok(Ok(())) => {}
                _ => return Err(Error::TransferFailed),
            }
        }

        events::emit_withdrawn(env, owner.clone(), amount, funder_count);
        Ok(())
    }
}
