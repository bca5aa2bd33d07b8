//! # Mock Price Feed
//!
//! Fixed-price stand-in for a live price feed, deployed on development
//! networks so that `fund_me` can be exercised without external state.
//!
//! The interface mirrors the aggregator shape `fund_me` consumes:
//!
//! | Entry point         | Returns                                   |
//! |---------------------|-------------------------------------------|
//! | `decimals`          | precision of `answer`                     |
//! | `latest_round_data` | [`RoundData`] of the most recent update   |
//! | `latest_answer`     | `answer` of the most recent update        |
//!
//! `update_answer` moves the price, `set_halted` makes every price read fail
//! with [`FeedError::Halted`].

#![no_std]

use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, panic_with_error, Env, String,
};


const DAY_IN_LEDGERS: u32 = 17_280;
const INSTANCE_BUMP_AMOUNT: u32 = 7 * DAY_IN_LEDGERS;
const INSTANCE_LIFETIME_THRESHOLD: u32 = DAY_IN_LEDGERS;

const VERSION: u32 = 4;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum FeedError {
    Halted = 1,
    NoData = 2,
}

/// Answer of a single price round.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RoundData {
    pub round_id: u64,
    pub answer: i128,
    pub started_at: u64,
    pub updated_at: u64,
    pub answered_in_round: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
enum DataKey {
    Decimals,
    Latest,
    Halted,
}

#[contract]
pub struct MockPriceFeed;

#[contractimpl]
impl MockPriceFeed {
    /// Deploy the feed with a fixed `decimals` precision and a first answer.
    pub fn __constructor(env: Env, decimals: u32, initial_answer: i128) {
        env.storage().instance().set(&DataKey::Decimals, &decimals);
        Self::write_round(&env, 1, initial_answer);
    }

    pub fn decimals(env: Env) -> u32 {
        bump_instance(&env);
        env.storage()
            .instance()
            .get(&DataKey::Decimals)
            .unwrap_or(0)
    }

    pub fn description(env: Env) -> String {
        String::from_str(&env, "XLM / USD (mock)")
    }

    pub fn version(_env: Env) -> u32 {
        VERSION
    }

    pub fn latest_round_data(env: Env) -> RoundData {
        Self::require_live(&env);
        Self::load_round(&env)
    }

    pub fn latest_answer(env: Env) -> i128 {
        Self::require_live(&env);
        Self::load_round(&env).answer
    }

    /// Publish a new answer as the next round.
    pub fn update_answer(env: Env, answer: i128) {
        let next = Self::load_round(&env).round_id + 1;
        Self::write_round(&env, next, answer);
    }

    /// Toggle the halted flag. While halted, price reads fail.
    pub fn set_halted(env: Env, halted: bool) {
        bump_instance(&env);
        env.storage().instance().set(&DataKey::Halted, &halted);
    }

    fn require_live(env: &Env) {
        bump_instance(env);
        let halted: bool = env
            .storage()
            .instance()
            .get(&DataKey::Halted)
            .unwrap_or(false);
        if halted {
            panic_with_error!(env, FeedError::Halted);
        }
    }

    fn load_round(env: &Env) -> RoundData {
        env.storage()
            .instance()
            .get(&DataKey::Latest)
            .unwrap_or_else(|| panic_with_error!(env, FeedError::NoData))
    }

    fn write_round(env: &Env, round_id: u64, answer: i128) {
        bump_instance(env);
        let now = env.ledger().timestamp();
        let round = RoundData {
            round_id,
            answer,
            started_at: now,
            updated_at: now,
            answered_in_round: round_id,
        };
        env.storage().instance().set(&DataKey::Latest, &round);
    }
}

fn bump_instance(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
}
