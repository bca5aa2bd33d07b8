extern crate std;

use std::vec::Vec as StdVec;

use mock_price_feed::MockPriceFeed;
use soroban_sdk::{testutils::Address as _, Address, Env};

use crate::invariants::*;
use crate::storage::DataKey;
use crate::test::{setup, Setup, FEED_DECIMALS, INITIAL_PRICE, MINIMUM_NATIVE, SEND_VALUE};
use crate::{Error, FundMe, FundMeClient};

/// Asset contract that refuses to credit frozen accounts.
mod gated_token {
    use soroban_sdk::{
        contract, contracterror, contractimpl, contracttype, panic_with_error, Address, Env,
    };

    #[contracterror]
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    #[repr(u32)]
    pub enum GatedError {
        Frozen = 1,
        InsufficientBalance = 2,
    }

    #[contracttype]
    enum Key {
        Balance(Address),
        Frozen(Address),
    }

    #[contract]
    pub struct GatedToken;

    #[contractimpl]
    impl GatedToken {
        pub fn mint(env: Env, to: Address, amount: i128) {
            let balance = Self::balance(env.clone(), to.clone());
            env.storage()
                .persistent()
                .set(&Key::Balance(to), &(balance + amount));
        }

        pub fn freeze(env: Env, id: Address) {
            env.storage().persistent().set(&Key::Frozen(id), &true);
        }

        pub fn balance(env: Env, id: Address) -> i128 {
            env.storage()
                .persistent()
                .get(&Key::Balance(id))
                .unwrap_or(0)
        }

        pub fn transfer(env: Env, from: Address, to: Address, amount: i128) {
            from.require_auth();
            if env.storage().persistent().has(&Key::Frozen(to.clone())) {
                panic_with_error!(&env, GatedError::Frozen);
            }
            let from_balance = Self::balance(env.clone(), from.clone());
            if from_balance < amount {
                panic_with_error!(&env, GatedError::InsufficientBalance);
            }
            env.storage()
                .persistent()
                .set(&Key::Balance(from), &(from_balance - amount));
            Self::mint(env, to, amount);
        }
    }
}

use gated_token::{GatedToken, GatedTokenClient};

/// Balances and records observed around a withdrawal.
#[derive(Debug, PartialEq, Eq)]
struct Outcome {
    contract_balance: i128,
    owner_gain: i128,
    funder_count: u32,
    records: StdVec<i128>,
}

/// Owner funds once, five more funders fund once each, then the owner
/// withdraws through the selected entry point.
fn fund_six_then_withdraw(cheaper: bool) -> Outcome {
    let s = setup();
    let mut funders = std::vec![s.owner.clone()];
    s.fund(&s.owner, SEND_VALUE);
    for _ in 1..6 {
        let funder = s.new_funder();
        s.fund(&funder, SEND_VALUE);
        funders.push(funder);
    }

    let starting_contract = s.contract_balance();
    let starting_owner = s.asset.balance(&s.owner);
    assert_eq!(starting_contract, 6 * SEND_VALUE);

    if cheaper {
        s.fund_me.cheaper_withdraw(&s.owner);
    } else {
        s.fund_me.withdraw(&s.owner);
    }

    assert_ledger_reset(&s, &funders);
    let ending_owner = s.asset.balance(&s.owner);
    assert_eq!(ending_owner, starting_owner + starting_contract);

    Outcome {
        contract_balance: s.contract_balance(),
        owner_gain: ending_owner - starting_owner,
        funder_count: s.fund_me.get_funder_count(),
        records: funders
            .iter()
            .map(|f| s.fund_me.get_address_to_amount_funded(f))
            .collect(),
    }
}

fn funded_setup() -> Setup {
    let s = setup();
    s.fund(&s.owner, SEND_VALUE);
    s
}

// ── Withdraw ────────────────────────────────────────────────────────

#[test]
fn test_withdraw_from_single_funder() {
    let s = funded_setup();
    let starting_contract = s.contract_balance();
    let starting_owner = s.asset.balance(&s.owner);

    s.fund_me.withdraw(&s.owner);

    assert_eq!(s.contract_balance(), 0);
    assert_eq!(
        s.asset.balance(&s.owner),
        starting_contract + starting_owner
    );
    assert_ledger_reset(&s, &[s.owner.clone()]);
}

#[test]
fn test_withdraw_with_multiple_funders() {
    let outcome = fund_six_then_withdraw(false);
    assert_eq!(outcome.contract_balance, 0);
    assert_eq!(outcome.owner_gain, 6 * SEND_VALUE);
    assert_eq!(outcome.records, std::vec![0; 6]);
}

#[test]
fn test_cheaper_withdraw_with_multiple_funders() {
    let outcome = fund_six_then_withdraw(true);
    assert_eq!(outcome.contract_balance, 0);
    assert_eq!(outcome.owner_gain, 6 * SEND_VALUE);
    assert_eq!(outcome.records, std::vec![0; 6]);
}

#[test]
fn test_withdraw_and_cheaper_withdraw_are_equivalent() {
    assert_eq!(fund_six_then_withdraw(false), fund_six_then_withdraw(true));
}

#[test]
fn test_withdraw_clears_duplicate_roster_entries() {
    let s = setup();
    let funder = s.new_funder();
    s.fund(&funder, SEND_VALUE);
    s.fund(&funder, MINIMUM_NATIVE);
    assert_eq!(s.fund_me.get_funder_count(), 2);

    s.fund_me.cheaper_withdraw(&s.owner);

    assert_ledger_reset(&s, &[funder]);
    assert_eq!(s.asset.balance(&s.owner), SEND_VALUE + MINIMUM_NATIVE);
}

#[test]
fn test_withdraw_on_empty_ledger() {
    let s = setup();

    s.fund_me.withdraw(&s.owner);
    s.fund_me.cheaper_withdraw(&s.owner);

    assert_ledger_reset(&s, &[]);
    assert_eq!(s.asset.balance(&s.owner), 0);
}

#[test]
fn test_ledger_reopens_after_withdraw() {
    let s = funded_setup();
    s.fund_me.withdraw(&s.owner);

    let funder = s.new_funder();
    s.fund(&funder, SEND_VALUE);

    assert_eq!(s.fund_me.get_funder_count(), 1);
    assert_eq!(s.fund_me.get_funder(&0), funder);
    assert_eq!(s.fund_me.get_address_to_amount_funded(&s.owner), 0);
    assert_all_ledger_invariants(&s);
}

#[test]
fn test_withdraw_variants_reject_missing_roster_entry() {
    for cheaper in [false, true] {
        let s = funded_setup();
        s.env.as_contract(&s.fund_me.address, || {
            s.env.storage().persistent().remove(&DataKey::Funder(0));
        });

        let result = if cheaper {
            s.fund_me.try_cheaper_withdraw(&s.owner)
        } else {
            s.fund_me.try_withdraw(&s.owner)
        };

        assert_eq!(result, Err(Ok(Error::IndexOutOfRange)));
        assert_eq!(s.contract_balance(), SEND_VALUE);
        assert_eq!(s.fund_me.get_funder_count(), 1);
        assert_eq!(s.fund_me.get_address_to_amount_funded(&s.owner), SEND_VALUE);
    }
}

// ── Access control ──────────────────────────────────────────────────

#[test]
fn test_only_owner_can_withdraw() {
    let s = funded_setup();
    let attacker = s.new_funder();
    s.fund(&attacker, SEND_VALUE);

    let roster_before = roster(&s);
    let balance_before = s.contract_balance();

    assert_eq!(s.fund_me.try_withdraw(&attacker), Err(Ok(Error::NotOwner)));
    assert_eq!(
        s.fund_me.try_cheaper_withdraw(&attacker),
        Err(Ok(Error::NotOwner))
    );

    assert_eq!(roster(&s), roster_before);
    assert_eq!(s.contract_balance(), balance_before);
    assert_eq!(s.fund_me.get_address_to_amount_funded(&s.owner), SEND_VALUE);
    assert_eq!(s.fund_me.get_address_to_amount_funded(&attacker), SEND_VALUE);
    assert_eq!(s.asset.balance(&attacker), 0);
}

// ── Payout failure ──────────────────────────────────────────────────

struct GatedSetup {
    env: Env,
    fund_me: FundMeClient<'static>,
    token: GatedTokenClient<'static>,
    owner: Address,
}

fn gated_setup() -> GatedSetup {
    let env = Env::default();
    env.mock_all_auths();

    let owner = Address::generate(&env);
    let feed_id = env.register(MockPriceFeed, (FEED_DECIMALS, INITIAL_PRICE));
    let token_id = env.register(GatedToken, ());
    let contract_id = env.register(FundMe, (owner.clone(), feed_id, token_id.clone()));

    GatedSetup {
        fund_me: FundMeClient::new(&env, &contract_id),
        token: GatedTokenClient::new(&env, &token_id),
        owner,
        env,
    }
}

fn assert_rejected_payout_rolls_back(cheaper: bool) {
    let g = gated_setup();
    let funder = Address::generate(&g.env);
    g.token.mint(&funder, &SEND_VALUE);
    g.fund_me.fund(&funder, &SEND_VALUE);

    g.token.freeze(&g.owner);

    let result = if cheaper {
        g.fund_me.try_cheaper_withdraw(&g.owner)
    } else {
        g.fund_me.try_withdraw(&g.owner)
    };
    assert_eq!(result, Err(Ok(Error::TransferFailed)));

    // Neither the reset nor the payout took effect.
    assert_eq!(g.token.balance(&g.fund_me.address), SEND_VALUE);
    assert_eq!(g.token.balance(&g.owner), 0);
    assert_eq!(g.fund_me.get_funder_count(), 1);
    assert_eq!(g.fund_me.get_funder(&0), funder);
    assert_eq!(g.fund_me.get_address_to_amount_funded(&funder), SEND_VALUE);
}

#[test]
fn test_withdraw_rolls_back_when_payout_is_rejected() {
    assert_rejected_payout_rolls_back(false);
}

#[test]
fn test_cheaper_withdraw_rolls_back_when_payout_is_rejected() {
    assert_rejected_payout_rolls_back(true);
}
