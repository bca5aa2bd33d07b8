#![allow(dead_code)]

extern crate std;

use std::vec::Vec as StdVec;

use soroban_sdk::Address;

use crate::storage;
use crate::test::Setup;
use crate::Error;

/// Roster entries in order, read through the public accessors.
pub fn roster(s: &Setup) -> StdVec<Address> {
    (0..s.fund_me.get_funder_count())
        .map(|i| s.fund_me.get_funder(&i))
        .collect()
}

/// Roster entries without duplicates, in order of first appearance.
pub fn unique_funders(s: &Setup) -> StdVec<Address> {
    let mut unique: StdVec<Address> = StdVec::new();
    for funder in roster(s) {
        if !unique.contains(&funder) {
            unique.push(funder);
        }
    }
    unique
}

/// INV-1: the recorded amounts add up to the asset balance held by the contract.
pub fn assert_records_match_balance(s: &Setup) {
    let recorded: i128 = unique_funders(s)
        .iter()
        .map(|f| s.fund_me.get_address_to_amount_funded(f))
        .sum();
    assert_eq!(
        recorded,
        s.contract_balance(),
        "INV-1 violated: recorded {} but contract holds {}",
        recorded,
        s.contract_balance()
    );
}

/// INV-2: every roster entry has a contribution record.
pub fn assert_roster_has_records(s: &Setup) {
    for funder in roster(s) {
        let has_record = s.env.as_contract(&s.fund_me.address, || {
            storage::has_amount_funded(&s.env, &funder)
        });
        assert!(has_record, "INV-2 violated: roster entry without a record");
    }
}

/// INV-3: recorded amounts are never negative.
pub fn assert_records_non_negative(s: &Setup) {
    for funder in unique_funders(s) {
        let amount = s.fund_me.get_address_to_amount_funded(&funder);
        assert!(amount >= 0, "INV-3 violated: negative record {}", amount);
    }
}

/// INV-4: a successful contribution adds exactly `amount` to the funder's record.
pub fn assert_fund_accumulates(before: i128, after: i128, amount: i128) {
    assert_eq!(
        after,
        before + amount,
        "INV-4 violated: {} + {} != {}",
        before,
        amount,
        after
    );
}

/// INV-5: after a withdrawal the ledger is empty: no balance, no roster,
/// and no record for any previous funder.
pub fn assert_ledger_reset(s: &Setup, previous_funders: &[Address]) {
    assert_eq!(s.contract_balance(), 0, "INV-5 violated: balance left behind");
    assert_eq!(s.fund_me.get_funder_count(), 0, "INV-5 violated: roster not cleared");
    assert_eq!(
        s.fund_me.try_get_funder(&0),
        Err(Ok(Error::IndexOutOfRange)),
        "INV-5 violated: roster index 0 still readable"
    );
    for funder in previous_funders {
        assert_eq!(
            s.fund_me.get_address_to_amount_funded(funder),
            0,
            "INV-5 violated: record not cleared"
        );
    }
}

/// Run all stateless ledger invariants.
pub fn assert_all_ledger_invariants(s: &Setup) {
    assert_records_match_balance(s);
    assert_roster_has_records(s);
    assert_records_non_negative(s);
}
