extern crate std;

use soroban_sdk::{symbol_short, testutils::Events, vec, IntoVal, TryIntoVal};

use crate::events::{FundedEvent, WithdrawnEvent};
use crate::test::{setup, SEND_VALUE};

#[test]
fn test_funded_event() {
    let s = setup();
    let funder = s.new_funder();

    s.fund(&funder, SEND_VALUE);

    let all_events = s.env.events().all();
    let last_event = all_events.last().expect("No events found");

    // Topic: (symbol_short!("funded"), funder)
    assert_eq!(last_event.0, s.fund_me.address);
    let expected_topics = vec![
        &s.env,
        symbol_short!("funded").into_val(&s.env),
        funder.into_val(&s.env),
    ];
    assert_eq!(last_event.1, expected_topics);

    let event_data: FundedEvent = last_event.2.try_into_val(&s.env).unwrap();
    assert_eq!(
        event_data,
        FundedEvent {
            funder: funder.clone(),
            amount: SEND_VALUE,
            total_funded: SEND_VALUE,
        }
    );
}

#[test]
fn test_funded_event_reports_running_total() {
    let s = setup();
    let funder = s.new_funder();

    s.fund(&funder, SEND_VALUE);
    s.fund(&funder, SEND_VALUE);

    let last_event = s.env.events().all().last().expect("No events found");
    let event_data: FundedEvent = last_event.2.try_into_val(&s.env).unwrap();
    assert_eq!(event_data.amount, SEND_VALUE);
    assert_eq!(event_data.total_funded, 2 * SEND_VALUE);
}

#[test]
fn test_withdrawn_event() {
    let s = setup();
    let funder = s.new_funder();
    s.fund(&s.owner, SEND_VALUE);
    s.fund(&funder, SEND_VALUE);

    s.fund_me.withdraw(&s.owner);

    let all_events = s.env.events().all();
    let last_event = all_events.last().expect("No events found");

    // Topic: (symbol_short!("withdrawn"), owner)
    assert_eq!(last_event.0, s.fund_me.address);
    let expected_topics = vec![
        &s.env,
        symbol_short!("withdrawn").into_val(&s.env),
        s.owner.into_val(&s.env),
    ];
    assert_eq!(last_event.1, expected_topics);

    let event_data: WithdrawnEvent = last_event.2.try_into_val(&s.env).unwrap();
    assert_eq!(
        event_data,
        WithdrawnEvent {
            owner: s.owner.clone(),
            amount: 2 * SEND_VALUE,
            funder_count: 2,
        }
    );
}

#[test]
fn test_rejected_fund_emits_no_event() {
    let s = setup();
    let funder = s.new_funder();

    let _ = s.fund_me.try_fund(&funder, &0);

    let contract_events = s
        .env
        .events()
        .all()
        .iter()
        .filter(|e| e.0 == s.fund_me.address)
        .count();
    assert_eq!(contract_events, 0);
}
