use soroban_sdk::{contracttype, symbol_short, Address, Env};

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FundedEvent {
    pub funder: Address,
    pub amount: i128,
    /// Funder's recorded amount after this contribution.
    pub total_funded: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WithdrawnEvent {
    pub owner: Address,
    pub amount: i128,
    /// Roster length at the time of the withdrawal.
    pub funder_count: u32,
}

pub fn emit_funded(env: &Env, funder: Address, amount: i128, total_funded: i128) {
    let topics = (symbol_short!("funded"), funder.clone());
    let data = FundedEvent {
        funder,
        amount,
        total_funded,
    };
    env.events().publish(topics, data);
}

pub fn emit_withdrawn(env: &Env, owner: Address, amount: i128, funder_count: u32) {
    let topics = (symbol_short!("withdrawn"), owner.clone());
    let data = WithdrawnEvent {
        owner,
        amount,
        funder_count,
    };
    env.events().publish(topics, data);
}
