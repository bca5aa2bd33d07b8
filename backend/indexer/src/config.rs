//! Application configuration loaded from environment variables.
//!
//! `NETWORK` picks the defaults: development networks (`local`) run against a
//! locally deployed FundMe bound to the mock price feed and need no
//! confirmation depth; public networks wait [`Network::default_confirmations`]
//! ledgers before an event is stored.

use std::fmt;

use serde::Serialize;

use crate::errors::{IndexerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Local,
    Testnet,
    Futurenet,
    Mainnet,
}

impl Network {
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "local" | "localhost" | "standalone" => Ok(Self::Local),
            "testnet" => Ok(Self::Testnet),
            "futurenet" => Ok(Self::Futurenet),
            "mainnet" | "public" => Ok(Self::Mainnet),
            other => Err(IndexerError::Config(format!("Unknown NETWORK: {other}"))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Testnet => "testnet",
            Self::Futurenet => "futurenet",
            Self::Mainnet => "mainnet",
        }
    }

    /// `true` for networks where FundMe is bound to the mock price feed.
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Local)
    }

    /// RPC endpoint used when `RPC_URL` is not set. Mainnet has none.
    pub fn default_rpc_url(&self) -> Option<&'static str> {
        match self {
            Self::Local => Some("http://localhost:8000/soroban/rpc"),
            Self::Testnet => Some("https://soroban-testnet.stellar.org"),
            Self::Futurenet => Some("https://rpc-futurenet.stellar.org"),
            Self::Mainnet => None,
        }
    }

    /// Ledgers an event must be buried under before it is indexed.
    pub fn default_confirmations(&self) -> u32 {
        if self.is_development() {
            0
        } else {
            6
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Network the FundMe contract is deployed on
    pub network: Network,
    /// Soroban RPC endpoint (e.g. https://soroban-testnet.stellar.org)
    pub rpc_url: String,
    /// The FundMe contract address (Strkey format)
    pub contract_id: String,
    /// Path to the SQLite database file
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// How often (in seconds) to poll the RPC for new events
    pub poll_interval_secs: u64,
    /// Maximum number of events to fetch per RPC request
    pub events_per_page: u32,
    /// Ledger to start from if no cursor is saved
    pub start_ledger: u32,
    /// Ledgers to wait before indexing an event
    pub confirmations: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| -> Result<String> {
            lookup(key).ok_or_else(|| IndexerError::Config(format!("Missing env var: {key}")))
        };

        let network = match lookup("NETWORK") {
            Some(name) => Network::parse(&name)?,
            None => Network::Testnet,
        };

        let rpc_url = match lookup("RPC_URL") {
            Some(url) => url,
            None => network.default_rpc_url().map(String::from).ok_or_else(|| {
                IndexerError::Config(format!("RPC_URL is required on {network}"))
            })?,
        };

        Ok(Config {
            network,
            rpc_url,
            contract_id: var("CONTRACT_ID").map_err(|_| {
                IndexerError::Config("CONTRACT_ID environment variable is required".to_string())
            })?,
            database_url: var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./fund_me_events.db".to_string()),
            api_port: parse_or(&lookup, "API_PORT", 3001)?,
            poll_interval_secs: parse_or(&lookup, "POLL_INTERVAL_SECS", 5)?,
            events_per_page: parse_or(&lookup, "EVENTS_PER_PAGE", 100)?,
            start_ledger: parse_or(&lookup, "START_LEDGER", 0)?,
            confirmations: parse_or(&lookup, "CONFIRMATIONS", network.default_confirmations())?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| IndexerError::Config(format!("Invalid {key}"))),
        None => Ok(default),
    }
}
