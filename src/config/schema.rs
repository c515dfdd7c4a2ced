//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CharityConfig {
    /// Network the contract is deployed on.
    pub network: NetworkDescriptor,

    /// Deployed contract and read/write tuning.
    pub contract: ContractConfig,

    /// Fiat exchange rate settings.
    pub rates: RateConfig,

    /// Session persistence.
    pub session: SessionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Network descriptor, also sent verbatim in `wallet_addEthereumChain`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkDescriptor {
    /// Required chain ID (71 for Conflux eSpace Testnet).
    pub chain_id: u64,

    /// Human readable chain name.
    pub chain_name: String,

    /// Native currency metadata.
    pub native_currency: NativeCurrency,

    /// JSON-RPC endpoints; the first one is used for reads.
    pub rpc_urls: Vec<String>,

    /// Block explorer base URLs.
    pub block_explorer_urls: Vec<String>,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,
}

impl NetworkDescriptor {
    /// Chain ID as the `0x`-prefixed hex string wallets expect.
    pub fn chain_id_hex(&self) -> String {
        format!("{:#x}", self.chain_id)
    }

    /// Explorer link for a transaction hash, if an explorer is configured.
    pub fn explorer_tx_url(&self, tx_hash: &str) -> Option<String> {
        self.block_explorer_urls
            .first()
            .map(|base| format!("{}/tx/{}", base.trim_end_matches('/'), tx_hash))
    }
}

impl Default for NetworkDescriptor {
    fn default() -> Self {
        Self {
            chain_id: 71,
            chain_name: "Conflux eSpace Testnet".to_string(),
            native_currency: NativeCurrency::default(),
            rpc_urls: vec!["https://evmtestnet.confluxrpc.com".to_string()],
            block_explorer_urls: vec!["https://evmtestnet.confluxscan.io".to_string()],
            rpc_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl Default for NativeCurrency {
    fn default() -> Self {
        Self {
            name: "CFX".to_string(),
            symbol: "CFX".to_string(),
            decimals: 18,
        }
    }
}

/// Charity contract configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContractConfig {
    /// Deployed contract address.
    pub address: String,

    /// Path to the JSON ABI descriptor. Falls back to the built-in ABI.
    pub abi_path: String,

    /// Maximum records returned by one paginated read.
    pub page_limit: usize,

    /// Concurrent reads during fan-out (1 = sequential).
    pub fetch_concurrency: usize,

    /// Confirmations a write waits for.
    pub confirmations: u64,

    /// Receipt polling interval in milliseconds.
    pub receipt_poll_ms: u64,

    /// Give up waiting for a receipt after this many seconds (unset = wait).
    pub receipt_timeout_secs: Option<u64>,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            address: "0x7fF862bAD0628e1987037294C3c4bc3d6f367471".to_string(),
            abi_path: "charityAbi.json".to_string(),
            page_limit: 20,
            fetch_concurrency: 8,
            confirmations: 1,
            receipt_poll_ms: 2000,
            receipt_timeout_secs: None,
        }
    }
}

/// Exchange rate cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateConfig {
    /// Quote endpoint base URL.
    pub quote_url: String,

    /// Asset identifier at the quote source.
    pub asset_id: String,

    /// Fixed USD → local currency multiplier.
    pub usd_to_local: f64,

    /// Rate used when the quote source is unreachable.
    pub fallback_rate: f64,

    /// Cache lifetime in seconds.
    pub ttl_secs: u64,

    /// HTTP timeout for the quote request in seconds.
    pub timeout_secs: u64,

    /// Local currency code, for display.
    pub currency: String,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            quote_url: "https://api.coingecko.com/api/v3/simple/price".to_string(),
            asset_id: "ethereum".to_string(),
            usd_to_local: 25_000.0,
            fallback_rate: 80_000_000.0,
            ttl_secs: 300,
            timeout_secs: 10,
            currency: "VND".to_string(),
        }
    }
}

/// Session persistence configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// File holding the "explicitly disconnected" flag. None disables persistence.
    pub state_path: Option<String>,

    /// Try to resume a previously authorized account on startup.
    pub auto_connect: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            state_path: Some(".charity-session.json".to_string()),
            auto_connect: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
