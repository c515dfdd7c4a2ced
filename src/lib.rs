//! Charity donation core.
//!
//! Wallet session lifecycle, charity contract access with on-chain data
//! normalization, and a cached fiat exchange rate.

pub mod blockchain;
pub mod config;
pub mod contract;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod rates;

pub use blockchain::{ChainSession, LocalWalletProvider, WalletProvider};
pub use config::CharityConfig;
pub use contract::ContractGateway;
pub use error::{CharityError, CharityResult, Locale, Notice};
pub use lifecycle::CharityApp;
pub use rates::ExchangeRateCache;
