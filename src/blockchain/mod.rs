//! Wallet connection subsystem.
//!
//! # Data Flow
//! ```text
//! Environment Variables (private key) + [network] config
//!     → local.rs (key loading, RPC endpoints with timeouts, chain switching)
//!     → provider.rs (WalletProvider seam; fakes plug in here)
//!     → session.rs (connect / restore / disconnect, wallet notifications)
//!     → SessionEvent broadcast → contract gateway rebinds its signer
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - Raw provider errors never escape `ChainSession`

pub mod local;
pub mod persist;
pub mod provider;
pub mod session;
pub mod types;

pub use local::LocalWalletProvider;
pub use persist::DisconnectFlag;
pub use provider::{ProviderEvent, ProviderRpcError, ReceiptSummary, WalletProvider};
pub use session::ChainSession;
pub use types::{SessionEvent, SessionHandle};
