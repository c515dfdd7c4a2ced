//! Session handle and lifecycle event types.

use std::sync::Arc;

use alloy::primitives::Address;

use crate::blockchain::provider::WalletProvider;

/// The live (account, network, signer) tuple of a connected wallet.
///
/// Cheap to clone. Handles are invalidated by a chain change; holders must
/// drop them when they observe [`SessionEvent::ChainReset`].
#[derive(Clone)]
pub struct SessionHandle {
    pub account: Address,
    pub chain_id: u64,
    /// Provider that signs on behalf of `account`.
    pub provider: Arc<dyn WalletProvider>,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("account", &self.account)
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

/// Published by [`ChainSession`](crate::blockchain::ChainSession) whenever
/// the session changes.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A session was established (explicit connect or restore).
    Connected(SessionHandle),
    /// Same network, different account.
    AccountChanged(SessionHandle),
    /// The session was torn down by the user or the wallet.
    Disconnected,
    /// The wallet changed chains; every held handle is invalid.
    ChainReset { chain_id: u64 },
}

impl SessionEvent {
    /// Metrics/log label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected(_) => "connected",
            Self::AccountChanged(_) => "account_changed",
            Self::Disconnected => "disconnected",
            Self::ChainReset { .. } => "chain_reset",
        }
    }

    /// The new signer handle, when the event carries one.
    pub fn handle(&self) -> Option<&SessionHandle> {
        match self {
            Self::Connected(handle) | Self::AccountChanged(handle) => Some(handle),
            _ => None,
        }
    }
}

/// Short display form of an address: `0x1234...abcd`.
pub fn short_address(address: &Address) -> String {
    let full = address.to_string();
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}
