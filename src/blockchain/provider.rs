//! The wallet provider seam.
//!
//! Mirrors the subset of an EIP-1193 provider the core consumes: account
//! access, network switching, permission revocation, reads, transaction
//! submission and an inbound event stream. Everything above this trait is
//! testable against an in-memory implementation.

use alloy::primitives::{Address, Bytes, Log, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use futures_util::future::BoxFuture;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::config::NetworkDescriptor;

/// EIP-1193: the user rejected the request.
pub const USER_REJECTED_CODE: i64 = 4001;
/// EIP-1193: the requested method/account has not been authorized.
pub const UNAUTHORIZED_CODE: i64 = 4100;
/// EIP-1193: the method is not supported by this provider.
pub const UNSUPPORTED_METHOD_CODE: i64 = 4200;
/// EIP-3326: the chain has not been added to the wallet.
pub const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;
/// JSON-RPC: execution reverted (EIP-1474 / geth).
pub const EXECUTION_REVERTED_CODE: i64 = 3;
/// JSON-RPC internal error, used for transport failures.
pub const INTERNAL_ERROR_CODE: i64 = -32603;

/// Error reported by a wallet provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("provider error {code}: {message}")]
pub struct ProviderRpcError {
    pub code: i64,
    pub message: String,
}

impl ProviderRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(INTERNAL_ERROR_CODE, message)
    }

    /// Whether the user declined the prompt.
    pub fn is_user_rejection(&self) -> bool {
        if self.code == USER_REJECTED_CODE {
            return true;
        }
        let msg = self.message.to_ascii_lowercase();
        msg.contains("user rejected") || msg.contains("user denied")
    }

    /// Whether the node rejected the call because the contract reverted.
    pub fn is_revert(&self) -> bool {
        if self.code == EXECUTION_REVERTED_CODE {
            return true;
        }
        self.message.to_ascii_lowercase().contains("revert")
    }

    /// Whether the wallet does not know the requested chain.
    pub fn is_unrecognized_chain(&self) -> bool {
        self.code == UNRECOGNIZED_CHAIN_CODE
    }
}

pub type ProviderResult<T> = Result<T, ProviderRpcError>;

/// Notifications pushed by the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// Authorized accounts changed; empty means the wallet disconnected us.
    AccountsChanged(Vec<Address>),
    /// The wallet moved to another chain.
    ChainChanged(u64),
}

/// What the core needs from a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptSummary {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    /// False when the transaction reverted.
    pub success: bool,
    pub logs: Vec<Log>,
}

/// An injected wallet plus its view of the chain.
pub trait WalletProvider: Send + Sync {
    /// `eth_requestAccounts`: may prompt the user.
    fn request_accounts(&self) -> BoxFuture<'_, ProviderResult<Vec<Address>>>;

    /// `eth_accounts`: already authorized accounts, never prompts.
    fn accounts(&self) -> BoxFuture<'_, ProviderResult<Vec<Address>>>;

    /// `eth_chainId` of the wallet's active network.
    fn chain_id(&self) -> BoxFuture<'_, ProviderResult<u64>>;

    /// `wallet_switchEthereumChain`.
    fn switch_chain(&self, chain_id: u64) -> BoxFuture<'_, ProviderResult<()>>;

    /// `wallet_addEthereumChain`.
    fn add_chain(&self, network: NetworkDescriptor) -> BoxFuture<'_, ProviderResult<()>>;

    /// `wallet_revokePermissions` for `eth_accounts`. Not every wallet supports it.
    fn revoke_permissions(&self) -> BoxFuture<'_, ProviderResult<()>>;

    fn get_balance(&self, address: Address) -> BoxFuture<'_, ProviderResult<U256>>;

    fn get_block_number(&self) -> BoxFuture<'_, ProviderResult<u64>>;

    /// `eth_call` against the latest block.
    fn call(&self, tx: TransactionRequest) -> BoxFuture<'_, ProviderResult<Bytes>>;

    /// `eth_sendTransaction`: signs (possibly prompting) and broadcasts.
    fn send_transaction(&self, tx: TransactionRequest) -> BoxFuture<'_, ProviderResult<TxHash>>;

    fn get_transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> BoxFuture<'_, ProviderResult<Option<ReceiptSummary>>>;

    /// Subscribe to `accountsChanged` / `chainChanged`.
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}
