//! Key-backed wallet provider over JSON-RPC.
//!
//! # Responsibilities
//! - Load the signing key from the environment
//! - Connect to the network's RPC endpoints with timeout and failover
//! - Behave like an injected browser wallet: authorization, chain switching,
//!   permission revocation and change notifications
//!
//! # Security
//! - Private keys ONLY from environment variables
//! - Keys are never logged or serialized

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::consensus::TxReceipt;
use alloy::network::EthereumWallet;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::{TransportError, TransportResult};
use arc_swap::ArcSwap;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt};
use tokio::sync::broadcast;
use tokio::time::timeout;

use crate::blockchain::provider::{
    ProviderEvent, ProviderResult, ProviderRpcError, ReceiptSummary, WalletProvider,
    UNAUTHORIZED_CODE, UNRECOGNIZED_CHAIN_CODE,
};
use crate::config::NetworkDescriptor;
use crate::observability::metrics;

/// Environment variable name for the private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "CHARITY_WALLET_PRIVATE_KEY";

type DynProvider = Arc<dyn Provider + Send + Sync>;

/// Parse a hex-encoded private key (with or without 0x prefix).
pub fn parse_signer(private_key_hex: &str) -> ProviderResult<PrivateKeySigner> {
    let key_hex = private_key_hex
        .trim()
        .strip_prefix("0x")
        .unwrap_or(private_key_hex.trim());
    key_hex.parse().map_err(|e| {
        ProviderRpcError::new(UNAUTHORIZED_CODE, format!("Invalid private key format: {}", e))
    })
}

/// Read the signing key from `CHARITY_WALLET_PRIVATE_KEY`.
///
/// Returns `Ok(None)` when the variable is not set.
pub fn signer_from_env() -> ProviderResult<Option<PrivateKeySigner>> {
    match std::env::var(PRIVATE_KEY_ENV_VAR) {
        Ok(key) => parse_signer(&key).map(Some),
        Err(_) => Ok(None),
    }
}

fn rpc_error(err: TransportError) -> ProviderRpcError {
    match err.as_error_resp() {
        Some(payload) => ProviderRpcError::new(payload.code, payload.message.to_string()),
        None => ProviderRpcError::internal(err.to_string()),
    }
}

/// RPC handles for the network the wallet is currently on.
struct ActiveChain {
    network: NetworkDescriptor,
    /// Primary first, then failovers.
    providers: Vec<DynProvider>,
}

impl ActiveChain {
    fn connect(
        network: NetworkDescriptor,
        signer: Option<&PrivateKeySigner>,
    ) -> ProviderResult<Self> {
        let mut providers = Vec::new();
        for url_str in &network.rpc_urls {
            let url: url::Url = match url_str.parse() {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!(url = %url_str, error = %e, "Ignoring invalid RPC URL");
                    continue;
                }
            };
            let provider: DynProvider = match signer {
                Some(signer) => Arc::new(
                    ProviderBuilder::new()
                        .wallet(EthereumWallet::from(signer.clone()))
                        .connect_http(url),
                ),
                None => Arc::new(ProviderBuilder::new().connect_http(url)),
            };
            providers.push(provider);
        }

        if providers.is_empty() {
            return Err(ProviderRpcError::internal(format!(
                "No usable RPC URL for chain {}",
                network.chain_id
            )));
        }

        Ok(Self { network, providers })
    }
}

/// A wallet backed by a local private key, speaking JSON-RPC over HTTP.
///
/// Without a key it is read-only: reads work, account requests are refused.
pub struct LocalWalletProvider {
    signer: Option<PrivateKeySigner>,
    /// Networks this wallet knows how to switch to.
    networks: DashMap<u64, NetworkDescriptor>,
    active: ArcSwap<ActiveChain>,
    authorized: AtomicBool,
    timeout_duration: Duration,
    events: broadcast::Sender<ProviderEvent>,
}

impl LocalWalletProvider {
    /// Create a wallet that starts on `network`.
    pub fn new(
        network: NetworkDescriptor,
        signer: Option<PrivateKeySigner>,
    ) -> ProviderResult<Self> {
        let timeout_duration = Duration::from_secs(network.rpc_timeout_secs.max(1));
        let active = ActiveChain::connect(network.clone(), signer.as_ref())?;
        let networks = DashMap::new();
        networks.insert(network.chain_id, network.clone());
        let (events, _) = broadcast::channel(16);

        if let Some(signer) = &signer {
            tracing::info!(
                address = %signer.address(),
                chain_id = network.chain_id,
                "Local wallet initialized"
            );
        }

        Ok(Self {
            authorized: AtomicBool::new(signer.is_some()),
            signer,
            networks,
            active: ArcSwap::from_pointee(active),
            timeout_duration,
            events,
        })
    }

    /// Create a read-only provider (no signing key).
    pub fn read_only(network: NetworkDescriptor) -> ProviderResult<Self> {
        Self::new(network, None)
    }

    /// The wallet's address, if a key is loaded.
    pub fn address(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }

    fn emit(&self, event: ProviderEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn activate(&self, network: NetworkDescriptor) -> ProviderResult<()> {
        let previous = self.active.load().network.chain_id;
        let chain_id = network.chain_id;
        let active = ActiveChain::connect(network, self.signer.as_ref())?;
        self.active.store(Arc::new(active));
        if previous != chain_id {
            tracing::info!(from = previous, to = chain_id, "Wallet switched network");
            self.emit(ProviderEvent::ChainChanged(chain_id));
        }
        Ok(())
    }

    /// Run a read against each RPC endpoint in turn until one answers.
    ///
    /// An error response from a node (e.g. a revert) is final; only transport
    /// failures and timeouts fall through to the next endpoint.
    async fn with_failover<T, F, Fut>(&self, method: &'static str, f: F) -> ProviderResult<T>
    where
        F: Fn(DynProvider) -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        let providers = self.active.load().providers.clone();
        for (i, provider) in providers.into_iter().enumerate() {
            match timeout(self.timeout_duration, f(provider)).await {
                Ok(Ok(result)) => {
                    metrics::record_rpc_call(method, true);
                    return Ok(result);
                }
                Ok(Err(e)) if e.as_error_resp().is_some() => {
                    metrics::record_rpc_call(method, false);
                    return Err(rpc_error(e));
                }
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = i, method, error = %e, "RPC error, trying next provider");
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, method, "RPC timeout, trying next provider");
                }
            }
        }
        metrics::record_rpc_call(method, false);
        Err(ProviderRpcError::internal(format!(
            "All RPC providers failed ({})",
            method
        )))
    }

    fn authorized_signer(&self) -> ProviderResult<&PrivateKeySigner> {
        match &self.signer {
            Some(signer) if self.authorized.load(Ordering::SeqCst) => Ok(signer),
            Some(_) => Err(ProviderRpcError::new(
                UNAUTHORIZED_CODE,
                "Account access has been revoked",
            )),
            None => Err(ProviderRpcError::new(
                UNAUTHORIZED_CODE,
                format!("No wallet key configured (set {})", PRIVATE_KEY_ENV_VAR),
            )),
        }
    }
}

impl WalletProvider for LocalWalletProvider {
    fn request_accounts(&self) -> BoxFuture<'_, ProviderResult<Vec<Address>>> {
        async move {
            let signer = self.signer.as_ref().ok_or_else(|| {
                ProviderRpcError::new(
                    UNAUTHORIZED_CODE,
                    format!("No wallet key configured (set {})", PRIVATE_KEY_ENV_VAR),
                )
            })?;
            self.authorized.store(true, Ordering::SeqCst);
            Ok(vec![signer.address()])
        }
        .boxed()
    }

    fn accounts(&self) -> BoxFuture<'_, ProviderResult<Vec<Address>>> {
        async move {
            Ok(self
                .authorized_signer()
                .map(|s| vec![s.address()])
                .unwrap_or_default())
        }
        .boxed()
    }

    fn chain_id(&self) -> BoxFuture<'_, ProviderResult<u64>> {
        async move { Ok(self.active.load().network.chain_id) }.boxed()
    }

    fn switch_chain(&self, chain_id: u64) -> BoxFuture<'_, ProviderResult<()>> {
        async move {
            let network = self
                .networks
                .get(&chain_id)
                .map(|entry| entry.value().clone())
                .ok_or_else(|| {
                    ProviderRpcError::new(
                        UNRECOGNIZED_CHAIN_CODE,
                        format!("Unrecognized chain ID {:#x}", chain_id),
                    )
                })?;
            self.activate(network)
        }
        .boxed()
    }

    fn add_chain(&self, network: NetworkDescriptor) -> BoxFuture<'_, ProviderResult<()>> {
        async move {
            tracing::info!(
                chain_id = network.chain_id,
                chain_name = %network.chain_name,
                "Adding network to wallet"
            );
            self.networks.insert(network.chain_id, network.clone());
            self.activate(network)
        }
        .boxed()
    }

    fn revoke_permissions(&self) -> BoxFuture<'_, ProviderResult<()>> {
        async move {
            if self.authorized.swap(false, Ordering::SeqCst) {
                self.emit(ProviderEvent::AccountsChanged(Vec::new()));
            }
            Ok(())
        }
        .boxed()
    }

    fn get_balance(&self, address: Address) -> BoxFuture<'_, ProviderResult<U256>> {
        async move {
            self.with_failover("eth_getBalance", |p| async move {
                p.get_balance(address).await
            })
            .await
        }
        .boxed()
    }

    fn get_block_number(&self) -> BoxFuture<'_, ProviderResult<u64>> {
        async move {
            self.with_failover("eth_blockNumber", |p| async move {
                p.get_block_number().await
            })
            .await
        }
        .boxed()
    }

    fn call(&self, tx: TransactionRequest) -> BoxFuture<'_, ProviderResult<Bytes>> {
        async move {
            self.with_failover("eth_call", |p| {
                let tx = tx.clone();
                async move { p.call(tx).await }
            })
            .await
        }
        .boxed()
    }

    fn send_transaction(&self, tx: TransactionRequest) -> BoxFuture<'_, ProviderResult<TxHash>> {
        async move {
            let signer = self.authorized_signer()?;
            let tx = tx.from(signer.address());
            // Primary only: a broadcast is not safely repeatable across endpoints.
            let provider = self.active.load().providers[0].clone();
            let result = match timeout(self.timeout_duration, provider.send_transaction(tx)).await
            {
                Ok(Ok(pending)) => Ok(*pending.tx_hash()),
                Ok(Err(e)) => Err(rpc_error(e)),
                Err(_) => Err(ProviderRpcError::internal(format!(
                    "eth_sendTransaction timed out after {:?}",
                    self.timeout_duration
                ))),
            };
            metrics::record_rpc_call("eth_sendTransaction", result.is_ok());
            result
        }
        .boxed()
    }

    fn get_transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> BoxFuture<'_, ProviderResult<Option<ReceiptSummary>>> {
        async move {
            let receipt = self
                .with_failover("eth_getTransactionReceipt", |p| async move {
                    p.get_transaction_receipt(tx_hash).await
                })
                .await?;
            Ok(receipt.map(|r| ReceiptSummary {
                tx_hash: r.transaction_hash,
                block_number: r.block_number,
                success: r.status(),
                logs: r.inner.logs().iter().map(|log| log.inner.clone()).collect(),
            }))
        }
        .boxed()
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

impl std::fmt::Debug for LocalWalletProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let active = self.active.load();
        f.debug_struct("LocalWalletProvider")
            .field("address", &self.address())
            .field("chain_id", &active.network.chain_id)
            .field("rpc_urls", &active.network.rpc_urls)
            .field("authorized", &self.authorized.load(Ordering::SeqCst))
            .finish()
    }
}
