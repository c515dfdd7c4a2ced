//! Wallet session lifecycle.
//!
//! # State Transitions
//! ```text
//! Disconnected → Connected:   connect() | restore() | accounts-changed (authorized account appears)
//! Connected → Connected:      accounts-changed (different first account)
//! Connected → Disconnected:   disconnect() | accounts-changed (empty list)
//! Connected → ChainReset:     chain-changed (handles dropped, then restore() on the right chain)
//! ```
//!
//! Every transition is published as a [`SessionEvent`] so the contract gateway
//! can rebind its signer without being coupled to the session.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use arc_swap::ArcSwapOption;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::blockchain::persist::DisconnectFlag;
use crate::blockchain::provider::{ProviderEvent, WalletProvider};
use crate::blockchain::types::{SessionEvent, SessionHandle};
use crate::config::NetworkDescriptor;
use crate::error::{CharityError, CharityResult};
use crate::observability::metrics;

/// Owns the single active (account, network) pair.
pub struct ChainSession {
    /// The injected wallet; `None` when no wallet is installed.
    provider: Option<Arc<dyn WalletProvider>>,
    /// Required network.
    network: NetworkDescriptor,
    state: ArcSwapOption<SessionHandle>,
    /// Last balance read for the active account. Display only.
    balance: ArcSwapOption<U256>,
    events: broadcast::Sender<SessionEvent>,
    flag: DisconnectFlag,
}

impl ChainSession {
    pub fn new(
        provider: Option<Arc<dyn WalletProvider>>,
        network: NetworkDescriptor,
        flag: DisconnectFlag,
    ) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            provider,
            network,
            state: ArcSwapOption::empty(),
            balance: ArcSwapOption::empty(),
            events,
            flag,
        }
    }

    /// Subscribe to session changes.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.state.load().is_some()
    }

    pub fn account(&self) -> Option<Address> {
        self.state.load_full().map(|h| h.account)
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.state.load_full().map(|h| h.chain_id)
    }

    /// Snapshot of the signer/provider handle.
    pub fn handle(&self) -> Option<SessionHandle> {
        self.state.load_full().map(|h| (*h).clone())
    }

    pub fn network(&self) -> &NetworkDescriptor {
        &self.network
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    fn provider(&self) -> CharityResult<Arc<dyn WalletProvider>> {
        self.provider.clone().ok_or(CharityError::NoWalletProvider)
    }

    fn publish(&self, event: SessionEvent) {
        metrics::record_session_event(event.kind());
        tracing::debug!(kind = event.kind(), "Session event");
        let _ = self.events.send(event);
    }

    fn establish(&self, handle: SessionHandle, account_changed: bool) {
        self.state.store(Some(Arc::new(handle.clone())));
        self.balance.store(None);
        if account_changed {
            self.publish(SessionEvent::AccountChanged(handle));
        } else {
            self.publish(SessionEvent::Connected(handle));
        }
    }

    /// Request wallet access and bring the wallet onto the required network.
    pub async fn connect(&self) -> CharityResult<Address> {
        let provider = self.provider()?;

        if let Err(e) = self.flag.clear() {
            tracing::warn!(error = %e, "Failed to clear disconnect flag");
        }

        let accounts = provider.request_accounts().await?;
        let account = *accounts
            .first()
            .ok_or_else(|| CharityError::provider("Wallet returned no accounts"))?;

        let chain_id = self.ensure_network(provider.as_ref()).await?;

        self.establish(
            SessionHandle {
                account,
                chain_id,
                provider,
            },
            false,
        );
        tracing::info!(account = %account, chain_id, "Wallet connected");

        if let Err(e) = self.balance().await {
            tracing::warn!(error = %e, "Failed to read balance after connect");
        }
        Ok(account)
    }

    /// Switch (or add, then switch) the wallet to the required chain.
    async fn ensure_network(&self, provider: &dyn WalletProvider) -> CharityResult<u64> {
        let required = self.network.chain_id;
        let current = provider.chain_id().await?;
        if current == required {
            return Ok(current);
        }

        tracing::info!(current, required, "Requesting network switch");
        match provider.switch_chain(required).await {
            Ok(()) => {}
            Err(e) if e.is_unrecognized_chain() => {
                tracing::info!(
                    chain_id = required,
                    chain_name = %self.network.chain_name,
                    "Network unknown to wallet, requesting add"
                );
                provider.add_chain(self.network.clone()).await?;
            }
            Err(e) => return Err(e.into()),
        }

        let actual = provider.chain_id().await?;
        if actual != required {
            return Err(CharityError::NetworkMismatch {
                expected: required,
                actual,
            });
        }
        Ok(actual)
    }

    /// Resume a previously authorized account without prompting.
    ///
    /// Returns `Ok(None)` when there is no wallet, the user explicitly
    /// disconnected last time, or no account is authorized.
    pub async fn restore(&self) -> CharityResult<Option<Address>> {
        let Some(provider) = self.provider.clone() else {
            tracing::debug!("No wallet provider, skipping auto-connect");
            return Ok(None);
        };
        if self.flag.is_set() {
            tracing::debug!("User manually disconnected, skipping auto-connect");
            return Ok(None);
        }

        let accounts = provider.accounts().await?;
        let Some(&account) = accounts.first() else {
            return Ok(None);
        };

        let chain_id = provider.chain_id().await?;
        if chain_id != self.network.chain_id {
            return Err(CharityError::NetworkMismatch {
                expected: self.network.chain_id,
                actual: chain_id,
            });
        }

        self.establish(
            SessionHandle {
                account,
                chain_id,
                provider,
            },
            false,
        );
        tracing::info!(account = %account, chain_id, "Wallet session restored");

        if let Err(e) = self.balance().await {
            tracing::warn!(error = %e, "Failed to read balance after restore");
        }
        Ok(Some(account))
    }

    /// Drop the session. Always leaves `is_connected() == false`.
    ///
    /// Permission revocation is best effort: not every wallet supports it.
    pub async fn disconnect(&self) {
        let previous = self.state.swap(None);
        self.balance.store(None);

        if let Err(e) = self.flag.set() {
            tracing::warn!(error = %e, "Failed to persist disconnect flag");
        }
        if let Some(previous) = previous {
            tracing::info!(account = %previous.account, "Wallet disconnected");
            self.publish(SessionEvent::Disconnected);
        }

        if let Some(provider) = &self.provider {
            if let Err(e) = provider.revoke_permissions().await {
                tracing::debug!(error = %e, "Cannot revoke wallet permission");
            }
        }
    }

    /// Balance of the active account, read from the chain.
    pub async fn balance(&self) -> CharityResult<U256> {
        let handle = self.state.load_full().ok_or(CharityError::NotConnected)?;
        let balance = handle.provider.get_balance(handle.account).await?;
        self.balance.store(Some(Arc::new(balance)));
        Ok(balance)
    }

    /// Last balance read, without a network call.
    pub fn cached_balance(&self) -> Option<U256> {
        self.balance.load_full().map(|b| *b)
    }

    /// React to the wallet's `accountsChanged` notification.
    pub async fn handle_accounts_changed(&self, accounts: Vec<Address>) {
        let Some(&account) = accounts.first() else {
            tracing::info!("Wallet reported no accounts");
            self.disconnect().await;
            return;
        };

        match self.state.load_full() {
            Some(current) if current.account == account => {}
            Some(current) => {
                let handle = SessionHandle {
                    account,
                    ..(*current).clone()
                };
                self.establish(handle, true);
                tracing::info!(from = %current.account, to = %account, "Wallet account changed");
                if let Err(e) = self.balance().await {
                    tracing::warn!(error = %e, "Failed to read balance after account change");
                }
            }
            None => {
                if self.flag.is_set() {
                    return;
                }
                let Some(provider) = self.provider.clone() else {
                    return;
                };
                let chain_id = match provider.chain_id().await {
                    Ok(id) => id,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to read chain ID after account change");
                        return;
                    }
                };
                if chain_id != self.network.chain_id {
                    tracing::warn!(chain_id, "Account authorized on an unsupported network");
                    return;
                }
                self.establish(
                    SessionHandle {
                        account,
                        chain_id,
                        provider,
                    },
                    false,
                );
                if let Err(e) = self.balance().await {
                    tracing::warn!(error = %e, "Failed to read balance");
                }
            }
        }
    }

    /// React to the wallet's `chainChanged` notification.
    ///
    /// Handles tied to the old chain are invalid, so the session is torn down
    /// and rebuilt from scratch.
    pub async fn handle_chain_changed(&self, chain_id: u64) {
        self.state.store(None);
        self.balance.store(None);
        tracing::info!(chain_id, "Wallet changed network, resetting session");
        self.publish(SessionEvent::ChainReset { chain_id });

        if chain_id != self.network.chain_id {
            tracing::warn!(
                chain_id,
                required = self.network.chain_id,
                "Wallet is on an unsupported network"
            );
            return;
        }
        match self.restore().await {
            Ok(Some(account)) => tracing::info!(account = %account, "Session recreated"),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to recreate session"),
        }
    }

    /// Dispatch a single provider notification.
    pub async fn handle_provider_event(&self, event: ProviderEvent) {
        match event {
            ProviderEvent::AccountsChanged(accounts) => self.handle_accounts_changed(accounts).await,
            ProviderEvent::ChainChanged(chain_id) => self.handle_chain_changed(chain_id).await,
        }
    }

    /// Pump wallet notifications into the handlers until the wallet goes away.
    pub fn spawn_event_listener(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let mut rx = self.provider.as_ref()?.subscribe();
        let session = Arc::clone(self);
        Some(tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => session.handle_provider_event(event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Dropped wallet notifications");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }))
    }
}

impl std::fmt::Debug for ChainSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainSession")
            .field("account", &self.account())
            .field("chain_id", &self.chain_id())
            .field("required_chain_id", &self.network.chain_id)
            .field("has_provider", &self.provider.is_some())
            .finish()
    }
}
