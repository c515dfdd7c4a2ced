//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Construct the wallet, session, rate cache and gateway in dependency order
//! - Start the wallet event listener and bind the gateway to the session
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Everything is constructed here and injected; there are no globals

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::blockchain::local::{signer_from_env, LocalWalletProvider};
use crate::blockchain::persist::DisconnectFlag;
use crate::blockchain::provider::{ProviderRpcError, WalletProvider};
use crate::blockchain::session::ChainSession;
use crate::config::validation::{validate_config, ValidationError};
use crate::config::CharityConfig;
use crate::contract::abi::ContractAbi;
use crate::contract::gateway::ContractGateway;
use crate::error::CharityError;
use crate::rates::{CoinGeckoSource, ExchangeRateCache, QuoteSource, RateError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Invalid configuration: {}", format_errors(.0))]
    Config(Vec<ValidationError>),

    #[error("Wallet initialization failed: {0}")]
    Wallet(#[from] ProviderRpcError),

    #[error("Contract gateway initialization failed: {0}")]
    Gateway(#[from] CharityError),

    #[error("Quote source initialization failed: {0}")]
    Rates(#[from] RateError),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// The wired core: one session, one gateway, one rate cache.
pub struct CharityApp {
    pub config: CharityConfig,
    pub session: Arc<ChainSession>,
    pub gateway: Arc<ContractGateway>,
    pub rates: Arc<ExchangeRateCache>,
    tasks: Vec<JoinHandle<()>>,
}

impl CharityApp {
    /// Wire the core against the configured RPC endpoints.
    ///
    /// The wallet key comes from the environment; without one the session
    /// has no wallet and only reads are available.
    pub async fn build(config: CharityConfig, base_dir: &Path) -> Result<Self, StartupError> {
        validate_config(&config).map_err(StartupError::Config)?;

        let signer = signer_from_env()?;
        let has_key = signer.is_some();
        let local: Arc<dyn WalletProvider> =
            Arc::new(LocalWalletProvider::new(config.network.clone(), signer)?);
        let wallet = has_key.then(|| Arc::clone(&local));
        if !has_key {
            tracing::info!("No wallet key configured, running read-only");
        }

        let source: Arc<dyn QuoteSource> = Arc::new(CoinGeckoSource::new(&config.rates)?);
        let abi = ContractAbi::load(&resolve(base_dir, &config.contract.abi_path));

        Self::build_with(config, base_dir, wallet, local, source, abi).await
    }

    /// Wire the core from explicit parts.
    pub async fn build_with(
        config: CharityConfig,
        base_dir: &Path,
        wallet: Option<Arc<dyn WalletProvider>>,
        reader: Arc<dyn WalletProvider>,
        source: Arc<dyn QuoteSource>,
        abi: ContractAbi,
    ) -> Result<Self, StartupError> {
        let flag = DisconnectFlag::new(
            config
                .session
                .state_path
                .as_deref()
                .map(|path| resolve(base_dir, path)),
        );
        let session = Arc::new(ChainSession::new(wallet, config.network.clone(), flag));
        let rates = Arc::new(ExchangeRateCache::new(source, &config.rates));
        let gateway = Arc::new(
            ContractGateway::new(&config.contract, abi, reader)?
                .with_decimals(config.network.native_currency.decimals)
                .with_rates(Arc::clone(&rates)),
        );

        let mut tasks = Vec::new();
        if let Some(listener) = session.spawn_event_listener() {
            tasks.push(listener);
        }
        tasks.push(gateway.follow(&session));

        if config.session.auto_connect {
            match session.restore().await {
                Ok(Some(account)) => tracing::info!(account = %account, "Resumed wallet session"),
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "Auto-connect failed"),
            }
            // The follower may not have seen the event yet.
            if let Some(handle) = session.handle() {
                gateway.bind_signer(handle);
            }
        }

        tracing::info!(
            chain_id = config.network.chain_id,
            contract = %gateway.address(),
            wallet = session.has_provider(),
            "Charity core initialized"
        );

        Ok(Self {
            config,
            session,
            gateway,
            rates,
            tasks,
        })
    }

    /// Stop background listeners.
    pub fn shutdown(self) {
        for task in self.tasks {
            task.abort();
        }
        tracing::info!("Shutdown complete");
    }
}

fn resolve(base_dir: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
