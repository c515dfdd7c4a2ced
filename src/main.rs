//! `charity`: command-line front end for the charity donation core.
//!
//! # Architecture Overview
//!
//! ```text
//!   charity <command>
//!        │
//!        ▼
//!   ┌──────────────────────────── CharityApp ─────────────────────────────┐
//!   │                                                                     │
//!   │  ChainSession ──SessionEvent──▶ ContractGateway ◀── ExchangeRateCache│
//!   │       │                              │                   │          │
//!   │       ▼                              ▼                   ▼          │
//!   │  LocalWalletProvider ──────── JSON-RPC ───────▶ chain   CoinGecko   │
//!   └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Results are printed as pretty JSON. Errors are printed as a localized
//! notice on stderr.

use std::path::{Path, PathBuf};

use alloy::primitives::Address;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::json;

use charity_gateway::config::{load_config, CharityConfig};
use charity_gateway::contract::gateway::{parse_address, parse_native_amount};
use charity_gateway::contract::records::{
    end_date_after_days, format_amount, unix_now, CampaignSummary,
};
use charity_gateway::contract::{CampaignDraft, DisbursementRequest};
use charity_gateway::error::{CharityError, Locale};
use charity_gateway::observability::{logging, metrics};
use charity_gateway::CharityApp;

#[derive(Parser)]
#[command(name = "charity")]
#[command(about = "Donate to and manage on-chain charity campaigns", long_about = None)]
struct Cli {
    /// Configuration file (defaults apply when it does not exist)
    #[arg(short, long, default_value = "charity.toml")]
    config: PathBuf,

    /// Language for error messages
    #[arg(long, value_enum, default_value_t = Lang::En)]
    lang: Lang,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Lang {
    En,
    Vi,
}

impl From<Lang> for Locale {
    fn from(lang: Lang) -> Self {
        match lang {
            Lang::En => Locale::En,
            Lang::Vi => Locale::Vi,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List all campaigns with progress and fiat amounts
    Campaigns,
    /// Show one campaign
    Campaign { id: u64 },
    /// Most recent donations to a campaign
    Donations { id: u64 },
    /// Most recent disbursements of a campaign
    Disbursements { id: u64 },
    /// Most recent comments on a campaign
    Comments { id: u64 },
    /// Most recent supporters of a campaign
    Supporters { id: u64 },
    /// Like count, and whether an account liked the campaign
    Likes {
        id: u64,
        #[arg(long)]
        account: Option<String>,
    },
    /// Donations made by an account (defaults to the connected one)
    MyDonations {
        #[arg(long)]
        account: Option<String>,
    },
    /// Connect the wallet and switch it to the configured network
    Connect,
    /// Disconnect the wallet and stop auto-connecting
    Disconnect,
    /// Session and network status
    Status,
    /// Donate native currency to a campaign
    Donate {
        id: u64,
        /// Amount in native units, e.g. 0.5
        amount: String,
    },
    /// Like a campaign
    Like { id: u64 },
    /// Remove a like
    Unlike { id: u64 },
    /// Comment on a campaign
    Comment {
        id: u64,
        text: String,
        #[arg(long)]
        anonymous: bool,
    },
    /// Create a campaign (admin)
    CreateCampaign {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        media: String,
        #[arg(long, default_value = "")]
        location: String,
        /// Target in native units
        #[arg(long, conflicts_with = "target_fiat")]
        target: Option<String>,
        /// Target in local fiat currency, converted at the current rate
        #[arg(long)]
        target_fiat: Option<f64>,
        /// Address that receives donations
        #[arg(long)]
        wallet: String,
        /// Campaign length in days
        #[arg(long, default_value_t = 30)]
        days: u64,
        #[arg(long, default_value = "")]
        beneficiary: String,
    },
    /// Disburse funds from an ended campaign (admin)
    Disburse {
        id: u64,
        #[arg(long)]
        recipient: String,
        /// Amount in native units
        #[arg(long)]
        amount: String,
        /// Proof URL, or several separated by commas
        #[arg(long)]
        proof: String,
        #[arg(long)]
        note: String,
    },
    /// Current exchange rate
    Rate,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let locale = Locale::from(cli.lang);

    let config = match read_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    logging::init_logging(&config.observability);

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let base_dir = cli
        .config
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let app = match CharityApp::build(config, &base_dir).await {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    let result = run(&app, cli.command, locale).await;
    app.shutdown();

    match result {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: failed to render output: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            tracing::debug!(kind = e.kind(), error = %e, "Command failed");
            let notice = e.notice(locale);
            eprintln!("[{:?}] {}", notice.level, notice.message);
            if matches!(e, CharityError::NoWalletProvider) {
                eprintln!("{}", charity_gateway::error::WALLET_INSTALL_URL);
            }
            std::process::exit(1);
        }
    }
}

fn read_config(path: &Path) -> Result<CharityConfig, charity_gateway::config::ConfigError> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(CharityConfig::default())
    }
}

fn to_json<T: Serialize>(value: T) -> Result<serde_json::Value, CharityError> {
    serde_json::to_value(value).map_err(|e| CharityError::provider(e.to_string()))
}

fn account_arg(app: &CharityApp, account: Option<String>) -> Result<Address, CharityError> {
    match account {
        Some(account) => parse_address("account", &account),
        None => app.session.account().ok_or(CharityError::NotConnected),
    }
}

async fn run(
    app: &CharityApp,
    command: Commands,
    locale: Locale,
) -> Result<serde_json::Value, CharityError> {
    let gateway = &app.gateway;
    let decimals = gateway.decimals();

    match command {
        Commands::Campaigns => to_json(gateway.campaign_summaries(unix_now()).await?),
        Commands::Campaign { id } => {
            let campaign = gateway.require_campaign(id).await?;
            let likes = gateway.get_likes_count(id).await?;
            let rate = app.rates.get_rate().await;
            let summary = CampaignSummary::new(campaign, unix_now(), decimals, Some(rate));
            Ok(json!({
                "campaign": to_json(summary)?,
                "likes": likes,
                "pendingWrite": gateway.has_pending_write(id),
            }))
        }
        Commands::Donations { id } => to_json(gateway.get_donations(id).await?),
        Commands::Disbursements { id } => {
            let page = gateway.get_disbursements(id).await?;
            let items: Vec<_> = page
                .items
                .iter()
                .map(|d| {
                    json!({
                        "disbursement": d,
                        "proofUris": d.proof_uris(),
                        "amountDisplay": format_amount(d.amount, decimals),
                    })
                })
                .collect();
            Ok(json!({ "items": items, "total": page.total, "complete": page.complete }))
        }
        Commands::Comments { id } => {
            let page = gateway.get_comments(id).await?;
            let items: Vec<_> = page
                .items
                .iter()
                .map(|c| {
                    json!({
                        "author": c.display_author(locale),
                        "text": c.text,
                        "timestamp": c.timestamp,
                    })
                })
                .collect();
            Ok(json!({ "items": items, "total": page.total, "complete": page.complete }))
        }
        Commands::Supporters { id } => to_json(gateway.get_supporters(id).await?),
        Commands::Likes { id, account } => {
            let count = gateway.get_likes_count(id).await?;
            let liked = match account_arg(app, account) {
                Ok(account) => Some(gateway.is_liked(id, account).await?),
                Err(CharityError::NotConnected) => None,
                Err(e) => return Err(e),
            };
            Ok(json!({ "campaignId": id, "likes": count, "liked": liked }))
        }
        Commands::MyDonations { account } => {
            let account = account_arg(app, account)?;
            to_json(gateway.get_user_donations(account).await?)
        }
        Commands::Connect => {
            let account = app.session.connect().await?;
            let balance = app.session.cached_balance();
            Ok(json!({
                "account": account,
                "chainId": app.session.chain_id(),
                "balance": balance.map(|b| format_amount(b, decimals)),
            }))
        }
        Commands::Disconnect => {
            app.session.disconnect().await;
            Ok(json!({ "connected": false }))
        }
        Commands::Status => {
            let balance = if app.session.is_connected() {
                Some(format_amount(app.session.balance().await?, decimals))
            } else {
                None
            };
            let network = app.session.network();
            Ok(json!({
                "connected": app.session.is_connected(),
                "walletAvailable": app.session.has_provider(),
                "account": app.session.account(),
                "chainId": app.session.chain_id(),
                "requiredChainId": network.chain_id_hex(),
                "network": network.chain_name,
                "symbol": network.native_currency.symbol,
                "balance": balance,
                "contract": gateway.address(),
                "pendingWrites": gateway.pending_writes(),
            }))
        }
        Commands::Donate { id, amount } => {
            let amount = parse_native_amount("amount", &amount, decimals)?;
            let receipt = gateway.donate(id, amount).await?;
            with_explorer(app, receipt)
        }
        Commands::Like { id } => with_explorer(app, gateway.like(id).await?),
        Commands::Unlike { id } => with_explorer(app, gateway.unlike(id).await?),
        Commands::Comment {
            id,
            text,
            anonymous,
        } => with_explorer(app, gateway.add_comment(id, &text, anonymous).await?),
        Commands::CreateCampaign {
            title,
            description,
            media,
            location,
            target,
            target_fiat,
            wallet,
            days,
            beneficiary,
        } => {
            let target_amount = match (target, target_fiat) {
                (Some(target), _) => parse_native_amount("target", &target, decimals)?,
                (None, Some(fiat)) => app
                    .rates
                    .fiat_to_minor_units(fiat, decimals)
                    .await
                    .map_err(|e| CharityError::validation("targetFiat", e.to_string()))?,
                (None, None) => {
                    return Err(CharityError::validation(
                        "target",
                        "one of --target or --target-fiat is required",
                    ))
                }
            };
            let draft = CampaignDraft {
                title,
                description,
                media,
                location,
                target_amount,
                campaign_wallet: parse_address("wallet", &wallet)?,
                end_date: end_date_after_days(unix_now(), days)?,
                beneficiary,
            };
            with_explorer(app, gateway.create_campaign(draft).await?)
        }
        Commands::Disburse {
            id,
            recipient,
            amount,
            proof,
            note,
        } => {
            let request = DisbursementRequest {
                campaign_id: id,
                recipient: parse_address("recipient", &recipient)?,
                amount: parse_native_amount("amount", &amount, decimals)?,
                proof_image: proof,
                note,
            };
            with_explorer(app, gateway.disburse(request).await?)
        }
        Commands::Rate => {
            app.rates.get_rate().await;
            to_json(app.rates.snapshot().await)
        }
    }
}

fn with_explorer<T: Serialize>(app: &CharityApp, receipt: T) -> Result<serde_json::Value, CharityError> {
    let mut value = to_json(receipt)?;
    let explorer = value
        .get("txHash")
        .and_then(|hash| hash.as_str())
        .and_then(|hash| app.session.network().explorer_tx_url(hash));
    if let (Some(object), Some(url)) = (value.as_object_mut(), explorer) {
        object.insert("explorerUrl".to_string(), json!(url));
    }
    Ok(value)
}
