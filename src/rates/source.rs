//! USD quote sources.

use std::collections::HashMap;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use serde::Deserialize;
use thiserror::Error;

use crate::config::RateConfig;

#[derive(Debug, Error)]
pub enum RateError {
    #[error("Quote request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Quote response has no USD price for {0}")]
    MissingQuote(String),

    #[error("Invalid quote: {0}")]
    InvalidQuote(f64),

    #[error("Invalid fiat amount: {0}")]
    InvalidAmount(String),
}

/// Something that can price one unit of the native asset in USD.
pub trait QuoteSource: Send + Sync {
    fn fetch_usd_quote(&self) -> BoxFuture<'_, Result<f64, RateError>>;
}

#[derive(Debug, Deserialize)]
struct UsdPrice {
    usd: Option<f64>,
}

/// `GET {quote_url}?ids={asset}&vs_currencies=usd` against CoinGecko's simple price API.
#[derive(Debug, Clone)]
pub struct CoinGeckoSource {
    client: reqwest::Client,
    url: String,
    asset_id: String,
}

impl CoinGeckoSource {
    pub fn new(config: &RateConfig) -> Result<Self, RateError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            client,
            url: config.quote_url.clone(),
            asset_id: config.asset_id.clone(),
        })
    }

    async fn fetch(&self) -> Result<f64, RateError> {
        let prices: HashMap<String, UsdPrice> = self
            .client
            .get(&self.url)
            .query(&[("ids", self.asset_id.as_str()), ("vs_currencies", "usd")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let usd = prices
            .get(&self.asset_id)
            .and_then(|price| price.usd)
            .ok_or_else(|| RateError::MissingQuote(self.asset_id.clone()))?;
        validate_quote(usd)
    }
}

impl QuoteSource for CoinGeckoSource {
    fn fetch_usd_quote(&self) -> BoxFuture<'_, Result<f64, RateError>> {
        self.fetch().boxed()
    }
}

/// Reject zero, negative and non-finite quotes.
pub fn validate_quote(usd: f64) -> Result<f64, RateError> {
    if usd.is_finite() && usd > 0.0 {
        Ok(usd)
    } else {
        Err(RateError::InvalidQuote(usd))
    }
}
