//! Fiat exchange rate with a fixed TTL.
//!
//! Advisory only: rates feed display amounts, never a transaction.

use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy::primitives::utils::parse_units;
use alloy::primitives::U256;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::RateConfig;
use crate::contract::records::amount_to_f64;
use crate::observability::metrics;
use crate::rates::source::{QuoteSource, RateError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RateOrigin {
    /// Computed from a fresh quote.
    Live,
    /// The configured constant, after a failed fetch.
    Fallback,
}

impl RateOrigin {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateSnapshot {
    /// Local currency per one native unit.
    pub rate: f64,
    pub origin: RateOrigin,
    pub currency: String,
    pub age_secs: u64,
}

#[derive(Debug, Default)]
struct RateState {
    rate: f64,
    origin: Option<RateOrigin>,
    last_fetch: Option<Instant>,
}

/// Native → local currency rate, cached for `ttl`.
pub struct ExchangeRateCache {
    source: Arc<dyn QuoteSource>,
    usd_to_local: f64,
    fallback_rate: f64,
    ttl: Duration,
    currency: String,
    /// Held across the fetch so concurrent callers share one refresh.
    state: Mutex<RateState>,
}

impl ExchangeRateCache {
    pub fn new(source: Arc<dyn QuoteSource>, config: &RateConfig) -> Self {
        Self {
            source,
            usd_to_local: config.usd_to_local,
            fallback_rate: config.fallback_rate,
            ttl: Duration::from_secs(config.ttl_secs),
            currency: config.currency.clone(),
            state: Mutex::new(RateState::default()),
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Current rate. Never fails: a failed fetch yields the fallback rate.
    pub async fn get_rate(&self) -> f64 {
        self.get_rate_at(Instant::now()).await
    }

    pub(crate) async fn get_rate_at(&self, now: Instant) -> f64 {
        let mut state = self.state.lock().await;

        if let Some(last_fetch) = state.last_fetch {
            if now.saturating_duration_since(last_fetch) < self.ttl {
                return state.rate;
            }
        }

        let (rate, origin) = match self.source.fetch_usd_quote().await {
            Ok(usd) => {
                let rate = usd * self.usd_to_local;
                tracing::info!(rate, currency = %self.currency, "Exchange rate updated");
                (rate, RateOrigin::Live)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    fallback = self.fallback_rate,
                    "Exchange rate fetch failed, using fallback"
                );
                (self.fallback_rate, RateOrigin::Fallback)
            }
        };
        metrics::record_rate_refresh(origin.as_str());

        state.rate = rate;
        state.origin = Some(origin);
        state.last_fetch = Some(now);
        rate
    }

    /// The cached rate without refreshing; `None` before the first fetch.
    pub async fn snapshot(&self) -> Option<RateSnapshot> {
        let state = self.state.lock().await;
        let origin = state.origin?;
        let last_fetch = state.last_fetch?;
        Some(RateSnapshot {
            rate: state.rate,
            origin,
            currency: self.currency.clone(),
            age_secs: last_fetch.elapsed().as_secs(),
        })
    }

    /// Fiat value of `amount` minor units.
    pub async fn to_fiat(&self, amount: U256, decimals: u8) -> f64 {
        amount_to_f64(amount, decimals) * self.get_rate().await
    }

    /// Minor units worth `fiat` at the current rate.
    pub async fn fiat_to_minor_units(&self, fiat: f64, decimals: u8) -> Result<U256, RateError> {
        let rate = self.get_rate().await;
        fiat_to_minor_units(fiat, rate, decimals)
    }
}

impl std::fmt::Debug for ExchangeRateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeRateCache")
            .field("currency", &self.currency)
            .field("ttl", &self.ttl)
            .field("fallback_rate", &self.fallback_rate)
            .finish()
    }
}

/// Convert a fiat amount to minor units of the native asset at `rate`.
pub fn fiat_to_minor_units(fiat: f64, rate: f64, decimals: u8) -> Result<U256, RateError> {
    if !fiat.is_finite() || fiat < 0.0 {
        return Err(RateError::InvalidAmount(fiat.to_string()));
    }
    if !rate.is_finite() || rate <= 0.0 {
        return Err(RateError::InvalidQuote(rate));
    }
    let native = format!("{:.*}", decimals as usize, fiat / rate);
    parse_units(&native, decimals)
        .map(|units| units.get_absolute())
        .map_err(|e| RateError::InvalidAmount(e.to_string()))
}
