//! Fiat exchange rate subsystem.
//!
//! # Data Flow
//! ```text
//! get_rate() → fresh? → cached rate
//!            → stale  → QuoteSource (USD quote) × usd_to_local → cache
//!                     → fetch failed → fallback rate → cache
//! ```

pub mod cache;
pub mod source;

pub use cache::{fiat_to_minor_units, ExchangeRateCache, RateOrigin, RateSnapshot};
pub use source::{CoinGeckoSource, QuoteSource, RateError};
