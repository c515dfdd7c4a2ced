//! Configuration validation.
//!
//! Serde handles syntax; this pass checks values. It is a pure function that
//! reports every problem, not just the first.

use std::fmt;

use alloy::primitives::Address;

use crate::config::schema::CharityConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &CharityConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let network = &config.network;
    if network.chain_id == 0 {
        errors.push(ValidationError::new("network.chain_id", "must be non-zero"));
    }
    if network.chain_name.trim().is_empty() {
        errors.push(ValidationError::new("network.chain_name", "must not be empty"));
    }
    if network.rpc_urls.is_empty() {
        errors.push(ValidationError::new(
            "network.rpc_urls",
            "at least one RPC URL is required",
        ));
    }
    for rpc in &network.rpc_urls {
        if let Err(e) = rpc.parse::<url::Url>() {
            errors.push(ValidationError::new(
                "network.rpc_urls",
                format!("invalid URL '{}': {}", rpc, e),
            ));
        }
    }
    if network.native_currency.symbol.trim().is_empty() {
        errors.push(ValidationError::new(
            "network.native_currency.symbol",
            "must not be empty",
        ));
    }
    if network.native_currency.decimals > 77 {
        errors.push(ValidationError::new(
            "network.native_currency.decimals",
            "must fit in a 256-bit amount",
        ));
    }

    let contract = &config.contract;
    match contract.address.parse::<Address>() {
        Ok(addr) if addr.is_zero() => {
            errors.push(ValidationError::new("contract.address", "zero address"));
        }
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::new(
            "contract.address",
            format!("invalid address '{}': {}", contract.address, e),
        )),
    }
    if contract.page_limit == 0 {
        errors.push(ValidationError::new("contract.page_limit", "must be > 0"));
    }
    if contract.fetch_concurrency == 0 {
        errors.push(ValidationError::new(
            "contract.fetch_concurrency",
            "must be > 0 (use 1 for sequential reads)",
        ));
    }
    if contract.confirmations == 0 {
        errors.push(ValidationError::new("contract.confirmations", "must be > 0"));
    }

    let rates = &config.rates;
    if rates.ttl_secs == 0 {
        errors.push(ValidationError::new("rates.ttl_secs", "must be > 0"));
    }
    if !(rates.fallback_rate.is_finite() && rates.fallback_rate > 0.0) {
        errors.push(ValidationError::new(
            "rates.fallback_rate",
            "must be a positive number",
        ));
    }
    if !(rates.usd_to_local.is_finite() && rates.usd_to_local > 0.0) {
        errors.push(ValidationError::new(
            "rates.usd_to_local",
            "must be a positive number",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
