//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → CharityConfig (validated, immutable)
//!     → handed to session, gateway and rate cache at startup
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Secrets (the wallet key) never live in the config file

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    CharityConfig, ContractConfig, NativeCurrency, NetworkDescriptor, ObservabilityConfig,
    RateConfig, SessionConfig,
};
