//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → Wallet → Session → Rates → Gateway
//!         → event listener → gateway follows session → auto-connect
//!
//! Shutdown:
//!     Abort background listeners
//! ```

pub mod startup;

pub use startup::{CharityApp, StartupError};
