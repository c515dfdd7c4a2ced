//! Error taxonomy surfaced by the session and gateway.
//!
//! Provider and transport failures are classified at the boundary of
//! [`ChainSession`](crate::blockchain::ChainSession) and
//! [`ContractGateway`](crate::contract::ContractGateway); callers only ever see
//! a [`CharityError`].

use serde::Serialize;
use thiserror::Error;

use crate::blockchain::provider::ProviderRpcError;

/// Where users are sent when no wallet is available.
pub const WALLET_INSTALL_URL: &str = "https://metamask.io/download/";

/// Errors returned by every public core operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CharityError {
    /// No wallet provider is present in this environment.
    #[error("No wallet provider available (install one from {WALLET_INSTALL_URL})")]
    NoWalletProvider,

    /// The user declined a wallet prompt. Recoverable.
    #[error("Request rejected by the user")]
    UserRejected,

    /// Any other wallet or RPC failure, message passed through.
    #[error("Provider error: {message}")]
    ProviderError { message: String },

    /// Local input validation failed before any network call.
    #[error("Invalid {field}: {reason}")]
    ValidationError { field: String, reason: String },

    /// The requested campaign or record does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// A submitted transaction reverted or was rejected in the wallet.
    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    /// The wallet is connected to a different chain.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    NetworkMismatch { expected: u64, actual: u64 },

    /// A write was attempted without an active session.
    #[error("Wallet not connected")]
    NotConnected,
}

/// Result type for core operations.
pub type CharityResult<T> = Result<T, CharityError>;

impl CharityError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::ProviderError {
            message: message.into(),
        }
    }

    pub fn tx_failed(reason: impl Into<String>) -> Self {
        Self::TransactionFailed {
            reason: reason.into(),
        }
    }

    /// Stable short code, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoWalletProvider => "no_wallet_provider",
            Self::UserRejected => "user_rejected",
            Self::ProviderError { .. } => "provider_error",
            Self::ValidationError { .. } => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::TransactionFailed { .. } => "transaction_failed",
            Self::NetworkMismatch { .. } => "network_mismatch",
            Self::NotConnected => "not_connected",
        }
    }

    /// Short user-facing message in the given locale.
    pub fn localized(&self, locale: Locale) -> String {
        match (locale, self) {
            (Locale::En, Self::NoWalletProvider) => {
                "Please install a wallet to continue".to_string()
            }
            (Locale::En, Self::UserRejected) => "You rejected the request".to_string(),
            (Locale::En, Self::ProviderError { message }) => format!("Wallet error: {}", message),
            (Locale::En, Self::ValidationError { field, reason }) => {
                format!("Invalid {}: {}", field, reason)
            }
            (Locale::En, Self::NotFound(what)) => format!("{} not found", what),
            (Locale::En, Self::TransactionFailed { reason }) => {
                format!("Transaction failed: {}", reason)
            }
            (Locale::En, Self::NetworkMismatch { .. }) => {
                "Please switch your wallet to the supported network".to_string()
            }
            (Locale::En, Self::NotConnected) => "Please connect your wallet first".to_string(),

            (Locale::Vi, Self::NoWalletProvider) => {
                "Vui lòng cài đặt MetaMask để kết nối ví!".to_string()
            }
            (Locale::Vi, Self::UserRejected) => "Bạn đã từ chối yêu cầu".to_string(),
            (Locale::Vi, Self::ProviderError { message }) => {
                format!("Lỗi khi kết nối ví: {}", message)
            }
            (Locale::Vi, Self::ValidationError { field, reason }) => {
                format!("Dữ liệu không hợp lệ ({}): {}", field, reason)
            }
            (Locale::Vi, Self::NotFound(what)) => format!("Không tìm thấy {}", what),
            (Locale::Vi, Self::TransactionFailed { reason }) => {
                format!("Giao dịch thất bại: {}", reason)
            }
            (Locale::Vi, Self::NetworkMismatch { .. }) => {
                "Vui lòng chuyển ví sang mạng được hỗ trợ".to_string()
            }
            (Locale::Vi, Self::NotConnected) => "Vui lòng kết nối ví trước!".to_string(),
        }
    }

    /// Map the error to a transient notification for the UI layer.
    pub fn notice(&self, locale: Locale) -> Notice {
        let level = match self {
            Self::UserRejected | Self::NotConnected | Self::ValidationError { .. } => {
                NoticeLevel::Warning
            }
            Self::NotFound(_) => NoticeLevel::Info,
            _ => NoticeLevel::Danger,
        };
        Notice {
            level,
            message: self.localized(locale),
        }
    }
}

impl From<ProviderRpcError> for CharityError {
    /// Classify a raw wallet error: user rejection vs everything else.
    fn from(err: ProviderRpcError) -> Self {
        if err.is_user_rejection() {
            Self::UserRejected
        } else {
            Self::ProviderError {
                message: err.message,
            }
        }
    }
}

/// Display language for user-facing messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Locale {
    #[default]
    En,
    Vi,
}

/// Severity of a UI notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Danger,
}

/// A transient, dismissible status message for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::provider::{USER_REJECTED_CODE, UNRECOGNIZED_CHAIN_CODE};

    #[test]
    fn test_user_rejection_classification() {
        let err: CharityError = ProviderRpcError::new(USER_REJECTED_CODE, "denied").into();
        assert_eq!(err, CharityError::UserRejected);

        // Some wallets only signal rejection in the message.
        let err: CharityError =
            ProviderRpcError::new(-32603, "MetaMask Tx Signature: User denied transaction").into();
        assert_eq!(err, CharityError::UserRejected);
    }

    #[test]
    fn test_other_errors_pass_message_through() {
        let err: CharityError =
            ProviderRpcError::new(UNRECOGNIZED_CHAIN_CODE, "Unrecognized chain ID").into();
        assert_eq!(err, CharityError::provider("Unrecognized chain ID"));
    }

    #[test]
    fn test_error_display() {
        let err = CharityError::NetworkMismatch {
            expected: 71,
            actual: 1,
        };
        assert_eq!(err.to_string(), "Chain ID mismatch: expected 71, got 1");

        let err = CharityError::validation("amount", "must be greater than zero");
        assert_eq!(err.to_string(), "Invalid amount: must be greater than zero");
    }

    #[test]
    fn test_notice_levels() {
        assert_eq!(
            CharityError::UserRejected.notice(Locale::En).level,
            NoticeLevel::Warning
        );
        assert_eq!(
            CharityError::tx_failed("reverted").notice(Locale::En).level,
            NoticeLevel::Danger
        );
        let vi = CharityError::NotConnected.notice(Locale::Vi);
        assert_eq!(vi.message, "Vui lòng kết nối ví trước!");
    }
}
