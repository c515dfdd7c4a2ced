//! Charity contract subsystem.
//!
//! # Data Flow
//! ```text
//! Read:  gateway.rs → abi.rs (encode) → WalletProvider::call → abi.rs (decode)
//!            → normalize.rs → records.rs
//!        list reads fan out through fanout.rs
//!
//! Write: gateway.rs (local validation, admin check) → signer handle
//!            → transaction.rs (WriteTracker, receipt polling) → WriteReceipt
//! ```

pub mod abi;
pub mod fanout;
pub mod gateway;
pub mod normalize;
pub mod records;
pub mod transaction;

pub use abi::ContractAbi;
pub use gateway::ContractGateway;
pub use records::{
    Campaign, CampaignDraft, CampaignStatus, CampaignSummary, Comment, Disbursement,
    DisbursementRequest, Donation, Page, UserDonations, WriteReceipt,
};
pub use transaction::{WriteOperation, WriteRecord, WriteState};
