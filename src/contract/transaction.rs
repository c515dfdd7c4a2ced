//! Write tracking and confirmation monitoring.
//!
//! # Responsibilities
//! - Record every write attempt and its state
//! - Poll receipts until the required confirmations are reached
//!
//! # State Machine
//! ```text
//! Idle (no record) → Submitted → Mined
//!                              → Reverted
//! Idle (no record) → UserRejected
//! ```
//! Writes are never retried automatically.

use std::time::{Duration, SystemTime};

use alloy::primitives::TxHash;
use dashmap::DashMap;
use serde::Serialize;
use tokio::time::{interval, timeout};
use uuid::Uuid;

use crate::blockchain::provider::{ReceiptSummary, WalletProvider};
use crate::config::ContractConfig;
use crate::error::{CharityError, CharityResult};
use crate::observability::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOperation {
    Donate,
    Like,
    Unlike,
    Comment,
    CreateCampaign,
    Disburse,
}

impl WriteOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Donate => "donate",
            Self::Like => "like",
            Self::Unlike => "unlike",
            Self::Comment => "comment",
            Self::CreateCampaign => "create_campaign",
            Self::Disburse => "disburse",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteState {
    Submitted,
    Mined,
    Reverted,
    UserRejected,
}

impl WriteState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Mined => "mined",
            Self::Reverted => "reverted",
            Self::UserRejected => "user_rejected",
        }
    }

    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Submitted)
    }
}

/// One write attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteRecord {
    pub id: Uuid,
    pub operation: WriteOperation,
    pub state: WriteState,
    pub campaign_id: Option<u64>,
    pub tx_hash: Option<TxHash>,
    pub block_number: Option<u64>,
    pub submitted_at: SystemTime,
}

/// In-memory table of write attempts, keyed by write id.
#[derive(Debug, Default)]
pub struct WriteTracker {
    records: DashMap<Uuid, WriteRecord>,
}

impl WriteTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(
        &self,
        operation: WriteOperation,
        campaign_id: Option<u64>,
        state: WriteState,
        tx_hash: Option<TxHash>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.records.insert(
            id,
            WriteRecord {
                id,
                operation,
                state,
                campaign_id,
                tx_hash,
                block_number: None,
                submitted_at: SystemTime::now(),
            },
        );
        if state.is_final() {
            metrics::record_write(operation.as_str(), state.as_str());
        }
        self.publish_pending();
        id
    }

    /// A transaction was broadcast and is awaiting its receipt.
    pub fn submitted(
        &self,
        operation: WriteOperation,
        campaign_id: Option<u64>,
        tx_hash: TxHash,
    ) -> Uuid {
        self.insert(operation, campaign_id, WriteState::Submitted, Some(tx_hash))
    }

    /// The user declined to sign; nothing was broadcast.
    pub fn rejected(&self, operation: WriteOperation, campaign_id: Option<u64>) -> Uuid {
        self.insert(operation, campaign_id, WriteState::UserRejected, None)
    }

    /// The node refused the transaction during estimation; nothing was broadcast.
    pub fn reverted(&self, operation: WriteOperation, campaign_id: Option<u64>) -> Uuid {
        self.insert(operation, campaign_id, WriteState::Reverted, None)
    }

    /// Move a submitted write to its final state.
    pub fn resolve(&self, id: Uuid, state: WriteState, block_number: Option<u64>) {
        if let Some(mut record) = self.records.get_mut(&id) {
            record.state = state;
            record.block_number = block_number;
            metrics::record_write(record.operation.as_str(), state.as_str());
        }
        self.publish_pending();
    }

    pub fn get(&self, id: &Uuid) -> Option<WriteRecord> {
        self.records.get(id).map(|r| r.value().clone())
    }

    /// Writes still waiting for a receipt, oldest first.
    pub fn pending(&self) -> Vec<WriteRecord> {
        let mut pending: Vec<WriteRecord> = self
            .records
            .iter()
            .filter(|r| !r.state.is_final())
            .map(|r| r.value().clone())
            .collect();
        pending.sort_by_key(|r| r.submitted_at);
        pending
    }

    /// Every tracked write, oldest first.
    pub fn history(&self) -> Vec<WriteRecord> {
        let mut all: Vec<WriteRecord> = self.records.iter().map(|r| r.value().clone()).collect();
        all.sort_by_key(|r| r.submitted_at);
        all
    }

    /// Pending writes touching one campaign.
    pub fn pending_for(&self, campaign_id: u64) -> Vec<WriteRecord> {
        self.pending()
            .into_iter()
            .filter(|r| r.campaign_id == Some(campaign_id))
            .collect()
    }

    /// Drop every finished record. Returns how many were removed.
    pub fn prune_finished(&self) -> usize {
        let before = self.records.len();
        self.records.retain(|_, r| !r.state.is_final());
        before - self.records.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn publish_pending(&self) {
        let pending = self.records.iter().filter(|r| !r.state.is_final()).count();
        metrics::record_pending_writes(pending);
    }
}

/// How long and how often to poll for a receipt.
#[derive(Debug, Clone)]
pub struct ReceiptWait {
    pub confirmations: u64,
    pub poll_interval: Duration,
    /// `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl ReceiptWait {
    pub fn from_config(config: &ContractConfig) -> Self {
        Self {
            confirmations: config.confirmations.max(1),
            poll_interval: Duration::from_millis(config.receipt_poll_ms.max(1)),
            timeout: config.receipt_timeout_secs.map(Duration::from_secs),
        }
    }
}

impl Default for ReceiptWait {
    fn default() -> Self {
        Self::from_config(&ContractConfig::default())
    }
}

/// Wait until `tx_hash` is mined with enough confirmations.
///
/// A reverted transaction is returned as soon as its receipt appears, with
/// `success == false`.
pub async fn wait_for_receipt(
    provider: &dyn WalletProvider,
    tx_hash: TxHash,
    wait: &ReceiptWait,
) -> CharityResult<ReceiptSummary> {
    match wait.timeout {
        Some(limit) => match timeout(limit, poll_receipt(provider, tx_hash, wait)).await {
            Ok(result) => result,
            Err(_) => Err(CharityError::provider(format!(
                "Timed out waiting for {} confirmation(s) of {}",
                wait.confirmations, tx_hash
            ))),
        },
        None => poll_receipt(provider, tx_hash, wait).await,
    }
}

async fn poll_receipt(
    provider: &dyn WalletProvider,
    tx_hash: TxHash,
    wait: &ReceiptWait,
) -> CharityResult<ReceiptSummary> {
    let required = wait.confirmations;
    let mut ticker = interval(wait.poll_interval);

    loop {
        ticker.tick().await;

        let receipt = match provider.get_transaction_receipt(tx_hash).await? {
            Some(r) => r,
            None => {
                tracing::debug!(tx_hash = %tx_hash, "Transaction pending");
                continue;
            }
        };

        if !receipt.success || required <= 1 {
            return Ok(receipt);
        }

        let current_block = provider.get_block_number().await?;
        let tx_block = receipt.block_number.unwrap_or(current_block);
        let confirmations = current_block.saturating_sub(tx_block) + 1;

        if confirmations >= required {
            return Ok(receipt);
        }

        tracing::debug!(
            tx_hash = %tx_hash,
            confirmations = confirmations,
            required = required,
            "Waiting for confirmations"
        );
    }
}
