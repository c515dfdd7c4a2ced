//! Display-ready records produced from on-chain data.
//!
//! Amounts stay in minor units (`U256`); derived fields are computed against
//! an explicit `now` (unix seconds) so they are deterministic.

use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::utils::format_units;
use alloy::primitives::{Address, TxHash, B256, U256};
use serde::Serialize;
use uuid::Uuid;

use crate::blockchain::types::short_address;
use crate::error::{CharityError, CharityResult, Locale};

const SECONDS_PER_DAY: i64 = 86_400;

/// Current unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// End date `days` whole days after `now`.
pub fn end_date_after_days(now: u64, days: u64) -> CharityResult<u64> {
    days.checked_mul(SECONDS_PER_DAY as u64)
        .and_then(|secs| now.checked_add(secs))
        .ok_or_else(|| CharityError::validation("days", "campaign length is too large"))
}

/// Format minor units as a decimal string, e.g. `1.5`.
pub fn format_amount(amount: U256, decimals: u8) -> String {
    format_units(amount, decimals).unwrap_or_else(|_| amount.to_string())
}

/// Minor units as a float, for display math only.
pub fn amount_to_f64(amount: U256, decimals: u8) -> f64 {
    format_amount(amount, decimals).parse().unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Active,
    Ended,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: u64,
    pub creator: Address,
    pub title: String,
    pub description: String,
    /// Image or video URI.
    pub media: String,
    pub location: String,
    pub target_amount: U256,
    pub campaign_wallet: Address,
    pub collected: U256,
    pub total_disbursed: U256,
    pub created_at: u64,
    pub end_date: u64,
    pub updated_at: u64,
    pub beneficiary: String,
    pub active: bool,
}

impl Campaign {
    /// Percent of target collected, rounded and capped at 100.
    pub fn progress(&self) -> u8 {
        if self.target_amount.is_zero() {
            return 0;
        }
        // round(collected / target * 100) without floats
        let numerator = self
            .collected
            .saturating_mul(U256::from(200))
            .saturating_add(self.target_amount);
        let denominator = self.target_amount.saturating_mul(U256::from(2));
        let pct = numerator / denominator;
        if pct >= U256::from(100) {
            100
        } else {
            pct.to::<u8>()
        }
    }

    /// Whole days until the end date, rounded up. Zero or negative once ended.
    pub fn days_left(&self, now: u64) -> i64 {
        let end = i64::try_from(self.end_date).unwrap_or(i64::MAX);
        let now = i64::try_from(now).unwrap_or(i64::MAX);
        let remaining = end.saturating_sub(now);
        let days = remaining.div_euclid(SECONDS_PER_DAY);
        if remaining.rem_euclid(SECONDS_PER_DAY) != 0 {
            days + 1
        } else {
            days
        }
    }

    pub fn is_ended(&self, now: u64) -> bool {
        self.end_date <= now
    }

    pub fn status(&self, now: u64) -> CampaignStatus {
        if !self.active {
            CampaignStatus::Closed
        } else if self.is_ended(now) {
            CampaignStatus::Ended
        } else {
            CampaignStatus::Active
        }
    }

    pub fn can_accept_donations(&self, now: u64) -> bool {
        self.status(now) == CampaignStatus::Active
    }

    /// Funds collected but not yet disbursed.
    pub fn undisbursed(&self) -> U256 {
        self.collected.saturating_sub(self.total_disbursed)
    }

    /// Ended strictly before `now` with funds left to disburse.
    pub fn can_disburse(&self, now: u64) -> bool {
        self.end_date < now && !self.undisbursed().is_zero()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Donation {
    pub donor: Address,
    pub amount: U256,
    pub timestamp: u64,
    pub block_number: u64,
    /// `None` when the contract recorded a zero hash.
    pub tx_hash: Option<B256>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Disbursement {
    pub recipient: Address,
    pub amount: U256,
    pub timestamp: u64,
    pub block_number: u64,
    pub tx_hash: Option<B256>,
    /// One URI or a comma-separated list.
    pub proof_image: String,
    pub note: String,
}

impl Disbursement {
    pub fn proof_uris(&self) -> Vec<&str> {
        split_uris(&self.proof_image)
    }
}

/// Split a comma-separated URI list, dropping blanks.
pub fn split_uris(list: &str) -> Vec<&str> {
    list.split(',')
        .map(str::trim)
        .filter(|uri| !uri.is_empty())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub commenter: Address,
    pub text: String,
    pub timestamp: u64,
    pub is_anonymous: bool,
}

impl Comment {
    /// Author label; anonymous comments never reveal the address.
    pub fn display_author(&self, locale: Locale) -> String {
        match (self.is_anonymous, locale) {
            (true, Locale::En) => "Anonymous".to_string(),
            (true, Locale::Vi) => "Ẩn danh".to_string(),
            (false, _) => short_address(&self.commenter),
        }
    }
}

/// A capped read of an append-only list: the most recent entries in index order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Entries on-chain.
    pub total: u64,
    /// Whether `items` holds every entry.
    pub complete: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64) -> Self {
        let complete = items.len() as u64 >= total;
        Self {
            items,
            total,
            complete,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), 0)
    }
}

/// Index range of the most recent `limit` entries out of `count`.
pub fn recent_range(count: u64, limit: u64) -> std::ops::Range<u64> {
    count.saturating_sub(limit)..count
}

/// A campaign with every derived field resolved for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignSummary {
    #[serde(flatten)]
    pub campaign: Campaign,
    pub progress: u8,
    pub days_left: i64,
    pub status: CampaignStatus,
    pub can_accept_donations: bool,
    pub can_disburse: bool,
    pub target_display: String,
    pub collected_display: String,
    /// Fiat equivalents; `None` when no rate source is configured.
    pub target_fiat: Option<f64>,
    pub collected_fiat: Option<f64>,
}

impl CampaignSummary {
    pub fn new(campaign: Campaign, now: u64, decimals: u8, rate: Option<f64>) -> Self {
        let fiat = |amount: U256| rate.map(|rate| amount_to_f64(amount, decimals) * rate);
        Self {
            progress: campaign.progress(),
            days_left: campaign.days_left(now),
            status: campaign.status(now),
            can_accept_donations: campaign.can_accept_donations(now),
            can_disburse: campaign.can_disburse(now),
            target_display: format_amount(campaign.target_amount, decimals),
            collected_display: format_amount(campaign.collected, decimals),
            target_fiat: fiat(campaign.target_amount),
            collected_fiat: fiat(campaign.collected),
            campaign,
        }
    }
}

/// One account's donations to a single campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDonations {
    pub campaign_id: u64,
    pub campaign_title: String,
    pub donations: Vec<Donation>,
    pub total: U256,
}

/// Input for `createCampaign`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignDraft {
    pub title: String,
    pub description: String,
    pub media: String,
    pub location: String,
    pub target_amount: U256,
    pub campaign_wallet: Address,
    pub end_date: u64,
    pub beneficiary: String,
}

/// Input for `disburseFromContract`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisbursementRequest {
    pub campaign_id: u64,
    pub recipient: Address,
    pub amount: U256,
    pub proof_image: String,
    pub note: String,
}

/// Result of a mined write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteReceipt {
    pub write_id: Uuid,
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    /// Set by `create_campaign` when the creation event was found.
    pub campaign_id: Option<u64>,
}
