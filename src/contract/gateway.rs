//! Charity contract gateway.
//!
//! # Responsibilities
//! - Read and normalize campaigns, donations, disbursements, comments,
//!   likes and supporters
//! - Validate write inputs locally, then submit and wait for the receipt
//! - Track every write so callers can render pending state
//!
//! Reads go through the read provider and never need a signer. Writes go
//! through the signer handle bound from the current session.

use std::sync::Arc;

use alloy::dyn_abi::DynSolValue;
use alloy::network::TransactionBuilder;
use alloy::primitives::utils::{parse_units, ParseUnits};
use alloy::primitives::{Address, U256};
use alloy::rpc::types::TransactionRequest;
use arc_swap::ArcSwapOption;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::blockchain::provider::{ReceiptSummary, WalletProvider};
use crate::blockchain::session::ChainSession;
use crate::blockchain::types::{SessionEvent, SessionHandle};
use crate::config::ContractConfig;
use crate::contract::abi::ContractAbi;
use crate::contract::fanout::fetch_ordered;
use crate::contract::normalize;
use crate::contract::records::{
    recent_range, split_uris, unix_now, Campaign, CampaignDraft, CampaignSummary, Comment,
    Disbursement, DisbursementRequest, Donation, Page, UserDonations, WriteReceipt,
};
use crate::contract::transaction::{
    wait_for_receipt, ReceiptWait, WriteOperation, WriteRecord, WriteState, WriteTracker,
};
use crate::error::{CharityError, CharityResult};
use crate::observability::metrics;
use crate::rates::ExchangeRateCache;

/// Minimum disbursement note length, in characters.
pub const MIN_NOTE_CHARS: usize = 10;

fn uint(value: u64) -> DynSolValue {
    DynSolValue::Uint(U256::from(value), 256)
}

/// Parse a `0x` address, reporting failures against `field`.
pub fn parse_address(field: &str, value: &str) -> CharityResult<Address> {
    value
        .trim()
        .parse()
        .map_err(|e| CharityError::validation(field, format!("invalid address: {}", e)))
}

/// Parse a decimal native amount (e.g. `0.5`) into minor units.
/// Negative amounts are rejected; zero is left to the caller.
pub fn parse_native_amount(field: &str, value: &str, decimals: u8) -> CharityResult<U256> {
    let units = parse_units(value.trim(), decimals)
        .map_err(|e| CharityError::validation(field, format!("invalid amount: {}", e)))?;
    match units {
        ParseUnits::U256(amount) => Ok(amount),
        ParseUnits::I256(amount) if amount.is_negative() => {
            Err(CharityError::validation(field, "must be greater than zero"))
        }
        ParseUnits::I256(amount) => Ok(amount.into_raw()),
    }
}

/// Local checks for a new campaign, before any network call.
pub fn validate_draft(draft: &CampaignDraft, now: u64) -> CharityResult<()> {
    if draft.title.trim().is_empty() {
        return Err(CharityError::validation("title", "must not be empty"));
    }
    if draft.target_amount.is_zero() {
        return Err(CharityError::validation("targetAmount", "must be greater than zero"));
    }
    if draft.end_date <= now {
        return Err(CharityError::validation("endDate", "must be in the future"));
    }
    if draft.campaign_wallet.is_zero() {
        return Err(CharityError::validation("campaignWallet", "must not be the zero address"));
    }
    Ok(())
}

/// Local checks for a disbursement, before any network call.
pub fn validate_disbursement(request: &DisbursementRequest) -> CharityResult<()> {
    if request.amount.is_zero() {
        return Err(CharityError::validation("amount", "must be greater than zero"));
    }
    if request.recipient.is_zero() {
        return Err(CharityError::validation("recipient", "must not be the zero address"));
    }
    let uris = split_uris(&request.proof_image);
    if uris.is_empty() || uris.iter().any(|uri| !uri.starts_with("http")) {
        return Err(CharityError::validation(
            "proofImage",
            "every proof must be an http(s) URL",
        ));
    }
    if request.note.trim().chars().count() < MIN_NOTE_CHARS {
        return Err(CharityError::validation(
            "note",
            format!("must be at least {} characters", MIN_NOTE_CHARS),
        ));
    }
    Ok(())
}

/// Single point of contact with the deployed charity contract.
pub struct ContractGateway {
    address: Address,
    abi: ContractAbi,
    reader: Arc<dyn WalletProvider>,
    signer: ArcSwapOption<SessionHandle>,
    page_limit: u64,
    fetch_concurrency: usize,
    receipt_wait: ReceiptWait,
    /// Native currency decimals, for display amounts.
    decimals: u8,
    rates: Option<Arc<ExchangeRateCache>>,
    writes: WriteTracker,
}

impl ContractGateway {
    pub fn new(
        config: &ContractConfig,
        abi: ContractAbi,
        reader: Arc<dyn WalletProvider>,
    ) -> CharityResult<Self> {
        let address = parse_address("contract.address", &config.address)?;
        Ok(Self {
            address,
            abi,
            reader,
            signer: ArcSwapOption::empty(),
            page_limit: config.page_limit.max(1) as u64,
            fetch_concurrency: config.fetch_concurrency.max(1),
            receipt_wait: ReceiptWait::from_config(config),
            decimals: 18,
            rates: None,
            writes: WriteTracker::new(),
        })
    }

    /// Attach the rate cache used by `campaign_summaries`.
    pub fn with_rates(mut self, rates: Arc<ExchangeRateCache>) -> Self {
        self.rates = Some(rates);
        self
    }

    pub fn with_decimals(mut self, decimals: u8) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn abi(&self) -> &ContractAbi {
        &self.abi
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    // ----- session coupling -----

    pub fn bind_signer(&self, handle: SessionHandle) {
        tracing::debug!(account = %handle.account, "Gateway signer bound");
        self.signer.store(Some(Arc::new(handle)));
    }

    pub fn unbind_signer(&self) {
        if self.signer.swap(None).is_some() {
            tracing::debug!("Gateway signer unbound");
        }
    }

    /// Account writes are currently sent from.
    pub fn signer_account(&self) -> Option<Address> {
        self.signer.load_full().map(|h| h.account)
    }

    /// Rebind or drop the signer after a session change.
    pub fn apply_session_event(&self, event: &SessionEvent) {
        match event.handle() {
            Some(handle) => self.bind_signer(handle.clone()),
            None => self.unbind_signer(),
        }
    }

    /// Bind the session's current handle and keep following its events.
    pub fn follow(self: &Arc<Self>, session: &ChainSession) -> JoinHandle<()> {
        let mut events = session.subscribe();
        match session.handle() {
            Some(handle) => self.bind_signer(handle),
            None => self.unbind_signer(),
        }

        let gateway = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => gateway.apply_session_event(&event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Missed session events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    fn signer(&self) -> CharityResult<Arc<SessionHandle>> {
        self.signer.load_full().ok_or(CharityError::NotConnected)
    }

    // ----- reads -----

    async fn read(&self, function: &str, args: &[DynSolValue]) -> CharityResult<Vec<DynSolValue>> {
        let data = self.abi.encode_call(function, args)?;
        let tx = TransactionRequest::default()
            .with_to(self.address)
            .with_input(data);
        let output = self.reader.call(tx).await?;
        self.abi.decode_output(function, &output)
    }

    async fn read_u64(&self, function: &str, args: &[DynSolValue]) -> CharityResult<u64> {
        normalize::scalar_u64(self.read(function, args).await?, function)
    }

    pub async fn next_campaign_id(&self) -> CharityResult<u64> {
        self.read_u64("nextCampaignId", &[]).await
    }

    /// `Ok(None)` for ids that hold no campaign.
    pub async fn get_campaign(&self, id: u64) -> CharityResult<Option<Campaign>> {
        if id == 0 {
            return Ok(None);
        }
        normalize::campaign(self.read("campaigns", &[uint(id)]).await?)
    }

    pub async fn require_campaign(&self, id: u64) -> CharityResult<Campaign> {
        self.get_campaign(id)
            .await?
            .ok_or_else(|| CharityError::NotFound(format!("Campaign {}", id)))
    }

    /// Every campaign in ascending id order. Unreadable campaigns are skipped.
    pub async fn get_all_campaigns(&self) -> CharityResult<Vec<Campaign>> {
        let next_id = self.next_campaign_id().await?;
        let ids: Vec<u64> = (1..next_id).collect();
        tracing::debug!(count = ids.len(), "Loading campaigns");

        let results = fetch_ordered(ids, self.fetch_concurrency, |id| self.get_campaign(id)).await;

        let mut campaigns = Vec::with_capacity(results.len());
        for (id, result) in results {
            match result {
                Ok(Some(campaign)) => campaigns.push(campaign),
                Ok(None) => {}
                Err(e) => {
                    metrics::record_campaign_skipped();
                    tracing::warn!(campaign_id = id, error = %e, "Skipping unreadable campaign");
                }
            }
        }
        Ok(campaigns)
    }

    /// Count-then-index read of `indices`, in index order.
    async fn read_indexed<T>(
        &self,
        id: u64,
        item_fn: &str,
        indices: std::ops::Range<u64>,
        parse: fn(Vec<DynSolValue>) -> CharityResult<T>,
    ) -> CharityResult<Vec<T>> {
        let results = fetch_ordered(indices.collect(), self.fetch_concurrency, |index| async move {
            parse(self.read(item_fn, &[uint(id), uint(index)]).await?)
        })
        .await;
        results.into_iter().map(|(_, item)| item).collect()
    }

    async fn read_page<T>(
        &self,
        id: u64,
        count_fn: &str,
        item_fn: &str,
        parse: fn(Vec<DynSolValue>) -> CharityResult<T>,
    ) -> CharityResult<Page<T>> {
        let total = self.read_u64(count_fn, &[uint(id)]).await?;
        let items = self
            .read_indexed(id, item_fn, recent_range(total, self.page_limit), parse)
            .await?;
        Ok(Page::new(items, total))
    }

    /// The most recent donations to a campaign.
    pub async fn get_donations(&self, id: u64) -> CharityResult<Page<Donation>> {
        self.read_page(id, "getDonationsCount", "getDonation", normalize::donation)
            .await
    }

    pub async fn get_disbursements(&self, id: u64) -> CharityResult<Page<Disbursement>> {
        self.read_page(
            id,
            "getDisbursementsCount",
            "getDisbursement",
            normalize::disbursement,
        )
        .await
    }

    pub async fn get_comments(&self, id: u64) -> CharityResult<Page<Comment>> {
        self.read_page(id, "getCommentsCount", "getComment", normalize::comment)
            .await
    }

    /// The most recent supporters of a campaign.
    pub async fn get_supporters(&self, id: u64) -> CharityResult<Page<Address>> {
        let total = self.read_u64("getSupportersCount", &[uint(id)]).await?;
        if total == 0 {
            return Ok(Page::empty());
        }
        let all = normalize::address_list(
            self.read("getSupporters", &[uint(id)]).await?,
            "supporters",
        )?;
        let range = recent_range(all.len() as u64, self.page_limit);
        let items = all[range.start as usize..range.end as usize].to_vec();
        Ok(Page::new(items, total.max(all.len() as u64)))
    }

    pub async fn get_likes_count(&self, id: u64) -> CharityResult<u64> {
        self.read_u64("likesCount", &[uint(id)]).await
    }

    pub async fn is_liked(&self, id: u64, account: Address) -> CharityResult<bool> {
        normalize::scalar_bool(
            self.read("liked", &[uint(id), DynSolValue::Address(account)])
                .await?,
            "liked",
        )
    }

    pub async fn is_admin(&self, account: Address) -> CharityResult<bool> {
        normalize::scalar_bool(
            self.read("isAdmin", &[DynSolValue::Address(account)]).await?,
            "isAdmin",
        )
    }

    /// Every donation `account` made to campaign `id`. Not capped.
    async fn donations_by(&self, id: u64, account: Address) -> CharityResult<Vec<Donation>> {
        let count = self.read_u64("getDonationsCount", &[uint(id)]).await?;
        if count == 0 {
            return Ok(Vec::new());
        }
        Ok(self
            .read_indexed(id, "getDonation", 0..count, normalize::donation)
            .await?
            .into_iter()
            .filter(|d| d.donor == account)
            .collect())
    }

    /// Every donation made by `account`, grouped by campaign. Not capped.
    /// Campaigns whose donation list cannot be read are skipped.
    pub async fn get_user_donations(&self, account: Address) -> CharityResult<Vec<UserDonations>> {
        let campaigns = self.get_all_campaigns().await?;
        let mut grouped = Vec::new();

        for campaign in campaigns {
            let donations = match self.donations_by(campaign.id, account).await {
                Ok(donations) => donations,
                Err(e) => {
                    metrics::record_campaign_skipped();
                    tracing::warn!(campaign_id = campaign.id, error = %e, "Skipping unreadable donations");
                    continue;
                }
            };
            if donations.is_empty() {
                continue;
            }
            let total = donations
                .iter()
                .fold(U256::ZERO, |sum, d| sum.saturating_add(d.amount));
            grouped.push(UserDonations {
                campaign_id: campaign.id,
                campaign_title: campaign.title,
                donations,
                total,
            });
        }
        Ok(grouped)
    }

    /// Campaigns with derived fields and fiat amounts resolved.
    pub async fn campaign_summaries(&self, now: u64) -> CharityResult<Vec<CampaignSummary>> {
        let campaigns = self.get_all_campaigns().await?;
        let rate = match &self.rates {
            Some(rates) => Some(rates.get_rate().await),
            None => None,
        };
        Ok(campaigns
            .into_iter()
            .map(|c| CampaignSummary::new(c, now, self.decimals, rate))
            .collect())
    }

    // ----- writes -----

    /// Submit a transaction and wait for its receipt.
    async fn submit(
        &self,
        operation: WriteOperation,
        campaign_id: Option<u64>,
        handle: &SessionHandle,
        function: &str,
        args: &[DynSolValue],
        value: U256,
    ) -> CharityResult<(WriteReceipt, ReceiptSummary)> {
        let data = self.abi.encode_call(function, args)?;
        let mut tx = TransactionRequest::default()
            .with_from(handle.account)
            .with_to(self.address)
            .with_input(data);
        if !value.is_zero() {
            tx = tx.with_value(value);
        }

        let tx_hash = match handle.provider.send_transaction(tx).await {
            Ok(hash) => hash,
            Err(e) if e.is_user_rejection() => {
                self.writes.rejected(operation, campaign_id);
                tracing::info!(operation = operation.as_str(), "Transaction rejected in wallet");
                return Err(CharityError::tx_failed("Transaction rejected by the user"));
            }
            Err(e) if e.is_revert() => {
                self.writes.reverted(operation, campaign_id);
                tracing::warn!(operation = operation.as_str(), reason = %e.message, "Transaction reverted before broadcast");
                return Err(CharityError::tx_failed(e.message));
            }
            Err(e) => {
                tracing::warn!(operation = operation.as_str(), error = %e, "Transaction submission failed");
                return Err(e.into());
            }
        };

        let write_id = self.writes.submitted(operation, campaign_id, tx_hash);
        tracing::info!(
            operation = operation.as_str(),
            tx_hash = %tx_hash,
            write_id = %write_id,
            "Transaction submitted"
        );

        let receipt = wait_for_receipt(handle.provider.as_ref(), tx_hash, &self.receipt_wait).await?;

        if !receipt.success {
            self.writes
                .resolve(write_id, WriteState::Reverted, receipt.block_number);
            tracing::warn!(operation = operation.as_str(), tx_hash = %tx_hash, "Transaction reverted");
            return Err(CharityError::tx_failed("Transaction reverted"));
        }

        self.writes
            .resolve(write_id, WriteState::Mined, receipt.block_number);
        tracing::info!(
            operation = operation.as_str(),
            tx_hash = %tx_hash,
            block_number = ?receipt.block_number,
            "Transaction mined"
        );

        Ok((
            WriteReceipt {
                write_id,
                tx_hash,
                block_number: receipt.block_number,
                campaign_id,
            },
            receipt,
        ))
    }

    /// Admin pre-check. An unreadable admin flag lets the contract decide.
    async fn ensure_admin(&self, account: Address) -> CharityResult<()> {
        match self.is_admin(account).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(CharityError::validation(
                "account",
                "connected account is not an admin",
            )),
            Err(e) => {
                tracing::warn!(account = %account, error = %e, "Admin status unknown, submitting anyway");
                Ok(())
            }
        }
    }

    pub async fn donate(&self, campaign_id: u64, amount: U256) -> CharityResult<WriteReceipt> {
        if amount.is_zero() {
            return Err(CharityError::validation("amount", "must be greater than zero"));
        }
        let handle = self.signer()?;
        let (receipt, _) = self
            .submit(
                WriteOperation::Donate,
                Some(campaign_id),
                &handle,
                "donate",
                &[uint(campaign_id)],
                amount,
            )
            .await?;
        Ok(receipt)
    }

    pub async fn like(&self, campaign_id: u64) -> CharityResult<WriteReceipt> {
        let handle = self.signer()?;
        let (receipt, _) = self
            .submit(
                WriteOperation::Like,
                Some(campaign_id),
                &handle,
                "like",
                &[uint(campaign_id)],
                U256::ZERO,
            )
            .await?;
        Ok(receipt)
    }

    pub async fn unlike(&self, campaign_id: u64) -> CharityResult<WriteReceipt> {
        let handle = self.signer()?;
        let (receipt, _) = self
            .submit(
                WriteOperation::Unlike,
                Some(campaign_id),
                &handle,
                "unlike",
                &[uint(campaign_id)],
                U256::ZERO,
            )
            .await?;
        Ok(receipt)
    }

    pub async fn add_comment(
        &self,
        campaign_id: u64,
        text: &str,
        anonymous: bool,
    ) -> CharityResult<WriteReceipt> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CharityError::validation("text", "comment must not be empty"));
        }
        let handle = self.signer()?;
        let (receipt, _) = self
            .submit(
                WriteOperation::Comment,
                Some(campaign_id),
                &handle,
                "addComment",
                &[
                    uint(campaign_id),
                    DynSolValue::String(text.to_string()),
                    DynSolValue::Bool(anonymous),
                ],
                U256::ZERO,
            )
            .await?;
        Ok(receipt)
    }

    /// Admin: create a campaign. The new id is read from `CampaignCreated`.
    pub async fn create_campaign(&self, draft: CampaignDraft) -> CharityResult<WriteReceipt> {
        validate_draft(&draft, unix_now())?;
        let handle = self.signer()?;
        self.ensure_admin(handle.account).await?;

        let existing = self.get_all_campaigns().await?;
        if let Some(other) = existing
            .iter()
            .find(|c| c.campaign_wallet == draft.campaign_wallet)
        {
            return Err(CharityError::validation(
                "campaignWallet",
                format!("already used by campaign {}", other.id),
            ));
        }

        let args = [
            DynSolValue::String(draft.title.trim().to_string()),
            DynSolValue::String(draft.description),
            DynSolValue::String(draft.media),
            DynSolValue::String(draft.location),
            DynSolValue::Uint(draft.target_amount, 256),
            DynSolValue::Address(draft.campaign_wallet),
            uint(draft.end_date),
            DynSolValue::String(draft.beneficiary),
        ];
        let (mut receipt, summary) = self
            .submit(
                WriteOperation::CreateCampaign,
                None,
                &handle,
                "createCampaign",
                &args,
                U256::ZERO,
            )
            .await?;

        receipt.campaign_id = self.abi.campaign_created_id(self.address, &summary.logs);
        match receipt.campaign_id {
            Some(id) => tracing::info!(campaign_id = id, "Campaign created"),
            None => tracing::warn!(tx_hash = %receipt.tx_hash, "Campaign created but no creation event found"),
        }
        Ok(receipt)
    }

    /// Admin: pay out collected funds of an ended campaign.
    pub async fn disburse(&self, request: DisbursementRequest) -> CharityResult<WriteReceipt> {
        validate_disbursement(&request)?;
        let handle = self.signer()?;
        self.ensure_admin(handle.account).await?;

        let campaign = self.require_campaign(request.campaign_id).await?;
        if !campaign.can_disburse(unix_now()) {
            return Err(CharityError::validation(
                "campaign",
                "campaign has not ended or has nothing left to disburse",
            ));
        }
        if request.amount > campaign.undisbursed() {
            return Err(CharityError::validation(
                "amount",
                "exceeds undisbursed funds",
            ));
        }

        let args = [
            uint(request.campaign_id),
            DynSolValue::Address(request.recipient),
            DynSolValue::Uint(request.amount, 256),
            DynSolValue::String(request.proof_image.trim().to_string()),
            DynSolValue::String(request.note.trim().to_string()),
        ];
        let (receipt, _) = self
            .submit(
                WriteOperation::Disburse,
                Some(request.campaign_id),
                &handle,
                "disburseFromContract",
                &args,
                U256::ZERO,
            )
            .await?;
        Ok(receipt)
    }

    // ----- write state -----

    pub fn write_status(&self, id: &Uuid) -> Option<WriteRecord> {
        self.writes.get(id)
    }

    pub fn pending_writes(&self) -> Vec<WriteRecord> {
        self.writes.pending()
    }

    /// Finished and pending writes since the last prune.
    pub fn write_history(&self) -> Vec<WriteRecord> {
        self.writes.history()
    }

    /// Whether a write for `campaign_id` is still waiting for its receipt.
    pub fn has_pending_write(&self, campaign_id: u64) -> bool {
        !self.writes.pending_for(campaign_id).is_empty()
    }

    pub fn prune_finished(&self) -> usize {
        self.writes.prune_finished()
    }
}

impl std::fmt::Debug for ContractGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractGateway")
            .field("address", &self.address)
            .field("abi", self.abi.source())
            .field("signer", &self.signer_account())
            .field("page_limit", &self.page_limit)
            .field("fetch_concurrency", &self.fetch_concurrency)
            .finish()
    }
}
