//! Shared utilities for integration testing.
//!
//! `FakeCharity` is an in-memory wallet that also plays the charity contract:
//! calldata is decoded with the built-in ABI and answered from local state.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use alloy::dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt};
use alloy::json_abi::Function;
use alloy::primitives::{keccak256, Address, Bytes, Log, LogData, TxHash, B256, U256};
use alloy::rpc::types::TransactionRequest;
use futures_util::future::{self, BoxFuture, FutureExt};
use tokio::sync::broadcast;

use charity_gateway::blockchain::provider::{
    ProviderEvent, ProviderResult, ProviderRpcError, ReceiptSummary, WalletProvider,
    UNRECOGNIZED_CHAIN_CODE, USER_REJECTED_CODE,
};
use charity_gateway::blockchain::{ChainSession, DisconnectFlag};
use charity_gateway::config::{ContractConfig, NetworkDescriptor};
use charity_gateway::contract::abi::{ContractAbi, CAMPAIGN_CREATED_EVENT};
use charity_gateway::contract::records::{unix_now, Campaign, Comment, Disbursement, Donation};
use charity_gateway::contract::ContractGateway;

pub const DAY: u64 = 86_400;

/// The wallet's default account.
pub fn alice() -> Address {
    Address::repeat_byte(0xA1)
}

pub fn bob() -> Address {
    Address::repeat_byte(0xB0)
}

pub fn native(units: u64) -> U256 {
    U256::from(units) * U256::from(10).pow(U256::from(18))
}

pub fn network() -> NetworkDescriptor {
    NetworkDescriptor::default()
}

pub fn contract_config() -> ContractConfig {
    ContractConfig {
        page_limit: 3,
        fetch_concurrency: 4,
        receipt_poll_ms: 5,
        ..ContractConfig::default()
    }
}

/// A campaign owned by `alice` with the given amounts and end date.
pub fn campaign(title: &str, target: U256, collected: U256, end_date: u64) -> Campaign {
    let now = unix_now();
    Campaign {
        id: 0,
        creator: alice(),
        title: title.to_string(),
        description: format!("{} description", title),
        media: "https://img.example/campaign.jpg".to_string(),
        location: "Hue".to_string(),
        target_amount: target,
        campaign_wallet: Address::ZERO,
        collected,
        total_disbursed: U256::ZERO,
        created_at: now - 30 * DAY,
        end_date,
        updated_at: now - 30 * DAY,
        beneficiary: "Local families".to_string(),
        active: true,
    }
}

#[derive(Default)]
struct ContractState {
    campaigns: Vec<Campaign>,
    donations: HashMap<u64, Vec<Donation>>,
    disbursements: HashMap<u64, Vec<Disbursement>>,
    comments: HashMap<u64, Vec<Comment>>,
    likes: HashMap<u64, HashSet<Address>>,
    supporters: HashMap<u64, Vec<Address>>,
    admins: HashSet<Address>,
    /// Campaign ids whose reads fail.
    broken: HashSet<u64>,
    /// Campaign ids whose donation reads fail.
    broken_donations: HashSet<u64>,
}

struct WalletState {
    accounts: Vec<Address>,
    authorized: bool,
    chain_id: u64,
    known_chains: HashSet<u64>,
    block: u64,
    receipts: HashMap<TxHash, ReceiptSummary>,
    reject_requests: bool,
    reject_transactions: bool,
    /// Revert reason reported by `send_transaction` itself, as a node does during gas estimation.
    send_revert: Option<String>,
    revoke_fails: bool,
    admin_read_fails: bool,
}

/// In-memory wallet + charity contract.
pub struct FakeCharity {
    abi: ContractAbi,
    address: Address,
    contract: Mutex<ContractState>,
    wallet: Mutex<WalletState>,
    calls: AtomicUsize,
    events: broadcast::Sender<ProviderEvent>,
}

const FUNCTIONS: &[&str] = &[
    "nextCampaignId",
    "campaigns",
    "getDonationsCount",
    "getDonation",
    "getDisbursementsCount",
    "getDisbursement",
    "getCommentsCount",
    "getComment",
    "getSupporters",
    "getSupportersCount",
    "likesCount",
    "liked",
    "isAdmin",
    "donate",
    "like",
    "unlike",
    "addComment",
    "createCampaign",
    "disburseFromContract",
];

fn revert(reason: &str) -> ProviderRpcError {
    ProviderRpcError::new(3, format!("execution reverted: {}", reason))
}

fn uint(v: u64) -> DynSolValue {
    DynSolValue::Uint(U256::from(v), 256)
}

fn arg_u64(args: &[DynSolValue], i: usize) -> u64 {
    match &args[i] {
        DynSolValue::Uint(v, _) => v.to::<u64>(),
        other => panic!("expected uint argument, got {:?}", other),
    }
}

fn arg_u256(args: &[DynSolValue], i: usize) -> U256 {
    match &args[i] {
        DynSolValue::Uint(v, _) => *v,
        other => panic!("expected uint argument, got {:?}", other),
    }
}

fn arg_address(args: &[DynSolValue], i: usize) -> Address {
    match &args[i] {
        DynSolValue::Address(a) => *a,
        other => panic!("expected address argument, got {:?}", other),
    }
}

fn arg_string(args: &[DynSolValue], i: usize) -> String {
    match &args[i] {
        DynSolValue::String(s) => s.clone(),
        other => panic!("expected string argument, got {:?}", other),
    }
}

fn arg_bool(args: &[DynSolValue], i: usize) -> bool {
    match &args[i] {
        DynSolValue::Bool(b) => *b,
        other => panic!("expected bool argument, got {:?}", other),
    }
}

fn hash_or_zero(hash: Option<B256>) -> DynSolValue {
    DynSolValue::FixedBytes(hash.unwrap_or_default(), 32)
}

fn campaign_values(c: Option<&Campaign>) -> Vec<DynSolValue> {
    let empty = Campaign {
        id: 0,
        creator: Address::ZERO,
        title: String::new(),
        description: String::new(),
        media: String::new(),
        location: String::new(),
        target_amount: U256::ZERO,
        campaign_wallet: Address::ZERO,
        collected: U256::ZERO,
        total_disbursed: U256::ZERO,
        created_at: 0,
        end_date: 0,
        updated_at: 0,
        beneficiary: String::new(),
        active: false,
    };
    let c = c.unwrap_or(&empty);
    vec![
        uint(c.id),
        DynSolValue::Address(c.creator),
        DynSolValue::String(c.title.clone()),
        DynSolValue::String(c.description.clone()),
        DynSolValue::String(c.media.clone()),
        DynSolValue::String(c.location.clone()),
        DynSolValue::Uint(c.target_amount, 256),
        DynSolValue::Address(c.campaign_wallet),
        DynSolValue::Uint(c.collected, 256),
        DynSolValue::Uint(c.total_disbursed, 256),
        uint(c.created_at),
        uint(c.end_date),
        uint(c.updated_at),
        DynSolValue::String(c.beneficiary.clone()),
        DynSolValue::Bool(c.active),
    ]
}

impl FakeCharity {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        let mut known_chains = HashSet::new();
        known_chains.insert(network().chain_id);
        let mut contract = ContractState::default();
        contract.admins.insert(alice());

        Arc::new(Self {
            abi: ContractAbi::fallback(),
            address: ContractConfig::default()
                .address
                .parse()
                .expect("default contract address"),
            contract: Mutex::new(contract),
            wallet: Mutex::new(WalletState {
                accounts: vec![alice()],
                authorized: false,
                chain_id: network().chain_id,
                known_chains,
                block: 100,
                receipts: HashMap::new(),
                reject_requests: false,
                reject_transactions: false,
                send_revert: None,
                revoke_fails: false,
                admin_read_fails: false,
            }),
            calls: AtomicUsize::new(0),
            events,
        })
    }

    // ----- knobs -----

    /// Total provider calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn authorize(&self) {
        self.wallet.lock().unwrap().authorized = true;
    }

    pub fn is_authorized(&self) -> bool {
        self.wallet.lock().unwrap().authorized
    }

    pub fn set_accounts(&self, accounts: Vec<Address>) {
        self.wallet.lock().unwrap().accounts = accounts;
    }

    /// Put the wallet on another chain. The chain is not made known.
    pub fn set_chain(&self, chain_id: u64) {
        self.wallet.lock().unwrap().chain_id = chain_id;
    }

    pub fn forget_chain(&self, chain_id: u64) {
        self.wallet.lock().unwrap().known_chains.remove(&chain_id);
    }

    pub fn reject_requests(&self, reject: bool) {
        self.wallet.lock().unwrap().reject_requests = reject;
    }

    pub fn reject_transactions(&self, reject: bool) {
        self.wallet.lock().unwrap().reject_transactions = reject;
    }

    pub fn revert_on_send(&self, reason: Option<&str>) {
        self.wallet.lock().unwrap().send_revert = reason.map(str::to_string);
    }

    pub fn fail_revoke(&self, fail: bool) {
        self.wallet.lock().unwrap().revoke_fails = fail;
    }

    pub fn fail_admin_reads(&self, fail: bool) {
        self.wallet.lock().unwrap().admin_read_fails = fail;
    }

    pub fn break_campaign(&self, id: u64) {
        self.contract.lock().unwrap().broken.insert(id);
    }

    pub fn break_donations(&self, id: u64) {
        self.contract.lock().unwrap().broken_donations.insert(id);
    }

    pub fn remove_admin(&self, account: Address) {
        self.contract.lock().unwrap().admins.remove(&account);
    }

    /// Push a wallet notification.
    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events.send(event);
    }

    // ----- seeding -----

    /// Add a campaign; returns its id.
    pub fn seed_campaign(&self, mut campaign: Campaign) -> u64 {
        let mut state = self.contract.lock().unwrap();
        let id = state.campaigns.len() as u64 + 1;
        campaign.id = id;
        if campaign.campaign_wallet == Address::ZERO {
            campaign.campaign_wallet = Address::left_padding_from(&id.to_be_bytes());
        }
        state.campaigns.push(campaign);
        id
    }

    pub fn seed_donation(&self, id: u64, donor: Address, amount: U256) {
        let mut state = self.contract.lock().unwrap();
        let n = state.donations.get(&id).map_or(0, Vec::len) as u64;
        state.donations.entry(id).or_default().push(Donation {
            donor,
            amount,
            timestamp: unix_now(),
            block_number: 10 + n,
            tx_hash: Some(keccak256(format!("seed-{}-{}", id, n))),
        });
        let supporters = state.supporters.entry(id).or_default();
        if !supporters.contains(&donor) {
            supporters.push(donor);
        }
    }

    pub fn seed_comment(&self, id: u64, commenter: Address, text: &str, anonymous: bool) {
        self.contract
            .lock()
            .unwrap()
            .comments
            .entry(id)
            .or_default()
            .push(Comment {
                commenter,
                text: text.to_string(),
                timestamp: unix_now(),
                is_anonymous: anonymous,
            });
    }

    pub fn campaign(&self, id: u64) -> Option<Campaign> {
        let state = self.contract.lock().unwrap();
        state.campaigns.get(id as usize - 1).cloned()
    }

    pub fn comments(&self, id: u64) -> Vec<Comment> {
        let state = self.contract.lock().unwrap();
        state.comments.get(&id).cloned().unwrap_or_default()
    }

    pub fn disbursements(&self, id: u64) -> Vec<Disbursement> {
        let state = self.contract.lock().unwrap();
        state.disbursements.get(&id).cloned().unwrap_or_default()
    }

    // ----- contract simulation -----

    fn function_for(&self, input: &[u8]) -> ProviderResult<&Function> {
        if input.len() < 4 {
            return Err(revert("no selector"));
        }
        FUNCTIONS
            .iter()
            .filter_map(|name| self.abi.function(name).ok())
            .find(|f| f.selector().as_slice() == &input[..4])
            .ok_or_else(|| revert("unknown selector"))
    }

    fn decode(&self, tx: &TransactionRequest) -> ProviderResult<(&Function, Vec<DynSolValue>)> {
        let input = tx.input.input().cloned().unwrap_or_default();
        let function = self.function_for(&input)?;
        let args = function
            .abi_decode_input(&input[4..])
            .map_err(|e| revert(&e.to_string()))?;
        Ok((function, args))
    }

    fn view(&self, name: &str, args: &[DynSolValue]) -> ProviderResult<Vec<DynSolValue>> {
        let state = self.contract.lock().unwrap();
        let id = || arg_u64(args, 0);
        let index = || arg_u64(args, 1) as usize;

        if matches!(name, "campaigns") && state.broken.contains(&id()) {
            return Err(ProviderRpcError::internal("node unavailable"));
        }
        if matches!(name, "getDonationsCount" | "getDonation")
            && state.broken_donations.contains(&id())
        {
            return Err(ProviderRpcError::internal("node unavailable"));
        }

        let values = match name {
            "nextCampaignId" => vec![uint(state.campaigns.len() as u64 + 1)],
            "campaigns" => {
                let found = id()
                    .checked_sub(1)
                    .and_then(|i| state.campaigns.get(i as usize));
                campaign_values(found)
            }
            "getDonationsCount" => vec![uint(state.donations.get(&id()).map_or(0, Vec::len) as u64)],
            "getDonation" => {
                let d = state
                    .donations
                    .get(&id())
                    .and_then(|list| list.get(index()))
                    .ok_or_else(|| revert("index out of range"))?;
                vec![
                    DynSolValue::Address(d.donor),
                    DynSolValue::Uint(d.amount, 256),
                    uint(d.timestamp),
                    uint(d.block_number),
                    hash_or_zero(d.tx_hash),
                ]
            }
            "getDisbursementsCount" => {
                vec![uint(state.disbursements.get(&id()).map_or(0, Vec::len) as u64)]
            }
            "getDisbursement" => {
                let d = state
                    .disbursements
                    .get(&id())
                    .and_then(|list| list.get(index()))
                    .ok_or_else(|| revert("index out of range"))?;
                vec![
                    DynSolValue::Address(d.recipient),
                    DynSolValue::Uint(d.amount, 256),
                    uint(d.timestamp),
                    uint(d.block_number),
                    hash_or_zero(d.tx_hash),
                    DynSolValue::String(d.proof_image.clone()),
                    DynSolValue::String(d.note.clone()),
                ]
            }
            "getCommentsCount" => vec![uint(state.comments.get(&id()).map_or(0, Vec::len) as u64)],
            "getComment" => {
                let c = state
                    .comments
                    .get(&id())
                    .and_then(|list| list.get(index()))
                    .ok_or_else(|| revert("index out of range"))?;
                vec![
                    DynSolValue::Address(c.commenter),
                    DynSolValue::String(c.text.clone()),
                    uint(c.timestamp),
                    DynSolValue::Bool(c.is_anonymous),
                ]
            }
            "getSupporters" => vec![DynSolValue::Array(
                state
                    .supporters
                    .get(&id())
                    .map(|list| list.iter().copied().map(DynSolValue::Address).collect())
                    .unwrap_or_default(),
            )],
            "getSupportersCount" => {
                vec![uint(state.supporters.get(&id()).map_or(0, Vec::len) as u64)]
            }
            "likesCount" => vec![uint(state.likes.get(&id()).map_or(0, HashSet::len) as u64)],
            "liked" => {
                let account = arg_address(args, 1);
                vec![DynSolValue::Bool(
                    state.likes.get(&id()).is_some_and(|set| set.contains(&account)),
                )]
            }
            "isAdmin" => {
                if self.wallet.lock().unwrap().admin_read_fails {
                    return Err(ProviderRpcError::internal("node unavailable"));
                }
                vec![DynSolValue::Bool(state.admins.contains(&arg_address(args, 0)))]
            }
            other => return Err(revert(&format!("{} is not a view", other))),
        };
        Ok(values)
    }

    /// Apply a state-changing call. `Err` means the transaction reverts.
    fn execute(
        &self,
        name: &str,
        args: &[DynSolValue],
        from: Address,
        value: U256,
        block: u64,
        tx_hash: TxHash,
    ) -> Result<Vec<Log>, String> {
        let mut state = self.contract.lock().unwrap();
        let now = unix_now();
        let mut logs = Vec::new();

        match name {
            "donate" => {
                let id = arg_u64(args, 0);
                let campaign = id
                    .checked_sub(1)
                    .and_then(|i| state.campaigns.get_mut(i as usize))
                    .ok_or("campaign does not exist")?;
                if !campaign.active || campaign.end_date <= now {
                    return Err("campaign is not accepting donations".into());
                }
                campaign.collected += value;
                state.donations.entry(id).or_default().push(Donation {
                    donor: from,
                    amount: value,
                    timestamp: now,
                    block_number: block,
                    tx_hash: Some(tx_hash),
                });
                let supporters = state.supporters.entry(id).or_default();
                if !supporters.contains(&from) {
                    supporters.push(from);
                }
            }
            "like" => {
                if !state.likes.entry(arg_u64(args, 0)).or_default().insert(from) {
                    return Err("already liked".into());
                }
            }
            "unlike" => {
                if !state.likes.entry(arg_u64(args, 0)).or_default().remove(&from) {
                    return Err("not liked".into());
                }
            }
            "addComment" => {
                state
                    .comments
                    .entry(arg_u64(args, 0))
                    .or_default()
                    .push(Comment {
                        commenter: from,
                        text: arg_string(args, 1),
                        timestamp: now,
                        is_anonymous: arg_bool(args, 2),
                    });
            }
            "createCampaign" => {
                if !state.admins.contains(&from) {
                    return Err("caller is not an admin".into());
                }
                let id = state.campaigns.len() as u64 + 1;
                state.campaigns.push(Campaign {
                    id,
                    creator: from,
                    title: arg_string(args, 0),
                    description: arg_string(args, 1),
                    media: arg_string(args, 2),
                    location: arg_string(args, 3),
                    target_amount: arg_u256(args, 4),
                    campaign_wallet: arg_address(args, 5),
                    collected: U256::ZERO,
                    total_disbursed: U256::ZERO,
                    created_at: now,
                    end_date: arg_u64(args, 6),
                    updated_at: now,
                    beneficiary: arg_string(args, 7),
                    active: true,
                });
                let selector = self
                    .abi
                    .event(CAMPAIGN_CREATED_EVENT)
                    .map(|e| e.selector())
                    .unwrap_or_default();
                logs.push(Log {
                    address: self.address,
                    data: LogData::new_unchecked(
                        vec![
                            selector,
                            B256::left_padding_from(&id.to_be_bytes()),
                            B256::left_padding_from(from.as_slice()),
                        ],
                        Bytes::new(),
                    ),
                });
            }
            "disburseFromContract" => {
                if !state.admins.contains(&from) {
                    return Err("caller is not an admin".into());
                }
                let id = arg_u64(args, 0);
                let amount = arg_u256(args, 2);
                let campaign = id
                    .checked_sub(1)
                    .and_then(|i| state.campaigns.get_mut(i as usize))
                    .ok_or("campaign does not exist")?;
                if campaign.end_date >= now {
                    return Err("campaign has not ended".into());
                }
                if amount > campaign.collected - campaign.total_disbursed {
                    return Err("insufficient funds".into());
                }
                campaign.total_disbursed += amount;
                state.disbursements.entry(id).or_default().push(Disbursement {
                    recipient: arg_address(args, 1),
                    amount,
                    timestamp: now,
                    block_number: block,
                    tx_hash: Some(tx_hash),
                    proof_image: arg_string(args, 3),
                    note: arg_string(args, 4),
                });
            }
            other => return Err(format!("{} is not payable", other)),
        }
        Ok(logs)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl WalletProvider for FakeCharity {
    fn request_accounts(&self) -> BoxFuture<'_, ProviderResult<Vec<Address>>> {
        self.record_call();
        let mut wallet = self.wallet.lock().unwrap();
        let result = if wallet.reject_requests {
            Err(ProviderRpcError::new(USER_REJECTED_CODE, "User rejected the request."))
        } else {
            wallet.authorized = true;
            Ok(wallet.accounts.clone())
        };
        future::ready(result).boxed()
    }

    fn accounts(&self) -> BoxFuture<'_, ProviderResult<Vec<Address>>> {
        self.record_call();
        let wallet = self.wallet.lock().unwrap();
        let accounts = if wallet.authorized {
            wallet.accounts.clone()
        } else {
            Vec::new()
        };
        future::ready(Ok(accounts)).boxed()
    }

    fn chain_id(&self) -> BoxFuture<'_, ProviderResult<u64>> {
        self.record_call();
        future::ready(Ok(self.wallet.lock().unwrap().chain_id)).boxed()
    }

    fn switch_chain(&self, chain_id: u64) -> BoxFuture<'_, ProviderResult<()>> {
        self.record_call();
        let mut wallet = self.wallet.lock().unwrap();
        let result = if wallet.reject_requests {
            Err(ProviderRpcError::new(USER_REJECTED_CODE, "User rejected the request."))
        } else if !wallet.known_chains.contains(&chain_id) {
            Err(ProviderRpcError::new(
                UNRECOGNIZED_CHAIN_CODE,
                format!("Unrecognized chain ID {:#x}", chain_id),
            ))
        } else {
            wallet.chain_id = chain_id;
            Ok(())
        };
        future::ready(result).boxed()
    }

    fn add_chain(&self, network: NetworkDescriptor) -> BoxFuture<'_, ProviderResult<()>> {
        self.record_call();
        let mut wallet = self.wallet.lock().unwrap();
        wallet.known_chains.insert(network.chain_id);
        wallet.chain_id = network.chain_id;
        future::ready(Ok(())).boxed()
    }

    fn revoke_permissions(&self) -> BoxFuture<'_, ProviderResult<()>> {
        self.record_call();
        let mut wallet = self.wallet.lock().unwrap();
        let result = if wallet.revoke_fails {
            Err(ProviderRpcError::new(4200, "wallet_revokePermissions is not supported"))
        } else {
            wallet.authorized = false;
            Ok(())
        };
        future::ready(result).boxed()
    }

    fn get_balance(&self, _address: Address) -> BoxFuture<'_, ProviderResult<U256>> {
        self.record_call();
        future::ready(Ok(native(5))).boxed()
    }

    fn get_block_number(&self) -> BoxFuture<'_, ProviderResult<u64>> {
        self.record_call();
        future::ready(Ok(self.wallet.lock().unwrap().block)).boxed()
    }

    fn call(&self, tx: TransactionRequest) -> BoxFuture<'_, ProviderResult<Bytes>> {
        self.record_call();
        let result = self.decode(&tx).and_then(|(function, args)| {
            let values = self.view(&function.name, &args)?;
            function
                .abi_encode_output(&values)
                .map(Bytes::from)
                .map_err(|e| revert(&e.to_string()))
        });
        future::ready(result).boxed()
    }

    fn send_transaction(&self, tx: TransactionRequest) -> BoxFuture<'_, ProviderResult<TxHash>> {
        self.record_call();
        let result = (|| {
            let (block, from) = {
                let mut wallet = self.wallet.lock().unwrap();
                if wallet.reject_transactions {
                    return Err(ProviderRpcError::new(
                        USER_REJECTED_CODE,
                        "MetaMask Tx Signature: User denied transaction signature.",
                    ));
                }
                let from = tx.from.unwrap_or(Address::ZERO);
                if !wallet.authorized || !wallet.accounts.contains(&from) {
                    return Err(ProviderRpcError::new(4100, "Unauthorized account"));
                }
                if let Some(reason) = &wallet.send_revert {
                    return Err(revert(reason));
                }
                wallet.block += 1;
                (wallet.block, from)
            };

            let (function, args) = self.decode(&tx)?;
            let tx_hash = keccak256(format!("tx-{}", block));
            let value = tx.value.unwrap_or_default();
            let (success, logs) = match self.execute(&function.name, &args, from, value, block, tx_hash) {
                Ok(logs) => (true, logs),
                Err(_) => (false, Vec::new()),
            };

            self.wallet.lock().unwrap().receipts.insert(
                tx_hash,
                ReceiptSummary {
                    tx_hash,
                    block_number: Some(block),
                    success,
                    logs,
                },
            );
            Ok(tx_hash)
        })();
        future::ready(result).boxed()
    }

    fn get_transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> BoxFuture<'_, ProviderResult<Option<ReceiptSummary>>> {
        self.record_call();
        let receipt = self.wallet.lock().unwrap().receipts.get(&tx_hash).cloned();
        future::ready(Ok(receipt)).boxed()
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

/// A session over the fake wallet with a throwaway disconnect flag.
pub fn session(fake: &Arc<FakeCharity>) -> Arc<ChainSession> {
    let provider: Arc<dyn WalletProvider> = fake.clone();
    Arc::new(ChainSession::new(
        Some(provider),
        network(),
        DisconnectFlag::ephemeral(),
    ))
}

/// A gateway reading from the fake contract.
pub fn gateway(fake: &Arc<FakeCharity>) -> ContractGateway {
    gateway_with(fake, contract_config())
}

pub fn gateway_with(fake: &Arc<FakeCharity>, config: ContractConfig) -> ContractGateway {
    let reader: Arc<dyn WalletProvider> = fake.clone();
    ContractGateway::new(&config, ContractAbi::fallback(), reader).expect("gateway")
}

/// Connect a session and bind the gateway's signer to it.
pub async fn connected(fake: &Arc<FakeCharity>) -> (Arc<ChainSession>, ContractGateway) {
    let session = session(fake);
    session.connect().await.expect("connect");
    let gateway = gateway(fake);
    gateway.bind_signer(session.handle().expect("handle"));
    (session, gateway)
}
