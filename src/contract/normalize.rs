//! Decoded contract values → records.
//!
//! Every read result passes through here. A getter that returns a struct may
//! decode either as a flat list of outputs or as a single tuple; both shapes
//! are accepted.

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, B256, U256};

use crate::contract::records::{Campaign, Comment, Disbursement, Donation};
use crate::error::{CharityError, CharityResult};

fn malformed(record: &str, detail: impl std::fmt::Display) -> CharityError {
    CharityError::provider(format!("Malformed {} data: {}", record, detail))
}

/// Unwrap a lone tuple into its fields.
pub fn flatten(values: Vec<DynSolValue>) -> Vec<DynSolValue> {
    match <[DynSolValue; 1]>::try_from(values) {
        Ok([DynSolValue::Tuple(fields)]) => fields,
        Ok([single]) => vec![single],
        Err(values) => values,
    }
}

fn field<'a>(
    values: &'a [DynSolValue],
    index: usize,
    record: &str,
) -> CharityResult<&'a DynSolValue> {
    values
        .get(index)
        .ok_or_else(|| malformed(record, format!("missing field {}", index)))
}

pub fn to_u256(value: &DynSolValue, record: &str) -> CharityResult<U256> {
    match value {
        DynSolValue::Uint(v, _) => Ok(*v),
        other => Err(malformed(record, format!("expected uint, got {:?}", other))),
    }
}

/// Unix timestamps, block numbers, ids and counts.
pub fn to_u64(value: &DynSolValue, record: &str) -> CharityResult<u64> {
    let v = to_u256(value, record)?;
    u64::try_from(v).map_err(|_| malformed(record, format!("{} does not fit in u64", v)))
}

pub fn to_address(value: &DynSolValue, record: &str) -> CharityResult<Address> {
    match value {
        DynSolValue::Address(a) => Ok(*a),
        other => Err(malformed(record, format!("expected address, got {:?}", other))),
    }
}

pub fn to_string(value: &DynSolValue, record: &str) -> CharityResult<String> {
    match value {
        DynSolValue::String(s) => Ok(s.clone()),
        other => Err(malformed(record, format!("expected string, got {:?}", other))),
    }
}

pub fn to_bool(value: &DynSolValue, record: &str) -> CharityResult<bool> {
    match value {
        DynSolValue::Bool(b) => Ok(*b),
        other => Err(malformed(record, format!("expected bool, got {:?}", other))),
    }
}

/// A transaction hash stored as `bytes32`, `bytes` or a hex string.
///
/// Zero and unparseable hashes read as `None`.
pub fn to_tx_hash(value: &DynSolValue) -> Option<B256> {
    let hash = match value {
        DynSolValue::FixedBytes(word, 32) => *word,
        DynSolValue::Bytes(bytes) if bytes.len() == 32 => B256::from_slice(bytes),
        DynSolValue::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    (!hash.is_zero()).then_some(hash)
}

/// Single scalar result, e.g. `nextCampaignId()`.
pub fn scalar_u64(values: Vec<DynSolValue>, record: &str) -> CharityResult<u64> {
    let values = flatten(values);
    to_u64(field(&values, 0, record)?, record)
}

pub fn scalar_bool(values: Vec<DynSolValue>, record: &str) -> CharityResult<bool> {
    let values = flatten(values);
    to_bool(field(&values, 0, record)?, record)
}

pub fn address_list(values: Vec<DynSolValue>, record: &str) -> CharityResult<Vec<Address>> {
    let values = flatten(values);
    match field(&values, 0, record)? {
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) => items
            .iter()
            .map(|item| to_address(item, record))
            .collect(),
        other => Err(malformed(record, format!("expected address[], got {:?}", other))),
    }
}

/// `campaigns(id)`. A zero id marks an empty slot and reads as `None`.
pub fn campaign(values: Vec<DynSolValue>) -> CharityResult<Option<Campaign>> {
    const R: &str = "campaign";
    let v = flatten(values);
    let id = to_u64(field(&v, 0, R)?, R)?;
    if id == 0 {
        return Ok(None);
    }
    Ok(Some(Campaign {
        id,
        creator: to_address(field(&v, 1, R)?, R)?,
        title: to_string(field(&v, 2, R)?, R)?,
        description: to_string(field(&v, 3, R)?, R)?,
        media: to_string(field(&v, 4, R)?, R)?,
        location: to_string(field(&v, 5, R)?, R)?,
        target_amount: to_u256(field(&v, 6, R)?, R)?,
        campaign_wallet: to_address(field(&v, 7, R)?, R)?,
        collected: to_u256(field(&v, 8, R)?, R)?,
        total_disbursed: to_u256(field(&v, 9, R)?, R)?,
        created_at: to_u64(field(&v, 10, R)?, R)?,
        end_date: to_u64(field(&v, 11, R)?, R)?,
        updated_at: to_u64(field(&v, 12, R)?, R)?,
        beneficiary: to_string(field(&v, 13, R)?, R)?,
        active: to_bool(field(&v, 14, R)?, R)?,
    }))
}

/// `getDonation(id, index)`.
pub fn donation(values: Vec<DynSolValue>) -> CharityResult<Donation> {
    const R: &str = "donation";
    let v = flatten(values);
    Ok(Donation {
        donor: to_address(field(&v, 0, R)?, R)?,
        amount: to_u256(field(&v, 1, R)?, R)?,
        timestamp: to_u64(field(&v, 2, R)?, R)?,
        block_number: to_u64(field(&v, 3, R)?, R)?,
        tx_hash: v.get(4).and_then(to_tx_hash),
    })
}

/// `getDisbursement(id, index)`.
pub fn disbursement(values: Vec<DynSolValue>) -> CharityResult<Disbursement> {
    const R: &str = "disbursement";
    let v = flatten(values);
    Ok(Disbursement {
        recipient: to_address(field(&v, 0, R)?, R)?,
        amount: to_u256(field(&v, 1, R)?, R)?,
        timestamp: to_u64(field(&v, 2, R)?, R)?,
        block_number: to_u64(field(&v, 3, R)?, R)?,
        tx_hash: v.get(4).and_then(to_tx_hash),
        proof_image: to_string(field(&v, 5, R)?, R)?,
        note: to_string(field(&v, 6, R)?, R)?,
    })
}

/// `getComment(id, index)`.
pub fn comment(values: Vec<DynSolValue>) -> CharityResult<Comment> {
    const R: &str = "comment";
    let v = flatten(values);
    Ok(Comment {
        commenter: to_address(field(&v, 0, R)?, R)?,
        text: to_string(field(&v, 1, R)?, R)?,
        timestamp: to_u64(field(&v, 2, R)?, R)?,
        is_anonymous: to_bool(field(&v, 3, R)?, R)?,
    })
}
