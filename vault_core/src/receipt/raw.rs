// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashSet;

use alloy::{
    hex,
    primitives::{Address, U256},
};
use chrono::{DateTime, Utc};
use receipt_metadata::{MetadataError, ReceiptFields, ReceiptMetadata};
use serde::{Deserialize, Serialize};

use super::{ContractReceipt, ExplorerTransaction, LocalRecord};

/// Length of a `0x`-prefixed 32 byte hash.
const TX_HASH_LEN: usize = 66;

/// Where a receipt was found, in decreasing order of trust.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Origin {
    Local,
    Explorer,
    Contract,
}

/// A receipt lowered from one of the sources, not yet normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReceipt {
    /// Transaction identifier, used as the deduplication key
    pub tx_hash: String,
    /// Source specific identifier (the contract receipt id)
    pub id: Option<String>,
    pub retailer: Option<Address>,
    pub buyer: Option<Address>,
    /// Display fields, when the source already decoded them
    pub fields: Option<ReceiptFields>,
    pub date: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub metadata_hash: Option<String>,
    pub origin: Origin,
}

impl From<&LocalRecord> for RawReceipt {
    fn from(record: &LocalRecord) -> Self {
        Self {
            tx_hash: record.tx_hash.to_string(),
            id: None,
            retailer: Some(record.retailer),
            buyer: Some(record.buyer_address),
            fields: Some(ReceiptFields::from_metadata(&ReceiptMetadata {
                amount: Some(record.amount.clone()),
                category: Some(record.category.clone()),
                items: Some(record.items.clone()),
                ..Default::default()
            })),
            date: Some(record.date.clone()),
            timestamp: Some(record.issued_at),
            metadata_hash: record.metadata_hash.clone(),
            origin: Origin::Local,
        }
    }
}

impl RawReceipt {
    /// Decodes the input data of an explorer transaction.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] if the input is not a metadata payload.
    pub fn from_explorer(tx: &ExplorerTransaction) -> Result<Self, MetadataError> {
        let metadata = ReceiptMetadata::decode_hex(&tx.input)?;
        Ok(Self {
            tx_hash: tx.hash.to_string(),
            id: None,
            retailer: Some(tx.from),
            buyer: tx.to,
            fields: Some(ReceiptFields::from_metadata(&metadata)),
            date: metadata.date.filter(|date| !date.trim().is_empty()),
            timestamp: timestamp_from_secs(tx.timestamp),
            metadata_hash: Some(tx.input.clone()),
            origin: Origin::Explorer,
        })
    }

    /// Lowers a contract receipt. Its metadata is decoded later, during
    /// normalization.
    pub fn from_contract(receipt: &ContractReceipt, tx_hash: String) -> Self {
        Self {
            tx_hash,
            id: Some(receipt.id.to_string()),
            retailer: Some(receipt.retailer),
            buyer: Some(receipt.buyer),
            fields: None,
            date: None,
            timestamp: timestamp_from_secs(receipt.timestamp),
            metadata_hash: Some(receipt.metadata_hash.clone()),
            origin: Origin::Contract,
        }
    }
}

pub(crate) fn timestamp_from_secs(secs: u64) -> Option<DateTime<Utc>> {
    i64::try_from(secs)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// Stand-in transaction identifier for a contract receipt that has no
/// matching local record.
///
/// This is the hex encoding of `id ‖ buyer ‖ timestamp`, right-padded with
/// zeros to the length of a transaction hash. It is stable across calls but
/// is NOT a hash: it must not be used where collision resistance matters.
pub fn fallback_transaction_hash(id: U256, buyer: Address, timestamp: u64) -> String {
    let seed = format!("{id}{buyer}{timestamp}");
    let mut tx_hash = format!("0x{}", hex::encode(seed.as_bytes()));
    while tx_hash.len() < TX_HASH_LEN {
        tx_hash.push('0');
    }
    tx_hash
}

/// Keeps the first receipt seen for every transaction hash.
///
/// Receipts without a transaction hash cannot collide and are always kept.
pub fn dedup_first_seen(receipts: Vec<RawReceipt>) -> Vec<RawReceipt> {
    let mut seen = HashSet::new();
    receipts
        .into_iter()
        .filter(|receipt| receipt.tx_hash.is_empty() || seen.insert(receipt.tx_hash.clone()))
        .collect()
}
