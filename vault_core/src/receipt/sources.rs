// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use alloy::primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Local records, keyed by the `0x`-prefixed transaction hash.
pub type LocalRecords = BTreeMap<String, LocalRecord>;

/// A receipt issued from this device, persisted after its transaction was mined.
///
/// The field names match the JSON blob the local store keeps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalRecord {
    pub tx_hash: B256,
    pub buyer_address: Address,
    /// The issuing account
    pub retailer: Address,
    pub amount: String,
    pub category: String,
    #[serde(default)]
    pub items: String,
    pub date: String,
    /// When the receipt was issued
    #[serde(rename = "timestamp")]
    pub issued_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_hash: Option<String>,
}

impl LocalRecord {
    /// Key of this record in [`LocalRecords`].
    pub fn key(&self) -> String {
        self.tx_hash.to_string()
    }
}

/// A transaction returned by the block-explorer history service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorerTransaction {
    pub hash: B256,
    pub from: Address,
    /// `None` for contract creations
    pub to: Option<Address>,
    /// Input data as returned by the service, `0x` when empty
    pub input: String,
    /// Block timestamp, unix seconds
    pub timestamp: u64,
    pub block_number: u64,
}

impl ExplorerTransaction {
    /// Whether the transaction carries input data and was sent to `account`.
    pub fn is_receipt_for(&self, account: Address) -> bool {
        let has_input = !self.input.is_empty() && self.input != "0x";
        has_input && self.to == Some(account)
    }
}

/// A receipt as stored by the `ReceiptVault` contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractReceipt {
    pub id: U256,
    pub retailer: Address,
    pub buyer: Address,
    pub metadata_hash: String,
    /// Block timestamp, unix seconds
    pub timestamp: u64,
    pub is_verified: bool,
    pub category: String,
    pub amount: U256,
}

impl ContractReceipt {
    pub fn involves(&self, account: Address) -> bool {
        self.buyer == account || self.retailer == account
    }
}
