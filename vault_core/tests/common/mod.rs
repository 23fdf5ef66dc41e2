// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

#![allow(dead_code)]

use alloy::primitives::{address, Address, B256, U256};
use chrono::{DateTime, Utc};
use vault_core::{
    receipt::{ContractReceipt, ExplorerTransaction, LocalRecord},
    receipt_metadata::ReceiptMetadata,
};

pub const CITY_DINER: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");
pub const ELECTRONIC_DEPOT: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
pub const FASHION_OUTLET: Address = address!("3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");
pub const CUSTOMER: Address = address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");
pub const STRANGER: Address = address!("cccccccccccccccccccccccccccccccccccccccc");

pub fn secs(at: DateTime<Utc>) -> u64 {
    at.timestamp() as u64
}

pub fn local_record(byte: u8, retailer: Address, issued_at: DateTime<Utc>) -> LocalRecord {
    LocalRecord {
        tx_hash: B256::repeat_byte(byte),
        buyer_address: CUSTOMER,
        retailer,
        amount: "5.00".to_string(),
        category: "general".to_string(),
        items: String::new(),
        date: issued_at.date_naive().format("%Y-%m-%d").to_string(),
        issued_at,
        metadata_hash: None,
    }
}

pub fn metadata(category: &str, amount: &str, items: &str) -> ReceiptMetadata {
    ReceiptMetadata {
        category: Some(category.to_string()),
        amount: Some(amount.to_string()),
        items: Some(items.to_string()),
        ..Default::default()
    }
}

pub fn explorer_tx(
    byte: u8,
    from: Address,
    to: Address,
    input: String,
    at: DateTime<Utc>,
) -> ExplorerTransaction {
    ExplorerTransaction {
        hash: B256::repeat_byte(byte),
        from,
        to: Some(to),
        input,
        timestamp: secs(at),
        block_number: u64::from(byte),
    }
}

pub fn contract_receipt(
    id: u64,
    retailer: Address,
    metadata_hash: String,
    at: DateTime<Utc>,
) -> ContractReceipt {
    ContractReceipt {
        id: U256::from(id),
        retailer,
        buyer: CUSTOMER,
        metadata_hash,
        timestamp: secs(at),
        is_verified: true,
        category: "general".to_string(),
        amount: U256::from(5),
    }
}
