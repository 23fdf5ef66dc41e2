// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

use alloy::primitives::Address;
use chrono::{DateTime, NaiveDate, Utc};
use log::debug;
use receipt_metadata::{ReceiptFields, ReceiptMetadata, DEFAULT_AMOUNT, HEX_PREFIX};
use serde::{Deserialize, Serialize};

use super::{Origin, RawReceipt};
use crate::directory::RetailerDirectory;

/// Shown when the transaction identifier of a receipt is unknown.
pub const NO_TRANSACTION_HASH: &str = "0x0000";

/// Shown when a receipt carries no metadata payload.
pub const NO_METADATA: &str = "N/A";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A receipt as displayed to the customer.
///
/// Records are rebuilt from the raw sources on every reconciliation and
/// have no identity beyond their `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptRecord {
    /// Transaction identifier, or a synthesized stand-in when there is none
    pub id: String,
    pub retailer_address: Option<Address>,
    pub retailer_name: String,
    pub date: String,
    pub category: String,
    pub amount: String,
    pub items: String,
    pub transaction_hash: String,
    pub metadata_payload: String,
    pub is_verified: bool,
    pub origin: Origin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ReceiptRecord {
    /// Normalizes a raw receipt.
    ///
    /// `position` is the index of the receipt in the reconciled list and is
    /// only used to synthesize an id for receipts without a transaction
    /// hash. `now` dates receipts that carry neither a date nor a timestamp.
    pub fn from_raw(
        raw: RawReceipt,
        directory: &RetailerDirectory,
        position: usize,
        now: DateTime<Utc>,
    ) -> Self {
        let (fields, metadata_date) = match raw.fields {
            Some(fields) => (fields, None),
            None => decode_metadata(raw.metadata_hash.as_deref(), raw.id.as_deref()),
        };

        let date = raw
            .date
            .filter(|date| !date.trim().is_empty())
            .or(metadata_date)
            .unwrap_or_else(|| {
                raw.timestamp
                    .unwrap_or(now)
                    .date_naive()
                    .format(DATE_FORMAT)
                    .to_string()
            });

        let (id, transaction_hash) = if raw.tx_hash.is_empty() {
            (
                format!("{}-{position}", raw.origin),
                NO_TRANSACTION_HASH.to_string(),
            )
        } else {
            (raw.tx_hash.clone(), raw.tx_hash)
        };

        Self {
            id,
            retailer_address: raw.retailer,
            retailer_name: directory.name_of(raw.retailer).to_string(),
            date,
            category: fields.category,
            amount: fields.amount,
            items: fields.items,
            transaction_hash,
            metadata_payload: raw
                .metadata_hash
                .filter(|payload| !payload.is_empty())
                .unwrap_or_else(|| NO_METADATA.to_string()),
            is_verified: true,
            origin: raw.origin,
            timestamp: raw.timestamp,
        }
    }

    /// Parses `date`. Returns `None` when the date is in no known format.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        let date = self.date.trim();
        NaiveDate::parse_from_str(date, DATE_FORMAT)
            .or_else(|_| NaiveDate::parse_from_str(date, "%m/%d/%Y"))
            .ok()
            .or_else(|| {
                DateTime::parse_from_rfc3339(date)
                    .ok()
                    .map(|date| date.date_naive())
            })
    }

    /// The amount with a currency sign, as shown on the receipt card.
    pub fn display_amount(&self) -> String {
        if self.amount == DEFAULT_AMOUNT {
            self.amount.clone()
        } else {
            format!("${}", self.amount)
        }
    }
}

fn decode_metadata(payload: Option<&str>, id: Option<&str>) -> (ReceiptFields, Option<String>) {
    let Some(payload) = payload.filter(|payload| payload.starts_with(HEX_PREFIX)) else {
        return (ReceiptFields::default(), None);
    };
    match ReceiptMetadata::decode_hex(payload) {
        Ok(metadata) => (
            ReceiptFields::from_metadata(&metadata),
            metadata.date.filter(|date| !date.trim().is_empty()),
        ),
        Err(e) => {
            debug!("Could not parse metadata for receipt {id:?}: {e}");
            (ReceiptFields::default(), None)
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;
    use chrono::TimeZone;

    use super::*;

    fn contract_raw(metadata_hash: &str) -> RawReceipt {
        RawReceipt {
            tx_hash: "0x01".to_string(),
            id: Some("3".to_string()),
            retailer: Some(address!("70997970C51812dc3A010C7d01b50e0d17dc79C8")),
            buyer: None,
            fields: None,
            date: None,
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).single(),
            metadata_hash: Some(metadata_hash.to_string()),
            origin: Origin::Contract,
        }
    }

    #[test]
    fn contract_receipt_is_decoded_during_normalization() {
        let payload = ReceiptMetadata {
            amount: Some("12.50".to_string()),
            category: Some("food".to_string()),
            items: Some("coffee".to_string()),
            date: Some("2024-02-03".to_string()),
            ..Default::default()
        }
        .encode_hex()
        .unwrap();
        let record =
            ReceiptRecord::from_raw(contract_raw(&payload), &Default::default(), 0, Utc::now());
        assert_eq!(record.retailer_name, "City Diner");
        assert_eq!(record.category, "food");
        assert_eq!(record.amount, "12.50");
        assert_eq!(record.items, "coffee");
        assert_eq!(record.date, "2024-02-03");
        assert_eq!(record.metadata_payload, payload);
        assert!(record.is_verified);
    }

    #[test]
    fn undecodable_contract_receipt_uses_defaults_and_timestamp_date() {
        let record =
            ReceiptRecord::from_raw(contract_raw("0xnothex"), &Default::default(), 0, Utc::now());
        assert_eq!(record.category, "General");
        assert_eq!(record.amount, "N/A");
        assert_eq!(record.items, "");
        assert_eq!(record.date, "2023-11-14");
        assert_eq!(record.display_amount(), "N/A");
    }

    #[test]
    fn missing_hash_gets_unique_id_and_sentinels() {
        let mut raw = contract_raw("");
        raw.tx_hash.clear();
        raw.timestamp = None;
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let record = ReceiptRecord::from_raw(raw, &Default::default(), 4, now);
        assert_eq!(record.id, "contract-4");
        assert_eq!(record.transaction_hash, NO_TRANSACTION_HASH);
        assert_eq!(record.metadata_payload, NO_METADATA);
        assert_eq!(record.date, "2025-01-02");
    }

    #[test]
    fn dates_parse_in_known_formats() {
        let mut record =
            ReceiptRecord::from_raw(contract_raw(""), &Default::default(), 0, Utc::now());
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9);
        for date in ["2024-03-09", "03/09/2024", "2024-03-09T10:00:00Z"] {
            record.date = date.to_string();
            assert_eq!(record.parsed_date(), expected, "{date}");
        }
        record.date = "yesterday".to_string();
        assert_eq!(record.parsed_date(), None);
    }
}
