// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Receipt metadata
//!
//! A retailer describes a purchase with a small JSON document (amount,
//! category, items, date). The document travels on chain as a metadata
//! payload: the `0x`-prefixed hex encoding of its UTF-8 JSON text, carried
//! either as raw transaction input data or as a `ReceiptVault` contract
//! argument.
//!
//! # Example
//! ```rust
//! use receipt_metadata::{ReceiptFields, ReceiptMetadata};
//!
//! let metadata = ReceiptMetadata {
//!     amount: Some("12.50".to_string()),
//!     category: Some("food".to_string()),
//!     items: Some("coffee".to_string()),
//!     ..Default::default()
//! };
//! let payload = metadata.encode_hex().unwrap();
//! assert!(payload.starts_with("0x"));
//!
//! let fields = ReceiptFields::from_payload(&payload);
//! assert_eq!(fields.category, "food");
//! assert_eq!(fields.amount, "12.50");
//! ```

use alloy::hex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Prefix every metadata payload starts with.
pub const HEX_PREFIX: &str = "0x";

/// Category shown when the payload has none or cannot be decoded.
pub const DEFAULT_CATEGORY: &str = "General";

/// Amount shown when the payload has none or cannot be decoded.
pub const DEFAULT_AMOUNT: &str = "N/A";

/// Errors returned while decoding a metadata payload
#[derive(thiserror::Error, Debug)]
pub enum MetadataError {
    #[error("metadata payload is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("metadata payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("metadata payload is not a JSON document: {0}")]
    Json(#[from] serde_json::Error),
}

/// The JSON document a retailer attaches to a receipt.
///
/// Every field is optional when decoding, since payloads found on chain
/// may have been produced by other tools. Fields with an unexpected JSON
/// type are read as absent instead of rejecting the whole document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptMetadata {
    /// Address of the issuing retailer
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub retailer: Option<String>,
    /// Purchase total, kept as the retailer typed it (e.g. `"12.50"`)
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub items: Option<String>,
    /// Calendar date of the purchase, `YYYY-MM-DD`
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<String>,
    /// Unix epoch timestamp in seconds
    #[serde(
        default,
        deserialize_with = "lenient_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<u64>,
}

impl ReceiptMetadata {
    /// Serializes the document to its UTF-8 JSON bytes.
    pub fn encode(&self) -> Result<Vec<u8>, MetadataError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Serializes the document and returns its `0x`-prefixed hex payload.
    pub fn encode_hex(&self) -> Result<String, MetadataError> {
        Ok(hex_payload(&self.encode()?))
    }

    /// Decodes a hex payload, with or without the `0x` prefix.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] if the payload is not hex, the bytes are
    /// not UTF-8, or the text is not a JSON object.
    pub fn decode_hex(payload: &str) -> Result<Self, MetadataError> {
        let digits = payload.strip_prefix(HEX_PREFIX).unwrap_or(payload);
        let bytes = hex::decode(digits)?;
        let json = String::from_utf8(bytes)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// The `0x`-prefixed hex payload of already encoded document bytes.
pub fn hex_payload(bytes: &[u8]) -> String {
    format!("{HEX_PREFIX}{}", hex::encode(bytes))
}

/// The display fields of a receipt, with defaults already substituted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptFields {
    pub category: String,
    pub amount: String,
    pub items: String,
}

impl Default for ReceiptFields {
    fn default() -> Self {
        Self {
            category: DEFAULT_CATEGORY.to_string(),
            amount: DEFAULT_AMOUNT.to_string(),
            items: String::new(),
        }
    }
}

impl ReceiptFields {
    /// Builds the display fields of a decoded document. Missing or empty
    /// values fall back to the defaults.
    pub fn from_metadata(metadata: &ReceiptMetadata) -> Self {
        let defaults = Self::default();
        Self {
            category: non_empty(metadata.category.as_deref()).unwrap_or(defaults.category),
            amount: non_empty(metadata.amount.as_deref()).unwrap_or(defaults.amount),
            items: non_empty(metadata.items.as_deref()).unwrap_or(defaults.items),
        }
    }

    /// Decodes the display fields of a payload, reporting decode errors.
    pub fn try_from_payload(payload: &str) -> Result<Self, MetadataError> {
        ReceiptMetadata::decode_hex(payload).map(|metadata| Self::from_metadata(&metadata))
    }

    /// Decodes the display fields of a payload.
    ///
    /// This never fails: payloads without the `0x` prefix, or that cannot be
    /// decoded, yield the default fields.
    pub fn from_payload(payload: &str) -> Self {
        if !payload.starts_with(HEX_PREFIX) {
            return Self::default();
        }
        Self::try_from_payload(payload).unwrap_or_default()
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}
