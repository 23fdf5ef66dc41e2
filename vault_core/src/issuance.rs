// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Receipt issuance.
//!
//! A retailer issues a receipt by submitting its metadata payload, either
//! as the input data of a zero-value transaction sent to the buyer or as a
//! `ReceiptVault.issueReceipt` call. Once mined, the receipt is recorded in
//! the local store and a [`ReceiptIssued`] event is broadcast.

use alloy::primitives::{Address, Bytes, B256, U256};
use chrono::{DateTime, Utc};
use log::{info, warn};
use receipt_metadata::{hex_payload, ReceiptMetadata};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};

use crate::{
    manager::adapters::{LocalStore, ReceiptSender},
    network::SEPOLIA_CHAIN_ID,
    receipt::LocalRecord,
    session::WalletSession,
    Error,
};

/// Amount written into the metadata when the retailer left it empty.
pub const DEFAULT_ISSUE_AMOUNT: &str = "0.00";

/// Category written into the metadata when the retailer left it empty.
pub const DEFAULT_ISSUE_CATEGORY: &str = "general";

const EVENT_CAPACITY: usize = 64;

/// What the retailer typed in the issue form. Empty strings count as absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRequest {
    pub buyer: Address,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub items: Option<String>,
    /// `YYYY-MM-DD`, today when absent
    #[serde(default)]
    pub date: Option<String>,
}

impl IssueRequest {
    pub fn new(buyer: Address) -> Self {
        Self {
            buyer,
            amount: None,
            category: None,
            items: None,
            date: None,
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SubmissionMode {
    /// Metadata as input data of a transaction sent to the buyer
    #[default]
    RawTransaction,
    /// `ReceiptVault.issueReceipt`
    ContractCall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitterConfig {
    /// Network raw transactions must be sent on
    pub target_chain_id: u64,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            target_chain_id: SEPOLIA_CHAIN_ID,
        }
    }
}

/// Broadcast after a receipt was mined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptIssued {
    pub tx_hash: B256,
    pub buyer: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedReceipt {
    pub tx_hash: B256,
    pub metadata_hash: String,
    /// Whether the local store accepted the record
    pub recorded_locally: bool,
}

pub struct Submitter<E> {
    /// Context that implements adapters
    context: E,
    config: SubmitterConfig,
    events: broadcast::Sender<ReceiptIssued>,
    /// Serializes the load, insert and save of local records
    store_lock: Mutex<()>,
}

impl<E> Submitter<E> {
    pub fn new(context: E, config: SubmitterConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            context,
            config,
            events,
            store_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &SubmitterConfig {
        &self.config
    }

    pub fn context(&self) -> &E {
        &self.context
    }

    /// Receives a [`ReceiptIssued`] for every receipt issued afterwards.
    pub fn subscribe(&self) -> broadcast::Receiver<ReceiptIssued> {
        self.events.subscribe()
    }
}

impl<E> Submitter<E>
where
    E: ReceiptSender + LocalStore + Sync,
{
    /// Issues a receipt from the session's account.
    ///
    /// See [`Submitter::issue_at`].
    pub async fn issue(
        &self,
        session: &WalletSession,
        request: IssueRequest,
        mode: SubmissionMode,
    ) -> Result<IssuedReceipt, Error> {
        self.issue_at(session, request, mode, Utc::now()).await
    }

    /// Issues a receipt from the session's account, dated `now` unless the
    /// request carries a date.
    ///
    /// A receipt that was mined but could not be recorded locally is still
    /// issued; `recorded_locally` is `false` in that case.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] without an active account,
    /// [`Error::InvalidBuyer`] for the zero address,
    /// [`Error::WrongNetwork`] when a raw transaction would be sent on
    /// another network than the configured one and [`Error::AdapterError`]
    /// if the submission fails.
    pub async fn issue_at(
        &self,
        session: &WalletSession,
        request: IssueRequest,
        mode: SubmissionMode,
        now: DateTime<Utc>,
    ) -> Result<IssuedReceipt, Error> {
        let retailer = session.active_account().ok_or(Error::NotConnected)?;
        if request.buyer.is_zero() {
            return Err(Error::InvalidBuyer {
                buyer: request.buyer,
            });
        }
        if mode == SubmissionMode::RawTransaction {
            let actual = session.chain_id.unwrap_or_default();
            if actual != self.config.target_chain_id {
                return Err(Error::WrongNetwork {
                    expected: self.config.target_chain_id,
                    actual,
                });
            }
        }

        let non_empty = |value: Option<String>| value.filter(|value| !value.trim().is_empty());
        let amount = non_empty(request.amount).unwrap_or_else(|| DEFAULT_ISSUE_AMOUNT.to_string());
        let category =
            non_empty(request.category).unwrap_or_else(|| DEFAULT_ISSUE_CATEGORY.to_string());
        let items = request.items.unwrap_or_default();
        let date = non_empty(request.date)
            .unwrap_or_else(|| now.date_naive().format("%Y-%m-%d").to_string());

        let metadata = ReceiptMetadata {
            retailer: Some(retailer.to_string()),
            amount: Some(amount.clone()),
            category: Some(category.clone()),
            items: Some(items.clone()),
            date: Some(date.clone()),
            timestamp: u64::try_from(now.timestamp()).ok(),
        };
        let payload = metadata.encode()?;
        let metadata_hash = hex_payload(&payload);

        let tx_hash = match mode {
            SubmissionMode::RawTransaction => {
                self.context
                    .send_raw(request.buyer, Bytes::from(payload))
                    .await
            }
            SubmissionMode::ContractCall => {
                self.context
                    .call_issue_receipt(
                        request.buyer,
                        metadata_hash.clone(),
                        category.clone(),
                        rounded_amount(&amount),
                    )
                    .await
            }
        }
        .map_err(Error::adapter)?;
        info!("Receipt for {} mined in transaction {tx_hash}", request.buyer);

        let record = LocalRecord {
            tx_hash,
            buyer_address: request.buyer,
            retailer,
            amount,
            category,
            items,
            date,
            issued_at: now,
            metadata_hash: Some(metadata_hash.clone()),
        };
        let recorded_locally = match self.record_locally(record).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Receipt {tx_hash} was issued but could not be recorded locally: {e}");
                false
            }
        };

        // Nobody listening is fine
        let _ = self.events.send(ReceiptIssued {
            tx_hash,
            buyer: request.buyer,
        });

        Ok(IssuedReceipt {
            tx_hash,
            metadata_hash,
            recorded_locally,
        })
    }

    async fn record_locally(&self, record: LocalRecord) -> Result<(), Error> {
        let _guard = self.store_lock.lock().await;
        let mut records = self.context.load().await.map_err(Error::adapter)?;
        records.insert(record.key(), record);
        self.context.save(&records).await.map_err(Error::adapter)
    }
}

/// The amount in whole units, as the contract stores it. Amounts that are
/// not a non-negative number become zero.
pub fn rounded_amount(amount: &str) -> U256 {
    match amount.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => U256::from(value.round() as u128),
        _ => U256::ZERO,
    }
}
