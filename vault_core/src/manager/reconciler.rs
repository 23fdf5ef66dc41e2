// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::adapters::{ContractReader, LocalStore, TransactionHistory};
use crate::{
    directory::RetailerDirectory,
    receipt::{
        dedup_first_seen, fallback_transaction_hash, ContractReceipt, LocalRecords, RawReceipt,
        ReceiptRecord,
    },
    session::WalletSession,
    Error,
};

/// Largest gap, in seconds, between a contract receipt and the local record
/// it is matched with.
pub const CORRELATION_WINDOW_SECS: i64 = 300;

/// What a receipt source contributed to a reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum SourceOutcome {
    /// Receipts kept from this source, before deduplication
    Ok(usize),
    /// The source is not configured, or there is no connected account
    Unavailable,
    Error(String),
}

/// How every source fared during a reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReport {
    pub local: SourceOutcome,
    pub explorer: SourceOutcome,
    pub contract: SourceOutcome,
    /// History transactions sent to the account whose input was not a
    /// metadata payload
    pub undecodable_transactions: usize,
}

/// The merged receipt list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    pub records: Vec<ReceiptRecord>,
    pub sources: SourceReport,
}

pub struct Reconciler<E> {
    /// Context that implements adapters
    context: E,
    directory: RetailerDirectory,
    correlation_window_secs: i64,
}

impl<E> Reconciler<E> {
    pub fn new(context: E, directory: RetailerDirectory) -> Self {
        Self {
            context,
            directory,
            correlation_window_secs: CORRELATION_WINDOW_SECS,
        }
    }

    pub fn with_correlation_window(mut self, secs: i64) -> Self {
        self.correlation_window_secs = secs;
        self
    }

    pub fn context(&self) -> &E {
        &self.context
    }

    pub fn directory(&self) -> &RetailerDirectory {
        &self.directory
    }

    /// Transaction hash of the local record issued for the same buyer close
    /// to the contract receipt. The record closest in time wins, ties go to
    /// the smaller hash.
    fn correlate(&self, receipt: &ContractReceipt, local: &LocalRecords) -> Option<String> {
        let issued = i64::try_from(receipt.timestamp).ok()?;
        local
            .values()
            .filter(|record| record.buyer_address == receipt.buyer)
            .map(|record| ((record.issued_at.timestamp() - issued).abs(), record))
            .filter(|(distance, _)| *distance <= self.correlation_window_secs)
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, record)| record.key())
    }
}

impl<E> Reconciler<E>
where
    E: LocalStore + TransactionHistory + ContractReader + Sync,
{
    /// Builds the receipt list for `session`.
    ///
    /// See [`Reconciler::reconcile_at`].
    pub async fn reconcile(&self, session: &WalletSession) -> Result<Reconciliation, Error> {
        self.reconcile_at(session, Utc::now()).await
    }

    /// Builds the receipt list for `session`, dating undated receipts `now`.
    ///
    /// Local records come first, then the history service, then the
    /// contract. The two remote sources are queried concurrently and only
    /// when the session has an active account. A failing remote source is
    /// reported in the result and contributes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AdapterError`] if the local store cannot be read.
    pub async fn reconcile_at(
        &self,
        session: &WalletSession,
        now: DateTime<Utc>,
    ) -> Result<Reconciliation, Error> {
        let local = self.context.load().await.map_err(Error::adapter)?;

        let ((explorer_receipts, explorer, undecodable_transactions), (contract_receipts, contract)) =
            match session.active_account() {
                Some(account) => tokio::join!(
                    self.explorer_receipts(account),
                    self.contract_receipts(account, &local)
                ),
                None => (
                    (Vec::new(), SourceOutcome::Unavailable, 0),
                    (Vec::new(), SourceOutcome::Unavailable),
                ),
            };

        let merged: Vec<RawReceipt> = local
            .values()
            .map(RawReceipt::from)
            .chain(explorer_receipts)
            .chain(contract_receipts)
            .collect();
        let unique = dedup_first_seen(merged);
        debug!(
            "Reconciled {} unique receipts from {} local records",
            unique.len(),
            local.len()
        );

        let records = unique
            .into_iter()
            .enumerate()
            .map(|(position, raw)| ReceiptRecord::from_raw(raw, &self.directory, position, now))
            .collect();

        Ok(Reconciliation {
            records,
            sources: SourceReport {
                local: SourceOutcome::Ok(local.len()),
                explorer,
                contract,
                undecodable_transactions,
            },
        })
    }

    /// Number of receipts stored by the contract, `None` when it is not
    /// deployed.
    pub async fn contract_receipt_count(&self) -> Result<Option<u64>, Error> {
        self.context.total_count().await.map_err(Error::adapter)
    }

    async fn explorer_receipts(&self, account: Address) -> (Vec<RawReceipt>, SourceOutcome, usize) {
        let transactions = match self.context.transactions_for(account).await {
            Ok(Some(transactions)) => transactions,
            Ok(None) => return (Vec::new(), SourceOutcome::Unavailable, 0),
            Err(e) => {
                warn!("Failed to fetch transaction history for {account}: {e}");
                return (Vec::new(), SourceOutcome::Error(e.to_string()), 0);
            }
        };

        let mut undecodable = 0;
        let receipts: Vec<_> = transactions
            .iter()
            .filter(|tx| tx.is_receipt_for(account))
            .filter_map(|tx| match RawReceipt::from_explorer(tx) {
                Ok(receipt) => Some(receipt),
                Err(e) => {
                    debug!("Skipping transaction {}: {e}", tx.hash);
                    undecodable += 1;
                    None
                }
            })
            .collect();
        let outcome = SourceOutcome::Ok(receipts.len());
        (receipts, outcome, undecodable)
    }

    async fn contract_receipts(
        &self,
        account: Address,
        local: &LocalRecords,
    ) -> (Vec<RawReceipt>, SourceOutcome) {
        let receipts = match self.context.receipts().await {
            Ok(Some(receipts)) => receipts,
            Ok(None) => return (Vec::new(), SourceOutcome::Unavailable),
            Err(e) => {
                warn!("Failed to read contract receipts: {e}");
                return (Vec::new(), SourceOutcome::Error(e.to_string()));
            }
        };

        let receipts: Vec<_> = receipts
            .iter()
            .filter(|receipt| receipt.involves(account))
            .map(|receipt| {
                let tx_hash = self.correlate(receipt, local).unwrap_or_else(|| {
                    fallback_transaction_hash(receipt.id, receipt.buyer, receipt.timestamp)
                });
                RawReceipt::from_contract(receipt, tx_hash)
            })
            .collect();
        let outcome = SourceOutcome::Ok(receipts.len());
        (receipts, outcome)
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{address, B256, U256};
    use chrono::{Duration, TimeZone};
    use rstest::*;

    use super::*;
    use crate::receipt::LocalRecord;

    const RETAILER: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");
    const BUYER: Address = address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");

    fn mined_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 20, 10, 0, 0).unwrap()
    }

    fn local(byte: u8, issued_at: DateTime<Utc>) -> LocalRecord {
        LocalRecord {
            tx_hash: B256::repeat_byte(byte),
            buyer_address: BUYER,
            retailer: RETAILER,
            amount: "5.00".to_string(),
            category: "general".to_string(),
            items: String::new(),
            date: "2024-05-20".to_string(),
            issued_at,
            metadata_hash: None,
        }
    }

    fn contract_receipt() -> ContractReceipt {
        ContractReceipt {
            id: U256::ZERO,
            retailer: RETAILER,
            buyer: BUYER,
            metadata_hash: "0x7b7d".to_string(),
            timestamp: mined_at().timestamp() as u64,
            is_verified: true,
            category: "general".to_string(),
            amount: U256::from(5),
        }
    }

    fn records(records: impl IntoIterator<Item = LocalRecord>) -> LocalRecords {
        records
            .into_iter()
            .map(|record| (record.key(), record))
            .collect()
    }

    #[rstest]
    // the larger hash is further away
    #[case::closest_smaller_hash(
        vec![local(0x01, mined_at() - Duration::seconds(20)), local(0xee, mined_at() - Duration::seconds(200))],
        Some(0x01)
    )]
    // the larger hash is closer
    #[case::closest_larger_hash(
        vec![local(0x01, mined_at() - Duration::seconds(200)), local(0xee, mined_at() + Duration::seconds(20))],
        Some(0xee)
    )]
    #[case::tie_takes_smaller_hash(
        vec![local(0xee, mined_at() - Duration::seconds(30)), local(0x01, mined_at() + Duration::seconds(30))],
        Some(0x01)
    )]
    #[case::outside_window(vec![local(0x01, mined_at() - Duration::seconds(301))], None)]
    fn contract_receipt_matches_closest_local_record(
        #[case] local_records: Vec<LocalRecord>,
        #[case] expected: Option<u8>,
    ) {
        let reconciler = Reconciler::new((), RetailerDirectory::default());

        let matched = reconciler.correlate(&contract_receipt(), &records(local_records));

        assert_eq!(
            matched,
            expected.map(|byte| B256::repeat_byte(byte).to_string())
        );
    }

    #[test]
    fn other_buyers_are_not_matched() {
        let reconciler = Reconciler::new((), RetailerDirectory::default());
        let mut record = local(0x01, mined_at());
        record.buyer_address = RETAILER;

        assert_eq!(
            reconciler.correlate(&contract_receipt(), &records([record])),
            None
        );
    }
}
