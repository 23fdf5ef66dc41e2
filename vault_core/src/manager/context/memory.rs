// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! In-memory context implementation for the receipt vault.
//!
//! Every adapter is backed by shared storage, so a test can keep a clone of
//! the context to seed sources, inject failures and inspect what was sent
//! while the vault components own another clone.

use std::{
    collections::{HashSet, VecDeque},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, RwLock,
    },
    time::Duration,
};

use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::watch;

use crate::{
    manager::adapters::*,
    network::SEPOLIA_CHAIN_ID,
    receipt::{ContractReceipt, ExplorerTransaction, LocalRecord, LocalRecords},
};

pub type LocalStorage = Arc<RwLock<LocalRecords>>;
pub type HistoryStorage = Arc<RwLock<Option<Vec<ExplorerTransaction>>>>;
pub type ContractStorage = Arc<RwLock<Option<Vec<ContractReceipt>>>>;

#[derive(Debug, Error)]
pub enum InMemoryError {
    #[error("something went wrong: {error}")]
    AdapterError { error: String },
}

/// An adapter of the in-memory context that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    LocalStore,
    History,
    Contract,
    Wallet,
    Sender,
}

/// A transaction submitted through [`ReceiptSender`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentTransaction {
    Raw {
        tx_hash: B256,
        to: Address,
        data: Bytes,
    },
    IssueReceipt {
        tx_hash: B256,
        buyer: Address,
        metadata_hash: String,
        category: String,
        amount: U256,
    },
}

impl SentTransaction {
    pub fn tx_hash(&self) -> B256 {
        match self {
            SentTransaction::Raw { tx_hash, .. } | SentTransaction::IssueReceipt { tx_hash, .. } => {
                *tx_hash
            }
        }
    }
}

#[derive(Clone)]
pub struct InMemoryContext {
    local_storage: LocalStorage,
    /// `None` models an unconfigured history service
    history_storage: HistoryStorage,
    /// `None` models a network without a contract deployment
    contract_storage: ContractStorage,
    failing: Arc<RwLock<HashSet<Component>>>,
    load_delays: Arc<Mutex<VecDeque<Duration>>>,
    accounts: Arc<watch::Sender<Vec<Address>>>,
    chain_id: Arc<AtomicU64>,
    sent: Arc<RwLock<Vec<SentTransaction>>>,
}

impl Default for InMemoryContext {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryContext {
    /// Creates a context with empty sources, no account and the wallet on
    /// Sepolia.
    pub fn new() -> Self {
        let (accounts, _) = watch::channel(Vec::new());
        InMemoryContext {
            local_storage: Default::default(),
            history_storage: Arc::new(RwLock::new(Some(Vec::new()))),
            contract_storage: Arc::new(RwLock::new(Some(Vec::new()))),
            failing: Default::default(),
            load_delays: Default::default(),
            accounts: Arc::new(accounts),
            chain_id: Arc::new(AtomicU64::new(SEPOLIA_CHAIN_ID)),
            sent: Default::default(),
        }
    }

    pub fn with_accounts(self, accounts: Vec<Address>) -> Self {
        self.set_accounts(accounts);
        self
    }

    pub fn with_chain_id(self, chain_id: u64) -> Self {
        self.chain_id.store(chain_id, Ordering::SeqCst);
        self
    }

    /// Replaces the granted accounts and notifies subscribers.
    pub fn set_accounts(&self, accounts: Vec<Address>) {
        self.accounts.send_replace(accounts);
    }

    pub fn local_records(&self) -> LocalRecords {
        self.local_storage.read().unwrap().clone()
    }

    pub fn set_local_records(&self, records: LocalRecords) {
        *self.local_storage.write().unwrap() = records;
    }

    pub fn insert_local_record(&self, record: LocalRecord) {
        self.local_storage
            .write()
            .unwrap()
            .insert(record.key(), record);
    }

    pub fn set_history(&self, transactions: Option<Vec<ExplorerTransaction>>) {
        *self.history_storage.write().unwrap() = transactions;
    }

    pub fn set_contract_receipts(&self, receipts: Option<Vec<ContractReceipt>>) {
        *self.contract_storage.write().unwrap() = receipts;
    }

    pub fn sent_transactions(&self) -> Vec<SentTransaction> {
        self.sent.read().unwrap().clone()
    }

    /// Makes the next call to [`LocalStore::load`] wait `delay` after it
    /// read the records. Delays queue up, one per call.
    pub fn delay_next_load(&self, delay: Duration) {
        self.load_delays.lock().unwrap().push_back(delay);
    }

    pub fn fail(&self, component: Component) {
        self.failing.write().unwrap().insert(component);
    }

    pub fn recover(&self, component: Component) {
        self.failing.write().unwrap().remove(&component);
    }

    fn check(&self, component: Component) -> Result<(), InMemoryError> {
        if self.failing.read().unwrap().contains(&component) {
            return Err(InMemoryError::AdapterError {
                error: format!("{component:?} is unavailable"),
            });
        }
        Ok(())
    }

    fn now_secs() -> u64 {
        u64::try_from(Utc::now().timestamp()).unwrap_or_default()
    }

    /// Deterministic, unique hash for the next sent transaction.
    fn next_tx_hash(&self, payload: &[u8]) -> B256 {
        let nonce = self.sent.read().unwrap().len();
        keccak256([nonce.to_be_bytes().as_slice(), payload].concat())
    }

    fn sender_account(&self) -> Address {
        self.accounts
            .borrow()
            .first()
            .copied()
            .unwrap_or(Address::ZERO)
    }
}

#[async_trait]
impl WalletProvider for InMemoryContext {
    type AdapterError = InMemoryError;

    async fn request_accounts(&self) -> Result<Vec<Address>, Self::AdapterError> {
        self.check(Component::Wallet)?;
        Ok(self.accounts.borrow().clone())
    }

    async fn accounts(&self) -> Result<Vec<Address>, Self::AdapterError> {
        self.check(Component::Wallet)?;
        Ok(self.accounts.borrow().clone())
    }

    async fn chain_id(&self) -> Result<u64, Self::AdapterError> {
        self.check(Component::Wallet)?;
        Ok(self.chain_id.load(Ordering::SeqCst))
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), Self::AdapterError> {
        self.check(Component::Wallet)?;
        self.chain_id.store(chain_id, Ordering::SeqCst);
        Ok(())
    }

    fn subscribe_accounts(&self) -> watch::Receiver<Vec<Address>> {
        self.accounts.subscribe()
    }
}

#[async_trait]
impl LocalStore for InMemoryContext {
    type AdapterError = InMemoryError;

    async fn load(&self) -> Result<LocalRecords, Self::AdapterError> {
        self.check(Component::LocalStore)?;
        let records = self.local_records();
        let delay = self.load_delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(records)
    }

    async fn save(&self, records: &LocalRecords) -> Result<(), Self::AdapterError> {
        self.check(Component::LocalStore)?;
        self.set_local_records(records.clone());
        Ok(())
    }
}

#[async_trait]
impl TransactionHistory for InMemoryContext {
    type AdapterError = InMemoryError;

    async fn transactions_for(
        &self,
        address: Address,
    ) -> Result<Option<Vec<ExplorerTransaction>>, Self::AdapterError> {
        self.check(Component::History)?;
        let history = self.history_storage.read().unwrap();
        Ok(history.as_ref().map(|transactions| {
            transactions
                .iter()
                .filter(|tx| tx.from == address || tx.to == Some(address))
                .cloned()
                .collect()
        }))
    }
}

#[async_trait]
impl ContractReader for InMemoryContext {
    type AdapterError = InMemoryError;

    async fn receipts(&self) -> Result<Option<Vec<ContractReceipt>>, Self::AdapterError> {
        self.check(Component::Contract)?;
        Ok(self.contract_storage.read().unwrap().clone())
    }

    async fn total_count(&self) -> Result<Option<u64>, Self::AdapterError> {
        self.check(Component::Contract)?;
        let receipts = self.contract_storage.read().unwrap();
        Ok(receipts.as_ref().map(|receipts| receipts.len() as u64))
    }
}

#[async_trait]
impl ReceiptSender for InMemoryContext {
    type AdapterError = InMemoryError;

    /// Records the transaction and, when a history service is configured,
    /// makes it visible there.
    async fn send_raw(&self, to: Address, data: Bytes) -> Result<B256, Self::AdapterError> {
        self.check(Component::Sender)?;
        let tx_hash = self.next_tx_hash(&data);
        let block_number = self.sent.read().unwrap().len() as u64 + 1;
        if let Some(history) = self.history_storage.write().unwrap().as_mut() {
            history.insert(
                0,
                ExplorerTransaction {
                    hash: tx_hash,
                    from: self.sender_account(),
                    to: Some(to),
                    input: data.to_string(),
                    timestamp: Self::now_secs(),
                    block_number,
                },
            );
        }
        self.sent
            .write()
            .unwrap()
            .push(SentTransaction::Raw { tx_hash, to, data });
        Ok(tx_hash)
    }

    /// Records the call and, when the contract is deployed, stores the
    /// receipt in contract storage.
    async fn call_issue_receipt(
        &self,
        buyer: Address,
        metadata_hash: String,
        category: String,
        amount: U256,
    ) -> Result<B256, Self::AdapterError> {
        self.check(Component::Sender)?;
        let tx_hash = self.next_tx_hash(metadata_hash.as_bytes());
        if let Some(receipts) = self.contract_storage.write().unwrap().as_mut() {
            receipts.push(ContractReceipt {
                id: U256::from(receipts.len()),
                retailer: self.sender_account(),
                buyer,
                metadata_hash: metadata_hash.clone(),
                timestamp: Self::now_secs(),
                is_verified: true,
                category: category.clone(),
                amount,
            });
        }
        self.sent.write().unwrap().push(SentTransaction::IssueReceipt {
            tx_hash,
            buyer,
            metadata_hash,
            category,
            amount,
        });
        Ok(tx_hash)
    }
}
