// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The context the service runs the vault with: receipts live in a JSON
//! file, history comes from Etherscan, contract receipts and submissions go
//! through the RPC node.

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use vault_core::{
    manager::adapters::{ContractReader, LocalStore, ReceiptSender, TransactionHistory},
    receipt::{ContractReceipt, ExplorerTransaction, LocalRecords},
};

use crate::{
    contract::{ContractError, VaultContract},
    etherscan::{EtherscanClient, EtherscanError},
    file_store::{FileStoreError, JsonFileStore},
    rpc_wallet::{RpcWallet, WalletError},
};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] FileStoreError),
    #[error(transparent)]
    History(#[from] EtherscanError),
    #[error(transparent)]
    Contract(#[from] ContractError),
    #[error(transparent)]
    Wallet(#[from] WalletError),
}

#[derive(Clone)]
pub struct ServiceContext {
    store: JsonFileStore,
    history: Option<EtherscanClient>,
    wallet: RpcWallet,
}

impl ServiceContext {
    /// `history` is `None` when no history service is configured. Contract
    /// receipts are read from the wallet's contract, if any.
    pub fn new(store: JsonFileStore, history: Option<EtherscanClient>, wallet: RpcWallet) -> Self {
        Self {
            store,
            history,
            wallet,
        }
    }

    fn contract(&self) -> Option<&VaultContract> {
        self.wallet.contract()
    }
}

#[async_trait]
impl LocalStore for ServiceContext {
    type AdapterError = ServiceError;

    async fn load(&self) -> Result<LocalRecords, Self::AdapterError> {
        Ok(self.store.load().await?)
    }

    async fn save(&self, records: &LocalRecords) -> Result<(), Self::AdapterError> {
        Ok(self.store.save(records).await?)
    }
}

#[async_trait]
impl TransactionHistory for ServiceContext {
    type AdapterError = ServiceError;

    async fn transactions_for(
        &self,
        address: Address,
    ) -> Result<Option<Vec<ExplorerTransaction>>, Self::AdapterError> {
        match &self.history {
            Some(history) => Ok(history.transactions_for(address).await?),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ContractReader for ServiceContext {
    type AdapterError = ServiceError;

    async fn receipts(&self) -> Result<Option<Vec<ContractReceipt>>, Self::AdapterError> {
        match self.contract() {
            Some(contract) => Ok(Some(contract.receipts().await?)),
            None => Ok(None),
        }
    }

    async fn total_count(&self) -> Result<Option<u64>, Self::AdapterError> {
        match self.contract() {
            Some(contract) => Ok(Some(contract.total_count().await?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ReceiptSender for ServiceContext {
    type AdapterError = ServiceError;

    async fn send_raw(&self, to: Address, data: Bytes) -> Result<B256, Self::AdapterError> {
        Ok(self.wallet.send_raw(to, data).await?)
    }

    async fn call_issue_receipt(
        &self,
        buyer: Address,
        metadata_hash: String,
        category: String,
        amount: U256,
    ) -> Result<B256, Self::AdapterError> {
        Ok(self
            .wallet
            .call_issue_receipt(buyer, metadata_hash, category, amount)
            .await?)
    }
}
