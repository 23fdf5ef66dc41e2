// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! A wallet backed by a JSON-RPC node and a local private key.

use std::sync::Arc;

use alloy::{
    primitives::{Address, Bytes, TxKind, B256, U256},
    providers::{DynProvider, PendingTransactionError, Provider, ProviderBuilder},
    rpc::types::{TransactionInput, TransactionRequest},
    signers::local::PrivateKeySigner,
    transports::TransportError,
};
use async_trait::async_trait;
use log::debug;
use tokio::sync::watch;
use vault_core::manager::adapters::{ReceiptSender, WalletProvider};

use crate::contract::{ContractError, VaultContract};

/// Gas limit of the zero-value transaction carrying receipt metadata.
pub const RAW_RECEIPT_GAS_LIMIT: u64 = 50_000;

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("RPC node request failed: {0}")]
    Transport(#[from] TransportError),
    #[error("Transaction was not confirmed: {0}")]
    Pending(#[from] PendingTransactionError),
    #[error("Transaction {0} reverted")]
    Reverted(B256),
    #[error(transparent)]
    Contract(#[from] ContractError),
    #[error("No ReceiptVault contract on this network")]
    NoContract,
    #[error("A local key cannot move the node from chain {current} to chain {requested}")]
    ChainSwitch { current: u64, requested: u64 },
}

/// The signer's address is the only account, granted without prompting.
#[derive(Clone)]
pub struct RpcWallet {
    provider: DynProvider,
    address: Address,
    accounts: Arc<watch::Sender<Vec<Address>>>,
    contract: Option<VaultContract>,
}

impl RpcWallet {
    pub fn connect(rpc_url: reqwest::Url, signer: PrivateKeySigner) -> Self {
        let address = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(signer)
            .connect_http(rpc_url)
            .erased();
        let (accounts, _) = watch::channel(vec![address]);
        Self {
            provider,
            address,
            accounts: Arc::new(accounts),
            contract: None,
        }
    }

    /// Sends `issueReceipt` calls to `contract`.
    pub fn with_contract(mut self, contract: Option<VaultContract>) -> Self {
        self.contract = contract;
        self
    }

    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn contract(&self) -> Option<&VaultContract> {
        self.contract.as_ref()
    }
}

#[async_trait]
impl WalletProvider for RpcWallet {
    type AdapterError = WalletError;

    async fn request_accounts(&self) -> Result<Vec<Address>, Self::AdapterError> {
        Ok(vec![self.address])
    }

    async fn accounts(&self) -> Result<Vec<Address>, Self::AdapterError> {
        Ok(self.accounts.borrow().clone())
    }

    async fn chain_id(&self) -> Result<u64, Self::AdapterError> {
        Ok(self.provider.get_chain_id().await?)
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), Self::AdapterError> {
        let current = self.provider.get_chain_id().await?;
        if current == chain_id {
            return Ok(());
        }
        Err(WalletError::ChainSwitch {
            current,
            requested: chain_id,
        })
    }

    fn subscribe_accounts(&self) -> watch::Receiver<Vec<Address>> {
        self.accounts.subscribe()
    }
}

#[async_trait]
impl ReceiptSender for RpcWallet {
    type AdapterError = WalletError;

    async fn send_raw(&self, to: Address, data: Bytes) -> Result<B256, Self::AdapterError> {
        let mut tx = TransactionRequest::default()
            .from(self.address)
            .gas_limit(RAW_RECEIPT_GAS_LIMIT)
            .input(TransactionInput::from(data))
            .value(U256::ZERO);
        tx.to = Some(TxKind::Call(to));

        let receipt = self
            .provider
            .send_transaction(tx)
            .await?
            .get_receipt()
            .await?;
        if !receipt.status() {
            return Err(WalletError::Reverted(receipt.transaction_hash));
        }
        debug!(
            "Receipt data for {to} mined in block {:?}",
            receipt.block_number
        );
        Ok(receipt.transaction_hash)
    }

    async fn call_issue_receipt(
        &self,
        buyer: Address,
        metadata_hash: String,
        category: String,
        amount: U256,
    ) -> Result<B256, Self::AdapterError> {
        let contract = self.contract.as_ref().ok_or(WalletError::NoContract)?;
        Ok(contract
            .issue_receipt(buyer, metadata_hash, category, amount)
            .await?)
    }
}
