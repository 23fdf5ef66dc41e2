// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Bindings to the `ReceiptVault` contract.

use alloy::{
    primitives::{Address, B256, U256},
    providers::{DynProvider, PendingTransactionError},
    sol,
};
use log::debug;
use vault_core::receipt::ContractReceipt;

sol! {
    #[sol(rpc)]
    contract ReceiptVault {
        struct Receipt {
            uint256 id;
            address retailer;
            address buyer;
            string metadataHash;
            uint256 timestamp;
            bool isVerified;
            string category;
            uint256 amount;
        }

        event ReceiptIssued(
            uint256 indexed receiptId,
            address indexed retailer,
            address indexed buyer,
            string metadataHash,
            uint256 timestamp,
            string category,
            uint256 amount
        );

        function issueReceipt(address buyer, string metadataHash, string category, uint256 amount) external returns (uint256);
        function getReceipts() external view returns (Receipt[] memory);
        function getTotalReceiptCount() external view returns (uint256);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("ReceiptVault call failed: {0}")]
    Call(#[from] alloy::contract::Error),
    #[error("ReceiptVault transaction was not confirmed: {0}")]
    Pending(#[from] PendingTransactionError),
    #[error("ReceiptVault transaction {0} reverted")]
    Reverted(B256),
}

impl From<ReceiptVault::Receipt> for ContractReceipt {
    fn from(receipt: ReceiptVault::Receipt) -> Self {
        ContractReceipt {
            id: receipt.id,
            retailer: receipt.retailer,
            buyer: receipt.buyer,
            metadata_hash: receipt.metadataHash,
            timestamp: u64::try_from(receipt.timestamp).unwrap_or(u64::MAX),
            is_verified: receipt.isVerified,
            category: receipt.category,
            amount: receipt.amount,
        }
    }
}

/// A deployed `ReceiptVault`.
#[derive(Clone)]
pub struct VaultContract {
    instance: ReceiptVault::ReceiptVaultInstance<DynProvider>,
}

impl VaultContract {
    pub fn new(address: Address, provider: DynProvider) -> Self {
        Self {
            instance: ReceiptVault::new(address, provider),
        }
    }

    pub fn address(&self) -> Address {
        *self.instance.address()
    }

    /// Calls `issueReceipt` and waits for the transaction to be mined.
    pub async fn issue_receipt(
        &self,
        buyer: Address,
        metadata_hash: String,
        category: String,
        amount: U256,
    ) -> Result<B256, ContractError> {
        let receipt = self
            .instance
            .issueReceipt(buyer, metadata_hash, category, amount)
            .send()
            .await?
            .get_receipt()
            .await?;
        if !receipt.status() {
            return Err(ContractError::Reverted(receipt.transaction_hash));
        }
        debug!(
            "issueReceipt for {buyer} mined in block {:?}",
            receipt.block_number
        );
        Ok(receipt.transaction_hash)
    }

    /// Every receipt stored by the contract.
    pub async fn receipts(&self) -> Result<Vec<ContractReceipt>, ContractError> {
        let receipts = self.instance.getReceipts().call().await?;
        Ok(receipts.into_iter().map(ContractReceipt::from).collect())
    }

    pub async fn total_count(&self) -> Result<u64, ContractError> {
        let count = self.instance.getTotalReceiptCount().call().await?;
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }
}
