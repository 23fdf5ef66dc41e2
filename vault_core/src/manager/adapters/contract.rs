// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;

use crate::receipt::ContractReceipt;

/// Reads the `ReceiptVault` contract storage.
///
/// # Example
///
/// For example code see [crate::manager::context::memory::InMemoryContext]
#[async_trait]
pub trait ContractReader {
    /// Defines the user-specified error type.
    ///
    /// This error type should implement the `Error` and `Debug` traits from the standard library.
    /// Errors of this type are returned to the user when an operation fails.
    type AdapterError: std::error::Error + std::fmt::Debug + Send + Sync + 'static;

    /// Every receipt stored by the contract.
    ///
    /// Returns `Ok(None)` when the contract is not deployed on the current
    /// network or no contract is configured.
    async fn receipts(&self) -> Result<Option<Vec<ContractReceipt>>, Self::AdapterError>;

    /// Number of receipts stored by the contract, `Ok(None)` as for
    /// [`ContractReader::receipts`].
    async fn total_count(&self) -> Result<Option<u64>, Self::AdapterError>;
}

/// Submits receipts and waits until they are mined.
#[async_trait]
pub trait ReceiptSender {
    /// Defines the user-specified error type.
    ///
    /// This error type should implement the `Error` and `Debug` traits from the standard library.
    /// Errors of this type are returned to the user when an operation fails.
    type AdapterError: std::error::Error + std::fmt::Debug + Send + Sync + 'static;

    /// Sends a zero-value transaction to `to` carrying `data` as input.
    async fn send_raw(&self, to: Address, data: Bytes) -> Result<B256, Self::AdapterError>;

    /// Calls `issueReceipt` on the `ReceiptVault` contract.
    async fn call_issue_receipt(
        &self,
        buyer: Address,
        metadata_hash: String,
        category: String,
        amount: U256,
    ) -> Result<B256, Self::AdapterError>;
}
