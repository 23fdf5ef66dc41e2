// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

use alloy::primitives::Address;
use async_trait::async_trait;

use crate::receipt::ExplorerTransaction;

/// Lists the transactions of an account, as a block-explorer service does.
///
/// # Example
///
/// For example code see [crate::manager::context::memory::InMemoryContext]
#[async_trait]
pub trait TransactionHistory {
    /// Defines the user-specified error type.
    ///
    /// This error type should implement the `Error` and `Debug` traits from the standard library.
    /// Errors of this type are returned to the user when an operation fails.
    type AdapterError: std::error::Error + std::fmt::Debug + Send + Sync + 'static;

    /// Returns the most recent transactions involving `address`, newest first.
    ///
    /// Returns `Ok(None)` when no history service is configured. A service
    /// that answers without results returns `Ok(Some(vec![]))`.
    async fn transactions_for(
        &self,
        address: Address,
    ) -> Result<Option<Vec<ExplorerTransaction>>, Self::AdapterError>;
}
