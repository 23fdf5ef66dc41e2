// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

use alloy::primitives::Address;
use async_trait::async_trait;
use tokio::sync::watch;

/// The capability that holds the user's accounts and can sign transactions.
///
/// # Example
///
/// For example code see [crate::manager::context::memory::InMemoryContext]
#[async_trait]
pub trait WalletProvider {
    /// Defines the user-specified error type.
    ///
    /// This error type should implement the `Error` and `Debug` traits from the standard library.
    /// Errors of this type are returned to the user when an operation fails.
    type AdapterError: std::error::Error + std::fmt::Debug + Send + Sync + 'static;

    /// Asks the user to grant access to their accounts.
    ///
    /// The first returned account is the one the vault acts for.
    async fn request_accounts(&self) -> Result<Vec<Address>, Self::AdapterError>;

    /// Accounts already granted, without prompting the user.
    async fn accounts(&self) -> Result<Vec<Address>, Self::AdapterError>;

    /// Chain the provider is currently connected to.
    async fn chain_id(&self) -> Result<u64, Self::AdapterError>;

    /// Asks the provider to move to another network.
    async fn switch_chain(&self, chain_id: u64) -> Result<(), Self::AdapterError>;

    /// Watches the granted accounts. An empty list means the user revoked
    /// access or locked the wallet.
    fn subscribe_accounts(&self) -> watch::Receiver<Vec<Address>>;
}
