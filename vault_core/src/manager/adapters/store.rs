// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;

use crate::receipt::LocalRecords;

/// Persists the receipts issued from this device.
///
/// The records are read and written as a whole.
///
/// # Example
///
/// For example code see [crate::manager::context::memory::InMemoryContext]
#[async_trait]
pub trait LocalStore {
    /// Defines the user-specified error type.
    ///
    /// This error type should implement the `Error` and `Debug` traits from the standard library.
    /// Errors of this type are returned to the user when an operation fails.
    type AdapterError: std::error::Error + std::fmt::Debug + Send + Sync + 'static;

    /// Loads every record. A store that was never written is empty.
    async fn load(&self) -> Result<LocalRecords, Self::AdapterError>;

    /// Replaces the stored records with `records`.
    async fn save(&self, records: &LocalRecords) -> Result<(), Self::AdapterError>;
}
