// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Module containing the error type returned by the core library

use alloy::primitives::Address;
use receipt_metadata::MetadataError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("No wallet provider is available. Install or configure a wallet and reconnect")]
    WalletUnavailable,
    #[error("Wallet provider returned no accounts")]
    NoAccounts,
    #[error("Wallet not connected. Please connect your wallet first")]
    NotConnected,
    #[error("Please switch to chain {expected}. Currently connected to chain ID: {actual}")]
    WrongNetwork { expected: u64, actual: u64 },
    #[error("Contract not deployed on chain {chain_id} yet")]
    ContractNotDeployed { chain_id: u64 },
    #[error("Invalid buyer address {buyer}")]
    InvalidBuyer { buyer: Address },
    #[error("Failed to encode receipt metadata: {0}")]
    Metadata(#[from] MetadataError),
    #[error("Error from adapter.\n Caused by: {source_error}")]
    AdapterError { source_error: anyhow::Error },
}

impl Error {
    pub(crate) fn adapter<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::AdapterError {
            source_error: anyhow::Error::new(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
