// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Context adapters for the receipt vault.
//!
//! Each adapter is implemented by the user of the library for the wallet,
//! history service, contract and storage they actually talk to. Every
//! adapter carries its own error type, which the library wraps into
//! [`crate::Error::AdapterError`].

mod contract;
mod history;
mod store;
mod wallet;

pub use contract::{ContractReader, ReceiptSender};
pub use history::TransactionHistory;
pub use store::LocalStore;
pub use wallet::WalletProvider;
