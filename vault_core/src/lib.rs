// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Receipt Vault core
//!
//! Retailers issue purchase receipts to buyer wallet addresses. Each receipt
//! carries a hex-encoded JSON metadata payload, submitted either as raw
//! transaction data or through the `ReceiptVault` contract. Customers later
//! browse the receipts associated with their wallet.
//!
//! ## Getting started
//!
//! - [`session::SessionManager`] tracks the connected wallet account.
//! - [`issuance::Submitter`] builds, submits and records new receipts.
//! - [`manager::Reconciler`] merges receipts from the local cache, a
//!   block-explorer history service and the contract into one list.
//! - [`view::filter_and_sort`] applies the customer's search, time window
//!   and sort order.
//! - [`feed::ReceiptFeed`] keeps the displayed list fresh without letting a
//!   slow refresh overwrite a newer one.
//!
//! All external systems are reached through the adapter traits in
//! [`manager::adapters`]; an in-memory implementation lives in
//! [`manager::context::memory`].

mod error;
pub mod directory;
pub mod feed;
pub mod issuance;
pub mod manager;
pub mod network;
pub mod receipt;
pub mod session;
pub mod view;

pub use error::{Error, Result};
pub use receipt_metadata;
