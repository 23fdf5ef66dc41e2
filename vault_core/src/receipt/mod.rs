// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Receipts
//!
//! Receipts reach the customer from three places, each with its own shape:
//!
//! - [`LocalRecord`]: written by the issuance path, already decoded.
//! - [`ExplorerTransaction`]: a transaction returned by the block-explorer
//!   history service, whose input data is the metadata payload.
//! - [`ContractReceipt`]: an entry of the `ReceiptVault` contract storage.
//!
//! Every source is first lowered into a [`RawReceipt`], the unit merged and
//! deduplicated by the reconciler, and finally normalized into the
//! [`ReceiptRecord`] view model.

mod raw;
mod record;
mod sources;

pub use raw::{dedup_first_seen, fallback_transaction_hash, Origin, RawReceipt};
pub use record::{ReceiptRecord, NO_METADATA, NO_TRANSACTION_HASH};
pub use sources::{ContractReceipt, ExplorerTransaction, LocalRecord, LocalRecords};
