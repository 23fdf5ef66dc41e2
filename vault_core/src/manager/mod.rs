// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The `manager` module merges the receipts of the three receipt sources
//! into the list a customer browses.
//!
//! The [`Reconciler`] reaches every external system through the adapters
//! in [`adapters`], so the same reconciliation runs against a browser-like
//! wallet, a JSON-RPC node or the in-memory context used by tests.

pub mod adapters;
#[cfg(feature = "in_memory")]
pub mod context;
mod reconciler;

pub use reconciler::{
    Reconciler, Reconciliation, SourceOutcome, SourceReport, CORRELATION_WINDOW_SECS,
};
