// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Friendly names for known retailer addresses.

use std::collections::HashMap;

use alloy::primitives::{address, Address};

/// Label used for any address missing from the directory.
pub const UNKNOWN_RETAILER: &str = "Unknown Retailer";

/// Static address to name mapping used when displaying receipts.
///
/// Lookups compare parsed addresses, so the checksum casing of the
/// address a receipt was issued from does not matter.
#[derive(Debug, Clone)]
pub struct RetailerDirectory {
    names: HashMap<Address, String>,
}

impl Default for RetailerDirectory {
    fn default() -> Self {
        Self::empty()
            .with_retailer(
                address!("5FbDB2315678afecb367f032d93F642f64180aa3"),
                "Electronic Depot",
            )
            .with_retailer(
                address!("70997970C51812dc3A010C7d01b50e0d17dc79C8"),
                "City Diner",
            )
            .with_retailer(
                address!("3C44CdDdB6a900fa2b585dd299e03d12FA4293BC"),
                "Fashion Outlet",
            )
    }
}

impl RetailerDirectory {
    pub fn empty() -> Self {
        Self {
            names: HashMap::new(),
        }
    }

    pub fn with_retailer(mut self, retailer: Address, name: impl Into<String>) -> Self {
        self.names.insert(retailer, name.into());
        self
    }

    /// Returns the friendly name of `retailer`, or [`UNKNOWN_RETAILER`].
    pub fn name_of(&self, retailer: Option<Address>) -> &str {
        retailer
            .and_then(|retailer| self.names.get(&retailer))
            .map(String::as_str)
            .unwrap_or(UNKNOWN_RETAILER)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
