// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Chain ids, `ReceiptVault` deployments and block-explorer links.

use alloy::primitives::{address, Address};

use crate::Error;

pub const MAINNET_CHAIN_ID: u64 = 1;
pub const GOERLI_CHAIN_ID: u64 = 5;
pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;
pub const HARDHAT_CHAIN_ID: u64 = 31_337;
pub const LOCAL_DEV_CHAIN_ID: u64 = 1337;

const DEFAULT_EXPLORER: &str = "https://etherscan.io";

/// Known `ReceiptVault` deployments. The zero address marks a network the
/// contract has not been deployed to yet.
static CONTRACT_DEPLOYMENTS: &[(u64, Address)] = &[
    (
        LOCAL_DEV_CHAIN_ID,
        address!("5FbDB2315678afecb367f032d93F642f64180aa3"),
    ),
    (SEPOLIA_CHAIN_ID, Address::ZERO),
];

static EXPLORERS: &[(u64, &str)] = &[
    (MAINNET_CHAIN_ID, "https://etherscan.io"),
    (GOERLI_CHAIN_ID, "https://goerli.etherscan.io"),
    (SEPOLIA_CHAIN_ID, "https://sepolia.etherscan.io"),
    (42_161, "https://arbiscan.io"),
    (10, "https://optimistic.etherscan.io"),
    (137, "https://polygonscan.com"),
    (56, "https://bscscan.com"),
    (HARDHAT_CHAIN_ID, "https://localhost:8545"),
    (LOCAL_DEV_CHAIN_ID, "https://localhost:8545"),
];

/// Returns the `ReceiptVault` address for `chain_id`.
///
/// Chains without an entry use the Sepolia deployment.
///
/// # Errors
///
/// Returns [`Error::ContractNotDeployed`] when the deployment is the zero address.
pub fn contract_address(chain_id: u64) -> Result<Address, Error> {
    let lookup = |id: u64| {
        CONTRACT_DEPLOYMENTS
            .iter()
            .find(|(chain, _)| *chain == id)
            .map(|(_, address)| *address)
    };
    let address = lookup(chain_id)
        .or_else(|| lookup(SEPOLIA_CHAIN_ID))
        .unwrap_or(Address::ZERO);
    if address.is_zero() {
        return Err(Error::ContractNotDeployed { chain_id });
    }
    Ok(address)
}

/// Base URL of the block explorer for `chain_id`, mainnet Etherscan otherwise.
pub fn explorer_base_url(chain_id: Option<u64>) -> &'static str {
    chain_id
        .and_then(|id| EXPLORERS.iter().find(|(chain, _)| *chain == id))
        .map(|(_, url)| *url)
        .unwrap_or(DEFAULT_EXPLORER)
}

/// Link to `tx_hash` on the explorer for `chain_id`.
///
/// Strings that do not look like a transaction hash (the `0x0000` sentinel,
/// for instance) link to the explorer root instead.
pub fn transaction_url(chain_id: Option<u64>, tx_hash: &str) -> String {
    let base = explorer_base_url(chain_id);
    if tx_hash.starts_with("0x") && tx_hash.len() >= 42 {
        format!("{base}/tx/{tx_hash}")
    } else {
        base.to_string()
    }
}
