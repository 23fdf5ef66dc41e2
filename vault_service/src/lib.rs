// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

pub mod api_versioning;
pub mod context;
pub mod contract;
pub mod error_codes;
pub mod etherscan;
pub mod file_store;
pub mod jsonrpsee_helpers;
pub mod metrics;
pub mod rpc_wallet;
pub mod server;
