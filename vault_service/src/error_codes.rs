// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

/// JSON-RPC error codes specific to the receipt vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonRpcErrorCode {
    /// -32001 -- Invalid API version.
    InvalidVersion = -32001,
    /// -32002 -- No wallet, no account, or not connected.
    Wallet = -32002,
    /// -32003 -- Wallet is on another network than required.
    WrongNetwork = -32003,
    /// -32004 -- The receipt to issue is invalid.
    InvalidReceipt = -32004,
    /// -32005 -- The receipt could not be submitted.
    Submission = -32005,
    /// -32006 -- The receipts could not be loaded.
    Reconciliation = -32006,
}

/// JSON-RPC warning codes
/// These are not part of the JSON-RPC spec, but are used to provide additional information to the
/// client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonRpcWarningCode {
    /// -32101 -- Requested API version is deprecated.
    DeprecatedVersion = -32101,
    /// -32102 -- Some receipt sources could not be reached.
    DegradedSources = -32102,
    /// -32103 -- The receipt was issued but not recorded locally.
    NotRecordedLocally = -32103,
}
