// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{self, IntoEnumIterator};

/// The versions of the vault JSON-RPC API implemented by this server.
/// API versions are independent of the crate versions, so the core library
/// can change without breaking JSON-RPC clients (or vice versa).
#[derive(Clone, Debug, Eq, PartialEq, strum::Display, strum::EnumString, strum::EnumIter)]
pub enum VaultRpcApiVersion {
    #[strum(serialize = "0.0")]
    V0_0,
}

// Serialized through the `strum` strings ("0.0") rather than the variant
// names `serde` would derive ("V0_0").

impl Serialize for VaultRpcApiVersion {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

impl<'de> Deserialize<'de> for VaultRpcApiVersion {
    fn deserialize<D>(deserializer: D) -> std::result::Result<VaultRpcApiVersion, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        VaultRpcApiVersion::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// API versions that answer with a deprecation warning.
/// NOTE: Make sure to test the warning once this list becomes non-empty.
pub static VAULT_RPC_API_VERSIONS_DEPRECATED: &[VaultRpcApiVersion] = &[];

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct VaultRpcApiVersionsInfo {
    pub versions_supported: Vec<VaultRpcApiVersion>,
    pub versions_deprecated: Vec<VaultRpcApiVersion>,
}

pub fn vault_rpc_api_versions_info() -> VaultRpcApiVersionsInfo {
    VaultRpcApiVersionsInfo {
        versions_supported: VaultRpcApiVersion::iter().collect(),
        versions_deprecated: VAULT_RPC_API_VERSIONS_DEPRECATED.to_vec(),
    }
}
