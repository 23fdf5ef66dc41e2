// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Transaction history from an Etherscan-compatible `txlist` endpoint.

use std::str::FromStr;

use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use vault_core::{manager::adapters::TransactionHistory, receipt::ExplorerTransaction};

pub const DEFAULT_ETHERSCAN_API_URL: &str = "https://api-sepolia.etherscan.io/api";

/// Message of a successful answer for an account without transactions.
const NO_TRANSACTIONS_FOUND: &str = "No transactions found";

/// Transactions requested per query, newest first.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum EtherscanError {
    #[error("Transaction history request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Unexpected transaction history response: {0}")]
    Response(#[from] serde_json::Error),
    #[error("Transaction history service refused the request: {message} ({result})")]
    Refused { message: String, result: String },
}

/// Envelope of every Etherscan answer. `result` is a list on success and a
/// message otherwise.
#[derive(Debug, Deserialize)]
struct TxListResponse {
    status: String,
    message: String,
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTransaction {
    hash: String,
    from: String,
    #[serde(default)]
    to: String,
    #[serde(default)]
    input: String,
    time_stamp: String,
    block_number: String,
}

impl TryFrom<WireTransaction> for ExplorerTransaction {
    type Error = String;

    fn try_from(wire: WireTransaction) -> Result<Self, Self::Error> {
        let to = if wire.to.is_empty() {
            None
        } else {
            Some(Address::from_str(&wire.to).map_err(|e| format!("to: {e}"))?)
        };
        Ok(ExplorerTransaction {
            hash: B256::from_str(&wire.hash).map_err(|e| format!("hash: {e}"))?,
            from: Address::from_str(&wire.from).map_err(|e| format!("from: {e}"))?,
            to,
            input: wire.input,
            timestamp: wire
                .time_stamp
                .parse()
                .map_err(|e| format!("timeStamp: {e}"))?,
            block_number: wire
                .block_number
                .parse()
                .map_err(|e| format!("blockNumber: {e}"))?,
        })
    }
}

#[derive(Clone, Debug)]
pub struct EtherscanClient {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    page_size: u32,
}

impl EtherscanClient {
    pub fn new(api_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// The latest transactions of `address`, newest first.
    ///
    /// "No transactions found" yields an empty list, any other answer with a
    /// status other than `"1"` (bad API key, rate limit) an
    /// [`EtherscanError::Refused`]. Entries that do not parse are skipped.
    pub async fn fetch(&self, address: Address) -> Result<Vec<ExplorerTransaction>, EtherscanError> {
        let address = address.to_string();
        let offset = self.page_size.to_string();
        let mut query = vec![
            ("module", "account"),
            ("action", "txlist"),
            ("address", address.as_str()),
            ("startblock", "0"),
            ("endblock", "99999999"),
            ("page", "1"),
            ("offset", offset.as_str()),
            ("sort", "desc"),
        ];
        if let Some(api_key) = &self.api_key {
            query.push(("apikey", api_key.as_str()));
        }

        let response: TxListResponse = self
            .client
            .get(&self.api_url)
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if response.status != "1" {
            if response.message == NO_TRANSACTIONS_FOUND {
                debug!("History service has no transactions for {address}");
                return Ok(Vec::new());
            }
            let result = match response.result {
                serde_json::Value::String(result) => result,
                other => other.to_string(),
            };
            return Err(EtherscanError::Refused {
                message: response.message,
                result,
            });
        }

        let wire: Vec<WireTransaction> = serde_json::from_value(response.result)?;
        Ok(wire
            .into_iter()
            .filter_map(|tx| {
                let hash = tx.hash.clone();
                ExplorerTransaction::try_from(tx)
                    .map_err(|e| debug!("Skipping malformed transaction {hash}: {e}"))
                    .ok()
            })
            .collect())
    }
}

#[async_trait]
impl TransactionHistory for EtherscanClient {
    type AdapterError = EtherscanError;

    async fn transactions_for(
        &self,
        address: Address,
    ) -> Result<Option<Vec<ExplorerTransaction>>, Self::AdapterError> {
        self.fetch(address).await.map(Some)
    }
}
