// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::{collections::HashMap, net::SocketAddr};

use alloy::primitives::{address, Address, B256};
use axum::{extract::Query, routing::get, Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use vault_core::manager::adapters::TransactionHistory;
use vault_service::etherscan::{EtherscanClient, EtherscanError};

const CUSTOMER: Address = address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");

/// Answers every `txlist` query with `body`, after checking the query.
async fn fake_etherscan(body: Value) -> SocketAddr {
    let app = Router::new().route(
        "/api",
        get(move |Query(params): Query<HashMap<String, String>>| {
            let body = body.clone();
            async move {
                assert_eq!(params.get("module").map(String::as_str), Some("account"));
                assert_eq!(params.get("action").map(String::as_str), Some("txlist"));
                assert_eq!(params.get("sort").map(String::as_str), Some("desc"));
                assert_eq!(
                    params.get("address").map(String::as_str),
                    Some(CUSTOMER.to_string().as_str())
                );
                Json(body)
            }
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client(addr: SocketAddr) -> EtherscanClient {
    EtherscanClient::new(format!("http://{addr}/api"), Some("test-key".to_string()))
}

#[tokio::test]
async fn transactions_are_parsed() {
    let addr = fake_etherscan(json!({
        "status": "1",
        "message": "OK",
        "result": [
            {
                "hash": format!("0x{}", "11".repeat(32)),
                "from": "0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
                "to": CUSTOMER.to_string().to_lowercase(),
                "input": "0x7b7d",
                "timeStamp": "1718452800",
                "blockNumber": "6100000",
                "value": "0"
            },
            {
                "hash": "not a hash",
                "from": "0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
                "to": "",
                "input": "0x",
                "timeStamp": "1718452800",
                "blockNumber": "6100001"
            }
        ]
    }))
    .await;

    let transactions = client(addr)
        .transactions_for(CUSTOMER)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(transactions.len(), 1);
    let tx = &transactions[0];
    assert_eq!(tx.hash, B256::repeat_byte(0x11));
    assert_eq!(tx.to, Some(CUSTOMER));
    assert_eq!(tx.input, "0x7b7d");
    assert_eq!(tx.timestamp, 1_718_452_800);
    assert_eq!(tx.block_number, 6_100_000);
    assert!(tx.is_receipt_for(CUSTOMER));
}

#[tokio::test]
async fn no_transactions_found_is_empty() {
    let addr = fake_etherscan(json!({
        "status": "0",
        "message": "No transactions found",
        "result": []
    }))
    .await;

    let transactions = client(addr).transactions_for(CUSTOMER).await.unwrap();
    assert_eq!(transactions, Some(Vec::new()));
}

#[tokio::test]
async fn refused_request_is_an_error() {
    let addr = fake_etherscan(json!({
        "status": "0",
        "message": "NOTOK",
        "result": "Invalid API Key"
    }))
    .await;

    let error = client(addr).transactions_for(CUSTOMER).await.unwrap_err();
    assert!(matches!(
        &error,
        EtherscanError::Refused { message, result }
            if message == "NOTOK" && result == "Invalid API Key"
    ));
}

#[tokio::test]
async fn unreachable_service_is_an_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    assert!(client(addr).transactions_for(CUSTOMER).await.is_err());
}
