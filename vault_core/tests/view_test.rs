// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

mod common;

use chrono::{DateTime, Duration, TimeZone, Utc};
use common::*;
use rstest::*;
use vault_core::{
    directory::RetailerDirectory,
    manager::{context::memory::InMemoryContext, Reconciler},
    network::SEPOLIA_CHAIN_ID,
    receipt::ReceiptRecord,
    session::WalletSession,
    view::{filter_and_sort_at, SortOrder, TimeWindow, ViewQuery},
};

#[fixture]
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 30, 18, 30, 0).unwrap()
}

/// One local receipt per known retailer, issued one, seven and forty days
/// before `now`.
#[fixture]
async fn records(now: DateTime<Utc>) -> Vec<ReceiptRecord> {
    let context = InMemoryContext::new();
    context.insert_local_record(local_record(1, CITY_DINER, now - Duration::days(7)));
    context.insert_local_record(local_record(2, ELECTRONIC_DEPOT, now - Duration::days(1)));
    context.insert_local_record(local_record(3, FASHION_OUTLET, now - Duration::days(40)));
    Reconciler::new(context, RetailerDirectory::default())
        .reconcile_at(&WalletSession::with_account(CUSTOMER, SEPOLIA_CHAIN_ID), now)
        .await
        .unwrap()
        .records
}

fn names(records: &[ReceiptRecord]) -> Vec<&str> {
    records
        .iter()
        .map(|record| record.retailer_name.as_str())
        .collect()
}

#[rstest]
#[tokio::test]
async fn query_finds_the_diner(#[future] records: Vec<ReceiptRecord>, now: DateTime<Utc>) {
    let view = ViewQuery {
        query: "diner".to_string(),
        ..Default::default()
    };
    let selected = filter_and_sort_at(&records.await, &view, now);
    assert_eq!(names(&selected), vec!["City Diner"]);
}

#[rstest]
#[tokio::test]
async fn week_keeps_a_receipt_from_exactly_seven_days_ago(
    #[future] records: Vec<ReceiptRecord>,
    now: DateTime<Utc>,
) {
    let view = ViewQuery {
        window: TimeWindow::PastWeek,
        ..Default::default()
    };
    let selected = filter_and_sort_at(&records.await, &view, now);
    assert_eq!(names(&selected), vec!["Electronic Depot", "City Diner"]);
}

#[rstest]
#[case::newest(SortOrder::Newest, vec!["Electronic Depot", "City Diner", "Fashion Outlet"])]
#[case::oldest(SortOrder::Oldest, vec!["Fashion Outlet", "City Diner", "Electronic Depot"])]
#[tokio::test]
async fn sort_orders(
    #[future] records: Vec<ReceiptRecord>,
    now: DateTime<Utc>,
    #[case] order: SortOrder,
    #[case] expected: Vec<&str>,
) {
    let records = records.await;
    let view = ViewQuery {
        order,
        ..Default::default()
    };
    assert_eq!(names(&filter_and_sort_at(&records, &view, now)), expected);
    // the input keeps the reconciliation order
    assert_eq!(
        names(&records),
        vec!["City Diner", "Electronic Depot", "Fashion Outlet"]
    );
}
