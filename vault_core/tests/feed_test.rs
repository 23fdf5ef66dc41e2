// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

mod common;

use std::time::Duration;

use chrono::Utc;
use common::*;
use rstest::*;
use vault_core::{
    directory::RetailerDirectory,
    feed::{spawn_refresh_loop, FeedConfig, NotificationLevel, ReceiptFeed, RefreshOutcome},
    issuance::{IssueRequest, SubmissionMode, Submitter, SubmitterConfig},
    manager::{
        context::memory::{Component, InMemoryContext},
        Reconciler,
    },
    network::SEPOLIA_CHAIN_ID,
    receipt::LocalRecords,
    session::{SessionManager, WalletSession},
};

#[fixture]
fn context() -> InMemoryContext {
    let context = InMemoryContext::new().with_accounts(vec![CUSTOMER]);
    context.insert_local_record(local_record(1, CITY_DINER, Utc::now()));
    context
}

fn feed(context: &InMemoryContext) -> ReceiptFeed<InMemoryContext> {
    ReceiptFeed::new(Reconciler::new(context.clone(), RetailerDirectory::default()))
}

async fn wait_until(mut done: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[rstest]
#[tokio::test]
async fn slow_refresh_does_not_overwrite_newer_one(context: InMemoryContext) {
    let feed = feed(&context);
    let session = WalletSession::default();
    context.delay_next_load(Duration::from_millis(200));

    let first = feed.refresh(&session);
    let second = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let mut records = LocalRecords::new();
        for (byte, retailer) in [(2, ELECTRONIC_DEPOT), (3, FASHION_OUTLET)] {
            let record = local_record(byte, retailer, Utc::now());
            records.insert(record.key(), record);
        }
        context.set_local_records(records);
        feed.refresh(&session).await
    };
    let (first, second) = tokio::join!(first, second);

    assert_eq!(first, RefreshOutcome::Stale(1));
    assert_eq!(second, RefreshOutcome::Committed(2));
    let state = feed.state();
    assert_eq!(state.generation, 2);
    assert_eq!(state.records.len(), 2);
    assert!(!state.loading);
    assert_eq!(feed.stale_refreshes(), 1);
}

#[rstest]
#[tokio::test]
async fn sequential_refreshes_all_commit(context: InMemoryContext) {
    let feed = feed(&context);
    let session = WalletSession::default();

    assert_eq!(feed.refresh(&session).await, RefreshOutcome::Committed(1));
    assert_eq!(feed.refresh(&session).await, RefreshOutcome::Committed(2));
    assert_eq!(feed.records().len(), 1);
    assert_eq!(feed.stale_refreshes(), 0);
}

#[rstest]
#[tokio::test]
async fn failed_refresh_empties_the_list_and_notifies(context: InMemoryContext) {
    let feed = feed(&context);
    let session = WalletSession::default();
    let mut notifications = feed.notifications();
    feed.refresh(&session).await;
    assert_eq!(feed.records().len(), 1);

    context.fail(Component::LocalStore);
    assert_eq!(feed.refresh(&session).await, RefreshOutcome::Committed(2));

    let state = feed.state();
    assert!(state.records.is_empty());
    assert!(state.sources.is_none());
    let notification = notifications.recv().await.unwrap();
    assert_eq!(notification.level, NotificationLevel::Error);
    assert_eq!(notification.title, "Error Loading Receipts");
}

#[rstest]
#[tokio::test]
async fn refresh_loop_follows_session_and_issuance(context: InMemoryContext) {
    let feed = feed(&context);
    let sessions = SessionManager::new(Some(context.clone()));
    let submitter = Submitter::new(context.clone(), SubmitterConfig::default());
    let mut notifications = feed.notifications();
    let config = FeedConfig {
        poll_interval: Duration::from_secs(3600),
        issuance_delay: Duration::from_millis(10),
    };

    let handle = spawn_refresh_loop(
        feed.clone(),
        sessions.subscribe(),
        submitter.subscribe(),
        config,
    );
    // initial refresh
    wait_until(|| feed.state().generation == 1).await;

    sessions.connect().await.unwrap();
    wait_until(|| feed.state().generation == 2).await;

    let retailer = WalletSession::with_account(ELECTRONIC_DEPOT, SEPOLIA_CHAIN_ID);
    submitter
        .issue(
            &retailer,
            IssueRequest::new(CUSTOMER),
            SubmissionMode::RawTransaction,
        )
        .await
        .unwrap();
    wait_until(|| feed.state().generation == 3).await;

    assert_eq!(feed.records().len(), 2);
    let notification = notifications.recv().await.unwrap();
    assert_eq!(notification.level, NotificationLevel::Info);
    assert_eq!(notification.title, "New Receipt Detected");

    handle.abort();
}

#[rstest]
#[tokio::test]
async fn cancelled_refresh_stops_loading(context: InMemoryContext) {
    let feed = feed(&context);
    let session = WalletSession::default();
    context.delay_next_load(Duration::from_secs(5));

    let cancelled = tokio::time::timeout(Duration::from_millis(20), feed.refresh(&session)).await;
    assert!(cancelled.is_err());
    assert!(!feed.state().loading);

    assert_eq!(feed.refresh(&session).await, RefreshOutcome::Committed(2));
    let state = feed.state();
    assert!(!state.loading);
    assert_eq!(state.records.len(), 1);
}

#[rstest]
#[tokio::test]
async fn zero_poll_interval_keeps_the_loop_running(context: InMemoryContext) {
    let feed = feed(&context);
    let sessions = SessionManager::new(Some(context.clone()));
    let submitter = Submitter::new(context.clone(), SubmitterConfig::default());
    let config = FeedConfig {
        poll_interval: Duration::ZERO,
        issuance_delay: Duration::from_millis(10),
    };

    let handle = spawn_refresh_loop(
        feed.clone(),
        sessions.subscribe(),
        submitter.subscribe(),
        config,
    );
    wait_until(|| feed.state().generation >= 1).await;

    sessions.connect().await.unwrap();
    wait_until(|| feed.state().generation >= 2).await;
    assert!(!handle.is_finished());

    handle.abort();
}
