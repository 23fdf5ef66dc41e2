// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Keeps the displayed receipt list fresh.
//!
//! Refreshes may overlap: the periodic poll, a session change and a newly
//! issued receipt each start their own. Every refresh takes a generation
//! number when it starts and only commits its result if no refresh that
//! started later has committed already, so a slow refresh never overwrites
//! a newer list.

use std::{
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc, PoisonError, RwLock,
    },
    time::Duration,
};

use log::{debug, error, warn};
use serde::{Deserialize, Serialize};
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
    time::MissedTickBehavior,
};

use crate::{
    issuance::ReceiptIssued,
    manager::{
        adapters::{ContractReader, LocalStore, TransactionHistory},
        Reconciler, SourceReport,
    },
    receipt::ReceiptRecord,
    session::WalletSession,
};

const NOTIFICATION_CAPACITY: usize = 64;

/// Shortest poll interval the refresh loop runs with.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedConfig {
    /// Delay between two periodic refreshes while a wallet is connected
    pub poll_interval: Duration,
    /// Delay between a receipt being issued and the refresh it triggers,
    /// giving the history service time to index the transaction
    pub issuance_delay: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(15),
            issuance_delay: Duration::from_secs(1),
        }
    }
}

/// The receipt list currently displayed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedState {
    pub records: Vec<ReceiptRecord>,
    /// Whether a refresh is running
    pub loading: bool,
    /// Generation of the refresh that produced `records`, 0 before the first
    pub generation: u64,
    /// Source report of that refresh, `None` if it failed
    pub sources: Option<SourceReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

/// A message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn new(level: NotificationLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, title, message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "generation")]
pub enum RefreshOutcome {
    /// The result is displayed
    Committed(u64),
    /// A refresh that started later committed first; the result was dropped
    Stale(u64),
}

/// Counts a refresh as running until dropped, even if its future is cancelled.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn start(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct FeedInner<E> {
    reconciler: Reconciler<E>,
    state: RwLock<FeedState>,
    next_generation: AtomicU64,
    in_flight: AtomicUsize,
    stale_refreshes: AtomicU64,
    notifications: broadcast::Sender<Notification>,
}

pub struct ReceiptFeed<E> {
    inner: Arc<FeedInner<E>>,
}

impl<E> Clone for ReceiptFeed<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E> ReceiptFeed<E> {
    pub fn new(reconciler: Reconciler<E>) -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            inner: Arc::new(FeedInner {
                reconciler,
                state: RwLock::new(FeedState::default()),
                next_generation: AtomicU64::new(0),
                in_flight: AtomicUsize::new(0),
                stale_refreshes: AtomicU64::new(0),
                notifications,
            }),
        }
    }

    pub fn reconciler(&self) -> &Reconciler<E> {
        &self.inner.reconciler
    }

    pub fn state(&self) -> FeedState {
        let mut state = self
            .inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        state.loading = self.inner.in_flight.load(Ordering::SeqCst) > 0;
        state
    }

    pub fn records(&self) -> Vec<ReceiptRecord> {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .clone()
    }

    /// Number of refresh results dropped because a newer one was displayed.
    pub fn stale_refreshes(&self) -> u64 {
        self.inner.stale_refreshes.load(Ordering::SeqCst)
    }

    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.inner.notifications.subscribe()
    }

    pub fn notify(&self, notification: Notification) {
        // Nobody listening is fine
        let _ = self.inner.notifications.send(notification);
    }

    /// Commits `records` if no refresh started after `generation` did.
    fn commit(
        &self,
        generation: u64,
        records: Vec<ReceiptRecord>,
        sources: Option<SourceReport>,
    ) -> RefreshOutcome {
        let mut state = self
            .inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if generation <= state.generation {
            self.inner.stale_refreshes.fetch_add(1, Ordering::SeqCst);
            debug!(
                "Dropping refresh {generation}, refresh {} is already displayed",
                state.generation
            );
            return RefreshOutcome::Stale(generation);
        }
        state.records = records;
        state.generation = generation;
        state.sources = sources;
        RefreshOutcome::Committed(generation)
    }
}

impl<E> ReceiptFeed<E>
where
    E: LocalStore + TransactionHistory + ContractReader + Send + Sync + 'static,
{
    /// Reconciles the receipts of `session` and displays them unless a
    /// newer refresh won the race.
    ///
    /// A failed reconciliation displays an empty list and notifies the user.
    pub async fn refresh(&self, session: &WalletSession) -> RefreshOutcome {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let in_flight = InFlight::start(&self.inner.in_flight);
        let result = self.inner.reconciler.reconcile(session).await;
        drop(in_flight);

        match result {
            Ok(reconciliation) => self.commit(
                generation,
                reconciliation.records,
                Some(reconciliation.sources),
            ),
            Err(e) => {
                error!("Failed to load receipts: {e}");
                let outcome = self.commit(generation, Vec::new(), None);
                if let RefreshOutcome::Committed(_) = outcome {
                    self.notify(Notification::error(
                        "Error Loading Receipts",
                        "Failed to load receipts. Please try again.",
                    ));
                }
                outcome
            }
        }
    }

    fn spawn_refresh(&self, session: WalletSession) {
        let feed = self.clone();
        tokio::spawn(async move {
            feed.refresh(&session).await;
        });
    }
}

/// Drives `feed` until the session channel closes.
///
/// Refreshes once right away, then on every poll tick while a wallet is
/// connected, on every session change and `issuance_delay` after every
/// issued receipt. Each refresh runs in its own task. Aborting the returned
/// handle stops the triggers, not refreshes already running.
///
/// A poll interval below [`MIN_POLL_INTERVAL`] is raised to it.
pub fn spawn_refresh_loop<E>(
    feed: ReceiptFeed<E>,
    mut session_rx: watch::Receiver<WalletSession>,
    mut issued_rx: broadcast::Receiver<ReceiptIssued>,
    config: FeedConfig,
) -> JoinHandle<()>
where
    E: LocalStore + TransactionHistory + ContractReader + Send + Sync + 'static,
{
    let poll_interval = if config.poll_interval < MIN_POLL_INTERVAL {
        warn!(
            "Poll interval {:?} is too short, using {MIN_POLL_INTERVAL:?}",
            config.poll_interval
        );
        MIN_POLL_INTERVAL
    } else {
        config.poll_interval
    };
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;
        feed.spawn_refresh(session_rx.borrow_and_update().clone());

        let mut issued_open = true;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let session = session_rx.borrow().clone();
                    if session.active_account().is_some() {
                        feed.spawn_refresh(session);
                    }
                }
                changed = session_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let session = session_rx.borrow_and_update().clone();
                    feed.spawn_refresh(session);
                }
                issued = issued_rx.recv(), if issued_open => match issued {
                    Ok(event) => {
                        feed.notify(Notification::info(
                            "New Receipt Detected",
                            format!("Receipt {} was issued, refreshing the list", event.tx_hash),
                        ));
                        let feed = feed.clone();
                        let session_rx = session_rx.clone();
                        let delay = config.issuance_delay;
                        tokio::spawn(async move {
                            tokio::time::sleep(delay).await;
                            let session = session_rx.borrow().clone();
                            feed.refresh(&session).await;
                        });
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!("Missed {missed} issuance events");
                        feed.spawn_refresh(session_rx.borrow().clone());
                    }
                    Err(broadcast::error::RecvError::Closed) => issued_open = false,
                },
            }
        }
        debug!("Session channel closed, stopping the refresh loop");
    })
}
