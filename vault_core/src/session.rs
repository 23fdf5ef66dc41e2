// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Wallet session tracking.
//!
//! The session is an explicit [`WalletSession`] value handed to every
//! operation that needs the customer's address or network. The
//! [`SessionManager`] owns the current value and publishes changes over a
//! [`tokio::sync::watch`] channel.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use alloy::primitives::Address;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::{sync::watch, task::JoinHandle};

use crate::{manager::adapters::WalletProvider, Error};

/// The connected account and network, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSession {
    pub connected: bool,
    pub account: Option<Address>,
    pub chain_id: Option<u64>,
}

impl WalletSession {
    pub fn with_account(account: Address, chain_id: u64) -> Self {
        Self {
            connected: true,
            account: Some(account),
            chain_id: Some(chain_id),
        }
    }

    /// The account receipts are reconciled for, only while connected.
    pub fn active_account(&self) -> Option<Address> {
        self.account.filter(|_| self.connected)
    }
}

pub struct SessionManager<P> {
    provider: Option<Arc<P>>,
    session: Arc<watch::Sender<WalletSession>>,
    /// Set by an explicit connect, cleared by disconnect
    connected_this_session: Arc<AtomicBool>,
}

impl<P> Clone for SessionManager<P> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            session: self.session.clone(),
            connected_this_session: self.connected_this_session.clone(),
        }
    }
}

impl<P> SessionManager<P> {
    /// Creates a disconnected manager. `None` models an environment
    /// without any wallet provider.
    pub fn new(provider: Option<P>) -> Self {
        let (session, _) = watch::channel(WalletSession::default());
        Self {
            provider: provider.map(Arc::new),
            session: Arc::new(session),
            connected_this_session: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn session(&self) -> WalletSession {
        self.session.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WalletSession> {
        self.session.subscribe()
    }

    pub fn provider(&self) -> Option<&Arc<P>> {
        self.provider.as_ref()
    }

    pub fn connected_this_session(&self) -> bool {
        self.connected_this_session.load(Ordering::SeqCst)
    }

    /// Resets to the disconnected session. Restoring will not reconnect
    /// until the user connects again.
    pub fn disconnect(&self) {
        self.connected_this_session.store(false, Ordering::SeqCst);
        self.session.send_replace(WalletSession::default());
        info!("Wallet disconnected");
    }
}

impl<P> SessionManager<P>
where
    P: WalletProvider + Send + Sync + 'static,
{
    fn wallet(&self) -> Result<&Arc<P>, Error> {
        self.provider.as_ref().ok_or(Error::WalletUnavailable)
    }

    /// Asks the wallet for access and publishes the connected session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WalletUnavailable`] if there is no wallet provider,
    /// [`Error::NoAccounts`] if the user granted no account and
    /// [`Error::AdapterError`] if the provider fails.
    pub async fn connect(&self) -> Result<WalletSession, Error> {
        let wallet = self.wallet()?;
        let accounts = wallet.request_accounts().await.map_err(Error::adapter)?;
        let account = *accounts.first().ok_or(Error::NoAccounts)?;
        let chain_id = wallet.chain_id().await.map_err(Error::adapter)?;

        let session = WalletSession::with_account(account, chain_id);
        self.connected_this_session.store(true, Ordering::SeqCst);
        self.session.send_replace(session.clone());
        info!("Wallet connected: account {account} on chain {chain_id}");
        Ok(session)
    }

    /// Moves the wallet to `chain_id` when it is on another network, then
    /// connects.
    pub async fn connect_on(&self, chain_id: u64) -> Result<WalletSession, Error> {
        let wallet = self.wallet()?;
        let current = wallet.chain_id().await.map_err(Error::adapter)?;
        if current != chain_id {
            info!("Switching wallet from chain {current} to chain {chain_id}");
            wallet
                .switch_chain(chain_id)
                .await
                .map_err(Error::adapter)?;
        }
        self.connect().await
    }

    /// Reconnects silently if the user connected earlier in this session
    /// and the wallet still grants an account.
    pub async fn restore(&self) -> Result<WalletSession, Error> {
        if !self.connected_this_session() {
            return Ok(self.session());
        }
        let wallet = self.wallet()?;
        let accounts = wallet.accounts().await.map_err(Error::adapter)?;
        let Some(&account) = accounts.first() else {
            self.disconnect();
            return Ok(self.session());
        };
        let chain_id = wallet.chain_id().await.map_err(Error::adapter)?;
        let session = WalletSession::with_account(account, chain_id);
        self.session.send_replace(session.clone());
        Ok(session)
    }

    /// Follows account changes reported by the wallet.
    ///
    /// While the user is connected, an empty account list disconnects and a
    /// different first account reconnects. Returns `None` without a wallet
    /// provider. Abort the handle to stop following.
    pub fn watch_account_changes(&self) -> Option<JoinHandle<()>> {
        let mut accounts = self.provider.as_ref()?.subscribe_accounts();
        let manager = self.clone();
        Some(tokio::spawn(async move {
            while accounts.changed().await.is_ok() {
                let current = accounts.borrow_and_update().clone();
                if !manager.connected_this_session() {
                    continue;
                }
                match current.first() {
                    None => {
                        info!("Wallet revoked every account");
                        manager.disconnect();
                    }
                    Some(&account) if manager.session().account != Some(account) => {
                        info!("Wallet account changed to {account}");
                        if let Err(e) = manager.connect().await {
                            warn!("Failed to reconnect after an account change: {e}");
                        }
                    }
                    Some(_) => {}
                }
            }
        }))
    }
}
