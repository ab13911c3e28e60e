use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use alloy_primitives::{Address, TxHash, U256};
use feed::Session;
use messenger_core::{
    ledger::{Ledger, Transaction, fetch_snapshot},
    mirror::{ActionKind, Mirror, PendingAction},
    units::{ConvertError, ether_from_wei, wei_from_ether},
    wallet::{Wallet, WalletMethod, accounts_from_response},
};
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info};

use crate::{
    config::DaemonConfig,
    event::{Event, EventSender},
};

mod feed;

type Submitted<L> = Result<<L as Ledger>::Transaction, <L as Ledger>::Error>;

#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("no wallet provider found")]
    WalletMissing,
    #[error("wallet has no authorized account")]
    NoAccount,
    #[error("no contract handle (is a wallet connected?)")]
    NotConnected,
    #[error("{0}")]
    Convert(#[from] ConvertError),
    #[error("wallet error: {0}")]
    Wallet(String),
    #[error("ledger error: {0}")]
    Ledger(String),
}

/// Keeps a [`Mirror`] of the active account's messages in step with the
/// ledger and submits the account's actions to it.
pub struct Daemon<W>
where
    W: Wallet,
{
    wallet: Option<W>,
    config: DaemonConfig,
    event_sender: EventSender,
    state: Arc<watch::Sender<Mirror>>,
    session: Mutex<Option<Session<W::Ledger>>>,
    last_session_id: AtomicU64,
}

impl<W> Daemon<W>
where
    W: Wallet + Sync + 'static,
{
    pub fn new(wallet: Option<W>, config: DaemonConfig, event_sender: EventSender) -> Self {
        let (state, _) = watch::channel(Mirror::default());

        Self {
            wallet,
            config,
            event_sender,
            state: Arc::new(state),
            session: Mutex::new(None),
            last_session_id: AtomicU64::new(0),
        }
    }

    /// Receiver that is notified on every change to the mirror.
    pub fn subscribe(&self) -> watch::Receiver<Mirror> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> Mirror {
        self.state.borrow().clone()
    }

    /// Picks up an account the wallet has already authorized, without
    /// prompting. Having no wallet at all is not an error here.
    pub async fn check_if_wallet_is_connected(&self) -> Result<Option<Address>, DaemonError> {
        let Some(wallet) = &self.wallet else {
            debug!("make sure you have a wallet provider");
            return Ok(None);
        };

        let response = wallet
            .request(WalletMethod::Accounts)
            .await
            .map_err(|e| self.wallet_error(e))?;

        match accounts_from_response(&response).first() {
            Some(&account) => {
                info!(%account, "found an authorized account");
                self.set_account(Some(account)).await?;
                Ok(Some(account))
            }
            None => {
                self.event_sender.send(Event::NoAuthorizedAccount).ok();
                Ok(None)
            }
        }
    }

    pub async fn connect_wallet(&self) -> Result<Address, DaemonError> {
        let Some(wallet) = &self.wallet else {
            self.event_sender.send(Event::WalletMissing).ok();
            return Err(DaemonError::WalletMissing);
        };

        let response = wallet
            .request(WalletMethod::RequestAccounts)
            .await
            .map_err(|e| self.wallet_error(e))?;

        let account = *accounts_from_response(&response)
            .first()
            .ok_or(DaemonError::NoAccount)?;

        info!(%account, "connected");
        self.set_account(Some(account)).await?;

        Ok(account)
    }

    /// Switches the active account. On a change the mirror is discarded, the
    /// old contract handle and its subscription are dropped, and a fresh
    /// handle is subscribed and snapshotted.
    pub async fn set_account(&self, account: Option<Address>) -> Result<(), DaemonError> {
        let mut session = self.session.lock().await;

        let current = self.state.borrow().account();
        let synced = session.as_ref().is_some_and(|session| session.synced);
        if current == account && (synced || account.is_none()) {
            return Ok(());
        }

        *session = None;

        let id = self.last_session_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.state.send_replace(Mirror::new(account, id));
        self.event_sender.send(Event::AccountChanged(account)).ok();

        let Some(account) = account else {
            return Ok(());
        };

        let wallet = self.wallet.as_ref().ok_or(DaemonError::WalletMissing)?;
        let ledger = wallet
            .contract(self.config.contract_address, account)
            .map_err(|e| self.wallet_error(e))?;

        // Subscribe before reading so nothing emitted during the read is lost.
        // A message posted inside that window shows up in the snapshot and
        // again as a buffered NewMessage; events carry no index to dedupe by.
        let feed = ledger.subscribe();

        self.update(id, |mirror| mirror.begin(PendingAction::Syncing));
        let loaded = match fetch_snapshot(&ledger).await {
            Ok(snapshot) => {
                let count = snapshot.messages.len();
                let mut loaded = Ok(count);
                self.update(id, |mirror| {
                    loaded = mirror
                        .load_snapshot(snapshot)
                        .map(|()| count)
                        .map_err(DaemonError::from);
                });
                loaded
            }
            Err(error) => Err(DaemonError::Ledger(error.to_string())),
        };
        self.update(id, |mirror| mirror.settle(PendingAction::Syncing));

        *session = Some(Session::start(
            id,
            loaded.is_ok(),
            ledger,
            feed,
            Arc::clone(&self.state),
            self.event_sender.clone(),
        ));

        match loaded {
            Ok(count) => {
                self.event_sender.send(Event::SnapshotLoaded(count)).ok();
                Ok(())
            }
            Err(error) => {
                error!(%error, "could not load own messages");
                self.update(id, |mirror| mirror.record_error(error.to_string()));
                self.event_sender
                    .send(Event::SnapshotFailed(error.to_string()))
                    .ok();
                Err(error)
            }
        }
    }

    pub async fn send_message(
        &self,
        text: &str,
        receiver: Address,
        ether_amount: &str,
    ) -> Result<TxHash, DaemonError> {
        let (id, ledger) = self.ledger().await?;
        let value = wei_from_ether(ether_amount).map_err(|e| {
            self.report_failure(id, ActionKind::SendMessage, &e.to_string());
            DaemonError::from(e)
        })?;

        debug!(%receiver, ether = %ether_from_wei(value), "call post");
        let options = self.config.call_options().with_value(value);
        let submitted = ledger.post(text, receiver, options).await;

        self.finalize(id, ActionKind::SendMessage, submitted).await
    }

    pub async fn accept_message(&self, index: U256) -> Result<TxHash, DaemonError> {
        let (id, ledger) = self.ledger().await?;

        debug!(%index, "call accept");
        let submitted = ledger.accept(index, self.config.call_options()).await;

        self.finalize(id, ActionKind::AcceptMessage, submitted).await
    }

    pub async fn deny_message(&self, index: U256) -> Result<TxHash, DaemonError> {
        let (id, ledger) = self.ledger().await?;

        debug!(%index, "call deny");
        let submitted = ledger.deny(index, self.config.call_options()).await;

        self.finalize(id, ActionKind::DenyMessage, submitted).await
    }

    /// Only the contract owner may do this; the ledger enforces it.
    pub async fn change_num_of_pending_limits(&self, limits: U256) -> Result<TxHash, DaemonError> {
        let (id, ledger) = self.ledger().await?;

        debug!(%limits, "call changeNumOfPendingLimits");
        let submitted = ledger
            .change_num_of_pending_limits(limits, self.config.call_options())
            .await;

        self.finalize(id, ActionKind::ChangeNumOfPendingLimits, submitted)
            .await
    }

    async fn ledger(&self) -> Result<(u64, Arc<W::Ledger>), DaemonError> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|session| (session.id, Arc::clone(&session.ledger)))
            .ok_or(DaemonError::NotConnected)
    }

    async fn finalize(
        &self,
        id: u64,
        kind: ActionKind,
        submitted: Submitted<W::Ledger>,
    ) -> Result<TxHash, DaemonError> {
        let transaction = submitted.map_err(|e| self.action_failed(id, kind, e.to_string()))?;
        let hash = transaction.hash();

        info!(?kind, %hash, "processing");
        self.update(id, |mirror| {
            mirror.begin(PendingAction::Transaction { kind, hash })
        });
        self.event_sender
            .send(Event::ActionSubmitted(kind, hash))
            .ok();

        let finalized = transaction.wait().await;
        self.update(id, |mirror| {
            mirror.settle(PendingAction::Transaction { kind, hash })
        });

        match finalized {
            Ok(()) => {
                info!(?kind, %hash, "done");
                self.event_sender
                    .send(Event::ActionFinalized(kind, hash))
                    .ok();
                Ok(hash)
            }
            Err(e) => Err(self.action_failed(id, kind, e.to_string())),
        }
    }

    fn action_failed(&self, id: u64, kind: ActionKind, error: String) -> DaemonError {
        self.report_failure(id, kind, &error);
        DaemonError::Ledger(error)
    }

    fn report_failure(&self, id: u64, kind: ActionKind, error: &str) {
        error!(?kind, %error, "action failed");
        self.update(id, |mirror| mirror.record_error(error));
        self.event_sender
            .send(Event::ActionFailed(kind, error.to_owned()))
            .ok();
    }

    fn wallet_error(&self, error: W::Error) -> DaemonError {
        error!(%error, "wallet request failed");
        self.event_sender
            .send(Event::WalletError(error.to_string()))
            .ok();
        DaemonError::Wallet(error.to_string())
    }

    /// Applies `f` only while the mirror still belongs to session `id`.
    fn update<F>(&self, id: u64, f: F)
    where
        F: FnOnce(&mut Mirror),
    {
        self.state.send_if_modified(|mirror| {
            if mirror.session() != id {
                return false;
            }
            f(mirror);
            true
        });
    }
}
