use alloy_primitives::{Address, TxHash};
use messenger_core::{
    ledger::LedgerEvent,
    mirror::{ActionKind, Applied},
    units::ether_from_wei,
};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{error, info, warn};

pub type EventSender = UnboundedSender<Event>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    WalletMissing,
    NoAuthorizedAccount,
    WalletError(String),
    AccountChanged(Option<Address>),
    SnapshotLoaded(usize),
    SnapshotFailed(String),
    LedgerEventApplied(LedgerEvent, Applied),
    SubscriptionClosed,
    ActionSubmitted(ActionKind, TxHash),
    ActionFinalized(ActionKind, TxHash),
    ActionFailed(ActionKind, String),
}

/// Drains `receiver` into the log until every sender is gone.
pub async fn log_events(mut receiver: UnboundedReceiver<Event>) {
    while let Some(event) = receiver.recv().await {
        log_event(&event);
    }
}

pub fn log_event(event: &Event) {
    match event {
        Event::WalletMissing => {
            warn!("no wallet provider found, please install a wallet in your browser");
        }
        Event::NoAuthorizedAccount => info!("no authorized account found"),
        Event::WalletError(error) => error!(%error, "wallet request failed"),
        Event::AccountChanged(Some(account)) => info!(%account, "connected"),
        Event::AccountChanged(None) => info!("disconnected"),
        Event::SnapshotLoaded(count) => info!(count, "loaded own messages"),
        Event::SnapshotFailed(error) => error!(%error, "could not load own messages"),
        Event::LedgerEventApplied(LedgerEvent::NewMessage(raw), applied) => {
            info!(
                sender = %raw.sender,
                receiver = %raw.receiver,
                deposit = %ether_from_wei(raw.deposit_in_wei),
                ?applied,
                "new message"
            );
        }
        Event::LedgerEventApplied(LedgerEvent::MessageConfirmed { receiver, index }, applied) => {
            info!(%receiver, %index, ?applied, "message confirmed");
        }
        Event::LedgerEventApplied(LedgerEvent::NumOfPendingLimitsChanged(limits), _) => {
            info!(%limits, "pending limit changed");
        }
        Event::SubscriptionClosed => warn!("ledger event feed closed"),
        Event::ActionSubmitted(kind, hash) => info!(?kind, %hash, "processing"),
        Event::ActionFinalized(kind, hash) => info!(?kind, %hash, "done"),
        Event::ActionFailed(kind, error) => error!(?kind, %error, "action failed"),
    }
}
