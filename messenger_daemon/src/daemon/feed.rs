use std::sync::Arc;

use futures::{StreamExt, stream::BoxStream};
use messenger_core::{ledger::LedgerEvent, mirror::Mirror};
use tokio::{sync::watch, task::JoinHandle};
use tracing::debug;

use crate::event::{Event, EventSender};

/// One contract handle together with the task draining its event feed.
/// Dropping the session aborts the task, which drops the feed.
pub(crate) struct Session<L> {
    pub(crate) id: u64,
    /// Whether the snapshot loaded. A session that failed to is retried on
    /// reconnect even for the same account.
    pub(crate) synced: bool,
    pub(crate) ledger: Arc<L>,
    feed_task: JoinHandle<()>,
}

impl<L> Session<L> {
    pub(crate) fn start(
        id: u64,
        synced: bool,
        ledger: L,
        feed: BoxStream<'static, LedgerEvent>,
        state: Arc<watch::Sender<Mirror>>,
        event_sender: EventSender,
    ) -> Self {
        let feed_task = tokio::spawn(drain_feed(id, feed, state, event_sender));

        Self {
            id,
            synced,
            ledger: Arc::new(ledger),
            feed_task,
        }
    }
}

impl<L> Drop for Session<L> {
    fn drop(&mut self) {
        debug!(session = self.id, "unsubscribing from ledger events");
        self.feed_task.abort();
    }
}

async fn drain_feed(
    id: u64,
    mut feed: BoxStream<'static, LedgerEvent>,
    state: Arc<watch::Sender<Mirror>>,
    event_sender: EventSender,
) {
    while let Some(ledger_event) = feed.next().await {
        let mut applied = None;

        state.send_if_modified(|mirror| {
            if mirror.session() != id {
                return false;
            }
            let outcome = mirror.apply(&ledger_event);
            applied = Some(outcome);
            outcome.modified()
        });

        match applied {
            Some(applied) => {
                event_sender
                    .send(Event::LedgerEventApplied(ledger_event, applied))
                    .ok();
            }
            None => {
                debug!(session = id, "feed outlived its session");
                return;
            }
        }
    }

    event_sender.send(Event::SubscriptionClosed).ok();
}
