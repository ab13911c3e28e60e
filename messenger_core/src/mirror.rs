use alloy_primitives::{Address, TxHash, U256};
use tracing::{debug, warn};

use crate::{
    ledger::{LedgerEvent, LedgerSnapshot},
    message::Message,
    units::ConvertError,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    SendMessage,
    AcceptMessage,
    DenyMessage,
    ChangeNumOfPendingLimits,
}

/// Work this client has started and not yet seen settle. Independent of
/// any message's own `is_pending`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PendingAction {
    Syncing,
    Transaction { kind: ActionKind, hash: TxHash },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    NoAccount,
    OtherReceiver,
    IndexOutOfRange(U256),
    BadTimestamp(U256),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Applied {
    Appended(usize),
    Confirmed(usize),
    AlreadyConfirmed(usize),
    PendingLimitChanged(U256),
    Ignored(IgnoreReason),
}

impl Applied {
    pub fn modified(&self) -> bool {
        matches!(
            self,
            Applied::Appended(_) | Applied::Confirmed(_) | Applied::PendingLimitChanged(_)
        )
    }
}

/// Local copy of one account's slice of the ledger.
///
/// The list only ever grows at the end and entries only ever flip from
/// pending to not pending, mirroring the append-only ledger.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Mirror {
    session: u64,
    account: Option<Address>,
    own_messages: Vec<Message>,
    owner: Option<Address>,
    num_of_pending_limits: Option<U256>,
    pending_actions: Vec<PendingAction>,
    last_error: Option<String>,
}

impl Mirror {
    /// An empty mirror for `account`, tagged with the session of the
    /// contract handle that feeds it.
    pub fn new(account: Option<Address>, session: u64) -> Self {
        Self {
            session,
            account,
            ..Default::default()
        }
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn account(&self) -> Option<Address> {
        self.account
    }

    pub fn own_messages(&self) -> &[Message] {
        &self.own_messages
    }

    pub fn owner(&self) -> Option<Address> {
        self.owner
    }

    pub fn num_of_pending_limits(&self) -> Option<U256> {
        self.num_of_pending_limits
    }

    pub fn is_owner(&self) -> bool {
        matches!((self.account, self.owner), (Some(account), Some(owner)) if account == owner)
    }

    pub fn processing(&self) -> bool {
        !self.pending_actions.is_empty()
    }

    /// In-flight work, oldest first.
    pub fn pending_actions(&self) -> &[PendingAction] {
        &self.pending_actions
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Replaces messages, owner and limit with `snapshot`. Nothing from the
    /// previous state survives; if any record fails to convert the mirror is
    /// left untouched.
    pub fn load_snapshot(&mut self, snapshot: LedgerSnapshot) -> Result<(), ConvertError> {
        let own_messages = snapshot
            .messages
            .into_iter()
            .map(Message::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        self.own_messages = own_messages;
        self.owner = Some(snapshot.owner);
        self.num_of_pending_limits = Some(snapshot.num_of_pending_limits);

        Ok(())
    }

    pub fn apply(&mut self, event: &LedgerEvent) -> Applied {
        let applied = match event {
            LedgerEvent::NewMessage(raw) => match self.check_receiver(raw.receiver) {
                Err(reason) => Applied::Ignored(reason),
                Ok(()) => match Message::try_from(raw.clone()) {
                    Ok(message) => {
                        self.own_messages.push(message);
                        Applied::Appended(self.own_messages.len() - 1)
                    }
                    Err(_) => Applied::Ignored(IgnoreReason::BadTimestamp(raw.timestamp)),
                },
            },
            LedgerEvent::MessageConfirmed { receiver, index } => {
                match self.check_receiver(*receiver) {
                    Err(reason) => Applied::Ignored(reason),
                    Ok(()) => self.confirm(*index),
                }
            }
            LedgerEvent::NumOfPendingLimitsChanged(limits) => {
                self.num_of_pending_limits = Some(*limits);
                Applied::PendingLimitChanged(*limits)
            }
        };

        match applied {
            Applied::Ignored(IgnoreReason::IndexOutOfRange(index)) => {
                warn!(%index, len = self.own_messages.len(), "confirmation for unknown message");
            }
            Applied::Ignored(IgnoreReason::BadTimestamp(timestamp)) => {
                warn!(%timestamp, "new message with unusable timestamp");
            }
            _ => debug!(?applied, "applied ledger event"),
        }

        applied
    }

    pub fn begin(&mut self, action: PendingAction) {
        self.pending_actions.push(action);
        self.last_error = None;
    }

    /// Removes `action` only; anything else in flight stays pending.
    pub fn settle(&mut self, action: PendingAction) {
        if let Some(position) = self.pending_actions.iter().position(|a| *a == action) {
            self.pending_actions.remove(position);
        }
    }

    pub fn record_error<S: Into<String>>(&mut self, error: S) {
        self.last_error = Some(error.into());
    }

    fn check_receiver(&self, receiver: Address) -> Result<(), IgnoreReason> {
        match self.account {
            None => Err(IgnoreReason::NoAccount),
            Some(account) if account == receiver => Ok(()),
            Some(_) => Err(IgnoreReason::OtherReceiver),
        }
    }

    fn confirm(&mut self, index: U256) -> Applied {
        let message = usize::try_from(index)
            .ok()
            .and_then(|i| self.own_messages.get_mut(i).map(|message| (i, message)));

        match message {
            Some((i, message)) if message.is_pending => {
                message.is_pending = false;
                Applied::Confirmed(i)
            }
            Some((i, _)) => Applied::AlreadyConfirmed(i),
            None => Applied::Ignored(IgnoreReason::IndexOutOfRange(index)),
        }
    }
}
