use alloy_primitives::{Address, TxHash, U256};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::message::RawMessage;

pub const DEFAULT_GAS_LIMIT: u64 = 300_000;

/// Everything the ledger emits that the mirror cares about.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum LedgerEvent {
    NewMessage(RawMessage),
    MessageConfirmed { receiver: Address, index: U256 },
    NumOfPendingLimitsChanged(U256),
}

/// Authoritative state of one account's view, read in one go.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub messages: Vec<RawMessage>,
    pub owner: Address,
    pub num_of_pending_limits: U256,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallOptions {
    pub gas_limit: u64,
    pub value: Option<U256>,
}

impl CallOptions {
    pub fn new(gas_limit: u64) -> Self {
        Self {
            gas_limit,
            value: None,
        }
    }

    pub fn with_value(self, value: U256) -> Self {
        Self {
            value: Some(value),
            ..self
        }
    }
}

impl Default for CallOptions {
    fn default() -> Self {
        Self::new(DEFAULT_GAS_LIMIT)
    }
}

/// A submitted call. `wait` resolves once the network has settled it.
#[trait_variant::make(Transaction: Send)]
pub trait LocalTransaction {
    type Error;

    fn hash(&self) -> TxHash;

    async fn wait(self) -> Result<(), Self::Error>;
}

/// A contract handle bound to one signing account.
#[trait_variant::make(Ledger: Send)]
pub trait LocalLedger {
    type Error: std::error::Error + Send + Sync + 'static;
    type Transaction: Transaction<Error = Self::Error> + Send + 'static;

    async fn get_own_messages(&self) -> Result<Vec<RawMessage>, Self::Error>;

    async fn owner(&self) -> Result<Address, Self::Error>;

    async fn num_of_pending_limits(&self) -> Result<U256, Self::Error>;

    async fn post(
        &self,
        text: &str,
        receiver: Address,
        options: CallOptions,
    ) -> Result<Self::Transaction, Self::Error>;

    async fn accept(&self, index: U256, options: CallOptions)
    -> Result<Self::Transaction, Self::Error>;

    async fn deny(&self, index: U256, options: CallOptions)
    -> Result<Self::Transaction, Self::Error>;

    async fn change_num_of_pending_limits(
        &self,
        limits: U256,
        options: CallOptions,
    ) -> Result<Self::Transaction, Self::Error>;

    /// Opens a live feed of ledger events. Dropping the stream unsubscribes.
    fn subscribe(&self) -> BoxStream<'static, LedgerEvent>;
}

/// Reads owner, pending limit and the account's messages.
pub async fn fetch_snapshot<L: Ledger + Sync>(ledger: &L) -> Result<LedgerSnapshot, L::Error> {
    let messages = ledger.get_own_messages().await?;
    let owner = ledger.owner().await?;
    let num_of_pending_limits = ledger.num_of_pending_limits().await?;

    Ok(LedgerSnapshot {
        messages,
        owner,
        num_of_pending_limits,
    })
}
