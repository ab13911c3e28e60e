#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use futures::{
    StreamExt,
    stream::{self, BoxStream},
};
use messenger_core::{
    Address, TxHash, U256,
    ledger::{CallOptions, Ledger, LedgerEvent, Transaction},
    message::RawMessage,
    wallet::{Wallet, WalletMethod},
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use thiserror::Error;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    oneshot,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct MockError(pub String);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Post {
        from: Address,
        text: String,
        receiver: Address,
        options: CallOptions,
    },
    Accept {
        from: Address,
        index: U256,
        options: CallOptions,
    },
    Deny {
        from: Address,
        index: U256,
        options: CallOptions,
    },
    ChangeNumOfPendingLimits {
        from: Address,
        limits: U256,
        options: CallOptions,
    },
}

/// Stand-in for the remote contract. Calls are only recorded; tests decide
/// when transactions settle and which events get emitted.
pub struct MockChain {
    pub owner: Address,
    pub inboxes: Mutex<HashMap<Address, Vec<RawMessage>>>,
    pub limits: Mutex<U256>,
    pub reject_next_call: Mutex<Option<String>>,
    pub fail_reads: Mutex<bool>,
    calls: Mutex<Vec<Call>>,
    unsettled: Mutex<VecDeque<oneshot::Sender<Result<(), MockError>>>>,
    events: broadcast::Sender<LedgerEvent>,
}

impl MockChain {
    pub fn new(owner: Address) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);

        Arc::new(MockChain {
            owner,
            inboxes: Mutex::new(HashMap::new()),
            limits: Mutex::new(U256::from(10)),
            reject_next_call: Mutex::new(None),
            fail_reads: Mutex::new(false),
            calls: Mutex::new(vec![]),
            unsettled: Mutex::new(VecDeque::new()),
            events,
        })
    }

    pub fn deliver(&self, receiver: Address, message: RawMessage) {
        self.inboxes.lock().entry(receiver).or_default().push(message);
    }

    pub fn emit(&self, event: LedgerEvent) {
        self.events.send(event).ok();
    }

    pub fn subscribers(&self) -> usize {
        self.events.receiver_count()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Settles the oldest submitted transaction.
    pub fn settle_next(&self, outcome: Result<(), MockError>) -> bool {
        match self.unsettled.lock().pop_front() {
            Some(sender) => sender.send(outcome).is_ok(),
            None => false,
        }
    }

    fn submit(&self, call: Call) -> Result<MockTransaction, MockError> {
        let mut calls = self.calls.lock();
        calls.push(call);

        if let Some(reason) = self.reject_next_call.lock().take() {
            return Err(MockError(reason));
        }

        let (sender, finalized) = oneshot::channel();
        self.unsettled.lock().push_back(sender);

        Ok(MockTransaction {
            hash: TxHash::with_last_byte(calls.len() as u8),
            finalized,
        })
    }

    fn check_reads(&self) -> Result<(), MockError> {
        match *self.fail_reads.lock() {
            true => Err(MockError("node unavailable".to_owned())),
            false => Ok(()),
        }
    }
}

pub struct MockTransaction {
    hash: TxHash,
    finalized: oneshot::Receiver<Result<(), MockError>>,
}

impl Transaction for MockTransaction {
    type Error = MockError;

    fn hash(&self) -> TxHash {
        self.hash
    }

    async fn wait(self) -> Result<(), MockError> {
        self.finalized
            .await
            .unwrap_or_else(|_| Err(MockError("transaction dropped".to_owned())))
    }
}

pub struct MockLedger {
    chain: Arc<MockChain>,
    account: Address,
}

impl Ledger for MockLedger {
    type Error = MockError;
    type Transaction = MockTransaction;

    async fn get_own_messages(&self) -> Result<Vec<RawMessage>, MockError> {
        self.chain.check_reads()?;
        Ok(self
            .chain
            .inboxes
            .lock()
            .get(&self.account)
            .cloned()
            .unwrap_or_default())
    }

    async fn owner(&self) -> Result<Address, MockError> {
        self.chain.check_reads()?;
        Ok(self.chain.owner)
    }

    async fn num_of_pending_limits(&self) -> Result<U256, MockError> {
        self.chain.check_reads()?;
        Ok(*self.chain.limits.lock())
    }

    async fn post(
        &self,
        text: &str,
        receiver: Address,
        options: CallOptions,
    ) -> Result<MockTransaction, MockError> {
        self.chain.submit(Call::Post {
            from: self.account,
            text: text.to_owned(),
            receiver,
            options,
        })
    }

    async fn accept(
        &self,
        index: U256,
        options: CallOptions,
    ) -> Result<MockTransaction, MockError> {
        self.chain.submit(Call::Accept {
            from: self.account,
            index,
            options,
        })
    }

    async fn deny(
        &self,
        index: U256,
        options: CallOptions,
    ) -> Result<MockTransaction, MockError> {
        self.chain.submit(Call::Deny {
            from: self.account,
            index,
            options,
        })
    }

    async fn change_num_of_pending_limits(
        &self,
        limits: U256,
        options: CallOptions,
    ) -> Result<MockTransaction, MockError> {
        self.chain.submit(Call::ChangeNumOfPendingLimits {
            from: self.account,
            limits,
            options,
        })
    }

    fn subscribe(&self) -> BoxStream<'static, LedgerEvent> {
        stream::unfold(self.chain.events.subscribe(), |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => return Some((event, receiver)),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }
}

pub struct MockWallet {
    chain: Arc<MockChain>,
    pub accounts: Mutex<Value>,
    pub requests: Arc<Mutex<Vec<WalletMethod>>>,
    pub contracts: Arc<Mutex<Vec<(Address, Address)>>>,
}

impl MockWallet {
    pub fn new(chain: &Arc<MockChain>, accounts: &[Address]) -> Self {
        MockWallet {
            chain: Arc::clone(chain),
            accounts: Mutex::new(json!(accounts)),
            requests: Arc::new(Mutex::new(vec![])),
            contracts: Arc::new(Mutex::new(vec![])),
        }
    }
}

impl Wallet for MockWallet {
    type Error = MockError;
    type Ledger = MockLedger;

    async fn request(&self, method: WalletMethod) -> Result<Value, MockError> {
        self.requests.lock().push(method);
        let accounts = self.accounts.lock().clone();
        Ok(accounts)
    }

    fn contract(&self, address: Address, account: Address) -> Result<MockLedger, MockError> {
        self.contracts.lock().push((address, account));
        Ok(MockLedger {
            chain: Arc::clone(&self.chain),
            account,
        })
    }
}
