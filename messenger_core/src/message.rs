use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::units::{ConvertError, timestamp_from_seconds};

/// A message as the mirror holds it. Its index is its position in the
/// receiver's list, which is the index the ledger confirms it by.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub sender: Address,
    pub receiver: Address,
    pub deposit_in_wei: U256,
    pub timestamp: DateTime<Utc>,
    pub text: String,
    pub is_pending: bool,
}

/// A message record exactly as the ledger returns or emits it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RawMessage {
    pub sender: Address,
    pub receiver: Address,
    pub deposit_in_wei: U256,
    pub timestamp: U256,
    pub text: String,
    pub is_pending: bool,
}

impl TryFrom<RawMessage> for Message {
    type Error = ConvertError;

    fn try_from(raw: RawMessage) -> Result<Self, Self::Error> {
        Ok(Message {
            timestamp: timestamp_from_seconds(raw.timestamp)?,
            sender: raw.sender,
            receiver: raw.receiver,
            deposit_in_wei: raw.deposit_in_wei,
            text: raw.text,
            is_pending: raw.is_pending,
        })
    }
}
