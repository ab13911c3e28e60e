use alloy_primitives::{
    U256,
    utils::{format_ether, parse_ether},
};
use chrono::{DateTime, Utc};
use thiserror::Error;

const MILLIS_PER_SECOND: u64 = 1000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    #[error("timestamp {0} does not fit a millisecond date")]
    TimestampOutOfRange(U256),
    #[error("cannot read \"{0}\" as an ether amount")]
    InvalidEtherAmount(String),
}

/// Ledger timestamps are whole seconds since the unix epoch. They are widened
/// to milliseconds before building the date, so `t` maps to exactly `t * 1000`
/// milliseconds and no rounding ever happens.
pub fn timestamp_from_seconds(seconds: U256) -> Result<DateTime<Utc>, ConvertError> {
    let out_of_range = || ConvertError::TimestampOutOfRange(seconds);

    let seconds = u64::try_from(seconds).map_err(|_| out_of_range())?;
    let millis = seconds
        .checked_mul(MILLIS_PER_SECOND)
        .and_then(|millis| i64::try_from(millis).ok())
        .ok_or_else(out_of_range)?;

    DateTime::from_timestamp_millis(millis).ok_or_else(out_of_range)
}

pub fn wei_from_ether(ether: &str) -> Result<U256, ConvertError> {
    parse_ether(ether.trim()).map_err(|_| ConvertError::InvalidEtherAmount(ether.to_owned()))
}

pub fn ether_from_wei(wei: U256) -> String {
    format_ether(wei)
}
