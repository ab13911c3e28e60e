pub mod ledger;
pub mod message;
pub mod mirror;
pub mod units;
pub mod wallet;

pub use alloy_primitives::{Address, TxHash, U256};
