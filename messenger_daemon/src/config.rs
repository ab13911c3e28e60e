use alloy_primitives::{Address, address};
use messenger_core::ledger::{CallOptions, DEFAULT_GAS_LIMIT};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONTRACT_ADDRESS: Address = address!("dAF902975EcB97D23c6Da8668b166A57378fDFa3");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("toml error: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("gas limit must be greater than zero")]
    ZeroGasLimit,
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DaemonConfig {
    #[serde(default = "default_contract_address")]
    pub contract_address: Address,
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
}

impl DaemonConfig {
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: DaemonConfig = toml::from_str(toml_str)?;

        if config.gas_limit == 0 {
            return Err(ConfigError::ZeroGasLimit);
        }

        Ok(config)
    }

    pub(crate) fn call_options(&self) -> CallOptions {
        CallOptions::new(self.gas_limit)
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            contract_address: DEFAULT_CONTRACT_ADDRESS,
            gas_limit: DEFAULT_GAS_LIMIT,
        }
    }
}

fn default_contract_address() -> Address {
    DEFAULT_CONTRACT_ADDRESS
}

fn default_gas_limit() -> u64 {
    DEFAULT_GAS_LIMIT
}
