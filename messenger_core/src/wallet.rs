use std::str::FromStr;

use alloy_primitives::Address;
use serde_json::Value;
use tracing::warn;

use crate::ledger::Ledger;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalletMethod {
    /// Accounts already authorized for this client, without prompting.
    Accounts,
    /// Ask the user to authorize an account.
    RequestAccounts,
}

impl WalletMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletMethod::Accounts => "eth_accounts",
            WalletMethod::RequestAccounts => "eth_requestAccounts",
        }
    }
}

/// A wallet provider: hands out accounts and builds signing contract handles.
#[trait_variant::make(Wallet: Send)]
pub trait LocalWallet {
    type Error: std::error::Error + Send + Sync + 'static;
    type Ledger: Ledger + Sync + 'static;

    async fn request(&self, method: WalletMethod) -> Result<Value, Self::Error>;

    fn contract(&self, address: Address, account: Address) -> Result<Self::Ledger, Self::Error>;
}

/// Reads a provider's account list. Anything that is not an array of
/// addresses counts as no accounts at all.
pub fn accounts_from_response(response: &Value) -> Vec<Address> {
    let Some(entries) = response.as_array() else {
        warn!(%response, "accounts is not an array");
        return vec![];
    };

    let accounts: Option<Vec<Address>> = entries
        .iter()
        .map(|entry| entry.as_str().and_then(|s| Address::from_str(s).ok()))
        .collect();

    accounts.unwrap_or_else(|| {
        warn!(%response, "accounts contains something that is not an address");
        vec![]
    })
}
