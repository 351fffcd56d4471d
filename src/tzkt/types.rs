/// TzKT payload types
///
/// Mirrors `GET /v1/operations/delegations`. Only a handful of fields feed the
/// indexer; the rest are decoded so that records can be logged in full.
use serde::Deserialize;

/// An account reference as embedded in operations
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub address: String,
}

/// One delegation operation as returned by TzKT
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TzktDelegation {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub level: i64,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub block: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub counter: i64,
    #[serde(default)]
    pub initiator: Option<Account>,
    #[serde(default)]
    pub sender: Option<Account>,
    #[serde(default)]
    pub gas_limit: i64,
    #[serde(default)]
    pub gas_used: i64,
    #[serde(default)]
    pub storage_limit: i64,
    #[serde(default)]
    pub baker_fee: i64,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub prev_delegate: Option<Account>,
    #[serde(default)]
    pub new_delegate: Option<Account>,
    #[serde(default)]
    pub status: String,
}

impl TzktDelegation {
    /// Sender address, if the record carries a non-empty one
    pub fn sender_address(&self) -> Option<&str> {
        self.sender.as_ref().map(|a| a.address.as_str()).filter(|a| !a.is_empty())
    }
}
