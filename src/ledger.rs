//! Interface to the ledger client.
//!
//! The client owns everything chain-specific: address and credential handling,
//! datum serialization, coin selection, fee computation, signing and script
//! evaluation. This crate only describes *what* a submission must consume and
//! produce via [`TransactionPlan`].
use crate::block::ValidityWindow;
use crate::cache::OwnerRecord;
use crate::datum::Datum;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Asset quantities keyed by asset id (policy hex followed by name hex).
pub type Assets = BTreeMap<String, u64>;

/// Build an asset id from a policy id and a plain-text asset name.
pub fn asset_id(policy: &str, name: &str) -> String {
    format!("{policy}{}", hex::encode(name))
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("ledger query failed: {0}")]
    Query(String),
    #[error("no payment credential for address {0}")]
    Credential(String),
    #[error("transaction build failed: {0}")]
    Build(String),
    #[error("transaction rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("malformed output reference {0:?}, expected <tx>#<index>")]
pub struct OutputRefParseError(pub String);

/// Reference to a ledger output: producing transaction and output index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutputRef {
    pub tx_id: String,
    pub index: u64,
}

impl OutputRef {
    pub fn new(tx_id: impl Into<String>, index: u64) -> Self {
        Self {
            tx_id: tx_id.into(),
            index,
        }
    }
}

impl Display for OutputRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.tx_id, self.index)
    }
}

impl FromStr for OutputRef {
    type Err = OutputRefParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || OutputRefParseError(s.to_owned());
        let (tx_id, index) = s.split_once('#').ok_or_else(malformed)?;
        if tx_id.is_empty() {
            return Err(malformed());
        }
        let index = index.parse().map_err(|_| malformed())?;
        Ok(OutputRef::new(tx_id, index))
    }
}

/// An unspent output as reported by the ledger client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub reference: OutputRef,
    pub address: String,
    pub assets: Assets,
    pub datum: Option<Datum>,
    pub script: Option<Vec<u8>>,
}

impl Output {
    pub fn quantity_of(&self, asset: &str) -> u64 {
        self.assets.get(asset).copied().unwrap_or(0)
    }
}

/// Identifier of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(pub String);

impl Display for TxId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An output the transaction must create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedOutput {
    pub address: String,
    pub datum: Datum,
    pub assets: Assets,
}

/// Everything the ledger client needs to build, sign and submit one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPlan {
    /// Singleton validator output holding the authority token.
    pub validator_input: Output,
    pub validator_redeemer: Datum,
    /// Pool-account outputs of this round's recipients only.
    pub account_inputs: Vec<Output>,
    pub account_redeemer: Datum,
    pub validator_output: PlannedOutput,
    pub account_outputs: Vec<PlannedOutput>,
    pub mint: Assets,
    pub mint_redeemer: Datum,
    /// Pool authority token the wallet spends and takes back.
    pub authority_token: String,
    pub script_reference: OutputRef,
    pub validity: ValidityWindow,
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Unspent outputs currently sitting at `address`.
    async fn outputs_at(&self, address: &str) -> Result<Vec<Output>, LedgerError>;

    /// Payment credential hash controlling `address`.
    fn credential_of(&self, address: &str) -> Result<Vec<u8>, LedgerError>;

    /// Decode the owner record attached to a pool-account output.
    ///
    /// `Ok(None)` means the output carries no usable record.
    async fn owner_record_of(&self, output: &Output) -> Result<Option<OwnerRecord>, LedgerError> {
        Ok(output
            .datum
            .as_ref()
            .and_then(|d| OwnerRecord::from_datum(d).ok()))
    }

    /// Build, sign and submit the planned transaction.
    async fn submit(&self, plan: TransactionPlan) -> Result<TxId, LedgerError>;
}
