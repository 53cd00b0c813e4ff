//! Shared fixtures for unit tests: an in-memory ledger client and output builders.
use crate::block::BlockState;
use crate::cache::OwnerRecord;
use crate::config::{LedgerEndpoints, Network, PoolConfig};
use crate::ledger::{Assets, LedgerClient, LedgerError, Output, OutputRef, TransactionPlan, TxId};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Preview reward asset id.
pub const REWARD: &str = "502fbfbdafc7ddada9c335bd1440781e5445d08bada77dc2032866a654554e41";

/// How the mock answers the next `submit` call.
#[derive(Debug, Clone)]
pub enum SubmitBehavior {
    Accept,
    Hang,
    Fail(LedgerError),
}

#[derive(Default)]
struct State {
    outputs: HashMap<String, Vec<Output>>,
    behaviors: VecDeque<SubmitBehavior>,
    plans: Vec<TransactionPlan>,
    respend: Option<Vec<Output>>,
    fail_queries: bool,
}

/// Ledger client answering from in-memory outputs.
///
/// Addresses of the form `addr_<name>` have credential `<name>`; submissions
/// are accepted as `tx<n>` unless a behavior was queued.
#[derive(Default)]
pub struct MockLedger {
    state: Mutex<State>,
    decode_calls: AtomicUsize,
    submit_calls: AtomicUsize,
}

impl MockLedger {
    pub const POOL: &'static str = "addr_pool";

    pub fn set_outputs(&self, address: &str, outputs: Vec<Output>) {
        self.state.lock().unwrap().outputs.insert(address.to_owned(), outputs);
    }

    pub fn set_pool_outputs(&self, outputs: Vec<Output>) {
        self.set_outputs(Self::POOL, outputs);
    }

    /// Replace the pool outputs with `outputs` on the next submit call,
    /// as if another transaction had spent them concurrently.
    pub fn spend_pool_outputs_on_submit(&self, outputs: Vec<Output>) {
        self.state.lock().unwrap().respend = Some(outputs);
    }

    pub fn fail_queries(&self, fail: bool) {
        self.state.lock().unwrap().fail_queries = fail;
    }

    pub fn push_behavior(&self, behavior: SubmitBehavior) {
        self.state.lock().unwrap().behaviors.push_back(behavior);
    }

    pub fn decode_calls(&self) -> usize {
        self.decode_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn plans(&self) -> Vec<TransactionPlan> {
        self.state.lock().unwrap().plans.clone()
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn outputs_at(&self, address: &str) -> Result<Vec<Output>, LedgerError> {
        let state = self.state.lock().unwrap();
        if state.fail_queries {
            return Err(LedgerError::Query(format!("{address} unreachable")));
        }
        Ok(state.outputs.get(address).cloned().unwrap_or_default())
    }

    fn credential_of(&self, address: &str) -> Result<Vec<u8>, LedgerError> {
        address
            .strip_prefix("addr_")
            .filter(|name| !name.is_empty())
            .map(|name| name.as_bytes().to_vec())
            .ok_or_else(|| LedgerError::Credential(address.to_owned()))
    }

    async fn owner_record_of(&self, output: &Output) -> Result<Option<OwnerRecord>, LedgerError> {
        self.decode_calls.fetch_add(1, Ordering::SeqCst);
        Ok(output
            .datum
            .as_ref()
            .and_then(|d| OwnerRecord::from_datum(d).ok()))
    }

    async fn submit(&self, plan: TransactionPlan) -> Result<TxId, LedgerError> {
        let n = self.submit_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let behavior = {
            let mut state = self.state.lock().unwrap();
            state.plans.push(plan);
            if let Some(outputs) = state.respend.take() {
                state.outputs.insert(Self::POOL.to_owned(), outputs);
            }
            state.behaviors.pop_front().unwrap_or(SubmitBehavior::Accept)
        };

        match behavior {
            SubmitBehavior::Accept => Ok(TxId(format!("tx{n}"))),
            SubmitBehavior::Hang => std::future::pending().await,
            SubmitBehavior::Fail(err) => Err(err),
        }
    }
}

/// Pool-account output at [`MockLedger::POOL`] owned by `owner`.
pub fn account_output(tx: &str, index: u64, owner: &[u8], balance: u64) -> Output {
    Output {
        reference: OutputRef::new(tx, index),
        address: MockLedger::POOL.to_owned(),
        assets: Assets::from([(REWARD.to_owned(), balance)]),
        datum: Some(OwnerRecord::new(owner).to_datum()),
        script: None,
    }
}

/// Live preview validator output carrying `block`.
pub fn validator_output(block: &BlockState) -> Output {
    let network = Network::Preview;
    Output {
        reference: OutputRef::new("validator", 0),
        address: network.validator_address().to_owned(),
        assets: Assets::from([(network.authority_asset(), 1)]),
        datum: Some(block.to_datum()),
        script: None,
    }
}

pub fn preview_config() -> PoolConfig {
    PoolConfig::builder()
        .network(Network::Preview)
        .endpoints(LedgerEndpoints {
            kupo_url: "http://localhost:1442".into(),
            ogmios_url: "ws://localhost:1337".into(),
        })
        .pool_address(MockLedger::POOL)
        .pool_script_hash("abcdef01")
        .pool_script_reference(OutputRef::new("deadbeef", 0))
        .build()
        .expect("valid test config")
}

#[test]
fn reward_constant_matches_network() {
    assert_eq!(REWARD, Network::Preview.reward_asset());
}
