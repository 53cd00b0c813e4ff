//! Block submission engine for a proof-of-work mining pool.
//!
//! A miner's proof report is validated, the validator's block state is
//! advanced (difficulty, epoch retarget, checkpoint chain), this round's
//! payouts are merged into the miners' pool accounts and the resulting
//! transaction plan is handed to a [`LedgerClient`] with a bounded retry.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use tunapool::{LedgerClient, OwnerRecordCache, PoolConfig, SubmissionOrchestrator, SystemTimeProvider};
//! # async fn run<L: LedgerClient + 'static>(ledger: Arc<L>, report: tunapool::ProofReport) {
//! let config = PoolConfig::from_env().expect("pool configuration");
//! let orchestrator = SubmissionOrchestrator::new(
//!     config,
//!     ledger,
//!     Arc::new(OwnerRecordCache::new()),
//!     Arc::new(SystemTimeProvider),
//! );
//! let _hydration = orchestrator.spawn_hydration();
//! let response = orchestrator.handle(report).await;
//! println!("{} {}", response.status, response.body.message);
//! # }
//! ```
pub mod block;
pub mod cache;
pub mod codec;
pub mod config;
pub mod datum;
pub mod error;
pub mod interlink;
pub mod ledger;
pub mod payout;
pub mod report;
pub mod retarget;
pub mod submit;
pub mod time;
pub mod types;

#[cfg(test)]
mod testing;

pub use block::{BlockState, ReadableBlock, Transition, ValidityWindow};
pub use cache::{MokaOwnerStore, OwnerRecord, OwnerRecordCache, OwnerStore};
pub use codec::{decode, halve};
pub use config::{ConfigError, LedgerEndpoints, Network, PoolConfig, PoolConfigBuilder};
pub use datum::{Datum, DatumError};
pub use error::SubmitError;
pub use interlink::CheckpointChain;
pub use ledger::{LedgerClient, LedgerError, Output, OutputRef, TransactionPlan, TxId};
pub use payout::{reconcile, split_reward, Fees, PayoutError, Reconciliation};
pub use report::{ProofReport, ReportError, SubmissionResponse, ValidatedReport};
pub use retarget::{adjustment_ratio, retarget, Adjustment};
pub use submit::{SubmissionOrchestrator, Submitted};
pub use time::{SystemTimeProvider, TimeProvider};
pub use types::Difficulty;
