//! Proof submission: validation, block advance, payout reconciliation and
//! bounded-retry transaction submission.
mod orchestrator;
pub mod plan;

pub use orchestrator::{Submitted, SubmissionOrchestrator, MAX_ATTEMPTS};
