use crate::ledger::LedgerError;
use crate::payout::PayoutError;
use crate::report::ReportError;

/// Failure of a single proof submission.
///
/// Only [`SubmitError::Report`] is the caller's fault; everything else is a
/// server-side failure. Messages here are for logs, not for callers.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("invalid report: {0}")]
    Report(#[from] ReportError),
    #[error("no output holding {asset} at validator address {address}")]
    MissingValidatorOutput { address: String, asset: String },
    #[error("payout reconciliation failed: {0}")]
    Payout(#[from] PayoutError),
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("submission timed out after {attempts} attempts")]
    TimedOut { attempts: u32 },
}

impl SubmitError {
    /// HTTP-style status for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            SubmitError::Report(_) => 400,
            _ => 500,
        }
    }

    /// Whether a fresh attempt could succeed without operator action.
    ///
    /// Only a submit timeout qualifies; the orchestrator retries on it.
    pub fn is_transient(&self) -> bool {
        matches!(self, SubmitError::TimedOut { .. })
    }
}
