use crate::block::BlockState;
use crate::cache::{spawn_hydration, MokaOwnerStore, OwnerRecordCache, OwnerStore};
use crate::config::PoolConfig;
use crate::error::SubmitError;
use crate::interlink::qualifying_levels;
use crate::ledger::{LedgerClient, Output, TxId};
use crate::payout::reconcile;
use crate::report::{ProofReport, SubmissionResponse, ValidatedReport};
use crate::submit::plan;
use crate::time::{SystemTimeProvider, TimeProvider};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Attempts per submission, the first included.
pub const MAX_ATTEMPTS: u32 = 2;

/// A block accepted by the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitted {
    pub tx_id: TxId,
    /// Block state written by the transaction.
    pub state: BlockState,
    pub attempts: u32,
}

/// Turns validated proof reports into submitted block transactions.
///
/// Every attempt re-reads the live validator and pool-account outputs, so a
/// retry never reuses state that may have been spent in the meantime.
pub struct SubmissionOrchestrator<L, S = MokaOwnerStore, T = SystemTimeProvider>
where
    L: LedgerClient + ?Sized,
    S: OwnerStore,
    T: TimeProvider,
{
    config: PoolConfig,
    ledger: Arc<L>,
    cache: Arc<OwnerRecordCache<S>>,
    time_provider: Arc<T>,
}

impl<L, S, T> SubmissionOrchestrator<L, S, T>
where
    L: LedgerClient + ?Sized + 'static,
    S: OwnerStore + 'static,
    T: TimeProvider + 'static,
{
    pub fn new(
        config: PoolConfig,
        ledger: Arc<L>,
        cache: Arc<OwnerRecordCache<S>>,
        time_provider: Arc<T>,
    ) -> Self {
        Self {
            config,
            ledger,
            cache,
            time_provider,
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<OwnerRecordCache<S>> {
        &self.cache
    }

    /// Keep the owner-record cache warm from the pool address.
    pub fn spawn_hydration(&self) -> JoinHandle<()> {
        spawn_hydration(
            self.cache.clone(),
            self.ledger.clone(),
            self.config.pool_address.clone(),
            self.config.hydration_interval,
        )
    }

    /// Handle a JSON request body. Unparseable bodies are a bad request.
    pub async fn handle_json(&self, body: &[u8]) -> SubmissionResponse {
        match ProofReport::from_json(body) {
            Ok(report) => self.handle(report).await,
            Err(err) => {
                warn!(error = %err, "rejecting unparseable proof report");
                SubmissionResponse::bad_request()
            }
        }
    }

    /// Handle one raw report end to end.
    ///
    /// Malformed reports get a 400; any failure after validation gets a 500
    /// naming the proof hash. Failure details only go to the log.
    pub async fn handle(&self, report: ProofReport) -> SubmissionResponse {
        let report = match report.validate() {
            Ok(report) => report,
            Err(err) => {
                warn!(error = %err, "rejecting malformed proof report");
                return SubmissionResponse::bad_request();
            }
        };

        let hash = report.proof_hash_hex();
        match self.submit(&report).await {
            Ok(submitted) => SubmissionResponse::submitted(&hash, submitted.tx_id.0),
            Err(err) => {
                error!(hash = %hash, status = err.status_code(), error = %err, "submission failed");
                SubmissionResponse::failed(&hash)
            }
        }
    }

    /// Submit a validated report, retrying once if the ledger does not answer in time.
    ///
    /// Only a submission timeout is retried. Ledger rejections, missing
    /// validator state and reconciliation failures end the submission at once.
    pub async fn submit(&self, report: &ValidatedReport) -> Result<Submitted, SubmitError> {
        let hash = report.proof_hash_hex();

        let mut attempt = 1;
        loop {
            debug!(hash = %hash, attempt, "submitting block");
            match self.attempt(report, attempt).await {
                Ok((tx_id, state)) => {
                    info!(
                        hash = %hash,
                        tx = %tx_id,
                        block = state.block_number,
                        attempt,
                        "block submitted"
                    );
                    return Ok(Submitted {
                        tx_id,
                        state,
                        attempts: attempt,
                    });
                }
                Err(err) if err.is_transient() && attempt < MAX_ATTEMPTS => {
                    warn!(
                        hash = %hash,
                        attempt,
                        timeout_ms = self.config.submit_timeout.as_millis() as u64,
                        "ledger did not confirm submission in time"
                    );
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_transient() {
                        warn!(hash = %hash, attempts = attempt, "giving up on submission");
                    }
                    return Err(err);
                }
            }
        }
    }

    /// One pass over live state, numbered `attempt`.
    async fn attempt(
        &self,
        report: &ValidatedReport,
        attempt: u32,
    ) -> Result<(TxId, BlockState), SubmitError> {
        let now = self.time_provider.now_millis();
        let transition = report.prior.advance(&report.proof_hash, now);

        if transition.achieved != report.claimed {
            warn!(
                claimed = ?report.claimed,
                decoded = ?transition.achieved,
                "claimed difficulty differs from hash, using decoded value"
            );
        }
        if !transition.achieved.meets(&report.prior.difficulty) {
            warn!(
                achieved = ?transition.achieved,
                target = ?report.prior.difficulty,
                "hash does not beat the current target"
            );
        }
        if let Some(adjustment) = transition.adjustment {
            info!(
                block = transition.state.block_number,
                numerator = adjustment.numerator,
                denominator = adjustment.denominator,
                difficulty = ?transition.state.difficulty,
                "epoch boundary, difficulty retargeted"
            );
        }
        debug!(
            levels = qualifying_levels(transition.achieved, report.prior.difficulty),
            interlink_len = transition.state.interlink.len(),
            "checkpoint chain extended"
        );

        let validator = self.locate_validator().await?;
        let pool_outputs = self.ledger.outputs_at(&self.config.pool_address).await?;
        let reconciliation = reconcile(
            self.ledger.as_ref(),
            &self.cache,
            &self.config.pool_address,
            &pool_outputs,
            &report.payouts,
            &self.config.network.reward_asset(),
        )
        .await?;
        debug!(
            recipients = reconciliation.updates.len(),
            consumed = reconciliation.inputs.len(),
            "payouts reconciled"
        );

        let tx = plan::build(
            &self.config,
            &report.nonce,
            validator,
            &transition,
            reconciliation,
        );

        match tokio::time::timeout(self.config.submit_timeout, self.ledger.submit(tx)).await {
            Ok(Ok(tx_id)) => Ok((tx_id, transition.state)),
            Ok(Err(err)) => Err(err.into()),
            Err(_elapsed) => Err(SubmitError::TimedOut { attempts: attempt }),
        }
    }

    /// The live validator output: the one at the validator address holding the authority token.
    async fn locate_validator(&self) -> Result<Output, SubmitError> {
        let network = self.config.network;
        let address = network.validator_address();
        let asset = network.authority_asset();

        self.ledger
            .outputs_at(address)
            .await?
            .into_iter()
            .find(|output| output.quantity_of(&asset) >= 1)
            .ok_or_else(|| SubmitError::MissingValidatorOutput {
                address: address.to_owned(),
                asset,
            })
    }
}
