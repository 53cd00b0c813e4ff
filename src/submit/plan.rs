use crate::block::{Transition, ROUND_REWARD};
use crate::config::PoolConfig;
use crate::datum::Datum;
use crate::ledger::{Assets, Output, PlannedOutput, TransactionPlan};
use crate::payout::Reconciliation;

/// Spend redeemer for the validator output: `Constr 1 [nonce]`.
pub fn validator_redeemer(nonce: &[u8]) -> Datum {
    Datum::constr(1, vec![Datum::bytes(nonce.to_vec())])
}

/// Spend redeemer for pool-account outputs: `Constr 1 [Constr 0 []]`.
pub fn account_redeemer() -> Datum {
    Datum::constr(1, vec![Datum::unit(0)])
}

/// Assemble the transaction for one mined block.
///
/// The validator output is re-created at the validator address with the new
/// block datum and the authority token, and exactly one round reward is minted.
pub fn build(
    config: &PoolConfig,
    nonce: &[u8],
    validator_input: Output,
    transition: &Transition,
    reconciliation: Reconciliation,
) -> TransactionPlan {
    let network = config.network;
    TransactionPlan {
        validator_input,
        validator_redeemer: validator_redeemer(nonce),
        account_inputs: reconciliation.inputs,
        account_redeemer: account_redeemer(),
        validator_output: PlannedOutput {
            address: network.validator_address().to_owned(),
            datum: transition.state.to_datum(),
            assets: Assets::from([(network.authority_asset(), 1)]),
        },
        account_outputs: reconciliation.outputs,
        mint: Assets::from([(network.reward_asset(), ROUND_REWARD)]),
        mint_redeemer: Datum::unit(0),
        authority_token: config.pool_authority_asset(),
        script_reference: config.pool_script_reference.clone(),
        validity: transition.validity,
    }
}
