//! Payout reconciliation against existing pool accounts, and reward splitting.
use crate::block::ROUND_REWARD;
use crate::cache::{OwnerRecord, OwnerRecordCache, OwnerStore};
use crate::ledger::{Assets, LedgerClient, LedgerError, Output, OutputRef, PlannedOutput};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum PayoutError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("balance overflow for {0}")]
    Overflow(String),
}

/// New account state for one payout recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountUpdate {
    pub address: String,
    pub owner: OwnerRecord,
    /// Balance held before this round, `None` for a first payout.
    pub prior_balance: Option<u64>,
    pub balance: u64,
}

/// Inputs to consume and outputs to produce for one round's payouts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub inputs: Vec<Output>,
    pub outputs: Vec<PlannedOutput>,
    pub updates: Vec<AccountUpdate>,
}

/// Merge this round's payouts into the recipients' existing pool accounts.
///
/// A recipient whose credential owns one of `pool_outputs` has that output
/// consumed and re-created with `balance + amount`; otherwise a fresh account
/// is created holding exactly `amount`. Outputs of other miners are never
/// selected, and each existing output is consumed at most once.
pub async fn reconcile<L, S>(
    ledger: &L,
    cache: &OwnerRecordCache<S>,
    pool_address: &str,
    pool_outputs: &[Output],
    payouts: &BTreeMap<String, u64>,
    reward_asset: &str,
) -> Result<Reconciliation, PayoutError>
where
    L: LedgerClient + ?Sized,
    S: OwnerStore,
{
    let mut claimed: HashSet<&OutputRef> = HashSet::new();
    let mut rec = Reconciliation::default();

    for (address, &amount) in payouts {
        let credential = ledger.credential_of(address)?;

        let mut existing = None;
        for output in pool_outputs {
            if claimed.contains(&output.reference) {
                continue;
            }
            if let Some(owner) = cache.resolve(ledger, output).await {
                if owner.credential_hash == credential {
                    existing = Some((output, owner));
                    break;
                }
            }
        }

        let (owner, prior_balance, balance, assets) = match existing {
            Some((output, owner)) => {
                claimed.insert(&output.reference);
                rec.inputs.push(output.clone());
                let prior = output.quantity_of(reward_asset);
                let balance = prior
                    .checked_add(amount)
                    .ok_or_else(|| PayoutError::Overflow(address.clone()))?;
                let mut assets = output.assets.clone();
                assets.insert(reward_asset.to_owned(), balance);
                (owner, Some(prior), balance, assets)
            }
            None => {
                let assets = Assets::from([(reward_asset.to_owned(), amount)]);
                (OwnerRecord::new(credential), None, amount, assets)
            }
        };

        rec.outputs.push(PlannedOutput {
            address: pool_address.to_owned(),
            datum: owner.to_datum(),
            assets,
        });
        rec.updates.push(AccountUpdate {
            address: address.clone(),
            owner,
            prior_balance,
            balance,
        });
    }

    Ok(rec)
}

/// Fees withheld from the round reward before it is shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fees {
    pub pool_fee: u64,
    pub finder_fee: u64,
}

impl Default for Fees {
    fn default() -> Self {
        Self {
            pool_fee: 25_000_000,
            finder_fee: 20_000_000,
        }
    }
}

/// Share the round reward proportionally to `weights`, with a bonus for the finder.
///
/// The distributable amount is the reward minus both fees; each miner receives
/// `floor(distributable * weight / total_weight)` and the block finder also
/// receives the finder fee. Rounding dust stays with the pool.
pub fn split_reward(weights: &BTreeMap<String, u64>, finder: &str, fees: Fees) -> BTreeMap<String, u64> {
    let distributable =
        u128::from(ROUND_REWARD.saturating_sub(fees.pool_fee.saturating_add(fees.finder_fee)));
    let total: u128 = weights.values().map(|&w| u128::from(w)).sum();

    let mut payouts: BTreeMap<String, u64> = BTreeMap::new();
    if total > 0 {
        for (miner, &weight) in weights {
            let share = distributable * u128::from(weight) / total;
            if share > 0 {
                payouts.insert(miner.clone(), share as u64);
            }
        }
    }

    if fees.finder_fee > 0 {
        let entry = payouts.entry(finder.to_owned()).or_insert(0);
        *entry = entry.saturating_add(fees.finder_fee);
    }
    payouts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{account_output, MockLedger, REWARD};

    fn payouts(entries: &[(&str, u64)]) -> BTreeMap<String, u64> {
        entries.iter().map(|(a, v)| (a.to_string(), *v)).collect()
    }

    #[tokio::test]
    async fn existing_account_accumulates_balance() {
        let ledger = MockLedger::default();
        let cache = OwnerRecordCache::new();
        let pool = vec![
            account_output("aa", 0, b"alice", 700),
            account_output("aa", 1, b"bob", 50),
        ];

        let rec = reconcile(
            &ledger,
            &cache,
            MockLedger::POOL,
            &pool,
            &payouts(&[("addr_alice", 300)]),
            REWARD,
        )
        .await
        .unwrap();

        assert_eq!(rec.inputs, vec![pool[0].clone()]);
        assert_eq!(rec.updates[0].prior_balance, Some(700));
        assert_eq!(rec.updates[0].balance, 1000);
        assert_eq!(rec.outputs[0].assets[REWARD], 1000);
        assert_eq!(rec.outputs[0].datum, OwnerRecord::new(b"alice".to_vec()).to_datum());
        assert_eq!(rec.outputs[0].address, MockLedger::POOL);
    }

    #[tokio::test]
    async fn new_miner_gets_fresh_account() {
        let ledger = MockLedger::default();
        let cache = OwnerRecordCache::new();
        let pool = vec![account_output("aa", 1, b"bob", 50)];

        let rec = reconcile(
            &ledger,
            &cache,
            MockLedger::POOL,
            &pool,
            &payouts(&[("addr_carol", 42)]),
            REWARD,
        )
        .await
        .unwrap();

        assert!(rec.inputs.is_empty(), "unrelated accounts must not be spent");
        assert_eq!(rec.updates[0].owner, OwnerRecord::new(b"carol".to_vec()));
        assert_eq!(rec.updates[0].prior_balance, None);
        assert_eq!(rec.updates[0].balance, 42);
        assert_eq!(rec.outputs[0].assets, Assets::from([(REWARD.to_owned(), 42)]));
    }

    #[tokio::test]
    async fn existing_account_keeps_other_assets() {
        let ledger = MockLedger::default();
        let cache = OwnerRecordCache::new();
        let mut alice = account_output("aa", 0, b"alice", 10);
        alice.assets.insert("lovelace".into(), 2_000_000);

        let rec = reconcile(
            &ledger,
            &cache,
            MockLedger::POOL,
            &[alice],
            &payouts(&[("addr_alice", 5)]),
            REWARD,
        )
        .await
        .unwrap();
        assert_eq!(rec.outputs[0].assets["lovelace"], 2_000_000);
        assert_eq!(rec.outputs[0].assets[REWARD], 15);
    }

    #[tokio::test]
    async fn undecodable_account_is_treated_as_new() {
        let ledger = MockLedger::default();
        let cache = OwnerRecordCache::new();
        let mut alice = account_output("aa", 0, b"alice", 10);
        alice.datum = None;

        let rec = reconcile(
            &ledger,
            &cache,
            MockLedger::POOL,
            &[alice],
            &payouts(&[("addr_alice", 5)]),
            REWARD,
        )
        .await
        .unwrap();
        assert!(rec.inputs.is_empty());
        assert_eq!(rec.updates[0].balance, 5);
    }

    #[tokio::test]
    async fn unknown_credential_fails() {
        let ledger = MockLedger::default();
        let cache = OwnerRecordCache::new();
        let err = reconcile(
            &ledger,
            &cache,
            MockLedger::POOL,
            &[],
            &payouts(&[("garbage", 5)]),
            REWARD,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PayoutError::Ledger(LedgerError::Credential(_))));
    }

    #[tokio::test]
    async fn overflow_is_reported() {
        let ledger = MockLedger::default();
        let cache = OwnerRecordCache::new();
        let pool = vec![account_output("aa", 0, b"alice", u64::MAX)];
        let err = reconcile(
            &ledger,
            &cache,
            MockLedger::POOL,
            &pool,
            &payouts(&[("addr_alice", 1)]),
            REWARD,
        )
        .await
        .unwrap_err();
        assert_eq!(err, PayoutError::Overflow("addr_alice".into()));
    }

    #[test]
    fn split_reward_is_proportional_with_finder_bonus() {
        let weights = payouts(&[("addr_alice", 3), ("addr_bob", 1)]);
        let split = split_reward(&weights, "addr_bob", Fees::default());
        let distributable = ROUND_REWARD - 45_000_000;
        assert_eq!(split["addr_alice"], distributable * 3 / 4);
        assert_eq!(split["addr_bob"], distributable / 4 + 20_000_000);
        let paid: u64 = split.values().sum();
        assert!(paid <= ROUND_REWARD - 25_000_000);
    }

    #[test]
    fn split_reward_without_weights_pays_only_finder() {
        let split = split_reward(&BTreeMap::new(), "addr_dave", Fees::default());
        assert_eq!(split, payouts(&[("addr_dave", 20_000_000)]));
    }
}
