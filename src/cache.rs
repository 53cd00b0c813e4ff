use crate::datum::{Datum, DatumError};
use crate::ledger::{LedgerClient, LedgerError, Output, OutputRef};
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Identity bound to a pool-account output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerRecord {
    pub credential_hash: Vec<u8>,
}

impl OwnerRecord {
    pub fn new(credential_hash: impl Into<Vec<u8>>) -> Self {
        Self {
            credential_hash: credential_hash.into(),
        }
    }

    /// Encode as `Constr 0 [credential_hash]`.
    pub fn to_datum(&self) -> Datum {
        Datum::constr(0, vec![Datum::bytes(self.credential_hash.clone())])
    }

    pub fn from_datum(datum: &Datum) -> Result<Self, DatumError> {
        let fields = datum.expect_constr(0, 1, "owner")?;
        Ok(Self::new(fields[0].as_bytes("owner_vkh")?))
    }
}

/// Storage backing the owner-record cache.
///
/// Entries are keyed by immutable output references, so writes are idempotent
/// and implementations only need atomic single-entry inserts.
pub trait OwnerStore: Send + Sync {
    fn get(&self, reference: &OutputRef) -> Option<OwnerRecord>;
    fn insert(&self, reference: OutputRef, record: OwnerRecord);
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Unbounded in-memory store backed by `moka::sync::Cache`.
#[derive(Debug, Clone)]
pub struct MokaOwnerStore {
    inner: Cache<OutputRef, OwnerRecord>,
}

impl MokaOwnerStore {
    pub fn new() -> Self {
        Self {
            inner: Cache::builder().build(),
        }
    }
}

impl Default for MokaOwnerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl OwnerStore for MokaOwnerStore {
    fn get(&self, reference: &OutputRef) -> Option<OwnerRecord> {
        self.inner.get(reference)
    }

    fn insert(&self, reference: OutputRef, record: OwnerRecord) {
        self.inner.insert(reference, record);
    }

    fn len(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }
}

/// Outcome of one hydration pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HydrationReport {
    pub outputs: usize,
    pub newly_resolved: usize,
    pub unresolved: usize,
}

/// Read-through cache from pool-account outputs to their owner records.
///
/// Only successful decodes are stored; an output whose record cannot be read
/// stays unresolved and is retried on the next lookup or hydration.
#[derive(Debug, Default)]
pub struct OwnerRecordCache<S: OwnerStore = MokaOwnerStore> {
    store: S,
}

impl OwnerRecordCache<MokaOwnerStore> {
    pub fn new() -> Self {
        Self::with_store(MokaOwnerStore::new())
    }
}

impl<S: OwnerStore> OwnerRecordCache<S> {
    pub fn with_store(store: S) -> Self {
        Self { store }
    }

    /// Cached record for `reference`, without touching the ledger.
    pub fn get(&self, reference: &OutputRef) -> Option<OwnerRecord> {
        self.store.get(reference)
    }

    pub fn len(&self) -> u64 {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Owner record of `output`, decoding through the ledger client on a miss.
    pub async fn resolve<L>(&self, ledger: &L, output: &Output) -> Option<OwnerRecord>
    where
        L: LedgerClient + ?Sized,
    {
        if let Some(record) = self.store.get(&output.reference) {
            return Some(record);
        }

        match ledger.owner_record_of(output).await {
            Ok(Some(record)) => {
                self.store.insert(output.reference.clone(), record.clone());
                Some(record)
            }
            Ok(None) => {
                debug!(output = %output.reference, "output carries no owner record");
                None
            }
            Err(err) => {
                debug!(output = %output.reference, error = %err, "owner record decode failed");
                None
            }
        }
    }

    /// Resolve every output currently at `address`.
    pub async fn hydrate<L>(&self, ledger: &L, address: &str) -> Result<HydrationReport, LedgerError>
    where
        L: LedgerClient + ?Sized,
    {
        let outputs = ledger.outputs_at(address).await?;
        let mut report = HydrationReport {
            outputs: outputs.len(),
            ..HydrationReport::default()
        };

        for output in &outputs {
            if self.store.get(&output.reference).is_some() {
                continue;
            }
            match self.resolve(ledger, output).await {
                Some(_) => report.newly_resolved += 1,
                None => report.unresolved += 1,
            }
        }

        debug!(
            outputs = report.outputs,
            newly_resolved = report.newly_resolved,
            unresolved = report.unresolved,
            "owner record cache hydrated"
        );
        Ok(report)
    }
}

/// Hydrate `cache` from `address` every `every`, starting immediately.
///
/// Failed passes are logged and retried on the next tick.
pub fn spawn_hydration<S, L>(
    cache: Arc<OwnerRecordCache<S>>,
    ledger: Arc<L>,
    address: String,
    every: Duration,
) -> JoinHandle<()>
where
    S: OwnerStore + 'static,
    L: LedgerClient + ?Sized + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(err) = cache.hydrate(ledger.as_ref(), &address).await {
                warn!(error = %err, "owner record cache hydration failed");
            }
        }
    })
}
