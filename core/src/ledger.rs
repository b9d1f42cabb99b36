//! Payment ledger reader: batched, best-effort lookup of collected
//! amounts, payment dates and payment methods.
//!
//! Design:
//!   - Users are split into sub-batches of `batch_size`.
//!   - Lookups inside a sub-batch run concurrently; sub-batches run in order.
//!   - Every (user, fee type) entry resolves independently to a Lookup.
//!     A failed entry is Lookup::Failed and never aborts its batch.
//!   - Each result lands in its own map slot, so no locking is needed.

use crate::{
    config::LedgerReaderConfig,
    fee::{FeeType, PaymentMethod},
    store::FeeStore,
    types::{Amount, UserId},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, HashSet},
    ops::ControlFlow,
    sync::{Mutex, RwLock},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    #[error("ledger store error: {0}")]
    Store(String),
}

/// Outcome of one ledger entry lookup. Keeps "not there" apart from
/// "could not be read".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Lookup<T> {
    Found(T),
    Absent,
    Failed(String),
}

impl<T> Lookup<T> {
    pub fn found(&self) -> Option<&T> {
        match self {
            Lookup::Found(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Lookup::Failed(_))
    }

    fn from_result(
        user_id: &str,
        fee_type: FeeType,
        what: &str,
        result: Result<Option<T>, LedgerError>,
    ) -> Self {
        match result {
            Ok(Some(v)) => Lookup::Found(v),
            Ok(None) => Lookup::Absent,
            Err(e) => {
                log::warn!("ledger: {what} lookup failed for user={user_id} fee={fee_type}: {e}");
                Lookup::Failed(e.to_string())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub paid_at: Option<DateTime<Utc>>,
    pub method: Option<PaymentMethod>,
}

/// The ledger store as seen by the engine. Implementations must be safe
/// to call concurrently.
#[async_trait]
pub trait PaymentLedger: Send + Sync {
    /// Collected amount (net of processor fees) for one user and fee type.
    async fn fetch_amount(
        &self,
        user_id: &str,
        fee_type: FeeType,
    ) -> Result<Option<Amount>, LedgerError>;

    /// Payment date and recorded method for one user and fee type.
    async fn fetch_payment(
        &self,
        user_id: &str,
        fee_type: FeeType,
    ) -> Result<Option<PaymentRecord>, LedgerError>;
}

pub type AmountMap = HashMap<UserId, HashMap<FeeType, Lookup<Amount>>>;
pub type PaymentMap = HashMap<UserId, HashMap<FeeType, Lookup<PaymentRecord>>>;

/// Everything the reader learned for one computation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerSnapshot {
    amounts: AmountMap,
    payments: PaymentMap,
}

impl LedgerSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// An entry missing from the snapshot reads as Absent.
    pub fn amount(&self, user_id: &str, fee_type: FeeType) -> Lookup<Amount> {
        self.amounts
            .get(user_id)
            .and_then(|m| m.get(&fee_type))
            .cloned()
            .unwrap_or(Lookup::Absent)
    }

    pub fn payment(&self, user_id: &str, fee_type: FeeType) -> Lookup<PaymentRecord> {
        self.payments
            .get(user_id)
            .and_then(|m| m.get(&fee_type))
            .cloned()
            .unwrap_or(Lookup::Absent)
    }

    pub fn insert_amount(&mut self, user_id: &str, fee_type: FeeType, lookup: Lookup<Amount>) {
        self.amounts.entry(user_id.to_string()).or_default().insert(fee_type, lookup);
    }

    pub fn insert_payment(
        &mut self,
        user_id: &str,
        fee_type: FeeType,
        lookup: Lookup<PaymentRecord>,
    ) {
        self.payments.entry(user_id.to_string()).or_default().insert(fee_type, lookup);
    }

    pub fn users_loaded(&self) -> usize {
        self.amounts
            .keys()
            .chain(self.payments.keys())
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn failure_count(&self) -> usize {
        let amounts = self.amounts.values().flat_map(|m| m.values()).filter(|l| l.is_failed());
        let payments = self.payments.values().flat_map(|m| m.values()).filter(|l| l.is_failed());
        amounts.count() + payments.count()
    }

    /// Every failed entry as (user, fee type, reason), sorted.
    pub fn failures(&self) -> Vec<(UserId, FeeType, String)> {
        let mut out = Vec::new();
        for (user_id, entries) in &self.amounts {
            for (fee_type, lookup) in entries {
                if let Lookup::Failed(reason) = lookup {
                    out.push((user_id.clone(), *fee_type, format!("amount: {reason}")));
                }
            }
        }
        for (user_id, entries) in &self.payments {
            for (fee_type, lookup) in entries {
                if let Lookup::Failed(reason) = lookup {
                    out.push((user_id.clone(), *fee_type, format!("payment: {reason}")));
                }
            }
        }
        out.sort();
        out
    }

    fn absorb(&mut self, amounts: AmountMap, payments: PaymentMap) {
        self.amounts.extend(amounts);
        self.payments.extend(payments);
    }
}

/// Result of an incremental load: the snapshot plus whether every
/// sub-batch ran (false when the progress callback asked to stop).
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub snapshot: LedgerSnapshot,
    pub completed: bool,
}

pub struct LedgerReader<L> {
    ledger: L,
    batch_size: usize,
}

impl<L: PaymentLedger> LedgerReader<L> {
    pub fn new(ledger: L, config: &LedgerReaderConfig) -> Self {
        Self {
            ledger,
            batch_size: config.batch_size.max(1),
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub async fn amounts(&self, user_ids: &[UserId], fee_types: &[FeeType]) -> AmountMap {
        let mut out = HashMap::with_capacity(user_ids.len());
        for chunk in user_ids.chunks(self.batch_size) {
            let lookups = chunk.iter().map(|user_id| self.user_amounts(user_id, fee_types));
            out.extend(join_all(lookups).await);
        }
        out
    }

    pub async fn payments(&self, user_ids: &[UserId], fee_types: &[FeeType]) -> PaymentMap {
        let mut out = HashMap::with_capacity(user_ids.len());
        for chunk in user_ids.chunks(self.batch_size) {
            let lookups = chunk.iter().map(|user_id| self.user_payments(user_id, fee_types));
            out.extend(join_all(lookups).await);
        }
        out
    }

    pub async fn load(&self, user_ids: &[UserId], fee_types: &[FeeType]) -> LedgerSnapshot {
        self.load_incremental(user_ids, fee_types, |_| ControlFlow::Continue(()))
            .await
            .snapshot
    }

    /// Load sub-batch by sub-batch, calling `on_batch` with the snapshot
    /// so far after each one. Breaking from the callback stops the load.
    pub async fn load_incremental<F>(
        &self,
        user_ids: &[UserId],
        fee_types: &[FeeType],
        mut on_batch: F,
    ) -> LoadOutcome
    where
        F: FnMut(&LedgerSnapshot) -> ControlFlow<()>,
    {
        let mut snapshot = LedgerSnapshot::new();
        let total_batches = user_ids.len().div_ceil(self.batch_size);

        for (index, chunk) in user_ids.chunks(self.batch_size).enumerate() {
            let (amounts, payments) = futures::join!(
                self.amounts(chunk, fee_types),
                self.payments(chunk, fee_types),
            );
            snapshot.absorb(amounts, payments);
            log::debug!(
                "ledger: batch {}/{total_batches} loaded ({} users)",
                index + 1,
                chunk.len()
            );

            if on_batch(&snapshot).is_break() {
                log::debug!("ledger: load stopped after batch {}/{total_batches}", index + 1);
                return LoadOutcome { snapshot, completed: false };
            }
        }

        LoadOutcome { snapshot, completed: true }
    }

    async fn user_amounts(
        &self,
        user_id: &str,
        fee_types: &[FeeType],
    ) -> (UserId, HashMap<FeeType, Lookup<Amount>>) {
        let lookups = fee_types.iter().map(|&fee_type| async move {
            let result = self.ledger.fetch_amount(user_id, fee_type).await;
            (fee_type, Lookup::from_result(user_id, fee_type, "amount", result))
        });
        (user_id.to_string(), join_all(lookups).await.into_iter().collect())
    }

    async fn user_payments(
        &self,
        user_id: &str,
        fee_types: &[FeeType],
    ) -> (UserId, HashMap<FeeType, Lookup<PaymentRecord>>) {
        let lookups = fee_types.iter().map(|&fee_type| async move {
            let result = self.ledger.fetch_payment(user_id, fee_type).await;
            (fee_type, Lookup::from_result(user_id, fee_type, "payment", result))
        });
        (user_id.to_string(), join_all(lookups).await.into_iter().collect())
    }
}

// ── SQLite-backed ledger ───────────────────────────────────────────

/// Reads the `fee_payment` table. rusqlite connections are not Sync, so
/// the store sits behind a mutex held for one query at a time.
pub struct SqliteLedger {
    store: Mutex<FeeStore>,
}

impl SqliteLedger {
    pub fn new(store: FeeStore) -> Self {
        Self { store: Mutex::new(store) }
    }
}

#[async_trait]
impl PaymentLedger for SqliteLedger {
    async fn fetch_amount(
        &self,
        user_id: &str,
        fee_type: FeeType,
    ) -> Result<Option<Amount>, LedgerError> {
        let store = self
            .store
            .lock()
            .map_err(|_| LedgerError::Unavailable("ledger connection poisoned".into()))?;
        store
            .fee_amount(user_id, fee_type)
            .map_err(|e| LedgerError::Store(e.to_string()))
    }

    async fn fetch_payment(
        &self,
        user_id: &str,
        fee_type: FeeType,
    ) -> Result<Option<PaymentRecord>, LedgerError> {
        let store = self
            .store
            .lock()
            .map_err(|_| LedgerError::Unavailable("ledger connection poisoned".into()))?;
        store
            .fee_payment(user_id, fee_type)
            .map_err(|e| LedgerError::Store(e.to_string()))
    }
}

// ── In-memory ledger ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerEntry {
    pub amount: Option<Amount>,
    pub payment: Option<PaymentRecord>,
}

/// Ledger double for tests and demos, with per-entry failure injection.
#[derive(Default)]
pub struct InMemoryLedger {
    entries: RwLock<HashMap<(UserId, FeeType), LedgerEntry>>,
    failing: RwLock<HashSet<(UserId, FeeType)>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &self,
        user_id: &str,
        fee_type: FeeType,
        amount: Option<Amount>,
        method: Option<PaymentMethod>,
        paid_at: Option<DateTime<Utc>>,
    ) {
        let entry = LedgerEntry {
            amount,
            payment: Some(PaymentRecord { paid_at, method }),
        };
        if let Ok(mut entries) = self.entries.write() {
            entries.insert((user_id.to_string(), fee_type), entry);
        }
    }

    /// Make every lookup for this (user, fee type) fail.
    pub fn fail_on(&self, user_id: &str, fee_type: FeeType) {
        if let Ok(mut failing) = self.failing.write() {
            failing.insert((user_id.to_string(), fee_type));
        }
    }

    fn entry(&self, user_id: &str, fee_type: FeeType) -> Result<Option<LedgerEntry>, LedgerError> {
        let key = (user_id.to_string(), fee_type);
        let failing = self
            .failing
            .read()
            .map_err(|_| LedgerError::Unavailable("failure set poisoned".into()))?;
        if failing.contains(&key) {
            return Err(LedgerError::Unavailable(format!(
                "injected failure for {user_id}/{fee_type}"
            )));
        }
        let entries = self
            .entries
            .read()
            .map_err(|_| LedgerError::Unavailable("entries poisoned".into()))?;
        Ok(entries.get(&key).copied())
    }
}

#[async_trait]
impl PaymentLedger for InMemoryLedger {
    async fn fetch_amount(
        &self,
        user_id: &str,
        fee_type: FeeType,
    ) -> Result<Option<Amount>, LedgerError> {
        Ok(self.entry(user_id, fee_type)?.and_then(|e| e.amount))
    }

    async fn fetch_payment(
        &self,
        user_id: &str,
        fee_type: FeeType,
    ) -> Result<Option<PaymentRecord>, LedgerError> {
        Ok(self.entry(user_id, fee_type)?.and_then(|e| e.payment))
    }
}
