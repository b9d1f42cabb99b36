//! Fee engine: one request-scoped pipeline, re-evaluated on demand.
//!
//! PIPELINE ORDER (fixed):
//!   1. Exclusion filter      (explicit per request)
//!   2. Ledger load           (the only I/O; bounded concurrent batches)
//!   3. Attribution           (per student, pure)
//!   4. Aggregation           (seller → affiliate, university)
//!   5. Classifier + balances (per entity)
//!   6. Summary records
//!
//! RULES:
//!   - Nothing is written back and nothing is cached between calls.
//!   - The latest request wins: a computation that finds a newer ticket
//!     issued stops and reports Superseded.
//!   - A per-student failure zeroes that student and adds a warning;
//!     the report itself always completes.

use crate::{
    aggregator::{Aggregator, Rollup},
    application::students_at_university,
    attribution::{AttributionEngine, StudentAttribution, StudentFeeInput},
    balance::WithdrawalTotals,
    classifier::MethodClassifier,
    config::EngineConfig,
    error::EngineWarning,
    exclusion::{ExclusionFilter, ExclusionSummary},
    fee::FeeType,
    fee_schedule::FeeScheduleResolver,
    ledger::{LedgerReader, LedgerSnapshot, PaymentLedger},
    model::{MarketplaceDirectory, ReportingWindow, StudentRecord, WithdrawalOwner},
    summary::{EntityKind, EntitySummary},
    types::UserId,
};
use serde::Serialize;
use std::{
    collections::BTreeMap,
    ops::ControlFlow,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

// ── Supersession ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestTicket(u64);

/// Hands out monotonically increasing tickets. Only the most recent
/// ticket is current.
#[derive(Debug, Default)]
pub struct RequestGate {
    latest: AtomicU64,
}

impl RequestGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> RequestTicket {
        RequestTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}

// ── Request / report ───────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct ReportRequest {
    pub window: Option<ReportingWindow>,
    pub exclusion: ExclusionFilter,
}

impl ReportRequest {
    pub fn all_time() -> Self {
        Self::default()
    }

    pub fn with_window(mut self, window: ReportingWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn with_exclusion(mut self, exclusion: ExclusionFilter) -> Self {
        self.exclusion = exclusion;
        self
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Report {
    pub window: Option<ReportingWindow>,
    pub excluded: ExclusionSummary,
    pub students: Vec<StudentAttribution>,
    pub universities: Vec<EntitySummary>,
    pub affiliates: Vec<EntitySummary>,
    pub sellers: Vec<EntitySummary>,
    pub warnings: Vec<EngineWarning>,
}

impl Report {
    pub fn university(&self, id: &str) -> Option<&EntitySummary> {
        self.universities.iter().find(|s| s.entity_id == id)
    }

    pub fn affiliate(&self, id: &str) -> Option<&EntitySummary> {
        self.affiliates.iter().find(|s| s.entity_id == id)
    }

    pub fn seller(&self, id: &str) -> Option<&EntitySummary> {
        self.sellers.iter().find(|s| s.entity_id == id)
    }

    pub fn student(&self, user_id: &str) -> Option<&StudentAttribution> {
        self.students.iter().find(|s| s.user_id == user_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    Completed(Report),
    /// A newer request was issued while this one was in flight.
    Superseded,
}

impl ReportOutcome {
    pub fn into_report(self) -> Option<Report> {
        match self {
            ReportOutcome::Completed(report) => Some(report),
            ReportOutcome::Superseded => None,
        }
    }
}

// ── Engine ─────────────────────────────────────────────────────────

pub struct FeeEngine<L> {
    config: EngineConfig,
    reader: LedgerReader<L>,
    gate: Arc<RequestGate>,
}

impl<L: PaymentLedger> FeeEngine<L> {
    pub fn new(config: EngineConfig, ledger: L) -> Self {
        Self::with_gate(config, ledger, Arc::new(RequestGate::new()))
    }

    /// Share a gate between engines (or with a caller) so that requests
    /// issued anywhere supersede each other.
    pub fn with_gate(config: EngineConfig, ledger: L, gate: Arc<RequestGate>) -> Self {
        let reader = LedgerReader::new(ledger, &config.ledger);
        Self { config, reader, gate }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn reader(&self) -> &LedgerReader<L> {
        &self.reader
    }

    pub fn gate(&self) -> Arc<RequestGate> {
        Arc::clone(&self.gate)
    }

    pub async fn compute(
        &self,
        directory: &MarketplaceDirectory,
        request: &ReportRequest,
    ) -> ReportOutcome {
        let ticket = self.gate.issue();
        let (directory, excluded) = request.exclusion.apply(directory);
        if excluded != ExclusionSummary::default() {
            log::debug!(
                "engine: excluded {} students, {} sellers, {} affiliates as test accounts",
                excluded.students, excluded.sellers, excluded.affiliates
            );
        }

        let user_ids: Vec<UserId> = directory.students.iter().map(|s| s.user_id.clone()).collect();
        let load = self
            .reader
            .load_incremental(&user_ids, &FeeType::ALL, |_| {
                if self.gate.is_current(ticket) {
                    ControlFlow::Continue(())
                } else {
                    ControlFlow::Break(())
                }
            })
            .await;

        if !load.completed || !self.gate.is_current(ticket) {
            log::info!("engine: request {ticket:?} superseded; discarding ledger results");
            return ReportOutcome::Superseded;
        }

        let report = self.build_report(&directory, &load.snapshot, request.window, excluded);
        ReportOutcome::Completed(report)
    }

    /// Synchronous back half of the pipeline. Callers holding a partial
    /// snapshot (e.g. mid-load) can use this to render provisional figures.
    pub fn build_report(
        &self,
        directory: &MarketplaceDirectory,
        snapshot: &LedgerSnapshot,
        window: Option<ReportingWindow>,
        excluded: ExclusionSummary,
    ) -> Report {
        let mut warnings: Vec<EngineWarning> = snapshot
            .failures()
            .into_iter()
            .map(|(student_id, fee_type, message)| EngineWarning::LookupFailed {
                student_id,
                fee_type: fee_type.to_string(),
                message,
            })
            .collect();

        let attributions = self.attribute_all(directory, snapshot, window, &mut warnings);
        let classifier = MethodClassifier::new(&self.config.classifier);
        let (universities, affiliates, sellers) = {
            let aggregation = Aggregator::aggregate(directory, &attributions);
            warnings.extend(aggregation.warnings.iter().cloned());

            let universities = summarize(&aggregation.universities, EntityKind::University, &classifier, |id| {
                let owner = WithdrawalOwner::University(id.to_string());
                WithdrawalTotals::from_requests(directory.withdrawals_for(&owner))
            });
            let affiliates = summarize(&aggregation.affiliates, EntityKind::Affiliate, &classifier, |id| {
                let owner = WithdrawalOwner::Affiliate(id.to_string());
                WithdrawalTotals::from_requests(directory.withdrawals_for(&owner))
            });
            let sellers = summarize(&aggregation.sellers, EntityKind::Seller, &classifier, |_| {
                WithdrawalTotals::default()
            });
            (universities, affiliates, sellers)
        };

        log::info!(
            "engine: report ready ({} students, {} universities, {} affiliates, {} sellers, {} warnings)",
            attributions.len(),
            universities.len(),
            affiliates.len(),
            sellers.len(),
            warnings.len(),
        );

        Report {
            window,
            excluded,
            students: attributions.into_values().collect(),
            universities,
            affiliates,
            sellers,
            warnings,
        }
    }

    /// University-facing student listing, through the same
    /// current-application rule as revenue grouping.
    pub fn university_students<'d>(
        &self,
        directory: &'d MarketplaceDirectory,
        university_id: &str,
    ) -> Vec<&'d StudentRecord> {
        students_at_university(directory, university_id)
    }

    fn attribute_all(
        &self,
        directory: &MarketplaceDirectory,
        snapshot: &LedgerSnapshot,
        window: Option<ReportingWindow>,
        warnings: &mut Vec<EngineWarning>,
    ) -> BTreeMap<UserId, StudentAttribution> {
        let attributor =
            AttributionEngine::new(FeeScheduleResolver::new(&self.config.fee_schedule), window);

        directory
            .students
            .iter()
            .map(|record| {
                let result = StudentFeeInput::from_record(record, directory.overrides_for(&record.user_id))
                    .and_then(|input| attributor.attribute(&input, snapshot));
                let attribution = match result {
                    Ok(a) => a,
                    Err(e) => {
                        log::warn!("engine: student {} contributes zero: {e}", record.user_id);
                        warnings.push(EngineWarning::Configuration {
                            student_id: record.user_id.clone(),
                            message: e.to_string(),
                        });
                        StudentAttribution::zero(&record.user_id)
                    }
                };
                (record.user_id.clone(), attribution)
            })
            .collect()
    }
}

fn summarize<F>(
    rollups: &BTreeMap<String, Rollup<'_>>,
    kind: EntityKind,
    classifier: &MethodClassifier,
    withdrawals: F,
) -> Vec<EntitySummary>
where
    F: Fn(&str) -> WithdrawalTotals,
{
    rollups
        .values()
        .map(|rollup| EntitySummary::build(kind, rollup, classifier, withdrawals(&rollup.entity_id)))
        .collect()
}
