//! Fee attribution: per student, per fee type, decides whether and at
//! what amount a fee counts toward the current reporting window.
//!
//! For each fee type, in FeeType::ALL order:
//!   1. flag false                         → 0, NotPaid
//!   2. I-20 while scholarship flag false  → 0, ScholarshipFeeUnpaid
//!   3. nominal = ledger amount (> 0) | override | schedule default;
//!      an invalid override fails the whole student
//!   4. window active: ledger date inside [from, to] → nominal, else 0
//!   5. no window                          → nominal
//!
//! Pure function of its inputs. Safe to re-run.

use crate::{
    error::EngineResult,
    fee::{FeeFlags, FeeOverrides, FeeType, PaymentMethod, PricingVariant},
    fee_schedule::FeeScheduleResolver,
    ledger::{LedgerSnapshot, Lookup},
    model::{ReportingWindow, StudentRecord},
    types::{Amount, UserId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AmountSource {
    Ledger,
    Override,
    Schedule,
}

/// Why a fee did or did not count. Zeros never collapse into one reason.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FeeOutcome {
    Included { source: AmountSource },
    NotPaid,
    /// The I-20 fee requires the scholarship fee.
    ScholarshipFeeUnpaid,
    /// Window active but the ledger has no payment date.
    NoPaymentDate,
    OutsideWindow,
    /// Window active and the payment-date lookup itself failed.
    LookupFailed,
}

impl FeeOutcome {
    pub fn is_included(&self) -> bool {
        matches!(self, FeeOutcome::Included { .. })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FeeAttribution {
    pub fee_type: FeeType,
    pub amount: Amount,
    pub outcome: FeeOutcome,
    /// Ledger-recorded method, when the ledger has one.
    pub method: Option<PaymentMethod>,
    /// The amount lookup failed and the figure fell back to override or
    /// schedule.
    pub ledger_degraded: bool,
}

impl FeeAttribution {
    fn excluded(fee_type: FeeType, outcome: FeeOutcome) -> Self {
        Self {
            fee_type,
            amount: 0.0,
            outcome,
            method: None,
            ledger_degraded: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudentAttribution {
    pub user_id: UserId,
    pub fees: Vec<FeeAttribution>,
    pub total: Amount,
}

impl StudentAttribution {
    /// Zero contribution, used when the student's computation failed.
    pub fn zero(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            fees: Vec::new(),
            total: 0.0,
        }
    }

    pub fn fee(&self, fee_type: FeeType) -> Option<&FeeAttribution> {
        self.fees.iter().find(|f| f.fee_type == fee_type)
    }

    pub fn amount(&self, fee_type: FeeType) -> Amount {
        self.fee(fee_type).map_or(0.0, |f| f.amount)
    }

    pub fn included(&self) -> impl Iterator<Item = &FeeAttribution> {
        self.fees.iter().filter(|f| f.outcome.is_included() && f.amount > 0.0)
    }
}

/// The inputs for one student, already separated from the stores.
#[derive(Debug, Clone, Copy)]
pub struct StudentFeeInput<'a> {
    pub user_id: &'a str,
    pub flags: FeeFlags,
    pub variant: PricingVariant,
    pub dependents: u32,
    pub overrides: Option<&'a FeeOverrides>,
}

impl<'a> StudentFeeInput<'a> {
    /// Parses the stored pricing variant; an unknown one is a
    /// ConfigurationError for this student only.
    pub fn from_record(
        record: &'a StudentRecord,
        overrides: Option<&'a FeeOverrides>,
    ) -> EngineResult<Self> {
        Ok(Self {
            user_id: &record.user_id,
            flags: record.flags,
            variant: record.pricing_variant.parse()?,
            dependents: record.dependents,
            overrides,
        })
    }
}

pub struct AttributionEngine<'a> {
    resolver: FeeScheduleResolver<'a>,
    window: Option<ReportingWindow>,
}

impl<'a> AttributionEngine<'a> {
    pub fn new(resolver: FeeScheduleResolver<'a>, window: Option<ReportingWindow>) -> Self {
        Self { resolver, window }
    }

    pub fn window(&self) -> Option<ReportingWindow> {
        self.window
    }

    pub fn attribute(
        &self,
        input: &StudentFeeInput<'_>,
        ledger: &LedgerSnapshot,
    ) -> EngineResult<StudentAttribution> {
        let fees = FeeType::ALL
            .iter()
            .map(|&fee_type| self.attribute_fee(input, fee_type, ledger))
            .collect::<EngineResult<Vec<_>>>()?;
        let total = fees.iter().map(|f| f.amount).sum();

        Ok(StudentAttribution {
            user_id: input.user_id.to_string(),
            fees,
            total,
        })
    }

    fn attribute_fee(
        &self,
        input: &StudentFeeInput<'_>,
        fee_type: FeeType,
        ledger: &LedgerSnapshot,
    ) -> EngineResult<FeeAttribution> {
        if !input.flags.is_paid(fee_type) {
            return Ok(FeeAttribution::excluded(fee_type, FeeOutcome::NotPaid));
        }
        if fee_type == FeeType::I20Control && !input.flags.scholarship_fee_paid {
            return Ok(FeeAttribution::excluded(fee_type, FeeOutcome::ScholarshipFeeUnpaid));
        }

        let amount_lookup = ledger.amount(input.user_id, fee_type);
        let (nominal, source) = match amount_lookup.found() {
            Some(&amount) if amount.is_finite() && amount > 0.0 => (amount, AmountSource::Ledger),
            _ => match FeeScheduleResolver::override_amount(input.overrides, fee_type)? {
                Some(amount) => (amount, AmountSource::Override),
                None => (
                    self.resolver.default_amount(input.variant, input.dependents, fee_type)?,
                    AmountSource::Schedule,
                ),
            },
        };

        let payment = ledger.payment(input.user_id, fee_type);
        let method = payment.found().and_then(|p| p.method);
        let ledger_degraded = amount_lookup.is_failed();

        let outcome = match self.window {
            None => FeeOutcome::Included { source },
            Some(window) => match payment {
                Lookup::Failed(_) => FeeOutcome::LookupFailed,
                Lookup::Absent => FeeOutcome::NoPaymentDate,
                Lookup::Found(record) => match record.paid_at {
                    None => FeeOutcome::NoPaymentDate,
                    Some(at) if window.contains(at) => FeeOutcome::Included { source },
                    Some(_) => FeeOutcome::OutsideWindow,
                },
            },
        };

        let amount = if outcome.is_included() { nominal } else { 0.0 };
        Ok(FeeAttribution {
            fee_type,
            amount,
            outcome,
            method,
            ledger_degraded,
        })
    }
}
