//! Dashboard-ready summary record, one per entity.

use crate::{
    aggregator::Rollup,
    balance::{compute_balance, WithdrawalTotals},
    classifier::{MethodBreakdown, MethodClassifier},
    types::{Amount, EntityId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    University,
    Affiliate,
    Seller,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EntitySummary {
    pub entity_id: EntityId,
    pub entity_kind: EntityKind,
    pub total_revenue: Amount,
    pub manual_revenue: Amount,
    pub processor_a_revenue: Amount,
    pub processor_b_revenue: Amount,
    pub unknown_method_revenue: Amount,
    pub total_paid_out: Amount,
    pub total_pending: Amount,
    pub total_approved: Amount,
    pub available_balance: Amount,
    pub paid_applications_count: usize,
    pub total_applications_count: usize,
    /// Percent, 0–100.
    pub conversion_rate: f64,
    pub average_fee: Amount,
    pub payment_methods: MethodBreakdown,
}

impl EntitySummary {
    pub fn build(
        kind: EntityKind,
        rollup: &Rollup<'_>,
        classifier: &MethodClassifier,
        withdrawals: WithdrawalTotals,
    ) -> Self {
        let methods = classifier.classify(rollup.students.iter().copied());
        let balance = compute_balance(rollup.total_revenue, methods.manual.revenue, withdrawals);

        let total = rollup.student_count();
        let paid = rollup.paid_count;
        let conversion_rate = if total > 0 {
            paid as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        let average_fee = if paid > 0 {
            rollup.total_revenue / paid as f64
        } else {
            0.0
        };

        Self {
            entity_id: rollup.entity_id.clone(),
            entity_kind: kind,
            total_revenue: rollup.total_revenue,
            manual_revenue: methods.manual.revenue,
            processor_a_revenue: methods.processor_a.revenue,
            processor_b_revenue: methods.processor_b.revenue,
            unknown_method_revenue: methods.unknown.revenue,
            total_paid_out: withdrawals.paid_out,
            total_pending: withdrawals.pending,
            total_approved: withdrawals.approved,
            available_balance: balance.available,
            paid_applications_count: paid,
            total_applications_count: total,
            conversion_rate,
            average_fee,
            payment_methods: methods,
        }
    }
}
