//! Balance calculator.
//!
//!   available = max(0, (total − manual) − paid_out − approved − pending)
//!
//! Manual revenue is collected off-platform and is never withdrawable.
//! Approved and pending requests reserve funds until they are paid.

use crate::{
    model::{WithdrawalRequest, WithdrawalStatus},
    types::Amount,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct WithdrawalTotals {
    pub paid_out: Amount,
    pub approved: Amount,
    pub pending: Amount,
}

impl WithdrawalTotals {
    pub fn from_requests<'a, I>(requests: I) -> Self
    where
        I: IntoIterator<Item = &'a WithdrawalRequest>,
    {
        requests
            .into_iter()
            .fold(Self::default(), |mut totals, request| {
                match request.status {
                    WithdrawalStatus::Paid     => totals.paid_out += request.amount,
                    WithdrawalStatus::Approved => totals.approved += request.amount,
                    WithdrawalStatus::Pending  => totals.pending  += request.amount,
                }
                totals
            })
    }

    pub fn reserved(&self) -> Amount {
        self.paid_out + self.approved + self.pending
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Balance {
    pub total_revenue: Amount,
    /// The manual-method share of total revenue.
    pub off_platform_revenue: Amount,
    pub withdrawals: WithdrawalTotals,
    pub available: Amount,
}

pub fn compute_balance(
    total_revenue: Amount,
    manual_revenue: Amount,
    withdrawals: WithdrawalTotals,
) -> Balance {
    let withdrawable = total_revenue - manual_revenue - withdrawals.reserved();
    Balance {
        total_revenue,
        off_platform_revenue: manual_revenue,
        withdrawals,
        available: withdrawable.max(0.0),
    }
}
