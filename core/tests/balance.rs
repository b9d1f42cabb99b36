//! Integration tests for the balance calculator.
//!
//! 1. Manual revenue is never withdrawable
//! 2. Paid, approved and pending withdrawals all reserve funds
//! 3. The available balance is floored at zero

use scholarfee_core::{
    balance::{compute_balance, WithdrawalTotals},
    model::{WithdrawalOwner, WithdrawalRequest, WithdrawalStatus},
};

fn request(id: &str, amount: f64, status: WithdrawalStatus) -> WithdrawalRequest {
    WithdrawalRequest {
        request_id: id.into(),
        owner: WithdrawalOwner::University("u1".into()),
        amount,
        status,
    }
}

#[test]
fn manual_revenue_is_subtracted() {
    let balance = compute_balance(1450.0, 900.0, WithdrawalTotals::default());
    assert_eq!(balance.available, 550.0);
    assert_eq!(balance.off_platform_revenue, 900.0);
    assert_eq!(balance.total_revenue, 1450.0);
}

#[test]
fn withdrawals_by_status_all_reserve_funds() {
    let requests = vec![
        request("w1", 100.0, WithdrawalStatus::Paid),
        request("w2", 50.0, WithdrawalStatus::Paid),
        request("w3", 75.0, WithdrawalStatus::Approved),
        request("w4", 25.0, WithdrawalStatus::Pending),
    ];
    let totals = WithdrawalTotals::from_requests(&requests);

    assert_eq!(totals.paid_out, 150.0);
    assert_eq!(totals.approved, 75.0);
    assert_eq!(totals.pending, 25.0);
    assert_eq!(totals.reserved(), 250.0);

    let balance = compute_balance(1000.0, 200.0, totals);
    assert_eq!(balance.available, 1000.0 - 200.0 - 150.0 - 75.0 - 25.0);
}

#[test]
fn available_balance_never_goes_negative() {
    let totals = WithdrawalTotals {
        paid_out: 300.0,
        approved: 0.0,
        pending: 200.0,
    };
    assert_eq!(compute_balance(400.0, 0.0, totals).available, 0.0);
    assert_eq!(compute_balance(400.0, 400.0, WithdrawalTotals::default()).available, 0.0);
    assert_eq!(compute_balance(0.0, 0.0, WithdrawalTotals::default()).available, 0.0);
}
