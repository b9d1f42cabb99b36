//! End-to-end dashboard scenarios, run through the SQLite stores and
//! the in-memory ledger.
//!
//! Scenario A: one university, one paid application, legacy selection
//!             fee of 400 paid manually → total 400, manual 400, available 0
//! Scenario B: one affiliate, two students; 550 via processor A and 900
//!             manually → total 1450, manual 900, available 550
//! Scenario C: windowed report with withdrawals against the balance

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use scholarfee_core::{
    config::EngineConfig,
    engine::{FeeEngine, Report, ReportRequest},
    fee::{FeeFlags, FeeType, PaymentMethod},
    ledger::{InMemoryLedger, SqliteLedger},
    model::{
        Affiliate, MarketplaceDirectory, ReportingWindow, ScholarshipApplication, Seller,
        StudentRecord, University, WithdrawalOwner, WithdrawalRequest, WithdrawalStatus,
    },
    store::FeeStore,
};

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 15, 30, 0).unwrap()
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn student(user_id: &str, dependents: u32, code: Option<&str>, flags: FeeFlags) -> StudentRecord {
    StudentRecord {
        user_id: user_id.into(),
        email: format!("{user_id}@mail.example"),
        pricing_variant: "legacy".into(),
        dependents,
        seller_referral_code: code.map(str::to_string),
        flags,
    }
}

/// Open a migrated shared-memory store; the returned store must stay
/// alive while the ledger connection is in use.
fn open_store(name: &str) -> FeeStore {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = FeeStore::shared_memory(name).expect("open shared-memory store");
    store.migrate().expect("migrate");
    store
}

async fn run_sqlite(store: &FeeStore, request: &ReportRequest) -> Report {
    let directory = store.load_directory().unwrap();
    let ledger = SqliteLedger::new(store.reopen().unwrap());
    FeeEngine::new(EngineConfig::default_test(), ledger)
        .compute(&directory, request)
        .await
        .into_report()
        .expect("report should complete")
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenario A
// ─────────────────────────────────────────────────────────────────────────────

fn seed_scenario_a(store: &FeeStore) {
    store
        .insert_university(&University { university_id: "u1".into(), name: "Northfield".into() })
        .unwrap();
    let flags = FeeFlags::default().with(FeeType::SelectionProcess, true);
    store.insert_student(&student("s1", 0, None, flags)).unwrap();
    store
        .insert_application(&ScholarshipApplication {
            application_id: "app-1".into(),
            student_id: "s1".into(),
            university_id: "u1".into(),
            application_fee_paid: true,
            created_at: at(2024, 1, 5),
        })
        .unwrap();
    store
        .insert_fee_payment("s1", FeeType::SelectionProcess, None, Some(PaymentMethod::Manual), Some(at(2024, 1, 2)))
        .unwrap();
}

#[tokio::test]
async fn scenario_a_manual_revenue_is_not_withdrawable() {
    let store = open_store("scenario_a");
    seed_scenario_a(&store);

    let report = run_sqlite(&store, &ReportRequest::all_time()).await;
    let u1 = report.university("u1").unwrap();

    assert_eq!(u1.total_revenue, 400.0);
    assert_eq!(u1.manual_revenue, 400.0);
    assert_eq!(u1.available_balance, 0.0);
    assert_eq!(u1.paid_applications_count, 1);
    assert_eq!(u1.total_applications_count, 1);
    assert_eq!(u1.conversion_rate, 100.0);
    assert_eq!(u1.average_fee, 400.0);
    assert_eq!(u1.payment_methods.manual.count, 1);
    assert!(report.warnings.is_empty(), "unexpected warnings: {:?}", report.warnings);
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenario B
// ─────────────────────────────────────────────────────────────────────────────

fn scenario_b_directory() -> MarketplaceDirectory {
    MarketplaceDirectory {
        students: vec![
            student("s1", 1, Some("REF-1"), FeeFlags::default().with(FeeType::SelectionProcess, true)),
            student("s2", 0, Some("REF-1"), FeeFlags::default().with(FeeType::Scholarship, true)),
        ],
        sellers: vec![Seller {
            seller_id: "sel-1".into(),
            referral_code: "REF-1".into(),
            affiliate_id: "aff-1".into(),
            email: None,
        }],
        affiliates: vec![Affiliate {
            affiliate_id: "aff-1".into(),
            user_id: "partner-1".into(),
            email: None,
        }],
        ..Default::default()
    }
}

#[tokio::test]
async fn scenario_b_affiliate_balance_excludes_manual_share() {
    let store = open_store("scenario_b");
    let dir = scenario_b_directory();
    store
        .insert_affiliate(&dir.affiliates[0])
        .unwrap();
    store.insert_seller(&dir.sellers[0]).unwrap();
    for s in &dir.students {
        store.insert_student(s).unwrap();
    }
    store
        .insert_fee_payment("s1", FeeType::SelectionProcess, None, Some(PaymentMethod::ProcessorA), Some(at(2024, 2, 1)))
        .unwrap();
    store
        .insert_fee_payment("s2", FeeType::Scholarship, None, Some(PaymentMethod::Manual), Some(at(2024, 2, 3)))
        .unwrap();

    let report = run_sqlite(&store, &ReportRequest::all_time()).await;
    let aff = report.affiliate("aff-1").unwrap();

    assert_eq!(aff.total_revenue, 1450.0);
    assert_eq!(aff.manual_revenue, 900.0);
    assert_eq!(aff.processor_a_revenue, 550.0);
    assert_eq!(aff.available_balance, 550.0);
    assert_eq!(aff.paid_applications_count, 2);
    assert_eq!(aff.average_fee, 725.0);

    let seller = report.seller("sel-1").unwrap();
    assert_eq!(seller.total_revenue, 1450.0);
    assert_eq!(seller.available_balance, 550.0);
    assert_eq!(seller.total_paid_out, 0.0);
}

#[tokio::test]
async fn scenario_b_is_the_same_through_the_in_memory_ledger() {
    let ledger = InMemoryLedger::new();
    ledger.record("s1", FeeType::SelectionProcess, None, Some(PaymentMethod::ProcessorA), Some(at(2024, 2, 1)));
    ledger.record("s2", FeeType::Scholarship, None, Some(PaymentMethod::Manual), Some(at(2024, 2, 3)));

    let report = FeeEngine::new(EngineConfig::default_test(), ledger)
        .compute(&scenario_b_directory(), &ReportRequest::all_time())
        .await
        .into_report()
        .unwrap();
    let aff = report.affiliate("aff-1").unwrap();

    assert_eq!(aff.total_revenue, 1450.0);
    assert_eq!(aff.manual_revenue, 900.0);
    assert_eq!(aff.available_balance, 550.0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenario C
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn scenario_c_windowed_revenue_and_withdrawals() {
    let store = open_store("scenario_c");
    store
        .insert_university(&University { university_id: "u1".into(), name: "Lakeshore".into() })
        .unwrap();
    let flags = FeeFlags::default()
        .with(FeeType::SelectionProcess, true)
        .with(FeeType::Application, true)
        .with(FeeType::Scholarship, true);
    store.insert_student(&student("s1", 0, None, flags)).unwrap();
    store.upsert_fee_override("s1", FeeType::Scholarship, 700.0).unwrap();
    store
        .insert_application(&ScholarshipApplication {
            application_id: "app-1".into(),
            student_id: "s1".into(),
            university_id: "u1".into(),
            application_fee_paid: true,
            created_at: at(2024, 2, 20),
        })
        .unwrap();
    // Selection in January, application and scholarship in March.
    store
        .insert_fee_payment("s1", FeeType::SelectionProcess, Some(388.0), Some(PaymentMethod::ProcessorA), Some(at(2024, 1, 15)))
        .unwrap();
    store
        .insert_fee_payment("s1", FeeType::Application, Some(339.5), Some(PaymentMethod::ProcessorB), Some(at(2024, 3, 1)))
        .unwrap();
    store
        .insert_fee_payment("s1", FeeType::Scholarship, None, Some(PaymentMethod::Manual), Some(at(2024, 3, 31)))
        .unwrap();
    for (id, amount, status) in [
        ("w1", 100.0, WithdrawalStatus::Paid),
        ("w2", 50.0, WithdrawalStatus::Pending),
        ("w3", 25.0, WithdrawalStatus::Approved),
    ] {
        store
            .insert_withdrawal(&WithdrawalRequest {
                request_id: id.into(),
                owner: WithdrawalOwner::University("u1".into()),
                amount,
                status,
            })
            .unwrap();
    }

    let march = ReportingWindow::new(day(2024, 3, 1), day(2024, 3, 31)).unwrap();
    let report = run_sqlite(&store, &ReportRequest::all_time().with_window(march)).await;
    let u1 = report.university("u1").unwrap();

    assert_eq!(u1.total_revenue, 339.5 + 700.0, "January selection fee is outside March");
    assert_eq!(u1.manual_revenue, 700.0);
    assert_eq!(u1.processor_b_revenue, 339.5);
    assert_eq!(u1.processor_a_revenue, 0.0);
    assert_eq!(u1.total_paid_out, 100.0);
    assert_eq!(u1.total_pending, 50.0);
    assert_eq!(u1.total_approved, 25.0);
    assert_eq!(u1.available_balance, 339.5 - 175.0);

    let all_time = run_sqlite(&store, &ReportRequest::all_time()).await;
    assert_eq!(all_time.university("u1").unwrap().total_revenue, 388.0 + 339.5 + 700.0);
}
