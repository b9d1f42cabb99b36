//! Integration tests for the aggregator.
//!
//! 1. Seller rollups follow the student's referral code; affiliates sum their sellers
//! 2. Dangling referral codes, affiliates and universities are warnings, not aborts
//! 3. Universities group by the current application with no fan-out
//! 4. Paid counts per entity kind
//! 5. Every directory entity gets a rollup; repeated runs are identical

use chrono::{TimeZone, Utc};
use scholarfee_core::{
    aggregator::Aggregator,
    attribution::StudentAttribution,
    error::EngineWarning,
    fee::FeeFlags,
    model::{Affiliate, MarketplaceDirectory, ScholarshipApplication, Seller, StudentRecord, University},
    types::UserId,
};
use std::collections::BTreeMap;

fn student(user_id: &str, referral_code: Option<&str>) -> StudentRecord {
    StudentRecord {
        user_id: user_id.to_string(),
        email: format!("{user_id}@mail.example"),
        pricing_variant: "legacy".into(),
        dependents: 0,
        seller_referral_code: referral_code.map(str::to_string),
        flags: FeeFlags::default(),
    }
}

fn seller(seller_id: &str, code: &str, affiliate_id: &str) -> Seller {
    Seller {
        seller_id: seller_id.into(),
        referral_code: code.into(),
        affiliate_id: affiliate_id.into(),
        email: None,
    }
}

fn affiliate(affiliate_id: &str) -> Affiliate {
    Affiliate {
        affiliate_id: affiliate_id.into(),
        user_id: format!("owner-{affiliate_id}"),
        email: None,
    }
}

fn university(university_id: &str) -> University {
    University {
        university_id: university_id.into(),
        name: format!("University {university_id}"),
    }
}

fn application(id: &str, student_id: &str, university_id: &str, fee_paid: bool, day: u32) -> ScholarshipApplication {
    ScholarshipApplication {
        application_id: id.into(),
        student_id: student_id.into(),
        university_id: university_id.into(),
        application_fee_paid: fee_paid,
        created_at: Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap(),
    }
}

fn attributions(totals: &[(&str, f64)]) -> BTreeMap<UserId, StudentAttribution> {
    totals
        .iter()
        .map(|(id, total)| {
            (
                id.to_string(),
                StudentAttribution {
                    user_id: id.to_string(),
                    fees: Vec::new(),
                    total: *total,
                },
            )
        })
        .collect()
}

/// Two affiliates, three sellers, two universities, five students.
fn directory() -> MarketplaceDirectory {
    MarketplaceDirectory {
        students: vec![
            student("s1", Some("REF-A1")),
            student("s2", Some("REF-A1")),
            student("s3", Some("REF-A2")),
            student("s4", Some("REF-B1")),
            student("s5", None),
        ],
        sellers: vec![
            seller("sel-a1", "REF-A1", "aff-a"),
            seller("sel-a2", "REF-A2", "aff-a"),
            seller("sel-b1", "REF-B1", "aff-b"),
        ],
        affiliates: vec![affiliate("aff-a"), affiliate("aff-b")],
        universities: vec![university("u1"), university("u2")],
        applications: vec![
            application("app-1", "s1", "u1", true, 1),
            application("app-2", "s2", "u1", false, 2),
            application("app-3", "s3", "u2", true, 3),
            application("app-4", "s5", "u2", true, 4),
        ],
        ..Default::default()
    }
}

fn totals() -> BTreeMap<UserId, StudentAttribution> {
    attributions(&[("s1", 400.0), ("s2", 0.0), ("s3", 1250.0), ("s4", 900.0), ("s5", 350.0)])
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: referral hierarchy
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn sellers_and_affiliates_follow_referral_codes() {
    let dir = directory();
    let attributions = totals();
    let agg = Aggregator::aggregate(&dir, &attributions);

    assert_eq!(agg.sellers["sel-a1"].total_revenue, 400.0);
    assert_eq!(agg.sellers["sel-a1"].student_count(), 2);
    assert_eq!(agg.sellers["sel-a2"].total_revenue, 1250.0);
    assert_eq!(agg.sellers["sel-b1"].total_revenue, 900.0);

    let aff_a = &agg.affiliates["aff-a"];
    assert_eq!(aff_a.total_revenue, 1650.0, "affiliate total is the sum of its sellers");
    assert_eq!(aff_a.student_count(), 3);
    assert_eq!(agg.affiliates["aff-b"].total_revenue, 900.0);

    let referral_total: f64 = agg.affiliates.values().map(|r| r.total_revenue).sum();
    assert_eq!(referral_total, 2550.0, "s5 has no referral code and reaches no affiliate");
    assert!(agg.warnings.is_empty(), "unexpected warnings: {:?}", agg.warnings);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: dangling links
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn unknown_referral_code_is_a_warning() {
    let mut dir = directory();
    dir.students.push(student("s6", Some("REF-GONE")));
    let attributions = attributions(&[("s6", 500.0)]);

    let agg = Aggregator::aggregate(&dir, &attributions);

    assert!(agg.sellers.values().all(|r| r.total_revenue == 0.0));
    assert_eq!(
        agg.warnings,
        vec![EngineWarning::UnknownSeller {
            student_id: "s6".into(),
            referral_code: "REF-GONE".into(),
        }]
    );
}

#[test]
fn seller_with_missing_affiliate_is_a_warning() {
    let mut dir = directory();
    dir.sellers.push(seller("sel-x", "REF-X", "aff-missing"));
    dir.students.push(student("s6", Some("REF-X")));
    let mut all = totals();
    all.extend(attributions(&[("s6", 350.0)]));

    let agg = Aggregator::aggregate(&dir, &all);

    assert_eq!(agg.sellers["sel-x"].total_revenue, 350.0, "the seller still gets its revenue");
    assert!(!agg.affiliates.contains_key("aff-missing"));
    assert!(agg.warnings.contains(&EngineWarning::UnknownAffiliate {
        seller_id: "sel-x".into(),
        affiliate_id: "aff-missing".into(),
    }));
}

#[test]
fn application_at_unknown_university_is_a_warning() {
    let mut dir = directory();
    dir.applications.push(application("app-9", "s4", "u-closed", true, 9));
    let attributions = totals();

    let agg = Aggregator::aggregate(&dir, &attributions);

    assert!(agg.warnings.contains(&EngineWarning::UnknownUniversity {
        student_id: "s4".into(),
        university_id: "u-closed".into(),
    }));
    let university_total: f64 = agg.universities.values().map(|r| r.total_revenue).sum();
    assert_eq!(university_total, 400.0 + 0.0 + 1250.0 + 350.0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: university grouping
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn student_counts_at_exactly_one_university() {
    let mut dir = directory();
    // s1 also applied to u2 later, unpaid; the paid u1 application stays current.
    dir.applications.push(application("app-5", "s1", "u2", false, 20));
    let attributions = totals();

    let agg = Aggregator::aggregate(&dir, &attributions);

    assert_eq!(agg.universities["u1"].total_revenue, 400.0);
    assert_eq!(agg.universities["u2"].total_revenue, 1250.0 + 350.0);
    let placements: usize = agg.universities.values().map(|r| r.student_count()).sum();
    assert_eq!(placements, 4, "s4 has no application; everyone else is counted once");
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 4: paid counts
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn paid_counts_per_entity_kind() {
    let dir = directory();
    let attributions = totals();
    let agg = Aggregator::aggregate(&dir, &attributions);

    assert_eq!(agg.universities["u1"].paid_count, 1, "only app-1 has its fee paid");
    assert_eq!(agg.universities["u1"].student_count(), 2);
    assert_eq!(agg.sellers["sel-a1"].paid_count, 1, "s2 contributed nothing");
    assert_eq!(agg.affiliates["aff-a"].paid_count, 2);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 5: completeness and repeatability
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn every_entity_gets_a_rollup() {
    let mut dir = directory();
    dir.universities.push(university("u-empty"));
    dir.affiliates.push(affiliate("aff-empty"));
    let attributions = totals();

    let agg = Aggregator::aggregate(&dir, &attributions);

    assert_eq!(agg.universities["u-empty"].total_revenue, 0.0);
    assert_eq!(agg.universities["u-empty"].student_count(), 0);
    assert_eq!(agg.affiliates["aff-empty"].total_revenue, 0.0);
    assert_eq!(agg.sellers.len(), 3);
}

#[test]
fn repeated_aggregation_is_identical() {
    let dir = directory();
    let attributions = totals();

    let first = Aggregator::aggregate(&dir, &attributions);
    let second = Aggregator::aggregate(&dir, &attributions);

    assert_eq!(first.sellers, second.sellers);
    assert_eq!(first.affiliates, second.affiliates);
    assert_eq!(first.universities, second.universities);
    assert_eq!(first.warnings, second.warnings);
}
