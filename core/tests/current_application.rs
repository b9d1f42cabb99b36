//! Integration tests for the current-application rule.
//!
//! 1. A fee-paid application beats a newer unpaid one
//! 2. Within the same paid state the most recent wins
//! 3. Equal timestamps fall back to the greater application id
//! 4. University listings agree with university revenue grouping

use chrono::{DateTime, TimeZone, Utc};
use scholarfee_core::{
    aggregator::Aggregator,
    application::{current_application, students_at_university},
    attribution::StudentAttribution,
    fee::FeeFlags,
    model::{MarketplaceDirectory, ScholarshipApplication, StudentRecord, University},
};
use std::collections::BTreeMap;

fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, day, 8, 0, 0).unwrap()
}

fn app(id: &str, student_id: &str, university_id: &str, fee_paid: bool, created_at: DateTime<Utc>) -> ScholarshipApplication {
    ScholarshipApplication {
        application_id: id.into(),
        student_id: student_id.into(),
        university_id: university_id.into(),
        application_fee_paid: fee_paid,
        created_at,
    }
}

fn student(user_id: &str) -> StudentRecord {
    StudentRecord {
        user_id: user_id.into(),
        email: format!("{user_id}@mail.example"),
        pricing_variant: "simplified".into(),
        dependents: 0,
        seller_referral_code: None,
        flags: FeeFlags::default(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests 1-3: tie-break
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn paid_application_beats_newer_unpaid() {
    let apps = vec![
        app("a1", "s1", "u1", true, at(1)),
        app("a2", "s1", "u2", false, at(20)),
    ];
    assert_eq!(current_application(&apps).unwrap().application_id, "a1");
}

#[test]
fn most_recent_wins_within_paid_state() {
    let unpaid = vec![
        app("a1", "s1", "u1", false, at(3)),
        app("a2", "s1", "u2", false, at(9)),
        app("a3", "s1", "u3", false, at(5)),
    ];
    assert_eq!(current_application(&unpaid).unwrap().application_id, "a2");

    let paid = vec![
        app("a1", "s1", "u1", true, at(12)),
        app("a2", "s1", "u2", false, at(28)),
        app("a3", "s1", "u3", true, at(4)),
    ];
    assert_eq!(current_application(&paid).unwrap().application_id, "a1");
}

#[test]
fn equal_timestamps_fall_back_to_application_id() {
    let apps = vec![
        app("a-002", "s1", "u1", false, at(7)),
        app("a-010", "s1", "u2", false, at(7)),
        app("a-001", "s1", "u3", false, at(7)),
    ];
    assert_eq!(current_application(&apps).unwrap().application_id, "a-010");

    let mut reversed = apps.clone();
    reversed.reverse();
    assert_eq!(
        current_application(&reversed).unwrap().application_id,
        "a-010",
        "the choice must not depend on input order"
    );
}

#[test]
fn no_applications_means_no_current_application() {
    let none: Vec<ScholarshipApplication> = Vec::new();
    assert!(current_application(&none).is_none());
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 4: listing / revenue consistency
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn listing_agrees_with_revenue_grouping() {
    let dir = MarketplaceDirectory {
        students: vec![student("s1"), student("s2"), student("s3"), student("s4")],
        universities: vec![
            University { university_id: "u1".into(), name: "One".into() },
            University { university_id: "u2".into(), name: "Two".into() },
        ],
        applications: vec![
            app("a1", "s1", "u1", true, at(1)),
            app("a2", "s1", "u2", false, at(15)),
            app("a3", "s2", "u2", false, at(2)),
            app("a4", "s2", "u1", false, at(10)),
            app("a5", "s3", "u2", true, at(6)),
            app("a0", "s3", "u1", true, at(6)),
        ],
        ..Default::default()
    };
    let attributions: BTreeMap<String, StudentAttribution> = dir
        .students
        .iter()
        .map(|s| (s.user_id.clone(), StudentAttribution::zero(&s.user_id)))
        .collect();
    let agg = Aggregator::aggregate(&dir, &attributions);

    for u in &dir.universities {
        let listed: Vec<&str> = students_at_university(&dir, &u.university_id)
            .iter()
            .map(|s| s.user_id.as_str())
            .collect();
        let grouped: Vec<&str> = agg.universities[&u.university_id]
            .students
            .iter()
            .map(|s| s.user_id.as_str())
            .collect();
        assert_eq!(listed, grouped, "university {} listing drifted from revenue", u.university_id);
    }

    assert_eq!(
        students_at_university(&dir, "u1").iter().map(|s| s.user_id.as_str()).collect::<Vec<_>>(),
        vec!["s1", "s2"]
    );
    assert_eq!(
        students_at_university(&dir, "u2").iter().map(|s| s.user_id.as_str()).collect::<Vec<_>>(),
        vec!["s3"],
        "s3's paid applications tie on time, so the greater id a5 picks u2"
    );
}
