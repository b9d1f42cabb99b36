//! Deterministic demo marketplace, seeded into an empty database so a
//! report can be produced without production data. Same seed, same rows.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use scholarfee_core::{
    config::FeeScheduleConfig,
    fee::{FeeFlags, FeeType, PaymentMethod, PricingVariant},
    fee_schedule::FeeScheduleResolver,
    model::{
        Affiliate, ScholarshipApplication, Seller, StudentRecord, University, WithdrawalOwner,
        WithdrawalRequest, WithdrawalStatus,
    },
    store::FeeStore,
};

const UNIVERSITY_NAMES: [&str; 3] = [
    "Northfield College",
    "Lakeshore University",
    "Harbor Institute of Technology",
];
const AFFILIATES: usize = 2;
const SELLERS_PER_AFFILIATE: usize = 2;
/// Every n-th student, plus the last seller, uses a test-account address.
const TEST_ACCOUNT_EVERY: usize = 10;

#[derive(Debug, Default)]
pub struct DemoCounts {
    pub universities: usize,
    pub affiliates: usize,
    pub sellers: usize,
    pub students: usize,
    pub payments: usize,
    pub withdrawals: usize,
}

pub fn seed(
    store: &FeeStore,
    schedule: &FeeScheduleConfig,
    seed: u64,
    students: usize,
) -> Result<DemoCounts> {
    let mut rng = Pcg64Mcg::seed_from_u64(seed);
    let resolver = FeeScheduleResolver::new(schedule);
    let as_of = Utc
        .with_ymd_and_hms(2024, 6, 30, 12, 0, 0)
        .single()
        .ok_or_else(|| anyhow!("invalid demo reference date"))?;
    let mut counts = DemoCounts::default();

    // ── Directory ────────────────────────────────────────────────

    let mut university_ids = Vec::new();
    for (i, name) in UNIVERSITY_NAMES.iter().enumerate() {
        let university = University {
            university_id: format!("univ-{:02}", i + 1),
            name: name.to_string(),
        };
        store.insert_university(&university)?;
        university_ids.push(university.university_id);
    }
    counts.universities = university_ids.len();

    let mut referral_codes = Vec::new();
    for a in 0..AFFILIATES {
        let affiliate = Affiliate {
            affiliate_id: format!("aff-{:02}", a + 1),
            user_id: demo_id(&mut rng),
            email: Some(format!("partner{}@affiliates.example", a + 1)),
        };
        store.insert_affiliate(&affiliate)?;
        counts.affiliates += 1;

        for s in 0..SELLERS_PER_AFFILIATE {
            let n = a * SELLERS_PER_AFFILIATE + s + 1;
            let last = a + 1 == AFFILIATES && s + 1 == SELLERS_PER_AFFILIATE;
            let seller = Seller {
                seller_id: format!("sel-{n:02}"),
                referral_code: format!("REF{n:03}"),
                affiliate_id: affiliate.affiliate_id.clone(),
                email: Some(if last {
                    format!("qa-seller{n}@uorak.com")
                } else {
                    format!("seller{n}@sellers.example")
                }),
            };
            store.insert_seller(&seller)?;
            referral_codes.push(seller.referral_code);
            counts.sellers += 1;
        }
    }

    // ── Students ─────────────────────────────────────────────────

    for i in 0..students {
        let user_id = demo_id(&mut rng);
        let variant = if rng.gen_bool(0.6) {
            PricingVariant::Legacy
        } else {
            PricingVariant::Simplified
        };
        let dependents = if rng.gen_bool(0.3) { rng.gen_range(1..=3) } else { 0 };
        let flags = funnel(&mut rng);
        let email = if (i + 1) % TEST_ACCOUNT_EVERY == 0 {
            format!("qa{}@uorak.com", i + 1)
        } else {
            format!("student{}@mail.example", i + 1)
        };
        let seller_referral_code = if rng.gen_bool(0.7) {
            Some(referral_codes[rng.gen_range(0..referral_codes.len())].clone())
        } else {
            None
        };

        store.insert_student(&StudentRecord {
            user_id: user_id.clone(),
            email,
            pricing_variant: variant.as_str().to_string(),
            dependents,
            seller_referral_code,
            flags,
        })?;
        counts.students += 1;

        if rng.gen_bool(0.1) {
            store.upsert_fee_override(&user_id, FeeType::Scholarship, 500.0)?;
        }

        for fee_type in FeeType::ALL {
            if !flags.is_paid(fee_type) {
                continue;
            }
            let nominal = resolver.default_amount(variant, dependents, fee_type)?;
            let method = pick_method(&mut rng);
            // Processors report the amount net of their fee; manual rows
            // usually carry no amount at all.
            let amount = match method {
                Some(PaymentMethod::ProcessorA) | Some(PaymentMethod::ProcessorB) => {
                    Some((nominal * rng.gen_range(0.94..0.98) * 100.0).round() / 100.0)
                }
                _ => None,
            };
            let paid_at = if rng.gen_bool(0.95) {
                Some(days_before(as_of, rng.gen_range(0..120)))
            } else {
                None
            };
            store.insert_fee_payment(&user_id, fee_type, amount, method, paid_at)?;
            counts.payments += 1;
        }

        if flags.selection_process_paid {
            let applications = rng.gen_range(1..=2);
            for n in 0..applications {
                store.insert_application(&ScholarshipApplication {
                    application_id: demo_id(&mut rng),
                    student_id: user_id.clone(),
                    university_id: university_ids[rng.gen_range(0..university_ids.len())].clone(),
                    application_fee_paid: flags.application_fee_paid && n == 0,
                    created_at: days_before(as_of, rng.gen_range(30..180)),
                })?;
            }
        }
    }

    // ── Withdrawals ──────────────────────────────────────────────

    let owners = university_ids
        .iter()
        .map(|id| WithdrawalOwner::University(id.clone()))
        .chain((0..AFFILIATES).map(|a| WithdrawalOwner::Affiliate(format!("aff-{:02}", a + 1))));
    for owner in owners {
        let status = match rng.gen_range(0..3) {
            0 => WithdrawalStatus::Pending,
            1 => WithdrawalStatus::Approved,
            _ => WithdrawalStatus::Paid,
        };
        store.insert_withdrawal(&WithdrawalRequest {
            request_id: demo_id(&mut rng),
            owner,
            amount: f64::from(rng.gen_range(1..=4u32) * 100),
            status,
        })?;
        counts.withdrawals += 1;
    }

    log::info!(
        "demo: seeded {} students, {} payments, {} withdrawals (seed {seed})",
        counts.students, counts.payments, counts.withdrawals
    );
    Ok(counts)
}

/// Flags follow the marketplace funnel: each fee is only ever paid
/// after the one before it.
fn funnel(rng: &mut Pcg64Mcg) -> FeeFlags {
    let selection = rng.gen_bool(0.8);
    let application = selection && rng.gen_bool(0.7);
    let scholarship = application && rng.gen_bool(0.6);
    let i20 = scholarship && rng.gen_bool(0.7);
    FeeFlags {
        selection_process_paid: selection,
        application_fee_paid: application,
        scholarship_fee_paid: scholarship,
        i20_control_fee_paid: i20,
    }
}

fn pick_method(rng: &mut Pcg64Mcg) -> Option<PaymentMethod> {
    match rng.gen_range(0..100) {
        0..=24 => Some(PaymentMethod::Manual),
        25..=74 => Some(PaymentMethod::ProcessorA),
        75..=94 => Some(PaymentMethod::ProcessorB),
        _ => None,
    }
}

fn days_before(as_of: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    as_of - Duration::days(days) - Duration::hours(days % 9)
}

fn demo_id(rng: &mut Pcg64Mcg) -> String {
    uuid::Builder::from_random_bytes(rng.gen()).into_uuid().to_string()
}
