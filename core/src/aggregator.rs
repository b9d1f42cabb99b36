//! Aggregator: rolls per-student attributions up the two hierarchies.
//!
//!   referral:    student → seller (by referral code) → affiliate
//!   application: student → university (via the current application)
//!
//! RULES:
//!   - A student reaches at most one seller/affiliate chain and exactly
//!     one university (or none) per pass. No fan-out.
//!   - Dangling links are skipped with a warning, never an abort.
//!   - Links to sellers or affiliates removed as test accounts are skipped
//!     without a warning.
//!   - Every seller, affiliate and university in the directory gets a
//!     rollup, even an empty one.
//!   - Ordered maps only, so repeated runs iterate identically.

use crate::{
    application::current_application,
    attribution::StudentAttribution,
    error::EngineWarning,
    model::MarketplaceDirectory,
    types::{Amount, EntityId, UserId},
};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub struct Rollup<'a> {
    pub entity_id: EntityId,
    pub students: Vec<&'a StudentAttribution>,
    pub total_revenue: Amount,
    /// University: current application has its fee paid.
    /// Seller/affiliate: student's attributed total is positive.
    pub paid_count: usize,
}

impl<'a> Rollup<'a> {
    fn empty(entity_id: &str) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            students: Vec::new(),
            total_revenue: 0.0,
            paid_count: 0,
        }
    }

    fn add(&mut self, student: &'a StudentAttribution, paid: bool) {
        self.total_revenue += student.total;
        self.students.push(student);
        if paid {
            self.paid_count += 1;
        }
    }

    pub fn student_count(&self) -> usize {
        self.students.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Aggregation<'a> {
    pub sellers: BTreeMap<EntityId, Rollup<'a>>,
    pub affiliates: BTreeMap<EntityId, Rollup<'a>>,
    pub universities: BTreeMap<EntityId, Rollup<'a>>,
    pub warnings: Vec<EngineWarning>,
}

pub struct Aggregator;

impl Aggregator {
    pub fn aggregate<'a>(
        directory: &MarketplaceDirectory,
        attributions: &'a BTreeMap<UserId, StudentAttribution>,
    ) -> Aggregation<'a> {
        let mut warnings = Vec::new();
        let sellers = Self::by_seller(directory, attributions, &mut warnings);
        let affiliates = Self::by_affiliate(directory, &sellers, &mut warnings);
        let universities = Self::by_university(directory, attributions, &mut warnings);

        for w in &warnings {
            log::warn!("aggregator: {w:?}");
        }

        Aggregation {
            sellers,
            affiliates,
            universities,
            warnings,
        }
    }

    /// Student → seller, matched on the student's referral code.
    pub fn by_seller<'a>(
        directory: &MarketplaceDirectory,
        attributions: &'a BTreeMap<UserId, StudentAttribution>,
        warnings: &mut Vec<EngineWarning>,
    ) -> BTreeMap<EntityId, Rollup<'a>> {
        let mut rollups: BTreeMap<EntityId, Rollup<'a>> = directory
            .sellers
            .iter()
            .map(|s| (s.seller_id.clone(), Rollup::empty(&s.seller_id)))
            .collect();
        let by_code: HashMap<&str, &str> = directory
            .sellers
            .iter()
            .map(|s| (s.referral_code.as_str(), s.seller_id.as_str()))
            .collect();
        let mut seen: HashSet<&str> = HashSet::new();

        for student in &directory.students {
            if !seen.insert(student.user_id.as_str()) {
                continue;
            }
            let Some(code) = student.seller_referral_code.as_deref() else {
                continue;
            };
            let Some(attribution) = attributions.get(&student.user_id) else {
                continue;
            };
            match by_code.get(code).and_then(|id| rollups.get_mut(*id)) {
                Some(rollup) => rollup.add(attribution, attribution.total > 0.0),
                None if directory.excluded.referral_codes.contains(code) => {
                    log::debug!(
                        "aggregator: {} referred by excluded seller code {code}",
                        student.user_id
                    );
                }
                None => warnings.push(EngineWarning::UnknownSeller {
                    student_id: student.user_id.clone(),
                    referral_code: code.to_string(),
                }),
            }
        }

        rollups
    }

    /// Seller → affiliate. An affiliate's students are the union of its
    /// sellers' students; its total is the sum of their totals.
    pub fn by_affiliate<'a>(
        directory: &MarketplaceDirectory,
        sellers: &BTreeMap<EntityId, Rollup<'a>>,
        warnings: &mut Vec<EngineWarning>,
    ) -> BTreeMap<EntityId, Rollup<'a>> {
        let mut rollups: BTreeMap<EntityId, Rollup<'a>> = directory
            .affiliates
            .iter()
            .map(|a| (a.affiliate_id.clone(), Rollup::empty(&a.affiliate_id)))
            .collect();

        for seller in &directory.sellers {
            let Some(seller_rollup) = sellers.get(&seller.seller_id) else {
                continue;
            };
            match rollups.get_mut(&seller.affiliate_id) {
                Some(rollup) => {
                    rollup.total_revenue += seller_rollup.total_revenue;
                    rollup.paid_count += seller_rollup.paid_count;
                    rollup.students.extend(seller_rollup.students.iter().copied());
                }
                None if directory.excluded.affiliate_ids.contains(&seller.affiliate_id) => {
                    log::debug!(
                        "aggregator: seller {} belongs to excluded affiliate {}",
                        seller.seller_id,
                        seller.affiliate_id
                    );
                }
                None => warnings.push(EngineWarning::UnknownAffiliate {
                    seller_id: seller.seller_id.clone(),
                    affiliate_id: seller.affiliate_id.clone(),
                }),
            }
        }

        rollups
    }

    /// Student → university via the current application.
    pub fn by_university<'a>(
        directory: &MarketplaceDirectory,
        attributions: &'a BTreeMap<UserId, StudentAttribution>,
        warnings: &mut Vec<EngineWarning>,
    ) -> BTreeMap<EntityId, Rollup<'a>> {
        let mut rollups: BTreeMap<EntityId, Rollup<'a>> = directory
            .universities
            .iter()
            .map(|u| (u.university_id.clone(), Rollup::empty(&u.university_id)))
            .collect();
        let by_student = directory.applications_by_student();
        let mut seen: HashSet<&str> = HashSet::new();

        for student in &directory.students {
            if !seen.insert(student.user_id.as_str()) {
                continue;
            }
            let Some(attribution) = attributions.get(&student.user_id) else {
                continue;
            };
            let Some(current) = by_student
                .get(student.user_id.as_str())
                .and_then(|apps| current_application(apps.iter().copied()))
            else {
                continue;
            };
            match rollups.get_mut(&current.university_id) {
                Some(rollup) => rollup.add(attribution, current.application_fee_paid),
                None => warnings.push(EngineWarning::UnknownUniversity {
                    student_id: student.user_id.clone(),
                    university_id: current.university_id.clone(),
                }),
            }
        }

        rollups
    }
}
