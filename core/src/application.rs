//! The "current application" rule.
//!
//! RULE: this is the only implementation of the tie-break. Revenue
//! grouping and university-facing student listings both call it.
//!
//!   1. applications with the application fee paid win;
//!   2. within the winning group, the most recently created wins;
//!   3. equal timestamps fall back to the greater application id.

use crate::model::{MarketplaceDirectory, ScholarshipApplication, StudentRecord};
use std::cmp::Ordering;

pub fn current_application<'a, I>(applications: I) -> Option<&'a ScholarshipApplication>
where
    I: IntoIterator<Item = &'a ScholarshipApplication>,
{
    applications.into_iter().max_by(|a, b| rank(a, b))
}

fn rank(a: &ScholarshipApplication, b: &ScholarshipApplication) -> Ordering {
    a.application_fee_paid
        .cmp(&b.application_fee_paid)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.application_id.cmp(&b.application_id))
}

/// Students whose current application is at `university_id`, in
/// directory order. University-facing listings use this, so they can
/// never disagree with revenue grouping.
pub fn students_at_university<'d>(
    directory: &'d MarketplaceDirectory,
    university_id: &str,
) -> Vec<&'d StudentRecord> {
    let by_student = directory.applications_by_student();
    directory
        .students
        .iter()
        .filter(|student| {
            by_student
                .get(student.user_id.as_str())
                .and_then(|apps| current_application(apps.iter().copied()))
                .is_some_and(|current| current.university_id == university_id)
        })
        .collect()
}
