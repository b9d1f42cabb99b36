//! Test-account exclusion.
//!
//! RULE: the exclusion switch is always an explicit argument. Nothing
//! in the engine reads it from the environment.

use crate::model::MarketplaceDirectory;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExclusionFilter {
    pub exclude_test_accounts: bool,
    /// Case-insensitive glob; `*` matches any run of characters.
    pub test_email_pattern: String,
}

/// What was removed, for logging and the report.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ExclusionSummary {
    pub students: usize,
    pub sellers: usize,
    pub affiliates: usize,
}

impl ExclusionFilter {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_pattern(pattern: impl Into<String>) -> Self {
        Self {
            exclude_test_accounts: true,
            test_email_pattern: pattern.into(),
        }
    }

    fn is_active(&self) -> bool {
        self.exclude_test_accounts && !self.test_email_pattern.is_empty()
    }

    pub fn is_test_email(&self, email: &str) -> bool {
        self.is_active() && glob_match(&self.test_email_pattern.to_lowercase(), &email.to_lowercase())
    }

    /// Remove matching students, sellers and affiliates (and the overrides
    /// and applications that belong to removed students). The removed
    /// sellers' referral codes and the removed affiliate ids are recorded
    /// on the returned directory's `excluded` links.
    pub fn apply(&self, directory: &MarketplaceDirectory) -> (MarketplaceDirectory, ExclusionSummary) {
        if !self.is_active() {
            return (directory.clone(), ExclusionSummary::default());
        }

        let mut out = directory.clone();
        let mut summary = ExclusionSummary::default();

        let removed_students: HashSet<String> = directory
            .students
            .iter()
            .filter(|s| self.is_test_email(&s.email))
            .map(|s| s.user_id.clone())
            .collect();
        summary.students = removed_students.len();
        out.students.retain(|s| !removed_students.contains(&s.user_id));
        out.overrides.retain(|user_id, _| !removed_students.contains(user_id));
        out.applications.retain(|a| !removed_students.contains(&a.student_id));

        let (test_sellers, sellers): (Vec<_>, Vec<_>) = out
            .sellers
            .into_iter()
            .partition(|s| s.email.as_deref().is_some_and(|e| self.is_test_email(e)));
        out.sellers = sellers;
        summary.sellers = test_sellers.len();
        out.excluded
            .referral_codes
            .extend(test_sellers.into_iter().map(|s| s.referral_code));

        let (test_affiliates, affiliates): (Vec<_>, Vec<_>) = out
            .affiliates
            .into_iter()
            .partition(|a| a.email.as_deref().is_some_and(|e| self.is_test_email(e)));
        out.affiliates = affiliates;
        summary.affiliates = test_affiliates.len();
        out.excluded
            .affiliate_ids
            .extend(test_affiliates.into_iter().map(|a| a.affiliate_id));

        (out, summary)
    }
}

/// Iterative `*`-only glob match with single-star backtracking.
fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if pi < p.len() && p[pi] == t[ti] {
            pi += 1;
            ti += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}
