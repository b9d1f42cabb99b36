//! Marketplace records consumed by the engine.
//!
//! Everything here is a read-only view of data owned by the admin and
//! payment subsystems. The engine never writes any of it back.

use crate::{
    error::{EngineError, EngineResult},
    fee::{FeeFlags, FeeOverrides},
    types::{Amount, EntityId, UserId},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudentRecord {
    pub user_id: UserId,
    pub email: String,
    /// Raw value from the profile store. Parsed per computation so an
    /// unknown variant fails only this student.
    pub pricing_variant: String,
    pub dependents: u32,
    pub seller_referral_code: Option<String>,
    pub flags: FeeFlags,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Seller {
    pub seller_id: EntityId,
    pub referral_code: String,
    pub affiliate_id: EntityId,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Affiliate {
    pub affiliate_id: EntityId,
    pub user_id: UserId,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct University {
    pub university_id: EntityId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScholarshipApplication {
    pub application_id: EntityId,
    pub student_id: UserId,
    pub university_id: EntityId,
    pub application_fee_paid: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Paid,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending  => "pending",
            WithdrawalStatus::Approved => "approved",
            WithdrawalStatus::Paid     => "paid",
        }
    }

    pub fn parse(s: &str) -> EngineResult<Self> {
        match s {
            "pending"  => Ok(WithdrawalStatus::Pending),
            "approved" => Ok(WithdrawalStatus::Approved),
            "paid"     => Ok(WithdrawalStatus::Paid),
            other => Err(EngineError::configuration(format!("Unknown withdrawal status: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum WithdrawalOwner {
    University(EntityId),
    Affiliate(EntityId),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WithdrawalRequest {
    pub request_id: EntityId,
    pub owner: WithdrawalOwner,
    pub amount: Amount,
    pub status: WithdrawalStatus,
}

/// Inclusive calendar-date window, evaluated in UTC.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportingWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl ReportingWindow {
    pub fn new(from: NaiveDate, to: NaiveDate) -> EngineResult<Self> {
        if from > to {
            return Err(EngineError::InvalidWindow { from, to });
        }
        Ok(Self { from, to })
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self { from: day, to: day }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let day = at.date_naive();
        self.from <= day && day <= self.to
    }
}

/// Referral codes and affiliates removed as test accounts. Links that
/// point at them are dropped quietly; only links to entities that never
/// existed are aggregation warnings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExcludedLinks {
    pub referral_codes: HashSet<String>,
    pub affiliate_ids: HashSet<EntityId>,
}

impl ExcludedLinks {
    pub fn is_empty(&self) -> bool {
        self.referral_codes.is_empty() && self.affiliate_ids.is_empty()
    }
}

/// Everything one computation reads, captured up front.
#[derive(Debug, Clone, Default)]
pub struct MarketplaceDirectory {
    pub students: Vec<StudentRecord>,
    pub overrides: HashMap<UserId, FeeOverrides>,
    pub sellers: Vec<Seller>,
    pub affiliates: Vec<Affiliate>,
    pub universities: Vec<University>,
    pub applications: Vec<ScholarshipApplication>,
    pub withdrawals: Vec<WithdrawalRequest>,
    /// Filled by ExclusionFilter::apply; empty for a directory read from
    /// the stores.
    pub excluded: ExcludedLinks,
}

impl MarketplaceDirectory {
    pub fn overrides_for(&self, user_id: &str) -> Option<&FeeOverrides> {
        self.overrides.get(user_id)
    }

    pub fn applications_by_student(&self) -> HashMap<&str, Vec<&ScholarshipApplication>> {
        let mut by_student: HashMap<&str, Vec<&ScholarshipApplication>> = HashMap::new();
        for app in &self.applications {
            by_student.entry(app.student_id.as_str()).or_default().push(app);
        }
        by_student
    }

    pub fn withdrawals_for<'a>(
        &'a self,
        owner: &'a WithdrawalOwner,
    ) -> impl Iterator<Item = &'a WithdrawalRequest> + 'a {
        self.withdrawals.iter().filter(move |w| &w.owner == owner)
    }
}
