use super::FeeStore;
use crate::{
    error::{EngineError, EngineResult},
    model::{
        Affiliate, ExcludedLinks, MarketplaceDirectory, ScholarshipApplication, Seller, University,
        WithdrawalOwner, WithdrawalRequest, WithdrawalStatus,
    },
};
use chrono::{DateTime, Utc};
use rusqlite::params;

impl FeeStore {
    // ── Universities ──────────────────────────────────────────────

    pub fn insert_university(&self, u: &University) -> EngineResult<()> {
        self.conn.execute(
            "INSERT INTO university (university_id, name) VALUES (?1, ?2)",
            params![u.university_id, u.name],
        )?;
        Ok(())
    }

    pub fn universities(&self) -> EngineResult<Vec<University>> {
        let mut stmt = self.conn.prepare(
            "SELECT university_id, name FROM university ORDER BY university_id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(University {
                    university_id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── Referral directory ────────────────────────────────────────

    pub fn insert_affiliate(&self, a: &Affiliate) -> EngineResult<()> {
        self.conn.execute(
            "INSERT INTO affiliate (affiliate_id, user_id, email) VALUES (?1, ?2, ?3)",
            params![a.affiliate_id, a.user_id, a.email],
        )?;
        Ok(())
    }

    pub fn insert_seller(&self, s: &Seller) -> EngineResult<()> {
        self.conn.execute(
            "INSERT INTO seller (seller_id, referral_code, affiliate_id, email)
             VALUES (?1, ?2, ?3, ?4)",
            params![s.seller_id, s.referral_code, s.affiliate_id, s.email],
        )?;
        Ok(())
    }

    pub fn affiliates(&self) -> EngineResult<Vec<Affiliate>> {
        let mut stmt = self.conn.prepare(
            "SELECT affiliate_id, user_id, email FROM affiliate ORDER BY affiliate_id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Affiliate {
                    affiliate_id: row.get(0)?,
                    user_id: row.get(1)?,
                    email: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn sellers(&self) -> EngineResult<Vec<Seller>> {
        let mut stmt = self.conn.prepare(
            "SELECT seller_id, referral_code, affiliate_id, email
             FROM seller ORDER BY seller_id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Seller {
                    seller_id: row.get(0)?,
                    referral_code: row.get(1)?,
                    affiliate_id: row.get(2)?,
                    email: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── Scholarship applications ──────────────────────────────────

    pub fn insert_application(&self, a: &ScholarshipApplication) -> EngineResult<()> {
        self.conn.execute(
            "INSERT INTO scholarship_application
             (application_id, student_id, university_id, application_fee_paid, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                a.application_id,
                a.student_id,
                a.university_id,
                a.application_fee_paid,
                a.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn applications(&self) -> EngineResult<Vec<ScholarshipApplication>> {
        let mut stmt = self.conn.prepare(
            "SELECT application_id, student_id, university_id, application_fee_paid, created_at
             FROM scholarship_application
             ORDER BY student_id ASC, created_at ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ScholarshipApplication {
                    application_id: row.get(0)?,
                    student_id: row.get(1)?,
                    university_id: row.get(2)?,
                    application_fee_paid: row.get(3)?,
                    created_at: row.get::<_, DateTime<Utc>>(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── Withdrawal requests ───────────────────────────────────────

    pub fn insert_withdrawal(&self, w: &WithdrawalRequest) -> EngineResult<()> {
        let (kind, owner_id) = match &w.owner {
            WithdrawalOwner::University(id) => ("university", id),
            WithdrawalOwner::Affiliate(id)  => ("affiliate", id),
        };
        self.conn.execute(
            "INSERT INTO withdrawal_request (request_id, owner_kind, owner_id, amount, status)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![w.request_id, kind, owner_id, w.amount, w.status.as_str()],
        )?;
        Ok(())
    }

    pub fn withdrawals(&self) -> EngineResult<Vec<WithdrawalRequest>> {
        let mut stmt = self.conn.prepare(
            "SELECT request_id, owner_kind, owner_id, amount, status
             FROM withdrawal_request ORDER BY request_id ASC",
        )?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(request_id, kind, owner_id, amount, status)| {
                let owner = match kind.as_str() {
                    "university" => WithdrawalOwner::University(owner_id),
                    "affiliate"  => WithdrawalOwner::Affiliate(owner_id),
                    other => {
                        return Err(EngineError::configuration(format!(
                            "Unknown withdrawal owner kind: {other}"
                        )))
                    }
                };
                Ok(WithdrawalRequest {
                    request_id,
                    owner,
                    amount,
                    status: WithdrawalStatus::parse(&status)?,
                })
            })
            .collect()
    }

    // ── Snapshot ──────────────────────────────────────────────────

    /// Read every store the engine consumes into one directory.
    pub fn load_directory(&self) -> EngineResult<MarketplaceDirectory> {
        let directory = MarketplaceDirectory {
            students: self.students()?,
            overrides: self.all_overrides()?,
            sellers: self.sellers()?,
            affiliates: self.affiliates()?,
            universities: self.universities()?,
            applications: self.applications()?,
            withdrawals: self.withdrawals()?,
            excluded: ExcludedLinks::default(),
        };
        log::debug!(
            "store: directory loaded ({} students, {} sellers, {} affiliates, {} universities)",
            directory.students.len(),
            directory.sellers.len(),
            directory.affiliates.len(),
            directory.universities.len(),
        );
        Ok(directory)
    }
}
