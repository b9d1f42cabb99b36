use super::FeeStore;
use crate::{
    error::EngineResult,
    fee::{FeeFlags, FeeOverrides, FeeType},
    model::StudentRecord,
    types::{Amount, UserId},
};
use rusqlite::params;
use std::collections::HashMap;

impl FeeStore {
    // ── Student profile ───────────────────────────────────────────

    pub fn insert_student(&self, s: &StudentRecord) -> EngineResult<()> {
        self.conn.execute(
            "INSERT INTO student_profile (
                user_id, email, pricing_variant, dependents, seller_referral_code,
                selection_process_paid, application_fee_paid,
                scholarship_fee_paid, i20_control_fee_paid
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                s.user_id,
                s.email,
                s.pricing_variant,
                s.dependents,
                s.seller_referral_code,
                s.flags.selection_process_paid,
                s.flags.application_fee_paid,
                s.flags.scholarship_fee_paid,
                s.flags.i20_control_fee_paid,
            ],
        )?;
        Ok(())
    }

    pub fn update_fee_flags(&self, user_id: &str, flags: &FeeFlags) -> EngineResult<()> {
        self.conn.execute(
            "UPDATE student_profile SET
                selection_process_paid = ?1, application_fee_paid = ?2,
                scholarship_fee_paid = ?3, i20_control_fee_paid = ?4
             WHERE user_id = ?5",
            params![
                flags.selection_process_paid,
                flags.application_fee_paid,
                flags.scholarship_fee_paid,
                flags.i20_control_fee_paid,
                user_id,
            ],
        )?;
        Ok(())
    }

    pub fn students(&self) -> EngineResult<Vec<StudentRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, email, pricing_variant, dependents, seller_referral_code,
                    selection_process_paid, application_fee_paid,
                    scholarship_fee_paid, i20_control_fee_paid
             FROM student_profile
             ORDER BY user_id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(StudentRecord {
                    user_id: row.get(0)?,
                    email: row.get(1)?,
                    pricing_variant: row.get(2)?,
                    // Out-of-range counts fail the read instead of wrapping.
                    dependents: row.get::<_, u32>(3)?,
                    seller_referral_code: row.get(4)?,
                    flags: FeeFlags {
                        selection_process_paid: row.get(5)?,
                        application_fee_paid:   row.get(6)?,
                        scholarship_fee_paid:   row.get(7)?,
                        i20_control_fee_paid:   row.get(8)?,
                    },
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── Fee overrides ─────────────────────────────────────────────

    pub fn upsert_fee_override(
        &self,
        user_id: &str,
        fee_type: FeeType,
        amount: Amount,
    ) -> EngineResult<()> {
        self.conn.execute(
            "INSERT INTO fee_override (user_id, fee_type, amount) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id, fee_type) DO UPDATE SET amount = excluded.amount",
            params![user_id, fee_type.as_str(), amount],
        )?;
        Ok(())
    }

    /// Sparse override map for one user. Rows naming an unknown fee type
    /// are skipped with a warning.
    pub fn overrides_for(&self, user_id: &str) -> EngineResult<FeeOverrides> {
        let mut stmt = self.conn.prepare(
            "SELECT fee_type, amount FROM fee_override WHERE user_id = ?1",
        )?;
        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut overrides = FeeOverrides::new();
        for (fee_type, amount) in rows {
            match fee_type.parse::<FeeType>() {
                Ok(fee) => overrides.set(fee, amount),
                Err(e) => log::warn!("store: skipping override for {user_id}: {e}"),
            }
        }
        Ok(overrides)
    }

    pub fn all_overrides(&self) -> EngineResult<HashMap<UserId, FeeOverrides>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, fee_type, amount FROM fee_override ORDER BY user_id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, f64>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut out: HashMap<UserId, FeeOverrides> = HashMap::new();
        for (user_id, fee_type, amount) in rows {
            match fee_type.parse::<FeeType>() {
                Ok(fee) => out.entry(user_id).or_default().set(fee, amount),
                Err(e) => log::warn!("store: skipping override for {user_id}: {e}"),
            }
        }
        Ok(out)
    }
}
