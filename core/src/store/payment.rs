use super::FeeStore;
use crate::{
    error::EngineResult,
    fee::{FeeType, PaymentMethod},
    ledger::PaymentRecord,
    types::Amount,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

impl FeeStore {
    pub fn insert_fee_payment(
        &self,
        user_id: &str,
        fee_type: FeeType,
        amount: Option<Amount>,
        method: Option<PaymentMethod>,
        paid_at: Option<DateTime<Utc>>,
    ) -> EngineResult<()> {
        self.conn.execute(
            "INSERT INTO fee_payment (user_id, fee_type, amount, payment_method, paid_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id, fee_type) DO UPDATE SET
                amount = excluded.amount,
                payment_method = excluded.payment_method,
                paid_at = excluded.paid_at",
            params![
                user_id,
                fee_type.as_str(),
                amount,
                method.map(|m| m.as_str()),
                paid_at,
            ],
        )?;
        Ok(())
    }

    /// Collected amount for one (user, fee type). NULL amounts read as None.
    pub fn fee_amount(&self, user_id: &str, fee_type: FeeType) -> EngineResult<Option<Amount>> {
        let amount = self
            .conn
            .query_row(
                "SELECT amount FROM fee_payment WHERE user_id = ?1 AND fee_type = ?2",
                params![user_id, fee_type.as_str()],
                |row| row.get::<_, Option<f64>>(0),
            )
            .optional()?;
        Ok(amount.flatten())
    }

    /// Payment date and method for one (user, fee type).
    /// A recorded method the engine does not recognise reads as None.
    pub fn fee_payment(
        &self,
        user_id: &str,
        fee_type: FeeType,
    ) -> EngineResult<Option<PaymentRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT paid_at, payment_method FROM fee_payment
                 WHERE user_id = ?1 AND fee_type = ?2",
                params![user_id, fee_type.as_str()],
                |row| {
                    Ok((
                        row.get::<_, Option<DateTime<Utc>>>(0)?,
                        row.get::<_, Option<String>>(1)?,
                    ))
                },
            )
            .optional()?;

        Ok(row.map(|(paid_at, method)| {
            let method = method.and_then(|raw| {
                let parsed = PaymentMethod::parse_recorded(&raw);
                if parsed.is_none() {
                    log::warn!("store: unrecognised payment method '{raw}' for {user_id}/{fee_type}");
                }
                parsed
            });
            PaymentRecord { paid_at, method }
        }))
    }
}
