//! Fee schedule resolver: nominal amount for one fee type.
//!
//! Pure and deterministic. No I/O. Precedence:
//!   1. per-user override (returned unchanged, no surcharge). A negative
//!      or non-finite override is a configuration error.
//!   2. base table (variant × fee type)
//!   3. + dependents × surcharge, selection process under legacy only

use crate::{
    config::FeeScheduleConfig,
    error::{EngineError, EngineResult},
    fee::{FeeOverrides, FeeType, PricingVariant},
    types::Amount,
};

pub struct FeeScheduleResolver<'a> {
    schedule: &'a FeeScheduleConfig,
}

impl<'a> FeeScheduleResolver<'a> {
    pub fn new(schedule: &'a FeeScheduleConfig) -> Self {
        Self { schedule }
    }

    /// Base amount plus surcharge, ignoring overrides.
    pub fn default_amount(
        &self,
        variant: PricingVariant,
        dependents: u32,
        fee_type: FeeType,
    ) -> EngineResult<Amount> {
        let base = self
            .schedule
            .base_amounts
            .get(&(variant, fee_type))
            .copied()
            .ok_or_else(|| {
                EngineError::configuration(format!(
                    "Fee schedule has no {fee_type} amount for the {variant} variant"
                ))
            })?;

        if fee_type == FeeType::SelectionProcess && variant == PricingVariant::Legacy {
            Ok(base + dependents as Amount * self.schedule.per_dependent_surcharge)
        } else {
            Ok(base)
        }
    }

    /// The user's override for `fee_type`, if set and usable.
    pub fn override_amount(
        overrides: Option<&FeeOverrides>,
        fee_type: FeeType,
    ) -> EngineResult<Option<Amount>> {
        match overrides.and_then(|o| o.get(fee_type)) {
            Some(amount) if !amount.is_finite() || amount < 0.0 => {
                Err(EngineError::configuration(format!(
                    "Fee override for {fee_type} is {amount}; overrides must be finite and non-negative"
                )))
            }
            other => Ok(other),
        }
    }

    pub fn resolve(
        &self,
        variant: PricingVariant,
        dependents: u32,
        overrides: Option<&FeeOverrides>,
        fee_type: FeeType,
    ) -> EngineResult<Amount> {
        match Self::override_amount(overrides, fee_type)? {
            Some(amount) => Ok(amount),
            None => self.default_amount(variant, dependents, fee_type),
        }
    }
}
