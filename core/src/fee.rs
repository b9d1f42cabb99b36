//! Fee vocabulary: fee types, pricing variants, payment methods,
//! and the per-student status flags and overrides.
//!
//! RULE: every place that iterates fee types uses FeeType::ALL so the
//! order (selection process → application → scholarship → I-20) is
//! identical everywhere.

use crate::{error::EngineError, types::Amount};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, str::FromStr};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum FeeType {
    SelectionProcess,
    Application,
    Scholarship,
    I20Control,
}

impl FeeType {
    pub const ALL: [FeeType; 4] = [
        FeeType::SelectionProcess,
        FeeType::Application,
        FeeType::Scholarship,
        FeeType::I20Control,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeeType::SelectionProcess => "selection_process",
            FeeType::Application      => "application",
            FeeType::Scholarship      => "scholarship",
            FeeType::I20Control       => "i20_control",
        }
    }
}

impl fmt::Display for FeeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeeType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "selection_process" => Ok(FeeType::SelectionProcess),
            "application"       => Ok(FeeType::Application),
            "scholarship"       => Ok(FeeType::Scholarship),
            "i20_control"       => Ok(FeeType::I20Control),
            other => Err(EngineError::configuration(format!("Unknown fee type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PricingVariant {
    Legacy,
    Simplified,
}

impl PricingVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            PricingVariant::Legacy     => "legacy",
            PricingVariant::Simplified => "simplified",
        }
    }
}

impl fmt::Display for PricingVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PricingVariant {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "legacy"     => Ok(PricingVariant::Legacy),
            "simplified" => Ok(PricingVariant::Simplified),
            other => Err(EngineError::configuration(format!("Unknown pricing variant: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Marked paid through a channel outside the integrated processors.
    Manual,
    ProcessorA,
    ProcessorB,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Manual     => "manual",
            PaymentMethod::ProcessorA => "processor_a",
            PaymentMethod::ProcessorB => "processor_b",
        }
    }

    /// Lenient parse used when reading ledger rows. Returns None for
    /// anything unrecognised; the caller decides how to surface it.
    pub fn parse_recorded(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "manual" | "outside" => Some(PaymentMethod::Manual),
            "processor_a"        => Some(PaymentMethod::ProcessorA),
            "processor_b"        => Some(PaymentMethod::ProcessorB),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four authoritative "was this ever paid" signals.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeeFlags {
    pub selection_process_paid: bool,
    pub application_fee_paid:   bool,
    pub scholarship_fee_paid:   bool,
    pub i20_control_fee_paid:   bool,
}

impl FeeFlags {
    pub fn is_paid(&self, fee_type: FeeType) -> bool {
        match fee_type {
            FeeType::SelectionProcess => self.selection_process_paid,
            FeeType::Application      => self.application_fee_paid,
            FeeType::Scholarship      => self.scholarship_fee_paid,
            FeeType::I20Control       => self.i20_control_fee_paid,
        }
    }

    pub fn all_paid() -> Self {
        Self {
            selection_process_paid: true,
            application_fee_paid:   true,
            scholarship_fee_paid:   true,
            i20_control_fee_paid:   true,
        }
    }

    pub fn with(mut self, fee_type: FeeType, paid: bool) -> Self {
        match fee_type {
            FeeType::SelectionProcess => self.selection_process_paid = paid,
            FeeType::Application      => self.application_fee_paid   = paid,
            FeeType::Scholarship      => self.scholarship_fee_paid   = paid,
            FeeType::I20Control       => self.i20_control_fee_paid   = paid,
        }
        self
    }
}

/// Admin-configured per-user amounts. A present entry fully replaces
/// the schedule default for that fee type (no surcharge on top).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FeeOverrides {
    amounts: HashMap<FeeType, Amount>,
}

impl FeeOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, fee_type: FeeType, amount: Amount) -> Self {
        self.amounts.insert(fee_type, amount);
        self
    }

    pub fn set(&mut self, fee_type: FeeType, amount: Amount) {
        self.amounts.insert(fee_type, amount);
    }

    pub fn get(&self, fee_type: FeeType) -> Option<Amount> {
        self.amounts.get(&fee_type).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
    }
}
