use crate::{
    exclusion::ExclusionFilter,
    fee::{FeeType, PricingVariant},
    types::Amount,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_LEDGER_BATCH_SIZE: usize = 10;

// ── Fee schedule ───────────────────────────────────────────────────

/// One cell of the (variant × fee type) base-amount table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseFeeAmount {
    pub pricing_variant: PricingVariant,
    pub fee_type: FeeType,
    pub amount: Amount,
}

#[derive(Debug, Clone)]
pub struct FeeScheduleConfig {
    pub base_amounts: HashMap<(PricingVariant, FeeType), Amount>,
    /// Added once per dependent to the legacy selection-process fee.
    pub per_dependent_surcharge: Amount,
}

#[derive(Debug, Clone, Deserialize)]
struct FeeScheduleFile {
    base_amounts: Vec<BaseFeeAmount>,
    per_dependent_surcharge: Amount,
}

// ── Ledger reader ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerReaderConfig {
    /// Users looked up concurrently per sub-batch.
    pub batch_size: usize,
}

// ── Classifier ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Fold fees with no recorded method into the manual bucket instead
    /// of the separate unknown bucket.
    #[serde(default)]
    pub unknown_method_as_manual: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct EngineFile {
    ledger: LedgerReaderConfig,
    classifier: ClassifierConfig,
    #[serde(default)]
    default_test_email_pattern: String,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub fee_schedule: FeeScheduleConfig,
    pub ledger: LedgerReaderConfig,
    pub classifier: ClassifierConfig,
    /// Pattern used to build an ExclusionFilter when the caller asks for
    /// test accounts to be excluded without naming a pattern.
    pub default_test_email_pattern: String,
}

impl EngineConfig {
    /// Load from the data/ directory.
    /// In tests, use EngineConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let fee_path = format!("{data_dir}/fees/fee_schedule.json");
        let fee_content = std::fs::read_to_string(&fee_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {fee_path}: {e}"))?;
        let fee_file: FeeScheduleFile = serde_json::from_str(&fee_content)?;
        let fee_schedule = FeeScheduleConfig {
            base_amounts: fee_file
                .base_amounts
                .into_iter()
                .map(|b| ((b.pricing_variant, b.fee_type), b.amount))
                .collect(),
            per_dependent_surcharge: fee_file.per_dependent_surcharge,
        };

        let engine_path = format!("{data_dir}/engine/engine_config.json");
        let engine_content = std::fs::read_to_string(&engine_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {engine_path}: {e}"))?;
        let engine_file: EngineFile = serde_json::from_str(&engine_content)?;

        if engine_file.ledger.batch_size == 0 {
            anyhow::bail!("{engine_path}: ledger.batch_size must be at least 1");
        }

        Ok(Self {
            fee_schedule,
            ledger: engine_file.ledger,
            classifier: engine_file.classifier,
            default_test_email_pattern: engine_file.default_test_email_pattern,
        })
    }

    pub fn default_test() -> Self {
        let base_amounts = [
            ((PricingVariant::Legacy, FeeType::SelectionProcess), 400.0),
            ((PricingVariant::Legacy, FeeType::Application), 350.0),
            ((PricingVariant::Legacy, FeeType::Scholarship), 900.0),
            ((PricingVariant::Legacy, FeeType::I20Control), 900.0),
            ((PricingVariant::Simplified, FeeType::SelectionProcess), 350.0),
            ((PricingVariant::Simplified, FeeType::Application), 350.0),
            ((PricingVariant::Simplified, FeeType::Scholarship), 550.0),
            ((PricingVariant::Simplified, FeeType::I20Control), 900.0),
        ]
        .into();

        Self {
            fee_schedule: FeeScheduleConfig {
                base_amounts,
                per_dependent_surcharge: 150.0,
            },
            ledger: LedgerReaderConfig {
                batch_size: DEFAULT_LEDGER_BATCH_SIZE,
            },
            classifier: ClassifierConfig {
                unknown_method_as_manual: false,
            },
            default_test_email_pattern: "*@uorak.com".into(),
        }
    }

    /// The exclusion filter a caller gets by flipping the switch on
    /// without supplying its own pattern.
    pub fn exclusion(&self, exclude_test_accounts: bool) -> ExclusionFilter {
        ExclusionFilter {
            exclude_test_accounts,
            test_email_pattern: self.default_test_email_pattern.clone(),
        }
    }
}
