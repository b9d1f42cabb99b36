//! Payment method classifier: splits attributed revenue by the
//! ledger-recorded method.
//!
//! Only included fees with amount > 0 are bucketed. A fee with no
//! recorded method goes to `unknown`, unless the config folds unknown
//! into `manual`.

use crate::{
    attribution::StudentAttribution,
    config::ClassifierConfig,
    fee::PaymentMethod,
    types::Amount,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct MethodBucket {
    pub count: usize,
    pub revenue: Amount,
}

impl MethodBucket {
    fn add(&mut self, amount: Amount) {
        self.count += 1;
        self.revenue += amount;
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MethodBreakdown {
    pub manual: MethodBucket,
    pub processor_a: MethodBucket,
    pub processor_b: MethodBucket,
    pub unknown: MethodBucket,
}

impl MethodBreakdown {
    pub fn total_revenue(&self) -> Amount {
        self.manual.revenue + self.processor_a.revenue + self.processor_b.revenue + self.unknown.revenue
    }

    pub fn total_count(&self) -> usize {
        self.manual.count + self.processor_a.count + self.processor_b.count + self.unknown.count
    }
}

pub struct MethodClassifier {
    unknown_as_manual: bool,
}

impl MethodClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            unknown_as_manual: config.unknown_method_as_manual,
        }
    }

    pub fn classify<'a, I>(&self, students: I) -> MethodBreakdown
    where
        I: IntoIterator<Item = &'a StudentAttribution>,
    {
        let mut breakdown = MethodBreakdown::default();
        for fee in students.into_iter().flat_map(|s| s.included()) {
            let bucket = match fee.method {
                Some(PaymentMethod::Manual) => &mut breakdown.manual,
                Some(PaymentMethod::ProcessorA) => &mut breakdown.processor_a,
                Some(PaymentMethod::ProcessorB) => &mut breakdown.processor_b,
                None if self.unknown_as_manual => &mut breakdown.manual,
                None => &mut breakdown.unknown,
            };
            bucket.add(fee.amount);
        }
        breakdown
    }
}
