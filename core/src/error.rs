use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Unknown fee type or pricing variant, or an incomplete fee schedule.
    /// Fatal to the single computation that hit it, never to a batch.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid reporting window: {from} is after {to}")]
    InvalidWindow { from: NaiveDate, to: NaiveDate },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EngineError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// A non-fatal problem found while computing a report. Collected on the
/// report; never aborts it.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineWarning {
    /// A student's referral code matches no seller.
    UnknownSeller { student_id: String, referral_code: String },
    /// A seller's owning affiliate does not exist.
    UnknownAffiliate { seller_id: String, affiliate_id: String },
    /// A student's current application names a university that does not exist.
    UnknownUniversity { student_id: String, university_id: String },
    /// The student's fees could not be computed; they contribute zero.
    Configuration { student_id: String, message: String },
    /// A ledger entry could not be read.
    LookupFailed { student_id: String, fee_type: String, message: String },
}
