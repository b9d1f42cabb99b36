//! Fee reconciliation and balance computation for the scholarship
//! marketplace.
//!
//! Turns per-student payment flags, fee overrides, ledger amounts and
//! payment dates into revenue, payment-method breakdowns and
//! withdrawable balances for universities, affiliates and sellers.
//! See engine.rs for the pipeline order.

pub mod aggregator;
pub mod application;
pub mod attribution;
pub mod balance;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod exclusion;
pub mod fee;
pub mod fee_schedule;
pub mod ledger;
pub mod model;
pub mod store;
pub mod summary;
pub mod types;
