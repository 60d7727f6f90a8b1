//! CRM Scoring & Derived Metrics API Library
//!
//! Computes lead scores, customer health, campaign funnel rates and
//! invoice/payment/opportunity money figures over a Postgres-backed CRM,
//! and serves them over HTTP.
//!
//! # Modules
//!
//! - `api`: Route table and API definitions.
//! - `core`: Core business logic.
//! - `data`: Data access layer.
//! - `config`: Configuration and scoring rules.
//! - `db`: Database connection and pool management.
//! - `db_storage`: Database storage operations.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `metrics`: Pure calculators (lead, health, campaign, financial, catalog, service levels).
//! - `models`: CRM records, enums and API payloads.
//! - `services`: Transactional operations over the calculators.
//! - `tags`: Duplicate-free label lists.
//! - `validation`: Input precondition checks.

pub mod api;
pub mod core;
pub mod data;

// Re-export primary modules for shared use in tests and other binaries
pub mod config;
pub mod db;
pub mod db_storage;
pub mod errors;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod services;
pub mod tags;
pub mod validation;
