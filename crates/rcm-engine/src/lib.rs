//! Multi-tenant healthcare claim adjudication.
//!
//! Claims are checked against tenant rules, a fixed table of facility, service
//! and diagnosis constraints, and a best-effort advisory ladder; the results
//! fold into one verdict per claim and per-category tenant metrics.

pub mod adjudication;
pub mod config;
pub mod error;
pub mod telemetry;
