//! Faculty load-risk and section-coverage-gap estimation for a term's course offerings.
//!
//! [`risk::compute_risk`] turns course demand records into per-course coverage gaps and
//! bounded risk scores plus summary KPIs. [`export`] and [`report`] project the result for
//! CSV, chart and markdown consumers.

pub mod error;
pub mod export;
pub mod models;
pub mod report;
pub mod risk;
pub mod source;

pub use error::EstimateError;
pub use export::{bucket_risk_for_chart, project_for_export, ExportScope};
pub use risk::{compute_risk, DEFAULT_RISK_THRESHOLD};
