//! resilience-core
//!
//! Blast-radius analysis, urgency scoring, operation-risk scoring, and
//! patch-campaign orchestration for a multi-cloud infrastructure
//! resilience platform. The crate is organized around the same
//! boundary the platform draws at runtime: pure policies (`scoring`,
//! `operation_risk`) that never fail, domain engines (`lineage`,
//! `blast_radius`, `campaign`) that compute over data handed to them,
//! and a persistence boundary (`store`) the engines are never coupled
//! to directly.

pub mod blast_radius;
pub mod campaign;
pub mod clock;
pub mod config;
pub mod error;
pub mod executor;
pub mod lineage;
pub mod models;
pub mod operation_risk;
pub mod scoring;
pub mod store;
pub mod telemetry;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use executor::{NullExecutor, PatchExecutor, PatchOutcome, PatchRequest};
