//! The persistence port the Blast-Radius Engine calls for its inputs and
//! for transactional report storage (spec.md §4.4, §6).

use crate::error::CoreResult;
use crate::models::{Asset, BlastRadiusReport, CVEFact, CVEPackageMatch, SBOMPackage};
use async_trait::async_trait;

/// Everything the engine needs to read before it can compute a report,
/// scoped to `org_id` by the implementor.
#[async_trait]
pub trait BlastRadiusSource: Send + Sync {
    async fn cve_fact(&self, cve_id: &str) -> CoreResult<Option<CVEFact>>;
    async fn package_matches(&self, org_id: &str, cve_id: &str) -> CoreResult<Vec<CVEPackageMatch>>;
    async fn sbom_packages(&self, org_id: &str) -> CoreResult<Vec<SBOMPackage>>;
    async fn assets(&self, org_id: &str) -> CoreResult<Vec<Asset>>;
    async fn fleet_size(&self, org_id: &str) -> CoreResult<u32>;
}

/// Transactional sink for a computed report (spec.md §4.4's
/// `store(alert_id, report)`). Implementors must delete prior affected
/// items for `alert_id` and write the new ones in the same transaction,
/// rolling back entirely on any failure.
#[async_trait]
pub trait BlastRadiusStore: Send + Sync {
    async fn store(&self, alert_id: &str, report: &BlastRadiusReport) -> CoreResult<()>;
    async fn latest_report(&self, alert_id: &str) -> CoreResult<Option<BlastRadiusReport>>;
}
