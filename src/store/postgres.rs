//! PostgreSQL adapter for every store port the engine defines, built on
//! the teacher package family's `sqlx`/`PgPool` stack. Schema mirrors
//! spec.md §6's table list; runtime-built queries (not `sqlx::query!`)
//! so the crate builds without a live `DATABASE_URL`.

use crate::blast_radius::{BlastRadiusSource, BlastRadiusStore};
use crate::campaign::CampaignStore;
use crate::error::CoreResult;
use crate::lineage::LineageSource;
use crate::models::{
    Asset, BlastRadiusReport, CVEFact, CVEPackageMatch, Environment, Image, ImageCoordinate,
    ImageLineageEdge, PatchCampaign, PatchCampaignAsset, PatchCampaignPhase, SBOMPackage,
    VersionConstraint,
};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;

/// PostgreSQL-backed storage adapter. One pool is shared by every port
/// this struct implements (spec.md §5: "parallel request handlers on top
/// of a shared connection pool").
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> CoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// `CREATE TABLE IF NOT EXISTS` for every table spec.md §6 names.
    /// Campaign rows and reports are stored as JSONB payloads alongside a
    /// handful of indexed columns — the aggregates are always read and
    /// written whole, never queried by individual field.
    async fn init_schema(&self) -> CoreResult<()> {
        let ddl = [
            r#"CREATE TABLE IF NOT EXISTS images (
                id TEXT PRIMARY KEY, org_id TEXT NOT NULL, family TEXT NOT NULL, version TEXT NOT NULL
            )"#,
            r#"CREATE TABLE IF NOT EXISTS image_lineage (
                child_image_id TEXT NOT NULL, parent_image_id TEXT NOT NULL,
                PRIMARY KEY (child_image_id, parent_image_id)
            )"#,
            r#"CREATE TABLE IF NOT EXISTS image_coordinates (
                identifier TEXT PRIMARY KEY, image_id TEXT NOT NULL
            )"#,
            r#"CREATE TABLE IF NOT EXISTS cve_cache (
                cve_id TEXT PRIMARY KEY, cvss_v3_score DOUBLE PRECISION, epss_score DOUBLE PRECISION,
                exploit_available BOOLEAN NOT NULL, cisa_kev_listed BOOLEAN NOT NULL,
                severity TEXT NOT NULL, description TEXT, published_date TIMESTAMPTZ
            )"#,
            r#"CREATE TABLE IF NOT EXISTS cve_package_matches (
                id BIGSERIAL PRIMARY KEY, cve_id TEXT NOT NULL, org_id TEXT NOT NULL,
                package_name TEXT NOT NULL, package_type TEXT, version_constraint TEXT NOT NULL,
                version_start TEXT, version_end TEXT, fixed_version TEXT, purl_pattern TEXT, cpe_pattern TEXT
            )"#,
            r#"CREATE TABLE IF NOT EXISTS sbom_packages (
                id TEXT PRIMARY KEY, sbom_id TEXT NOT NULL, image_id TEXT NOT NULL, org_id TEXT NOT NULL,
                name TEXT NOT NULL, version TEXT NOT NULL, type TEXT
            )"#,
            r#"CREATE TABLE IF NOT EXISTS assets (
                id TEXT PRIMARY KEY, org_id TEXT NOT NULL, name TEXT NOT NULL, platform TEXT NOT NULL,
                region TEXT NOT NULL, environment TEXT NOT NULL, image_ref TEXT NOT NULL
            )"#,
            r#"CREATE TABLE IF NOT EXISTS org_fleet_size (org_id TEXT PRIMARY KEY, total_assets INTEGER NOT NULL)"#,
            r#"CREATE TABLE IF NOT EXISTS cve_alert_reports (
                alert_id TEXT PRIMARY KEY, cve_id TEXT NOT NULL, org_id TEXT NOT NULL,
                urgency_score INTEGER NOT NULL, priority TEXT NOT NULL, sla_due_at TIMESTAMPTZ NOT NULL,
                report JSONB NOT NULL
            )"#,
            r#"CREATE TABLE IF NOT EXISTS patch_campaigns (id TEXT PRIMARY KEY, org_id TEXT NOT NULL, status TEXT NOT NULL, campaign JSONB NOT NULL)"#,
            r#"CREATE TABLE IF NOT EXISTS patch_campaign_phases (id TEXT PRIMARY KEY, campaign_id TEXT NOT NULL, ordinal INTEGER NOT NULL, phase JSONB NOT NULL)"#,
            r#"CREATE TABLE IF NOT EXISTS patch_campaign_assets (id TEXT PRIMARY KEY, campaign_id TEXT NOT NULL, asset JSONB NOT NULL)"#,
        ];
        for statement in ddl {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn parse_environment(value: &str) -> Environment {
    match value {
        "production" => Environment::Production,
        "staging" => Environment::Staging,
        "dr" => Environment::Dr,
        _ => Environment::Development,
    }
}

fn environment_str(env: Environment) -> &'static str {
    match env {
        Environment::Production => "production",
        Environment::Staging => "staging",
        Environment::Development => "development",
        Environment::Dr => "dr",
    }
}

fn parse_version_constraint(value: &str) -> VersionConstraint {
    match value {
        "exact" => VersionConstraint::Exact,
        "less_than" => VersionConstraint::LessThan,
        "less_than_eq" => VersionConstraint::LessThanEq,
        "range" => VersionConstraint::Range,
        _ => VersionConstraint::All,
    }
}

#[async_trait]
impl LineageSource for PostgresStore {
    async fn images(&self, org_id: &str) -> CoreResult<Vec<Image>> {
        let rows = sqlx::query("SELECT id, org_id, family, version FROM images WHERE org_id = $1")
            .bind(org_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| Image {
                id: r.get("id"),
                org_id: r.get("org_id"),
                family: r.get("family"),
                version: r.get("version"),
            })
            .collect())
    }

    async fn coordinates(&self, _org_id: &str) -> CoreResult<Vec<ImageCoordinate>> {
        let rows = sqlx::query("SELECT identifier, image_id FROM image_coordinates")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| ImageCoordinate {
                identifier: r.get("identifier"),
                image_id: r.get("image_id"),
            })
            .collect())
    }

    async fn edges(&self, _org_id: &str) -> CoreResult<Vec<ImageLineageEdge>> {
        let rows = sqlx::query("SELECT child_image_id, parent_image_id FROM image_lineage")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| ImageLineageEdge {
                child_image_id: r.get("child_image_id"),
                parent_image_id: r.get("parent_image_id"),
            })
            .collect())
    }
}

#[async_trait]
impl BlastRadiusSource for PostgresStore {
    async fn cve_fact(&self, cve_id: &str) -> CoreResult<Option<CVEFact>> {
        let row = sqlx::query(
            "SELECT cve_id, cvss_v3_score, epss_score, exploit_available, cisa_kev_listed, severity, description, published_date \
             FROM cve_cache WHERE cve_id = $1",
        )
        .bind(cve_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| CVEFact {
            cve_id: r.get("cve_id"),
            cvss_v3_score: r.get("cvss_v3_score"),
            epss_score: r.get("epss_score"),
            exploit_available: r.get("exploit_available"),
            cisa_kev_listed: r.get("cisa_kev_listed"),
            severity: r.get("severity"),
            description: r.get("description"),
            published_date: r.get("published_date"),
        }))
    }

    async fn package_matches(&self, org_id: &str, cve_id: &str) -> CoreResult<Vec<CVEPackageMatch>> {
        let rows = sqlx::query(
            "SELECT package_name, package_type, version_constraint, version_start, version_end, fixed_version, purl_pattern, cpe_pattern \
             FROM cve_package_matches WHERE org_id = $1 AND cve_id = $2",
        )
        .bind(org_id)
        .bind(cve_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| CVEPackageMatch {
                package_name: r.get("package_name"),
                package_type: r.get("package_type"),
                version_constraint: parse_version_constraint(r.get("version_constraint")),
                version_start: r.get("version_start"),
                version_end: r.get("version_end"),
                fixed_version: r.get("fixed_version"),
                purl_pattern: r.get("purl_pattern"),
                cpe_pattern: r.get("cpe_pattern"),
            })
            .collect())
    }

    async fn sbom_packages(&self, org_id: &str) -> CoreResult<Vec<SBOMPackage>> {
        let rows = sqlx::query("SELECT id, sbom_id, image_id, name, version, type FROM sbom_packages WHERE org_id = $1")
            .bind(org_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| SBOMPackage {
                id: r.get("id"),
                sbom_id: r.get("sbom_id"),
                image_id: r.get("image_id"),
                name: r.get("name"),
                version: r.get("version"),
                package_type: r.get("type"),
            })
            .collect())
    }

    async fn assets(&self, org_id: &str) -> CoreResult<Vec<Asset>> {
        let rows = sqlx::query("SELECT id, org_id, name, platform, region, environment, image_ref FROM assets WHERE org_id = $1")
            .bind(org_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| Asset {
                id: r.get("id"),
                org_id: r.get("org_id"),
                name: r.get("name"),
                platform: r.get("platform"),
                region: r.get("region"),
                environment: parse_environment(r.get("environment")),
                image_ref: r.get("image_ref"),
            })
            .collect())
    }

    async fn fleet_size(&self, org_id: &str) -> CoreResult<u32> {
        let row = sqlx::query("SELECT total_assets FROM org_fleet_size WHERE org_id = $1")
            .bind(org_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<i32, _>("total_assets") as u32).unwrap_or(0))
    }
}

#[async_trait]
impl BlastRadiusStore for PostgresStore {
    /// A single transaction: delete then insert, matching spec.md
    /// §4.4's persistence contract. The report is stored whole as JSONB;
    /// the indexed columns exist for the alert-rollup queries the
    /// control tower runs, not for this engine's own reads.
    async fn store(&self, alert_id: &str, report: &BlastRadiusReport) -> CoreResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM cve_alert_reports WHERE alert_id = $1")
            .bind(alert_id)
            .execute(&mut *tx)
            .await?;
        let payload = serde_json::to_value(report)
            .map_err(|e| crate::error::CoreError::StoreFatal(format!("failed to serialize report: {e}")))?;
        sqlx::query(
            "INSERT INTO cve_alert_reports (alert_id, cve_id, org_id, urgency_score, priority, sla_due_at, report) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(alert_id)
        .bind(&report.cve_id)
        .bind(&report.org_id)
        .bind(report.urgency_score as i32)
        .bind(report.priority.as_str())
        .bind(report.sla_due_at)
        .bind(payload)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn latest_report(&self, alert_id: &str) -> CoreResult<Option<BlastRadiusReport>> {
        let row = sqlx::query("SELECT report FROM cve_alert_reports WHERE alert_id = $1")
            .bind(alert_id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            None => Ok(None),
            Some(row) => {
                let value: serde_json::Value = row.get("report");
                serde_json::from_value(value)
                    .map(Some)
                    .map_err(|e| crate::error::CoreError::StoreFatal(format!("corrupt report payload: {e}")))
            }
        }
    }
}

#[async_trait]
impl CampaignStore for PostgresStore {
    async fn create(
        &self,
        campaign: &PatchCampaign,
        phases: &[PatchCampaignPhase],
        assets: &[PatchCampaignAsset],
    ) -> CoreResult<()> {
        let mut tx = self.pool.begin().await?;
        let campaign_payload = serde_json::to_value(campaign)
            .map_err(|e| crate::error::CoreError::StoreFatal(format!("failed to serialize campaign: {e}")))?;
        sqlx::query("INSERT INTO patch_campaigns (id, org_id, status, campaign) VALUES ($1, $2, $3, $4)")
            .bind(&campaign.id)
            .bind(&campaign.org_id)
            .bind(format!("{:?}", campaign.status))
            .bind(campaign_payload)
            .execute(&mut *tx)
            .await?;
        for phase in phases {
            let payload = serde_json::to_value(phase)
                .map_err(|e| crate::error::CoreError::StoreFatal(format!("failed to serialize phase: {e}")))?;
            sqlx::query("INSERT INTO patch_campaign_phases (id, campaign_id, ordinal, phase) VALUES ($1, $2, $3, $4)")
                .bind(&phase.id)
                .bind(&phase.campaign_id)
                .bind(phase.ordinal as i32)
                .bind(payload)
                .execute(&mut *tx)
                .await?;
        }
        for asset in assets {
            let payload = serde_json::to_value(asset)
                .map_err(|e| crate::error::CoreError::StoreFatal(format!("failed to serialize campaign asset: {e}")))?;
            sqlx::query("INSERT INTO patch_campaign_assets (id, campaign_id, asset) VALUES ($1, $2, $3)")
                .bind(&asset.id)
                .bind(&asset.campaign_id)
                .bind(payload)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_campaign(&self, campaign_id: &str) -> CoreResult<Option<PatchCampaign>> {
        let row = sqlx::query("SELECT campaign FROM patch_campaigns WHERE id = $1")
            .bind(campaign_id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            None => Ok(None),
            Some(row) => {
                let value: serde_json::Value = row.get("campaign");
                serde_json::from_value(value)
                    .map(Some)
                    .map_err(|e| crate::error::CoreError::StoreFatal(format!("corrupt campaign payload: {e}")))
            }
        }
    }

    async fn update_campaign(&self, campaign: &PatchCampaign) -> CoreResult<()> {
        let payload = serde_json::to_value(campaign)
            .map_err(|e| crate::error::CoreError::StoreFatal(format!("failed to serialize campaign: {e}")))?;
        sqlx::query("UPDATE patch_campaigns SET status = $2, campaign = $3 WHERE id = $1")
            .bind(&campaign.id)
            .bind(format!("{:?}", campaign.status))
            .bind(payload)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_phases(&self, campaign_id: &str) -> CoreResult<Vec<PatchCampaignPhase>> {
        let rows = sqlx::query("SELECT phase FROM patch_campaign_phases WHERE campaign_id = $1 ORDER BY ordinal")
            .bind(campaign_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| {
                let value: serde_json::Value = row.get("phase");
                serde_json::from_value(value)
                    .map_err(|e| crate::error::CoreError::StoreFatal(format!("corrupt phase payload: {e}")))
            })
            .collect()
    }

    async fn update_phase(&self, phase: &PatchCampaignPhase) -> CoreResult<()> {
        let payload = serde_json::to_value(phase)
            .map_err(|e| crate::error::CoreError::StoreFatal(format!("failed to serialize phase: {e}")))?;
        sqlx::query("UPDATE patch_campaign_phases SET phase = $2 WHERE id = $1")
            .bind(&phase.id)
            .bind(payload)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_assets(&self, campaign_id: &str) -> CoreResult<Vec<PatchCampaignAsset>> {
        let rows = sqlx::query("SELECT asset FROM patch_campaign_assets WHERE campaign_id = $1")
            .bind(campaign_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| {
                let value: serde_json::Value = row.get("asset");
                serde_json::from_value(value)
                    .map_err(|e| crate::error::CoreError::StoreFatal(format!("corrupt campaign asset payload: {e}")))
            })
            .collect()
    }

    async fn update_asset(&self, asset: &PatchCampaignAsset) -> CoreResult<()> {
        let payload = serde_json::to_value(asset)
            .map_err(|e| crate::error::CoreError::StoreFatal(format!("failed to serialize campaign asset: {e}")))?;
        sqlx::query("UPDATE patch_campaign_assets SET asset = $2 WHERE id = $1")
            .bind(&asset.id)
            .bind(payload)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

impl FromStr for PostgresStore {
    type Err = crate::error::CoreError;

    /// Synchronous parsing has no way to open a pool; this exists only
    /// so a connection string can be validated before an async
    /// `connect()` call.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.starts_with("postgres://") {
            return Err(crate::error::CoreError::InvalidInput(format!("not a postgres connection string: {s}")));
        }
        Err(crate::error::CoreError::InvalidInput(
            "use PostgresStore::connect, not FromStr, to build a pool".to_string(),
        ))
    }
}
