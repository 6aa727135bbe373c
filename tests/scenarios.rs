//! End-to-end scenario tests (spec.md §8's seed scenarios 5 and 6),
//! driven through the public API rather than any module's internals.

use chrono::{TimeZone, Utc};
use resilience_core::blast_radius;
use resilience_core::campaign::{CampaignAggregate, CampaignSpec};
use resilience_core::config::{AssetMatchPolicy, CampaignConfig, ScoringConfig};
use resilience_core::lineage::{LineageGraph, LineageSource};
use resilience_core::models::{
    Asset, CampaignStatus, CampaignType, CVEFact, CVEPackageMatch, Environment, Image,
    ImageCoordinate, ImageLineageEdge, PatchCampaignAssetStatus, PhaseStatus, RolloutStrategy,
    SBOMPackage, VersionConstraint,
};
use resilience_core::store::InMemoryStore;

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 7, 27, 0, 0, 0).unwrap()
}

fn image(id: &str, version: &str) -> Image {
    Image {
        id: id.to_string(),
        org_id: "org-1".to_string(),
        family: "app".to_string(),
        version: version.to_string(),
    }
}

/// Scenario 5: images A -> B -> C, direct hit on A, plus a cycle
/// C -> A. The report must still place A at depth 0, B at depth 1
/// (inherited from A), C at depth 2 (inherited from B) — the cycle must
/// not change the result or hang traversal.
#[tokio::test]
async fn lineage_propagation_survives_a_cycle() {
    let store = InMemoryStore::new();
    store
        .seed_images(vec![image("a", "1.0.0"), image("b", "1.0.1"), image("c", "1.0.2")])
        .await;
    store
        .seed_coordinates(vec![
            ImageCoordinate { identifier: "app:a".to_string(), image_id: "a".to_string() },
            ImageCoordinate { identifier: "app:b".to_string(), image_id: "b".to_string() },
            ImageCoordinate { identifier: "app:c".to_string(), image_id: "c".to_string() },
        ])
        .await;
    store
        .seed_edges(vec![
            ImageLineageEdge { parent_image_id: "a".to_string(), child_image_id: "b".to_string() },
            ImageLineageEdge { parent_image_id: "b".to_string(), child_image_id: "c".to_string() },
            ImageLineageEdge { parent_image_id: "c".to_string(), child_image_id: "a".to_string() },
        ])
        .await;
    store
        .seed_cve_fact(CVEFact {
            cve_id: "CVE-2026-100".to_string(),
            cvss_v3_score: Some(8.0),
            epss_score: Some(0.2),
            exploit_available: false,
            cisa_kev_listed: false,
            severity: "high".to_string(),
            description: None,
            published_date: None,
        })
        .await;
    store
        .seed_package_matches(
            "CVE-2026-100",
            vec![CVEPackageMatch {
                package_name: "openssl".to_string(),
                package_type: None,
                version_constraint: VersionConstraint::LessThan,
                version_start: None,
                version_end: Some("3.0.0".to_string()),
                fixed_version: Some("3.0.0".to_string()),
                purl_pattern: None,
                cpe_pattern: None,
            }],
        )
        .await;
    store
        .seed_sbom_packages(
            "org-1",
            vec![SBOMPackage {
                id: "pkg-1".to_string(),
                sbom_id: "sbom-1".to_string(),
                image_id: "a".to_string(),
                name: "openssl".to_string(),
                version: "1.1.1".to_string(),
                package_type: None,
            }],
        )
        .await;
    store
        .seed_assets(
            "org-1",
            vec![
                Asset {
                    id: "asset-a".to_string(),
                    org_id: "org-1".to_string(),
                    name: "host-a".to_string(),
                    platform: "aws".to_string(),
                    region: "us-east-1".to_string(),
                    environment: Environment::Production,
                    image_ref: "app:a".to_string(),
                },
                Asset {
                    id: "asset-c".to_string(),
                    org_id: "org-1".to_string(),
                    name: "host-c".to_string(),
                    platform: "aws".to_string(),
                    region: "us-east-1".to_string(),
                    environment: Environment::Production,
                    image_ref: "app:c".to_string(),
                },
            ],
        )
        .await;
    store.seed_fleet_size("org-1", 10).await;

    let graph = LineageGraph::build_graph(
        LineageSource::images(&store, "org-1").await.unwrap(),
        LineageSource::coordinates(&store, "org-1").await.unwrap(),
        LineageSource::edges(&store, "org-1").await.unwrap(),
    );

    let report = blast_radius::calculate(
        "org-1",
        "CVE-2026-100",
        &store,
        &graph,
        &ScoringConfig::default(),
        &AssetMatchPolicy::default(),
        now(),
    )
    .await
    .unwrap();

    let by_id = |id: &str| report.affected_images.iter().find(|i| i.image_id == id).unwrap();
    let a = by_id("a");
    assert!(a.is_direct);
    assert_eq!(a.lineage_depth, 0);
    assert_eq!(a.inherited_from, None);

    let b = by_id("b");
    assert!(!b.is_direct);
    assert_eq!(b.lineage_depth, 1);
    assert_eq!(b.inherited_from.as_deref(), Some("a"));

    let c = by_id("c");
    assert!(!c.is_direct);
    assert_eq!(c.lineage_depth, 2);
    assert_eq!(c.inherited_from.as_deref(), Some("b"));

    // the cycle edge c -> a must not have produced a second copy of "a"
    assert_eq!(report.affected_images.iter().filter(|i| i.image_id == "a").count(), 1);
    assert!(report.lineage_is_consistent());
    assert!(report.assets_are_unique());
    assert_eq!(report.affected_assets.len(), 2);
}

/// Scenario 6: 100 assets, canary 5%, failure_threshold 10%, auto
/// rollback on. Phase 1 (canary) covers 5 assets; one of them fails
/// (20% > 10% threshold), so phase 1 is failed and the whole campaign
/// rolls back — phase 2 must never start.
#[tokio::test]
async fn canary_rollout_rolls_back_on_threshold_breach() {
    let config = CampaignConfig::default();
    let assets: Vec<(String, String, String)> = (0..100)
        .map(|i| (format!("asset-{i}"), format!("host-{i}"), "aws".to_string()))
        .collect();

    let spec = CampaignSpec {
        org_id: "org-1".to_string(),
        name: "patch openssl".to_string(),
        description: None,
        campaign_type: CampaignType::CveResponse,
        rollout_strategy: RolloutStrategy::Canary,
        canary_percentage: None,
        failure_threshold_percentage: None,
        health_check_enabled: true,
        auto_rollback_enabled: true,
        requires_approval: false,
        cve_alert_ids: None,
        assets,
    };

    let mut aggregate = CampaignAggregate::create(spec, &config, now());
    assert_eq!(aggregate.phases.len(), 2);
    assert_eq!(aggregate.phases[0].total_assets, 5);
    assert_eq!(aggregate.phases[1].total_assets, 95);

    aggregate.submit().unwrap();
    aggregate.start(now()).unwrap();

    // one of the five canary assets fails
    aggregate
        .report_asset_result(
            "asset-0",
            PatchCampaignAssetStatus::Failed,
            None,
            None,
            Some("patch apply timed out".to_string()),
            &config,
            now(),
        )
        .unwrap();
    for i in 1..5 {
        aggregate
            .report_asset_result(
                &format!("asset-{i}"),
                PatchCampaignAssetStatus::Completed,
                Some("1.0.0".to_string()),
                Some("1.0.1".to_string()),
                None,
                &config,
                now(),
            )
            .unwrap();
    }

    assert_eq!(aggregate.phases[0].status, PhaseStatus::Failed);
    assert_eq!(aggregate.campaign.status, CampaignStatus::RolledBack);
    assert_eq!(aggregate.phases[1].status, PhaseStatus::Pending);
    let second_phase_id = aggregate.phases[1].id.clone();
    assert!(aggregate
        .assets
        .iter()
        .filter(|a| a.phase_id == second_phase_id)
        .all(|a| a.status == PatchCampaignAssetStatus::Pending));
}
