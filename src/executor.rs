//! The external patch executor contract (spec.md §6, §5). The engine
//! never executes patches itself — it calls out to whatever
//! implementation of this trait the deployment wires in and waits for
//! `ReportAssetResult` via `CampaignAggregate::report_asset_result`.

use async_trait::async_trait;
use std::time::Duration;

/// The operator-configurable per-asset deadline (spec.md §5's default of
/// 10 minutes); exceeding it is equivalent to the executor reporting
/// `failed` with `error_message="timeout"`.
pub const DEFAULT_EXECUTOR_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone)]
pub struct PatchRequest {
    pub asset_id: String,
    pub target_version: String,
    pub before_snapshot: Option<String>,
}

#[derive(Debug, Clone)]
pub enum PatchOutcome {
    Completed { before_version: Option<String>, after_version: Option<String> },
    Failed { error_message: String },
}

/// An external collaborator that actually changes an asset. Exists so
/// the orchestrator can be driven in tests without touching real
/// infrastructure.
#[async_trait]
pub trait PatchExecutor: Send + Sync {
    async fn apply(&self, request: PatchRequest) -> PatchOutcome;

    /// Used by rollback: restores `before_snapshot` on the asset.
    async fn rollback(&self, asset_id: &str, before_snapshot: Option<String>) -> PatchOutcome;
}

/// A test double that completes every request immediately.
pub struct NullExecutor;

#[async_trait]
impl PatchExecutor for NullExecutor {
    async fn apply(&self, request: PatchRequest) -> PatchOutcome {
        PatchOutcome::Completed {
            before_version: request.before_snapshot,
            after_version: Some(request.target_version),
        }
    }

    async fn rollback(&self, _asset_id: &str, before_snapshot: Option<String>) -> PatchOutcome {
        PatchOutcome::Completed {
            before_version: before_snapshot.clone(),
            after_version: before_snapshot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_executor_always_completes() {
        let executor = NullExecutor;
        let outcome = executor
            .apply(PatchRequest {
                asset_id: "asset-1".to_string(),
                target_version: "2.0.0".to_string(),
                before_snapshot: Some("1.0.0".to_string()),
            })
            .await;
        assert!(matches!(outcome, PatchOutcome::Completed { .. }));
    }
}
