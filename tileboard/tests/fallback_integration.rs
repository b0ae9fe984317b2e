//! Integration tests for dynamic tile builds.
//!
//! These tests exercise the public API end to end:
//! - Registry → fallback builder → build cache
//! - Slow builds served from the cache after a background refresh
//! - Dashboard verification and hydration against the same registry
//!
//! Run with: `cargo test --test fallback_integration`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

use tileboard::cache::{BoxFuture, BuildCacheClient, MemoryCacheProvider};
use tileboard::config::Settings;
use tileboard::dashboard::{DashboardConfig, Hydrator, Verifier};
use tileboard::{
    BuildError, BuildSource, ConfigRegistry, DynamicTileBuilder, FallbackBuilder, JsonValidator,
    TileDescriptor, TileType, TileboardError, Variant,
};

// ============================================================================
// Helper Functions
// ============================================================================

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct CiParams {
    pipeline: String,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct JobParams {
    job: String,
}

/// CI server answering after a fixed delay with one job per call count.
struct SlowCiBuilder {
    delay: Duration,
    calls: AtomicUsize,
}

impl SlowCiBuilder {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicUsize::new(0),
        }
    }
}

impl DynamicTileBuilder for SlowCiBuilder {
    fn build<'a>(
        &'a self,
        _params: &'a tileboard::ValidatedParams,
    ) -> BoxFuture<'a, Result<Vec<TileDescriptor>, BuildError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(vec![TileDescriptor::new("JOB")
                .with_label("job-A")
                .with_param("job", "job-A")])
        })
    }
}

fn registry(builder: Arc<SlowCiBuilder>) -> ConfigRegistry {
    let mut registry = ConfigRegistry::new();
    registry.register_tile(
        "JOB",
        Arc::new(JsonValidator::<JobParams>::new()),
        "/api/v1/ci/job",
        Duration::from_millis(500),
    );
    registry.register_dynamic_tile(
        "CI",
        Arc::new(JsonValidator::<CiParams>::new()),
        builder,
    );
    registry
}

fn fallback_builder(registry: ConfigRegistry, budget: Duration) -> FallbackBuilder {
    let settings = Settings::default();
    let cache = BuildCacheClient::new(
        Arc::new(MemoryCacheProvider::new(settings.cache.max_size_bytes)),
        settings.cache.downstream_store_expiration,
    );
    FallbackBuilder::new(
        Arc::new(registry),
        cache,
        settings.builds.max_concurrent_per_type,
        budget,
    )
}

fn ci() -> TileType {
    TileType::new("CI")
}

// ============================================================================
// Integration Tests
// ============================================================================

/// A slow CI server: the first call has nothing to fall back to, the
/// abandoned build refreshes the cache, and the next call is served from it.
#[tokio::test(start_paused = true)]
async fn test_slow_build_served_from_cache_after_background_refresh() {
    let builder = Arc::new(SlowCiBuilder::new(Duration::from_millis(500)));
    let service = fallback_builder(registry(Arc::clone(&builder)), Duration::from_secs(2));
    let payload = json!({ "pipeline": "main" });

    let params = service
        .registry()
        .lookup_dynamic(&ci(), &Variant::DEFAULT)
        .unwrap()
        .validator
        .validate(&payload)
        .unwrap();

    let err = service
        .build_with_fallback(&ci(), &Variant::DEFAULT, &params, Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(matches!(err, TileboardError::BuildTimeout { .. }));
    assert!(err.is_retryable());

    // Let the abandoned build finish
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(service.stats().background_refreshes, 1);
    assert_eq!(service.in_flight(&ci()), 0);

    let outcome = service
        .build_with_fallback(&ci(), &Variant::DEFAULT, &params, Duration::from_millis(50))
        .await
        .unwrap();
    assert_eq!(outcome.source, BuildSource::Cached);
    assert_eq!(outcome.tiles.len(), 1);
    assert_eq!(outcome.tiles[0].label.as_deref(), Some("job-A"));
    assert_eq!(builder.calls.load(Ordering::SeqCst), 2);
}

/// A fast build goes through the default budget and is served fresh.
#[tokio::test(start_paused = true)]
async fn test_validate_and_build_fresh() {
    let builder = Arc::new(SlowCiBuilder::new(Duration::from_millis(10)));
    let service = fallback_builder(registry(builder), Duration::from_secs(2));

    let outcome = service
        .validate_and_build(&ci(), &Variant::DEFAULT, &json!({ "pipeline": "main" }))
        .await
        .unwrap();

    assert_eq!(outcome.source, BuildSource::Fresh);
    assert_eq!(service.stats().fresh, 1);

    let err = service
        .validate_and_build(&ci(), &Variant::DEFAULT, &json!({ "pipeline": 1 }))
        .await
        .unwrap_err();
    assert!(matches!(err, TileboardError::Validation { .. }));
}

/// Verification and hydration of a dashboard mixing static and dynamic
/// tiles.
#[tokio::test(start_paused = true)]
async fn test_verify_then_hydrate_dashboard() {
    let builder = Arc::new(SlowCiBuilder::new(Duration::from_millis(10)));
    let service = fallback_builder(registry(builder), Duration::from_secs(2));

    let config: DashboardConfig = serde_json::from_value(json!({
        "version": "1.0",
        "columns": 2,
        "tiles": [
            { "type": "GROUP", "label": "Pipelines", "tiles": [
                { "type": "CI", "params": { "pipeline": "main" } }
            ]},
            { "type": "JOB", "params": { "job": "nightly" } }
        ]
    }))
    .unwrap();

    let issues = Verifier::new(service.registry()).verify(&config);
    assert!(issues.is_empty(), "unexpected issues: {issues:?}");

    let dashboard = Hydrator::new(&service).hydrate(&config).await;
    assert!(dashboard.issues.is_empty(), "{:?}", dashboard.issues);

    let group = &dashboard.tiles[0];
    assert_eq!(group.tiles.len(), 1);
    assert_eq!(
        group.tiles[0].url.as_deref(),
        Some("/api/v1/ci/job?job=job-A")
    );
    assert_eq!(
        dashboard.tiles[1].url.as_deref(),
        Some("/api/v1/ci/job?job=nightly")
    );
}

/// Static and dynamic registrations of the same type coexist.
#[test]
fn test_registry_static_and_dynamic_coexist() {
    let builder = Arc::new(SlowCiBuilder::new(Duration::from_millis(10)));
    let mut registry = registry(builder);
    registry.register_tile_with_variant(
        "CI",
        "summary",
        Arc::new(JsonValidator::<CiParams>::new()),
        "/api/v1/ci/summary",
        Duration::from_secs(1),
    );

    assert!(registry.is_authorized(&ci()));
    assert!(registry.is_dynamic(&ci()));
    assert!(registry.resolve(&ci(), &Variant::new("summary")).is_some());
    assert!(registry.resolve_dynamic(&ci(), &Variant::DEFAULT).is_some());
    assert!(registry.resolve(&ci(), &Variant::DEFAULT).is_none());
    assert_eq!(registry.authorized_types(), "CI, EMPTY, GROUP, JOB");
}
