//! DynamicTileBuilder trait for expanding dynamic tiles.
//!
//! A dynamic tile (for example "every failing job of a CI server") is
//! expanded at request time into concrete sub-tiles. Builders typically call
//! a downstream API, so they are async and may be slow; the fallback build
//! cache bounds how long a caller waits for them.

use thiserror::Error;

use crate::cache::BoxFuture;
use crate::tile::TileDescriptor;
use crate::validator::{ValidatedParams, ValidationError};

/// Errors a builder can report.
#[derive(Debug, Clone, Error)]
pub enum BuildError {
    /// The downstream system answered with an error or could not be reached.
    #[error("downstream request failed: {0}")]
    Downstream(String),

    /// The validated params could not be turned into the builder's config.
    #[error(transparent)]
    InvalidParams(#[from] ValidationError),

    /// The builder task panicked or was aborted.
    #[error("builder task failed: {0}")]
    Aborted(String),
}

/// Trait for dynamic tile builders.
///
/// Implementations must be thread-safe (`Send + Sync`): a builder is shared
/// by all concurrent requests and runs on spawned tasks that may outlive the
/// request that started them.
///
/// # Example
///
/// ```ignore
/// struct FailingJobsBuilder { client: CiClient }
///
/// impl DynamicTileBuilder for FailingJobsBuilder {
///     fn build<'a>(&'a self, params: &'a ValidatedParams)
///         -> BoxFuture<'a, Result<Vec<TileDescriptor>, BuildError>>
///     {
///         Box::pin(async move {
///             let jobs = self.client.failing_jobs().await
///                 .map_err(|e| BuildError::Downstream(e.to_string()))?;
///             Ok(jobs.into_iter().map(|job| TileDescriptor::new("CI-JOB")
///                 .with_param("job", job)).collect())
///         })
///     }
/// }
/// ```
pub trait DynamicTileBuilder: Send + Sync {
    /// Produce the sub-tiles for the given params.
    ///
    /// # Errors
    ///
    /// Returns `BuildError` when the sub-tiles cannot be computed.
    fn build<'a>(
        &'a self,
        params: &'a ValidatedParams,
    ) -> BoxFuture<'a, Result<Vec<TileDescriptor>, BuildError>>;
}
