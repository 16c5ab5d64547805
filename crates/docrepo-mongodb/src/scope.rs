//! Per-call scope: partition key and cancellation token

use docrepo_common::{RepositoryError, Result};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Optional partition key and cancellation token for a single repository call
///
/// `Scope::default()` targets the unpartitioned collection and is never
/// cancelled.
///
/// ```ignore
/// let token = CancellationToken::new();
/// let scope = Scope::partition("tenant-a").with_cancellation(token.clone());
/// let user = repository.get_by_id::<User>(&id, &scope).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct Scope {
    partition_key: Option<String>,
    cancellation: Option<CancellationToken>,
}

impl Scope {
    /// Scope with no partition and no cancellation
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope targeting the given partition
    pub fn partition(partition_key: impl Into<String>) -> Self {
        Self {
            partition_key: Some(partition_key.into()),
            cancellation: None,
        }
    }

    /// Scope that is only cancellable
    pub fn cancellable(token: CancellationToken) -> Self {
        Self {
            partition_key: None,
            cancellation: Some(token),
        }
    }

    /// Set the partition key
    pub fn with_partition(mut self, partition_key: impl Into<String>) -> Self {
        self.partition_key = Some(partition_key.into());
        self
    }

    /// Set the cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// The partition key, if any
    pub fn partition_key(&self) -> Option<&str> {
        self.partition_key.as_deref()
    }

    /// The cancellation token, if any
    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    /// Partition for a document-targeted call: the document's own key wins
    pub(crate) fn partition_for<'a>(&'a self, document_partition: Option<&'a str>) -> Option<&'a str> {
        document_partition.or(self.partition_key())
    }

    /// Drive a driver future under this scope's cancellation token
    ///
    /// A token that is already cancelled wins before the future is polled.
    pub(crate) async fn run<F, T>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match &self.cancellation {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(RepositoryError::Cancelled),
                    result = operation => result,
                }
            }
            None => operation.await,
        }
    }
}
