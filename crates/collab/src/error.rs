//! Service-level error type and propagation policy.

use packshare_core::error::CollabError;
use packshare_db::uow::UnitOfWork;

/// Error type for collaboration service operations.
///
/// Domain errors pass through transparently for user-facing handling;
/// storage errors are wrapped separately so the fail-soft policy can tell
/// the two apart.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// A domain-level error from `packshare_core`.
    #[error(transparent)]
    Domain(#[from] CollabError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Convenience alias for service return values.
pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// An internal-invariant violation, reported as
    /// [`CollabError::DatabaseInconsistency`].
    pub(crate) fn inconsistency(msg: impl Into<String>) -> Self {
        Self::Domain(CollabError::DatabaseInconsistency(msg.into()))
    }
}

/// Apply the fail-soft degrade policy to an operation result.
///
/// With the flag set, storage errors are logged and replaced by the
/// operation's neutral default so a broken collaboration store cannot take
/// the rest of the application down. Domain errors always propagate.
pub(crate) fn soften<T: Default>(fail_soft: bool, result: ServiceResult<T>) -> ServiceResult<T> {
    match result {
        Err(ServiceError::Database(err)) if fail_soft => {
            tracing::warn!(error = %err, "collaboration store error suppressed (fail-soft)");
            Ok(T::default())
        }
        other => other,
    }
}

/// Roll back a failed unit of work without masking the primary error.
pub(crate) async fn rollback_quietly(uow: UnitOfWork) {
    if let Err(err) = uow.rollback().await {
        tracing::warn!(error = %err, "transaction rollback failed");
    }
}
