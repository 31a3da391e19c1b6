use thiserror::Error;

use crate::store::StoreError;
use crate::youtube::ApiError;

/// Run-level failures. Per-channel probe failures never surface here; they become error records.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("authentication failed: {0}")]
    Auth(#[source] ApiError),

    #[error("fetching the subscription list failed: {0}")]
    ListFetch(#[source] ApiError),

    #[error("subscription snapshot: {0}")]
    Snapshot(#[source] StoreError),

    #[error("progress ledger: {0}")]
    Ledger(#[source] StoreError),
}
