use anyhow::Error;
use thiserror::Error;

/// Remote failures, normalized at the storage boundary so that the
/// retry and dispatch layers never have to inspect SDK error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("object not found")]
    NotFound,
    #[error("{code}: {message}")]
    Service { code: String, message: String },
    #[error("connection error: {message}")]
    Connection { message: String },
}

/// Service error codes that are expected to resolve on retry.
const TRANSIENT_ERROR_CODES: [&str; 6] = [
    "RequestTimeout",
    "RequestTimeTooSkewed",
    "InternalError",
    "ServiceUnavailable",
    "SlowDown",
    "OperationAborted",
];

const BUCKET_ALREADY_EXISTS_ERROR_CODES: [&str; 2] =
    ["BucketAlreadyExists", "BucketAlreadyOwnedByYou"];

pub fn is_transient_error(e: &Error) -> bool {
    match e.downcast_ref::<StorageError>() {
        Some(StorageError::Connection { .. }) => true,
        Some(StorageError::Service { code, .. }) => {
            TRANSIENT_ERROR_CODES.contains(&code.as_str())
        }
        _ => false,
    }
}

pub fn is_not_found_error(e: &Error) -> bool {
    matches!(e.downcast_ref::<StorageError>(), Some(StorageError::NotFound))
}

pub fn is_bucket_already_exists_error(e: &Error) -> bool {
    matches!(
        e.downcast_ref::<StorageError>(),
        Some(StorageError::Service { code, .. })
            if BUCKET_ALREADY_EXISTS_ERROR_CODES.contains(&code.as_str())
    )
}
