//! Utilities

pub mod logger;

use shared::AppResult;
use shared::AppError;

/// Run blocking store work off the async runtime
///
/// redb write transactions serialize on a lock, so a reservation or
/// settlement may wait on another writer.
pub async fn blocking<F, T>(f: F) -> AppResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        tracing::error!(error = %e, "Blocking task failed");
        AppError::internal(format!("Blocking task failed: {e}"))
    })
}

/// Compare a provided secret with the expected one in constant time
///
/// Both sides are MACed under the expected value and the tags compared
/// with `verify_slice`, so timing does not reveal a mismatch position.
pub fn secrets_match(expected: &str, provided: &str) -> bool {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let tag = |value: &str| {
        Hmac::<Sha256>::new_from_slice(expected.as_bytes()).map(|mut mac| {
            mac.update(value.as_bytes());
            mac
        })
    };

    match (tag(expected), tag(provided)) {
        (Ok(expected_mac), Ok(provided_mac)) => provided_mac
            .verify_slice(&expected_mac.finalize().into_bytes())
            .is_ok(),
        _ => false,
    }
}
