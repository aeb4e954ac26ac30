//! Fetch-with-fallback combinator.

use std::future::Future;

use tracing::warn;

use agro_common::{AgroResult, Observation};

/// Run a provider call; on any error substitute the fallback result.
///
/// The provider's error never escapes this boundary. One index failing
/// therefore cannot poison its siblings or the request.
pub async fn fetch_with_fallback<C, Fut, F>(provider_call: C, fallback: F) -> Observation
where
    C: FnOnce() -> Fut,
    Fut: Future<Output = AgroResult<Observation>>,
    F: FnOnce() -> Observation,
{
    match provider_call().await {
        Ok(obs) => obs,
        Err(e) => {
            let substitute = fallback();
            warn!(
                error = %e,
                kind = %substitute.kind,
                "Provider call failed, substituting simulated value"
            );
            substitute
        }
    }
}
