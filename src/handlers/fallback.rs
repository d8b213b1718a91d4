use axum::http::{Method, Uri};
use tracing::instrument;

use crate::error::{AppError, AppResult};

/// Catch-all for unmatched routes.
///
/// Returns `404 Not Found` naming the requested method and path.
#[instrument(skip_all)]
pub async fn not_found(method: Method, uri: Uri) -> AppResult<()> {
    Err(AppError::RouteNotFound {
        method,
        path: uri.path().to_string(),
    })
}
