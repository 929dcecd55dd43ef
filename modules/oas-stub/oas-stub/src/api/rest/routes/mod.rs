use axum::Router;
use axum::extract::Extension;
use axum::routing::any;
use tracing::info;

use crate::api::rest::handlers::stub::stub_handler;
use crate::module::AppState;

/// Router serving every method on `{prefix}/{application}/{path...}`.
pub fn router(state: AppState) -> Router {
    let prefix = state.config.prefix.trim_end_matches('/');
    let path = format!("{prefix}/{{*rest}}");
    info!(route = %path, "registering stub route");
    Router::new()
        .route(&path, any(stub_handler))
        .layer(Extension(state))
}
