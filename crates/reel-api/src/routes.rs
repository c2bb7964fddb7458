//! API routes.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use url::Url;

use crate::handlers::{
    generate_video, get_run, health, parse_script, process_video, ready, stream_progress,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let run_routes = Router::new()
        // Clip mode
        .route("/process-video", post(process_video))
        // Script mode
        .route("/script-to-video/generate", post(generate_video))
        .route("/script-to-video/parse", post(parse_script))
        // Observation
        .route("/runs/:run_id", get(get_run))
        .route("/progress/:run_id", get(stream_progress));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    // Rendered clips and videos, at the URL prefixes the pipeline hands out
    let mut file_routes = Router::new();
    if state.config.serve_files {
        let pipeline = state.pipeline.config();
        let mounts = [
            (&pipeline.clips_url_prefix, &pipeline.clips_dir),
            (&pipeline.outputs_url_prefix, &pipeline.outputs_dir),
        ];
        for (prefix, dir) in mounts {
            if let Some(path) = mount_point(prefix) {
                file_routes = file_routes.nest_service(&path, ServeDir::new(dir));
            }
        }
    }

    Router::new()
        .nest("/api", run_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .merge(file_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

/// Route path for a URL prefix such as `/clips/` or a full `https://` base.
///
/// `None` when the prefix has no path of its own to mount under.
fn mount_point(prefix: &str) -> Option<String> {
    let path = match Url::parse(prefix) {
        Ok(url) => url.path().to_string(),
        Err(_) => prefix.to_string(),
    };
    let path = path.trim_matches('/');
    (!path.is_empty()).then(|| format!("/{path}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mount_point() {
        assert_eq!(mount_point("/clips").as_deref(), Some("/clips"));
        assert_eq!(mount_point("/clips/").as_deref(), Some("/clips"));
        assert_eq!(mount_point("outputs").as_deref(), Some("/outputs"));
        assert_eq!(
            mount_point("https://cdn.example.com/media/clips").as_deref(),
            Some("/media/clips")
        );
        assert_eq!(mount_point("https://cdn.example.com"), None);
        assert_eq!(mount_point("/"), None);
    }
}
