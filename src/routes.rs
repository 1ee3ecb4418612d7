use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::SecurityConfig;
use crate::handlers::{protected, public};
use crate::middleware::require_caller;
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let max_body = state.config.api.max_request_size_bytes;
    let request_logging = state.config.api.enable_request_logging;
    let cors = cors_layer(&state.config.security);

    let mut router = Router::new()
        // Public
        .route("/health", get(public::health))
        // Protected (bearer token)
        .merge(protected_routes(state.clone()))
        .with_state(state)
        // Global middleware
        .layer(DefaultBodyLimit::max(max_body));

    if request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/me", get(protected::me))
        .route("/clients", get(protected::clients_list))
        .route("/datasets", get(protected::datasets_list))
        .route("/datasets/create", post(protected::dataset_create))
        .route("/datasets/:id", get(protected::dataset_get))
        .route("/datasets/:id/files", post(protected::dataset_add_file))
        .route("/datasets/:id/process", post(protected::dataset_process))
        // route_layer keeps unknown paths at 404 instead of 401
        .route_layer(middleware::from_fn_with_state(state, require_caller))
}

fn cors_layer(security: &SecurityConfig) -> Option<CorsLayer> {
    if !security.enable_cors {
        return None;
    }

    if security.cors_origins.iter().any(|origin| origin == "*") {
        return Some(CorsLayer::permissive());
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any),
    )
}
