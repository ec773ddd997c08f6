//! Axum router configuration for billing endpoints.

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::adapters::http::middleware::{auth_middleware, AuthState};
use crate::config::ServerConfig;

use super::handlers::{
    activate_free_plan, create_order, handle_gateway_webhook, health, my_subscription,
    verify_payment, BillingAppState,
};

/// Session-authenticated payment routes, mounted at `/payments`.
///
/// - `POST /create-order` - Open a gateway order for a paid plan
/// - `POST /verify` - Confirm a checkout from the client
/// - `POST /activate-free` - Activate a zero-price plan
/// - `GET /my-subscription` - The caller's active subscription
pub fn payment_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/create-order", post(create_order))
        .route("/verify", post(verify_payment))
        .route("/activate-free", post(activate_free_plan))
        .route("/my-subscription", get(my_subscription))
}

/// Gateway callbacks, mounted at `/webhooks`.
///
/// These carry no session; the handler authenticates the body signature.
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/gateway", post(handle_gateway_webhook))
}

/// All billing routes plus `GET /health`.
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/payments", payment_routes())
        .nest("/webhooks", webhook_routes())
}

/// The complete service: routes, session middleware and HTTP layers.
///
/// The auth middleware only rejects bad tokens; routes without a token reach
/// their handler, where `RequireAuth` decides.
pub fn app_router(state: BillingAppState, auth: AuthState, server: &ServerConfig) -> Router {
    billing_router()
        .with_state(state)
        .layer(middleware::from_fn_with_state(auth, auth_middleware))
        .layer(TimeoutLayer::new(server.request_timeout()))
        .layer(cors_layer(&server.cors_origins_list()))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
