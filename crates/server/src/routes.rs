use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use tower_http::{
    cors::CorsLayer,
    trace::{TraceLayer, DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, DefaultOnFailure},
};
use tracing::Level;

use common::types::Health;
use service::CustomerRepository;

pub mod customers;

/// Shared handler state; the repository is the only mutable resource.
#[derive(Clone)]
pub struct AppState {
    pub customers: Arc<dyn CustomerRepository>,
}

impl AppState {
    pub fn new(customers: Arc<dyn CustomerRepository>) -> Self {
        Self { customers }
    }
}

pub async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health::ok(state.customers.count().await))
}

/// Build the full application router
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    let customer_routes = Router::new()
        .route("/customers", get(customers::list_customers).post(customers::add_customers))
        .route("/customers/getLastId", get(customers::get_last_id));

    Router::new()
        .route("/health", get(health))
        .merge(customer_routes)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                // 每次请求创建 span，包含方法和路径等，日志级别为 INFO
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                // 响应返回时打点，包含状态码与耗时
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
