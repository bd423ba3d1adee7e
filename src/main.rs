use axum::{
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use dotenvy::dotenv;
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod handlers;
mod middleware;
mod models;
mod services;
mod store;

use config::Config;
use error::{ApiError, StartupError};
use handlers::{auth_handler, product_handler};
use middleware::auth::{guard, RoleGuard, ADMIN_ONLY, ADMIN_OR_STAFF};
use services::password_service::PasswordHasher;
use services::token_service::TokenService;
use store::{PgStore, Store};

/// Shared by every handler through `State`. Nothing in here is mutated after startup.
pub struct AppState {
    pub store: Box<dyn Store>,
    pub hasher: PasswordHasher,
    pub tokens: TokenService,
}

/// Health check: reports whether the database answers.
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "up", "database": "connected" })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: database error: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "down", "error": "database_error" })),
            )
        }
    }
}

fn handle_panic(_: Box<dyn Any + Send + 'static>) -> Response {
    ApiError::internal("Internal server error", "handler panicked").into_response()
}

pub fn app(state: Arc<AppState>) -> Router {
    let admin_only = RoleGuard::new(state.tokens.clone(), ADMIN_ONLY);
    let admin_or_staff = RoleGuard::new(state.tokens.clone(), ADMIN_OR_STAFF);

    // Reads and writes share paths but not guards.
    let product_reads = Router::new()
        .route("/", get(product_handler::list_products))
        .route("/:id", get(product_handler::get_product))
        .route_layer(from_fn_with_state(admin_or_staff.clone(), guard));

    let product_writes = Router::new()
        .route("/", post(product_handler::create_product))
        .route(
            "/:id",
            put(product_handler::update_product).delete(product_handler::delete_product),
        )
        .route_layer(from_fn_with_state(admin_only, guard));

    let staff_products = Router::new()
        .route("/", get(product_handler::list_products))
        .route("/:id", get(product_handler::get_product))
        .route_layer(from_fn_with_state(admin_or_staff, guard));

    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    Router::new()
        .route("/register", post(auth_handler::register))
        .route("/login", post(auth_handler::login))
        .route("/health", get(health_check))
        .nest("/products", product_reads.merge(product_writes))
        .nest("/staff/products", staff_products)
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn run() -> Result<(), StartupError> {
    let config = Config::from_env()?;

    let store = PgStore::connect(&config.database).await?;
    store.ensure_schema().await?;
    tracing::info!(
        "connected to postgres at {}:{}/{}",
        config.database.host,
        config.database.port,
        config.database.name
    );

    let state = Arc::new(AppState {
        store: Box::new(store),
        hasher: PasswordHasher::new(config.hash_cost)?,
        tokens: TokenService::new(config.jwt_secret.as_bytes(), config.token_ttl),
    });

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!("Server listening on http://{}", config.addr);
    axum::serve(listener, app(state)).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!("startup failed: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod test_support {
    use axum::{
        body::Body,
        http::{header, Request, Response},
    };
    use chrono::Duration;
    use std::sync::Arc;

    use crate::services::password_service::test_hasher;
    use crate::services::token_service::TokenService;
    use crate::store::memory::MemoryStore;
    use crate::AppState;

    pub fn test_state() -> Arc<AppState> {
        Arc::new(AppState {
            store: Box::new(MemoryStore::new()),
            hasher: test_hasher(),
            tokens: TokenService::new(
                b"router-test-secret-router-test-secret",
                Duration::hours(1),
            ),
        })
    }

    pub fn form_request(uri: &str, form: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap()
    }

    pub fn authed_request(
        method: &str,
        uri: &str,
        token: &str,
        json: Option<serde_json::Value>,
    ) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token));
        match json {
            Some(value) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(value.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    pub async fn read_json(response: Response<Body>) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }
}
