use axum::{middleware, routing::get, Extension, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{AccessPolicy, CheckMode};
use crate::handlers;
use crate::middleware::{access_gate, auth_gate, request_context_middleware};

/// Attach an access policy to every route added so far and run the gates
/// against it. The policy extension is installed outermost so both gates
/// can read it.
pub fn with_policy(router: Router, policy: AccessPolicy) -> Router {
    router.route_layer(
        ServiceBuilder::new()
            .layer(Extension(policy))
            .layer(middleware::from_fn(auth_gate))
            .layer(middleware::from_fn(access_gate)),
    )
}

pub fn app() -> Router {
    Router::new()
        .merge(public_routes())
        .merge(whoami_routes())
        .merge(article_routes())
        // Global middleware; the context scope must wrap the gates
        .layer(middleware::from_fn(request_context_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn public_routes() -> Router {
    use axum::routing::post;

    let router = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/auth/refresh", post(handlers::auth::refresh));

    with_policy(router, AccessPolicy::public())
}

fn whoami_routes() -> Router {
    let router = Router::new().route("/api/whoami", get(handlers::auth::whoami));

    with_policy(router, AccessPolicy::authenticated())
}

fn article_routes() -> Router {
    use handlers::articles;

    let router = Router::new()
        .route(
            "/api/articles",
            get(articles::list).post(articles::create),
        )
        .route(
            "/api/articles/:id",
            get(articles::get)
                .put(articles::update)
                .patch(articles::patch)
                .delete(articles::delete),
        );

    // Editors get in through the token-embedded role fast path; service
    // accounts carry the permission grant instead
    with_policy(
        router,
        AccessPolicy::authenticated()
            .with_roles(&["ADMIN", "EDITOR"], CheckMode::Any)
            .with_permissions(&["articles.manage"], CheckMode::Any),
    )
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Trellis API",
            "version": version,
            "description": "Multi-tenant SaaS backend core built with Rust (Axum)",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "refresh": "/auth/refresh (public - token exchange)",
                "whoami": "/api/whoami (protected)",
                "articles": "/api/articles[/:id] (protected)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match crate::database::DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
