//src/main.rs

use axum::{
    routing::{get, patch, post},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppState, Config};
use crate::docs::ApiDoc;
use crate::handlers::material_requests;
use crate::middleware::observability;

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if config.is_production() {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt().with_env_filter(filter).with_target(false).compact().init();
    }
}

pub fn build_router(app_state: AppState) -> Router {
    let material_request_routes = Router::new()
        .route(
            "/",
            get(material_requests::list_material_requests)
                .post(material_requests::create_material_request),
        )
        .route(
            "/{id}",
            get(material_requests::get_material_request)
                .put(material_requests::update_material_request),
        )
        .route("/{id}/mark-all-ready", post(material_requests::mark_all_ready))
        .route(
            "/items/{item_id}",
            patch(material_requests::patch_material_request_item),
        );

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/material-requests", material_request_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(observability::trace_layer())
        .layer(observability::set_request_id_layer())
        .layer(observability::propagate_request_id_layer())
        .with_state(app_state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config);

    // Se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new(&config).await?;

    let app = build_router(app_state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use axum::{body::Body, http::{Request, StatusCode}};
    use tower::ServiceExt;

    fn app() -> Router {
        build_router(AppState::in_memory("segredo".into(), InMemoryStore::with_demo_users()))
    }

    #[tokio::test]
    async fn health_is_public() {
        let response = app()
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(observability::REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn incoming_request_id_is_echoed() {
        let request = Request::builder()
            .uri("/api/health")
            .header(observability::REQUEST_ID_HEADER, "abc-123")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.headers()[observability::REQUEST_ID_HEADER], "abc-123");
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let response = app()
            .oneshot(Request::builder().uri("/api-docs/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
