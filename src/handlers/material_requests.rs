// src/handlers/material_requests.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::CurrentUser, i18n::Locale},
    models::material_request::{
        Ack, CreateMaterialRequest, CreatedMaterialRequest, ItemPatchInput,
        MaterialRequestDetailResponse, MaterialRequestHeaderPatch, MaterialRequestListResponse,
        NewMaterialRequestItem, RequestListFilter, validate_not_negative,
    },
};

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Ano de criação; 0 ou ausente = todos os anos.
    #[serde(default)]
    pub year: i32,
    /// Busca parcial por nome do solicitante ou memo.
    pub q: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMaterialRequestItemPayload {
    pub product_id: Option<i64>,
    pub estimate_item_id: Option<i64>,

    #[serde(default)]
    #[schema(example = "Cabo flexível")]
    pub item_name_snapshot: String,

    #[serde(default)]
    #[schema(example = "2,5mm² azul")]
    pub spec_snapshot: String,

    #[serde(default)]
    #[schema(example = "m")]
    pub unit_snapshot: String,

    #[serde(default)]
    #[validate(custom(function = "validate_not_negative"))]
    #[schema(example = "10.0")]
    pub qty_requested: Decimal,

    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMaterialRequestPayload {
    pub project_id: Option<i64>,
    pub client_id: Option<i64>,
    pub estimate_id: Option<i64>,
    pub estimate_revision_id: Option<i64>,
    pub warehouse_id: Option<i64>,

    #[serde(default)]
    #[schema(example = "Obra da Rua 7 - segunda etapa")]
    pub memo: String,

    #[serde(default)]
    #[validate(nested)]
    pub items: Vec<CreateMaterialRequestItemPayload>,
}

impl From<CreateMaterialRequestPayload> for CreateMaterialRequest {
    fn from(payload: CreateMaterialRequestPayload) -> Self {
        Self {
            project_id: payload.project_id,
            client_id: payload.client_id,
            estimate_id: payload.estimate_id,
            estimate_revision_id: payload.estimate_revision_id,
            warehouse_id: payload.warehouse_id,
            memo: payload.memo,
            items: payload
                .items
                .into_iter()
                .map(|item| NewMaterialRequestItem {
                    product_id: item.product_id,
                    estimate_item_id: item.estimate_item_id,
                    item_name_snapshot: item.item_name_snapshot,
                    spec_snapshot: item.spec_snapshot,
                    unit_snapshot: item.unit_snapshot,
                    qty_requested: item.qty_requested,
                    note: item.note,
                })
                .collect(),
        }
    }
}

// Campo ausente (ou null) = mantém o valor atual.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMaterialRequestPayload {
    pub memo: Option<String>,
    pub warehouse_id: Option<i64>,
}

// Quantidades são validadas no serviço, depois da checagem de permissão.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatchMaterialRequestItemPayload {
    /// "PREPARING" | "READY"
    #[schema(example = "READY")]
    pub prep_status: Option<String>,

    /// Somente administradores/operadores.
    pub qty_used: Option<Decimal>,

    pub note: Option<String>,

    pub qty_requested: Option<Decimal>,
}

// ---
// Handlers
// ---

#[utoipa::path(
    get,
    path = "/api/material-requests",
    tag = "Material Requests",
    params(ListQuery),
    responses(
        (status = 200, description = "Requisições do filtro, mais recentes primeiro", body = MaterialRequestListResponse),
        (status = 401, description = "Não autenticado")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_material_requests(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = RequestListFilter::new(Some(query.year), query.q.as_deref());

    let response = app_state
        .material_request_service
        .list(user_id, filter)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/material-requests",
    tag = "Material Requests",
    request_body = CreateMaterialRequestPayload,
    responses(
        (status = 201, description = "Requisição criada em DRAFT", body = CreatedMaterialRequest),
        (status = 400, description = "Payload inválido"),
        (status = 403, description = "Restrito a administradores/operadores")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_material_request(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentUser(user_id): CurrentUser,
    Json(payload): Json<CreateMaterialRequestPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let created = app_state
        .material_request_service
        .create(user_id, payload.into())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/material-requests/{id}",
    tag = "Material Requests",
    params(("id" = i64, Path, description = "ID da requisição")),
    responses(
        (status = 200, description = "Cabeçalho, status agregado e linhas", body = MaterialRequestDetailResponse),
        (status = 404, description = "Requisição não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_material_request(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentUser(user_id): CurrentUser,
    Path(request_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state
        .material_request_service
        .get_detail(user_id, request_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(detail))
}

#[utoipa::path(
    put,
    path = "/api/material-requests/{id}",
    tag = "Material Requests",
    request_body = UpdateMaterialRequestPayload,
    params(("id" = i64, Path, description = "ID da requisição")),
    responses(
        (status = 200, description = "Cabeçalho atualizado", body = Ack),
        (status = 403, description = "Restrito a administradores/operadores"),
        (status = 404, description = "Requisição não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_material_request(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentUser(user_id): CurrentUser,
    Path(request_id): Path<i64>,
    Json(payload): Json<UpdateMaterialRequestPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let patch = MaterialRequestHeaderPatch {
        memo: payload.memo,
        warehouse_id: payload.warehouse_id,
    };

    app_state
        .material_request_service
        .update_header(user_id, request_id, patch)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(Ack::ok()))
}

#[utoipa::path(
    post,
    path = "/api/material-requests/{id}/mark-all-ready",
    tag = "Material Requests",
    params(("id" = i64, Path, description = "ID da requisição")),
    responses(
        (status = 200, description = "Todas as linhas marcadas como READY", body = Ack),
        (status = 403, description = "Restrito a administradores/operadores"),
        (status = 404, description = "Requisição não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn mark_all_ready(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentUser(user_id): CurrentUser,
    Path(request_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .material_request_service
        .mark_all_ready(user_id, request_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(Ack::ok()))
}

#[utoipa::path(
    patch,
    path = "/api/material-requests/items/{item_id}",
    tag = "Material Requests",
    request_body = PatchMaterialRequestItemPayload,
    params(("item_id" = i64, Path, description = "ID da linha")),
    responses(
        (status = 200, description = "Linha atualizada", body = Ack),
        (status = 400, description = "prepStatus inválido ou quantidade negativa"),
        (status = 403, description = "qtyUsed restrito a administradores/operadores"),
        (status = 404, description = "Linha não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn patch_material_request_item(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentUser(user_id): CurrentUser,
    Path(item_id): Path<i64>,
    Json(payload): Json<PatchMaterialRequestItemPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let input = ItemPatchInput {
        prep_status: payload.prep_status,
        qty_used: payload.qty_used,
        note: payload.note,
        qty_requested: payload.qty_requested,
    };

    app_state
        .material_request_service
        .patch_item(user_id, item_id, input)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(Ack::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_router, db::InMemoryStore, services::auth::issue_test_token};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const SECRET: &str = "segredo-de-teste";

    fn app() -> (Router, InMemoryStore) {
        let store = InMemoryStore::with_demo_users();
        let state = AppState::in_memory(SECRET.into(), store.clone());
        (build_router(state), store)
    }

    async fn call(app: &Router, method: &str, uri: &str, user_id: i64, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", issue_test_token(SECRET, user_id)));

        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    fn sample_request() -> Value {
        json!({
            "projectId": 77,
            "warehouseId": 1,
            "memo": "Obra norte",
            "items": [
                { "productId": 10, "itemNameSnapshot": "Cabo", "unitSnapshot": "m", "qtyRequested": 10 },
                { "productId": 11, "itemNameSnapshot": "Tubo", "unitSnapshot": "un", "qtyRequested": 5 }
            ]
        })
    }

    #[tokio::test]
    async fn missing_or_bad_token_is_401() {
        let (app, _) = app();

        let request = Request::builder()
            .uri("/api/material-requests")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .uri("/api/material-requests")
            .header(header::AUTHORIZATION, "Bearer lixo")
            .header(header::ACCEPT_LANGUAGE, "pt-BR")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Autenticação necessária.");
    }

    #[tokio::test]
    async fn create_then_read_detail() {
        let (app, store) = app();
        store.set_stock(1, 10, Decimal::from(35)).await;

        let (status, body) = call(&app, "POST", "/api/material-requests", 1, Some(sample_request())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "DRAFT");
        let id = body["id"].as_i64().unwrap();

        let (status, detail) = call(&app, "GET", &format!("/api/material-requests/{id}"), 2, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["canSeeSensitive"], true);
        assert_eq!(detail["prepStatus"], "PREPARING");
        assert_eq!(detail["header"]["requestedByName"], "Administrador");
        assert_eq!(detail["items"][0]["qtyOnHand"].as_f64(), Some(35.0));
        assert_eq!(detail["items"][1]["qtyOnHand"].as_f64(), Some(0.0));
        assert_eq!(detail["items"][0]["qtyUsed"].as_f64(), Some(0.0));

        let (_, detail) = call(&app, "GET", &format!("/api/material-requests/{id}"), 3, None).await;
        assert_eq!(detail["canSeeSensitive"], false);
        assert!(detail["items"][0]["qtyUsed"].is_null());
        assert!(detail["items"][0]["qtyOnHand"].is_null());
    }

    #[tokio::test]
    async fn staff_create_is_forbidden() {
        let (app, _) = app();
        let (status, _) = call(&app, "POST", "/api/material-requests", 3, Some(sample_request())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn negative_quantities_are_rejected() {
        let (app, _) = app();
        let mut payload = sample_request();
        payload["items"][0]["qtyRequested"] = json!(-1);
        let (status, body) = call(&app, "POST", "/api/material-requests", 1, Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["details"].is_object());

        let (_, created) = call(&app, "POST", "/api/material-requests", 1, Some(sample_request())).await;
        let id = created["id"].as_i64().unwrap();
        let (_, detail) = call(&app, "GET", &format!("/api/material-requests/{id}"), 1, None).await;
        let item_id = detail["items"][0]["id"].as_i64().unwrap();

        let (status, body) = call(
            &app,
            "PATCH",
            &format!("/api/material-requests/items/{item_id}"),
            1,
            Some(json!({ "qtyUsed": -2 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["details"].is_object());
    }

    #[tokio::test]
    async fn item_patch_signals() {
        let (app, store) = app();
        let (_, created) = call(&app, "POST", "/api/material-requests", 1, Some(sample_request())).await;
        let id = created["id"].as_i64().unwrap();
        let (_, detail) = call(&app, "GET", &format!("/api/material-requests/{id}"), 1, None).await;
        let item_id = detail["items"][0]["id"].as_i64().unwrap();
        let uri = format!("/api/material-requests/items/{item_id}");

        let (status, _) = call(&app, "PATCH", &uri, 3, Some(json!({ "qtyUsed": 3 }))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = call(&app, "PATCH", &uri, 3, Some(json!({ "prepStatus": "DONE" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["prepStatus"], "DONE");

        let (status, body) = call(&app, "PATCH", &uri, 2, Some(json!({ "qtyUsed": 4, "note": null }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true }));
        assert_eq!(store.stock(1, 10).await, Some(Decimal::from(-4)));

        let (status, _) = call(&app, "PATCH", "/api/material-requests/items/999", 2, Some(json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn header_update_and_mark_all_ready() {
        let (app, _) = app();
        let (_, created) = call(&app, "POST", "/api/material-requests", 1, Some(sample_request())).await;
        let id = created["id"].as_i64().unwrap();

        let (status, _) = call(
            &app,
            "PUT",
            &format!("/api/material-requests/{id}"),
            2,
            Some(json!({ "memo": "revisado" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&app, "POST", &format!("/api/material-requests/{id}/mark-all-ready"), 1, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);

        let (_, detail) = call(&app, "GET", &format!("/api/material-requests/{id}"), 3, None).await;
        assert_eq!(detail["header"]["memo"], "revisado");
        assert_eq!(detail["header"]["warehouseId"], 1);
        assert_eq!(detail["prepStatus"], "READY");

        let (status, _) = call(&app, "POST", "/api/material-requests/999/mark-all-ready", 1, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_with_query_filters() {
        let (app, _) = app();
        call(&app, "POST", "/api/material-requests", 1, Some(sample_request())).await;

        let (status, body) = call(&app, "GET", "/api/material-requests?year=0&q=norte", 3, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["canSeeSensitive"], false);
        assert_eq!(body["items"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["items"][0]["prepStatus"], "PREPARING");

        let (_, body) = call(&app, "GET", "/api/material-requests?q=nada-disso", 3, None).await;
        assert_eq!(body["items"], json!([]));
    }

    #[tokio::test]
    async fn permission_is_checked_before_quantity_validation() {
        let (app, store) = app();
        let (_, created) = call(&app, "POST", "/api/material-requests", 1, Some(sample_request())).await;
        let id = created["id"].as_i64().unwrap();
        let (_, detail) = call(&app, "GET", &format!("/api/material-requests/{id}"), 1, None).await;
        let item_id = detail["items"][0]["id"].as_i64().unwrap();
        let uri = format!("/api/material-requests/items/{item_id}");

        let (status, _) = call(&app, "PATCH", &uri, 3, Some(json!({ "qtyUsed": -2 }))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = call(&app, "PATCH", &uri, 3, Some(json!({ "qtyRequested": -1 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let item = store.item(item_id).await.unwrap();
        assert_eq!(item.qty_used, Decimal::ZERO);
        assert_eq!(item.qty_requested, Decimal::from(10));
    }

    #[test]
    fn zero_is_not_negative() {
        assert!(validate_not_negative(&Decimal::ZERO).is_ok());
        assert!(validate_not_negative(&Decimal::from(-1)).is_err());
    }
}
