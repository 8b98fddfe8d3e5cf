// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- MATERIAL REQUESTS ---
        handlers::material_requests::list_material_requests,
        handlers::material_requests::create_material_request,
        handlers::material_requests::get_material_request,
        handlers::material_requests::update_material_request,
        handlers::material_requests::mark_all_ready,
        handlers::material_requests::patch_material_request_item,
    ),
    components(
        schemas(
            // --- Models ---
            models::material_request::PrepStatus,
            models::material_request::MaterialRequest,
            models::material_request::MaterialRequestSummary,
            models::material_request::MaterialRequestItemView,
            models::material_request::MaterialRequestListResponse,
            models::material_request::MaterialRequestDetailResponse,
            models::material_request::CreatedMaterialRequest,
            models::material_request::Ack,

            // --- Payloads ---
            handlers::material_requests::CreateMaterialRequestPayload,
            handlers::material_requests::CreateMaterialRequestItemPayload,
            handlers::material_requests::UpdateMaterialRequestPayload,
            handlers::material_requests::PatchMaterialRequestItemPayload,
        )
    ),
    tags(
        (name = "Material Requests", description = "Requisições de materiais, preparo e consumo")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
