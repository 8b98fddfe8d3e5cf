// src/db/gateways.rs

// Contratos dos colaboradores externos consumidos pelos serviços.
// Há uma implementação Postgres (repositórios) e uma em memória (`InMemoryStore`).

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::{
    common::error::AppError,
    models::{
        auth::User,
        material_request::{
            MaterialRequest, MaterialRequestHeaderPatch, MaterialRequestItem,
            MaterialRequestItemPatch, MaterialRequestSummary, NewMaterialRequest,
            NewMaterialRequestItem, RequestListFilter,
        },
    },
};

#[async_trait]
pub trait IdentityGateway: Send + Sync {
    /// Usuário não excluído com esse ID, se existir.
    async fn fetch_active_user(&self, user_id: i64) -> Result<Option<User>, AppError>;
}

#[async_trait]
pub trait InventoryGateway: Send + Sync {
    async fn quantity_on_hand(
        &self,
        warehouse_id: i64,
        product_id: i64,
    ) -> Result<Option<Decimal>, AppError>;
}

#[async_trait]
pub trait MaterialRequestStore: Send + Sync {
    /// Mais recentes primeiro (ID decrescente).
    async fn list_requests(
        &self,
        filter: &RequestListFilter,
    ) -> Result<Vec<MaterialRequestSummary>, AppError>;

    /// Cabeçalho e linhas numa única unidade de trabalho.
    /// `None` quando o cabeçalho não devolveu ID (nada é gravado).
    async fn create_request(
        &self,
        header: &NewMaterialRequest,
        items: &[NewMaterialRequestItem],
    ) -> Result<Option<i64>, AppError>;

    async fn find_request(&self, request_id: i64) -> Result<Option<MaterialRequest>, AppError>;

    /// Linhas em ordem crescente de ID.
    async fn list_items(&self, request_id: i64) -> Result<Vec<MaterialRequestItem>, AppError>;

    /// `false` se a requisição não existe.
    async fn update_header(
        &self,
        request_id: i64,
        patch: &MaterialRequestHeaderPatch,
    ) -> Result<bool, AppError>;

    /// `false` se a requisição não existe.
    async fn mark_all_ready(&self, request_id: i64) -> Result<bool, AppError>;

    /// Aplica o patch e, na mesma transação, o ajuste de estoque
    /// quando `qty_used` muda. `false` se a linha não existe.
    async fn patch_item(
        &self,
        item_id: i64,
        patch: &MaterialRequestItemPatch,
    ) -> Result<bool, AppError>;
}
