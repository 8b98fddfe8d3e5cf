// src/services/material_request_service.rs

use std::sync::Arc;

use rust_decimal::Decimal;
use validator::Validate;

use crate::{
    common::error::{AppError, Denial, InvalidInput, Resource},
    db::{InventoryGateway, MaterialRequestStore},
    models::material_request::{
        CreateMaterialRequest, CreatedMaterialRequest, ItemPatchInput,
        MaterialRequestDetailResponse, MaterialRequestHeaderPatch, MaterialRequestItemPatch,
        MaterialRequestListResponse, NewMaterialRequest, PrepStatus, RequestListFilter,
        STATUS_DRAFT,
    },
    services::{
        access::{has_sensitive_capability, require_sensitive_capability, AccessService},
        visibility::VisibilityPolicy,
    },
};

#[derive(Clone)]
pub struct MaterialRequestService {
    access: AccessService,
    store: Arc<dyn MaterialRequestStore>,
    inventory: Arc<dyn InventoryGateway>,
}

impl MaterialRequestService {
    pub fn new(
        access: AccessService,
        store: Arc<dyn MaterialRequestStore>,
        inventory: Arc<dyn InventoryGateway>,
    ) -> Self {
        Self { access, store, inventory }
    }

    // --- LISTAGEM ---

    pub async fn list(
        &self,
        caller_id: i64,
        filter: RequestListFilter,
    ) -> Result<MaterialRequestListResponse, AppError> {
        let user = self.access.resolve(caller_id).await?;

        // Campos sensíveis nunca saem na listagem, só o flag.
        let items = self.store.list_requests(&filter).await?;

        Ok(MaterialRequestListResponse {
            can_see_sensitive: has_sensitive_capability(&user),
            items,
        })
    }

    // --- CRIAÇÃO ---

    // Restrita a administradores/operadores por política, não por limitação técnica.
    pub async fn create(
        &self,
        caller_id: i64,
        input: CreateMaterialRequest,
    ) -> Result<CreatedMaterialRequest, AppError> {
        let user = self.access.resolve(caller_id).await?;
        require_sensitive_capability(&user)?;

        let header = NewMaterialRequest {
            project_id: input.project_id,
            client_id: input.client_id,
            estimate_id: input.estimate_id,
            estimate_revision_id: input.estimate_revision_id,
            warehouse_id: input.warehouse_id,
            memo: input.memo,
            requested_by: user.id,
        };

        let request_id = self
            .store
            .create_request(&header, &input.items)
            .await?
            .ok_or_else(|| {
                AppError::PersistenceFailure("INSERT do cabeçalho não retornou id".into())
            })?;

        tracing::info!(
            request_id,
            requested_by = user.id,
            items = input.items.len(),
            "requisição de materiais criada"
        );

        Ok(CreatedMaterialRequest {
            id: request_id,
            status: STATUS_DRAFT.to_string(),
        })
    }

    // --- DETALHE ---

    pub async fn get_detail(
        &self,
        caller_id: i64,
        request_id: i64,
    ) -> Result<MaterialRequestDetailResponse, AppError> {
        let user = self.access.resolve(caller_id).await?;
        let policy = VisibilityPolicy::for_user(&user);

        let header = self
            .store
            .find_request(request_id)
            .await?
            .ok_or(AppError::NotFound(Resource::MaterialRequest(request_id)))?;

        let items = self.store.list_items(request_id).await?;
        let prep_status = PrepStatus::aggregate(items.iter().map(|item| item.prep_status));

        // Consulta por linha, na ordem das linhas. Sem registro de estoque = 0.
        let mut views = Vec::with_capacity(items.len());
        for item in items {
            let qty_on_hand = match policy.stock_lookup(header.warehouse_id, item.product_id) {
                Some((warehouse_id, product_id)) => Some(
                    self.inventory
                        .quantity_on_hand(warehouse_id, product_id)
                        .await?
                        .unwrap_or(Decimal::ZERO),
                ),
                None => None,
            };
            views.push(policy.item_view(item, qty_on_hand));
        }

        Ok(MaterialRequestDetailResponse {
            can_see_sensitive: policy.can_see_sensitive(),
            header,
            prep_status,
            items: views,
        })
    }

    // --- ATUALIZAÇÕES ---

    pub async fn update_header(
        &self,
        caller_id: i64,
        request_id: i64,
        patch: MaterialRequestHeaderPatch,
    ) -> Result<(), AppError> {
        let user = self.access.resolve(caller_id).await?;
        require_sensitive_capability(&user)?;

        if !self.store.update_header(request_id, &patch).await? {
            return Err(AppError::NotFound(Resource::MaterialRequest(request_id)));
        }

        tracing::info!(request_id, updated_by = user.id, "cabeçalho atualizado");
        Ok(())
    }

    pub async fn mark_all_ready(&self, caller_id: i64, request_id: i64) -> Result<(), AppError> {
        let user = self.access.resolve(caller_id).await?;
        require_sensitive_capability(&user)?;

        if !self.store.mark_all_ready(request_id).await? {
            return Err(AppError::NotFound(Resource::MaterialRequest(request_id)));
        }

        tracing::info!(request_id, updated_by = user.id, "requisição marcada como pronta");
        Ok(())
    }

    pub async fn patch_item(
        &self,
        caller_id: i64,
        item_id: i64,
        input: ItemPatchInput,
    ) -> Result<(), AppError> {
        let user = self.access.resolve(caller_id).await?;

        // qty_used só para administradores/operadores
        if input.qty_used.is_some() && !has_sensitive_capability(&user) {
            tracing::warn!(item_id, user_id = user.id, "tentativa de alterar qty_used negada");
            return Err(AppError::Forbidden(Denial::QtyUsedRestricted));
        }

        input.validate()?;

        let prep_status = match input.prep_status {
            None => None,
            Some(raw) => match PrepStatus::parse(&raw) {
                Some(status) => Some(status),
                None => return Err(AppError::InvalidArgument(InvalidInput::PrepStatus(raw))),
            },
        };

        let patch = MaterialRequestItemPatch {
            prep_status,
            qty_used: input.qty_used,
            note: input.note,
            qty_requested: input.qty_requested,
        };

        if !self.store.patch_item(item_id, &patch).await? {
            return Err(AppError::NotFound(Resource::MaterialRequestItem(item_id)));
        }

        tracing::info!(item_id, updated_by = user.id, "linha da requisição atualizada");
        Ok(())
    }
}
