// src/db/memory.rs

// Backend em memória (DATA_BACKEND=memory). Implementa os três gateways com
// a mesma semântica do Postgres; cada operação roda sob um único lock,
// o que faz dela uma unidade de trabalho.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::{
    common::error::AppError,
    db::{IdentityGateway, InventoryGateway, MaterialRequestStore},
    models::{
        auth::{User, ROLE_ADMIN_ID, ROLE_OPERATOR_ID},
        inventory::{StockMovement, StockMovementReason, UsageAdjustment},
        material_request::{
            MaterialRequest, MaterialRequestHeaderPatch, MaterialRequestItem,
            MaterialRequestItemPatch, MaterialRequestSummary, NewMaterialRequest,
            NewMaterialRequestItem, PrepStatus, RequestListFilter, STATUS_DRAFT,
        },
    },
};

#[derive(Debug, Clone)]
struct StoredUser {
    user: User,
    deleted: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    users: BTreeMap<i64, StoredUser>,
    requests: BTreeMap<i64, MaterialRequest>,
    items: BTreeMap<i64, MaterialRequestItem>,
    inventory: HashMap<(i64, i64), Decimal>,
    movements: Vec<StockMovement>,
    last_request_id: i64,
    last_item_id: i64,
    #[cfg(test)]
    fail_line_insert_at: Option<usize>,
}

impl MemoryState {
    fn add_user(&mut self, id: i64, name: &str, role_id: Option<&str>) {
        let user = User {
            id,
            name: name.to_string(),
            role_id: role_id.map(str::to_owned),
        };
        self.users.insert(id, StoredUser { user, deleted: false });
    }

    // LEFT JOIN users: o nome aparece mesmo se o usuário foi excluído depois.
    fn requester_name(&self, user_id: i64) -> Option<String> {
        self.users.get(&user_id).map(|stored| stored.user.name.clone())
    }

    fn with_requester_name(&self, header: &MaterialRequest) -> MaterialRequest {
        MaterialRequest {
            requested_by_name: self.requester_name(header.requested_by),
            ..header.clone()
        }
    }

    fn items_of(&self, request_id: i64) -> impl Iterator<Item = &MaterialRequestItem> {
        self.items
            .values()
            .filter(move |item| item.material_request_id == request_id)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryStore {
    /// Usuários de demonstração: 1 = admin, 2 = operador, 3 = equipe comum.
    pub fn with_demo_users() -> Self {
        let mut state = MemoryState::default();
        state.add_user(1, "Administrador", Some(&ROLE_ADMIN_ID.to_string()));
        state.add_user(2, "Operador", Some(&ROLE_OPERATOR_ID.to_string()));
        state.add_user(3, "Equipe", Some("1"));
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }
}

#[cfg(test)]
impl InMemoryStore {
    pub async fn insert_user(&self, id: i64, name: &str, role_id: Option<&str>) {
        self.state.write().await.add_user(id, name, role_id);
    }

    pub async fn soft_delete_user(&self, id: i64) {
        if let Some(stored) = self.state.write().await.users.get_mut(&id) {
            stored.deleted = true;
        }
    }

    pub async fn set_stock(&self, warehouse_id: i64, product_id: i64, qty: Decimal) {
        self.state
            .write()
            .await
            .inventory
            .insert((warehouse_id, product_id), qty);
    }

    pub async fn stock(&self, warehouse_id: i64, product_id: i64) -> Option<Decimal> {
        self.state
            .read()
            .await
            .inventory
            .get(&(warehouse_id, product_id))
            .copied()
    }

    pub async fn stock_movements(&self) -> Vec<StockMovement> {
        self.state.read().await.movements.clone()
    }

    pub async fn item(&self, item_id: i64) -> Option<MaterialRequestItem> {
        self.state.read().await.items.get(&item_id).cloned()
    }

    pub async fn header(&self, request_id: i64) -> Option<MaterialRequest> {
        self.state.read().await.requests.get(&request_id).cloned()
    }

    /// A inserção da linha `index` falha nas próximas criações.
    pub async fn fail_line_insert_at(&self, index: Option<usize>) {
        self.state.write().await.fail_line_insert_at = index;
    }

    pub async fn backdate_request(&self, request_id: i64, created_at: chrono::DateTime<Utc>) {
        if let Some(header) = self.state.write().await.requests.get_mut(&request_id) {
            header.created_at = created_at;
        }
    }
}

#[async_trait]
impl IdentityGateway for InMemoryStore {
    async fn fetch_active_user(&self, user_id: i64) -> Result<Option<User>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .get(&user_id)
            .filter(|stored| !stored.deleted)
            .map(|stored| stored.user.clone()))
    }
}

#[async_trait]
impl InventoryGateway for InMemoryStore {
    async fn quantity_on_hand(
        &self,
        warehouse_id: i64,
        product_id: i64,
    ) -> Result<Option<Decimal>, AppError> {
        let state = self.state.read().await;
        Ok(state.inventory.get(&(warehouse_id, product_id)).copied())
    }
}

#[async_trait]
impl MaterialRequestStore for InMemoryStore {
    async fn list_requests(
        &self,
        filter: &RequestListFilter,
    ) -> Result<Vec<MaterialRequestSummary>, AppError> {
        let state = self.state.read().await;

        let summaries = state
            .requests
            .values()
            .rev() // ID decrescente
            .filter_map(|header| {
                let requester = state.requester_name(header.requested_by);
                if !filter.matches(requester.as_deref(), &header.memo, header.created_at) {
                    return None;
                }
                Some(MaterialRequestSummary {
                    id: header.id,
                    project_id: header.project_id,
                    memo: header.memo.clone(),
                    status: header.status.clone(),
                    warehouse_id: header.warehouse_id,
                    requested_by: header.requested_by,
                    requested_by_name: requester,
                    created_at: header.created_at,
                    updated_at: header.updated_at,
                    prep_status: PrepStatus::aggregate(
                        state.items_of(header.id).map(|item| item.prep_status),
                    ),
                })
            })
            .collect();

        Ok(summaries)
    }

    async fn create_request(
        &self,
        header: &NewMaterialRequest,
        items: &[NewMaterialRequestItem],
    ) -> Result<Option<i64>, AppError> {
        let mut state = self.state.write().await;
        let now = Utc::now();

        // Monta cabeçalho e linhas fora do estado; só grava se tudo der certo.
        let request_id = state.last_request_id + 1;
        let header = MaterialRequest {
            id: request_id,
            project_id: header.project_id,
            client_id: header.client_id,
            estimate_id: header.estimate_id,
            estimate_revision_id: header.estimate_revision_id,
            status: STATUS_DRAFT.to_string(),
            warehouse_id: header.warehouse_id,
            requested_by: header.requested_by,
            requested_by_name: None,
            memo: header.memo.clone(),
            created_at: now,
            updated_at: now,
        };

        let mut staged = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            #[cfg(test)]
            if state.fail_line_insert_at == Some(index) {
                return Err(AppError::DatabaseError(sqlx::Error::Protocol(
                    "falha simulada ao inserir linha".into(),
                )));
            }

            let item_id = state.last_item_id + 1 + index as i64;
            staged.push(MaterialRequestItem {
                id: item_id,
                material_request_id: request_id,
                product_id: item.product_id,
                estimate_item_id: item.estimate_item_id,
                item_name_snapshot: item.item_name_snapshot.clone(),
                spec_snapshot: item.spec_snapshot.clone(),
                unit_snapshot: item.unit_snapshot.clone(),
                qty_requested: item.qty_requested,
                qty_used: Decimal::ZERO,
                note: item.note.clone(),
                prep_status: PrepStatus::Preparing,
            });
        }

        state.last_request_id = request_id;
        state.last_item_id += staged.len() as i64;
        state.requests.insert(request_id, header);
        for item in staged {
            state.items.insert(item.id, item);
        }

        Ok(Some(request_id))
    }

    async fn find_request(&self, request_id: i64) -> Result<Option<MaterialRequest>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .requests
            .get(&request_id)
            .map(|header| state.with_requester_name(header)))
    }

    async fn list_items(&self, request_id: i64) -> Result<Vec<MaterialRequestItem>, AppError> {
        let state = self.state.read().await;
        Ok(state.items_of(request_id).cloned().collect())
    }

    async fn update_header(
        &self,
        request_id: i64,
        patch: &MaterialRequestHeaderPatch,
    ) -> Result<bool, AppError> {
        let mut state = self.state.write().await;
        match state.requests.get_mut(&request_id) {
            Some(header) => {
                patch.apply_to(header, Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_ready(&self, request_id: i64) -> Result<bool, AppError> {
        let mut state = self.state.write().await;
        let now = Utc::now();

        match state.requests.get_mut(&request_id) {
            Some(header) => header.updated_at = now,
            None => return Ok(false),
        }

        for item in state.items.values_mut() {
            if item.material_request_id == request_id {
                item.prep_status = PrepStatus::Ready;
            }
        }

        Ok(true)
    }

    async fn patch_item(
        &self,
        item_id: i64,
        patch: &MaterialRequestItemPatch,
    ) -> Result<bool, AppError> {
        let mut state = self.state.write().await;

        let Some(current) = state.items.get(&item_id).cloned() else {
            return Ok(false);
        };
        let warehouse_id = state
            .requests
            .get(&current.material_request_id)
            .and_then(|header| header.warehouse_id);

        let adjustment = patch.qty_used.and_then(|new_used| {
            UsageAdjustment::between(
                warehouse_id,
                current.product_id,
                item_id,
                current.qty_used,
                new_used,
            )
        });

        if let Some(item) = state.items.get_mut(&item_id) {
            patch.apply_to(item);
        }

        if let Some(adjustment) = adjustment {
            let key = (adjustment.warehouse_id, adjustment.product_id);
            *state.inventory.entry(key).or_insert(Decimal::ZERO) += adjustment.stock_change();

            let movement_id = state.movements.len() as i64 + 1;
            state.movements.push(StockMovement {
                id: movement_id,
                warehouse_id: adjustment.warehouse_id,
                product_id: adjustment.product_id,
                quantity_changed: adjustment.stock_change(),
                reason: StockMovementReason::MaterialRequestUsage,
                material_request_item_id: Some(item_id),
                created_at: Utc::now(),
            });
        }

        Ok(true)
    }
}
