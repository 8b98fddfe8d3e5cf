// src/db/material_request_repo.rs

use async_trait::async_trait;
use sqlx::{Executor, FromRow, PgPool, Postgres};

use crate::{
    common::error::AppError,
    db::{InventoryRepository, MaterialRequestStore},
    models::{
        inventory::UsageAdjustment,
        material_request::{
            MaterialRequest, MaterialRequestHeaderPatch, MaterialRequestItem,
            MaterialRequestItemPatch, MaterialRequestSummary, NewMaterialRequest,
            NewMaterialRequestItem, RequestListFilter, STATUS_DRAFT,
        },
    },
};

// Linha travada para o PATCH, junto com o depósito da requisição-mãe.
#[derive(Debug, FromRow)]
struct LockedItem {
    #[sqlx(flatten)]
    item: MaterialRequestItem,
    warehouse_id: Option<i64>,
}

#[derive(Clone)]
pub struct MaterialRequestRepository {
    pool: PgPool,
    inventory_repo: InventoryRepository,
}

impl MaterialRequestRepository {
    pub fn new(pool: PgPool, inventory_repo: InventoryRepository) -> Self {
        Self { pool, inventory_repo }
    }

    // =========================================================================
    //  CABEÇALHO
    // =========================================================================

    pub async fn list_summaries<'e, E>(
        &self,
        executor: E,
        filter: &RequestListFilter,
    ) -> Result<Vec<MaterialRequestSummary>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Resumo de preparo: uma linha em PREPARING basta.
        let rows = sqlx::query_as::<_, MaterialRequestSummary>(
            r#"
            SELECT
                mr.id,
                mr.project_id,
                COALESCE(mr.memo, '') AS memo,
                mr.status,
                mr.warehouse_id,
                mr.requested_by,
                u.name AS requested_by_name,
                mr.created_at,
                mr.updated_at,
                CASE
                    WHEN EXISTS (
                        SELECT 1
                        FROM material_request_items mri
                        WHERE mri.material_request_id = mr.id
                          AND mri.prep_status = 'PREPARING'
                    ) THEN 'PREPARING'::material_prep_status
                    ELSE 'READY'::material_prep_status
                END AS prep_status
            FROM material_requests mr
            LEFT JOIN users u ON u.id = mr.requested_by
            WHERE ($1::int IS NULL OR EXTRACT(YEAR FROM mr.created_at)::int = $1)
              AND (
                $2::text IS NULL
                OR COALESCE(u.name, '') ILIKE $2 ESCAPE '\'
                OR COALESCE(mr.memo, '') ILIKE $2 ESCAPE '\'
              )
            ORDER BY mr.id DESC
            "#,
        )
            .bind(filter.year)
            .bind(filter.like_pattern())
            .fetch_all(executor)
            .await?;

        Ok(rows)
    }

    pub async fn insert_header<'e, E>(
        &self,
        executor: E,
        header: &NewMaterialRequest,
    ) -> Result<Option<i64>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO material_requests (
                project_id, client_id, estimate_id, estimate_revision_id,
                status, requested_by, memo, warehouse_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
            .bind(header.project_id)
            .bind(header.client_id)
            .bind(header.estimate_id)
            .bind(header.estimate_revision_id)
            .bind(STATUS_DRAFT)
            .bind(header.requested_by)
            .bind(&header.memo)
            .bind(header.warehouse_id)
            .fetch_optional(executor)
            .await?;

        Ok(id)
    }

    pub async fn find_header<'e, E>(
        &self,
        executor: E,
        request_id: i64,
    ) -> Result<Option<MaterialRequest>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let header = sqlx::query_as::<_, MaterialRequest>(
            r#"
            SELECT
                mr.id,
                mr.project_id,
                mr.client_id,
                mr.estimate_id,
                mr.estimate_revision_id,
                mr.status,
                mr.warehouse_id,
                mr.requested_by,
                u.name AS requested_by_name,
                COALESCE(mr.memo, '') AS memo,
                mr.created_at,
                mr.updated_at
            FROM material_requests mr
            LEFT JOIN users u ON u.id = mr.requested_by
            WHERE mr.id = $1
            "#,
        )
            .bind(request_id)
            .fetch_optional(executor)
            .await?;

        Ok(header)
    }

    // COALESCE: campo nulo mantém o valor gravado. updated_at sempre renova.
    pub async fn update_header_fields<'e, E>(
        &self,
        executor: E,
        request_id: i64,
        patch: &MaterialRequestHeaderPatch,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE material_requests
            SET
                memo = COALESCE($2, memo),
                warehouse_id = COALESCE($3, warehouse_id),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
            .bind(request_id)
            .bind(patch.memo.as_deref())
            .bind(patch.warehouse_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn request_exists<'e, E>(&self, executor: E, request_id: i64) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM material_requests WHERE id = $1)",
        )
            .bind(request_id)
            .fetch_one(executor)
            .await?;

        Ok(exists)
    }

    /// Chama a função do banco que marca todas as linhas como READY.
    pub async fn call_mark_all_ready<'e, E>(&self, executor: E, request_id: i64) -> Result<i32, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let updated = sqlx::query_scalar::<_, i32>("SELECT fn_material_request_mark_all_ready($1)")
            .bind(request_id)
            .fetch_one(executor)
            .await?;

        Ok(updated)
    }

    // =========================================================================
    //  LINHAS
    // =========================================================================

    // prep_status e qty_used são do servidor na criação.
    pub async fn insert_item<'e, E>(
        &self,
        executor: E,
        request_id: i64,
        item: &NewMaterialRequestItem,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO material_request_items (
                material_request_id, product_id, estimate_item_id,
                item_name_snapshot, spec_snapshot, unit_snapshot,
                qty_requested, note, prep_status, qty_used
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'PREPARING', 0)
            RETURNING id
            "#,
        )
            .bind(request_id)
            .bind(item.product_id)
            .bind(item.estimate_item_id)
            .bind(&item.item_name_snapshot)
            .bind(&item.spec_snapshot)
            .bind(&item.unit_snapshot)
            .bind(item.qty_requested)
            .bind(&item.note)
            .fetch_one(executor)
            .await?;

        Ok(id)
    }

    pub async fn find_items<'e, E>(
        &self,
        executor: E,
        request_id: i64,
    ) -> Result<Vec<MaterialRequestItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, MaterialRequestItem>(
            r#"
            SELECT
                mri.id,
                mri.material_request_id,
                mri.product_id,
                mri.estimate_item_id,
                COALESCE(mri.item_name_snapshot, '') AS item_name_snapshot,
                COALESCE(mri.spec_snapshot, '') AS spec_snapshot,
                COALESCE(mri.unit_snapshot, '') AS unit_snapshot,
                COALESCE(mri.qty_requested, 0) AS qty_requested,
                COALESCE(mri.qty_used, 0) AS qty_used,
                COALESCE(mri.note, '') AS note,
                mri.prep_status
            FROM material_request_items mri
            WHERE mri.material_request_id = $1
            ORDER BY mri.id ASC
            "#,
        )
            .bind(request_id)
            .fetch_all(executor)
            .await?;

        Ok(items)
    }

    async fn lock_item<'e, E>(&self, executor: E, item_id: i64) -> Result<Option<LockedItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let locked = sqlx::query_as::<_, LockedItem>(
            r#"
            SELECT
                mri.id,
                mri.material_request_id,
                mri.product_id,
                mri.estimate_item_id,
                COALESCE(mri.item_name_snapshot, '') AS item_name_snapshot,
                COALESCE(mri.spec_snapshot, '') AS spec_snapshot,
                COALESCE(mri.unit_snapshot, '') AS unit_snapshot,
                COALESCE(mri.qty_requested, 0) AS qty_requested,
                COALESCE(mri.qty_used, 0) AS qty_used,
                COALESCE(mri.note, '') AS note,
                mri.prep_status,
                mr.warehouse_id
            FROM material_request_items mri
            JOIN material_requests mr ON mr.id = mri.material_request_id
            WHERE mri.id = $1
            FOR UPDATE OF mri
            "#,
        )
            .bind(item_id)
            .fetch_optional(executor)
            .await?;

        Ok(locked)
    }

    pub async fn update_item_fields<'e, E>(
        &self,
        executor: E,
        item_id: i64,
        patch: &MaterialRequestItemPatch,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE material_request_items
            SET
                prep_status = COALESCE($2, prep_status),
                note = COALESCE($3, note),
                qty_requested = COALESCE($4, qty_requested),
                qty_used = COALESCE($5, qty_used),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
            .bind(item_id)
            .bind(patch.prep_status)
            .bind(patch.note.as_deref())
            .bind(patch.qty_requested)
            .bind(patch.qty_used)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl MaterialRequestStore for MaterialRequestRepository {
    async fn list_requests(
        &self,
        filter: &RequestListFilter,
    ) -> Result<Vec<MaterialRequestSummary>, AppError> {
        self.list_summaries(&self.pool, filter).await
    }

    async fn create_request(
        &self,
        header: &NewMaterialRequest,
        items: &[NewMaterialRequestItem],
    ) -> Result<Option<i64>, AppError> {
        // Cabeçalho + linhas: se qualquer insert falhar, o drop do `tx` faz rollback.
        let mut tx = self.pool.begin().await?;

        let Some(request_id) = self.insert_header(&mut *tx, header).await? else {
            return Ok(None);
        };

        for item in items {
            self.insert_item(&mut *tx, request_id, item).await?;
        }

        tx.commit().await?;
        Ok(Some(request_id))
    }

    async fn find_request(&self, request_id: i64) -> Result<Option<MaterialRequest>, AppError> {
        self.find_header(&self.pool, request_id).await
    }

    async fn list_items(&self, request_id: i64) -> Result<Vec<MaterialRequestItem>, AppError> {
        self.find_items(&self.pool, request_id).await
    }

    async fn update_header(
        &self,
        request_id: i64,
        patch: &MaterialRequestHeaderPatch,
    ) -> Result<bool, AppError> {
        let affected = self.update_header_fields(&self.pool, request_id, patch).await?;
        Ok(affected > 0)
    }

    async fn mark_all_ready(&self, request_id: i64) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        if !self.request_exists(&mut *tx, request_id).await? {
            return Ok(false);
        }

        let updated = self.call_mark_all_ready(&mut *tx, request_id).await?;
        tx.commit().await?;

        tracing::info!(request_id, updated, "linhas marcadas como READY");
        Ok(true)
    }

    async fn patch_item(
        &self,
        item_id: i64,
        patch: &MaterialRequestItemPatch,
    ) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        // Trava a linha para calcular o delta de qty_used sem corrida.
        let Some(locked) = self.lock_item(&mut *tx, item_id).await? else {
            return Ok(false);
        };

        // PATCH sem campos não grava nada (nem updated_at).
        if patch.is_empty() {
            return Ok(true);
        }

        self.update_item_fields(&mut *tx, item_id, patch).await?;

        let adjustment = patch.qty_used.and_then(|new_used| {
            UsageAdjustment::between(
                locked.warehouse_id,
                locked.item.product_id,
                item_id,
                locked.item.qty_used,
                new_used,
            )
        });

        if let Some(adjustment) = adjustment {
            let qty_on_hand = self
                .inventory_repo
                .apply_stock_change(
                    &mut *tx,
                    adjustment.warehouse_id,
                    adjustment.product_id,
                    adjustment.stock_change(),
                )
                .await?;
            self.inventory_repo.record_stock_movement(&mut *tx, &adjustment).await?;

            tracing::info!(
                item_id,
                warehouse_id = adjustment.warehouse_id,
                product_id = adjustment.product_id,
                delta = %adjustment.delta,
                qty_on_hand = %qty_on_hand,
                "estoque ajustado pelo uso da requisição"
            );
        }

        tx.commit().await?;
        Ok(true)
    }
}
