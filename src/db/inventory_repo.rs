// src/db/inventory_repo.rs

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    db::InventoryGateway,
    models::inventory::{StockMovement, StockMovementReason, UsageAdjustment},
};

#[derive(Clone)]
pub struct InventoryRepository {
    pool: PgPool,
}

impl InventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Leitura
    // ---

    pub async fn get_qty_on_hand<'e, E>(
        &self,
        executor: E,
        warehouse_id: i64,
        product_id: i64,
    ) -> Result<Option<Decimal>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let qty = sqlx::query_scalar::<_, Decimal>(
            "SELECT qty_on_hand FROM inventory WHERE warehouse_id = $1 AND product_id = $2",
        )
            .bind(warehouse_id)
            .bind(product_id)
            .fetch_optional(executor)
            .await?;

        Ok(qty)
    }

    // ---
    // Escrita (sempre dentro da transação de quem chama)
    // ---

    /// Soma `quantity_changed` ao saldo do depósito, criando a linha se preciso.
    pub async fn apply_stock_change<'e, E>(
        &self,
        executor: E,
        warehouse_id: i64,
        product_id: i64,
        quantity_changed: Decimal, // ex: +5.0 ou -2.0
    ) -> Result<Decimal, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // UPSERT atômico: previne "race conditions" entre dois patches.
        let qty = sqlx::query_scalar::<_, Decimal>(
            r#"
            INSERT INTO inventory (warehouse_id, product_id, qty_on_hand)
            VALUES ($1, $2, $3::numeric)
            ON CONFLICT (warehouse_id, product_id)
            DO UPDATE SET
                qty_on_hand = inventory.qty_on_hand + $3::numeric,
                updated_at = NOW()
            RETURNING qty_on_hand
            "#,
        )
            .bind(warehouse_id)
            .bind(product_id)
            .bind(quantity_changed)
            .fetch_one(executor)
            .await?;

        Ok(qty)
    }

    /// Registra a movimentação no livro-razão (auditoria).
    pub async fn record_stock_movement<'e, E>(
        &self,
        executor: E,
        adjustment: &UsageAdjustment,
    ) -> Result<StockMovement, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let movement = sqlx::query_as::<_, StockMovement>(
            r#"
            INSERT INTO stock_movements (
                warehouse_id, product_id, quantity_changed, reason, material_request_item_id
            )
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, warehouse_id, product_id, quantity_changed, reason,
                      material_request_item_id, created_at
            "#,
        )
            .bind(adjustment.warehouse_id)
            .bind(adjustment.product_id)
            .bind(adjustment.stock_change())
            .bind(StockMovementReason::MaterialRequestUsage)
            .bind(adjustment.item_id)
            .fetch_one(executor)
            .await?;

        Ok(movement)
    }
}

#[async_trait]
impl InventoryGateway for InventoryRepository {
    async fn quantity_on_hand(
        &self,
        warehouse_id: i64,
        product_id: i64,
    ) -> Result<Option<Decimal>, AppError> {
        self.get_qty_on_hand(&self.pool, warehouse_id, product_id).await
    }
}
