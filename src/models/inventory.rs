// src/models/inventory.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Motivo registrado no livro-razão de estoque.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "stock_movement_reason", rename_all = "SCREAMING_SNAKE_CASE")] // Banco
#[serde(rename_all = "SCREAMING_SNAKE_CASE")] // JSON
pub enum StockMovementReason {
    MaterialRequestUsage, // Vira "MATERIAL_REQUEST_USAGE"
}

// --- STOCK MOVEMENT (Histórico) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: i64,
    pub warehouse_id: i64,
    pub product_id: i64,
    pub quantity_changed: Decimal,
    pub reason: StockMovementReason,
    pub material_request_item_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Ajuste de estoque provocado pela mudança de `qty_used` de uma linha.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageAdjustment {
    pub warehouse_id: i64,
    pub product_id: i64,
    pub item_id: i64,
    /// Nova quantidade utilizada menos a anterior. Positivo consome estoque.
    pub delta: Decimal,
}

impl UsageAdjustment {
    /// Só existe ajuste quando há depósito, produto e alguma diferença de quantidade.
    pub fn between(
        warehouse_id: Option<i64>,
        product_id: Option<i64>,
        item_id: i64,
        previous_used: Decimal,
        new_used: Decimal,
    ) -> Option<Self> {
        let delta = new_used - previous_used;
        if delta.is_zero() {
            return None;
        }
        Some(Self {
            warehouse_id: warehouse_id?,
            product_id: product_id?,
            item_id,
            delta,
        })
    }

    /// Variação registrada no saldo (negativa quando consome).
    pub fn stock_change(&self) -> Decimal {
        -self.delta
    }
}
