// src/models/material_request.rs

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

pub const STATUS_DRAFT: &str = "DRAFT";

// Quantidades (pedida/utilizada) nunca negativas.
pub fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() && !val.is_zero() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

// --- Enums ---
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "material_prep_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrepStatus {
    #[default]
    Preparing,
    Ready,
}

impl PrepStatus {
    /// Aceita apenas os valores exatos usados na API ("PREPARING" | "READY").
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PREPARING" => Some(PrepStatus::Preparing),
            "READY" => Some(PrepStatus::Ready),
            _ => None,
        }
    }

    /// Status agregado da requisição: basta uma linha em preparo.
    /// Conjunto vazio conta como pronto.
    pub fn aggregate<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = PrepStatus>,
    {
        if statuses.into_iter().any(|s| s == PrepStatus::Preparing) {
            PrepStatus::Preparing
        } else {
            PrepStatus::Ready
        }
    }
}

// --- Registros ---

// Cabeçalho da requisição de materiais
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaterialRequest {
    #[schema(example = 120)]
    pub id: i64,
    pub project_id: Option<i64>,
    pub client_id: Option<i64>,
    pub estimate_id: Option<i64>,
    pub estimate_revision_id: Option<i64>,
    #[schema(example = "DRAFT")]
    pub status: String,
    pub warehouse_id: Option<i64>,
    pub requested_by: i64,
    #[schema(example = "Maria Souza")]
    pub requested_by_name: Option<String>,
    #[schema(example = "Obra da Rua 7 - segunda etapa")]
    pub memo: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Linha da listagem. Nunca carrega campos sensíveis.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaterialRequestSummary {
    pub id: i64,
    pub project_id: Option<i64>,
    pub memo: String,
    pub status: String,
    pub warehouse_id: Option<i64>,
    pub requested_by: i64,
    pub requested_by_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub prep_status: PrepStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MaterialRequestItem {
    pub id: i64,
    pub material_request_id: i64,
    pub product_id: Option<i64>,
    pub estimate_item_id: Option<i64>,
    pub item_name_snapshot: String,
    pub spec_snapshot: String,
    pub unit_snapshot: String,
    pub qty_requested: Decimal,
    pub qty_used: Decimal,
    pub note: String,
    pub prep_status: PrepStatus,
}

// --- Entradas ---

// `prep_status` e `qty_used` não existem aqui: na criação são sempre do servidor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewMaterialRequestItem {
    pub product_id: Option<i64>,
    pub estimate_item_id: Option<i64>,
    pub item_name_snapshot: String,
    pub spec_snapshot: String,
    pub unit_snapshot: String,
    pub qty_requested: Decimal,
    pub note: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateMaterialRequest {
    pub project_id: Option<i64>,
    pub client_id: Option<i64>,
    pub estimate_id: Option<i64>,
    pub estimate_revision_id: Option<i64>,
    pub warehouse_id: Option<i64>,
    pub memo: String,
    pub items: Vec<NewMaterialRequestItem>,
}

/// Cabeçalho pronto para inserir, já com o solicitante resolvido.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMaterialRequest {
    pub project_id: Option<i64>,
    pub client_id: Option<i64>,
    pub estimate_id: Option<i64>,
    pub estimate_revision_id: Option<i64>,
    pub warehouse_id: Option<i64>,
    pub memo: String,
    pub requested_by: i64,
}

// --- Atualizações parciais (campo ausente = mantém o valor atual) ---

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialRequestHeaderPatch {
    pub memo: Option<String>,
    pub warehouse_id: Option<i64>,
}

impl MaterialRequestHeaderPatch {
    pub fn apply_to(&self, header: &mut MaterialRequest, now: DateTime<Utc>) {
        if let Some(memo) = &self.memo {
            header.memo = memo.clone();
        }
        if let Some(warehouse_id) = self.warehouse_id {
            header.warehouse_id = Some(warehouse_id);
        }
        header.updated_at = now;
    }
}

/// Entrada crua do PATCH de linha; `prep_status` ainda não foi validado.
/// As quantidades só são validadas depois da checagem de permissão.
#[derive(Debug, Clone, Default, PartialEq, Validate)]
pub struct ItemPatchInput {
    pub prep_status: Option<String>,
    #[validate(custom(function = "validate_not_negative"))]
    pub qty_used: Option<Decimal>,
    pub note: Option<String>,
    #[validate(custom(function = "validate_not_negative"))]
    pub qty_requested: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialRequestItemPatch {
    pub prep_status: Option<PrepStatus>,
    pub qty_used: Option<Decimal>,
    pub note: Option<String>,
    pub qty_requested: Option<Decimal>,
}

impl MaterialRequestItemPatch {
    /// Nenhum campo presente: o PATCH não grava nada.
    pub fn is_empty(&self) -> bool {
        self.prep_status.is_none()
            && self.qty_used.is_none()
            && self.note.is_none()
            && self.qty_requested.is_none()
    }

    pub fn apply_to(&self, item: &mut MaterialRequestItem) {
        if let Some(status) = self.prep_status {
            item.prep_status = status;
        }
        if let Some(qty_used) = self.qty_used {
            item.qty_used = qty_used;
        }
        if let Some(note) = &self.note {
            item.note = note.clone();
        }
        if let Some(qty_requested) = self.qty_requested {
            item.qty_requested = qty_requested;
        }
    }
}

// --- Filtro da listagem ---

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestListFilter {
    /// Ano de criação. `None` = sem filtro (o chamador decide o "ano atual").
    pub year: Option<i32>,
    /// Termo de busca parcial sobre nome do solicitante ou memo.
    pub search: Option<String>,
}

impl RequestListFilter {
    pub fn new(year: Option<i32>, search: Option<&str>) -> Self {
        Self {
            year: year.filter(|y| *y > 0),
            search: search.filter(|q| !q.is_empty()).map(str::to_owned),
        }
    }

    /// Padrão ILIKE com os curingas do termo escapados (`\` como escape).
    pub fn like_pattern(&self) -> Option<String> {
        self.search.as_ref().map(|term| {
            let mut escaped = String::with_capacity(term.len() + 2);
            escaped.push('%');
            for c in term.chars() {
                if matches!(c, '\\' | '%' | '_') {
                    escaped.push('\\');
                }
                escaped.push(c);
            }
            escaped.push('%');
            escaped
        })
    }

    pub fn matches(&self, requester_name: Option<&str>, memo: &str, created_at: DateTime<Utc>) -> bool {
        if let Some(year) = self.year {
            if created_at.year() != year {
                return false;
            }
        }
        match &self.search {
            None => true,
            Some(term) => {
                let term = term.to_lowercase();
                requester_name.unwrap_or_default().to_lowercase().contains(&term)
                    || memo.to_lowercase().contains(&term)
            }
        }
    }
}

// --- Respostas ---

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaterialRequestListResponse {
    pub can_see_sensitive: bool,
    pub items: Vec<MaterialRequestSummary>,
}

// Linha já filtrada pela política de visibilidade.
// `None` sai como `null` no JSON: "não consultado" é diferente de zero.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MaterialRequestItemView {
    pub id: i64,
    pub material_request_id: i64,
    pub product_id: Option<i64>,
    pub estimate_item_id: Option<i64>,
    pub item_name_snapshot: String,
    pub spec_snapshot: String,
    pub unit_snapshot: String,
    #[schema(example = "10.0")]
    pub qty_requested: Decimal,
    #[schema(example = "4.0")]
    pub qty_used: Option<Decimal>,
    pub note: String,
    pub prep_status: PrepStatus,
    #[schema(example = "35.0")]
    pub qty_on_hand: Option<Decimal>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaterialRequestDetailResponse {
    pub can_see_sensitive: bool,
    pub header: MaterialRequest,
    pub prep_status: PrepStatus,
    pub items: Vec<MaterialRequestItemView>,
}

#[derive(Debug, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreatedMaterialRequest {
    pub id: i64,
    #[schema(example = "DRAFT")]
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Ack {
    pub ok: bool,
}

impl Ack {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}
