// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::common::i18n::{translate, MessageKey};
use crate::middleware::i18n::Locale;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    PrivilegedRoleRequired,
    QtyUsedRestricted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    MaterialRequest(i64),
    MaterialRequestItem(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidInput {
    PrepStatus(String),
}

// Taxonomia de erros do módulo, com `thiserror` para a ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Autenticação necessária")]
    Unauthenticated,

    #[error("Acesso negado: {0:?}")]
    Forbidden(Denial),

    #[error("Não encontrado: {0:?}")]
    NotFound(Resource),

    #[error("Argumento inválido: {0:?}")]
    InvalidArgument(InvalidInput),

    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Falha de persistência: {0}")]
    PersistenceFailure(String),

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

// O erro que realmente sai pela API, já traduzido.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidArgument(_) | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::PersistenceFailure(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message_key(&self) -> MessageKey {
        match self {
            AppError::Unauthenticated => MessageKey::Unauthenticated,
            AppError::Forbidden(Denial::PrivilegedRoleRequired) => MessageKey::PrivilegedRoleRequired,
            AppError::Forbidden(Denial::QtyUsedRestricted) => MessageKey::QtyUsedRestricted,
            AppError::NotFound(Resource::MaterialRequest(_)) => MessageKey::MaterialRequestNotFound,
            AppError::NotFound(Resource::MaterialRequestItem(_)) => MessageKey::MaterialRequestItemNotFound,
            AppError::InvalidArgument(InvalidInput::PrepStatus(_)) => MessageKey::InvalidPrepStatus,
            AppError::ValidationError(_) => MessageKey::InvalidFields,
            AppError::PersistenceFailure(_) => MessageKey::CreateFailed,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => MessageKey::Unexpected,
        }
    }

    pub fn to_api_error(self, locale: &Locale) -> ApiError {
        let status = self.status();
        let error = translate(self.message_key(), &locale.0).to_string();

        let details = match &self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), json!(messages));
                }
                if details.is_empty() {
                    // Erros aninhados (linhas da requisição) vão com a estrutura completa.
                    serde_json::to_value(errors).ok()
                } else {
                    Some(Value::Object(details))
                }
            }
            AppError::InvalidArgument(InvalidInput::PrepStatus(value)) => {
                Some(json!({ "prepStatus": value }))
            }
            _ => None,
        };

        if status.is_server_error() {
            // O `tracing` loga a mensagem detalhada; o cliente recebe só a genérica.
            tracing::error!("Erro Interno do Servidor: {}", self);
        }

        ApiError { status, error, details }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_http_signals() {
        assert_eq!(AppError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Forbidden(Denial::QtyUsedRestricted).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::NotFound(Resource::MaterialRequest(1)).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::InvalidArgument(InvalidInput::PrepStatus("DONE".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::PersistenceFailure("sem id".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn api_error_is_localized() {
        let api = AppError::NotFound(Resource::MaterialRequest(9)).to_api_error(&Locale("ko".into()));
        assert_eq!(api.error, "자재요청을 찾을 수 없습니다.");
        assert!(api.details.is_none());

        let api = AppError::InvalidArgument(InvalidInput::PrepStatus("DONE".into()))
            .to_api_error(&Locale("pt".into()));
        assert_eq!(api.details, Some(json!({ "prepStatus": "DONE" })));
    }
}
