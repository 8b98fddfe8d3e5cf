// src/middleware/auth.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
};

// Extrator com o ID do usuário autenticado (claim `sub` do JWT).
// Se o usuário ainda está ativo é decidido depois, no serviço de acesso.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub i64);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let locale = Locale::from_headers(&parts.headers);
        let app_state = AppState::from_ref(state);

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::Unauthenticated.to_api_error(&locale))?;

        let user_id = app_state
            .auth_service
            .validate_token(bearer.token())
            .map_err(|e| e.to_api_error(&locale))?;

        Ok(CurrentUser(user_id))
    }
}
