// src/services/auth.rs

use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::{common::error::AppError, models::auth::Claims};

// A emissão de tokens fica no módulo de autenticação; aqui só validamos.
#[derive(Clone)]
pub struct AuthService {
    jwt_secret: String,
}

impl AuthService {
    pub fn new(jwt_secret: String) -> Self {
        Self { jwt_secret }
    }

    /// Devolve o ID do usuário (claim `sub`) de um token válido e não expirado.
    pub fn validate_token(&self, token: &str) -> Result<i64, AppError> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|e| {
            tracing::debug!("Token rejeitado: {}", e);
            AppError::Unauthenticated
        })?;

        Ok(token_data.claims.sub)
    }
}

#[cfg(test)]
pub(crate) fn issue_test_token(secret: &str, user_id: i64) -> String {
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        exp: (now + chrono::Duration::hours(1)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref()))
        .expect("token de teste")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_token_signed_with_same_secret() {
        let service = AuthService::new("segredo".into());
        let token = issue_test_token("segredo", 42);
        assert_eq!(service.validate_token(&token).unwrap(), 42);
    }

    #[test]
    fn rejects_foreign_or_garbage_tokens() {
        let service = AuthService::new("segredo".into());
        let foreign = issue_test_token("outro", 42);
        assert!(matches!(service.validate_token(&foreign), Err(AppError::Unauthenticated)));
        assert!(matches!(service.validate_token("abc.def"), Err(AppError::Unauthenticated)));
    }
}
