// src/services/access.rs

use std::sync::Arc;

use crate::{
    common::error::{AppError, Denial},
    db::IdentityGateway,
    models::auth::{Capability, User},
};

/// Resolve o chamador e decide o que ele pode ver/editar.
#[derive(Clone)]
pub struct AccessService {
    identity: Arc<dyn IdentityGateway>,
}

impl AccessService {
    pub fn new(identity: Arc<dyn IdentityGateway>) -> Self {
        Self { identity }
    }

    /// Usuário ativo ou `Unauthenticated`.
    pub async fn resolve(&self, user_id: i64) -> Result<User, AppError> {
        self.identity
            .fetch_active_user(user_id)
            .await?
            .ok_or_else(|| {
                tracing::warn!(user_id, "usuário inexistente ou excluído");
                AppError::Unauthenticated
            })
    }
}

pub fn has_sensitive_capability(user: &User) -> bool {
    user.role().has(Capability::SensitiveInventory)
}

pub fn require_sensitive_capability(user: &User) -> Result<(), AppError> {
    if has_sensitive_capability(user) {
        return Ok(());
    }
    tracing::warn!(user_id = user.id, "ação restrita a administradores/operadores");
    Err(AppError::Forbidden(Denial::PrivilegedRoleRequired))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;

    #[tokio::test]
    async fn resolves_only_active_users() {
        let store = InMemoryStore::default();
        store.insert_user(10, "Ana", Some("6")).await;
        store.insert_user(11, "Bruno", Some("6")).await;
        store.soft_delete_user(11).await;
        let access = AccessService::new(Arc::new(store));

        assert_eq!(access.resolve(10).await.unwrap().name, "Ana");
        assert!(matches!(access.resolve(11).await, Err(AppError::Unauthenticated)));
        assert!(matches!(access.resolve(99).await, Err(AppError::Unauthenticated)));
    }

    #[test]
    fn capability_gate() {
        let admin = User { id: 1, name: "a".into(), role_id: Some("6".into()) };
        let broken = User { id: 2, name: "b".into(), role_id: Some("seis".into()) };

        assert!(require_sensitive_capability(&admin).is_ok());
        assert!(!has_sensitive_capability(&broken));
        assert!(matches!(
            require_sensitive_capability(&broken),
            Err(AppError::Forbidden(Denial::PrivilegedRoleRequired))
        ));
    }
}
