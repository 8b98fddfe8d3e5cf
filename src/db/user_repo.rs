// src/db/user_repo.rs

use async_trait::async_trait;
use sqlx::{Executor, PgPool, Postgres};

use crate::{common::error::AppError, db::IdentityGateway, models::auth::User};

// O repositório de usuários. A tabela 'users' pertence ao módulo de autenticação;
// aqui só lemos.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Busca um usuário ativo (não excluído) pelo seu ID.
    // `role_id` sai como texto para que um valor estranho vire "sem privilégio".
    pub async fn find_active_by_id<'e, E>(&self, executor: E, id: i64) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, COALESCE(name, '') AS name, role_id::text AS role_id
            FROM users
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(user)
    }
}

#[async_trait]
impl IdentityGateway for UserRepository {
    async fn fetch_active_user(&self, user_id: i64) -> Result<Option<User>, AppError> {
        self.find_active_by_id(&self.pool, user_id).await
    }
}
