// src/models/auth.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

// Identificadores de cargo com acesso aos campos sensíveis de estoque.
pub const ROLE_ADMIN_ID: i64 = 6;
pub const ROLE_OPERATOR_ID: i64 = 7;

// Representa um usuário ativo vindo do banco de dados (somente leitura neste módulo)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[schema(example = 42)]
    pub id: i64,

    #[schema(example = "Maria Souza")]
    pub name: String,

    // Valor bruto da coluna; pode vir nulo ou malformado.
    #[serde(skip_serializing)]
    pub role_id: Option<String>,
}

impl User {
    pub fn role(&self) -> Role {
        Role::from_role_id(self.role_id.as_deref())
    }
}

/// O que um cargo pode fazer dentro do módulo de requisição de materiais.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Ver e editar saldo em estoque e quantidade utilizada.
    SensitiveInventory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Regular,
    Admin,
    Operator,
}

impl Role {
    /// Classifica o identificador bruto. Qualquer falha de leitura cai para `Regular`.
    pub fn from_role_id(raw: Option<&str>) -> Self {
        match raw.and_then(|value| value.trim().parse::<i64>().ok()) {
            Some(ROLE_ADMIN_ID) => Role::Admin,
            Some(ROLE_OPERATOR_ID) => Role::Operator,
            _ => Role::Regular,
        }
    }

    pub fn capabilities(self) -> &'static [Capability] {
        match self {
            Role::Admin | Role::Operator => &[Capability::SensitiveInventory],
            Role::Regular => &[],
        }
    }

    pub fn has(self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,   // Subject (ID do usuário)
    pub exp: usize, // Expiration time
    pub iat: usize, // Issued At
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_role(role_id: Option<&str>) -> User {
        User {
            id: 1,
            name: "teste".into(),
            role_id: role_id.map(str::to_owned),
        }
    }

    #[test]
    fn admin_and_operator_collapse_into_sensitive_capability() {
        assert_eq!(user_with_role(Some("6")).role(), Role::Admin);
        assert_eq!(user_with_role(Some("7")).role(), Role::Operator);
        assert!(Role::Admin.has(Capability::SensitiveInventory));
        assert!(Role::Operator.has(Capability::SensitiveInventory));
    }

    #[test]
    fn surrounding_whitespace_is_tolerated() {
        assert_eq!(Role::from_role_id(Some(" 6 ")), Role::Admin);
    }

    #[test]
    fn other_or_malformed_roles_degrade_to_regular() {
        for raw in [None, Some("1"), Some("8"), Some(""), Some("admin"), Some("6.0"), Some("-7")] {
            let role = Role::from_role_id(raw);
            assert_eq!(role, Role::Regular, "raw role {raw:?}");
            assert!(!role.has(Capability::SensitiveInventory));
        }
    }
}
