// src/common/i18n.rs

// Catálogo de mensagens de erro. O idioma vem do extrator `Locale`;
// idiomas desconhecidos caem para inglês.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKey {
    Unauthenticated,
    PrivilegedRoleRequired,
    QtyUsedRestricted,
    MaterialRequestNotFound,
    MaterialRequestItemNotFound,
    InvalidPrepStatus,
    InvalidFields,
    CreateFailed,
    Unexpected,
}

pub fn translate(key: MessageKey, lang: &str) -> &'static str {
    match lang {
        "pt" => pt(key),
        "ko" => ko(key),
        _ => en(key),
    }
}

fn en(key: MessageKey) -> &'static str {
    match key {
        MessageKey::Unauthenticated => "Authentication is required.",
        MessageKey::PrivilegedRoleRequired => "Only administrators or operators can perform this action.",
        MessageKey::QtyUsedRestricted => "Only administrators or operators can change the used quantity.",
        MessageKey::MaterialRequestNotFound => "Material request not found.",
        MessageKey::MaterialRequestItemNotFound => "Material request item not found.",
        MessageKey::InvalidPrepStatus => "prepStatus must be PREPARING or READY.",
        MessageKey::InvalidFields => "One or more fields are invalid.",
        MessageKey::CreateFailed => "Failed to create the material request.",
        MessageKey::Unexpected => "An unexpected error occurred.",
    }
}

fn pt(key: MessageKey) -> &'static str {
    match key {
        MessageKey::Unauthenticated => "Autenticação necessária.",
        MessageKey::PrivilegedRoleRequired => "Apenas administradores ou operadores podem realizar esta ação.",
        MessageKey::QtyUsedRestricted => "Apenas administradores ou operadores podem alterar a quantidade utilizada.",
        MessageKey::MaterialRequestNotFound => "Requisição de materiais não encontrada.",
        MessageKey::MaterialRequestItemNotFound => "Item da requisição não encontrado.",
        MessageKey::InvalidPrepStatus => "prepStatus deve ser PREPARING ou READY.",
        MessageKey::InvalidFields => "Um ou mais campos são inválidos.",
        MessageKey::CreateFailed => "Falha ao criar a requisição de materiais.",
        MessageKey::Unexpected => "Ocorreu um erro inesperado.",
    }
}

fn ko(key: MessageKey) -> &'static str {
    match key {
        MessageKey::Unauthenticated => "인증이 필요합니다.",
        MessageKey::PrivilegedRoleRequired => "관리자/운영자만 가능합니다.",
        MessageKey::QtyUsedRestricted => "사용량은 관리자/운영자만 수정할 수 있습니다.",
        MessageKey::MaterialRequestNotFound => "자재요청을 찾을 수 없습니다.",
        MessageKey::MaterialRequestItemNotFound => "자재요청 품목을 찾을 수 없습니다.",
        MessageKey::InvalidPrepStatus => "prepStatus는 PREPARING 또는 READY 입니다.",
        MessageKey::InvalidFields => "하나 이상의 항목이 올바르지 않습니다.",
        MessageKey::CreateFailed => "자재요청 생성에 실패했습니다.",
        MessageKey::Unexpected => "예기치 않은 오류가 발생했습니다.",
    }
}
