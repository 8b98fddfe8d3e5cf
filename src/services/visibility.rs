// src/services/visibility.rs

use rust_decimal::Decimal;

use crate::{
    models::{
        auth::User,
        material_request::{MaterialRequestItem, MaterialRequestItemView},
    },
    services::access::has_sensitive_capability,
};

/// Política de visibilidade aplicada nas leituras. Recalculada a cada chamada.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityPolicy {
    can_see_sensitive: bool,
}

impl VisibilityPolicy {
    pub fn for_user(user: &User) -> Self {
        Self {
            can_see_sensitive: has_sensitive_capability(user),
        }
    }

    pub fn can_see_sensitive(&self) -> bool {
        self.can_see_sensitive
    }

    /// Chave (depósito, produto) a consultar no estoque, se houver consulta.
    pub fn stock_lookup(&self, warehouse_id: Option<i64>, product_id: Option<i64>) -> Option<(i64, i64)> {
        if !self.can_see_sensitive {
            return None;
        }
        Some((warehouse_id?, product_id?))
    }

    pub fn item_view(&self, item: MaterialRequestItem, qty_on_hand: Option<Decimal>) -> MaterialRequestItemView {
        MaterialRequestItemView {
            id: item.id,
            material_request_id: item.material_request_id,
            product_id: item.product_id,
            estimate_item_id: item.estimate_item_id,
            item_name_snapshot: item.item_name_snapshot,
            spec_snapshot: item.spec_snapshot,
            unit_snapshot: item.unit_snapshot,
            qty_requested: item.qty_requested,
            qty_used: self.can_see_sensitive.then_some(item.qty_used),
            note: item.note,
            prep_status: item.prep_status,
            qty_on_hand: qty_on_hand.filter(|_| self.can_see_sensitive),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::material_request::PrepStatus;

    fn user(role_id: Option<&str>) -> User {
        User { id: 1, name: "x".into(), role_id: role_id.map(str::to_owned) }
    }

    fn item() -> MaterialRequestItem {
        MaterialRequestItem {
            id: 5,
            material_request_id: 2,
            product_id: Some(8),
            estimate_item_id: None,
            item_name_snapshot: "Tubo".into(),
            spec_snapshot: "PVC 50mm".into(),
            unit_snapshot: "un".into(),
            qty_requested: Decimal::from(10),
            qty_used: Decimal::from(3),
            note: String::new(),
            prep_status: PrepStatus::Preparing,
        }
    }

    #[test]
    fn stock_lookup_needs_capability_warehouse_and_product() {
        let operator = VisibilityPolicy::for_user(&user(Some("7")));
        let staff = VisibilityPolicy::for_user(&user(Some("2")));

        assert_eq!(operator.stock_lookup(Some(1), Some(8)), Some((1, 8)));
        assert_eq!(operator.stock_lookup(None, Some(8)), None);
        assert_eq!(operator.stock_lookup(Some(1), None), None);
        assert_eq!(staff.stock_lookup(Some(1), Some(8)), None);
    }

    #[test]
    fn regular_users_never_see_sensitive_fields() {
        let staff = VisibilityPolicy::for_user(&user(None));
        let view = staff.item_view(item(), Some(Decimal::from(40)));
        assert_eq!(view.qty_used, None);
        assert_eq!(view.qty_on_hand, None);
        assert_eq!(view.qty_requested, Decimal::from(10));
    }

    #[test]
    fn privileged_users_see_usage_and_stock() {
        let admin = VisibilityPolicy::for_user(&user(Some("6")));
        let view = admin.item_view(item(), Some(Decimal::ZERO));
        assert_eq!(view.qty_used, Some(Decimal::from(3)));
        assert_eq!(view.qty_on_hand, Some(Decimal::ZERO));

        let serialized = serde_json::to_value(admin.item_view(item(), None)).unwrap();
        assert!(serialized.get("qtyOnHand").unwrap().is_null());
    }
}
