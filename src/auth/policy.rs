//! Authorization decisions as pure functions of the caller's role and
//! warehouse assignment.

use uuid::Uuid;

use crate::entities::UserRole;

/// The set of warehouses a caller may read and mutate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarehouseScope {
    /// Super admins span every warehouse.
    All,
    /// Warehouse users are confined to their assignment.
    Single(Uuid),
    /// Warehouse users without an assignment see nothing.
    Nothing,
}

impl WarehouseScope {
    pub fn for_user(role: UserRole, warehouse_id: Option<Uuid>) -> Self {
        match (role, warehouse_id) {
            (UserRole::SuperAdmin, _) => WarehouseScope::All,
            (UserRole::Warehouse, Some(id)) => WarehouseScope::Single(id),
            (UserRole::Warehouse, None) => WarehouseScope::Nothing,
        }
    }

    pub fn allows(&self, target: Uuid) -> bool {
        match self {
            WarehouseScope::All => true,
            WarehouseScope::Single(id) => *id == target,
            WarehouseScope::Nothing => false,
        }
    }

    /// Narrows an optional caller-supplied warehouse filter to this scope.
    pub fn narrow(&self, requested: Option<Uuid>) -> Result<Option<Uuid>, OutOfScope> {
        match (self, requested) {
            (WarehouseScope::All, requested) => Ok(requested),
            (WarehouseScope::Single(own), None) => Ok(Some(*own)),
            (WarehouseScope::Single(own), Some(req)) if *own == req => Ok(Some(req)),
            _ => Err(OutOfScope),
        }
    }
}

/// A requested warehouse lies outside the caller's scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfScope;

/// Whether `actor` may read or edit the account `target`.
pub fn can_access_user(actor_role: UserRole, actor_id: Uuid, target: Uuid) -> bool {
    actor_role == UserRole::SuperAdmin || actor_id == target
}

/// Role, warehouse assignment and activation are administrative fields.
pub fn can_change_privileged_user_fields(actor_role: UserRole) -> bool {
    actor_role == UserRole::SuperAdmin
}
