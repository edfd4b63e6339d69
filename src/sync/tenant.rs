use uuid::Uuid;

/// Whose data a sync call acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantScope {
    /// Unbound caller: sees every ledger entry and may write any entity.
    System,
    Tenant(Uuid),
}

impl TenantScope {
    /// Tenant to stamp on newly created entities and to filter pulls by.
    pub fn tenant_id(&self) -> Option<Uuid> {
        match self {
            TenantScope::System => None,
            TenantScope::Tenant(id) => Some(*id),
        }
    }

    /// Whether an entity owned by `owner` is visible to this scope. Global
    /// (null-tenant) entities are visible to everyone.
    pub fn can_read(&self, owner: Option<Uuid>) -> bool {
        match self {
            TenantScope::System => true,
            TenantScope::Tenant(id) => owner.is_none() || owner == Some(*id),
        }
    }

    /// Whether this scope may modify an entity owned by `owner`. Global
    /// entities are read-only to tenant callers.
    pub fn can_write(&self, owner: Option<Uuid>) -> bool {
        match self {
            TenantScope::System => true,
            TenantScope::Tenant(id) => owner == Some(*id),
        }
    }
}

/// Supplies the tenant of the current caller.
pub trait TenantProvider: Send + Sync {
    fn tenant_scope(&self) -> TenantScope;
}

impl TenantProvider for TenantScope {
    fn tenant_scope(&self) -> TenantScope {
        *self
    }
}
