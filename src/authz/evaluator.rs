use std::fmt;

use serde::Serialize;
use utoipa::ToSchema;

use super::identity::{Identity, Role};
use super::permission::{Permission, PermissionToken, Requirement};
use super::registry::Registry;

/// Why a permission check came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantReason {
    Unauthenticated,
    Role(Role),
    Individual,
    Denied,
}

impl fmt::Display for GrantReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrantReason::Unauthenticated => f.write_str("unauthenticated"),
            GrantReason::Role(role) => write!(f, "granted by role '{}'", role),
            GrantReason::Individual => f.write_str("granted individually"),
            GrantReason::Denied => f.write_str("denied: not in role or individual grants"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationResult {
    pub allowed: bool,
    pub reason: GrantReason,
}

/// Decide whether `identity` holds `permission`.
///
/// Evaluation order:
/// 1. no identity -> deny
/// 2. role grants -> allow
/// 3. individual grants -> allow
/// 4. deny
///
/// Every boolean permission query goes through here so the plain and the
/// reasoned answers cannot disagree.
pub fn evaluate(registry: &Registry, identity: Option<&Identity>, permission: impl PermissionToken) -> EvaluationResult {
    let Some(identity) = identity else {
        return EvaluationResult {
            allowed: false,
            reason: GrantReason::Unauthenticated,
        };
    };

    let reason = if registry.role_grants(identity.role, &permission) {
        GrantReason::Role(identity.role)
    } else if identity.has_granted(&permission) {
        GrantReason::Individual
    } else {
        GrantReason::Denied
    };

    EvaluationResult {
        allowed: matches!(reason, GrantReason::Role(_) | GrantReason::Individual),
        reason,
    }
}

pub fn has_permission(registry: &Registry, identity: Option<&Identity>, permission: impl PermissionToken) -> bool {
    evaluate(registry, identity, permission).allowed
}

/// True if at least one permission is held. An empty list is never satisfied.
pub fn has_any_permission<P: PermissionToken>(registry: &Registry, identity: Option<&Identity>, permissions: &[P]) -> bool {
    permissions.iter().any(|p| has_permission(registry, identity, p))
}

/// True if every permission is held. An empty list is satisfied by any authenticated identity.
pub fn has_all_permissions<P: PermissionToken>(registry: &Registry, identity: Option<&Identity>, permissions: &[P]) -> bool {
    identity.is_some() && permissions.iter().all(|p| has_permission(registry, identity, p))
}

/// Check a route requirement. Empty requirements admit any authenticated identity.
pub fn satisfies(registry: &Registry, identity: Option<&Identity>, requirement: &Requirement) -> bool {
    satisfies_with(identity, requirement, |p| has_permission(registry, identity, p))
}

/// Combinator logic of [`satisfies`] with the per-permission check supplied by the caller.
pub fn satisfies_with(
    identity: Option<&Identity>,
    requirement: &Requirement,
    mut check: impl FnMut(&Permission) -> bool,
) -> bool {
    if identity.is_none() {
        return false;
    }
    match requirement {
        Requirement::AnyOf(perms) if perms.is_empty() => true,
        Requirement::AnyOf(perms) => perms.iter().any(&mut check),
        Requirement::AllOf(perms) => perms.iter().all(&mut check),
    }
}

// =============================================================================
// EFFECTIVE PERMISSIONS (computed)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GrantSource {
    Role,
    Direct,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct EffectivePermission {
    #[schema(value_type = String, example = "tasks.create")]
    pub name: Permission,
    /// Source of the permission: "role" or "direct"
    pub source: GrantSource,
    /// Name of the role if source is "role"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_name: Option<Role>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct EffectivePermissions {
    pub user_id: String,
    pub role: Role,
    pub permissions: Vec<EffectivePermission>,
}

/// Everything `identity` holds, with where each grant came from.
///
/// A token granted both by role and individually is listed once per source.
pub fn effective_permissions(registry: &Registry, identity: Option<&Identity>) -> Option<EffectivePermissions> {
    let identity = identity?;

    let from_role = registry
        .role_permissions(identity.role)
        .into_iter()
        .flatten()
        .map(|perm| EffectivePermission {
            name: perm.clone(),
            source: GrantSource::Role,
            role_name: Some(identity.role),
        });

    let direct = identity.granted_permissions.iter().map(|perm| EffectivePermission {
        name: perm.clone(),
        source: GrantSource::Direct,
        role_name: None,
    });

    let mut permissions: Vec<EffectivePermission> = from_role.chain(direct).collect();
    permissions.sort_by(|a, b| a.name.cmp(&b.name).then(a.source.cmp(&b.source)));

    Some(EffectivePermissions {
        user_id: identity.id.clone(),
        role: identity.role,
        permissions,
    })
}
