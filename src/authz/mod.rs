//! Authorization module - Permission Engine
//!
//! This module implements the staff authorization engine with support for:
//! - Role-based permissions from a read-only registry
//! - Additive per-user permission grants
//! - Page guards with explicit any-of / all-of requirements
//! - Per data type visibility levels (none/own/department/all)
//! - Record filtering and modification guards built on those levels
//! - Position-based elevated access checks
//!
//! Every query takes the identity as `Option<&Identity>`; `None` means "not
//! logged in" and always gets the most restrictive answer.

mod authorizer;
mod data_access;
mod elevated;
mod evaluator;
mod identity;
mod pages;
mod permission;
mod registry;

pub use authorizer::Authorizer;
pub use data_access::{
    can_modify, classify, filter_by_level, filter_records, scope_admits, AssignedTo, Assignees, DataAccessLevel,
    GenericRecord, ItemFacts, Record,
};
pub use elevated::{has_elevated_access, has_elevated_permission, ElevatedLevel, ElevatedPositions};
pub use evaluator::{
    effective_permissions, evaluate, has_all_permissions, has_any_permission, has_permission, satisfies,
    EffectivePermission, EffectivePermissions, EvaluationResult, GrantReason, GrantSource,
};
pub use identity::{Identity, Position, Role};
pub use pages::{guard_requirement, normalize_route, resolve_route, route_requirement};
pub use permission::{Permission, PermissionParseError, PermissionToken, Requirement, StaticPermission};
pub use registry::{Registry, RegistryBuilder, RegistryError, RegistryWarning, RouteGuard, RouteMatch};

/// Well-known data type keys shared with the registry
pub mod data_types {
    pub const MEMBERS: &str = "members";
    pub const SCHEDULES: &str = "schedules";
    pub const TASKS: &str = "tasks";
    pub const OT: &str = "ot";
    pub const SUGGESTIONS: &str = "suggestions";
    pub const MANUALS: &str = "manuals";
}

/// Well-known permission names
pub mod permissions {
    use super::StaticPermission;

    // Schedules
    pub const SCHEDULES_VIEW_OWN: StaticPermission = StaticPermission::new("schedules.view_own");
    pub const SCHEDULES_VIEW_DEPARTMENT: StaticPermission = StaticPermission::new("schedules.view_department");
    pub const SCHEDULES_VIEW_ALL: StaticPermission = StaticPermission::new("schedules.view_all");
    pub const SCHEDULES_CREATE: StaticPermission = StaticPermission::new("schedules.create");
    pub const SCHEDULES_UPDATE: StaticPermission = StaticPermission::new("schedules.update");
    pub const SCHEDULES_DELETE: StaticPermission = StaticPermission::new("schedules.delete");

    // Members
    pub const MEMBERS_VIEW: StaticPermission = StaticPermission::new("members.view");
    pub const MEMBERS_CREATE: StaticPermission = StaticPermission::new("members.create");
    pub const MEMBERS_UPDATE: StaticPermission = StaticPermission::new("members.update");
    pub const MEMBERS_DELETE: StaticPermission = StaticPermission::new("members.delete");

    // Tasks
    pub const TASKS_VIEW: StaticPermission = StaticPermission::new("tasks.view");
    pub const TASKS_CREATE: StaticPermission = StaticPermission::new("tasks.create");
    pub const TASKS_UPDATE: StaticPermission = StaticPermission::new("tasks.update");
    pub const TASKS_DELETE: StaticPermission = StaticPermission::new("tasks.delete");

    // OT
    pub const OT_VIEW: StaticPermission = StaticPermission::new("ot.view");
    pub const OT_ASSIGN: StaticPermission = StaticPermission::new("ot.assign");

    // Suggestions
    pub const SUGGESTIONS_VIEW: StaticPermission = StaticPermission::new("suggestions.view");
    pub const SUGGESTIONS_CREATE: StaticPermission = StaticPermission::new("suggestions.create");
    pub const SUGGESTIONS_RESPOND: StaticPermission = StaticPermission::new("suggestions.respond");

    // Manuals
    pub const MANUALS_VIEW: StaticPermission = StaticPermission::new("manuals.view");
    pub const MANUALS_EDIT: StaticPermission = StaticPermission::new("manuals.edit");

    // User
    pub const USERS_VIEW: StaticPermission = StaticPermission::new("users.view");
    pub const USERS_CREATE: StaticPermission = StaticPermission::new("users.create");
    pub const USERS_UPDATE: StaticPermission = StaticPermission::new("users.update");
    pub const USERS_DELETE: StaticPermission = StaticPermission::new("users.delete");
    pub const PERMISSIONS_MANAGE: StaticPermission = StaticPermission::new("permissions.manage");
}
