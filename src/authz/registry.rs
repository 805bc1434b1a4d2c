//! Permission registry
//!
//! Read-only configuration the engine evaluates against:
//! - role -> granted permissions
//! - role -> data type -> [`DataAccessLevel`]
//! - route table with explicit `any_of` / `all_of` guards
//! - position sets satisfying each elevated level
//!
//! Loaded once at startup; nothing in the engine writes to it afterwards.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_access::DataAccessLevel;
use super::elevated::ElevatedPositions;
use super::identity::Role;
use super::permission::{Permission, PermissionToken, Requirement};

#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error("failed to read registry file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid registry at '{path}': {message}")]
    Parse { path: String, message: String },
    #[error("route '{0}' must start with '/'")]
    InvalidRoutePath(String),
    #[error("route '{0}' is declared more than once with the same match mode")]
    DuplicateRoute(String),
    #[error("route '{0}' declares both any_of and all_of")]
    ConflictingRequirement(String),
}

/// How a route entry is compared against a requested path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteMatch {
    #[default]
    Exact,
    /// Matches the path itself and anything below it on a `/` boundary.
    Prefix,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteGuard {
    pub path: String,
    pub matching: RouteMatch,
    pub requirement: Requirement,
}

impl RouteGuard {
    pub fn exact(path: impl Into<String>, requirement: Requirement) -> Self {
        Self {
            path: path.into(),
            matching: RouteMatch::Exact,
            requirement,
        }
    }

    pub fn prefix(path: impl Into<String>, requirement: Requirement) -> Self {
        Self {
            path: path.into(),
            matching: RouteMatch::Prefix,
            requirement,
        }
    }
}

/// Non-fatal findings reported by [`Registry::lint`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryWarning {
    RoleWithoutPermissions(Role),
    /// No role grants the permission; only individual grants can satisfy it.
    RoutePermissionNotGranted { path: String, permission: Permission },
    /// The route is open to every authenticated identity.
    OpenRoute(String),
}

impl fmt::Display for RegistryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryWarning::RoleWithoutPermissions(role) => {
                write!(f, "role '{}' has no permissions", role)
            }
            RegistryWarning::RoutePermissionNotGranted { path, permission } => write!(
                f,
                "route '{}' requires '{}' which no role grants",
                path, permission
            ),
            RegistryWarning::OpenRoute(path) => {
                write!(f, "route '{}' has no guard and is open to any authenticated user", path)
            }
        }
    }
}

// =============================================================================
// FILE FORMAT
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryFile {
    #[serde(default)]
    roles: BTreeMap<Role, Vec<Permission>>,
    #[serde(default)]
    data_access: BTreeMap<Role, BTreeMap<String, DataAccessLevel>>,
    #[serde(default)]
    routes: Vec<RouteGuardFile>,
    #[serde(default)]
    elevated_positions: Option<ElevatedPositions>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RouteGuardFile {
    path: String,
    #[serde(default, rename = "match")]
    matching: RouteMatch,
    any_of: Option<Vec<Permission>>,
    all_of: Option<Vec<Permission>>,
}

impl TryFrom<RouteGuardFile> for RouteGuard {
    type Error = RegistryError;

    fn try_from(file: RouteGuardFile) -> Result<Self, Self::Error> {
        let requirement = match (file.any_of, file.all_of) {
            (Some(_), Some(_)) => return Err(RegistryError::ConflictingRequirement(file.path)),
            (Some(perms), None) => Requirement::AnyOf(perms),
            (None, Some(perms)) => Requirement::AllOf(perms),
            (None, None) => Requirement::none(),
        };

        Ok(RouteGuard {
            path: file.path,
            matching: file.matching,
            requirement,
        })
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct Registry {
    role_permissions: BTreeMap<Role, BTreeSet<Permission>>,
    data_access: BTreeMap<Role, BTreeMap<String, DataAccessLevel>>,
    routes: Vec<RouteGuard>,
    elevated_positions: ElevatedPositions,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, RegistryError> {
        let deserializer = &mut serde_json::Deserializer::from_str(raw);
        let file: RegistryFile = serde_path_to_error::deserialize(deserializer).map_err(|err| {
            RegistryError::Parse {
                path: err.path().to_string(),
                message: err.inner().to_string(),
            }
        })?;

        let routes = file
            .routes
            .into_iter()
            .map(RouteGuard::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let mut builder = RegistryBuilder::default();
        for (role, perms) in file.roles {
            builder = builder.grant(role, perms);
        }
        for (role, levels) in file.data_access {
            for (data_type, level) in levels {
                builder = builder.data_access(role, data_type, level);
            }
        }
        for route in routes {
            builder = builder.route(route);
        }
        if let Some(positions) = file.elevated_positions {
            builder = builder.elevated_positions(positions);
        }

        builder.build()
    }

    /// Permissions granted to every holder of `role`. Empty when the role is unlisted.
    pub fn role_permissions(&self, role: Role) -> Option<&BTreeSet<Permission>> {
        self.role_permissions.get(&role)
    }

    pub fn role_grants(&self, role: Role, permission: impl PermissionToken) -> bool {
        self.role_permissions
            .get(&role)
            .map(|perms| perms.contains(permission.token()))
            .unwrap_or(false)
    }

    /// Configured level for `(role, data_type)`; [`DataAccessLevel::None`] when absent.
    pub fn data_access_level(&self, role: Role, data_type: &str) -> DataAccessLevel {
        self.data_access
            .get(&role)
            .and_then(|levels| levels.get(data_type))
            .copied()
            .unwrap_or_default()
    }

    pub fn routes(&self) -> &[RouteGuard] {
        &self.routes
    }

    pub fn elevated_positions(&self) -> &ElevatedPositions {
        &self.elevated_positions
    }

    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.role_permissions.keys().copied()
    }

    pub fn data_types(&self) -> BTreeSet<&str> {
        self.data_access
            .values()
            .flat_map(|levels| levels.keys().map(String::as_str))
            .collect()
    }

    /// Findings that do not prevent loading but usually indicate a configuration slip.
    pub fn lint(&self) -> Vec<RegistryWarning> {
        let mut warnings = Vec::new();

        for role in Role::ALL {
            if self.role_permissions.get(&role).map_or(true, BTreeSet::is_empty) {
                warnings.push(RegistryWarning::RoleWithoutPermissions(role));
            }
        }

        let granted: HashSet<&str> = self
            .role_permissions
            .values()
            .flat_map(|perms| perms.iter().map(Permission::as_str))
            .collect();

        for route in &self.routes {
            if route.requirement.is_empty() {
                warnings.push(RegistryWarning::OpenRoute(route.path.clone()));
                continue;
            }
            for permission in route.requirement.permissions() {
                if !granted.contains(permission.as_str()) {
                    warnings.push(RegistryWarning::RoutePermissionNotGranted {
                        path: route.path.clone(),
                        permission: permission.clone(),
                    });
                }
            }
        }

        warnings
    }
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    inner: Registry,
}

impl RegistryBuilder {
    pub fn grant<P>(mut self, role: Role, perms: impl IntoIterator<Item = P>) -> Self
    where
        P: Into<Permission>,
    {
        self.inner
            .role_permissions
            .entry(role)
            .or_default()
            .extend(perms.into_iter().map(Into::into));
        self
    }

    pub fn data_access(mut self, role: Role, data_type: impl Into<String>, level: DataAccessLevel) -> Self {
        self.inner
            .data_access
            .entry(role)
            .or_default()
            .insert(data_type.into(), level);
        self
    }

    pub fn route(mut self, route: RouteGuard) -> Self {
        self.inner.routes.push(route);
        self
    }

    pub fn elevated_positions(mut self, positions: ElevatedPositions) -> Self {
        self.inner.elevated_positions = positions;
        self
    }

    pub fn build(self) -> Result<Registry, RegistryError> {
        let mut seen = HashSet::new();
        for route in &self.inner.routes {
            if !route.path.starts_with('/') {
                return Err(RegistryError::InvalidRoutePath(route.path.clone()));
            }
            if !seen.insert((route.path.as_str(), route.matching)) {
                return Err(RegistryError::DuplicateRoute(route.path.clone()));
            }
        }
        Ok(self.inner)
    }
}
