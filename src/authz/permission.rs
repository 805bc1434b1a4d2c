use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Error returned when a token is not shaped like `resource.action`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid permission token '{token}': {problem}")]
pub struct PermissionParseError {
    pub token: String,
    pub problem: &'static str,
}

/// Opaque `resource.action` token.
///
/// Only the shape is validated. The engine never derives meaning from the
/// resource or action half; implications such as "view_department implies
/// view_own" must be written out as separate registry entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = String, example = "tasks.create")]
pub struct Permission(String);

impl Permission {
    /// Runtime path for tokens loaded from configuration or request bodies.
    pub fn parse(token: &str) -> Result<Self, PermissionParseError> {
        let problem = |problem| PermissionParseError {
            token: token.to_string(),
            problem,
        };

        let (resource, action) = token.split_once('.').ok_or_else(|| problem("missing '.' separator"))?;

        if resource.is_empty() || action.is_empty() {
            return Err(problem("resource and action must be non-empty"));
        }
        if action.contains('.') {
            return Err(problem("more than one '.' separator"));
        }

        let valid_char = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_';
        if !resource.chars().all(valid_char) || !action.chars().all(valid_char) {
            return Err(problem("only lowercase ascii, digits and '_' are allowed"));
        }

        Ok(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Permission {
    type Err = PermissionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Borrow<str> for Permission {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Permission {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Permission::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// A permission token known at compile time.
///
/// Kept separate from [`Permission`] so the constants in [`crate::authz::permissions`]
/// can live in `const` position without allocating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StaticPermission(&'static str);

impl StaticPermission {
    pub const fn new(token: &'static str) -> Self {
        Self(token)
    }

    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for StaticPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl From<StaticPermission> for Permission {
    fn from(value: StaticPermission) -> Self {
        Permission(value.0.to_string())
    }
}

/// Anything that can be looked up as a permission token.
///
/// Lets call sites pass either a well-known constant or a parsed [`Permission`]
/// without converting first.
pub trait PermissionToken {
    fn token(&self) -> &str;
}

impl PermissionToken for Permission {
    fn token(&self) -> &str {
        self.as_str()
    }
}

impl PermissionToken for StaticPermission {
    fn token(&self) -> &str {
        self.0
    }
}

/// Unvalidated tokens, e.g. read from configuration at runtime. A malformed
/// string simply matches nothing.
impl PermissionToken for str {
    fn token(&self) -> &str {
        self
    }
}

impl<T: PermissionToken + ?Sized> PermissionToken for &T {
    fn token(&self) -> &str {
        (**self).token()
    }
}

/// How a route combines its guarding permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    /// At least one permission must be held. An empty list places no requirement.
    AnyOf(Vec<Permission>),
    /// Every listed permission must be held.
    AllOf(Vec<Permission>),
}

impl Requirement {
    pub fn none() -> Self {
        Requirement::AnyOf(Vec::new())
    }

    pub fn permissions(&self) -> &[Permission] {
        match self {
            Requirement::AnyOf(perms) | Requirement::AllOf(perms) => perms,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.permissions().is_empty()
    }
}

impl Default for Requirement {
    fn default() -> Self {
        Self::none()
    }
}
