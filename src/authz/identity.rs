use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::permission::{Permission, PermissionToken};

/// Department/function an actor belongs to. Source of the default grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Reception,
    Fitness,
    Tennis,
    Golf,
}

impl Role {
    pub const ALL: [Role; 5] = [Role::Admin, Role::Reception, Role::Fitness, Role::Tennis, Role::Golf];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Reception => "reception",
            Role::Fitness => "fitness",
            Role::Tennis => "tennis",
            Role::Golf => "golf",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Seniority label. Orthogonal to [`Role`]; only consulted by elevated-access checks.
///
/// Accepts either the snake_case name or the label used on staff records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    #[serde(alias = "사원")]
    Staff,
    #[serde(alias = "부팀장")]
    DeputyTeamLead,
    #[serde(alias = "팀장")]
    TeamLead,
    #[serde(alias = "매니저")]
    Manager,
    #[serde(alias = "리셉션매니저", alias = "리셉션 매니저")]
    ReceptionManager,
}

impl Position {
    /// Label as shown on staff records.
    pub fn label(&self) -> &'static str {
        match self {
            Position::Staff => "사원",
            Position::DeputyTeamLead => "부팀장",
            Position::TeamLead => "팀장",
            Position::Manager => "매니저",
            Position::ReceptionManager => "리셉션매니저",
        }
    }
}

/// The authenticated actor.
///
/// Built once at login by the session layer and never mutated afterwards;
/// a change of role, position or grants means a new `Identity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Identity {
    #[schema(example = "u1")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "A")]
    pub department: Option<String>,
    /// Unrecognised labels read as no position.
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_position")]
    pub position: Option<Position>,
    /// Individually granted permissions. Additive only.
    #[serde(default)]
    #[schema(value_type = Vec<String>)]
    pub granted_permissions: BTreeSet<Permission>,
}

fn lenient_position<'de, D>(deserializer: D) -> Result<Option<Position>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| {
        let position = serde_json::from_value::<Position>(value.clone()).ok();
        if position.is_none() {
            tracing::debug!("ignoring unrecognised position {}", value);
        }
        position
    }))
}

impl Identity {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: None,
            role,
            department: None,
            position: None,
            granted_permissions: BTreeSet::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_granted<P>(mut self, perms: impl IntoIterator<Item = P>) -> Self
    where
        P: Into<Permission>,
    {
        self.granted_permissions = perms.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_granted(&self, permission: impl PermissionToken) -> bool {
        self.granted_permissions.contains(permission.token())
    }

    /// Name used in decision logs; falls back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}
