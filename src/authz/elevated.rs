use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::identity::{Identity, Position, Role};

/// Seniority gate requested by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ElevatedLevel {
    TeamLead,
    Manager,
    Admin,
}

impl ElevatedLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElevatedLevel::TeamLead => "team_lead",
            ElevatedLevel::Manager => "manager",
            ElevatedLevel::Admin => "admin",
        }
    }
}

/// Positions that satisfy each position-based level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElevatedPositions {
    #[serde(default = "default_team_lead")]
    pub team_lead: BTreeSet<Position>,
    #[serde(default = "default_manager")]
    pub manager: BTreeSet<Position>,
}

fn default_team_lead() -> BTreeSet<Position> {
    BTreeSet::from([Position::TeamLead, Position::DeputyTeamLead])
}

fn default_manager() -> BTreeSet<Position> {
    BTreeSet::from([Position::Manager, Position::ReceptionManager])
}

impl Default for ElevatedPositions {
    fn default() -> Self {
        Self {
            team_lead: default_team_lead(),
            manager: default_manager(),
        }
    }
}

/// Position check, independent of role except for the `admin` level.
///
/// An admin role does not satisfy `team_lead` or `manager`; those look only at
/// the position.
pub fn has_elevated_permission(
    positions: &ElevatedPositions,
    role: Role,
    position: Option<Position>,
    required: ElevatedLevel,
) -> bool {
    let satisfying = match required {
        ElevatedLevel::Admin => return role == Role::Admin,
        ElevatedLevel::TeamLead => &positions.team_lead,
        ElevatedLevel::Manager => &positions.manager,
    };

    position.map_or(false, |position| satisfying.contains(&position))
}

pub fn has_elevated_access(positions: &ElevatedPositions, identity: Option<&Identity>, required: ElevatedLevel) -> bool {
    identity.map_or(false, |identity| {
        has_elevated_permission(positions, identity.role, identity.position, required)
    })
}
