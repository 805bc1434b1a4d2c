//! Request and response bodies for the authorization RPC endpoints.
//!
//! Each request carries the caller's identity as `identity`; a missing or
//! `null` identity is treated as "not logged in".

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::authz::{Assignees, DataAccessLevel, ElevatedLevel, EvaluationResult, GenericRecord, Identity, Permission};

#[derive(Debug, Deserialize, ToSchema)]
pub struct PermissionQuery {
    #[serde(default)]
    pub identity: Option<Identity>,
    #[schema(value_type = String, example = "tasks.create")]
    pub permission: Permission,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AnyPermissionQuery {
    #[serde(default)]
    pub identity: Option<Identity>,
    #[schema(value_type = Vec<String>, example = json!(["schedules.view_own", "schedules.view_department"]))]
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PageAccessQuery {
    #[serde(default)]
    pub identity: Option<Identity>,
    #[schema(example = "/admin/staff")]
    pub route: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DataAccessQuery {
    #[serde(default)]
    pub identity: Option<Identity>,
    #[schema(example = "members")]
    pub data_type: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CanModifyQuery {
    #[serde(default)]
    pub identity: Option<Identity>,
    #[schema(example = "tasks")]
    pub data_type: String,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub item_department: Option<String>,
    /// A single user id or a list of user ids
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub assigned_users: Option<Assignees>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FilterQuery {
    #[serde(default)]
    pub identity: Option<Identity>,
    #[schema(example = "members")]
    pub data_type: String,
    /// Records of any shape; only `created_by`, `assigned_to` and `department` are read
    #[schema(value_type = Vec<Object>)]
    pub records: Vec<GenericRecord>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ElevatedQuery {
    #[serde(default)]
    pub identity: Option<Identity>,
    pub level: ElevatedLevel,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct IdentityQuery {
    #[serde(default)]
    pub identity: Option<Identity>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AllowedResponse {
    pub allowed: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReasonedResponse {
    pub allowed: bool,
    #[schema(example = "granted by role 'reception'")]
    pub reason: String,
}

impl From<EvaluationResult> for ReasonedResponse {
    fn from(result: EvaluationResult) -> Self {
        Self {
            allowed: result.allowed,
            reason: result.reason.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LevelResponse {
    pub level: DataAccessLevel,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FilterResponse {
    pub level: DataAccessLevel,
    #[schema(value_type = Vec<Object>)]
    pub records: Vec<GenericRecord>,
}
