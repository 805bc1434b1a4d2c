//! Authorization RPC Routes
//!
//! One endpoint per engine query, same inputs and outputs as the library
//! calls. A request without an identity is answered as "not logged in".

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use crate::app::AppState;
use crate::authz::{classify, EffectivePermissions};
use crate::errors::AppResult;
use crate::models::authz::*;
use crate::routes::ApiJson;

// =============================================================================
// ROUTER
// =============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/has-permission", post(has_permission))
        .route("/has-any-permission", post(has_any_permission))
        .route("/check-permission", post(check_permission))
        .route("/page-access", post(page_access))
        .route("/data-access-level", post(data_access_level))
        .route("/can-modify", post(can_modify))
        .route("/filter", post(filter))
        .route("/elevated-access", post(elevated_access))
        .route("/effective-permissions", post(effective_permissions))
}

// =============================================================================
// PERMISSION CHECKS
// =============================================================================

/// Whether the identity holds a permission
#[utoipa::path(
    post,
    path = "/authz/has-permission",
    tag = "Authorization",
    request_body = PermissionQuery,
    responses(
        (status = 200, description = "Decision", body = AllowedResponse),
        (status = 400, description = "Malformed body or permission token"),
    )
)]
pub async fn has_permission(
    State(state): State<AppState>,
    ApiJson(query): ApiJson<PermissionQuery>,
) -> AppResult<Json<AllowedResponse>> {
    let allowed = state.authorizer.has_permission(query.identity.as_ref(), &query.permission);
    Ok(Json(AllowedResponse { allowed }))
}

/// Whether the identity holds at least one of the permissions
#[utoipa::path(
    post,
    path = "/authz/has-any-permission",
    tag = "Authorization",
    request_body = AnyPermissionQuery,
    responses(
        (status = 200, description = "Decision", body = AllowedResponse),
        (status = 400, description = "Malformed body or permission token"),
    )
)]
pub async fn has_any_permission(
    State(state): State<AppState>,
    ApiJson(query): ApiJson<AnyPermissionQuery>,
) -> AppResult<Json<AllowedResponse>> {
    let allowed = state
        .authorizer
        .has_any_permission(query.identity.as_ref(), &query.permissions);
    Ok(Json(AllowedResponse { allowed }))
}

/// Permission check with a human-readable reason
#[utoipa::path(
    post,
    path = "/authz/check-permission",
    tag = "Authorization",
    request_body = PermissionQuery,
    responses(
        (status = 200, description = "Decision and reason", body = ReasonedResponse),
        (status = 400, description = "Malformed body or permission token"),
    )
)]
pub async fn check_permission(
    State(state): State<AppState>,
    ApiJson(query): ApiJson<PermissionQuery>,
) -> AppResult<Json<ReasonedResponse>> {
    let result = state
        .authorizer
        .check_permission_with_reason(query.identity.as_ref(), &query.permission);
    Ok(Json(result.into()))
}

/// Whether the identity may open a page
#[utoipa::path(
    post,
    path = "/authz/page-access",
    tag = "Authorization",
    request_body = PageAccessQuery,
    responses((status = 200, description = "Decision", body = AllowedResponse))
)]
pub async fn page_access(
    State(state): State<AppState>,
    ApiJson(query): ApiJson<PageAccessQuery>,
) -> AppResult<Json<AllowedResponse>> {
    let allowed = state.authorizer.has_page_access(query.identity.as_ref(), &query.route);
    Ok(Json(AllowedResponse { allowed }))
}

/// Elevated (position or admin) access check
#[utoipa::path(
    post,
    path = "/authz/elevated-access",
    tag = "Authorization",
    request_body = ElevatedQuery,
    responses((status = 200, description = "Decision", body = AllowedResponse))
)]
pub async fn elevated_access(
    State(state): State<AppState>,
    ApiJson(query): ApiJson<ElevatedQuery>,
) -> AppResult<Json<AllowedResponse>> {
    let allowed = state
        .authorizer
        .has_elevated_access(query.identity.as_ref(), query.level);
    Ok(Json(AllowedResponse { allowed }))
}

/// Effective permissions with their sources; `null` when unauthenticated
#[utoipa::path(
    post,
    path = "/authz/effective-permissions",
    tag = "Authorization",
    request_body = IdentityQuery,
    responses((status = 200, description = "Effective permissions, or null without an identity", body = EffectivePermissions))
)]
pub async fn effective_permissions(
    State(state): State<AppState>,
    ApiJson(query): ApiJson<IdentityQuery>,
) -> AppResult<Json<Option<EffectivePermissions>>> {
    Ok(Json(state.authorizer.effective_permissions(query.identity.as_ref())))
}

// =============================================================================
// DATA ACCESS
// =============================================================================

/// Visibility level for a data type
#[utoipa::path(
    post,
    path = "/authz/data-access-level",
    tag = "Data Access",
    request_body = DataAccessQuery,
    responses((status = 200, description = "Resolved level", body = LevelResponse))
)]
pub async fn data_access_level(
    State(state): State<AppState>,
    ApiJson(query): ApiJson<DataAccessQuery>,
) -> AppResult<Json<LevelResponse>> {
    let level = state
        .authorizer
        .get_data_access_level(query.identity.as_ref(), &query.data_type);
    Ok(Json(LevelResponse { level }))
}

/// Whether the identity may change a specific item
#[utoipa::path(
    post,
    path = "/authz/can-modify",
    tag = "Data Access",
    request_body = CanModifyQuery,
    responses((status = 200, description = "Decision", body = AllowedResponse))
)]
pub async fn can_modify(
    State(state): State<AppState>,
    ApiJson(query): ApiJson<CanModifyQuery>,
) -> AppResult<Json<AllowedResponse>> {
    let allowed = state.authorizer.can_modify_data(
        query.identity.as_ref(),
        &query.data_type,
        query.owner_id.as_deref(),
        query.item_department.as_deref(),
        query.assigned_users.as_ref(),
    );
    Ok(Json(AllowedResponse { allowed }))
}

/// Subset of records the identity may see, in input order
#[utoipa::path(
    post,
    path = "/authz/filter",
    tag = "Data Access",
    request_body = FilterQuery,
    responses((status = 200, description = "Visible records", body = FilterResponse))
)]
pub async fn filter(
    State(state): State<AppState>,
    ApiJson(query): ApiJson<FilterQuery>,
) -> AppResult<Json<FilterResponse>> {
    let identity = query.identity.as_ref();
    let level = classify(state.authorizer.registry(), identity, &query.data_type);
    let records = state
        .authorizer
        .filter_owned(identity, &query.records, &query.data_type);
    Ok(Json(FilterResponse { level, records }))
}
