use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{authz, models, routes};

#[derive(OpenApi)]
#[openapi(
	paths(
		routes::health::health,
		routes::authz::has_permission,
		routes::authz::has_any_permission,
		routes::authz::check_permission,
		routes::authz::page_access,
		routes::authz::elevated_access,
		routes::authz::effective_permissions,
		routes::authz::data_access_level,
		routes::authz::can_modify,
		routes::authz::filter
	),
	components(
		schemas(
			authz::Identity,
			authz::Role,
			authz::Position,
			authz::Permission,
			authz::DataAccessLevel,
			authz::ElevatedLevel,
			authz::EffectivePermissions,
			authz::EffectivePermission,
			authz::GrantSource,
			models::authz::PermissionQuery,
			models::authz::AnyPermissionQuery,
			models::authz::PageAccessQuery,
			models::authz::DataAccessQuery,
			models::authz::CanModifyQuery,
			models::authz::FilterQuery,
			models::authz::ElevatedQuery,
			models::authz::IdentityQuery,
			models::authz::AllowedResponse,
			models::authz::ReasonedResponse,
			models::authz::LevelResponse,
			models::authz::FilterResponse,
			routes::health::HealthResponse
		)
	),
	tags(
		(name = "Health", description = "Service health"),
		(name = "Authorization", description = "Permission, page and elevated access checks"),
		(name = "Data Access", description = "Record visibility and modification checks")
	)
)]
pub struct ApiDoc;

pub fn build_openapi(port: u16) -> anyhow::Result<utoipa::openapi::OpenApi> {
	let mut doc = serde_json::to_value(&ApiDoc::openapi())?;

	ensure_servers(&mut doc, port);

	Ok(serde_json::from_value(doc)?)
}

pub fn swagger_routes(doc: utoipa::openapi::OpenApi) -> anyhow::Result<Router> {
	let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"]).try_it_out_enabled(true);

	let doc_json = Arc::new(serde_json::to_value(&doc)?);

	let json_route = {
		let doc_json = Arc::clone(&doc_json);
		get(move || {
			let doc_json = Arc::clone(&doc_json);
			async move { Json((*doc_json).clone()) }
		})
	};

	Ok(Router::new()
		.route("/api-docs/openapi.json", json_route)
		.merge(SwaggerUi::new("/docs").config(swagger_config)))
}

fn ensure_servers(doc: &mut Value, port: u16) {
	if doc.get("servers").is_none() {
		doc["servers"] = json!([{ "url": format!("http://localhost:{}", port) }]);
	}
}
