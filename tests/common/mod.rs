#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::util::ServiceExt; // for `oneshot`

use gatekeeper::authz::Authorizer;
use gatekeeper::{create_app, Registry};

pub fn shipped_registry() -> Result<Registry> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/registry.json");
    Ok(Registry::load(path)?)
}

pub fn app() -> Result<Router> {
    let authorizer = Authorizer::new(Arc::new(shipped_registry()?));
    Ok(create_app(authorizer))
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Result<(StatusCode, Value)> {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body)?))?;

    let resp = app.oneshot(req).await?;
    let status = resp.status();
    let body_bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    let v: Value = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes)?
    };
    Ok((status, v))
}

pub async fn get_json(app: Router, uri: &str) -> Result<(StatusCode, Value)> {
    let req = Request::builder().method("GET").uri(uri).body(Body::empty())?;

    let resp = app.oneshot(req).await?;
    let status = resp.status();
    let body_bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    Ok((status, serde_json::from_slice(&body_bytes)?))
}
