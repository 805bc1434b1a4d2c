use axum::extract::FromRequest;

use crate::errors::AppError;

pub mod authz;
pub mod health;

/// JSON body extractor whose rejections use the crate's error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);
