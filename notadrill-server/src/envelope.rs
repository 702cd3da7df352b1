use actix_web::http::StatusCode;
use log::error;
use notadrill_openapi::{AssetResponse, ErrorResponse, ResponseEnvelope};
use std::collections::BTreeMap;

use crate::errors::SelectorError;

pub const ALLOW_ORIGIN: &str = "Access-Control-Allow-Origin";
pub const CONTENT_TYPE: &str = "Content-Type";

const FALLBACK_ERROR_BODY: &str = r#"{"error":"cannot serialize response"}"#;

pub fn ok(asset: &AssetResponse, cors_origin: &str) -> ResponseEnvelope {
    match serde_json::to_string(asset) {
        Ok(body) => build(StatusCode::OK, body, cors_origin),
        Err(e) => {
            error!("cannot serialize {:?}: {}", asset, e);
            build(
                StatusCode::INTERNAL_SERVER_ERROR,
                FALLBACK_ERROR_BODY.to_string(),
                cors_origin,
            )
        }
    }
}

pub fn error(err: &SelectorError, cors_origin: &str) -> ResponseEnvelope {
    build(err.status_code(), error_body(&err.to_string()), cors_origin)
}

/// `{"error": message}`
pub fn error_body(message: &str) -> String {
    serde_json::to_string(&ErrorResponse::new(message.to_string()))
        .unwrap_or_else(|_| FALLBACK_ERROR_BODY.to_string())
}

fn build(status: StatusCode, body: String, cors_origin: &str) -> ResponseEnvelope {
    let mut headers = BTreeMap::new();
    headers.insert(ALLOW_ORIGIN.to_string(), cors_origin.to_string());
    headers.insert(CONTENT_TYPE.to_string(), "application/json".to_string());

    ResponseEnvelope::new(status.as_u16(), headers, body)
}
