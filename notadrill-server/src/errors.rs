use actix_http::ResponseBuilder;
use actix_web::{error, http::header, http::StatusCode, HttpResponse};
use rusoto_core::RusotoError;
use rusoto_s3::ListObjectsV2Error;
use thiserror::Error;

use crate::envelope::error_body;

#[derive(Error, Debug)]
pub enum SelectorError {
    #[error("cannot retrieve objects list")]
    StorageUnavailable(#[from] RusotoError<ListObjectsV2Error>),
    #[error("timed out while retrieving objects list")]
    StorageTimeout,
    #[error("bucket {bucket} contains no objects")]
    EmptyBucket { bucket: String },
}

impl SelectorError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SelectorError::StorageUnavailable(_) | SelectorError::StorageTimeout => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            SelectorError::EmptyBucket { .. } => StatusCode::NOT_FOUND,
        }
    }

    /// Whether issuing the same listing call again could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            SelectorError::StorageTimeout => true,
            SelectorError::StorageUnavailable(RusotoError::HttpDispatch(_)) => true,
            SelectorError::StorageUnavailable(RusotoError::Unknown(res)) => {
                res.status.is_server_error()
            }
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum RouteError {
    #[error("Not Found")]
    NotFound,
    #[error("Method Not Allowed")]
    MethodNotAllowed,
    #[error("Invalid event: {0}")]
    InvalidEvent(#[from] serde_json::Error),
}

impl error::ResponseError for RouteError {
    fn error_response(&self) -> HttpResponse {
        ResponseBuilder::new(self.status_code())
            .set_header(header::CONTENT_TYPE, "application/json; charset=utf-8")
            .body(error_body(&self.to_string()))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            RouteError::NotFound => StatusCode::NOT_FOUND,
            RouteError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            RouteError::InvalidEvent(_) => StatusCode::BAD_REQUEST,
        }
    }
}
