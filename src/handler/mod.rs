use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::PanelError;

pub mod content;
pub mod device;
pub mod files;
pub mod form;
pub mod panel;
pub mod settings;
pub mod telemetry;

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

pub type ApiResult<T> = Result<T, ApiError>;
pub type ApiJsonResult<T> = ApiResult<Json<T>>;

#[derive(Debug)]
pub struct ApiError(anyhow::Error);

impl ApiError {
    fn status(&self) -> StatusCode {
        self.0
            .downcast_ref::<PanelError>()
            .map(PanelError::status_code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self.0.downcast_ref::<PanelError>() {
            Some(err) => err.to_string(),
            None => format!("{:#}", self.0),
        };
        if status.is_server_error() {
            log::error!("ApiError: {:?}", self.0);
        } else {
            log::warn!("ApiError: {}", self.0);
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
