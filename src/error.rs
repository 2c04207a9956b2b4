use axum::http::StatusCode;

/// Failure kinds of the content engine and device synchronization.
#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    /// Missing or malformed fields, unknown panel or mode. Raised before any side effect.
    #[error("{0}")]
    InvalidRequest(String),
    #[error("unsupported or corrupt media: {0}")]
    UnsupportedOrCorruptMedia(String),
    #[error("device unreachable: {0}")]
    DeviceUnreachable(String),
    #[error("failed to persist settings: {0}")]
    PersistenceFailure(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("unauthorized")]
    Unauthorized,
}

impl PanelError {
    pub fn invalid(message: impl Into<String>) -> Self {
        PanelError::InvalidRequest(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            PanelError::InvalidRequest(_) | PanelError::PersistenceFailure(_) => {
                StatusCode::BAD_REQUEST
            }
            PanelError::UnsupportedOrCorruptMedia(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PanelError::DeviceUnreachable(_) => StatusCode::BAD_GATEWAY,
            PanelError::NotFound(_) => StatusCode::NOT_FOUND,
            PanelError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}
