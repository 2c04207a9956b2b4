//! Identity gate in front of operator endpoints.
//!
//! Accounts and sessions are not handled here; the server only needs to know
//! whether a request may change panel content or device state. The concrete
//! authenticator is picked at start-up from configuration.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::PanelError;
use crate::handler::ApiResult;
use crate::state::AppState;

pub trait Authenticator: Send + Sync + 'static {
    fn check(&self, headers: &HeaderMap) -> Result<(), PanelError>;
}

/// Lets every request through. Used when no token is configured and in tests.
pub struct AllowAll;

impl Authenticator for AllowAll {
    fn check(&self, _headers: &HeaderMap) -> Result<(), PanelError> {
        Ok(())
    }
}

/// Requires `Authorization: Bearer <token>`.
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl Authenticator for BearerToken {
    fn check(&self, headers: &HeaderMap) -> Result<(), PanelError> {
        let presented = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim);
        match presented {
            Some(token) if token == self.0 => Ok(()),
            _ => Err(PanelError::Unauthorized),
        }
    }
}

pub fn from_token(token: Option<&str>) -> Box<dyn Authenticator> {
    match token.map(str::trim).filter(|t| !t.is_empty()) {
        Some(token) => Box::new(BearerToken::new(token)),
        None => Box::new(AllowAll),
    }
}

pub async fn require_operator(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    state.auth.check(request.headers())?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token() {
        let auth = BearerToken::new("s3cret");
        assert!(auth.check(&headers("Bearer s3cret")).is_ok());
        assert!(matches!(
            auth.check(&headers("Bearer nope")),
            Err(PanelError::Unauthorized)
        ));
        assert!(auth.check(&headers("s3cret")).is_err());
        assert!(auth.check(&HeaderMap::new()).is_err());
    }

    #[test]
    fn test_from_token() {
        assert!(from_token(None).check(&HeaderMap::new()).is_ok());
        assert!(from_token(Some("  ")).check(&HeaderMap::new()).is_ok());
        assert!(from_token(Some("abc")).check(&HeaderMap::new()).is_err());
        assert!(from_token(Some("abc")).check(&headers("Bearer abc")).is_ok());
    }
}
