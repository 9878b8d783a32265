use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose, Engine as _};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::errors::ServiceError;

const REALM_CHALLENGE: &str = "Basic realm=\"orders\", charset=\"UTF-8\"";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialsError {
    #[error("gateway credential entry {0} is not of the form user:password")]
    Malformed(usize),
    #[error("gateway credentials list is empty")]
    Empty,
}

/// Callers allowed through the gateway, keyed by username
#[derive(Clone, Default)]
pub struct GatewayCredentials {
    users: HashMap<String, String>,
}

impl fmt::Debug for GatewayCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayCredentials")
            .field("users", &self.users.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl GatewayCredentials {
    /// Parses `user:password` pairs separated by commas.
    pub fn parse(raw: &str) -> Result<Self, CredentialsError> {
        let mut users = HashMap::new();
        for (index, entry) in raw.split(',').map(str::trim).enumerate() {
            if entry.is_empty() {
                continue;
            }
            match entry.split_once(':') {
                Some((user, password)) if !user.is_empty() && !password.is_empty() => {
                    users.insert(user.to_string(), password.to_string());
                }
                _ => return Err(CredentialsError::Malformed(index + 1)),
            }
        }

        if users.is_empty() {
            return Err(CredentialsError::Empty);
        }
        Ok(Self { users })
    }

    /// Returns the username when the Basic `authorization` header matches
    pub fn authenticate(&self, headers: &HeaderMap) -> Option<String> {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let (scheme, encoded) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }

        let decoded = general_purpose::STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (user, password) = decoded.split_once(':')?;

        let expected = self.users.get(user)?;
        constant_time_eq(expected.as_bytes(), password.as_bytes()).then(|| user.to_string())
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Rejects requests without valid Basic credentials
pub async fn require_basic_auth(
    State(credentials): State<Arc<GatewayCredentials>>,
    request: Request,
    next: Next,
) -> Response {
    match credentials.authenticate(request.headers()) {
        Some(user) => {
            debug!(caller = %user, "Gateway authentication succeeded");
            next.run(request).await
        }
        None => {
            warn!(uri = %request.uri(), "Gateway authentication failed");
            let mut response =
                ServiceError::Unauthorized("Authentication required".to_string()).into_response();
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(REALM_CHALLENGE),
            );
            response
        }
    }
}

/// Extension for attaching gateway authentication to routers
pub trait AuthRouterExt {
    /// Guards every route with Basic auth when credentials are configured
    fn with_gateway_auth(self, credentials: Option<Arc<GatewayCredentials>>) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_gateway_auth(self, credentials: Option<Arc<GatewayCredentials>>) -> Self {
        match credentials {
            Some(credentials) => self.route_layer(axum::middleware::from_fn_with_state(
                credentials,
                require_basic_auth,
            )),
            None => self,
        }
    }
}
