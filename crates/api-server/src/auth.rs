//! Bearer token authentication.
//!
//! Tokens are `<user_id>.<hex(sha256(secret ":" user_id))>`. Development
//! scheme only; production: replace with JWT issued by the identity provider.

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use market_core::config::AuthConfig;
use market_management::ErrorResponse;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

/// Issues and verifies bearer tokens, and knows who the admins are.
pub struct TokenAuthority {
    secret: String,
    admin_users: HashSet<String>,
}

impl TokenAuthority {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            secret: config.token_secret.clone(),
            admin_users: config.admin_users.iter().cloned().collect(),
        }
    }

    fn signature(&self, user_id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(b":");
        hasher.update(user_id.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn issue_token(&self, user_id: &str) -> String {
        format!("{}.{}", user_id, self.signature(user_id))
    }

    /// Returns the user id a valid token was issued for.
    pub fn verify_token(&self, token: &str) -> Option<String> {
        // User ids may contain dots; the signature never does.
        let (user_id, signature) = token.rsplit_once('.')?;
        if user_id.is_empty() {
            return None;
        }
        let expected = self.signature(user_id);
        if expected.len() == signature.len()
            && expected
                .bytes()
                .zip(signature.bytes())
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
        {
            Some(user_id.to_string())
        } else {
            None
        }
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admin_users.contains(user_id)
    }

    fn authenticate(&self, parts: &Parts) -> Result<String, AuthRejection> {
        let value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthRejection::Missing)?;
        let token = value.strip_prefix("Bearer ").ok_or(AuthRejection::Missing)?;
        self.verify_token(token.trim()).ok_or(AuthRejection::Invalid)
    }
}

/// The authenticated caller, extracted from the `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
}

#[derive(Debug)]
pub enum AuthRejection {
    Missing,
    Invalid,
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            AuthRejection::Missing => (
                StatusCode::UNAUTHORIZED,
                "missing_auth",
                "Authorization header with Bearer token required",
            ),
            AuthRejection::Invalid => (
                StatusCode::UNAUTHORIZED,
                "invalid_token",
                "Invalid bearer token",
            ),
            AuthRejection::Forbidden => (
                StatusCode::FORBIDDEN,
                "forbidden",
                "Admin privileges required",
            ),
        };
        metrics::counter!("api.auth_rejections", "reason" => error).increment(1);
        (
            status,
            Json(ErrorResponse {
                error: error.to_string(),
                message: message.to_string(),
            }),
        )
            .into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    Arc<TokenAuthority>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let authority = Arc::<TokenAuthority>::from_ref(state);
        let user_id = authority.authenticate(parts)?;
        Ok(AuthUser { user_id })
    }
}

/// Middleware for `/admin` routes: valid token and membership in `admin_users`.
pub async fn require_admin(
    State(authority): State<Arc<TokenAuthority>>,
    req: Request,
    next: Next,
) -> Response {
    let (parts, body) = req.into_parts();
    let user_id = match authority.authenticate(&parts) {
        Ok(user_id) => user_id,
        Err(rejection) => return rejection.into_response(),
    };
    if !authority.is_admin(&user_id) {
        warn!(user_id = %user_id, path = %parts.uri.path(), "Admin route denied");
        return AuthRejection::Forbidden.into_response();
    }
    next.run(Request::from_parts(parts, body)).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn authority() -> TokenAuthority {
        TokenAuthority::new(&AuthConfig {
            token_secret: "s3cret".into(),
            admin_users: vec!["admin".into()],
        })
    }

    #[test]
    fn test_issue_and_verify() {
        let auth = authority();
        let token = auth.issue_token("bob@example.com");
        assert!(token.starts_with("bob@example.com."));
        assert_eq!(auth.verify_token(&token).unwrap(), "bob@example.com");
    }

    #[test]
    fn test_rejects_tampered_tokens() {
        let auth = authority();
        let token = auth.issue_token("alice");
        let forged = token.replacen("alice", "mallory", 1);
        assert!(auth.verify_token(&forged).is_none());
        assert!(auth.verify_token("alice").is_none());
        assert!(auth.verify_token(".abc").is_none());

        let other = TokenAuthority::new(&AuthConfig {
            token_secret: "different".into(),
            admin_users: vec![],
        });
        assert!(other.verify_token(&token).is_none());
    }

    #[test]
    fn test_admin_membership() {
        let auth = authority();
        assert!(auth.is_admin("admin"));
        assert!(!auth.is_admin("alice"));
    }
}
