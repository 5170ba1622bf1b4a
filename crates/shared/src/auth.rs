//! Authentication types for JWT and tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Distinguishes access tokens from refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived token accepted by protected routes.
    Access,
    /// Long-lived token only accepted by the refresh endpoint.
    Refresh,
}

/// JWT claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username).
    pub sub: String,
    /// Principal ID.
    pub uid: i64,
    /// Role name (`ADMIN` or `USER`).
    pub role: String,
    /// Linked customer ID, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<i64>,
    /// Token kind.
    pub typ: TokenKind,
    /// Unique token ID.
    pub jti: Uuid,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

/// Identity facts embedded in a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    /// Principal ID.
    pub principal_id: i64,
    /// Username.
    pub username: String,
    /// Role name.
    pub role: String,
    /// Linked customer ID.
    pub customer_id: Option<i64>,
}

impl Claims {
    /// Creates new claims for a subject.
    #[must_use]
    pub fn new(subject: &TokenSubject, kind: TokenKind, expires_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            sub: subject.username.clone(),
            uid: subject.principal_id,
            role: subject.role.clone(),
            cid: subject.customer_id,
            typ: kind,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the username from claims.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.sub
    }
}

/// Token pair returned after successful authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Access token (short-lived).
    pub access_token: String,
    /// Refresh token (long-lived).
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Login request payload.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    /// Username.
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    /// Password.
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Registration request payload.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Username.
    #[validate(length(min = 3, max = 50, message = "Username must be between 3 and 50 characters"))]
    pub username: String,
    /// Email address.
    #[validate(email(message = "Email is not valid"))]
    pub email: String,
    /// Password.
    #[validate(length(min = 6, max = 100, message = "Password must be between 6 and 100 characters"))]
    pub password: String,
}

/// Refresh query parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshQuery {
    /// The refresh token.
    pub refresh_token: String,
}

/// Authentication response payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    /// Access token.
    pub access_token: String,
    /// Refresh token.
    pub refresh_token: String,
    /// Always `Bearer`.
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    /// Username.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Role name.
    pub role: String,
    /// Linked customer ID.
    pub client_id: Option<i64>,
}

impl AuthResponse {
    /// Builds a bearer response from a token pair and the principal's details.
    #[must_use]
    pub fn bearer(
        tokens: TokenPair,
        username: String,
        email: String,
        role: String,
        client_id: Option<i64>,
    ) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: tokens.expires_in,
            username,
            email,
            role,
            client_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_validation() {
        let ok = RegisterRequest {
            username: "jdupont".into(),
            email: "j@example.com".into(),
            password: "secret123".into(),
        };
        assert!(ok.validate().is_ok());

        let bad = RegisterRequest {
            username: "jd".into(),
            email: "not-an-email".into(),
            password: "123".into(),
        };
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn test_auth_response_serializes_camel_case() {
        let response = AuthResponse::bearer(
            TokenPair {
                access_token: "a".into(),
                refresh_token: "r".into(),
                expires_in: 3600,
            },
            "admin".into(),
            "admin@egabank.tg".into(),
            "ADMIN".into(),
            None,
        );
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["tokenType"], "Bearer");
        assert_eq!(json["expiresIn"], 3600);
        assert!(json["clientId"].is_null());
    }
}
