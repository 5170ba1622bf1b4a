//! JWT token generation and validation.
//!
//! Provides HS256 access and refresh tokens. Refresh tokens are stateless:
//! there is no server-side revocation list.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;

use crate::auth::{Claims, TokenKind, TokenPair, TokenSubject};
use crate::error::AppError;

/// JWT configuration.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens.
    pub secret: String,
    /// Access token lifetime in seconds.
    pub access_token_expires_secs: i64,
    /// Refresh token lifetime in seconds.
    pub refresh_token_expires_secs: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: "change-me-in-production".to_string(),
            access_token_expires_secs: 86_400,
            refresh_token_expires_secs: 604_800,
        }
    }
}

impl From<&crate::config::JwtConfig> for JwtConfig {
    fn from(config: &crate::config::JwtConfig) -> Self {
        Self {
            secret: config.secret.clone(),
            access_token_expires_secs: i64::try_from(config.access_token_expiry_secs)
                .unwrap_or(i64::MAX),
            refresh_token_expires_secs: i64::try_from(config.refresh_token_expiry_secs)
                .unwrap_or(i64::MAX),
        }
    }
}

/// Errors that can occur during JWT operations.
#[derive(Debug, Error)]
pub enum JwtError {
    /// Token encoding failed.
    #[error("failed to encode token: {0}")]
    EncodingError(String),

    /// Token decoding failed.
    #[error("failed to decode token: {0}")]
    DecodingError(String),

    /// Token has expired.
    #[error("token has expired")]
    Expired,

    /// Token decoded fine but is of the wrong kind.
    #[error("expected a {expected:?} token")]
    WrongKind {
        /// Kind the caller required.
        expected: TokenKind,
    },
}

impl From<JwtError> for AppError {
    fn from(error: JwtError) -> Self {
        match error {
            JwtError::EncodingError(msg) => Self::Internal(msg),
            other => Self::InvalidToken(other.to_string()),
        }
    }
}

/// JWT service for token operations.
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("access_token_expires_secs", &self.config.access_token_expires_secs)
            .field("refresh_token_expires_secs", &self.config.refresh_token_expires_secs)
            .field("keys", &"[hidden]")
            .finish()
    }
}

impl JwtService {
    /// Creates a new JWT service with the given configuration.
    #[must_use]
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    fn sign(&self, subject: &TokenSubject, kind: TokenKind, lifetime: i64) -> Result<String, JwtError> {
        let expires_at = Utc::now() + Duration::seconds(lifetime);
        let claims = Claims::new(subject, kind, expires_at);

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))
    }

    /// Generates an access token.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::EncodingError` if token generation fails.
    pub fn generate_access_token(&self, subject: &TokenSubject) -> Result<String, JwtError> {
        self.sign(subject, TokenKind::Access, self.config.access_token_expires_secs)
    }

    /// Generates a refresh token.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::EncodingError` if token generation fails.
    pub fn generate_refresh_token(&self, subject: &TokenSubject) -> Result<String, JwtError> {
        self.sign(subject, TokenKind::Refresh, self.config.refresh_token_expires_secs)
    }

    /// Generates an access and refresh token pair.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::EncodingError` if token generation fails.
    pub fn generate_pair(&self, subject: &TokenSubject) -> Result<TokenPair, JwtError> {
        Ok(TokenPair {
            access_token: self.generate_access_token(subject)?,
            refresh_token: self.generate_refresh_token(subject)?,
            expires_in: self.access_token_expires_in(),
        })
    }

    /// Validates a token, signature and expiry, and checks its kind.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Expired` if the token has expired,
    /// `JwtError::WrongKind` if it is not of the expected kind, and
    /// `JwtError::DecodingError` if it is malformed or forged.
    pub fn validate_token(&self, token: &str, expected: TokenKind) -> Result<Claims, JwtError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::DecodingError(e.to_string()),
            })?;

        if claims.typ != expected {
            return Err(JwtError::WrongKind { expected });
        }
        Ok(claims)
    }

    /// Returns the access token lifetime in seconds.
    #[must_use]
    pub const fn access_token_expires_in(&self) -> i64 {
        self.config.access_token_expires_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_service() -> JwtService {
        JwtService::new(JwtConfig {
            secret: "test-secret-key-for-testing".to_string(),
            access_token_expires_secs: 900,
            refresh_token_expires_secs: 3600,
        })
    }

    fn subject() -> TokenSubject {
        TokenSubject {
            principal_id: 7,
            username: "jdupont".into(),
            role: "USER".into(),
            customer_id: Some(3),
        }
    }

    #[test]
    fn test_access_token_roundtrip() {
        let service = create_test_service();
        let token = service.generate_access_token(&subject()).unwrap();
        let claims = service.validate_token(&token, TokenKind::Access).unwrap();

        assert_eq!(claims.username(), "jdupont");
        assert_eq!(claims.uid, 7);
        assert_eq!(claims.role, "USER");
        assert_eq!(claims.cid, Some(3));
    }

    #[test]
    fn test_refresh_token_rejected_as_access() {
        let service = create_test_service();
        let pair = service.generate_pair(&subject()).unwrap();

        assert!(matches!(
            service.validate_token(&pair.refresh_token, TokenKind::Access),
            Err(JwtError::WrongKind { expected: TokenKind::Access })
        ));
        assert!(service.validate_token(&pair.refresh_token, TokenKind::Refresh).is_ok());
        assert_eq!(pair.expires_in, 900);
    }

    #[test]
    fn test_tokens_are_unique() {
        let service = create_test_service();
        let a = service.generate_access_token(&subject()).unwrap();
        let b = service.generate_access_token(&subject()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_invalid_token() {
        let service = create_test_service();
        let result = service.validate_token("invalid.token.here", TokenKind::Access);
        assert!(matches!(result, Err(JwtError::DecodingError(_))));
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let other = JwtService::new(JwtConfig {
            secret: "another-secret".to_string(),
            ..JwtConfig::default()
        });
        let token = other.generate_access_token(&subject()).unwrap();
        assert!(create_test_service().validate_token(&token, TokenKind::Access).is_err());
    }

    #[test]
    fn test_expired_token() {
        let service = JwtService::new(JwtConfig {
            secret: "test-secret-key-for-testing".to_string(),
            access_token_expires_secs: -120,
            refresh_token_expires_secs: 3600,
        });
        let token = service.generate_access_token(&subject()).unwrap();
        assert!(matches!(
            service.validate_token(&token, TokenKind::Access),
            Err(JwtError::Expired)
        ));
    }

    #[test]
    fn test_jwt_error_maps_to_invalid_token() {
        let error: AppError = JwtError::Expired.into();
        assert_eq!(error.status_code(), 401);
    }
}
