//! Registration, login, token refresh and bearer authentication.

use std::sync::Arc;

use chrono::Local;
use tracing::{info, warn};
use validator::Validate;

use egabank_shared::auth::{AuthResponse, LoginRequest, RegisterRequest, TokenKind};
use egabank_shared::jwt::JwtService;
use egabank_shared::{AppError, AppResult};

use super::{NewPrincipal, PrincipalRecord, hash_password, verify_password};
use crate::access::{Principal, Role};
use crate::customer::{CustomerInput, NewCustomer, Sex};
use crate::store::Store;

/// Auth service.
pub struct AuthService {
    store: Arc<dyn Store>,
    jwt: Arc<JwtService>,
}

impl AuthService {
    /// Creates a new auth service.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, jwt: Arc<JwtService>) -> Self {
        Self { store, jwt }
    }

    fn respond(&self, record: &PrincipalRecord) -> AppResult<AuthResponse> {
        let tokens = self.jwt.generate_pair(&record.token_subject())?;
        Ok(AuthResponse::bearer(
            tokens,
            record.username.clone(),
            record.email.clone(),
            record.role.as_str().to_string(),
            record.customer_id.map(egabank_shared::types::CustomerId::into_inner),
        ))
    }

    /// Registers a USER principal together with a placeholder customer
    /// (family name = username, empty given name) linked to it.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for malformed input and `Duplicate` when the
    /// username or email is already in use.
    pub async fn register(&self, request: RegisterRequest) -> AppResult<AuthResponse> {
        request.validate()?;

        let mut tx = self.store.begin().await?;
        if tx.username_taken(&request.username).await? {
            return Err(AppError::duplicate("User", "username", &request.username));
        }
        if tx.principal_email_taken(&request.email).await? {
            return Err(AppError::duplicate("User", "email", &request.email));
        }
        if tx.customer_email_taken(&request.email, None).await? {
            return Err(AppError::duplicate("Customer", "email", &request.email));
        }

        let now = Local::now().naive_local();
        let customer = tx
            .insert_customer(NewCustomer {
                fields: CustomerInput {
                    family_name: request.username.clone(),
                    given_name: String::new(),
                    birth_date: now.date(),
                    sex: Sex::Male,
                    address: None,
                    phone: None,
                    email: Some(request.email.clone()),
                    nationality: None,
                },
                created_at: now,
            })
            .await?;

        let record = tx
            .insert_principal(NewPrincipal {
                username: request.username,
                email: request.email,
                password_hash: hash_password(&request.password)?,
                role: Role::User,
                enabled: true,
                customer_id: Some(customer.id),
            })
            .await?;
        tx.commit().await?;

        info!(username = %record.username, customer_id = %customer.id, "user registered");
        self.respond(&record)
    }

    /// Checks credentials and issues tokens.
    ///
    /// # Errors
    ///
    /// Returns `BadCredentials` for unknown users, wrong passwords and
    /// disabled principals.
    pub async fn login(&self, request: LoginRequest) -> AppResult<AuthResponse> {
        request.validate()?;

        let mut tx = self.store.begin().await?;
        let record = tx.find_principal(&request.username).await?;
        drop(tx);

        let Some(record) = record else {
            warn!(username = %request.username, "login attempt for unknown user");
            return Err(AppError::BadCredentials);
        };
        if !record.enabled {
            warn!(username = %record.username, "login attempt on disabled principal");
            return Err(AppError::BadCredentials);
        }
        if !verify_password(&request.password, &record.password_hash)? {
            warn!(username = %record.username, "login attempt with invalid password");
            return Err(AppError::BadCredentials);
        }

        info!(username = %record.username, "login succeeded");
        self.respond(&record)
    }

    /// Exchanges a refresh token for a fresh token pair.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` if the token is malformed, expired, not a
    /// refresh token, or names a principal that no longer exists or is
    /// disabled.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<AuthResponse> {
        let claims = self.jwt.validate_token(refresh_token, TokenKind::Refresh)?;
        let record = self.active_principal(claims.username()).await?.ok_or_else(|| {
            AppError::InvalidToken("Refresh token refers to an unknown user".to_string())
        })?;

        info!(username = %record.username, "token refreshed");
        self.respond(&record)
    }

    /// Resolves a bearer access token to the caller's principal.
    ///
    /// The principal is reloaded from the store so role, customer link and
    /// enabled flag are always current.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` for bad tokens and `Unauthenticated` when the
    /// principal is gone or disabled.
    pub async fn authenticate(&self, access_token: &str) -> AppResult<Principal> {
        let claims = self.jwt.validate_token(access_token, TokenKind::Access)?;
        self.active_principal(claims.username())
            .await?
            .map(|record| record.principal())
            .ok_or(AppError::Unauthenticated)
    }

    async fn active_principal(&self, username: &str) -> AppResult<Option<PrincipalRecord>> {
        let mut tx = self.store.begin().await?;
        let record = tx.find_principal(username).await?;
        Ok(record.filter(|r| r.enabled))
    }

    /// Creates the administrator when no principal exists yet.
    ///
    /// Returns true if the administrator was created.
    ///
    /// # Errors
    ///
    /// Returns store or hashing errors.
    pub async fn bootstrap_admin(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> AppResult<bool> {
        let mut tx = self.store.begin().await?;
        if tx.count_principals().await? > 0 {
            return Ok(false);
        }
        tx.insert_principal(NewPrincipal {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: hash_password(password)?,
            role: Role::Admin,
            enabled: true,
            customer_id: None,
        })
        .await?;
        tx.commit().await?;

        info!(username, "administrator created");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{jwt, memory_store};

    fn service() -> AuthService {
        AuthService::new(memory_store(), jwt())
    }

    fn register_request(username: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            email: email.into(),
            password: "secret123".into(),
        }
    }

    #[tokio::test]
    async fn test_register_creates_linked_customer() {
        let auth = service();
        let response = auth
            .register(register_request("jdupont", "j@x"))
            .await
            .unwrap();

        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.role, "USER");
        assert!(response.client_id.is_some());

        let principal = auth.authenticate(&response.access_token).await.unwrap();
        assert_eq!(principal.role, Role::User);
        assert_eq!(
            principal.customer_id.map(egabank_shared::types::CustomerId::into_inner),
            response.client_id
        );
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates() {
        let auth = service();
        auth.register(register_request("jdupont", "j@x")).await.unwrap();

        let err = auth
            .register(register_request("jdupont", "other@x"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Duplicate { field: "username", .. }));

        let err = auth
            .register(register_request("jean2", "j@x"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Duplicate { field: "email", .. }));
    }

    #[tokio::test]
    async fn test_login_checks_password() {
        let auth = service();
        auth.register(register_request("jdupont", "j@x")).await.unwrap();

        let ok = auth
            .login(LoginRequest {
                username: "jdupont".into(),
                password: "secret123".into(),
            })
            .await;
        assert!(ok.is_ok());

        let err = auth
            .login(LoginRequest {
                username: "jdupont".into(),
                password: "wrong".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadCredentials));

        let err = auth
            .login(LoginRequest {
                username: "ghost".into(),
                password: "secret123".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadCredentials));
    }

    #[tokio::test]
    async fn test_refresh_requires_refresh_token() {
        let auth = service();
        let response = auth
            .register(register_request("jdupont", "j@x"))
            .await
            .unwrap();

        let refreshed = auth.refresh(&response.refresh_token).await.unwrap();
        assert_eq!(refreshed.username, "jdupont");

        let err = auth.refresh(&response.access_token).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidToken(_)));

        let err = auth.refresh("garbage").await.unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[tokio::test]
    async fn test_disabled_principal_rejected() {
        let store = memory_store();
        let auth = AuthService::new(Arc::clone(&store), jwt());
        let mut tx = store.begin().await.unwrap();
        let record = tx
            .insert_principal(NewPrincipal {
                username: "frozen".into(),
                email: "frozen@x".into(),
                password_hash: hash_password("secret123").unwrap(),
                role: Role::User,
                enabled: false,
                customer_id: None,
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let err = auth
            .login(LoginRequest {
                username: "frozen".into(),
                password: "secret123".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadCredentials));

        let token = jwt().generate_access_token(&record.token_subject()).unwrap();
        let err = auth.authenticate(&token).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_bootstrap_admin_only_once() {
        let auth = service();
        assert!(auth.bootstrap_admin("admin", "admin@egabank.tg", "admin123").await.unwrap());
        assert!(!auth.bootstrap_admin("admin2", "a2@egabank.tg", "admin123").await.unwrap());

        let response = auth
            .login(LoginRequest {
                username: "admin".into(),
                password: "admin123".into(),
            })
            .await
            .unwrap();
        assert_eq!(response.role, "ADMIN");
        assert!(response.client_id.is_none());
    }
}
