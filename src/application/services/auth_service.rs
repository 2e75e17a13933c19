//! Authentication Service
//!
//! Handles registration, login, and JWT issuance/validation.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::JwtSettings;
use crate::domain::{User, UserRepository};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// Tokens expiring further out than this cannot be refreshed yet.
pub const REFRESH_WINDOW_MINUTES: i64 = 60;

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub username: String,
    pub email: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, AuthError> {
        self.sub.parse().map_err(|_| AuthError::InvalidToken)
    }
}

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token not yet eligible for refresh")]
    RefreshNotAllowed,

    #[error("Email already exists")]
    EmailExists,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials | AuthError::TokenExpired | AuthError::InvalidToken => {
                AppError::Unauthorized(e.to_string())
            }
            AuthError::RefreshNotAllowed => AppError::BadRequest(e.to_string()),
            AuthError::EmailExists => AppError::Conflict("Email already registered".into()),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

/// Signs and verifies HS256 access tokens.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry: Duration,
}

impl TokenIssuer {
    pub fn new(settings: &JwtSettings) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            expiry: Duration::hours(settings.token_expiry_hours),
        }
    }

    /// Token lifetime in seconds.
    pub fn expires_in(&self) -> i64 {
        self.expiry.num_seconds()
    }

    /// Issue a token for `user` valid for the configured lifetime.
    pub fn issue(&self, user_id: i64, username: &str, email: &str) -> Result<String, AuthError> {
        self.issue_with_lifetime(user_id, username, email, self.expiry)
    }

    pub(crate) fn issue_with_lifetime(
        &self,
        user_id: i64,
        username: &str,
        email: &str,
        lifetime: Duration,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            email: email.to_string(),
            exp: (now + lifetime).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Decode and validate a token.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })?;

        Ok(token_data.claims)
    }

    /// Reissue a still-valid token that expires within the refresh window.
    pub fn refresh(&self, token: &str) -> Result<String, AuthError> {
        let claims = self.verify(token)?;

        let remaining = claims.exp - Utc::now().timestamp();
        if remaining > REFRESH_WINDOW_MINUTES * 60 {
            return Err(AuthError::RefreshNotAllowed);
        }

        self.issue(claims.user_id()?, &claims.username, &claims.email)
    }
}

/// Authentication service trait for dependency injection
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Register a new user and issue a token
    async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(User, String), AuthError>;

    /// Authenticate user with credentials
    async fn authenticate(&self, email: &str, password: &str) -> Result<(User, String), AuthError>;

    /// Exchange a token close to expiry for a fresh one
    async fn refresh_token(&self, token: &str) -> Result<String, AuthError>;
}

/// AuthService implementation
pub struct AuthServiceImpl<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
    id_generator: Arc<SnowflakeGenerator>,
    tokens: Arc<TokenIssuer>,
}

impl<U> AuthServiceImpl<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>, id_generator: Arc<SnowflakeGenerator>, tokens: Arc<TokenIssuer>) -> Self {
        Self {
            user_repo,
            id_generator,
            tokens,
        }
    }

    /// Hash a password using Argon2id
    fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Internal(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against its hash
    fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AuthError::Internal(format!("Invalid password hash: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl<U> AuthService for AuthServiceImpl<U>
where
    U: UserRepository + 'static,
{
    async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(User, String), AuthError> {
        let email = normalize_email(email);

        if self
            .user_repo
            .email_exists(&email)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
        {
            return Err(AuthError::EmailExists);
        }

        let password_hash = self.hash_password(password)?;

        let now = Utc::now();
        let user = User {
            id: self.id_generator.generate(),
            username: username.trim().to_string(),
            email,
            password_hash,
            created_at: now,
            updated_at: now,
        };

        // A concurrent registration can still win the unique index.
        let created = self.user_repo.create(&user).await.map_err(|e| match e {
            AppError::Conflict(_) => AuthError::EmailExists,
            e => AuthError::Internal(e.to_string()),
        })?;

        let token = self.tokens.issue(created.id, &created.username, &created.email)?;
        tracing::info!(user_id = created.id, "User registered");

        Ok((created, token))
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<(User, String), AuthError> {
        let user = self
            .user_repo
            .find_by_email(&normalize_email(email))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.tokens.issue(user.id, &user.username, &user.email)?;
        Ok((user, token))
    }

    async fn refresh_token(&self, token: &str) -> Result<String, AuthError> {
        self.tokens.refresh(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MockUserRepository;
    use mockall::predicate::eq;

    fn issuer() -> Arc<TokenIssuer> {
        Arc::new(TokenIssuer::new(&JwtSettings {
            secret: "test-secret-key-that-is-at-least-32-bytes".into(),
            token_expiry_hours: 24,
        }))
    }

    fn service(repo: MockUserRepository) -> AuthServiceImpl<MockUserRepository> {
        AuthServiceImpl::new(Arc::new(repo), Arc::new(SnowflakeGenerator::default()), issuer())
    }

    #[test]
    fn test_issue_and_verify() {
        let tokens = issuer();
        let token = tokens.issue(42, "alice", "alice@example.com").unwrap();

        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = issuer();
        let token = tokens
            .issue_with_lifetime(1, "a", "a@example.com", Duration::hours(-2))
            .unwrap();

        assert!(matches!(tokens.verify(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let other = TokenIssuer::new(&JwtSettings {
            secret: "another-secret-key-that-is-32-bytes-long".into(),
            token_expiry_hours: 24,
        });
        let token = other.issue(1, "a", "a@example.com").unwrap();

        assert!(matches!(issuer().verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_refresh_only_near_expiry() {
        let tokens = issuer();

        let fresh = tokens.issue(1, "a", "a@example.com").unwrap();
        assert!(matches!(tokens.refresh(&fresh), Err(AuthError::RefreshNotAllowed)));

        let expiring = tokens
            .issue_with_lifetime(1, "a", "a@example.com", Duration::minutes(30))
            .unwrap();
        let renewed = tokens.refresh(&expiring).unwrap();
        let claims = tokens.verify(&renewed).unwrap();
        assert!(claims.exp - Utc::now().timestamp() > 23 * 3600);
    }

    #[tokio::test]
    async fn test_register_rejects_existing_email() {
        let mut repo = MockUserRepository::new();
        repo.expect_email_exists()
            .with(eq("taken@example.com"))
            .returning(|_| Ok(true));
        repo.expect_create().never();

        let result = service(repo)
            .register("bob", "Taken@Example.com", "password123")
            .await;

        assert!(matches!(result, Err(AuthError::EmailExists)));
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let mut repo = MockUserRepository::new();
        repo.expect_email_exists().returning(|_| Ok(false));
        repo.expect_create().returning(|user| Ok(user.clone()));

        let svc = service(repo);
        let (user, token) = svc.register("bob", "bob@example.com", "password123").await.unwrap();
        assert!(!token.is_empty());
        assert_ne!(user.password_hash, "password123");

        let mut repo = MockUserRepository::new();
        let stored = user.clone();
        repo.expect_find_by_email()
            .returning(move |_| Ok(Some(stored.clone())));
        let svc = service(repo);

        let (logged_in, _) = svc.authenticate("bob@example.com", "password123").await.unwrap();
        assert_eq!(logged_in.id, user.id);

        let wrong = svc.authenticate("bob@example.com", "nope").await;
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_unknown_email() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_email().returning(|_| Ok(None));

        let result = service(repo).authenticate("ghost@example.com", "password123").await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }
}
