//! User authentication and session tokens
//!
//! Login verifies the argon2 hash and issues a signed, stateless session
//! token (HS256 JWT). Nothing is persisted per session: validity is the
//! signature plus the 1-hour expiry, and expiry is the only invalidation
//! mechanism — there is no logout, refresh, or revocation.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::repositories::UserRepository;
use crate::models::User;
use crate::services::password::verify_password;

/// Session token lifetime in seconds (fixed, 1 hour).
const TOKEN_TTL_SECS: i64 = 60 * 60;

/// Claims carried in every session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Standard JWT subject — the username
    pub sub: String,
    /// Numeric user id
    pub user_id: i64,
    /// Role string ("admin" / "viewer")
    pub role: String,
    /// Expiry (unix timestamp, seconds)
    pub exp: i64,
    /// Issued-at (unix timestamp, seconds)
    pub iat: i64,
}

/// Error types for authentication operations
#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    /// Unknown username or wrong password. One variant for both, so the
    /// error can never be used to enumerate usernames.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Token is missing, malformed, tampered with, or expired
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// User authentication service
pub struct AuthService {
    user_repo: Arc<dyn UserRepository>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    /// Create an auth service signing tokens with the given secret.
    pub fn new(user_repo: Arc<dyn UserRepository>, token_secret: &str) -> Self {
        Self {
            user_repo,
            encoding_key: EncodingKey::from_secret(token_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(token_secret.as_bytes()),
        }
    }

    /// Verify a username/password pair and issue a session token.
    ///
    /// Unknown username and wrong password are indistinguishable to the
    /// caller; both return `InvalidCredentials`.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(User, String), AuthServiceError> {
        let user = self
            .user_repo
            .get_by_username(username)
            .await?
            .ok_or(AuthServiceError::InvalidCredentials)?;

        let password_valid = verify_password(password, &user.password_hash)
            .map_err(AuthServiceError::InternalError)?;

        if !password_valid {
            return Err(AuthServiceError::InvalidCredentials);
        }

        let token = self.issue_token(&user)?;
        Ok((user, token))
    }

    /// Issue a signed token for an already-authenticated user.
    pub fn issue_token(&self, user: &User) -> Result<String, AuthServiceError> {
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            sub: user.username.clone(),
            user_id: user.id,
            role: user.role.to_string(),
            exp: now + TOKEN_TTL_SECS,
            iat: now,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthServiceError::InternalError(anyhow::anyhow!("Failed to sign token: {}", e)))
    }

    /// Validate a token's signature and expiry and return its claims.
    pub fn verify_token(&self, token: &str) -> Result<TokenClaims, AuthServiceError> {
        decode::<TokenClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| AuthServiceError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxUserRepository;
    use crate::db::{create_test_pool, migrations};
    use crate::models::UserRole;
    use crate::services::password::hash_password;

    async fn setup() -> AuthService {
        let pool = create_test_pool().await.expect("Failed to create pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let repo = SqlxUserRepository::boxed(pool);
        repo.create(&User::new(
            "admin",
            hash_password("password123").unwrap(),
            UserRole::Admin,
        ))
        .await
        .expect("Failed to seed user");

        AuthService::new(repo, "test-secret")
    }

    #[tokio::test]
    async fn test_login_success_issues_verifiable_token() {
        let service = setup().await;

        let (user, token) = service.login("admin", "password123").await.expect("Login failed");
        assert_eq!(user.username, "admin");

        let claims = service.verify_token(&token).expect("Token should verify");
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.exp - claims.iat, 60 * 60, "Fixed 1-hour lifetime");
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_are_identical() {
        let service = setup().await;

        let wrong_password = service.login("admin", "nope").await.unwrap_err();
        let unknown_user = service.login("ghost", "nope").await.unwrap_err();

        assert!(matches!(wrong_password, AuthServiceError::InvalidCredentials));
        assert!(matches!(unknown_user, AuthServiceError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[tokio::test]
    async fn test_tampered_token_rejected() {
        let service = setup().await;
        let (_, token) = service.login("admin", "password123").await.unwrap();

        let mut tampered = token.clone();
        tampered.push('x');
        assert!(matches!(
            service.verify_token(&tampered),
            Err(AuthServiceError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_token_from_other_secret_rejected() {
        let service = setup().await;
        let (user, _) = service.login("admin", "password123").await.unwrap();

        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let other = AuthService::new(SqlxUserRepository::boxed(pool), "different-secret");
        let foreign_token = other.issue_token(&user).unwrap();

        assert!(matches!(
            service.verify_token(&foreign_token),
            Err(AuthServiceError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let service = setup().await;

        // Forge a token whose exp is in the past, signed with the right key
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            sub: "admin".to_string(),
            user_id: 1,
            role: "admin".to_string(),
            exp: now - 120,
            iat: now - 3720,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(matches!(
            service.verify_token(&token),
            Err(AuthServiceError::InvalidToken)
        ));
    }
}
