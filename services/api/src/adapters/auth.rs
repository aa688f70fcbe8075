//! services/api/src/adapters/auth.rs
//!
//! A minimal email/password implementation of the `AuthProvider` port. Passwords are
//! hashed with Argon2; sessions are opaque tokens stored in `auth_sessions` and expire
//! after the configured number of days.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use campus_portal_core::domain::{AuthSession, AuthUser};
use campus_portal_core::ports::{AuthProvider, PortError, PortResult};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use tracing::{error, info};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 6;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct PgAuthAdapter {
    pool: PgPool,
    session_ttl: Duration,
}

impl PgAuthAdapter {
    pub fn new(pool: PgPool, session_ttl_days: i64) -> Self {
        Self {
            pool,
            session_ttl: Duration::days(session_ttl_days),
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    email: String,
}
impl UserRecord {
    fn to_domain(self) -> AuthUser {
        AuthUser {
            id: self.id,
            email: self.email,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    email: String,
    password_hash: String,
}

//=========================================================================================
// Password Helpers
//=========================================================================================

pub(crate) fn hash_password(password: &str) -> PortResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            PortError::Unexpected("Failed to hash password".to_string())
        })
}

pub(crate) fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            error!("Failed to parse password hash: {:?}", e);
            false
        }
    }
}

fn validate_credentials(email: &str, password: &str) -> PortResult<()> {
    let email = email.trim();
    let well_formed = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !well_formed {
        return Err(PortError::Validation(format!("'{}' is not a valid email address", email)));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PortError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// `AuthProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthProvider for PgAuthAdapter {
    async fn current_user(&self, token: &str) -> PortResult<Option<AuthUser>> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT u.id, u.email FROM auth_sessions s JOIN auth_users u ON u.id = s.user_id \
             WHERE s.id = $1 AND s.expires_at > NOW()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(UserRecord::to_domain))
    }

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<AuthSession> {
        let creds = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, password_hash FROM auth_users WHERE lower(email) = lower($1)",
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(PortError::Unauthorized)?;

        if !verify_password(password, &creds.password_hash) {
            return Err(PortError::Unauthorized);
        }

        let token = Uuid::new_v4().to_string();
        let expires_at: DateTime<Utc> = Utc::now() + self.session_ttl;
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&token)
            .bind(creds.id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        info!(user_id = %creds.id, "User signed in");
        Ok(AuthSession {
            token,
            user: AuthUser {
                id: creds.id,
                email: creds.email,
            },
            expires_at,
        })
    }

    async fn sign_out(&self, token: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn sign_up(&self, email: &str, password: &str, metadata: Value) -> PortResult<AuthUser> {
        validate_credentials(email, password)?;
        let password_hash = hash_password(password)?;

        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO auth_users (email, password_hash, metadata) VALUES ($1, $2, $3) \
             RETURNING id, email",
        )
        .bind(email.trim())
        .bind(password_hash)
        .bind(metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                PortError::Rule("An account with this email already exists".to_string())
            }
            other => unexpected(other),
        })?;

        info!(user_id = %record.id, "Account created");
        Ok(record.to_domain())
    }

    async fn find_user_by_email(&self, email: &str) -> PortResult<Option<AuthUser>> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, email FROM auth_users WHERE lower(email) = lower($1)",
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(UserRecord::to_domain))
    }
}
