//! Domain service for authentication and account registration.
//!
//! Handles credential verification, session identity lookups, and new user
//! registration with uniqueness enforcement.

use serde::Serialize;
use thiserror::Error;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown username and wrong password are indistinguishable on
    /// purpose, so usernames cannot be enumerated through error messages.
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Username or email already exists")]
    AlreadyExists,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Authenticated identity DTO bound into the session.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
}

/// Registration form fields as submitted.
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Verifies credentials and returns the authenticated identity.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] when the username does not
    /// exist or the password does not match — the same error either way.
    async fn login(&self, username: &str, password: &str) -> Result<AuthenticatedUser, AuthError>;

    /// Creates a new account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] for bad input and
    /// [`AuthError::AlreadyExists`] for duplicate username/email, whether
    /// caught by the pre-check or by the store's unique index.
    async fn register(&self, request: RegisterRequest) -> Result<AuthenticatedUser, AuthError>;

    /// Resolves a session user id back to an identity.
    async fn get_user(&self, user_id: i32) -> Result<AuthenticatedUser, AuthError>;

    /// Fires the logout notification for a user. Best-effort.
    async fn notify_logout(&self, user_id: i32);
}
