//! `SeaORM` implementation of the `AuthService` trait.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use tokio::sync::RwLock;
use tokio::task;
use tracing::warn;

use crate::config::Config;
use crate::db::repositories::user::hash_password;
use crate::db::{NewUser, Store, User};
use crate::services::auth_service::{AuthError, AuthService, AuthenticatedUser, RegisterRequest};
use crate::services::mailer::{MailTemplate, Mailer};

const MIN_PASSWORD_LENGTH: usize = 8;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[\w.+-]+@[\w.-]+\.\w{2,}$").expect("Invalid regex pattern defined in code")
    })
}

fn to_authenticated(user: User) -> AuthenticatedUser {
    AuthenticatedUser {
        id: user.id,
        username: user.username,
        email: user.email,
        is_admin: user.is_admin,
    }
}

pub struct SeaOrmAuthService {
    store: Store,
    config: Arc<RwLock<Config>>,
    mailer: Arc<dyn Mailer>,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, config: Arc<RwLock<Config>>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            store,
            config,
            mailer,
        }
    }

    fn validate_registration(request: &RegisterRequest) -> Result<(), AuthError> {
        if request.username.is_empty()
            || request.email.is_empty()
            || request.password.is_empty()
            || request.confirm_password.is_empty()
        {
            return Err(AuthError::Validation("All fields are required".to_string()));
        }

        if request.password != request.confirm_password {
            return Err(AuthError::Validation("Passwords do not match".to_string()));
        }

        if request.password.len() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
            )));
        }

        if !email_regex().is_match(&request.email) {
            return Err(AuthError::Validation("Invalid email format".to_string()));
        }

        Ok(())
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn login(&self, username: &str, password: &str) -> Result<AuthenticatedUser, AuthError> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::Validation(
                "Please fill in username and password".to_string(),
            ));
        }

        // A missing user and a wrong password take the same exit.
        let is_valid = self.store.verify_user_password(username, password).await?;

        if !is_valid {
            warn!("Failed login attempt for username: {username}");
            return Err(AuthError::InvalidCredentials);
        }

        let user = self
            .store
            .get_user_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let _ = self
            .mailer
            .send(
                std::slice::from_ref(&user.email),
                &MailTemplate::LoginAlert {
                    username: user.username.clone(),
                },
            )
            .await;

        Ok(to_authenticated(user))
    }

    async fn register(&self, request: RegisterRequest) -> Result<AuthenticatedUser, AuthError> {
        let request = RegisterRequest {
            username: request.username.trim().to_string(),
            email: request.email.trim().to_lowercase(),
            ..request
        };

        Self::validate_registration(&request)?;

        // Fast-path UX check. The unique indexes on the users table are the
        // authoritative guard against a concurrent duplicate.
        if self
            .store
            .user_exists(&request.username, &request.email)
            .await?
        {
            return Err(AuthError::AlreadyExists);
        }

        let security = self.config.read().await.security.clone();
        let password = request.password.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password, Some(&security)))
            .await
            .map_err(|e| AuthError::Internal(format!("Password hashing task panicked: {e}")))??;

        let user = self
            .store
            .create_user(NewUser {
                username: request.username,
                email: request.email,
                password_hash,
            })
            .await
            .map_err(|e| {
                if matches!(
                    e.sql_err(),
                    Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
                ) {
                    AuthError::AlreadyExists
                } else {
                    AuthError::from(e)
                }
            })?;

        let _ = self
            .mailer
            .send(
                std::slice::from_ref(&user.email),
                &MailTemplate::Welcome {
                    username: user.username.clone(),
                },
            )
            .await;

        Ok(to_authenticated(user))
    }

    async fn get_user(&self, user_id: i32) -> Result<AuthenticatedUser, AuthError> {
        let user = self
            .store
            .get_user_by_id(user_id)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        Ok(to_authenticated(user))
    }

    async fn notify_logout(&self, user_id: i32) {
        match self.store.get_user_by_id(user_id).await {
            Ok(Some(user)) => {
                let _ = self
                    .mailer
                    .send(
                        std::slice::from_ref(&user.email),
                        &MailTemplate::LogoutAlert {
                            username: user.username,
                        },
                    )
                    .await;
            }
            Ok(None) => {}
            Err(e) => warn!("Could not load user {user_id} for logout notification: {e}"),
        }
    }
}
