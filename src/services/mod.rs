pub mod auth_service;
pub use auth_service::{AuthError, AuthService, AuthenticatedUser, RegisterRequest};

pub mod auth_service_impl;
pub use auth_service_impl::SeaOrmAuthService;

pub mod mailer;
pub use mailer::{MailTemplate, Mailer, NoopMailer, SmtpMailer};

pub mod review_service;
pub use review_service::{ReviewError, ReviewService, StatusUpdateOutcome};
