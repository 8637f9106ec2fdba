//! Admin review actions: status changes on submitted documents and the
//! notification email they trigger.
//!
//! The status update is the operation; the email is a side effect. A mail
//! failure is logged and swallowed, never rolled back into the update.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::db::Store;
use crate::services::mailer::{MailTemplate, Mailer};

/// Errors specific to review operations.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Document not found")]
    DocumentNotFound,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<anyhow::Error> for ReviewError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Result of a status update, including whether the owner was notified.
#[derive(Debug, Clone)]
pub struct StatusUpdateOutcome {
    pub document_id: i32,
    pub status: String,
    pub notified: bool,
}

pub struct ReviewService {
    store: Store,
    mailer: Arc<dyn Mailer>,
}

impl ReviewService {
    #[must_use]
    pub const fn new(store: Store, mailer: Arc<dyn Mailer>) -> Self {
        Self { store, mailer }
    }

    /// Set a document's review status and notify its owner by email.
    pub async fn update_status(
        &self,
        document_id: i32,
        new_status: &str,
        message: &str,
    ) -> Result<StatusUpdateOutcome, ReviewError> {
        let new_status = new_status.trim();
        let message = message.trim();

        if new_status.is_empty() || message.is_empty() {
            return Err(ReviewError::Validation(
                "Message and status are required".to_string(),
            ));
        }

        let matched = self
            .store
            .update_document_status(document_id, new_status)
            .await?;

        if !matched {
            return Err(ReviewError::DocumentNotFound);
        }

        info!(document_id, status = %new_status, "Document status updated");

        let notified = self.notify_owner(document_id, new_status, message).await;

        Ok(StatusUpdateOutcome {
            document_id,
            status: new_status.to_string(),
            notified,
        })
    }

    /// Best-effort notification. The update has already committed; any
    /// failure here only shows up in logs.
    async fn notify_owner(&self, document_id: i32, new_status: &str, message: &str) -> bool {
        let document = match self.store.get_document(document_id).await {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                warn!(document_id, "Document vanished before notification");
                return false;
            }
            Err(e) => {
                error!(document_id, "Could not load document for notification: {e}");
                return false;
            }
        };

        let user = match self.store.get_user_by_id(document.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!(
                    document_id,
                    user_id = document.user_id,
                    "Document owner not found for notification"
                );
                return false;
            }
            Err(e) => {
                error!(document_id, "Could not load owner for notification: {e}");
                return false;
            }
        };

        self.mailer
            .send(
                std::slice::from_ref(&user.email),
                &MailTemplate::StatusUpdate {
                    username: user.username,
                    document_name: document.original_name,
                    new_status: new_status.to_string(),
                    admin_message: message.to_string(),
                },
            )
            .await
    }
}
