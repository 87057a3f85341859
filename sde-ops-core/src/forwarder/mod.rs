//! Data-in forwarder: validates an uploaded CSV and routes it onwards.
//!
//! One invocation handles one S3 upload notification:
//!   1. Read bucket, key and size from the event; a malformed event is a 400
//!      and nothing else happens.
//!   2. Validate the object (see [`validation`]).
//!   3. Invalid: email the failure reason to the uploader, then move the
//!      object to the rejected bucket. Valid: move it to the pending bucket,
//!      then email a receipt.
//!
//! Moves are copy-then-delete and are not atomic. Every external call is made
//! once, in sequence, and the first operational failure ends the invocation
//! with a 500 naming the step that failed.

pub mod event;
pub mod templates;
pub mod validation;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};

use crate::config::ForwarderConfig;
use crate::contract::{EmailMessage, EmailSender, ObjectStore, ServiceError};
pub use event::{ImportObject, MalformedEvent};
pub use validation::{validate_import, ValidationFailure, ValidationOutcome};

/// Where a validated object ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Pending,
    Rejected,
}

impl Destination {
    pub fn label(self) -> &'static str {
        match self {
            Destination::Pending => "pending",
            Destination::Rejected => "rejected",
        }
    }

    pub fn bucket(self, config: &ForwarderConfig) -> &str {
        match self {
            Destination::Pending => &config.pending_bucket,
            Destination::Rejected => &config.rejected_bucket,
        }
    }
}

#[derive(Debug, Error)]
pub enum MoveError {
    #[error("failed to copy object to {bucket}")]
    Copy {
        bucket: String,
        #[source]
        source: ServiceError,
    },
    #[error("copy to {0} returned no ETag")]
    Unconfirmed(String),
    #[error("failed to delete object from {bucket}")]
    Delete {
        bucket: String,
        #[source]
        source: ServiceError,
    },
}

/// What the forwarder hands back to its invoker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForwarderResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl ForwarderResponse {
    pub const OK: u16 = 200;
    pub const BAD_REQUEST: u16 = 400;
    pub const INTERNAL_SERVER_ERROR: u16 = 500;

    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status_code: Self::OK,
            body: body.into(),
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self::with_message(Self::BAD_REQUEST, message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::with_message(Self::INTERNAL_SERVER_ERROR, message)
    }

    fn with_message(status_code: u16, message: &str) -> Self {
        Self {
            status_code,
            body: serde_json::json!({ "message": message }).to_string(),
        }
    }

    /// The `message` of an error body, if the body is one.
    pub fn message(&self) -> Option<String> {
        serde_json::from_str::<Value>(&self.body)
            .ok()?
            .get("message")?
            .as_str()
            .map(str::to_string)
    }
}

/// The forwarder with its clients injected.
pub struct Forwarder<S, E> {
    store: S,
    mailer: E,
    config: ForwarderConfig,
}

impl<S, E> Forwarder<S, E>
where
    S: ObjectStore,
    E: EmailSender,
{
    pub fn new(store: S, mailer: E, config: ForwarderConfig) -> Self {
        Self {
            store,
            mailer,
            config,
        }
    }

    pub fn config(&self) -> &ForwarderConfig {
        &self.config
    }

    /// Handle one upload notification.
    pub async fn handle(&self, event: &Value) -> ForwarderResponse {
        let object = match ImportObject::from_event(event) {
            Ok(object) => object,
            Err(e) => {
                error!(error = %e, "[FORWARD] Malformed upload event");
                return ForwarderResponse::bad_request(&e.to_string());
            }
        };
        let (agreement, user) = match object.agreement_and_user() {
            Ok(parts) => parts,
            Err(e) => {
                error!(key = %object.key, error = %e, "[FORWARD] Malformed object key");
                return ForwarderResponse::bad_request(&e.to_string());
            }
        };

        info!(
            uri = %object.s3_uri(),
            size = object.size,
            agreement = %agreement,
            "[FORWARD] Validating imported object"
        );

        match validate_import(&object, &self.store, &self.config).await {
            ValidationOutcome::Valid => self.accept(&object, agreement, user).await,
            ValidationOutcome::Invalid(failure) => {
                self.reject(&object, agreement, user, &failure).await
            }
        }
    }

    async fn reject(
        &self,
        object: &ImportObject,
        agreement: &str,
        user: &str,
        failure: &ValidationFailure,
    ) -> ForwarderResponse {
        let message = format!("Imported data {} failed validation", object.s3_uri());
        error!(reason = %failure, "[FORWARD] {message}");

        let subject = format!(
            "There is a technical error with your reference data file {}",
            object.file_name()
        );
        let body = templates::render_failure(agreement, object.file_name(), &failure.to_string());
        if let Err(e) = self.notify(user, subject, body).await {
            let message = "Failed to send validation failure notification email to user.";
            error!(error = ?e, "[FORWARD][ERROR] {message}");
            return ForwarderResponse::internal_error(message);
        }

        if let Err(e) = self.move_object(object, Destination::Rejected).await {
            let message = format!(
                "Failed to move data object {} to rejected bucket",
                object.s3_uri()
            );
            error!(error = ?e, "[FORWARD][ERROR] {message}");
            return ForwarderResponse::internal_error(&message);
        }

        ForwarderResponse::internal_error(&message)
    }

    async fn accept(&self, object: &ImportObject, agreement: &str, user: &str) -> ForwarderResponse {
        if let Err(e) = self.move_object(object, Destination::Pending).await {
            let message = format!(
                "Failed to move data object {} to pending bucket",
                object.s3_uri()
            );
            error!(error = ?e, "[FORWARD][ERROR] {message}");
            return ForwarderResponse::internal_error(&message);
        }

        let subject = format!(
            "We have received your reference data file {}",
            object.file_name()
        );
        let body = templates::render_success(agreement, object.file_name());
        if let Err(e) = self.notify(user, subject, body).await {
            let message = "Failed to send validation success notification email to user.";
            error!(error = ?e, "[FORWARD][ERROR] {message}");
            return ForwarderResponse::internal_error(message);
        }

        let body = format!("Object {} forwarded successfully", object.s3_uri());
        info!("[FORWARD] {body}");
        ForwarderResponse::ok(body)
    }

    /// Email the uploader. A template that failed to render counts as a failed send.
    async fn notify(
        &self,
        user: &str,
        subject: String,
        body: Result<String, minijinja::Error>,
    ) -> Result<(), ServiceError> {
        let email = EmailMessage {
            source: self.config.source_email.clone(),
            to: vec![user.to_string()],
            subject,
            html_body: body?,
        };
        self.mailer.send_email(&email).await
    }

    /// Copy the object to `destination` under the same key, then delete the original.
    pub async fn move_object(
        &self,
        object: &ImportObject,
        destination: Destination,
    ) -> Result<(), MoveError> {
        let target = destination.bucket(&self.config);
        info!(
            uri = %object.s3_uri(),
            target_bucket = %target,
            destination = destination.label(),
            "[FORWARD] Moving object"
        );

        let receipt = self
            .store
            .copy_object(&object.bucket, &object.key, target, &object.key)
            .await
            .map_err(|source| MoveError::Copy {
                bucket: target.to_string(),
                source,
            })?;
        if !receipt.is_confirmed() {
            return Err(MoveError::Unconfirmed(target.to_string()));
        }

        self.store
            .delete_object(&object.bucket, &object.key)
            .await
            .map_err(|source| MoveError::Delete {
                bucket: object.bucket.clone(),
                source,
            })?;
        Ok(())
    }
}
