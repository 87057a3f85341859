use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ses::types::{Body, Content, Destination, Message};
use aws_sdk_ses::Client;
use sde_ops_core::contract::{EmailMessage, EmailSender, ServiceError};
use tracing::info;

const CHARSET: &str = "UTF-8";

/// [`EmailSender`] backed by SES.
pub struct SesEmailSender {
    client: Client,
}

impl SesEmailSender {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_sdk_config(config: &SdkConfig) -> Self {
        Self::new(Client::new(config))
    }
}

fn content(data: &str) -> Result<Content, ServiceError> {
    Ok(Content::builder().data(data).charset(CHARSET).build()?)
}

#[async_trait]
impl EmailSender for SesEmailSender {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), ServiceError> {
        let destination = Destination::builder()
            .set_to_addresses(Some(message.to.clone()))
            .build();
        let body = Body::builder().html(content(&message.html_body)?).build();
        let ses_message = Message::builder()
            .subject(content(&message.subject)?)
            .body(body)
            .build();

        let output = self
            .client
            .send_email()
            .source(&message.source)
            .destination(destination)
            .message(ses_message)
            .send()
            .await?;
        info!(message_id = output.message_id(), "SES email sent");
        Ok(())
    }
}
