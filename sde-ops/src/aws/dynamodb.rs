use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use sde_ops_core::contract::{Notice, NoticeStore, ServiceError};

/// [`NoticeStore`] backed by a DynamoDB table.
pub struct DynamoNoticeStore {
    client: Client,
}

impl DynamoNoticeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_sdk_config(config: &SdkConfig) -> Self {
        Self::new(Client::new(config))
    }
}

#[async_trait]
impl NoticeStore for DynamoNoticeStore {
    async fn check_access(&self, table: &str) -> Result<(), ServiceError> {
        self.client.describe_table().table_name(table).send().await?;
        Ok(())
    }

    async fn put_notice(&self, table: &str, notice: &Notice) -> Result<(), ServiceError> {
        self.client
            .put_item()
            .table_name(table)
            .item("noticeId", AttributeValue::S(notice.notice_id.clone()))
            .item("notification", AttributeValue::S(notice.notification.clone()))
            .item("startPeriod", AttributeValue::N(notice.start_period.to_string()))
            .item("expiryPeriod", AttributeValue::N(notice.expiry_period.to_string()))
            .item("colour", AttributeValue::S(notice.colour.clone()))
            .send()
            .await?;
        Ok(())
    }
}
