use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use sde_ops_core::contract::{CopyReceipt, ObjectStore, ServiceError};
use tracing::{debug, info};

/// [`ObjectStore`] backed by S3.
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_sdk_config(config: &SdkConfig) -> Self {
        Self::new(Client::new(config))
    }
}

/// `bucket/key` with the key URL-encoded, as `CopyObject` expects.
pub fn copy_source(bucket: &str, key: &str) -> String {
    format!("{}/{}", bucket, urlencoding::encode(key))
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ServiceError> {
        let output = self.client.get_object().bucket(bucket).key(key).send().await?;
        let bytes = output.body.collect().await?.into_bytes();
        debug!(bucket, key, bytes = bytes.len(), "S3 get_object successful");
        Ok(bytes.to_vec())
    }

    async fn copy_object(
        &self,
        source_bucket: &str,
        source_key: &str,
        target_bucket: &str,
        target_key: &str,
    ) -> Result<CopyReceipt, ServiceError> {
        let output = self
            .client
            .copy_object()
            .copy_source(copy_source(source_bucket, source_key))
            .bucket(target_bucket)
            .key(target_key)
            .acl(ObjectCannedAcl::BucketOwnerFullControl)
            .send()
            .await?;

        let e_tag = output
            .copy_object_result()
            .and_then(|result| result.e_tag())
            .map(str::to_string);
        info!(
            source_bucket,
            target_bucket,
            key = target_key,
            e_tag = ?e_tag,
            "S3 copy successful"
        );
        Ok(CopyReceipt { e_tag })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), ServiceError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await?;
        info!(bucket, key, "S3 delete successful");
        Ok(())
    }

    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, ServiceError> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        let mut keys = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page?;
            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key())
                    .map(str::to_string),
            );
        }
        debug!(bucket, prefix, count = keys.len(), "S3 list successful");
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_source_encodes_the_key_only() {
        assert_eq!(
            copy_source("sde-ingest", "agreement/user@example.com/my file.csv"),
            "sde-ingest/agreement%2Fuser%40example.com%2Fmy%20file.csv"
        );
    }
}
