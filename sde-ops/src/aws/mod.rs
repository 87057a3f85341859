//! AWS SDK implementations of the core contract traits.
//!
//! Each adapter wraps one SDK client and maps SDK errors into the boxed
//! [`ServiceError`](sde_ops_core::contract::ServiceError) the core expects.

pub mod dynamodb;
pub mod logs;
pub mod s3;
pub mod ses;

use aws_config::meta::region::RegionProviderChain;
use aws_config::{BehaviorVersion, Region, SdkConfig};

pub use dynamodb::DynamoNoticeStore;
pub use logs::CloudWatchLogQuery;
pub use s3::S3ObjectStore;
pub use ses::SesEmailSender;

/// Shared SDK config. The region comes from the usual provider chain,
/// falling back to `fallback_region`.
pub async fn load_sdk_config(fallback_region: &str) -> SdkConfig {
    let region_provider =
        RegionProviderChain::default_provider().or_else(Region::new(fallback_region.to_string()));
    let config = aws_config::defaults(BehaviorVersion::latest())
        .region(region_provider)
        .load()
        .await;
    tracing::info!(region = ?config.region(), "Loaded AWS SDK configuration");
    config
}
