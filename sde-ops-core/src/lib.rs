#![doc = "sde-ops-core: handlers behind the SDE operational functions."]

//! This crate holds the business logic for the platform's small operational
//! functions. Every external service is reached through a trait in
//! [`contract`], so the AWS SDK and HTTP clients live in the `sde-ops` crate
//! and tests run entirely against `mockall` mocks.
//!
//! # Modules
//! - [`forwarder`]: validates a CSV upload and routes it to the pending or rejected bucket.
//! - [`banner`]: weekly maintenance banner and operator-authored portal notices.
//! - [`alert`]: turns CloudWatch alarms and ECS task events into Slack blocks.
//! - [`config`]: settings structs shared by the handlers.

pub mod alert;
pub mod banner;
pub mod config;
pub mod contract;
pub mod forwarder;
