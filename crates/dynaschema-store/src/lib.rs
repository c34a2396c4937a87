//! Store client boundary for DynaSchema.
//!
//! The schema layer talks to a store only through [`StoreClient`]. Two
//! implementations ship here:
//!
//! - [`MemoryStore`], an in-process engine used by tests and the playground.
//! - [`SdkStore`], a client for a real or local DynamoDB endpoint built on
//!   `aws_sdk_dynamodb`.

#![allow(clippy::doc_markdown)]

pub mod client;
pub mod config;
pub mod memory;
pub mod sdk;

pub use client::{StoreClient, StoreResult};
pub use config::StoreConfig;
pub use memory::MemoryStore;
pub use sdk::SdkStore;
