//! Cluster API access.

pub mod client;

pub use client::{build_client, ClientError};
