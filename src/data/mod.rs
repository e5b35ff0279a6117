//! Remote data sources.

pub mod bls;

pub use bls::{BlsClient, BlsConfig, HttpReply, HttpTransport, Transport};
