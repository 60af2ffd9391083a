//! Client library for the Backblaze B2 cloud storage API
//!
//! Authorize once with [`B2Client::authorize`], then use the returned client
//! for bucket and file operations. Every operation is a single request/response
//! round trip; failures come back as [`B2Error`].

pub mod b2;
pub mod config;

pub use b2::{B2Client, B2Error};
pub use config::ClientConfig;
