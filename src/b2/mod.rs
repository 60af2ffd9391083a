//! Backblaze B2 API client

pub mod buckets;
pub mod client;
pub mod endpoints;
pub mod errors;
pub mod files;
pub mod types;

pub use client::B2Client;
pub use endpoints::Endpoint;
pub use errors::{B2Error, Result};
pub use types::*;
