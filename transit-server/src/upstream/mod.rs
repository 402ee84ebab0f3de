//! Upstream provider access.
//!
//! Providers expose per-city transit data over HTTP in one of two wire
//! formats: plain JSON (`v1`) or an AES-CBC envelope (`v2`). This module
//! holds the shared HTTP client and the normalization of their arrival
//! payloads into canonical stations.

mod announcement;
mod client;
mod error;
pub mod values;

pub use announcement::{Announcement, NormalizeError};
pub use client::{
    AUTH_HEADER, DEVICE_USER_AGENT, UpstreamClient, UpstreamConfig, announcement_url,
    bulletin_url, network_url,
};
pub use error::UpstreamError;
