//! Transit station data server.
//!
//! Aggregates live arrivals from city transit providers, normalizes them
//! into one station shape, and serves them over HTTP with a freshness
//! cache and a static station directory as fallback.

pub mod cache;
pub mod config;
pub mod crypto;
pub mod directory;
pub mod domain;
pub mod service;
pub mod upstream;
pub mod web;
