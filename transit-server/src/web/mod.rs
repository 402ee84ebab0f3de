//! Web layer for the transit server.
//!
//! Thin HTTP routing over [`TransitService`](crate::service::TransitService):
//! single-station lookup, radius search and a health check.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
