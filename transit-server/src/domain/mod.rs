//! Domain types for the transit aggregator.
//!
//! Stations and vehicles in their canonical, provider-independent shape,
//! plus the geographic helpers used by area queries.

pub mod geo;
mod station;

pub use station::{Coordinates, InvalidStationUid, Station, StationUid, Vehicle};
