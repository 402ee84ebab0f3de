//! Station and vehicle types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an invalid upstream station UID.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid station UID: {reason}")]
pub struct InvalidStationUid {
    reason: &'static str,
}

/// A provider's internal numeric station identifier.
///
/// UIDs are always positive; zero is what upstream directories use for
/// "missing", so it is rejected here.
///
/// # Examples
///
/// ```
/// use transit_server::domain::StationUid;
///
/// let uid = StationUid::parse("4567").unwrap();
/// assert_eq!(uid.get(), 4567);
///
/// assert!(StationUid::parse("0").is_err());
/// assert!(StationUid::parse("abc").is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationUid(u64);

impl StationUid {
    /// Parse a UID from its decimal string form.
    pub fn parse(s: &str) -> Result<Self, InvalidStationUid> {
        let value: u64 = s.trim().parse().map_err(|_| InvalidStationUid {
            reason: "must be a decimal integer",
        })?;
        Self::new(value)
    }

    /// Wrap a raw integer UID.
    pub fn new(value: u64) -> Result<Self, InvalidStationUid> {
        if value == 0 {
            return Err(InvalidStationUid {
                reason: "must be non-zero",
            });
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for StationUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StationUid({})", self.0)
    }
}

impl fmt::Display for StationUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A latitude/longitude pair kept as decimal strings.
///
/// Serializes as a two-element JSON array `["lat", "lon"]`. Strings are kept
/// verbatim so coordinates never drift through float round-trips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinates(String, String);

impl Coordinates {
    pub fn new(lat: impl Into<String>, lon: impl Into<String>) -> Self {
        Self(lat.into(), lon.into())
    }

    /// Parse both components as `f64`, if they are numeric.
    pub fn to_f64(&self) -> Option<(f64, f64)> {
        let lat = self.0.parse().ok()?;
        let lon = self.1.parse().ok()?;
        Some((lat, lon))
    }
}

/// An incoming vehicle as reported for a station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub line_number: String,
    pub line_name: String,
    pub seconds_left: i64,
    pub stations_between: i64,
    pub garage_no: String,
    pub coords: Coordinates,
}

/// Canonical station record returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub name: String,
    pub uid: StationUid,
    /// Public-facing station identifier.
    pub id: String,
    /// Always equal to `id`.
    pub stop_id: String,
    pub coords: Coordinates,
    /// Distance in metres from the query point; set only by area queries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    /// Vehicles in the order the upstream returned them.
    #[serde(default)]
    pub vehicles: Vec<Vehicle>,
}

impl Station {
    /// Build a station with no vehicles and no distance.
    pub fn new(
        name: impl Into<String>,
        uid: StationUid,
        id: impl Into<String>,
        coords: Coordinates,
    ) -> Self {
        let id = id.into();
        Self {
            name: name.into(),
            uid,
            stop_id: id.clone(),
            id,
            coords,
            distance: None,
            vehicles: Vec::new(),
        }
    }

    /// Split into a vehicle-less snapshot and the vehicle list.
    pub fn split_vehicles(mut self) -> (Station, Vec<Vehicle>) {
        let vehicles = std::mem::take(&mut self.vehicles);
        (self, vehicles)
    }
}
