//! Normalization of provider arrival payloads.
//!
//! Both protocols deliver the same raw shape: either a single object or an
//! array of objects, one per line serving the station, each with a nested
//! list of vehicles. Station identity always comes from the directory;
//! only vehicles are taken from the payload.

use serde::Deserialize;
use serde_json::Value;

use crate::directory::DirectoryEntry;
use crate::domain::{Coordinates, Station, StationUid, Vehicle};

use super::values;

/// Errors from normalizing an arrivals payload.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("empty station response")]
    Empty,

    #[error("failed to unmarshal station response: {0}")]
    Shape(String),

    #[error("station {0} not found in directory")]
    UnknownStation(String),
}

/// One line's arrivals at a station.
#[derive(Debug, Clone, Default, Deserialize)]
struct RawLine {
    #[serde(default)]
    station_uid: Value,
    #[serde(default)]
    station_id: Value,
    #[serde(default)]
    just_coordinates: Value,
    #[serde(default)]
    line_number: Value,
    #[serde(default)]
    main_line_title: Value,
    #[serde(default)]
    seconds_left: Value,
    #[serde(default)]
    stations_between: Value,
    #[serde(default)]
    vehicles: Option<Vec<RawVehicle>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawVehicle {
    #[serde(default, rename = "garageNo")]
    garage_no: Value,
    #[serde(default)]
    lat: Value,
    #[serde(default)]
    lng: Value,
}

/// A parsed arrivals payload, not yet tied to a directory entry.
#[derive(Debug, Clone)]
pub struct Announcement {
    lines: Vec<RawLine>,
}

impl Announcement {
    /// Accept either an array of line objects or a bare object.
    pub fn parse(payload: Value) -> Result<Self, NormalizeError> {
        let lines: Vec<RawLine> = match payload {
            Value::Array(items) => items
                .into_iter()
                .map(serde_json::from_value)
                .collect::<Result<_, _>>()
                .map_err(shape_error)?,
            obj @ Value::Object(_) => vec![serde_json::from_value(obj).map_err(shape_error)?],
            other => {
                return Err(NormalizeError::Shape(format!(
                    "expected object or array, got {}",
                    json_kind(&other)
                )));
            }
        };

        if lines.is_empty() {
            return Err(NormalizeError::Empty);
        }

        Ok(Self { lines })
    }

    /// UID of the station the payload describes (taken from the first line).
    pub fn station_uid(&self) -> Result<StationUid, NormalizeError> {
        let raw = &self.lines[0].station_uid;
        u64::try_from(values::to_int(raw))
            .ok()
            .and_then(|n| StationUid::new(n).ok())
            .ok_or_else(|| NormalizeError::UnknownStation(values::to_string(raw)))
    }

    /// Whether upstream reports location only, with no live arrivals.
    pub fn coordinates_only(&self) -> bool {
        values::is_set(&self.lines[0].just_coordinates)
    }

    /// Attach the payload's vehicles to the station from `entry`.
    ///
    /// Vehicles from every line are flattened in payload order.
    pub fn into_station(self, entry: &DirectoryEntry) -> Station {
        let payload_id = values::to_string(&self.lines[0].station_id);
        let id = if payload_id.is_empty() {
            entry.id.clone()
        } else {
            payload_id
        };

        let mut station = Station::new(entry.name.clone(), entry.uid, id, entry.coords.clone());

        if self.coordinates_only() {
            return station;
        }

        station.vehicles = self
            .lines
            .iter()
            .flat_map(|line| {
                line.vehicles
                    .iter()
                    .flatten()
                    .map(move |raw| to_vehicle(line, raw))
            })
            .collect();

        station
    }
}

fn to_vehicle(line: &RawLine, raw: &RawVehicle) -> Vehicle {
    Vehicle {
        line_number: values::to_string(&line.line_number),
        line_name: values::to_string(&line.main_line_title),
        seconds_left: values::to_int(&line.seconds_left),
        stations_between: values::to_int(&line.stations_between),
        garage_no: values::to_string(&raw.garage_no),
        coords: Coordinates::new(
            values::format_coord(&raw.lat),
            values::format_coord(&raw.lng),
        ),
    }
}

fn shape_error(err: serde_json::Error) -> NormalizeError {
    NormalizeError::Shape(err.to_string())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
