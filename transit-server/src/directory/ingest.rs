//! Parsing of the provider network listing into directory entries.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::domain::{Coordinates, StationUid};
use crate::upstream::values;

use super::{CityDirectory, DirectoryEntry};

/// Wrapper for the network listing response.
#[derive(Debug, Deserialize)]
pub struct NetworkResponse {
    #[serde(default)]
    pub stations: Vec<NetworkStation>,
}

/// One station as listed by the provider.
///
/// `id` is the provider UID; `station_id` is the public identifier.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkStation {
    #[serde(default)]
    pub name: Value,
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub station_id: Value,
    #[serde(default)]
    pub coordinates: NetworkCoordinates,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkCoordinates {
    #[serde(default)]
    pub latitude: Value,
    #[serde(default)]
    pub longitude: Value,
}

/// Parse a raw network listing body.
pub fn parse_network(body: &[u8]) -> Result<Vec<NetworkStation>, serde_json::Error> {
    let response: NetworkResponse = serde_json::from_slice(body)?;
    Ok(response.stations)
}

/// Convert one listed station into an entry, or `None` if it is unusable.
fn to_entry(station: &NetworkStation) -> Option<DirectoryEntry> {
    let id = values::to_string(&station.station_id);
    if id.is_empty() || id == "0" {
        debug!("skipping station with empty public ID");
        return None;
    }

    let uid = u64::try_from(values::to_int(&station.id))
        .ok()
        .and_then(|n| StationUid::new(n).ok());
    let Some(uid) = uid else {
        debug!(id = %id, "skipping station with invalid UID");
        return None;
    };

    let (Some(lat), Some(lon)) = (
        values::parse_coord(&station.coordinates.latitude),
        values::parse_coord(&station.coordinates.longitude),
    ) else {
        debug!(id = %id, "skipping station with invalid coordinates");
        return None;
    };

    Some(DirectoryEntry {
        uid,
        id,
        name: values::to_string(&station.name),
        coords: Coordinates::new(lat, lon),
    })
}

/// Build a city directory, dropping malformed stations.
pub fn build_city(stations: &[NetworkStation]) -> CityDirectory {
    let mut city = CityDirectory::default();
    for entry in stations.iter().filter_map(to_entry) {
        city.insert(entry);
    }
    city
}
