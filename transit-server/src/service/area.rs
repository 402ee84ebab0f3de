//! Radius queries over a city's directory.

use futures::future::join_all;
use tracing::{debug, warn};

use crate::directory::{CityDirectory, DirectoryEntry};
use crate::domain::{Station, geo};

use super::{ResolveError, StationQuery, TransitService};

/// Directory entries within `radius` metres of (`lat`, `lon`), nearest
/// first, paired with their distance.
///
/// Entries with equal distance keep directory order.
pub fn nearby(
    directory: &CityDirectory,
    lat: f64,
    lon: f64,
    radius: f64,
) -> Vec<(DirectoryEntry, f64)> {
    let mut matches: Vec<(DirectoryEntry, f64)> = directory
        .iter()
        .filter_map(|entry| {
            let (entry_lat, entry_lon) = entry.coords.to_f64()?;
            let distance = geo::distance_m(lat, lon, entry_lat, entry_lon);
            (distance <= radius).then(|| (entry.clone(), distance))
        })
        .collect();

    matches.sort_by(|a, b| a.1.total_cmp(&b.1));
    matches
}

impl TransitService {
    /// All stations within `radius` metres, nearest first, each with live
    /// vehicles where available.
    ///
    /// Stations are resolved concurrently. A station whose resolution fails
    /// is still returned, with no vehicles.
    pub async fn stations_within(
        &self,
        city: &str,
        lat: f64,
        lon: f64,
        radius: f64,
    ) -> Result<Vec<Station>, ResolveError> {
        self.provider(city)?;
        let directory = self
            .directory
            .city(city)
            .await
            .ok_or_else(|| ResolveError::NotReady {
                city: city.to_string(),
            })?;

        let candidates = nearby(&directory, lat, lon, radius);
        debug!(city, lat, lon, radius, found = candidates.len(), "area query");

        let handles = candidates.iter().map(|(entry, _)| {
            let service = self.clone();
            let city = city.to_string();
            let query = StationQuery::Id(entry.id.clone());
            tokio::spawn(async move { service.resolve(&city, &query).await })
        });
        let results = join_all(handles).await;

        let stations = candidates
            .into_iter()
            .zip(results)
            .map(|((entry, distance), result)| {
                let mut station = entry.to_station();
                station.distance = Some(distance);

                match result {
                    Ok(Ok(resolved)) => station.vehicles = resolved.vehicles,
                    Ok(Err(e)) => {
                        warn!(city, id = %entry.id, error = %e, "failed to resolve station in area");
                    }
                    Err(e) => {
                        warn!(city, id = %entry.id, error = %e, "station resolution task failed");
                    }
                }

                station
            })
            .collect();

        Ok(stations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Coordinates, StationUid};

    fn entry(uid: u64, lat: &str, lon: &str) -> DirectoryEntry {
        DirectoryEntry {
            uid: StationUid::new(uid).unwrap(),
            id: format!("s{uid}"),
            name: format!("Station {uid}"),
            coords: Coordinates::new(lat, lon),
        }
    }

    fn ids(matches: &[(DirectoryEntry, f64)]) -> Vec<&str> {
        matches.iter().map(|(e, _)| e.id.as_str()).collect()
    }

    #[test]
    fn filters_and_sorts_by_distance() {
        let directory = CityDirectory::from_entries([
            entry(3, "44.8100000000", "20.4000000000"),
            entry(4, "44.9000000000", "20.4000000000"),
            entry(1, "44.8000000000", "20.4000000000"),
            entry(2, "44.8010000000", "20.4000000000"),
        ]);

        let matches = nearby(&directory, 44.8, 20.4, 2_000.0);
        assert_eq!(ids(&matches), vec!["s1", "s2", "s3"]);

        let distances: Vec<f64> = matches.iter().map(|(_, d)| *d).collect();
        assert_eq!(distances[0], 0.0);
        assert!(distances.windows(2).all(|w| w[0] < w[1]));
        assert!(distances.iter().all(|d| *d <= 2_000.0));
    }

    #[test]
    fn radius_is_inclusive() {
        let directory = CityDirectory::from_entries([entry(1, "44.8100000000", "20.4000000000")]);
        let exact = geo::distance_m(44.8, 20.4, 44.81, 20.4);

        assert_eq!(nearby(&directory, 44.8, 20.4, exact).len(), 1);
        assert!(nearby(&directory, 44.8, 20.4, exact - 0.001).is_empty());
    }

    #[test]
    fn ties_keep_directory_order() {
        let directory = CityDirectory::from_entries([
            entry(7, "44.8050000000", "20.4000000000"),
            entry(5, "44.8050000000", "20.4000000000"),
        ]);

        let matches = nearby(&directory, 44.8, 20.4, 5_000.0);
        assert_eq!(ids(&matches), vec!["s7", "s5"]);
    }

    #[test]
    fn empty_directory_and_zero_radius() {
        assert!(nearby(&CityDirectory::default(), 44.8, 20.4, 1_000.0).is_empty());

        let directory = CityDirectory::from_entries([
            entry(1, "44.8000000000", "20.4000000000"),
            entry(2, "44.8010000000", "20.4000000000"),
        ]);
        assert_eq!(ids(&nearby(&directory, 44.8, 20.4, 0.0)), vec!["s1"]);
    }
}
