//! Freshness cache for station and vehicle data.
//!
//! Two independent namespaces with different lifetimes: station metadata
//! changes rarely (24 hour TTL) while vehicle positions go stale within
//! seconds (30 second TTL). Expired entries read as absent; a background
//! sweep runs moka's pending maintenance so they are also evicted.
//!
//! Only successful fetches are stored. Entries are replaced wholesale on
//! refresh, never patched.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::domain::{Station, Vehicle};

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for station metadata.
    pub station_ttl: Duration,

    /// TTL for vehicle lists.
    pub vehicle_ttl: Duration,

    /// Maximum number of entries per namespace.
    pub max_capacity: u64,

    /// How often the background sweep runs.
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            station_ttl: Duration::from_secs(24 * 60 * 60),
            vehicle_ttl: Duration::from_secs(30),
            max_capacity: 50_000,
            sweep_interval: Duration::from_secs(5 * 60),
        }
    }
}

/// Two-namespace cache keyed by city and public station ID.
pub struct FreshnessCache {
    /// Vehicle-less station snapshots, keyed `{city}:{id}`.
    stations: MokaCache<String, Station>,

    /// Vehicle lists, keyed `{city}:{id}:vehicles`.
    vehicles: MokaCache<String, Vec<Vehicle>>,

    sweep_interval: Duration,
}

impl FreshnessCache {
    pub fn new(config: &CacheConfig) -> Self {
        let stations = MokaCache::builder()
            .time_to_live(config.station_ttl)
            .max_capacity(config.max_capacity)
            .build();
        let vehicles = MokaCache::builder()
            .time_to_live(config.vehicle_ttl)
            .max_capacity(config.max_capacity)
            .build();

        Self {
            stations,
            vehicles,
            sweep_interval: config.sweep_interval,
        }
    }

    fn station_key(city: &str, station_id: &str) -> String {
        format!("{city}:{station_id}")
    }

    fn vehicle_key(city: &str, station_id: &str) -> String {
        format!("{city}:{station_id}:vehicles")
    }

    /// Cached station snapshot (without vehicles), if fresh.
    pub async fn get_station(&self, city: &str, station_id: &str) -> Option<Station> {
        self.stations
            .get(&Self::station_key(city, station_id))
            .await
    }

    /// Cached vehicle list, if fresh.
    pub async fn get_vehicles(&self, city: &str, station_id: &str) -> Option<Vec<Vehicle>> {
        self.vehicles
            .get(&Self::vehicle_key(city, station_id))
            .await
    }

    pub async fn set_station(&self, city: &str, station_id: &str, station: Station) {
        self.stations
            .insert(Self::station_key(city, station_id), station)
            .await;
    }

    pub async fn set_vehicles(&self, city: &str, station_id: &str, vehicles: Vec<Vehicle>) {
        self.vehicles
            .insert(Self::vehicle_key(city, station_id), vehicles)
            .await;
    }

    /// Evict expired entries from both namespaces.
    pub async fn sweep(&self) {
        self.stations.run_pending_tasks().await;
        self.vehicles.run_pending_tasks().await;
    }

    /// Number of stored entries as of the last sweep.
    pub fn entry_count(&self) -> u64 {
        self.stations.entry_count() + self.vehicles.entry_count()
    }

    /// Run [`sweep`](Self::sweep) periodically for the life of the process.
    pub fn spawn_sweeper(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.sweep_interval);
            interval.tick().await; // First tick is immediate, skip it
            loop {
                interval.tick().await;
                self.sweep().await;
                debug!(
                    stations = self.stations.entry_count(),
                    vehicles = self.vehicles.entry_count(),
                    "swept expired cache entries"
                );
            }
        })
    }
}
