//! Static station directory.
//!
//! Maps public station IDs to provider UIDs and holds each station's
//! baseline name and coordinates. Populated per city from the provider's
//! network listing at startup; a refresh replaces a city wholesale.
//! The directory is also the last-resort source when live data fails.

mod ingest;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::{ProviderConfig, Providers};
use crate::domain::{Coordinates, Station, StationUid};
use crate::upstream::{UpstreamClient, UpstreamError, network_url};

pub use ingest::{NetworkCoordinates, NetworkStation, build_city, parse_network};

/// Baseline data for one station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub uid: StationUid,
    pub id: String,
    pub name: String,
    pub coords: Coordinates,
}

impl DirectoryEntry {
    /// A station built from directory data alone, with no vehicles.
    pub fn to_station(&self) -> Station {
        Station::new(self.name.clone(), self.uid, self.id.clone(), self.coords.clone())
    }
}

/// All stations of one city.
///
/// Entries keep their ingestion order; that order breaks distance ties in
/// area queries.
#[derive(Debug, Clone, Default)]
pub struct CityDirectory {
    entries: Vec<DirectoryEntry>,
    by_uid: HashMap<StationUid, usize>,
    by_id: HashMap<String, StationUid>,
}

impl CityDirectory {
    pub fn from_entries(entries: impl IntoIterator<Item = DirectoryEntry>) -> Self {
        let mut city = Self::default();
        for entry in entries {
            city.insert(entry);
        }
        city
    }

    /// Insert an entry. An existing entry with the same UID is replaced in
    /// place.
    pub fn insert(&mut self, entry: DirectoryEntry) {
        match self.by_uid.get(&entry.uid) {
            Some(&idx) => {
                let old_id = std::mem::replace(&mut self.entries[idx].id, entry.id.clone());
                if self.by_id.get(&old_id) == Some(&entry.uid) {
                    self.by_id.remove(&old_id);
                }
                self.by_id.insert(entry.id.clone(), entry.uid);
                self.entries[idx] = entry;
            }
            None => {
                self.by_uid.insert(entry.uid, self.entries.len());
                self.by_id.insert(entry.id.clone(), entry.uid);
                self.entries.push(entry);
            }
        }
    }

    pub fn entry(&self, uid: StationUid) -> Option<&DirectoryEntry> {
        self.by_uid.get(&uid).map(|&idx| &self.entries[idx])
    }

    /// Resolve a public station ID to its UID.
    pub fn uid_for(&self, id: &str) -> Option<StationUid> {
        self.by_id.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Errors from populating one city.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("no provider configured for {0}")]
    UnknownCity(String),

    #[error("failed to fetch station listing: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("failed to parse station listing: {0}")]
    Json(#[from] serde_json::Error),
}

/// Thread-safe directory for all cities.
#[derive(Debug, Default)]
pub struct StationDirectory {
    cities: RwLock<HashMap<String, Arc<CityDirectory>>>,
    ready: AtomicBool,
}

impl StationDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one city, or `None` if it has not been populated.
    pub async fn city(&self, city: &str) -> Option<Arc<CityDirectory>> {
        let guard = self.cities.read().await;
        guard.get(city).cloned()
    }

    /// Look up a single entry.
    pub async fn entry(&self, city: &str, uid: StationUid) -> Option<DirectoryEntry> {
        let guard = self.cities.read().await;
        guard.get(city)?.entry(uid).cloned()
    }

    /// Replace one city's stations wholesale.
    pub async fn replace_city(&self, city: &str, stations: CityDirectory) {
        let mut guard = self.cities.write().await;
        guard.insert(city.to_string(), Arc::new(stations));
    }

    /// Whether a population pass has completed and none is running.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Fetch and install one city's listing.
    ///
    /// Readiness is cleared for the duration. On failure the city's
    /// existing stations are kept.
    pub async fn populate_city(
        &self,
        client: &UpstreamClient,
        city: &str,
        provider: &ProviderConfig,
    ) -> Result<usize, DirectoryError> {
        self.ready.store(false, Ordering::Release);
        let result = self.fetch_city(client, city, provider).await;
        self.ready.store(true, Ordering::Release);
        result
    }

    /// Populate every configured city.
    ///
    /// Readiness is cleared for the duration. Per-city failures are logged
    /// and skipped; the pass itself always completes.
    pub async fn populate_all(&self, client: &UpstreamClient, providers: &Providers) {
        self.ready.store(false, Ordering::Release);

        for city in providers.cities() {
            let Some(provider) = providers.get(city) else {
                continue;
            };
            if let Err(e) = self.fetch_city(client, city, provider).await {
                warn!(city, error = %e, "failed to populate station directory");
            }
        }

        self.ready.store(true, Ordering::Release);
    }

    async fn fetch_city(
        &self,
        client: &UpstreamClient,
        city: &str,
        provider: &ProviderConfig,
    ) -> Result<usize, DirectoryError> {
        let body = client
            .get(&network_url(&provider.base_url), &provider.auth_key)
            .await?;
        let stations = parse_network(&body)?;
        let directory = build_city(&stations);
        let count = directory.len();

        info!(
            city,
            listed = stations.len(),
            kept = count,
            "populated station directory"
        );

        self.replace_city(city, directory).await;
        Ok(count)
    }
}
