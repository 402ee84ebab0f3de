//! Station resolution.
//!
//! [`TransitService`] ties the directory, the freshness cache and the
//! upstream client together. A single station is resolved through the
//! cache first, then the provider's live endpoint, then the static
//! directory. Area queries fan out one resolution per nearby station.

mod area;
mod error;


use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::FreshnessCache;
use crate::config::{ProtocolVersion, ProviderConfig, Providers};
use crate::crypto;
use crate::directory::{DirectoryEntry, DirectoryError, StationDirectory};
use crate::domain::{Station, StationUid, Vehicle};
use crate::upstream::{
    Announcement, NormalizeError, UpstreamClient, announcement_url, bulletin_url,
};

pub use area::nearby;
pub use error::{ProtocolError, ResolveError};

/// How a caller identifies a station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StationQuery {
    /// Provider UID, used as-is.
    Uid(StationUid),
    /// Public station ID, mapped to a UID through the directory.
    Id(String),
}

/// Request body of the encrypted bulletin endpoint, before encryption.
#[derive(Debug, Serialize)]
struct BulletinRequest {
    session_id: String,
    station_uid: String,
}

/// Decrypted bulletin response.
#[derive(Debug, Deserialize)]
struct BulletinEnvelope {
    success: bool,
    #[serde(default)]
    data: Value,
}

/// Session IDs only need to differ between requests, not be secret.
fn session_id() -> String {
    format!("A{}", chrono::Utc::now().timestamp())
}

/// Set the fields every returned station carries.
fn finish(mut station: Station, vehicles: Vec<Vehicle>) -> Station {
    station.stop_id = station.id.clone();
    station.vehicles = vehicles;
    station
}

/// Station resolution service shared by all request handlers.
///
/// Cheap to clone; clones share the cache, the directory and the HTTP
/// connection pool.
#[derive(Clone)]
pub struct TransitService {
    providers: Arc<Providers>,
    client: UpstreamClient,
    cache: Arc<FreshnessCache>,
    directory: Arc<StationDirectory>,
}

impl TransitService {
    pub fn new(
        providers: Providers,
        client: UpstreamClient,
        cache: Arc<FreshnessCache>,
        directory: Arc<StationDirectory>,
    ) -> Self {
        Self {
            providers: Arc::new(providers),
            client,
            cache,
            directory,
        }
    }

    pub fn directory(&self) -> &StationDirectory {
        &self.directory
    }

    pub fn cache(&self) -> &FreshnessCache {
        &self.cache
    }

    fn provider(&self, city: &str) -> Result<Arc<ProviderConfig>, ResolveError> {
        self.providers
            .get(city)
            .cloned()
            .ok_or_else(|| ResolveError::UnknownCity(city.to_string()))
    }

    /// Populate (or refresh) the directory for one city.
    ///
    /// The readiness flag is cleared until the fetch returns.
    pub async fn populate(&self, city: &str) -> Result<usize, DirectoryError> {
        let provider = self
            .providers
            .get(city)
            .ok_or_else(|| DirectoryError::UnknownCity(city.to_string()))?;
        self.directory
            .populate_city(&self.client, city, provider)
            .await
    }

    /// Populate the directory for every configured city.
    ///
    /// The readiness flag is cleared until the pass completes.
    pub async fn populate_all(&self) {
        info!(cities = self.providers.len(), "populating station directory");
        self.directory
            .populate_all(&self.client, &self.providers)
            .await;
    }

    /// Resolve one station with its live vehicles.
    ///
    /// Order of sources: both caches, then the provider, then the
    /// directory entry. A plaintext provider that fails is answered from
    /// the directory (and that answer is cached); an encrypted provider
    /// that fails is an error.
    pub async fn resolve(&self, city: &str, query: &StationQuery) -> Result<Station, ResolveError> {
        let provider = self.provider(city)?;
        let city_dir = self.directory.city(city).await;

        let (uid, id) = match query {
            StationQuery::Id(id) => {
                let dir = city_dir.as_ref().ok_or_else(|| ResolveError::NotReady {
                    city: city.to_string(),
                })?;
                let uid = dir
                    .uid_for(id)
                    .ok_or_else(|| ResolveError::InvalidStation(id.clone()))?;
                (uid, id.clone())
            }
            StationQuery::Uid(uid) => {
                let id = city_dir
                    .as_ref()
                    .and_then(|dir| dir.entry(*uid))
                    .map(|entry| entry.id.clone())
                    .unwrap_or_else(|| format!("#{uid}"));
                (*uid, id)
            }
        };
        let entry = city_dir.as_ref().and_then(|dir| dir.entry(uid)).cloned();

        let cached_station = self.cache.get_station(city, &id).await;
        let cached_vehicles = self.cache.get_vehicles(city, &id).await;

        if let (Some(station), Some(vehicles)) = (&cached_station, &cached_vehicles) {
            debug!(city, id = %id, "station served from cache");
            return Ok(finish(station.clone(), vehicles.clone()));
        }

        let payload = match provider.protocol {
            ProtocolVersion::Plaintext => {
                match self.fetch_announcement(city, &provider, uid).await {
                    Some(payload) => Some(payload),
                    None => {
                        if let Some(entry) = &entry {
                            return Ok(self.directory_fallback(city, &id, entry).await);
                        }
                        None
                    }
                }
            }
            ProtocolVersion::Encrypted => Some(self.fetch_bulletin(&provider, uid).await?),
        };

        if let Some(payload) = payload {
            match self.normalize(city, payload).await {
                Ok(station) => {
                    let (station, vehicles) = station.split_vehicles();
                    debug!(
                        city,
                        id = %id,
                        %uid,
                        vehicles = vehicles.len(),
                        "fetched live station data"
                    );
                    self.cache.set_station(city, &id, station.clone()).await;
                    self.cache.set_vehicles(city, &id, vehicles.clone()).await;
                    return Ok(finish(station, vehicles));
                }
                Err(e) => {
                    warn!(city, id = %id, %uid, error = %e, "failed to normalize station data");
                }
            }
        }

        let station = cached_station.or_else(|| entry.as_ref().map(DirectoryEntry::to_station));
        match station {
            Some(station) => Ok(finish(station, cached_vehicles.unwrap_or_default())),
            None => Err(ResolveError::NotFound(id)),
        }
    }

    /// Answer from the directory alone and cache that answer.
    async fn directory_fallback(&self, city: &str, id: &str, entry: &DirectoryEntry) -> Station {
        let station = entry.to_station();
        self.cache.set_station(city, id, station.clone()).await;
        self.cache.set_vehicles(city, id, Vec::new()).await;
        finish(station, Vec::new())
    }

    /// Plaintext arrivals. `None` when the request fails or the body is not
    /// JSON.
    async fn fetch_announcement(
        &self,
        city: &str,
        provider: &ProviderConfig,
        uid: StationUid,
    ) -> Option<Value> {
        let url = announcement_url(&provider.base_url, uid);
        let body = match self.client.get(&url, &provider.auth_key).await {
            Ok(body) => body,
            Err(e) => {
                warn!(city, %uid, error = %e, "announcement request failed");
                return None;
            }
        };

        match serde_json::from_slice(&body) {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!(city, %uid, error = %e, "announcement body is not JSON");
                None
            }
        }
    }

    /// Encrypted bulletin exchange. Every failure is surfaced.
    async fn fetch_bulletin(
        &self,
        provider: &ProviderConfig,
        uid: StationUid,
    ) -> Result<Value, ResolveError> {
        let cipher = provider
            .cipher
            .as_ref()
            .ok_or(ProtocolError::MissingCipher)?;

        let request = BulletinRequest {
            session_id: session_id(),
            station_uid: uid.to_string(),
        };
        let json = serde_json::to_string(&request).map_err(ProtocolError::RequestEncoding)?;
        let encrypted =
            crypto::encrypt(&json, &cipher.key, &cipher.iv).map_err(ProtocolError::Encrypt)?;

        let body = self
            .client
            .post_form(
                &bulletin_url(&provider.base_url),
                &provider.auth_key,
                format!("action=data_bulletin&base={encrypted}"),
            )
            .await?;

        let decrypted = crypto::decrypt(&String::from_utf8_lossy(&body), &cipher.key, &cipher.iv)
            .map_err(ProtocolError::Decrypt)?;
        let envelope: BulletinEnvelope =
            serde_json::from_str(&decrypted).map_err(ProtocolError::Envelope)?;

        if !envelope.success {
            return Err(ResolveError::InvalidStation(uid.to_string()));
        }

        Ok(envelope.data)
    }

    /// Turn a raw payload into a station from the directory plus the
    /// payload's vehicles.
    async fn normalize(&self, city: &str, payload: Value) -> Result<Station, NormalizeError> {
        let announcement = Announcement::parse(payload)?;
        let uid = announcement.station_uid()?;
        let entry = self
            .directory
            .entry(city, uid)
            .await
            .ok_or_else(|| NormalizeError::UnknownStation(uid.to_string()))?;
        Ok(announcement.into_station(&entry))
    }
}
