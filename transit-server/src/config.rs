//! Provider and server configuration.
//!
//! Each city is served by one upstream provider. Providers come either from
//! a JSON file keyed by city code, or from `<CITY>_API_*` environment
//! variables for the cities listed in `TRANSIT_CITIES`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

/// Cities configured when `TRANSIT_CITIES` is not set.
const DEFAULT_CITIES: &str = "bg,ns,nis";

/// Default listen address.
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";

/// Wire protocol spoken by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    /// `v1`: plain JSON over GET.
    Plaintext,
    /// `v2`: AES-CBC envelope over form-encoded POST.
    Encrypted,
}

impl ProtocolVersion {
    /// Interpret a protocol tag. Only `v1` selects plaintext; any other
    /// tag, including an absent one, selects the encrypted protocol.
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag.map(str::trim) {
            Some("v1") => Self::Plaintext,
            _ => Self::Encrypted,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plaintext => "v1",
            Self::Encrypted => "v2",
        }
    }
}

/// Base64 AES key and IV for the encrypted protocol.
#[derive(Clone, PartialEq, Eq)]
pub struct CipherKeys {
    pub key: String,
    pub iv: String,
}

impl std::fmt::Debug for CipherKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CipherKeys(..)")
    }
}

/// Validated configuration for one city's upstream provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Display name of the city/provider.
    pub name: String,
    /// Base URL, without a trailing slash.
    pub base_url: String,
    /// Value of the authentication header.
    pub auth_key: String,
    pub protocol: ProtocolVersion,
    /// Present whenever `protocol` is `Encrypted`.
    pub cipher: Option<CipherKeys>,
}

/// Unvalidated provider fields, as read from a file or the environment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProvider {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub api: Option<String>,
    #[serde(default)]
    pub v2_key: Option<String>,
    #[serde(default)]
    pub v2_iv: Option<String>,
}

impl ProviderConfig {
    /// Validate raw fields for `city`.
    pub fn from_raw(city: &str, raw: RawProvider) -> Result<Self, ConfigError> {
        let required = |value: Option<String>, field: &'static str| {
            non_empty(value).ok_or_else(|| ConfigError::MissingField {
                city: city.to_string(),
                field,
            })
        };

        let name = required(raw.name, "name")?;
        let base_url = required(raw.url, "url")?
            .trim_end_matches('/')
            .to_string();
        let auth_key = required(raw.key, "key")?;

        let protocol = ProtocolVersion::from_tag(raw.api.as_deref());

        let cipher = match (non_empty(raw.v2_key), non_empty(raw.v2_iv)) {
            (Some(key), Some(iv)) => Some(CipherKeys { key, iv }),
            _ => None,
        };

        if protocol == ProtocolVersion::Encrypted && cipher.is_none() {
            return Err(ConfigError::MissingCipher {
                city: city.to_string(),
            });
        }

        Ok(Self {
            name,
            base_url,
            auth_key,
            protocol,
            cipher,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// All configured providers, keyed by city code.
#[derive(Debug, Clone, Default)]
pub struct Providers {
    by_city: HashMap<String, Arc<ProviderConfig>>,
}

impl Providers {
    /// Validate every entry; the first invalid one fails the whole load.
    pub fn from_raw(raw: HashMap<String, RawProvider>) -> Result<Self, ConfigError> {
        let mut by_city = HashMap::with_capacity(raw.len());
        for (city, fields) in raw {
            let provider = ProviderConfig::from_raw(&city, fields)?;
            tracing::info!(
                city = %city,
                name = %provider.name,
                api = provider.protocol.as_str(),
                "loaded provider"
            );
            by_city.insert(city, Arc::new(provider));
        }
        Ok(Self { by_city })
    }

    /// Load from `<CITY>_API_*` variables via `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let cities = lookup("TRANSIT_CITIES").unwrap_or_else(|| DEFAULT_CITIES.to_string());

        let raw = cities
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|city| {
                let prefix = city.to_uppercase();
                let var = |suffix: &str| lookup(&format!("{prefix}_API_{suffix}"));
                let fields = RawProvider {
                    name: var("NAME"),
                    url: var("URL"),
                    key: var("KEY"),
                    api: var("VERSION"),
                    v2_key: var("V2_KEY"),
                    v2_iv: var("V2_IV"),
                };
                (city.to_lowercase(), fields)
            })
            .collect();

        Self::from_raw(raw)
    }

    /// Load from a JSON file: `{"bg": {"name": ..., "url": ..., ...}, ...}`.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {e}", path.display())))?;
        let raw: HashMap<String, RawProvider> =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        Self::from_raw(raw)
    }

    /// Build directly from validated configs.
    pub fn from_configs(configs: impl IntoIterator<Item = (String, ProviderConfig)>) -> Self {
        Self {
            by_city: configs
                .into_iter()
                .map(|(city, config)| (city, Arc::new(config)))
                .collect(),
        }
    }

    pub fn get(&self, city: &str) -> Option<&Arc<ProviderConfig>> {
        self.by_city.get(city)
    }

    /// City codes in sorted order.
    pub fn cities(&self) -> Vec<&str> {
        let mut cities: Vec<&str> = self.by_city.keys().map(String::as_str).collect();
        cities.sort_unstable();
        cities
    }

    pub fn len(&self) -> usize {
        self.by_city.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_city.is_empty()
    }
}

/// Process-level configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub providers: Providers,
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` for variable access.
    ///
    /// `TRANSIT_PROVIDERS_FILE`, when set, takes precedence over the
    /// per-city variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind = lookup("TRANSIT_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddr(bind.clone()))?;

        let providers = match lookup("TRANSIT_PROVIDERS_FILE").and_then(|p| non_empty(Some(p))) {
            Some(path) => Providers::load_file(path)?,
            None => Providers::from_lookup(&lookup)?,
        };

        if providers.is_empty() {
            return Err(ConfigError::NoProviders);
        }

        Ok(Self {
            bind_addr,
            providers,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required field '{field}' for city '{city}'")]
    MissingField { city: String, field: &'static str },

    #[error("city '{city}' uses API v2 but has no cipher key/IV")]
    MissingCipher { city: String },

    #[error("failed to read providers file: {0}")]
    ReadError(String),

    #[error("failed to parse providers file: {0}")]
    ParseError(String),

    #[error("invalid bind address: {0}")]
    InvalidBindAddr(String),

    #[error("no providers configured")]
    NoProviders,
}
