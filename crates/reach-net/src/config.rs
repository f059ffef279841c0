//! Network Access Configuration
//!
//! Everything the routing table is built from, as a TOML or JSON document:
//! the direct base URLs, where each provider's trust store comes from, the
//! cover domains of both fronting providers and which country codes are
//! fronted without an explicit user preference.
//!
//! ```toml
//! fronted_by_default = [20, 971, 968, 974, 98, 53, 998]
//!
//! [direct.urls]
//! service = "https://chat.signal.org"
//! # ...
//!
//! [trust.primary_fronting]
//! kind = "pem_file"
//! path = "/etc/reach/fronting-ca.pem"
//!
//! [primary_fronting]
//! reflector_host = "reflector-nrgwuv7kwq-uc.a.run.app"
//!
//! [[primary_fronting.covers]]
//! url = "https://www.google.com"
//! profile = "webmail"
//!
//! [[primary_fronting.regional]]
//! country_code = 20
//! url = "https://www.google.com.eg"
//! profile = "webmail"
//! ```

use crate::country::CountryCode;
use crate::endpoint::{CategoryMap, EndpointError};
use crate::profile::ProfileName;
use crate::trust::{TrustError, TrustSource};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Unsupported config format")]
    UnsupportedFormat,

    #[error("Trust store error: {0}")]
    Trust(#[from] TrustError),

    #[error("Endpoint error: {0}")]
    Endpoint(#[from] EndpointError),

    #[error("Invalid server public params: {0}")]
    InvalidPublicParams(String),

    #[error("Country code {0} has more than one dedicated fronting entry")]
    DuplicateCountry(CountryCode),

    #[error("No generic cover domains configured for {0}")]
    NoCovers(&'static str),
}

/// Configuration format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

/// Direct, uncensored path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectConfig {
    /// Hosts the client may contact outside the seven categories
    /// (calling, content proxy). Only used for the hostname set.
    #[serde(default)]
    pub auxiliary_hosts: Vec<String>,
    #[serde(default = "default_direct_profile")]
    pub profile: ProfileName,
    /// Base URL per category
    pub urls: CategoryMap,
}

fn default_direct_profile() -> ProfileName {
    ProfileName::ModernTls
}

/// Trust store source per provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustConfig {
    #[serde(default = "default_trust_source")]
    pub direct: TrustSource,
    #[serde(default = "default_trust_source")]
    pub primary_fronting: TrustSource,
    #[serde(default = "default_trust_source")]
    pub alternate_fronting: TrustSource,
}

fn default_trust_source() -> TrustSource {
    TrustSource::WebpkiRoots
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            direct: default_trust_source(),
            primary_fronting: default_trust_source(),
            alternate_fronting: default_trust_source(),
        }
    }
}

/// Generic cover domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverConfig {
    pub url: String,
    pub profile: ProfileName,
}

/// Country-local cover domain, tried before the generic covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionalCover {
    pub country_code: CountryCode,
    pub url: String,
    pub profile: ProfileName,
}

/// Primary fronting provider: covers forward to one reflector which
/// dispatches on the category path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryFrontingConfig {
    pub reflector_host: String,
    /// Shared fallback chain, in preference order
    pub covers: Vec<CoverConfig>,
    #[serde(default)]
    pub regional: Vec<RegionalCover>,
}

/// Alternate fronting provider, for countries that block the primary
/// provider's covers. Each category has its own internal host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternateFrontingConfig {
    pub covers: Vec<String>,
    #[serde(default = "default_direct_profile")]
    pub profile: ProfileName,
    pub country_codes: Vec<CountryCode>,
    pub internal_hosts: CategoryMap,
}

/// Complete network access configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkAccessConfig {
    /// Country codes fronted when the user has not chosen either way
    pub fronted_by_default: Vec<CountryCode>,
    /// Base64 server parameters handed to every endpoint set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_public_params: Option<String>,
    pub direct: DirectConfig,
    #[serde(default)]
    pub trust: TrustConfig,
    pub primary_fronting: PrimaryFrontingConfig,
    pub alternate_fronting: AlternateFrontingConfig,
}

impl NetworkAccessConfig {
    /// Load from a `.toml` or `.json` file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match ext {
            "toml" => Self::from_toml_file(path),
            "json" => Self::from_json_file(path),
            _ => Err(ConfigError::UnsupportedFormat),
        }
    }

    /// Load from string (for embedded configs)
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        match format {
            ConfigFormat::Toml => Self::from_toml(content),
            ConfigFormat::Json => Self::from_json(content),
        }
    }

    /// Load from TOML file
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Load from TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load from JSON file
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_json(&content)
    }

    /// Load from JSON string
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Export as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))
    }

    /// Export as JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))
    }

    /// Decoded server public params (empty when not configured)
    pub fn decode_public_params(&self) -> Result<Vec<u8>, ConfigError> {
        match &self.server_public_params {
            Some(encoded) => BASE64
                .decode(encoded.trim())
                .map_err(|e| ConfigError::InvalidPublicParams(e.to_string())),
            None => Ok(Vec::new()),
        }
    }

    /// Production routing data
    pub fn default_config() -> Self {
        Self {
            fronted_by_default: vec![
                CountryCode::EGYPT,
                CountryCode::UAE,
                CountryCode::OMAN,
                CountryCode::QATAR,
                CountryCode::IRAN,
                CountryCode::CUBA,
                CountryCode::UZBEKISTAN,
            ],
            server_public_params: None,
            direct: DirectConfig {
                auxiliary_hosts: vec![
                    "sfu.voip.signal.org".to_string(),
                    "contentproxy.signal.org".to_string(),
                ],
                profile: ProfileName::ModernTls,
                urls: CategoryMap {
                    service: "https://chat.signal.org".to_string(),
                    cdn: "https://cdn.signal.org".to_string(),
                    cdn2: "https://cdn2.signal.org".to_string(),
                    contact_discovery: "https://api.directory.signal.org".to_string(),
                    key_backup: "https://api.backup.signal.org".to_string(),
                    storage: "https://storage.signal.org".to_string(),
                    cdsi: "https://cdsi.signal.org".to_string(),
                },
            },
            trust: TrustConfig::default(),
            primary_fronting: PrimaryFrontingConfig {
                reflector_host: "reflector-nrgwuv7kwq-uc.a.run.app".to_string(),
                covers: vec![
                    cover("https://www.google.com", ProfileName::Webmail),
                    cover("https://android.clients.google.com", ProfileName::AppStore),
                    cover("https://clients3.google.com", ProfileName::Maps),
                    cover("https://clients4.google.com", ProfileName::Maps),
                    cover("https://inbox.google.com", ProfileName::Webmail),
                ],
                regional: vec![
                    regional(CountryCode::EGYPT, "https://www.google.com.eg"),
                    regional(CountryCode::UAE, "https://www.google.ae"),
                    regional(CountryCode::OMAN, "https://www.google.com.om"),
                    regional(CountryCode::QATAR, "https://www.google.com.qa"),
                    regional(CountryCode::UZBEKISTAN, "https://www.google.co.uz"),
                    regional(CountryCode::UKRAINE, "https://www.google.com.ua"),
                ],
            },
            alternate_fronting: AlternateFrontingConfig {
                covers: vec![
                    "https://cdn.sstatic.net".to_string(),
                    "https://github.githubassets.com".to_string(),
                    "https://pinterest.com".to_string(),
                    "https://open.scdn.co".to_string(),
                    "https://www.redditstatic.com".to_string(),
                ],
                profile: ProfileName::ModernTls,
                country_codes: vec![CountryCode::IRAN, CountryCode::CUBA],
                internal_hosts: CategoryMap {
                    service: "textsecure-service.whispersystems.org.global.prod.fastly.net".to_string(),
                    cdn: "cdn.signal.org.global.prod.fastly.net".to_string(),
                    cdn2: "cdn2.signal.org.global.prod.fastly.net".to_string(),
                    contact_discovery: "api.directory.signal.org.global.prod.fastly.net".to_string(),
                    key_backup: "api.backup.signal.org.global.prod.fastly.net".to_string(),
                    storage: "storage.signal.org.global.prod.fastly.net".to_string(),
                    cdsi: "cdsi.signal.org.global.prod.fastly.net".to_string(),
                },
            },
        }
    }
}

impl Default for NetworkAccessConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

fn cover(url: &str, profile: ProfileName) -> CoverConfig {
    CoverConfig {
        url: url.to_string(),
        profile,
    }
}

// Local search covers present the webmail fingerprint
fn regional(country_code: CountryCode, url: &str) -> RegionalCover {
    RegionalCover {
        country_code,
        url: url.to_string(),
        profile: ProfileName::Webmail,
    }
}
