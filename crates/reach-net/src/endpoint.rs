//! Endpoint Sets
//!
//! An [`EndpointSet`] is everything the transport needs to reach the
//! backend for one session: for each of the seven service categories, an
//! ordered list of descriptors pairing the URL the client connects to with
//! the host the request is routed to behind it, the trust anchor that must
//! validate the TLS session, and the TLS profile to present.
//!
//! # Construction
//!
//! ```text
//! pairings: [(https://www.google.com.eg, reflector, webmail),
//!            (https://www.google.com,    reflector, webmail), ...]
//!
//! service:  https://www.google.com.eg/service   -> reflector
//!           https://www.google.com/service      -> reflector
//! cdn:      https://www.google.com.eg/cdn       -> reflector
//! ...
//! ```
//!
//! All descriptors of one set share a single trust anchor. Sets are built
//! once and never mutated.

use crate::interceptor::InterceptorChain;
use crate::profile::ConnectionProfile;
use crate::trust::TrustAnchor;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Endpoint construction errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EndpointError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid internal host '{0}'")]
    InvalidHost(String),

    #[error("No host pairings for fronted set")]
    NoPairings,
}

/// Service category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointCategory {
    Service,
    Cdn,
    Cdn2,
    ContactDiscovery,
    KeyBackup,
    Storage,
    Cdsi,
}

impl EndpointCategory {
    pub const ALL: [EndpointCategory; 7] = [
        EndpointCategory::Service,
        EndpointCategory::Cdn,
        EndpointCategory::Cdn2,
        EndpointCategory::ContactDiscovery,
        EndpointCategory::KeyBackup,
        EndpointCategory::Storage,
        EndpointCategory::Cdsi,
    ];

    /// Path the fronting reflector dispatches this category on
    pub fn path_suffix(&self) -> &'static str {
        match self {
            EndpointCategory::Service => "/service",
            EndpointCategory::Cdn => "/cdn",
            EndpointCategory::Cdn2 => "/cdn2",
            EndpointCategory::ContactDiscovery => "/directory",
            EndpointCategory::KeyBackup => "/backup",
            EndpointCategory::Storage => "/storage",
            EndpointCategory::Cdsi => "/cdsi",
        }
    }

    /// CDN generation number for the two CDN categories
    pub fn cdn_number(&self) -> Option<u8> {
        match self {
            EndpointCategory::Cdn => Some(0),
            EndpointCategory::Cdn2 => Some(2),
            _ => None,
        }
    }
}

/// One value per category. Used for the direct base URLs and for providers
/// that route each category to its own internal host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryMap {
    pub service: String,
    pub cdn: String,
    pub cdn2: String,
    pub contact_discovery: String,
    pub key_backup: String,
    pub storage: String,
    pub cdsi: String,
}

impl CategoryMap {
    pub fn get(&self, category: EndpointCategory) -> &str {
        match category {
            EndpointCategory::Service => &self.service,
            EndpointCategory::Cdn => &self.cdn,
            EndpointCategory::Cdn2 => &self.cdn2,
            EndpointCategory::ContactDiscovery => &self.contact_discovery,
            EndpointCategory::KeyBackup => &self.key_backup,
            EndpointCategory::Storage => &self.storage,
            EndpointCategory::Cdsi => &self.cdsi,
        }
    }
}

/// A single way to reach one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointDescriptor {
    url: String,
    external_host: String,
    internal_host: String,
    trust_anchor: TrustAnchor,
    profile: &'static ConnectionProfile,
}

impl EndpointDescriptor {
    /// Build a descriptor. Without an internal host the request is routed
    /// to the URL's own host.
    pub fn new(
        url: &str,
        internal_host: Option<&str>,
        trust_anchor: &TrustAnchor,
        profile: &'static ConnectionProfile,
    ) -> Result<Self, EndpointError> {
        let parsed = Url::parse(url).map_err(|e| EndpointError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if parsed.scheme() != "https" {
            return Err(EndpointError::InvalidUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let external_host = parsed
            .host_str()
            .ok_or_else(|| EndpointError::InvalidUrl {
                url: url.to_string(),
                reason: "no host".to_string(),
            })?
            .to_string();

        let internal_host = match internal_host {
            Some(host) => validate_host(host)?,
            None => external_host.clone(),
        };

        Ok(Self {
            url: url.to_string(),
            external_host,
            internal_host,
            trust_anchor: trust_anchor.clone(),
            profile,
        })
    }

    /// URL the client opens a connection to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Host visible on the wire (SNI)
    pub fn external_host(&self) -> &str {
        &self.external_host
    }

    /// Host the request is routed to
    pub fn internal_host(&self) -> &str {
        &self.internal_host
    }

    /// Host header override, present only when fronting
    pub fn host_header(&self) -> Option<&str> {
        (self.internal_host != self.external_host).then_some(self.internal_host.as_str())
    }

    pub fn trust_anchor(&self) -> &TrustAnchor {
        &self.trust_anchor
    }

    pub fn profile(&self) -> &'static ConnectionProfile {
        self.profile
    }
}

fn validate_host(host: &str) -> Result<String, EndpointError> {
    match url::Host::parse(host) {
        Ok(url::Host::Domain(domain)) if !domain.is_empty() => Ok(domain),
        _ => Err(EndpointError::InvalidHost(host.to_string())),
    }
}

/// Hostname of a bare host or an `https://` URL with no path
pub(crate) fn hostname(entry: &str) -> Result<String, EndpointError> {
    if entry.contains("://") {
        let url = cover_base(entry)?;
        let parsed = Url::parse(&url).map_err(|_| EndpointError::InvalidHost(entry.to_string()))?;
        return parsed
            .host_str()
            .map(str::to_string)
            .ok_or_else(|| EndpointError::InvalidHost(entry.to_string()));
    }
    validate_host(entry)
}

/// Cover URL a category path can be appended to: https, a host, and
/// nothing after it
fn cover_base(base_url: &str) -> Result<String, EndpointError> {
    let invalid = |reason: &str| EndpointError::InvalidUrl {
        url: base_url.to_string(),
        reason: reason.to_string(),
    };

    let parsed = Url::parse(base_url).map_err(|e| invalid(&e.to_string()))?;

    if parsed.scheme() != "https" {
        return Err(invalid(&format!("unsupported scheme '{}'", parsed.scheme())));
    }
    if parsed.host_str().is_none() {
        return Err(invalid("no host"));
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(invalid("cover URL has a query or fragment"));
    }
    if parsed.path() != "/" {
        return Err(invalid("cover URL has a path"));
    }

    Ok(base_url.trim_end_matches('/').to_string())
}

/// One cover URL and the host it fronts for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPairing {
    /// Cover URL, without a trailing path
    pub base_url: String,
    /// Reflector the cover domain forwards to
    pub internal_host: String,
    pub profile: &'static ConnectionProfile,
}

impl HostPairing {
    pub fn new(base_url: &str, internal_host: &str, profile: &'static ConnectionProfile) -> Self {
        Self {
            base_url: base_url.to_string(),
            internal_host: internal_host.to_string(),
            profile,
        }
    }
}

/// Parts shared by every set of a routing table
#[derive(Debug, Clone)]
pub struct SetCommon {
    pub interceptors: InterceptorChain,
    pub server_public_params: Arc<[u8]>,
}

impl Default for SetCommon {
    fn default() -> Self {
        Self {
            interceptors: InterceptorChain::empty(),
            server_public_params: Arc::from(Vec::new()),
        }
    }
}

/// Complete, single-provider bundle of endpoints for one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointSet {
    service: Vec<EndpointDescriptor>,
    cdn: Vec<EndpointDescriptor>,
    cdn2: Vec<EndpointDescriptor>,
    contact_discovery: Vec<EndpointDescriptor>,
    key_backup: Vec<EndpointDescriptor>,
    storage: Vec<EndpointDescriptor>,
    cdsi: Vec<EndpointDescriptor>,
    supports_websockets: bool,
    #[serde(skip)]
    interceptors: InterceptorChain,
    #[serde(skip)]
    server_public_params: Arc<[u8]>,
}

impl EndpointSet {
    /// Fronted set: every pairing contributes one descriptor per category,
    /// the cover URL extended with the category path. Pairing order is kept;
    /// the first pairing is the preferred front.
    pub fn fronted(
        pairings: &[HostPairing],
        trust_anchor: &TrustAnchor,
        common: &SetCommon,
    ) -> Result<Self, EndpointError> {
        if pairings.is_empty() {
            return Err(EndpointError::NoPairings);
        }

        Self::assemble(common, false, |category| {
            pairings
                .iter()
                .map(|p| {
                    let url = format!("{}{}", cover_base(&p.base_url)?, category.path_suffix());
                    EndpointDescriptor::new(&url, Some(&p.internal_host), trust_anchor, p.profile)
                })
                .collect()
        })
    }

    /// Provider-routed set: each cover URL is used as-is, and the category
    /// selects the internal host the provider forwards to.
    pub fn provider_routed(
        cover_urls: &[String],
        internal_hosts: &CategoryMap,
        trust_anchor: &TrustAnchor,
        profile: &'static ConnectionProfile,
        common: &SetCommon,
    ) -> Result<Self, EndpointError> {
        if cover_urls.is_empty() {
            return Err(EndpointError::NoPairings);
        }

        Self::assemble(common, false, |category| {
            cover_urls
                .iter()
                .map(|url| {
                    EndpointDescriptor::new(url, Some(internal_hosts.get(category)), trust_anchor, profile)
                })
                .collect()
        })
    }

    /// Direct set: one descriptor per category, no host override, WebSocket
    /// capable.
    pub fn direct(
        base_urls: &CategoryMap,
        trust_anchor: &TrustAnchor,
        profile: &'static ConnectionProfile,
        common: &SetCommon,
    ) -> Result<Self, EndpointError> {
        Self::assemble(common, true, |category| {
            Ok(vec![EndpointDescriptor::new(base_urls.get(category), None, trust_anchor, profile)?])
        })
    }

    fn assemble<F>(common: &SetCommon, supports_websockets: bool, mut build: F) -> Result<Self, EndpointError>
    where
        F: FnMut(EndpointCategory) -> Result<Vec<EndpointDescriptor>, EndpointError>,
    {
        Ok(Self {
            service: build(EndpointCategory::Service)?,
            cdn: build(EndpointCategory::Cdn)?,
            cdn2: build(EndpointCategory::Cdn2)?,
            contact_discovery: build(EndpointCategory::ContactDiscovery)?,
            key_backup: build(EndpointCategory::KeyBackup)?,
            storage: build(EndpointCategory::Storage)?,
            cdsi: build(EndpointCategory::Cdsi)?,
            supports_websockets,
            interceptors: common.interceptors.clone(),
            server_public_params: common.server_public_params.clone(),
        })
    }

    /// Descriptors for a category, in preference order
    pub fn endpoints(&self, category: EndpointCategory) -> &[EndpointDescriptor] {
        match category {
            EndpointCategory::Service => &self.service,
            EndpointCategory::Cdn => &self.cdn,
            EndpointCategory::Cdn2 => &self.cdn2,
            EndpointCategory::ContactDiscovery => &self.contact_discovery,
            EndpointCategory::KeyBackup => &self.key_backup,
            EndpointCategory::Storage => &self.storage,
            EndpointCategory::Cdsi => &self.cdsi,
        }
    }

    /// CDN descriptors by CDN number (0 or 2)
    pub fn cdn(&self, number: u8) -> Option<&[EndpointDescriptor]> {
        EndpointCategory::ALL
            .iter()
            .find(|c| c.cdn_number() == Some(number))
            .map(|c| self.endpoints(*c))
    }

    /// Every descriptor of every category
    pub fn descriptors(&self) -> impl Iterator<Item = &EndpointDescriptor> {
        EndpointCategory::ALL
            .into_iter()
            .flat_map(move |c| self.endpoints(c).iter())
    }

    /// Trust anchor shared by all descriptors
    pub fn trust_anchor(&self) -> &TrustAnchor {
        self.service[0].trust_anchor()
    }

    pub fn supports_websockets(&self) -> bool {
        self.supports_websockets
    }

    pub fn interceptors(&self) -> &InterceptorChain {
        &self.interceptors
    }

    pub fn server_public_params(&self) -> &[u8] {
        &self.server_public_params
    }
}
