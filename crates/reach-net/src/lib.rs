//! Reach Network Access
//!
//! Chooses how the client reaches the backend. For the local country code
//! and circumvention preference it returns one complete endpoint set: seven
//! service categories, each an ordered list of descriptors with the URL to
//! connect to, the host to route to, the trust anchor and the TLS profile.
//!
//! Resolution:
//! 1. No local number → direct set
//! 2. Circumvention disabled → direct set
//! 3. Circumvention enabled → the country's dedicated fronted set, else the
//!    default fronted set
//! 4. Default preference → as enabled for countries fronted by default,
//!    direct otherwise
//!
//! The crate never opens a connection. It produces declarative
//! configuration for the transport, including a rustls `ClientConfig` per
//! descriptor.

mod access;
mod config;
mod country;
mod endpoint;
mod interceptor;
mod profile;
mod routing;
mod tls;
mod trust;

pub use access::{FixedEnvironment, LocalEnvironment, NetworkAccess, Resolution};
pub use config::{
    AlternateFrontingConfig, ConfigError, ConfigFormat, CoverConfig, DirectConfig, NetworkAccessConfig,
    PrimaryFrontingConfig, RegionalCover, TrustConfig,
};
pub use country::{CountryCode, InvalidCountryCode};
pub use endpoint::{
    CategoryMap, EndpointCategory, EndpointDescriptor, EndpointError, EndpointSet, HostPairing, SetCommon,
};
pub use interceptor::{InterceptResult, Interceptor, InterceptorChain};
pub use profile::{
    APP_STORE, CipherSuite, ConnectionProfile, MAPS, MODERN_TLS, ProfileName, TlsVersion, WEBMAIL,
};
pub use routing::{CircumventionPreference, Route, RoutingTable, route};
pub use tls::{TlsConfigError, cipher_suites, client_config, server_name};
pub use trust::{TrustAnchor, TrustError, TrustSource};
