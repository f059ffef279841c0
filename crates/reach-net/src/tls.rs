//! TLS client configuration per descriptor
//!
//! Turns an [`EndpointDescriptor`] into a rustls [`ClientConfig`] that only
//! offers the descriptor's profile versions and suites (in profile order)
//! and only trusts the descriptor's own anchor. Suites the crypto provider
//! does not implement are skipped.

use crate::endpoint::EndpointDescriptor;
use crate::profile::ConnectionProfile;
use rustls::crypto::{CryptoProvider, aws_lc_rs};
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, SupportedCipherSuite, SupportedProtocolVersion};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// TLS configuration errors
#[derive(Debug, Error)]
pub enum TlsConfigError {
    #[error("Profile {0} has no cipher suite the crypto provider implements")]
    NoSupportedSuites(String),

    #[error("TLS error: {0}")]
    Rustls(#[from] rustls::Error),

    #[error("Invalid server name '{0}'")]
    InvalidServerName(String),
}

/// Provider suites allowed by `profile`, in the profile's preference order
pub fn cipher_suites(profile: &ConnectionProfile) -> Vec<SupportedCipherSuite> {
    let available = aws_lc_rs::default_provider().cipher_suites;

    profile
        .cipher_suites()
        .iter()
        .filter_map(|wanted| {
            available
                .iter()
                .find(|s| u16::from(s.suite()) == wanted.code())
                .copied()
        })
        .collect()
}

/// Client config for connecting to `descriptor`
pub fn client_config(descriptor: &EndpointDescriptor) -> Result<ClientConfig, TlsConfigError> {
    let profile = descriptor.profile();
    let suites = cipher_suites(profile);

    if suites.is_empty() {
        return Err(TlsConfigError::NoSupportedSuites(profile.name().to_string()));
    }

    debug!(
        profile = %profile.name(),
        suites = suites.len(),
        anchor = descriptor.trust_anchor().name(),
        "Building TLS client config for {}",
        descriptor.external_host()
    );

    let provider = CryptoProvider {
        cipher_suites: suites,
        ..aws_lc_rs::default_provider()
    };

    let versions: Vec<&'static SupportedProtocolVersion> =
        profile.tls_versions().iter().map(|v| v.rustls()).collect();

    let mut config = ClientConfig::builder_with_provider(Arc::new(provider))
        .with_protocol_versions(&versions)?
        .with_root_certificates(descriptor.trust_anchor().roots())
        .with_no_client_auth();

    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(config)
}

/// SNI for `descriptor`: always the external (cover) host
pub fn server_name(descriptor: &EndpointDescriptor) -> Result<ServerName<'static>, TlsConfigError> {
    ServerName::try_from(descriptor.external_host().to_string())
        .map_err(|_| TlsConfigError::InvalidServerName(descriptor.external_host().to_string()))
}
