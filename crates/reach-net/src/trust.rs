//! Trust Anchors
//!
//! A [`TrustAnchor`] is the root store one provider is allowed to chain to.
//! Anchors are loaded once at startup and compare by identity: two anchors
//! built from the same certificates are still two different providers.

use rustls::pki_types::pem::PemObject;
use rustls::pki_types::CertificateDer;
use rustls::RootCertStore;
use serde::{Deserialize, Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Trust store loading errors
#[derive(Debug, Error)]
pub enum TrustError {
    #[error("Failed to read trust store '{name}' from {path}: {reason}")]
    Io {
        name: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Malformed PEM in trust store '{0}': {1}")]
    MalformedPem(String, String),

    #[error("Trust store '{0}' contains no certificates")]
    Empty(String),

    #[error("Certificate rejected by trust store '{0}': {1}")]
    Rejected(String, rustls::Error),
}

/// Where the certificates of a trust anchor come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrustSource {
    /// Mozilla root program, as bundled by `webpki-roots`
    WebpkiRoots,
    /// PEM bundle on disk
    PemFile { path: PathBuf },
    /// Inline PEM bundle
    Pem { pem: String },
}

struct AnchorInner {
    name: String,
    roots: Arc<RootCertStore>,
}

/// Handle to one provider's certificate trust store
#[derive(Clone)]
pub struct TrustAnchor {
    inner: Arc<AnchorInner>,
}

impl TrustAnchor {
    /// Load an anchor from its configured source
    pub fn load(name: &str, source: &TrustSource) -> Result<Self, TrustError> {
        match source {
            TrustSource::WebpkiRoots => Ok(Self::webpki_roots(name)),
            TrustSource::PemFile { path } => Self::from_pem_file(name, path),
            TrustSource::Pem { pem } => Self::from_pem(name, pem.as_bytes()),
        }
    }

    /// Anchor trusting the bundled Mozilla roots
    pub fn webpki_roots(name: &str) -> Self {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        Self::from_store(name, roots)
    }

    /// Anchor trusting every certificate of a PEM bundle
    pub fn from_pem(name: &str, pem: &[u8]) -> Result<Self, TrustError> {
        let mut roots = RootCertStore::empty();

        for cert in CertificateDer::pem_slice_iter(pem) {
            let cert = cert.map_err(|e| TrustError::MalformedPem(name.to_string(), format!("{e:?}")))?;
            roots
                .add(cert)
                .map_err(|e| TrustError::Rejected(name.to_string(), e))?;
        }

        if roots.is_empty() {
            return Err(TrustError::Empty(name.to_string()));
        }

        Ok(Self::from_store(name, roots))
    }

    /// Anchor trusting every certificate of a PEM file
    pub fn from_pem_file(name: &str, path: &Path) -> Result<Self, TrustError> {
        let pem = std::fs::read(path).map_err(|e| TrustError::Io {
            name: name.to_string(),
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_pem(name, &pem)
    }

    fn from_store(name: &str, roots: RootCertStore) -> Self {
        debug!("Trust anchor '{}' loaded with {} roots", name, roots.len());
        Self {
            inner: Arc::new(AnchorInner {
                name: name.to_string(),
                roots: Arc::new(roots),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Root store for TLS verification
    pub fn roots(&self) -> Arc<RootCertStore> {
        self.inner.roots.clone()
    }

    /// Number of trusted roots
    pub fn len(&self) -> usize {
        self.inner.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.roots.is_empty()
    }
}

impl PartialEq for TrustAnchor {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for TrustAnchor {}

impl std::fmt::Debug for TrustAnchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustAnchor")
            .field("name", &self.inner.name)
            .field("roots", &self.inner.roots.len())
            .finish()
    }
}

impl Serialize for TrustAnchor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRONTING_CA: &[u8] = include_bytes!("../testdata/fronting-ca.pem");
    const SERVICE_CA: &[u8] = include_bytes!("../testdata/service-ca.pem");

    #[test]
    fn test_webpki_roots() {
        let anchor = TrustAnchor::webpki_roots("direct");
        assert_eq!(anchor.name(), "direct");
        assert!(anchor.len() > 50);
    }

    #[test]
    fn test_pem_bundle() {
        let anchor = TrustAnchor::from_pem("fronting", FRONTING_CA).unwrap();
        assert_eq!(anchor.len(), 1);

        let mut bundle = FRONTING_CA.to_vec();
        bundle.extend_from_slice(SERVICE_CA);
        let anchor = TrustAnchor::from_pem("both", &bundle).unwrap();
        assert_eq!(anchor.len(), 2);
    }

    #[test]
    fn test_identity_equality() {
        let a = TrustAnchor::from_pem("fronting", FRONTING_CA).unwrap();
        let b = TrustAnchor::from_pem("fronting", FRONTING_CA).unwrap();

        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_pem() {
        let garbage = b"-----BEGIN CERTIFICATE-----\n!!!!\n-----END CERTIFICATE-----\n";
        assert!(matches!(
            TrustAnchor::from_pem("bad", garbage),
            Err(TrustError::MalformedPem(..))
        ));
    }

    #[test]
    fn test_not_a_certificate() {
        let pem = b"-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n";
        assert!(matches!(
            TrustAnchor::from_pem("bad", pem),
            Err(TrustError::Rejected(..))
        ));
    }

    #[test]
    fn test_empty_bundle() {
        assert!(matches!(
            TrustAnchor::from_pem("empty", b"no certificates here"),
            Err(TrustError::Empty(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let source = TrustSource::PemFile {
            path: PathBuf::from("/nonexistent/reach/ca.pem"),
        };
        assert!(matches!(
            TrustAnchor::load("missing", &source),
            Err(TrustError::Io { .. })
        ));
    }

    #[test]
    fn test_inline_source() {
        let source = TrustSource::Pem {
            pem: String::from_utf8(SERVICE_CA.to_vec()).unwrap(),
        };
        let anchor = TrustAnchor::load("service", &source).unwrap();
        assert_eq!(anchor.len(), 1);
    }
}
