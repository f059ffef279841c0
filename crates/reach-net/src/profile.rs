//! Connection Profiles
//!
//! Each profile is the TLS fingerprint of a client an observer expects to
//! see talking to a cover domain: the protocol versions it offers and the
//! cipher suites it lists, in its order. Profiles are static data; there is
//! no way to extend one after construction.
//!
//! | Profile | Cover client | TLS |
//! |---------|--------------|-----|
//! | `webmail` | Webmail (www/inbox) | 1.2 |
//! | `app_store` | Android app store | 1.2 |
//! | `maps` | Maps / places | 1.2 |
//! | `modern_tls` | Generic modern client | 1.3, 1.2 |

use serde::{Deserialize, Serialize};

/// TLS protocol version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TlsVersion {
    #[serde(rename = "TLSv1.2")]
    Tls12,
    #[serde(rename = "TLSv1.3")]
    Tls13,
}

impl TlsVersion {
    /// Matching rustls protocol version
    pub fn rustls(&self) -> &'static rustls::SupportedProtocolVersion {
        match self {
            TlsVersion::Tls12 => &rustls::version::TLS12,
            TlsVersion::Tls13 => &rustls::version::TLS13,
        }
    }
}

/// Cipher suites that appear in cover-client fingerprints
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CipherSuite {
    TLS_AES_128_GCM_SHA256,
    TLS_AES_256_GCM_SHA384,
    TLS_CHACHA20_POLY1305_SHA256,
    TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
    TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
    TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
    TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
    TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256,
    TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
    TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA,
    TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA,
    TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA,
    TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA,
    TLS_RSA_WITH_AES_128_GCM_SHA256,
    TLS_RSA_WITH_AES_256_GCM_SHA384,
    TLS_RSA_WITH_AES_128_CBC_SHA,
    TLS_RSA_WITH_AES_256_CBC_SHA,
}

impl CipherSuite {
    /// IANA code point
    pub fn code(&self) -> u16 {
        match self {
            Self::TLS_AES_128_GCM_SHA256 => 0x1301,
            Self::TLS_AES_256_GCM_SHA384 => 0x1302,
            Self::TLS_CHACHA20_POLY1305_SHA256 => 0x1303,
            Self::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256 => 0xC02B,
            Self::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256 => 0xC02F,
            Self::TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384 => 0xC02C,
            Self::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384 => 0xC030,
            Self::TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256 => 0xCCA9,
            Self::TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256 => 0xCCA8,
            Self::TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA => 0xC009,
            Self::TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA => 0xC00A,
            Self::TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA => 0xC013,
            Self::TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA => 0xC014,
            Self::TLS_RSA_WITH_AES_128_GCM_SHA256 => 0x009C,
            Self::TLS_RSA_WITH_AES_256_GCM_SHA384 => 0x009D,
            Self::TLS_RSA_WITH_AES_128_CBC_SHA => 0x002F,
            Self::TLS_RSA_WITH_AES_256_CBC_SHA => 0x0035,
        }
    }

    /// TLS 1.3 suites are version-specific and never offered over 1.2
    pub fn is_tls13(&self) -> bool {
        matches!(
            self,
            Self::TLS_AES_128_GCM_SHA256
                | Self::TLS_AES_256_GCM_SHA384
                | Self::TLS_CHACHA20_POLY1305_SHA256
        )
    }
}

/// Profile identifier, as referenced from configuration files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileName {
    Webmail,
    AppStore,
    Maps,
    ModernTls,
}

impl ProfileName {
    pub fn all() -> &'static [ProfileName] {
        &[
            ProfileName::Webmail,
            ProfileName::AppStore,
            ProfileName::Maps,
            ProfileName::ModernTls,
        ]
    }

    /// The static profile this name refers to
    pub fn profile(&self) -> &'static ConnectionProfile {
        match self {
            ProfileName::Webmail => &WEBMAIL,
            ProfileName::AppStore => &APP_STORE,
            ProfileName::Maps => &MAPS,
            ProfileName::ModernTls => &MODERN_TLS,
        }
    }
}

impl std::fmt::Display for ProfileName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProfileName::Webmail => "webmail",
            ProfileName::AppStore => "app_store",
            ProfileName::Maps => "maps",
            ProfileName::ModernTls => "modern_tls",
        };
        write!(f, "{}", name)
    }
}

/// Allow-list of TLS versions and cipher suites mimicking one client
#[derive(Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ConnectionProfile {
    name: ProfileName,
    tls_versions: &'static [TlsVersion],
    cipher_suites: &'static [CipherSuite],
}

impl ConnectionProfile {
    pub fn name(&self) -> ProfileName {
        self.name
    }

    pub fn tls_versions(&self) -> &'static [TlsVersion] {
        self.tls_versions
    }

    /// Cipher suites in the order the cover client offers them
    pub fn cipher_suites(&self) -> &'static [CipherSuite] {
        self.cipher_suites
    }

    pub fn allows_version(&self, version: TlsVersion) -> bool {
        self.tls_versions.contains(&version)
    }

    /// Whether a suite code point is in the allow-list
    pub fn allows_code(&self, code: u16) -> bool {
        self.cipher_suites.iter().any(|s| s.code() == code)
    }
}

use CipherSuite::*;

/// Webmail client (www.google.com / inbox covers)
pub static WEBMAIL: ConnectionProfile = ConnectionProfile {
    name: ProfileName::Webmail,
    tls_versions: &[TlsVersion::Tls12],
    cipher_suites: &[
        TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
        TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
        TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA,
        TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA,
        TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA,
        TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA,
        TLS_RSA_WITH_AES_128_GCM_SHA256,
        TLS_RSA_WITH_AES_128_CBC_SHA,
        TLS_RSA_WITH_AES_256_CBC_SHA,
    ],
};

/// Android app store client. Same suite list as webmail, kept separate so
/// the two can diverge when either client changes its fingerprint.
pub static APP_STORE: ConnectionProfile = ConnectionProfile {
    name: ProfileName::AppStore,
    tls_versions: &[TlsVersion::Tls12],
    cipher_suites: &[
        TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
        TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
        TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA,
        TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA,
        TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA,
        TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA,
        TLS_RSA_WITH_AES_128_GCM_SHA256,
        TLS_RSA_WITH_AES_128_CBC_SHA,
        TLS_RSA_WITH_AES_256_CBC_SHA,
    ],
};

/// Maps / places client
pub static MAPS: ConnectionProfile = ConnectionProfile {
    name: ProfileName::Maps,
    tls_versions: &[TlsVersion::Tls12],
    cipher_suites: &[
        TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256,
        TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
        TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
        TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
        TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
        TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
        TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA,
        TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA,
        TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA,
        TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA,
        TLS_RSA_WITH_AES_128_GCM_SHA256,
        TLS_RSA_WITH_AES_256_GCM_SHA384,
        TLS_RSA_WITH_AES_128_CBC_SHA,
        TLS_RSA_WITH_AES_256_CBC_SHA,
    ],
};

/// Generic modern TLS client, used on the direct path and by providers
/// that do not need a specific cover fingerprint
pub static MODERN_TLS: ConnectionProfile = ConnectionProfile {
    name: ProfileName::ModernTls,
    tls_versions: &[TlsVersion::Tls13, TlsVersion::Tls12],
    cipher_suites: &[
        TLS_AES_128_GCM_SHA256,
        TLS_AES_256_GCM_SHA384,
        TLS_CHACHA20_POLY1305_SHA256,
        TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
        TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
        TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
        TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
        TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256,
        TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
        TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA,
        TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA,
        TLS_RSA_WITH_AES_128_GCM_SHA256,
        TLS_RSA_WITH_AES_256_GCM_SHA384,
        TLS_RSA_WITH_AES_128_CBC_SHA,
        TLS_RSA_WITH_AES_256_CBC_SHA,
    ],
};
