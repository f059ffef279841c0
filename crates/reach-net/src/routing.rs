//! Routing Table
//!
//! Every endpoint set the client can use, built once from a
//! [`NetworkAccessConfig`], plus the decision function that picks one for a
//! country code and circumvention preference.
//!
//! # Sets
//!
//! | Set | Trust anchor | Used for |
//! |-----|--------------|----------|
//! | direct | direct | no circumvention |
//! | regional (one per country) | primary fronting | countries with a local cover |
//! | alternate provider (one, shared) | alternate fronting | countries blocking the primary covers |
//! | default fronted | primary fronting | every other fronted country |
//!
//! The direct set is a single instance; classification compares against it
//! by identity, never by content.

use crate::config::{ConfigError, NetworkAccessConfig};
use crate::country::CountryCode;
use crate::endpoint::{self, EndpointSet, HostPairing, SetCommon};
use crate::interceptor::InterceptorChain;
use crate::trust::TrustAnchor;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// User-controlled circumvention setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CircumventionPreference {
    /// Always front
    Enabled,
    /// Never front
    Disabled,
    /// Front only in countries censored by default
    #[default]
    Default,
}

impl std::fmt::Display for CircumventionPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CircumventionPreference::Enabled => "enabled",
            CircumventionPreference::Disabled => "disabled",
            CircumventionPreference::Default => "default",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for CircumventionPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "enabled" | "on" => Ok(CircumventionPreference::Enabled),
            "disabled" | "off" => Ok(CircumventionPreference::Disabled),
            "default" => Ok(CircumventionPreference::Default),
            _ => Err(format!("Invalid circumvention preference: {}", s)),
        }
    }
}

/// Which kind of set a resolution lands on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Direct,
    Fronted(CountryCode),
}

/// Decision function: no local number short-circuits to the direct path
/// before the preference is looked at.
pub fn route(
    country_code: Option<CountryCode>,
    preference: CircumventionPreference,
    censored_by_default: impl Fn(CountryCode) -> bool,
) -> Route {
    match (country_code, preference) {
        (None, _) => Route::Direct,
        (Some(_), CircumventionPreference::Disabled) => Route::Direct,
        (Some(code), CircumventionPreference::Enabled) => Route::Fronted(code),
        (Some(code), CircumventionPreference::Default) if censored_by_default(code) => Route::Fronted(code),
        (Some(_), CircumventionPreference::Default) => Route::Direct,
    }
}

/// Immutable set of all endpoint sets and the rules to choose among them
#[derive(Debug)]
pub struct RoutingTable {
    direct: Arc<EndpointSet>,
    default_fronted: Arc<EndpointSet>,
    dedicated: HashMap<CountryCode, Arc<EndpointSet>>,
    fronted_by_default: HashSet<CountryCode>,
    hostnames: BTreeSet<String>,
}

impl RoutingTable {
    /// Build every set from configuration. Any malformed trust store, URL
    /// or host aborts the build; there is no partial table.
    pub fn build(config: &NetworkAccessConfig, interceptors: InterceptorChain) -> Result<Self, ConfigError> {
        Self::try_build(config, interceptors).inspect_err(|e| warn!("Rejected network access config: {}", e))
    }

    fn try_build(config: &NetworkAccessConfig, interceptors: InterceptorChain) -> Result<Self, ConfigError> {
        let direct_anchor = TrustAnchor::load("direct", &config.trust.direct)?;
        let primary_anchor = TrustAnchor::load("primary-fronting", &config.trust.primary_fronting)?;
        let alternate_anchor = TrustAnchor::load("alternate-fronting", &config.trust.alternate_fronting)?;

        let common = SetCommon {
            interceptors,
            server_public_params: config.decode_public_params()?.into(),
        };

        let direct = EndpointSet::direct(
            &config.direct.urls,
            &direct_anchor,
            config.direct.profile.profile(),
            &common,
        )?;

        let primary = &config.primary_fronting;
        if primary.covers.is_empty() {
            return Err(ConfigError::NoCovers("primary fronting"));
        }

        let generic: Vec<HostPairing> = primary
            .covers
            .iter()
            .map(|c| HostPairing::new(&c.url, &primary.reflector_host, c.profile.profile()))
            .collect();

        let default_fronted = EndpointSet::fronted(&generic, &primary_anchor, &common)?;

        let mut dedicated = HashMap::new();

        for regional in &primary.regional {
            let mut pairings = Vec::with_capacity(generic.len() + 1);
            pairings.push(HostPairing::new(
                &regional.url,
                &primary.reflector_host,
                regional.profile.profile(),
            ));
            pairings.extend(generic.iter().cloned());

            let set = EndpointSet::fronted(&pairings, &primary_anchor, &common)?;
            if dedicated.insert(regional.country_code, Arc::new(set)).is_some() {
                return Err(ConfigError::DuplicateCountry(regional.country_code));
            }
        }

        let alternate = &config.alternate_fronting;
        if !alternate.country_codes.is_empty() {
            if alternate.covers.is_empty() {
                return Err(ConfigError::NoCovers("alternate fronting"));
            }

            let set = Arc::new(EndpointSet::provider_routed(
                &alternate.covers,
                &alternate.internal_hosts,
                &alternate_anchor,
                alternate.profile.profile(),
                &common,
            )?);

            for code in &alternate.country_codes {
                if dedicated.insert(*code, set.clone()).is_some() {
                    return Err(ConfigError::DuplicateCountry(*code));
                }
            }
        }

        let auxiliary = config
            .direct
            .auxiliary_hosts
            .iter()
            .map(|h| endpoint::hostname(h))
            .collect::<Result<Vec<_>, _>>()?;

        let mut table = Self::from_parts(
            Arc::new(direct),
            Arc::new(default_fronted),
            dedicated,
            config.fronted_by_default.iter().copied().collect(),
        );
        table.hostnames.extend(auxiliary);

        info!(
            "Routing table built: {} dedicated entries, {} countries fronted by default",
            table.dedicated.len(),
            table.fronted_by_default.len()
        );

        Ok(table)
    }

    /// Assemble a table from prebuilt sets
    pub fn from_parts(
        direct: Arc<EndpointSet>,
        default_fronted: Arc<EndpointSet>,
        dedicated: HashMap<CountryCode, Arc<EndpointSet>>,
        fronted_by_default: HashSet<CountryCode>,
    ) -> Self {
        let mut hostnames = BTreeSet::new();
        let sets = [&direct, &default_fronted].into_iter().chain(dedicated.values());
        for set in sets {
            for descriptor in set.descriptors() {
                hostnames.insert(descriptor.external_host().to_string());
                hostnames.insert(descriptor.internal_host().to_string());
            }
        }

        Self {
            direct,
            default_fronted,
            dedicated,
            fronted_by_default,
            hostnames,
        }
    }

    /// Pick the endpoint set for a country code and preference. Total: a
    /// fronted route without a dedicated entry gets the default fronted set.
    pub fn resolve(&self, country_code: Option<CountryCode>, preference: CircumventionPreference) -> &Arc<EndpointSet> {
        let route = route(country_code, preference, |code| self.is_censored_by_default(code));
        debug!(?country_code, %preference, ?route, "Resolved network route");

        match route {
            Route::Direct => &self.direct,
            Route::Fronted(code) => self.fronted_for(code),
        }
    }

    /// Fronted set for a country, falling back to the default fronted set
    pub fn fronted_for(&self, country_code: CountryCode) -> &Arc<EndpointSet> {
        self.dedicated.get(&country_code).unwrap_or(&self.default_fronted)
    }

    /// Whether `set` is this table's direct set (identity, not content)
    pub fn is_direct(&self, set: &Arc<EndpointSet>) -> bool {
        Arc::ptr_eq(set, &self.direct)
    }

    pub fn is_censored(&self, country_code: Option<CountryCode>, preference: CircumventionPreference) -> bool {
        !self.is_direct(self.resolve(country_code, preference))
    }

    pub fn supports_websockets(&self, country_code: Option<CountryCode>, preference: CircumventionPreference) -> bool {
        let set = self.resolve(country_code, preference);
        self.is_direct(set) || set.supports_websockets()
    }

    pub fn is_censored_by_default(&self, country_code: CountryCode) -> bool {
        self.fronted_by_default.contains(&country_code)
    }

    pub fn direct(&self) -> &Arc<EndpointSet> {
        &self.direct
    }

    pub fn default_fronted(&self) -> &Arc<EndpointSet> {
        &self.default_fronted
    }

    /// Dedicated set for a country, if it has one
    pub fn dedicated(&self, country_code: CountryCode) -> Option<&Arc<EndpointSet>> {
        self.dedicated.get(&country_code)
    }

    /// Countries with a dedicated set, ascending
    pub fn dedicated_countries(&self) -> Vec<CountryCode> {
        let mut codes: Vec<_> = self.dedicated.keys().copied().collect();
        codes.sort();
        codes
    }

    /// Countries fronted by default, ascending
    pub fn fronted_by_default(&self) -> Vec<CountryCode> {
        let mut codes: Vec<_> = self.fronted_by_default.iter().copied().collect();
        codes.sort();
        codes
    }

    /// Every hostname any set may contact, for DNS pinning
    pub fn hostnames(&self) -> &BTreeSet<String> {
        &self.hostnames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{CategoryMap, EndpointCategory};
    use crate::profile::MODERN_TLS;
    use crate::trust::TrustSource;
    use CircumventionPreference::{Default as ByDefault, Disabled, Enabled};

    const FRONTING_CA: &str = include_str!("../testdata/fronting-ca.pem");

    fn table() -> RoutingTable {
        RoutingTable::build(&NetworkAccessConfig::default_config(), InterceptorChain::empty()).unwrap()
    }

    #[test]
    fn test_route_decisions() {
        let censored = |code: CountryCode| code == CountryCode::IRAN;

        assert_eq!(route(None, Enabled, censored), Route::Direct);
        assert_eq!(route(None, ByDefault, censored), Route::Direct);
        assert_eq!(route(Some(CountryCode::IRAN), Disabled, censored), Route::Direct);
        assert_eq!(
            route(Some(CountryCode::FRANCE), Enabled, censored),
            Route::Fronted(CountryCode::FRANCE)
        );
        assert_eq!(
            route(Some(CountryCode::IRAN), ByDefault, censored),
            Route::Fronted(CountryCode::IRAN)
        );
        assert_eq!(route(Some(CountryCode::FRANCE), ByDefault, censored), Route::Direct);
    }

    #[test]
    fn test_preference_parse() {
        assert_eq!("enabled".parse::<CircumventionPreference>().unwrap(), Enabled);
        assert_eq!("OFF".parse::<CircumventionPreference>().unwrap(), Disabled);
        assert!("maybe".parse::<CircumventionPreference>().is_err());
        assert_eq!(CircumventionPreference::default(), ByDefault);
    }

    #[test]
    fn test_default_table_shape() {
        let table = table();

        assert_eq!(
            table.dedicated_countries(),
            vec![
                CountryCode::EGYPT,
                CountryCode::CUBA,
                CountryCode::IRAN,
                CountryCode::UKRAINE,
                CountryCode::OMAN,
                CountryCode::UAE,
                CountryCode::QATAR,
                CountryCode::UZBEKISTAN,
            ]
        );
        assert!(Arc::ptr_eq(
            table.dedicated(CountryCode::IRAN).unwrap(),
            table.dedicated(CountryCode::CUBA).unwrap()
        ));
        assert!(table.is_censored_by_default(CountryCode::OMAN));
        assert!(!table.is_censored_by_default(CountryCode::UKRAINE));
    }

    #[test]
    fn test_regional_cover_first() {
        let table = table();
        let egypt = table.dedicated(CountryCode::EGYPT).unwrap();
        let service = egypt.endpoints(EndpointCategory::Service);

        assert_eq!(service.len(), 6);
        assert_eq!(service[0].url(), "https://www.google.com.eg/service");
        assert_eq!(service[1].url(), "https://www.google.com/service");
        assert_eq!(
            service[0].host_header(),
            Some("reflector-nrgwuv7kwq-uc.a.run.app")
        );

        let default_service = table.default_fronted().endpoints(EndpointCategory::Service);
        assert_eq!(&service[1..], default_service);
    }

    #[test]
    fn test_providers_never_share_anchors() {
        let table = table();
        let direct = table.direct().trust_anchor();
        let primary = table.default_fronted().trust_anchor();
        let alternate = table.dedicated(CountryCode::IRAN).unwrap().trust_anchor();

        assert_ne!(direct, primary);
        assert_ne!(direct, alternate);
        assert_ne!(primary, alternate);

        for code in table.dedicated_countries() {
            let set = table.dedicated(code).unwrap();
            let anchor = set.trust_anchor();
            assert!(set.descriptors().all(|d| d.trust_anchor() == anchor));
            assert_ne!(anchor, direct);
        }
    }

    #[test]
    fn test_ukraine_only_fronted_on_request() {
        let table = table();

        assert!(table.is_direct(table.resolve(Some(CountryCode::UKRAINE), ByDefault)));
        assert!(Arc::ptr_eq(
            table.resolve(Some(CountryCode::UKRAINE), Enabled),
            table.dedicated(CountryCode::UKRAINE).unwrap()
        ));
    }

    #[test]
    fn test_identity_not_content() {
        let table = table();
        let lookalike = Arc::new(EndpointSet::clone(table.direct()));
        assert_eq!(*lookalike, **table.direct());

        let mut dedicated = HashMap::new();
        dedicated.insert(CountryCode::FRANCE, lookalike.clone());
        let table = RoutingTable::from_parts(
            table.direct().clone(),
            table.default_fronted().clone(),
            dedicated,
            HashSet::from([CountryCode::FRANCE]),
        );

        let resolved = table.resolve(Some(CountryCode::FRANCE), ByDefault);
        assert!(Arc::ptr_eq(resolved, &lookalike));
        assert!(table.is_censored(Some(CountryCode::FRANCE), ByDefault));
        // websocket capability still comes from the lookalike's own flag
        assert!(table.supports_websockets(Some(CountryCode::FRANCE), ByDefault));
    }

    #[test]
    fn test_hostnames() {
        let table = table();
        let hosts = table.hostnames();

        assert!(hosts.contains("chat.signal.org"));
        assert!(hosts.contains("www.google.com.eg"));
        assert!(hosts.contains("reflector-nrgwuv7kwq-uc.a.run.app"));
        assert!(hosts.contains("cdn.sstatic.net"));
        assert!(hosts.contains("storage.signal.org.global.prod.fastly.net"));
        assert!(hosts.contains("sfu.voip.signal.org"));
    }

    #[test]
    fn test_duplicate_country_rejected() {
        let mut config = NetworkAccessConfig::default_config();
        config.alternate_fronting.country_codes.push(CountryCode::EGYPT);

        assert!(matches!(
            RoutingTable::build(&config, InterceptorChain::empty()),
            Err(ConfigError::DuplicateCountry(CountryCode::EGYPT))
        ));
    }

    #[test]
    fn test_empty_covers_rejected() {
        let mut config = NetworkAccessConfig::default_config();
        config.primary_fronting.covers.clear();

        assert!(matches!(
            RoutingTable::build(&config, InterceptorChain::empty()),
            Err(ConfigError::NoCovers(_))
        ));
    }

    #[test]
    fn test_bad_trust_store_fails_build() {
        let mut config = NetworkAccessConfig::default_config();
        config.trust.alternate_fronting = TrustSource::Pem {
            pem: "-----BEGIN CERTIFICATE-----\n!!!!\n-----END CERTIFICATE-----\n".to_string(),
        };

        assert!(matches!(
            RoutingTable::build(&config, InterceptorChain::empty()),
            Err(ConfigError::Trust(_))
        ));
    }

    #[test]
    fn test_bad_base_url_fails_build() {
        let mut config = NetworkAccessConfig::default_config();
        config.direct.urls.cdsi = "cdsi.signal.org".to_string();

        assert!(matches!(
            RoutingTable::build(&config, InterceptorChain::empty()),
            Err(ConfigError::Endpoint(_))
        ));
    }

    #[test]
    fn test_auxiliary_hosts_accept_urls() {
        let mut config = NetworkAccessConfig::default_config();
        config.direct.auxiliary_hosts = vec!["https://sfu.voip.signal.org".to_string(), "Updates.Signal.org".to_string()];

        let table = RoutingTable::build(&config, InterceptorChain::empty()).unwrap();
        assert!(table.hostnames().contains("sfu.voip.signal.org"));
        assert!(table.hostnames().contains("updates.signal.org"));
        assert!(table.hostnames().iter().all(|h| !h.contains("://")));
    }

    #[test]
    fn test_bad_auxiliary_host_fails_build() {
        let mut config = NetworkAccessConfig::default_config();
        config.direct.auxiliary_hosts.push("not a host/..".to_string());

        assert!(matches!(
            RoutingTable::build(&config, InterceptorChain::empty()),
            Err(ConfigError::Endpoint(_))
        ));
    }

    #[test]
    fn test_cover_with_query_fails_build() {
        let mut config = NetworkAccessConfig::default_config();
        config.primary_fronting.covers[0].url = "https://www.google.com?x=1".to_string();

        assert!(matches!(
            RoutingTable::build(&config, InterceptorChain::empty()),
            Err(ConfigError::Endpoint(_))
        ));
    }

    #[test]
    fn test_pem_trust_sources() {
        let mut config = NetworkAccessConfig::default_config();
        config.trust.primary_fronting = TrustSource::Pem {
            pem: FRONTING_CA.to_string(),
        };

        let table = RoutingTable::build(&config, InterceptorChain::empty()).unwrap();
        assert_eq!(table.default_fronted().trust_anchor().len(), 1);
        assert_eq!(table.dedicated(CountryCode::QATAR).unwrap().trust_anchor().len(), 1);
        assert!(table.direct().trust_anchor().len() > 1);
    }

    #[test]
    fn test_from_parts_minimal() {
        let anchor = TrustAnchor::from_pem("direct", FRONTING_CA.as_bytes()).unwrap();
        let urls = CategoryMap {
            service: "https://chat.example.org".to_string(),
            cdn: "https://cdn.example.org".to_string(),
            cdn2: "https://cdn2.example.org".to_string(),
            contact_discovery: "https://directory.example.org".to_string(),
            key_backup: "https://backup.example.org".to_string(),
            storage: "https://storage.example.org".to_string(),
            cdsi: "https://cdsi.example.org".to_string(),
        };
        let direct = Arc::new(EndpointSet::direct(&urls, &anchor, &MODERN_TLS, &SetCommon::default()).unwrap());
        let fronted = Arc::new(EndpointSet::clone(&direct));

        let table = RoutingTable::from_parts(direct, fronted, HashMap::new(), HashSet::new());

        assert!(!table.is_censored(Some(CountryCode::FRANCE), ByDefault));
        assert!(table.is_censored(Some(CountryCode::FRANCE), Enabled));
        assert_eq!(table.hostnames().len(), 7);
    }
}
