//! Integration tests for endpoint resolution
//!
//! Builds the production routing table and checks:
//! - Route selection per country code and preference
//! - Identity-based censorship classification
//! - WebSocket capability
//! - Shared interceptors and TLS materialization across sets

use hyper::Request;
use hyper::header::HOST;
use reach_net::{
    CircumventionPreference, CountryCode, EndpointCategory, FixedEnvironment, Interceptor, InterceptorChain,
    NetworkAccess, NetworkAccessConfig, RoutingTable, TrustSource, client_config,
};
use std::sync::Arc;

use CircumventionPreference::{Default as ByDefault, Disabled, Enabled};

const UNLISTED: CountryCode = CountryCode::FRANCE;

fn table() -> RoutingTable {
    RoutingTable::build(&NetworkAccessConfig::default_config(), InterceptorChain::empty())
        .expect("Failed to build routing table")
}

/// Sets the host header from the descriptor the transport picked
struct HostOverride(String);

impl Interceptor for HostOverride {
    fn name(&self) -> &str {
        "host-override"
    }

    fn intercept(&self, request: &mut Request<()>) -> Result<(), String> {
        let value = self.0.parse::<hyper::header::HeaderValue>().map_err(|_| "invalid host".to_string())?;
        request.headers_mut().insert(HOST, value);
        Ok(())
    }
}

#[test]
fn test_iran_default_uses_alternate_provider() {
    let table = table();
    let set = table.resolve(Some(CountryCode::IRAN), ByDefault);

    assert!(table.is_censored(Some(CountryCode::IRAN), ByDefault));
    assert!(!table.supports_websockets(Some(CountryCode::IRAN), ByDefault));
    assert_eq!(set.trust_anchor().name(), "alternate-fronting");

    let service = set.endpoints(EndpointCategory::Service);
    assert_eq!(service.len(), 5);
    assert_eq!(service[0].url(), "https://cdn.sstatic.net");
    assert_eq!(
        service[0].host_header(),
        Some("textsecure-service.whispersystems.org.global.prod.fastly.net")
    );
}

#[test]
fn test_france_default_is_direct() {
    let table = table();

    assert!(table.is_direct(table.resolve(Some(UNLISTED), ByDefault)));
    assert!(!table.is_censored(Some(UNLISTED), ByDefault));
    assert!(table.supports_websockets(Some(UNLISTED), ByDefault));
}

#[test]
fn test_no_number_enabled_is_direct() {
    let access = NetworkAccess::new(table(), Arc::new(FixedEnvironment::unregistered(Enabled)));

    assert!(!access.is_censored());
    assert!(access.supports_websockets());
    assert!(access.table().is_direct(&access.configuration()));
}

#[test]
fn test_unlisted_enabled_uses_default_fronted_set() {
    let table = table();
    let set = table.resolve(Some(UNLISTED), Enabled);

    assert!(Arc::ptr_eq(set, table.default_fronted()));
    assert!(!table.is_direct(set));
    assert_eq!(
        set.endpoints(EndpointCategory::Cdsi)[0].url(),
        "https://www.google.com/cdsi"
    );
}

#[test]
fn test_disabled_is_always_direct() {
    let table = table();
    let mut codes = table.dedicated_countries();
    codes.push(UNLISTED);

    for code in codes {
        assert!(table.is_direct(table.resolve(Some(code), Disabled)), "{}", code);
    }
}

#[test]
fn test_default_matches_enabled_for_fronted_countries() {
    let table = table();

    for code in table.fronted_by_default() {
        let by_default = table.resolve(Some(code), ByDefault);
        let enabled = table.resolve(Some(code), Enabled);
        assert!(Arc::ptr_eq(by_default, enabled), "{}", code);
    }
}

#[test]
fn test_default_matches_direct_elsewhere() {
    let table = table();

    for code in [UNLISTED, CountryCode::UKRAINE] {
        assert!(Arc::ptr_eq(table.resolve(Some(code), ByDefault), table.direct()));
    }
}

#[test]
fn test_every_set_shares_interceptors() {
    let chain = InterceptorChain::new(vec![Arc::new(HostOverride("reflector".to_string()))]);
    let table = RoutingTable::build(&NetworkAccessConfig::default_config(), chain.clone()).unwrap();

    let mut sets = vec![table.direct().clone(), table.default_fronted().clone()];
    for code in table.dedicated_countries() {
        sets.push(table.dedicated(code).unwrap().clone());
    }

    for set in &sets {
        assert!(set.interceptors().same_chain(&chain));
    }

    let mut request = Request::builder()
        .uri(sets[1].endpoints(EndpointCategory::Storage)[0].url())
        .body(())
        .unwrap();
    assert!(sets[1].interceptors().apply(&mut request).is_allowed());
    assert_eq!(request.headers()[HOST], "reflector");
}

#[test]
fn test_every_descriptor_has_tls_config() {
    let table = table();

    for code in table.dedicated_countries() {
        for descriptor in table.dedicated(code).unwrap().descriptors() {
            client_config(descriptor).expect("Failed to build TLS config");
        }
    }
}

#[test]
fn test_rebuild_with_pinned_fronting_ca() {
    let access = NetworkAccess::new(
        table(),
        Arc::new(FixedEnvironment::registered(CountryCode::UZBEKISTAN, ByDefault)),
    );
    assert!(access.configuration().trust_anchor().len() > 1);

    let mut config = NetworkAccessConfig::default_config();
    config.trust.primary_fronting = TrustSource::Pem {
        pem: include_str!("../testdata/fronting-ca.pem").to_string(),
    };
    access
        .rebuild(&config, InterceptorChain::empty())
        .expect("Failed to rebuild");

    let set = access.configuration();
    assert_eq!(set.trust_anchor().len(), 1);
    assert_eq!(
        set.endpoints(EndpointCategory::KeyBackup)[0].url(),
        "https://www.google.co.uz/backup"
    );
}
