//! Network Access
//!
//! Entry point for the transport. Reads the local number, country code and
//! circumvention preference from the host application and answers with the
//! endpoint set to use for the next call.
//!
//! # Usage
//!
//! ```rust,ignore
//! let config = NetworkAccessConfig::default_config();
//! let table = RoutingTable::build(&config, interceptors.clone())?;
//! let access = NetworkAccess::new(table, Arc::new(environment));
//!
//! let resolution = access.resolve();
//! if resolution.is_censored() {
//!     // fronted: no websockets, host header override on every descriptor
//! }
//!
//! // Locale changed: swap in a new table
//! access.rebuild(&config, interceptors)?;
//! ```

use crate::config::{ConfigError, NetworkAccessConfig};
use crate::country::CountryCode;
use crate::endpoint::EndpointSet;
use crate::interceptor::InterceptorChain;
use crate::routing::{CircumventionPreference, RoutingTable};
use arc_swap::ArcSwap;
use std::sync::Arc;
use tracing::{debug, info};

/// What the host application knows about the local account
pub trait LocalEnvironment: Send + Sync {
    /// Registered number in E.164 form, if any
    fn local_e164(&self) -> Option<String>;

    /// Calling code of the registered number
    fn local_country_code(&self) -> Option<CountryCode>;

    fn circumvention_preference(&self) -> CircumventionPreference;
}

/// Environment with fixed answers
#[derive(Debug, Clone, Default)]
pub struct FixedEnvironment {
    pub e164: Option<String>,
    pub country_code: Option<CountryCode>,
    pub preference: CircumventionPreference,
}

impl FixedEnvironment {
    /// Registered number with the given calling code
    pub fn registered(country_code: CountryCode, preference: CircumventionPreference) -> Self {
        Self {
            e164: Some(format!("{}5550100", country_code)),
            country_code: Some(country_code),
            preference,
        }
    }

    /// No local number
    pub fn unregistered(preference: CircumventionPreference) -> Self {
        Self {
            e164: None,
            country_code: None,
            preference,
        }
    }
}

impl LocalEnvironment for FixedEnvironment {
    fn local_e164(&self) -> Option<String> {
        self.e164.clone()
    }

    fn local_country_code(&self) -> Option<CountryCode> {
        self.country_code
    }

    fn circumvention_preference(&self) -> CircumventionPreference {
        self.preference
    }
}

/// An endpoint set together with the table it was resolved from, so later
/// classification is unaffected by table swaps
#[derive(Debug, Clone)]
pub struct Resolution {
    table: Arc<RoutingTable>,
    set: Arc<EndpointSet>,
}

impl Resolution {
    pub fn set(&self) -> &Arc<EndpointSet> {
        &self.set
    }

    pub fn table(&self) -> &Arc<RoutingTable> {
        &self.table
    }

    pub fn into_set(self) -> Arc<EndpointSet> {
        self.set
    }

    /// Not the direct set of the table it came from
    pub fn is_censored(&self) -> bool {
        !self.table.is_direct(&self.set)
    }

    pub fn supports_websockets(&self) -> bool {
        !self.is_censored() || self.set.supports_websockets()
    }
}

/// Current routing table plus the environment it is queried with
pub struct NetworkAccess {
    table: ArcSwap<RoutingTable>,
    environment: Arc<dyn LocalEnvironment>,
}

impl NetworkAccess {
    pub fn new(table: RoutingTable, environment: Arc<dyn LocalEnvironment>) -> Self {
        Self {
            table: ArcSwap::from_pointee(table),
            environment,
        }
    }

    /// Snapshot of the current table
    pub fn table(&self) -> Arc<RoutingTable> {
        self.table.load_full()
    }

    /// Atomically replace the table. Readers see either the old or the new
    /// table, never a mix.
    pub fn replace_table(&self, table: RoutingTable) {
        info!(
            "Replacing routing table ({} dedicated entries)",
            table.dedicated_countries().len()
        );
        self.table.store(Arc::new(table));
    }

    /// Build a new table from `config` and swap it in. On error the current
    /// table stays in place.
    pub fn rebuild(&self, config: &NetworkAccessConfig, interceptors: InterceptorChain) -> Result<(), ConfigError> {
        let table = RoutingTable::build(config, interceptors)?;
        self.replace_table(table);
        Ok(())
    }

    /// Country code of the local number, `None` when there is no number
    pub fn local_country_code(&self) -> Option<CountryCode> {
        self.environment.local_e164()?;
        self.environment.local_country_code()
    }

    /// Resolve for the local account against one table snapshot
    pub fn resolve(&self) -> Resolution {
        self.resolve_for(self.local_country_code())
    }

    /// Resolve for an arbitrary country code under the current preference
    pub fn resolve_for(&self, country_code: Option<CountryCode>) -> Resolution {
        let preference = self.environment.circumvention_preference();
        let table = self.table.load_full();
        let set = table.resolve(country_code, preference).clone();
        Resolution { table, set }
    }

    /// Endpoint set for the local account
    pub fn configuration(&self) -> Arc<EndpointSet> {
        self.resolve().into_set()
    }

    pub fn configuration_for(&self, country_code: Option<CountryCode>) -> Arc<EndpointSet> {
        self.resolve_for(country_code).into_set()
    }

    pub fn is_censored(&self) -> bool {
        self.resolve().is_censored()
    }

    pub fn is_censored_for(&self, country_code: Option<CountryCode>) -> bool {
        self.resolve_for(country_code).is_censored()
    }

    pub fn supports_websockets(&self) -> bool {
        self.resolve().supports_websockets()
    }

    pub fn supports_websockets_for(&self, country_code: Option<CountryCode>) -> bool {
        self.resolve_for(country_code).supports_websockets()
    }

    pub fn is_country_code_censored_by_default(&self, country_code: CountryCode) -> bool {
        self.table.load().is_censored_by_default(country_code)
    }

    /// Whether to suggest turning circumvention off: the current route is
    /// fronted but the service answered without it
    pub fn should_suggest_disabling(&self, reachable_directly: bool) -> bool {
        let suggest = reachable_directly && self.is_censored();
        debug!(reachable_directly, suggest, "Circumvention hint");
        suggest
    }
}

impl std::fmt::Debug for NetworkAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkAccess")
            .field("table", &self.table.load_full())
            .finish_non_exhaustive()
    }
}
