//! Request Interceptor Chain
//!
//! The transport runs every outbound request through the same ordered chain
//! of middleware, whichever endpoint set it was resolved against. The chain
//! is built once and shared by reference between all sets, so a fronted and
//! a direct client always tag and filter requests identically.
//!
//! Flow:
//! 1. Transport builds the request for a descriptor
//! 2. Each interceptor runs in order and may rewrite headers
//! 3. The first interceptor to block stops the chain

use hyper::Request;
use std::sync::Arc;
use tracing::{debug, trace};

/// Result of running a request through the chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterceptResult {
    /// Request may proceed
    Allow,
    /// Request must not be sent
    Blocked {
        /// Name of the interceptor that stopped the request
        interceptor: String,
        reason: String,
    },
}

impl InterceptResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, InterceptResult::Allow)
    }
}

/// Request-mutating middleware. Implementations live with the transport.
pub trait Interceptor: Send + Sync {
    /// Short identifier, used in logs and block results
    fn name(&self) -> &str;

    /// Inspect or rewrite the outbound request.
    ///
    /// Returning `Err(reason)` blocks the request.
    fn intercept(&self, request: &mut Request<()>) -> Result<(), String>;
}

/// Ordered, shared list of interceptors
#[derive(Clone)]
pub struct InterceptorChain {
    interceptors: Arc<[Arc<dyn Interceptor>]>,
}

impl InterceptorChain {
    pub fn new(interceptors: Vec<Arc<dyn Interceptor>>) -> Self {
        Self {
            interceptors: interceptors.into(),
        }
    }

    /// Chain with no middleware
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Interceptor names in execution order
    pub fn names(&self) -> Vec<&str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    /// Run the request through every interceptor in order
    pub fn apply(&self, request: &mut Request<()>) -> InterceptResult {
        for interceptor in self.interceptors.iter() {
            trace!("Interceptor {} on {}", interceptor.name(), request.uri());

            if let Err(reason) = interceptor.intercept(request) {
                debug!(
                    "Request to {} blocked by {}: {}",
                    request.uri(),
                    interceptor.name(),
                    reason
                );
                return InterceptResult::Blocked {
                    interceptor: interceptor.name().to_string(),
                    reason,
                };
            }
        }

        InterceptResult::Allow
    }

    /// Whether both handles refer to the same chain instance
    pub fn same_chain(&self, other: &InterceptorChain) -> bool {
        Arc::ptr_eq(&self.interceptors, &other.interceptors)
    }
}

impl Default for InterceptorChain {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for InterceptorChain {
    fn eq(&self, other: &Self) -> bool {
        self.same_chain(other)
    }
}

impl Eq for InterceptorChain {}

impl std::fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
