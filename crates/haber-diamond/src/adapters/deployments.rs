//! # Facet Deployments
//!
//! In-memory table of deployed facet code, keyed by address.
//! Stands in for the chain's code storage: the diamond only ever stores
//! addresses and resolves them here at dispatch time.

use crate::domain::value_objects::Address;
use crate::ports::outbound::{Facet, FacetResolver};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Deployed facets by address.
#[derive(Default)]
pub struct InMemoryFacetDeployments {
    facets: RwLock<HashMap<Address, Arc<dyn Facet>>>,
}

impl InMemoryFacetDeployments {
    /// Create an empty deployment table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploy `facet` at `address`, replacing whatever was there.
    pub fn deploy(&self, address: Address, facet: Arc<dyn Facet>) {
        info!(address = ?address, facet = facet.name(), "Deployed facet");
        self.facets.write().insert(address, facet);
    }

    /// Remove the code at `address`.
    pub fn undeploy(&self, address: Address) -> bool {
        self.facets.write().remove(&address).is_some()
    }

    /// Number of deployed facets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.facets.read().len()
    }

    /// Returns true if nothing is deployed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facets.read().is_empty()
    }
}

impl FacetResolver for InMemoryFacetDeployments {
    fn resolve(&self, address: Address) -> Option<Arc<dyn Facet>> {
        self.facets.read().get(&address).cloned()
    }
}

// =============================================================================
// TESTS
// =============================================================================
