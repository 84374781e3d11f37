//! # Deployment Builder
//!
//! Plans the first deployment of a diamond: where every facet lands and the
//! initial cut that wires their selectors into the diamond.

use std::sync::Arc;

use haber_diamond::domain::entities::{DiamondCut, FacetCut, InitCall};
use haber_diamond::domain::services::compute_contract_address;
use haber_diamond::domain::value_objects::{Address, Bytes, Selector};
use haber_diamond::ports::outbound::Facet;
use thiserror::Error;

/// Deployment planning errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeployError {
    /// Owner is the null address.
    #[error("deployer must not be the null address")]
    NullDeployer,

    /// No facet to deploy.
    #[error("deployment has no facets")]
    NoFacets,

    /// Initializer selector is not served by any planned facet.
    #[error("no planned facet serves initializer {0}")]
    UnknownInitializer(Selector),
}

/// A facet together with the address it is deployed at.
#[derive(Clone)]
pub struct PlannedFacet {
    /// Deployment address.
    pub address: Address,
    /// Facet code.
    pub facet: Arc<dyn Facet>,
}

impl std::fmt::Debug for PlannedFacet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlannedFacet")
            .field("address", &self.address)
            .field("facet", &self.facet.name())
            .finish()
    }
}

/// The planned deployment.
#[derive(Debug, Clone)]
pub struct DeploymentPlan {
    /// Deployer and initial owner.
    pub owner: Address,
    /// Diamond address.
    pub diamond: Address,
    /// Facets with their addresses, in deployment order.
    pub facets: Vec<PlannedFacet>,
    /// First cut: Add of every facet's selectors, plus the initializer.
    pub cut: DiamondCut,
}

/// Builds a [`DeploymentPlan`].
///
/// Facet addresses follow the diamond's: the diamond is created at
/// `deployer_nonce`, facet `i` at `deployer_nonce + 1 + i`.
pub struct DeploymentBuilder {
    owner: Address,
    deployer_nonce: u64,
    diamond: Option<Address>,
    facets: Vec<Arc<dyn Facet>>,
    initializer: Option<(Selector, Bytes)>,
}

impl DeploymentBuilder {
    /// Start a plan for `owner` deploying at `deployer_nonce`.
    #[must_use]
    pub fn new(owner: Address, deployer_nonce: u64) -> Self {
        Self {
            owner,
            deployer_nonce,
            diamond: None,
            facets: Vec::new(),
            initializer: None,
        }
    }

    /// Place the diamond at an explicit address.
    #[must_use]
    pub fn with_diamond_address(mut self, diamond: Address) -> Self {
        self.diamond = Some(diamond);
        self
    }

    /// Add a facet to deploy and cut in.
    #[must_use]
    pub fn with_facet(mut self, facet: Arc<dyn Facet>) -> Self {
        self.facets.push(facet);
        self
    }

    /// Run `selector` with `payload` as part of the initial cut.
    #[must_use]
    pub fn with_initializer(mut self, selector: Selector, payload: Bytes) -> Self {
        self.initializer = Some((selector, payload));
        self
    }

    /// Build the plan.
    ///
    /// # Errors
    ///
    /// `NullDeployer`, `NoFacets`, or `UnknownInitializer` if the
    /// initializer selector is not served by a planned facet.
    pub fn build(self) -> Result<DeploymentPlan, DeployError> {
        if self.owner.is_zero() {
            return Err(DeployError::NullDeployer);
        }
        if self.facets.is_empty() {
            return Err(DeployError::NoFacets);
        }

        let diamond = self
            .diamond
            .unwrap_or_else(|| compute_contract_address(self.owner, self.deployer_nonce));

        let facets: Vec<PlannedFacet> = self
            .facets
            .into_iter()
            .zip(self.deployer_nonce + 1..)
            .map(|(facet, nonce)| PlannedFacet {
                address: compute_contract_address(self.owner, nonce),
                facet,
            })
            .collect();

        let cuts = facets
            .iter()
            .map(|planned| FacetCut::add(planned.address, planned.facet.selectors()))
            .collect();
        let mut cut = DiamondCut::new(cuts);

        if let Some((selector, payload)) = self.initializer {
            let target = facets
                .iter()
                .find(|planned| planned.facet.selectors().contains(&selector))
                .map(|planned| planned.address)
                .ok_or(DeployError::UnknownInitializer(selector))?;
            cut = cut.with_init(InitCall {
                target,
                selector,
                payload,
            });
        }

        Ok(DeploymentPlan {
            owner: self.owner,
            diamond,
            facets,
            cut,
        })
    }
}
