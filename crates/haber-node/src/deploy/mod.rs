//! # Deployment Module
//!
//! First-start deployment of the diamond and its starting facets.
//!
//! ## Deployment Sequence
//!
//! 1. Construct the diamond with the deployer as owner
//! 2. Deploy each starting facet at the deployer's next nonces
//! 3. Issue the first cut: Add every facet's selectors, run the initializer
//!
//! On restart the diamond is restored from its snapshot instead; the facets
//! are redeployed at the same addresses because the plan is deterministic.

pub mod builder;

pub use builder::{DeployError, DeploymentBuilder, DeploymentPlan, PlannedFacet};

use std::sync::Arc;

use haber_diamond::domain::value_objects::{Bytes, Selector, StorageKey, StorageValue};
use haber_diamond::errors::CodecError;
use haber_diamond::events::codec;

use crate::config::NodeConfig;
use crate::facets::{CounterFacet, KeyValueFacet};

/// Key the initializer records the deployer under.
///
/// The key lives in the key/value facet's map: read it with
/// `getValue(deployer_key())`, or directly from the slot
/// `KeyValueFacet::slot(deployer_key())`.
#[must_use]
pub fn deployer_key() -> StorageKey {
    StorageKey::namespaced("haber.deployer")
}

/// The node's standard deployment: counter and key/value facets, with the
/// deployer recorded by the key/value initializer.
///
/// # Errors
///
/// `Codec` if the initializer payload cannot be encoded.
pub fn standard_builder(config: &NodeConfig) -> Result<DeploymentBuilder, CodecError> {
    let owner = config.deployment.owner;
    let seed: Vec<(StorageKey, StorageValue)> =
        vec![(deployer_key(), StorageValue::from_address(owner))];
    let payload: Bytes = codec::encode(&seed)?;

    Ok(
        DeploymentBuilder::new(owner, config.deployment.deployer_nonce)
            .with_diamond_address(config.diamond_address())
            .with_facet(Arc::new(CounterFacet::new()))
            .with_facet(Arc::new(KeyValueFacet::new()))
            .with_initializer(Selector::from_signature(KeyValueFacet::SET_VALUES), payload),
    )
}
