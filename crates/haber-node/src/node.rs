//! # Haber Node
//!
//! Owns the running diamond and its collaborators.
//!
//! ## Startup Sequence
//!
//! 1. Plan the standard deployment and deploy the facet code
//! 2. Restore the diamond from its snapshot, if one exists
//! 3. Otherwise deploy a fresh diamond and apply the first cut
//! 4. Signal ready

use std::sync::Arc;

use anyhow::{Context, Result};
use haber_diamond::adapters::{InMemoryFacetDeployments, TracingEventSink};
use haber_diamond::domain::value_objects::Address;
use haber_diamond::ports::inbound::DiamondApi;
use haber_diamond::service::{DiamondService, DiamondStats};
use tracing::info;

use crate::config::NodeConfig;
use crate::deploy::{standard_builder, DeploymentPlan};
use crate::store::NodeStore;

/// The diamond as the node runs it.
pub type NodeDiamond = DiamondService<InMemoryFacetDeployments, TracingEventSink, NodeStore>;

/// The node runtime.
pub struct HaberNode {
    config: NodeConfig,
    diamond: Arc<NodeDiamond>,
    restored: bool,
}

impl HaberNode {
    /// Bring the diamond up, restoring persisted state when present.
    ///
    /// # Errors
    ///
    /// Fails if the deployment plan is invalid, the snapshot is unreadable or
    /// corrupted, or the first cut is rejected.
    pub async fn start(config: NodeConfig) -> Result<Self> {
        config.validate().context("Invalid node configuration")?;

        let plan = standard_builder(&config)
            .context("Failed to encode deployment initializer")?
            .build()
            .context("Failed to plan deployment")?;

        let deployments = Arc::new(InMemoryFacetDeployments::new());
        for planned in &plan.facets {
            deployments.deploy(planned.address, Arc::clone(&planned.facet));
        }

        let store = Arc::new(NodeStore::from_config(&config.storage));
        info!(backend = store.kind(), "Opening diamond store");

        let events = Arc::new(TracingEventSink);
        let restored = DiamondService::restore(
            config.diamond_config(),
            Arc::clone(&deployments),
            Arc::clone(&events),
            Arc::clone(&store),
        )
        .await
        .context("Failed to restore diamond")?;

        let (diamond, restored) = match restored {
            Some(diamond) => (diamond, true),
            None => (Self::deploy(&config, &plan, deployments, events, store).await?, false),
        };

        let node = Self {
            config,
            diamond: Arc::new(diamond),
            restored,
        };
        node.log_summary().await;
        Ok(node)
    }

    async fn deploy(
        config: &NodeConfig,
        plan: &DeploymentPlan,
        deployments: Arc<InMemoryFacetDeployments>,
        events: Arc<TracingEventSink>,
        store: Arc<NodeStore>,
    ) -> Result<NodeDiamond> {
        info!("No diamond snapshot found, deploying");

        let diamond = DiamondService::deploy(
            plan.owner,
            config.diamond_config(),
            deployments,
            events,
            store,
        )
        .await
        .context("Failed to deploy diamond")?;

        diamond
            .diamond_cut(plan.owner, plan.cut.clone())
            .await
            .context("Failed to apply initial facet cut")?;

        info!(
            facets = plan.facets.len(),
            selectors = plan.cut.selector_count(),
            "Initial facet cut applied"
        );
        Ok(diamond)
    }

    async fn log_summary(&self) {
        let facets = self.diamond.facets().await;
        info!(
            diamond = %self.diamond.address(),
            owner = %self.diamond.owner().await,
            restored = self.restored,
            facets = facets.len(),
            "Diamond ready"
        );
        for view in facets {
            info!(facet = %view.address, selectors = view.selectors.len(), "Facet");
        }
    }

    /// The running diamond.
    #[must_use]
    pub fn diamond(&self) -> Arc<NodeDiamond> {
        Arc::clone(&self.diamond)
    }

    /// Configuration the node was started with.
    #[must_use]
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Returns true if state was restored from a snapshot.
    #[must_use]
    pub fn restored(&self) -> bool {
        self.restored
    }

    /// Current owner of the diamond.
    pub async fn owner(&self) -> Address {
        self.diamond.owner().await
    }

    /// Shut down, logging final statistics.
    pub async fn shutdown(&self) -> DiamondStats {
        let stats = self.diamond.stats().await;
        info!(
            dispatched = stats.dispatched,
            committed = stats.committed,
            reverted = stats.reverted,
            cuts_applied = stats.cuts_applied,
            unauthorized = stats.unauthorized_rejections,
            "Shutdown complete"
        );
        stats
    }
}
