//! # Driven Ports (SPI - Outbound)
//!
//! Interfaces the diamond depends on:
//! - Facet logic and the lookup of deployed facets by address
//! - Publication of committed notifications
//! - Durable persistence of the diamond state
//!
//! Dependencies point INWARD: adapters implement these traits.

use crate::domain::entities::{DiamondSnapshot, FacetCall};
use crate::domain::storage::FacetStorage;
use crate::domain::value_objects::{Address, Bytes, Selector};
use crate::errors::{FacetError, StoreError};
use crate::events::EventRecord;
use async_trait::async_trait;
use std::sync::Arc;

// =============================================================================
// FACET
// =============================================================================

/// Logic module executed on behalf of the diamond.
///
/// A facet holds no state of its own. It reads and writes the diamond's
/// storage through the handle it is lent for the call, which is what lets a
/// facet be swapped without losing accumulated state.
pub trait Facet: Send + Sync {
    /// Human-readable facet name, for logs.
    fn name(&self) -> &str;

    /// Selectors this facet implements.
    fn selectors(&self) -> Vec<Selector>;

    /// Execute `call.selector` against the diamond's storage.
    ///
    /// # Errors
    ///
    /// Any `FacetError`; the diamond reverts the call and surfaces the reason
    /// unchanged.
    fn execute(&self, call: &FacetCall, storage: &mut dyn FacetStorage)
        -> Result<Bytes, FacetError>;
}

/// Looks up deployed facet code by address.
pub trait FacetResolver: Send + Sync {
    /// Facet deployed at `address`, if any.
    fn resolve(&self, address: Address) -> Option<Arc<dyn Facet>>;
}

// =============================================================================
// EVENT SINK
// =============================================================================

/// Receives notifications after the producing call has committed.
pub trait EventSink: Send + Sync {
    /// Publish one committed notification.
    fn publish(&self, record: EventRecord);
}

// =============================================================================
// DIAMOND STORE
// =============================================================================

/// Durable persistence for the selector table, ownership and storage.
///
/// Implementations must make `save` atomic: a reader sees either the previous
/// snapshot or the new one.
#[async_trait]
pub trait DiamondStore: Send + Sync {
    /// Load the last saved snapshot, if any.
    async fn load(&self) -> Result<Option<DiamondSnapshot>, StoreError>;

    /// Replace the saved snapshot.
    async fn save(&self, snapshot: &DiamondSnapshot) -> Result<(), StoreError>;
}

// =============================================================================
// TESTS
// =============================================================================
