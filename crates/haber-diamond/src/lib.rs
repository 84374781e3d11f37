//! # Haber Diamond - Selector-Routed Dispatch Proxy
//!
//! A persistent dispatch contract ("diamond") that routes calls to swappable
//! logic modules ("facets") by 4-byte function selector, gated by a single
//! owner with a two-phase ownership transfer.
//!
//! ## Components
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | `OwnershipGuard` | `domain/ownership.rs` | `Owned` / `PendingTransfer` state machine |
//! | `FacetRegistry` | `domain/registry.rs` | Selector table, staged Add/Replace/Remove |
//! | `CutAuthorizer` | `domain/authorizer.rs` | Owner gate in front of the registry |
//! | `DiamondService` | `service.rs` | Dispatch proxy: routing, delegation, commit |
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement Location |
//! |----|-----------|---------------------|
//! | INVARIANT-1 | At most one entry per selector | `FacetRegistry::stage` |
//! | INVARIANT-2 | Owner never null, nominee never the owner | `OwnershipGuard` transitions |
//! | INVARIANT-3 | Cuts commit all-or-nothing | `StagedCut` + `StorageOverlay` |
//! | INVARIANT-4 | Built-in selectors stay routed to the diamond | `FacetRegistry::check_mutable` |
//!
//! All of them are re-checked by `domain::invariants::check_all_invariants`
//! after every commit in debug builds and on every restore.
//!
//! ## Built-in Functions
//!
//! | Function | Authority |
//! |----------|-----------|
//! | `diamondCut` | Owner |
//! | `transferOwnership` | Owner, no transfer pending |
//! | `acceptOwnership` | Nominee |
//! | `cancelOwnershipTransfer` | Owner |
//! | `owner`, `nomineeOwner`, loupe | Anyone |
//!
//! ## Outbound Dependencies
//!
//! | Port | Purpose | Adapters |
//! |------|---------|----------|
//! | `FacetResolver` | Facet code by address | `InMemoryFacetDeployments` |
//! | `EventSink` | Committed notifications | `InMemoryEventLog`, `TracingEventSink` |
//! | `DiamondStore` | Snapshot persistence | `InMemoryStore`, `JsonFileStore` |
//!
//! ## Usage Example
//!
//! ```ignore
//! use haber_diamond::prelude::*;
//!
//! let diamond = DiamondService::deploy(owner, DiamondConfig::default(), facets, log, store).await?;
//! diamond
//!     .diamond_cut(owner, DiamondCut::new(vec![FacetCut::add(facet, selectors)]))
//!     .await?;
//!
//! let output = diamond.dispatch(caller, selector, payload).await?;
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod domain;
pub mod errors;
pub mod events;
pub mod ports;
pub mod service;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain entities
    pub use crate::domain::entities::{
        DiamondCut, DiamondSnapshot, FacetCall, FacetCut, FacetCutAction, FacetView, InitCall,
        SelectorEntry,
    };

    // Value objects
    pub use crate::domain::value_objects::{
        Address, Bytes, Selector, StorageKey, StorageValue, U256,
    };

    // Domain components
    pub use crate::domain::authorizer::CutAuthorizer;
    pub use crate::domain::builtins::BuiltinFunction;
    pub use crate::domain::ownership::{OwnershipEvent, OwnershipGuard, OwnershipState};
    pub use crate::domain::registry::{FacetRegistry, StagedCut};
    pub use crate::domain::storage::{DiamondStorage, FacetStorage, StorageOverlay};

    // Domain services
    pub use crate::domain::services::{
        compute_contract_address, function_selector, join_calldata, keccak256, split_calldata,
    };

    // Invariants
    pub use crate::domain::invariants::{
        check_all_invariants, InvariantCheckResult, InvariantViolation,
    };

    // Ports
    pub use crate::ports::inbound::DiamondApi;
    pub use crate::ports::outbound::{DiamondStore, EventSink, Facet, FacetResolver};

    // Events
    pub use crate::events::{codec, topics, DiamondEvent, EventRecord};

    // Errors
    pub use crate::errors::{
        CodecError, DiamondError, FacetError, OwnershipError, RegistryError, StoreError,
    };

    // Adapters
    pub use crate::adapters::{
        InMemoryEventLog, InMemoryFacetDeployments, InMemoryStore, JsonFileStore,
        TracingEventSink,
    };

    // Service
    pub use crate::service::{DiamondConfig, DiamondService, DiamondStats};
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// TESTS
// =============================================================================
