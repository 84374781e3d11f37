//! # Core Domain Entities
//!
//! Cut requests, call contexts and the loupe view of the selector table.

use crate::domain::ownership::OwnershipState;
use crate::domain::storage::DiamondStorage;
use crate::domain::value_objects::{Address, Bytes, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// FACET CUT
// =============================================================================

/// Mutation applied by a [`FacetCut`].
///
/// Encoded on the wire as `Add = 0`, `Replace = 1`, `Remove = 2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum FacetCutAction {
    /// Route new selectors to the target.
    Add,
    /// Re-route existing selectors to the target.
    Replace,
    /// Drop existing selectors.
    Remove,
}

impl FacetCutAction {
    /// Lower-case action name, used in logs and errors.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Replace => "replace",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for FacetCutAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<FacetCutAction> for u8 {
    fn from(action: FacetCutAction) -> Self {
        match action {
            FacetCutAction::Add => 0,
            FacetCutAction::Replace => 1,
            FacetCutAction::Remove => 2,
        }
    }
}

impl TryFrom<u8> for FacetCutAction {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Add),
            1 => Ok(Self::Replace),
            2 => Ok(Self::Remove),
            other => Err(format!("unknown facet cut action: {other}")),
        }
    }
}

/// A batch mutation request against the selector table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCut {
    /// Facet address (null for Remove).
    pub target: Address,
    /// What to do with the selectors.
    pub action: FacetCutAction,
    /// Ordered selectors touched by this cut.
    pub selectors: Vec<Selector>,
}

impl FacetCut {
    /// Builds an Add cut.
    #[must_use]
    pub fn add(target: Address, selectors: Vec<Selector>) -> Self {
        Self {
            target,
            action: FacetCutAction::Add,
            selectors,
        }
    }

    /// Builds a Replace cut.
    #[must_use]
    pub fn replace(target: Address, selectors: Vec<Selector>) -> Self {
        Self {
            target,
            action: FacetCutAction::Replace,
            selectors,
        }
    }

    /// Builds a Remove cut. The target is always the null address.
    #[must_use]
    pub fn remove(selectors: Vec<Selector>) -> Self {
        Self {
            target: Address::ZERO,
            action: FacetCutAction::Remove,
            selectors,
        }
    }
}

/// Optional initializer executed after a cut is staged.
///
/// The initializer runs with the diamond's storage, so it can seed state for
/// the facets that were just added.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitCall {
    /// Facet holding the initializer logic.
    pub target: Address,
    /// Selector of the initializer function on that facet.
    pub selector: Selector,
    /// Argument payload.
    pub payload: Bytes,
}

/// A full `diamondCut` request: several cuts plus an optional initializer.
///
/// All cuts and the initializer commit together or not at all.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiamondCut {
    /// Cuts applied in order.
    pub cuts: Vec<FacetCut>,
    /// Initializer run once the cuts are staged.
    pub init: Option<InitCall>,
}

impl DiamondCut {
    /// Wraps cuts with no initializer.
    #[must_use]
    pub fn new(cuts: Vec<FacetCut>) -> Self {
        Self { cuts, init: None }
    }

    /// Attaches an initializer.
    #[must_use]
    pub fn with_init(mut self, init: InitCall) -> Self {
        self.init = Some(init);
        self
    }

    /// Total selectors touched across all cuts.
    #[must_use]
    pub fn selector_count(&self) -> usize {
        self.cuts.iter().map(|cut| cut.selectors.len()).sum()
    }
}

// =============================================================================
// LOUPE VIEW
// =============================================================================

/// A facet address together with the selectors it currently serves.
///
/// Derived from the selector table on demand, never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetView {
    /// Facet address.
    pub address: Address,
    /// Selectors routed to it, in registration order.
    pub selectors: Vec<Selector>,
}

// =============================================================================
// FACET CALL
// =============================================================================

/// Context handed to a facet for one delegated execution.
#[derive(Clone, Debug)]
pub struct FacetCall {
    /// Account that called the diamond.
    pub caller: Address,
    /// The diamond whose storage the facet operates on.
    pub diamond: Address,
    /// Selector being executed.
    pub selector: Selector,
    /// Argument payload (calldata without the selector).
    pub payload: Bytes,
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Routing entry as persisted: one selector and its target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorEntry {
    /// Function selector.
    pub selector: Selector,
    /// Facet address.
    pub target: Address,
}

/// Everything the persistence layer retains across calls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiamondSnapshot {
    /// Address of the diamond.
    pub diamond: Address,
    /// Owner / nominee state.
    pub ownership: OwnershipState,
    /// Selector table in registration order.
    pub entries: Vec<SelectorEntry>,
    /// Persistent storage.
    pub storage: DiamondStorage,
    /// Sequence number the next published event takes.
    #[serde(default)]
    pub next_event_sequence: u64,
}

// =============================================================================
// TESTS
// =============================================================================
