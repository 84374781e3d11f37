//! # Error Types
//!
//! All error types for the diamond proxy.
//!
//! Domain components return their own narrow error (`RegistryError`,
//! `OwnershipError`, `FacetError`); the dispatch proxy surfaces everything as
//! a [`DiamondError`] with a stable [`reason_code`](DiamondError::reason_code).

use crate::domain::value_objects::{Address, Selector};
use thiserror::Error;

// =============================================================================
// REGISTRY ERRORS
// =============================================================================

/// Errors raised while validating a facet cut against the selector table.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Add referenced a selector that already has an entry.
    #[error("selector collision: {selector} already routed to {existing:?}")]
    SelectorCollision {
        /// Selector the cut tried to add.
        selector: Selector,
        /// Target already serving it.
        existing: Address,
    },

    /// Replace/Remove referenced a selector without an entry.
    #[error("unknown selector: {0}")]
    UnknownSelector(Selector),

    /// Replace/Remove targeted a selector served by the diamond itself.
    #[error("immutable selector: {0} is served by the diamond")]
    ImmutableSelector(Selector),

    /// A cut carried no selectors.
    #[error("invalid facet cut: no selectors for {target:?}")]
    EmptySelectors {
        /// Target of the empty cut.
        target: Address,
    },

    /// Add/Replace named the null address as target.
    #[error("invalid facet cut: {action} requires a non-null target")]
    NullTarget {
        /// Operation that was rejected.
        action: &'static str,
    },

    /// Add/Replace tried to route a selector to the diamond itself.
    #[error("invalid facet cut: {action} cannot target the diamond")]
    DiamondTarget {
        /// Operation that was rejected.
        action: &'static str,
    },

    /// Remove named a target other than the null address.
    #[error("invalid facet cut: remove target must be null, got {target:?}")]
    RemoveTargetNotNull {
        /// Target supplied with the remove.
        target: Address,
    },

    /// The batch touched more selectors than the configured limit.
    #[error("invalid facet cut: {count} selectors exceeds limit {max}")]
    TooManySelectors {
        /// Selectors in the batch.
        count: usize,
        /// Configured limit.
        max: usize,
    },
}

// =============================================================================
// OWNERSHIP ERRORS
// =============================================================================

/// Errors raised by the ownership state machine and the cut authorizer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OwnershipError {
    /// Caller lacks the owner or nominee capability for this transition.
    #[error("unauthorized: {caller:?}")]
    Unauthorized {
        /// Rejected caller.
        caller: Address,
    },

    /// Nominee is the null address, the current owner, or absent.
    #[error("invalid nominee: {nominee:?}")]
    InvalidNominee {
        /// Offending nominee, null when none is pending.
        nominee: Address,
    },
}

// =============================================================================
// FACET ERRORS
// =============================================================================

/// Failure reported by a facet's own logic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FacetError {
    /// The facet reverted with a reason string.
    #[error("{0}")]
    Revert(String),

    /// The facet does not implement the selector it was invoked with.
    #[error("facet does not implement selector {0}")]
    UnsupportedSelector(Selector),

    /// The facet could not decode its argument payload.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

// =============================================================================
// CODEC ERRORS
// =============================================================================

/// Errors from encoding or decoding administrative payloads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Payload could not be decoded.
    #[error("decode failed: {0}")]
    Decode(String),

    /// Value could not be encoded.
    #[error("encode failed: {0}")]
    Encode(String),
}

impl From<bincode::Error> for CodecError {
    fn from(err: bincode::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

// =============================================================================
// STORE ERRORS
// =============================================================================

/// Errors from the persistence layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Underlying I/O failed.
    #[error("store I/O error: {0}")]
    Io(String),

    /// Snapshot could not be (de)serialized.
    #[error("snapshot serialization error: {0}")]
    Serialization(String),

    /// Loaded snapshot violates a diamond invariant.
    #[error("snapshot corrupted: {0}")]
    Corrupted(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

// =============================================================================
// DIAMOND ERRORS
// =============================================================================

/// Errors surfaced to callers of the dispatch proxy.
///
/// Every variant aborts the call in its entirety; no partial mutation is
/// ever committed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiamondError {
    /// Caller lacks the owner/nominee capability.
    #[error("unauthorized caller {caller:?}")]
    Unauthorized {
        /// Rejected caller.
        caller: Address,
    },

    /// Add referenced an already claimed selector.
    #[error("selector collision: {selector} already routed to {existing:?}")]
    SelectorCollision {
        /// Selector the cut tried to add.
        selector: Selector,
        /// Target already serving it.
        existing: Address,
    },

    /// Replace/Remove/dispatch referenced a selector with no entry.
    #[error("unknown selector: {0}")]
    UnknownSelector(Selector),

    /// Transfer/accept/cancel with a degenerate or missing nominee.
    #[error("invalid nominee: {nominee:?}")]
    InvalidNominee {
        /// Offending nominee, null when none is pending.
        nominee: Address,
    },

    /// Replace/Remove of a selector served by the diamond itself.
    #[error("immutable selector: {0}")]
    ImmutableSelector(Selector),

    /// Structurally invalid cut request.
    #[error("invalid facet cut: {0}")]
    InvalidFacetCut(String),

    /// Selector routes to an address with no deployed facet code.
    #[error("no facet deployed at {facet:?} for selector {selector}")]
    FacetNotDeployed {
        /// Selector being dispatched.
        selector: Selector,
        /// Address the selector routes to.
        facet: Address,
    },

    /// Facet logic failed; reason is passed through unmodified.
    #[error("facet reverted: {0}")]
    FacetReverted(String),

    /// Raw calldata shorter than a selector.
    #[error("malformed calldata: {len} bytes")]
    MalformedCalldata {
        /// Calldata length in bytes.
        len: usize,
    },

    /// Administrative payload could not be decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Persisting the committed state failed; the call was rolled back.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl DiamondError {
    /// Stable reason code surfaced to callers.
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "Unauthorized",
            Self::SelectorCollision { .. } => "SelectorCollision",
            Self::UnknownSelector(_) => "UnknownSelector",
            Self::InvalidNominee { .. } => "InvalidNominee",
            Self::ImmutableSelector(_) => "ImmutableSelector",
            Self::InvalidFacetCut(_) => "InvalidFacetCut",
            Self::FacetNotDeployed { .. } => "FacetNotDeployed",
            Self::FacetReverted(_) => "FacetReverted",
            Self::MalformedCalldata { .. } => "MalformedCalldata",
            Self::Codec(_) => "Codec",
            Self::Store(_) => "Store",
        }
    }

    /// Returns true if the call was rejected for lack of authority.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

impl From<RegistryError> for DiamondError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::SelectorCollision { selector, existing } => {
                Self::SelectorCollision { selector, existing }
            }
            RegistryError::UnknownSelector(selector) => Self::UnknownSelector(selector),
            RegistryError::ImmutableSelector(selector) => Self::ImmutableSelector(selector),
            other => Self::InvalidFacetCut(other.to_string()),
        }
    }
}

impl From<OwnershipError> for DiamondError {
    fn from(err: OwnershipError) -> Self {
        match err {
            OwnershipError::Unauthorized { caller } => Self::Unauthorized { caller },
            OwnershipError::InvalidNominee { nominee } => Self::InvalidNominee { nominee },
        }
    }
}

impl From<FacetError> for DiamondError {
    fn from(err: FacetError) -> Self {
        Self::FacetReverted(err.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================
