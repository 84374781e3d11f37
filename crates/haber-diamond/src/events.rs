//! # Event Schema
//!
//! Notifications emitted by the diamond and the payload schema of its
//! built-in functions.
//!
//! ## Notifications
//!
//! | Event | Emitted by |
//! |-------|------------|
//! | `OwnershipTransferStarted` | `transferOwnership` |
//! | `OwnershipTransferred` | `acceptOwnership` |
//! | `OwnershipTransferCancelled` | `cancelOwnershipTransfer` |
//! | `DiamondCut` | `diamondCut` |
//!
//! Events are buffered for the duration of a call and published only when the
//! call commits; a reverted call publishes nothing.

use crate::domain::entities::{FacetCut, InitCall};
use crate::domain::ownership::OwnershipEvent;
use crate::domain::value_objects::Address;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// NOTIFICATIONS
// =============================================================================

/// Observable notification emitted on commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiamondEvent {
    /// Owner nominated a successor.
    OwnershipTransferStarted {
        /// Owner at nomination time.
        previous_owner: Address,
        /// Nominated successor.
        nominee: Address,
    },
    /// Nominee accepted ownership.
    OwnershipTransferred {
        /// Owner before the transfer.
        previous_owner: Address,
        /// Owner after the transfer.
        new_owner: Address,
    },
    /// Owner withdrew a nomination.
    OwnershipTransferCancelled {
        /// Unchanged owner.
        owner: Address,
        /// Withdrawn nominee.
        nominee: Address,
    },
    /// Selector table was cut.
    DiamondCut {
        /// Cuts applied, in order.
        cuts: Vec<FacetCut>,
        /// Initializer that ran with the cut, if any.
        init: Option<InitCall>,
    },
}

impl DiamondEvent {
    /// Event name as it appears in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::OwnershipTransferStarted { .. } => "OwnershipTransferStarted",
            Self::OwnershipTransferred { .. } => "OwnershipTransferred",
            Self::OwnershipTransferCancelled { .. } => "OwnershipTransferCancelled",
            Self::DiamondCut { .. } => "DiamondCut",
        }
    }
}

impl From<OwnershipEvent> for DiamondEvent {
    fn from(event: OwnershipEvent) -> Self {
        match event {
            OwnershipEvent::TransferStarted {
                previous_owner,
                nominee,
            } => Self::OwnershipTransferStarted {
                previous_owner,
                nominee,
            },
            OwnershipEvent::Transferred {
                previous_owner,
                new_owner,
            } => Self::OwnershipTransferred {
                previous_owner,
                new_owner,
            },
            OwnershipEvent::TransferCancelled { owner, nominee } => {
                Self::OwnershipTransferCancelled { owner, nominee }
            }
        }
    }
}

/// A published notification with its position in the diamond's history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Monotonic sequence number across all published events.
    pub sequence: u64,
    /// Correlation ID of the call that produced the event.
    pub call_id: Uuid,
    /// The notification.
    pub event: DiamondEvent,
}

// =============================================================================
// BUILT-IN PAYLOAD CODEC
// =============================================================================

/// Encoding of built-in function payloads and return data.
///
/// | Function | Payload | Returns |
/// |----------|---------|---------|
/// | `diamondCut` | `DiamondCut` | empty |
/// | `transferOwnership` | `Address` | empty |
/// | `acceptOwnership`, `cancelOwnershipTransfer` | empty | empty |
/// | `owner`, `nomineeOwner` | empty | `Address` (null if none) |
/// | `facets` | empty | `Vec<FacetView>` |
/// | `facetFunctionSelectors` | `Address` | `Vec<Selector>` |
/// | `facetAddresses` | empty | `Vec<Address>` |
/// | `facetAddress` | `Selector` | `Address` (null if none) |
pub mod codec {
    use crate::domain::value_objects::Bytes;
    use crate::errors::CodecError;
    use serde::de::DeserializeOwned;
    use serde::Serialize;

    /// Encodes a value as a call payload or return data.
    ///
    /// # Errors
    ///
    /// `Encode` if serialization fails.
    pub fn encode<T: Serialize>(value: &T) -> Result<Bytes, CodecError> {
        bincode::serialize(value)
            .map(Bytes::from_vec)
            .map_err(|e| CodecError::Encode(e.to_string()))
    }

    /// Decodes a call payload or return data.
    ///
    /// # Errors
    ///
    /// `Decode` if the bytes do not hold a `T`.
    pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

// =============================================================================
// TOPICS
// =============================================================================

/// Event topics for log routing.
pub mod topics {
    /// Ownership notifications.
    pub const OWNERSHIP: &str = "diamond.ownership";

    /// Cut notifications.
    pub const DIAMOND_CUT: &str = "diamond.cut";

    /// Topic for a given event.
    #[must_use]
    pub fn for_event(event: &super::DiamondEvent) -> &'static str {
        match event {
            super::DiamondEvent::DiamondCut { .. } => DIAMOND_CUT,
            _ => OWNERSHIP,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
