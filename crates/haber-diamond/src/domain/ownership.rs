//! # Ownership Guard
//!
//! Single-owner authority with a two-phase transfer.
//!
//! ```text
//!                 transfer_ownership(nominee)
//!   Owned(owner) ─────────────────────────────→ PendingTransfer(owner, nominee)
//!        ↑   ↑                                         │        │
//!        │   └──────────── cancel_transfer() ──────────┘        │
//!        │                                                      │
//!        └──────── accept_ownership() : Owned(nominee) ─────────┘
//! ```
//!
//! The owner and nominee live in one tagged state, so "nominee set while no
//! transfer is pending" cannot be represented. Every transition validates
//! fully before touching the state; a rejected transition leaves it as it was.

use crate::domain::value_objects::Address;
use crate::errors::OwnershipError;
use serde::{Deserialize, Serialize};

// =============================================================================
// STATE
// =============================================================================

/// Owner/nominee state of the diamond.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OwnershipState {
    /// A single owner, no transfer in flight.
    Owned {
        /// Current owner.
        owner: Address,
    },
    /// Owner has nominated a successor who has not accepted yet.
    PendingTransfer {
        /// Current owner.
        owner: Address,
        /// Nominated successor. Never equal to `owner`, never null.
        nominee: Address,
    },
}

impl OwnershipState {
    /// Current owner.
    #[must_use]
    pub const fn owner(&self) -> Address {
        match self {
            Self::Owned { owner } | Self::PendingTransfer { owner, .. } => *owner,
        }
    }

    /// Pending nominee, if a transfer is in flight.
    #[must_use]
    pub const fn nominee(&self) -> Option<Address> {
        match self {
            Self::Owned { .. } => None,
            Self::PendingTransfer { nominee, .. } => Some(*nominee),
        }
    }
}

/// Notification produced by a successful transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnershipEvent {
    /// The owner nominated a successor.
    TransferStarted {
        /// Owner at the time of nomination.
        previous_owner: Address,
        /// The nominee.
        nominee: Address,
    },
    /// The nominee accepted and is now the owner.
    Transferred {
        /// Owner before acceptance.
        previous_owner: Address,
        /// The new owner.
        new_owner: Address,
    },
    /// The owner withdrew a pending nomination.
    TransferCancelled {
        /// The (unchanged) owner.
        owner: Address,
        /// The withdrawn nominee.
        nominee: Address,
    },
}

// =============================================================================
// GUARD
// =============================================================================

/// Holds the ownership state and enforces its transitions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnershipGuard {
    state: OwnershipState,
}

impl OwnershipGuard {
    /// Installs `deployer` as the initial owner.
    ///
    /// # Errors
    ///
    /// `InvalidNominee` if `deployer` is the null address.
    pub fn new(deployer: Address) -> Result<Self, OwnershipError> {
        if deployer.is_zero() {
            return Err(OwnershipError::InvalidNominee { nominee: deployer });
        }
        Ok(Self {
            state: OwnershipState::Owned { owner: deployer },
        })
    }

    /// Restores a guard from persisted state.
    ///
    /// # Errors
    ///
    /// `InvalidNominee` if the state holds a null owner, a null nominee, or a
    /// nominee equal to the owner.
    pub fn from_state(state: OwnershipState) -> Result<Self, OwnershipError> {
        let owner = state.owner();
        if owner.is_zero() {
            return Err(OwnershipError::InvalidNominee { nominee: owner });
        }
        if let Some(nominee) = state.nominee() {
            if nominee.is_zero() || nominee == owner {
                return Err(OwnershipError::InvalidNominee { nominee });
            }
        }
        Ok(Self { state })
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> OwnershipState {
        self.state
    }

    /// Current owner.
    #[must_use]
    pub const fn current_owner(&self) -> Address {
        self.state.owner()
    }

    /// Pending nominee, if any.
    #[must_use]
    pub const fn current_nominee(&self) -> Option<Address> {
        self.state.nominee()
    }

    /// Nominates `new_owner` as successor.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if `caller` is not the owner or a transfer is already
    ///   pending.
    /// - `InvalidNominee` if `new_owner` is null or already the owner.
    pub fn transfer_ownership(
        &mut self,
        caller: Address,
        new_owner: Address,
    ) -> Result<OwnershipEvent, OwnershipError> {
        let OwnershipState::Owned { owner } = self.state else {
            return Err(OwnershipError::Unauthorized { caller });
        };
        if caller != owner {
            return Err(OwnershipError::Unauthorized { caller });
        }
        if new_owner.is_zero() || new_owner == owner {
            return Err(OwnershipError::InvalidNominee { nominee: new_owner });
        }

        self.state = OwnershipState::PendingTransfer {
            owner,
            nominee: new_owner,
        };
        Ok(OwnershipEvent::TransferStarted {
            previous_owner: owner,
            nominee: new_owner,
        })
    }

    /// Completes a pending transfer.
    ///
    /// # Errors
    ///
    /// `Unauthorized` if no transfer is pending or `caller` is not the nominee.
    pub fn accept_ownership(&mut self, caller: Address) -> Result<OwnershipEvent, OwnershipError> {
        let OwnershipState::PendingTransfer { owner, nominee } = self.state else {
            return Err(OwnershipError::Unauthorized { caller });
        };
        if caller != nominee {
            return Err(OwnershipError::Unauthorized { caller });
        }

        self.state = OwnershipState::Owned { owner: nominee };
        Ok(OwnershipEvent::Transferred {
            previous_owner: owner,
            new_owner: nominee,
        })
    }

    /// Withdraws a pending nomination.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if `caller` is not the owner.
    /// - `InvalidNominee` if there is no pending nomination to cancel.
    pub fn cancel_transfer(&mut self, caller: Address) -> Result<OwnershipEvent, OwnershipError> {
        let owner = self.state.owner();
        if caller != owner {
            return Err(OwnershipError::Unauthorized { caller });
        }
        let Some(nominee) = self.state.nominee() else {
            return Err(OwnershipError::InvalidNominee {
                nominee: Address::ZERO,
            });
        };

        self.state = OwnershipState::Owned { owner };
        Ok(OwnershipEvent::TransferCancelled { owner, nominee })
    }
}

// =============================================================================
// TESTS
// =============================================================================
