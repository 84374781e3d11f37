//! # Cut Authorizer
//!
//! Gates every registry mutation behind the current owner.
//!
//! The proxy never stages a cut directly; it goes through
//! [`CutAuthorizer::stage`], which checks the caller first and only then
//! touches the registry. An unauthorized cut is rejected before a single
//! selector is looked at.

use crate::domain::entities::FacetCut;
use crate::domain::ownership::OwnershipGuard;
use crate::domain::registry::{FacetRegistry, StagedCut};
use crate::domain::value_objects::Address;
use crate::errors::{DiamondError, OwnershipError};
use tracing::warn;

/// Owner check in front of the facet registry.
#[derive(Clone, Copy, Debug)]
pub struct CutAuthorizer<'a> {
    guard: &'a OwnershipGuard,
}

impl<'a> CutAuthorizer<'a> {
    /// Binds the authorizer to the ownership guard it consults.
    #[must_use]
    pub const fn new(guard: &'a OwnershipGuard) -> Self {
        Self { guard }
    }

    /// Succeeds only if `caller` is the current owner.
    ///
    /// # Errors
    ///
    /// `Unauthorized` otherwise. A pending nominee is not an owner yet.
    pub fn authorize(&self, caller: Address) -> Result<(), OwnershipError> {
        if caller == self.guard.current_owner() {
            Ok(())
        } else {
            warn!(caller = ?caller, "Rejected facet cut from non-owner");
            Err(OwnershipError::Unauthorized { caller })
        }
    }

    /// Authorizes `caller`, then validates `cuts` against `registry`.
    ///
    /// # Errors
    ///
    /// `Unauthorized` before the registry is consulted, or any registry
    /// validation error.
    pub fn stage(
        &self,
        caller: Address,
        registry: &FacetRegistry,
        cuts: &[FacetCut],
    ) -> Result<StagedCut, DiamondError> {
        self.authorize(caller)?;
        Ok(registry.stage(cuts)?)
    }
}

// =============================================================================
// TESTS
// =============================================================================
