//! # Driving Ports (API - Inbound)
//!
//! The interface the outside world uses to reach the diamond.
//!
//! Every method is one call in the sense of the diamond's execution model: it
//! runs to completion against the shared state before the next call starts,
//! and it either commits entirely or leaves no trace.

use crate::domain::entities::{DiamondCut, FacetView};
use crate::domain::services::split_calldata;
use crate::domain::value_objects::{Address, Bytes, Selector};
use crate::errors::DiamondError;
use async_trait::async_trait;

/// Primary API of the dispatch proxy.
///
/// ## Usage
///
/// ```ignore
/// let output = diamond.dispatch(caller, selector, payload).await?;
/// ```
#[async_trait]
pub trait DiamondApi: Send + Sync {
    /// Route a call by selector.
    ///
    /// Built-in selectors are served by the diamond itself (cut, ownership,
    /// loupe); every other selector is delegated to its facet with the
    /// diamond's storage as execution context.
    ///
    /// # Returns
    ///
    /// * `Bytes` - The facet's return data, verbatim
    async fn dispatch(
        &self,
        caller: Address,
        selector: Selector,
        payload: Bytes,
    ) -> Result<Bytes, DiamondError>;

    /// Route raw calldata (`selector ++ payload`).
    async fn call(&self, caller: Address, calldata: &[u8]) -> Result<Bytes, DiamondError> {
        let (selector, payload) = split_calldata(calldata).ok_or(
            DiamondError::MalformedCalldata {
                len: calldata.len(),
            },
        )?;
        self.dispatch(caller, selector, payload).await
    }

    /// Apply an owner-authorized cut.
    async fn diamond_cut(&self, caller: Address, cut: DiamondCut) -> Result<(), DiamondError>;

    /// Nominate `new_owner`.
    async fn transfer_ownership(
        &self,
        caller: Address,
        new_owner: Address,
    ) -> Result<(), DiamondError>;

    /// Accept a pending nomination.
    async fn accept_ownership(&self, caller: Address) -> Result<(), DiamondError>;

    /// Withdraw a pending nomination.
    async fn cancel_transfer(&self, caller: Address) -> Result<(), DiamondError>;

    /// Current owner.
    async fn owner(&self) -> Address;

    /// Pending nominee.
    async fn nominee(&self) -> Option<Address>;

    /// Loupe: every facet with its selectors.
    async fn facets(&self) -> Vec<FacetView>;

    /// Loupe: facet routed for `selector`.
    async fn facet_address(&self, selector: Selector) -> Option<Address>;
}
