//! # Built-in Functions
//!
//! Functions the diamond serves itself rather than through a facet: the cut
//! entry point, the ownership protocol and the loupe. Their selectors are
//! routed to the diamond's own address at construction.

use crate::domain::value_objects::Selector;
use std::sync::OnceLock;

/// A function served by the diamond itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuiltinFunction {
    /// Authorized batch mutation of the selector table.
    DiamondCut,
    /// Nominate a new owner.
    TransferOwnership,
    /// Nominee accepts ownership.
    AcceptOwnership,
    /// Owner withdraws a nomination.
    CancelOwnershipTransfer,
    /// Read the owner.
    Owner,
    /// Read the pending nominee.
    NomineeOwner,
    /// Loupe: all facets.
    Facets,
    /// Loupe: selectors of one facet.
    FacetFunctionSelectors,
    /// Loupe: distinct facet addresses.
    FacetAddresses,
    /// Loupe: facet for one selector.
    FacetAddress,
}

impl BuiltinFunction {
    /// Every built-in, in registration order.
    pub const ALL: [Self; 10] = [
        Self::DiamondCut,
        Self::TransferOwnership,
        Self::AcceptOwnership,
        Self::CancelOwnershipTransfer,
        Self::Owner,
        Self::NomineeOwner,
        Self::Facets,
        Self::FacetFunctionSelectors,
        Self::FacetAddresses,
        Self::FacetAddress,
    ];

    /// Canonical Solidity signature.
    #[must_use]
    pub const fn signature(&self) -> &'static str {
        match self {
            Self::DiamondCut => "diamondCut((address,uint8,bytes4[])[],address,bytes)",
            Self::TransferOwnership => "transferOwnership(address)",
            Self::AcceptOwnership => "acceptOwnership()",
            Self::CancelOwnershipTransfer => "cancelOwnershipTransfer()",
            Self::Owner => "owner()",
            Self::NomineeOwner => "nomineeOwner()",
            Self::Facets => "facets()",
            Self::FacetFunctionSelectors => "facetFunctionSelectors(address)",
            Self::FacetAddresses => "facetAddresses()",
            Self::FacetAddress => "facetAddress(bytes4)",
        }
    }

    /// 4-byte selector of [`signature`](Self::signature).
    #[must_use]
    pub fn selector(&self) -> Selector {
        Self::table()
            .iter()
            .find(|(builtin, _)| builtin == self)
            .map_or_else(|| Selector::from_signature(self.signature()), |(_, s)| *s)
    }

    /// Looks up the built-in served under `selector`.
    #[must_use]
    pub fn from_selector(selector: Selector) -> Option<Self> {
        Self::table()
            .iter()
            .find(|(_, s)| *s == selector)
            .map(|(builtin, _)| *builtin)
    }

    /// Selectors of every built-in.
    #[must_use]
    pub fn selectors() -> Vec<Selector> {
        Self::table().iter().map(|(_, selector)| *selector).collect()
    }

    // Hashed once per process.
    fn table() -> &'static [(Self, Selector); 10] {
        static TABLE: OnceLock<[(BuiltinFunction, Selector); 10]> = OnceLock::new();
        TABLE.get_or_init(|| {
            Self::ALL.map(|builtin| (builtin, Selector::from_signature(builtin.signature())))
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
