//! # Facet Registry
//!
//! The selector → facet table and its validated batch mutations.
//!
//! ## Staging
//!
//! A cut is never applied selector by selector. [`FacetRegistry::stage`]
//! validates every cut of a batch against the table plus the changes staged so
//! far, producing a [`StagedCut`]; [`FacetRegistry::commit`] folds it in. A
//! batch that fails validation leaves nothing behind because nothing was
//! written, so no rollback log is needed.
//!
//! ## Immutable selectors
//!
//! Selectors routed to the diamond's own address are served by the proxy
//! itself (cut, ownership and loupe functions). They occupy the table like any
//! other entry, so Add collides with them, and Replace/Remove reject them.

use crate::domain::entities::{FacetCut, FacetCutAction, FacetView, SelectorEntry};
use crate::domain::value_objects::{Address, Selector};
use crate::errors::RegistryError;
use std::collections::HashMap;
use tracing::debug;

/// Default upper bound on selectors touched by one `diamondCut`.
pub const DEFAULT_MAX_CUT_SELECTORS: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Route {
    target: Address,
    // Registration sequence, drives loupe ordering.
    seq: u64,
}

// =============================================================================
// STAGED CUT
// =============================================================================

/// A validated batch waiting to be committed.
///
/// Only [`FacetRegistry::stage`] produces one, so holding a `StagedCut` means
/// every selector in the batch passed validation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StagedCut {
    // Ordered operations; `None` deletes the entry.
    ops: Vec<(Selector, Option<Address>)>,
    // Latest staged target per selector, for validating later cuts.
    view: HashMap<Selector, Option<Address>>,
}

impl StagedCut {
    /// Number of selector operations staged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns true if nothing was staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    fn push(&mut self, selector: Selector, target: Option<Address>) {
        self.ops.push((selector, target));
        self.view.insert(selector, target);
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Owns the selector table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FacetRegistry {
    diamond: Address,
    routes: HashMap<Selector, Route>,
    next_seq: u64,
    max_cut_selectors: usize,
}

impl FacetRegistry {
    /// Creates an empty table for the diamond at `diamond`.
    #[must_use]
    pub fn new(diamond: Address) -> Self {
        Self {
            diamond,
            routes: HashMap::new(),
            next_seq: 0,
            max_cut_selectors: DEFAULT_MAX_CUT_SELECTORS,
        }
    }

    /// Sets the per-batch selector limit.
    #[must_use]
    pub fn with_max_cut_selectors(mut self, max: usize) -> Self {
        self.max_cut_selectors = max;
        self
    }

    /// Rebuilds a table from persisted entries, preserving their order.
    ///
    /// # Errors
    ///
    /// `SelectorCollision` if a selector appears twice.
    pub fn from_entries(
        diamond: Address,
        entries: &[SelectorEntry],
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new(diamond);
        for entry in entries {
            if let Some(existing) = registry.lookup(entry.selector) {
                return Err(RegistryError::SelectorCollision {
                    selector: entry.selector,
                    existing,
                });
            }
            registry.insert(entry.selector, entry.target);
        }
        Ok(registry)
    }

    /// Routes `selectors` to the diamond itself.
    ///
    /// Used once at construction for the proxy's built-in functions.
    ///
    /// # Errors
    ///
    /// `SelectorCollision` if any selector is already routed.
    pub fn register_immutable(&mut self, selectors: &[Selector]) -> Result<(), RegistryError> {
        let mut staged = StagedCut::default();
        for &selector in selectors {
            if let Some(existing) = self.staged_lookup(&staged, selector) {
                return Err(RegistryError::SelectorCollision { selector, existing });
            }
            staged.push(selector, Some(self.diamond));
        }
        self.commit(staged);
        Ok(())
    }

    /// Address of the diamond this table belongs to.
    #[must_use]
    pub const fn diamond(&self) -> Address {
        self.diamond
    }

    /// Configured per-batch selector limit.
    #[must_use]
    pub const fn max_cut_selectors(&self) -> usize {
        self.max_cut_selectors
    }

    /// Resolves a selector. O(1), no side effects.
    #[must_use]
    pub fn lookup(&self, selector: Selector) -> Option<Address> {
        self.routes.get(&selector).map(|route| route.target)
    }

    /// Returns true if `selector` is served by the diamond itself.
    #[must_use]
    pub fn is_immutable(&self, selector: Selector) -> bool {
        self.lookup(selector) == Some(self.diamond)
    }

    /// Number of routed selectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if no selector is routed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Validates and commits a single cut.
    ///
    /// # Errors
    ///
    /// See [`stage`](Self::stage). On error the table is unchanged.
    pub fn apply_cut(&mut self, cut: &FacetCut) -> Result<(), RegistryError> {
        let staged = self.stage(std::slice::from_ref(cut))?;
        self.commit(staged);
        Ok(())
    }

    /// Validates a batch of cuts without touching the table.
    ///
    /// Cuts are checked in order; each one sees the effect of the cuts staged
    /// before it.
    ///
    /// # Errors
    ///
    /// - `TooManySelectors` if the batch exceeds the configured limit.
    /// - `EmptySelectors`, `NullTarget`, `DiamondTarget`,
    ///   `RemoveTargetNotNull` for malformed cuts.
    /// - `SelectorCollision` when Add meets an existing entry.
    /// - `UnknownSelector` when Replace/Remove meets a missing entry.
    /// - `ImmutableSelector` when Replace/Remove meets a built-in selector.
    pub fn stage(&self, cuts: &[FacetCut]) -> Result<StagedCut, RegistryError> {
        let count: usize = cuts.iter().map(|cut| cut.selectors.len()).sum();
        if count > self.max_cut_selectors {
            return Err(RegistryError::TooManySelectors {
                count,
                max: self.max_cut_selectors,
            });
        }

        let mut staged = StagedCut::default();
        for cut in cuts {
            self.validate_shape(cut)?;
            for &selector in &cut.selectors {
                let current = self.staged_lookup(&staged, selector);
                match cut.action {
                    FacetCutAction::Add => {
                        if let Some(existing) = current {
                            return Err(RegistryError::SelectorCollision { selector, existing });
                        }
                        staged.push(selector, Some(cut.target));
                    }
                    FacetCutAction::Replace => {
                        self.check_mutable(selector, current)?;
                        staged.push(selector, Some(cut.target));
                    }
                    FacetCutAction::Remove => {
                        self.check_mutable(selector, current)?;
                        staged.push(selector, None);
                    }
                }
            }
        }
        Ok(staged)
    }

    /// Folds a staged batch into the table.
    pub fn commit(&mut self, staged: StagedCut) {
        let ops = staged.ops.len();
        for (selector, target) in staged.ops {
            match target {
                Some(target) => self.insert(selector, target),
                None => {
                    self.routes.remove(&selector);
                }
            }
        }
        debug!(ops, selectors = self.routes.len(), "Committed facet cut");
    }

    fn insert(&mut self, selector: Selector, target: Address) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.routes.insert(selector, Route { target, seq });
    }

    fn staged_lookup(&self, staged: &StagedCut, selector: Selector) -> Option<Address> {
        match staged.view.get(&selector) {
            Some(target) => *target,
            None => self.lookup(selector),
        }
    }

    fn validate_shape(&self, cut: &FacetCut) -> Result<(), RegistryError> {
        if cut.selectors.is_empty() {
            return Err(RegistryError::EmptySelectors { target: cut.target });
        }
        match cut.action {
            FacetCutAction::Add | FacetCutAction::Replace => {
                if cut.target.is_zero() {
                    return Err(RegistryError::NullTarget {
                        action: cut.action.as_str(),
                    });
                }
                if cut.target == self.diamond {
                    return Err(RegistryError::DiamondTarget {
                        action: cut.action.as_str(),
                    });
                }
            }
            FacetCutAction::Remove => {
                if !cut.target.is_zero() {
                    return Err(RegistryError::RemoveTargetNotNull { target: cut.target });
                }
            }
        }
        Ok(())
    }

    fn check_mutable(
        &self,
        selector: Selector,
        current: Option<Address>,
    ) -> Result<(), RegistryError> {
        match current {
            None => Err(RegistryError::UnknownSelector(selector)),
            Some(target) if target == self.diamond => {
                Err(RegistryError::ImmutableSelector(selector))
            }
            Some(_) => Ok(()),
        }
    }

    // -------------------------------------------------------------------------
    // Loupe
    // -------------------------------------------------------------------------

    /// All entries in registration order.
    #[must_use]
    pub fn entries(&self) -> Vec<SelectorEntry> {
        let mut routes: Vec<_> = self.routes.iter().collect();
        routes.sort_by_key(|(_, route)| route.seq);
        routes
            .into_iter()
            .map(|(&selector, route)| SelectorEntry {
                selector,
                target: route.target,
            })
            .collect()
    }

    /// Every facet with the selectors it serves.
    ///
    /// Facets appear in order of their earliest surviving selector.
    #[must_use]
    pub fn facets(&self) -> Vec<FacetView> {
        let mut facets: Vec<FacetView> = Vec::new();
        let mut index: HashMap<Address, usize> = HashMap::new();
        for entry in self.entries() {
            match index.get(&entry.target) {
                Some(&i) => facets[i].selectors.push(entry.selector),
                None => {
                    index.insert(entry.target, facets.len());
                    facets.push(FacetView {
                        address: entry.target,
                        selectors: vec![entry.selector],
                    });
                }
            }
        }
        facets
    }

    /// Selectors served by `facet`, in registration order.
    #[must_use]
    pub fn facet_function_selectors(&self, facet: Address) -> Vec<Selector> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.target == facet)
            .map(|entry| entry.selector)
            .collect()
    }

    /// Distinct facet addresses.
    #[must_use]
    pub fn facet_addresses(&self) -> Vec<Address> {
        self.facets().into_iter().map(|facet| facet.address).collect()
    }

    /// Facet serving `selector`, if any.
    #[must_use]
    pub fn facet_address(&self, selector: Selector) -> Option<Address> {
        self.lookup(selector)
    }
}

// =============================================================================
// TESTS
// =============================================================================
