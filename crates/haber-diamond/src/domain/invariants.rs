//! # Domain Invariants
//!
//! Invariants that MUST hold for any committed diamond state.
//!
//! | ID | Invariant |
//! |----|-----------|
//! | INVARIANT-1 | At most one entry per selector |
//! | INVARIANT-2 | Owner is never null; nominee is never null nor the owner |
//! | INVARIANT-3 | Every entry routes to a non-null target |
//! | INVARIANT-4 | Built-in selectors stay routed to the diamond |
//!
//! The proxy checks these in debug builds after every commit; snapshots
//! loaded from the persistence layer are checked before use.

use crate::domain::builtins::BuiltinFunction;
use crate::domain::entities::DiamondSnapshot;
use crate::domain::value_objects::{Address, Selector};
use std::collections::HashMap;

// =============================================================================
// INVARIANT CHECKS
// =============================================================================

/// INVARIANT-1: Selector uniqueness.
#[must_use]
pub fn check_selector_uniqueness(snapshot: &DiamondSnapshot) -> Vec<InvariantViolation> {
    let mut seen: HashMap<Selector, Address> = HashMap::new();
    let mut violations = Vec::new();
    for entry in &snapshot.entries {
        if let Some(first) = seen.insert(entry.selector, entry.target) {
            violations.push(InvariantViolation::DuplicateSelector {
                selector: entry.selector,
                first,
                second: entry.target,
            });
        }
    }
    violations
}

/// INVARIANT-2: Owner / nominee consistency.
#[must_use]
pub fn check_ownership_invariant(snapshot: &DiamondSnapshot) -> Option<InvariantViolation> {
    let owner = snapshot.ownership.owner();
    if owner.is_zero() {
        return Some(InvariantViolation::NullOwner);
    }
    match snapshot.ownership.nominee() {
        Some(nominee) if nominee.is_zero() || nominee == owner => {
            Some(InvariantViolation::InvalidNominee { owner, nominee })
        }
        _ => None,
    }
}

/// INVARIANT-3: Non-null targets.
#[must_use]
pub fn check_targets_invariant(snapshot: &DiamondSnapshot) -> Vec<InvariantViolation> {
    snapshot
        .entries
        .iter()
        .filter(|entry| entry.target.is_zero())
        .map(|entry| InvariantViolation::NullTarget {
            selector: entry.selector,
        })
        .collect()
}

/// INVARIANT-4: Built-ins routed to the diamond.
#[must_use]
pub fn check_builtins_invariant(snapshot: &DiamondSnapshot) -> Vec<InvariantViolation> {
    BuiltinFunction::ALL
        .iter()
        .filter_map(|builtin| {
            let selector = builtin.selector();
            let routed = snapshot
                .entries
                .iter()
                .find(|entry| entry.selector == selector)
                .map(|entry| entry.target);
            (routed != Some(snapshot.diamond)).then_some(InvariantViolation::BuiltinDisplaced {
                selector,
                routed_to: routed,
            })
        })
        .collect()
}

/// Check all invariants at once.
#[must_use]
pub fn check_all_invariants(snapshot: &DiamondSnapshot) -> InvariantCheckResult {
    let mut violations = check_selector_uniqueness(snapshot);
    violations.extend(check_ownership_invariant(snapshot));
    violations.extend(check_targets_invariant(snapshot));
    violations.extend(check_builtins_invariant(snapshot));

    if violations.is_empty() {
        InvariantCheckResult::Valid
    } else {
        InvariantCheckResult::Invalid(violations)
    }
}

// =============================================================================
// INVARIANT TYPES
// =============================================================================

/// Result of checking all invariants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantCheckResult {
    /// All invariants hold.
    Valid,
    /// One or more invariants violated.
    Invalid(Vec<InvariantViolation>),
}

impl InvariantCheckResult {
    /// Returns true if all invariants hold.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Specific invariant violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Two entries for one selector.
    DuplicateSelector {
        /// Duplicated selector.
        selector: Selector,
        /// Target of the first entry.
        first: Address,
        /// Target of the second entry.
        second: Address,
    },
    /// Owner is the null address.
    NullOwner,
    /// Nominee is null or equal to the owner.
    InvalidNominee {
        /// Current owner.
        owner: Address,
        /// Recorded nominee.
        nominee: Address,
    },
    /// Entry routes to the null address.
    NullTarget {
        /// Selector with the null route.
        selector: Selector,
    },
    /// A built-in selector is missing or routed elsewhere.
    BuiltinDisplaced {
        /// Built-in selector.
        selector: Selector,
        /// Where it routes instead, if anywhere.
        routed_to: Option<Address>,
    },
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateSelector {
                selector,
                first,
                second,
            } => write!(f, "selector {selector} routed to both {first:?} and {second:?}"),
            Self::NullOwner => write!(f, "owner is the null address"),
            Self::InvalidNominee { owner, nominee } => {
                write!(f, "nominee {nominee:?} invalid for owner {owner:?}")
            }
            Self::NullTarget { selector } => {
                write!(f, "selector {selector} routed to the null address")
            }
            Self::BuiltinDisplaced {
                selector,
                routed_to,
            } => write!(f, "built-in selector {selector} routed to {routed_to:?}"),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
