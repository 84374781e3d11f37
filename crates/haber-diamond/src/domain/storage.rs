//! # Diamond Storage
//!
//! The diamond's persistent key/value storage and the write overlay facets
//! execute against.
//!
//! Facets never see [`DiamondStorage`] directly. Each delegated execution gets
//! a [`StorageOverlay`] that journals writes over the committed storage; the
//! proxy folds the journal in only if the call succeeds, so a reverted call
//! leaves the storage untouched.

use crate::domain::value_objects::{StorageKey, StorageValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// FACET STORAGE CAPABILITY
// =============================================================================

/// Storage capability lent to a facet for the duration of one call.
pub trait FacetStorage {
    /// Read a slot. Unwritten slots read as zero.
    fn sload(&self, key: StorageKey) -> StorageValue;

    /// Write a slot. Writing zero clears it.
    fn sstore(&mut self, key: StorageKey, value: StorageValue);
}

// =============================================================================
// COMMITTED STORAGE
// =============================================================================

/// One persisted storage slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSlot {
    /// Slot key.
    pub key: StorageKey,
    /// Slot value (never zero once persisted).
    pub value: StorageValue,
}

/// Committed storage owned by the diamond.
///
/// Zero values are never stored, so two storages with the same observable
/// contents compare equal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<StorageSlot>", into = "Vec<StorageSlot>")]
pub struct DiamondStorage {
    slots: BTreeMap<StorageKey, StorageValue>,
}

impl DiamondStorage {
    /// Creates empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a slot.
    #[must_use]
    pub fn get(&self, key: &StorageKey) -> StorageValue {
        self.slots.get(key).copied().unwrap_or(StorageValue::ZERO)
    }

    /// Number of non-zero slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if no slot holds a non-zero value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Folds a write journal into the committed storage.
    pub fn apply(&mut self, writes: StorageWrites) {
        for (key, value) in writes.0 {
            self.set(key, value);
        }
    }

    fn set(&mut self, key: StorageKey, value: StorageValue) {
        if value.is_zero() {
            self.slots.remove(&key);
        } else {
            self.slots.insert(key, value);
        }
    }
}

impl FacetStorage for DiamondStorage {
    fn sload(&self, key: StorageKey) -> StorageValue {
        self.get(&key)
    }

    fn sstore(&mut self, key: StorageKey, value: StorageValue) {
        self.set(key, value);
    }
}

impl From<Vec<StorageSlot>> for DiamondStorage {
    fn from(slots: Vec<StorageSlot>) -> Self {
        let mut storage = Self::new();
        for slot in slots {
            storage.set(slot.key, slot.value);
        }
        storage
    }
}

impl From<DiamondStorage> for Vec<StorageSlot> {
    fn from(storage: DiamondStorage) -> Self {
        storage
            .slots
            .into_iter()
            .map(|(key, value)| StorageSlot { key, value })
            .collect()
    }
}

// =============================================================================
// OVERLAY
// =============================================================================

/// Journal of writes produced by one call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StorageWrites(BTreeMap<StorageKey, StorageValue>);

impl StorageWrites {
    /// Number of distinct slots written.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if nothing was written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Write journal layered over committed storage.
pub struct StorageOverlay<'a> {
    base: &'a DiamondStorage,
    writes: StorageWrites,
}

impl<'a> StorageOverlay<'a> {
    /// Starts an empty journal over `base`.
    #[must_use]
    pub fn new(base: &'a DiamondStorage) -> Self {
        Self {
            base,
            writes: StorageWrites::default(),
        }
    }

    /// Consumes the overlay, returning the journal for commit.
    #[must_use]
    pub fn into_writes(self) -> StorageWrites {
        self.writes
    }
}

impl FacetStorage for StorageOverlay<'_> {
    fn sload(&self, key: StorageKey) -> StorageValue {
        self.writes
            .0
            .get(&key)
            .copied()
            .unwrap_or_else(|| self.base.get(&key))
    }

    fn sstore(&mut self, key: StorageKey, value: StorageValue) {
        self.writes.0.insert(key, value);
    }
}

// =============================================================================
// TESTS
// =============================================================================
