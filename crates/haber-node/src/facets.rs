//! # Starting Facets
//!
//! Facets deployed with the diamond on first start.
//!
//! | Facet | Functions |
//! |-------|-----------|
//! | `CounterFacet` | `increment()`, `decrement()`, `count()` |
//! | `KeyValueFacet` | `setValue(bytes32,bytes32)`, `setValues((bytes32,bytes32)[])`, `getValue(bytes32)` |
//!
//! Both keep their state in the diamond's storage under namespaced slots, so
//! either can be replaced by a new version without losing data.

use haber_diamond::domain::entities::FacetCall;
use haber_diamond::domain::services::keccak256;
use haber_diamond::domain::storage::FacetStorage;
use haber_diamond::domain::value_objects::{Bytes, Selector, StorageKey, StorageValue, U256};
use haber_diamond::errors::FacetError;
use haber_diamond::events::codec;
use haber_diamond::ports::outbound::Facet;
use serde::de::DeserializeOwned;

fn decode<T: DeserializeOwned>(payload: &Bytes) -> Result<T, FacetError> {
    codec::decode(payload.as_slice()).map_err(|e| FacetError::InvalidPayload(e.to_string()))
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Bytes, FacetError> {
    codec::encode(value).map_err(|e| FacetError::InvalidPayload(e.to_string()))
}

// =============================================================================
// COUNTER
// =============================================================================

/// A single shared counter.
#[derive(Debug, Clone)]
pub struct CounterFacet {
    increment: Selector,
    decrement: Selector,
    count: Selector,
}

impl CounterFacet {
    /// `increment()`
    pub const INCREMENT: &'static str = "increment()";
    /// `decrement()`
    pub const DECREMENT: &'static str = "decrement()";
    /// `count()`
    pub const COUNT: &'static str = "count()";

    /// Create the facet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            increment: Selector::from_signature(Self::INCREMENT),
            decrement: Selector::from_signature(Self::DECREMENT),
            count: Selector::from_signature(Self::COUNT),
        }
    }

    /// Slot holding the counter.
    #[must_use]
    pub fn slot() -> StorageKey {
        StorageKey::namespaced("haber.counter")
    }
}

impl Default for CounterFacet {
    fn default() -> Self {
        Self::new()
    }
}

impl Facet for CounterFacet {
    fn name(&self) -> &str {
        "CounterFacet"
    }

    fn selectors(&self) -> Vec<Selector> {
        vec![self.increment, self.decrement, self.count]
    }

    fn execute(
        &self,
        call: &FacetCall,
        storage: &mut dyn FacetStorage,
    ) -> Result<Bytes, FacetError> {
        let current = storage.sload(Self::slot()).to_u256();
        let selector = call.selector;

        if selector == self.increment {
            let next = current
                .checked_add(U256::one())
                .ok_or_else(|| FacetError::Revert("counter overflow".into()))?;
            storage.sstore(Self::slot(), StorageValue::from_u256(next));
            encode(&next)
        } else if selector == self.decrement {
            let next = current
                .checked_sub(U256::one())
                .ok_or_else(|| FacetError::Revert("counter underflow".into()))?;
            storage.sstore(Self::slot(), StorageValue::from_u256(next));
            encode(&next)
        } else if selector == self.count {
            encode(&current)
        } else {
            Err(FacetError::UnsupportedSelector(selector))
        }
    }
}

// =============================================================================
// KEY / VALUE
// =============================================================================

/// A 32-byte key to 32-byte value map.
#[derive(Debug, Clone)]
pub struct KeyValueFacet {
    set_value: Selector,
    set_values: Selector,
    get_value: Selector,
}

impl KeyValueFacet {
    /// `setValue(bytes32,bytes32)`
    pub const SET_VALUE: &'static str = "setValue(bytes32,bytes32)";
    /// `setValues((bytes32,bytes32)[])`, used as the deployment initializer.
    pub const SET_VALUES: &'static str = "setValues((bytes32,bytes32)[])";
    /// `getValue(bytes32)`
    pub const GET_VALUE: &'static str = "getValue(bytes32)";

    /// Create the facet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            set_value: Selector::from_signature(Self::SET_VALUE),
            set_values: Selector::from_signature(Self::SET_VALUES),
            get_value: Selector::from_signature(Self::GET_VALUE),
        }
    }

    /// Storage slot backing `key`.
    #[must_use]
    pub fn slot(key: StorageKey) -> StorageKey {
        let mut preimage = b"haber.kv".to_vec();
        preimage.extend_from_slice(key.as_bytes());
        StorageKey::new(keccak256(&preimage))
    }
}

impl Default for KeyValueFacet {
    fn default() -> Self {
        Self::new()
    }
}

impl Facet for KeyValueFacet {
    fn name(&self) -> &str {
        "KeyValueFacet"
    }

    fn selectors(&self) -> Vec<Selector> {
        vec![self.set_value, self.set_values, self.get_value]
    }

    fn execute(
        &self,
        call: &FacetCall,
        storage: &mut dyn FacetStorage,
    ) -> Result<Bytes, FacetError> {
        let selector = call.selector;

        if selector == self.set_value {
            let (key, value): (StorageKey, StorageValue) = decode(&call.payload)?;
            storage.sstore(Self::slot(key), value);
            Ok(Bytes::new())
        } else if selector == self.set_values {
            let pairs: Vec<(StorageKey, StorageValue)> = decode(&call.payload)?;
            for (key, value) in pairs {
                storage.sstore(Self::slot(key), value);
            }
            Ok(Bytes::new())
        } else if selector == self.get_value {
            let key: StorageKey = decode(&call.payload)?;
            encode(&storage.sload(Self::slot(key)))
        } else {
            Err(FacetError::UnsupportedSelector(selector))
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
