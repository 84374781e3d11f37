//! # Diamond Service
//!
//! The dispatch proxy: the single entry point that owns the selector table,
//! the ownership guard and the diamond's storage, and routes every call.
//!
//! ## Call lifecycle
//!
//! 1. The call takes the state lock; calls are strictly sequential.
//! 2. The call executes against the committed state without mutating it.
//!    Facet writes go to a `StorageOverlay`, cuts to a `StagedCut`,
//!    ownership changes to a copy of the guard, notifications to a buffer.
//! 3. On success the effects are folded in (and persisted when
//!    `persist_on_commit` is set); on failure they are dropped.
//! 4. Buffered notifications are published once the commit is durable.
//!    Their sequence numbers are part of the committed state, so they keep
//!    increasing across a restore.

use crate::domain::authorizer::CutAuthorizer;
use crate::domain::builtins::BuiltinFunction;
use crate::domain::entities::{DiamondCut, DiamondSnapshot, FacetCall, FacetView, InitCall};
use crate::domain::invariants::{check_all_invariants, InvariantCheckResult};
use crate::domain::ownership::OwnershipGuard;
use crate::domain::registry::{FacetRegistry, StagedCut, DEFAULT_MAX_CUT_SELECTORS};
use crate::domain::storage::{DiamondStorage, StorageOverlay, StorageWrites};
use crate::domain::value_objects::{Address, Bytes, Selector, StorageKey, StorageValue};
use crate::errors::{DiamondError, RegistryError, StoreError};
use crate::events::{codec, DiamondEvent, EventRecord};
use crate::ports::inbound::DiamondApi;
use crate::ports::outbound::{DiamondStore, EventSink, FacetResolver};

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Address used when no diamond address is configured.
pub const DEFAULT_DIAMOND_ADDRESS: Address = Address::repeat_byte(0xd1);

/// Diamond configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiamondConfig {
    /// Address of the diamond itself; built-in selectors route here.
    pub diamond_address: Address,
    /// Upper bound on selectors touched by one `diamondCut`.
    pub max_cut_selectors: usize,
    /// Save a snapshot after every committed mutation.
    pub persist_on_commit: bool,
}

impl Default for DiamondConfig {
    fn default() -> Self {
        Self {
            diamond_address: DEFAULT_DIAMOND_ADDRESS,
            max_cut_selectors: DEFAULT_MAX_CUT_SELECTORS,
            persist_on_commit: true,
        }
    }
}

/// Statistics for the diamond.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiamondStats {
    /// Total calls dispatched.
    pub dispatched: u64,
    /// Calls that committed.
    pub committed: u64,
    /// Calls that reverted.
    pub reverted: u64,
    /// Successful `diamondCut` calls.
    pub cuts_applied: u64,
    /// Calls rejected for lack of authority.
    pub unauthorized_rejections: u64,
}

// =============================================================================
// STATE
// =============================================================================

#[derive(Clone, Debug)]
struct DiamondState {
    guard: OwnershipGuard,
    registry: FacetRegistry,
    storage: DiamondStorage,
    next_event_sequence: u64,
}

impl DiamondState {
    fn snapshot(&self) -> DiamondSnapshot {
        DiamondSnapshot {
            diamond: self.registry.diamond(),
            ownership: self.guard.state(),
            entries: self.registry.entries(),
            storage: self.storage.clone(),
            next_event_sequence: self.next_event_sequence,
        }
    }

    /// Folds `effects` in, numbering its events.
    fn apply(&mut self, effects: Effects) -> Vec<(u64, DiamondEvent)> {
        if let Some(guard) = effects.guard {
            self.guard = guard;
        }
        if let Some(staged) = effects.staged {
            self.registry.commit(staged);
        }
        self.storage.apply(effects.writes);

        effects
            .events
            .into_iter()
            .map(|event| {
                let sequence = self.next_event_sequence;
                self.next_event_sequence += 1;
                (sequence, event)
            })
            .collect()
    }
}

struct Inner {
    state: DiamondState,
}

/// Uncommitted result of one call.
#[derive(Default)]
struct Effects {
    output: Bytes,
    guard: Option<OwnershipGuard>,
    staged: Option<StagedCut>,
    writes: StorageWrites,
    events: Vec<DiamondEvent>,
}

impl Effects {
    fn output(output: Bytes) -> Self {
        Self {
            output,
            ..Self::default()
        }
    }

    fn mutates(&self) -> bool {
        self.guard.is_some()
            || self.staged.is_some()
            || !self.writes.is_empty()
            || !self.events.is_empty()
    }
}

// =============================================================================
// SERVICE
// =============================================================================

/// The dispatch proxy.
///
/// Generic over its driven ports:
/// - `R`: where facet code is looked up
/// - `E`: where committed notifications go
/// - `S`: where snapshots are persisted
pub struct DiamondService<R: FacetResolver, E: EventSink, S: DiamondStore> {
    config: DiamondConfig,
    resolver: Arc<R>,
    events: Arc<E>,
    store: Arc<S>,
    inner: Mutex<Inner>,
    stats: RwLock<DiamondStats>,
}

impl<R: FacetResolver, E: EventSink, S: DiamondStore> DiamondService<R, E, S> {
    /// Deploy a fresh diamond owned by `owner`.
    ///
    /// Registers the built-in selectors against the diamond's own address and
    /// saves the initial snapshot when `persist_on_commit` is set.
    ///
    /// # Errors
    ///
    /// - `InvalidNominee` if `owner` is null.
    /// - `InvalidFacetCut` if the diamond address is null.
    /// - `Store` if the initial snapshot cannot be saved.
    pub async fn deploy(
        owner: Address,
        config: DiamondConfig,
        resolver: Arc<R>,
        events: Arc<E>,
        store: Arc<S>,
    ) -> Result<Self, DiamondError> {
        if config.diamond_address.is_zero() {
            return Err(RegistryError::NullTarget { action: "deploy" }.into());
        }

        let guard = OwnershipGuard::new(owner)?;
        let mut registry = FacetRegistry::new(config.diamond_address)
            .with_max_cut_selectors(config.max_cut_selectors);
        registry.register_immutable(&BuiltinFunction::selectors())?;

        let state = DiamondState {
            guard,
            registry,
            storage: DiamondStorage::new(),
            next_event_sequence: 0,
        };
        if config.persist_on_commit {
            store.save(&state.snapshot()).await?;
        }

        info!(
            diamond = ?config.diamond_address,
            owner = ?owner,
            builtins = BuiltinFunction::ALL.len(),
            "Deployed diamond"
        );
        Ok(Self::from_state(config, resolver, events, store, state))
    }

    /// Restore a diamond from the last snapshot in `store`.
    ///
    /// Returns `Ok(None)` if the store holds no snapshot.
    ///
    /// # Errors
    ///
    /// `Store(Corrupted)` if the snapshot belongs to another diamond or
    /// violates an invariant; any other store error unchanged.
    pub async fn restore(
        config: DiamondConfig,
        resolver: Arc<R>,
        events: Arc<E>,
        store: Arc<S>,
    ) -> Result<Option<Self>, DiamondError> {
        let Some(snapshot) = store.load().await? else {
            return Ok(None);
        };

        if snapshot.diamond != config.diamond_address {
            return Err(StoreError::Corrupted(format!(
                "snapshot belongs to diamond {:?}, expected {:?}",
                snapshot.diamond, config.diamond_address
            ))
            .into());
        }
        if let InvariantCheckResult::Invalid(violations) = check_all_invariants(&snapshot) {
            let reasons: Vec<String> = violations.iter().map(ToString::to_string).collect();
            return Err(StoreError::Corrupted(reasons.join("; ")).into());
        }

        let guard = OwnershipGuard::from_state(snapshot.ownership)
            .map_err(|e| StoreError::Corrupted(e.to_string()))?;
        let registry = FacetRegistry::from_entries(snapshot.diamond, &snapshot.entries)
            .map_err(|e| StoreError::Corrupted(e.to_string()))?
            .with_max_cut_selectors(config.max_cut_selectors);

        info!(
            diamond = ?snapshot.diamond,
            owner = ?guard.current_owner(),
            selectors = registry.len(),
            slots = snapshot.storage.len(),
            "Restored diamond from snapshot"
        );

        let state = DiamondState {
            guard,
            registry,
            storage: snapshot.storage,
            next_event_sequence: snapshot.next_event_sequence,
        };
        Ok(Some(Self::from_state(config, resolver, events, store, state)))
    }

    fn from_state(
        config: DiamondConfig,
        resolver: Arc<R>,
        events: Arc<E>,
        store: Arc<S>,
        state: DiamondState,
    ) -> Self {
        Self {
            config,
            resolver,
            events,
            store,
            inner: Mutex::new(Inner { state }),
            stats: RwLock::new(DiamondStats::default()),
        }
    }

    /// Configuration the diamond runs with.
    #[must_use]
    pub fn config(&self) -> &DiamondConfig {
        &self.config
    }

    /// Address of the diamond.
    #[must_use]
    pub fn address(&self) -> Address {
        self.config.diamond_address
    }

    /// Current service statistics.
    pub async fn stats(&self) -> DiamondStats {
        self.stats.read().await.clone()
    }

    /// Snapshot of the committed state.
    pub async fn snapshot(&self) -> DiamondSnapshot {
        self.inner.lock().await.state.snapshot()
    }

    /// Read one committed storage slot.
    pub async fn storage_at(&self, key: StorageKey) -> StorageValue {
        self.inner.lock().await.state.storage.get(&key)
    }

    // -------------------------------------------------------------------------
    // Execution
    // -------------------------------------------------------------------------

    fn execute(
        &self,
        state: &DiamondState,
        caller: Address,
        selector: Selector,
        payload: &Bytes,
    ) -> Result<Effects, DiamondError> {
        let target = state
            .registry
            .lookup(selector)
            .ok_or(DiamondError::UnknownSelector(selector))?;

        if target == state.registry.diamond() {
            let builtin = BuiltinFunction::from_selector(selector)
                .ok_or(DiamondError::UnknownSelector(selector))?;
            return self.execute_builtin(state, caller, builtin, payload);
        }

        let call = FacetCall {
            caller,
            diamond: state.registry.diamond(),
            selector,
            payload: payload.clone(),
        };
        let mut overlay = StorageOverlay::new(&state.storage);
        let output = self.delegate(target, &call, &mut overlay)?;

        Ok(Effects {
            output,
            writes: overlay.into_writes(),
            ..Effects::default()
        })
    }

    fn delegate(
        &self,
        target: Address,
        call: &FacetCall,
        overlay: &mut StorageOverlay<'_>,
    ) -> Result<Bytes, DiamondError> {
        let facet = self
            .resolver
            .resolve(target)
            .ok_or(DiamondError::FacetNotDeployed {
                selector: call.selector,
                facet: target,
            })?;

        debug!(facet = facet.name(), target = ?target, "Delegating call");
        facet.execute(call, overlay).map_err(|e| {
            debug!(facet = facet.name(), reason = %e, "Facet reverted");
            DiamondError::from(e)
        })
    }

    fn execute_builtin(
        &self,
        state: &DiamondState,
        caller: Address,
        builtin: BuiltinFunction,
        payload: &Bytes,
    ) -> Result<Effects, DiamondError> {
        let registry = &state.registry;
        match builtin {
            BuiltinFunction::DiamondCut => {
                let cut: DiamondCut = codec::decode(payload.as_slice())?;
                self.execute_cut(state, caller, cut)
            }
            BuiltinFunction::TransferOwnership => {
                let new_owner: Address = codec::decode(payload.as_slice())?;
                let mut guard = state.guard.clone();
                let event = guard.transfer_ownership(caller, new_owner)?;
                Ok(Self::ownership_effects(guard, event.into()))
            }
            BuiltinFunction::AcceptOwnership => {
                let mut guard = state.guard.clone();
                let event = guard.accept_ownership(caller)?;
                Ok(Self::ownership_effects(guard, event.into()))
            }
            BuiltinFunction::CancelOwnershipTransfer => {
                let mut guard = state.guard.clone();
                let event = guard.cancel_transfer(caller)?;
                Ok(Self::ownership_effects(guard, event.into()))
            }
            BuiltinFunction::Owner => Ok(Effects::output(codec::encode(
                &state.guard.current_owner(),
            )?)),
            BuiltinFunction::NomineeOwner => Ok(Effects::output(codec::encode(
                &state.guard.current_nominee().unwrap_or(Address::ZERO),
            )?)),
            BuiltinFunction::Facets => Ok(Effects::output(codec::encode(&registry.facets())?)),
            BuiltinFunction::FacetFunctionSelectors => {
                let facet: Address = codec::decode(payload.as_slice())?;
                Ok(Effects::output(codec::encode(
                    &registry.facet_function_selectors(facet),
                )?))
            }
            BuiltinFunction::FacetAddresses => Ok(Effects::output(codec::encode(
                &registry.facet_addresses(),
            )?)),
            BuiltinFunction::FacetAddress => {
                let selector: Selector = codec::decode(payload.as_slice())?;
                Ok(Effects::output(codec::encode(
                    &registry.facet_address(selector).unwrap_or(Address::ZERO),
                )?))
            }
        }
    }

    fn ownership_effects(guard: OwnershipGuard, event: DiamondEvent) -> Effects {
        Effects {
            guard: Some(guard),
            events: vec![event],
            ..Effects::default()
        }
    }

    fn execute_cut(
        &self,
        state: &DiamondState,
        caller: Address,
        cut: DiamondCut,
    ) -> Result<Effects, DiamondError> {
        let staged = CutAuthorizer::new(&state.guard).stage(caller, &state.registry, &cut.cuts)?;

        let writes = match &cut.init {
            Some(init) => self.run_initializer(state, caller, init)?,
            None => StorageWrites::default(),
        };

        info!(
            cuts = cut.cuts.len(),
            selectors = staged.len(),
            init = cut.init.is_some(),
            "Staged diamond cut"
        );

        Ok(Effects {
            output: Bytes::new(),
            guard: None,
            staged: Some(staged),
            writes,
            events: vec![DiamondEvent::DiamondCut {
                cuts: cut.cuts,
                init: cut.init,
            }],
        })
    }

    fn run_initializer(
        &self,
        state: &DiamondState,
        caller: Address,
        init: &InitCall,
    ) -> Result<StorageWrites, DiamondError> {
        if init.target.is_zero() {
            return Err(RegistryError::NullTarget { action: "init" }.into());
        }
        if init.target == state.registry.diamond() {
            return Err(RegistryError::DiamondTarget { action: "init" }.into());
        }

        let call = FacetCall {
            caller,
            diamond: state.registry.diamond(),
            selector: init.selector,
            payload: init.payload.clone(),
        };
        let mut overlay = StorageOverlay::new(&state.storage);
        self.delegate(init.target, &call, &mut overlay)?;
        Ok(overlay.into_writes())
    }

    async fn commit(
        &self,
        inner: &mut Inner,
        effects: Effects,
    ) -> Result<Vec<(u64, DiamondEvent)>, DiamondError> {
        let events = if self.config.persist_on_commit {
            let mut next = inner.state.clone();
            let events = next.apply(effects);
            // Only swap in the new state once it is durable.
            self.store.save(&next.snapshot()).await?;
            inner.state = next;
            events
        } else {
            inner.state.apply(effects)
        };

        debug_assert!(
            check_all_invariants(&inner.state.snapshot()).is_valid(),
            "committed state violates a diamond invariant"
        );
        Ok(events)
    }

    fn publish(&self, call_id: Uuid, events: Vec<(u64, DiamondEvent)>) {
        for (sequence, event) in events {
            self.events.publish(EventRecord {
                sequence,
                call_id,
                event,
            });
        }
    }

    async fn record_outcome(
        &self,
        builtin: Option<BuiltinFunction>,
        result: &Result<Bytes, DiamondError>,
    ) {
        let mut stats = self.stats.write().await;
        stats.dispatched += 1;
        match result {
            Ok(_) => {
                stats.committed += 1;
                if builtin == Some(BuiltinFunction::DiamondCut) {
                    stats.cuts_applied += 1;
                }
            }
            Err(err) => {
                stats.reverted += 1;
                if err.is_unauthorized() {
                    stats.unauthorized_rejections += 1;
                }
            }
        }
    }
}

// =============================================================================
// API
// =============================================================================

#[async_trait]
impl<R: FacetResolver, E: EventSink, S: DiamondStore> DiamondApi for DiamondService<R, E, S> {
    #[instrument(
        skip_all,
        fields(caller = ?caller, selector = %selector, call_id = tracing::field::Empty)
    )]
    async fn dispatch(
        &self,
        caller: Address,
        selector: Selector,
        payload: Bytes,
    ) -> Result<Bytes, DiamondError> {
        let call_id = Uuid::new_v4();
        tracing::Span::current().record("call_id", tracing::field::display(call_id));

        let mut inner = self.inner.lock().await;
        let builtin = if inner.state.registry.is_immutable(selector) {
            BuiltinFunction::from_selector(selector)
        } else {
            None
        };

        let result = match self.execute(&inner.state, caller, selector, &payload) {
            Ok(mut effects) => {
                let output = std::mem::take(&mut effects.output);
                if effects.mutates() {
                    match self.commit(&mut inner, effects).await {
                        Ok(events) => {
                            self.publish(call_id, events);
                            Ok(output)
                        }
                        Err(err) => Err(err),
                    }
                } else {
                    Ok(output)
                }
            }
            Err(err) => Err(err),
        };
        drop(inner);

        match &result {
            Ok(output) => debug!(output_len = output.len(), "Call committed"),
            Err(err) if err.is_unauthorized() => {
                warn!(reason = err.reason_code(), "Call rejected");
            }
            Err(err) => debug!(reason = err.reason_code(), error = %err, "Call reverted"),
        }
        self.record_outcome(builtin, &result).await;
        result
    }

    async fn diamond_cut(&self, caller: Address, cut: DiamondCut) -> Result<(), DiamondError> {
        let payload = codec::encode(&cut)?;
        self.dispatch(caller, BuiltinFunction::DiamondCut.selector(), payload)
            .await
            .map(|_| ())
    }

    async fn transfer_ownership(
        &self,
        caller: Address,
        new_owner: Address,
    ) -> Result<(), DiamondError> {
        let payload = codec::encode(&new_owner)?;
        self.dispatch(caller, BuiltinFunction::TransferOwnership.selector(), payload)
            .await
            .map(|_| ())
    }

    async fn accept_ownership(&self, caller: Address) -> Result<(), DiamondError> {
        self.dispatch(caller, BuiltinFunction::AcceptOwnership.selector(), Bytes::new())
            .await
            .map(|_| ())
    }

    async fn cancel_transfer(&self, caller: Address) -> Result<(), DiamondError> {
        self.dispatch(
            caller,
            BuiltinFunction::CancelOwnershipTransfer.selector(),
            Bytes::new(),
        )
        .await
        .map(|_| ())
    }

    async fn owner(&self) -> Address {
        self.inner.lock().await.state.guard.current_owner()
    }

    async fn nominee(&self) -> Option<Address> {
        self.inner.lock().await.state.guard.current_nominee()
    }

    async fn facets(&self) -> Vec<FacetView> {
        self.inner.lock().await.state.registry.facets()
    }

    async fn facet_address(&self, selector: Selector) -> Option<Address> {
        self.inner.lock().await.state.registry.facet_address(selector)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryEventLog, InMemoryFacetDeployments, InMemoryStore};
    use crate::domain::entities::FacetCut;
    use crate::domain::storage::FacetStorage;
    use crate::errors::FacetError;
    use crate::ports::outbound::Facet;

    const OWNER: Address = Address::repeat_byte(0x01);
    const NOMINEE: Address = Address::repeat_byte(0x02);
    const STRANGER: Address = Address::repeat_byte(0x03);
    const FACET_X: Address = Address::repeat_byte(0x0A);
    const FACET_Y: Address = Address::repeat_byte(0x0B);
    const REVERTER: Address = Address::repeat_byte(0x0C);

    fn sel(value: u32) -> Selector {
        Selector::from_u32(value)
    }

    fn counter_slot() -> StorageKey {
        StorageKey::namespaced("test.counter")
    }

    /// Returns its tag and bumps a shared counter slot.
    struct TaggedFacet {
        tag: u8,
    }

    impl Facet for TaggedFacet {
        fn name(&self) -> &str {
            "TaggedFacet"
        }

        fn selectors(&self) -> Vec<Selector> {
            vec![sel(0x11), sel(0x22), sel(0x33)]
        }

        fn execute(
            &self,
            _call: &FacetCall,
            storage: &mut dyn FacetStorage,
        ) -> Result<Bytes, FacetError> {
            let count = storage.sload(counter_slot()).to_u256();
            storage.sstore(counter_slot(), StorageValue::from_u256(count + 1));
            Ok(Bytes::from_slice(&[self.tag]))
        }
    }

    /// Writes to storage, then reverts.
    struct RevertingFacet;

    impl Facet for RevertingFacet {
        fn name(&self) -> &str {
            "RevertingFacet"
        }

        fn selectors(&self) -> Vec<Selector> {
            vec![sel(0x55)]
        }

        fn execute(
            &self,
            _call: &FacetCall,
            storage: &mut dyn FacetStorage,
        ) -> Result<Bytes, FacetError> {
            storage.sstore(counter_slot(), StorageValue::from_u256(99u64.into()));
            Err(FacetError::Revert("fee too high".into()))
        }
    }

    type TestDiamond = DiamondService<InMemoryFacetDeployments, InMemoryEventLog, InMemoryStore>;

    struct Fixture {
        diamond: TestDiamond,
        log: Arc<InMemoryEventLog>,
        store: Arc<InMemoryStore>,
    }

    async fn fixture() -> Fixture {
        let deployments = Arc::new(InMemoryFacetDeployments::new());
        deployments.deploy(FACET_X, Arc::new(TaggedFacet { tag: b'X' }));
        deployments.deploy(FACET_Y, Arc::new(TaggedFacet { tag: b'Y' }));
        deployments.deploy(REVERTER, Arc::new(RevertingFacet));

        let log = Arc::new(InMemoryEventLog::new());
        let store = Arc::new(InMemoryStore::new());
        let diamond = DiamondService::deploy(
            OWNER,
            DiamondConfig::default(),
            deployments,
            Arc::clone(&log),
            Arc::clone(&store),
        )
        .await
        .unwrap();

        Fixture {
            diamond,
            log,
            store,
        }
    }

    fn add(target: Address, selectors: &[u32]) -> DiamondCut {
        DiamondCut::new(vec![FacetCut::add(
            target,
            selectors.iter().copied().map(sel).collect(),
        )])
    }

    #[tokio::test]
    async fn test_deploy_registers_builtins() {
        let f = fixture().await;
        let snapshot = f.diamond.snapshot().await;

        assert_eq!(snapshot.entries.len(), BuiltinFunction::ALL.len());
        assert!(check_all_invariants(&snapshot).is_valid());
        assert_eq!(f.diamond.owner().await, OWNER);
        assert_eq!(f.store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_deploy_rejects_null_owner() {
        let result = TestDiamond::deploy(
            Address::ZERO,
            DiamondConfig::default(),
            Arc::new(InMemoryFacetDeployments::new()),
            Arc::new(InMemoryEventLog::new()),
            Arc::new(InMemoryStore::new()),
        )
        .await;
        assert!(matches!(result, Err(DiamondError::InvalidNominee { .. })));
    }

    #[tokio::test]
    async fn test_add_dispatch_collision_scenario() {
        let f = fixture().await;
        f.diamond
            .diamond_cut(OWNER, add(FACET_X, &[0x11, 0x22, 0x33]))
            .await
            .unwrap();

        let out = f
            .diamond
            .dispatch(STRANGER, sel(0x11), Bytes::from_slice(b"p"))
            .await
            .unwrap();
        assert_eq!(out.as_slice(), b"X");

        let err = f
            .diamond
            .dispatch(STRANGER, sel(0x44), Bytes::new())
            .await
            .unwrap_err();
        assert_eq!(err, DiamondError::UnknownSelector(sel(0x44)));

        let err = f
            .diamond
            .diamond_cut(OWNER, add(FACET_Y, &[0x11]))
            .await
            .unwrap_err();
        assert_eq!(err.reason_code(), "SelectorCollision");
        assert_eq!(f.diamond.facet_address(sel(0x11)).await, Some(FACET_X));
    }

    #[tokio::test]
    async fn test_facet_writes_land_in_diamond_storage() {
        let f = fixture().await;
        f.diamond
            .diamond_cut(OWNER, add(FACET_X, &[0x11]))
            .await
            .unwrap();

        for _ in 0..3 {
            f.diamond
                .dispatch(STRANGER, sel(0x11), Bytes::new())
                .await
                .unwrap();
        }
        let value = f.diamond.storage_at(counter_slot()).await;
        assert_eq!(value.to_u256().as_u64(), 3);
    }

    #[tokio::test]
    async fn test_replace_keeps_storage() {
        let f = fixture().await;
        f.diamond
            .diamond_cut(OWNER, add(FACET_X, &[0x11, 0x22]))
            .await
            .unwrap();
        f.diamond
            .dispatch(STRANGER, sel(0x11), Bytes::new())
            .await
            .unwrap();

        let replace = DiamondCut::new(vec![FacetCut::replace(FACET_Y, vec![sel(0x11)])]);
        f.diamond.diamond_cut(OWNER, replace).await.unwrap();

        let out = f
            .diamond
            .dispatch(STRANGER, sel(0x11), Bytes::new())
            .await
            .unwrap();
        assert_eq!(out.as_slice(), b"Y");
        assert_eq!(f.diamond.facet_address(sel(0x22)).await, Some(FACET_X));
        assert_eq!(
            f.diamond.storage_at(counter_slot()).await.to_u256().as_u64(),
            2
        );
    }

    #[tokio::test]
    async fn test_remove_is_final() {
        let f = fixture().await;
        f.diamond
            .diamond_cut(OWNER, add(FACET_X, &[0x11]))
            .await
            .unwrap();
        let remove = DiamondCut::new(vec![FacetCut::remove(vec![sel(0x11)])]);
        f.diamond.diamond_cut(OWNER, remove).await.unwrap();

        let err = f
            .diamond
            .dispatch(STRANGER, sel(0x11), Bytes::new())
            .await
            .unwrap_err();
        assert_eq!(err, DiamondError::UnknownSelector(sel(0x11)));
    }

    #[tokio::test]
    async fn test_facet_revert_leaves_no_trace() {
        let f = fixture().await;
        f.diamond
            .diamond_cut(OWNER, add(REVERTER, &[0x55]))
            .await
            .unwrap();
        let before = f.diamond.snapshot().await;
        let events_before = f.log.len();

        let err = f
            .diamond
            .dispatch(STRANGER, sel(0x55), Bytes::new())
            .await
            .unwrap_err();

        assert_eq!(err, DiamondError::FacetReverted("fee too high".into()));
        assert_eq!(f.diamond.snapshot().await, before);
        assert_eq!(f.log.len(), events_before);
    }

    #[tokio::test]
    async fn test_undeployed_facet() {
        let f = fixture().await;
        let ghost = Address::repeat_byte(0xEE);
        f.diamond
            .diamond_cut(OWNER, add(ghost, &[0x66]))
            .await
            .unwrap();

        let err = f
            .diamond
            .dispatch(STRANGER, sel(0x66), Bytes::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DiamondError::FacetNotDeployed {
                selector: sel(0x66),
                facet: ghost
            }
        );
    }

    #[tokio::test]
    async fn test_cut_requires_owner() {
        let f = fixture().await;
        let before = f.diamond.snapshot().await;

        let err = f
            .diamond
            .diamond_cut(STRANGER, add(FACET_X, &[0x11]))
            .await
            .unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(f.diamond.snapshot().await, before);
        assert_eq!(f.diamond.stats().await.unauthorized_rejections, 1);
    }

    #[tokio::test]
    async fn test_two_phase_transfer_through_dispatch() {
        let f = fixture().await;
        let transfer = BuiltinFunction::TransferOwnership.selector();
        let accept = BuiltinFunction::AcceptOwnership.selector();

        f.diamond
            .dispatch(OWNER, transfer, codec::encode(&NOMINEE).unwrap())
            .await
            .unwrap();
        assert_eq!(f.diamond.owner().await, OWNER);
        assert_eq!(f.diamond.nominee().await, Some(NOMINEE));

        // The nominee has no authority before accepting.
        let err = f
            .diamond
            .diamond_cut(NOMINEE, add(FACET_X, &[0x11]))
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());

        let err = f
            .diamond
            .dispatch(STRANGER, accept, Bytes::new())
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());

        f.diamond
            .dispatch(NOMINEE, accept, Bytes::new())
            .await
            .unwrap();
        assert_eq!(f.diamond.owner().await, NOMINEE);
        assert_eq!(f.diamond.nominee().await, None);

        let names: Vec<_> = f.log.records().iter().map(|r| r.event.name()).collect();
        assert_eq!(names, vec!["OwnershipTransferStarted", "OwnershipTransferred"]);
    }

    #[tokio::test]
    async fn test_cancel_transfer() {
        let f = fixture().await;
        f.diamond.transfer_ownership(OWNER, NOMINEE).await.unwrap();

        let err = f.diamond.cancel_transfer(STRANGER).await.unwrap_err();
        assert!(err.is_unauthorized());

        f.diamond.cancel_transfer(OWNER).await.unwrap();
        assert_eq!(f.diamond.nominee().await, None);

        let err = f.diamond.accept_ownership(NOMINEE).await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_builtins_are_immutable() {
        let f = fixture().await;
        let owner_selector = BuiltinFunction::Owner.selector();

        let err = f
            .diamond
            .diamond_cut(OWNER, add(FACET_X, &[owner_selector.as_u32()]))
            .await
            .unwrap_err();
        assert_eq!(err.reason_code(), "SelectorCollision");

        let replace = DiamondCut::new(vec![FacetCut::replace(FACET_X, vec![owner_selector])]);
        let err = f.diamond.diamond_cut(OWNER, replace).await.unwrap_err();
        assert_eq!(err, DiamondError::ImmutableSelector(owner_selector));
    }

    #[tokio::test]
    async fn test_loupe_through_dispatch() {
        let f = fixture().await;
        f.diamond
            .diamond_cut(OWNER, add(FACET_X, &[0x11, 0x22]))
            .await
            .unwrap();

        let out = f
            .diamond
            .dispatch(
                STRANGER,
                BuiltinFunction::FacetFunctionSelectors.selector(),
                codec::encode(&FACET_X).unwrap(),
            )
            .await
            .unwrap();
        let selectors: Vec<Selector> = codec::decode(out.as_slice()).unwrap();
        assert_eq!(selectors, vec![sel(0x11), sel(0x22)]);

        let out = f
            .diamond
            .dispatch(
                STRANGER,
                BuiltinFunction::FacetAddress.selector(),
                codec::encode(&sel(0x99)).unwrap(),
            )
            .await
            .unwrap();
        let target: Address = codec::decode(out.as_slice()).unwrap();
        assert!(target.is_zero());

        let out = f
            .diamond
            .dispatch(STRANGER, BuiltinFunction::Owner.selector(), Bytes::new())
            .await
            .unwrap();
        assert_eq!(codec::decode::<Address>(out.as_slice()).unwrap(), OWNER);
    }

    #[tokio::test]
    async fn test_failed_initializer_reverts_cut() {
        let f = fixture().await;
        let before = f.diamond.snapshot().await;

        let cut = add(FACET_X, &[0x11]).with_init(InitCall {
            target: REVERTER,
            selector: sel(0x55),
            payload: Bytes::new(),
        });
        let err = f.diamond.diamond_cut(OWNER, cut).await.unwrap_err();

        assert_eq!(err.reason_code(), "FacetReverted");
        assert_eq!(f.diamond.snapshot().await, before);
        assert!(f.log.is_empty());
    }

    #[tokio::test]
    async fn test_initializer_writes_commit_with_cut() {
        let f = fixture().await;
        let cut = add(FACET_Y, &[0x22]).with_init(InitCall {
            target: FACET_X,
            selector: sel(0x11),
            payload: Bytes::new(),
        });
        f.diamond.diamond_cut(OWNER, cut).await.unwrap();

        assert_eq!(
            f.diamond.storage_at(counter_slot()).await.to_u256().as_u64(),
            1
        );
        let records = f.log.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event.name(), "DiamondCut");
    }

    #[tokio::test]
    async fn test_malformed_payload() {
        let f = fixture().await;
        let err = f
            .diamond
            .dispatch(
                OWNER,
                BuiltinFunction::TransferOwnership.selector(),
                Bytes::from_slice(&[1, 2]),
            )
            .await
            .unwrap_err();
        assert_eq!(err.reason_code(), "Codec");

        let err = f.diamond.call(OWNER, &[0x1f, 0x93]).await.unwrap_err();
        assert_eq!(err, DiamondError::MalformedCalldata { len: 2 });
    }

    #[tokio::test]
    async fn test_restore_from_store() {
        let f = fixture().await;
        f.diamond
            .diamond_cut(OWNER, add(FACET_X, &[0x11]))
            .await
            .unwrap();
        f.diamond
            .dispatch(STRANGER, sel(0x11), Bytes::new())
            .await
            .unwrap();
        f.diamond.transfer_ownership(OWNER, NOMINEE).await.unwrap();
        let expected = f.diamond.snapshot().await;

        let deployments = Arc::new(InMemoryFacetDeployments::new());
        deployments.deploy(FACET_X, Arc::new(TaggedFacet { tag: b'X' }));
        let restored = TestDiamond::restore(
            DiamondConfig::default(),
            deployments,
            Arc::new(InMemoryEventLog::new()),
            Arc::clone(&f.store),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(restored.snapshot().await, expected);
        assert_eq!(restored.nominee().await, Some(NOMINEE));
        let out = restored
            .dispatch(STRANGER, sel(0x11), Bytes::new())
            .await
            .unwrap();
        assert_eq!(out.as_slice(), b"X");
    }

    #[tokio::test]
    async fn test_restore_empty_store() {
        let restored = TestDiamond::restore(
            DiamondConfig::default(),
            Arc::new(InMemoryFacetDeployments::new()),
            Arc::new(InMemoryEventLog::new()),
            Arc::new(InMemoryStore::new()),
        )
        .await
        .unwrap();
        assert!(restored.is_none());
    }

    #[tokio::test]
    async fn test_restore_rejects_foreign_snapshot() {
        let f = fixture().await;
        let config = DiamondConfig {
            diamond_address: Address::repeat_byte(0x77),
            ..DiamondConfig::default()
        };
        let result = TestDiamond::restore(
            config,
            Arc::new(InMemoryFacetDeployments::new()),
            Arc::new(InMemoryEventLog::new()),
            Arc::clone(&f.store),
        )
        .await;
        assert!(matches!(
            result,
            Err(DiamondError::Store(StoreError::Corrupted(_)))
        ));
    }

    #[tokio::test]
    async fn test_stats_and_event_sequence() {
        let f = fixture().await;
        f.diamond
            .diamond_cut(OWNER, add(FACET_X, &[0x11]))
            .await
            .unwrap();
        f.diamond.transfer_ownership(OWNER, NOMINEE).await.unwrap();
        let _ = f.diamond.dispatch(STRANGER, sel(0x44), Bytes::new()).await;

        let stats = f.diamond.stats().await;
        assert_eq!(stats.dispatched, 3);
        assert_eq!(stats.committed, 2);
        assert_eq!(stats.reverted, 1);
        assert_eq!(stats.cuts_applied, 1);

        let sequences: Vec<_> = f.log.records().iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![0, 1]);
    }

    // =========================================================================
    // PERSISTENCE FAILURES
    // =========================================================================

    /// Saves succeed until `fail` is set.
    #[derive(Default)]
    struct FlakyStore {
        fail: std::sync::atomic::AtomicBool,
    }

    impl FlakyStore {
        fn break_disk(&self) {
            self.fail.store(true, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl DiamondStore for FlakyStore {
        async fn load(&self) -> Result<Option<DiamondSnapshot>, StoreError> {
            Ok(None)
        }

        async fn save(&self, _snapshot: &DiamondSnapshot) -> Result<(), StoreError> {
            if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(StoreError::Corrupted("disk full".into()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_store_failure_reverts_commit() {
        let deployments = Arc::new(InMemoryFacetDeployments::new());
        deployments.deploy(FACET_X, Arc::new(TaggedFacet { tag: b'X' }));
        let log = Arc::new(InMemoryEventLog::new());
        let store = Arc::new(FlakyStore::default());
        let diamond = DiamondService::deploy(
            OWNER,
            DiamondConfig::default(),
            deployments,
            Arc::clone(&log),
            Arc::clone(&store),
        )
        .await
        .unwrap();

        let before = diamond.snapshot().await;
        store.break_disk();

        let cut = diamond.diamond_cut(OWNER, add(FACET_X, &[0x11])).await;
        assert!(matches!(
            cut,
            Err(DiamondError::Store(StoreError::Corrupted(ref reason))) if reason == "disk full"
        ));
        let transfer = diamond.transfer_ownership(OWNER, NOMINEE).await;
        assert!(matches!(
            transfer,
            Err(DiamondError::Store(StoreError::Corrupted(_)))
        ));

        assert_eq!(diamond.snapshot().await, before);
        assert_eq!(diamond.facet_address(sel(0x11)).await, None);
        assert_eq!(diamond.nominee().await, None);
        assert!(log.records().is_empty());

        let stats = diamond.stats().await;
        assert_eq!(stats.committed, 0);
        assert_eq!(stats.reverted, 2);
        assert_eq!(stats.cuts_applied, 0);
    }

    #[tokio::test]
    async fn test_read_only_calls_skip_store() {
        let f = fixture().await;
        f.diamond
            .diamond_cut(OWNER, add(FACET_X, &[0x11]))
            .await
            .unwrap();
        let saves = f.store.save_count();

        for builtin in [
            BuiltinFunction::Owner,
            BuiltinFunction::NomineeOwner,
            BuiltinFunction::Facets,
        ] {
            f.diamond
                .dispatch(STRANGER, builtin.selector(), Bytes::new())
                .await
                .unwrap();
        }
        f.diamond
            .dispatch(
                STRANGER,
                BuiltinFunction::FacetAddress.selector(),
                codec::encode(&sel(0x11)).unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(f.store.save_count(), saves);
        assert_eq!(f.log.records().len(), 1);
        assert_eq!(f.diamond.stats().await.committed, 5);
    }

    #[tokio::test]
    async fn test_event_sequence_survives_restore() {
        let f = fixture().await;
        f.diamond
            .diamond_cut(OWNER, add(FACET_X, &[0x11]))
            .await
            .unwrap();
        f.diamond.transfer_ownership(OWNER, NOMINEE).await.unwrap();
        assert_eq!(f.diamond.snapshot().await.next_event_sequence, 2);

        let deployments = Arc::new(InMemoryFacetDeployments::new());
        deployments.deploy(FACET_X, Arc::new(TaggedFacet { tag: b'X' }));
        let log = Arc::new(InMemoryEventLog::new());
        let restored = TestDiamond::restore(
            DiamondConfig::default(),
            deployments,
            Arc::clone(&log),
            Arc::clone(&f.store),
        )
        .await
        .unwrap()
        .unwrap();

        restored.accept_ownership(NOMINEE).await.unwrap();
        let sequences: Vec<_> = log.records().iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![2]);
        assert_eq!(restored.snapshot().await.next_event_sequence, 3);
    }
}
