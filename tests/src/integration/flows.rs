//! # Integration Test Flows
//!
//! The diamond service driven end to end with the node's facets and the
//! in-memory adapters.
//!
//! ## Flows Tested:
//!
//! 1. **Upgrade**: Replace a facet with a new version, storage carries over
//! 2. **Handover**: Two-phase ownership transfer moves cut authority
//! 3. **Event history**: Committed calls publish in order, reverted calls never do
//! 4. **Concurrency**: Parallel callers are serialized without lost updates

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use haber_diamond::adapters::{InMemoryEventLog, InMemoryFacetDeployments, InMemoryStore};
    use haber_diamond::domain::builtins::BuiltinFunction;
    use haber_diamond::domain::entities::{DiamondCut, FacetCall, FacetCut, InitCall};
    use haber_diamond::domain::storage::FacetStorage;
    use haber_diamond::domain::value_objects::{
        Address, Bytes, Selector, StorageKey, StorageValue, U256,
    };
    use haber_diamond::errors::{DiamondError, FacetError};
    use haber_diamond::events::{codec, DiamondEvent};
    use haber_diamond::ports::inbound::DiamondApi;
    use haber_diamond::ports::outbound::{DiamondStore, Facet};
    use haber_diamond::service::{DiamondConfig, DiamondService};
    use haber_node::facets::{CounterFacet, KeyValueFacet};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const OWNER: Address = Address::repeat_byte(0x01);
    const SUCCESSOR: Address = Address::repeat_byte(0x02);
    const USER: Address = Address::repeat_byte(0x09);

    const COUNTER_V1: Address = Address::repeat_byte(0xc1);
    const COUNTER_V2: Address = Address::repeat_byte(0xc2);
    const KEY_VALUE: Address = Address::repeat_byte(0xa1);

    type TestDiamond = DiamondService<InMemoryFacetDeployments, InMemoryEventLog, InMemoryStore>;

    /// Counter upgrade that steps by two and can reset.
    struct CounterV2Facet;

    impl CounterV2Facet {
        const RESET: &'static str = "reset()";
    }

    impl Facet for CounterV2Facet {
        fn name(&self) -> &str {
            "CounterV2Facet"
        }

        fn selectors(&self) -> Vec<Selector> {
            vec![
                Selector::from_signature(CounterFacet::INCREMENT),
                Selector::from_signature(CounterFacet::COUNT),
                Selector::from_signature(Self::RESET),
            ]
        }

        fn execute(
            &self,
            call: &FacetCall,
            storage: &mut dyn FacetStorage,
        ) -> Result<Bytes, FacetError> {
            let slot = CounterFacet::slot();
            let current = storage.sload(slot).to_u256();
            if call.selector == Selector::from_signature(CounterFacet::INCREMENT) {
                let next = current + U256::from(2u64);
                storage.sstore(slot, StorageValue::from_u256(next));
                codec::encode(&next).map_err(|e| FacetError::InvalidPayload(e.to_string()))
            } else if call.selector == Selector::from_signature(CounterFacet::COUNT) {
                codec::encode(&current).map_err(|e| FacetError::InvalidPayload(e.to_string()))
            } else if call.selector == Selector::from_signature(Self::RESET) {
                storage.sstore(slot, StorageValue::ZERO);
                Ok(Bytes::new())
            } else {
                Err(FacetError::UnsupportedSelector(call.selector))
            }
        }
    }

    struct Harness {
        diamond: Arc<TestDiamond>,
        events: Arc<InMemoryEventLog>,
        store: Arc<InMemoryStore>,
    }

    impl Harness {
        /// Diamond with the counter and key/value facets cut in.
        async fn new() -> Self {
            let deployments = Arc::new(InMemoryFacetDeployments::new());
            deployments.deploy(COUNTER_V1, Arc::new(CounterFacet::new()));
            deployments.deploy(COUNTER_V2, Arc::new(CounterV2Facet));
            deployments.deploy(KEY_VALUE, Arc::new(KeyValueFacet::new()));

            let events = Arc::new(InMemoryEventLog::new());
            let store = Arc::new(InMemoryStore::new());
            let diamond = DiamondService::deploy(
                OWNER,
                DiamondConfig::default(),
                deployments,
                Arc::clone(&events),
                Arc::clone(&store),
            )
            .await
            .unwrap();

            let cut = DiamondCut::new(vec![
                FacetCut::add(COUNTER_V1, CounterFacet::new().selectors()),
                FacetCut::add(KEY_VALUE, KeyValueFacet::new().selectors()),
            ]);
            diamond.diamond_cut(OWNER, cut).await.unwrap();

            Self {
                diamond: Arc::new(diamond),
                events,
                store,
            }
        }

        async fn call(&self, signature: &str) -> Result<Bytes, DiamondError> {
            self.diamond
                .dispatch(USER, Selector::from_signature(signature), Bytes::new())
                .await
        }

        async fn count(&self) -> U256 {
            let out = self.call(CounterFacet::COUNT).await.unwrap();
            codec::decode(out.as_slice()).unwrap()
        }
    }

    // =============================================================================
    // UPGRADE FLOW
    // =============================================================================

    /// Replacing a facet reroutes its selectors and keeps the diamond's storage
    #[tokio::test]
    async fn test_upgrade_preserves_storage() {
        let harness = Harness::new().await;
        for _ in 0..3 {
            harness.call(CounterFacet::INCREMENT).await.unwrap();
        }
        assert_eq!(harness.count().await, U256::from(3u64));

        // Upgrade: increment/count move to v2, decrement is retired, reset is new.
        let upgrade = DiamondCut::new(vec![
            FacetCut::replace(
                COUNTER_V2,
                vec![
                    Selector::from_signature(CounterFacet::INCREMENT),
                    Selector::from_signature(CounterFacet::COUNT),
                ],
            ),
            FacetCut::remove(vec![Selector::from_signature(CounterFacet::DECREMENT)]),
            FacetCut::add(
                COUNTER_V2,
                vec![Selector::from_signature(CounterV2Facet::RESET)],
            ),
        ]);
        harness.diamond.diamond_cut(OWNER, upgrade).await.unwrap();

        assert_eq!(harness.count().await, U256::from(3u64));
        harness.call(CounterFacet::INCREMENT).await.unwrap();
        assert_eq!(harness.count().await, U256::from(5u64));

        let err = harness.call(CounterFacet::DECREMENT).await.unwrap_err();
        assert_eq!(
            err,
            DiamondError::UnknownSelector(Selector::from_signature(CounterFacet::DECREMENT))
        );

        harness.call(CounterV2Facet::RESET).await.unwrap();
        assert_eq!(harness.count().await, U256::zero());

        // v1 no longer serves anything and drops out of the loupe.
        let facets = harness.diamond.facets().await;
        assert!(facets.iter().all(|view| view.address != COUNTER_V1));
        assert_eq!(facets.len(), 3);
    }

    /// An upgrade whose initializer migrates storage commits both or neither
    #[tokio::test]
    async fn test_upgrade_with_migration_initializer() {
        let harness = Harness::new().await;
        let marker = StorageKey::namespaced("migration.v2");
        let seed = codec::encode(&vec![(marker, StorageValue::from_u256(U256::one()))]).unwrap();

        let migrate = DiamondCut::new(vec![FacetCut::replace(
            COUNTER_V2,
            vec![Selector::from_signature(CounterFacet::INCREMENT)],
        )])
        .with_init(InitCall {
            target: KEY_VALUE,
            selector: Selector::from_signature(KeyValueFacet::SET_VALUES),
            payload: seed,
        });
        harness.diamond.diamond_cut(OWNER, migrate).await.unwrap();

        let stored = harness
            .diamond
            .storage_at(KeyValueFacet::slot(marker))
            .await;
        assert_eq!(stored.to_u256(), U256::one());
        assert_eq!(
            harness
                .diamond
                .facet_address(Selector::from_signature(CounterFacet::INCREMENT))
                .await,
            Some(COUNTER_V2)
        );
    }

    // =============================================================================
    // OWNERSHIP HANDOVER
    // =============================================================================

    /// Cut authority follows the owner through a completed handover
    #[tokio::test]
    async fn test_handover_moves_cut_authority() {
        let harness = Harness::new().await;
        let retire = DiamondCut::new(vec![FacetCut::remove(vec![Selector::from_signature(
            CounterFacet::DECREMENT,
        )])]);

        harness
            .diamond
            .transfer_ownership(OWNER, SUCCESSOR)
            .await
            .unwrap();

        // Pending: the old owner still governs, the nominee does not yet.
        let err = harness
            .diamond
            .diamond_cut(SUCCESSOR, retire.clone())
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());

        harness.diamond.accept_ownership(SUCCESSOR).await.unwrap();

        let err = harness
            .diamond
            .diamond_cut(OWNER, retire.clone())
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
        harness.diamond.diamond_cut(SUCCESSOR, retire).await.unwrap();

        let snapshot = harness.store.load().await.unwrap().unwrap();
        assert_eq!(snapshot.ownership.owner(), SUCCESSOR);
        assert_eq!(snapshot.ownership.nominee(), None);
    }

    /// The owner built-in answers through plain dispatch
    #[tokio::test]
    async fn test_owner_readable_by_anyone() {
        let harness = Harness::new().await;
        let out = harness
            .diamond
            .dispatch(USER, BuiltinFunction::Owner.selector(), Bytes::new())
            .await
            .unwrap();
        assert_eq!(codec::decode::<Address>(out.as_slice()).unwrap(), OWNER);
    }

    // =============================================================================
    // EVENT HISTORY
    // =============================================================================

    /// Events carry increasing sequence numbers and skip reverted calls
    #[tokio::test]
    async fn test_event_history_in_commit_order() {
        let harness = Harness::new().await;

        harness
            .diamond
            .transfer_ownership(USER, SUCCESSOR)
            .await
            .unwrap_err();
        harness
            .diamond
            .transfer_ownership(OWNER, SUCCESSOR)
            .await
            .unwrap();
        harness.diamond.cancel_transfer(OWNER).await.unwrap();

        let records = harness.events.records();
        let names: Vec<&str> = records.iter().map(|r| r.event.name()).collect();
        assert_eq!(
            names,
            vec![
                "DiamondCut",
                "OwnershipTransferStarted",
                "OwnershipTransferCancelled"
            ]
        );
        assert!(records.windows(2).all(|w| w[0].sequence < w[1].sequence));
        assert_eq!(
            records[2].event,
            DiamondEvent::OwnershipTransferCancelled {
                owner: OWNER,
                nominee: SUCCESSOR,
            }
        );
    }

    /// Facet calls never publish diamond events
    #[tokio::test]
    async fn test_facet_calls_are_silent() {
        let harness = Harness::new().await;
        let before = harness.events.len();
        harness.call(CounterFacet::INCREMENT).await.unwrap();
        harness.call(CounterFacet::DECREMENT).await.unwrap();
        harness.call(CounterFacet::DECREMENT).await.unwrap_err();
        assert_eq!(harness.events.len(), before);
    }

    // =============================================================================
    // CONCURRENCY
    // =============================================================================

    /// Concurrent increments are serialized: none is lost
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_dispatch_loses_no_updates() {
        let harness = Harness::new().await;
        let mut handles = Vec::new();

        for _ in 0..50 {
            let diamond = Arc::clone(&harness.diamond);
            handles.push(tokio::spawn(async move {
                diamond
                    .dispatch(
                        USER,
                        Selector::from_signature(CounterFacet::INCREMENT),
                        Bytes::new(),
                    )
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(harness.count().await, U256::from(50u64));
        let stats = harness.diamond.stats().await;
        assert_eq!(stats.reverted, 0);
    }

    /// A cut racing with facet calls is observed all-or-nothing by each call
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_calls_racing_an_upgrade() {
        let harness = Harness::new().await;
        let increment = Selector::from_signature(CounterFacet::INCREMENT);

        let mut handles = Vec::new();
        for _ in 0..20 {
            let diamond = Arc::clone(&harness.diamond);
            handles.push(tokio::spawn(async move {
                diamond.dispatch(USER, increment, Bytes::new()).await
            }));
        }
        harness
            .diamond
            .diamond_cut(
                OWNER,
                DiamondCut::new(vec![FacetCut::replace(COUNTER_V2, vec![increment])]),
            )
            .await
            .unwrap();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // Each increment ran fully on v1 (+1) or fully on v2 (+2).
        let total = harness.count().await.as_u64();
        assert!((20..=40).contains(&total));
    }
}
