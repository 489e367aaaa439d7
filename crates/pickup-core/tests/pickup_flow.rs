//! Pickup flow against a store whose lane writes can fail.

#![allow(clippy::expect_used)]

mod common;

use std::sync::Arc;

use common::FlakyStore;
use pickup_core::{
    ArrivalOutcome, DocumentIdentity, Error, LaneCoordinator, LaneId, MemoryStore, NewStudent,
    NoticeLevel, NoticeLog, ParentId, PickupFlow, PickupState, Result, StudentRegistry,
};

struct Fixture {
    store: Arc<FlakyStore>,
    flow: PickupFlow,
    log: Arc<NoticeLog>,
    coordinator: LaneCoordinator,
    registry: StudentRegistry,
    parent: ParentId,
}

async fn fixture() -> Result<Fixture> {
    let store = Arc::new(FlakyStore::new(Arc::new(MemoryStore::new())));
    let identity = Arc::new(DocumentIdentity::new(store.clone()));
    let parent = identity
        .sign_up("rosa@example.com", "secret1", "0911223344")
        .await?;

    let log = Arc::new(NoticeLog::new());
    let coordinator = LaneCoordinator::new(store.clone());
    let registry = StudentRegistry::new(store.clone());
    let flow = PickupFlow::new(
        coordinator.clone(),
        registry.clone(),
        identity,
        log.clone(),
        vec![LaneId::parse("lane-1")?],
    );

    Ok(Fixture {
        store,
        flow,
        log,
        coordinator,
        registry,
        parent,
    })
}

impl Fixture {
    async fn register(&self, name: &str) -> Result<()> {
        self.registry
            .register(NewStudent::new(name, "2A", self.parent.clone())?)
            .await
            .map(|_| ())
    }

    fn last_level(&self) -> Option<NoticeLevel> {
        self.log.notices().last().map(|n| n.level)
    }
}

fn lane() -> LaneId {
    LaneId::parse("lane-1").expect("valid lane id")
}

#[tokio::test]
async fn test_empty_registry_never_writes_lane() -> Result<()> {
    let mut f = fixture().await?;

    assert_eq!(f.flow.on_arrival("lane-1").await?, ArrivalOutcome::NoStudents);
    assert_eq!(f.flow.state(), &PickupState::NoStudents);
    assert_eq!(f.store.lane_writes(), 0);
    Ok(())
}

#[tokio::test]
async fn test_failed_add_restores_prior_state() -> Result<()> {
    let mut f = fixture().await?;
    f.register("Tomás").await?;
    f.store.fail_lane_writes(true);

    let result = f.flow.on_arrival("lane-1").await;

    assert!(matches!(result, Err(Error::StoreUnavailable(_))));
    assert_eq!(f.flow.state(), &PickupState::Idle);
    assert_eq!(f.last_level(), Some(NoticeLevel::Error));
    assert!(!f.log.is_loading());
    assert!(f.coordinator.roster(&lane()).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_failed_remove_keeps_waiting() -> Result<()> {
    let mut f = fixture().await?;
    f.register("Tomás").await?;
    f.register("Inés").await?;
    f.flow.on_arrival("lane-1").await?;
    let waiting = f.flow.state().clone();

    f.store.fail_lane_writes(true);
    assert!(f.flow.on_collected().await.is_err());
    assert_eq!(f.flow.state(), &waiting);
    assert_eq!(f.last_level(), Some(NoticeLevel::Error));
    assert_eq!(f.coordinator.roster(&lane()).await?.len(), 2);

    f.store.fail_lane_writes(false);
    assert_eq!(f.flow.on_collected().await?, 2);
    assert_eq!(f.flow.state(), &PickupState::Idle);
    assert!(f.coordinator.roster(&lane()).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_collection_removes_only_own_entries() -> Result<()> {
    let mut f = fixture().await?;
    f.register("Tomás").await?;

    let other = common::entries("someone-else", &["kid-x"]);
    f.coordinator.add(&lane(), &other).await?;

    f.flow.on_arrival("lane-1").await?;
    assert_eq!(f.coordinator.roster(&lane()).await?.len(), 2);

    f.flow.on_collected().await?;
    assert_eq!(
        f.coordinator.roster(&lane()).await?.entries(),
        other.as_slice()
    );
    Ok(())
}

#[tokio::test]
async fn test_loading_raised_once_per_action() -> Result<()> {
    let mut f = fixture().await?;
    f.register("Tomás").await?;

    f.flow.refresh().await?;
    f.flow.on_arrival("lane-1").await?;
    f.flow.on_collected().await?;

    assert_eq!(f.log.loading_raised(), 3);
    assert!(!f.log.is_loading());
    assert_eq!(f.last_level(), Some(NoticeLevel::Success));
    Ok(())
}
