//! Wiring of the pickup services for one shell session.

use std::sync::Arc;

use pickup_core::{
    Config, DocumentIdentity, DocumentStore, Error, LaneCoordinator, LaneId, MemoryStore,
    NoticeLog, ParentDirectory, ParentId, PickupFlow, Result, SessionContext, SqliteStore,
    StoreBackend, StudentRegistry,
};

/// Everything a shell command may touch.
#[derive(Debug)]
pub struct App {
    pub identity: Arc<DocumentIdentity>,
    pub directory: ParentDirectory,
    pub registry: StudentRegistry,
    pub coordinator: LaneCoordinator,
    pub flow: PickupFlow,
    pub session: SessionContext,
    pub notices: Arc<NoticeLog>,
}

impl App {
    /// Open the configured store and wire the services over it.
    ///
    /// # Errors
    ///
    /// Returns `IoError` if the database directory cannot be created and
    /// `StoreUnavailable` if the database cannot be opened.
    pub async fn open(config: &Config) -> Result<Self> {
        let store: Arc<dyn DocumentStore> = match config.backend {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::Sqlite => {
                if let Some(dir) = config
                    .database
                    .parent()
                    .filter(|dir| !dir.as_os_str().is_empty())
                {
                    tokio::fs::create_dir_all(dir).await.map_err(|e| {
                        Error::IoError(format!("Failed to create {}: {e}", dir.display()))
                    })?;
                }
                Arc::new(SqliteStore::open(&config.database).await?)
            }
        };
        tracing::info!(backend = %config.backend, "document store ready");
        Ok(Self::with_store(store, config.lanes.clone()))
    }

    /// Wire the services over an existing store.
    pub fn with_store(store: Arc<dyn DocumentStore>, lanes: Vec<LaneId>) -> Self {
        let identity = Arc::new(DocumentIdentity::new(Arc::clone(&store)));
        let notices = Arc::new(NoticeLog::new());
        let coordinator = LaneCoordinator::new(Arc::clone(&store));
        let registry = StudentRegistry::new(Arc::clone(&store));
        let flow = PickupFlow::new(
            coordinator.clone(),
            registry.clone(),
            identity.clone(),
            notices.clone(),
            lanes,
        );

        Self {
            identity,
            directory: ParentDirectory::new(store),
            registry,
            coordinator,
            flow,
            session: SessionContext::new(),
            notices,
        }
    }

    /// The signed-in parent.
    ///
    /// # Errors
    ///
    /// Returns `AuthFailed` when nobody is logged in.
    pub fn require_parent(&self) -> Result<ParentId> {
        self.session
            .user_id()
            .cloned()
            .ok_or_else(|| Error::AuthFailed("Please log in first.".to_string()))
    }

    /// Refuse to switch accounts while students are queued.
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailed` while the flow is waiting in a lane.
    pub fn ensure_not_waiting(&self) -> Result<()> {
        match self.flow.state().lane() {
            Some(lane) if self.flow.state().is_waiting() => Err(Error::validation(format!(
                "You are waiting in {}. Run 'collected' first.",
                lane.display_name()
            ))),
            _ => Ok(()),
        }
    }
}
