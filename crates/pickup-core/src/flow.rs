//! Pickup session flow: one parent's relationship to one lane.
//!
//! ```text
//! Idle --(confirm arrival)--> Notified --(add succeeds)--> Waiting
//! Waiting --(confirm collected, remove succeeds)--> Idle
//! ```
//!
//! A parent with no registered students lands in `NoStudents` instead and
//! the lane is never touched. A failed transition restores the previous
//! state and reports the error; nothing is retried or rolled back.
//!
//! The entries built on arrival are kept in the state and handed back to
//! the coordinator unchanged on collection. Lanes remove entries by full
//! value equality, so rebuilding them (with a new timestamp) would leave
//! the originals stranded in the lane.

use std::{fmt, sync::Arc};

use chrono::Utc;

use crate::{
    coordinator::LaneCoordinator,
    entry::QueueEntry,
    identity::IdentityProvider,
    ids::{LaneId, ParentId},
    notice::{LoadingGuard, Notice, Presenter},
    registry::StudentRegistry,
    Error, Result,
};

/// Where the parent is in the pickup lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickupState {
    /// Ready to announce arrival
    Idle,
    /// The parent has no registered students
    NoStudents,
    /// Arrival confirmed, lane write in flight
    Notified {
        lane: LaneId,
        entries: Vec<QueueEntry>,
    },
    /// Students are queued in the lane
    Waiting {
        lane: LaneId,
        entries: Vec<QueueEntry>,
    },
}

impl PickupState {
    /// Entries currently held for the lane, if any
    #[must_use]
    pub fn entries(&self) -> &[QueueEntry] {
        match self {
            Self::Notified { entries, .. } | Self::Waiting { entries, .. } => entries,
            Self::Idle | Self::NoStudents => &[],
        }
    }

    /// Lane the parent selected, if any
    #[must_use]
    pub const fn lane(&self) -> Option<&LaneId> {
        match self {
            Self::Notified { lane, .. } | Self::Waiting { lane, .. } => Some(lane),
            Self::Idle | Self::NoStudents => None,
        }
    }

    #[must_use]
    pub const fn is_waiting(&self) -> bool {
        matches!(self, Self::Waiting { .. })
    }
}

impl fmt::Display for PickupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::NoStudents => write!(f, "no students"),
            Self::Notified { lane, .. } => write!(f, "notified ({})", lane.display_name()),
            Self::Waiting { lane, entries } => write!(
                f,
                "waiting ({}, {} student(s))",
                lane.display_name(),
                entries.len()
            ),
        }
    }
}

/// Result of announcing arrival.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrivalOutcome {
    /// Students were queued in the lane
    Waiting { lane: LaneId, count: usize },
    /// Nothing to queue; the lane was not touched
    NoStudents,
}

/// Drives the coordinator for the signed-in parent.
pub struct PickupFlow {
    coordinator: LaneCoordinator,
    registry: StudentRegistry,
    identity: Arc<dyn IdentityProvider>,
    presenter: Arc<dyn Presenter>,
    lanes: Vec<LaneId>,
    state: PickupState,
}

impl fmt::Debug for PickupFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PickupFlow")
            .field("lanes", &self.lanes)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl PickupFlow {
    /// Create a flow in the `Idle` state. An empty `lanes` list accepts any lane.
    #[must_use]
    pub fn new(
        coordinator: LaneCoordinator,
        registry: StudentRegistry,
        identity: Arc<dyn IdentityProvider>,
        presenter: Arc<dyn Presenter>,
        lanes: Vec<LaneId>,
    ) -> Self {
        Self {
            coordinator,
            registry,
            identity,
            presenter,
            lanes,
            state: PickupState::Idle,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &PickupState {
        &self.state
    }

    /// Lanes a parent may choose from
    #[must_use]
    pub fn lanes(&self) -> &[LaneId] {
        &self.lanes
    }

    /// Re-check whether the parent has students (done whenever the pickup
    /// screen is shown). Returns whether any are registered.
    pub async fn refresh(&mut self) -> Result<bool> {
        let presenter = Arc::clone(&self.presenter);
        let _loading = LoadingGuard::new(presenter.as_ref());

        let result = self.check_students().await;
        if let Err(e) = &result {
            self.report("Checking your students", e);
        }
        result
    }

    /// The parent confirmed arrival at `lane`.
    ///
    /// Errors are reported to the presenter before being returned.
    pub async fn on_arrival(&mut self, lane: &str) -> Result<ArrivalOutcome> {
        let presenter = Arc::clone(&self.presenter);
        let _loading = LoadingGuard::new(presenter.as_ref());

        let result = self.arrive(lane).await;
        if let Err(e) = &result {
            self.report("Announcing your arrival", e);
        }
        result
    }

    /// The parent confirmed the students were collected. Returns how many
    /// entries were taken out of the lane.
    ///
    /// Errors are reported to the presenter before being returned.
    pub async fn on_collected(&mut self) -> Result<usize> {
        let presenter = Arc::clone(&self.presenter);
        let _loading = LoadingGuard::new(presenter.as_ref());

        let result = self.collect().await;
        if let Err(e) = &result {
            self.report("Marking your students as collected", e);
        }
        result
    }

    async fn arrive(&mut self, lane: &str) -> Result<ArrivalOutcome> {
        if let PickupState::Waiting { lane, .. } = &self.state {
            return Err(Error::validation(format!(
                "You are already waiting in {}.",
                lane.display_name()
            )));
        }

        let lane = self.select_lane(lane)?;
        let parent = self.require_parent().await?;
        let students = self.registry.list_by_parent(&parent).await?;

        if students.is_empty() {
            self.set_state(PickupState::NoStudents);
            self.presenter
                .notify(Notice::info("You have no registered students to pick up."));
            return Ok(ArrivalOutcome::NoStudents);
        }

        let entries = QueueEntry::for_students(&parent, &students, Utc::now());
        let previous = self.state.clone();
        self.set_state(PickupState::Notified {
            lane: lane.clone(),
            entries: entries.clone(),
        });

        if let Err(e) = self.coordinator.add(&lane, &entries).await {
            self.set_state(previous);
            return Err(e);
        }

        let count = entries.len();
        self.set_state(PickupState::Waiting {
            lane: lane.clone(),
            entries,
        });
        self.presenter.notify(Notice::success(format!(
            "You announced your arrival at {}. Your children are on their way.",
            lane.display_name()
        )));
        Ok(ArrivalOutcome::Waiting { lane, count })
    }

    async fn collect(&mut self) -> Result<usize> {
        let PickupState::Waiting { lane, entries } = &self.state else {
            return Err(Error::validation(
                "There are no students in the queue to mark as collected.",
            ));
        };

        self.coordinator.remove(lane, entries).await?;
        let count = entries.len();

        self.set_state(PickupState::Idle);
        self.presenter
            .notify(Notice::success("Your children have been picked up!"));

        if let Err(e) = self.check_students().await {
            self.report("Checking your students", &e);
        }
        Ok(count)
    }

    async fn check_students(&mut self) -> Result<bool> {
        let parent = self.require_parent().await?;
        let has_students = !self.registry.list_by_parent(&parent).await?.is_empty();

        match (&self.state, has_students) {
            (PickupState::Notified { .. } | PickupState::Waiting { .. }, _) => {}
            (_, true) => self.set_state(PickupState::Idle),
            (_, false) => self.set_state(PickupState::NoStudents),
        }
        Ok(has_students)
    }

    fn select_lane(&self, lane: &str) -> Result<LaneId> {
        if lane.trim().is_empty() {
            return Err(Error::validation("Please select a lane."));
        }
        let lane = LaneId::parse(lane.trim())?;
        if !self.lanes.is_empty() && !self.lanes.contains(&lane) {
            return Err(Error::validation(format!("Unknown lane '{lane}'.")));
        }
        Ok(lane)
    }

    async fn require_parent(&self) -> Result<ParentId> {
        self.identity
            .current_user_id()
            .await
            .ok_or_else(|| Error::AuthFailed("Please log in first.".to_string()))
    }

    fn set_state(&mut self, next: PickupState) {
        if self.state != next {
            tracing::debug!(from = %self.state, to = %next, "pickup transition");
            self.state = next;
            self.presenter.state_changed(&self.state);
        }
    }

    fn report(&self, action: &str, err: &Error) {
        let notice = match err {
            Error::ValidationFailed(reason) => Notice::warning(reason.clone()),
            Error::AuthFailed(_) => Notice::error("Please sign in again to continue."),
            other => Notice::error(format!("{action} failed. {}", other.user_message())),
        };
        tracing::warn!(action, error = %err, "pickup action failed");
        self.presenter.notify(notice);
    }
}
