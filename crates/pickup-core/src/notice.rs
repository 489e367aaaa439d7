//! Presentation contract between the pickup flow and whatever shows it.
//!
//! The flow reports transient notices, a busy indicator and its state
//! changes to a registered [`Presenter`]. It never depends on how they are
//! displayed.

use std::sync::{Mutex, PoisonError};

use crate::flow::PickupState;

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Receives what the flow wants shown.
pub trait Presenter: Send + Sync {
    /// Show a transient notice.
    fn notify(&self, notice: Notice);

    /// Show or hide the busy indicator.
    fn set_loading(&self, loading: bool);

    /// The pickup state changed.
    fn state_changed(&self, _state: &PickupState) {}
}

/// Raises the busy indicator for its lifetime.
pub struct LoadingGuard<'a> {
    presenter: &'a dyn Presenter,
}

impl<'a> LoadingGuard<'a> {
    #[must_use]
    pub fn new(presenter: &'a dyn Presenter) -> Self {
        presenter.set_loading(true);
        Self { presenter }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.presenter.set_loading(false);
    }
}

#[derive(Debug, Default)]
struct LogState {
    notices: Vec<Notice>,
    loading: bool,
    loading_raised: usize,
    states: Vec<PickupState>,
}

/// Presenter that records everything it is told and mirrors it to `tracing`.
#[derive(Debug, Default)]
pub struct NoticeLog {
    state: Mutex<LogState>,
}

impl NoticeLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut LogState) -> T) -> T {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *guard)
    }

    /// Take the notices recorded so far.
    pub fn drain(&self) -> Vec<Notice> {
        self.with_state(|s| std::mem::take(&mut s.notices))
    }

    /// Notices recorded so far, oldest first.
    pub fn notices(&self) -> Vec<Notice> {
        self.with_state(|s| s.notices.clone())
    }

    /// Whether the busy indicator is currently shown.
    pub fn is_loading(&self) -> bool {
        self.with_state(|s| s.loading)
    }

    /// How many times the busy indicator was raised.
    pub fn loading_raised(&self) -> usize {
        self.with_state(|s| s.loading_raised)
    }

    /// Every state reported, oldest first.
    pub fn states(&self) -> Vec<PickupState> {
        self.with_state(|s| s.states.clone())
    }
}

impl Presenter for NoticeLog {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error => tracing::warn!(message = %notice.message, "error notice"),
            level => tracing::info!(%level, message = %notice.message, "notice"),
        }
        self.with_state(|s| s.notices.push(notice));
    }

    fn set_loading(&self, loading: bool) {
        self.with_state(|s| {
            s.loading = loading;
            if loading {
                s.loading_raised += 1;
            }
        });
    }

    fn state_changed(&self, state: &PickupState) {
        tracing::debug!(state = %state, "pickup state changed");
        self.with_state(|s| s.states.push(state.clone()));
    }
}
