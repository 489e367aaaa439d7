//! Pickup-core - School pickup lane coordination
//!
//! This crate provides:
//! - Lane queue coordination over a shared document store
//! - Student registry and parent identity
//! - The parent pickup flow and its presentation contract
//! - Configuration loading

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod coordinator;
pub mod entry;
pub mod error;
pub mod flow;
pub mod identity;
pub mod ids;
pub mod notice;
pub mod profile;
pub mod registry;
pub mod roster;
pub mod session;
pub mod store;

pub use config::{load_config, Config, StoreBackend};
pub use coordinator::LaneCoordinator;
pub use entry::QueueEntry;
pub use error::{Error, Result};
pub use flow::{ArrivalOutcome, PickupFlow, PickupState};
pub use identity::{DocumentIdentity, IdentityProvider};
pub use ids::{LaneId, ParentId, StudentId};
pub use notice::{LoadingGuard, Notice, NoticeLevel, NoticeLog, Presenter};
pub use profile::{ParentDirectory, ParentProfile};
pub use registry::{NewStudent, StudentProfile, StudentRegistry};
pub use roster::LaneRoster;
pub use session::SessionContext;
pub use store::{Document, DocumentStore, MemoryStore, SqliteStore};
