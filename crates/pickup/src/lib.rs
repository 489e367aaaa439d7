//! Pickup - interactive pickup lane shell for parents
//!
//! Stands in for the parent's phone: sign in, register students, tell the
//! school which lane you are waiting in and confirm the pickup.

pub mod app;
pub mod cli;
pub mod setup;
pub mod shell;

pub use app::App;
