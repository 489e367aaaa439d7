//! Shell command handlers.
//!
//! Handlers write their output to the given writer. Errors from the pickup
//! flow are already reported as notices, so handlers swallow those; every
//! other `pickup_core::Error` is returned and printed by the shell.

mod account;
mod pickup;
mod student;

use std::io::Write;

use anyhow::{anyhow, Result};
use clap::ArgMatches;

use crate::app::App;

/// Whether the shell keeps reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

pub async fn dispatch(app: &mut App, matches: &ArgMatches, out: &mut dyn Write) -> Result<Control> {
    match matches.subcommand() {
        Some(("signup", sub_m)) => account::handle_signup(app, sub_m, out).await?,
        Some(("login", sub_m)) => account::handle_login(app, sub_m, out).await?,
        Some(("logout", _)) => account::handle_logout(app, out).await?,
        Some(("whoami", _)) => account::handle_whoami(app, out)?,
        Some(("student", sub_m)) => student::handle(app, sub_m, out).await?,
        Some(("lanes", _)) => pickup::handle_lanes(app, out)?,
        Some(("arrive", sub_m)) => pickup::handle_arrive(app, sub_m, out).await?,
        Some(("collected", _)) => pickup::handle_collected(app, out).await?,
        Some(("status", _)) => pickup::handle_status(app, out)?,
        Some(("roster", sub_m)) => pickup::handle_roster(app, sub_m, out).await?,
        Some(("help", _)) => {
            let mut shell = crate::cli::build_shell();
            writeln!(out, "{}", shell.render_help())?;
        }
        Some(("quit", _)) => return Ok(Control::Quit),
        _ => anyhow::bail!("Unknown command. Type 'help' for usage."),
    }
    Ok(Control::Continue)
}

/// A required argument. clap enforces presence, this only avoids a panic path.
fn arg<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing <{name}>"))
}

/// Log a flow error that has already been shown to the user as a notice.
fn reported<T>(result: pickup_core::Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(error = %e, "pickup flow action failed");
            None
        }
    }
}
