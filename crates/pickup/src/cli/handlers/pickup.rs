use std::io::Write;

use anyhow::Result;
use clap::ArgMatches;
use pickup_core::{ArrivalOutcome, LaneId, PickupState, QueueEntry};

use super::{arg, reported};
use crate::app::App;

pub fn handle_lanes(app: &App, out: &mut dyn Write) -> Result<()> {
    if app.flow.lanes().is_empty() {
        writeln!(out, "Any lane id is accepted.")?;
    }
    for lane in app.flow.lanes() {
        writeln!(out, "  {lane:<10} {}", lane.display_name())?;
    }
    Ok(())
}

pub async fn handle_arrive(app: &mut App, matches: &ArgMatches, out: &mut dyn Write) -> Result<()> {
    let lane = arg(matches, "lane")?;

    if let Some(ArrivalOutcome::Waiting { lane, count }) = reported(app.flow.on_arrival(lane).await) {
        writeln!(
            out,
            "Waiting in {} with {count} student(s). Run 'collected' once they are with you.",
            lane.display_name()
        )?;
    }
    Ok(())
}

pub async fn handle_collected(app: &mut App, out: &mut dyn Write) -> Result<()> {
    if let Some(count) = reported(app.flow.on_collected().await) {
        writeln!(out, "{count} student(s) collected.")?;
    }
    Ok(())
}

pub fn handle_status(app: &App, out: &mut dyn Write) -> Result<()> {
    let state = app.flow.state();
    writeln!(out, "Status: {state}")?;
    if let PickupState::Waiting { entries, .. } = state {
        for entry in entries {
            writeln!(out, "  {} ({})", entry.student_display_name, entry.section)?;
        }
    }
    Ok(())
}

pub async fn handle_roster(app: &App, matches: &ArgMatches, out: &mut dyn Write) -> Result<()> {
    let lane = LaneId::parse(arg(matches, "lane")?)?;
    let roster = app.coordinator.roster(&lane).await?;
    let name = roster.lane().display_name();

    let entries: Vec<&QueueEntry> = if matches.get_flag("mine") {
        roster.entries_for_parent(&app.require_parent()?)
    } else {
        roster.entries().iter().collect()
    };

    if entries.is_empty() {
        writeln!(out, "{name} is empty.")?;
        return Ok(());
    }
    writeln!(out, "{name} ({} waiting):", entries.len())?;
    for entry in entries {
        writeln!(
            out,
            "  {:<24} {:<6} since {}",
            entry.student_display_name,
            entry.section,
            entry.enqueued_at.format("%H:%M:%S")
        )?;
    }
    Ok(())
}
