use std::io::Write;

use anyhow::Result;
use clap::ArgMatches;
use pickup_core::{Error, NewStudent, StudentId};

use super::{arg, reported};
use crate::app::App;

pub async fn handle(app: &mut App, matches: &ArgMatches, out: &mut dyn Write) -> Result<()> {
    let parent = app.require_parent()?;

    match matches.subcommand() {
        Some(("add", sub_m)) => {
            let student = NewStudent::new(arg(sub_m, "name")?, arg(sub_m, "section")?, parent)?;
            let name = student.name.clone();
            let id = app.registry.register(student).await?;
            writeln!(out, "Registered {name} ({id}).")?;
            reported(app.flow.refresh().await);
        }
        Some(("list", _)) => {
            let students = app.registry.list_by_parent(&parent).await?;
            if students.is_empty() {
                writeln!(out, "No students registered. Use 'student add <name> <section>'.")?;
            }
            for student in students {
                writeln!(out, "  {}  {} ({})", student.id, student.name, student.section)?;
            }
        }
        Some(("remove", sub_m)) => {
            let id = StudentId::parse(arg(sub_m, "id")?)?;
            let student = app.registry.get(&id).await?;
            if student.parent_id != parent {
                return Err(Error::not_found("student", &id).into());
            }
            app.registry.delete(&id).await?;
            writeln!(out, "Removed {}.", student.name)?;
            reported(app.flow.refresh().await);
        }
        _ => anyhow::bail!("Unknown student command. Type 'help' for usage."),
    }
    Ok(())
}
