//! Command builders for the pickup binary and its interactive shell.

pub mod handlers;

use std::path::PathBuf;

use clap::{value_parser, Arg, ArgAction, Command};

/// Process arguments: `pickup [--config FILE] [--database PATH] [--memory]`.
pub fn build_cli() -> Command {
    Command::new("pickup")
        .version(env!("CARGO_PKG_VERSION"))
        .about("School pickup lanes: tell the school you have arrived")
        .long_about(
            "Interactive pickup shell for parents.\n\
             \n\
             Reads one command per line. Type 'help' once started.",
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Extra config file layered over global and project config"),
        )
        .arg(
            Arg::new("database")
                .long("database")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .conflicts_with("memory")
                .help("SQLite database file (implies the sqlite backend)"),
        )
        .arg(
            Arg::new("memory")
                .long("memory")
                .action(ArgAction::SetTrue)
                .help("Keep everything in memory; nothing survives exit"),
        )
}

/// Commands accepted at the shell prompt, one per line.
pub fn build_shell() -> Command {
    Command::new("pickup")
        .no_binary_name(true)
        .disable_version_flag(true)
        .disable_help_subcommand(true)
        .subcommand_required(true)
        .subcommand(cmd_signup())
        .subcommand(cmd_login())
        .subcommand(Command::new("logout").about("Sign out of this device"))
        .subcommand(Command::new("whoami").about("Show the signed-in parent"))
        .subcommand(cmd_student())
        .subcommand(Command::new("lanes").about("List pickup lanes"))
        .subcommand(
            Command::new("arrive")
                .about("Tell the school you are waiting in a lane")
                .arg(Arg::new("lane").required(true).help("Lane id, e.g. lane-1")),
        )
        .subcommand(Command::new("collected").about("Confirm your children are with you"))
        .subcommand(Command::new("status").about("Show your pickup status"))
        .subcommand(
            Command::new("roster")
                .about("Show who is waiting in a lane")
                .arg(Arg::new("lane").required(true).help("Lane id, e.g. lane-1"))
                .arg(
                    Arg::new("mine")
                        .long("mine")
                        .action(ArgAction::SetTrue)
                        .help("Only show your own students"),
                ),
        )
        .subcommand(Command::new("help").about("Show this help"))
        .subcommand(Command::new("quit").alias("exit").about("Leave the shell"))
}

fn cmd_signup() -> Command {
    Command::new("signup")
        .about("Create a parent account and sign in")
        .arg(Arg::new("email").required(true))
        .arg(Arg::new("password").required(true))
        .arg(Arg::new("national-id").required(true))
        .arg(Arg::new("first-name").long("first-name").value_name("NAME"))
        .arg(Arg::new("last-name").long("last-name").value_name("NAME"))
        .arg(Arg::new("phone").long("phone").value_name("PHONE"))
}

fn cmd_login() -> Command {
    Command::new("login")
        .about("Sign in with your email or national id")
        .arg(
            Arg::new("identifier")
                .required(true)
                .help("Email address or national id"),
        )
        .arg(Arg::new("password").required(true))
}

fn cmd_student() -> Command {
    Command::new("student")
        .about("Manage your registered students")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .about("Register a student")
                .arg(Arg::new("name").required(true))
                .arg(Arg::new("section").required(true)),
        )
        .subcommand(Command::new("list").about("List your students"))
        .subcommand(
            Command::new("remove")
                .about("Remove a student")
                .arg(Arg::new("id").required(true)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_are_well_formed() {
        build_cli().debug_assert();
        build_shell().debug_assert();
    }

    #[test]
    fn test_database_conflicts_with_memory() {
        let result =
            build_cli().try_get_matches_from(["pickup", "--memory", "--database", "x.db"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_shell_line_parses_without_binary_name() {
        let matches = build_shell().try_get_matches_from(["arrive", "lane-2"]);
        let lane = matches
            .as_ref()
            .ok()
            .and_then(|m| m.subcommand_matches("arrive"))
            .and_then(|m| m.get_one::<String>("lane"))
            .cloned();
        assert_eq!(lane.as_deref(), Some("lane-2"));
    }

    #[test]
    fn test_exit_is_alias_for_quit() {
        let matches = build_shell().try_get_matches_from(["exit"]);
        assert_eq!(
            matches.ok().and_then(|m| m.subcommand_name().map(String::from)),
            Some("quit".to_string())
        );
    }
}
