//! Building and running the command line program.

use super::propagate::{create_propagate_subcommand, run_propagate_subcommand};
use clap::{crate_name, crate_version, Command};

/// Runs the command line program with the arguments of the current process.
pub fn run() {
    let arguments = build_gyrotrace_command().get_matches();

    if let Some(propagate_arguments) = arguments.subcommand_matches("propagate") {
        run_propagate_subcommand(propagate_arguments);
    }
}

/// Builds a representation of the `gyrotrace` command line program.
fn build_gyrotrace_command() -> Command<'static> {
    Command::new(crate_name!())
        .version(crate_version!())
        .about("Propagate charged particles through electromagnetic fields")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(create_propagate_subcommand())
}
