//! Muyu - command-line tool for sprite-sheet processing and skin management

use std::process::ExitCode;

use muyu::cli;

fn main() -> ExitCode {
    cli::run()
}
