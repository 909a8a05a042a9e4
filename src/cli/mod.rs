//! Command line front end.
//!
//! Each subcommand is a clap `Args` struct with an `execute` method; `main.rs`
//! only parses, loads the config and maps the result to an exit code.

pub mod common;
pub mod convert;
pub mod inspect;

pub use common::{CliError, CliResult, ExitCode};
pub use convert::ConvertArgs;
pub use inspect::InspectArgs;
