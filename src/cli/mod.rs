//! Command-line interface module.

mod args;
pub mod check;
pub mod common;
pub mod deploy;
pub mod plan;

pub use args::{Cli, Commands, ModeArgs};
