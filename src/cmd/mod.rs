//! Subcommands of the `fuel-log-indexer` binary besides `run`.

pub mod dry_run;

pub use dry_run::{DryRunArgs, DryRunError};
