//! Command implementations
//!
//! Each module corresponds to a subcommand in the CLI.

pub mod ask;
pub mod classify;
pub mod indexes;
pub mod ingest;
pub mod serve;
