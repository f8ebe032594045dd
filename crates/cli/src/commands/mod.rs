//! CLI subcommands

pub mod metrics;
pub mod ping;
pub mod status;
