//! CLI command implementations.

pub(crate) mod migrate;

pub(crate) use migrate::MigrateArgs;
