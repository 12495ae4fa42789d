pub mod args;
pub mod commands;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "flvm.toml";
