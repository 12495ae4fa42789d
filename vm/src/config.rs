//! Runtime limits and startup options.
//!
//! Loaded from a TOML file such as:
//!
//! ```toml
//! stack_capacity = 4096
//! max_call_depth = 512
//! module_dir = "modules"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_STACK_CAPACITY: usize = 65_536;
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1024;
pub const DEFAULT_MAX_GLOBALS: usize = 1 << 20;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VmConfig {
    /// Maximum number of values on the value stack.
    pub stack_capacity: usize,
    /// Maximum nesting of INVOKE (and call0..call4) frames.
    pub max_call_depth: usize,
    /// Maximum number of global slots.
    pub max_globals: usize,
    /// Ceiling on live heap bytes handed out by `allocate`.
    pub max_allocation: usize,
    /// Directory scanned recursively for extension modules.
    pub module_dir: PathBuf,
    pub load_extensions: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            stack_capacity: DEFAULT_STACK_CAPACITY,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_globals: DEFAULT_MAX_GLOBALS,
            max_allocation: memory::heap::DEFAULT_MAX_ALLOCATION,
            module_dir: PathBuf::from("modules"),
            load_extensions: true,
        }
    }
}

impl VmConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}
