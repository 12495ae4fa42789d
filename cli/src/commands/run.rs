use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use vm::{load_extensions, Completion, Image, NativeRegistry, VmConfig, VM};

use crate::DEFAULT_CONFIG_FILE;

/// Command-line overrides for [`VmConfig`].
#[derive(Debug, Default, Clone)]
pub struct RunOptions {
    pub config: Option<PathBuf>,
    pub stack_capacity: Option<usize>,
    pub module_dir: Option<PathBuf>,
    pub no_extensions: bool,
}

/// Explicit `--config`, else `flvm.toml` if present, else defaults; then
/// flags on top.
pub fn resolve_config(opts: &RunOptions) -> Result<VmConfig> {
    let mut config = match &opts.config {
        Some(path) => VmConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            VmConfig::load(Path::new(DEFAULT_CONFIG_FILE))
                .with_context(|| format!("Failed to load config {}", DEFAULT_CONFIG_FILE))?
        }
        None => VmConfig::default(),
    };

    if let Some(capacity) = opts.stack_capacity {
        config.stack_capacity = capacity;
    }
    if let Some(dir) = &opts.module_dir {
        config.module_dir = dir.clone();
    }
    if opts.no_extensions {
        config.load_extensions = false;
    }
    Ok(config)
}

/// Run the image at `path` and return the process exit status.
pub fn run_file(path: &Path, args: &[String], opts: &RunOptions) -> Result<i32> {
    run_file_with_output(path, args, opts, Box::new(std::io::stdout()))
}

pub fn run_file_with_output(
    path: &Path,
    args: &[String],
    opts: &RunOptions,
    output: Box<dyn Write>,
) -> Result<i32> {
    let config = resolve_config(opts)?;
    let image = Image::load(path)
        .with_context(|| format!("Failed to load image {}", path.display()))?;

    let mut natives = NativeRegistry::with_builtins();
    if config.load_extensions {
        let loaded = load_extensions(&config.module_dir, &mut natives);
        debug!(count = loaded.len(), dir = %config.module_dir.display(), "extensions loaded");
    }

    let mut vm = VM::with_registry(image, config, natives);
    vm.set_output(output);

    // argv[0] is the image path.
    let mut argv: Vec<String> = Vec::with_capacity(args.len() + 1);
    argv.push(path.display().to_string());
    argv.extend(args.iter().cloned());

    let completion = vm
        .run(&argv)
        .with_context(|| format!("Runtime error in {}", path.display()))?;

    match completion {
        Completion::Returned => Ok(0),
        Completion::Exited(code) => {
            info!(code, "program exited");
            Ok(code)
        }
    }
}
