//! Extension natives.
//!
//! Two kinds of extension feed the [`NativeRegistry`]:
//!
//! * in-process types implementing [`Extension`], installed with
//!   [`NativeRegistry::install`];
//! * shared libraries found under the module directory. Each exports an
//!   `init` symbol with the [`ExtensionInitFn`] signature, which is called
//!   once with a [`Registrar`] and registers `(id, handler)` pairs.
//!
//! Load failures never abort startup: they are logged and the scan moves on.

use crate::native::{ExternNativeFn, NativeRegistry};
use libloading::Library;
use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Name of the entry point every extension module exports.
pub const INIT_SYMBOL: &[u8] = b"init";

/// File extensions recognized as loadable modules.
pub const MODULE_EXTENSIONS: &[&str] = &["so", "dylib", "dll"];

#[derive(Debug, Error)]
pub enum ExtensionError {
    #[error("failed to load extension: {0}")]
    LoadFailed(String),
    #[error("extension is missing the `init` entry point")]
    MissingEntryPoint,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A source of native functions.
pub trait Extension {
    fn name(&self) -> &str;
    fn register(&self, registry: &mut NativeRegistry);
}

impl NativeRegistry {
    pub fn install(&mut self, extension: &dyn Extension) {
        debug!(extension = extension.name(), "installing extension");
        extension.register(self);
    }
}

/// Callback table passed to a module's `init`.
#[repr(C)]
pub struct Registrar {
    pub ctx: *mut c_void,
    pub register: unsafe extern "C" fn(ctx: *mut c_void, id: u64, handler: ExternNativeFn),
}

pub type ExtensionInitFn = unsafe extern "C" fn(registrar: *mut Registrar);

unsafe extern "C" fn collect_registration(ctx: *mut c_void, id: u64, handler: ExternNativeFn) {
    let collected = &mut *(ctx as *mut Vec<(u64, ExternNativeFn)>);
    collected.push((id, handler));
}

/// Call a module's `init` and gather what it registers, in call order.
///
/// # Safety
/// `init` must be a valid entry point whose code stays mapped for the call.
unsafe fn run_init(init: ExtensionInitFn) -> Vec<(u64, ExternNativeFn)> {
    let mut collected: Vec<(u64, ExternNativeFn)> = Vec::new();
    let mut registrar = Registrar {
        ctx: &mut collected as *mut Vec<(u64, ExternNativeFn)> as *mut c_void,
        register: collect_registration,
    };
    init(&mut registrar);
    collected
}

/// A shared library opened from disk.
pub struct DylibExtension {
    name: String,
    library: Arc<Library>,
    init: ExtensionInitFn,
}

impl DylibExtension {
    pub fn open(path: &Path) -> Result<Self, ExtensionError> {
        // SAFETY: loading a module runs its static initializers; modules in
        // the module directory are trusted.
        let library = unsafe {
            Library::new(path)
                .map_err(|e| ExtensionError::LoadFailed(format!("{}: {}", path.display(), e)))?
        };
        let init = unsafe {
            *library
                .get::<ExtensionInitFn>(INIT_SYMBOL)
                .map_err(|_| ExtensionError::MissingEntryPoint)?
        };
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            name,
            library: Arc::new(library),
            init,
        })
    }
}

impl Extension for DylibExtension {
    fn name(&self) -> &str {
        &self.name
    }

    fn register(&self, registry: &mut NativeRegistry) {
        // SAFETY: `init` was resolved from the library we still hold.
        let collected = unsafe { run_init(self.init) };

        for (id, handler) in collected {
            registry.define_extern(id, &format!("{}#{}", self.name, id), handler);
        }
        registry.retain_library(Arc::clone(&self.library));
    }
}

/// Recursively list candidate module files under `dir`, in walk order.
/// A missing directory yields no modules.
pub fn discover_modules(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "module directory not present");
        return Vec::new();
    }

    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "skipping unreadable module path");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| MODULE_EXTENSIONS.contains(&ext))
        })
        .collect()
}

/// Load every module under `dir` into `registry`. Returns the names of the
/// modules that loaded.
pub fn load_extensions(dir: &Path, registry: &mut NativeRegistry) -> Vec<String> {
    let mut loaded = Vec::new();
    for path in discover_modules(dir) {
        match DylibExtension::open(&path) {
            Ok(extension) => {
                let before = registry.len();
                registry.install(&extension);
                info!(
                    module = extension.name(),
                    path = %path.display(),
                    natives = registry.len().saturating_sub(before),
                    "loaded extension"
                );
                loaded.push(extension.name().to_string());
            }
            Err(e) => warn!(path = %path.display(), error = %e, "failed to load extension"),
        }
    }
    loaded
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use crate::asm::Assembler;
    use crate::config::VmConfig;
    use crate::loader::Image;
    use crate::machine::{Completion, VM};
    use crate::native::StackApi;

    unsafe extern "C" fn answer(api: *const StackApi) -> i32 {
        let api = &*api;
        (api.push)(api.ctx, 42)
    }

    unsafe extern "C" fn negate(api: *const StackApi) -> i32 {
        let api = &*api;
        let mut value = 0;
        if (api.pop)(api.ctx, &mut value) != 0 {
            return -1;
        }
        (api.push)(api.ctx, value.wrapping_neg())
    }

    // Stands in for the `init` a shared library would export.
    unsafe extern "C" fn module_init(registrar: *mut Registrar) {
        let registrar = &mut *registrar;
        (registrar.register)(registrar.ctx, 40, answer);
        (registrar.register)(registrar.ctx, 41, negate);
    }

    #[test]
    fn test_init_registers_through_registrar() {
        let collected = unsafe { run_init(module_init) };
        let ids: Vec<u64> = collected.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![40, 41]);

        let mut registry = NativeRegistry::with_builtins();
        for (id, handler) in collected {
            registry.define_extern(id, &format!("module#{}", id), handler);
        }
        assert!(registry.contains(40));
        assert_eq!(registry.get(41).unwrap().name, "module#41");

        let mut asm = Assembler::new();
        let main = asm.new_label();
        asm.entry(main).global_init(main);
        asm.bind(main).invoke_native(40).invoke_native(41).ret();
        let image = Image::from_bytes(asm.finish().unwrap()).unwrap();

        let mut vm = VM::with_registry(image, VmConfig::default(), registry);
        let entry = vm.image.entry_offset();
        assert_eq!(vm.invoke(entry).unwrap(), Completion::Returned);
        assert_eq!(vm.stack.as_slice(), &[-42]);
    }

    #[test]
    fn test_discover_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested/deeper");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("a.so"), b"").unwrap();
        fs::write(nested.join("b.dylib"), b"").unwrap();
        fs::write(nested.join("readme.txt"), b"").unwrap();
        fs::write(dir.path().join("noext"), b"").unwrap();

        let mut found: Vec<String> = discover_modules(dir.path())
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        found.sort();
        assert_eq!(found, vec!["a.so", "b.dylib"]);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_modules(&dir.path().join("absent")).is_empty());
    }

    #[test]
    fn test_bogus_module_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.so"), b"not a shared object").unwrap();

        let mut registry = NativeRegistry::with_builtins();
        let before = registry.len();
        let loaded = load_extensions(dir.path(), &mut registry);
        assert!(loaded.is_empty());
        assert_eq!(registry.len(), before);
    }

    #[test]
    fn test_open_reports_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.so");
        fs::write(&path, b"garbage").unwrap();
        assert!(matches!(
            DylibExtension::open(&path),
            Err(ExtensionError::LoadFailed(_))
        ));
    }
}
