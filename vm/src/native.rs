use crate::error::RuntimeError;
use crate::machine::VM;
use crate::specs::NATIVE_TABLE;
use crate::stdlib;
use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::Arc;

// The signature for built-in and in-process extension natives.
// Arguments are popped from `vm.stack`; the result (if any) is pushed back.
pub type NativeFn = fn(vm: &mut VM) -> Result<(), RuntimeError>;

/// Stack access handed to natives living in a dynamically loaded module.
/// Both callbacks return 0 on success and -1 on stack overflow/underflow.
#[repr(C)]
pub struct StackApi {
    pub ctx: *mut c_void,
    pub push: unsafe extern "C" fn(ctx: *mut c_void, value: i64) -> i32,
    pub pop: unsafe extern "C" fn(ctx: *mut c_void, out: *mut i64) -> i32,
}

/// Native exported by a dynamic module. Nonzero return means failure.
pub type ExternNativeFn = unsafe extern "C" fn(api: *const StackApi) -> i32;

#[derive(Clone, Copy)]
pub enum NativeHandler {
    Builtin(NativeFn),
    Extern(ExternNativeFn),
}

#[derive(Clone)]
pub struct NativeObj {
    pub name: String,
    pub handler: NativeHandler,
}

/// Table of native functions, keyed by the id used in `INVOKE_NATIVE`.
///
/// Cloning is cheap enough to build one registry (built-ins plus loaded
/// extensions) and hand a copy to every VM instance.
#[derive(Clone, Default)]
pub struct NativeRegistry {
    entries: HashMap<u64, NativeObj>,
    // Keeps extension code mapped while any handler may still be called.
    libraries: Vec<Arc<libloading::Library>>,
}

impl NativeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every entry of [`NATIVE_TABLE`].
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.bootstrap_natives();
        registry
    }

    pub fn define_native(&mut self, id: u64, name: &str, func: NativeFn) {
        self.insert(id, name, NativeHandler::Builtin(func));
    }

    pub fn define_extern(&mut self, id: u64, name: &str, func: ExternNativeFn) {
        self.insert(id, name, NativeHandler::Extern(func));
    }

    fn insert(&mut self, id: u64, name: &str, handler: NativeHandler) {
        let native = NativeObj {
            name: name.to_string(),
            handler,
        };
        if let Some(previous) = self.entries.insert(id, native) {
            tracing::warn!(id, previous = %previous.name, replacement = name, "native id redefined");
        } else {
            tracing::debug!(id, name, "native registered");
        }
    }

    pub(crate) fn retain_library(&mut self, library: Arc<libloading::Library>) {
        self.libraries.push(library);
    }

    pub fn get(&self, id: u64) -> Option<&NativeObj> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn bootstrap_natives(&mut self) {
        let funcs: [NativeFn; 18] = [
            stdlib::core::native_printc,
            stdlib::core::native_allocate,
            stdlib::core::native_deallocate,
            stdlib::core::native_exit,
            stdlib::file::native_file_open,
            stdlib::file::native_file_close,
            stdlib::file::native_file_write,
            stdlib::file::native_file_read,
            stdlib::file::native_file_size,
            stdlib::core::native_read16,
            stdlib::core::native_write16,
            stdlib::core::native_read32,
            stdlib::core::native_write32,
            stdlib::call::native_call0,
            stdlib::call::native_call1,
            stdlib::call::native_call2,
            stdlib::call::native_call3,
            stdlib::call::native_call4,
        ];
        debug_assert_eq!(funcs.len(), NATIVE_TABLE.len());
        for (id, (meta, func)) in NATIVE_TABLE.iter().zip(funcs).enumerate() {
            self.define_native(id as u64, meta.name, func);
        }
    }
}

// --- Extern bridge ---

/// Context behind `StackApi::ctx` for the duration of one extern call.
pub(crate) struct ExternBridge<'a> {
    pub vm: &'a mut VM,
    pub fault: Option<RuntimeError>,
}

pub(crate) unsafe extern "C" fn bridge_push(ctx: *mut c_void, value: i64) -> i32 {
    let bridge = &mut *(ctx as *mut ExternBridge<'_>);
    match bridge.vm.stack.push(value) {
        Ok(()) => 0,
        Err(e) => {
            bridge.fault.get_or_insert(e);
            -1
        }
    }
}

pub(crate) unsafe extern "C" fn bridge_pop(ctx: *mut c_void, out: *mut i64) -> i32 {
    let bridge = &mut *(ctx as *mut ExternBridge<'_>);
    match bridge.vm.stack.pop() {
        Ok(value) => {
            if !out.is_null() {
                *out = value;
            }
            0
        }
        Err(e) => {
            bridge.fault.get_or_insert(e);
            -1
        }
    }
}
