use crate::error::RuntimeError;
use crate::native::{bridge_pop, bridge_push, ExternBridge, NativeHandler, StackApi};
use std::ffi::c_void;

/// Trait for native function dispatch
pub trait NativeOps {
    fn call_native(&mut self, id: u64) -> Result<(), RuntimeError>;
}

impl NativeOps for super::vm::VM {
    fn call_native(&mut self, id: u64) -> Result<(), RuntimeError> {
        let handler = self
            .natives
            .get(id)
            .map(|n| n.handler)
            .ok_or(RuntimeError::UnknownNativeId(id))?;

        match handler {
            NativeHandler::Builtin(func) => func(self),
            NativeHandler::Extern(func) => {
                let mut bridge = ExternBridge {
                    vm: self,
                    fault: None,
                };
                let api = StackApi {
                    ctx: &mut bridge as *mut ExternBridge<'_> as *mut c_void,
                    push: bridge_push,
                    pop: bridge_pop,
                };
                // SAFETY: `api` and `bridge` outlive the call; the library
                // that owns `func` is retained by the registry.
                let status = unsafe { func(&api) };
                if let Some(fault) = bridge.fault {
                    return Err(fault);
                }
                if status != 0 {
                    return Err(RuntimeError::NativeFailed {
                        id,
                        reason: format!("extension returned status {}", status),
                    });
                }
                Ok(())
            }
        }
    }
}
