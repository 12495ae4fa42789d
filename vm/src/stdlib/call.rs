use crate::error::RuntimeError;
use crate::machine::{Completion, VM};

/// Pop `argc` arguments and the target beneath them, re-push the arguments
/// in their original order and invoke the target as if by INVOKE.
fn call_indirect(vm: &mut VM, argc: usize) -> Result<(), RuntimeError> {
    let mut args = [0i64; 4];
    for i in (0..argc).rev() {
        args[i] = vm.stack.pop()?;
    }
    let target = vm.stack.pop()? as u64;
    for &arg in &args[..argc] {
        vm.stack.push(arg)?;
    }

    if let Completion::Exited(code) = vm.invoke(target)? {
        vm.exit_code = Some(code);
    }
    Ok(())
}

pub fn native_call0(vm: &mut VM) -> Result<(), RuntimeError> {
    call_indirect(vm, 0)
}

pub fn native_call1(vm: &mut VM) -> Result<(), RuntimeError> {
    call_indirect(vm, 1)
}

pub fn native_call2(vm: &mut VM) -> Result<(), RuntimeError> {
    call_indirect(vm, 2)
}

pub fn native_call3(vm: &mut VM) -> Result<(), RuntimeError> {
    call_indirect(vm, 3)
}

pub fn native_call4(vm: &mut VM) -> Result<(), RuntimeError> {
    call_indirect(vm, 4)
}
