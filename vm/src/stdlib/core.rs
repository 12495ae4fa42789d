use crate::error::RuntimeError;
use crate::machine::VM;
use memory::Address;
use std::io::Write;

pub fn native_printc(vm: &mut VM) -> Result<(), RuntimeError> {
    let c = vm.stack.pop()?;
    vm.output.write_all(&[c as u8])?;
    vm.stack.push(0)
}

pub fn native_allocate(vm: &mut VM) -> Result<(), RuntimeError> {
    let size = vm.stack.pop()?;
    let addr = vm.memory.allocate(size)?;
    tracing::trace!(size, %addr, "allocate");
    vm.stack.push(addr.to_raw())
}

pub fn native_deallocate(vm: &mut VM) -> Result<(), RuntimeError> {
    let addr = Address::from_raw(vm.stack.pop()?);
    vm.memory.free(addr)?;
    vm.stack.push(0)
}

pub fn native_exit(vm: &mut VM) -> Result<(), RuntimeError> {
    let code = vm.stack.pop()?;
    vm.output.flush()?;
    tracing::debug!(code, "exit requested");
    vm.exit_code = Some(code as i32);
    Ok(())
}

// --- Raw memory access ---

pub fn native_read16(vm: &mut VM) -> Result<(), RuntimeError> {
    let addr = Address::from_raw(vm.stack.pop()?);
    let value = vm.memory.read_u16(addr)?;
    vm.stack.push(value as i64)
}

pub fn native_write16(vm: &mut VM) -> Result<(), RuntimeError> {
    let value = vm.stack.pop()?;
    let addr = Address::from_raw(vm.stack.pop()?);
    vm.memory.write_u16(addr, value as u16)?;
    vm.stack.push(0)
}

pub fn native_read32(vm: &mut VM) -> Result<(), RuntimeError> {
    let addr = Address::from_raw(vm.stack.pop()?);
    let value = vm.memory.read_u32(addr)?;
    vm.stack.push(value as i64)
}

pub fn native_write32(vm: &mut VM) -> Result<(), RuntimeError> {
    let value = vm.stack.pop()?;
    let addr = Address::from_raw(vm.stack.pop()?);
    vm.memory.write_u32(addr, value as u32)?;
    vm.stack.push(0)
}
