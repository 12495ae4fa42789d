use crate::error::RuntimeError;
use crate::slot::{Slot, SlotTag, LOCAL_SLOTS};
use memory::{Address, MemoryError};

use super::frame::CallFrame;

/// Resolve `idx` to a slot: locals below `LOCAL_SLOTS`, globals above.
/// The global pool grows (never shrinks) to cover `idx`.
fn locate<'a>(
    globals: &'a mut Vec<Slot>,
    max_globals: usize,
    frame: &'a mut CallFrame,
    idx: u64,
) -> Result<&'a mut Slot, RuntimeError> {
    if idx < LOCAL_SLOTS as u64 {
        return Ok(&mut frame.locals[idx as usize]);
    }
    let g = usize::try_from(idx - LOCAL_SLOTS as u64)
        .ok()
        .filter(|&g| g < max_globals)
        .ok_or(RuntimeError::InvalidSlot(idx))?;
    if globals.len() <= g {
        globals.resize(g + 1, Slot::default());
    }
    Ok(&mut globals[g])
}

/// Trait for variable slot access (both address spaces)
pub trait VariableOps {
    fn declare(
        &mut self,
        frame: &mut CallFrame,
        idx: u64,
        datatype: u8,
        is_array: bool,
    ) -> Result<(), RuntimeError>;

    fn read(&mut self, frame: &mut CallFrame, idx: u64) -> Result<i64, RuntimeError>;
    fn write(&mut self, frame: &mut CallFrame, idx: u64, value: i64) -> Result<(), RuntimeError>;
    fn type_of(&mut self, frame: &mut CallFrame, idx: u64) -> Result<u8, RuntimeError>;
    fn is_array(&mut self, frame: &mut CallFrame, idx: u64) -> Result<bool, RuntimeError>;

    fn read_indexed(
        &mut self,
        frame: &mut CallFrame,
        idx: u64,
        offset: i64,
    ) -> Result<i64, RuntimeError>;

    fn write_indexed(
        &mut self,
        frame: &mut CallFrame,
        idx: u64,
        offset: i64,
        value: i64,
    ) -> Result<(), RuntimeError>;

    fn test_bit(&mut self, frame: &mut CallFrame, idx: u64, bit: i64) -> Result<bool, RuntimeError>;

    /// LOAD_INDEXED: element read for arrays, bit test for scalars.
    fn load_indexed(
        &mut self,
        frame: &mut CallFrame,
        idx: u64,
        index: i64,
    ) -> Result<i64, RuntimeError>;
}

impl super::vm::VM {
    fn slot(&mut self, frame: &mut CallFrame, idx: u64) -> Result<(Slot, SlotTag), RuntimeError> {
        let slot = *locate(&mut self.globals, self.config.max_globals, frame, idx)?;
        let tag = slot.tag.ok_or(RuntimeError::UndeclaredVariable(idx))?;
        Ok((slot, tag))
    }

    /// Address of element `index`. The region id of the base is kept; an
    /// index that would move the offset out of range is out of bounds.
    fn element_address(slot: Slot, tag: SlotTag, index: i64) -> Result<Address, RuntimeError> {
        let base = Address::from_raw(slot.value);
        let size = tag.element_size();
        index
            .checked_mul(size)
            .and_then(|delta| base.checked_offset_by(delta))
            .ok_or(RuntimeError::Memory(MemoryError::OutOfBounds {
                address: base,
                len: size as usize,
            }))
    }
}

impl VariableOps for super::vm::VM {
    fn declare(
        &mut self,
        frame: &mut CallFrame,
        idx: u64,
        datatype: u8,
        is_array: bool,
    ) -> Result<(), RuntimeError> {
        let slot = locate(&mut self.globals, self.config.max_globals, frame, idx)?;
        *slot = Slot::declared(datatype, is_array);
        Ok(())
    }

    fn read(&mut self, frame: &mut CallFrame, idx: u64) -> Result<i64, RuntimeError> {
        Ok(self.slot(frame, idx)?.0.value)
    }

    fn write(&mut self, frame: &mut CallFrame, idx: u64, value: i64) -> Result<(), RuntimeError> {
        let slot = locate(&mut self.globals, self.config.max_globals, frame, idx)?;
        if slot.tag.is_none() {
            return Err(RuntimeError::UndeclaredVariable(idx));
        }
        slot.value = value;
        Ok(())
    }

    fn type_of(&mut self, frame: &mut CallFrame, idx: u64) -> Result<u8, RuntimeError> {
        Ok(self.slot(frame, idx)?.1.datatype())
    }

    fn is_array(&mut self, frame: &mut CallFrame, idx: u64) -> Result<bool, RuntimeError> {
        Ok(self.slot(frame, idx)?.1.is_array())
    }

    fn read_indexed(
        &mut self,
        frame: &mut CallFrame,
        idx: u64,
        offset: i64,
    ) -> Result<i64, RuntimeError> {
        let (slot, tag) = self.slot(frame, idx)?;
        let addr = Self::element_address(slot, tag, offset)?;
        let value = if tag.element_size() == 1 {
            self.memory.read_u8(addr)? as i64
        } else {
            self.memory.read_i64(addr)?
        };
        Ok(value)
    }

    fn write_indexed(
        &mut self,
        frame: &mut CallFrame,
        idx: u64,
        offset: i64,
        value: i64,
    ) -> Result<(), RuntimeError> {
        let (slot, tag) = self.slot(frame, idx)?;
        let addr = Self::element_address(slot, tag, offset)?;
        if tag.element_size() == 1 {
            self.memory.write_u8(addr, value as u8)?;
        } else {
            self.memory.write_i64(addr, value)?;
        }
        Ok(())
    }

    fn test_bit(&mut self, frame: &mut CallFrame, idx: u64, bit: i64) -> Result<bool, RuntimeError> {
        let (slot, _) = self.slot(frame, idx)?;
        // Positions outside the 64-bit word read as clear.
        let set = u32::try_from(bit)
            .ok()
            .and_then(|b| (slot.value as u64).checked_shr(b))
            .map(|v| v & 1 == 1)
            .unwrap_or(false);
        Ok(set)
    }

    fn load_indexed(
        &mut self,
        frame: &mut CallFrame,
        idx: u64,
        index: i64,
    ) -> Result<i64, RuntimeError> {
        if self.is_array(frame, idx)? {
            self.read_indexed(frame, idx, index)
        } else {
            Ok(self.test_bit(frame, idx, index)? as i64)
        }
    }
}
