//! Bytecode assembler.
//!
//! Builds a complete image (header plus instruction stream) from emit calls.
//! Jump and call targets are [`Label`]s; every use is recorded as a fixup and
//! patched once the label is bound, so forward references work.
//!
//! ```
//! use vm::asm::Assembler;
//! use vm::opcode::OpCode;
//! use vm::specs::PRINTC;
//!
//! let mut asm = Assembler::new();
//! let main = asm.new_label();
//! let init = asm.new_label();
//! asm.entry(main).global_init(init);
//!
//! asm.bind(init).ret();
//! asm.bind(main)
//!     .number(2)
//!     .number(3)
//!     .op(OpCode::Add)
//!     .invoke_native(PRINTC)
//!     .delete()
//!     .ret();
//! let image = asm.finish().unwrap();
//! assert_eq!(&image[8..16], &24u64.to_le_bytes());
//! ```

use crate::loader::{
    ENTRY_OFFSET_FIELD, GLOBAL_INIT_OFFSET_FIELD, HEADER_LEN, RESTART_OFFSET_FIELD,
};
use crate::opcode::OpCode;
use crate::slot::Datatype;
use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AsmError {
    #[error("label {0} used but never bound")]
    UndefinedLabel(usize),
    #[error("label {0} bound twice")]
    DuplicateLabel(usize),
    #[error("header field `{0}` not set")]
    MissingHeader(&'static str),
}

/// A position in the instruction stream, possibly not yet known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(usize);

#[derive(Debug)]
pub struct Assembler {
    code: Vec<u8>,
    labels: Vec<Option<u64>>,
    // (position of the u64 operand in `code`, label)
    fixups: Vec<(usize, Label)>,
    entry: Option<Label>,
    global_init: Option<Label>,
    restart: Option<Label>,
    error: Option<AsmError>,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembler {
    pub fn new() -> Self {
        Self {
            code: Vec::new(),
            labels: Vec::new(),
            fixups: Vec::new(),
            entry: None,
            global_init: None,
            restart: None,
            error: None,
        }
    }

    pub fn new_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Image offset of the next emitted byte.
    pub fn here(&self) -> u64 {
        (HEADER_LEN + self.code.len()) as u64
    }

    /// Bind `label` to the current position.
    pub fn bind(&mut self, label: Label) -> &mut Self {
        let here = self.here();
        match self.labels[label.0] {
            Some(_) => {
                self.error.get_or_insert(AsmError::DuplicateLabel(label.0));
            }
            None => self.labels[label.0] = Some(here),
        }
        self
    }

    pub fn entry(&mut self, label: Label) -> &mut Self {
        self.entry = Some(label);
        self
    }

    pub fn global_init(&mut self, label: Label) -> &mut Self {
        self.global_init = Some(label);
        self
    }

    /// Target of no-return chaining. Defaults to the entry point.
    pub fn restart(&mut self, label: Label) -> &mut Self {
        self.restart = Some(label);
        self
    }

    fn emit_u64(&mut self, value: u64) {
        let mut buf = [0u8; 8];
        LittleEndian::write_u64(&mut buf, value);
        self.code.extend_from_slice(&buf);
    }

    fn emit_target(&mut self, op: OpCode, label: Label) -> &mut Self {
        self.code.push(op.as_u8());
        self.fixups.push((self.code.len(), label));
        self.emit_u64(0);
        self
    }

    fn emit_slot(&mut self, op: OpCode, slot: u64) -> &mut Self {
        self.code.push(op.as_u8());
        self.emit_u64(slot);
        self
    }

    fn emit_declaration(
        &mut self,
        op: OpCode,
        slot: u64,
        datatype: Datatype,
        is_array: bool,
    ) -> &mut Self {
        self.code.push(op.as_u8());
        self.emit_u64(slot);
        self.code.push(datatype as u8);
        self.code.push(is_array as u8);
        self
    }

    /// Any opcode without operands.
    pub fn op(&mut self, op: OpCode) -> &mut Self {
        self.code.push(op.as_u8());
        self
    }

    /// Raw bytes, for data or deliberately malformed streams.
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.code.extend_from_slice(bytes);
        self
    }

    pub fn global_reserve(&mut self, slot: u64, datatype: Datatype, is_array: bool) -> &mut Self {
        self.emit_declaration(OpCode::GlobalReserve, slot, datatype, is_array)
    }

    pub fn variable(&mut self, slot: u64, datatype: Datatype, is_array: bool) -> &mut Self {
        self.emit_declaration(OpCode::Variable, slot, datatype, is_array)
    }

    pub fn assign(&mut self, slot: u64) -> &mut Self {
        self.emit_slot(OpCode::Assign, slot)
    }

    pub fn assign_indexed(&mut self, slot: u64) -> &mut Self {
        self.emit_slot(OpCode::AssignIndexed, slot)
    }

    pub fn load(&mut self, slot: u64) -> &mut Self {
        self.emit_slot(OpCode::Load, slot)
    }

    pub fn load_indexed(&mut self, slot: u64) -> &mut Self {
        self.emit_slot(OpCode::LoadIndexed, slot)
    }

    pub fn increase(&mut self, slot: u64) -> &mut Self {
        self.emit_slot(OpCode::Increase, slot)
    }

    pub fn decrease(&mut self, slot: u64) -> &mut Self {
        self.emit_slot(OpCode::Decrease, slot)
    }

    pub fn number(&mut self, value: i64) -> &mut Self {
        self.emit_slot(OpCode::Number, value as u64)
    }

    /// Inline string; a NUL terminator is appended.
    pub fn string(&mut self, bytes: &[u8]) -> &mut Self {
        self.code.push(OpCode::String.as_u8());
        self.emit_u64(bytes.len() as u64);
        self.code.extend_from_slice(bytes);
        self.code.push(0);
        self
    }

    pub fn goto(&mut self, label: Label) -> &mut Self {
        self.emit_target(OpCode::Goto, label)
    }

    pub fn goto_true(&mut self, label: Label) -> &mut Self {
        self.emit_target(OpCode::GotoTrue, label)
    }

    pub fn goto_false(&mut self, label: Label) -> &mut Self {
        self.emit_target(OpCode::GotoFalse, label)
    }

    pub fn invoke(&mut self, label: Label) -> &mut Self {
        self.emit_target(OpCode::Invoke, label)
    }

    pub fn invoke_native(&mut self, id: u64) -> &mut Self {
        self.emit_slot(OpCode::InvokeNative, id)
    }

    /// Push the image offset of `label`, e.g. as a `callN` target.
    pub fn address_of(&mut self, label: Label) -> &mut Self {
        self.emit_target(OpCode::Number, label)
    }

    pub fn ret(&mut self) -> &mut Self {
        self.op(OpCode::Return)
    }

    pub fn no_return(&mut self) -> &mut Self {
        self.op(OpCode::NoReturn)
    }

    pub fn delete(&mut self) -> &mut Self {
        self.op(OpCode::Delete)
    }

    fn resolve(&self, label: Label) -> Result<u64, AsmError> {
        self.labels[label.0].ok_or(AsmError::UndefinedLabel(label.0))
    }

    /// Patch every fixup and prepend the header.
    pub fn finish(&self) -> Result<Vec<u8>, AsmError> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }

        let entry = self.resolve(self.entry.ok_or(AsmError::MissingHeader("entry"))?)?;
        let global_init = self.resolve(
            self.global_init
                .ok_or(AsmError::MissingHeader("global_init"))?,
        )?;
        let restart = match self.restart {
            Some(label) => self.resolve(label)?,
            None => entry,
        };

        let mut image = vec![0u8; HEADER_LEN];
        LittleEndian::write_u64(&mut image[ENTRY_OFFSET_FIELD..], entry);
        LittleEndian::write_u64(&mut image[GLOBAL_INIT_OFFSET_FIELD..], global_init);
        LittleEndian::write_u64(&mut image[RESTART_OFFSET_FIELD..], restart);
        image.extend_from_slice(&self.code);

        for &(pos, label) in &self.fixups {
            let target = self.resolve(label)?;
            let at = HEADER_LEN + pos;
            LittleEndian::write_u64(&mut image[at..at + 8], target);
        }
        Ok(image)
    }
}
