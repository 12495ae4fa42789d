//! Linear-sweep disassembler for program images.

use crate::error::RuntimeError;
use crate::loader::Image;
use crate::opcode::instruction::{decode_at, Instruction};
use std::fmt::{self, Write};

/// One decoded position in the instruction stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Instruction { offset: usize, instruction: Instruction },
    /// A byte that does not start a valid instruction.
    Data { offset: usize, byte: u8 },
}

impl Line {
    pub fn offset(&self) -> usize {
        match self {
            Line::Instruction { offset, .. } | Line::Data { offset, .. } => *offset,
        }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Line::Instruction { offset, instruction } => write!(f, "{:06x}  {}", offset, instruction),
            Line::Data { offset, byte } => write!(f, "{:06x}  .db {:#04x}", offset, byte),
        }
    }
}

/// Decode from the lowest header offset to the end of the image.
///
/// Embedded data (or garbage) does not stop the sweep: undecodable bytes
/// become [`Line::Data`] one at a time.
pub fn disassemble(image: &Image) -> Vec<Line> {
    let code = image.bytes();
    let start = image.entry_offset().min(image.global_init_offset()) as usize;

    let mut lines = Vec::new();
    let mut offset = start;
    while offset < code.len() {
        match decode_at(code, offset) {
            Ok((instruction, next)) => {
                lines.push(Line::Instruction { offset, instruction });
                offset = next;
            }
            Err(RuntimeError::InvalidOpcode { .. }) | Err(RuntimeError::TruncatedInstruction { .. }) => {
                lines.push(Line::Data {
                    offset,
                    byte: code[offset],
                });
                offset += 1;
            }
            Err(_) => break,
        }
    }
    lines
}

/// Render a full listing, header first.
pub fn render(image: &Image) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "; entry       {:#06x}", image.entry_offset());
    let _ = writeln!(out, "; global_init {:#06x}", image.global_init_offset());
    if let Ok(restart) = image.restart_offset() {
        let _ = writeln!(out, "; restart     {:#06x}", restart);
    }
    for line in disassemble(image) {
        let _ = writeln!(out, "{}", line);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::Assembler;
    use crate::opcode::OpCode;

    #[test]
    fn test_listing_covers_every_instruction() {
        let mut asm = Assembler::new();
        let init = asm.new_label();
        let main = asm.new_label();
        asm.entry(main).global_init(init);
        asm.bind(init).ret();
        asm.bind(main).number(7).invoke_native(0).delete().ret();
        let image = Image::from_bytes(asm.finish().unwrap()).unwrap();

        let lines = disassemble(&image);
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0].offset(), 24);
        assert!(matches!(
            lines[1],
            Line::Instruction {
                instruction: Instruction::Number(7),
                ..
            }
        ));

        let text = render(&image);
        assert!(text.contains("INVOKE_NATIVE"));
        assert!(text.contains("printc"));
    }

    #[test]
    fn test_invalid_bytes_become_data() {
        let mut asm = Assembler::new();
        let main = asm.new_label();
        asm.entry(main).global_init(main);
        asm.bind(main).raw(&[0, 13]).op(OpCode::Return);
        let image = Image::from_bytes(asm.finish().unwrap()).unwrap();

        let lines = disassemble(&image);
        assert_eq!(lines[0], Line::Data { offset: 24, byte: 0 });
        assert_eq!(lines[1], Line::Data { offset: 25, byte: 13 });
        assert_eq!(
            lines[2],
            Line::Instruction {
                offset: 26,
                instruction: Instruction::Simple(OpCode::Return)
            }
        );
        assert!(render(&image).contains(".db 0x0d"));
    }
}
