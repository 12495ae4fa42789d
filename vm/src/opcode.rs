//! OpCode definitions for the flvm bytecode
//!
//! Every instruction is one opcode byte followed by a fixed, opcode-specific
//! operand layout. Multi-byte operands are 8 bytes, little-endian.
//!
//! Layouts:
//!   none              [op]
//!   slot              [op][idx:u64]
//!   declaration       [op][idx:u64][datatype:u8][is_array:u8]
//!   immediate/target  [op][value:u64]
//!   string            [op][len:u64][bytes: len][0]

use std::fmt;

/// Virtual machine instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    // ===== Variables =====
    /// Declare slot: Slot[idx].tag = (datatype, is_array) (global pool)
    GlobalReserve = 1,
    /// Slot[idx] = pop()
    Assign = 2,
    /// value = pop(); index = pop(); Slot[idx][index] = value
    AssignIndexed = 3,
    /// push(Slot[idx])
    Load = 4,
    /// index = pop(); push(Slot[idx][index]) or bit test on scalars
    LoadIndexed = 5,

    // ===== Constants =====
    /// push(value)
    Number = 6,
    /// push(address of inline bytes)
    String = 7,

    // ===== Flow Control =====
    /// pc = target
    Goto = 8,
    /// if pop() != 0 { pc = target }
    GotoTrue = 9,
    /// if pop() == 0 { pc = target }
    GotoFalse = 10,
    /// Nested invocation at target
    Invoke = 11,
    /// Call native function by id
    InvokeNative = 12,
    /// End the current invocation
    Return = 14,

    /// Declare slot in the current frame
    Variable = 15,
    /// Slot[idx] += 1
    Increase = 16,
    /// Slot[idx] -= 1
    Decrease = 17,

    // ===== Arithmetic (pop b, pop a, push a op b) =====
    Add = 18,
    Sub = 19,
    Mul = 20,
    Div = 21,
    Mod = 22,

    // ===== Comparison (push 1 / 0) =====
    Less = 23,
    LessEquals = 24,
    More = 25,
    MoreEquals = 26,
    Equals = 27,
    NotEquals = 28,

    // ===== Bitwise =====
    Or = 29,
    And = 30,
    Xor = 31,
    ShiftLeft = 32,
    ShiftRight = 33,
    /// Logical not: push(pop() == 0)
    Invert = 34,
    /// Bitwise not: push(!pop())
    Not = 35,

    // ===== Special =====
    /// Chain into the restart address when this frame returns
    NoReturn = 99,
    /// Discard the top of the stack
    Delete = 100,
}

impl OpCode {
    /// Get opcode from byte value
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(OpCode::GlobalReserve),
            2 => Some(OpCode::Assign),
            3 => Some(OpCode::AssignIndexed),
            4 => Some(OpCode::Load),
            5 => Some(OpCode::LoadIndexed),
            6 => Some(OpCode::Number),
            7 => Some(OpCode::String),
            8 => Some(OpCode::Goto),
            9 => Some(OpCode::GotoTrue),
            10 => Some(OpCode::GotoFalse),
            11 => Some(OpCode::Invoke),
            12 => Some(OpCode::InvokeNative),
            14 => Some(OpCode::Return),
            15 => Some(OpCode::Variable),
            16 => Some(OpCode::Increase),
            17 => Some(OpCode::Decrease),
            18 => Some(OpCode::Add),
            19 => Some(OpCode::Sub),
            20 => Some(OpCode::Mul),
            21 => Some(OpCode::Div),
            22 => Some(OpCode::Mod),
            23 => Some(OpCode::Less),
            24 => Some(OpCode::LessEquals),
            25 => Some(OpCode::More),
            26 => Some(OpCode::MoreEquals),
            27 => Some(OpCode::Equals),
            28 => Some(OpCode::NotEquals),
            29 => Some(OpCode::Or),
            30 => Some(OpCode::And),
            31 => Some(OpCode::Xor),
            32 => Some(OpCode::ShiftLeft),
            33 => Some(OpCode::ShiftRight),
            34 => Some(OpCode::Invert),
            35 => Some(OpCode::Not),
            99 => Some(OpCode::NoReturn),
            100 => Some(OpCode::Delete),
            _ => None,
        }
    }

    /// Convert opcode to byte value
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Get human-readable name
    pub fn name(self) -> &'static str {
        match self {
            OpCode::GlobalReserve => "GLOBAL_RESERVE",
            OpCode::Assign => "ASSIGN",
            OpCode::AssignIndexed => "ASSIGN_INDEXED",
            OpCode::Load => "LOAD",
            OpCode::LoadIndexed => "LOAD_INDEXED",
            OpCode::Number => "NUMBER",
            OpCode::String => "STRING",
            OpCode::Goto => "GOTO",
            OpCode::GotoTrue => "GOTO_TRUE",
            OpCode::GotoFalse => "GOTO_FALSE",
            OpCode::Invoke => "INVOKE",
            OpCode::InvokeNative => "INVOKE_NATIVE",
            OpCode::Return => "RETURN",
            OpCode::Variable => "VARIABLE",
            OpCode::Increase => "INCREASE",
            OpCode::Decrease => "DECREASE",
            OpCode::Add => "ADD",
            OpCode::Sub => "SUB",
            OpCode::Mul => "MUL",
            OpCode::Div => "DIV",
            OpCode::Mod => "MOD",
            OpCode::Less => "LESS",
            OpCode::LessEquals => "LESS_EQUALS",
            OpCode::More => "MORE",
            OpCode::MoreEquals => "MORE_EQUALS",
            OpCode::Equals => "EQUALS",
            OpCode::NotEquals => "NOT_EQUALS",
            OpCode::Or => "OR",
            OpCode::And => "AND",
            OpCode::Xor => "XOR",
            OpCode::ShiftLeft => "SHIFT_LEFT",
            OpCode::ShiftRight => "SHIFT_RIGHT",
            OpCode::Invert => "INVERT",
            OpCode::Not => "NOT",
            OpCode::NoReturn => "NORETURN",
            OpCode::Delete => "DELETE",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Instruction decoding
pub mod instruction {
    use super::OpCode;
    use crate::error::RuntimeError;
    use crate::specs;
    use byteorder::{LittleEndian, ReadBytesExt};
    use std::fmt;
    use std::io::Cursor;

    /// A decoded instruction. Zero-operand opcodes share the `Simple` form.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Instruction {
        GlobalReserve { slot: u64, datatype: u8, is_array: bool },
        Variable { slot: u64, datatype: u8, is_array: bool },
        Assign(u64),
        AssignIndexed(u64),
        Load(u64),
        LoadIndexed(u64),
        Increase(u64),
        Decrease(u64),
        Number(i64),
        /// `data` is the image offset of the first inline byte.
        String { len: u64, data: usize },
        Goto(u64),
        GotoTrue(u64),
        GotoFalse(u64),
        Invoke(u64),
        InvokeNative(u64),
        Simple(OpCode),
    }

    impl Instruction {
        pub fn opcode(&self) -> OpCode {
            match self {
                Instruction::GlobalReserve { .. } => OpCode::GlobalReserve,
                Instruction::Variable { .. } => OpCode::Variable,
                Instruction::Assign(_) => OpCode::Assign,
                Instruction::AssignIndexed(_) => OpCode::AssignIndexed,
                Instruction::Load(_) => OpCode::Load,
                Instruction::LoadIndexed(_) => OpCode::LoadIndexed,
                Instruction::Increase(_) => OpCode::Increase,
                Instruction::Decrease(_) => OpCode::Decrease,
                Instruction::Number(_) => OpCode::Number,
                Instruction::String { .. } => OpCode::String,
                Instruction::Goto(_) => OpCode::Goto,
                Instruction::GotoTrue(_) => OpCode::GotoTrue,
                Instruction::GotoFalse(_) => OpCode::GotoFalse,
                Instruction::Invoke(_) => OpCode::Invoke,
                Instruction::InvokeNative(_) => OpCode::InvokeNative,
                Instruction::Simple(op) => *op,
            }
        }
    }

    /// Decode the instruction at `offset`. Returns it together with the
    /// offset of the following instruction.
    pub fn decode_at(code: &[u8], offset: usize) -> Result<(Instruction, usize), RuntimeError> {
        let truncated = |_| RuntimeError::TruncatedInstruction { offset };

        if offset >= code.len() {
            return Err(RuntimeError::TruncatedInstruction { offset });
        }
        let mut cursor = Cursor::new(code);
        cursor.set_position(offset as u64);

        let op_byte = cursor.read_u8().map_err(truncated)?;
        let op = OpCode::from_u8(op_byte).ok_or(RuntimeError::InvalidOpcode {
            opcode: op_byte,
            offset,
        })?;

        let ins = match op {
            OpCode::GlobalReserve | OpCode::Variable => {
                let slot = cursor.read_u64::<LittleEndian>().map_err(truncated)?;
                let datatype = cursor.read_u8().map_err(truncated)?;
                let is_array = cursor.read_u8().map_err(truncated)? != 0;
                if op == OpCode::GlobalReserve {
                    Instruction::GlobalReserve { slot, datatype, is_array }
                } else {
                    Instruction::Variable { slot, datatype, is_array }
                }
            }
            OpCode::Assign
            | OpCode::AssignIndexed
            | OpCode::Load
            | OpCode::LoadIndexed
            | OpCode::Increase
            | OpCode::Decrease => {
                let slot = cursor.read_u64::<LittleEndian>().map_err(truncated)?;
                match op {
                    OpCode::Assign => Instruction::Assign(slot),
                    OpCode::AssignIndexed => Instruction::AssignIndexed(slot),
                    OpCode::Load => Instruction::Load(slot),
                    OpCode::LoadIndexed => Instruction::LoadIndexed(slot),
                    OpCode::Increase => Instruction::Increase(slot),
                    _ => Instruction::Decrease(slot),
                }
            }
            OpCode::Number => Instruction::Number(cursor.read_i64::<LittleEndian>().map_err(truncated)?),
            OpCode::String => {
                let len = cursor.read_u64::<LittleEndian>().map_err(truncated)?;
                let data = cursor.position() as usize;
                // Inline bytes plus the NUL terminator must fit.
                let end = (data as u64)
                    .checked_add(len)
                    .and_then(|e| e.checked_add(1))
                    .filter(|&e| e <= code.len() as u64)
                    .ok_or(RuntimeError::TruncatedInstruction { offset })?;
                cursor.set_position(end);
                Instruction::String { len, data }
            }
            OpCode::Goto
            | OpCode::GotoTrue
            | OpCode::GotoFalse
            | OpCode::Invoke
            | OpCode::InvokeNative => {
                let operand = cursor.read_u64::<LittleEndian>().map_err(truncated)?;
                match op {
                    OpCode::Goto => Instruction::Goto(operand),
                    OpCode::GotoTrue => Instruction::GotoTrue(operand),
                    OpCode::GotoFalse => Instruction::GotoFalse(operand),
                    OpCode::Invoke => Instruction::Invoke(operand),
                    _ => Instruction::InvokeNative(operand),
                }
            }
            _ => Instruction::Simple(op),
        };

        Ok((ins, cursor.position() as usize))
    }

    impl fmt::Display for Instruction {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let name = self.opcode().name();
            match self {
                Instruction::GlobalReserve { slot, datatype, is_array }
                | Instruction::Variable { slot, datatype, is_array } => {
                    let shape = if *is_array { "array" } else { "scalar" };
                    match crate::slot::Datatype::from_u8(*datatype) {
                        Some(dt) => write!(f, "{:<14} {} {} {}", name, slot, dt, shape),
                        None => write!(f, "{:<14} {} type#{} {}", name, slot, datatype, shape),
                    }
                }
                Instruction::Assign(slot)
                | Instruction::AssignIndexed(slot)
                | Instruction::Load(slot)
                | Instruction::LoadIndexed(slot)
                | Instruction::Increase(slot)
                | Instruction::Decrease(slot) => write!(f, "{:<14} {}", name, slot),
                Instruction::Number(n) => write!(f, "{:<14} {}", name, n),
                Instruction::String { len, data } => {
                    write!(f, "{:<14} len={} @{:#x}", name, len, data)
                }
                Instruction::Goto(t)
                | Instruction::GotoTrue(t)
                | Instruction::GotoFalse(t)
                | Instruction::Invoke(t) => write!(f, "{:<14} {:#06x}", name, t),
                Instruction::InvokeNative(id) => match specs::native_meta(*id) {
                    Some(meta) => write!(f, "{:<14} {} ; {}/{}", name, id, meta.name, meta.arity),
                    None => write!(f, "{:<14} {}", name, id),
                },
                Instruction::Simple(_) => write!(f, "{}", name),
            }
        }
    }
}
