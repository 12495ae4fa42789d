use crate::error::RuntimeError;
use crate::opcode::OpCode;

/// Trait for arithmetic, comparison and bitwise instruction handlers
pub trait ArithmeticOps {
    fn handle_arithmetic(&mut self, op: OpCode) -> Result<(), RuntimeError>;
}

impl ArithmeticOps for super::vm::VM {
    fn handle_arithmetic(&mut self, op: OpCode) -> Result<(), RuntimeError> {
        // Unary forms
        match op {
            OpCode::Invert => {
                let a = self.stack.pop()?;
                return self.stack.push((a == 0) as i64);
            }
            OpCode::Not => {
                let a = self.stack.pop()?;
                return self.stack.push(!a);
            }
            _ => {}
        }

        // Right-hand operand is on top.
        let b = self.stack.pop()?;
        let a = self.stack.pop()?;

        let result = match op {
            OpCode::Add => a.wrapping_add(b),
            OpCode::Sub => a.wrapping_sub(b),
            OpCode::Mul => a.wrapping_mul(b),
            OpCode::Div => {
                if b == 0 {
                    return Err(RuntimeError::DivisionByZero);
                }
                a.wrapping_div(b)
            }
            OpCode::Mod => {
                if b == 0 {
                    return Err(RuntimeError::DivisionByZero);
                }
                a.wrapping_rem(b)
            }

            OpCode::Less => (a < b) as i64,
            OpCode::LessEquals => (a <= b) as i64,
            OpCode::More => (a > b) as i64,
            OpCode::MoreEquals => (a >= b) as i64,
            OpCode::Equals => (a == b) as i64,
            OpCode::NotEquals => (a != b) as i64,

            OpCode::Or => a | b,
            OpCode::And => a & b,
            OpCode::Xor => a ^ b,
            // Shift counts are taken modulo 64.
            OpCode::ShiftLeft => a.wrapping_shl(b as u32),
            OpCode::ShiftRight => a.wrapping_shr(b as u32),

            _ => unreachable!("{} is not an arithmetic opcode", op),
        };

        self.stack.push(result)
    }
}
