use crate::error::RuntimeError;
use crate::opcode::instruction::Instruction;
use crate::opcode::OpCode;

use super::frame::CallFrame;
use super::native::NativeOps;
use super::vm::{Completion, FrameExit};

/// Trait for control flow instruction handlers
pub trait ControlFlowOps {
    /// Returns `Some` when the current frame must stop executing.
    fn handle_control(
        &mut self,
        frame: &mut CallFrame,
        instruction: Instruction,
    ) -> Result<Option<FrameExit>, RuntimeError>;
}

impl ControlFlowOps for super::vm::VM {
    fn handle_control(
        &mut self,
        frame: &mut CallFrame,
        instruction: Instruction,
    ) -> Result<Option<FrameExit>, RuntimeError> {
        match instruction {
            Instruction::Goto(target) => {
                frame.pc = target as usize;
            }

            Instruction::GotoTrue(target) => {
                if self.stack.pop()? != 0 {
                    frame.pc = target as usize;
                }
            }

            Instruction::GotoFalse(target) => {
                if self.stack.pop()? == 0 {
                    frame.pc = target as usize;
                }
            }

            Instruction::Invoke(target) => {
                if let Completion::Exited(code) = self.invoke(target)? {
                    return Ok(Some(FrameExit::Exit(code)));
                }
            }

            Instruction::InvokeNative(id) => {
                self.call_native(id)?;
                if let Some(code) = self.exit_code {
                    return Ok(Some(FrameExit::Exit(code)));
                }
            }

            Instruction::Simple(OpCode::NoReturn) => {
                frame.no_return = true;
            }

            Instruction::Simple(OpCode::Return) => {
                if frame.no_return {
                    let next = self.image.restart_offset()?;
                    return Ok(Some(FrameExit::Chain(next)));
                }
                return Ok(Some(FrameExit::Return));
            }

            _ => unreachable!(),
        }

        Ok(None)
    }
}
