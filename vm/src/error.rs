use memory::MemoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("value stack overflow")]
    StackOverflow,
    #[error("value stack underflow")]
    StackUnderflow,
    #[error("invalid opcode {opcode:#04x} at offset {offset:#x}")]
    InvalidOpcode { opcode: u8, offset: usize },
    #[error("instruction at offset {offset:#x} runs past the end of the image")]
    TruncatedInstruction { offset: usize },
    #[error("unknown native function id {0}")]
    UnknownNativeId(u64),
    #[error("division by zero")]
    DivisionByZero,
    #[error("variable slot {0} used before declaration")]
    UndeclaredVariable(u64),
    #[error("variable slot {0} is outside the global pool limit")]
    InvalidSlot(u64),
    #[error("call depth limit of {0} exceeded")]
    CallDepthExceeded(usize),
    #[error("native function {id} failed: {reason}")]
    NativeFailed { id: u64, reason: String },
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
