pub mod asm;
pub mod config;
pub mod disasm;
pub mod error;
pub mod extension;
pub mod loader;
pub mod machine;
pub mod native;
pub mod opcode;
pub mod slot;
pub mod specs;
pub mod stdlib;

pub use config::{ConfigError, VmConfig};
pub use error::RuntimeError;
pub use extension::{load_extensions, DylibExtension, Extension, ExtensionError};
pub use loader::{Image, LoaderError};
pub use machine::{CallFrame, Completion, ValueStack, VM};
pub use native::{NativeFn, NativeObj, NativeRegistry};
pub use opcode::instruction::Instruction;
pub use opcode::OpCode;
pub use slot::Datatype;
