//! Machine module - VM implementation
//!
//! The interpreter is split into focused submodules, each adding one group
//! of instruction handlers to `VM` through an `*Ops` trait.

mod arithmetic;
mod control;
mod frame;
mod native;
mod stack;
mod variables;
mod vm;

// Public API
pub use frame::CallFrame;
pub use native::NativeOps;
pub use stack::ValueStack;
pub use variables::VariableOps;
pub use vm::{Completion, VM};
