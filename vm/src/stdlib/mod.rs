//! Built-in native functions.
//!
//! Calling convention: arguments are pushed left to right, so each native
//! pops them in reverse. Every native leaves exactly one result on the
//! stack, except `exit` (halts) and `call0..call4` (the callee's RETURN
//! leaves the result).

pub mod call;
pub mod core;
pub mod file;
