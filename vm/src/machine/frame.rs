use crate::slot::{Slot, LOCAL_SLOTS};

/// State owned by one invocation.
///
/// Each frame tracks:
/// - `pc`: byte offset of the next instruction in the image
/// - `locals`: slots `0..LOCAL_SLOTS`, all undeclared on entry
/// - `no_return`: set by NORETURN; RETURN then chains to the restart address
#[derive(Debug, Clone)]
pub struct CallFrame {
    pub pc: usize,
    pub no_return: bool,
    pub locals: Box<[Slot]>,
}

impl CallFrame {
    pub fn new(pc: usize) -> Self {
        Self {
            pc,
            no_return: false,
            locals: vec![Slot::default(); LOCAL_SLOTS].into_boxed_slice(),
        }
    }
}
