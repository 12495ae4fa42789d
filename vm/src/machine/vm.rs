use crate::config::VmConfig;
use crate::error::RuntimeError;
use crate::loader::Image;
use crate::native::NativeRegistry;
use crate::opcode::instruction::{decode_at, Instruction};
use crate::opcode::OpCode;
use crate::slot::{Slot, LOCAL_SLOTS};
use crate::stdlib::file::FileTable;
use memory::Memory;
use std::io::Write;
use tracing::{debug, trace};

use super::arithmetic::ArithmeticOps;
use super::control::ControlFlowOps;
use super::frame::CallFrame;
use super::stack::ValueStack;
use super::variables::VariableOps;

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// RETURN unwound the frame normally.
    Returned,
    /// The `exit` native halted the machine with this status.
    Exited(i32),
}

/// How a single frame ended; consumed by the invocation driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameExit {
    Return,
    /// No-return chaining: run a fresh frame at this offset.
    Chain(u64),
    Exit(i32),
}

/// The Virtual Machine struct
///
/// Everything a running program can mutate lives here, so independent
/// instances never share state apart from the read-only image.
pub struct VM {
    pub image: Image,
    pub stack: ValueStack,
    pub globals: Vec<Slot>,
    pub memory: Memory,
    pub natives: NativeRegistry,
    pub files: FileTable,
    pub config: VmConfig,

    /// Sink for `printc`.
    pub output: Box<dyn Write>,

    /// Set by the `exit` native; checked after every native call.
    pub exit_code: Option<i32>,

    depth: usize,
}

impl VM {
    /// Create a new VM instance with the built-in natives only.
    pub fn new(image: Image) -> Self {
        Self::with_config(image, VmConfig::default())
    }

    pub fn with_config(image: Image, config: VmConfig) -> Self {
        Self::with_registry(image, config, NativeRegistry::with_builtins())
    }

    pub fn with_registry(image: Image, config: VmConfig, natives: NativeRegistry) -> Self {
        let memory = Memory::with_limit(image.shared(), config.max_allocation);
        Self {
            stack: ValueStack::new(config.stack_capacity),
            globals: Vec::with_capacity(64),
            memory,
            natives,
            files: FileTable::new(),
            output: Box::new(std::io::stdout()),
            exit_code: None,
            depth: 0,
            image,
            config,
        }
    }

    pub fn set_output(&mut self, output: Box<dyn Write>) {
        self.output = output;
    }

    /// Current nesting of invocations (0 when idle).
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Bootstrap sequence: run the global initializer, then push
    /// `argc`/`argv` and run the entry point.
    pub fn run<A: AsRef<[u8]>>(&mut self, args: &[A]) -> Result<Completion, RuntimeError> {
        let init = self.image.global_init_offset();
        debug!(offset = init, "running global initializer");
        if let Completion::Exited(code) = self.invoke(init)? {
            return Ok(Completion::Exited(code));
        }

        self.push_arguments(args)?;

        let entry = self.image.entry_offset();
        debug!(offset = entry, argc = args.len(), "invoking entry point");
        let completion = self.invoke(entry);
        self.output.flush()?;
        completion
    }

    /// Copy each argument into VM memory as a NUL-terminated string, build
    /// an array of their addresses and push `argc` then `argv`.
    pub fn push_arguments<A: AsRef<[u8]>>(&mut self, args: &[A]) -> Result<(), RuntimeError> {
        let argv = self.memory.allocate(args.len() as i64 * 8)?;
        for (i, arg) in args.iter().enumerate() {
            let bytes = arg.as_ref();
            let s = self.memory.allocate(bytes.len() as i64 + 1)?;
            self.memory.write_bytes(s, bytes)?;
            self.memory.write_i64(argv.offset_by(i as i64 * 8), s.to_raw())?;
        }
        self.stack.push(args.len() as i64)?;
        self.stack.push(argv.to_raw())
    }

    /// Execute a nested invocation starting at `location`.
    ///
    /// Shares the stack, globals, memory and natives with the caller but
    /// gets a fresh frame. No-return chains are followed in a loop here, so
    /// they do not grow the host stack.
    pub fn invoke(&mut self, location: u64) -> Result<Completion, RuntimeError> {
        if self.depth >= self.config.max_call_depth {
            return Err(RuntimeError::CallDepthExceeded(self.config.max_call_depth));
        }
        if self.depth == 0 {
            self.exit_code = None;
        }

        self.depth += 1;
        let result = self.trampoline(location);
        self.depth -= 1;
        result
    }

    fn trampoline(&mut self, mut location: u64) -> Result<Completion, RuntimeError> {
        loop {
            match self.run_frame(location)? {
                FrameExit::Return => return Ok(Completion::Returned),
                FrameExit::Exit(code) => return Ok(Completion::Exited(code)),
                FrameExit::Chain(next) => {
                    trace!(from = location, to = next, "no-return chain");
                    location = next;
                }
            }
        }
    }

    /// Main interpretation loop for one frame
    fn run_frame(&mut self, location: u64) -> Result<FrameExit, RuntimeError> {
        let mut frame = CallFrame::new(location as usize);

        loop {
            let offset = frame.pc;
            let (instruction, next) = decode_at(self.image.bytes(), offset)?;
            frame.pc = next;
            trace!(offset, %instruction, depth = self.depth);

            if let Some(exit) = self.execute(&mut frame, instruction)? {
                return Ok(exit);
            }
        }
    }

    fn execute(
        &mut self,
        frame: &mut CallFrame,
        instruction: Instruction,
    ) -> Result<Option<FrameExit>, RuntimeError> {
        match instruction {
            // Variables (delegated to variables.rs)
            Instruction::GlobalReserve {
                slot,
                datatype,
                is_array,
            } => {
                if slot < LOCAL_SLOTS as u64 {
                    return Err(RuntimeError::InvalidSlot(slot));
                }
                self.declare(frame, slot, datatype, is_array)?;
            }

            Instruction::Variable {
                slot,
                datatype,
                is_array,
            } => {
                self.declare(frame, slot, datatype, is_array)?;
            }

            Instruction::Assign(slot) => {
                let value = self.stack.pop()?;
                self.write(frame, slot, value)?;
            }

            Instruction::AssignIndexed(slot) => {
                let value = self.stack.pop()?;
                let index = self.stack.pop()?;
                self.write_indexed(frame, slot, index, value)?;
            }

            Instruction::Load(slot) => {
                let value = self.read(frame, slot)?;
                self.stack.push(value)?;
            }

            Instruction::LoadIndexed(slot) => {
                let index = self.stack.pop()?;
                let value = self.load_indexed(frame, slot, index)?;
                self.stack.push(value)?;
            }

            Instruction::Increase(slot) => {
                let value = self.read(frame, slot)?;
                self.write(frame, slot, value.wrapping_add(1))?;
            }

            Instruction::Decrease(slot) => {
                let value = self.read(frame, slot)?;
                self.write(frame, slot, value.wrapping_sub(1))?;
            }

            // Constants
            Instruction::Number(value) => {
                self.stack.push(value)?;
            }

            Instruction::String { data, .. } => {
                let addr = self.memory.image_address(data)?;
                self.stack.push(addr.to_raw())?;
            }

            Instruction::Simple(OpCode::Delete) => {
                self.stack.pop()?;
            }

            // Control Flow (delegated to control.rs)
            Instruction::Goto(_)
            | Instruction::GotoTrue(_)
            | Instruction::GotoFalse(_)
            | Instruction::Invoke(_)
            | Instruction::InvokeNative(_)
            | Instruction::Simple(OpCode::Return)
            | Instruction::Simple(OpCode::NoReturn) => {
                return self.handle_control(frame, instruction);
            }

            // Arithmetic, comparison and bitwise (delegated to arithmetic.rs)
            Instruction::Simple(op) => {
                self.handle_arithmetic(op)?;
            }
        }

        Ok(None)
    }
}
