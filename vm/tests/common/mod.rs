#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use vm::asm::Assembler;
use vm::{Completion, Image, NativeRegistry, RuntimeError, VmConfig, VM};

/// Output sink that stays readable after the VM takes ownership of a clone.
#[derive(Clone, Default)]
pub struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> Vec<u8> {
        self.0.borrow().clone()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Assemble an image whose global initializer just returns and whose entry
/// point is whatever `body` emits.
pub fn image(body: impl FnOnce(&mut Assembler)) -> Image {
    let mut asm = Assembler::new();
    let init = asm.new_label();
    let main = asm.new_label();
    asm.entry(main).global_init(init);
    asm.bind(init).ret();
    asm.bind(main);
    body(&mut asm);
    Image::from_bytes(asm.finish().expect("assembly failed")).expect("image too short")
}

pub struct Run {
    pub vm: VM,
    pub result: Result<Completion, RuntimeError>,
    pub output: SharedBuf,
}

impl Run {
    pub fn stack(&self) -> &[i64] {
        self.vm.stack.as_slice()
    }

    pub fn output(&self) -> Vec<u8> {
        self.output.contents()
    }
}

/// Run the initializer and then the entry point, without program arguments.
pub fn exec_with(image: Image, config: VmConfig, natives: NativeRegistry) -> Run {
    let output = SharedBuf::default();
    let mut vm = VM::with_registry(image, config, natives);
    vm.set_output(Box::new(output.clone()));

    let init = vm.image.global_init_offset();
    let entry = vm.image.entry_offset();
    let result = vm.invoke(init).and_then(|c| match c {
        Completion::Returned => vm.invoke(entry),
        exited => Ok(exited),
    });
    Run { vm, result, output }
}

pub fn exec(image: Image) -> Run {
    exec_with(image, VmConfig::default(), NativeRegistry::with_builtins())
}

pub fn exec_config(image: Image, config: VmConfig) -> Run {
    exec_with(image, config, NativeRegistry::with_builtins())
}

pub fn run(body: impl FnOnce(&mut Assembler)) -> Run {
    exec(image(body))
}
