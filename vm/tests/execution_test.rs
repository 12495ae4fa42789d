mod common;

use common::{exec, image, run};
use vm::opcode::OpCode;
use memory::MemoryError;
use vm::specs::{ALLOCATE, PRINTC};
use vm::{Completion, Datatype, RuntimeError, VM};

#[test]
fn test_add_and_print() {
    let r = run(|asm| {
        asm.number(2)
            .number(3)
            .op(OpCode::Add)
            .invoke_native(PRINTC)
            .delete()
            .ret();
    });
    assert_eq!(*r.result.as_ref().unwrap(), Completion::Returned);
    assert_eq!(r.output(), vec![5]);
    assert!(r.stack().is_empty());
}

#[test]
fn test_load_increase_load() {
    let r = run(|asm| {
        asm.variable(0, Datatype::Int, false)
            .number(5)
            .assign(0)
            .load(0)
            .increase(0)
            .load(0)
            .ret();
    });
    r.result.as_ref().unwrap();
    // Bottom to top: 5 then 6.
    assert_eq!(r.stack(), &[5, 6]);
}

#[test]
fn test_decrease() {
    let r = run(|asm| {
        asm.variable(7, Datatype::Int, false)
            .number(i64::MIN)
            .assign(7)
            .decrease(7)
            .load(7)
            .ret();
    });
    r.result.as_ref().unwrap();
    assert_eq!(r.stack(), &[i64::MAX]);
}

#[test]
fn test_global_pool_never_shrinks() {
    let r = run(|asm| {
        asm.global_reserve(256 + 10, Datatype::Int, false)
            .number(42)
            .assign(256 + 10)
            .global_reserve(256 + 2, Datatype::Int, false)
            .number(7)
            .assign(256 + 2)
            .load(256 + 10)
            .load(256 + 2)
            .ret();
    });
    r.result.as_ref().unwrap();
    assert_eq!(r.stack(), &[42, 7]);
    assert_eq!(r.vm.globals.len(), 11);
}

#[test]
fn test_globals_survive_invocations() {
    let r = run(|asm| {
        let set = asm.new_label();
        asm.global_reserve(300, Datatype::Int, false)
            .invoke(set)
            .load(300)
            .ret();
        asm.bind(set).number(99).assign(300).ret();
    });
    r.result.as_ref().unwrap();
    assert_eq!(r.stack(), &[99]);
}

#[test]
fn test_locals_are_per_invocation() {
    let r = run(|asm| {
        let callee = asm.new_label();
        asm.variable(0, Datatype::Int, false)
            .number(5)
            .assign(0)
            .invoke(callee)
            .ret();
        asm.bind(callee).load(0).ret();
    });
    assert!(matches!(r.result, Err(RuntimeError::UndeclaredVariable(0))));
}

#[test]
fn test_caller_locals_preserved() {
    let r = run(|asm| {
        let callee = asm.new_label();
        asm.variable(0, Datatype::Int, false)
            .number(5)
            .assign(0)
            .invoke(callee)
            .load(0)
            .ret();
        asm.bind(callee)
            .variable(0, Datatype::Int, false)
            .number(8)
            .assign(0)
            .ret();
    });
    r.result.as_ref().unwrap();
    assert_eq!(r.stack(), &[5]);
}

#[test]
fn test_chr_array_round_trip() {
    let r = run(|asm| {
        asm.variable(0, Datatype::Chr, true)
            .number(16)
            .invoke_native(ALLOCATE)
            .assign(0)
            .number(3)
            .number(0x1ff)
            .assign_indexed(0)
            .number(3)
            .load_indexed(0)
            .number(2)
            .load_indexed(0)
            .ret();
    });
    r.result.as_ref().unwrap();
    // Byte granularity: the value is truncated and neighbours are untouched.
    assert_eq!(r.stack(), &[0xff, 0]);
}

#[test]
fn test_int_array_round_trip() {
    let value = -123_456_789_012_i64;
    let r = run(|asm| {
        asm.variable(1, Datatype::Int, true)
            .number(32)
            .invoke_native(ALLOCATE)
            .assign(1)
            .number(2)
            .number(value)
            .assign_indexed(1)
            .number(2)
            .load_indexed(1)
            .number(1)
            .load_indexed(1)
            .ret();
    });
    r.result.as_ref().unwrap();
    assert_eq!(r.stack(), &[value, 0]);
}

#[test]
fn test_array_write_past_allocation() {
    let r = run(|asm| {
        asm.variable(1, Datatype::Int, true)
            .number(16)
            .invoke_native(ALLOCATE)
            .assign(1)
            .number(2)
            .number(1)
            .assign_indexed(1)
            .ret();
    });
    assert!(matches!(r.result, Err(RuntimeError::Memory(_))));
}

/// Two adjacent chr buffers: slot 0 is `a`, slot 1 is `b` with `b[0] = 'z'`.
fn two_buffers(asm: &mut vm::asm::Assembler) -> &mut vm::asm::Assembler {
    asm.variable(0, Datatype::Chr, true)
        .variable(1, Datatype::Chr, true)
        .number(16)
        .invoke_native(ALLOCATE)
        .assign(0)
        .number(16)
        .invoke_native(ALLOCATE)
        .assign(1)
        .number(0)
        .number(b'z' as i64)
        .assign_indexed(1)
}

#[test]
fn test_large_index_does_not_reach_next_allocation() {
    let r = run(|asm| {
        two_buffers(asm).number(1 << 32).load_indexed(0).ret();
    });
    assert!(matches!(
        r.result,
        Err(RuntimeError::Memory(MemoryError::OutOfBounds { .. }))
    ));
    assert!(r.stack().is_empty());

    let r = run(|asm| {
        two_buffers(asm)
            .number(1 << 32)
            .number(1)
            .assign_indexed(0)
            .ret();
    });
    assert!(matches!(
        r.result,
        Err(RuntimeError::Memory(MemoryError::OutOfBounds { .. }))
    ));
    assert_eq!(r.vm.memory.read_u8(memory::Address::new(3, 0)), Ok(b'z'));
}

#[test]
fn test_int_index_scaling_stays_in_region() {
    // 1 << 29 elements of 8 bytes is exactly one region id further on.
    let r = run(|asm| {
        asm.variable(0, Datatype::Int, true)
            .variable(1, Datatype::Int, true)
            .number(16)
            .invoke_native(ALLOCATE)
            .assign(0)
            .number(16)
            .invoke_native(ALLOCATE)
            .assign(1)
            .number(1 << 29)
            .load_indexed(0)
            .ret();
    });
    assert!(matches!(
        r.result,
        Err(RuntimeError::Memory(MemoryError::OutOfBounds { .. }))
    ));

    let r = run(|asm| {
        two_buffers(asm).number(-1).load_indexed(1).ret();
    });
    assert!(matches!(
        r.result,
        Err(RuntimeError::Memory(MemoryError::OutOfBounds { .. }))
    ));

    let r = run(|asm| {
        asm.variable(0, Datatype::Int, true)
            .number(16)
            .invoke_native(ALLOCATE)
            .assign(0)
            .number(i64::MAX)
            .load_indexed(0)
            .ret();
    });
    assert!(matches!(r.result, Err(RuntimeError::Memory(_))));
}

#[test]
fn test_scalar_load_indexed_tests_bits() {
    let r = run(|asm| {
        asm.variable(0, Datatype::Int, false).number(0b1010).assign(0);
        for bit in [0, 1, 2, 3, 64, -1] {
            asm.number(bit).load_indexed(0);
        }
        asm.ret();
    });
    r.result.as_ref().unwrap();
    assert_eq!(r.stack(), &[0, 1, 0, 1, 0, 0]);
}

#[test]
fn test_string_pushes_image_address() {
    let r = run(|asm| {
        asm.variable(0, Datatype::Chr, true)
            .string(b"hey")
            .assign(0)
            .number(1)
            .load_indexed(0)
            .number(3)
            .load_indexed(0)
            .ret();
    });
    r.result.as_ref().unwrap();
    assert_eq!(r.stack(), &[b'e' as i64, 0]);
}

#[test]
fn test_run_pushes_arguments() {
    let img = image(|asm| {
        asm.variable(0, Datatype::Int, true)
            .variable(1, Datatype::Int, false)
            .variable(2, Datatype::Chr, true)
            .assign(0)
            .assign(1)
            .load(1)
            .number(b'0' as i64)
            .op(OpCode::Add)
            .invoke_native(PRINTC)
            .delete()
            .number(1)
            .load_indexed(0)
            .assign(2)
            .number(0)
            .load_indexed(2)
            .invoke_native(PRINTC)
            .delete()
            .ret();
    });
    let output = common::SharedBuf::default();
    let mut vm = VM::new(img);
    vm.set_output(Box::new(output.clone()));
    let completion = vm.run(&["prog.flb", "hi"]).unwrap();
    assert_eq!(completion, Completion::Returned);
    assert_eq!(output.contents(), b"2h");
}

#[test]
fn test_global_initializer_runs_first() {
    let mut asm = vm::asm::Assembler::new();
    let init = asm.new_label();
    let main = asm.new_label();
    asm.entry(main).global_init(init);
    asm.bind(init)
        .global_reserve(256, Datatype::Int, false)
        .number(b'A' as i64)
        .assign(256)
        .ret();
    asm.bind(main).load(256).invoke_native(PRINTC).delete().ret();
    let r = exec(vm::Image::from_bytes(asm.finish().unwrap()).unwrap());
    r.result.as_ref().unwrap();
    assert_eq!(r.output(), b"A");
}
