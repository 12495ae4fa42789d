mod common;

use common::run;
use vm::opcode::OpCode;
use vm::RuntimeError;

/// Push `a`, push `b`, apply `op` and return the single result.
fn binary(a: i64, b: i64, op: OpCode) -> i64 {
    let r = run(|asm| {
        asm.number(a).number(b).op(op).ret();
    });
    r.result.as_ref().unwrap();
    assert_eq!(r.stack().len(), 1);
    r.stack()[0]
}

fn unary(a: i64, op: OpCode) -> i64 {
    let r = run(|asm| {
        asm.number(a).op(op).ret();
    });
    r.result.as_ref().unwrap();
    r.stack()[0]
}

// ============================================================================
// Arithmetic
// ============================================================================

#[test]
fn test_arithmetic_operand_order() {
    assert_eq!(binary(10, 3, OpCode::Add), 13);
    assert_eq!(binary(10, 3, OpCode::Sub), 7);
    assert_eq!(binary(10, 3, OpCode::Mul), 30);
    assert_eq!(binary(10, 3, OpCode::Div), 3);
    assert_eq!(binary(10, 3, OpCode::Mod), 1);
}

#[test]
fn test_division_truncates_toward_zero() {
    assert_eq!(binary(-7, 2, OpCode::Div), -3);
    assert_eq!(binary(-7, 2, OpCode::Mod), -1);
    assert_eq!(binary(7, -2, OpCode::Mod), 1);
}

#[test]
fn test_overflow_wraps() {
    assert_eq!(binary(i64::MAX, 1, OpCode::Add), i64::MIN);
    assert_eq!(binary(i64::MIN, -1, OpCode::Div), i64::MIN);
    assert_eq!(binary(i64::MIN, -1, OpCode::Mod), 0);
}

#[test]
fn test_division_by_zero() {
    for op in [OpCode::Div, OpCode::Mod] {
        let r = run(|asm| {
            asm.number(1).number(0).op(op).ret();
        });
        assert!(matches!(r.result, Err(RuntimeError::DivisionByZero)));
    }
}

// ============================================================================
// Comparison
// ============================================================================

#[test]
fn test_comparisons() {
    assert_eq!(binary(1, 2, OpCode::Less), 1);
    assert_eq!(binary(2, 2, OpCode::Less), 0);
    assert_eq!(binary(2, 2, OpCode::LessEquals), 1);
    assert_eq!(binary(3, 2, OpCode::More), 1);
    assert_eq!(binary(2, 3, OpCode::MoreEquals), 0);
    assert_eq!(binary(-4, -4, OpCode::Equals), 1);
    assert_eq!(binary(-4, 4, OpCode::NotEquals), 1);
    assert_eq!(binary(-1, 0, OpCode::Less), 1);
}

// ============================================================================
// Bitwise
// ============================================================================

#[test]
fn test_bitwise() {
    assert_eq!(binary(0b1100, 0b1010, OpCode::Or), 0b1110);
    assert_eq!(binary(0b1100, 0b1010, OpCode::And), 0b1000);
    assert_eq!(binary(0b1100, 0b1010, OpCode::Xor), 0b0110);
    assert_eq!(binary(1, 4, OpCode::ShiftLeft), 16);
    assert_eq!(binary(-16, 2, OpCode::ShiftRight), -4);
}

#[test]
fn test_invert_is_logical() {
    assert_eq!(unary(0, OpCode::Invert), 1);
    assert_eq!(unary(5, OpCode::Invert), 0);
    assert_eq!(unary(-1, OpCode::Invert), 0);
}

#[test]
fn test_not_is_bitwise() {
    assert_eq!(unary(0, OpCode::Not), -1);
    assert_eq!(unary(5, OpCode::Not), -6);
}

#[test]
fn test_missing_operand_underflows() {
    let r = run(|asm| {
        asm.number(1).op(OpCode::Add).ret();
    });
    assert!(matches!(r.result, Err(RuntimeError::StackUnderflow)));
}
