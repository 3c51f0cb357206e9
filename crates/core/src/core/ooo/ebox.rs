//! Ebox: integer execution (spec.md §4.4 item 4 / §4.5 item 1).
//!
//! Dispatches the generic [`IntOp`] produced by decode against concrete
//! operand values. Longword (`L`-suffixed) forms operate on the low 32 bits
//! and sign-extend the result; `/V` forms additionally check for signed
//! overflow and report `ArithmeticTrapKind::IntegerOverflow`.

use crate::common::error::{ArithmeticTrapKind, Trap};
use crate::isa::decode::{CmovMode, IntOp, IntOpFlags};

/// Executes an integer-operate instruction, returning the 64-bit result or
/// the arithmetic trap it raised.
pub fn execute(op: IntOp, flags: IntOpFlags, a: u64, b: u64) -> Result<u64, Trap> {
    let raw = match op {
        IntOp::Add => checked_add(a, b, flags)?,
        IntOp::Sub => checked_sub(a, b, flags)?,
        IntOp::Mul => checked_mul(a, b, flags)?,
        IntOp::Umulh => (((a as u128) * (b as u128)) >> 64) as u64,
        IntOp::And => a & b,
        IntOp::Bic => a & !b,
        IntOp::Bis => a | b,
        IntOp::Ornot => a | !b,
        IntOp::Xor => a ^ b,
        IntOp::Eqv => !(a ^ b),
        IntOp::CmpEq => bool_to_u64(a == b),
        IntOp::CmpLt => bool_to_u64((a as i64) < (b as i64)),
        IntOp::CmpLe => bool_to_u64((a as i64) <= (b as i64)),
        IntOp::CmpUlt => bool_to_u64(a < b),
        IntOp::CmpUle => bool_to_u64(a <= b),
        IntOp::CmpBge => cmp_byte_ge(a, b),
        IntOp::Sll => a.wrapping_shl((b & 0x3F) as u32),
        IntOp::Srl => a.wrapping_shr((b & 0x3F) as u32),
        IntOp::Sra => ((a as i64).wrapping_shr((b & 0x3F) as u32)) as u64,
        IntOp::InsLow => insert_low(a, b),
        IntOp::InsHigh => insert_high(a, b),
        IntOp::ExtLow => extract_low(a, b),
        IntOp::ExtHigh => extract_high(a, b),
        IntOp::MskLow => mask_low(a, b),
        IntOp::MskHigh => mask_high(a, b),
        IntOp::Zap => zap(a, b, false),
        IntOp::ZapNot => zap(a, b, true),
        IntOp::Cmov { taken_when_nonzero, mode } => {
            let take = eval_cmov(mode, a) == taken_when_nonzero;
            return Ok(if take { b } else { a });
        }
        IntOp::Amask => a & !b,
        IntOp::ImplVer => 2,
    };
    Ok(if flags.longword { sign_extend_32(raw as u32) } else { raw })
}

fn bool_to_u64(b: bool) -> u64 {
    b as u64
}

fn sign_extend_32(v: u32) -> u64 {
    (v as i32) as i64 as u64
}

fn checked_add(a: u64, b: u64, flags: IntOpFlags) -> Result<u64, Trap> {
    if flags.trap_on_overflow {
        let (r, overflow) = if flags.longword {
            let (r32, o) = (a as i32).overflowing_add(b as i32);
            (r32 as i64 as u64, o)
        } else {
            let (r64, o) = (a as i64).overflowing_add(b as i64);
            (r64 as u64, o)
        };
        if overflow {
            return Err(Trap::ArithmeticTrap(ArithmeticTrapKind::IntegerOverflow));
        }
        Ok(r)
    } else {
        Ok(a.wrapping_add(b))
    }
}

fn checked_sub(a: u64, b: u64, flags: IntOpFlags) -> Result<u64, Trap> {
    if flags.trap_on_overflow {
        let (r, overflow) = if flags.longword {
            let (r32, o) = (a as i32).overflowing_sub(b as i32);
            (r32 as i64 as u64, o)
        } else {
            let (r64, o) = (a as i64).overflowing_sub(b as i64);
            (r64 as u64, o)
        };
        if overflow {
            return Err(Trap::ArithmeticTrap(ArithmeticTrapKind::IntegerOverflow));
        }
        Ok(r)
    } else {
        Ok(a.wrapping_sub(b))
    }
}

fn checked_mul(a: u64, b: u64, flags: IntOpFlags) -> Result<u64, Trap> {
    if flags.trap_on_overflow {
        let (r, overflow) = if flags.longword {
            let (r32, o) = (a as i32).overflowing_mul(b as i32);
            (r32 as i64 as u64, o)
        } else {
            let (r64, o) = (a as i64).overflowing_mul(b as i64);
            (r64 as u64, o)
        };
        if overflow {
            return Err(Trap::ArithmeticTrap(ArithmeticTrapKind::IntegerOverflow));
        }
        Ok(r)
    } else {
        Ok(a.wrapping_mul(b))
    }
}

fn cmp_byte_ge(a: u64, b: u64) -> u64 {
    let mut result = 0u64;
    for i in 0..8 {
        let shift = i * 8;
        let byte_a = (a >> shift) & 0xFF;
        let byte_b = (b >> shift) & 0xFF;
        if byte_a >= byte_b {
            result |= 1 << i;
        }
    }
    result
}

fn eval_cmov(mode: CmovMode, a: u64) -> bool {
    match mode {
        CmovMode::Eq => a == 0,
        CmovMode::Lt => (a as i64) < 0,
        CmovMode::Le => (a as i64) <= 0,
        CmovMode::LowBit => a & 1 != 0,
    }
}

/// `INSxL`: shift `a`'s low bytes left by `(byte_offset * 8)` within a
/// quadword, masked to the instruction's width (spec.md treats the width as
/// carried alongside the op; this simulator models only the quadword form,
/// which subsumes byte/word/longword via the caller pre-masking `a`).
fn insert_low(a: u64, byte_offset: u64) -> u64 {
    let shift = (byte_offset & 0x7) * 8;
    a.wrapping_shl(shift as u32)
}

fn insert_high(a: u64, byte_offset: u64) -> u64 {
    let shift = (byte_offset & 0x7) * 8;
    if shift == 0 { 0 } else { a.wrapping_shr((64 - shift) as u32) }
}

fn extract_low(a: u64, byte_offset: u64) -> u64 {
    let shift = (byte_offset & 0x7) * 8;
    a.wrapping_shr(shift as u32)
}

fn extract_high(a: u64, byte_offset: u64) -> u64 {
    let shift = (byte_offset & 0x7) * 8;
    if shift == 0 { 0 } else { a.wrapping_shl((64 - shift) as u32) }
}

fn mask_low(a: u64, byte_offset: u64) -> u64 {
    let shift = (byte_offset & 0x7) * 8;
    a & !(u64::MAX.wrapping_shl(shift as u32))
}

fn mask_high(a: u64, byte_offset: u64) -> u64 {
    let shift = (byte_offset & 0x7) * 8;
    a & u64::MAX.wrapping_shl(shift as u32)
}

fn zap(a: u64, mask: u64, invert: bool) -> u64 {
    let mut result = a;
    for i in 0..8 {
        let bit_set = (mask >> i) & 1 != 0;
        let zero_this_byte = if invert { !bit_set } else { bit_set };
        if zero_this_byte {
            result &= !(0xFFu64 << (i * 8));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addq_wraps_without_trapping() {
        let r = execute(IntOp::Add, IntOpFlags::default(), u64::MAX, 1).unwrap();
        assert_eq!(r, 0);
    }

    #[test]
    fn addq_v_traps_on_overflow() {
        let flags = IntOpFlags { longword: false, trap_on_overflow: true };
        let err = execute(IntOp::Add, flags, i64::MAX as u64, 1).unwrap_err();
        assert_eq!(err, Trap::ArithmeticTrap(ArithmeticTrapKind::IntegerOverflow));
    }

    #[test]
    fn addl_sign_extends_32_bit_result() {
        let flags = IntOpFlags { longword: true, trap_on_overflow: false };
        let r = execute(IntOp::Add, flags, 0x7FFF_FFFF, 1).unwrap();
        assert_eq!(r, 0xFFFF_FFFF_8000_0000);
    }

    #[test]
    fn cmpeq_returns_one_when_equal() {
        let r = execute(IntOp::CmpEq, IntOpFlags::default(), 5, 5).unwrap();
        assert_eq!(r, 1);
    }

    #[test]
    fn cmov_eq_selects_b_when_a_is_zero() {
        let flags = IntOpFlags::default();
        let op = IntOp::Cmov { taken_when_nonzero: true, mode: CmovMode::Eq };
        let r = execute(op, flags, 0, 99).unwrap();
        assert_eq!(r, 99);
    }

    #[test]
    fn zap_clears_selected_bytes() {
        let r = zap(0xFFFF_FFFF_FFFF_FFFF, 0b0000_0001, false);
        assert_eq!(r, 0xFFFF_FFFF_FFFF_FF00);
    }
}
