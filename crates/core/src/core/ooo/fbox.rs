//! Fbox: floating-point execution (spec.md §4.4 item 4 / §4.5).
//!
//! Arithmetic and comparisons delegate to `core::units::fpu`; the register-
//! move, copysign, and integer/longword conversion forms that don't need a
//! full IEEE operation are handled directly here since they're bit
//! manipulation rather than floating-point math.

use crate::common::error::Trap;
use crate::core::units::fpu::{self, Fpcr};
use crate::isa::decode::{CmovMode, FpFormat, FpOp};

/// Executes a decoded FP-operate instruction. `fpcr` is read for rounding/
/// trap-enable bits; `MoveToFpcr`/`MoveFromFpcr` mutate it directly and so
/// take `&mut`.
pub fn execute(op: FpOp, src_fmt: FpFormat, a_bits: u64, b_bits: u64, fpcr: &mut Fpcr) -> Result<u64, Trap> {
    match op {
        FpOp::Add | FpOp::Sub | FpOp::Mul | FpOp::Div | FpOp::Sqrt => {
            fpu::execute_arith(op, src_fmt, a_bits, b_bits, fpcr)
        }
        FpOp::CmpEq | FpOp::CmpLt | FpOp::CmpLe | FpOp::CmpUn => Ok(fpu::compare(op, src_fmt, a_bits, b_bits)),
        FpOp::Copysign => Ok(copysign(a_bits, b_bits, false, false)),
        FpOp::CopysignNegate => Ok(copysign(a_bits, b_bits, true, false)),
        FpOp::CopysignExp => Ok(copysign(a_bits, b_bits, false, true)),
        FpOp::CvtIntToFloat | FpOp::CvtFloatToInt | FpOp::CvtFloatToFloat => convert(op, src_fmt, a_bits),
        FpOp::CvtLongToQuad => Ok(sign_extend_32(a_bits as u32)),
        FpOp::CvtQuadToLong => Ok(a_bits & 0xFFFF_FFFF),
        FpOp::Fcmov { taken_when_nonzero, mode } => {
            let take = eval_cmov(mode, a_bits) == taken_when_nonzero;
            Ok(if take { b_bits } else { a_bits })
        }
        FpOp::MoveToFpcr => {
            *fpcr = Fpcr::from_raw(a_bits);
            Ok(a_bits)
        }
        FpOp::MoveFromFpcr => Ok(fpcr.to_raw()),
    }
}

/// `CPYS`/`CPYSN`/`CPYSE`: move `b`'s mantissa/exponent (IEEE T-format
/// layout: sign bit 63, exponent bits 62-52) combined with `a`'s sign (and,
/// for `CPYSE`, `a`'s exponent too).
fn copysign(a_bits: u64, b_bits: u64, negate_sign: bool, copy_exponent_from_a: bool) -> u64 {
    const SIGN_BIT: u64 = 1 << 63;
    const EXP_MASK: u64 = 0x7FF << 52;
    let sign = if negate_sign { (!a_bits) & SIGN_BIT } else { a_bits & SIGN_BIT };
    let exponent = if copy_exponent_from_a { a_bits & EXP_MASK } else { b_bits & EXP_MASK };
    let mantissa = b_bits & !(SIGN_BIT | EXP_MASK);
    sign | exponent | mantissa
}

fn eval_cmov(mode: CmovMode, bits: u64) -> bool {
    let as_f64 = f64::from_bits(bits);
    match mode {
        CmovMode::Eq => as_f64 == 0.0,
        CmovMode::Lt => as_f64 < 0.0,
        CmovMode::Le => as_f64 <= 0.0,
        CmovMode::LowBit => bits & 1 != 0,
    }
}

fn sign_extend_32(v: u32) -> u64 {
    (v as i32) as i64 as u64
}

fn convert(op: FpOp, src_fmt: FpFormat, bits: u64) -> Result<u64, Trap> {
    match (op, src_fmt) {
        (FpOp::CvtIntToFloat, _) => {
            let i = bits as i64;
            Ok((i as f64).to_bits())
        }
        (FpOp::CvtFloatToInt, FpFormat::IeeeS | FpFormat::VaxF) => {
            let f = f32::from_bits(bits as u32);
            Ok((f as i64) as u64)
        }
        (FpOp::CvtFloatToInt, _) => {
            let f = f64::from_bits(bits);
            Ok((f as i64) as u64)
        }
        (FpOp::CvtFloatToFloat, FpFormat::IeeeT | FpFormat::VaxG) => {
            let f = f64::from_bits(bits);
            Ok((f as f32).to_bits() as u64)
        }
        (FpOp::CvtFloatToFloat, _) => {
            let f = f32::from_bits(bits as u32);
            Ok((f as f64).to_bits())
        }
        _ => Err(Trap::IllegalInstruction(0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copys_takes_sign_from_a_rest_from_b() {
        let a = 1u64 << 63; // negative
        let b = 0x4010_0000_0000_0000u64; // positive 4.0
        let r = copysign(a, b, false, false);
        assert_eq!(r, b | (1 << 63));
    }

    #[test]
    fn cpysn_negates_as_sign() {
        let a = 0u64; // positive
        let b = 0x4010_0000_0000_0000u64;
        let r = copysign(a, b, true, false);
        assert_eq!(r, b | (1 << 63));
    }

    #[test]
    fn cvt_int_to_float_roundtrip() {
        let mut fpcr = Fpcr::default();
        let r = execute(FpOp::CvtIntToFloat, FpFormat::Integer, 7u64, 0, &mut fpcr).unwrap();
        assert_eq!(f64::from_bits(r), 7.0);
    }

    #[test]
    fn move_to_fpcr_then_move_from_fpcr_round_trips() {
        let mut fpcr = Fpcr::default();
        let raw = 1u64 << 62; // trap_inexact bit
        execute(FpOp::MoveToFpcr, FpFormat::IeeeT, raw, 0, &mut fpcr).unwrap();
        assert!(fpcr.trap_inexact);
    }
}
