//! Instruction decode (spec.md §6): raw 32-bit word → [`Decoded`].
//!
//! Rather than one enum variant per historical mnemonic (the integer and
//! floating-point operate groups alone cover well over a hundred), operate
//! instructions decode into a generic [`IntOp`]/[`FpOp`] plus the operand
//! fields the executor needs. This keeps the decode table exhaustive over the
//! opcode space (every primary opcode and function code either maps to a
//! known operation or reaches the catch-all `Trap::IllegalInstruction`)
//! without an explosion of near-identical variants.

use crate::common::error::Trap;
use crate::isa::instruction::InstructionBits;
use crate::isa::opcodes::*;

/// A decoded operand: either an architectural register or an 8-bit literal
/// (Operate-Literal format zero-extends the literal before use).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegOrLit {
    Reg(usize),
    Lit(u64),
}

/// Generic integer-operate operation. The `/V` (overflow-trapping) and 32-bit
/// forms are carried as flags on [`Decoded::IntOperate`] rather than distinct
/// variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntOp {
    Add,
    Sub,
    Mul,
    Umulh,
    And,
    Bic,
    Bis,
    Ornot,
    Xor,
    Eqv,
    CmpEq,
    CmpLt,
    CmpLe,
    CmpUlt,
    CmpUle,
    CmpBge,
    Sll,
    Srl,
    Sra,
    InsLow,
    InsHigh,
    ExtLow,
    ExtHigh,
    MskLow,
    MskHigh,
    Zap,
    ZapNot,
    Cmov { taken_when_nonzero: bool, mode: CmovMode },
    Amask,
    ImplVer,
}

/// `CMOV` comparison mode against zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmovMode {
    Eq,
    Lt,
    Le,
    LowBit,
}

/// Width/trap behavior for an [`IntOp`] operate instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct IntOpFlags {
    /// Result is sign-extended from 32 bits (the `L`-suffixed forms).
    pub longword: bool,
    /// Traps with `ArithmeticTrapKind::IntegerOverflow` on signed overflow
    /// (the `/V`-suffixed forms).
    pub trap_on_overflow: bool,
}

/// Generic floating-point-operate operation, spanning the IEEE (S/T) and VAX
/// (F/G) format families. The specific source/destination format is carried
/// alongside in [`Decoded::FpOperate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FpOp {
    Add,
    Sub,
    Mul,
    Div,
    Sqrt,
    CmpEq,
    CmpLt,
    CmpLe,
    CmpUn,
    CvtIntToFloat,
    CvtFloatToInt,
    CvtFloatToFloat,
    CvtLongToQuad,
    CvtQuadToLong,
    Copysign,
    CopysignNegate,
    CopysignExp,
    Fcmov { taken_when_nonzero: bool, mode: CmovMode },
    MoveToFpcr,
    MoveFromFpcr,
}

/// FP source/destination format, decoded from the function-code group and
/// sub-field (spec.md §4.5: VAX F/G staged through the same execution units
/// as IEEE S/T, with a narrower exponent range).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FpFormat {
    VaxF,
    VaxG,
    IeeeS,
    IeeeT,
    /// Conversion operand/result is a 64-bit integer (`CVTxQ`/`CVTQx`).
    Integer,
}

/// Memory-format opcode identity (load/store width and signedness).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemOp {
    Lda,
    Ldah,
    LdbU,
    LdqU,
    LdwU,
    Stw,
    Stb,
    StqU,
    Ldf,
    Ldg,
    Lds,
    Ldt,
    Stf,
    Stg,
    Sts,
    Stt,
    Ldl,
    Ldq,
    LdlLocked,
    LdqLocked,
    Stl,
    Stq,
    StlCond,
    StqCond,
}

/// Integer branch comparison, or unconditional (`BR`/`BSR`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BranchCond {
    Always,
    Eq,
    Ne,
    Lt,
    Le,
    Ge,
    Gt,
    LowBitClear,
    LowBitSet,
}

/// `JMP`/`JSR`/`RET`/`JSR_COROUTINE` hint, predicting return-stack behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JsrHint {
    Jmp,
    Jsr,
    Ret,
    JsrCoroutine,
}

/// A fully decoded instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decoded {
    IntOperate {
        op: IntOp,
        flags: IntOpFlags,
        ra: usize,
        rb: RegOrLit,
        rc: usize,
    },
    FpOperate {
        op: FpOp,
        src_fmt: FpFormat,
        dst_fmt: FpFormat,
        trapping: bool,
        rounding_dynamic: bool,
        fa: usize,
        fb: usize,
        fc: usize,
    },
    Memory {
        op: MemOp,
        ra: usize,
        rb: usize,
        disp: i64,
    },
    Branch {
        cond: BranchCond,
        is_float: bool,
        link: Option<usize>,
        ra: usize,
        disp: i64,
    },
    Jsr {
        hint: JsrHint,
        ra: usize,
        rb: usize,
        disp: i64,
    },
    CallPal {
        func: u32,
    },
    HwLd {
        ra: usize,
        rb: usize,
        disp: i64,
        physical: bool,
        quadword: bool,
        lock: bool,
    },
    HwSt {
        ra: usize,
        rb: usize,
        disp: i64,
        physical: bool,
        quadword: bool,
        cond: bool,
    },
    HwMfpr {
        ra: usize,
        rb: usize,
        index: u32,
    },
    HwMtpr {
        ra: usize,
        rb: usize,
        index: u32,
    },
    HwRet {
        rb: usize,
    },
    Trapb,
    Excb,
    MemoryBarrier,
    WriteMemoryBarrier,
    Fetch,
    Rpcc {
        rc: usize,
    },
}

/// Decodes a raw 32-bit instruction word, returning `Trap::IllegalInstruction`
/// for any opcode/function combination not recognized.
pub fn decode(raw: u32) -> Result<Decoded, Trap> {
    match raw.opcode() {
        OP_CALL_PAL => Ok(Decoded::CallPal { func: raw.pal_func() }),

        OP_INTA | OP_INTL | OP_INTS | OP_INTM => decode_int_operate(raw),

        OP_ITFP | OP_FLTV | OP_FLTI | OP_FLTL => decode_fp_operate(raw),

        OP_MISC => decode_misc(raw),

        OP_JSR => decode_jsr(raw),

        OP_HW_MFPR => Ok(Decoded::HwMfpr {
            ra: raw.ra(),
            rb: raw.rb(),
            index: raw.hw_disp() as u32 & 0xFF,
        }),
        OP_HW_MTPR => Ok(Decoded::HwMtpr {
            ra: raw.ra(),
            rb: raw.rb(),
            index: raw.hw_disp() as u32 & 0xFF,
        }),
        OP_HW_RET => Ok(Decoded::HwRet { rb: raw.rb() }),
        OP_HW_LD => Ok(Decoded::HwLd {
            ra: raw.ra(),
            rb: raw.rb(),
            disp: raw.hw_disp(),
            physical: raw.hw_hint() & 0x1 != 0,
            quadword: raw.hw_len_bit(),
            lock: raw.hw_hint() & 0x2 != 0,
        }),
        OP_HW_ST => Ok(Decoded::HwSt {
            ra: raw.ra(),
            rb: raw.rb(),
            disp: raw.hw_disp(),
            physical: raw.hw_hint() & 0x1 != 0,
            quadword: raw.hw_len_bit(),
            cond: raw.hw_hint() & 0x2 != 0,
        }),

        OP_FPTI => decode_fpti(raw),

        op @ (OP_LDA..=OP_LDQ_U | OP_LDWU..=OP_STQ_U | OP_LDF..=OP_STQ_C) => decode_memory(raw, op),

        op @ (OP_BR..=OP_BGT) => decode_branch(raw, op),

        _ => Err(Trap::IllegalInstruction(raw)),
    }
}

fn decode_int_operate(raw: u32) -> Result<Decoded, Trap> {
    let ra = raw.ra();
    let rc = raw.rc();
    let rb = if raw.is_literal() {
        RegOrLit::Lit(raw.literal())
    } else {
        RegOrLit::Reg(raw.rb())
    };
    let func = raw.func7();

    let (op, flags) = match raw.opcode() {
        OP_INTA => match func {
            inta::ADDL => (IntOp::Add, IntOpFlags { longword: true, trap_on_overflow: false }),
            inta::ADDL_V => (IntOp::Add, IntOpFlags { longword: true, trap_on_overflow: true }),
            inta::SUBL => (IntOp::Sub, IntOpFlags { longword: true, trap_on_overflow: false }),
            inta::SUBL_V => (IntOp::Sub, IntOpFlags { longword: true, trap_on_overflow: true }),
            inta::ADDQ => (IntOp::Add, IntOpFlags::default()),
            inta::ADDQ_V => (IntOp::Add, IntOpFlags { longword: false, trap_on_overflow: true }),
            inta::SUBQ => (IntOp::Sub, IntOpFlags::default()),
            inta::SUBQ_V => (IntOp::Sub, IntOpFlags { longword: false, trap_on_overflow: true }),
            inta::CMPBGE => (IntOp::CmpBge, IntOpFlags::default()),
            inta::CMPULT => (IntOp::CmpUlt, IntOpFlags::default()),
            inta::CMPEQ => (IntOp::CmpEq, IntOpFlags::default()),
            inta::CMPULE => (IntOp::CmpUle, IntOpFlags::default()),
            inta::CMPLT => (IntOp::CmpLt, IntOpFlags::default()),
            inta::CMPLE => (IntOp::CmpLe, IntOpFlags::default()),
            _ => return Err(Trap::IllegalInstruction(raw)),
        },
        OP_INTL => match func {
            intl::AND => (IntOp::And, IntOpFlags::default()),
            intl::BIC => (IntOp::Bic, IntOpFlags::default()),
            intl::BIS => (IntOp::Bis, IntOpFlags::default()),
            intl::ORNOT => (IntOp::Ornot, IntOpFlags::default()),
            intl::XOR => (IntOp::Xor, IntOpFlags::default()),
            intl::EQV => (IntOp::Eqv, IntOpFlags::default()),
            intl::CMOVLBS => (IntOp::Cmov { taken_when_nonzero: true, mode: CmovMode::LowBit }, IntOpFlags::default()),
            intl::CMOVLBC => (IntOp::Cmov { taken_when_nonzero: false, mode: CmovMode::LowBit }, IntOpFlags::default()),
            intl::CMOVEQ => (IntOp::Cmov { taken_when_nonzero: true, mode: CmovMode::Eq }, IntOpFlags::default()),
            intl::CMOVNE => (IntOp::Cmov { taken_when_nonzero: false, mode: CmovMode::Eq }, IntOpFlags::default()),
            intl::CMOVLT => (IntOp::Cmov { taken_when_nonzero: true, mode: CmovMode::Lt }, IntOpFlags::default()),
            intl::CMOVGE => (IntOp::Cmov { taken_when_nonzero: false, mode: CmovMode::Lt }, IntOpFlags::default()),
            intl::CMOVLE => (IntOp::Cmov { taken_when_nonzero: true, mode: CmovMode::Le }, IntOpFlags::default()),
            intl::CMOVGT => (IntOp::Cmov { taken_when_nonzero: false, mode: CmovMode::Le }, IntOpFlags::default()),
            intl::AMASK => (IntOp::Amask, IntOpFlags::default()),
            intl::IMPLVER => (IntOp::ImplVer, IntOpFlags::default()),
            _ => return Err(Trap::IllegalInstruction(raw)),
        },
        OP_INTS => match func {
            ints::MSKBL | ints::MSKWL | ints::MSKLL | ints::MSKQL => (IntOp::MskLow, IntOpFlags::default()),
            ints::MSKWH | ints::MSKLH | ints::MSKQH => (IntOp::MskHigh, IntOpFlags::default()),
            ints::EXTBL | ints::EXTWL | ints::EXTLL | ints::EXTQL => (IntOp::ExtLow, IntOpFlags::default()),
            ints::EXTWH | ints::EXTLH | ints::EXTQH => (IntOp::ExtHigh, IntOpFlags::default()),
            ints::INSBL | ints::INSWL | ints::INSLL | ints::INSQL => (IntOp::InsLow, IntOpFlags::default()),
            ints::INSWH | ints::INSLH | ints::INSQH => (IntOp::InsHigh, IntOpFlags::default()),
            ints::ZAP => (IntOp::Zap, IntOpFlags::default()),
            ints::ZAPNOT => (IntOp::ZapNot, IntOpFlags::default()),
            ints::SRL => (IntOp::Srl, IntOpFlags::default()),
            ints::SLL => (IntOp::Sll, IntOpFlags::default()),
            ints::SRA => (IntOp::Sra, IntOpFlags::default()),
            _ => return Err(Trap::IllegalInstruction(raw)),
        },
        OP_INTM => match func {
            intm::MULL => (IntOp::Mul, IntOpFlags { longword: true, trap_on_overflow: false }),
            intm::MULL_V => (IntOp::Mul, IntOpFlags { longword: true, trap_on_overflow: true }),
            intm::MULQ => (IntOp::Mul, IntOpFlags::default()),
            intm::MULQ_V => (IntOp::Mul, IntOpFlags { longword: false, trap_on_overflow: true }),
            intm::UMULH => (IntOp::Umulh, IntOpFlags::default()),
            _ => return Err(Trap::IllegalInstruction(raw)),
        },
        _ => unreachable!("caller only dispatches integer-operate opcodes"),
    };

    Ok(Decoded::IntOperate { op, flags, ra, rb, rc })
}

fn decode_fp_operate(raw: u32) -> Result<Decoded, Trap> {
    let fa = raw.ra();
    let fb = raw.rb();
    let fc = raw.rc();
    let func = raw.func11();
    let trapping = func & 0x400 != 0 || func & 0x40 != 0;
    let rounding_dynamic = func & 0x080 != 0;

    let (op, src_fmt, dst_fmt) = match raw.opcode() {
        OP_ITFP => match func & 0x3FF {
            itfp::ITOFS => (FpOp::CvtIntToFloat, FpFormat::Integer, FpFormat::IeeeS),
            itfp::ITOFF => (FpOp::CvtIntToFloat, FpFormat::Integer, FpFormat::VaxF),
            itfp::ITOFT => (FpOp::CvtIntToFloat, FpFormat::Integer, FpFormat::IeeeT),
            itfp::SQRTF_C => (FpOp::Sqrt, FpFormat::VaxF, FpFormat::VaxF),
            itfp::SQRTG_C => (FpOp::Sqrt, FpFormat::VaxG, FpFormat::VaxG),
            itfp::SQRTS_C => (FpOp::Sqrt, FpFormat::IeeeS, FpFormat::IeeeS),
            itfp::SQRTT_C => (FpOp::Sqrt, FpFormat::IeeeT, FpFormat::IeeeT),
            _ => return Err(Trap::IllegalInstruction(raw)),
        },
        OP_FLTV => match func & 0x3FF {
            fltv::ADDF_C => (FpOp::Add, FpFormat::VaxF, FpFormat::VaxF),
            fltv::SUBF_C => (FpOp::Sub, FpFormat::VaxF, FpFormat::VaxF),
            fltv::MULF_C => (FpOp::Mul, FpFormat::VaxF, FpFormat::VaxF),
            fltv::DIVF_C => (FpOp::Div, FpFormat::VaxF, FpFormat::VaxF),
            fltv::ADDG_C => (FpOp::Add, FpFormat::VaxG, FpFormat::VaxG),
            fltv::SUBG_C => (FpOp::Sub, FpFormat::VaxG, FpFormat::VaxG),
            fltv::MULG_C => (FpOp::Mul, FpFormat::VaxG, FpFormat::VaxG),
            fltv::DIVG_C => (FpOp::Div, FpFormat::VaxG, FpFormat::VaxG),
            fltv::CVTDG_C => (FpOp::CvtFloatToFloat, FpFormat::VaxG, FpFormat::VaxG),
            fltv::CVTGF_C => (FpOp::CvtFloatToFloat, FpFormat::VaxG, FpFormat::VaxF),
            fltv::CVTGD_C => (FpOp::CvtFloatToFloat, FpFormat::VaxG, FpFormat::VaxG),
            fltv::CVTGQ_C => (FpOp::CvtFloatToInt, FpFormat::VaxG, FpFormat::Integer),
            fltv::CVTQF_C => (FpOp::CvtIntToFloat, FpFormat::Integer, FpFormat::VaxF),
            fltv::CVTQG_C => (FpOp::CvtIntToFloat, FpFormat::Integer, FpFormat::VaxG),
            fltv::CMPGEQ => (FpOp::CmpEq, FpFormat::VaxG, FpFormat::VaxG),
            fltv::CMPGLT => (FpOp::CmpLt, FpFormat::VaxG, FpFormat::VaxG),
            fltv::CMPGLE => (FpOp::CmpLe, FpFormat::VaxG, FpFormat::VaxG),
            _ => return Err(Trap::IllegalInstruction(raw)),
        },
        OP_FLTI => match func & 0x3FF {
            flti::ADDS => (FpOp::Add, FpFormat::IeeeS, FpFormat::IeeeS),
            flti::SUBS => (FpOp::Sub, FpFormat::IeeeS, FpFormat::IeeeS),
            flti::MULS => (FpOp::Mul, FpFormat::IeeeS, FpFormat::IeeeS),
            flti::DIVS => (FpOp::Div, FpFormat::IeeeS, FpFormat::IeeeS),
            flti::ADDT => (FpOp::Add, FpFormat::IeeeT, FpFormat::IeeeT),
            flti::SUBT => (FpOp::Sub, FpFormat::IeeeT, FpFormat::IeeeT),
            flti::MULT => (FpOp::Mul, FpFormat::IeeeT, FpFormat::IeeeT),
            flti::DIVT => (FpOp::Div, FpFormat::IeeeT, FpFormat::IeeeT),
            flti::CMPTUN => (FpOp::CmpUn, FpFormat::IeeeT, FpFormat::IeeeT),
            flti::CMPTEQ | flti::CMPTGEQ_SU => (FpOp::CmpEq, FpFormat::IeeeT, FpFormat::IeeeT),
            flti::CMPTLT => (FpOp::CmpLt, FpFormat::IeeeT, FpFormat::IeeeT),
            flti::CMPTLE => (FpOp::CmpLe, FpFormat::IeeeT, FpFormat::IeeeT),
            flti::CVTTS => (FpOp::CvtFloatToFloat, FpFormat::IeeeT, FpFormat::IeeeS),
            flti::CVTST => (FpOp::CvtFloatToFloat, FpFormat::IeeeS, FpFormat::IeeeT),
            flti::CVTTQ => (FpOp::CvtFloatToInt, FpFormat::IeeeT, FpFormat::Integer),
            flti::CVTQS => (FpOp::CvtIntToFloat, FpFormat::Integer, FpFormat::IeeeS),
            flti::CVTQT => (FpOp::CvtIntToFloat, FpFormat::Integer, FpFormat::IeeeT),
            _ => return Err(Trap::IllegalInstruction(raw)),
        },
        OP_FLTL => match func & 0x3FF {
            fltl::CVTLQ => (FpOp::CvtLongToQuad, FpFormat::Integer, FpFormat::Integer),
            fltl::CPYS => (FpOp::Copysign, FpFormat::IeeeT, FpFormat::IeeeT),
            fltl::CPYSN => (FpOp::CopysignNegate, FpFormat::IeeeT, FpFormat::IeeeT),
            fltl::CPYSE => (FpOp::CopysignExp, FpFormat::IeeeT, FpFormat::IeeeT),
            fltl::MT_FPCR => (FpOp::MoveToFpcr, FpFormat::IeeeT, FpFormat::IeeeT),
            fltl::MF_FPCR => (FpOp::MoveFromFpcr, FpFormat::IeeeT, FpFormat::IeeeT),
            fltl::FCMOVEQ => (FpOp::Fcmov { taken_when_nonzero: false, mode: CmovMode::Eq }, FpFormat::IeeeT, FpFormat::IeeeT),
            fltl::FCMOVNE => (FpOp::Fcmov { taken_when_nonzero: true, mode: CmovMode::Eq }, FpFormat::IeeeT, FpFormat::IeeeT),
            fltl::FCMOVLT => (FpOp::Fcmov { taken_when_nonzero: true, mode: CmovMode::Lt }, FpFormat::IeeeT, FpFormat::IeeeT),
            fltl::FCMOVGE => (FpOp::Fcmov { taken_when_nonzero: false, mode: CmovMode::Lt }, FpFormat::IeeeT, FpFormat::IeeeT),
            fltl::FCMOVLE => (FpOp::Fcmov { taken_when_nonzero: true, mode: CmovMode::Le }, FpFormat::IeeeT, FpFormat::IeeeT),
            fltl::FCMOVGT => (FpOp::Fcmov { taken_when_nonzero: false, mode: CmovMode::Le }, FpFormat::IeeeT, FpFormat::IeeeT),
            fltl::CVTQL | fltl::CVTQL_V | fltl::CVTQL_SV => (FpOp::CvtQuadToLong, FpFormat::Integer, FpFormat::Integer),
            _ => return Err(Trap::IllegalInstruction(raw)),
        },
        _ => unreachable!("caller only dispatches FP-operate opcodes"),
    };

    Ok(Decoded::FpOperate { op, src_fmt, dst_fmt, trapping, rounding_dynamic, fa, fb, fc })
}

fn decode_memory(raw: u32, op: u32) -> Result<Decoded, Trap> {
    let kind = match op {
        OP_LDA => MemOp::Lda,
        OP_LDAH => MemOp::Ldah,
        OP_LDBU => MemOp::LdbU,
        OP_LDQ_U => MemOp::LdqU,
        OP_LDWU => MemOp::LdwU,
        OP_STW => MemOp::Stw,
        OP_STB => MemOp::Stb,
        OP_STQ_U => MemOp::StqU,
        OP_LDF => MemOp::Ldf,
        OP_LDG => MemOp::Ldg,
        OP_LDS => MemOp::Lds,
        OP_LDT => MemOp::Ldt,
        OP_STF => MemOp::Stf,
        OP_STG => MemOp::Stg,
        OP_STS => MemOp::Sts,
        OP_STT => MemOp::Stt,
        OP_LDL => MemOp::Ldl,
        OP_LDQ => MemOp::Ldq,
        OP_LDL_L => MemOp::LdlLocked,
        OP_LDQ_L => MemOp::LdqLocked,
        OP_STL => MemOp::Stl,
        OP_STQ => MemOp::Stq,
        OP_STL_C => MemOp::StlCond,
        OP_STQ_C => MemOp::StqCond,
        _ => return Err(Trap::IllegalInstruction(raw)),
    };
    Ok(Decoded::Memory { op: kind, ra: raw.ra(), rb: raw.rb(), disp: raw.mem_disp() })
}

fn decode_branch(raw: u32, op: u32) -> Result<Decoded, Trap> {
    let (cond, is_float, link) = match op {
        OP_BR => (BranchCond::Always, false, None),
        OP_BSR => (BranchCond::Always, false, Some(raw.ra())),
        OP_BEQ => (BranchCond::Eq, false, None),
        OP_BNE => (BranchCond::Ne, false, None),
        OP_BLT => (BranchCond::Lt, false, None),
        OP_BLE => (BranchCond::Le, false, None),
        OP_BGE => (BranchCond::Ge, false, None),
        OP_BGT => (BranchCond::Gt, false, None),
        OP_BLBC => (BranchCond::LowBitClear, false, None),
        OP_BLBS => (BranchCond::LowBitSet, false, None),
        OP_FBEQ => (BranchCond::Eq, true, None),
        OP_FBNE => (BranchCond::Ne, true, None),
        OP_FBLT => (BranchCond::Lt, true, None),
        OP_FBLE => (BranchCond::Le, true, None),
        OP_FBGE => (BranchCond::Ge, true, None),
        OP_FBGT => (BranchCond::Gt, true, None),
        _ => return Err(Trap::IllegalInstruction(raw)),
    };
    Ok(Decoded::Branch { cond, is_float, link, ra: raw.ra(), disp: raw.branch_disp() })
}

fn decode_jsr(raw: u32) -> Result<Decoded, Trap> {
    let hint_bits = (raw.mem_disp() as u32 >> 14) & 0x3;
    let hint = match hint_bits {
        jsr_hint::JMP => JsrHint::Jmp,
        jsr_hint::JSR => JsrHint::Jsr,
        jsr_hint::RET => JsrHint::Ret,
        jsr_hint::JSR_COROUTINE => JsrHint::JsrCoroutine,
        _ => unreachable!("2-bit field"),
    };
    Ok(Decoded::Jsr { hint, ra: raw.ra(), rb: raw.rb(), disp: raw.mem_disp() })
}

fn decode_misc(raw: u32) -> Result<Decoded, Trap> {
    let func = raw.mem_disp() as u32 & 0xFFFF;
    match func {
        misc::TRAPB => Ok(Decoded::Trapb),
        misc::EXCB => Ok(Decoded::Excb),
        misc::MB => Ok(Decoded::MemoryBarrier),
        misc::WMB => Ok(Decoded::WriteMemoryBarrier),
        misc::FETCH | misc::FETCH_M => Ok(Decoded::Fetch),
        misc::RPCC => Ok(Decoded::Rpcc { rc: raw.rc() }),
        misc::RC | misc::RS | misc::ECB | misc::WH64 | misc::WH64EN => Ok(Decoded::Trapb),
        _ => Err(Trap::IllegalInstruction(raw)),
    }
}

fn decode_fpti(raw: u32) -> Result<Decoded, Trap> {
    // FPTI (0x1C): integer/FP cross-register-file moves and integer-side
    // conditional-move-on-FP-condition forms, plus PERR/MAX extensions not
    // modeled here — anything not one of the register-move forms is illegal.
    let func = raw.func7();
    match func {
        0x70 => Ok(Decoded::HwMfpr { ra: raw.ra(), rb: raw.rb(), index: 0 }), // FTOIT
        0x78 => Ok(Decoded::HwMfpr { ra: raw.ra(), rb: raw.rb(), index: 1 }), // FTOIS
        _ => Err(Trap::IllegalInstruction(raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::instruction::{encode_operate_lit, encode_operate_reg};

    #[test]
    fn addq_decodes_to_generic_add() {
        let raw = encode_operate_reg(OP_INTA, 1, 2, inta::ADDQ, 3);
        let d = decode(raw).unwrap();
        match d {
            Decoded::IntOperate { op, flags, ra, rb, rc } => {
                assert_eq!(op, IntOp::Add);
                assert!(!flags.trap_on_overflow);
                assert_eq!(ra, 1);
                assert_eq!(rb, RegOrLit::Reg(2));
                assert_eq!(rc, 3);
            }
            other => panic!("unexpected decode: {other:?}"),
        }
    }

    #[test]
    fn addq_v_sets_overflow_trap_flag() {
        let raw = encode_operate_reg(OP_INTA, 1, 2, inta::ADDQ_V, 3);
        match decode(raw).unwrap() {
            Decoded::IntOperate { flags, .. } => assert!(flags.trap_on_overflow),
            other => panic!("unexpected decode: {other:?}"),
        }
    }

    #[test]
    fn literal_form_carries_zero_extended_literal() {
        let raw = encode_operate_lit(OP_INTA, 1, 0xFF, inta::ADDQ, 3);
        match decode(raw).unwrap() {
            Decoded::IntOperate { rb, .. } => assert_eq!(rb, RegOrLit::Lit(0xFF)),
            other => panic!("unexpected decode: {other:?}"),
        }
    }

    #[test]
    fn unknown_function_code_is_illegal_instruction() {
        let raw = encode_operate_reg(OP_INTA, 1, 2, 0x7F, 3);
        assert!(matches!(decode(raw), Err(Trap::IllegalInstruction(_))));
    }

    #[test]
    fn unknown_primary_opcode_is_illegal_instruction() {
        let raw = 0x05u32 << 26;
        assert!(matches!(decode(raw), Err(Trap::IllegalInstruction(_))));
    }

    #[test]
    fn ldq_decodes_with_displacement() {
        use crate::isa::instruction::encode_memory;
        let raw = encode_memory(OP_LDQ, 1, 30, 64);
        match decode(raw).unwrap() {
            Decoded::Memory { op, ra, rb, disp } => {
                assert_eq!(op, MemOp::Ldq);
                assert_eq!(ra, 1);
                assert_eq!(rb, 30);
                assert_eq!(disp, 64);
            }
            other => panic!("unexpected decode: {other:?}"),
        }
    }

    #[test]
    fn call_pal_extracts_26_bit_function() {
        let raw = (OP_CALL_PAL << 26) | call_pal::CALLSYS;
        match decode(raw).unwrap() {
            Decoded::CallPal { func } => assert_eq!(func, call_pal::CALLSYS),
            other => panic!("unexpected decode: {other:?}"),
        }
    }

    #[test]
    fn addt_decodes_ieee_t_format() {
        use crate::isa::instruction::encode_operate_reg;
        let raw = encode_operate_reg(OP_FLTI, 1, 2, flti::ADDT, 3);
        match decode(raw).unwrap() {
            Decoded::FpOperate { op, src_fmt, dst_fmt, .. } => {
                assert_eq!(op, FpOp::Add);
                assert_eq!(src_fmt, FpFormat::IeeeT);
                assert_eq!(dst_fmt, FpFormat::IeeeT);
            }
            other => panic!("unexpected decode: {other:?}"),
        }
    }
}
