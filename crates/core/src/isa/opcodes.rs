//! Primary opcode and function-code constants (spec.md §6).
//!
//! Named after the architecture's own mnemonics; grouped by the primary
//! 6-bit opcode field. Function-code groups (`INTA`/`INTL`/`INTS`/`INTM` for
//! integer-operate, `ITFP`/`FLTV`/`FLTI`/`FLTL` for FP-operate, `MISC`/`FPTI`
//! for the miscellaneous/hardware groups) list only the values this simulator
//! recognizes — everything else falls through to `Trap::IllegalInstruction`.

// Memory format.
pub const OP_LDA: u32 = 0x08;
pub const OP_LDAH: u32 = 0x09;
pub const OP_LDBU: u32 = 0x0A;
pub const OP_LDQ_U: u32 = 0x0B;
pub const OP_LDWU: u32 = 0x0C;
pub const OP_STW: u32 = 0x0D;
pub const OP_STB: u32 = 0x0E;
pub const OP_STQ_U: u32 = 0x0F;
pub const OP_LDF: u32 = 0x20;
pub const OP_LDG: u32 = 0x21;
pub const OP_LDS: u32 = 0x22;
pub const OP_LDT: u32 = 0x23;
pub const OP_STF: u32 = 0x24;
pub const OP_STG: u32 = 0x25;
pub const OP_STS: u32 = 0x26;
pub const OP_STT: u32 = 0x27;
pub const OP_LDL: u32 = 0x28;
pub const OP_LDQ: u32 = 0x29;
pub const OP_LDL_L: u32 = 0x2A;
pub const OP_LDQ_L: u32 = 0x2B;
pub const OP_STL: u32 = 0x2C;
pub const OP_STQ: u32 = 0x2D;
pub const OP_STL_C: u32 = 0x2E;
pub const OP_STQ_C: u32 = 0x2F;

// Branch format.
pub const OP_BR: u32 = 0x30;
pub const OP_FBEQ: u32 = 0x31;
pub const OP_FBLT: u32 = 0x32;
pub const OP_FBLE: u32 = 0x33;
pub const OP_BSR: u32 = 0x34;
pub const OP_FBNE: u32 = 0x35;
pub const OP_FBGE: u32 = 0x36;
pub const OP_FBGT: u32 = 0x37;
pub const OP_BLBC: u32 = 0x38;
pub const OP_BEQ: u32 = 0x39;
pub const OP_BLT: u32 = 0x3A;
pub const OP_BLE: u32 = 0x3B;
pub const OP_BLBS: u32 = 0x3C;
pub const OP_BNE: u32 = 0x3D;
pub const OP_BGE: u32 = 0x3E;
pub const OP_BGT: u32 = 0x3F;

// Operate (integer) format.
pub const OP_INTA: u32 = 0x10;
pub const OP_INTL: u32 = 0x11;
pub const OP_INTS: u32 = 0x12;
pub const OP_INTM: u32 = 0x13;

// Operate (floating point) format.
pub const OP_ITFP: u32 = 0x14;
pub const OP_FLTV: u32 = 0x15;
pub const OP_FLTI: u32 = 0x16;
pub const OP_FLTL: u32 = 0x17;

// PAL and miscellaneous.
pub const OP_CALL_PAL: u32 = 0x00;
pub const OP_MISC: u32 = 0x18;
pub const OP_JSR: u32 = 0x1A;
pub const OP_FPTI: u32 = 0x1C;
pub const OP_HW_MFPR: u32 = 0x19;
pub const OP_HW_LD: u32 = 0x1B;
pub const OP_HW_MTPR: u32 = 0x1D;
pub const OP_HW_RET: u32 = 0x1E;
pub const OP_HW_ST: u32 = 0x1F;

/// `JSR`-format (shares the Memory-format layout) hint sub-field, bits `[15:14]`
/// of the displacement, distinguishing `JMP`/`JSR`/`RET`/`JSR_COROUTINE`.
pub mod jsr_hint {
    pub const JMP: u32 = 0b00;
    pub const JSR: u32 = 0b01;
    pub const RET: u32 = 0b10;
    pub const JSR_COROUTINE: u32 = 0b11;
}

/// `INTA` (0x10) function codes.
pub mod inta {
    pub const ADDL: u32 = 0x00;
    pub const ADDL_V: u32 = 0x40;
    pub const SUBL: u32 = 0x09;
    pub const SUBL_V: u32 = 0x49;
    pub const CMPBGE: u32 = 0x0F;
    pub const ADDQ: u32 = 0x20;
    pub const ADDQ_V: u32 = 0x60;
    pub const SUBQ: u32 = 0x29;
    pub const SUBQ_V: u32 = 0x69;
    pub const CMPULT: u32 = 0x1D;
    pub const CMPEQ: u32 = 0x2D;
    pub const CMPULE: u32 = 0x3D;
    pub const CMPLT: u32 = 0x4D;
    pub const CMPLE: u32 = 0x6D;
}

/// `INTL` (0x11) function codes.
pub mod intl {
    pub const AND: u32 = 0x00;
    pub const BIC: u32 = 0x08;
    pub const BIS: u32 = 0x20;
    pub const ORNOT: u32 = 0x28;
    pub const XOR: u32 = 0x40;
    pub const EQV: u32 = 0x48;
    pub const CMOVLBS: u32 = 0x14;
    pub const CMOVLBC: u32 = 0x16;
    pub const CMOVEQ: u32 = 0x24;
    pub const CMOVNE: u32 = 0x26;
    pub const CMOVLT: u32 = 0x44;
    pub const CMOVGE: u32 = 0x46;
    pub const CMOVLE: u32 = 0x64;
    pub const CMOVGT: u32 = 0x66;
    pub const AMASK: u32 = 0x61;
    pub const IMPLVER: u32 = 0x6C;
}

/// `INTS` (0x12) function codes.
pub mod ints {
    pub const MSKBL: u32 = 0x02;
    pub const EXTBL: u32 = 0x06;
    pub const INSBL: u32 = 0x0B;
    pub const MSKWL: u32 = 0x12;
    pub const EXTWL: u32 = 0x16;
    pub const INSWL: u32 = 0x1B;
    pub const MSKLL: u32 = 0x22;
    pub const EXTLL: u32 = 0x26;
    pub const INSLL: u32 = 0x2B;
    pub const ZAP: u32 = 0x30;
    pub const ZAPNOT: u32 = 0x31;
    pub const MSKQL: u32 = 0x32;
    pub const SRL: u32 = 0x34;
    pub const EXTQL: u32 = 0x36;
    pub const SLL: u32 = 0x39;
    pub const INSQL: u32 = 0x3B;
    pub const SRA: u32 = 0x3C;
    pub const MSKWH: u32 = 0x52;
    pub const INSWH: u32 = 0x57;
    pub const EXTWH: u32 = 0x5A;
    pub const MSKLH: u32 = 0x62;
    pub const INSLH: u32 = 0x67;
    pub const EXTLH: u32 = 0x6A;
    pub const MSKQH: u32 = 0x72;
    pub const INSQH: u32 = 0x77;
    pub const EXTQH: u32 = 0x7A;
}

/// `INTM` (0x13) function codes.
pub mod intm {
    pub const MULL: u32 = 0x00;
    pub const MULL_V: u32 = 0x40;
    pub const MULQ: u32 = 0x20;
    pub const MULQ_V: u32 = 0x60;
    pub const UMULH: u32 = 0x30;
}

/// `ITFP` (0x14) function codes: integer-to-FP and FP-to-integer conversions.
pub mod itfp {
    pub const ITOFS: u32 = 0x004;
    pub const ITOFF: u32 = 0x014;
    pub const ITOFT: u32 = 0x024;
    pub const SQRTF_C: u32 = 0x00A;
    pub const SQRTS_C: u32 = 0x08A;
    pub const SQRTG_C: u32 = 0x02A;
    pub const SQRTT_C: u32 = 0x0AA;
}

/// `FLTV` (0x15) function codes: VAX F/G-format FP arithmetic.
pub mod fltv {
    pub const ADDF_C: u32 = 0x000;
    pub const SUBF_C: u32 = 0x001;
    pub const MULF_C: u32 = 0x002;
    pub const DIVF_C: u32 = 0x003;
    pub const CVTDG_C: u32 = 0x01E;
    pub const ADDG_C: u32 = 0x020;
    pub const SUBG_C: u32 = 0x021;
    pub const MULG_C: u32 = 0x022;
    pub const DIVG_C: u32 = 0x023;
    pub const CVTGF_C: u32 = 0x02C;
    pub const CVTGD_C: u32 = 0x02D;
    pub const CVTGQ_C: u32 = 0x02F;
    pub const CVTQF_C: u32 = 0x03C;
    pub const CVTQG_C: u32 = 0x03E;
    pub const CMPGEQ: u32 = 0x025;
    pub const CMPGLT: u32 = 0x026;
    pub const CMPGLE: u32 = 0x027;
}

/// `FLTI` (0x16) function codes: IEEE S/T-format FP arithmetic.
pub mod flti {
    pub const ADDS: u32 = 0x080;
    pub const SUBS: u32 = 0x081;
    pub const MULS: u32 = 0x082;
    pub const DIVS: u32 = 0x083;
    pub const ADDT: u32 = 0x0A0;
    pub const SUBT: u32 = 0x0A1;
    pub const MULT: u32 = 0x0A2;
    pub const DIVT: u32 = 0x0A3;
    pub const CMPTUN: u32 = 0x0A4;
    pub const CMPTEQ: u32 = 0x0A5;
    pub const CMPTLT: u32 = 0x0A6;
    pub const CMPTLE: u32 = 0x0A7;
    pub const CMPTGEQ_SU: u32 = 0x5A5;
    pub const CVTTS: u32 = 0x0AC;
    pub const CVTTQ: u32 = 0x0AF;
    pub const CVTQS: u32 = 0x0BC;
    pub const CVTQT: u32 = 0x0BE;
    pub const CVTST: u32 = 0x2AC;
}

/// `FLTL` (0x17) function codes: FP register-move and classification.
pub mod fltl {
    pub const CVTLQ: u32 = 0x010;
    pub const CPYS: u32 = 0x020;
    pub const CPYSN: u32 = 0x021;
    pub const CPYSE: u32 = 0x022;
    pub const MT_FPCR: u32 = 0x024;
    pub const MF_FPCR: u32 = 0x025;
    pub const FCMOVEQ: u32 = 0x02A;
    pub const FCMOVNE: u32 = 0x02B;
    pub const FCMOVLT: u32 = 0x02C;
    pub const FCMOVGE: u32 = 0x02D;
    pub const FCMOVLE: u32 = 0x02E;
    pub const FCMOVGT: u32 = 0x02F;
    pub const CVTQL: u32 = 0x030;
    pub const CVTQL_V: u32 = 0x130;
    pub const CVTQL_SV: u32 = 0x530;
}

/// `MISC` (0x18) function codes (the 16-bit `mem_disp` field, not `func7`).
pub mod misc {
    pub const TRAPB: u32 = 0x0000;
    pub const EXCB: u32 = 0x0400;
    pub const MB: u32 = 0x4000;
    pub const WMB: u32 = 0x4400;
    pub const FETCH: u32 = 0x8000;
    pub const FETCH_M: u32 = 0xA000;
    pub const RPCC: u32 = 0xC000;
    pub const RC: u32 = 0xE000;
    pub const ECB: u32 = 0xE800;
    pub const RS: u32 = 0xF000;
    pub const WH64: u32 = 0xF800;
    pub const WH64EN: u32 = 0xFC00;
}

/// `CALL_PAL` function-field values this simulator recognizes (spec.md's
/// scope keeps console/PALcode emulation minimal — only the entry points the
/// ROB/retirement logic must recognize to route exceptions are listed here).
pub mod call_pal {
    pub const HALT: u32 = 0x0000;
    pub const DRAINA: u32 = 0x0002;
    pub const BPT: u32 = 0x0080;
    pub const BUGCHK: u32 = 0x0081;
    pub const CALLSYS: u32 = 0x0083;
    pub const RDUNIQUE: u32 = 0x009E;
    pub const WRUNIQUE: u32 = 0x009F;
    pub const GENTRAP: u32 = 0x00AA;
}
