//! Instruction encoding: field extraction, opcode constants, and decode.

pub mod decode;
pub mod instruction;
pub mod opcodes;

pub use decode::{
    BranchCond, CmovMode, Decoded, FpFormat, FpOp, IntOp, IntOpFlags, JsrHint, MemOp, RegOrLit, decode,
};
pub use instruction::InstructionBits;
