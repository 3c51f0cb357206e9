//! Error and exception types (spec.md §7).
//!
//! Three kinds, each with distinct propagation: architectural exceptions
//! ([`Trap`]) are recorded per-instruction and drained at retirement; system
//! errors ([`SystemFault`]) are routed through the chipset's error bits and an
//! interrupt; internal invariant violations ([`SimPanic`]) are unrecoverable and
//! abort the process.

use thiserror::Error;

/// Which pipeline stage first detected an architectural exception, needed so
/// retirement knows whether the faulting instruction itself completed any
/// partial effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExceptionStage {
    /// Detected during fetch (instruction access violation, TB miss).
    Fetch,
    /// Detected during decode (illegal instruction).
    Decode,
    /// Detected during execute (arithmetic trap).
    Execute,
    /// Detected during the memory stage (access violation, TB miss, unaligned).
    Memory,
}

/// Architectural exceptions and interrupts (spec.md §7 item 1).
///
/// Recorded in an instruction's exception mask during execute; at retirement the
/// Ibox drains all younger in-flight instructions, switches to PAL mode, and sets
/// the PC to the corresponding PAL entry point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum Trap {
    /// Opcode (or function-field combination) not present in the decode tables.
    #[error("illegal instruction {0:#010x}")]
    IllegalInstruction(u32),
    /// Invalid-operation, divide-by-zero, overflow, underflow, or inexact FP trap.
    #[error("arithmetic trap: {0}")]
    ArithmeticTrap(ArithmeticTrapKind),
    /// Access-mode protection check failed (K/E/S/U read/write/execute bits).
    #[error("access violation at {0:#018x}")]
    AccessViolation(u64),
    /// Protection bits permit the mode but the fault-on-{read,write,execute} bit
    /// for the page is set.
    #[error("fault on {1} at {0:#018x}")]
    FaultOn(u64, FaultKind),
    /// ITB miss: no matching translation, PALcode must refill.
    #[error("instruction TB miss at {0:#018x}")]
    ItbMiss(u64),
    /// DTB miss: no matching translation, PALcode must refill.
    #[error("data TB miss at {0:#018x}")]
    DtbMiss(u64),
    /// Double TB miss (miss while already servicing a miss).
    #[error("double TB miss at {0:#018x}")]
    DoubleTbMiss(u64),
    /// Memory reference address was not naturally aligned for its size.
    #[error("unaligned access at {0:#018x}")]
    Unaligned(u64),
    /// `CALL_PAL BPT`/`BUGCHK`-class software breakpoint.
    #[error("breakpoint at {0:#018x}")]
    Breakpoint(u64),
    /// `CALL_PAL BUGCHK`.
    #[error("bugcheck at {0:#018x}")]
    Bugcheck(u64),
    /// Uncorrectable internal machine check (distinct from a [`SystemFault`]
    /// NXM/ECC error, which arrives asynchronously via the chipset interrupt).
    #[error("machine check at {0:#018x}")]
    MachineCheck(u64),
}

/// The five IEEE/VAX arithmetic trap kinds (spec.md §4.5 item 4).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithmeticTrapKind {
    /// Invalid operation (e.g. 0/0, signaling NaN operand).
    Invalid,
    /// Division by zero with a finite, nonzero dividend.
    DivByZero,
    /// Result magnitude exceeds the destination format's range.
    Overflow,
    /// Result magnitude is nonzero but smaller than the format can represent
    /// normally.
    Underflow,
    /// Result required rounding and trap-on-inexact is enabled.
    Inexact,
    /// Integer-operate overflow trap (`/V` instruction forms).
    IntegerOverflow,
}

impl std::fmt::Display for ArithmeticTrapKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Invalid => "invalid",
            Self::DivByZero => "div-by-zero",
            Self::Overflow => "overflow",
            Self::Underflow => "underflow",
            Self::Inexact => "inexact",
            Self::IntegerOverflow => "integer-overflow",
        };
        write!(f, "{s}")
    }
}

/// Which access mode triggered a `FaultOn` trap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultKind {
    /// Fault-on-read bit set for this page.
    Read,
    /// Fault-on-write bit set for this page.
    Write,
    /// Fault-on-execute bit set for this page (instruction fetch).
    Execute,
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Execute => "execute",
        };
        write!(f, "{s}")
    }
}

/// System errors (spec.md §7 item 2): routed to the system-fault PAL entry via
/// the Cchip's `MISC.NXM`/`DIR` error bits plus an interrupt, rather than
/// unwinding the Rust call stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SystemFault {
    /// Request addressed a physical address with no backing memory array.
    #[error("non-existent memory at {0:#018x}")]
    NonExistentMemory(u64),
    /// Uncorrectable ECC error reported for a DRAM access.
    #[error("ECC error at {0:#018x}")]
    EccError(u64),
    /// Parity error detected on the system bus.
    #[error("bus parity error")]
    BusParity,
    /// A probe response or SysDc arrived that violated the expected protocol
    /// state machine transition.
    #[error("probe protocol violation: {0}")]
    ProbeProtocolViolation(&'static str),
}

/// Internal invariant violations (spec.md §7 item 3): unrecoverable by
/// definition, since they indicate the simulator itself is in an inconsistent
/// state. Callers are expected to `panic!` with this payload rather than
/// propagate it as a `Result`.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SimPanic {
    /// A physical register was pushed to the free list while already free.
    #[error("free list double-push of physical register {0}")]
    FreeListDoublePush(u32),
    /// The ROB was asked to allocate past its fixed capacity.
    #[error("ROB overflow: capacity {0} exceeded")]
    RobOverflow(usize),
    /// A decoded opcode slipped past decode but has no registered executor.
    #[error("unknown opcode {0:#04x} reached execute")]
    UnknownOpcodeAtExecute(u32),
}
