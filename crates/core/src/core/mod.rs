//! CPU core: register renaming, out-of-order backend, and the memory/system
//! execution units (spec.md §4).

/// Architectural register numbering and PAL-mode shadow registers.
pub mod arch;
/// Cbox: outstanding-request tracking and the system-bus protocol.
pub mod cbox;
/// Top-level `Cpu`: wires Ibox/Mbox/Cbox/PRF/ROB/issue queues together.
pub mod cpu;
/// Ibox: fetch, decode, rename.
pub mod ibox;
/// Mbox: load/store queues, Dcache access, lock-flag tracking.
pub mod mbox;
/// Out-of-order engine: reorder buffer, issue queues, execution units.
pub mod ooo;
/// Physical register file and free-list-managed renaming.
pub mod prf;
/// Caches, TLBs, branch predictor, and the floating-point unit.
pub mod units;
