//! Cycle-accurate core for a four-way superscalar, out-of-order Alpha-class CPU.
//!
//! This crate implements:
//! 1. **Core:** fetch/predict/decode/rename (Ibox), out-of-order issue across four
//!    integer clusters and two floating-point clusters (Ebox/Fbox), a reorder
//!    buffer with precise rollback, and a memory execution unit (Mbox) with load
//!    and store queues.
//! 2. **System interface:** the CPU-side of the system bus (Cbox) — miss-address
//!    file, victim buffer, I/O write buffer, inbound probe queue — and the chipset
//!    that completes every memory transaction (Cchip coherence/DRAM arbiter, Dchip
//!    data mover, Pchip PCI bridge).
//! 3. **ISA:** instruction encoding/decoding for the memory, branch, operate,
//!    floating-point-operate, PAL, and `HW_*` formats.
//! 4. **Simulation:** a `System` tying one or more CPUs to the chipset, a flat
//!    binary loader, and per-cycle statistics.
//!
//! Device emulation (disks, Ethernet, a telnet console) and PALcode images are out
//! of scope: the system-bus protocol and chipset register surface are modeled, but
//! nothing consumes them beyond what the protocol itself requires.

/// Address types, trap/error types, and other small shared building blocks.
pub mod common;
/// Simulator configuration (defaults, hierarchical config structures).
pub mod config;
/// CPU core: physical register file, architectural state, caches, TLBs, the
/// out-of-order backend, the memory execution unit, and the system interface.
pub mod core;
/// Instruction set: encoding formats and decode tables.
pub mod isa;
/// CPU-to-system and system-to-CPU bus message types.
pub mod bus;
/// Chipset: Cchip (coherence/DRAM arbiter), Dchip (data mover), Pchip (PCI bridge).
pub mod chipset;
/// Top-level `System`, binary loader, and simulation driver.
pub mod sim;
/// Per-cycle statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// Single CPU core: PRF, caches, TLBs, out-of-order backend, Mbox, Cbox.
pub use crate::core::cpu::Cpu;
/// Top-level system: one or more CPUs plus the chipset.
pub use crate::sim::simulator::System;
