//! Shared address, program-counter, and error types used across the core.

/// Physical and virtual address newtypes, and the PC (pal-mode bit + word-aligned
/// instruction address).
pub mod addr;
/// Trap, system-fault, and internal-invariant error types.
pub mod error;

pub use addr::{PhysAddr, ProgramCounter, VirtAddr};
pub use error::{SimPanic, SystemFault, Trap};
