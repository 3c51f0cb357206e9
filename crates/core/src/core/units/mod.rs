//! Execution and memory-hierarchy units shared by the Ibox/Mbox/Ebox/Fbox.

pub mod bpred;
pub mod dcache;
pub mod fpu;
pub mod icache;
pub mod tlb;
