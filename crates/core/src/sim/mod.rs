//! Top-level simulation driver: the flat-binary loader and the multi-CPU
//! `System` that ties one or more [`crate::core::cpu::Cpu`]s to the
//! [`crate::chipset::Chipset`] (spec.md §2, §9).

/// Reads a flat binary image from disk.
pub mod loader;
/// `System`: owns every CPU and the chipset, and drives the per-cycle loop.
pub mod simulator;
