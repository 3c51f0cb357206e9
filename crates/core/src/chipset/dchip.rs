//! Dchip: PADbus data-movement switch (spec.md §4.9 item 2).
//!
//! Moves cache-line data between a CPU's Cbox and the Cchip/Pchips over the
//! two-phase PADbus protocol; carries no coherence logic of its own.

use crate::chipset::csr::Csr;

/// Which half of a cache line is in flight this PADbus phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PadPhase {
    Idle,
    Low,
    High,
}

/// A single in-flight PADbus transfer.
#[derive(Clone, Copy, Debug)]
pub struct PadTransfer {
    pub cpu_id: u32,
    pub tag: u32,
    pub data: [u64; 8],
    pub phase: PadPhase,
}

pub struct Dchip {
    pub dsc: Csr,
    pub str_: Csr,
    pub drev: Csr,
    pub dsc2: Csr,
    in_flight: Vec<PadTransfer>,
}

impl Dchip {
    pub fn new() -> Self {
        Self { dsc: Csr::new(0), str_: Csr::new(0), drev: Csr::new(1), dsc2: Csr::new(0), in_flight: Vec::new() }
    }

    /// Begins moving a cache line, low quadwords first (spec.md's two-phase
    /// mover: low half one stutter cycle, high half the next).
    pub fn begin_transfer(&mut self, cpu_id: u32, tag: u32, data: [u64; 8]) {
        self.in_flight.push(PadTransfer { cpu_id, tag, data, phase: PadPhase::Low });
    }

    /// Advances every in-flight transfer one stutter cycle, returning
    /// transfers that have delivered both halves.
    pub fn tick(&mut self) -> Vec<PadTransfer> {
        let mut done = Vec::new();
        self.in_flight.retain_mut(|t| match t.phase {
            PadPhase::Idle => false,
            PadPhase::Low => {
                t.phase = PadPhase::High;
                true
            }
            PadPhase::High => {
                done.push(*t);
                false
            }
        });
        done
    }
}

impl Default for Dchip {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_completes_after_two_stutter_cycles() {
        let mut d = Dchip::new();
        d.begin_transfer(0, 5, [1; 8]);
        assert!(d.tick().is_empty());
        let done = d.tick();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].tag, 5);
    }

    #[test]
    fn drev_resets_to_one() {
        let d = Dchip::new();
        assert_eq!(d.drev.read(), 1);
    }
}
