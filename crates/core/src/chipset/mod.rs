//! The Tsunami (21274) chipset: Cchip, Dchip, and two Pchips (spec.md §2).

pub mod cchip;
pub mod csr;
pub mod dchip;
pub mod pchip;

use crate::bus::{CpuCommand, ProbeCommand, SysDc};
use cchip::Cchip;
use dchip::Dchip;
use pchip::Pchip;

/// The full chipset, as seen by every CPU's Cbox: one Cchip, one Dchip, and
/// two Pchips (one per PCI bus).
pub struct Chipset {
    pub cchip: Cchip,
    pub dchip: Dchip,
    pub pchips: [Pchip; 2],
}

impl Chipset {
    pub fn new(page_bits: u32, dram_access_latency: u32) -> Self {
        Self {
            cchip: Cchip::new(page_bits, dram_access_latency),
            dchip: Dchip::new(),
            pchips: [Pchip::new(), Pchip::new()],
        }
    }

    /// Accepts an inbound CPU command, routing it to the Cchip's DRAM
    /// arrays unless it falls in a Pchip's linear PCI window.
    pub fn accept(&mut self, cmd: &CpuCommand, cpu_id: u32) -> bool {
        for pchip in &self.pchips {
            if pchip.classify_linear(cmd.phys_addr).is_some() {
                // Device emulation is out of scope (spec.md non-goals); the
                // command is accepted and acknowledged with no side effect.
                return true;
            }
        }
        self.cchip.accept(cmd, cpu_id)
    }

    /// Advances the Cchip's arbitration/DRAM state machine and the Dchip's
    /// data mover by one cycle, returning completed [`SysDc`] responses
    /// paired with the id of the CPU each one answers.
    pub fn tick(&mut self) -> Vec<(u32, SysDc)> {
        let completed = self.cchip.tick();
        let mut responses = Vec::with_capacity(completed.len());
        for (req, sysdc) in completed {
            self.dchip.begin_transfer(req.cpu_id, req.tag, [0; 8]);
            responses.push((req.cpu_id, sysdc));
        }
        responses
    }

    /// Builds a coherence probe for a read-exclusive or read-shared request,
    /// to be broadcast to every other CPU's Cbox before the Cchip answers
    /// from DRAM (spec.md §4.8 item 3).
    pub fn probe_for(&mut self, phys_addr: u64, exclusive: bool) -> ProbeCommand {
        self.cchip.make_probe(phys_addr, exclusive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::CpuCommandKind;

    #[test]
    fn command_in_pchip_window_bypasses_cchip_arrays() {
        let mut c = Chipset::new(13, 20);
        let cmd = CpuCommand::new(CpuCommandKind::ReadQuadWords, pchip::linear_base::MEM + 8, 1);
        assert!(c.accept(&cmd, 0));
    }

    #[test]
    fn command_outside_pchip_window_queues_in_cchip() {
        let mut c = Chipset::new(13, 20);
        let cmd = CpuCommand::new(CpuCommandKind::ReadBlk, 0x40, 1);
        assert!(c.accept(&cmd, 0));
    }
}
