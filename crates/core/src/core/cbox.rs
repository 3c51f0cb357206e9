//! Cbox: outstanding-request tracking and the outbound system-bus protocol
//! (spec.md §4.4 item 6 / §4.8).
//!
//! Owns the four structures that track a CPU's in-flight system requests:
//! the miss-address file (MAF) for Dcache/Icache fills, the victim data
//! buffer (VDB) for dirty-line writebacks, the I/O write buffer (IOWB) for
//! uncached stores, and the probe queue (PQ) for inbound coherence probes
//! awaiting a response.

use crate::bus::{CpuCommand, CpuCommandKind, ProbeCommand, SysDc};

pub const MAF_ENTRIES: usize = 8;
pub const VDB_ENTRIES: usize = 8;
pub const IOWB_ENTRIES: usize = 4;
pub const PQ_ENTRIES: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MafState {
    Free,
    Requested,
    Completed,
}

#[derive(Clone, Copy, Debug)]
pub struct MafEntry {
    pub state: MafState,
    pub phys_addr: u64,
    pub tag: u32,
    pub exclusive: bool,
}

impl Default for MafEntry {
    fn default() -> Self {
        Self { state: MafState::Free, phys_addr: 0, tag: 0, exclusive: false }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct VdbEntry {
    pub valid: bool,
    pub phys_addr: u64,
    pub data: [u64; 8],
}

#[derive(Clone, Copy, Debug, Default)]
pub struct IowbEntry {
    pub valid: bool,
    pub phys_addr: u64,
    pub data: u64,
    pub mask: u8,
}

#[derive(Clone, Copy, Debug)]
pub struct PqEntry {
    pub valid: bool,
    pub probe: ProbeCommand,
}

/// The Cbox's outstanding-request storage for one CPU.
pub struct Cbox {
    pub maf: [MafEntry; MAF_ENTRIES],
    pub vdb: [VdbEntry; VDB_ENTRIES],
    pub iowb: [IowbEntry; IOWB_ENTRIES],
    pub pq: Vec<PqEntry>,
    next_tag: u32,
}

impl Cbox {
    pub fn new() -> Self {
        Self {
            maf: [MafEntry::default(); MAF_ENTRIES],
            vdb: [VdbEntry::default(); VDB_ENTRIES],
            iowb: [IowbEntry::default(); IOWB_ENTRIES],
            pq: Vec::with_capacity(PQ_ENTRIES),
            next_tag: 0,
        }
    }

    /// Allocates a MAF entry for a Dcache/Icache miss and returns the
    /// [`CpuCommand`] to issue, or `None` if the MAF is full (the miss must
    /// be retried).
    pub fn request_fill(&mut self, phys_addr: u64, exclusive: bool) -> Option<CpuCommand> {
        let idx = self.maf.iter().position(|e| e.state == MafState::Free)?;
        let tag = self.next_tag;
        self.next_tag = self.next_tag.wrapping_add(1);
        self.maf[idx] = MafEntry { state: MafState::Requested, phys_addr, tag, exclusive };
        let kind = if exclusive { CpuCommandKind::ReadBlkMod } else { CpuCommandKind::ReadBlk };
        Some(CpuCommand::new(kind, phys_addr, tag))
    }

    /// Matches an inbound [`SysDc`] against the MAF, freeing the entry and
    /// returning the physical address the fill data belongs to.
    pub fn complete_fill(&mut self, sysdc: &SysDc) -> Option<u64> {
        let entry = self.maf.iter_mut().find(|e| e.state == MafState::Requested && e.tag == sysdc.id)?;
        let addr = entry.phys_addr;
        *entry = MafEntry::default();
        Some(addr)
    }

    /// Allocates a VDB entry for a dirty-line writeback evicted by a fill.
    pub fn writeback(&mut self, phys_addr: u64, data: [u64; 8]) -> Option<CpuCommand> {
        let idx = self.vdb.iter().position(|e| !e.valid)?;
        self.vdb[idx] = VdbEntry { valid: true, phys_addr, data };
        let mut cmd = CpuCommand::new(CpuCommandKind::WrVictimBlk, phys_addr, idx as u32);
        cmd.data = data;
        Some(cmd)
    }

    pub fn release_vdb(&mut self, idx: usize) {
        self.vdb[idx] = VdbEntry::default();
    }

    /// Buffers an uncached I/O-space store.
    pub fn issue_io_write(&mut self, phys_addr: u64, data: u64, mask: u8) -> Option<CpuCommand> {
        let idx = self.iowb.iter().position(|e| !e.valid)?;
        self.iowb[idx] = IowbEntry { valid: true, phys_addr, data, mask };
        let mut cmd = CpuCommand::new(CpuCommandKind::WrQuadWords, phys_addr, idx as u32);
        cmd.mask = mask;
        cmd.data[0] = data;
        Some(cmd)
    }

    pub fn release_iowb(&mut self, idx: usize) {
        self.iowb[idx] = IowbEntry::default();
    }

    /// Queues an inbound probe for the Mbox to service (spec.md §4.8 item 3).
    pub fn accept_probe(&mut self, probe: ProbeCommand) -> bool {
        if self.pq.len() >= PQ_ENTRIES {
            return false;
        }
        self.pq.push(PqEntry { valid: true, probe });
        true
    }

    /// Pops the oldest queued probe for the Mbox to answer this cycle.
    pub fn next_probe(&mut self) -> Option<ProbeCommand> {
        if self.pq.is_empty() {
            None
        } else {
            Some(self.pq.remove(0).probe)
        }
    }

    /// Builds the outbound `ProbeResponse` command once the Mbox has
    /// determined the line's data/coherence disposition.
    pub fn probe_response(&self, phys_addr: u64, id: u32, data: [u64; 8]) -> CpuCommand {
        let mut cmd = CpuCommand::new(CpuCommandKind::ProbeResponse, phys_addr, id);
        cmd.data = data;
        cmd
    }

    pub fn maf_free_count(&self) -> usize {
        self.maf.iter().filter(|e| e.state == MafState::Free).count()
    }

    /// Tag of an already-outstanding request for `phys_addr`, if any, so a
    /// second miss to the same line can be folded into the first instead of
    /// allocating a redundant MAF entry.
    pub fn maf_tag_for(&self, phys_addr: u64) -> Option<u32> {
        self.maf.iter().find(|e| e.state == MafState::Requested && e.phys_addr == phys_addr).map(|e| e.tag)
    }
}

impl Default for Cbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::SysDcCode;

    #[test]
    fn request_fill_allocates_maf_and_returns_readblk() {
        let mut cbox = Cbox::new();
        let cmd = cbox.request_fill(0x1000, false).unwrap();
        assert_eq!(cmd.kind, CpuCommandKind::ReadBlk);
        assert_eq!(cbox.maf_free_count(), MAF_ENTRIES - 1);
    }

    #[test]
    fn complete_fill_frees_matching_maf_entry() {
        let mut cbox = Cbox::new();
        let cmd = cbox.request_fill(0x2000, true).unwrap();
        let sysdc = SysDc::ack(SysDcCode::ReadDataDirty, cmd.id);
        let addr = cbox.complete_fill(&sysdc).unwrap();
        assert_eq!(addr, 0x2000);
        assert_eq!(cbox.maf_free_count(), MAF_ENTRIES);
    }

    #[test]
    fn maf_exhaustion_returns_none() {
        let mut cbox = Cbox::new();
        for i in 0..MAF_ENTRIES {
            assert!(cbox.request_fill(0x1000 * i as u64, false).is_some());
        }
        assert!(cbox.request_fill(0x9999, false).is_none());
    }

    #[test]
    fn probes_served_in_fifo_order() {
        use crate::bus::{ProbeKind, ProbeNextState};
        let mut cbox = Cbox::new();
        let p1 = ProbeCommand { kind: ProbeKind::ReadAny, next_state: ProbeNextState::Clean, phys_addr: 1, id: 1 };
        let p2 = ProbeCommand { kind: ProbeKind::ReadAny, next_state: ProbeNextState::Clean, phys_addr: 2, id: 2 };
        cbox.accept_probe(p1);
        cbox.accept_probe(p2);
        assert_eq!(cbox.next_probe().unwrap().id, 1);
        assert_eq!(cbox.next_probe().unwrap().id, 2);
    }
}
