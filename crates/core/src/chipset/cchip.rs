//! Cchip: system address and coherence controller (spec.md §4.9 item 1).
//!
//! Owns the bulk of the Tsunami CSR space, the per-DRAM-array request
//! queues, and the probe/arbitration/SysDc generation state machine that
//! decides, cycle by cycle, which outstanding CPU command moves forward.

use crate::bus::{CpuCommand, CpuCommandKind, ProbeCommand, ProbeKind, ProbeNextState, SysDc, SysDcCode};
use crate::chipset::csr::Csr;

/// Number of per-array request-queue slots (spec.md §4.9: each DRAM array has
/// its own small queue so arbitration is per-array, not global).
pub const REQUEST_QUEUE_DEPTH: usize = 8;
/// Number of independently-arbitrated DRAM arrays.
pub const DRAM_ARRAYS: usize = 4;

/// One pending request against a DRAM array's queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArrayRequest {
    pub phys_addr: u64,
    pub cpu_id: u32,
    pub tag: u32,
    pub kind: CpuCommandKind,
    pub valid: bool,
    /// Bit `i` set means request `i` targets the same address and is waiting
    /// behind this one (spec.md's addrMatchWait hazard).
    pub addr_match_wait: u8,
    /// Bit `i` set means request `i` is older and must arbitrate first.
    pub older_rqs: u8,
    /// Whether this request's row matches the array's currently open page.
    pub page_hit: bool,
}

impl Default for ArrayRequest {
    fn default() -> Self {
        Self {
            phys_addr: 0,
            cpu_id: 0,
            tag: 0,
            kind: CpuCommandKind::Nop,
            valid: false,
            addr_match_wait: 0,
            older_rqs: 0,
            page_hit: false,
        }
    }
}

/// Maps the command that filled an array request to the `SysDc` code that
/// answers it (spec.md §4.8 item 6). Probe-derived Shared/Dirty distinctions
/// for cross-CPU sharers aren't modeled here (DESIGN.md); this reflects only
/// what the requester itself asked for.
fn response_code_for(kind: CpuCommandKind) -> SysDcCode {
    use CpuCommandKind::*;
    match kind {
        ReadBlk | ReadBlkSpec | ReadBlkVic | ReadBytes | ReadLongWords | ReadQuadWords => SysDcCode::ReadData,
        ReadBlkMod | ReadBlkModSpec => SysDcCode::ReadDataDirty,
        InvalToDirty | ChangeToDirty | SharedToDirty => SysDcCode::ChangeToDirtySuccess,
        WrVictimBlk | CleanVictimBlk | WrBytes | WrLongWords | WrQuadWords => SysDcCode::ReleaseBuffer,
        Mb => SysDcCode::MbDone,
        SetShared | ProbeResponse | Nop => SysDcCode::Nop,
    }
}

/// Arbitration/refresh phase for a single DRAM array (spec.md §4.9 item 1's
/// four-phase request lifecycle: accept, arbitrate, access, complete).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ArrayPhase {
    #[default]
    Idle,
    Arbitrating,
    Accessing { cycles_remaining: u32 },
    Completing,
}

/// One DRAM array's request queue and phase state.
#[derive(Clone, Debug, Default)]
pub struct DramArray {
    pub queue: [ArrayRequest; REQUEST_QUEUE_DEPTH],
    pub phase: ArrayPhase,
    pub open_page: Option<u64>,
    pub winner: Option<usize>,
}

impl DramArray {
    fn page_of(addr: u64, page_bits: u32) -> u64 {
        addr >> page_bits
    }

    /// Accepts a request into the first free queue slot, computing its
    /// hazard bitmasks against already-queued entries.
    pub fn enqueue(&mut self, phys_addr: u64, cpu_id: u32, tag: u32, kind: CpuCommandKind, page_bits: u32) -> bool {
        let Some(slot) = self.queue.iter().position(|r| !r.valid) else {
            return false;
        };
        let mut addr_match_wait = 0u8;
        let mut older_rqs = 0u8;
        for (i, existing) in self.queue.iter().enumerate() {
            if existing.valid {
                older_rqs |= 1 << i;
                if existing.phys_addr == phys_addr {
                    addr_match_wait |= 1 << i;
                }
            }
        }
        let page_hit = self.open_page == Some(Self::page_of(phys_addr, page_bits));
        self.queue[slot] = ArrayRequest { phys_addr, cpu_id, tag, kind, valid: true, addr_match_wait, older_rqs, page_hit };
        true
    }

    /// Advances the array one cycle: arbitrates among ready requests (oldest
    /// with no pending `addr_match_wait` hazard wins), then counts down an
    /// in-progress access.
    pub fn tick(&mut self, access_latency: u32, page_bits: u32) -> Option<ArrayRequest> {
        match self.phase {
            ArrayPhase::Idle => {
                if let Some(winner) = self.pick_winner() {
                    self.open_page = Some(Self::page_of(self.queue[winner].phys_addr, page_bits));
                    let latency = if self.queue[winner].page_hit { access_latency / 2 } else { access_latency };
                    self.winner = Some(winner);
                    self.phase = ArrayPhase::Accessing { cycles_remaining: latency };
                }
                None
            }
            ArrayPhase::Arbitrating => None,
            ArrayPhase::Accessing { cycles_remaining } => {
                if cycles_remaining <= 1 {
                    self.phase = ArrayPhase::Completing;
                } else {
                    self.phase = ArrayPhase::Accessing { cycles_remaining: cycles_remaining - 1 };
                }
                None
            }
            ArrayPhase::Completing => {
                let winner = self.winner.take().expect("completing phase always has a winner");
                let req = self.queue[winner];
                self.queue[winner] = ArrayRequest::default();
                self.clear_hazard_bit(winner);
                self.phase = ArrayPhase::Idle;
                Some(req)
            }
        }
    }

    fn pick_winner(&self) -> Option<usize> {
        self.queue
            .iter()
            .enumerate()
            .filter(|(_, r)| r.valid && r.addr_match_wait == 0)
            .min_by_key(|(_, r)| r.older_rqs.count_ones())
            .map(|(i, _)| i)
    }

    fn clear_hazard_bit(&mut self, idx: usize) {
        let bit = 1u8 << idx;
        for r in self.queue.iter_mut() {
            r.addr_match_wait &= !bit;
            r.older_rqs &= !bit;
        }
    }
}

/// The Cchip's CSR file and DRAM-array request queues.
pub struct Cchip {
    pub csc: Csr,
    pub mtr: Csr,
    pub misc: Csr,
    pub mpd: Csr,
    pub aar: [Csr; 4],
    pub dim: [Csr; 4],
    pub dir: [Csr; 4],
    pub drir: Csr,
    pub prben: Csr,
    pub iic: [Csr; 4],
    pub wdr: Csr,
    pub mpr: [Csr; 4],
    pub ttr: Csr,
    pub tdr: Csr,
    pub pwr: Csr,
    pub cmonctl_a: Csr,
    pub cmonctl_b: Csr,
    pub cmoncnt_01: Csr,
    pub cmoncnt_23: Csr,
    pub arrays: [DramArray; DRAM_ARRAYS],
    pub page_bits: u32,
    pub access_latency: u32,
    next_probe_id: u32,
}

/// `MISC` register bit positions that participate in system-fault routing
/// (spec.md §7 item 2: NXM/error reporting through Cchip status).
pub mod misc_bits {
    pub const NXM: u32 = 12;
    pub const NXS: u32 = 13;
    pub const ACL: u32 = 20;
    pub const IPI: u32 = 8;
}

impl Cchip {
    pub fn new(page_bits: u32, access_latency: u32) -> Self {
        Self {
            csc: Csr::new(0),
            mtr: Csr::new(0),
            misc: Csr::masked(0, 0x00FF_FFFF),
            mpd: Csr::new(0),
            aar: [Csr::new(0); 4],
            dim: [Csr::new(0); 4],
            dir: [Csr::new(0); 4],
            drir: Csr::new(0),
            prben: Csr::new(0),
            iic: [Csr::new(0); 4],
            wdr: Csr::new(0),
            mpr: [Csr::new(0); 4],
            ttr: Csr::new(0),
            tdr: Csr::new(0),
            pwr: Csr::new(0),
            cmonctl_a: Csr::new(0),
            cmonctl_b: Csr::new(0),
            cmoncnt_01: Csr::new(0),
            cmoncnt_23: Csr::new(0),
            arrays: Default::default(),
            page_bits,
            access_latency,
            next_probe_id: 0,
        }
    }

    /// Records a non-existent-memory access in `MISC.NXM` and raises the
    /// corresponding bit in `DRIR` so each CPU's pending-interrupt summary
    /// reflects it (spec.md §7 item 2).
    pub fn report_nxm(&mut self, cpu_id: u32) {
        self.misc.set_bit(misc_bits::NXM, true);
        self.misc.set_field(8, 9, cpu_id as u64);
        self.drir.set_bit(cpu_id, true);
    }

    /// Accepts an inbound command into the DRAM array it targets, chosen by
    /// the low array-select bits of the physical address (spec.md §4.9 item 1
    /// interleaving).
    pub fn accept(&mut self, cmd: &CpuCommand, cpu_id: u32) -> bool {
        let array = ((cmd.phys_addr >> 6) as usize) % DRAM_ARRAYS;
        self.arrays[array].enqueue(cmd.phys_addr, cpu_id, cmd.id, cmd.kind, self.page_bits)
    }

    /// Advances every DRAM array's arbitration/access state machine by one
    /// cycle, returning any requests that completed this cycle along with
    /// the [`SysDc`] response that answers them.
    pub fn tick(&mut self) -> Vec<(ArrayRequest, SysDc)> {
        let mut completed = Vec::new();
        for array in self.arrays.iter_mut() {
            if let Some(req) = array.tick(self.access_latency, self.page_bits) {
                let sysdc = SysDc::ack(response_code_for(req.kind), req.tag);
                completed.push((req, sysdc));
            }
        }
        completed
    }

    /// Builds the probe the Cchip must broadcast to other CPUs before a
    /// `ReadBlk`/`ReadBlkMod` can be satisfied from DRAM (spec.md §4.8 item 3).
    pub fn make_probe(&mut self, phys_addr: u64, exclusive: bool) -> ProbeCommand {
        let id = self.next_probe_id;
        self.next_probe_id = self.next_probe_id.wrapping_add(1);
        ProbeCommand {
            kind: if exclusive { ProbeKind::ReadDirty } else { ProbeKind::ReadAny },
            next_state: if exclusive { ProbeNextState::Transition1 } else { ProbeNextState::CleanShared },
            phys_addr,
            id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::CpuCommandKind;

    #[test]
    fn enqueue_records_older_and_addr_match_hazards() {
        let mut arr = DramArray::default();
        assert!(arr.enqueue(0x1000, 0, 1, CpuCommandKind::ReadBlk, 13));
        assert!(arr.enqueue(0x1000, 1, 2, CpuCommandKind::ReadBlk, 13));
        assert_eq!(arr.queue[1].addr_match_wait, 0b01);
        assert_eq!(arr.queue[1].older_rqs, 0b01);
    }

    #[test]
    fn second_matching_request_waits_behind_first() {
        let mut arr = DramArray::default();
        arr.enqueue(0x2000, 0, 1, CpuCommandKind::ReadBlk, 13);
        arr.enqueue(0x2000, 1, 2, CpuCommandKind::ReadBlk, 13);
        assert_eq!(arr.pick_winner(), Some(0));
    }

    #[test]
    fn tick_completes_after_access_latency() {
        let mut arr = DramArray::default();
        arr.enqueue(0x3000, 0, 9, CpuCommandKind::ReadBlkMod, 13);
        let mut completed = None;
        for _ in 0..10 {
            if let Some(r) = arr.tick(3, 13) {
                completed = Some(r);
                break;
            }
        }
        let completed = completed.unwrap();
        assert_eq!(completed.tag, 9);
        assert_eq!(completed.kind, CpuCommandKind::ReadBlkMod);
    }

    #[test]
    fn response_code_reflects_command_kind() {
        assert_eq!(response_code_for(CpuCommandKind::ReadBlk), SysDcCode::ReadData);
        assert_eq!(response_code_for(CpuCommandKind::ReadBlkMod), SysDcCode::ReadDataDirty);
        assert_eq!(response_code_for(CpuCommandKind::WrVictimBlk), SysDcCode::ReleaseBuffer);
    }

    #[test]
    fn report_nxm_sets_misc_bit_and_drir() {
        let mut c = Cchip::new(13, 20);
        c.report_nxm(2);
        assert!(c.misc.bit(misc_bits::NXM));
        assert!(c.drir.bit(2));
    }

    #[test]
    fn accept_routes_to_array_by_address() {
        let mut c = Cchip::new(13, 20);
        let cmd = CpuCommand::new(CpuCommandKind::ReadBlk, 0x40, 0);
        assert!(c.accept(&cmd, 0));
    }
}
