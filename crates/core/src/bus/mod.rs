//! CPU-to-system and system-to-CPU bus protocol (spec.md §4.8-§4.9).
//!
//! The Cbox issues [`CpuCommand`]s outward and receives [`ProbeCommand`]s and
//! [`SysDc`] responses back from the chipset; this module defines the shared
//! vocabulary both sides speak, independent of either CPU or chipset state.

/// A command the Cbox issues onto the system bus, grounded in the 21264's
/// `Cmd[3:0]` encoding plus the sideband fields the probe/response protocol
/// needs (spec.md §4.8 item 2).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CpuCommandKind {
    Nop,
    ProbeResponse,
    WrVictimBlk,
    CleanVictimBlk,
    ReadBlk,
    ReadBlkMod,
    ReadBlkSpec,
    ReadBlkModSpec,
    ReadBlkVic,
    InvalToDirty,
    ChangeToDirty,
    SharedToDirty,
    Mb,
    SetShared,
    ReadBytes,
    ReadLongWords,
    ReadQuadWords,
    WrBytes,
    WrLongWords,
    WrQuadWords,
}

/// A command issued by the Cbox, carrying the physical address, identifying
/// fields, and (for writes) up to a full cache line of data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CpuCommand {
    pub kind: CpuCommandKind,
    pub phys_addr: u64,
    /// Probe/outstanding-request tag (maps to MAF/VDB/IOWB/PQ entry index).
    pub id: u32,
    /// Byte mask for partial-quadword I/O-space reads/writes.
    pub mask: u8,
    /// Cache-line data for victim writebacks and full-line I/O writes.
    pub data: [u64; 8],
}

impl CpuCommand {
    pub fn new(kind: CpuCommandKind, phys_addr: u64, id: u32) -> Self {
        Self { kind, phys_addr, id, mask: 0xFF, data: [0; 8] }
    }
}

/// Requested coherence state transition carried on a probe (spec.md §4.8 item 3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeKind {
    Nop,
    ReadHit,
    ReadDirty,
    ReadAny,
}

/// Next-state directive attached to a probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeNextState {
    Nop,
    Clean,
    CleanShared,
    Transition1,
    Transition3,
}

/// A probe sent from the chipset down to a CPU's Cbox, asking it to supply
/// data and/or change a cache line's coherence state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProbeCommand {
    pub kind: ProbeKind,
    pub next_state: ProbeNextState,
    pub phys_addr: u64,
    pub id: u32,
}

/// `SysDc` response codes the chipset returns to a CPU's Cbox to complete an
/// outstanding command (spec.md §4.8 item 4).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SysDcCode {
    Nop,
    ReadDataError,
    ChangeToDirtySuccess,
    ChangeToDirtyFail,
    MbDone,
    ReleaseBuffer,
    WriteData,
    ReadData,
    ReadDataDirty,
    ReadDataShared,
    ReadDataSharedDirty,
}

/// A `SysDc` response, carrying the completion code, the id it answers, and
/// (for reads) the returned cache line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SysDc {
    pub code: SysDcCode,
    pub id: u32,
    pub data: [u64; 8],
}

impl SysDc {
    pub fn ack(code: SysDcCode, id: u32) -> Self {
        Self { code, id, data: [0; 8] }
    }

    pub fn with_data(code: SysDcCode, id: u32, data: [u64; 8]) -> Self {
        Self { code, id, data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_command_defaults_to_full_mask_and_zeroed_data() {
        let cmd = CpuCommand::new(CpuCommandKind::ReadBlk, 0x1000, 3);
        assert_eq!(cmd.mask, 0xFF);
        assert_eq!(cmd.data, [0u64; 8]);
        assert_eq!(cmd.id, 3);
    }

    #[test]
    fn sysdc_ack_carries_no_data() {
        let r = SysDc::ack(SysDcCode::ChangeToDirtySuccess, 7);
        assert_eq!(r.data, [0u64; 8]);
    }
}
