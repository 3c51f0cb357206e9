//! Physical register file and free-list-managed renaming (spec.md §4.3).
//!
//! Separate integer and floating-point pools, each sized to cover the 32
//! architectural registers plus enough renaming headroom for every in-flight
//! instruction's destination (spec.md §2: 41 integer, 41 floating-point).

use crate::common::error::SimPanic;

/// A physical register's lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrfState {
    /// On the free list, not mapped to any architectural register.
    Free,
    /// Mapped to an architectural register; the producing instruction has
    /// not yet written its result.
    PendingUpdate,
    /// Mapped to an architectural register and holds a committed value.
    Valid,
}

/// One pool of physical registers (used once for integers, once for FP).
pub struct PhysicalRegisterFile {
    values: Vec<u64>,
    state: Vec<PrfState>,
    ref_count: Vec<u32>,
    free_list: Vec<u32>,
    /// Current architectural-register → physical-register mapping.
    arch_map: Vec<u32>,
}

impl PhysicalRegisterFile {
    /// `architectural_count` is 32 (R0-31 or F0-31); `physical_count` must
    /// exceed it by the renaming headroom spec.md §2 calls for.
    pub fn new(architectural_count: usize, physical_count: usize) -> Self {
        assert!(physical_count > architectural_count);
        let mut arch_map = vec![0u32; architectural_count];
        let mut state = vec![PrfState::Free; physical_count];
        let mut ref_count = vec![0u32; physical_count];
        for (arch_reg, phys) in arch_map.iter_mut().enumerate() {
            *phys = arch_reg as u32;
            state[arch_reg] = PrfState::Valid;
            ref_count[arch_reg] = 1;
        }
        let free_list = ((architectural_count as u32)..(physical_count as u32)).rev().collect();
        Self { values: vec![0u64; physical_count], state, ref_count, free_list, arch_map }
    }

    /// The physical register currently mapped to architectural register `r`.
    #[inline]
    pub fn map(&self, arch_reg: usize) -> u32 {
        self.arch_map[arch_reg]
    }

    /// Renames architectural register `arch_reg` to a fresh physical
    /// register, returning `(new_phys, old_phys)`. `old_phys` is retained
    /// (not freed) until the renaming instruction retires, so a younger
    /// misprediction can roll back to it.
    pub fn rename(&mut self, arch_reg: usize) -> Result<(u32, u32), SimPanic> {
        let new_phys = self.free_list.pop().ok_or(SimPanic::RobOverflow(self.values.len()))?;
        let old_phys = self.arch_map[arch_reg];
        self.state[new_phys as usize] = PrfState::PendingUpdate;
        self.ref_count[new_phys as usize] = 1;
        self.arch_map[arch_reg] = new_phys;
        Ok((new_phys, old_phys))
    }

    /// Writes a completed instruction's result into its destination physical
    /// register.
    pub fn write(&mut self, phys: u32, value: u64) {
        self.values[phys as usize] = value;
        self.state[phys as usize] = PrfState::Valid;
    }

    pub fn read(&self, phys: u32) -> u64 {
        self.values[phys as usize]
    }

    pub fn state(&self, phys: u32) -> PrfState {
        self.state[phys as usize]
    }

    /// Restores `arch_reg`'s mapping to `phys` directly (used for
    /// misprediction/exception rollback, spec.md §4.4 item 2's
    /// prevDestMap/prevDestValue undo).
    pub fn restore_map(&mut self, arch_reg: usize, phys: u32) {
        self.arch_map[arch_reg] = phys;
    }

    /// Releases `phys` back to the free list once no older mapping still
    /// references it (called at retirement for the instruction's overwritten
    /// previous destination).
    pub fn free(&mut self, phys: u32) -> Result<(), SimPanic> {
        if self.state[phys as usize] == PrfState::Free {
            return Err(SimPanic::FreeListDoublePush(phys));
        }
        self.state[phys as usize] = PrfState::Free;
        self.free_list.push(phys);
        Ok(())
    }

    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    pub fn physical_count(&self) -> usize {
        self.values.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn architectural_registers_start_identity_mapped() {
        let prf = PhysicalRegisterFile::new(32, 41);
        assert_eq!(prf.map(5), 5);
        assert_eq!(prf.state(5), PrfState::Valid);
    }

    #[test]
    fn rename_allocates_from_free_list_and_updates_map() {
        let mut prf = PhysicalRegisterFile::new(32, 41);
        let free_before = prf.free_count();
        let (new_phys, old_phys) = prf.rename(3).unwrap();
        assert_eq!(old_phys, 3);
        assert!(new_phys >= 32);
        assert_eq!(prf.map(3), new_phys);
        assert_eq!(prf.free_count(), free_before - 1);
    }

    #[test]
    fn free_then_double_free_panics_with_named_error() {
        let mut prf = PhysicalRegisterFile::new(32, 41);
        let (new_phys, _) = prf.rename(1).unwrap();
        prf.free(new_phys).unwrap();
        assert_eq!(prf.free(new_phys), Err(SimPanic::FreeListDoublePush(new_phys)));
    }

    #[test]
    fn free_count_plus_mapped_count_is_invariant() {
        let mut prf = PhysicalRegisterFile::new(32, 41);
        let total = prf.physical_count();
        let mut mapped = 32;
        for r in 0..5 {
            prf.rename(r).unwrap();
            mapped += 1;
        }
        assert_eq!(prf.free_count() + mapped, total);
    }

    #[test]
    fn restore_map_rolls_back_rename() {
        let mut prf = PhysicalRegisterFile::new(32, 41);
        let (new_phys, old_phys) = prf.rename(7).unwrap();
        assert_eq!(prf.map(7), new_phys);
        prf.restore_map(7, old_phys);
        assert_eq!(prf.map(7), old_phys);
    }
}
