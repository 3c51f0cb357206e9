//! Reorder buffer: in-order retirement over out-of-order completion (spec.md
//! §4.4 item 1).
//!
//! Each entry remembers the architectural destination it renamed and the
//! physical register it displaced (`prev_dest`), so a misprediction or
//! exception can roll the rename map back to exactly the state it had before
//! the flushed instructions issued.

use crate::common::addr::ProgramCounter;
use crate::common::error::{SimPanic, Trap};

/// Opaque handle identifying one in-flight instruction's ROB slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RobTag(pub u32);

/// An entry's lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RobState {
    Issued,
    Completed,
    Faulted,
}

/// A CSR/IPR write captured for undo on a flush (HW_MTPR instructions are
/// speculative like everything else; spec.md §4.4 notes they must be
/// rewindable).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CsrUpdate {
    pub index: u32,
    pub old_val: u64,
    pub new_val: u64,
}

/// The architectural-register rename this instruction performed, carried so
/// a flush can restore the previous mapping (spec.md §4.4 item 2).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenameInfo {
    pub arch_reg: usize,
    pub is_fp: bool,
    pub new_phys: u32,
    pub old_phys: u32,
}

#[derive(Clone, Debug)]
pub struct RobEntry {
    pub tag: RobTag,
    pub pc: ProgramCounter,
    pub inst_raw: u32,
    pub rename: Option<RenameInfo>,
    pub result: u64,
    pub store_addr: Option<u64>,
    pub store_data: Option<u64>,
    pub state: RobState,
    pub trap: Option<Trap>,
    pub csr_update: Option<CsrUpdate>,
    pub valid: bool,
}

impl RobEntry {
    fn empty() -> Self {
        Self {
            tag: RobTag(0),
            pc: ProgramCounter::default(),
            inst_raw: 0,
            rename: None,
            result: 0,
            store_addr: None,
            store_data: None,
            state: RobState::Issued,
            trap: None,
            csr_update: None,
            valid: false,
        }
    }
}

/// A fixed-capacity circular reorder buffer.
pub struct Rob {
    entries: Vec<RobEntry>,
    head: usize,
    tail: usize,
    count: usize,
    next_tag: u32,
}

impl Rob {
    pub fn new(capacity: usize) -> Self {
        Self { entries: vec![RobEntry::empty(); capacity], head: 0, tail: 0, count: 0, next_tag: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == self.entries.len()
    }

    pub fn free_slots(&self) -> usize {
        self.entries.len() - self.count
    }

    /// Allocates a new entry at the tail for a freshly renamed/issued
    /// instruction.
    pub fn allocate(
        &mut self,
        pc: ProgramCounter,
        inst_raw: u32,
        rename: Option<RenameInfo>,
    ) -> Result<RobTag, SimPanic> {
        if self.is_full() {
            return Err(SimPanic::RobOverflow(self.entries.len()));
        }
        let tag = RobTag(self.next_tag);
        self.next_tag = self.next_tag.wrapping_add(1);
        let idx = self.tail;
        self.entries[idx] = RobEntry { tag, pc, inst_raw, rename, valid: true, ..RobEntry::empty() };
        self.tail = (self.tail + 1) % self.entries.len();
        self.count += 1;
        Ok(tag)
    }

    fn find_index(&self, tag: RobTag) -> Option<usize> {
        self.entries.iter().position(|e| e.valid && e.tag == tag)
    }

    /// Records a successful execution result.
    pub fn complete(&mut self, tag: RobTag, result: u64) {
        if let Some(idx) = self.find_index(tag) {
            self.entries[idx].result = result;
            self.entries[idx].state = RobState::Completed;
        }
    }

    /// Records an execution-time exception; retirement will drain younger
    /// instructions when this entry reaches the head.
    pub fn fault(&mut self, tag: RobTag, trap: Trap) {
        if let Some(idx) = self.find_index(tag) {
            self.entries[idx].state = RobState::Faulted;
            self.entries[idx].trap = Some(trap);
        }
    }

    pub fn set_csr_update(&mut self, tag: RobTag, update: CsrUpdate) {
        if let Some(idx) = self.find_index(tag) {
            self.entries[idx].csr_update = Some(update);
        }
    }

    pub fn set_store_info(&mut self, tag: RobTag, addr: u64, data: u64) {
        if let Some(idx) = self.find_index(tag) {
            self.entries[idx].store_addr = Some(addr);
            self.entries[idx].store_data = Some(data);
        }
    }

    /// The oldest in-flight entry, if any.
    pub fn peek_head(&self) -> Option<&RobEntry> {
        if self.count == 0 { None } else { Some(&self.entries[self.head]) }
    }

    /// Removes the head entry from the ROB once retirement has committed it.
    pub fn commit_head(&mut self) -> Option<RobEntry> {
        if self.count == 0 {
            return None;
        }
        let entry = std::mem::replace(&mut self.entries[self.head], RobEntry::empty());
        self.head = (self.head + 1) % self.entries.len();
        self.count -= 1;
        Some(entry)
    }

    /// Flushes every entry (a full pipeline restart, e.g. after an exception
    /// drains the whole ROB).
    pub fn flush_all(&mut self) -> Vec<RobEntry> {
        let mut drained = Vec::with_capacity(self.count);
        while let Some(e) = self.commit_head() {
            drained.push(e);
        }
        drained
    }

    /// Flushes every entry younger than `tag` (a branch misprediction:
    /// `tag`'s own result stands, everything issued after it is squashed).
    /// Returns the squashed entries, oldest first, for rename-map rollback.
    pub fn flush_after(&mut self, tag: RobTag) -> Vec<RobEntry> {
        let Some(keep_idx) = self.find_index(tag) else {
            return Vec::new();
        };
        let mut squashed = Vec::new();
        loop {
            let last_idx = (self.tail + self.entries.len() - 1) % self.entries.len();
            if self.count == 0 || last_idx == keep_idx {
                break;
            }
            let entry = std::mem::replace(&mut self.entries[last_idx], RobEntry::empty());
            self.tail = last_idx;
            self.count -= 1;
            squashed.push(entry);
        }
        squashed.reverse();
        squashed
    }

    pub fn for_each_valid(&self, mut f: impl FnMut(&RobEntry)) {
        let mut idx = self.head;
        for _ in 0..self.count {
            f(&self.entries[idx]);
            idx = (idx + 1) % self.entries.len();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pc(addr: u64) -> ProgramCounter {
        ProgramCounter::new(addr, false)
    }

    #[test]
    fn allocate_and_commit_preserve_fifo_order() {
        let mut rob = Rob::new(4);
        let t0 = rob.allocate(pc(0), 0, None).unwrap();
        let t1 = rob.allocate(pc(4), 0, None).unwrap();
        assert_eq!(rob.commit_head().unwrap().tag, t0);
        assert_eq!(rob.commit_head().unwrap().tag, t1);
    }

    #[test]
    fn allocate_past_capacity_errors() {
        let mut rob = Rob::new(1);
        rob.allocate(pc(0), 0, None).unwrap();
        assert_eq!(rob.allocate(pc(4), 0, None), Err(SimPanic::RobOverflow(1)));
    }

    #[test]
    fn complete_then_peek_head_shows_result() {
        let mut rob = Rob::new(4);
        let t0 = rob.allocate(pc(0), 0, None).unwrap();
        rob.complete(t0, 42);
        assert_eq!(rob.peek_head().unwrap().result, 42);
        assert_eq!(rob.peek_head().unwrap().state, RobState::Completed);
    }

    #[test]
    fn flush_after_squashes_only_younger_entries() {
        let mut rob = Rob::new(8);
        let t0 = rob.allocate(pc(0), 0, None).unwrap();
        let _t1 = rob.allocate(pc(4), 0, None).unwrap();
        let _t2 = rob.allocate(pc(8), 0, None).unwrap();
        let _t3 = rob.allocate(pc(12), 0, None).unwrap();
        let _t4 = rob.allocate(pc(16), 0, None).unwrap();
        let squashed = rob.flush_after(t0);
        assert_eq!(squashed.len(), 4);
        assert_eq!(rob.len(), 1);
    }

    #[test]
    fn flush_all_drains_every_entry() {
        let mut rob = Rob::new(4);
        rob.allocate(pc(0), 0, None).unwrap();
        rob.allocate(pc(4), 0, None).unwrap();
        let drained = rob.flush_all();
        assert_eq!(drained.len(), 2);
        assert!(rob.is_empty());
    }

    #[test]
    fn fault_sets_state_and_trap() {
        let mut rob = Rob::new(4);
        let t0 = rob.allocate(pc(0), 0, None).unwrap();
        rob.fault(t0, Trap::IllegalInstruction(0xdead));
        assert_eq!(rob.peek_head().unwrap().state, RobState::Faulted);
        assert!(rob.peek_head().unwrap().trap.is_some());
    }
}
