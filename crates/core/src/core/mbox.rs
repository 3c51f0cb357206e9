//! Mbox: load/store queue, Dcache access, and lock-flag tracking for
//! `LDx_L`/`STx_C` (spec.md §4.4 item 5 / §4.6).

use crate::core::ooo::rob::RobTag;
use crate::core::units::dcache::{CoherenceState, Dcache, Lookup as DcacheLookup};

/// A pending store, still speculative until its ROB entry retires.
#[derive(Clone, Copy, Debug)]
pub struct StoreQueueEntry {
    pub tag: RobTag,
    pub addr: u64,
    pub size: u8,
    pub data: u64,
    pub retired: bool,
}

/// A pending load, tracked so a later-discovered store-address collision can
/// be detected (the ROB/IQ replay path spec.md §4.4 item 3 describes).
#[derive(Clone, Copy, Debug)]
pub struct LoadQueueEntry {
    pub tag: RobTag,
    pub addr: u64,
    pub size: u8,
}

/// Result of issuing a load against the store queue and Dcache.
pub enum LoadResult {
    /// Forwarded directly from an older, address-matching store.
    Forwarded(u64),
    /// Serviced from the Dcache.
    CacheHit(u64),
    /// Not resident; caller must issue a Cbox fill request.
    CacheMiss { line_base: u64 },
}

pub struct Mbox {
    pub dcache: Dcache,
    pub store_queue: Vec<StoreQueueEntry>,
    pub load_queue: Vec<LoadQueueEntry>,
    /// Set by `LDx_L`, cleared by any intervening store-conditional success,
    /// retired ordinary store to the same line, or inbound coherence probe
    /// (spec.md §4.6 item 2).
    lock_flag: bool,
    lock_addr: Option<u64>,
}

impl Mbox {
    pub fn new() -> Self {
        Self { dcache: Dcache::new(), store_queue: Vec::new(), load_queue: Vec::new(), lock_flag: false, lock_addr: None }
    }

    /// Issues a store into the queue; it becomes visible to loads
    /// immediately (store-to-load forwarding) but only commits to the
    /// Dcache once `retire_store` confirms the instruction is architectural.
    pub fn issue_store(&mut self, tag: RobTag, addr: u64, size: u8, data: u64) {
        self.store_queue.push(StoreQueueEntry { tag, addr, size, data, retired: false });
    }

    /// Issues a load, forwarding from the youngest older store that fully
    /// covers the address if one exists, otherwise consulting the Dcache.
    pub fn issue_load(&mut self, tag: RobTag, addr: u64, size: u8) -> LoadResult {
        // A load that stalled on a full MAF is reissued by the same ROB tag
        // on a later cycle; replace its stale entry rather than duplicate it.
        self.load_queue.retain(|l| l.tag != tag);
        self.load_queue.push(LoadQueueEntry { tag, addr, size });
        if let Some(entry) = self.store_queue.iter().rev().find(|s| s.addr == addr && s.size >= size) {
            return LoadResult::Forwarded(entry.data);
        }
        match self.dcache.lookup(addr) {
            DcacheLookup::Hit { set, way } => {
                let mut bytes = [0u8; 8];
                for i in 0..size as usize {
                    bytes[i] = self.dcache.read_byte(set, way, (addr as usize % 64) + i);
                }
                LoadResult::CacheHit(u64::from_le_bytes(bytes))
            }
            DcacheLookup::Miss { line_base, .. } => LoadResult::CacheMiss { line_base },
        }
    }

    /// Commits a retired store to the Dcache (requires the line already be
    /// held Exclusive/Dirty; a miss here is a caller bug since the store
    /// must have acquired ownership before issuing).
    pub fn retire_store(&mut self, tag: RobTag) {
        if let Some(entry) = self.store_queue.iter_mut().find(|s| s.tag == tag) {
            entry.retired = true;
            let addr = entry.addr;
            let data = entry.data.to_le_bytes();
            let size = entry.size as usize;
            if let DcacheLookup::Hit { set, way } = self.dcache.lookup(addr) {
                for i in 0..size {
                    self.dcache.write_byte(set, way, (addr as usize % 64) + i, data[i]);
                }
            }
            if self.lock_addr == Some(addr & !7) {
                self.lock_flag = false;
            }
        }
        self.store_queue.retain(|s| !(s.tag == tag && s.retired));
    }

    /// `LDx_L`: records the lock address and arms the lock flag.
    pub fn load_locked(&mut self, addr: u64) {
        self.lock_flag = true;
        self.lock_addr = Some(addr & !7);
    }

    /// `STx_C`: succeeds only if the lock flag is still armed for this
    /// address; either way the flag is disarmed afterward (spec.md §4.6
    /// item 2 / §8 scenarios 4-5).
    pub fn store_conditional(&mut self, addr: u64) -> bool {
        let success = self.lock_flag && self.lock_addr == Some(addr & !7);
        self.lock_flag = false;
        success
    }

    /// Invalidates the lock flag if an inbound coherence probe targets the
    /// locked line (spec.md §8 scenario 5: a probe between `LDQ_L` and
    /// `STQ_C` must fail the conditional store).
    pub fn probe_invalidates_lock(&mut self, phys_addr: u64) {
        if self.lock_addr == Some(phys_addr & !7) {
            self.lock_flag = false;
        }
    }

    /// Installs a Dcache fill in the given coherence state, completing a
    /// prior miss.
    pub fn fill(&mut self, set: usize, line_base: u64, data: [u8; 64], state: CoherenceState) {
        self.dcache.fill(set, line_base, data, state);
    }

    /// Removes every store/load-queue entry belonging to a squashed
    /// instruction set.
    pub fn flush(&mut self, tags: &[RobTag]) {
        self.store_queue.retain(|s| !tags.contains(&s.tag));
        self.load_queue.retain(|l| !tags.contains(&l.tag));
    }
}

impl Default for Mbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_forwards_from_younger_matching_store() {
        let mut mbox = Mbox::new();
        mbox.issue_store(RobTag(0), 0x100, 8, 0xDEAD_BEEF);
        match mbox.issue_load(RobTag(1), 0x100, 8) {
            LoadResult::Forwarded(v) => assert_eq!(v, 0xDEAD_BEEF),
            _ => panic!("expected forward"),
        }
    }

    #[test]
    fn load_without_matching_store_misses_empty_cache() {
        let mut mbox = Mbox::new();
        match mbox.issue_load(RobTag(0), 0x4000, 8) {
            LoadResult::CacheMiss { .. } => {}
            _ => panic!("expected cache miss"),
        }
    }

    #[test]
    fn store_conditional_succeeds_when_lock_intact() {
        let mut mbox = Mbox::new();
        mbox.load_locked(0x200);
        assert!(mbox.store_conditional(0x200));
    }

    #[test]
    fn store_conditional_fails_after_probe_invalidation() {
        let mut mbox = Mbox::new();
        mbox.load_locked(0x200);
        mbox.probe_invalidates_lock(0x200);
        assert!(!mbox.store_conditional(0x200));
    }

    #[test]
    fn store_conditional_disarms_lock_regardless_of_outcome() {
        let mut mbox = Mbox::new();
        mbox.load_locked(0x300);
        assert!(mbox.store_conditional(0x300));
        assert!(!mbox.store_conditional(0x300));
    }
}
