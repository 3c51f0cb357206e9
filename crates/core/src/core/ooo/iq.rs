//! Issue queues: out-of-order instruction selection (spec.md §4.4 item 3).
//!
//! The integer engine's two clusters (upper/lower, each split into an
//! arithmetic and an address/multiply sub-cluster) and the single floating-
//! point queue share this generic scoreboard-driven selection logic; the
//! cluster identity is carried as data, not duplicated code.

use crate::core::ooo::rob::RobTag;

/// Which execution cluster an issue-queue entry targets (spec.md §2: the
/// integer engine's four single-issue clusters, L0/L1/U0/U1, plus the
/// floating multiply/other split).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cluster {
    IntL0,
    IntL1,
    IntU0,
    IntU1,
    FpMultiply,
    FpOther,
}

/// A source operand's readiness: either a physical register still awaiting
/// its producer, or a value already available.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    Waiting(u32),
    Ready,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryState {
    Waiting,
    ReadyToIssue,
    Issued,
    /// Issued speculatively under a load that later missed scoreboard replay
    /// (spec.md §4.4 item 3's single-replay-on-miss rule) and must reissue.
    Aborted,
}

#[derive(Clone, Copy, Debug)]
pub struct IqEntry {
    pub tag: RobTag,
    pub cluster: Cluster,
    pub src1: Source,
    pub src2: Source,
    pub state: EntryState,
    pub age: u64,
}

/// A single cluster's issue queue.
pub struct IssueQueue {
    entries: Vec<IqEntry>,
    capacity: usize,
}

impl IssueQueue {
    pub fn new(capacity: usize) -> Self {
        Self { entries: Vec::with_capacity(capacity), capacity }
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn insert(&mut self, entry: IqEntry) -> bool {
        if self.is_full() {
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// Broadcasts a producer's completion: any waiting source matching
    /// `phys_reg` becomes ready.
    pub fn wakeup(&mut self, phys_reg: u32) {
        for e in self.entries.iter_mut() {
            if e.src1 == Source::Waiting(phys_reg) {
                e.src1 = Source::Ready;
            }
            if e.src2 == Source::Waiting(phys_reg) {
                e.src2 = Source::Ready;
            }
            if e.src1 == Source::Ready && e.src2 == Source::Ready && e.state == EntryState::Waiting {
                e.state = EntryState::ReadyToIssue;
            }
        }
    }

    /// Selects the oldest ready entry for issue this cycle, marking it
    /// issued and removing it from the queue.
    pub fn select_oldest_ready(&mut self) -> Option<IqEntry> {
        let idx = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.state == EntryState::ReadyToIssue)
            .min_by_key(|(_, e)| e.age)
            .map(|(i, _)| i)?;
        Some(self.entries.remove(idx))
    }

    /// Reinstates an entry that issued speculatively under a load but must
    /// replay because the load missed (spec.md §4.4 item 3).
    pub fn abort_and_reinsert(&mut self, mut entry: IqEntry) {
        entry.state = EntryState::ReadyToIssue;
        self.entries.push(entry);
    }

    /// Removes every entry belonging to a squashed (flushed) instruction set,
    /// identified by the caller via `tags`.
    pub fn flush(&mut self, tags: &[RobTag]) {
        self.entries.retain(|e| !tags.contains(&e.tag));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(tag: u32, age: u64, src1: Source, src2: Source) -> IqEntry {
        IqEntry { tag: RobTag(tag), cluster: Cluster::IntL0, src1, src2, state: EntryState::Waiting, age }
    }

    #[test]
    fn wakeup_promotes_both_sources_ready() {
        let mut iq = IssueQueue::new(4);
        iq.insert(entry(0, 0, Source::Waiting(5), Source::Waiting(6)));
        iq.wakeup(5);
        assert_eq!(iq.entries[0].state, EntryState::Waiting);
        iq.wakeup(6);
        assert_eq!(iq.entries[0].state, EntryState::ReadyToIssue);
    }

    #[test]
    fn select_oldest_ready_picks_lowest_age() {
        let mut iq = IssueQueue::new(4);
        iq.insert(entry(0, 5, Source::Ready, Source::Ready));
        iq.insert(entry(1, 2, Source::Ready, Source::Ready));
        iq.entries[0].state = EntryState::ReadyToIssue;
        iq.entries[1].state = EntryState::ReadyToIssue;
        let picked = iq.select_oldest_ready().unwrap();
        assert_eq!(picked.tag, RobTag(1));
    }

    #[test]
    fn abort_and_reinsert_makes_entry_selectable_again() {
        let mut iq = IssueQueue::new(4);
        let mut e = entry(0, 0, Source::Ready, Source::Ready);
        e.state = EntryState::Aborted;
        iq.abort_and_reinsert(e);
        let picked = iq.select_oldest_ready();
        assert!(picked.is_some());
    }

    #[test]
    fn flush_removes_matching_tags() {
        let mut iq = IssueQueue::new(4);
        iq.insert(entry(0, 0, Source::Ready, Source::Ready));
        iq.insert(entry(1, 1, Source::Ready, Source::Ready));
        iq.flush(&[RobTag(0)]);
        assert_eq!(iq.len(), 1);
    }
}
