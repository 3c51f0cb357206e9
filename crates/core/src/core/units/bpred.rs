//! Tournament branch predictor and return-address stack (spec.md §4.1).
//!
//! Local history (1024×10-bit) feeds a 1024×3-bit local predictor; a 12-bit
//! global path history feeds a 4096×2-bit global predictor and a 4096×2-bit
//! chooser that picks between the two. A separate return-address stack
//! predicts `RET` targets.

/// Saturating up/down counter, shared by the local, global, and chooser
/// tables (widths differ per table but the update rule is identical).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SatCounter {
    value: u8,
    max: u8,
}

impl SatCounter {
    fn new(max: u8) -> Self {
        Self { value: max / 2 + 1, max }
    }

    fn taken(&self) -> bool {
        self.value > self.max / 2
    }

    fn update(&mut self, actual_taken: bool) {
        if actual_taken {
            self.value = self.value.saturating_add(1).min(self.max);
        } else {
            self.value = self.value.saturating_sub(1);
        }
    }
}

const LOCAL_HISTORY_ENTRIES: usize = 1024;
const LOCAL_HISTORY_BITS: u32 = 10;
const LOCAL_PREDICTOR_MAX: u8 = 7; // 3-bit counter
const GLOBAL_TABLE_ENTRIES: usize = 4096;
const GLOBAL_PREDICTOR_MAX: u8 = 3; // 2-bit counter
const GLOBAL_PATH_BITS: u32 = 12;

/// Outcome fed back to [`TournamentPredictor::update`] once a branch resolves.
#[derive(Clone, Copy, Debug)]
pub struct BranchOutcome {
    pub pc: u64,
    pub taken: bool,
    pub target: u64,
}

/// A direction/target prediction made at fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Prediction {
    pub taken: bool,
    pub target: Option<u64>,
    /// Whether the local or global component was trusted, needed to credit
    /// the right counter on misprediction feedback.
    pub(crate) used_local: bool,
}

pub struct TournamentPredictor {
    local_history: Vec<u16>,
    local_pht: Vec<SatCounter>,
    global_pht: Vec<SatCounter>,
    choice_pht: Vec<SatCounter>,
    global_history: u16,
    btb: std::collections::HashMap<u64, u64>,
}

impl TournamentPredictor {
    pub fn new() -> Self {
        Self {
            local_history: vec![0u16; LOCAL_HISTORY_ENTRIES],
            local_pht: vec![SatCounter::new(LOCAL_PREDICTOR_MAX); LOCAL_HISTORY_ENTRIES],
            global_pht: vec![SatCounter::new(GLOBAL_PREDICTOR_MAX); GLOBAL_TABLE_ENTRIES],
            choice_pht: vec![SatCounter::new(GLOBAL_PREDICTOR_MAX); GLOBAL_TABLE_ENTRIES],
            global_history: 0,
            btb: std::collections::HashMap::new(),
        }
    }

    fn local_index(pc: u64) -> usize {
        ((pc >> 2) as usize) % LOCAL_HISTORY_ENTRIES
    }

    fn global_index(&self) -> usize {
        (self.global_history as usize) % GLOBAL_TABLE_ENTRIES
    }

    /// Predicts the direction and (from the BTB) target for a branch at `pc`.
    pub fn predict(&self, pc: u64) -> Prediction {
        let lidx = Self::local_index(pc);
        let local_hist = self.local_history[lidx] as usize % LOCAL_HISTORY_ENTRIES;
        let local_taken = self.local_pht[local_hist].taken();
        let global_taken = self.global_pht[self.global_index()].taken();
        let use_local = self.choice_pht[self.global_index()].taken();
        let taken = if use_local { local_taken } else { global_taken };
        Prediction { taken, target: self.btb.get(&pc).copied(), used_local: use_local }
    }

    /// Feeds back a resolved branch, updating local/global/chooser state and
    /// the BTB.
    pub fn update(&mut self, outcome: BranchOutcome, predicted: Prediction) {
        let lidx = Self::local_index(outcome.pc);
        let local_hist = self.local_history[lidx] as usize % LOCAL_HISTORY_ENTRIES;
        let local_taken = self.local_pht[local_hist].taken();
        let global_taken = self.global_pht[self.global_index()].taken();

        self.local_pht[local_hist].update(outcome.taken);
        self.global_pht[self.global_index()].update(outcome.taken);

        if local_taken != global_taken {
            let credit_local = local_taken == outcome.taken;
            self.choice_pht[self.global_index()].update(credit_local);
        }

        self.local_history[lidx] = ((self.local_history[lidx] << 1) | outcome.taken as u16)
            & ((1u16 << LOCAL_HISTORY_BITS) - 1);
        self.global_history =
            ((self.global_history << 1) | outcome.taken as u16) & ((1u16 << GLOBAL_PATH_BITS) - 1);

        if outcome.taken {
            self.btb.insert(outcome.pc, outcome.target);
        }
        let _ = predicted;
    }
}

impl Default for TournamentPredictor {
    fn default() -> Self {
        Self::new()
    }
}

/// Return-address stack, predicting `RET` targets independent of the BTB
/// (spec.md §4.1 item 3).
pub struct ReturnAddressStack {
    stack: Vec<u64>,
    capacity: usize,
}

impl ReturnAddressStack {
    pub fn new(capacity: usize) -> Self {
        Self { stack: Vec::with_capacity(capacity), capacity }
    }

    /// Pushes a return address on a `CALL`/`JSR`, evicting the oldest entry
    /// if the stack is at capacity.
    pub fn push(&mut self, return_addr: u64) {
        if self.stack.len() == self.capacity {
            self.stack.remove(0);
        }
        self.stack.push(return_addr);
    }

    /// Predicts (without consuming) the target of a `RET`.
    pub fn top(&self) -> Option<u64> {
        self.stack.last().copied()
    }

    /// Consumes the top entry once the `RET` is confirmed to have executed.
    pub fn pop(&mut self) -> Option<u64> {
        self.stack.pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predictor_saturates_to_taken_after_warmup() {
        let mut p = TournamentPredictor::new();
        let pc = 0x1000;
        let outcome = BranchOutcome { pc, taken: true, target: 0x2000 };
        for _ in 0..5 {
            let pred = p.predict(pc);
            p.update(outcome, pred);
        }
        assert!(p.predict(pc).taken);
    }

    #[test]
    fn btb_remembers_last_taken_target() {
        let mut p = TournamentPredictor::new();
        let pc = 0x4000;
        let outcome = BranchOutcome { pc, taken: true, target: 0x8000 };
        let pred = p.predict(pc);
        p.update(outcome, pred);
        assert_eq!(p.predict(pc).target, Some(0x8000));
    }

    #[test]
    fn ras_push_pop_lifo() {
        let mut ras = ReturnAddressStack::new(4);
        ras.push(0x100);
        ras.push(0x200);
        assert_eq!(ras.top(), Some(0x200));
        assert_eq!(ras.pop(), Some(0x200));
        assert_eq!(ras.pop(), Some(0x100));
        assert_eq!(ras.pop(), None);
    }

    #[test]
    fn ras_evicts_oldest_past_capacity() {
        let mut ras = ReturnAddressStack::new(2);
        ras.push(1);
        ras.push(2);
        ras.push(3);
        assert_eq!(ras.pop(), Some(3));
        assert_eq!(ras.pop(), Some(2));
        assert_eq!(ras.pop(), None);
    }
}
