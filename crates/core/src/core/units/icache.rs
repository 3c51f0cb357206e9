//! Instruction cache: two-way set-associative, 64KB (spec.md §4.2 item 1).

const LINE_SIZE: usize = 64;
const WAYS: usize = 2;
const CACHE_SIZE: usize = 64 * 1024;
const SETS: usize = CACHE_SIZE / LINE_SIZE / WAYS;

#[derive(Clone, Copy, Debug, Default)]
struct Line {
    valid: bool,
    tag: u64,
    data: [u8; LINE_SIZE],
    /// Pseudo-LRU bit: set when this way was the most recently used of the pair.
    recently_used: bool,
}

/// A direct read-only instruction cache. Fills are driven externally (by the
/// Ibox, via the Cbox/chipset) and delivered through [`Icache::fill`].
pub struct Icache {
    sets: Vec<[Line; WAYS]>,
}

/// Outcome of an instruction-cache lookup.
pub enum Lookup {
    Hit([u8; LINE_SIZE]),
    Miss { set: usize, line_base: u64 },
}

impl Icache {
    pub fn new() -> Self {
        Self { sets: vec![[Line::default(); WAYS]; SETS] }
    }

    fn set_index(addr: u64) -> usize {
        ((addr / LINE_SIZE as u64) as usize) % SETS
    }

    fn tag_of(addr: u64) -> u64 {
        addr / (LINE_SIZE as u64 * SETS as u64)
    }

    pub fn lookup(&mut self, phys_addr: u64) -> Lookup {
        let set_idx = Self::set_index(phys_addr);
        let tag = Self::tag_of(phys_addr);
        let set = &mut self.sets[set_idx];
        if let Some(way) = set.iter().position(|l| l.valid && l.tag == tag) {
            let hit_data = set[way].data;
            for (i, line) in set.iter_mut().enumerate() {
                line.recently_used = i == way;
            }
            Lookup::Hit(hit_data)
        } else {
            Lookup::Miss { set: set_idx, line_base: phys_addr & !(LINE_SIZE as u64 - 1) }
        }
    }

    /// Installs a freshly-fetched line, evicting the least-recently-used way.
    pub fn fill(&mut self, set_idx: usize, line_base: u64, data: [u8; LINE_SIZE]) {
        let tag = Self::tag_of(line_base);
        let set = &mut self.sets[set_idx];
        let victim = set.iter().position(|l| !l.recently_used).unwrap_or(0);
        set[victim] = Line { valid: true, tag, data, recently_used: true };
        for (i, line) in set.iter_mut().enumerate() {
            line.recently_used = i == victim;
        }
    }

    pub fn invalidate_all(&mut self) {
        for set in &mut self.sets {
            for line in set {
                line.valid = false;
            }
        }
    }
}

impl Default for Icache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_then_fill_then_hit() {
        let mut c = Icache::new();
        let addr = 0x1_0000u64;
        let (set, line_base) = match c.lookup(addr) {
            Lookup::Miss { set, line_base } => (set, line_base),
            Lookup::Hit(_) => panic!("expected miss"),
        };
        c.fill(set, line_base, [0xAAu8; LINE_SIZE]);
        match c.lookup(addr) {
            Lookup::Hit(data) => assert_eq!(data[0], 0xAA),
            Lookup::Miss { .. } => panic!("expected hit after fill"),
        }
    }

    #[test]
    fn two_way_set_holds_both_lines_without_eviction() {
        let mut c = Icache::new();
        let a = 0u64;
        let b = (SETS * LINE_SIZE) as u64; // same set, different tag
        for addr in [a, b] {
            if let Lookup::Miss { set, line_base } = c.lookup(addr) {
                c.fill(set, line_base, [addr as u8; LINE_SIZE]);
            }
        }
        assert!(matches!(c.lookup(a), Lookup::Hit(_)));
        assert!(matches!(c.lookup(b), Lookup::Hit(_)));
    }
}
