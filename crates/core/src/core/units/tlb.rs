//! Fully-associative translation buffer, 128 entries (spec.md §4.2 items 3-4).
//!
//! Shared shape for the ITB and DTB; DTB entries additionally carry the
//! granularity-hint page-size field and fault-on-{read,write,execute} bits
//! the Mbox's protection check consults.

use crate::common::error::{FaultKind, Trap};

pub const TLB_ENTRIES: usize = 128;

/// The kind of reference a translation is being checked for (spec.md §3's
/// K/E/S/U read/write/execute protection matrix).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    Execute,
}

/// Access-mode protection and fault bits carried per translation (spec.md §3).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProtectionBits {
    pub kernel_read: bool,
    pub kernel_write: bool,
    pub exec_read: bool,
    pub exec_write: bool,
    pub supervisor_read: bool,
    pub supervisor_write: bool,
    pub user_read: bool,
    pub user_write: bool,
    pub fault_on_read: bool,
    pub fault_on_write: bool,
    pub fault_on_execute: bool,
}

#[derive(Clone, Copy, Debug)]
struct Entry {
    valid: bool,
    vpn: u64,
    /// `granularity_bits` extends the page size beyond the base 8KB (0 = 8KB,
    /// matching the 21264's granularity-hint encoding for 64KB/512KB/4MB pages).
    granularity_bits: u32,
    pfn: u64,
    asn: u32,
    global: bool,
    protection: ProtectionBits,
    lru_tick: u64,
}

impl Default for Entry {
    fn default() -> Self {
        Self {
            valid: false,
            vpn: 0,
            granularity_bits: 0,
            pfn: 0,
            asn: 0,
            global: false,
            protection: ProtectionBits::default(),
            lru_tick: 0,
        }
    }
}

/// A resolved translation.
#[derive(Clone, Copy, Debug)]
pub struct Translation {
    pub phys_addr: u64,
    pub protection: ProtectionBits,
}

pub struct Tlb {
    entries: [Entry; TLB_ENTRIES],
    clock: u64,
    base_page_bits: u32,
}

impl Tlb {
    pub fn new(base_page_bits: u32) -> Self {
        Self { entries: [Entry::default(); TLB_ENTRIES], clock: 0, base_page_bits }
    }

    fn page_bits_for(&self, granularity_bits: u32) -> u32 {
        self.base_page_bits + granularity_bits
    }

    /// Looks up `virt_addr` for address-space number `asn`, matching global
    /// entries regardless of `asn` (spec.md §4.2 item 3).
    pub fn lookup(&mut self, virt_addr: u64, asn: u32) -> Option<Translation> {
        self.clock += 1;
        let clock = self.clock;
        let base_page_bits = self.base_page_bits;
        let hit = self.entries.iter_mut().find(|e| {
            if !e.valid || (!e.global && e.asn != asn) {
                return false;
            }
            let page_bits = e.granularity_bits + base_page_bits;
            (virt_addr >> page_bits) == e.vpn
        });
        hit.map(|e| {
            e.lru_tick = clock;
            let page_bits = e.granularity_bits + base_page_bits;
            let offset = virt_addr & ((1u64 << page_bits) - 1);
            Translation { phys_addr: (e.pfn << page_bits) | offset, protection: e.protection }
        })
    }

    /// Looks up `virt_addr` and checks it against the requested access mode,
    /// returning the physical address or the architectural trap a real Ibox
    /// or Mbox would raise (spec.md §3/§7 item 1). `pal_mode` stands in for
    /// kernel mode versus user mode; this simulator doesn't model the full
    /// PS<CM> four-mode ladder (see DESIGN.md).
    pub fn translate(&mut self, virt_addr: u64, asn: u32, pal_mode: bool, access: Access) -> Result<u64, Trap> {
        let Some(t) = self.lookup(virt_addr, asn) else {
            return Err(if access == Access::Execute { Trap::ItbMiss(virt_addr) } else { Trap::DtbMiss(virt_addr) });
        };
        // The Alpha architecture has no separate execute-permission bit: an
        // instruction fetch is permitted wherever the current mode's
        // read-enable bit is set (spec.md §3).
        let p = t.protection;
        let (permitted, fault_set) = match access {
            Access::Read => (if pal_mode { p.kernel_read } else { p.user_read }, p.fault_on_read),
            Access::Execute => (if pal_mode { p.kernel_read } else { p.user_read }, p.fault_on_execute),
            Access::Write => (if pal_mode { p.kernel_write } else { p.user_write }, p.fault_on_write),
        };
        if !permitted {
            return Err(Trap::AccessViolation(virt_addr));
        }
        if fault_set {
            let kind = match access {
                Access::Read => FaultKind::Read,
                Access::Write => FaultKind::Write,
                Access::Execute => FaultKind::Execute,
            };
            return Err(Trap::FaultOn(virt_addr, kind));
        }
        Ok(t.phys_addr)
    }

    /// Inserts a new translation, evicting the least-recently-used entry if
    /// the TLB is full (spec.md §4.2 item 4).
    pub fn insert(
        &mut self,
        virt_addr: u64,
        granularity_bits: u32,
        pfn: u64,
        asn: u32,
        global: bool,
        protection: ProtectionBits,
    ) {
        self.clock += 1;
        let clock = self.clock;
        let base_page_bits = self.base_page_bits;
        let idx = self
            .entries
            .iter()
            .position(|e| !e.valid)
            .unwrap_or_else(|| self.entries.iter().enumerate().min_by_key(|(_, e)| e.lru_tick).unwrap().0);
        let page_bits = base_page_bits + granularity_bits;
        self.entries[idx] = Entry {
            valid: true,
            vpn: virt_addr >> page_bits,
            granularity_bits,
            pfn,
            asn,
            global,
            protection,
            lru_tick: clock,
        };
    }

    /// Invalidates every non-global entry (executed on an `ASN`-changing
    /// context switch when ASNs are exhausted).
    pub fn invalidate_process_entries(&mut self) {
        for e in self.entries.iter_mut() {
            if !e.global {
                e.valid = false;
            }
        }
    }

    pub fn invalidate_all(&mut self) {
        for e in self.entries.iter_mut() {
            e.valid = false;
        }
    }

    pub fn resident_count(&self) -> usize {
        self.entries.iter().filter(|e| e.valid).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_lookup_hits() {
        let mut tlb = Tlb::new(13);
        tlb.insert(0x10_0000, 0, 0x55, 1, false, ProtectionBits::default());
        let t = tlb.lookup(0x10_0000 + 0x10, 1).unwrap();
        assert_eq!(t.phys_addr, (0x55u64 << 13) | 0x10);
    }

    #[test]
    fn different_asn_misses_non_global_entry() {
        let mut tlb = Tlb::new(13);
        tlb.insert(0x10_0000, 0, 0x55, 1, false, ProtectionBits::default());
        assert!(tlb.lookup(0x10_0000, 2).is_none());
    }

    #[test]
    fn global_entry_hits_regardless_of_asn() {
        let mut tlb = Tlb::new(13);
        tlb.insert(0x10_0000, 0, 0x55, 1, true, ProtectionBits::default());
        assert!(tlb.lookup(0x10_0000, 2).is_some());
    }

    #[test]
    fn fills_past_capacity_evict_lru() {
        let mut tlb = Tlb::new(13);
        for i in 0..TLB_ENTRIES {
            tlb.insert((i as u64) << 13, 0, i as u64, 0, true, ProtectionBits::default());
        }
        assert_eq!(tlb.resident_count(), TLB_ENTRIES);
        tlb.insert((TLB_ENTRIES as u64) << 13, 0, 999, 0, true, ProtectionBits::default());
        assert_eq!(tlb.resident_count(), TLB_ENTRIES);
        assert!(tlb.lookup(0, 0).is_none());
    }
}
