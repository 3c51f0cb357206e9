//! Top-level `Cpu`: wires the Ibox/Mbox/Cbox, physical register files, reorder
//! buffer, and issue queues together into one cooperative per-cycle `tick`
//! (spec.md §4.4).
//!
//! Retirement, execution, and fetch each advance once per `tick()`, in that
//! order, so a flush raised during execution (misprediction, exception) is
//! visible to fetch before it runs again. This is a simplification of a real
//! superscalar machine's fully overlapped stage pipeline; see DESIGN.md.

use std::collections::HashMap;

use crate::bus::{CpuCommand, SysDc, SysDcCode};
use crate::common::addr::ProgramCounter;
use crate::common::error::Trap;
use crate::config::Config;
use crate::core::cbox::Cbox;
use crate::core::ibox::{self, Ibox};
use crate::core::mbox::{LoadResult, Mbox};
use crate::core::ooo::ebox;
use crate::core::ooo::fbox;
use crate::core::ooo::iq::{Cluster, IqEntry, IssueQueue, Source};
use crate::core::ooo::rob::{RenameInfo, Rob, RobEntry, RobTag};
use crate::core::prf::PhysicalRegisterFile;
use crate::core::units::bpred::{BranchOutcome, Prediction};
use crate::core::units::dcache::{CoherenceState, Lookup as DcacheLookup};
use crate::core::units::fpu::Fpcr;
use crate::core::units::tlb::{Access, ProtectionBits, Tlb};
use crate::isa::decode::{BranchCond, Decoded, JsrHint, MemOp, RegOrLit};
use crate::stats::Stats;

/// Page-size shift the boot identity mapping and the chipset's DRAM arrays
/// arbitrate on (13 bits: an 8KB Alpha page).
const PAGE_BITS: u32 = 13;

/// Granularity-hint bits added to [`PAGE_BITS`] for the boot identity
/// mapping installed at reset, covering the low 1GiB with a single TLB
/// entry (spec.md's PALcode page-table walker isn't modeled; see DESIGN.md).
const BOOT_MAP_GRANULARITY_BITS: u32 = 17;

/// Fixed address-space number this simulator runs under; `PS<ASN>` switches
/// aren't modeled (DESIGN.md).
const FIXED_ASN: u32 = 0;

fn full_access_protection() -> ProtectionBits {
    ProtectionBits {
        kernel_read: true,
        kernel_write: true,
        exec_read: true,
        exec_write: true,
        supervisor_read: true,
        supervisor_write: true,
        user_read: true,
        user_write: true,
        fault_on_read: false,
        fault_on_write: false,
        fault_on_execute: false,
    }
}

/// A load waiting on an in-flight Dcache fill to complete.
#[derive(Clone, Copy, Debug)]
struct PendingFill {
    tag: RobTag,
    op: MemOp,
    addr: u64,
    size: usize,
}

/// PC a faulting instruction's drain redirects to. Real PALcode has a
/// per-exception entry vector; this simulator doesn't load a PALcode image, so
/// every trap lands here as a single synthetic handler address (DESIGN.md).
const PAL_TRAP_ENTRY: u64 = 0x2000;

/// Everything the scoreboard (`IqEntry`) discards once a source becomes ready
/// is kept here, indexed by `RobTag`, from fetch until retirement.
#[derive(Clone, Copy, Debug)]
struct PendingInst {
    pc: ProgramCounter,
    decoded: Decoded,
    src1_phys: Option<u32>,
    src1_is_fp: bool,
    src2_phys: Option<u32>,
    src2_is_fp: bool,
    dest_rename: Option<RenameInfo>,
    predicted: Option<Prediction>,
}

/// One `IssueQueue` per execution cluster (spec.md §2: four single-issue
/// integer clusters plus the floating multiply/other split).
struct IssueQueues {
    int_l0: IssueQueue,
    int_l1: IssueQueue,
    int_u0: IssueQueue,
    int_u1: IssueQueue,
    fp_multiply: IssueQueue,
    fp_other: IssueQueue,
}

const ALL_CLUSTERS: [Cluster; 6] = [
    Cluster::IntL0,
    Cluster::IntL1,
    Cluster::IntU0,
    Cluster::IntU1,
    Cluster::FpMultiply,
    Cluster::FpOther,
];

impl IssueQueues {
    fn new(iq_depth: usize, fq_depth: usize) -> Self {
        Self {
            int_l0: IssueQueue::new(iq_depth),
            int_l1: IssueQueue::new(iq_depth),
            int_u0: IssueQueue::new(iq_depth),
            int_u1: IssueQueue::new(iq_depth),
            fp_multiply: IssueQueue::new(fq_depth),
            fp_other: IssueQueue::new(fq_depth),
        }
    }

    fn queue_mut(&mut self, cluster: Cluster) -> &mut IssueQueue {
        match cluster {
            Cluster::IntL0 => &mut self.int_l0,
            Cluster::IntL1 => &mut self.int_l1,
            Cluster::IntU0 => &mut self.int_u0,
            Cluster::IntU1 => &mut self.int_u1,
            Cluster::FpMultiply => &mut self.fp_multiply,
            Cluster::FpOther => &mut self.fp_other,
        }
    }

    fn insert(&mut self, cluster: Cluster, entry: IqEntry) -> bool {
        self.queue_mut(cluster).insert(entry)
    }

    /// Wakeups are scoped to the producing physical register file: an integer
    /// and a floating-point instruction can legitimately hold the same
    /// numeric physical-register index in their own pool, so broadcasting
    /// across both would wake unrelated entries.
    fn wakeup_int(&mut self, phys: u32) {
        self.int_l0.wakeup(phys);
        self.int_l1.wakeup(phys);
        self.int_u0.wakeup(phys);
        self.int_u1.wakeup(phys);
    }

    fn wakeup_fp(&mut self, phys: u32) {
        self.fp_multiply.wakeup(phys);
        self.fp_other.wakeup(phys);
    }

    fn flush(&mut self, tags: &[RobTag]) {
        for cluster in ALL_CLUSTERS {
            self.queue_mut(cluster).flush(tags);
        }
    }
}

/// Picks the destination cluster for a freshly renamed instruction. Integer
/// work round-robins over the four single-issue clusters by fetch age, which
/// (combined with `in_flight_max` being a multiple of four) keeps any one
/// queue's occupancy within the ROB's own backpressure.
fn cluster_for(decoded: &Decoded, age: u64) -> Cluster {
    use crate::isa::decode::FpOp;
    match decoded {
        Decoded::FpOperate { op, .. } => {
            if matches!(op, FpOp::Mul | FpOp::Div) {
                Cluster::FpMultiply
            } else {
                Cluster::FpOther
            }
        }
        _ => match age % 4 {
            0 => Cluster::IntL0,
            1 => Cluster::IntL1,
            2 => Cluster::IntU0,
            _ => Cluster::IntU1,
        },
    }
}

fn mem_size(op: MemOp) -> usize {
    use MemOp::*;
    match op {
        Lda | Ldah => 0,
        LdbU | Stb => 1,
        LdwU | Stw => 2,
        Ldf | Lds | Ldl | LdlLocked | Stf | Sts | Stl | StlCond => 4,
        LdqU | Ldg | Ldt | Ldq | LdqLocked | StqU | Stg | Stt | Stq | StqCond => 8,
    }
}

fn is_store(op: MemOp) -> bool {
    matches!(
        op,
        MemOp::Stw
            | MemOp::Stb
            | MemOp::StqU
            | MemOp::Stf
            | MemOp::Stg
            | MemOp::Sts
            | MemOp::Stt
            | MemOp::Stl
            | MemOp::Stq
            | MemOp::StlCond
            | MemOp::StqCond
    )
}

/// Maps an IPR index onto one of the scoreboard's 4 slots (spec.md §4.4
/// item 4).
fn ipr_slot(index: u32) -> u32 {
    index % 4
}

/// Bit cleared at the `HW_MTPR` setter's issue (bits 3:0).
fn ipr_issue_bit(slot: u32) -> u8 {
    1 << slot
}

/// Bit cleared at the `HW_MTPR` setter's retirement (bits 7:4).
fn ipr_retire_bit(slot: u32) -> u8 {
    1 << (slot + 4)
}

/// Both bits a reader must see clear before an `HW_MFPR` targeting this slot
/// may complete.
fn ipr_slot_mask(slot: u32) -> u8 {
    ipr_issue_bit(slot) | ipr_retire_bit(slot)
}

fn is_fp_memory(op: MemOp) -> bool {
    matches!(op, MemOp::Ldf | MemOp::Ldg | MemOp::Lds | MemOp::Ldt | MemOp::Stf | MemOp::Stg | MemOp::Sts | MemOp::Stt)
}

fn size_mask(size: usize) -> u64 {
    if size >= 8 {
        u64::MAX
    } else {
        (1u64 << (size * 8)) - 1
    }
}

/// Sign-extends the longword forms; every other load returns its raw bytes
/// unchanged (byte/word loads are already zero-extended by `size_mask`-width
/// truncation at the read site).
fn sign_extend_load(op: MemOp, raw: u64) -> u64 {
    match op {
        MemOp::Ldl | MemOp::LdlLocked => (raw as u32 as i32) as i64 as u64,
        _ => raw,
    }
}

/// The Alpha 21264/Tsunami CPU core for one processor: fetch/rename (Ibox),
/// out-of-order execution (the physical register files, ROB, and issue
/// queues), and the memory/system interface (Mbox/Cbox).
pub struct Cpu {
    pub ibox: Ibox,
    pub mbox: Mbox,
    pub cbox: Cbox,
    pub itb: Tlb,
    pub dtb: Tlb,
    pub int_prf: PhysicalRegisterFile,
    pub fp_prf: PhysicalRegisterFile,
    pub rob: Rob,
    issue: IssueQueues,
    pub fpcr: Fpcr,
    pub pal_mode: bool,
    pub stats: Stats,
    /// Flat backing store a cache miss fills directly from (spec.md's
    /// device/boot emulation and cross-CPU DRAM sharing through the chipset
    /// are out of scope; see DESIGN.md).
    pub mem: Vec<u8>,
    pending: HashMap<u32, PendingInst>,
    /// Commands the Cbox has built this cycle and not yet handed to the
    /// system bus (spec.md §4.8); drained by [`Cpu::drain_bus_commands`].
    pub outbox: Vec<CpuCommand>,
    /// Loads stalled on an in-flight Dcache fill, keyed by the MAF tag that
    /// will complete them.
    pending_fills: HashMap<u32, Vec<PendingFill>>,
    /// Internal processor register file the `HW_MFPR`/`HW_MTPR` PALcode
    /// primitives read and write (spec.md §4.4 item 4).
    iprs: [u64; 256],
    /// 8-bit scoreboard gating `HW_MFPR` against an in-flight `HW_MTPR` to
    /// the same slot: bit `4*slot` clears when the setter issues, bit
    /// `4*slot+1` clears at its retirement (spec.md §4.4 item 4, 4 slots).
    ipr_scoreboard: u8,
    trace_retirement: bool,
    fetch_width: usize,
}

impl Cpu {
    pub fn new(config: &Config, mem: Vec<u8>) -> Self {
        let mut itb = Tlb::new(PAGE_BITS);
        let mut dtb = Tlb::new(PAGE_BITS);
        itb.insert(0, BOOT_MAP_GRANULARITY_BITS, 0, FIXED_ASN, true, full_access_protection());
        dtb.insert(0, BOOT_MAP_GRANULARITY_BITS, 0, FIXED_ASN, true, full_access_protection());
        Self {
            ibox: Ibox::new(config.general.start_pc, config.predictor.ras_depth),
            mbox: Mbox::new(),
            cbox: Cbox::new(),
            itb,
            dtb,
            int_prf: PhysicalRegisterFile::new(56, config.pipeline.int_prf_size),
            fp_prf: PhysicalRegisterFile::new(32, config.pipeline.fp_prf_size),
            rob: Rob::new(config.pipeline.in_flight_max),
            issue: IssueQueues::new(config.pipeline.iq_depth, config.pipeline.fq_depth),
            fpcr: Fpcr::default(),
            pal_mode: true,
            stats: Stats::default(),
            fetch_width: config.pipeline.fetch_width,
            mem,
            pending: HashMap::new(),
            outbox: Vec::new(),
            pending_fills: HashMap::new(),
            iprs: [0; 256],
            ipr_scoreboard: 0,
            trace_retirement: config.general.trace_retirement,
        }
    }

    /// Removes every queued outbound command, handing them to the caller
    /// (`System::tick`) for routing to the chipset.
    pub fn drain_bus_commands(&mut self) -> Vec<CpuCommand> {
        std::mem::take(&mut self.outbox)
    }

    /// Accepts a `SysDc` response the chipset addressed to this CPU,
    /// matching it against the Cbox's MAF and completing any loads that were
    /// waiting on the fill (spec.md §4.8 item 6).
    pub fn accept_sysdc(&mut self, sysdc: &SysDc) {
        let Some(phys_addr) = self.cbox.complete_fill(sysdc) else { return };
        self.stats.sysdc_responses += 1;
        let DcacheLookup::Miss { set, line_base } = self.mbox.dcache.lookup(phys_addr) else {
            return;
        };
        let mut line = [0u8; 64];
        let start = line_base as usize;
        let end = (start + 64).min(self.mem.len());
        if start < self.mem.len() {
            line[..end - start].copy_from_slice(&self.mem[start..end]);
        }
        let coherence = if matches!(sysdc.code, SysDcCode::ReadDataShared | SysDcCode::ReadDataSharedDirty) {
            CoherenceState::Shared
        } else {
            CoherenceState::Exclusive
        };
        if let Some((evicted_addr, evicted_data)) = self.mbox.dcache.fill(set, line_base, line, coherence) {
            self.writeback_evicted_line(evicted_addr, evicted_data);
        }
        let Some(waiters) = self.pending_fills.remove(&sysdc.id) else { return };
        for waiter in waiters {
            let Some(pending) = self.pending.get(&waiter.tag.0).copied() else { continue };
            if let DcacheLookup::Hit { set, way } = self.mbox.dcache.lookup(waiter.addr) {
                let mut bytes = [0u8; 8];
                let off = waiter.addr as usize % 64;
                for (i, byte) in bytes.iter_mut().enumerate().take(waiter.size) {
                    *byte = self.mbox.dcache.read_byte(set, way, off + i);
                }
                self.complete(waiter.tag, pending, sign_extend_load(waiter.op, u64::from_le_bytes(bytes)));
            }
        }
    }

    /// Pushes a dirty eviction's victim-block write onto the Cbox/outbox
    /// (spec.md §4.8 item 2).
    fn writeback_evicted_line(&mut self, evicted_addr: u64, evicted_data: [u8; 64]) {
        let mut words = [0u64; 8];
        for (i, w) in words.iter_mut().enumerate() {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&evicted_data[i * 8..i * 8 + 8]);
            *w = u64::from_le_bytes(buf);
        }
        if let Some(cmd) = self.cbox.writeback(evicted_addr, words) {
            self.stats.bus_commands_issued += 1;
            self.outbox.push(cmd);
        }
    }

    /// Advances the core by one cycle: retire, then execute, then fetch.
    pub fn tick(&mut self) {
        self.stats.cycles += 1;
        self.retire();
        self.issue_and_execute();
        self.fetch();
    }

    fn read_int(&self, phys: Option<u32>) -> u64 {
        phys.map_or(0, |p| self.int_prf.read(p))
    }

    fn read_fp(&self, phys: Option<u32>) -> u64 {
        phys.map_or(0, |p| self.fp_prf.read(p))
    }

    // ---- fetch ----------------------------------------------------------

    fn fetch(&mut self) {
        for _ in 0..self.fetch_width {
            if self.rob.is_full() {
                break;
            }
            let Some(renamed) =
                self.ibox.fetch_decode_rename(&self.mem, &mut self.itb, FIXED_ASN, &mut self.rob, &mut self.int_prf, &mut self.fp_prf, self.pal_mode)
            else {
                break;
            };
            self.stats.fetched += 1;
            if matches!(renamed.trap, Some(Trap::ItbMiss(_))) {
                self.stats.itb_misses += 1;
            }
            if let Decoded::HwMtpr { index, .. } = renamed.decoded {
                self.ipr_scoreboard |= ipr_slot_mask(ipr_slot(index));
            }

            let (src1_kind, src2_kind) = ibox::source_registers(&renamed.decoded);
            let src1_is_fp = matches!(src1_kind, Some((_, true)));
            let src2_is_fp = matches!(src2_kind, Some((_, true)));
            let src1_phys = match renamed.src1_phys {
                Source::Waiting(p) => Some(p),
                Source::Ready => None,
            };
            let src2_phys = match renamed.src2_phys {
                Source::Waiting(p) => Some(p),
                Source::Ready => None,
            };

            self.pending.insert(
                renamed.tag.0,
                PendingInst {
                    pc: renamed.pc,
                    decoded: renamed.decoded,
                    src1_phys,
                    src1_is_fp,
                    src2_phys,
                    src2_is_fp,
                    dest_rename: renamed.dest_rename,
                    predicted: renamed.predicted,
                },
            );

            let cluster = cluster_for(&renamed.decoded, self.ibox.age_counter);
            let entry = self.ibox.to_iq_entry(&renamed, cluster);
            let inserted = self.issue.insert(cluster, entry);
            debug_assert!(inserted, "round-robin cluster assignment stays within the ROB-bounded share per queue");
        }
    }

    // ---- retire -----------------------------------------------------------

    fn retire(&mut self) {
        loop {
            let Some(head) = self.rob.peek_head() else { break };
            match head.state {
                crate::core::ooo::rob::RobState::Issued => break,
                crate::core::ooo::rob::RobState::Completed => {
                    let Some(entry) = self.rob.commit_head() else { unreachable!("head was just peeked Some") };
                    self.commit_one(entry);
                }
                crate::core::ooo::rob::RobState::Faulted => {
                    let Some(entry) = self.rob.commit_head() else { unreachable!("head was just peeked Some") };
                    self.handle_fault(entry);
                    break;
                }
            }
        }
    }

    fn commit_one(&mut self, entry: RobEntry) {
        if let Some(rename) = entry.rename {
            let prf = if rename.is_fp { &mut self.fp_prf } else { &mut self.int_prf };
            if let Err(e) = prf.free(rename.old_phys) {
                panic!("{e}");
            }
        }
        if entry.store_addr.is_some() {
            self.mbox.retire_store(entry.tag);
        }
        if let Some(pending) = self.pending.remove(&entry.tag.0) {
            match pending.decoded {
                Decoded::Jsr { hint, .. } => match hint {
                    JsrHint::Jsr | JsrHint::JsrCoroutine => self.ibox.ras.push(pending.pc.advance(1).addr()),
                    JsrHint::Ret => {
                        self.ibox.ras.pop();
                    }
                    JsrHint::Jmp => {}
                },
                Decoded::HwMtpr { index, .. } => {
                    self.ipr_scoreboard &= !ipr_retire_bit(ipr_slot(index));
                }
                _ => {}
            }
        }
        self.stats.retired += 1;
        if self.trace_retirement {
            tracing::trace!(pc = entry.pc.addr(), tag = entry.tag.0, "retired");
        }
    }

    fn handle_fault(&mut self, entry: RobEntry) {
        self.pending.remove(&entry.tag.0);
        let drained = self.rob.flush_all();
        let tags: Vec<RobTag> = drained.iter().map(|e| e.tag).collect();
        self.squash(&drained);
        self.issue.flush(&tags);
        self.mbox.flush(&tags);
        self.purge_squashed(&tags);
        if let Some(rename) = entry.rename {
            let prf = if rename.is_fp { &mut self.fp_prf } else { &mut self.int_prf };
            if let Err(e) = prf.free(rename.new_phys) {
                panic!("{e}");
            }
            prf.restore_map(rename.arch_reg, rename.old_phys);
        }
        self.pal_mode = true;
        self.ibox.redirect(ProgramCounter::new(PAL_TRAP_ENTRY, true));
        if let Some(trap) = entry.trap {
            tracing::debug!(pc = entry.pc.addr(), %trap, "trap drained at retirement");
        }
    }

    /// Rolls back every squashed entry's rename in reverse (youngest-first)
    /// order, so a chain of renames to the same architectural register
    /// unwinds one hop at a time instead of racing its own history.
    fn squash(&mut self, entries: &[RobEntry]) {
        for e in entries.iter().rev() {
            if let Some(rename) = e.rename {
                let prf = if rename.is_fp { &mut self.fp_prf } else { &mut self.int_prf };
                if let Err(err) = prf.free(rename.new_phys) {
                    panic!("{err}");
                }
                prf.restore_map(rename.arch_reg, rename.old_phys);
            }
        }
    }

    fn redirect_after(&mut self, tag: RobTag, new_pc: ProgramCounter) {
        let drained = self.rob.flush_after(tag);
        let tags: Vec<RobTag> = drained.iter().map(|e| e.tag).collect();
        self.squash(&drained);
        self.issue.flush(&tags);
        self.mbox.flush(&tags);
        self.purge_squashed(&tags);
        self.ibox.redirect(new_pc);
    }

    /// Drops every squashed tag's pending-decode state, any dcache-fill
    /// waiters recorded for it, and releases an in-flight `HW_MTPR`'s
    /// scoreboard claim so a stalled `HW_MFPR` targeting the same slot
    /// doesn't wait forever on an instruction that will never retire.
    fn purge_squashed(&mut self, tags: &[RobTag]) {
        for t in tags {
            if let Some(pending) = self.pending.remove(&t.0) {
                if let Decoded::HwMtpr { index, .. } = pending.decoded {
                    self.ipr_scoreboard &= !ipr_slot_mask(ipr_slot(index));
                }
            }
        }
        for waiters in self.pending_fills.values_mut() {
            waiters.retain(|w| !tags.contains(&w.tag));
        }
        self.pending_fills.retain(|_, waiters| !waiters.is_empty());
    }

    // ---- execute ----------------------------------------------------------

    fn issue_and_execute(&mut self) {
        for cluster in ALL_CLUSTERS {
            if let Some(entry) = self.issue.queue_mut(cluster).select_oldest_ready() {
                self.execute_entry(entry);
            }
        }
    }

    fn execute_entry(&mut self, entry: IqEntry) {
        let tag = entry.tag;
        let Some(pending) = self.pending.get(&tag.0).copied() else { return };

        match pending.decoded {
            Decoded::IntOperate { op, flags, rb, .. } => {
                let a = self.read_int(pending.src1_phys);
                let b = match rb {
                    RegOrLit::Lit(v) => v,
                    RegOrLit::Reg(_) => self.read_int(pending.src2_phys),
                };
                match ebox::execute(op, flags, a, b) {
                    Ok(result) => self.complete(tag, pending, result),
                    Err(trap) => self.rob.fault(tag, trap),
                }
            }
            Decoded::FpOperate { op, src_fmt, .. } => {
                let a = self.read_fp(pending.src1_phys);
                let b = self.read_fp(pending.src2_phys);
                match fbox::execute(op, src_fmt, a, b, &mut self.fpcr) {
                    Ok(result) => self.complete(tag, pending, result),
                    Err(trap) => self.rob.fault(tag, trap),
                }
            }
            Decoded::Memory { op, disp, .. } => self.execute_memory(entry, pending, op, disp),
            Decoded::Branch { cond, disp, .. } => self.execute_branch(tag, pending, cond, disp),
            Decoded::Jsr { .. } => self.execute_jsr(tag, pending),
            Decoded::HwRet { .. } => self.execute_hwret(tag, pending),
            Decoded::Rpcc { .. } => {
                let cycles = self.stats.cycles;
                self.complete(tag, pending, cycles);
            }
            Decoded::HwMfpr { index, .. } => {
                let slot = ipr_slot(index);
                if self.ipr_scoreboard & ipr_slot_mask(slot) != 0 {
                    self.issue.queue_mut(entry.cluster).abort_and_reinsert(entry);
                    return;
                }
                let value = self.iprs[index as usize];
                self.complete(tag, pending, value);
            }
            Decoded::HwMtpr { index, .. } => {
                let value = self.read_int(pending.src1_phys);
                self.iprs[index as usize] = value;
                self.ipr_scoreboard &= !ipr_issue_bit(ipr_slot(index));
                self.complete(tag, pending, 0);
            }
            Decoded::CallPal { .. }
            | Decoded::HwLd { .. }
            | Decoded::HwSt { .. }
            | Decoded::Trapb
            | Decoded::Excb
            | Decoded::MemoryBarrier
            | Decoded::WriteMemoryBarrier
            | Decoded::Fetch => {
                // PALcode entry/exit, HW_LD/HW_ST physical-address loads,
                // barriers, and software prefetch hints have no
                // architecturally visible effect on this model's flat,
                // single-level memory (DESIGN.md).
                self.complete(tag, pending, 0);
            }
        }
    }

    fn complete(&mut self, tag: RobTag, pending: PendingInst, result: u64) {
        self.rob.complete(tag, result);
        if let Some(rename) = pending.dest_rename {
            if rename.is_fp {
                self.fp_prf.write(rename.new_phys, result);
                self.issue.wakeup_fp(rename.new_phys);
            } else {
                self.int_prf.write(rename.new_phys, result);
                self.issue.wakeup_int(rename.new_phys);
            }
        }
    }

    fn execute_branch(&mut self, tag: RobTag, pending: PendingInst, cond: BranchCond, disp: i64) {
        let a = if pending.src1_is_fp { self.read_fp(pending.src1_phys) } else { self.read_int(pending.src1_phys) };
        let taken = if pending.src1_is_fp {
            let f = f64::from_bits(a);
            match cond {
                BranchCond::Always => true,
                BranchCond::Eq => f == 0.0,
                BranchCond::Ne => f != 0.0,
                BranchCond::Lt => f < 0.0,
                BranchCond::Le => f <= 0.0,
                BranchCond::Ge => f >= 0.0,
                BranchCond::Gt => f > 0.0,
                BranchCond::LowBitClear | BranchCond::LowBitSet => false,
            }
        } else {
            match cond {
                BranchCond::Always => true,
                BranchCond::Eq => a == 0,
                BranchCond::Ne => a != 0,
                BranchCond::Lt => (a as i64) < 0,
                BranchCond::Le => (a as i64) <= 0,
                BranchCond::Ge => (a as i64) >= 0,
                BranchCond::Gt => (a as i64) > 0,
                BranchCond::LowBitClear => a & 1 == 0,
                BranchCond::LowBitSet => a & 1 != 0,
            }
        };

        let pc = pending.pc;
        let target = (pc.addr() as i64 + 4 + disp) as u64;
        let fallthrough = pc.advance(1);
        let link_value = fallthrough.addr();

        let predicted = pending.predicted.unwrap_or(Prediction { taken: false, target: None, used_local: false });
        let mispredicted = predicted.taken != taken || (taken && predicted.target != Some(target));

        self.complete(tag, pending, link_value);
        self.ibox.predictor.update(BranchOutcome { pc: pc.addr(), taken, target }, predicted);

        self.stats.branches_predicted += 1;
        if mispredicted {
            self.stats.branches_mispredicted += 1;
            let new_pc = if taken { pc.jump_to(target) } else { fallthrough };
            self.redirect_after(tag, new_pc);
        }
    }

    fn execute_jsr(&mut self, tag: RobTag, pending: PendingInst) {
        let target = self.read_int(pending.src1_phys);
        let return_addr = pending.pc.advance(1).addr();
        let predicted_target = pending.predicted.and_then(|p| p.target);
        let mispredicted = predicted_target != Some(target);

        self.complete(tag, pending, return_addr);
        if mispredicted {
            self.redirect_after(tag, pending.pc.jump_to(target));
        }
    }

    fn execute_hwret(&mut self, tag: RobTag, pending: PendingInst) {
        let target = self.read_int(pending.src1_phys);
        self.complete(tag, pending, 0);
        self.pal_mode = false;
        self.redirect_after(tag, ProgramCounter::new(target, false));
    }

    fn execute_memory(&mut self, entry: IqEntry, pending: PendingInst, op: MemOp, disp: i64) {
        let tag = entry.tag;
        let base = self.read_int(pending.src1_phys);
        let virt_addr = base.wrapping_add(disp as u64);

        match op {
            MemOp::Lda => {
                self.complete(tag, pending, virt_addr);
                return;
            }
            MemOp::Ldah => {
                self.complete(tag, pending, base.wrapping_add((disp as u64) << 16));
                return;
            }
            _ => {}
        }

        let size = mem_size(op);
        let is_fp_data = is_fp_memory(op);
        let access = if is_store(op) { Access::Write } else { Access::Read };
        let addr = match self.dtb.translate(virt_addr, FIXED_ASN, self.pal_mode, access) {
            Ok(phys_addr) => phys_addr,
            Err(trap) => {
                if matches!(trap, Trap::DtbMiss(_)) {
                    self.stats.dtb_misses += 1;
                }
                self.rob.fault(tag, trap);
                return;
            }
        };

        if is_store(op) {
            let data = if is_fp_data { self.read_fp(pending.src2_phys) } else { self.read_int(pending.src2_phys) };
            let truncated = data & size_mask(size);
            match op {
                MemOp::StlCond | MemOp::StqCond => {
                    let success = self.mbox.store_conditional(addr);
                    if success {
                        self.mbox.issue_store(tag, addr, size as u8, truncated);
                        self.rob.set_store_info(tag, addr, truncated);
                        self.stats.sc_success += 1;
                    } else {
                        self.stats.sc_failure += 1;
                    }
                    self.complete(tag, pending, success as u64);
                }
                _ => {
                    self.mbox.issue_store(tag, addr, size as u8, truncated);
                    self.rob.set_store_info(tag, addr, truncated);
                    self.complete(tag, pending, 0);
                }
            }
            return;
        }

        if matches!(op, MemOp::LdlLocked | MemOp::LdqLocked) {
            self.mbox.load_locked(addr);
        }

        match self.mbox.issue_load(tag, addr, size as u8) {
            LoadResult::Forwarded(v) => {
                self.stats.stq_forwards += 1;
                self.complete(tag, pending, sign_extend_load(op, v));
            }
            LoadResult::CacheHit(v) => {
                self.stats.dcache_hits += 1;
                self.complete(tag, pending, sign_extend_load(op, v));
            }
            LoadResult::CacheMiss { line_base } => {
                self.stats.dcache_misses += 1;
                let exclusive = matches!(op, MemOp::LdlLocked | MemOp::LdqLocked);
                self.request_dcache_fill(entry, tag, op, addr, size, line_base, exclusive);
            }
        }
    }

    /// Requests a Dcache line fill over the system bus for a load that
    /// missed, folding it into an already-outstanding MAF request for the
    /// same line when one exists. If the MAF is full the load is reinserted
    /// into its issue queue to retry on a later cycle, same as an
    /// `HW_MFPR` scoreboard stall. The fill itself completes asynchronously
    /// in `accept_sysdc` once the bus returns a `SysDc` response.
    fn request_dcache_fill(
        &mut self,
        entry: IqEntry,
        tag: RobTag,
        op: MemOp,
        addr: u64,
        size: usize,
        line_base: u64,
        exclusive: bool,
    ) {
        if let Some(maf_tag) = self.cbox.maf_tag_for(line_base) {
            self.pending_fills.entry(maf_tag).or_default().push(PendingFill { tag, op, addr, size });
            return;
        }
        match self.cbox.request_fill(line_base, exclusive) {
            Some(cmd) => {
                self.stats.bus_commands_issued += 1;
                let maf_tag = cmd.id;
                self.outbox.push(cmd);
                self.pending_fills.entry(maf_tag).or_default().push(PendingFill { tag, op, addr, size });
            }
            None => {
                self.issue.queue_mut(entry.cluster).abort_and_reinsert(entry);
            }
        }
    }
}
