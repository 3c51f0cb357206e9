//! Ibox: instruction fetch, decode, and register renaming (spec.md §4.4
//! item 2 / §4.1).
//!
//! Fetches through the Icache/ITB, decodes via `isa::decode`, renames
//! architectural sources/destinations against the integer and
//! floating-point physical register files, and allocates a reorder-buffer
//! entry plus an issue-queue entry for the renamed instruction.

use crate::common::addr::ProgramCounter;
use crate::common::error::{FaultKind, Trap};
use crate::core::arch::{is_zero_reg, shadow_index};
use crate::core::ooo::iq::{Cluster, EntryState, IqEntry, IssueQueue, Source};
use crate::core::ooo::rob::{RenameInfo, Rob, RobTag};
use crate::core::prf::PhysicalRegisterFile;
use crate::core::units::bpred::{Prediction, ReturnAddressStack, TournamentPredictor};
use crate::core::units::icache::{Icache, Lookup as IcacheLookup};
use crate::core::units::tlb::{Access, Tlb};
use crate::isa::decode::{Decoded, JsrHint, RegOrLit, decode};

/// A fetched-and-renamed instruction, ready for an issue queue.
pub struct RenamedInstruction {
    pub tag: RobTag,
    pub pc: ProgramCounter,
    pub decoded: Decoded,
    pub src1_phys: Source,
    pub src2_phys: Source,
    pub dest_rename: Option<RenameInfo>,
    pub predicted: Option<Prediction>,
    /// The trap recorded on this instruction's ROB entry, if fetch or decode
    /// raised one (decode-illegal-instruction, or an ITB miss/protection
    /// fault below). Retirement drains it; callers only need this to drive
    /// their own statistics.
    pub trap: Option<Trap>,
}

/// Owns fetch/decode/rename state: the Icache, branch predictor, RAS, and a
/// monotonically advancing fetch PC.
pub struct Ibox {
    pub icache: Icache,
    pub predictor: TournamentPredictor,
    pub ras: ReturnAddressStack,
    pub fetch_pc: ProgramCounter,
    pub age_counter: u64,
}

impl Ibox {
    pub fn new(reset_pc: u64, ras_depth: usize) -> Self {
        Self {
            icache: Icache::new(),
            predictor: TournamentPredictor::new(),
            ras: ReturnAddressStack::new(ras_depth),
            fetch_pc: ProgramCounter::new(reset_pc, true),
            age_counter: 0,
        }
    }

    /// Fetches the raw instruction word at an already-translated physical
    /// address from a flat backing memory (the Icache fill path; spec.md's
    /// device/boot emulation is out of scope, so misses fill directly from
    /// `mem` rather than issuing a Cbox request).
    fn fetch_raw_at(&mut self, phys_addr: u64, mem: &[u8]) -> u32 {
        match self.icache.lookup(phys_addr) {
            IcacheLookup::Hit(data) => {
                let off = (phys_addr % 64) as usize;
                u32::from_le_bytes(data[off..off + 4].try_into().unwrap())
            }
            IcacheLookup::Miss { set, line_base } => {
                let mut line = [0u8; 64];
                let start = line_base as usize;
                let end = (start + 64).min(mem.len());
                if start < mem.len() {
                    line[..end - start].copy_from_slice(&mem[start..end]);
                }
                self.icache.fill(set, line_base, line);
                let off = (phys_addr % 64) as usize;
                u32::from_le_bytes(line[off..off + 4].try_into().unwrap())
            }
        }
    }

    /// Fetches, decodes, and renames one instruction, allocating it into the
    /// reorder buffer. Returns `None` if the ROB has no free slot (fetch
    /// stalls). A decode-time trap is recorded on the ROB entry immediately
    /// so retirement drains as usual.
    pub fn fetch_decode_rename(
        &mut self,
        mem: &[u8],
        itb: &mut Tlb,
        asn: u32,
        rob: &mut Rob,
        int_prf: &mut PhysicalRegisterFile,
        fp_prf: &mut PhysicalRegisterFile,
        pal_mode: bool,
    ) -> Option<RenamedInstruction> {
        if rob.is_full() {
            return None;
        }
        let pc = self.fetch_pc;

        let (raw, decode_result) = match itb.translate(pc.addr(), asn, pal_mode, Access::Execute) {
            Err(t) => (0, Err(t)),
            Ok(phys_addr) => {
                let raw = self.fetch_raw_at(phys_addr, mem);
                (raw, decode(raw))
            }
        };
        let predicted = predict_for(&decode_result, pc, &self.predictor, &mut self.ras);
        let next_pc = next_fetch_pc(pc, &decode_result, &predicted);

        let (decoded, trap) = match decode_result {
            Ok(d) => (d, None),
            Err(t) => (Decoded::Trapb, Some(t)),
        };

        // Sources must resolve against the pre-rename map: a destination that
        // reuses one of its own source registers (e.g. `ADDQ R1,R2,R1`) has to
        // read R1's old physical register, not the fresh one its own rename
        // just installed.
        let (src1, src2) = source_registers(&decoded);
        let src1_phys = resolve_source(src1, pal_mode, int_prf, fp_prf);
        let src2_phys = resolve_source(src2, pal_mode, int_prf, fp_prf);

        let dest_rename = dest_register(&decoded).and_then(|(reg, is_fp)| {
            if is_zero_reg(reg) {
                return None;
            }
            // PAL-mode shadow registers are an integer-side-only substitution
            // (spec.md §3); the FP file never remaps.
            let idx = if is_fp { reg } else { shadow_index(reg, pal_mode) };
            let prf = if is_fp { &mut *fp_prf } else { &mut *int_prf };
            prf.rename(idx).ok().map(|(new_phys, old_phys)| RenameInfo { arch_reg: idx, is_fp, new_phys, old_phys })
        });

        let tag = rob.allocate(pc, raw, dest_rename).ok()?;
        if let Some(t) = trap {
            rob.fault(tag, t);
        }

        self.fetch_pc = next_pc;
        self.age_counter += 1;

        Some(RenamedInstruction { tag, pc, decoded, src1_phys, src2_phys, dest_rename, predicted, trap })
    }

    /// Builds the issue-queue entry for a renamed instruction, choosing the
    /// integer or floating-point cluster by the decoded instruction class.
    pub fn to_iq_entry(&self, inst: &RenamedInstruction, cluster: Cluster) -> IqEntry {
        let ready = matches!(inst.src1_phys, Source::Ready) && matches!(inst.src2_phys, Source::Ready);
        IqEntry {
            tag: inst.tag,
            cluster,
            src1: inst.src1_phys,
            src2: inst.src2_phys,
            state: if ready { EntryState::ReadyToIssue } else { EntryState::Waiting },
            age: self.age_counter,
        }
    }

    /// Redirects fetch after a misprediction or exception resolves.
    pub fn redirect(&mut self, new_pc: ProgramCounter) {
        self.fetch_pc = new_pc;
    }
}

fn dest_register(decoded: &Decoded) -> Option<(usize, bool)> {
    match *decoded {
        Decoded::IntOperate { rc, .. } => Some((rc, false)),
        Decoded::FpOperate { fc, .. } => Some((fc, true)),
        Decoded::Memory { op, ra, .. } => {
            use crate::isa::decode::MemOp::*;
            match op {
                Lda | Ldah | LdbU | LdqU | LdwU | Ldl | Ldq | LdlLocked | LdqLocked => Some((ra, false)),
                Ldf | Ldg | Lds | Ldt => Some((ra, true)),
                // STx_C writes its success/failure flag back into Ra, which
                // `source_registers` also resolves as the store's data
                // operand below — the same register is read, then renamed.
                StlCond | StqCond => Some((ra, false)),
                _ => None,
            }
        }
        Decoded::Branch { link: Some(r), .. } => Some((r, false)),
        Decoded::Jsr { ra, .. } => Some((ra, false)),
        Decoded::Rpcc { rc } => Some((rc, false)),
        Decoded::HwMfpr { ra, .. } => Some((ra, false)),
        _ => None,
    }
}

pub(crate) fn source_registers(decoded: &Decoded) -> (Option<(usize, bool)>, Option<(usize, bool)>) {
    match *decoded {
        Decoded::IntOperate { ra, rb, .. } => {
            let s2 = match rb {
                RegOrLit::Reg(r) => Some((r, false)),
                RegOrLit::Lit(_) => None,
            };
            (Some((ra, false)), s2)
        }
        Decoded::FpOperate { fa, fb, .. } => (Some((fa, true)), Some((fb, true))),
        Decoded::Memory { op, ra, rb, .. } => {
            use crate::isa::decode::MemOp::*;
            // `ra` is a source only for stores (the data register); loads only
            // write it, so it isn't resolved as an operand here.
            let data_src = match op {
                Stw | Stb | StqU | Stl | Stq | StlCond | StqCond => Some((ra, false)),
                Stf | Stg | Sts | Stt => Some((ra, true)),
                _ => None,
            };
            (Some((rb, false)), data_src)
        }
        Decoded::Branch { ra, is_float, .. } => (Some((ra, is_float)), None),
        Decoded::Jsr { rb, .. } => (Some((rb, false)), None),
        Decoded::HwRet { rb } => (Some((rb, false)), None),
        Decoded::HwMtpr { ra, .. } => (Some((ra, false)), None),
        _ => (None, None),
    }
}

fn resolve_source(
    reg: Option<(usize, bool)>,
    pal_mode: bool,
    int_prf: &PhysicalRegisterFile,
    fp_prf: &PhysicalRegisterFile,
) -> Source {
    match reg {
        None => Source::Ready,
        Some((r, is_fp)) if is_zero_reg(r) => {
            let _ = (is_fp, pal_mode);
            Source::Ready
        }
        Some((r, is_fp)) => {
            // PAL-mode shadow registers are an integer-side-only substitution
            // (spec.md §3); the FP file never remaps.
            let idx = if is_fp { r } else { shadow_index(r, pal_mode) };
            let prf = if is_fp { fp_prf } else { int_prf };
            Source::Waiting(prf.map(idx))
        }
    }
}

fn predict_for(
    decode_result: &Result<Decoded, Trap>,
    pc: ProgramCounter,
    predictor: &TournamentPredictor,
    ras: &mut ReturnAddressStack,
) -> Option<Prediction> {
    match decode_result {
        Ok(Decoded::Branch { .. }) => Some(predictor.predict(pc.addr())),
        Ok(Decoded::Jsr { hint: JsrHint::Ret, .. }) => {
            Some(Prediction { taken: true, target: ras.top(), used_local: false })
        }
        _ => None,
    }
}

fn next_fetch_pc(pc: ProgramCounter, decode_result: &Result<Decoded, Trap>, predicted: &Option<Prediction>) -> ProgramCounter {
    match decode_result {
        Ok(Decoded::Branch { disp, .. }) => {
            if predicted.as_ref().is_some_and(|p| p.taken) {
                pc.jump_to((pc.addr() as i64 + 4 + disp) as u64)
            } else {
                pc.advance(1)
            }
        }
        Ok(Decoded::Jsr { .. }) => {
            if let Some(p) = predicted {
                if let Some(target) = p.target {
                    return pc.jump_to(target);
                }
            }
            pc.advance(1)
        }
        _ => pc.advance(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::units::tlb::ProtectionBits;

    fn full_access() -> ProtectionBits {
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

    /// A boot-style identity mapping covering the low 1GB, standing in for
    /// the PALcode page-table walk this simulator doesn't execute.
    fn identity_tlb() -> Tlb {
        let mut tlb = Tlb::new(13);
        tlb.insert(0, 17, 0, 0, true, full_access());
        tlb
    }

    #[test]
    fn fetch_decode_rename_allocates_rob_entry() {
        let mut ibox = Ibox::new(0x1_0000, 32);
        let mut rob = Rob::new(16);
        let mut int_prf = PhysicalRegisterFile::new(32, 80);
        let mut fp_prf = PhysicalRegisterFile::new(32, 72);
        let mem = vec![0u8; 0x2_0000];
        let mut itb = identity_tlb();
        let inst = ibox.fetch_decode_rename(&mem, &mut itb, 0, &mut rob, &mut int_prf, &mut fp_prf, false);
        assert!(inst.is_some());
        assert_eq!(rob.len(), 1);
    }

    #[test]
    fn zero_register_destination_is_never_renamed() {
        use crate::isa::instruction::encode_operate_reg;
        use crate::isa::opcodes::{OP_INTA, inta};
        let mut mem = vec![0u8; 0x1000];
        let raw = encode_operate_reg(OP_INTA, 1, 2, inta::ADDQ, 31);
        mem[0..4].copy_from_slice(&raw.to_le_bytes());
        let mut ibox = Ibox::new(0, 32);
        let mut rob = Rob::new(16);
        let mut int_prf = PhysicalRegisterFile::new(32, 80);
        let mut fp_prf = PhysicalRegisterFile::new(32, 72);
        let mut itb = identity_tlb();
        let free_before = int_prf.free_count();
        ibox.fetch_decode_rename(&mem, &mut itb, 0, &mut rob, &mut int_prf, &mut fp_prf, false);
        assert_eq!(int_prf.free_count(), free_before);
    }

    #[test]
    fn fetch_without_itb_entry_raises_itb_miss() {
        let mut ibox = Ibox::new(0x4000_0000_0000, 32);
        let mut rob = Rob::new(16);
        let mut int_prf = PhysicalRegisterFile::new(32, 80);
        let mut fp_prf = PhysicalRegisterFile::new(32, 72);
        let mem = vec![0u8; 0x1000];
        let mut itb = Tlb::new(13);
        let inst = ibox.fetch_decode_rename(&mem, &mut itb, 0, &mut rob, &mut int_prf, &mut fp_prf, false).unwrap();
        assert_eq!(inst.trap, Some(Trap::ItbMiss(0x4000_0000_0000)));
        assert_eq!(rob.peek_head().unwrap().trap, Some(Trap::ItbMiss(0x4000_0000_0000)));
    }
}
