//! Configuration system for the simulator.
//!
//! Mirrors the corpus's hierarchical, `serde`-deserializable configuration
//! pattern: a `defaults` module of named constants backs a `Config::default()`
//! used by the CLI, while the same structures can be populated from JSON for
//! scripted sweeps.

use serde::Deserialize;

/// Default configuration constants for the simulator.
mod defaults {
    /// In-flight instruction limit (ROB capacity, VPC list depth, RAS depth).
    pub const IN_FLIGHT_MAX: usize = 80;
    /// Integer physical register file size. The integer file's architectural
    /// space is 56, not 32: PAL-mode shadow registers (spec.md §3) occupy
    /// fixed slots 32-39 and 52-55 above the ordinary R0-31 range, so the
    /// renaming headroom below is on top of 56, not 32.
    pub const INT_PRF_SIZE: usize = 104;
    /// Floating-point physical register file size.
    pub const FP_PRF_SIZE: usize = 72;
    /// Integer issue queue depth.
    pub const IQ_DEPTH: usize = 20;
    /// Floating-point issue queue depth.
    pub const FQ_DEPTH: usize = 15;
    /// Load queue depth.
    pub const LDQ_DEPTH: usize = 32;
    /// Store queue depth.
    pub const STQ_DEPTH: usize = 32;
    /// Miss-address file entries.
    pub const MAF_DEPTH: usize = 8;
    /// Victim-data buffer entries.
    pub const VDB_DEPTH: usize = 8;
    /// I/O write buffer entries.
    pub const IOWB_DEPTH: usize = 4;
    /// Inbound probe queue entries.
    pub const PQ_DEPTH: usize = 8;

    /// Instruction cache total size in bytes (64 KiB).
    pub const ICACHE_SIZE: usize = 64 * 1024;
    /// Instruction cache associativity (two-way).
    pub const ICACHE_WAYS: usize = 2;
    /// Instruction cache line size in bytes (16 instructions).
    pub const ICACHE_LINE: usize = 64;

    /// Data cache total size in bytes (64 KiB).
    pub const DCACHE_SIZE: usize = 64 * 1024;
    /// Data cache associativity (two-way).
    pub const DCACHE_WAYS: usize = 2;
    /// Data cache line size in bytes.
    pub const DCACHE_LINE: usize = 64;

    /// ITB/DTB entry count (fully associative).
    pub const TLB_ENTRIES: usize = 128;

    /// Local history table entries (1024, 10-bit shift registers).
    pub const LOCAL_HIST_ENTRIES: usize = 1024;
    /// Local history register width in bits.
    pub const LOCAL_HIST_BITS: u32 = 10;
    /// Local predictor entries (3-bit saturating counters).
    pub const LOCAL_PRED_ENTRIES: usize = 1024;
    /// Global predictor / chooser entries (2-bit saturating counters).
    pub const GLOBAL_PRED_ENTRIES: usize = 4096;
    /// Global path history width in bits.
    pub const GLOBAL_HIST_BITS: u32 = 12;

    /// Number of outstanding requests a CPU may have to a single chipset
    /// connection (`CSC.PRQMAX`-equivalent).
    pub const PRQ_MAX: usize = 4;
    /// Number of outstanding data transfers to a single chipset connection
    /// (`CSC.PDTMAX`-equivalent).
    pub const PDT_MAX: usize = 4;
    /// Per-array request queue depth in the Cchip (spec.md §3: four queues, six
    /// entries each).
    pub const CCHIP_QUEUE_DEPTH: usize = 6;
    /// Number of DRAM arrays behind the Cchip.
    pub const CCHIP_ARRAYS: usize = 4;
    /// Refresh interval in cycles (`MTR.RI`-equivalent).
    pub const REFRESH_INTERVAL: u64 = 7800;
}

/// Pipeline-width and issue-policy configuration.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Instructions fetched/decoded/renamed per cycle (spec.md: up to four).
    pub fetch_width: usize,
    /// In-flight instruction limit (ROB capacity).
    pub in_flight_max: usize,
    /// Integer physical register file size.
    pub int_prf_size: usize,
    /// Floating-point physical register file size.
    pub fp_prf_size: usize,
    /// Integer issue queue depth.
    pub iq_depth: usize,
    /// Floating-point issue queue depth.
    pub fq_depth: usize,
    /// When set, only the oldest eligible entry in each queue may issue per
    /// cycle (spec.md §4.4 single-issue mode).
    pub single_issue: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_width: 4,
            in_flight_max: defaults::IN_FLIGHT_MAX,
            int_prf_size: defaults::INT_PRF_SIZE,
            fp_prf_size: defaults::FP_PRF_SIZE,
            iq_depth: defaults::IQ_DEPTH,
            fq_depth: defaults::FQ_DEPTH,
            single_issue: false,
        }
    }
}

/// Branch predictor table sizes (spec.md §4.1 / §2).
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Local history table entry count.
    pub local_hist_entries: usize,
    /// Local history shift-register width in bits.
    pub local_hist_bits: u32,
    /// Local predictor (3-bit saturating counter) entry count.
    pub local_pred_entries: usize,
    /// Global predictor / chooser (2-bit saturating counter) entry count.
    pub global_pred_entries: usize,
    /// Global path history width in bits.
    pub global_hist_bits: u32,
    /// Return-address stack depth (spec.md: same as in-flight limit).
    pub ras_depth: usize,
    /// Prediction mode.
    pub mode: PredictorMode,
}

/// Branch prediction mode (spec.md §4.1).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictorMode {
    /// Always predict not-taken.
    FallThrough,
    /// Use only the local predictor.
    LocalOnly,
    /// Use the chooser to pick between local and global.
    #[default]
    Chooser,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            local_hist_entries: defaults::LOCAL_HIST_ENTRIES,
            local_hist_bits: defaults::LOCAL_HIST_BITS,
            local_pred_entries: defaults::LOCAL_PRED_ENTRIES,
            global_pred_entries: defaults::GLOBAL_PRED_ENTRIES,
            global_hist_bits: defaults::GLOBAL_HIST_BITS,
            ras_depth: defaults::IN_FLIGHT_MAX,
            mode: PredictorMode::Chooser,
        }
    }
}

/// Cache geometry shared by the Icache/Dcache configuration.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Total cache size in bytes.
    pub size: usize,
    /// Set associativity (number of ways).
    pub ways: usize,
    /// Cache line size in bytes.
    pub line_size: usize,
}

impl CacheConfig {
    const fn icache_default() -> Self {
        Self {
            size: defaults::ICACHE_SIZE,
            ways: defaults::ICACHE_WAYS,
            line_size: defaults::ICACHE_LINE,
        }
    }

    const fn dcache_default() -> Self {
        Self {
            size: defaults::DCACHE_SIZE,
            ways: defaults::DCACHE_WAYS,
            line_size: defaults::DCACHE_LINE,
        }
    }

    /// Number of sets (`size / (ways * line_size)`).
    pub fn sets(&self) -> usize {
        self.size / (self.ways * self.line_size)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::icache_default()
    }
}

/// Memory-execution-unit queue depths (spec.md §4.6).
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct MboxConfig {
    /// Load queue depth.
    pub ldq_depth: usize,
    /// Store queue depth.
    pub stq_depth: usize,
    /// TLB entry count (fully associative, shared shape for ITB and DTB).
    pub tlb_entries: usize,
}

impl Default for MboxConfig {
    fn default() -> Self {
        Self {
            ldq_depth: defaults::LDQ_DEPTH,
            stq_depth: defaults::STQ_DEPTH,
            tlb_entries: defaults::TLB_ENTRIES,
        }
    }
}

/// Cbox (system interface) queue depths and outstanding-request credit limits
/// (spec.md §4.7).
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct CboxConfig {
    /// Miss-address file entries.
    pub maf_depth: usize,
    /// Victim-data buffer entries.
    pub vdb_depth: usize,
    /// I/O write buffer entries.
    pub iowb_depth: usize,
    /// Inbound probe queue entries.
    pub pq_depth: usize,
    /// Outstanding-request credit limit (`CSC.PRQMAX`-equivalent).
    pub prq_max: usize,
    /// Outstanding-data-transfer credit limit (`CSC.PDTMAX`-equivalent).
    pub pdt_max: usize,
}

impl Default for CboxConfig {
    fn default() -> Self {
        Self {
            maf_depth: defaults::MAF_DEPTH,
            vdb_depth: defaults::VDB_DEPTH,
            iowb_depth: defaults::IOWB_DEPTH,
            pq_depth: defaults::PQ_DEPTH,
            prq_max: defaults::PRQ_MAX,
            pdt_max: defaults::PDT_MAX,
        }
    }
}

/// Chipset (Cchip/Dchip/Pchip) configuration (spec.md §4.8).
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct ChipsetConfig {
    /// Number of DRAM arrays behind the Cchip.
    pub arrays: usize,
    /// Per-array request queue depth.
    pub queue_depth: usize,
    /// Refresh interval in cycles (`MTR.RI`-equivalent).
    pub refresh_interval: u64,
    /// Number of CPUs attached to the chipset.
    pub num_cpus: usize,
}

impl Default for ChipsetConfig {
    fn default() -> Self {
        Self {
            arrays: defaults::CCHIP_ARRAYS,
            queue_depth: defaults::CCHIP_QUEUE_DEPTH,
            refresh_interval: defaults::REFRESH_INTERVAL,
            num_cpus: 1,
        }
    }
}

/// General simulation-driver configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Starting program counter for CPU 0.
    pub start_pc: u64,
    /// Emit a `tracing` event for every retired instruction.
    pub trace_retirement: bool,
    /// Optional cycle budget; `None` runs until the program halts.
    pub max_cycles: Option<u64>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            start_pc: 0,
            trace_retirement: false,
            max_cycles: None,
        }
    }
}

/// Root configuration type; use [`Config::default()`] or deserialize from JSON.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General driver configuration.
    pub general: GeneralConfig,
    /// Pipeline width and issue policy.
    pub pipeline: PipelineConfig,
    /// Branch predictor configuration.
    pub predictor: PredictorConfig,
    /// Instruction cache configuration.
    pub icache: CacheConfig,
    /// Data cache configuration.
    pub dcache: CacheConfig,
    /// Memory execution unit configuration.
    pub mbox: MboxConfig,
    /// System-interface (Cbox) configuration.
    pub cbox: CboxConfig,
    /// Chipset configuration.
    pub chipset: ChipsetConfig,
}

impl Config {
    /// A configuration with `icache`/`dcache` defaults appropriate to each
    /// (since both use the shared [`CacheConfig`] shape but differ in default
    /// geometry only by name, not by field).
    pub fn new_default() -> Self {
        Self {
            icache: CacheConfig::icache_default(),
            dcache: CacheConfig::dcache_default(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_two_way_caches() {
        let cfg = Config::new_default();
        assert_eq!(cfg.icache.ways, 2);
        assert_eq!(cfg.dcache.ways, 2);
        assert_eq!(cfg.icache.sets(), 512);
    }

    #[test]
    fn default_in_flight_matches_ras_depth() {
        let cfg = Config::new_default();
        assert_eq!(cfg.pipeline.in_flight_max, cfg.predictor.ras_depth);
    }

    #[test]
    fn deserializes_partial_json_with_defaults() {
        let cfg: Config = serde_json::from_str(r#"{"pipeline": {"single_issue": true}}"#)
            .expect("valid partial config");
        assert!(cfg.pipeline.single_issue);
        assert_eq!(cfg.pipeline.fetch_width, 4);
    }
}
