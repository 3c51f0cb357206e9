//! Simulation statistics collection and reporting.

/// Per-CPU cycle-level counters, incremented by the Ibox, Ebox/Fbox, Mbox, and
/// Cbox as instructions move through the pipeline.
#[derive(Clone, Debug, Default)]
pub struct Stats {
    /// Total cycles simulated.
    pub cycles: u64,
    /// Instructions retired (architectural commit).
    pub retired: u64,
    /// Instructions fetched (including those later squashed).
    pub fetched: u64,
    /// Branch predictions made.
    pub branches_predicted: u64,
    /// Branch mispredictions (direction or target).
    pub branches_mispredicted: u64,
    /// Icache hits.
    pub icache_hits: u64,
    /// Icache misses.
    pub icache_misses: u64,
    /// Dcache hits.
    pub dcache_hits: u64,
    /// Dcache misses.
    pub dcache_misses: u64,
    /// ITB misses.
    pub itb_misses: u64,
    /// DTB misses.
    pub dtb_misses: u64,
    /// Store-to-load forwards serviced by the store queue.
    pub stq_forwards: u64,
    /// Store-conditional successes.
    pub sc_success: u64,
    /// Store-conditional failures.
    pub sc_failure: u64,
    /// Probes serviced by the Mbox.
    pub probes_serviced: u64,
    /// System-bus commands issued by the Cbox.
    pub bus_commands_issued: u64,
    /// SysDc responses received by the Cbox.
    pub sysdc_responses: u64,
}

impl Stats {
    /// Instructions retired per cycle, or `0.0` if no cycles have elapsed.
    pub fn ipc(&self) -> f64 {
        if self.cycles == 0 {
            0.0
        } else {
            self.retired as f64 / self.cycles as f64
        }
    }

    /// Branch misprediction rate, or `0.0` if no branches were predicted.
    pub fn misprediction_rate(&self) -> f64 {
        if self.branches_predicted == 0 {
            0.0
        } else {
            self.branches_mispredicted as f64 / self.branches_predicted as f64
        }
    }

    /// Prints a human-readable summary to stdout.
    pub fn print(&self) {
        println!("cycles={} retired={} ipc={:.3}", self.cycles, self.retired, self.ipc());
        println!(
            "branches: predicted={} mispredicted={} rate={:.3}",
            self.branches_predicted,
            self.branches_mispredicted,
            self.misprediction_rate()
        );
        println!(
            "icache: hits={} misses={}  dcache: hits={} misses={}",
            self.icache_hits, self.icache_misses, self.dcache_hits, self.dcache_misses
        );
        println!(
            "tlb: itb_misses={} dtb_misses={}  stq_forwards={}",
            self.itb_misses, self.dtb_misses, self.stq_forwards
        );
        println!(
            "ll/sc: success={} failure={}  probes_serviced={}",
            self.sc_success, self.sc_failure, self.probes_serviced
        );
        println!(
            "bus: commands_issued={} sysdc_responses={}",
            self.bus_commands_issued, self.sysdc_responses
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipc_is_zero_before_any_cycles() {
        let s = Stats::default();
        assert_eq!(s.ipc(), 0.0);
    }

    #[test]
    fn ipc_computed_correctly() {
        let s = Stats {
            cycles: 100,
            retired: 250,
            ..Default::default()
        };
        assert!((s.ipc() - 2.5).abs() < f64::EPSILON);
    }
}
