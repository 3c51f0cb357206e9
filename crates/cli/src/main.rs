//! Alpha 21264/Tsunami cycle-accurate simulator CLI.
//!
//! Loads a flat binary, builds a [`Config`] (defaults or a JSON override
//! file), constructs a [`System`], and ticks it to its configured cycle
//! budget, printing per-CPU statistics on exit.

use std::{fs, process};

use axp_core::config::Config;
use axp_core::sim::loader;
use axp_core::sim::simulator::System;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "axpsim",
    author,
    version,
    about = "Alpha 21264/Tsunami cycle-accurate simulator",
    long_about = "Runs a flat binary against a simulated four-way superscalar, out-of-order Alpha 21264 core and its Tsunami chipset.\n\nExamples:\n  axpsim -f software/bin/addq.bin\n  axpsim -f software/bin/kernel.bin --config config.json --max-cycles 100000"
)]
struct Cli {
    /// Flat binary to load at physical address zero.
    #[arg(short, long)]
    file: String,

    /// Optional JSON configuration file overriding the built-in defaults.
    #[arg(short, long)]
    config: Option<String>,

    /// Cycle budget; overrides `general.max_cycles` from the config file.
    #[arg(long)]
    max_cycles: Option<u64>,

    /// Emit a `tracing` event for every retired instruction.
    #[arg(long)]
    trace_retirement: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref());
    if let Some(max_cycles) = cli.max_cycles {
        config.general.max_cycles = Some(max_cycles);
    }
    if cli.trace_retirement {
        config.general.trace_retirement = true;
    }

    println!("[*] Loading {}", cli.file);
    let mem = loader::load_binary(&cli.file);

    let mut system = System::new(&config, mem);
    println!(
        "[*] {} CPU(s), fetch_width={}, start_pc={:#x}",
        system.cpus.len(),
        config.pipeline.fetch_width,
        config.general.start_pc
    );

    match config.general.max_cycles {
        Some(budget) => println!("[*] Running for {budget} cycles"),
        None => println!("[*] Running until interrupted"),
    }

    system.run();

    for (i, cpu) in system.cpus.iter().enumerate() {
        println!("\n--- CPU {i} ---");
        cpu.stats.print();
    }
}

/// Loads the base configuration, overridden by a JSON file if one was given.
fn load_config(path: Option<&str>) -> Config {
    let Some(path) = path else {
        return Config::new_default();
    };
    let text = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("[!] FATAL: could not read config '{path}': {e}");
        process::exit(1);
    });
    serde_json::from_str(&text).unwrap_or_else(|e| {
        eprintln!("[!] FATAL: invalid config '{path}': {e}");
        process::exit(1);
    })
}
