// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Execution strategy comparator.
//!
//! Drives identical node arrays through every available strategy and reports
//! step timing plus the largest divergence from the single-threaded result.

use std::env;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use arti_neural::config::{load_config, load_config_or_default, validate_config};
use arti_neural::observability::{debug_flags_help, init_logging, parse_debug_flags};
use arti_neural::prelude::*;
use arti_neural::{execution_settings, logging_settings};
use tracing::{info, warn};

struct Args {
    config: Option<PathBuf>,
    units: usize,
    ticks: usize,
    drive: f32,
    variant: NodeVariant,
}

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: strategy_compare [--config <path>] [--units <n>] [--ticks <n>] [--drive <current>] [--variant <name>]\n\n\
         Defaults:\n\
         - units: 10000\n\
         - ticks: 200\n\
         - drive: 10.0\n\
         - variant: regular_spiking\n\n{}",
        debug_flags_help()
    );
    process::exit(2);
}

fn parse_value<T: std::str::FromStr>(flag: &str, value: Option<String>) -> T {
    let raw = value.unwrap_or_else(|| usage_and_exit());
    raw.parse().unwrap_or_else(|_| {
        eprintln!("Invalid value for {flag}: {raw}");
        usage_and_exit()
    })
}

fn parse_args() -> Args {
    let mut args = Args {
        config: None,
        units: 10_000,
        ticks: 200,
        drive: 10.0,
        variant: NodeVariant::RegularSpiking,
    };

    let mut raw = env::args().skip(1);
    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--config" => args.config = Some(parse_value("--config", raw.next())),
            "--units" => args.units = parse_value("--units", raw.next()),
            "--ticks" => args.ticks = parse_value("--ticks", raw.next()),
            "--drive" => args.drive = parse_value("--drive", raw.next()),
            "--variant" => args.variant = parse_value("--variant", raw.next()),
            "-h" | "--help" => usage_and_exit(),
            other if other.starts_with("--debug-") => {}
            other => {
                eprintln!("Unknown argument: {other}");
                usage_and_exit();
            }
        }
    }

    args
}

struct Outcome {
    strategy: ExecutionStrategy,
    backend: String,
    step_time: Duration,
    spikes: usize,
    potentials: Vec<f32>,
}

fn run(settings: &ExecutionSettings, strategy: ExecutionStrategy, args: &Args) -> Result<Option<Outcome>> {
    let mut registry = NodeRegistry::new(settings.clone().with_strategy(strategy));
    if registry.selected_strategy() != strategy {
        warn!(requested = %strategy, selected = %registry.selected_strategy(), "strategy unavailable, skipping");
        return Ok(None);
    }

    let mut array = NodeArray::new(&mut registry, args.variant.parameters())?;
    array.add_units(&mut registry, (0..args.units).map(|i| format!("unit_{i}")))?;
    for slot in 0..args.units {
        // Spread drive so units fire at different rates
        let scale = 0.5 + (slot % 16) as f32 / 16.0;
        array.add_input(slot, args.drive * scale)?;
    }

    let mut step_time = Duration::ZERO;
    let mut spikes = 0;
    for _ in 0..args.ticks {
        let report = array.step()?;
        step_time += report.elapsed;
        spikes += report.spikes;
    }

    Ok(Some(Outcome {
        strategy,
        backend: registry.backend_name().to_string(),
        step_time,
        spikes,
        potentials: array.potentials().to_vec(),
    }))
}

fn max_divergence(reference: &[f32], other: &[f32]) -> f32 {
    reference
        .iter()
        .zip(other)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f32::max)
}

fn main() -> Result<()> {
    let args = parse_args();

    let config = match &args.config {
        Some(path) => load_config(Some(path), None)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => load_config_or_default(None)?,
    };
    validate_config(&config)?;

    let _logging = init_logging(&logging_settings(&config, parse_debug_flags())?)?;
    let settings = execution_settings(&config)?;

    info!(
        units = args.units,
        ticks = args.ticks,
        variant = %args.variant,
        "comparing strategies"
    );

    let mut strategies = vec![
        ExecutionStrategy::SingleThreaded,
        ExecutionStrategy::MultiThreaded,
        ExecutionStrategy::Simd,
    ];
    if cfg!(feature = "cuda") {
        strategies.push(ExecutionStrategy::Gpu);
    }

    let mut outcomes = Vec::new();
    for strategy in strategies {
        if let Some(outcome) = run(&settings, strategy, &args)? {
            outcomes.push(outcome);
        }
    }

    let Some(reference) = outcomes.first() else {
        eprintln!("No strategy could be initialized");
        process::exit(1);
    };

    println!(
        "{:<16} {:<40} {:>12} {:>10} {:>14}",
        "strategy", "backend", "step ms", "spikes", "max |dv|"
    );
    for outcome in &outcomes {
        println!(
            "{:<16} {:<40} {:>12.3} {:>10} {:>14.3e}",
            outcome.strategy.to_string(),
            outcome.backend,
            outcome.step_time.as_secs_f64() * 1000.0,
            outcome.spikes,
            max_divergence(&reference.potentials, &outcome.potentials),
        );
    }

    Ok(())
}
