use anyhow::Context;
use clap::Parser;
use deception_core::{EventSink, JsonLinesSink, LoopConfig, RngSource};
use deception_loop::{CountingPacer, DeceptionLoop, Pacer, RandomFaults, RunSummary, ThreadPacer};
use prometheus::Registry;
use prometheus_bridge::{encode_text, PrometheusSink};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Closed-loop simulation of an adaptive deception endpoint.
#[derive(Debug, Parser)]
#[command(name = "deception-sim", version)]
struct Cli {
    /// JSON config file; missing fields use the reference values.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Seed for probe and jitter draws. Random when omitted.
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    max_depth: Option<u32>,
    #[arg(long)]
    base_ms: Option<f64>,
    #[arg(long)]
    jitter_ms: Option<f64>,
    /// Chance that a round attempt hits a simulated connection error.
    #[arg(long, default_value_t = 0.0)]
    fault_probability: f64,
    /// Compute pacing delays without sleeping.
    #[arg(long)]
    dry_run: bool,
    /// Append events here as JSON lines instead of stdout.
    #[arg(long)]
    journal: Option<PathBuf>,
    /// Print Prometheus text exposition to stderr after the run.
    #[arg(long)]
    metrics: bool,
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<LoopConfig> {
        let mut cfg = match &self.config {
            Some(path) => LoopConfig::from_json_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => LoopConfig::default_reference(),
        };
        if let Some(max_depth) = self.max_depth {
            cfg.max_depth = max_depth;
        }
        if let Some(base_ms) = self.base_ms {
            cfg.base_ms = base_ms;
        }
        if let Some(jitter_ms) = self.jitter_ms {
            cfg.jitter_ms = jitter_ms;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    fn journal(&self) -> anyhow::Result<Box<dyn Write>> {
        Ok(match &self.journal {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("opening journal {}", path.display()))?;
                Box::new(BufWriter::new(file))
            }
            None => Box::new(io::stdout()),
        })
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn drive<P: Pacer>(
    cfg: LoopConfig,
    sink: Box<dyn EventSink>,
    pacer: P,
    seed: Option<u64>,
    fault_probability: f64,
) -> anyhow::Result<RunSummary> {
    let entropy = match seed {
        Some(seed) => RngSource::seeded(seed),
        None => RngSource::from_entropy(),
    };
    let mut lp = DeceptionLoop::new(cfg, sink, entropy, pacer)?;
    if fault_probability > 0.0 {
        let fault_seed = seed.map_or_else(rand::random::<u64>, |s| s.wrapping_add(1));
        lp = lp.with_faults(RandomFaults::new(fault_probability, fault_seed)?);
    }
    Ok(lp.run())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let cfg = cli.load_config()?;
    let registry = Registry::new();
    let journal = JsonLinesSink::new(cli.journal()?);
    let sink: Box<dyn EventSink> = if cli.metrics {
        Box::new(PrometheusSink::new(journal, &registry, cfg.endpoint_id.clone())?)
    } else {
        Box::new(journal)
    };

    let summary = if cli.dry_run {
        drive(cfg, sink, CountingPacer::new(), cli.seed, cli.fault_probability)?
    } else {
        drive(cfg, sink, ThreadPacer, cli.seed, cli.fault_probability)?
    };

    info!(
        halt = %summary.halt,
        sessions = summary.sessions,
        failures = summary.failures,
        summary = %serde_json::to_string(&summary)?,
        "run complete"
    );

    if cli.metrics {
        eprint!("{}", encode_text(&registry)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::Parser;

    #[test]
    fn overrides_apply_on_top_of_reference_config() {
        let cli = Cli::parse_from([
            "deception-sim",
            "--max-depth",
            "12",
            "--base-ms",
            "0",
            "--dry-run",
        ]);
        let cfg = cli.load_config().unwrap();
        assert_eq!(cfg.max_depth, 12);
        assert_eq!(cfg.base_ms, 0.0);
        assert_eq!(cfg.jitter_ms, 250.0);
        assert!(cli.dry_run);
    }

    #[test]
    fn invalid_override_is_rejected() {
        let cli = Cli::parse_from(["deception-sim", "--jitter-ms=-5"]);
        assert!(cli.load_config().is_err());
    }
}
