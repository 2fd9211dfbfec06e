//! megacanvas CLI: drive synthetic workloads through the surface pools.

mod sim;

use clap::{Args, Parser, Subcommand};
use megacanvas_core::CanvasConfig;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use sim::SimOptions;

#[derive(Parser)]
#[command(name = "megacanvas")]
#[command(about = "Scratch-surface pool simulator with bounded device memory", long_about = None)]
struct Cli {
    /// Log pool decisions (repeat for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Default)]
struct ConfigArgs {
    /// JSON config file (missing fields use defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Smallest requestable edge (overrides config)
    #[arg(long)]
    min_size: Option<u32>,

    /// Largest requestable edge (overrides config)
    #[arg(long)]
    max_size: Option<u32>,

    /// MSAA sample count for the multisampled pool
    #[arg(long)]
    samples: Option<u32>,

    /// Idle slots per pool
    #[arg(long)]
    capacity: Option<usize>,

    /// Padding granularity for fresh surfaces
    #[arg(long)]
    padding: Option<u32>,

    /// Frames between squish passes
    #[arg(long)]
    squish_interval: Option<u32>,

    /// Frames before an idle surface is destroyed
    #[arg(long)]
    max_age: Option<u32>,

    /// Slots a squish pass keeps
    #[arg(long)]
    cull_target: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a synthetic frame workload and report pool diagnostics
    Simulate {
        #[command(flatten)]
        config: ConfigArgs,

        /// Frames to render
        #[arg(long, default_value_t = 600)]
        frames: u64,

        /// Worker threads releasing regions asynchronously
        #[arg(long, default_value_t = 2)]
        workers: usize,

        /// Workload seed
        #[arg(long, default_value_t = 1)]
        seed: u64,

        /// Max requests per regular frame
        #[arg(long, default_value_t = 6)]
        per_frame: u32,

        /// Largest requested edge in pixels
        #[arg(long, default_value_t = 1024)]
        max_request: u32,

        /// Frames between request bursts (0 disables bursts)
        #[arg(long, default_value_t = 120)]
        burst_every: u64,

        /// Requests per burst
        #[arg(long, default_value_t = 96)]
        burst_size: u32,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as JSON
    Config {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Simulate {
            config,
            frames,
            workers,
            seed,
            per_frame,
            max_request,
            burst_every,
            burst_size,
            json,
        } => {
            let opts = SimOptions {
                frames,
                workers,
                seed,
                per_frame,
                max_request,
                burst_every,
                burst_size,
                ..Default::default()
            };
            match run_simulation(&config, &opts, json) {
                Ok(true) => {}
                Ok(false) => {
                    eprintln!("Pool invariants violated");
                    std::process::exit(2);
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Config { config } => match load_config(&config) {
            Ok(cfg) => match serde_json::to_string_pretty(&cfg) {
                Ok(s) => println!("{s}"),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &ConfigArgs) -> Result<CanvasConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => CanvasConfig::from_json(&fs::read_to_string(path)?)?,
        None => CanvasConfig::from_env(),
    };
    apply_overrides(&mut config, args);
    config.validate()?;
    Ok(config)
}

fn apply_overrides(config: &mut CanvasConfig, args: &ConfigArgs) {
    if let Some(v) = args.min_size {
        config.min_size = v;
    }
    if let Some(v) = args.max_size {
        config.max_size = v;
    }
    if let Some(v) = args.samples {
        config.multisample_count = v;
    }
    if let Some(v) = args.capacity {
        config.pool.capacity = v;
    }
    if let Some(v) = args.padding {
        config.pool.padding = v;
    }
    if let Some(v) = args.squish_interval {
        config.pool.squish_interval = v;
    }
    if let Some(v) = args.max_age {
        config.pool.max_age = v;
    }
    if let Some(v) = args.cull_target {
        config.pool.cull_target = v;
    }
}

fn run_simulation(
    args: &ConfigArgs,
    opts: &SimOptions,
    json: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    let config = load_config(args)?;
    let report = sim::run(config, opts)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Frames: {}  Requests: {} ({} rejected, {} released by workers)",
            report.frames, report.requested, report.rejected, report.sent_to_workers
        );
        print!("{}", report.diagnostics);
        println!(
            "Device: {} created / {} destroyed, {} live ({})",
            report.device.created,
            report.device.destroyed,
            report.device.live,
            megacanvas_manager::human_bytes(report.device.live_bytes)
        );
    }

    Ok(report.healthy())
}

#[cfg(test)]
mod tests {
    use super::{apply_overrides, CanvasConfig, ConfigArgs};

    #[test]
    fn flags_override_config() {
        let mut config = CanvasConfig::default();
        let args = ConfigArgs {
            max_size: Some(2048),
            capacity: Some(16),
            cull_target: Some(8),
            ..Default::default()
        };
        apply_overrides(&mut config, &args);
        assert_eq!(config.max_size, 2048);
        assert_eq!(config.pool.capacity, 16);
        assert_eq!(config.pool.cull_target, 8);
        assert_eq!(config.min_size, 1);
        config.validate().unwrap();
    }
}
