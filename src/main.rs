use anyhow::{bail, Context, Result};
use clap::Parser;
use memory_scan::config::{validate_config, Config, ConfigLoader, DEFAULT_CONFIG_FILE};
use memory_scan::{
    Address, CancellationToken, Constraint, ConstraintKind, DataType, ManualScanner,
    MemoryAlignment, MemoryValue, ReadGroup, Snapshot, ValueType,
};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "memory-scan")]
#[command(about = "Scan memory dumps for values matching a constraint")]
#[command(version)]
struct Args {
    /// Dump holding the current values
    #[arg(long)]
    current: PathBuf,

    /// Dump of the same range taken earlier; required by delta constraints
    #[arg(long)]
    previous: Option<PathBuf>,

    /// Address the dumps were read from
    #[arg(long, default_value = "0x0")]
    base: Address,

    /// Element type (i8..i64, u8..u64, f32, f64)
    #[arg(short = 't', long = "type", default_value = "i32")]
    value_type: ValueType,

    /// Interpret elements as big-endian
    #[arg(long)]
    big_endian: bool,

    /// Stride between elements in bytes, overriding the configuration (0 = element size)
    #[arg(short, long)]
    alignment: Option<usize>,

    /// Comparison to apply
    #[arg(short, long, default_value = "equal", conflicts_with = "constraint")]
    compare: ConstraintKind,

    /// Scan value for comparisons that take one
    #[arg(short, long)]
    value: Option<String>,

    /// Full constraint tree as JSON
    #[arg(long)]
    constraint: Option<String>,

    /// Configuration file
    #[arg(long, env = "MEMORY_SCAN_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Number of matching elements to print
    #[arg(short, long, default_value_t = 20)]
    limit: u64,
}

fn load_config(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        ConfigLoader::new(path)
            .load()
            .with_context(|| format!("failed to load {}", path.display()))?
    } else {
        Config::default()
    };
    validate_config(&config)?;
    Ok(config)
}

fn build_constraint(args: &Args, data_type: DataType) -> Result<Constraint> {
    if let Some(json) = &args.constraint {
        return Ok(Constraint::from_json(json)?);
    }

    match (&args.value, args.compare.requires_value()) {
        (Some(text), true) => {
            let value = MemoryValue::parse(text, data_type.value_type)?;
            Ok(Constraint::with_value(args.compare, value))
        }
        (None, true) => bail!("{:?} needs --value", args.compare),
        (_, false) => Ok(Constraint::leaf(args.compare)),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = load_config(&args.config)?;

    // Console and log file share one filter
    let log_file = config
        .logging
        .open_file()
        .with_context(|| format!("failed to open log file {}", config.logging.file))?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(log_file)),
        )
        .init();

    info!("memory-scan v{}", env!("CARGO_PKG_VERSION"));

    if let Some(alignment) = args.alignment {
        config.scanner.alignment = MemoryAlignment::from_bytes(alignment)?;
    }

    let data_type = if args.big_endian {
        DataType::big_endian(args.value_type)
    } else {
        DataType::new(args.value_type)
    };
    let constraint = build_constraint(&args, data_type)?;

    let current = std::fs::read(&args.current)
        .with_context(|| format!("failed to read {}", args.current.display()))?;
    let previous = match &args.previous {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?
        }
        None => {
            if constraint.requires_previous() {
                warn!("no previous dump given, comparing against current values");
            }
            current.clone()
        }
    };

    let group = ReadGroup::from_values(args.base, current, previous)?;
    let snapshot = Snapshot::new(args.current.display().to_string(), vec![group]);

    let scanner = ManualScanner::new(config.scanner.clone())?;
    let outcome = scanner.scan(
        &snapshot,
        &constraint,
        data_type,
        "cli",
        &CancellationToken::new(),
        &|percent: f32| debug!(percent, "scan progress"),
    )?;

    let Some(result) = outcome.snapshot else {
        bail!("scan ended in state {:?}", outcome.state);
    };
    if outcome.failed_regions > 0 {
        warn!(failed = outcome.failed_regions, "some regions could not be scanned");
    }

    println!(
        "{} matches in {} regions ({} bytes) in {:?}",
        result.element_count(),
        result.region_count(),
        result.byte_count(),
        outcome.elapsed
    );

    for index in 0..result.element_count().min(args.limit) {
        if let Some(element) = result.element_at(index, data_type) {
            match (&element.current, &element.previous) {
                (Some(current), Some(previous)) if constraint.requires_previous() => {
                    println!("{}  {} (was {})", element.address, current, previous)
                }
                (Some(current), _) => println!("{}  {}", element.address, current),
                _ => println!("{}", element.address),
            }
        }
    }

    Ok(())
}
