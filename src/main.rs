use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::{info, warn, Level};

use iftraffic_check::data::UNIT_CHOICES;
use iftraffic_check::{Check, CheckConfig, CheckResult, ProcSource, Settings, Severity};

#[derive(Parser, Debug)]
#[command(name = "check-iftraffic", version)]
#[command(about = "Monitoring plugin reporting network interface throughput")]
struct Args {
    /// Alternate data file [default: /var/tmp/traffic_stats.dat]
    #[arg(short = 'f', long)]
    data_file: Option<PathBuf>,

    /// Unit to display per second; the multiplier is 1000 [default: Bps]
    #[arg(short, long, help_heading = "Units", long_help = unit_help())]
    unit: Option<String>,

    /// Percentage of the bandwidth for WARNING [default: 85]
    #[arg(short, long, help_heading = "Thresholds")]
    warning: Option<f64>,

    /// Percentage of the bandwidth for CRITICAL [default: 98]
    #[arg(short, long, help_heading = "Thresholds")]
    critical: Option<f64>,

    /// Maximum bandwidth, in the display unit [default: 100 Mbps]
    #[arg(short, long, help_heading = "Thresholds")]
    bandwidth: Option<f64>,

    /// Only consider interfaces of these link types
    /// (ethernet, loopback, ppp, sit, unspecified, unknown)
    #[arg(short, long, num_args = 1.., help_heading = "Filtering")]
    linktype: Vec<String>,

    /// Only consider these interfaces
    #[arg(
        short,
        long,
        num_args = 1..,
        conflicts_with_all = ["exclude", "excludere"],
        help_heading = "Filtering"
    )]
    interfaces: Vec<String>,

    /// Exclude interfaces by name
    #[arg(
        short = 'x',
        long,
        num_args = 1..,
        conflicts_with_all = ["interfaces", "excludere"],
        help_heading = "Filtering"
    )]
    exclude: Vec<String>,

    /// Exclude interfaces whose name matches a regular expression
    #[arg(
        short = 'X',
        long,
        num_args = 1..,
        conflicts_with_all = ["interfaces", "exclude"],
        help_heading = "Filtering"
    )]
    excludere: Vec<String>,

    /// Config file with default settings (TOML, YAML, JSON, ...)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also write the result as JSON to this file
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Log to stderr; repeat for more detail
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn unit_help() -> String {
    format!(
        "Unit to display per second: {}. The multiplier is 1000. [default: Bps]",
        UNIT_CHOICES.join(", ")
    )
}

impl Args {
    /// Override loaded settings with the flags given on the command line.
    fn apply(&self, settings: &mut Settings) {
        if let Some(ref data_file) = self.data_file {
            settings.data_file = data_file.clone();
        }
        if let Some(ref unit) = self.unit {
            settings.unit = unit.clone();
        }
        if let Some(warning) = self.warning {
            settings.warning = warning;
        }
        if let Some(critical) = self.critical {
            settings.critical = critical;
        }
        if self.bandwidth.is_some() {
            settings.bandwidth = self.bandwidth;
        }
        if !self.linktype.is_empty() {
            settings.linktype = self.linktype.clone();
        }
        // The filter modes exclude each other, so a flag replaces all three.
        if !self.interfaces.is_empty() || !self.exclude.is_empty() || !self.excludere.is_empty() {
            settings.interfaces = self.interfaces.clone();
            settings.exclude = self.exclude.clone();
            settings.excludere = self.excludere.clone();
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(result) => {
            println!("{}", result);
            ExitCode::from(result.exit_code())
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(Severity::Unknown.exit_code())
        }
    }
}

/// Logs go to stderr; stdout carries the plugin output.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(args: &Args) -> Result<CheckResult> {
    let mut settings =
        Settings::load(args.config.as_deref()).context("Failed to load settings")?;
    args.apply(&mut settings);
    let config = CheckConfig::try_from(settings).context("Invalid settings")?;
    info!(
        "Checking with data file {} and bandwidth {} {}",
        config.data_file.display(),
        config.bandwidth,
        config.unit
    );

    let check = Check::new(config);
    let result = check.run(&mut ProcSource::new())?;
    let (ok, warning, critical) = result.counts();
    info!(
        "{} records: {} ok, {} warning, {} critical",
        result.records.len(),
        ok,
        warning,
        critical
    );

    if let Some(ref export_path) = args.export {
        // The plugin output matters more than the export.
        if let Err(e) = export_to_file(&result, export_path) {
            warn!("{:#}", e);
        }
    }

    Ok(result)
}

/// Export the result to a JSON file
fn export_to_file(result: &CheckResult, export_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    std::fs::write(export_path, json)
        .with_context(|| format!("Failed to export to {}", export_path.display()))?;
    info!("Exported result to: {}", export_path.display());
    Ok(())
}
