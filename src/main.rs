use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tdfarm::aws::errors::{format_aws_error, is_throttling};
use tdfarm::aws::DeviceFarmClient;
use tdfarm::config::Config;
use tdfarm::finder::devicefarm::{self, DescriptorSummary};
use tdfarm::finder::{FindError, ResourceKind};
use tdfarm::sweep::{SweepError, SweepReport, SweeperRegistry};
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Find and sweep AWS Device Farm resources
#[derive(Parser, Debug)]
#[command(name = "tdfarm", version = tdfarm::VERSION, about, long_about = None)]
struct Args {
    /// AWS region to use
    #[arg(short, long, global = true)]
    region: Option<String>,

    /// Named AWS profile
    #[arg(short, long, global = true)]
    profile: Option<String>,

    /// Endpoint override, for local emulators
    #[arg(long, global = true)]
    endpoint_url: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    /// Output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look up one resource by ARN
    Find {
        /// Resource kind (inferred from the ARN when omitted)
        #[arg(short, long, value_enum)]
        kind: Option<ResourceKind>,

        /// ARN of the resource
        arn: String,
    },

    /// Delete leftover test resources
    Sweep {
        /// Regions to sweep (comma separated)
        #[arg(long, value_delimiter = ',')]
        regions: Vec<String>,

        /// Sweepers to run (comma separated), dependencies included
        #[arg(long, value_delimiter = ',')]
        run: Vec<String>,

        /// Keep going when a sweeper fails
        #[arg(long)]
        allow_failures: bool,

        /// Deletions in flight per sweeper
        #[arg(long)]
        concurrency: Option<usize>,

        /// Only sweep resources whose name starts with this prefix
        #[arg(long)]
        name_prefix: Option<String>,
    },

    /// List registered sweepers
    Sweepers,

    /// Show or change the saved configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Save a default region
    SetRegion { region: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Warning: can't open log file {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("tdfarm started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("tdfarm").join("tdfarm.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".tdfarm").join("tdfarm.log");
    }
    PathBuf::from("tdfarm.log")
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    let mut config = Config::load();

    match run(&args, &mut config).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{:#}", err);
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args, config: &mut Config) -> Result<ExitCode> {
    match &args.command {
        Command::Find { kind, arn } => {
            let result = run_find(args, config, *kind, arn).await;
            if let Err(err) = &result {
                tracing::error!("find failed before a lookup: {:#}", err);
                eprintln!("Error: {:#}", err);
            }
            Ok(ExitCode::from(find_exit_status(&result)))
        }
        Command::Sweep {
            regions,
            run,
            allow_failures,
            concurrency,
            name_prefix,
        } => {
            let mut options = config.sweep.to_options();
            options.run = run.clone();
            options.allow_failures |= *allow_failures;
            if let Some(n) = concurrency {
                options.concurrency = (*n).max(1);
            }
            if name_prefix.is_some() {
                options.name_prefix = name_prefix.clone();
            }

            let regions = if regions.is_empty() {
                config.sweep_regions(args.region.as_deref())
            } else {
                regions.clone()
            };

            run_sweep(args, config, &regions, &options).await
        }
        Command::Sweepers => {
            let registry = SweeperRegistry::with_defaults();
            for name in registry.names() {
                let deps = registry
                    .get(name)
                    .map(|s| s.dependencies().join(", "))
                    .unwrap_or_default();
                if deps.is_empty() {
                    println!("{}", name);
                } else {
                    println!("{} (after {})", name, deps);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Config { action } => match action {
            ConfigAction::Show => {
                let effective = Config {
                    region: Some(config.effective_region(args.region.as_deref())),
                    profile: config.effective_profile(args.profile.as_deref()),
                    ..config.clone()
                };
                println!("{}", serde_json::to_string_pretty(&effective)?);
                Ok(ExitCode::SUCCESS)
            }
            ConfigAction::SetRegion { region } => {
                config.set_region(region)?;
                config.save().context("Failed to save configuration")?;
                println!("Default region set to {}", region);
                Ok(ExitCode::SUCCESS)
            }
        },
    }
}

async fn connect(args: &Args, config: &Config, region: &str) -> Result<DeviceFarmClient> {
    let profile = config.effective_profile(args.profile.as_deref());
    let endpoint_url = args.endpoint_url.as_deref().or(config.endpoint_url.as_deref());

    DeviceFarmClient::new(region, profile.as_deref(), endpoint_url, config.max_attempts)
        .await
        .with_context(|| format!("Failed to create Device Farm client for {}", region))
}

/// How a `find` invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FindOutcome {
    Found,
    NotFound,
    Failed,
}

impl FindOutcome {
    fn classify<T, E>(result: &std::result::Result<T, FindError<E>>) -> Self {
        match result {
            Ok(_) => Self::Found,
            Err(FindError::NotFound { .. }) => Self::NotFound,
            Err(FindError::EmptyResult { .. } | FindError::Remote(_)) => Self::Failed,
        }
    }
}

/// Exit status of `tdfarm find`
///
/// 1 only ever means Device Farm confirmed the resource is gone. Anything
/// that stopped the lookup from happening, or made it fail, is 2.
fn find_exit_status(result: &Result<FindOutcome>) -> u8 {
    match result {
        Ok(FindOutcome::Found) => 0,
        Ok(FindOutcome::NotFound) => 1,
        Ok(FindOutcome::Failed) | Err(_) => 2,
    }
}

async fn run_find(
    args: &Args,
    config: &Config,
    kind: Option<ResourceKind>,
    arn: &str,
) -> Result<FindOutcome> {
    if arn.trim().is_empty() {
        anyhow::bail!("ARN must not be empty");
    }

    let kind = kind
        .or_else(|| ResourceKind::from_arn(arn))
        .with_context(|| format!("Can't tell the resource kind of {}, pass --kind", arn))?;

    let region = config.effective_region(args.region.as_deref());
    let client = connect(args, config, &region).await?;

    tracing::info!("Looking up {} {}", kind, arn);

    let result = devicefarm::find_by_arn(client.conn(), kind, arn).await;
    let outcome = FindOutcome::classify(&result);

    match result {
        Ok(descriptor) => print_summary(&descriptor.summary(), args.output)?,
        Err(FindError::NotFound { request, .. }) => {
            eprintln!("{} not found ({})", kind, request);
        }
        Err(FindError::EmptyResult { request }) => {
            eprintln!("Empty response from Device Farm for {}", request);
        }
        Err(FindError::Remote(err)) => {
            tracing::error!("{} lookup failed: {}", kind, err.message);
            if is_throttling(err.code.as_deref()) {
                tracing::warn!("Throttled by Device Farm, consider raising max_attempts");
            }
            eprintln!("Error: {}", format_aws_error(err.code.as_deref(), &err.message));
        }
    }

    Ok(outcome)
}

fn print_summary(summary: &DescriptorSummary, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(summary)?),
        OutputFormat::Text => {
            println!("Kind:   {}", summary.kind);
            println!("ARN:    {}", summary.arn);
            println!("Name:   {}", summary.name);
            if let Some(detail) = &summary.detail {
                println!("Detail: {}", detail);
            }
        }
    }
    Ok(())
}

async fn run_sweep(
    args: &Args,
    config: &Config,
    regions: &[String],
    options: &tdfarm::sweep::SweepOptions,
) -> Result<ExitCode> {
    let registry = SweeperRegistry::with_defaults();
    // Resolve the plan once so typos fail before any region is touched
    registry.plan(&options.run)?;

    let mut failed = false;

    for region in regions {
        let client = connect(args, config, region).await?;

        match registry.run(&client, options).await {
            Ok(reports) => {
                for report in &reports {
                    print_report(report, args.output)?;
                    failed |= report.failed();
                }
            }
            Err(SweepError::Failed { report }) => {
                print_report(&report, args.output)?;
                for err in &report.errors {
                    eprintln!("  {}", err);
                }
                return Ok(ExitCode::FAILURE);
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn print_report(report: &SweepReport, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Text => println!("{}", report.summary_line()),
        OutputFormat::Json => {
            let errors: Vec<String> = report.errors.iter().map(|e| e.to_string()).collect();
            let value = serde_json::json!({
                "sweeper": report.sweeper,
                "region": report.region,
                "found": report.found,
                "deleted": report.deleted,
                "already_gone": report.already_gone,
                "filtered": report.filtered,
                "skipped": report.skipped,
                "errors": errors,
                "started_at": report.started_at.to_rfc3339(),
                "duration_secs": report.duration.as_secs_f64(),
            });
            println!("{}", serde_json::to_string(&value)?);
        }
    }
    Ok(())
}
