use anyhow::{Context, Result};
use bootstrapper::config::LoggingConfig;
use bootstrapper::{
    Bootstrapper, BootstrapperBuilder, BootstrapperConfig, BootstrapperEvent, EventReceiver,
    HostedBootstrapper, Initializer, Placement, SimulatedUnit, UnitConfig, UnitId,
};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(name = "bootstrapper")]
#[command(about = "Dependency-aware startup and shutdown of in-process initializers")]
#[command(version)]
#[command(long_about = "Starts a set of initializers in an order derived from their placements \
and dependencies, keeps the host informed while transitions run, and stops them again in \
shutdown order when the process receives SIGINT or SIGTERM. Units are simulated from the \
[[units]] table of the configuration file.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "bootstrapper.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and unit declarations, then exit")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Print the startup and shutdown plans and exit
    #[arg(long, help = "Build the startup and shutdown plans, print them and exit")]
    print_plan: bool,

    /// Plan output format (text, json)
    #[arg(long, value_name = "FORMAT", default_value = "text", help = "Plan output format: text or json")]
    plan_format: String,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle special modes that don't require full initialization
    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    let config = BootstrapperConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config))?;

    let guard = init_logging(&args, &config.logging)?;

    info!("Starting bootstrapper v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    if args.validate_config {
        match config
            .validate()
            .map_err(anyhow::Error::from)
            .and_then(|()| build_bootstrapper(&config).map(|_| ()))
        {
            Ok(()) => {
                info!("Configuration validation successful");
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("Configuration validation failed: {:#}", e);
                eprintln!("✗ Configuration validation failed: {:#}", e);
                std::process::exit(1);
            }
        }
    }

    config.validate().context("Invalid configuration")?;
    let bootstrapper = build_bootstrapper(&config)?;

    if args.print_plan {
        print_plan(&bootstrapper, &args.plan_format)?;
        return Ok(());
    }

    let bootstrapper = Arc::new(bootstrapper);
    let mut events = EventReceiver::new(bootstrapper.subscribe(), "host");
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                BootstrapperEvent::StateChanged { state } => info!("Bootstrapper is {}", state),
                BootstrapperEvent::AdditionalTimeRequested { duration } => {
                    info!("Transition needs up to {:?} more", duration)
                }
            }
        }
    });

    let host = HostedBootstrapper::new(bootstrapper);
    let exit_code = match host.run_until_signal().await {
        Ok(code) => code,
        Err(e) => {
            error!("Bootstrapper failed: {}", e);
            1
        }
    };

    info!("Bootstrapper exited with code: {}", exit_code);

    // Flush file logs before exiting
    drop(guard);
    std::process::exit(exit_code);
}

fn build_bootstrapper(config: &BootstrapperConfig) -> Result<Bootstrapper> {
    let units: Vec<Arc<dyn Initializer>> = config
        .units
        .iter()
        .map(|unit| Arc::new(SimulatedUnit::from_config(unit)) as Arc<dyn Initializer>)
        .collect();

    let bootstrapper = BootstrapperBuilder::new()
        .configure(|registry| {
            registry.add_initializers(units);
        })
        .additional_time(config.additional_time())
        .build()?;

    Ok(bootstrapper)
}

fn print_plan(bootstrapper: &Bootstrapper, format: &str) -> Result<()> {
    let startup = bootstrapper.startup_process()?.shape();
    let shutdown = bootstrapper.shutdown_process()?.shape();

    match format {
        "json" => {
            let plans = serde_json::json!({ "startup": startup, "shutdown": shutdown });
            println!("{}", serde_json::to_string_pretty(&plans)?);
        }
        _ => {
            println!("startup:  {}", startup);
            println!("shutdown: {}", shutdown);
        }
    }
    Ok(())
}

fn init_logging(args: &Args, logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    // Determine log level based on flags
    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        logging.level.as_str()
    };

    // Create environment filter
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bootstrapper={}", log_level)));

    // Configure format based on options
    let fmt_layer = match args.log_format.as_deref().unwrap_or(logging.format.as_str()) {
        "json" => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        "compact" => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        "pretty" => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        format => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    // Optional daily rotated log file
    let (file_layer, guard) = match &logging.file {
        Some(file) => {
            let path = Path::new(file);
            let directory = path
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .with_context(|| format!("Log file path '{}' has no file name", file))?;

            let appender = tracing_appender::rolling::daily(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false).boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(file_layer)
        .with(env_filter)
        .init();

    Ok(guard)
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# Bootstrapper Configuration File");
    println!("# Default settings plus two sample units; placements are First, Beginning, Ending or Last");
    println!();

    let mut config = BootstrapperConfig::default();

    let mut database = UnitConfig::new("database");
    database.start_placement = Placement::First;
    database.start_delay_ms = 500;
    database.stop_delay_ms = 200;

    let mut api = UnitConfig::new("api");
    api.start_after = vec![UnitId::from("database")];
    api.start_delay_ms = 250;

    config.units = vec![database, api];

    let rendered = toml::to_string_pretty(&config)?;
    println!("{}", rendered);
    Ok(())
}
