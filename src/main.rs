/*!
 * hpp-locate - find the manipulation service and report what it exposes
 */

use clap::{Parser, ValueEnum};
use hpp_locator::{
    config::LogLevel,
    error::{EXIT_PARTIAL, EXIT_SUCCESS},
    logging, Capability, Locator, LocatorConfig, LocatorError, Result,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "hpp-locate")]
#[command(version, about = "Locate the manipulation service through its naming service", long_about = None)]
struct Cli {
    /// Host running the naming service
    #[arg(long, env = "HPP_NAMESERVICE_HOST")]
    host: Option<String>,

    /// Naming service port [default: 2809]
    #[arg(short, long, env = "HPP_NAMESERVICE_PORT")]
    port: Option<u16>,

    /// Namespace suffix appended to "hpp", e.g. "-test"
    #[arg(long, env = "HPP_CONTEXT_SUFFIX", allow_hyphen_values = true)]
    context: Option<String>,

    /// TOML configuration file; command-line values take precedence
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Ping every bound object after connecting
    #[arg(long)]
    ping: bool,

    /// Log level
    #[arg(long = "log-level", value_enum)]
    log_level: Option<LogLevelArg>,

    /// Shorthand for --log-level debug
    #[arg(short, long)]
    verbose: bool,

    /// Write JSON logs to this file instead of stderr
    #[arg(long, value_name = "FILE")]
    log: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;

    if let Err(e) = logging::init_logging(&config.logging) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    let mut locator = Locator::new();

    // A partial binding is still worth reporting
    let failure = match locator.connect(&config).await {
        Ok(()) => None,
        Err(err @ LocatorError::NameResolutionFailed { .. }) => Some(err),
        Err(err) => return Err(err),
    };

    println!(
        "Name service {}:{} (namespace hpp{})",
        config.host, config.port, config.namespace_suffix
    );
    print_report(&locator, failure.as_ref());

    let mut code = failure.as_ref().map_or(EXIT_SUCCESS, LocatorError::exit_code);

    if cli.ping && !ping_all(&locator).await && code == EXIT_SUCCESS {
        code = EXIT_PARTIAL;
    }

    locator.disconnect();
    Ok(code)
}

/// Merge the configuration file (if any) with command-line and environment values
fn build_config(cli: &Cli) -> Result<LocatorConfig> {
    let mut config = match &cli.config {
        Some(path) => LocatorConfig::from_file(path)?,
        None => {
            let host = cli.host.clone().ok_or_else(|| {
                LocatorError::Config(
                    "Naming service host required (--host or HPP_NAMESERVICE_HOST)".to_string(),
                )
            })?;
            LocatorConfig::new(host)
        }
    };

    if let Some(host) = &cli.host {
        config.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(context) = &cli.context {
        config.namespace_suffix = context.clone();
    }
    if let Some(level) = cli.log_level {
        config.logging.log_level = level.into();
    }
    if cli.verbose {
        config.logging.verbose = true;
    }
    if let Some(log) = &cli.log {
        config.logging.log_file = Some(log.clone());
    }

    config.validate()?;
    Ok(config)
}

fn print_report(locator: &Locator, failure: Option<&LocatorError>) {
    for capability in Capability::ALL {
        if let Some(remote) = locator.remote(capability) {
            println!("  {:<8} bound   {}", capability.kind(), remote.object());
        } else if let Some(f) = failure.and_then(|e| e.failure_for(capability)) {
            println!("  {:<8} failed  {} ({})", capability.kind(), f.reason, f.name);
        }
    }
}

/// Ping every bound object; `true` if all of them answered alive
async fn ping_all(locator: &Locator) -> bool {
    let mut all_alive = true;

    for capability in Capability::ALL {
        let Some(remote) = locator.remote(capability) else {
            continue;
        };
        match remote.ping().await {
            Ok(true) => println!("  {:<8} alive", capability.kind()),
            Ok(false) => {
                all_alive = false;
                println!("  {:<8} gone", capability.kind());
            }
            Err(e) => {
                all_alive = false;
                println!("  {:<8} error   {}", capability.kind(), e);
            }
        }
    }

    all_alive
}
