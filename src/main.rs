//! site-regulator entry point: CLI wiring, startup hydration, and the
//! scheduler / server tasks.

use std::path::Path;
use std::process;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use site_regulator::api;
use site_regulator::config::ServiceConfig;
use site_regulator::cycle::{CycleScheduler, Regulator, hydrate_energy};
use site_regulator::error::StartupError;
use site_regulator::inference::FuzzyInference;
use site_regulator::io::CsvSink;
use site_regulator::state::SharedState;

/// Parsed CLI arguments.
struct CliArgs {
    config_path: Option<String>,
    bind: Option<String>,
    period_secs: Option<f64>,
}

fn print_help() {
    eprintln!("site-regulator: multi-tenant environmental regulation service");
    eprintln!();
    eprintln!("Usage: site-regulator [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <path>     Load service config from TOML file");
    eprintln!("  --bind <addr>       Override listen address (default: 0.0.0.0:8000)");
    eprintln!("  --period <secs>     Override cycle period in seconds (default: 3)");
    eprintln!("  --help              Show this help message");
    eprintln!();
    eprintln!("RUST_LOG overrides the [logging] filter.");
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        config_path: None,
        bind: None,
        period_secs: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--config" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --config requires a path argument");
                    process::exit(1);
                }
                cli.config_path = Some(args[i].clone());
            }
            "--bind" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --bind requires an address argument");
                    process::exit(1);
                }
                cli.bind = Some(args[i].clone());
            }
            "--period" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --period requires a number of seconds");
                    process::exit(1);
                }
                if let Ok(p) = args[i].parse::<f64>() {
                    cli.period_secs = Some(p);
                } else {
                    eprintln!("error: --period value \"{}\" is not a number", args[i]);
                    process::exit(1);
                }
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn wait_for_stop(mut stop: watch::Receiver<bool>) {
    // a dropped sender also means stop
    let _ = stop.wait_for(|stopped| *stopped).await;
}

async fn run(config: ServiceConfig) -> Result<(), StartupError> {
    let addr = config.bind_addr()?;
    let shared = SharedState::new(config.cycle_config());

    let sink = Arc::new(CsvSink::new(&config.persistence.path));
    hydrate_energy(&shared.store, sink.as_ref()).map_err(StartupError::Hydration)?;
    info!(path = %sink.path().display(), "record log ready");

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown requested");
                let _ = stop_tx.send(true);
            }
            Err(e) => {
                error!(error = %e, "cannot listen for shutdown signal");
                // keep the sender alive so nothing stops
                std::future::pending::<()>().await;
            }
        }
    });

    let regulator = Regulator::with_catalogue(FuzzyInference::new());
    let scheduler = CycleScheduler::new(Arc::clone(&shared), regulator, sink);
    let mut scheduler_task = tokio::spawn(scheduler.run_until(wait_for_stop(stop_rx.clone())));

    let server = api::serve(shared, addr, wait_for_stop(stop_rx));
    tokio::pin!(server);
    tokio::select! {
        served = &mut server => {
            if served.is_err() {
                scheduler_task.abort();
            }
            if matches!(scheduler_task.await, Err(ref e) if e.is_panic()) {
                error!("cycle scheduler task panicked");
            }
            served
        }
        joined = &mut scheduler_task => match joined {
            // stop was requested; let the server drain
            Ok(()) => server.await,
            Err(e) => {
                error!(error = %e, "cycle scheduler task failed");
                Err(StartupError::SchedulerStopped)
            }
        },
    }
}

#[tokio::main]
async fn main() {
    let cli = parse_args();

    let mut config = match cli.config_path {
        Some(ref path) => match ServiceConfig::from_toml_file(Path::new(path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        },
        None => ServiceConfig::default(),
    };

    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if let Some(period) = cli.period_secs {
        config.cycle.period_secs = period;
    }

    let errors = config.validate();
    if !errors.is_empty() {
        eprintln!("{}", StartupError::Invalid(errors));
        process::exit(1);
    }

    init_tracing(&config.logging.filter);

    if let Err(e) = run(config).await {
        error!(error = %e, "site-regulator stopped");
        process::exit(1);
    }
}
