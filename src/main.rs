//! herakles-process-info - version 0.1.0
//!
//! Single-slot PID query service with tracing logging.
//! This is the main entry point that initializes the server and handles subcommands.

mod cli;
mod commands;
mod config;
mod handlers;
mod metrics;
mod startup_checks;
mod state;

use axum::{routing::get, Router};
use clap::Parser;
use herakles_process_info::{ExtractOptions, ProcessInfoService, ProcfsTable, QuerySession};
use prometheus::Registry;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;
use tokio::{net::TcpListener, signal};
use tracing::{debug, error, info, Level};

use cli::{Args, Commands, LogLevel};
use commands::{command_check, command_config, command_query};
use config::{
    resolve_config, show_config, validate_effective_config, Config, DEFAULT_BIND_ADDR, DEFAULT_PORT,
};
use handlers::{health_handler, metrics_handler, read_handler, root_handler, write_handler};
use metrics::QueryMetrics;
use state::AppState;

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(config: &Config, args: &Args) {
    // An explicit --log-level wins over the config file.
    let from_config = match config.log_level.as_deref() {
        Some("error") | Some("off") => Some(Level::ERROR),
        Some("warn") => Some(Level::WARN),
        Some("debug") => Some(Level::DEBUG),
        Some("trace") => Some(Level::TRACE),
        Some("info") => Some(Level::INFO),
        _ => None,
    };
    let log_level = match args.log_level {
        LogLevel::Off => Level::ERROR,
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => from_config.unwrap_or(Level::INFO),
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    info!("Logging initialized with level: {}", log_level);
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Builds the HTTP router for the enabled endpoints.
fn build_router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/", get(root_handler))
        .route(
            "/process_info",
            get(read_handler).put(write_handler).post(write_handler),
        );

    if state.config.enable_metrics.unwrap_or(true) {
        app = app.route("/metrics", get(metrics_handler));
    }

    if state.config.enable_health.unwrap_or(true) {
        app = app.route("/health", get(health_handler));
    }

    app.with_state(state)
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format);
    }

    // Handle subcommands
    if let Some(command) = &args.command {
        if let Commands::Config { output, format } = command {
            return command_config(output.clone(), format.clone());
        }

        let config = load_validated_config(&args)?;

        return match command {
            Commands::Query { pid } => Ok(command_query(pid, &config)?),
            Commands::Check => command_check(&config),
            Commands::Config { .. } => unreachable!("Config handled above"),
        };
    }

    // Load configuration for main server mode
    let config = load_validated_config(&args)?;

    setup_logging(&config, &args);

    info!("Starting herakles-process-info");

    let proc_root = config.proc_root();
    if let Err(e) = startup_checks::validate_requirements(&proc_root) {
        error!("❌ Startup validation failed: {}", e);
        error!("   The service will start but lookups may degrade to Unknown!");
    }

    let bind_ip_str = config.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
    let port = config.port.unwrap_or(DEFAULT_PORT);

    let options = ExtractOptions::with_mode(config.command_line_mode());
    info!(
        "Resolving processes under {} (command line mode: {})",
        proc_root.display(),
        options.command_line_mode
    );
    let service = Arc::new(ProcessInfoService::new(
        Arc::new(ProcfsTable::new(proc_root)),
        Arc::new(QuerySession::new()),
        options,
    ));
    info!("process_info registered");

    // Initialize Prometheus metrics registry
    let registry = Registry::new();
    let metrics = QueryMetrics::new(&registry)?;
    debug!("All metrics registered successfully");

    let state = Arc::new(AppState {
        service,
        registry,
        metrics,
        config: Arc::new(config.clone()),
        start_time: Instant::now(),
    });

    // Setup graceful shutdown signal handlers
    let shutdown_signal = async {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
            }
            _ = terminate => {
                info!("Received SIGTERM, shutting down gracefully...");
            }
        }
    };

    // Configure HTTP server routes
    let bind_ip: IpAddr = bind_ip_str.parse()?;
    let addr = SocketAddr::new(bind_ip, port);
    let app = build_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(
        "herakles-process-info listening on http://{}:{}",
        bind_ip_str, port
    );

    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!("Server error: {}", e);
                return Err(e.into());
            }
        }
        _ = shutdown_signal => {
            info!("Shutdown signal received, exiting...");
        }
    }

    info!("process_info deregistered");
    info!("herakles-process-info stopped gracefully");
    Ok(())
}
