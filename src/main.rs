//! Mock Synth - CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use mock_synth::engine::{EngineConfig, ResolvedResponse, ResponseEngine};
use mock_synth::matcher::{split_target, Matcher};
use mock_synth::MockConfig;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "mock-synth",
    about = "Synthesize mock responses from TypeScript interfaces with request guards and interpolation",
    version
)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "mock-synth.yaml")]
    config: PathBuf,

    /// Directory of interface declarations (overrides settings.interfaces_dir)
    #[arg(short, long)]
    interfaces: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: Level,

    /// Print default configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,

    /// Resolve one request, e.g. "GET /users/7?page=2"
    #[arg(short, long, value_name = "REQUEST")]
    request: Option<String>,

    /// JSON request body for --request
    #[arg(short, long, value_name = "JSON")]
    body: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Print default config if requested
    if args.print_config {
        let default_config = include_str!("../demos/default-config.yaml");
        println!("{}", default_config);
        return Ok(());
    }

    // Load configuration
    let mut config = if args.config.exists() {
        info!(path = ?args.config, "Loading configuration");
        MockConfig::from_file(&args.config)?
    } else if args.validate {
        anyhow::bail!("Configuration file not found: {:?}", args.config);
    } else {
        info!("Using default configuration (no endpoints)");
        MockConfig::default()
    };

    if let Some(dir) = args.interfaces {
        let cwd = std::env::current_dir().context("cannot read the current directory")?;
        config.settings.override_interfaces_dir(dir, &cwd);
    }

    // Validate and exit if requested
    if args.validate {
        config.validate()?;
        println!(
            "Configuration is valid ({} endpoints defined)",
            config.endpoints.len()
        );
        return Ok(());
    }

    let base_dir = args
        .config
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let engine_config = EngineConfig::from_settings(&config.settings, base_dir)?;
    let engine = ResponseEngine::new(engine_config);
    let endpoints = engine.prepare_all(&config).await;

    let Some(request) = args.request else {
        for endpoint in &endpoints {
            println!("{:<7} {:<30} {}", endpoint.method, endpoint.path, endpoint.id);
        }
        return Ok(());
    };

    let (method, target) = request
        .trim()
        .split_once(char::is_whitespace)
        .map(|(m, t)| (m.to_string(), t.trim().to_string()))
        .unwrap_or_else(|| ("GET".to_string(), request.trim().to_string()));
    let (path, query) = split_target(&target);

    let body = match &args.body {
        Some(raw) => serde_json::from_str(raw).context("--body is not valid JSON")?,
        None => serde_json::Value::Null,
    };

    let matcher = Matcher::new(&endpoints);
    let response = match matcher.find_match(&endpoints, &method, path, query) {
        Some(result) => {
            info!(endpoint = %result.endpoint.id, method = %method, path = %path, "Request matched endpoint");
            let ctx = result.context.with_body(body);
            engine.resolve(result.endpoint, &ctx).await
        }
        None => {
            warn!(method = %method, path = %path, "No matching endpoint found");
            ResolvedResponse::new(
                404,
                json!({"error": "not_found", "message": "No matching endpoint found"}),
            )
        }
    };

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
