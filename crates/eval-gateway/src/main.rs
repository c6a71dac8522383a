//! Entry point, grounded on `sa_gateway::main`'s CLI dispatch / tracing
//! init / `run_server` shape, trimmed to a single `serve` path — no
//! Doctor/Config/Version subcommands, no dashboard SPA, no MCP/skills/agent
//! registries.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use clap::Parser;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::EnvFilter;

use eval_domain::config::CorsConfig;
use eval_domain::Config;
use eval_gateway::{api, bootstrap};

#[derive(Parser)]
#[command(name = "eval-gateway", version)]
struct Cli {
    /// Path to a TOML config file; falls back to built-in defaults plus env
    /// overrides (spec.md §6 Environment table) if absent.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory of `<spec_id>.json` problem spec files to seed the durable
    /// store's catalog with at startup.
    #[arg(long)]
    problems_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            Config::from_toml_str(&raw)?
        }
        None => Config::default(),
    };
    config.apply_env_overrides();

    run_server(Arc::new(config), cli.problems_dir.as_deref()).await
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,eval_gateway=debug")),
        )
        .json()
        .init();
}

async fn run_server(config: Arc<Config>, problems_dir: Option<&std::path::Path>) -> anyhow::Result<()> {
    tracing::info!("exam evaluation core starting");

    let state = bootstrap::build_app_state(config.clone(), problems_dir).context("building app state")?;
    bootstrap::spawn_background_tasks(&state);

    let cors_layer = build_cors_layer(&state.config.server.cors);
    let max_concurrent = std::env::var("EVAL_MAX_CONCURRENT_REQUESTS")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(256);
    tracing::info!(max_concurrent, "concurrency limit set");

    let app = api::router(state)
        .layer(cors_layer)
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_concurrent));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;
    tracing::info!(addr = %addr, "exam evaluation core listening");

    axum::serve(listener, app).await.context("axum server error")?;
    Ok(())
}

/// Build a [`CorsLayer`] from the configured allowed origins, ported from
/// `sa_gateway::main::build_cors_layer` — origins may carry a trailing `:*`
/// wildcard for the port segment, expanded into a predicate.
fn build_cors_layer(cors: &CorsConfig) -> CorsLayer {
    use axum::http::header;

    if cors.allowed_origins.len() == 1 && cors.allowed_origins[0] == "*" {
        tracing::warn!("CORS configured with wildcard \"*\" — all origins allowed");
        return CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    }

    let mut exact: Vec<HeaderValue> = Vec::new();
    let mut wildcard_prefixes: Vec<String> = Vec::new();

    for origin in &cors.allowed_origins {
        if origin.ends_with(":*") {
            wildcard_prefixes.push(origin.trim_end_matches('*').to_owned());
        } else if let Ok(hv) = origin.parse::<HeaderValue>() {
            exact.push(hv);
        } else {
            tracing::warn!(origin = %origin, "invalid CORS origin, skipping");
        }
    }

    let allow_origin = if wildcard_prefixes.is_empty() {
        AllowOrigin::list(exact)
    } else {
        AllowOrigin::predicate(move |origin, _| {
            let origin_str = origin.to_str().unwrap_or("");
            if exact.iter().any(|e| e.as_bytes() == origin.as_bytes()) {
                return true;
            }
            wildcard_prefixes.iter().any(|prefix| {
                origin_str
                    .strip_prefix(prefix.as_str())
                    .map(|port| !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()))
                    .unwrap_or(false)
            })
        })
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE, axum::http::header::AUTHORIZATION])
}
