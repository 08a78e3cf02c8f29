//! Entry point for the Salary Engine binary.
//!
//! Running this binary starts an HTTP server exposing the salary
//! calculator.  With `SALARY_PREVIEW_URL` set, previews are delegated to
//! that calculator within `SALARY_PREVIEW_TIMEOUT_MS` and computed
//! locally otherwise.  Configuration is read from `SALARY_*` environment
//! variables (see [`salary_engine::config`]); log verbosity follows
//! `RUST_LOG` and defaults to `info`.

use anyhow::Context;
use salary_engine::config::EngineConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = EngineConfig::from_env().context("reading configuration")?;
    let rules = config.load_rules().context("loading statutory rules")?;
    let resolver = config.resolver(rules).context("building resolver")?;
    info!(
        preview_url = config.preview_url.as_deref().unwrap_or("-"),
        preview_timeout_ms = config.preview_timeout.as_millis() as u64,
        "starting salary engine"
    );
    salary_engine::api::serve(&config.bind_addr, resolver).await
}
