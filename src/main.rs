//! Subreddit digest: binary entrypoint.
//! Loads configuration, runs the pipeline once and maps the outcome to an exit code:
//! 0 delivered, 1 aborted, 2 delivery failed (digest kept on disk).

use std::process::ExitCode;

use subreddit_digest::{AppConfig, Orchestrator, RunOutcome};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("subreddit_digest=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let metrics = match subreddit_digest::telemetry::Metrics::init() {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!(error = ?e, "metrics recorder not installed");
            None
        }
    };

    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "invalid configuration");
            return ExitCode::from(1);
        }
    };
    let textfile = config.metrics_textfile.clone();

    let orchestrator = match Orchestrator::from_config(config) {
        Ok(o) => o,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "could not set up pipeline");
            return ExitCode::from(1);
        }
    };

    let code = match orchestrator.run().await {
        Ok(RunOutcome::Delivered(report)) => {
            let meta = &report.digest.meta;
            if meta.is_partial() {
                tracing::warn!(
                    failed_batches = meta.failures.len(),
                    batches = meta.batches,
                    "digest delivered with partial coverage"
                );
            } else {
                tracing::info!(insights = report.digest.insight_count(), "digest delivered");
            }
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::SendFailed {
            error, preserved_at, ..
        }) => {
            tracing::error!(
                error = %error,
                preserved_at = ?preserved_at,
                "digest generated but not delivered"
            );
            ExitCode::from(2)
        }
        Err(e) => {
            tracing::error!(error = %e, "digest run aborted");
            ExitCode::from(1)
        }
    };

    if let (Some(m), Some(path)) = (metrics.as_ref(), textfile.as_deref()) {
        if let Err(e) = m.write_textfile(path) {
            tracing::warn!(error = ?e, "could not write metrics textfile");
        }
    }

    code
}
