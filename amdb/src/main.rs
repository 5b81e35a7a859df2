//! Load one Elasticsearch document per hostname.
//!
//! The hostname list, the template of shared fields, the target index and the
//! cluster address all come from settings; see
//! [amdb-settings](../amdb_settings/index.html). The library half lives in
//! [amdb-loader](../amdb_loader/index.html).

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

use amdb_loader::RunSummary;
use amdb_settings::{LogFormat, Settings};
use anyhow::{Context, Result};
use tracing_log::LogTracer;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

/// Primary entry point
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let settings = Settings::load().context("Loading settings")?;
    init_logging(&settings)?;

    match amdb_loader::run(&settings).await {
        Ok(RunSummary::Submitted(stats)) => {
            println!(
                "Indexed {} documents into '{}', {} failed",
                stats.succeeded, settings.loader.index_name, stats.failed
            );
            Ok(())
        }
        Ok(RunSummary::NothingToDo) => Ok(()),
        Err(error) if !error.is_fatal() => {
            let error = anyhow::Error::new(error);
            tracing::error!(error = %format!("{:#}", error), "Bulk indexing failed");
            Ok(())
        }
        Err(error) => Err(error).context("Loading hostnames into Elasticsearch"),
    }
}

/// Set up logging, based on settings and the `RUST_LOG` environment variable.
fn init_logging(settings: &Settings) -> Result<()> {
    LogTracer::init()?;
    let env_filter: EnvFilter = (&settings.logging.levels).into();
    let registry = tracing_subscriber::registry().with(env_filter);

    match settings.logging.format {
        LogFormat::Pretty => {
            tracing::subscriber::set_global_default(registry.with(fmt::layer().pretty()))?
        }
        LogFormat::Compact => {
            tracing::subscriber::set_global_default(registry.with(fmt::layer().compact()))?
        }
        LogFormat::Json => {
            tracing::subscriber::set_global_default(registry.with(fmt::layer().json()))?
        }
    }

    Ok(())
}
