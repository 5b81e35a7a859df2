//! Tools to turn a list of hostnames and a template of shared fields into
//! documents, and to load those documents into an Elasticsearch index.
//!
//! A load runs strictly in sequence: both input files are read, the batch is
//! built, the cluster is pinged, and the batch is submitted with the bulk API.
//! Nothing touches the network until both inputs have been read successfully,
//! and an empty hostname list ends the run before any connection is made.

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

mod builder;
mod domain;
mod errors;
mod es_helper;
pub mod inputs;

pub use builder::{build_batch, BuildOutcome};
pub use domain::{
    Batch, BulkStats, Document, Fields, HelperIndexable, Template, HOSTNAME_FIELD,
};
pub use errors::LoaderError;
pub use es_helper::{ConnectedIndex, ElasticHelper};

use amdb_settings::Settings;

/// How a load ended, when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunSummary {
    /// The hostname file had no hostnames. Elasticsearch was not contacted.
    NothingToDo,
    /// The batch was submitted. Some documents may have been rejected.
    Submitted(BulkStats),
}

/// Read the configured inputs and load one document per hostname into the
/// configured index.
///
/// # Errors
/// If an input file is missing or malformed, if Elasticsearch is misconfigured
/// or unreachable, or if a bulk request fails as a whole.
pub async fn run(settings: &Settings) -> Result<RunSummary, LoaderError> {
    let loader = &settings.loader;

    let hostnames = inputs::read_identifiers(&loader.hostnames_file)?;
    let template = inputs::read_template(&loader.template_file)?;

    if template.has_hostname() {
        tracing::warn!(
            path = %loader.template_file.display(),
            "Template defines `{}`; it will be replaced in every document",
            HOSTNAME_FIELD
        );
    }

    let batch = match build_batch(&template, hostnames.as_slice(), &loader.index_name) {
        BuildOutcome::Ready(batch) => batch,
        BuildOutcome::NoIdentifiers => {
            tracing::warn!(
                path = %loader.hostnames_file.display(),
                "No hostnames found to process, nothing to submit"
            );
            return Ok(RunSummary::NothingToDo);
        }
    };

    let connected = ElasticHelper::new(&settings.elasticsearch, loader.chunk_size)?
        .connect()
        .await?;

    tracing::info!(
        documents = batch.len(),
        index = %batch.index_name(),
        "Preparing to index documents"
    );
    let stats = connected.submit(&batch).await?;

    tracing::info!(
        succeeded = stats.succeeded,
        failed = stats.failed,
        "Bulk indexing complete"
    );
    if stats.failed > 0 {
        tracing::warn!(
            failed = stats.failed,
            "Some documents failed to index. Check the Elasticsearch logs for details"
        );
    }

    Ok(RunSummary::Submitted(stats))
}
