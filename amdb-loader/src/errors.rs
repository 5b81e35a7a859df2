//! Everything that can stop a load.

use std::path::PathBuf;
use thiserror::Error;

/// An error that ends a load. Documents that Elasticsearch rejects inside a
/// successful bulk request are not errors; they are counted in
/// [`BulkStats`](crate::BulkStats).
#[derive(Debug, Error)]
pub enum LoaderError {
    /// A required input file does not exist.
    #[error("input file {} not found", .path.display())]
    NotFound {
        /// The path that was looked up.
        path: PathBuf,
    },

    /// An input file exists but could not be read.
    #[error("could not read {}", .path.display())]
    Io {
        /// The file being read.
        path: PathBuf,
        /// The underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// The template file is not well formed JSON.
    #[error("invalid JSON in {} at line {line}, column {column}", .path.display())]
    Parse {
        /// The template file.
        path: PathBuf,
        /// 1-based line of the syntax error.
        line: usize,
        /// 1-based column of the syntax error.
        column: usize,
        /// The parser's description of the problem.
        #[source]
        source: serde_json::Error,
    },

    /// The template file is JSON, but its root is not an object.
    #[error("template in {} must be a JSON object, found {found}", .path.display())]
    TemplateNotObject {
        /// The template file.
        path: PathBuf,
        /// The kind of JSON value found at the root.
        found: &'static str,
    },

    /// The Elasticsearch settings cannot be turned into a client.
    #[error("invalid Elasticsearch configuration")]
    Setup(#[source] anyhow::Error),

    /// The reachability check failed; nothing was sent.
    #[error("could not connect to Elasticsearch")]
    Connection(#[source] anyhow::Error),

    /// A bulk request failed as a whole. Chunks written before it stay written.
    #[error("bulk indexing into {index} failed after {written} of {total} documents were sent")]
    Submission {
        /// The target index.
        index: String,
        /// Documents in chunks that completed before the failure.
        written: usize,
        /// Documents in the whole batch.
        total: usize,
        /// Why the request failed.
        #[source]
        source: anyhow::Error,
    },
}

impl LoaderError {
    /// Whether the process should exit with a failure status. A bulk request
    /// failing as a whole is reported but does not fail the process, matching
    /// how partially rejected batches are treated.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Submission { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::LoaderError;
    use anyhow::anyhow;
    use std::path::PathBuf;

    #[test]
    fn submission_failures_are_not_fatal() {
        let err = LoaderError::Submission {
            index: "sdp_amdb".to_string(),
            written: 500,
            total: 1200,
            source: anyhow!("connection reset"),
        };
        assert!(!err.is_fatal());
    }

    #[test]
    fn input_setup_and_connection_failures_are_fatal() {
        let fatal = [
            LoaderError::NotFound {
                path: PathBuf::from("hostnames.txt"),
            },
            LoaderError::TemplateNotObject {
                path: PathBuf::from("base_fields.json"),
                found: "an array",
            },
            LoaderError::Setup(anyhow!("Elasticsearch is not configured")),
            LoaderError::Connection(anyhow!("ping failed")),
        ];
        for err in fatal {
            assert!(err.is_fatal(), "{:?} should be fatal", err);
        }
    }
}
