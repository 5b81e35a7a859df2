#![warn(missing_docs, clippy::missing_docs_in_private_items)]
// None of the tests are seen by the linter, so none of the utilities are marked
// as used. But docs don't generate for the below if they are `#[cfg(test)]`.
// This is a compromise.
#![allow(dead_code)]

//! End to end tests for the loader, run against a mock Elasticsearch.
//!
//! This is structured as a separate crate so that it produces a single test
//! binary instead of one test per file like would happen if this were
//! `amdb-loader/tests/...`. This improves compilation and test times.
//!
//! The primary tool used by tests is [`loader_test`], which starts a mock
//! Elasticsearch, writes input files to a temporary directory, points the
//! settings at both, and collects logs. It then calls the test function that is
//! passed to it, providing the above tools as an argument.
//!
//! ```no_run
//! use amdb_integration_tests::{loader_test, TestingTools};
//!
//! #[tokio::test]
//! async fn empty_list_does_nothing() {
//!     loader_test(
//!         |settings| settings.loader.chunk_size = 10,
//!         |TestingTools { settings, inputs, .. }| async move {
//!             inputs.write_hostnames("");
//!             let summary = amdb_loader::run(&settings).await.unwrap();
//!             assert_eq!(summary, amdb_loader::RunSummary::NothingToDo);
//!         },
//!     )
//!     .await
//! }
//! ```

mod failures;
mod inputs;
mod load;
mod logging;
mod utils;

pub use crate::utils::{
    logging::{LogWatcher, TracingJsonEvent},
    test_tools::{loader_test, mock_bulk, mock_ping, InputFiles, TestingTools},
};
