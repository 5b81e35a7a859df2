//! Tools for running tests

use crate::utils::logging::LogWatcher;
use amdb_settings::{ElasticsearchConnection, Settings};
use httpmock::{prelude::*, Method, Mock};
use serde_json::{json, Value};
use std::{fs, future::Future, path::PathBuf};
use tempfile::TempDir;
use tracing_futures::Instrument;
use tracing_subscriber::layer::SubscriberExt;

/// Run a test with the loader fully configured against a mock Elasticsearch.
///
/// The mock server listens on a port assigned arbitrarily by the OS, and has
/// no mocks installed; tests add the responses they need with [`mock_ping`]
/// and [`mock_bulk`]. The hostname and template files live in a fresh
/// temporary directory and start out holding `host-a`, `host-b`, `host-a`
/// and `{"env": "prod"}`.
///
/// # Panics
/// May panic if tests could not be set up correctly.
pub async fn loader_test<FSettings, FTest, Fut>(
    settings_changer: FSettings,
    test: FTest,
) -> Fut::Output
where
    FSettings: FnOnce(&mut Settings),
    FTest: FnOnce(TestingTools) -> Fut,
    Fut: Future,
{
    let test_span = tracing::info_span!("loader_test");

    let mut settings = Settings::load_for_tests(|_| ());

    // Set up logging
    let log_watcher = LogWatcher::default();
    let log_watcher_writer = log_watcher.writer();

    let env_filter: tracing_subscriber::EnvFilter = (&settings.logging.levels).into();
    let tracing_subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(move || log_watcher_writer.clone()),
        )
        .with(tracing_subscriber::fmt::layer().pretty().with_test_writer());

    let _tracing_subscriber_guard = tracing::subscriber::set_default(tracing_subscriber);

    // Point Elasticsearch at a mock server
    let es_mock = MockServer::start_async().await;
    settings.elasticsearch.connection = ElasticsearchConnection::Single {
        url: es_mock
            .base_url()
            .parse()
            .expect("mock server URL should be valid"),
    };
    settings.elasticsearch.credentials = None;

    // Write the inputs. The directory lives until the test finishes, whether
    // or not the test keeps hold of `inputs`.
    let input_dir = TempDir::new().expect("could not create temp dir");
    let inputs = InputFiles::in_dir(&input_dir);
    inputs.write_hostnames("host-a\nhost-b\nhost-a\n");
    inputs.write_template(r#"{"env": "prod"}"#);
    settings.loader.hostnames_file = inputs.hostnames.clone();
    settings.loader.template_file = inputs.template.clone();

    settings_changer(&mut settings);

    let tools = TestingTools {
        settings,
        es_mock,
        inputs,
        log_watcher,
    };
    let rv = test(tools).instrument(test_span).await;
    drop(input_dir);
    rv
}

/// A set of tools for tests, including mock servers and logging helpers.
///
/// The fields of this struct are marked as non-exhaustive, meaning that any
/// destructuring of this struct will require a `..` "and the rest" entry, even
/// if all present items are named. This makes adding tools in the future easier,
/// since old tests won't need to be rewritten to account for the added tools.
#[non_exhaustive]
pub struct TestingTools {
    /// Settings pointing at [`es_mock`](Self::es_mock) and
    /// [`inputs`](Self::inputs).
    pub settings: Settings,

    /// A [`httpmock::MockServer`] standing in for Elasticsearch. Does not
    /// contain mock responses, any needed must be added.
    pub es_mock: MockServer,

    /// The input files the settings point to.
    pub inputs: InputFiles,

    /// To make assertions about logs.
    pub log_watcher: LogWatcher,
}

/// Paths of the hostname and template files in the test's temporary
/// directory. The directory itself is owned by [`loader_test`].
pub struct InputFiles {
    /// Path of the hostname list.
    pub hostnames: PathBuf,
    /// Path of the template.
    pub template: PathBuf,
}

impl InputFiles {
    /// Input paths inside `dir`. Neither file exists yet.
    pub fn in_dir(dir: &TempDir) -> Self {
        Self {
            hostnames: dir.path().join("hostnames.txt"),
            template: dir.path().join("base_fields.json"),
        }
    }

    /// Replace the contents of the hostname list.
    pub fn write_hostnames(&self, contents: &str) {
        fs::write(&self.hostnames, contents).expect("could not write hostnames");
    }

    /// Replace the contents of the template.
    pub fn write_template(&self, contents: &str) {
        fs::write(&self.template, contents).expect("could not write template");
    }

    /// Delete the template file.
    pub fn remove_template(&self) {
        fs::remove_file(&self.template).expect("could not remove template");
    }

    /// Delete the hostname list.
    pub fn remove_hostnames(&self) {
        fs::remove_file(&self.hostnames).expect("could not remove hostnames");
    }
}

/// Answer pings with `status`.
pub async fn mock_ping(server: &MockServer, status: u16) -> Mock<'_> {
    server
        .mock_async(|when, then| {
            when.method(Method::HEAD).path("/");
            then.status(status);
        })
        .await
}

/// Answer bulk requests with one item per `(id, status)` pair. Items with a
/// non-2xx status carry an error object, as Elasticsearch reports them.
pub async fn mock_bulk<'a>(server: &'a MockServer, results: &[(&str, u16)]) -> Mock<'a> {
    let items: Vec<Value> = results
        .iter()
        .map(|(id, status)| {
            if (200..300).contains(status) {
                json!({"index": {"_id": id, "status": status, "result": "created"}})
            } else {
                json!({"index": {
                    "_id": id,
                    "status": status,
                    "error": {"type": "mapper_parsing_exception", "reason": "failed to parse"},
                }})
            }
        })
        .collect();
    let errors = items.iter().any(|item| item["index"].get("error").is_some());

    server
        .mock_async(|when, then| {
            when.method(POST).path("/_bulk");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"took": 1, "errors": errors, "items": items}));
        })
        .await
}
