//! Helpers to make working with the ES API easier. Customized specifically for
//! bulk loading host documents.

use std::collections::HashMap;

use amdb_settings::{ElasticsearchConnection, ElasticsearchCredentials, ElasticsearchSettings};
use anyhow::{anyhow, bail, Context, Result};
use elasticsearch::{
    auth::Credentials,
    http::{
        request::JsonBody,
        transport::{CloudConnectionPool, SingleNodeConnectionPool, TransportBuilder},
    },
    BulkParts, Elasticsearch,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    domain::{Batch, BulkStats, HelperIndexable},
    LoaderError,
};

/// A wrapper around an Elasticsearch client that has not yet talked to the
/// cluster. Call [`connect`](Self::connect) to check the cluster is reachable
/// before sending anything.
pub struct ElasticHelper {
    /// The ES client this helper uses.
    client: Elasticsearch,
    /// A human readable description of where the client points.
    endpoint: String,
    /// The maximum number of documents per bulk request.
    chunk_size: usize,
}

impl ElasticHelper {
    /// Create a new ElasticHelper that connects to the server specified in
    /// `es_settings`, sending at most `chunk_size` documents per bulk request.
    ///
    /// No network traffic happens here.
    ///
    /// # Errors
    /// If the settings to connect to Elasticsearch are not valid, or if
    /// `chunk_size` is zero.
    pub fn new(es_settings: &ElasticsearchSettings, chunk_size: usize) -> Result<Self, LoaderError> {
        Self::build(es_settings, chunk_size).map_err(LoaderError::Setup)
    }

    /// Fallible part of [`new`](Self::new).
    fn build(es_settings: &ElasticsearchSettings, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            bail!("chunk_size must be at least 1");
        }

        let (mut transport_builder, endpoint) = match &es_settings.connection {
            ElasticsearchConnection::Single { url } => {
                let url = elasticsearch::http::Url::parse(&url.to_string())
                    .context("Could not parse Elasticsearch URL")?;
                let endpoint = url.to_string();
                (
                    TransportBuilder::new(SingleNodeConnectionPool::new(url)),
                    endpoint,
                )
            }
            ElasticsearchConnection::Cloud { cloud_id } => (
                TransportBuilder::new(
                    CloudConnectionPool::new(cloud_id)
                        .context("Could not create Elasticsearch cloud connection")?,
                ),
                format!("cloud deployment {}", cloud_id.split(':').next().unwrap_or_default()),
            ),
            ElasticsearchConnection::None => {
                bail!("Elasticsearch is not configured")
            }
        };

        if let Some(credentials) = &es_settings.credentials {
            transport_builder = transport_builder.auth(match credentials {
                ElasticsearchCredentials::Basic { username, password } => {
                    Credentials::Basic(username.clone(), password.clone())
                }
                ElasticsearchCredentials::ApiKey { id, api_key } => {
                    Credentials::ApiKey(id.clone(), api_key.clone())
                }
            });
        }

        let transport = transport_builder
            .build()
            .context("misconfigured elasticsearch")?;

        Ok(Self {
            client: Elasticsearch::new(transport),
            endpoint,
            chunk_size,
        })
    }

    /// Check that the cluster answers a ping.
    ///
    /// # Errors
    /// If the request fails or the cluster answers with a non-success status.
    pub async fn connect(self) -> Result<ConnectedIndex, LoaderError> {
        self.ping().await.map_err(LoaderError::Connection)?;
        tracing::info!(endpoint = %self.endpoint, "Connected to Elasticsearch");
        Ok(ConnectedIndex { helper: self })
    }

    /// Send a ping and check its status.
    async fn ping(&self) -> Result<()> {
        let ping_res = self
            .client
            .ping()
            .send()
            .await
            .context(format!("ping({}) request", self.endpoint))?;

        let status = ping_res.status_code();
        if !status.is_success() {
            return Err(anyhow!(
                "Unexpected status code from ping({}) {}",
                self.endpoint,
                status.as_u16()
            ));
        }
        Ok(())
    }

    /// Index `docs` into `index_name` with a single bulk request. Each document
    /// is written under its [`HelperIndexable::doc_id`], replacing any document
    /// already stored with that ID.
    ///
    /// # Errors
    /// If there is an HTTP error communicating with ES, if the bulk request as
    /// a whole is rejected, or if a document cannot be serialized. Rejections
    /// of individual documents are counted in the returned stats instead.
    async fn bulk_index<T>(&self, index_name: &str, docs: &[T]) -> Result<BulkStats>
    where
        T: HelperIndexable,
    {
        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(docs.len() * 2);
        for doc in docs {
            body.push(JsonBody::new(
                json!({ "index": { "_index": index_name, "_id": doc.doc_id() } }),
            ));
            body.push(JsonBody::new(
                serde_json::to_value(doc).context("serializing document")?,
            ));
        }

        let bulk_res = self
            .client
            .bulk(BulkParts::None)
            .body(body)
            .send()
            .await
            .context(format!("bulk({}) request", index_name))?;

        let status = bulk_res.status_code();
        if !status.is_success() {
            let bulk_output = bulk_res
                .text()
                .await
                .context("Fetching text of bulk response")?;
            bail!(
                "Unexpected status code from bulk({}) {}. Error: {}",
                index_name,
                status.as_u16(),
                bulk_output
            );
        }

        let parsed: BulkResponse = bulk_res
            .json()
            .await
            .context("Parsing bulk response")?;
        Ok(parsed.stats(docs.len()))
    }
}

/// An Elasticsearch client whose cluster has answered a ping.
pub struct ConnectedIndex {
    /// The helper that passed the check.
    helper: ElasticHelper,
}

impl ConnectedIndex {
    /// Write every document in `batch`, in order, and report how many were
    /// accepted and rejected. Documents go out in chunks of the configured
    /// size; nothing is retried.
    ///
    /// # Errors
    /// If a bulk request fails as a whole. Chunks sent before the failing one
    /// remain written.
    pub async fn submit(self, batch: &Batch) -> Result<BulkStats, LoaderError> {
        let mut stats = BulkStats::default();

        for chunk in batch.documents().chunks(self.helper.chunk_size) {
            let chunk_stats = self
                .helper
                .bulk_index(batch.index_name(), chunk)
                .await
                .map_err(|source| LoaderError::Submission {
                    index: batch.index_name().to_string(),
                    written: stats.total(),
                    total: batch.len(),
                    source,
                })?;
            tracing::debug!(
                succeeded = chunk_stats.succeeded,
                failed = chunk_stats.failed,
                "Bulk chunk complete"
            );
            stats += chunk_stats;
        }

        Ok(stats)
    }
}

/// The parts of a `_bulk` response needed to count results.
#[derive(Debug, Deserialize)]
struct BulkResponse {
    /// One entry per action, keyed by the action name (`index` here).
    #[serde(default)]
    items: Vec<HashMap<String, BulkItem>>,
}

/// The result of a single action in a bulk request.
#[derive(Debug, Deserialize)]
struct BulkItem {
    /// The document ID.
    #[serde(rename = "_id")]
    id: Option<String>,
    /// HTTP status for this action.
    status: u16,
    /// Present when the action failed.
    error: Option<Value>,
}

impl BulkResponse {
    /// Count accepted and rejected documents. Documents the response does not
    /// mention are counted as rejected.
    fn stats(self, sent: usize) -> BulkStats {
        let mut stats = BulkStats::default();

        for item in self.items.into_iter().flat_map(HashMap::into_values) {
            if (200..300).contains(&item.status) && item.error.is_none() {
                stats.succeeded += 1;
            } else {
                tracing::debug!(
                    id = ?item.id,
                    status = item.status,
                    error = ?item.error,
                    "Document was rejected"
                );
                stats.failed += 1;
            }
        }

        stats.failed += sent.saturating_sub(stats.total());
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::{BulkResponse, ElasticHelper};
    use crate::{
        builder::{build_batch, BuildOutcome},
        domain::{BulkStats, Template},
        Batch, LoaderError,
    };
    use amdb_settings::{ElasticsearchConnection, ElasticsearchSettings};
    use httpmock::{prelude::*, Method};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn settings_for(server: &MockServer) -> ElasticsearchSettings {
        ElasticsearchSettings {
            connection: ElasticsearchConnection::Single {
                url: server.base_url().parse().expect("mock url"),
            },
            credentials: None,
        }
    }

    fn batch(hostnames: &[&str]) -> Batch {
        let template = match json!({"env": "prod"}) {
            Value::Object(fields) => Template::new(fields),
            _ => unreachable!(),
        };
        match build_batch(&template, hostnames, "sdp_amdb") {
            BuildOutcome::Ready(batch) => batch,
            BuildOutcome::NoIdentifiers => panic!("expected documents"),
        }
    }

    fn bulk_items(ids: &[&str], status: u16) -> Vec<Value> {
        ids.iter()
            .map(|id| json!({"index": {"_index": "sdp_amdb", "_id": id, "status": status}}))
            .collect()
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let settings = ElasticsearchSettings {
            connection: ElasticsearchConnection::Single {
                url: "http://localhost:9200".parse().unwrap(),
            },
            credentials: None,
        };
        assert!(matches!(
            ElasticHelper::new(&settings, 0),
            Err(LoaderError::Setup(_))
        ));
    }

    #[test]
    fn unconfigured_elasticsearch_is_rejected() {
        let settings = ElasticsearchSettings {
            connection: ElasticsearchConnection::None,
            credentials: None,
        };
        assert!(matches!(
            ElasticHelper::new(&settings, 500),
            Err(LoaderError::Setup(_))
        ));
    }

    #[test]
    fn item_failures_are_counted() {
        let response: BulkResponse = serde_json::from_value(json!({
            "took": 3,
            "errors": true,
            "items": [
                {"index": {"_id": "a", "status": 201, "result": "created"}},
                {"index": {"_id": "b", "status": 200, "result": "updated"}},
                {"index": {"_id": "c", "status": 400, "error": {"type": "mapper_parsing_exception"}}},
            ]
        }))
        .unwrap();

        assert_eq!(
            response.stats(4),
            BulkStats {
                succeeded: 2,
                failed: 2
            }
        );
    }

    #[tokio::test]
    async fn failed_ping_is_a_connection_error() {
        let server = MockServer::start_async().await;
        let ping = server
            .mock_async(|when, then| {
                when.method(Method::HEAD).path("/");
                then.status(503);
            })
            .await;
        let bulk = server
            .mock_async(|when, then| {
                when.path("/_bulk");
                then.status(200);
            })
            .await;

        let helper = ElasticHelper::new(&settings_for(&server), 500).unwrap();
        let result = helper.connect().await;

        assert!(matches!(result, Err(LoaderError::Connection(_))));
        ping.assert_hits_async(1).await;
        bulk.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_connection_error() {
        let settings = ElasticsearchSettings {
            connection: ElasticsearchConnection::Single {
                url: "http://127.0.0.1:1".parse().unwrap(),
            },
            credentials: None,
        };
        let helper = ElasticHelper::new(&settings, 500).unwrap();
        assert!(matches!(
            helper.connect().await,
            Err(LoaderError::Connection(_))
        ));
    }

    #[tokio::test]
    async fn documents_are_keyed_by_hostname() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(Method::HEAD).path("/");
                then.status(200);
            })
            .await;
        let bulk = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/_bulk")
                    .body_contains(r#"{"index":{"_index":"sdp_amdb","_id":"host-a"}}"#)
                    .body_contains(r#"{"index":{"_index":"sdp_amdb","_id":"host-b"}}"#)
                    .body_contains(r#"{"env":"prod","hostname":"host-a"}"#);
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "took": 1,
                        "errors": false,
                        "items": bulk_items(&["host-a", "host-b", "host-a"], 200),
                    }));
            })
            .await;

        let connected = ElasticHelper::new(&settings_for(&server), 500)
            .unwrap()
            .connect()
            .await
            .unwrap();
        let stats = connected
            .submit(&batch(&["host-a", "host-b", "host-a"]))
            .await
            .unwrap();

        bulk.assert_hits_async(1).await;
        assert_eq!(
            stats,
            BulkStats {
                succeeded: 3,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn batches_are_split_into_chunks() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(Method::HEAD).path("/");
                then.status(200);
            })
            .await;
        let first = server
            .mock_async(|when, then| {
                when.method(POST).path("/_bulk").body_contains(r#""_id":"h1""#);
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({"errors": false, "items": bulk_items(&["h1", "h2"], 201)}));
            })
            .await;
        let second = server
            .mock_async(|when, then| {
                when.method(POST).path("/_bulk").body_contains(r#""_id":"h3""#);
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({"errors": true, "items": bulk_items(&["h3"], 429)}));
            })
            .await;

        let stats = ElasticHelper::new(&settings_for(&server), 2)
            .unwrap()
            .connect()
            .await
            .unwrap()
            .submit(&batch(&["h1", "h2", "h3"]))
            .await
            .unwrap();

        first.assert_hits_async(1).await;
        second.assert_hits_async(1).await;
        assert_eq!(
            stats,
            BulkStats {
                succeeded: 2,
                failed: 1
            }
        );
    }

    #[tokio::test]
    async fn rejected_bulk_request_is_a_submission_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(Method::HEAD).path("/");
                then.status(200);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/_bulk");
                then.status(500).body("cluster exploded");
            })
            .await;

        let result = ElasticHelper::new(&settings_for(&server), 500)
            .unwrap()
            .connect()
            .await
            .unwrap()
            .submit(&batch(&["h1", "h2"]))
            .await;

        match result {
            Err(LoaderError::Submission {
                index,
                written,
                total,
                source,
            }) => {
                assert_eq!(index, "sdp_amdb");
                assert_eq!(written, 0);
                assert_eq!(total, 2);
                assert!(format!("{:#}", source).contains("cluster exploded"));
            }
            other => panic!("expected Submission, got {:?}", other),
        }
    }
}
