//! Tests for Elasticsearch misbehaving.
#![cfg(test)]

use crate::{loader_test, mock_bulk, mock_ping, TestingTools};
use amdb_loader::{BulkStats, LoaderError, RunSummary};
use amdb_settings::ElasticsearchConnection;
use anyhow::Result;
use httpmock::prelude::*;
use pretty_assertions::assert_eq;

#[tokio::test]
async fn failed_ping_sends_nothing() -> Result<()> {
    loader_test(
        |_| (),
        |TestingTools {
             settings, es_mock, ..
         }| async move {
            let ping = mock_ping(&es_mock, 503).await;
            let bulk = mock_bulk(&es_mock, &[]).await;

            let err = amdb_loader::run(&settings).await.unwrap_err();

            assert!(matches!(err, LoaderError::Connection(_)));
            ping.assert_hits_async(1).await;
            bulk.assert_hits_async(0).await;
            Ok(())
        },
    )
    .await
}

#[tokio::test]
async fn unconfigured_elasticsearch_is_a_setup_error() -> Result<()> {
    loader_test(
        |settings| settings.elasticsearch.connection = ElasticsearchConnection::None,
        |TestingTools { settings, .. }| async move {
            let err = amdb_loader::run(&settings).await.unwrap_err();
            assert!(matches!(err, LoaderError::Setup(_)));
            Ok(())
        },
    )
    .await
}

#[tokio::test]
async fn rejected_documents_are_counted_not_raised() -> Result<()> {
    loader_test(
        |_| (),
        |TestingTools {
             settings, es_mock, ..
         }| async move {
            mock_ping(&es_mock, 200).await;
            mock_bulk(&es_mock, &[("host-a", 201), ("host-b", 400), ("host-a", 200)]).await;

            let summary = amdb_loader::run(&settings).await?;

            assert_eq!(
                summary,
                RunSummary::Submitted(BulkStats {
                    succeeded: 2,
                    failed: 1
                })
            );
            Ok(())
        },
    )
    .await
}

#[tokio::test]
async fn failed_bulk_request_is_a_submission_error() -> Result<()> {
    loader_test(
        |_| (),
        |TestingTools {
             settings, es_mock, ..
         }| async move {
            mock_ping(&es_mock, 200).await;
            es_mock
                .mock_async(|when, then| {
                    when.method(POST).path("/_bulk");
                    then.status(413).body("request too large");
                })
                .await;

            let err = amdb_loader::run(&settings).await.unwrap_err();

            match err {
                LoaderError::Submission { written, total, .. } => {
                    assert_eq!(written, 0);
                    assert_eq!(total, 3);
                }
                other => panic!("expected Submission, got {:?}", other),
            }
            Ok(())
        },
    )
    .await
}
