//! Tests that a normal load sends the expected documents.
#![cfg(test)]

use crate::{loader_test, mock_bulk, mock_ping, TestingTools};
use amdb_loader::{BulkStats, RunSummary};
use anyhow::Result;
use httpmock::prelude::*;
use pretty_assertions::assert_eq;

#[tokio::test]
async fn duplicate_hostnames_are_sent_in_order() -> Result<()> {
    loader_test(
        |_| (),
        |TestingTools {
             settings, es_mock, ..
         }| async move {
            let ping = mock_ping(&es_mock, 200).await;
            let bulk = es_mock
                .mock_async(|when, then| {
                    when.method(POST).path("/_bulk").body(concat!(
                        r#"{"index":{"_index":"sdp_amdb","_id":"host-a"}}"#,
                        "\n",
                        r#"{"env":"prod","hostname":"host-a"}"#,
                        "\n",
                        r#"{"index":{"_index":"sdp_amdb","_id":"host-b"}}"#,
                        "\n",
                        r#"{"env":"prod","hostname":"host-b"}"#,
                        "\n",
                        r#"{"index":{"_index":"sdp_amdb","_id":"host-a"}}"#,
                        "\n",
                        r#"{"env":"prod","hostname":"host-a"}"#,
                        "\n",
                    ));
                    then.status(200)
                        .header("content-type", "application/json")
                        .json_body(serde_json::json!({
                            "took": 2,
                            "errors": false,
                            "items": [
                                {"index": {"_id": "host-a", "status": 201, "result": "created"}},
                                {"index": {"_id": "host-b", "status": 201, "result": "created"}},
                                {"index": {"_id": "host-a", "status": 200, "result": "updated"}},
                            ]
                        }));
                })
                .await;

            let summary = amdb_loader::run(&settings).await?;

            ping.assert_hits_async(1).await;
            bulk.assert_hits_async(1).await;
            assert_eq!(
                summary,
                RunSummary::Submitted(BulkStats {
                    succeeded: 3,
                    failed: 0
                })
            );
            Ok(())
        },
    )
    .await
}

#[tokio::test]
async fn template_is_copied_into_every_document() -> Result<()> {
    loader_test(
        |settings| settings.loader.index_name = "hosts_v2".to_string(),
        |TestingTools {
             settings,
             es_mock,
             inputs,
             ..
         }| async move {
            inputs.write_hostnames("db-1\ndb-2\n");
            inputs.write_template(r#"{"owner": {"team": "dba", "oncall": ["ana"]}, "tier": 1}"#);

            mock_ping(&es_mock, 200).await;
            let bulk = es_mock
                .mock_async(|when, then| {
                    when.method(POST)
                        .path("/_bulk")
                        .body_contains(r#"{"index":{"_index":"hosts_v2","_id":"db-2"}}"#)
                        .body_contains(
                            r#"{"owner":{"team":"dba","oncall":["ana"]},"tier":1,"hostname":"db-1"}"#,
                        )
                        .body_contains(
                            r#"{"owner":{"team":"dba","oncall":["ana"]},"tier":1,"hostname":"db-2"}"#,
                        );
                    then.status(200)
                        .header("content-type", "application/json")
                        .json_body(serde_json::json!({
                            "errors": false,
                            "items": [
                                {"index": {"_id": "db-1", "status": 201}},
                                {"index": {"_id": "db-2", "status": 201}},
                            ]
                        }));
                })
                .await;

            let summary = amdb_loader::run(&settings).await?;

            bulk.assert_hits_async(1).await;
            assert_eq!(
                summary,
                RunSummary::Submitted(BulkStats {
                    succeeded: 2,
                    failed: 0
                })
            );
            Ok(())
        },
    )
    .await
}

#[tokio::test]
async fn large_batches_use_several_requests() -> Result<()> {
    loader_test(
        |settings| settings.loader.chunk_size = 2,
        |TestingTools {
             settings,
             es_mock,
             inputs,
             ..
         }| async move {
            inputs.write_hostnames("h1\nh2\nh3\nh4\n");

            mock_ping(&es_mock, 200).await;
            let bulk = mock_bulk(&es_mock, &[("x", 201), ("y", 201)]).await;

            let summary = amdb_loader::run(&settings).await?;

            bulk.assert_hits_async(2).await;
            assert_eq!(
                summary,
                RunSummary::Submitted(BulkStats {
                    succeeded: 4,
                    failed: 0
                })
            );
            Ok(())
        },
    )
    .await
}
