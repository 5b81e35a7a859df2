//! Tests that a load reports what it did through logs.
#![cfg(test)]

use crate::{loader_test, mock_bulk, mock_ping, TestingTools};
use anyhow::Result;
use tracing::Level;

#[tokio::test]
async fn summary_is_logged() -> Result<()> {
    loader_test(
        |_| (),
        |TestingTools {
             settings,
             es_mock,
             mut log_watcher,
             ..
         }| async move {
            mock_ping(&es_mock, 200).await;
            mock_bulk(&es_mock, &[("host-a", 201), ("host-b", 500), ("host-a", 200)]).await;

            amdb_loader::run(&settings).await?;

            assert!(log_watcher.has(|event| {
                event.field_contains("message", "Bulk indexing complete")
                    && event.field_u64("succeeded") == Some(2)
                    && event.field_u64("failed") == Some(1)
            }));
            assert!(log_watcher.has(|event| {
                event.level == Level::WARN
                    && event.field_contains("message", "Some documents failed to index")
            }));
            Ok(())
        },
    )
    .await
}

#[tokio::test]
async fn template_hostname_is_warned_about() -> Result<()> {
    loader_test(
        |_| (),
        |TestingTools {
             settings,
             es_mock,
             inputs,
             mut log_watcher,
             ..
         }| async move {
            inputs.write_template(r#"{"hostname": "changeme", "env": "prod"}"#);
            mock_ping(&es_mock, 200).await;
            mock_bulk(&es_mock, &[("host-a", 201), ("host-b", 201), ("host-a", 200)]).await;

            amdb_loader::run(&settings).await?;

            assert!(log_watcher.has(|event| {
                event.level == Level::WARN && event.field_contains("message", "will be replaced")
            }));
            Ok(())
        },
    )
    .await
}

#[tokio::test]
async fn empty_input_is_logged() -> Result<()> {
    loader_test(
        |_| (),
        |TestingTools {
             settings,
             inputs,
             mut log_watcher,
             ..
         }| async move {
            inputs.write_hostnames("");

            amdb_loader::run(&settings).await?;

            assert!(log_watcher.has(|event| {
                event.field_contains("message", "No hostnames found to process")
            }));
            Ok(())
        },
    )
    .await
}
