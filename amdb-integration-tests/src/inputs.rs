//! Tests for problems with the input files. None of these may reach the
//! network.
#![cfg(test)]

use crate::{loader_test, mock_bulk, mock_ping, TestingTools};
use amdb_loader::{LoaderError, RunSummary};
use anyhow::Result;

#[tokio::test]
async fn empty_hostname_list_skips_elasticsearch() -> Result<()> {
    loader_test(
        |_| (),
        |TestingTools {
             settings,
             es_mock,
             inputs,
             ..
         }| async move {
            inputs.write_hostnames("\n  \n\n");
            let ping = mock_ping(&es_mock, 200).await;
            let bulk = mock_bulk(&es_mock, &[]).await;

            let summary = amdb_loader::run(&settings).await?;

            assert_eq!(summary, RunSummary::NothingToDo);
            ping.assert_hits_async(0).await;
            bulk.assert_hits_async(0).await;
            Ok(())
        },
    )
    .await
}

#[tokio::test]
async fn missing_template_stops_before_connecting() -> Result<()> {
    loader_test(
        |_| (),
        |TestingTools {
             settings,
             es_mock,
             inputs,
             ..
         }| async move {
            inputs.remove_template();
            let ping = mock_ping(&es_mock, 200).await;

            let err = amdb_loader::run(&settings).await.unwrap_err();

            match err {
                LoaderError::NotFound { path } => assert_eq!(path, inputs.template),
                other => panic!("expected NotFound, got {:?}", other),
            }
            ping.assert_hits_async(0).await;
            Ok(())
        },
    )
    .await
}

#[tokio::test]
async fn missing_hostnames_stops_before_connecting() -> Result<()> {
    loader_test(
        |_| (),
        |TestingTools {
             settings,
             es_mock,
             inputs,
             ..
         }| async move {
            inputs.remove_hostnames();
            let ping = mock_ping(&es_mock, 200).await;

            let err = amdb_loader::run(&settings).await.unwrap_err();

            assert!(matches!(err, LoaderError::NotFound { .. }));
            ping.assert_hits_async(0).await;
            Ok(())
        },
    )
    .await
}

#[tokio::test]
async fn malformed_template_is_a_parse_error() -> Result<()> {
    loader_test(
        |_| (),
        |TestingTools {
             settings,
             es_mock,
             inputs,
             ..
         }| async move {
            inputs.write_template("{\"env\": \"prod\",}");
            let ping = mock_ping(&es_mock, 200).await;

            let err = amdb_loader::run(&settings).await.unwrap_err();

            match err {
                LoaderError::Parse { line, .. } => assert_eq!(line, 1),
                other => panic!("expected Parse, got {:?}", other),
            }
            ping.assert_hits_async(0).await;
            Ok(())
        },
    )
    .await
}

#[tokio::test]
async fn input_files_outlive_an_unused_inputs_field() -> Result<()> {
    loader_test(
        |_| (),
        |TestingTools { settings, .. }| async move {
            assert!(settings.loader.hostnames_file.exists());
            assert!(settings.loader.template_file.exists());
            Ok(())
        },
    )
    .await
}
