//! # amdb Settings
//!
//! Configuration is specified in several ways, with later methods overriding earlier ones.
//!
//! 1. A base configuration checked into the repository, in `config/base.yaml`.
//!    This provides the default values for most settings.
//! 2. Per-environment configuration files in the `config` directory. The
//!    environment is selected using the environment variable `AMDB_ENV`. The
//!    settings for that environment are then loaded from `config/${env}.yaml`, if
//!    it exists. The default environment is "development".
//! 3. A local configuration file not checked into the repository, at
//!    `config/local.yaml`. This file is in `.gitignore` and is safe to use for
//!    local configuration and secrets, such as Elasticsearch credentials.
//! 4. Environment variables that begin with `AMDB_` and have a separator for
//!    `__`. For example, `Settings::loader::index_name` can be controlled from
//!    the environment variable `AMDB_LOADER__INDEX_NAME`.
//!
//! Tests should use `Settings::load_for_tests` which only reads from
//! `config/base.yaml` and `config/test.yaml`. It does not read from
//! environment variables.
//!
//! Configuration files are canonically YAML files. However, any format supported
//! by the [config] crate can be used, including JSON and TOML. To choose another
//! format, simply use a different extension for your file, like
//! `config/local.toml`.

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

mod elasticsearch;
mod logging;

pub use crate::elasticsearch::{
    ElasticsearchConnection, ElasticsearchCredentials, ElasticsearchSettings,
};
pub use crate::logging::{DirectiveWrapper, LogFormat, LoggingSettings};

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top level settings object for the loader.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[doc(inline)]
pub struct Settings {
    /// The environment the loader is running in. Should only be set with the
    /// `AMDB_ENV` environment variable.
    pub env: String,

    /// Where and how to reach Elasticsearch.
    pub elasticsearch: ElasticsearchSettings,

    /// Input files and the target index.
    pub loader: LoaderSettings,

    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Settings for the batch load itself.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoaderSettings {
    /// The index every generated document is written to.
    pub index_name: String,

    /// Path to the newline separated list of hostnames. Relative paths are
    /// resolved against the working directory.
    pub hostnames_file: PathBuf,

    /// Path to the JSON object holding the fields shared by every document.
    pub template_file: PathBuf,

    /// The maximum number of documents sent in one bulk request.
    pub chunk_size: usize,
}

impl Settings {
    /// Load settings from configuration files and environment variables.
    ///
    /// # Errors
    /// If any of the configured values are invalid, or if any of the required
    /// configuration files are missing.
    pub fn load() -> Result<Self, ConfigError> {
        let amdb_env = std::env::var("AMDB_ENV").unwrap_or_else(|_| "development".to_string());

        Config::builder()
            // Start off with the base config.
            .add_source(File::with_name("./config/base"))
            // Merge in an environment specific config.
            .add_source(File::with_name(&format!("config/{}", amdb_env)).required(false))
            // Add a local configuration file that is `.gitignore`ed.
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables that start with "AMDB_" and have "__" to
            // separate levels. For example, `AMDB_LOADER__CHUNK_SIZE` maps to
            // `Settings::loader::chunk_size`.
            .add_source(
                Environment::with_prefix("AMDB")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_override("env", amdb_env)?
            .build()?
            .try_deserialize()
    }

    /// Load settings from configuration files for tests.
    ///
    /// `changer` can adjust the loaded settings before they are returned.
    ///
    /// # Panics
    /// If the base or test configuration cannot be read.
    pub fn load_for_tests<F: FnOnce(&mut Self)>(changer: F) -> Self {
        let mut settings: Self = Config::builder()
            .add_source(File::with_name("../config/base"))
            .add_source(File::with_name("../config/test"))
            .set_override("env", "test")
            .expect("Could not set env for tests")
            .build()
            .expect("Could not load settings for tests")
            .try_deserialize()
            .expect("Could not convert settings");
        changer(&mut settings);
        settings
    }
}
