use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

/// Settings for the Elasticsearch cluster documents are written to.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ElasticsearchSettings {
    /// How to connect to the cluster.
    pub connection: ElasticsearchConnection,

    /// Optional credentials sent with every request. Prefer setting these in
    /// `config/local.yaml` or through environment variables.
    #[serde(default)]
    pub credentials: Option<ElasticsearchCredentials>,
}

/// The location of an Elasticsearch cluster.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElasticsearchConnection {
    /// A single node, reached at `url`, such as `http://localhost:9200`.
    Single {
        /// The base URL of the node.
        #[serde_as(as = "DisplayFromStr")]
        url: http::Uri,
    },

    /// An Elastic Cloud deployment.
    Cloud {
        /// The deployment's cloud ID, as shown in the Elastic Cloud console.
        cloud_id: String,
    },

    /// Elasticsearch is not configured. The loader refuses to start.
    None,
}

/// Credentials for an Elasticsearch cluster.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElasticsearchCredentials {
    /// HTTP basic authentication.
    Basic {
        /// The user name.
        username: String,
        /// The user's password.
        password: String,
    },

    /// An Elasticsearch API key, as returned by the create API key API.
    ApiKey {
        /// The key's ID.
        id: String,
        /// The key itself.
        api_key: String,
    },
}

impl std::fmt::Debug for ElasticsearchCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::ApiKey { id, .. } => f
                .debug_struct("ApiKey")
                .field("id", id)
                .field("api_key", &"<redacted>")
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ElasticsearchConnection, ElasticsearchCredentials, ElasticsearchSettings};
    use anyhow::Result;
    use serde_json::json;

    #[test]
    fn single_node_url_is_parsed() -> Result<()> {
        let settings: ElasticsearchSettings = serde_json::from_value(json!({
            "connection": { "type": "single", "url": "http://es.internal:9201" }
        }))?;

        match settings.connection {
            ElasticsearchConnection::Single { url } => {
                assert_eq!(url.host(), Some("es.internal"));
                assert_eq!(url.port_u16(), Some(9201));
            }
            other => panic!("unexpected connection {:?}", other),
        }
        assert!(settings.credentials.is_none());
        Ok(())
    }

    #[test]
    fn invalid_url_is_rejected() {
        let result: Result<ElasticsearchSettings, _> = serde_json::from_value(json!({
            "connection": { "type": "single", "url": "not a url" }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn credentials_are_not_printed() -> Result<()> {
        let credentials: ElasticsearchCredentials = serde_json::from_value(json!({
            "type": "basic", "username": "loader", "password": "hunter2"
        }))?;

        let printed = format!("{:?}", credentials);
        assert!(printed.contains("loader"));
        assert!(!printed.contains("hunter2"));
        Ok(())
    }
}
