//! Likes and feedback stored in a hosted REST table service.
//!
//! Rows are read and written through the service's `/rest/v1/<table>`
//! endpoints, filtered with `column=eq.value` query parameters.

use std::env;

use async_trait::async_trait;
use bite_core::model::{Feedback, Fingerprint, ItemId, Like};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use storage::repository::{EngagementRepository, StorageError};
use url::Url;

use crate::error::RemoteConfigError;

const LIKES_TABLE: &str = "likes";
const FEEDBACK_TABLE: &str = "feedback";

#[derive(Clone, Debug)]
pub struct RemoteStoreConfig {
    pub base_url: Url,
    pub api_key: String,
}

impl RemoteStoreConfig {
    /// # Errors
    ///
    /// Returns `RemoteConfigError` if the URL does not parse as `http(s)` or
    /// the key is blank.
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, RemoteConfigError> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|_| RemoteConfigError::InvalidUrl(base_url.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(RemoteConfigError::InvalidUrl(base_url.to_string()));
        }
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RemoteConfigError::EmptyKey);
        }
        Ok(Self { base_url, api_key })
    }

    /// Reads `BITE_REMOTE_URL` and `BITE_REMOTE_KEY`. `Ok(None)` when the URL
    /// is not set, which disables engagement features.
    ///
    /// # Errors
    ///
    /// Returns `RemoteConfigError` if the variables are set but invalid.
    pub fn from_env() -> Result<Option<Self>, RemoteConfigError> {
        let Ok(base_url) = env::var("BITE_REMOTE_URL") else {
            return Ok(None);
        };
        if base_url.trim().is_empty() {
            return Ok(None);
        }
        let api_key = env::var("BITE_REMOTE_KEY").unwrap_or_default();
        Self::new(&base_url, api_key).map(Some)
    }

    fn table_url(&self, table: &str) -> String {
        format!(
            "{}/rest/v1/{table}",
            self.base_url.as_str().trim_end_matches('/')
        )
    }
}

/// `EngagementRepository` backed by the remote table service.
#[derive(Clone)]
pub struct RemoteTableClient {
    client: Client,
    config: RemoteStoreConfig,
}

impl RemoteTableClient {
    #[must_use]
    pub fn new(config: RemoteStoreConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
    }

    async fn insert<T: serde::Serialize + Sync>(
        &self,
        table: &str,
        row: &T,
    ) -> Result<(), StorageError> {
        let response = self
            .request(self.client.post(self.config.table_url(table)))
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await
            .map_err(connection)?;
        check(response).await.map(|_| ())
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        item_id: Option<&ItemId>,
    ) -> Result<Vec<T>, StorageError> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("order", "created_at.asc".to_string()),
        ];
        if let Some(item_id) = item_id {
            query.push(("item_id", eq(item_id.as_str())));
        }
        let response = self
            .request(self.client.get(self.config.table_url(table)))
            .query(&query)
            .send()
            .await
            .map_err(connection)?;
        rows(check(response).await?).await
    }
}

#[async_trait]
impl EngagementRepository for RemoteTableClient {
    async fn insert_like(&self, like: &Like) -> Result<(), StorageError> {
        self.insert(LIKES_TABLE, like).await
    }

    async fn delete_like(
        &self,
        item_id: &ItemId,
        fingerprint: &Fingerprint,
    ) -> Result<bool, StorageError> {
        let response = self
            .request(self.client.delete(self.config.table_url(LIKES_TABLE)))
            .header("Prefer", "return=representation")
            .query(&[
                ("item_id", eq(item_id.as_str())),
                ("fingerprint", eq(fingerprint.as_str())),
            ])
            .send()
            .await
            .map_err(connection)?;
        let removed: Vec<Like> = rows(check(response).await?).await?;
        Ok(!removed.is_empty())
    }

    async fn list_likes(&self, item_id: &ItemId) -> Result<Vec<Like>, StorageError> {
        self.select(LIKES_TABLE, Some(item_id)).await
    }

    async fn insert_feedback(&self, feedback: &Feedback) -> Result<(), StorageError> {
        self.insert(FEEDBACK_TABLE, feedback).await
    }

    async fn list_feedback(&self, item_id: &ItemId) -> Result<Vec<Feedback>, StorageError> {
        self.select(FEEDBACK_TABLE, Some(item_id)).await
    }

    async fn list_all_likes(&self) -> Result<Vec<Like>, StorageError> {
        self.select(LIKES_TABLE, None).await
    }

    async fn list_all_feedback(&self) -> Result<Vec<Feedback>, StorageError> {
        self.select(FEEDBACK_TABLE, None).await
    }
}

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

#[allow(clippy::needless_pass_by_value)]
fn connection(err: reqwest::Error) -> StorageError {
    StorageError::Connection(err.to_string())
}

async fn check(response: Response) -> Result<Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::CONFLICT {
        return Err(StorageError::Conflict);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StorageError::Connection(format!("{status}: {body}")))
}

async fn rows<T: DeserializeOwned>(response: Response) -> Result<Vec<T>, StorageError> {
    response
        .json()
        .await
        .map_err(|err| StorageError::Serialization(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_validates_url_and_key() {
        assert!(matches!(
            RemoteStoreConfig::new("not a url", "key"),
            Err(RemoteConfigError::InvalidUrl(_))
        ));
        assert!(matches!(
            RemoteStoreConfig::new("ftp://example.com", "key"),
            Err(RemoteConfigError::InvalidUrl(_))
        ));
        assert!(matches!(
            RemoteStoreConfig::new("https://example.com", "  "),
            Err(RemoteConfigError::EmptyKey)
        ));
    }

    #[test]
    fn table_urls_ignore_trailing_slash() {
        let config = RemoteStoreConfig::new("https://db.example.com/", "key").unwrap();
        assert_eq!(
            config.table_url(LIKES_TABLE),
            "https://db.example.com/rest/v1/likes"
        );
    }

    #[tokio::test]
    async fn unreachable_service_is_a_connection_error() {
        let config = RemoteStoreConfig::new("http://127.0.0.1:9", "key").unwrap();
        let client = RemoteTableClient::new(config);
        let err = client
            .list_likes(&ItemId::new("a").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Connection(_)));
    }
}
