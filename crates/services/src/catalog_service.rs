use std::path::Path;

use bite_core::model::Catalog;
use reqwest::Client;
use tracing::info;

use crate::error::CatalogServiceError;

/// Loads the static content list, once, from a file or an `http(s)` URL.
#[derive(Clone, Default)]
pub struct CatalogService {
    client: Client,
}

impl CatalogService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate the content list from `source`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError` if the source cannot be read or fetched,
    /// or if the JSON does not describe a valid catalog.
    pub async fn load(&self, source: &str) -> Result<Catalog, CatalogServiceError> {
        let body = if is_remote(source) {
            self.fetch(source).await?
        } else {
            tokio::fs::read_to_string(Path::new(source)).await?
        };
        let catalog = Catalog::from_json(&body)?;
        info!(items = catalog.len(), source, "content list loaded");
        Ok(catalog)
    }

    async fn fetch(&self, url: &str) -> Result<String, CatalogServiceError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(CatalogServiceError::HttpStatus(response.status()));
        }
        Ok(response.text().await?)
    }
}

fn is_remote(source: &str) -> bool {
    let lower = source.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
