//! Generic XYZ tile provider driven by a URL template.

use tracing::debug;

use crate::coord::TileIndex;
use crate::provider::{AsyncHttpClient, AsyncProvider, ProviderError, UrlTemplate};

/// Downloads tiles from any XYZ endpoint described by a [`UrlTemplate`].
///
/// # Example
///
/// ```ignore
/// use waymeta::provider::{AsyncReqwestClient, TemplateProvider, UrlTemplate};
///
/// let template = UrlTemplate::parse("https://tiles.example.com/${z}/${x}/${y}.png")?;
/// let provider = TemplateProvider::new("example", template, AsyncReqwestClient::new()?);
/// let bytes = provider.download_tile(tile).await?;
/// ```
pub struct TemplateProvider<C: AsyncHttpClient> {
    name: String,
    template: UrlTemplate,
    http_client: C,
}

impl<C: AsyncHttpClient> TemplateProvider<C> {
    pub fn new(name: impl Into<String>, template: UrlTemplate, http_client: C) -> Self {
        Self {
            name: name.into(),
            template,
            http_client,
        }
    }

    /// Builds the tile URL for the given tile.
    pub fn build_url(&self, tile: TileIndex) -> String {
        self.template.render(tile)
    }

    /// The underlying HTTP client.
    pub fn http_client(&self) -> &C {
        &self.http_client
    }
}

impl<C: AsyncHttpClient> AsyncProvider for TemplateProvider<C> {
    async fn download_tile(&self, tile: TileIndex) -> Result<Vec<u8>, ProviderError> {
        let url = self.build_url(tile);
        debug!(provider = %self.name, %tile, url = %url, "Fetching tile");
        self.http_client.get(&url).await
    }

    fn name(&self) -> &str {
        &self.name
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockAsyncHttpClient;

    fn provider(response: Result<Vec<u8>, ProviderError>) -> TemplateProvider<MockAsyncHttpClient> {
        let template = UrlTemplate::parse("https://tiles.test/${z}/${x}/${y}.png").unwrap();
        TemplateProvider::new("test", template, MockAsyncHttpClient::new(response))
    }

    #[test]
    fn test_provider_name() {
        assert_eq!(provider(Ok(vec![])).name(), "test");
    }

    #[tokio::test]
    async fn test_download_tile_requests_rendered_url() {
        let p = provider(Ok(vec![1, 2, 3]));
        let tile = TileIndex::new(200, 100, 10).unwrap();

        let bytes = p.download_tile(tile).await.unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
        assert_eq!(
            p.http_client().requested_urls(),
            vec!["https://tiles.test/10/200/100.png"]
        );
    }

    #[tokio::test]
    async fn test_download_tile_http_error() {
        let p = provider(Err(ProviderError::HttpError("Network error".to_string())));
        let tile = TileIndex::new(0, 0, 1).unwrap();

        match p.download_tile(tile).await {
            Err(ProviderError::HttpError(msg)) => assert_eq!(msg, "Network error"),
            other => panic!("Expected HttpError, got {:?}", other),
        }
    }
}
