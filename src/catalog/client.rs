use super::{CatalogProduct, ProductVariant, default_variant};
use crate::core::{ItemId, Result, WishlistError, WishlistItem};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{Level, event};

pub const DEFAULT_CATALOG_TIMEOUT: Duration = Duration::from_secs(30);

/// Read-only client for the two catalog endpoints the wishlist needs.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: Url,
}

impl CatalogClient {
    /// `base_url` is the API root, e.g. `http://10.0.2.2:5000/api`.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_CATALOG_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let trimmed = base_url.trim_end_matches('/');
        let base_url = Url::parse(trimmed).map_err(|err| {
            WishlistError::Config(format!("invalid catalog URL '{}': {}", trimmed, err))
        })?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(WishlistError::Config(format!(
                "catalog URL must start with http:// or https://, got '{}'",
                trimmed
            )));
        }

        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub async fn product(&self, id: &ItemId) -> Result<CatalogProduct> {
        let key = id.canonical_key();
        self.get_json(self.url(&["products", &*key])).await
    }

    pub async fn variants(&self, id: &ItemId) -> Result<Vec<ProductVariant>> {
        let key = id.canonical_key();
        self.get_json(self.url(&["products", &*key, "variants"])).await
    }

    /// Fetches a product with its variants and maps it the way the detail
    /// surface does, priced by the default variant.
    pub async fn wishlist_item(&self, id: &ItemId) -> Result<WishlistItem> {
        let product = self.product(id).await?;
        let variants = self.variants(id).await?;
        Ok(WishlistItem::from_detail(&product, default_variant(&variants)))
    }

    /// Appends percent-encoded path segments to the API root.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // the constructor rejects cannot-be-a-base URLs
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let url_text = url.to_string();
        event!(Level::DEBUG, url = %url_text, "catalog request");
        let response = self.http.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body)
                .unwrap_or_else(|| format!("server returned status {}", status.as_u16()));
            event!(
                Level::WARN,
                url = %url_text,
                status = status.as_u16(),
                %message,
                "catalog request failed"
            );
            return Err(WishlistError::Catalog(message));
        }

        Ok(response.json::<T>().await?)
    }
}

/// Pulls a readable message out of an error body. HTML error pages (a proxy
/// answering instead of the API) get a fixed description.
fn error_message(body: &str) -> Option<String> {
    if body.contains("<!DOCTYPE") {
        return Some("server answered with HTML instead of JSON".to_string());
    }
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
}
