//! Title and preview image lookup for a bookmarked URL.

use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;
use tracing::debug;

use crate::error::Result;

pub const DEFAULT_CATEGORY: &str = "default";

/// Characters escaped in the `url` parameter, the same set as JavaScript's
/// `encodeURIComponent`. Spaces become `%20`, not `+`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    pub title: String,
    pub favicon_url: String,
    pub category: String,
}

impl Metadata {
    /// What an entry gets when nothing could be looked up.
    pub fn fallback() -> Self {
        Metadata {
            title: String::new(),
            favicon_url: String::new(),
            category: DEFAULT_CATEGORY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success(Metadata),
    Failure { reason: String },
}

impl FetchOutcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        FetchOutcome::Failure {
            reason: reason.into(),
        }
    }

    pub fn into_metadata_or_fallback(self) -> Metadata {
        match self {
            FetchOutcome::Success(metadata) => metadata,
            FetchOutcome::Failure { .. } => Metadata::fallback(),
        }
    }
}

#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchOutcome;
}

/// Shape returned by the metadata endpoint.
#[derive(Debug, Deserialize)]
struct Preview {
    title: String,
    image: String,
}

/// Asks `GET <endpoint>?url=<url>` for `{"title": .., "image": ..}`.
pub struct HttpMetadataFetcher {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpMetadataFetcher {
    /// No timeout unless one is given.
    pub fn new(endpoint: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(HttpMetadataFetcher {
            client: builder.build()?,
            endpoint: endpoint.into(),
        })
    }

    fn request_url(&self, url: &str) -> String {
        let separator = if self.endpoint.contains('?') { '&' } else { '?' };
        format!(
            "{}{}url={}",
            self.endpoint,
            separator,
            utf8_percent_encode(url, COMPONENT)
        )
    }

    async fn request(&self, url: &str) -> reqwest::Result<Preview> {
        self.client
            .get(self.request_url(url))
            .send()
            .await?
            .error_for_status()?
            .json::<Preview>()
            .await
    }
}

#[async_trait]
impl MetadataFetcher for HttpMetadataFetcher {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        match self.request(url).await {
            Ok(preview) => {
                debug!(url, title = %preview.title, "fetched metadata");
                FetchOutcome::Success(Metadata {
                    title: preview.title,
                    favicon_url: preview.image,
                    category: DEFAULT_CATEGORY.to_string(),
                })
            }
            Err(err) => FetchOutcome::failure(err.to_string()),
        }
    }
}

/// Stand-in used when no endpoint is configured.
pub struct UnconfiguredFetcher;

#[async_trait]
impl MetadataFetcher for UnconfiguredFetcher {
    async fn fetch(&self, _url: &str) -> FetchOutcome {
        FetchOutcome::failure("no metadata endpoint configured")
    }
}
