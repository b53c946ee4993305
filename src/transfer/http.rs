//! HTTP collaborators talking to the resolver/download service

use super::traits::{PayloadFetcher, PlaylistResolver};
use crate::config::FetchConfig;
use crate::error::{Error, FetchError, Result};
use crate::types::{AudioFormat, Payload, Playlist};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Request body of the download endpoint
#[derive(Debug, Serialize)]
struct DownloadRequest<'a> {
    url: &'a str,
    format: AudioFormat,
}

/// Request body of the playlist endpoint
#[derive(Debug, Serialize)]
struct PlaylistRequest<'a> {
    url: &'a str,
}

/// Error body the service sends with non-success responses
#[derive(Debug, Deserialize)]
struct RemoteErrorBody {
    error: String,
}

fn build_client(config: &FetchConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| Error::Config {
            message: format!("failed to create HTTP client: {}", e),
            key: Some("fetch".to_string()),
        })
}

/// Turn a non-success response into [`FetchError::Remote`]
///
/// Uses the `error` field of a JSON body when present, otherwise the body
/// text, otherwise the status reason.
async fn remote_error(response: reqwest::Response) -> FetchError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let message = match serde_json::from_str::<RemoteErrorBody>(&body) {
        Ok(parsed) => parsed.error,
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    };

    FetchError::Remote {
        status: status.as_u16(),
        message,
    }
}

/// [`PayloadFetcher`] that POSTs `{ "url", "format" }` to the download endpoint
pub struct HttpPayloadFetcher {
    client: reqwest::Client,
    endpoint: url::Url,
}

impl HttpPayloadFetcher {
    /// Create a fetcher for the configured service
    pub fn new(config: &FetchConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            endpoint: config.download_url()?,
        })
    }
}

#[async_trait]
impl PayloadFetcher for HttpPayloadFetcher {
    async fn fetch_payload(
        &self,
        source_reference: &str,
        format: AudioFormat,
    ) -> std::result::Result<Payload, FetchError> {
        tracing::debug!(endpoint = %self.endpoint, source = source_reference, %format, "Fetching payload");

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&DownloadRequest {
                url: source_reference,
                format,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(remote_error(response).await);
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(FetchError::EmptyPayload);
        }

        Ok(Payload {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

/// [`PlaylistResolver`] that POSTs `{ "url" }` to the playlist endpoint
pub struct HttpPlaylistResolver {
    client: reqwest::Client,
    endpoint: url::Url,
}

impl HttpPlaylistResolver {
    /// Create a resolver for the configured service
    pub fn new(config: &FetchConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            endpoint: config.playlist_url()?,
        })
    }
}

#[async_trait]
impl PlaylistResolver for HttpPlaylistResolver {
    async fn resolve(&self, playlist_url: &str) -> Result<Playlist> {
        tracing::debug!(endpoint = %self.endpoint, playlist = playlist_url, "Resolving playlist");

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&PlaylistRequest { url: playlist_url })
            .send()
            .await
            .map_err(FetchError::from)?;

        if !response.status().is_success() {
            return Err(Error::Fetch(remote_error(response).await));
        }

        let body = response.bytes().await.map_err(FetchError::from)?;
        let playlist: Playlist = serde_json::from_slice(&body)
            .map_err(|e| FetchError::InvalidResponse(format!("playlist body: {}", e)))?;

        if playlist.tracks.is_empty() {
            return Err(Error::EmptyPlaylist(playlist_url.to_string()));
        }

        tracing::info!(
            playlist = playlist_url,
            title = %playlist.title,
            tracks = playlist.tracks.len(),
            "Resolved playlist"
        );

        Ok(playlist)
    }
}
