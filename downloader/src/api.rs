/// HTTP client for the two backend endpoints: `POST /get_info` and `POST /download`.
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, CONTENT_DISPOSITION, CONTENT_TYPE};
use tracing::{debug, info, warn};

use tubegrab_shared::errors::{ClientError, GENERIC_DOWNLOAD_ERROR, GENERIC_INFO_ERROR};
use tubegrab_shared::models::{DownloadErrorBody, InfoResponse, VideoInfo};

use crate::config::ClientConfig;
use crate::filename::filename_from_disposition;

/// Response body delivered chunk by chunk.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes, ClientError>> + Send>>;

fn network(e: reqwest::Error) -> ClientError {
    ClientError::Network(e.to_string())
}

/// Bound `fut` by `limit`; running out is a network failure.
async fn within<T, F>(limit: Duration, what: &str, fut: F) -> Result<T, ClientError>
where
    F: Future<Output = Result<T, ClientError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| ClientError::Network(format!("{} timed out after {:?}", what, limit)))?
}

/// Fail the stream when no chunk arrives for `idle`. A body that keeps
/// arriving is never cut off, however long it takes overall.
fn idle_limited(stream: ChunkStream, idle: Duration) -> ChunkStream {
    Box::pin(futures::stream::unfold(Some(stream), move |state| async move {
        let mut stream = state?;
        match tokio::time::timeout(idle, stream.next()).await {
            Ok(Some(item)) => Some((item, Some(stream))),
            Ok(None) => None,
            Err(_) => Some((
                Err(ClientError::Network(format!("No data received for {:?}", idle))),
                None,
            )),
        }
    }))
}

enum Body {
    Http(reqwest::Response),
    Chunks(ChunkStream),
}

/// A successful `/download` response whose body has not been read yet.
pub struct DownloadResponse {
    pub filename: String,
    /// Declared `Content-Length`, when the server sent one.
    pub content_length: Option<u64>,
    body: Body,
    idle_timeout: Option<Duration>,
}

impl std::fmt::Debug for DownloadResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadResponse")
            .field("filename", &self.filename)
            .field("content_length", &self.content_length)
            .field("idle_timeout", &self.idle_timeout)
            .finish_non_exhaustive()
    }
}

impl DownloadResponse {
    /// Wrap an arbitrary chunk stream, e.g. a body produced outside of reqwest.
    pub fn from_stream<St>(filename: impl Into<String>, content_length: Option<u64>, stream: St) -> Self
    where
        St: Stream<Item = Result<Bytes, ClientError>> + Send + 'static,
    {
        Self {
            filename: filename.into(),
            content_length,
            body: Body::Chunks(Box::pin(stream)),
            idle_timeout: None,
        }
    }

    /// Fail the body once it stalls for longer than `idle` between chunks.
    pub fn with_idle_timeout(mut self, idle: Duration) -> Self {
        self.idle_timeout = Some(idle);
        self
    }

    /// The body as a stream of chunks, for progress reporting.
    pub fn into_chunks(self) -> ChunkStream {
        let stream: ChunkStream = match self.body {
            Body::Http(response) => Box::pin(response.bytes_stream().map_err(network)),
            Body::Chunks(stream) => stream,
        };
        match self.idle_timeout {
            Some(idle) => idle_limited(stream, idle),
            None => stream,
        }
    }

    /// The whole body at once.
    pub async fn into_bytes(self) -> Result<Bytes, ClientError> {
        let buf = self
            .into_chunks()
            .try_fold(BytesMut::new(), |mut buf, chunk| async move {
                buf.extend_from_slice(&chunk);
                Ok(buf)
            })
            .await?;
        Ok(buf.freeze())
    }
}

/// Thin wrapper over `reqwest::Client` bound to one backend origin.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl BackendClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        // No overall timeout: it would also bound a long but healthy body.
        let http = reqwest::Client::builder()
            .connect_timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// POST /get_info with `url=<encoded>`.
    pub async fn get_info(&self, url: &str) -> Result<VideoInfo, ClientError> {
        let endpoint = self.config.endpoint("/get_info");
        debug!("POST {} url={}", endpoint, url);

        let request = self.http.post(&endpoint).form(&[("url", url)]);
        let envelope: InfoResponse = within(self.config.request_timeout, "Metadata request", async move {
            let response = request.send().await.map_err(network)?;
            response.json().await.map_err(network)
        })
        .await?;

        match envelope.into_result() {
            Ok(info) => {
                info!("Fetched info for {:?} ({} formats)", info.title, info.formats.len());
                if info.duplicate_format_count() > 0 {
                    warn!(
                        "Backend returned {} repeated format ids for {}",
                        info.duplicate_format_count(),
                        url
                    );
                }
                Ok(info)
            }
            Err(message) => {
                let message = message.unwrap_or_else(|| GENERIC_INFO_ERROR.to_string());
                warn!("Backend refused info for {}: {}", url, message);
                Err(ClientError::Server(message))
            }
        }
    }

    /// POST /download with `url=…&format_id=…`. The body is left unread.
    pub async fn start_download(&self, url: &str, format_id: &str) -> Result<DownloadResponse, ClientError> {
        let endpoint = self.config.endpoint("/download");
        debug!("POST {} url={} format_id={}", endpoint, url, format_id);

        let request = self
            .http
            .post(&endpoint)
            .form(&[("url", url), ("format_id", format_id)]);
        let response = within(self.config.request_timeout, "Download request", async move {
            request.send().await.map_err(network)
        })
        .await?;

        let status = response.status();
        let disposition = header_str(response.headers(), CONTENT_DISPOSITION);

        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            let message = error_message(&body);
            warn!("Download refused with HTTP {}: {}", status.as_u16(), message);
            return Err(ClientError::Download(message));
        }

        let filename = filename_from_disposition(disposition.as_deref(), &self.config.fallback_filename);

        // Some backends answer 200 with a JSON failure envelope instead of media.
        if disposition.is_none() && is_json(response.headers()) {
            let body = response.bytes().await.map_err(network)?;
            if let Ok(envelope) = serde_json::from_slice::<DownloadErrorBody>(&body) {
                if envelope.is_failure() {
                    let message = error_message(&body);
                    warn!("Download answered with a JSON failure instead of media: {}", message);
                    return Err(ClientError::Download(message));
                }
            }
            let content_length = Some(body.len() as u64);
            info!("Download started: {} ({:?} bytes, JSON)", filename, content_length);
            return Ok(DownloadResponse::from_stream(
                filename,
                content_length,
                futures::stream::iter([Ok(body)]),
            ));
        }

        let content_length = response.content_length();
        info!("Download started: {} ({:?} bytes)", filename, content_length);

        Ok(DownloadResponse {
            filename,
            content_length,
            body: Body::Http(response),
            idle_timeout: Some(self.config.chunk_timeout),
        })
    }
}

fn header_str(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

fn is_json(headers: &HeaderMap) -> bool {
    header_str(headers, CONTENT_TYPE)
        .map(|ct| ct.to_ascii_lowercase().starts_with("application/json"))
        .unwrap_or(false)
}

/// Best-effort message from a failure body; the generic text otherwise.
fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<DownloadErrorBody>(body)
        .ok()
        .and_then(|b| b.message().map(String::from))
        .unwrap_or_else(|| GENERIC_DOWNLOAD_ERROR.to_string())
}
