/// The UI controller: validates input, calls the backend, and drives [`UiState`].
///
/// One controller lives for one page session. Its operations take `&mut self`,
/// so two requests can never overlap on the same state; the `controls` flags
/// in [`UiState`] mirror that for renderers.
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use tubegrab_shared::errors::{ClientError, ValidationError};
use tubegrab_shared::models::VideoInfo;
use tubegrab_shared::url::validate_url;

use crate::api::{BackendClient, DownloadResponse};
use crate::config::BodyStrategy;
use crate::progress::ProgressTracker;
use crate::sink::{HandleGuard, SaveSink};
use crate::state::{OperationPhase, UiState};

pub const DOWNLOAD_COMPLETE_MESSAGE: &str = "Download complete!";

/// Upper bound on the buffer pre-allocated from `Content-Length`.
const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

/// Where a finished download ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    pub filename: String,
    pub path: PathBuf,
    pub size: u64,
}

pub struct UiController<S: SaveSink> {
    api: BackendClient,
    sink: S,
    state: Arc<watch::Sender<UiState>>,
    progress_tx: Option<mpsc::UnboundedSender<u8>>,
}

impl<S: SaveSink> UiController<S> {
    pub fn new(api: BackendClient, sink: S) -> Self {
        let (state, _) = watch::channel(UiState::new());
        Self {
            api,
            sink,
            state: Arc::new(state),
            progress_tx: None,
        }
    }

    /// Observe state snapshots.
    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> UiState {
        self.state.borrow().clone()
    }

    /// Receive every computed progress percentage, in order.
    ///
    /// Watch subscribers only see the latest state; this channel sees each step.
    pub fn progress_events(&mut self) -> mpsc::UnboundedReceiver<u8> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.progress_tx = Some(tx);
        rx
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn select_format(&mut self, format_id: &str) -> bool {
        let mut selected = false;
        self.state.send_modify(|s| selected = s.select_format(format_id));
        selected
    }

    // ====== METADATA FETCH ======

    /// Validate `raw_url`, fetch its metadata and render it.
    pub async fn fetch_video_info(&mut self, raw_url: &str) -> Result<VideoInfo, ClientError> {
        self.state.send_modify(|s| s.begin_validation());
        let url = match validate_url(raw_url) {
            Ok(url) => url,
            Err(e) => {
                debug!("Rejected input {:?}: {}", raw_url, e);
                let err = ClientError::from(e);
                self.state.send_modify(|s| s.info_phase = OperationPhase::Error);
                self.report_error(&err);
                return Err(err);
            }
        };

        self.state.send_modify(|s| s.begin_fetch());
        let result = self.api.get_info(&url).await;
        self.state.send_modify(|s| s.end_fetch());

        match result {
            Ok(info) => {
                let rendered = info.clone();
                self.state.send_modify(|s| s.show_video_info(rendered));
                Ok(info)
            }
            Err(e) => {
                warn!("Metadata fetch failed for {}: {}", url, e);
                self.state.send_modify(|s| s.info_phase = OperationPhase::Error);
                self.report_error(&e);
                Err(e)
            }
        }
    }

    // ====== DOWNLOAD ======

    /// Download `format_id` of `raw_url` and save it.
    pub async fn download_video(&mut self, raw_url: &str, format_id: &str) -> Result<SavedFile, ClientError> {
        self.state.send_modify(|s| s.download_phase = OperationPhase::Validating);
        let url = raw_url.trim();
        let format_id = format_id.trim();
        if url.is_empty() || format_id.is_empty() {
            let err = ClientError::from(ValidationError::NoFormatSelected);
            self.state.send_modify(|s| s.download_phase = OperationPhase::Error);
            self.report_error(&err);
            return Err(err);
        }

        self.state.send_modify(|s| s.begin_download());
        let result = match self.api.start_download(url, format_id).await {
            Ok(response) => self.receive_and_save(response).await,
            Err(e) => Err(e),
        };
        self.finish(&result);
        result
    }

    /// Download whatever format is currently selected.
    pub async fn download_selected(&mut self, raw_url: &str) -> Result<SavedFile, ClientError> {
        let format_id = self.state.borrow().selected_format.clone().unwrap_or_default();
        self.download_video(raw_url, &format_id).await
    }

    fn finish(&self, result: &Result<SavedFile, ClientError>) {
        let mut generation = 0;
        match result {
            Ok(saved) => {
                info!("Saved {} ({} bytes) to {}", saved.filename, saved.size, saved.path.display());
                self.state
                    .send_modify(|s| generation = s.finish_download(DOWNLOAD_COMPLETE_MESSAGE));
            }
            Err(e) => {
                warn!("Download failed: {}", e);
                let message = e.user_message();
                self.state.send_modify(|s| generation = s.fail_download(message));
                self.report_error(e);
            }
        }
        self.schedule(self.api.config().progress_hide, move |s| {
            s.hide_download(generation);
        });
    }

    async fn receive_and_save(&self, response: DownloadResponse) -> Result<SavedFile, ClientError> {
        let filename = response.filename.clone();
        let blob = match self.api.config().body_strategy {
            BodyStrategy::Streamed => self.receive_streamed(response).await?,
            BodyStrategy::Buffered => response.into_bytes().await?,
        };
        let size = blob.len() as u64;

        let guard = HandleGuard::materialize(&self.sink, blob)?;
        let path = guard.save(&filename)?;
        Ok(SavedFile { filename, path, size })
    }

    async fn receive_streamed(&self, response: DownloadResponse) -> Result<Bytes, ClientError> {
        let total = response.content_length;
        let mut tracker = ProgressTracker::new(total);
        let mut buf = BytesMut::with_capacity(total.unwrap_or(0).min(MAX_PREALLOC) as usize);

        let mut chunks = response.into_chunks();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            if chunk.is_empty() {
                continue;
            }
            buf.extend_from_slice(&chunk);
            let percent = tracker.advance(chunk.len());
            let received = tracker.received();
            self.state.send_modify(|s| s.update_progress(percent, received));
            if let (Some(p), Some(tx)) = (percent, self.progress_tx.as_ref()) {
                let _ = tx.send(p);
            }
        }

        if let Some(total) = tracker.total() {
            if tracker.received() < total {
                return Err(ClientError::Network(format!(
                    "Body ended after {} of {} bytes",
                    tracker.received(),
                    total
                )));
            }
        }
        Ok(buf.freeze())
    }

    // ====== ERRORS & TIMERS ======

    /// Show `err` and schedule its dismissal.
    fn report_error(&self, err: &ClientError) {
        let mut generation = 0;
        self.state
            .send_modify(|s| generation = s.show_error(err.user_message(), err.kind()));
        self.schedule(self.api.config().error_dismiss, move |s| {
            s.dismiss_error(generation);
        });
    }

    fn schedule<F>(&self, after: Duration, apply: F)
    where
        F: FnOnce(&mut UiState) + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            state.send_modify(apply);
        });
    }
}
