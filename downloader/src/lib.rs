//! Tubegrab client library.
//!
//! Talks to a metadata/download backend over two form-encoded POST
//! endpoints and keeps a renderer-agnostic UI state in sync with each
//! interaction.
pub mod api;
pub mod config;
pub mod controller;
pub mod filename;
pub mod progress;
pub mod sink;
pub mod state;

pub use api::{BackendClient, DownloadResponse};
pub use config::{BodyStrategy, ClientConfig};
pub use controller::{SavedFile, UiController, DOWNLOAD_COMPLETE_MESSAGE};
pub use sink::{DiskSink, MemorySink, SaveSink};
pub use state::{DownloadStatus, OperationPhase, Panel, UiState};
