/// Page-session UI state owned by the controller and observed by renderers.
use tubegrab_shared::errors::ErrorKind;
use tubegrab_shared::models::VideoInfo;

/// Per-operation lifecycle: `Idle → Validating → Loading → {Success, Error} → Idle`.
///
/// An outcome settles back to `Idle` once its display goes away: the error
/// banner is dismissed or the progress panel hidden. A fetched video panel
/// stays up, so `info_phase` keeps `Success` until the next fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OperationPhase {
    #[default]
    Idle,
    Validating,
    Loading,
    Success,
    Error,
}

/// The mutually exclusive main panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Empty,
    Loading,
    Error,
    VideoInfo,
}

/// Visible error message with the generation that owns its dismissal timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorBanner {
    pub message: String,
    pub kind: ErrorKind,
    pub generation: u64,
}

/// Progress panel contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadStatus {
    Starting,
    Receiving { percent: Option<u8>, received: u64 },
    Complete { message: String },
    Failed { message: String },
}

impl DownloadStatus {
    /// Width of the progress bar, in percent.
    pub fn bar_percent(&self) -> u8 {
        match self {
            DownloadStatus::Starting | DownloadStatus::Failed { .. } => 0,
            DownloadStatus::Receiving { percent, .. } => percent.unwrap_or(0),
            DownloadStatus::Complete { .. } => 100,
        }
    }

    /// Text under the progress bar.
    pub fn text(&self) -> String {
        match self {
            DownloadStatus::Starting => "Starting download...".to_string(),
            DownloadStatus::Receiving { percent: Some(p), .. } => format!("Downloading... {}%", p),
            DownloadStatus::Receiving { received, .. } => format!("Downloading... {} bytes", received),
            DownloadStatus::Complete { message } | DownloadStatus::Failed { message } => message.clone(),
        }
    }
}

/// Progress panel plus the generation that owns its hide timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPanel {
    pub status: DownloadStatus,
    pub generation: u64,
}

/// Enabled state of the two triggering controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub get_info_enabled: bool,
    pub download_enabled: bool,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            get_info_enabled: true,
            download_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiState {
    pub loading: bool,
    pub error: Option<ErrorBanner>,
    pub video_info: Option<VideoInfo>,
    pub selected_format: Option<String>,
    pub download: Option<DownloadPanel>,
    pub info_phase: OperationPhase,
    pub download_phase: OperationPhase,
    pub controls: Controls,
    next_generation: u64,
}

impl UiState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Which main panel is showing. Loading hides everything else, then errors.
    pub fn active_panel(&self) -> Panel {
        if self.loading {
            Panel::Loading
        } else if self.error.is_some() {
            Panel::Error
        } else if self.video_info.is_some() {
            Panel::VideoInfo
        } else {
            Panel::Empty
        }
    }

    fn bump_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    // ====== METADATA FETCH ======

    pub fn begin_validation(&mut self) {
        self.info_phase = OperationPhase::Validating;
    }

    /// Clear stale panels, show the spinner and disable the trigger.
    pub fn begin_fetch(&mut self) {
        self.info_phase = OperationPhase::Loading;
        self.loading = true;
        self.error = None;
        self.video_info = None;
        self.selected_format = None;
        self.controls.get_info_enabled = false;
    }

    /// Hide the spinner and re-enable the trigger; runs on every outcome.
    pub fn end_fetch(&mut self) {
        self.loading = false;
        self.controls.get_info_enabled = true;
    }

    /// Render metadata. The first format starts selected.
    pub fn show_video_info(&mut self, info: VideoInfo) {
        self.selected_format = info.format_list().first().map(|f| f.format_id.clone());
        self.video_info = Some(info);
        self.info_phase = OperationPhase::Success;
    }

    /// Select a format from the rendered list. Returns false for unknown ids.
    pub fn select_format(&mut self, format_id: &str) -> bool {
        let known = self
            .video_info
            .as_ref()
            .is_some_and(|info| info.find_format(format_id).is_some());
        if known {
            self.selected_format = Some(format_id.to_string());
        }
        known
    }

    // ====== ERRORS ======

    /// Show an error banner and return the generation its timer must present.
    pub fn show_error(&mut self, message: impl Into<String>, kind: ErrorKind) -> u64 {
        let generation = self.bump_generation();
        self.error = Some(ErrorBanner {
            message: message.into(),
            kind,
            generation,
        });
        generation
    }

    /// Clear the banner only if it is still the one shown at `generation`.
    pub fn dismiss_error(&mut self, generation: u64) -> bool {
        if self.error.as_ref().is_some_and(|e| e.generation == generation) {
            self.error = None;
            for phase in [&mut self.info_phase, &mut self.download_phase] {
                if *phase == OperationPhase::Error {
                    *phase = OperationPhase::Idle;
                }
            }
            return true;
        }
        false
    }

    // ====== DOWNLOAD ======

    pub fn begin_download(&mut self) {
        let generation = self.bump_generation();
        self.download_phase = OperationPhase::Loading;
        self.controls.download_enabled = false;
        self.download = Some(DownloadPanel {
            status: DownloadStatus::Starting,
            generation,
        });
    }

    pub fn update_progress(&mut self, percent: Option<u8>, received: u64) {
        if let Some(panel) = self.download.as_mut() {
            panel.status = DownloadStatus::Receiving { percent, received };
        }
    }

    /// Mark success and return the generation the hide timer must present.
    pub fn finish_download(&mut self, message: impl Into<String>) -> u64 {
        self.download_phase = OperationPhase::Success;
        self.end_download(DownloadStatus::Complete {
            message: message.into(),
        })
    }

    /// Abort the progress display and return the hide-timer generation.
    pub fn fail_download(&mut self, message: impl Into<String>) -> u64 {
        self.download_phase = OperationPhase::Error;
        self.end_download(DownloadStatus::Failed {
            message: message.into(),
        })
    }

    fn end_download(&mut self, status: DownloadStatus) -> u64 {
        self.controls.download_enabled = true;
        match self.download.as_mut() {
            Some(panel) => {
                panel.status = status;
                panel.generation
            }
            None => {
                let generation = self.bump_generation();
                self.download = Some(DownloadPanel { status, generation });
                generation
            }
        }
    }

    /// Hide the progress panel if no newer download replaced it.
    pub fn hide_download(&mut self, generation: u64) -> bool {
        if self.download.as_ref().is_some_and(|p| p.generation == generation) {
            self.download = None;
            if matches!(self.download_phase, OperationPhase::Success | OperationPhase::Error) {
                self.download_phase = OperationPhase::Idle;
            }
            return true;
        }
        false
    }
}
