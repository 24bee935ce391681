/// Terminal rendering of [`UiState`] snapshots.
///
/// The renderer only prints what changed since the previous snapshot, so it
/// can be fed every watch notification without repeating panels.
use tubegrab_downloader::state::{DownloadStatus, ErrorBanner, Panel, UiState};
use tubegrab_shared::models::VideoInfo;

const BAR_WIDTH: usize = 30;

/// One line of output and the stream it belongs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Out(String),
    Err(String),
}

#[derive(Debug, Default)]
pub struct Renderer {
    was_loading: bool,
    info_shown: bool,
    last_error: Option<u64>,
    last_progress: Option<String>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines describing what changed between the last snapshot and `state`.
    pub fn diff(&mut self, state: &UiState) -> Vec<Line> {
        let mut lines = Vec::new();

        if state.loading && !self.was_loading {
            lines.push(Line::Err("Fetching video info...".to_string()));
        }
        self.was_loading = state.loading;

        match (&state.video_info, state.active_panel()) {
            (Some(info), Panel::VideoInfo) if !self.info_shown => {
                lines.extend(video_panel(info, state.selected_format.as_deref()).into_iter().map(Line::Out));
                self.info_shown = true;
            }
            (None, _) => self.info_shown = false,
            _ => {}
        }

        if let Some(banner) = &state.error {
            if self.last_error != Some(banner.generation) {
                lines.push(Line::Err(error_line(banner)));
                self.last_error = Some(banner.generation);
            }
        }

        match &state.download {
            Some(panel) => {
                let line = progress_line(&panel.status);
                if self.last_progress.as_deref() != Some(line.as_str()) {
                    lines.push(Line::Err(line.clone()));
                    self.last_progress = Some(line);
                }
            }
            None => self.last_progress = None,
        }

        lines
    }

    /// Print the changes in `state`.
    pub fn emit(&mut self, state: &UiState) {
        for line in self.diff(state) {
            match line {
                Line::Out(text) => println!("{}", text),
                Line::Err(text) => eprintln!("{}", text),
            }
        }
    }
}

/// The metadata panel with a numbered format list. `*` marks the selection.
pub fn video_panel(info: &VideoInfo, selected: Option<&str>) -> Vec<String> {
    let mut lines = vec![
        info.title.clone(),
        format!("Uploaded by: {}", info.uploader),
        format!("Duration: {}", info.duration),
        format!("Views: {}", info.views_display()),
        format!("Thumbnail: {}", info.thumbnail),
        "Formats:".to_string(),
    ];
    for (i, format) in info.format_list().iter().enumerate() {
        let marker = if selected == Some(format.format_id.as_str()) { '*' } else { ' ' };
        lines.push(format!("{} {:>3}. [{}] {}", marker, i + 1, format.format_id, format.label()));
    }
    lines
}

pub fn error_line(banner: &ErrorBanner) -> String {
    format!("Error: {}", banner.message)
}

/// `[#######.......]  50% Downloading... 50%`
pub fn progress_line(status: &DownloadStatus) -> String {
    let percent = status.bar_percent() as usize;
    let filled = BAR_WIDTH * percent.min(100) / 100;
    format!(
        "[{}{}] {:>3}% {}",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled),
        percent,
        status.text()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tubegrab_shared::errors::ErrorKind;
    use tubegrab_shared::models::FormatOption;

    fn info() -> VideoInfo {
        VideoInfo {
            title: "Clip".into(),
            uploader: "Someone".into(),
            duration: "0:42".into(),
            view_count: 12345,
            thumbnail: "https://i.ytimg.com/vi/x/hq.jpg".into(),
            formats: vec![
                FormatOption {
                    format_id: "140".into(),
                    resolution: None,
                    ext: "m4a".into(),
                    filesize: "1.00 MB".into(),
                    note: None,
                },
                FormatOption {
                    format_id: "18".into(),
                    resolution: Some("640x360".into()),
                    ext: "mp4".into(),
                    filesize: "Unknown".into(),
                    note: None,
                },
            ],
        }
    }

    #[test]
    fn test_video_panel_lists_formats() {
        let lines = video_panel(&info(), Some("18"));
        assert_eq!(lines[3], "Views: 12,345");
        assert_eq!(lines[6], "    1. [140] Audio (M4A) - 1.00 MB");
        assert_eq!(lines[7], "*   2. [18] 640x360 (MP4) - Unknown");
    }

    #[test]
    fn test_progress_line() {
        let line = progress_line(&DownloadStatus::Receiving { percent: Some(50), received: 500 });
        assert!(line.starts_with(&format!("[{}{}]", "#".repeat(15), ".".repeat(15))));
        assert!(line.ends_with(" 50% Downloading... 50%"));
    }

    #[test]
    fn test_diff_prints_each_change_once() {
        let mut renderer = Renderer::new();
        let mut state = UiState::new();

        state.begin_fetch();
        assert_eq!(renderer.diff(&state), vec![Line::Err("Fetching video info...".into())]);
        assert!(renderer.diff(&state).is_empty());

        state.end_fetch();
        state.show_video_info(info());
        let lines = renderer.diff(&state);
        assert_eq!(lines[0], Line::Out("Clip".into()));
        assert!(renderer.diff(&state).is_empty());

        state.show_error("boom", ErrorKind::Server);
        assert_eq!(renderer.diff(&state), vec![Line::Err("Error: boom".into())]);
        assert!(renderer.diff(&state).is_empty());

        state.begin_download();
        state.update_progress(Some(50), 500);
        assert_eq!(renderer.diff(&state).len(), 1);
        state.update_progress(Some(50), 600);
        assert!(renderer.diff(&state).is_empty());
    }
}
