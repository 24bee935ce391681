/// Wire models exchanged with the metadata/download backend.
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

/// Descriptive information about a video, as returned by `/get_info`.
///
/// yt-dlp leaves several of these `null` for live streams and some uploads;
/// missing or `null` values decode as empty (or zero).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub uploader: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub duration: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub view_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub thumbnail: String,
    #[serde(default)]
    pub formats: Vec<FormatOption>,
}

impl VideoInfo {
    /// View count grouped with thousands separators, e.g. `1,234,567`.
    pub fn views_display(&self) -> String {
        let digits = self.view_count.to_string();
        let mut out = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(',');
            }
            out.push(c);
        }
        out
    }

    /// Selectable formats in server order. Repeated ids keep their first occurrence.
    pub fn format_list(&self) -> Vec<&FormatOption> {
        let mut seen = HashSet::new();
        self.formats
            .iter()
            .filter(|f| seen.insert(f.format_id.as_str()))
            .collect()
    }

    pub fn find_format(&self, format_id: &str) -> Option<&FormatOption> {
        self.formats.iter().find(|f| f.format_id == format_id)
    }

    /// Number of format entries that repeat an earlier id.
    pub fn duplicate_format_count(&self) -> usize {
        self.formats.len() - self.format_list().len()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One selectable encoding/quality variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatOption {
    pub format_id: String,
    #[serde(default)]
    pub resolution: Option<String>,
    pub ext: String,
    pub filesize: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl FormatOption {
    /// Display label: `"1920x1080 (MP4) - 12.34 MB"`, or `"Audio (...)"` without a resolution.
    pub fn label(&self) -> String {
        let resolution = self
            .resolution
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or("Audio");
        format!("{} ({}) - {}", resolution, self.ext.to_uppercase(), self.filesize)
    }
}

/// Envelope returned by `/get_info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResponse {
    pub success: bool,
    #[serde(default)]
    pub info: Option<VideoInfo>,
    #[serde(default)]
    pub error: Option<String>,
}

impl InfoResponse {
    /// `Ok(info)` on success; `Err(message)` when the backend reported a failure.
    ///
    /// A `success: true` envelope without an `info` payload is treated as a
    /// failure with no message.
    pub fn into_result(self) -> Result<VideoInfo, Option<String>> {
        match (self.success, self.info) {
            (true, Some(info)) => Ok(info),
            _ => Err(self.error.filter(|e| !e.is_empty())),
        }
    }
}

/// Error body a failed `/download` may carry.
///
/// The documented shape is `{message}`; yt-dlp based backends answer
/// `{success: false, error}` instead, so both are read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
}

impl DownloadErrorBody {
    pub fn message(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or(self.error.as_deref())
            .filter(|m| !m.is_empty())
    }

    /// Whether this body explicitly reports a failure.
    pub fn is_failure(&self) -> bool {
        self.success == Some(false) || self.message().is_some()
    }
}
