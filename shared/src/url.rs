/// YouTube URL validation applied before any backend call.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::ValidationError;

// ====== REGEX PATTERNS ======

/// youtube.com / youtu.be reference with a non-empty path.
static YOUTUBE_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:https?://)?(?:(?:www|m|music)\.)?(?:youtube\.com|youtu\.be)/.+$"
    ).unwrap()
});

/// Whether `url` looks like a YouTube video reference.
pub fn is_youtube_url(url: &str) -> bool {
    YOUTUBE_URL_RE.is_match(url)
}

/// Trim and check a raw input field. Returns the trimmed URL.
pub fn validate_url(raw: &str) -> Result<String, ValidationError> {
    let url = raw.trim();
    if url.is_empty() {
        return Err(ValidationError::EmptyUrl);
    }
    if !is_youtube_url(url) {
        return Err(ValidationError::InvalidUrl);
    }
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_url() {
        assert!(is_youtube_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_youtube_url("http://youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_youtube_url("youtube.com/watch?v=dQw4w9WgXcQ"));
    }

    #[test]
    fn test_short_host() {
        assert!(is_youtube_url("https://youtu.be/dQw4w9WgXcQ"));
        assert!(is_youtube_url("youtu.be/dQw4w9WgXcQ"));
    }

    #[test]
    fn test_subdomains_and_case() {
        assert!(is_youtube_url("https://m.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_youtube_url("https://music.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_youtube_url("HTTPS://WWW.YOUTUBE.COM/shorts/abc123def45"));
    }

    #[test]
    fn test_path_may_contain_spaces() {
        assert!(is_youtube_url("youtube.com/watch?v=a b"));
        assert_eq!(
            validate_url(" https://www.youtube.com/results?search_query=never gonna "),
            Ok("https://www.youtube.com/results?search_query=never gonna".to_string())
        );
    }

    #[test]
    fn test_rejects_non_youtube() {
        assert!(!is_youtube_url("not a url"));
        assert!(!is_youtube_url("https://example.com/watch?v=dQw4w9WgXcQ"));
        assert!(!is_youtube_url("https://youtube.com/"));
        assert!(!is_youtube_url("https://notyoutube.com/watch?v=x"));
        assert!(!is_youtube_url("ftp://youtube.com/watch?v=x"));
    }

    #[test]
    fn test_validate_url_order() {
        assert_eq!(validate_url(""), Err(ValidationError::EmptyUrl));
        assert_eq!(validate_url("   \t "), Err(ValidationError::EmptyUrl));
        assert_eq!(validate_url("not a url"), Err(ValidationError::InvalidUrl));
        assert_eq!(
            validate_url("  https://youtu.be/dQw4w9WgXcQ \n"),
            Ok("https://youtu.be/dQw4w9WgXcQ".to_string())
        );
    }
}
