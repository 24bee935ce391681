/// Save-as filename derivation from `Content-Disposition`.
use once_cell::sync::Lazy;
use regex::Regex;

/// `filename*=UTF-8''percent%20encoded` (RFC 5987). Wins over the plain form.
static EXTENDED_FILENAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)filename\*\s*=\s*([A-Za-z0-9_-]*)'[^']*'([^;\s]+)").unwrap()
});

/// `filename="quoted"` or `filename=bare`.
static PLAIN_FILENAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:^|;)\s*filename\s*=\s*(?:"((?:[^"\\]|\\.)*)"|([^;]+))"#).unwrap()
});

/// Derive the output filename from a `Content-Disposition` value.
///
/// Returns `fallback` when the header is absent, carries no filename token,
/// or the token sanitizes to nothing.
pub fn filename_from_disposition(header: Option<&str>, fallback: &str) -> String {
    header
        .and_then(extract_filename)
        .map(|name| sanitize_filename(&name))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

fn extract_filename(header: &str) -> Option<String> {
    if let Some(cap) = EXTENDED_FILENAME_RE.captures(header) {
        if let Ok(decoded) = urlencoding::decode(&cap[2]) {
            return Some(decoded.into_owned());
        }
    }

    let cap = PLAIN_FILENAME_RE.captures(header)?;
    if let Some(quoted) = cap.get(1) {
        return Some(quoted.as_str().replace("\\\"", "\"").replace("\\\\", "\\"));
    }
    cap.get(2).map(|bare| bare.as_str().trim().to_string())
}

/// Reduce a server-supplied name to a single safe path component.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let cleaned: String = base
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    cleaned.trim().trim_start_matches('.').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FALLBACK: &str = "video.mp4";

    #[test]
    fn test_quoted_filename() {
        assert_eq!(
            filename_from_disposition(Some(r#"attachment; filename="clip.mp4""#), FALLBACK),
            "clip.mp4"
        );
    }

    #[test]
    fn test_bare_filename_with_trailing_params() {
        assert_eq!(
            filename_from_disposition(Some("attachment; filename=clip.webm; size=1024"), FALLBACK),
            "clip.webm"
        );
    }

    #[test]
    fn test_extended_filename_wins() {
        let header = r#"attachment; filename="fallback.mp4"; filename*=UTF-8''na%C3%AFve%20clip.mp4"#;
        assert_eq!(filename_from_disposition(Some(header), FALLBACK), "naïve clip.mp4");
    }

    #[test]
    fn test_missing_header_or_token() {
        assert_eq!(filename_from_disposition(None, FALLBACK), FALLBACK);
        assert_eq!(filename_from_disposition(Some("attachment"), FALLBACK), FALLBACK);
        assert_eq!(filename_from_disposition(Some(r#"attachment; filename="""#), FALLBACK), FALLBACK);
    }

    #[test]
    fn test_path_components_are_stripped() {
        assert_eq!(
            filename_from_disposition(Some(r#"attachment; filename="../../etc/passwd""#), FALLBACK),
            "passwd"
        );
        assert_eq!(
            filename_from_disposition(Some(r#"attachment; filename="C:\\temp\\a.mp4""#), FALLBACK),
            "a.mp4"
        );
        assert_eq!(filename_from_disposition(Some("attachment; filename=.."), FALLBACK), FALLBACK);
    }

    #[test]
    fn test_reserved_characters_replaced() {
        assert_eq!(sanitize_filename("what? a: clip*.mp4"), "what_ a_ clip_.mp4");
        assert_eq!(sanitize_filename(".hidden.mp4"), "hidden.mp4");
        assert_eq!(sanitize_filename("tab\there.mp4"), "tab_here.mp4");
    }
}
