//! Request validation
//!
//! Everything here runs before any subprocess is spawned or any file is
//! touched, so a rejected request needs no cleanup.

use thiserror::Error;
use url::Url;

/// Validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// No URL in the request body (or only whitespace)
    #[error("URL is required")]
    MissingUrl,

    /// Not an absolute http(s) URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Audio encoding that cannot be used as a file extension
    #[error("Invalid audio format '{0}': only ASCII letters and digits are allowed")]
    InvalidAudioFormat(String),
}

/// Returns the trimmed URL.
///
/// Absent or blank input is `MissingUrl`. Anything that is not an absolute
/// `http`/`https` URL with a host is `InvalidUrl`, so the value can never be
/// read as a yt-dlp option.
///
/// # Examples
/// ```
/// use nulldl::core::validation::require_url;
///
/// assert_eq!(require_url(Some(" https://youtu.be/x ")).unwrap(), "https://youtu.be/x");
/// assert!(require_url(Some("   ")).is_err());
/// assert!(require_url(None).is_err());
/// assert!(require_url(Some("--exec=id")).is_err());
/// assert!(require_url(Some("file:///etc/passwd")).is_err());
/// ```
pub fn require_url(url: Option<&str>) -> Result<String, ValidationError> {
    let url = match url.map(str::trim) {
        Some(u) if !u.is_empty() => u,
        _ => return Err(ValidationError::MissingUrl),
    };

    let parsed = Url::parse(url).map_err(|_| ValidationError::InvalidUrl(url.to_string()))?;

    // Only HTTP and HTTPS are allowed
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ValidationError::InvalidUrl(format!(
            "{} (invalid scheme: {})",
            url,
            parsed.scheme()
        )));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ValidationError::InvalidUrl(format!("{} (no host)", url)));
    }

    Ok(url.to_string())
}

/// Checks a requested audio encoding.
///
/// The encoding ends up as the canonical file extension inside the scratch
/// directory, so anything other than `[A-Za-z0-9]+` is rejected.
pub fn validate_audio_format(format: &str) -> Result<(), ValidationError> {
    if format.is_empty() || !format.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidAudioFormat(format.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_url() {
        assert_eq!(
            require_url(Some("https://www.youtube.com/watch?v=abc")).unwrap(),
            "https://www.youtube.com/watch?v=abc"
        );
        assert!(matches!(require_url(Some("")), Err(ValidationError::MissingUrl)));
        assert!(matches!(require_url(None), Err(ValidationError::MissingUrl)));
    }

    #[test]
    fn test_require_url_rejects_non_http() {
        for bad in [
            "--exec=touch /tmp/x",
            "-o /etc/passwd",
            "not a url",
            "file:///etc/passwd",
            "ftp://example.com/video",
            "youtube.com/watch?v=abc",
        ] {
            assert!(
                matches!(require_url(Some(bad)), Err(ValidationError::InvalidUrl(_))),
                "{bad:?} should be rejected"
            );
        }
        assert!(require_url(Some("http://example.com/v.mp4")).is_ok());
    }

    #[test]
    fn test_validate_audio_format() {
        for ok in ["mp3", "wav", "m4a", "flac", "opus"] {
            assert!(validate_audio_format(ok).is_ok(), "{ok} should be accepted");
        }
        for bad in ["", "../mp3", "mp3;rm", "wav ", "a/b"] {
            assert!(validate_audio_format(bad).is_err(), "{bad:?} should be rejected");
        }
    }
}
