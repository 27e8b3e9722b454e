use chrono::Utc;

/// Replace characters that are unsafe in file names with `_` and trim.
///
/// Covers path separators, the reserved Windows set and control characters.
pub fn escape_filename(name: &str) -> String {
    let escaped: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            ':' | '*' | '?' | '<' | '>' | '|' | '"' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    escaped.trim().to_string()
}

/// Download file name: escaped title plus extension, or a timestamped
/// fallback when there is no usable title.
///
/// ```
/// use nulldl::core::utils::download_filename;
///
/// assert_eq!(download_filename(Some("a/b:c"), "mp4"), "a_b_c.mp4");
/// assert!(download_filename(None, "mp3").starts_with("download_"));
/// ```
pub fn download_filename(title: Option<&str>, ext: &str) -> String {
    match title.map(escape_filename).filter(|t| !t.is_empty()) {
        Some(title) => format!("{}.{}", title, ext),
        None => format!("download_{}.{}", Utc::now().timestamp_millis(), ext),
    }
}

/// `attachment; filename="<percent-encoded name>"`
pub fn content_disposition(filename: &str) -> String {
    format!("attachment; filename=\"{}\"", urlencoding::encode(filename))
}

/// Human-readable byte count for logs.
pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let bytes = bytes as f64;
    if bytes >= GB {
        format!("{:.2} GB", bytes / GB)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes / MB)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes / KB)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_filename() {
        assert_eq!(escape_filename("a/b:c"), "a_b_c");
        assert_eq!(escape_filename("  what? <now> | \"x\"  "), "what_ _now_ _ _x_");
        assert_eq!(escape_filename("tab\there"), "tab_here");
        assert_eq!(escape_filename("Кириллица ok"), "Кириллица ok");
    }

    #[test]
    fn test_download_filename_with_title() {
        let name = download_filename(Some("a/b:c"), "mp4");
        assert_eq!(name, "a_b_c.mp4");
        assert!(!name.contains('/') && !name.contains(':'));
    }

    #[test]
    fn test_download_filename_fallback() {
        for title in [None, Some(""), Some("   ")] {
            let name = download_filename(title, "wav");
            assert!(name.starts_with("download_"), "{}", name);
            assert!(name.ends_with(".wav"));
            let millis = &name["download_".len()..name.len() - ".wav".len()];
            assert!(millis.parse::<i64>().is_ok(), "{}", millis);
        }
    }

    #[test]
    fn test_content_disposition_is_percent_encoded() {
        assert_eq!(
            content_disposition("my song.mp3"),
            "attachment; filename=\"my%20song.mp3\""
        );
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
    }
}
