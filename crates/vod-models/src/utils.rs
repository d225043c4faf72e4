//! Small shared utilities.

/// Sanitize a client-provided filename for embedding in an object key.
///
/// Lowercases, replaces spaces with dashes and strips everything outside
/// `[a-z0-9._-]`. Falls back to `"file"` when nothing survives.
pub fn safe_filename(name: &str) -> String {
    let lowered = name.trim().to_lowercase().replace(' ', "-");

    let kept: String = lowered
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '-' | '_'))
        .collect();

    let trimmed = kept.trim_matches('-');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_simple_names() {
        assert_eq!(safe_filename("movie.mp4"), "movie.mp4");
    }

    #[test]
    fn normalizes_spaces_and_case() {
        assert_eq!(safe_filename("My Holiday Video.MP4"), "my-holiday-video.mp4");
    }

    #[test]
    fn strips_hostile_characters() {
        assert_eq!(safe_filename("../../etc/passwd"), "....etcpasswd");
        assert_eq!(safe_filename("a/b\\c.mp4"), "abc.mp4");
    }

    #[test]
    fn falls_back_when_nothing_survives() {
        assert_eq!(safe_filename("???"), "file");
        assert_eq!(safe_filename(""), "file");
        assert_eq!(safe_filename("---"), "file");
    }
}
