//! Filename derivation and content-type resolution for fetched artifacts

use crate::types::FormatSelection;

/// Maximum length of a derived filename stem, in characters
pub const MAX_STEM_LEN: usize = 50;

/// Derive a filesystem-safe filename stem from a resolved title
///
/// Every character outside `[A-Za-z0-9]` is replaced with `_` and the result
/// is truncated to [`MAX_STEM_LEN`] characters.
///
/// # Examples
///
/// ```
/// use media_dl::naming::sanitize_stem;
///
/// assert_eq!(sanitize_stem("My Clip!"), "My_Clip_");
/// assert_eq!(sanitize_stem("Ünïcøde"), "_n_c_de");
/// ```
#[must_use]
pub fn sanitize_stem(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(MAX_STEM_LEN)
        .collect()
}

/// Resolve the content type for a file extension
///
/// Unknown extensions default to `video/mp4`.
#[must_use]
pub fn content_type_for(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "mp3" | "m4a" => "audio/mpeg",
        "webm" => "video/webm",
        _ => "video/mp4",
    }
}

/// Decide the planned output extension and content type before the fetch
/// process runs
///
/// The decision table mirrors what the external tool will actually produce:
/// audio-only extraction always yields mp3, image extensions are kept, audio
/// containers normalize to mp3, everything else is merged into mp4. The
/// downloaded file is still authoritative: after the process exits the real
/// extension is re-read from disk and the content type recomputed via
/// [`content_type_for`].
#[must_use]
pub fn plan_output(metadata_ext: Option<&str>, format: &FormatSelection) -> (String, &'static str) {
    if matches!(format, FormatSelection::AudioOnly) {
        return ("mp3".to_string(), "audio/mpeg");
    }

    let ext = metadata_ext.unwrap_or("mp4").to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" | "png" | "webp" | "gif" => {
            let content_type = content_type_for(&ext);
            (ext, content_type)
        }
        "mp3" | "m4a" => ("mp3".to_string(), "audio/mpeg"),
        _ => ("mp4".to_string(), "video/mp4"),
    }
}

/// Join a sanitized stem and an extension into the client-facing filename
#[must_use]
pub fn display_filename(stem: &str, ext: &str) -> String {
    format!("{stem}.{ext}")
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    // --- sanitize_stem ---

    #[test]
    fn sanitize_replaces_punctuation_and_spaces() {
        assert_eq!(sanitize_stem("My Clip!"), "My_Clip_");
        assert_eq!(sanitize_stem("a/b\\c:d"), "a_b_c_d");
    }

    #[test]
    fn sanitize_keeps_ascii_alphanumerics_untouched() {
        assert_eq!(sanitize_stem("Video123"), "Video123");
    }

    #[test]
    fn sanitize_truncates_to_fifty_characters() {
        let long = "x".repeat(120);
        assert_eq!(sanitize_stem(&long).len(), MAX_STEM_LEN);
    }

    #[test]
    fn sanitize_replaces_non_ascii() {
        // Each non-ASCII scalar becomes a single underscore
        assert_eq!(sanitize_stem("日本語"), "___");
    }

    #[test]
    fn sanitize_of_empty_title_is_empty() {
        assert_eq!(sanitize_stem(""), "");
    }

    // --- content_type_for ---

    #[test]
    fn content_type_table_matches_fixed_mapping() {
        let cases = [
            ("jpg", "image/jpeg"),
            ("jpeg", "image/jpeg"),
            ("png", "image/png"),
            ("webp", "image/webp"),
            ("gif", "image/gif"),
            ("mp3", "audio/mpeg"),
            ("m4a", "audio/mpeg"),
            ("mp4", "video/mp4"),
            ("webm", "video/webm"),
        ];
        for (ext, expected) in cases {
            assert_eq!(content_type_for(ext), expected, "extension {ext}");
        }
    }

    #[test]
    fn content_type_is_case_insensitive() {
        assert_eq!(content_type_for("JPG"), "image/jpeg");
        assert_eq!(content_type_for("WebM"), "video/webm");
    }

    #[test]
    fn unknown_extensions_default_to_mp4() {
        assert_eq!(content_type_for("mkv"), "video/mp4");
        assert_eq!(content_type_for(""), "video/mp4");
    }

    // --- plan_output ---

    #[test]
    fn audio_only_wins_regardless_of_resolved_extension() {
        for ext in [Some("mp4"), Some("webm"), Some("jpg"), None] {
            let (planned, content_type) = plan_output(ext, &FormatSelection::AudioOnly);
            assert_eq!(planned, "mp3", "resolved ext {ext:?}");
            assert_eq!(content_type, "audio/mpeg");
        }
    }

    #[test]
    fn image_extensions_are_preserved() {
        let (planned, content_type) = plan_output(Some("png"), &FormatSelection::Best);
        assert_eq!(planned, "png");
        assert_eq!(content_type, "image/png");
    }

    #[test]
    fn audio_containers_normalize_to_mp3() {
        let (planned, content_type) = plan_output(Some("m4a"), &FormatSelection::Best);
        assert_eq!(planned, "mp3");
        assert_eq!(content_type, "audio/mpeg");
    }

    #[test]
    fn everything_else_plans_mp4() {
        for ext in [Some("mkv"), Some("flv"), Some("webm"), None] {
            let (planned, content_type) = plan_output(ext, &FormatSelection::CapHeight(720));
            assert_eq!(planned, "mp4", "resolved ext {ext:?}");
            assert_eq!(content_type, "video/mp4");
        }
    }

    // --- display_filename ---

    #[test]
    fn display_filename_joins_stem_and_extension() {
        assert_eq!(display_filename("My_Clip_", "mp4"), "My_Clip_.mp4");
    }
}
