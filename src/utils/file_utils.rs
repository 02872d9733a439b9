//! File name utilities

use std::path::Path;

/// Fallback name used when sanitization leaves nothing usable
pub const FALLBACK_FILENAME: &str = "downloaded_file";

/// Maximum length of a sanitized filename, extension included
pub const MAX_FILENAME_LEN: usize = 150;

/// Get file extension
pub fn get_file_extension(filename: &str) -> Option<&str> {
    Path::new(filename).extension().and_then(|ext| ext.to_str())
}

/// Sanitize a filename for the filesystem.
///
/// Replaces characters that are illegal on common filesystems with `_`,
/// collapses runs of dots, trims surrounding whitespace and dots, falls back
/// to [`FALLBACK_FILENAME`] when nothing remains, and truncates to
/// [`MAX_FILENAME_LEN`] characters while keeping the extension intact.
/// Pure and idempotent.
pub fn sanitize_filename(filename: &str) -> String {
    let replaced: String = filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    // Collapse consecutive dots into one
    let mut collapsed = String::with_capacity(replaced.len());
    let mut prev_dot = false;
    for c in replaced.chars() {
        if c == '.' {
            if !prev_dot {
                collapsed.push(c);
            }
            prev_dot = true;
        } else {
            collapsed.push(c);
            prev_dot = false;
        }
    }

    // Trim dots and whitespace together so interleaved runs cannot survive
    let trimmed = collapsed.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if trimmed.is_empty() {
        return FALLBACK_FILENAME.to_string();
    }

    let char_count = trimmed.chars().count();
    if char_count <= MAX_FILENAME_LEN {
        return trimmed.to_string();
    }

    // Truncate the stem, keep the extension
    let truncated = match trimmed.rfind('.') {
        Some(dot_pos) if dot_pos > 0 => {
            let ext = &trimmed[dot_pos..];
            let ext_len = ext.chars().count();
            if ext_len >= MAX_FILENAME_LEN {
                trimmed.chars().take(MAX_FILENAME_LEN).collect::<String>()
            } else {
                let stem_keep = MAX_FILENAME_LEN - ext_len;
                let stem: String = trimmed[..dot_pos].chars().take(stem_keep).collect();
                // The cut may land on a dot; re-appending the extension
                // would then produce consecutive dots
                format!("{}{}", stem.trim_end_matches('.'), ext)
            }
        }
        _ => trimmed.chars().take(MAX_FILENAME_LEN).collect::<String>(),
    };

    // Truncation may land on a dot boundary
    let truncated = truncated.trim_end_matches('.');
    if truncated.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        truncated.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaces_illegal_characters() {
        assert_eq!(
            sanitize_filename(r#"a\b/c*d?e:f"g<h>i|j"#),
            "a_b_c_d_e_f_g_h_i_j"
        );
    }

    #[test]
    fn test_collapses_dots_and_trims() {
        assert_eq!(sanitize_filename("..video...mp4.."), "video.mp4");
        assert_eq!(sanitize_filename("  report.pdf  "), "report.pdf");
    }

    #[test]
    fn test_empty_input_falls_back() {
        assert_eq!(sanitize_filename(""), FALLBACK_FILENAME);
        assert_eq!(sanitize_filename(" ... "), FALLBACK_FILENAME);
        assert_eq!(sanitize_filename("???"), "___");
    }

    #[test]
    fn test_interleaved_dots_and_spaces_trimmed_fully() {
        assert_eq!(sanitize_filename(". . ."), FALLBACK_FILENAME);
        assert_eq!(sanitize_filename(" . clip.mp4 . "), "clip.mp4");
    }

    #[test]
    fn test_truncation_preserves_extension() {
        let long = format!("{}.mp4", "a".repeat(300));
        let out = sanitize_filename(&long);
        assert!(out.ends_with(".mp4"));
        assert!(out.chars().count() <= MAX_FILENAME_LEN);
    }

    #[test]
    fn test_truncation_never_creates_consecutive_dots() {
        // The stem cut lands exactly on a dot here
        let long = format!("{}{}{}", "x".repeat(146), ".y".repeat(30), ".gz");
        let out = sanitize_filename(&long);
        assert!(!out.contains(".."), "consecutive dots in {out:?}");
        assert!(out.ends_with(".gz"));
        assert!(out.chars().count() <= MAX_FILENAME_LEN);
        assert_eq!(sanitize_filename(&out), out);
    }

    #[test]
    fn test_truncation_without_extension() {
        let long = "b".repeat(400);
        let out = sanitize_filename(&long);
        assert_eq!(out.chars().count(), MAX_FILENAME_LEN);
    }

    #[test]
    fn test_idempotent() {
        let long_name = format!("{}.tar.gz", "x".repeat(500));
        let inputs = [
            "",
            "normal.mp4",
            r#"we?ird:"name".webm"#,
            "...dots...everywhere...",
            ". . .",
            long_name.as_str(),
        ];
        for input in inputs {
            let once = sanitize_filename(input);
            assert_eq!(
                sanitize_filename(&once),
                once,
                "not idempotent for {input:?}"
            );
        }
    }

    #[test]
    fn test_output_never_contains_illegal_characters() {
        let inputs = ["a/b", r"c\d", "e*f?g", "h:i\"j<k>l|m", "\u{7}bell.mp3"];
        for input in inputs {
            let out = sanitize_filename(input);
            assert!(!out.is_empty());
            assert!(
                !out.contains(|c| "\\/*?:\"<>|".contains(c)),
                "bad output {out:?}"
            );
        }
    }
}
