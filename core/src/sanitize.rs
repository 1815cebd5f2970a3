//! String hygiene for upstream metadata before it reaches a caller.
//!
//! Upstream titles, names and descriptions are untrusted. Every string that
//! ends up in tool output goes through [`sanitize`] or [`sanitize_with_limit`].

/// Default character budget for a single sanitized field.
pub const DEFAULT_MAX_CHARS: usize = 500;

/// Character budget for descriptions in list summaries.
pub const DESCRIPTION_MAX_CHARS: usize = 100;

const ELLIPSIS: &str = "...";

/// Strip control characters and reserved non-characters, cap at
/// [`DEFAULT_MAX_CHARS`] and trim.
pub fn sanitize(raw: &str) -> String {
    sanitize_with_limit(raw, DEFAULT_MAX_CHARS)
}

/// Like [`sanitize`] with an explicit character budget. The result never
/// exceeds `max_chars` characters and `sanitize_with_limit` is idempotent.
pub fn sanitize_with_limit(raw: &str, max_chars: usize) -> String {
    let kept: String = raw
        .chars()
        .filter(|c| !is_stripped(*c))
        .take(max_chars)
        .collect();
    kept.trim().to_string()
}

/// Sanitize, then cut at `limit` characters with a trailing `...` marker.
pub fn truncate_with_ellipsis(raw: &str, limit: usize) -> String {
    let clean = sanitize(raw);
    if clean.chars().count() > limit {
        let head: String = clean.chars().take(limit).collect();
        format!("{head}{ELLIPSIS}")
    } else {
        clean
    }
}

/// Collapse every whitespace run to a single space.
pub fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Tab, line feed and carriage return survive.
fn is_stripped(c: char) -> bool {
    matches!(
        c,
        '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}' | '\u{7f}' | '\u{fffe}' | '\u{ffff}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const NASTY: &str = "  \u{0}Q3\u{7}\u{1b}[31m Plan\u{fffe}\u{ffff}\t\n\u{7f} ";

    #[test]
    fn strips_controls_and_reserved_code_points() {
        assert_eq!(sanitize(NASTY), "Q3[31m Plan");
        assert!(!sanitize(NASTY).chars().any(is_stripped));
    }

    #[test]
    fn keeps_tabs_and_newlines_inside_text() {
        assert_eq!(sanitize("a\tb\nc\rd"), "a\tb\nc\rd");
    }

    #[test]
    fn sanitize_is_idempotent() {
        for sample in [NASTY, "", "   ", "plain", "ünïcödé ✓", "\u{1}\u{2}x  y \u{3}"] {
            for limit in [0, 1, 3, 10, 500] {
                let once = sanitize_with_limit(sample, limit);
                assert_eq!(sanitize_with_limit(&once, limit), once, "{sample:?} @ {limit}");
            }
        }
    }

    #[test]
    fn respects_character_budget() {
        let long = "é".repeat(1200);
        for limit in [0, 1, 7, 100, 500, 2000] {
            assert!(sanitize_with_limit(&long, limit).chars().count() <= limit);
        }
        assert_eq!(sanitize(&long).chars().count(), DEFAULT_MAX_CHARS);
    }

    #[test]
    fn truncates_long_descriptions_with_ellipsis() {
        let desc = "x".repeat(150);
        let out = truncate_with_ellipsis(&desc, DESCRIPTION_MAX_CHARS);
        assert_eq!(out.len(), DESCRIPTION_MAX_CHARS + 3);
        assert!(out.ends_with("..."));

        assert_eq!(truncate_with_ellipsis("short", DESCRIPTION_MAX_CHARS), "short");
        let exact = "y".repeat(100);
        assert_eq!(truncate_with_ellipsis(&exact, DESCRIPTION_MAX_CHARS), exact);
    }

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(collapse_whitespace("  a \n\n b\t c  "), "a b c");
    }
}
