//! Action marker grammar and scanner
//!
//! A marker is `<!--`, optional ASCII whitespace, a literal keyword, optional
//! ASCII whitespace, `-->`. Markers are found in a single left-to-right pass;
//! matches never overlap and keywords compare case-sensitively. Comments whose
//! body is not a well-formed keyword, and an opening delimiter without a
//! closing one, are skipped silently.

use std::ops::Range;

/// Opening delimiter of an action marker.
pub const MARKER_OPEN: &str = "<!--";

/// Closing delimiter of an action marker.
pub const MARKER_CLOSE: &str = "-->";

/// One marker found in generated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker<'a> {
    /// Keyword between the delimiters, whitespace trimmed.
    pub keyword: &'a str,
    /// Byte range of the whole marker, delimiters included.
    pub span: Range<usize>,
}

/// Whether `keyword` can be written inside a marker and found again verbatim.
pub fn is_valid_keyword(keyword: &str) -> bool {
    !keyword.is_empty()
        && !keyword.chars().any(char::is_whitespace)
        && !keyword.contains(MARKER_OPEN)
        && !keyword.contains(MARKER_CLOSE)
}

/// Canonical marker text for `keyword`, as taught to the AI.
pub fn marker_for(keyword: &str) -> String {
    format!("{} {} {}", MARKER_OPEN, keyword, MARKER_CLOSE)
}

/// Iterator over the markers of a text.
pub struct MarkerScanner<'a> {
    text: &'a str,
    cursor: usize,
}

impl<'a> MarkerScanner<'a> {
    /// Start scanning at the beginning of `text`.
    pub fn new(text: &'a str) -> Self {
        Self { text, cursor: 0 }
    }
}

impl<'a> Iterator for MarkerScanner<'a> {
    type Item = Marker<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let rest = self.text.get(self.cursor..)?;
            let open = self.cursor + rest.find(MARKER_OPEN)?;
            let body_start = open + MARKER_OPEN.len();
            let Some(close_offset) = self.text[body_start..].find(MARKER_CLOSE) else {
                // Unterminated comment: nothing after it can be a marker.
                self.cursor = self.text.len();
                return None;
            };
            let close = body_start + close_offset;
            let end = close + MARKER_CLOSE.len();
            self.cursor = end;

            let keyword = self.text[body_start..close].trim_matches(|c: char| c.is_ascii_whitespace());
            if is_valid_keyword(keyword) {
                return Some(Marker {
                    keyword,
                    span: open..end,
                });
            }
        }
    }
}

/// Collect every marker in `text`, left to right.
pub fn scan_markers(text: &str) -> Vec<Marker<'_>> {
    MarkerScanner::new(text).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords(text: &str) -> Vec<&str> {
        scan_markers(text).into_iter().map(|m| m.keyword).collect()
    }

    #[test]
    fn finds_markers_inside_prose() {
        let text = "You use up some gas while driving<!-- decrementFuel -->.";
        let markers = scan_markers(text);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].keyword, "decrementFuel");
        assert_eq!(&text[markers[0].span.clone()], "<!-- decrementFuel -->");
    }

    #[test]
    fn whitespace_around_keyword_is_optional() {
        assert_eq!(keywords("<!--increment-->"), vec!["increment"]);
        assert_eq!(keywords("<!--\tincrement \n-->"), vec!["increment"]);
    }

    #[test]
    fn keeps_order_and_duplicates() {
        assert_eq!(
            keywords("a <!-- up --> b <!-- down --> c <!-- up -->"),
            vec!["up", "down", "up"]
        );
    }

    #[test]
    fn skips_malformed_comments() {
        assert!(keywords("<!-- -->").is_empty());
        assert!(keywords("<!-- two words -->").is_empty());
        assert!(keywords("<!-- increment").is_empty());
        assert!(keywords("increment -->").is_empty());
        assert_eq!(keywords("<!-- note: hi there --> <!-- up -->"), vec!["up"]);
    }

    #[test]
    fn matches_do_not_overlap() {
        // The first comment swallows the inner opener.
        assert_eq!(keywords("<!-- <!-- up -->"), Vec::<&str>::new());
        assert_eq!(keywords("<!--up--><!--down-->"), vec!["up", "down"]);
    }

    #[test]
    fn case_is_significant() {
        let markers = keywords("<!-- Increment -->");
        assert_eq!(markers, vec!["Increment"]);
        assert_ne!(markers[0], "increment");
    }

    #[test]
    fn canonical_marker_round_trips() {
        let text = marker_for("increment");
        assert_eq!(text, "<!-- increment -->");
        assert_eq!(keywords(&text), vec!["increment"]);
        assert!(!is_valid_keyword("a-->b"));
        assert!(!is_valid_keyword(""));
    }
}
