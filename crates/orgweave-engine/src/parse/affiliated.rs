//! Affiliated-metadata collector: `#+KEY: value` lines bound to the
//! element that follows them.

use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{Affiliated, AffiliatedEntry};
use crate::buffer::{Buffer, Span};

static AFFILIATED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^[ \t]*#\+(CAPTION|DATA|HEADERS?|LABEL|NAME|PLOT|RESNAME|RESULTS?|SOURCE|SRCNAME|TBLNAME|ATTR_[-_A-Za-z0-9]+)(?:\[(.*)\])?:(?:[ \t]+(.*?))?[ \t]*$",
    )
    .unwrap()
});

/// Translate historical aliases and lower-case the key.
pub(crate) fn normalize_key(raw: &str) -> String {
    let lower = raw.to_lowercase();
    match lower.as_str() {
        "data" | "label" | "resname" | "source" | "srcname" | "tblname" => "name".to_owned(),
        "result" => "results".to_owned(),
        "headers" => "header".to_owned(),
        _ => lower,
    }
}

/// Keys that may carry a bracketed secondary value.
pub(crate) fn is_dual(key: &str) -> bool {
    matches!(key, "caption" | "results")
}

/// Keys whose value is parsed as a secondary string.
pub(crate) fn is_parsed(key: &str) -> bool {
    key == "caption"
}

/// Keys that accumulate over repeated lines.
pub(crate) fn is_multi(key: &str) -> bool {
    matches!(key, "caption" | "header") || key.starts_with("attr_")
}

/// Collected affiliated block: entries plus the position right after it.
pub(crate) struct Collected {
    pub affiliated: Affiliated,
    pub post_affiliated: usize,
}

/// Collect consecutive affiliated lines starting at the line at `pos`.
/// Stops at the first non-affiliated line or at `limit`.
pub(crate) fn collect(buf: &Buffer, pos: usize, limit: usize) -> Collected {
    let mut entries = Vec::new();
    let mut cursor = pos;
    while cursor < limit {
        let line = buf.line_str(cursor);
        let Some(caps) = AFFILIATED_RE.captures(&line) else { break };
        let key = normalize_key(&caps[1]);
        let dual = match caps.get(2) {
            Some(m) if is_dual(&key) => Some(m.as_str().to_owned()),
            Some(_) => break, // bracketed value on a non-dual key: keyword
            None => None,
        };
        let (value, value_span) = match caps.get(3) {
            Some(m) => (
                m.as_str().to_owned(),
                Span::new(cursor + m.start(), cursor + m.end()),
            ),
            None => (String::new(), Span::new(buf.line_end_of(cursor), buf.line_end_of(cursor))),
        };
        entries.push(AffiliatedEntry { key, dual, value, value_span });
        cursor = buf.next_line_start(cursor);
    }
    Collected { affiliated: Affiliated { entries }, post_affiliated: cursor }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_and_normalizes() {
        let buf = Buffer::from_str("#+TBLNAME: tbl\n#+RESULT: r\n| a |\n");
        let got = collect(&buf, 0, buf.len());
        assert_eq!(got.post_affiliated, 27);
        assert_eq!(got.affiliated.entries.len(), 2);
        assert_eq!(got.affiliated.entries[0].key, "name");
        assert_eq!(got.affiliated.entries[0].value, "tbl");
        assert_eq!(got.affiliated.entries[1].key, "results");
    }

    #[test]
    fn dual_value_on_caption() {
        let buf = Buffer::from_str("#+CAPTION[short]: long caption\npara\n");
        let got = collect(&buf, 0, buf.len());
        let entry = &got.affiliated.entries[0];
        assert_eq!(entry.key, "caption");
        assert_eq!(entry.dual.as_deref(), Some("short"));
        assert_eq!(entry.value, "long caption");
    }

    #[test]
    fn dual_on_non_dual_key_stops_collection() {
        let buf = Buffer::from_str("#+NAME[x]: v\npara\n");
        let got = collect(&buf, 0, buf.len());
        assert!(got.affiliated.is_empty());
        assert_eq!(got.post_affiliated, 0);
    }

    #[test]
    fn multi_key_accumulates_in_order() {
        let buf = Buffer::from_str("#+HEADER: :a 1\n#+HEADER: :b 2\nx\n");
        let got = collect(&buf, 0, buf.len());
        let values: Vec<&str> = got
            .affiliated
            .all("header")
            .map(|e| e.value.as_str())
            .collect();
        assert_eq!(values, vec![":a 1", ":b 2"]);
    }

    #[test]
    fn attr_keys_kept_with_prefix() {
        let buf = Buffer::from_str("#+ATTR_HTML: :width 40\nx\n");
        let got = collect(&buf, 0, buf.len());
        assert_eq!(got.affiliated.entries[0].key, "attr_html");
        assert!(is_multi("attr_html"));
    }

    #[test]
    fn plain_keyword_is_not_affiliated() {
        let buf = Buffer::from_str("#+TITLE: doc\nx\n");
        let got = collect(&buf, 0, buf.len());
        assert!(got.affiliated.is_empty());
    }

    #[test]
    fn value_span_points_at_value() {
        let buf = Buffer::from_str("#+CAPTION: hello\nx\n");
        let got = collect(&buf, 0, buf.len());
        let span = got.affiliated.entries[0].value_span;
        assert_eq!(&buf.slice(span.start, span.end), "hello");
    }
}
