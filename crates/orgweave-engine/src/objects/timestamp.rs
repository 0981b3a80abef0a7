//! Timestamp recognizer: `<2024-01-02 Tue>`, `[2024-01-02 Tue 10:00]`,
//! ranges, repeaters and warning periods, plus diary sexp stamps.

use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{
    Datetime, Node, NodeData, Repeater, RepeaterMark, TimeUnit, Timestamp, TimestampKind, Warning,
    WarningMark,
};
use crate::buffer::Span;

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2})(?:[ \t]+([^-+0-9>\]\s]+))?").unwrap()
});
static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2}):(\d{2})(?:-(\d{1,2}):(\d{2}))?").unwrap());
static REPEATER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\+\+|\.\+|\+)(\d+)([hdwmy])").unwrap());
static WARNING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(--|-)(\d+)([hdwmy])").unwrap());

fn unit_of(ch: &str) -> TimeUnit {
    match ch {
        "h" => TimeUnit::Hour,
        "d" => TimeUnit::Day,
        "w" => TimeUnit::Week,
        "m" => TimeUnit::Month,
        _ => TimeUnit::Year,
    }
}

struct StampPart {
    date: Datetime,
    time_end: Option<(u32, u32)>,
    repeater: Option<Repeater>,
    warning: Option<Warning>,
    len: usize,
}

/// Parse the bracket interior starting after `<` or `[`, up to but not
/// including the closing bracket. Returns the consumed length.
fn parse_interior(s: &str, close: char) -> Option<StampPart> {
    let caps = DATE_RE.captures(s)?;
    let mut date = Datetime {
        year: caps[1].parse().ok()?,
        month: caps[2].parse().ok()?,
        day: caps[3].parse().ok()?,
        dayname: caps.get(4).map(|m| m.as_str().to_owned()),
        hour: None,
        minute: None,
    };
    let mut i = caps.get(0).map_or(0, |m| m.end());

    let mut time_end = None;
    let mut repeater = None;
    let mut warning = None;
    loop {
        let rest = &s[i..];
        let trimmed = rest.trim_start_matches([' ', '\t']);
        let skipped = rest.len() - trimmed.len();
        if trimmed.is_empty() || trimmed.starts_with(close) {
            i += skipped;
            break;
        }
        if date.hour.is_none()
            && let Some(c) = TIME_RE.captures(trimmed)
        {
            date.hour = Some(c[1].parse().ok()?);
            date.minute = Some(c[2].parse().ok()?);
            if let (Some(h), Some(m)) = (c.get(3), c.get(4)) {
                time_end = Some((h.as_str().parse().ok()?, m.as_str().parse().ok()?));
            }
            i += skipped + c.get(0).map_or(0, |m| m.end());
            continue;
        }
        if repeater.is_none()
            && let Some(c) = REPEATER_RE.captures(trimmed)
        {
            repeater = Some(Repeater {
                mark: match &c[1] {
                    "++" => RepeaterMark::CatchUp,
                    ".+" => RepeaterMark::Restart,
                    _ => RepeaterMark::Cumulate,
                },
                value: c[2].parse().ok()?,
                unit: unit_of(&c[3]),
            });
            i += skipped + c.get(0).map_or(0, |m| m.end());
            continue;
        }
        if warning.is_none()
            && let Some(c) = WARNING_RE.captures(trimmed)
        {
            warning = Some(Warning {
                mark: if &c[1] == "--" { WarningMark::First } else { WarningMark::All },
                value: c[2].parse().ok()?,
                unit: unit_of(&c[3]),
            });
            i += skipped + c.get(0).map_or(0, |m| m.end());
            continue;
        }
        // Unrecognized token before the closing bracket.
        return None;
    }
    Some(StampPart { date, time_end, repeater, warning, len: i })
}

/// Try to parse a timestamp at the start of `s`; `abs` is the absolute
/// buffer position of `s[0]`. Returns the timestamp and consumed length.
pub(crate) fn parse_timestamp(s: &str, abs: usize) -> Option<(Timestamp, usize)> {
    let open = s.chars().next()?;
    let (close, active) = match open {
        '<' => ('>', true),
        '[' => (']', false),
        _ => return None,
    };

    // Diary sexp stamp: `<%%(...)>`.
    if active && s.starts_with("<%%(") {
        let line = s.split('\n').next().unwrap_or("");
        let end = line.find(")>").map(|i| i + 2)?;
        let ts = Timestamp {
            kind: TimestampKind::Diary,
            raw_value: s[..end].to_owned(),
            date_start: None,
            date_end: None,
            repeater: None,
            warning: None,
            span: Span::new(abs, abs + end),
        };
        return Some((ts, end));
    }

    let first = parse_interior(&s[1..], close)?;
    let mut i = 1 + first.len;
    if !s[i..].starts_with(close) {
        return None;
    }
    i += 1;

    let mut date_end = first.date.clone();
    let mut ranged = first.time_end.is_some();
    if let Some((h, m)) = first.time_end {
        date_end.hour = Some(h);
        date_end.minute = Some(m);
    }

    // Double-stamp range: `<...>--<...>`.
    if s[i..].starts_with("--")
        && s[i + 2..].starts_with(open)
        && let Some(second) = parse_interior(&s[i + 3..], close)
    {
        let j = i + 3 + second.len;
        if s[j..].starts_with(close) {
            date_end = second.date;
            ranged = true;
            i = j + 1;
        }
    }

    let kind = match (active, ranged) {
        (true, false) => TimestampKind::Active,
        (true, true) => TimestampKind::ActiveRange,
        (false, false) => TimestampKind::Inactive,
        (false, true) => TimestampKind::InactiveRange,
    };
    let ts = Timestamp {
        kind,
        raw_value: s[..i].to_owned(),
        date_start: Some(first.date),
        date_end: Some(date_end),
        repeater: first.repeater,
        warning: first.warning,
        span: Span::new(abs, abs + i),
    };
    Some((ts, i))
}

/// Object-lexer entry: a timestamp node.
pub(crate) fn timestamp(s: &str, pos: usize, base: usize) -> Option<Node> {
    let (ts, len) = parse_timestamp(&s[pos..], base + pos)?;
    Some(Node::new(NodeData::Timestamp(ts), base + pos, base + pos + len))
}
