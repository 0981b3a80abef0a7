//! Headlines, inline tasks and sections.

use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{Headline, Node, NodeData, TodoType};
use crate::buffer::{Buffer, Span};
use crate::parse::elements::planning::planning_slots;
use crate::syntax::{Syntax, heading_stars};

static PRIORITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[#([A-Za-z0-9])\][ \t]*").unwrap());
static TAGS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+(:(?:[A-Za-z0-9_@#%]+:)+)[ \t]*$").unwrap());

struct TitleLine {
    stars: usize,
    payload: Headline,
}

fn parse_title_line(buf: &Buffer, syntax: &Syntax, pos: usize) -> Option<TitleLine> {
    let line = buf.line_str(pos);
    let stars = heading_stars(&line)?;
    let bytes = line.as_bytes();
    let mut i = stars;
    while i < line.len() && matches!(bytes[i], b' ' | b'\t') {
        i += 1;
    }

    let mut todo_keyword = None;
    let mut todo_type = None;
    if let Some(caps) = syntax.todo_re().captures(&line[i..]) {
        let kw = caps[1].to_owned();
        todo_type = Some(if syntax.is_done_keyword(&kw) { TodoType::Done } else { TodoType::Todo });
        i += caps.get(1).map_or(0, |m| m.end());
        while i < line.len() && matches!(bytes[i], b' ' | b'\t') {
            i += 1;
        }
        todo_keyword = Some(kw);
    }

    let mut priority = None;
    if let Some(caps) = PRIORITY_RE.captures(&line[i..]) {
        priority = caps[1].chars().next();
        i += caps.get(0).map_or(0, |m| m.end());
    }

    let mut commented = false;
    if let Some(rest) = line[i..].strip_prefix("COMMENT")
        && (rest.is_empty() || rest.starts_with([' ', '\t']))
    {
        commented = true;
        i += "COMMENT".len();
        while i < line.len() && matches!(bytes[i], b' ' | b'\t') {
            i += 1;
        }
    }

    let remainder = &line[i..];
    let (title_text, tags) = match TAGS_RE.captures(remainder) {
        Some(caps) => {
            let m = caps.get(0).unwrap();
            let tags = caps[1]
                .split(':')
                .filter(|t| !t.is_empty())
                .map(str::to_owned)
                .collect::<Vec<_>>();
            (&remainder[..m.start()], tags)
        }
        None => (remainder, Vec::new()),
    };
    let raw_value = title_text.trim_end().to_owned();
    let title_span = (!raw_value.is_empty())
        .then(|| Span::new(pos + i, pos + i + raw_value.len()));

    let archived = tags.iter().any(|t| t == syntax.archive_tag());
    let footnote_section = raw_value == syntax.footnote_section();
    Some(TitleLine {
        stars,
        payload: Headline {
            level: stars,
            todo_keyword,
            todo_type,
            priority,
            commented,
            archived,
            footnote_section,
            raw_value,
            title_span,
            title: Vec::new(),
            tags,
            scheduled: None,
            deadline: None,
            closed: None,
        },
    })
}

/// Walk blank lines backwards from `from` (a line start or limit), bounded
/// below by `floor`. Returns the position before them and their count.
fn trailing_blanks(buf: &Buffer, from: usize, floor: usize) -> (usize, usize) {
    let mut pos = from;
    let mut count = 0;
    while pos > floor {
        let line_start = buf.line_start_of(pos.saturating_sub(1));
        if line_start < floor || !buf.is_blank_line(line_start) {
            break;
        }
        pos = line_start;
        count += 1;
    }
    (pos, count)
}

/// A regular headline: the node spans the whole subtree.
pub(crate) fn headline(buf: &Buffer, syntax: &Syntax, pos: usize, limit: usize) -> Option<Node> {
    let title = parse_title_line(buf, syntax, pos)?;
    if !syntax.headline_level_ok(title.stars) {
        return None;
    }
    let level = title.stars;
    let mut payload = title.payload;

    // Subtree ends at the next heading of the same or a shallower level.
    let mut cur = buf.next_line_start(pos);
    let mut end = limit;
    while cur < limit {
        if let Some(stars) = heading_stars(&buf.line_str(cur))
            && syntax.headline_level_ok(stars)
            && stars <= level
        {
            end = cur;
            break;
        }
        cur = buf.next_line_start(cur);
    }

    let body_begin = buf.next_line_start(pos).min(end);
    let (contents_end, post_blank) = trailing_blanks(buf, end, body_begin);

    if body_begin < contents_end {
        let line = buf.line_str(body_begin);
        if syntax.planning_line_re().is_match(&line) {
            let (scheduled, deadline, closed) = planning_slots(&line, body_begin);
            payload.scheduled = scheduled;
            payload.deadline = deadline;
            payload.closed = closed;
        }
    }

    let mut node = Node::new(NodeData::Headline(payload), pos, end);
    node.post_blank = post_blank;
    if body_begin < contents_end {
        node.contents_begin = Some(body_begin);
        node.contents_end = Some(contents_end);
    }
    Some(node)
}

/// An inline task: a heading at or beyond the configured star bound,
/// optionally closed by an `END` line of the same depth.
pub(crate) fn inlinetask(buf: &Buffer, syntax: &Syntax, pos: usize, limit: usize) -> Option<Node> {
    let title = parse_title_line(buf, syntax, pos)?;
    if syntax.headline_level_ok(title.stars) {
        return None;
    }
    let payload = title.payload;

    let mut end_line = None;
    let mut cur = buf.next_line_start(pos);
    while cur < limit {
        let line = buf.line_str(cur);
        if let Some(stars) = heading_stars(&line) {
            if !syntax.headline_level_ok(stars) && line[stars..].trim() == "END" {
                end_line = Some(cur);
            }
            break;
        }
        cur = buf.next_line_start(cur);
    }

    let after = match end_line {
        Some(l) => buf.next_line_start(l),
        None => buf.next_line_start(pos),
    };
    let (end, post_blank) = buf.skip_blank_lines(after, limit);
    let mut node = Node::new(NodeData::Inlinetask(payload), pos, end);
    node.post_blank = post_blank;
    if let Some(l) = end_line {
        let cb = buf.next_line_start(pos);
        if cb < l {
            node.contents_begin = Some(cb);
            node.contents_end = Some(l);
        }
    }
    Some(node)
}

/// A section: everything up to the next true headline.
pub(crate) fn section(buf: &Buffer, syntax: &Syntax, pos: usize, limit: usize) -> Node {
    let mut cur = pos;
    let mut end = limit;
    while cur < limit {
        if let Some(stars) = heading_stars(&buf.line_str(cur))
            && syntax.headline_level_ok(stars)
        {
            end = cur;
            break;
        }
        cur = buf.next_line_start(cur);
    }
    let (contents_end, post_blank) = trailing_blanks(buf, end, pos);
    let mut node = Node::new(NodeData::Section, pos, end);
    node.post_blank = post_blank;
    if contents_end > pos {
        node.contents_begin = Some(pos);
        node.contents_end = Some(contents_end);
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;

    fn syntax() -> Syntax {
        Syntax::default()
    }

    #[test]
    fn full_title_line() {
        let buf = Buffer::from_str("** TODO [#A] COMMENT Fix the bug :work:urgent:\n");
        let node = headline(&buf, &syntax(), 0, buf.len()).unwrap();
        let NodeData::Headline(h) = &node.data else { panic!() };
        assert_eq!(h.level, 2);
        assert_eq!(h.todo_keyword.as_deref(), Some("TODO"));
        assert_eq!(h.todo_type, Some(TodoType::Todo));
        assert_eq!(h.priority, Some('A'));
        assert!(h.commented);
        assert_eq!(h.raw_value, "Fix the bug");
        assert_eq!(h.tags, vec!["work", "urgent"]);
        let span = h.title_span.unwrap();
        assert_eq!(&buf.slice(span.start, span.end), "Fix the bug");
    }

    #[test]
    fn done_keyword_type() {
        let buf = Buffer::from_str("* DONE Task\n");
        let node = headline(&buf, &syntax(), 0, buf.len()).unwrap();
        let NodeData::Headline(h) = &node.data else { panic!() };
        assert_eq!(h.todo_type, Some(TodoType::Done));
    }

    #[test]
    fn subtree_extent() {
        let buf = Buffer::from_str("* A\ntext\n** B\nmore\n* C\n");
        let node = headline(&buf, &syntax(), 0, buf.len()).unwrap();
        // Ends where the sibling `* C` starts.
        assert_eq!(node.end, 19);
        assert_eq!(node.contents_begin, Some(4));
        assert_eq!(node.contents_end, Some(19));
    }

    #[test]
    fn trailing_blanks_are_post_blank() {
        let buf = Buffer::from_str("* A\ntext\n\n\n* B\n");
        let node = headline(&buf, &syntax(), 0, buf.len()).unwrap();
        assert_eq!(node.end, 11);
        assert_eq!(node.post_blank, 2);
        assert_eq!(node.contents_end, Some(9));
    }

    #[test]
    fn planning_copied_to_headline() {
        let buf = Buffer::from_str("* TODO Task :work:\nSCHEDULED: <2024-01-02 Tue>\n");
        let node = headline(&buf, &syntax(), 0, buf.len()).unwrap();
        let NodeData::Headline(h) = &node.data else { panic!() };
        let ts = h.scheduled.as_ref().unwrap();
        assert_eq!(ts.date_start.as_ref().unwrap().day, 2);
        assert!(h.deadline.is_none());
    }

    #[test]
    fn archive_and_footnote_flags() {
        let buf = Buffer::from_str("* Old :ARCHIVE:\n");
        let node = headline(&buf, &syntax(), 0, buf.len()).unwrap();
        let NodeData::Headline(h) = &node.data else { panic!() };
        assert!(h.archived);

        let buf = Buffer::from_str("* Footnotes\n");
        let node = headline(&buf, &syntax(), 0, buf.len()).unwrap();
        let NodeData::Headline(h) = &node.data else { panic!() };
        assert!(h.footnote_section);
    }

    #[test]
    fn deep_stars_are_not_a_headline() {
        let line = format!("{} Inline\n", "*".repeat(15));
        let buf = Buffer::from_str(&line);
        assert!(headline(&buf, &syntax(), 0, buf.len()).is_none());
        assert!(inlinetask(&buf, &syntax(), 0, buf.len()).is_some());
    }

    #[test]
    fn inlinetask_with_end() {
        let stars = "*".repeat(15);
        let text = format!("{stars} Task\nbody\n{stars} END\nafter\n");
        let buf = Buffer::from_str(&text);
        let node = inlinetask(&buf, &syntax(), 0, buf.len()).unwrap();
        assert_eq!(node.kind(), NodeKind::Inlinetask);
        assert_eq!(node.contents_begin, Some(21));
        assert_eq!(node.contents_end, Some(26));
        assert_eq!(node.end, 46);
    }

    #[test]
    fn degenerate_inlinetask() {
        let stars = "*".repeat(15);
        let text = format!("{stars} Quick note\nplain text\n");
        let buf = Buffer::from_str(&text);
        let node = inlinetask(&buf, &syntax(), 0, buf.len()).unwrap();
        assert!(node.contents_begin.is_none());
        assert_eq!(node.end, 27);
    }

    #[test]
    fn section_stops_at_headline_not_inlinetask() {
        let stars = "*".repeat(15);
        let text = format!("para\n{stars} T\n{stars} END\n* Head\n");
        let buf = Buffer::from_str(&text);
        let node = section(&buf, &syntax(), 0, buf.len());
        assert_eq!(node.kind(), NodeKind::Section);
        // Ends at `* Head`, not at the inline task stars.
        assert_eq!(node.end, text.len() - 7);
    }
}
