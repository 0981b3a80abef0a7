//! Plain lists, items and the list-structure scanner.
//!
//! The scanner walks the whole list region once and records every item at
//! every indentation; the plain-list and item recognizers then read from
//! that structure. A list ends at two consecutive blank lines, at a
//! non-item line indented at or left of the list, or at the limit.

use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{
    Affiliated, Checkbox, Item, ListItemRecord, ListType, Node, NodeData, PlainList,
};
use crate::buffer::{Buffer, Span};
use crate::parse::elements::finish_element;
use crate::syntax::{ITEM_BULLET_RE, Syntax};

static COUNTER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\[@(\d+)\][ \t]*").unwrap());
static CHECKBOX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([ Xx-])\](?:[ \t]+|$)").unwrap());

fn indent_width(line: &str, tab: usize) -> usize {
    let mut col = 0;
    for ch in line.chars() {
        match ch {
            ' ' => col += 1,
            '\t' => col = (col / tab + 1) * tab,
            _ => break,
        }
    }
    col
}

/// Byte length of the leading whitespace.
fn indent_len(line: &str) -> usize {
    line.len() - line.trim_start_matches([' ', '\t']).len()
}

pub(crate) struct ItemLine<'a> {
    indent: usize,
    bullet: &'a str,
    after_bullet: usize,
}

/// Match an item bullet at the start of `line`. A `*` bullet must be
/// indented, otherwise the line is a heading.
pub(crate) fn item_line<'a>(line: &'a str, syntax: &Syntax) -> Option<ItemLine<'a>> {
    let caps = ITEM_BULLET_RE.captures(line)?;
    let indent_str = caps.get(1).map_or("", |m| m.as_str());
    let bullet = caps.get(2).map_or("", |m| m.as_str());
    if bullet == "*" && indent_str.is_empty() {
        return None;
    }
    let bullet_end = caps.get(2).map_or(0, |m| m.end());
    let after_bullet = bullet_end + line[bullet_end..].len() - line[bullet_end..].trim_start_matches([' ', '\t']).len();
    Some(ItemLine {
        indent: indent_width(line, syntax.tab_width()),
        bullet: &line[indent_str.len()..bullet_end],
        after_bullet,
    })
}

/// Parse counter, checkbox and description tag after the bullet. Returns
/// the record head fields plus the contents offset within the line.
fn parse_item_head(
    line: &str,
    line_start: usize,
    head: &ItemLine,
) -> (Option<u64>, Option<Checkbox>, Option<Span>, usize) {
    let mut i = head.after_bullet;
    let mut counter = None;
    if let Some(caps) = COUNTER_RE.captures(&line[i..]) {
        counter = caps[1].parse().ok();
        i += caps.get(0).map_or(0, |m| m.end());
    }
    let mut checkbox = None;
    if let Some(caps) = CHECKBOX_RE.captures(&line[i..]) {
        checkbox = Some(match &caps[1] {
            "X" | "x" => Checkbox::On,
            "-" => Checkbox::Trans,
            _ => Checkbox::Off,
        });
        i += caps.get(0).map_or(0, |m| m.end());
    }
    let mut tag_span = None;
    if !head.bullet.as_bytes()[0].is_ascii_digit()
        && let Some(sep) = line[i..].find(" :: ")
    {
        let tag_text = line[i..i + sep].trim_end();
        if !tag_text.is_empty() {
            tag_span = Some(Span::new(line_start + i, line_start + i + tag_text.len()));
        }
        i += sep + 4;
    }
    (counter, checkbox, tag_span, i)
}

/// Scan the list starting at `pos`. Returns the item records and the
/// position right after the last item's content (before any terminating
/// blank lines).
pub(crate) fn scan_list(
    buf: &Buffer,
    syntax: &Syntax,
    pos: usize,
    limit: usize,
) -> (Vec<ListItemRecord>, usize) {
    let mut records: Vec<ListItemRecord> = Vec::new();
    let mut open: Vec<usize> = Vec::new();
    let base_indent = item_line(&buf.line_str(pos), syntax).map_or(0, |h| h.indent);

    let mut cur = pos;
    let mut pending_blank: Option<usize> = None;
    let mut blank_count = 0usize;
    let mut term = limit;
    while cur < limit {
        let line = buf.line_str(cur);
        if line.trim().is_empty() {
            if pending_blank.is_none() {
                pending_blank = Some(cur);
            }
            blank_count += 1;
            if blank_count >= 2 {
                term = pending_blank.unwrap_or(cur);
                for idx in open.drain(..) {
                    records[idx].end = term;
                }
                break;
            }
            cur = buf.next_line_start(cur);
            continue;
        }

        if let Some(head) = item_line(&line, syntax) {
            if head.indent < base_indent {
                term = pending_blank.unwrap_or(cur);
                for idx in open.drain(..) {
                    records[idx].end = term;
                }
                break;
            }
            // A sibling or outer item closes deeper ones at its own start;
            // intervening blanks belong to the closed items.
            while let Some(&top) = open.last() {
                if records[top].indent >= head.indent {
                    records[top].end = cur;
                    open.pop();
                } else {
                    break;
                }
            }
            let (counter, checkbox, tag_span, contents_off) =
                parse_item_head(&line, cur, &head);
            records.push(ListItemRecord {
                begin: cur,
                indent: head.indent,
                bullet: head.bullet.to_owned(),
                counter,
                checkbox,
                tag_span,
                contents_begin: cur + contents_off,
                end: limit,
            });
            open.push(records.len() - 1);
        } else {
            let width = indent_width(&line, syntax.tab_width());
            while let Some(&top) = open.last() {
                if records[top].indent >= width {
                    records[top].end = pending_blank.unwrap_or(cur);
                    open.pop();
                } else {
                    break;
                }
            }
            if open.is_empty() {
                term = pending_blank.unwrap_or(cur);
                break;
            }
        }
        pending_blank = None;
        blank_count = 0;
        cur = buf.next_line_start(cur);
    }
    if cur >= limit && !open.is_empty() {
        term = pending_blank.unwrap_or(limit);
        for idx in open.drain(..) {
            records[idx].end = term;
        }
    }
    (records, term)
}

fn list_type_of(records: &[ListItemRecord], base: usize) -> ListType {
    let base_records = records.iter().filter(|r| r.indent == base);
    let mut ordered = false;
    let mut descriptive = false;
    for r in base_records {
        if r.bullet.as_bytes()[0].is_ascii_digit() {
            ordered = true;
        }
        if r.tag_span.is_some() {
            descriptive = true;
        }
    }
    if descriptive {
        ListType::Descriptive
    } else if ordered {
        ListType::Ordered
    } else {
        ListType::Unordered
    }
}

/// The plain list starting at `pos`. `structure` is reused when the caller
/// already scanned it.
pub(crate) fn plain_list(
    buf: &Buffer,
    syntax: &Syntax,
    begin: usize,
    pos: usize,
    limit: usize,
    affiliated: Option<Box<Affiliated>>,
    structure: Option<&[ListItemRecord]>,
) -> Option<Node> {
    let owned;
    let (records, term) = match structure {
        Some(s) => {
            let term = s.iter().map(|r| r.end).max().unwrap_or(pos);
            (s, term)
        }
        None => {
            let (r, term) = scan_list(buf, syntax, pos, limit);
            owned = r;
            (owned.as_slice(), term)
        }
    };
    let base = records.iter().find(|r| r.begin == pos)?.indent;
    let list_type = list_type_of(records, base);
    let mut node = finish_element(
        buf,
        NodeData::PlainList(PlainList { list_type, structure: records.to_vec() }),
        begin,
        term.min(limit),
        limit,
    );
    node.affiliated = affiliated;
    node.post_affiliated = Some(pos);
    node.contents_begin = Some(pos);
    node.contents_end = Some(term.min(limit));
    Some(node)
}

/// The item starting at `pos`, read from a precomputed structure.
pub(crate) fn item(
    buf: &Buffer,
    syntax: &Syntax,
    pos: usize,
    limit: usize,
    structure: &[ListItemRecord],
) -> Node {
    let record = structure.iter().find(|r| r.begin == pos).cloned().unwrap_or_else(|| {
        // Orphan position: treat the single line as an item.
        let line = buf.line_str(pos);
        let head = item_line(&line, syntax);
        let contents_off = head.as_ref().map_or(0, |h| h.after_bullet);
        ListItemRecord {
            begin: pos,
            indent: head.as_ref().map_or(0, |h| h.indent),
            bullet: head.map_or_else(|| "-".to_owned(), |h| h.bullet.to_owned()),
            counter: None,
            checkbox: None,
            tag_span: None,
            contents_begin: pos + contents_off,
            end: buf.next_line_start(pos),
        }
    });
    let end = record.end.min(limit);

    // Blank lines at the item's tail are its post-blank.
    let mut contents_end = end;
    let mut post_blank = 0;
    while contents_end > record.contents_begin {
        let line_start = buf.line_start_of(contents_end.saturating_sub(1));
        if line_start <= record.contents_begin || !buf.is_blank_line(line_start) {
            break;
        }
        contents_end = line_start;
        post_blank += 1;
    }

    let mut node = Node::new(
        NodeData::Item(Item {
            bullet: record.bullet.clone(),
            indent: record.indent,
            counter: record.counter,
            checkbox: record.checkbox,
            tag_span: record.tag_span,
            tag: Vec::new(),
        }),
        pos,
        end,
    );
    node.post_blank = post_blank;
    if contents_end > record.contents_begin {
        node.contents_begin = Some(record.contents_begin);
        node.contents_end = Some(contents_end);
    }
    node
}
