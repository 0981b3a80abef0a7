//! Footnote definitions: `[fn:label] …` at column zero.

use crate::ast::{Affiliated, Node, NodeData};
use crate::buffer::Buffer;
use crate::parse::elements::finish_element;
use crate::syntax::{FOOTNOTE_DEF_RE, heading_stars};

/// A definition runs until the next definition, the next headline, or two
/// consecutive blank lines.
pub(crate) fn footnote_definition(
    buf: &Buffer,
    begin: usize,
    pos: usize,
    limit: usize,
    affiliated: Option<Box<Affiliated>>,
) -> Option<Node> {
    let line = buf.line_str(pos);
    let caps = FOOTNOTE_DEF_RE.captures(&line)?;
    let label = caps[1].to_owned();
    let contents_begin = pos + caps.get(0).map_or(0, |m| m.end());

    let mut cur = buf.next_line_start(pos);
    let mut blank_run = 0usize;
    let mut contents_end = buf.line_end_of(pos);
    while cur < limit {
        let l = buf.line_str(cur);
        if l.trim().is_empty() {
            blank_run += 1;
            if blank_run >= 2 {
                break;
            }
        } else if FOOTNOTE_DEF_RE.is_match(&l) || heading_stars(&l).is_some() {
            break;
        } else {
            blank_run = 0;
            contents_end = buf.line_end_of(cur);
        }
        cur = buf.next_line_start(cur);
    }

    // Walk back to the line right after the last content line.
    let after = buf.next_line_start(contents_end);
    let mut node = finish_element(
        buf,
        NodeData::FootnoteDefinition { label },
        begin,
        after,
        limit,
    );
    node.affiliated = affiliated;
    node.post_affiliated = Some(pos);
    if contents_end > contents_begin {
        node.contents_begin = Some(contents_begin);
        node.contents_end = Some(buf.next_line_start(contents_end).min(node.end));
    }
    Some(node)
}
