//! Drawers, property drawers and node properties.

use crate::ast::{Affiliated, Node, NodeData};
use crate::buffer::Buffer;
use crate::parse::elements::finish_element;
use crate::syntax::{DRAWER_END_RE, DRAWER_RE, NODE_PROPERTY_RE, heading_stars};

/// Line start of the `:END:` line, if present before `limit`. A heading
/// line aborts the search.
pub(crate) fn find_drawer_end(buf: &Buffer, from: usize, limit: usize) -> Option<usize> {
    let mut cur = from;
    while cur < limit {
        let line = buf.line_str(cur);
        if DRAWER_END_RE.is_match(&line) {
            return Some(cur);
        }
        if heading_stars(&line).is_some() {
            return None;
        }
        cur = buf.next_line_start(cur);
    }
    None
}

/// `:NAME:` … `:END:`. `:PROPERTIES:` yields a property drawer whose
/// contents parse as node properties. Declines without the closing line.
pub(crate) fn drawer(
    buf: &Buffer,
    begin: usize,
    pos: usize,
    limit: usize,
    affiliated: Option<Box<Affiliated>>,
) -> Option<Node> {
    let line = buf.line_str(pos);
    let caps = DRAWER_RE.captures(&line)?;
    let name = caps[1].to_owned();
    if name.eq_ignore_ascii_case("end") {
        return None;
    }
    let contents_begin = buf.next_line_start(pos);
    let end_line = find_drawer_end(buf, contents_begin, limit)?;
    let after = buf.next_line_start(end_line);

    let data = if name.eq_ignore_ascii_case("properties") {
        NodeData::PropertyDrawer
    } else {
        NodeData::Drawer { name }
    };
    let mut node = finish_element(buf, data, begin, after, limit);
    node.affiliated = affiliated;
    node.post_affiliated = Some(pos);
    if end_line > contents_begin {
        node.contents_begin = Some(contents_begin);
        node.contents_end = Some(end_line);
    }
    Some(node)
}

/// `:KEY: value` line inside a property drawer.
pub(crate) fn node_property(buf: &Buffer, pos: usize, limit: usize) -> Node {
    let line = buf.line_str(pos);
    let after = buf.next_line_start(pos);
    let (key, value) = match NODE_PROPERTY_RE.captures(&line) {
        Some(caps) => {
            let mut key = caps[1].to_owned();
            if caps.get(2).is_some() {
                key.push('+');
            }
            (key, caps.get(3).map(|m| m.as_str().to_owned()).unwrap_or_default())
        }
        None => (String::new(), line.trim().to_owned()),
    };
    finish_element(buf, NodeData::NodeProperty { key, value }, pos, after, limit)
}
