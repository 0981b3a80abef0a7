//! Tables and table rows.

use crate::ast::{Affiliated, Node, NodeData, Table, TableType};
use crate::buffer::Buffer;
use crate::parse::elements::finish_element;
use crate::syntax::{TABLE_EL_RE, TABLE_ORG_RE, TABLE_RULE_RE, TBLFM_RE};

/// An org table (`|` rows, optional `#+TBLFM:` lines) or a table.el table
/// (`+-` borders, kept as an opaque value).
pub(crate) fn table(
    buf: &Buffer,
    begin: usize,
    pos: usize,
    limit: usize,
    affiliated: Option<Box<Affiliated>>,
) -> Option<Node> {
    let first = buf.line_str(pos);
    let table_el = if TABLE_ORG_RE.is_match(&first) {
        false
    } else if TABLE_EL_RE.is_match(&first) {
        true
    } else {
        return None;
    };

    // Rows: consecutive table lines.
    let mut cur = buf.next_line_start(pos);
    while cur < limit {
        let line = buf.line_str(cur);
        let is_row = if table_el {
            TABLE_ORG_RE.is_match(&line) || TABLE_EL_RE.is_match(&line)
        } else {
            TABLE_ORG_RE.is_match(&line)
        };
        if !is_row {
            break;
        }
        cur = buf.next_line_start(cur);
    }
    let rows_end = cur;

    // Formula lines directly after the rows.
    let mut tblfm = Vec::new();
    while cur < limit {
        let line = buf.line_str(cur);
        let Some(caps) = TBLFM_RE.captures(&line) else { break };
        tblfm.push(caps[1].to_owned());
        cur = buf.next_line_start(cur);
    }

    let data = NodeData::Table(Table {
        table_type: if table_el { TableType::TableEl } else { TableType::Org },
        tblfm,
        value: table_el.then(|| buf.slice(pos, rows_end).into_owned()),
    });
    let mut node = finish_element(buf, data, begin, cur, limit);
    node.affiliated = affiliated;
    node.post_affiliated = Some(pos);
    if !table_el {
        node.contents_begin = Some(pos);
        node.contents_end = Some(rows_end);
    }
    Some(node)
}

/// One row of an org table. Rule rows (`|---`) carry no cells.
pub(crate) fn table_row(buf: &Buffer, pos: usize, limit: usize) -> Node {
    let line = buf.line_str(pos);
    let rule = TABLE_RULE_RE.is_match(&line);
    let after = buf.next_line_start(pos).min(limit);
    let mut node = Node::new(NodeData::TableRow { rule }, pos, after);
    if !rule {
        // Contents start right after the leading `|`.
        let bar = line.find('|').unwrap_or(0);
        let cb = pos + bar + 1;
        let ce = pos + line.trim_end().len();
        if ce > cb {
            node.contents_begin = Some(cb);
            node.contents_end = Some(ce);
        }
    }
    node
}
