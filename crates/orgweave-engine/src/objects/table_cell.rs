//! Table cells: the special-cased object stream of a table row.
//!
//! A row's contents split on `|`; each cell's contents are the trimmed
//! interior, recursively lexed under the cell restriction set.

use crate::ast::{Node, NodeData, NodeId, NodeKind, Tree, object_restriction};
use crate::objects::ObjectLexer;

/// Lex `s` (a row's contents, after the leading `|`) into cells.
pub(crate) fn lex_cells(
    lexer: &ObjectLexer,
    tree: &mut Tree,
    s: &str,
    base: usize,
) -> Vec<NodeId> {
    let mut out = Vec::new();
    let bytes = s.as_bytes();
    let mut cur = 0usize;
    while cur < s.len() {
        let close = bytes[cur..].iter().position(|b| *b == b'|');
        let (interior_end, cell_end) = match close {
            Some(i) => (cur + i, cur + i + 1),
            None => (s.len(), s.len()),
        };
        if close.is_none() && s[cur..].trim().is_empty() {
            break;
        }
        let interior = &s[cur..interior_end];
        let lead = interior.len() - interior.trim_start().len();
        let trail = interior.len() - interior.trim_end().len();
        let cb = cur + lead;
        let ce = interior_end - trail;
        let mut node = Node::new(NodeData::TableCell, base + cur, base + cell_end);
        if ce > cb {
            node.contents_begin = Some(base + cb);
            node.contents_end = Some(base + ce);
        }
        let id = tree.alloc(node);
        if ce > cb {
            let children = lexer.lex_str(
                tree,
                &s[cb..ce],
                base + cb,
                object_restriction(NodeKind::TableCell),
            );
            for child in children {
                tree.adopt(id, child);
            }
        }
        out.push(id);
        cur = cell_end;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::Syntax;

    fn cells(s: &str) -> (Tree, Vec<NodeId>) {
        let syntax = Syntax::default();
        let lexer = ObjectLexer::new(&syntax, &[]);
        let mut tree = Tree::new(s.len());
        let ids = lex_cells(&lexer, &mut tree, s, 0);
        (tree, ids)
    }

    #[test]
    fn splits_on_bars() {
        let (tree, ids) = cells(" a | b | c |");
        assert_eq!(ids.len(), 3);
        for id in &ids {
            assert_eq!(tree[*id].kind(), NodeKind::TableCell);
        }
        // Contents are trimmed of the padding spaces.
        assert_eq!(tree[ids[0]].contents_begin, Some(1));
        assert_eq!(tree[ids[0]].contents_end, Some(2));
    }

    #[test]
    fn final_cell_without_bar() {
        let (tree, ids) = cells(" a | b");
        assert_eq!(ids.len(), 2);
        assert_eq!(tree[ids[1]].end, 6);
    }

    #[test]
    fn empty_cell_has_no_contents() {
        let (tree, ids) = cells("  | x |");
        assert_eq!(ids.len(), 2);
        assert!(tree[ids[0]].contents_begin.is_none());
    }

    #[test]
    fn cell_contents_are_lexed() {
        let (tree, ids) = cells(" ~code~ |");
        let inner = &tree[ids[0]].children;
        assert_eq!(inner.len(), 1);
        assert_eq!(tree[inner[0]].kind(), NodeKind::Code);
    }
}
