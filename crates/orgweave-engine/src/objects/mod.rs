//! Object layer: the lexer that finds inline constructs inside a region.
//!
//! A coarse candidate regex skips to potential object starts; each
//! candidate is handed to the type-specific recognizers permitted by the
//! container's restriction set, in disambiguation order. A recognizer
//! either produces a node or declines, in which case the scan advances one
//! character. Text between objects becomes `plain-text` fragments with
//! TABs expanded. Radio-target links are matched by a separate cursor and
//! only win when no regular candidate starts earlier.

pub(crate) mod emphasis;
pub(crate) mod entity;
pub(crate) mod footnote_ref;
pub(crate) mod inline_call;
pub(crate) mod link;
pub(crate) mod script;
pub(crate) mod snippet;
pub(crate) mod table_cell;
pub(crate) mod timestamp;

use regex::Regex;

use crate::ast::{Node, NodeData, NodeId, NodeKind, Restriction, Tree, object_restriction};
use crate::buffer::Buffer;
use crate::syntax::Syntax;

pub(crate) struct ObjectLexer<'a> {
    syntax: &'a Syntax,
    radio_re: Option<Regex>,
}

impl<'a> ObjectLexer<'a> {
    pub fn new(syntax: &'a Syntax, radio_targets: &[String]) -> Self {
        let radio_re = if radio_targets.is_empty() {
            None
        } else {
            let alts = radio_targets
                .iter()
                .map(|t| regex::escape(t))
                .collect::<Vec<_>>()
                .join("|");
            Regex::new(&format!(r"(?i)\b(?:{alts})\b")).ok()
        };
        ObjectLexer { syntax, radio_re }
    }

    /// Lex `[beg, end)` of the buffer. Returns top-level object ids with
    /// fully built subtrees; the caller attaches them to their owner.
    pub fn lex_region(
        &self,
        tree: &mut Tree,
        buf: &Buffer,
        beg: usize,
        end: usize,
        restriction: Restriction,
    ) -> Vec<NodeId> {
        let text = buf.slice(beg, end).into_owned();
        self.lex_str(tree, &text, beg, restriction)
    }

    pub fn lex_str(
        &self,
        tree: &mut Tree,
        s: &str,
        base: usize,
        restriction: Restriction,
    ) -> Vec<NodeId> {
        if restriction.allows(NodeKind::TableCell) {
            return table_cell::lex_cells(self, tree, s, base);
        }
        let mut out = Vec::new();
        let mut text_start = 0usize;
        let mut i = 0usize;
        while i < s.len() {
            let regular = self.next_regular(s, i, base, restriction);
            let radio = self.next_radio(s, i, restriction);
            let node = match (regular, radio) {
                (Some(reg), Some((rpos, rlen))) => {
                    // Radio links yield to any candidate starting at or
                    // before them.
                    if rpos + base < reg.begin {
                        link::radio_link(&s[rpos..rpos + rlen], rpos, base)
                    } else {
                        reg
                    }
                }
                (Some(reg), None) => reg,
                (None, Some((rpos, rlen))) => link::radio_link(&s[rpos..rpos + rlen], rpos, base),
                (None, None) => break,
            };
            let rel_begin = node.begin - base;
            self.flush_text(tree, &mut out, s, base, text_start, rel_begin);
            let rel_end = node.end - base;
            let id = self.finish_object(tree, s, base, node);
            // Trailing spaces become the object's post-blank.
            let spaces = s[rel_end..]
                .bytes()
                .take_while(|b| matches!(b, b' ' | b'\t'))
                .count();
            if let Some(n) = tree.get_mut(id) {
                n.post_blank = spaces;
                n.end += spaces;
            }
            out.push(id);
            i = rel_end + spaces;
            text_start = i;
        }
        self.flush_text(tree, &mut out, s, base, text_start, s.len());
        out
    }

    fn flush_text(
        &self,
        tree: &mut Tree,
        out: &mut Vec<NodeId>,
        s: &str,
        base: usize,
        from: usize,
        to: usize,
    ) {
        if to <= from {
            return;
        }
        let raw = &s[from..to];
        let value = if raw.contains('\t') {
            raw.replace('\t', &" ".repeat(self.syntax.tab_width()))
        } else {
            raw.to_owned()
        };
        let node = Node::new(NodeData::PlainText { value }, base + from, base + to);
        out.push(tree.alloc(node));
    }

    /// Scan candidates from `from` until a recognizer accepts.
    fn next_regular(
        &self,
        s: &str,
        from: usize,
        base: usize,
        restriction: Restriction,
    ) -> Option<Node> {
        let re = self.syntax.object_candidate_re();
        let mut j = from;
        while j < s.len() {
            let m = re.find_at(s, j)?;
            let pos = m.start();
            if let Some(node) = self.try_object_at(s, pos, base, restriction) {
                return Some(node);
            }
            // Decline: advance one character past the candidate start.
            j = pos + s[pos..].chars().next().map_or(1, char::len_utf8);
        }
        None
    }

    fn next_radio(&self, s: &str, from: usize, restriction: Restriction) -> Option<(usize, usize)> {
        if !restriction.allows(NodeKind::Link) {
            return None;
        }
        let re = self.radio_re.as_ref()?;
        re.find_at(s, from).map(|m| (m.start(), m.len()))
    }

    /// Dispatch the recognizers that can start at `s[pos]`, honoring the
    /// restriction set and the documented disambiguation order.
    fn try_object_at(
        &self,
        s: &str,
        pos: usize,
        base: usize,
        r: Restriction,
    ) -> Option<Node> {
        let rest = &s[pos..];
        let first = *rest.as_bytes().first()?;
        let allow = |kind: NodeKind| r.allows(kind);
        match first {
            b'*' | b'/' | b'+' | b'~' | b'=' => {
                let kind = emphasis::marker_kind(first)?;
                allow(kind).then(|| emphasis::emphasis(s, pos, base)).flatten()
            }
            b'_' => {
                if allow(NodeKind::Subscript)
                    && let Some(node) = script::script(s, pos, base)
                {
                    return Some(node);
                }
                allow(NodeKind::Underline)
                    .then(|| emphasis::emphasis(s, pos, base))
                    .flatten()
            }
            b'^' => allow(NodeKind::Superscript)
                .then(|| script::script(s, pos, base))
                .flatten(),
            b'[' => {
                if rest.starts_with("[fn:") {
                    if allow(NodeKind::FootnoteReference)
                        && let Some(node) = footnote_ref::footnote_reference(s, pos, base)
                    {
                        return Some(node);
                    }
                }
                // Ambiguous `[`: link first, then timestamp, then cookie.
                if allow(NodeKind::Link)
                    && let Some(node) = link::bracket_link(s, pos, base, self.syntax)
                {
                    return Some(node);
                }
                if allow(NodeKind::Timestamp)
                    && let Some(node) = timestamp::timestamp(s, pos, base)
                {
                    return Some(node);
                }
                allow(NodeKind::StatisticsCookie)
                    .then(|| snippet::statistics_cookie(s, pos, base))
                    .flatten()
            }
            b'<' => {
                if allow(NodeKind::RadioTarget)
                    && let Some(node) = link::radio_target(s, pos, base)
                {
                    return Some(node);
                }
                if allow(NodeKind::Target)
                    && let Some(node) = link::target(s, pos, base)
                {
                    return Some(node);
                }
                if allow(NodeKind::Timestamp)
                    && let Some(node) = timestamp::timestamp(s, pos, base)
                {
                    return Some(node);
                }
                allow(NodeKind::Link)
                    .then(|| link::angle_link(s, pos, base, self.syntax))
                    .flatten()
            }
            b'@' => allow(NodeKind::ExportSnippet)
                .then(|| snippet::export_snippet(s, pos, base))
                .flatten(),
            b'{' => allow(NodeKind::Macro)
                .then(|| snippet::macro_object(s, pos, base))
                .flatten(),
            b'$' => allow(NodeKind::LatexFragment)
                .then(|| entity::latex_fragment(s, pos, base))
                .flatten(),
            b'\\' => {
                if allow(NodeKind::LineBreak)
                    && let Some(node) = snippet::line_break(s, pos, base)
                {
                    return Some(node);
                }
                if allow(NodeKind::Entity)
                    && let Some(node) = entity::entity(s, pos, base)
                {
                    return Some(node);
                }
                allow(NodeKind::LatexFragment)
                    .then(|| entity::latex_fragment(s, pos, base))
                    .flatten()
            }
            _ => {
                if rest.starts_with("call_") && allow(NodeKind::InlineBabelCall) {
                    if let Some(node) = inline_call::inline_babel_call(s, pos, base) {
                        return Some(node);
                    }
                }
                if rest.starts_with("src_") && allow(NodeKind::InlineSrcBlock) {
                    if let Some(node) = inline_call::inline_src_block(s, pos, base) {
                        return Some(node);
                    }
                }
                if first.is_ascii_alphabetic() && allow(NodeKind::Link) {
                    return link::plain_link(s, pos, base, self.syntax);
                }
                None
            }
        }
    }

    /// Allocate `node`, descending into recursive contents and secondary
    /// strings.
    fn finish_object(&self, tree: &mut Tree, s: &str, base: usize, node: Node) -> NodeId {
        let kind = node.kind();
        let contents = node.contents_span();
        let definition = match &node.data {
            NodeData::FootnoteReference(f) => f.definition_span,
            _ => None,
        };
        let id = tree.alloc(node);
        if kind.is_recursive_object()
            && let Some(span) = contents
        {
            let children = self.lex_str(
                tree,
                &s[span.start - base..span.end - base],
                span.start,
                object_restriction(kind),
            );
            for child in children {
                tree.adopt(id, child);
            }
        }
        if let Some(span) = definition {
            let children = self.lex_str(
                tree,
                &s[span.start - base..span.end - base],
                span.start,
                object_restriction(NodeKind::FootnoteReference),
            );
            tree.adopt_secondary(id, 0, children);
        }
        id
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Tree;
    use pretty_assertions::assert_eq;

    fn lex(s: &str, restriction: Restriction) -> (Tree, Vec<NodeId>) {
        let syntax = Syntax::default();
        let lexer = ObjectLexer::new(&syntax, &[]);
        let mut tree = Tree::new(s.len());
        let ids = lexer.lex_str(&mut tree, s, 0, restriction);
        (tree, ids)
    }

    fn kinds(tree: &Tree, ids: &[NodeId]) -> Vec<NodeKind> {
        ids.iter().map(|id| tree[*id].kind()).collect()
    }

    #[test]
    fn text_bold_text() {
        let (tree, ids) = lex("Hello *world*.", Restriction::standard());
        assert_eq!(
            kinds(&tree, &ids),
            vec![NodeKind::PlainText, NodeKind::Bold, NodeKind::PlainText]
        );
        let NodeData::PlainText { value } = &tree[ids[0]].data else { panic!() };
        assert_eq!(value, "Hello ");
        let NodeData::PlainText { value } = &tree[ids[2]].data else { panic!() };
        assert_eq!(value, ".");
        // Bold contents hold the inner text.
        let bold_children = &tree[ids[1]].children;
        assert_eq!(bold_children.len(), 1);
        let NodeData::PlainText { value } = &tree[bold_children[0]].data else { panic!() };
        assert_eq!(value, "world");
        assert_eq!(tree[bold_children[0]].parent, Some(ids[1]));
    }

    #[test]
    fn restriction_suppresses_kinds() {
        let (tree, ids) = lex("a *b* <2024-01-02 Tue>", Restriction::minimal());
        // Timestamp not allowed in the minimal set: stays plain text.
        let ks = kinds(&tree, &ids);
        assert!(ks.contains(&NodeKind::Bold));
        assert!(!ks.contains(&NodeKind::Timestamp));
    }

    #[test]
    fn bracket_ambiguity_order() {
        // Link wins over timestamp and cookie at `[[`.
        let (tree, ids) = lex("[[target]]", Restriction::standard());
        assert_eq!(kinds(&tree, &ids), vec![NodeKind::Link]);
        // Timestamp wins over cookie.
        let (tree, ids) = lex("[2024-01-02 Tue]", Restriction::standard());
        assert_eq!(kinds(&tree, &ids), vec![NodeKind::Timestamp]);
        // Cookie for plain numbers.
        let (tree, ids) = lex("[1/2]", Restriction::standard());
        assert_eq!(kinds(&tree, &ids), vec![NodeKind::StatisticsCookie]);
    }

    #[test]
    fn post_blank_counts_trailing_spaces() {
        let (tree, ids) = lex("*b*  x", Restriction::standard());
        assert_eq!(tree[ids[0]].post_blank, 2);
        assert_eq!(tree[ids[0]].end, 5);
        let NodeData::PlainText { value } = &tree[ids[1]].data else { panic!() };
        assert_eq!(value, "x");
    }

    #[test]
    fn tabs_expanded_in_plain_text_only() {
        let (tree, ids) = lex("a\tb =c\td=", Restriction::standard());
        let NodeData::PlainText { value } = &tree[ids[0]].data else { panic!() };
        assert_eq!(value, "a        b ");
        let NodeData::Verbatim { value } = &tree[ids[1]].data else { panic!() };
        assert_eq!(value, "c\td");
    }

    #[test]
    fn radio_target_match_prefers_regular_candidates() {
        let syntax = Syntax::default();
        let targets = vec!["radio".to_owned()];
        let lexer = ObjectLexer::new(&syntax, &targets);
        let mut tree = Tree::new(64);
        let ids = lexer.lex_str(&mut tree, "see *radio* and radio x", 0, Restriction::standard());
        let ks: Vec<NodeKind> = ids.iter().map(|id| tree[*id].kind()).collect();
        // The bold span wins at its position; the bare occurrence becomes a
        // radio link.
        assert_eq!(
            ks,
            vec![
                NodeKind::PlainText,
                NodeKind::Bold,
                NodeKind::PlainText,
                NodeKind::Link,
                NodeKind::PlainText,
            ]
        );
        let NodeData::Link(l) = &tree[ids[3]].data else { panic!() };
        assert_eq!(l.link_type, "radio");
    }

    #[test]
    fn table_cells() {
        let (tree, ids) = lex(" a | *b* |", Restriction::of(&[NodeKind::TableCell]));
        assert_eq!(kinds(&tree, &ids), vec![NodeKind::TableCell, NodeKind::TableCell]);
        let first = &tree[ids[0]];
        assert_eq!(first.contents_begin, Some(1));
        assert_eq!(first.contents_end, Some(2));
        let second = &tree[ids[1]];
        let inner = kinds(&tree, &second.children);
        assert_eq!(inner, vec![NodeKind::Bold]);
    }

    #[test]
    fn unclosed_markup_is_text() {
        let (tree, ids) = lex("*unclosed", Restriction::standard());
        assert_eq!(kinds(&tree, &ids), vec![NodeKind::PlainText]);
        let NodeData::PlainText { value } = &tree[ids[0]].data else { panic!() };
        assert_eq!(value, "*unclosed");
    }

    #[test]
    fn inline_code_and_calls() {
        let (tree, ids) = lex("x src_rust{1} call_f(2)", Restriction::standard());
        let ks = kinds(&tree, &ids);
        assert!(ks.contains(&NodeKind::InlineSrcBlock));
        assert!(ks.contains(&NodeKind::InlineBabelCall));
    }

    #[test]
    fn plain_and_angle_links() {
        let (tree, ids) = lex("go to https://e.org/a now", Restriction::standard());
        assert!(kinds(&tree, &ids).contains(&NodeKind::Link));
        let (tree, ids) = lex("<mailto:a@b.c>", Restriction::standard());
        assert_eq!(kinds(&tree, &ids), vec![NodeKind::Link]);
    }

    #[test]
    fn subscript_inside_word() {
        let (tree, ids) = lex("x_i y", Restriction::standard());
        assert_eq!(
            kinds(&tree, &ids),
            vec![NodeKind::PlainText, NodeKind::Subscript, NodeKind::PlainText]
        );
    }
}
