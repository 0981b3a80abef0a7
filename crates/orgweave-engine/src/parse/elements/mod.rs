//! Element layer: one recognizer per element type plus the dispatcher
//! that selects among them.

pub(crate) mod block;
pub(crate) mod drawer;
pub(crate) mod footnote;
pub(crate) mod headline;
pub(crate) mod keyword;
pub(crate) mod latex;
pub(crate) mod list;
pub(crate) mod paragraph;
pub(crate) mod planning;
pub(crate) mod table;

use crate::ast::{Affiliated, ListItemRecord, Node, NodeData};
use crate::buffer::Buffer;
use crate::parse::Mode;
use crate::parse::affiliated;
use crate::syntax::{
    BABEL_CALL_RE, BLOCK_BEGIN_RE, CLOCK_LINE_RE, COMMENT_RE, DIARY_SEXP_RE, DRAWER_RE,
    DYN_BLOCK_BEGIN_RE, FIXED_WIDTH_RE, FOOTNOTE_DEF_RE, HORIZONTAL_RULE_RE, KEYWORD_RE,
    LATEX_ENV_BEGIN_RE, Syntax, TABLE_EL_RE, TABLE_ORG_RE, heading_stars,
};

/// Close out an element ending at `after`: skip trailing blank lines into
/// `post_blank` and set `end` past them.
pub(crate) fn finish_element(
    buf: &Buffer,
    data: NodeData,
    begin: usize,
    after: usize,
    limit: usize,
) -> Node {
    let (end, post_blank) = buf.skip_blank_lines(after, limit);
    let mut node = Node::new(data, begin, end);
    node.post_blank = post_blank;
    node
}

/// Parse exactly one element at `pos`.
///
/// `pos` must sit at the beginning of a line unless this is the first
/// content of an item or footnote definition. `structure` carries the
/// precomputed list structure for `Mode::Item`.
pub(crate) fn element_at(
    buf: &Buffer,
    syntax: &Syntax,
    pos: usize,
    limit: usize,
    mode: Mode,
    structure: Option<&[ListItemRecord]>,
) -> Node {
    match mode {
        Mode::Item => {
            let owned;
            let records = match structure {
                Some(s) => s,
                None => {
                    owned = list::scan_list(buf, syntax, pos, limit).0;
                    owned.as_slice()
                }
            };
            return list::item(buf, syntax, pos, limit, records);
        }
        Mode::TableRow => return table::table_row(buf, pos, limit),
        Mode::NodeProperty => return drawer::node_property(buf, pos, limit),
        _ => {}
    }

    let line = buf.line_str(pos);
    let stars = heading_stars(&line);
    if let Some(stars) = stars
        && syntax.headline_level_ok(stars)
        && let Some(node) = headline::headline(buf, syntax, pos, limit)
    {
        return node;
    }
    // Section wins over everything below, including inline tasks: a deep
    // heading inside a headline's contents still opens the section first.
    if matches!(mode, Mode::Section | Mode::FirstSection) {
        return headline::section(buf, syntax, pos, limit);
    }
    if pos != buf.line_start_of(pos) {
        // First content of an item or footnote definition.
        return paragraph::paragraph(buf, syntax, pos, pos, limit, None);
    }
    if CLOCK_LINE_RE.is_match(&line) {
        return planning::clock(buf, pos, limit);
    }
    if syntax.planning_line_re().is_match(&line) {
        return planning::planning(buf, pos, limit);
    }
    if stars.is_some_and(|s| !syntax.headline_level_ok(s))
        && let Some(node) = headline::inlinetask(buf, syntax, pos, limit)
    {
        return node;
    }

    // Everything below may carry affiliated metadata.
    let collected = affiliated::collect(buf, pos, limit);
    let apos = collected.post_affiliated;
    if apos > pos && (apos >= limit || buf.is_blank_line(apos)) {
        // Orphaned affiliated lines: the first one reparses as a keyword.
        if let Some(node) = keyword::keyword(buf, pos, pos, limit, None) {
            return node;
        }
    }
    let aff: Option<Box<Affiliated>> =
        (!collected.affiliated.is_empty()).then(|| Box::new(collected.affiliated));
    let line = buf.line_str(apos);
    if heading_stars(&line).is_some() {
        // A headline after affiliated lines also orphans them.
        if let Some(node) = keyword::keyword(buf, pos, pos, limit, None) {
            return node;
        }
    }

    if LATEX_ENV_BEGIN_RE.is_match(&line)
        && let Some(node) = latex::latex_environment(buf, pos, apos, limit, aff.clone())
    {
        return node;
    }
    if DRAWER_RE.is_match(&line)
        && let Some(node) = drawer::drawer(buf, pos, apos, limit, aff.clone())
    {
        return node;
    }
    if FIXED_WIDTH_RE.is_match(&line) {
        return keyword::fixed_width(buf, pos, apos, limit, aff);
    }
    if COMMENT_RE.is_match(&line) {
        return keyword::comment(buf, pos, apos, limit, aff);
    }
    if BLOCK_BEGIN_RE.is_match(&line) {
        if let Some(node) = block::block(buf, pos, apos, limit, aff.clone()) {
            return node;
        }
    } else if DYN_BLOCK_BEGIN_RE.is_match(&line) {
        if let Some(node) = block::dynamic_block(buf, pos, apos, limit, aff.clone()) {
            return node;
        }
    } else if BABEL_CALL_RE.is_match(&line) {
        if let Some(node) = keyword::babel_call(buf, pos, apos, limit, aff.clone()) {
            return node;
        }
    } else if KEYWORD_RE.is_match(&line)
        && let Some(node) = keyword::keyword(buf, pos, apos, limit, aff.clone())
    {
        return node;
    }
    if FOOTNOTE_DEF_RE.is_match(&line)
        && let Some(node) = footnote::footnote_definition(buf, pos, apos, limit, aff.clone())
    {
        return node;
    }
    if HORIZONTAL_RULE_RE.is_match(&line) {
        return keyword::horizontal_rule(buf, pos, apos, limit, aff);
    }
    if DIARY_SEXP_RE.is_match(&line) {
        return keyword::diary_sexp(buf, pos, apos, limit, aff);
    }
    if (TABLE_ORG_RE.is_match(&line) || TABLE_EL_RE.is_match(&line))
        && let Some(node) = table::table(buf, pos, apos, limit, aff.clone())
    {
        return node;
    }
    if list::item_line(&line, syntax).is_some()
        && let Some(node) = list::plain_list(buf, syntax, pos, apos, limit, aff.clone(), structure)
    {
        return node;
    }
    paragraph::paragraph(buf, syntax, pos, apos, limit, aff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;

    fn dispatch(text: &str, mode: Mode) -> (Buffer, Node) {
        let buf = Buffer::from_str(text);
        let syntax = Syntax::default();
        let node = element_at(&buf, &syntax, 0, buf.len(), mode, None);
        (buf, node)
    }

    #[test]
    fn default_is_paragraph() {
        let (_, node) = dispatch("just text\n", Mode::None);
        assert_eq!(node.kind(), NodeKind::Paragraph);
    }

    #[test]
    fn unclosed_block_falls_back_to_paragraph() {
        let (buf, node) = dispatch("#+BEGIN_SRC\nfoo\n", Mode::None);
        assert_eq!(node.kind(), NodeKind::Paragraph);
        assert_eq!(node.end, buf.len());
    }

    #[test]
    fn affiliated_attaches_to_element() {
        let (_, node) = dispatch("#+NAME: tbl\n| a |\n", Mode::None);
        assert_eq!(node.kind(), NodeKind::Table);
        assert_eq!(node.begin, 0);
        assert_eq!(node.post_affiliated, Some(12));
        let aff = node.affiliated.as_ref().unwrap();
        assert_eq!(aff.get("name"), Some("tbl"));
    }

    #[test]
    fn orphaned_affiliated_reparses_as_keyword() {
        let (_, node) = dispatch("#+NAME: tbl\n\nlater\n", Mode::None);
        assert_eq!(node.kind(), NodeKind::Keyword);
        let NodeData::Keyword { key, value } = &node.data else { panic!() };
        assert_eq!(key, "NAME");
        assert_eq!(value, "tbl");
    }

    #[test]
    fn affiliated_before_headline_is_orphaned() {
        let (_, node) = dispatch("#+CAPTION: c\n* Head\n", Mode::None);
        assert_eq!(node.kind(), NodeKind::Keyword);
        assert_eq!(node.end, 13);
    }

    #[test]
    fn headline_beats_section_mode() {
        let (_, node) = dispatch("* Head\nbody\n", Mode::Section);
        assert_eq!(node.kind(), NodeKind::Headline);
    }

    #[test]
    fn section_mode_without_heading() {
        let (buf, node) = dispatch("body\nmore\n* Head\n", Mode::FirstSection);
        assert_eq!(node.kind(), NodeKind::Section);
        assert_eq!(node.end, buf.len() - 7);
    }

    #[test]
    fn planning_and_clock_prefixes() {
        let (_, node) = dispatch("SCHEDULED: <2024-01-02 Tue>\n", Mode::None);
        assert_eq!(node.kind(), NodeKind::Planning);
        let (_, node) = dispatch("CLOCK: [2024-01-02 Tue 09:00]\n", Mode::None);
        assert_eq!(node.kind(), NodeKind::Clock);
    }

    #[test]
    fn char_table_selection() {
        for (text, kind) in [
            ("\\begin{x}\n\\end{x}\n", NodeKind::LatexEnvironment),
            (":LOG:\n:END:\n", NodeKind::Drawer),
            (": fixed\n", NodeKind::FixedWidth),
            ("# note\n", NodeKind::Comment),
            ("#+BEGIN_QUOTE\nq\n#+END_QUOTE\n", NodeKind::QuoteBlock),
            ("#+CALL: f()\n", NodeKind::BabelCall),
            ("#+BEGIN: d\n#+END:\n", NodeKind::DynamicBlock),
            ("#+AUTHOR: me\n", NodeKind::Keyword),
            ("[fn:1] note\n", NodeKind::FootnoteDefinition),
            ("-----\n", NodeKind::HorizontalRule),
            ("%%(diary)\n", NodeKind::DiarySexp),
            ("| a |\n", NodeKind::Table),
            ("- x\n", NodeKind::PlainList),
        ] {
            let (_, node) = dispatch(text, Mode::None);
            assert_eq!(node.kind(), kind, "for {text:?}");
        }
    }

    #[test]
    fn inlinetask_dispatch() {
        let stars = "*".repeat(15);
        let (_, node) = dispatch(&format!("{stars} Task\n"), Mode::None);
        assert_eq!(node.kind(), NodeKind::Inlinetask);
    }

    #[test]
    fn section_mode_wraps_inlinetask() {
        // An inlinetask-deep heading does not preempt the section.
        let stars = "*".repeat(15);
        let (buf, node) = dispatch(&format!("{stars} Task\nbody\n"), Mode::Section);
        assert_eq!(node.kind(), NodeKind::Section);
        assert_eq!(node.end, buf.len());
    }

    #[test]
    fn item_mode_parses_item() {
        let buf = Buffer::from_str("- a\n- b\n");
        let syntax = Syntax::default();
        let node = element_at(&buf, &syntax, 0, buf.len(), Mode::Item, None);
        assert_eq!(node.kind(), NodeKind::Item);
        assert_eq!(node.end, 4);
    }

    #[test]
    fn node_property_mode() {
        let (_, node) = dispatch(":KEY: v\n", Mode::NodeProperty);
        assert_eq!(node.kind(), NodeKind::NodeProperty);
    }

    #[test]
    fn table_row_mode() {
        let (_, node) = dispatch("| a |\n", Mode::TableRow);
        assert_eq!(node.kind(), NodeKind::TableRow);
    }
}
