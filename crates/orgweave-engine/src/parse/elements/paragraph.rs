//! Paragraphs: the universal fallback element.
//!
//! A paragraph extends line by line until a blank line, the limit, or a
//! line that successfully starts another element. An opening line whose
//! container never closes (block, drawer, latex environment) does not
//! interrupt a paragraph; that is the fallback contract for unclosed
//! containers.

use crate::ast::{Affiliated, Node, NodeData};
use crate::buffer::Buffer;
use crate::parse::elements::{block, drawer, finish_element, latex, list};
use crate::syntax::{
    BLOCK_BEGIN_RE, COMMENT_RE, DIARY_SEXP_RE, DRAWER_RE, DYN_BLOCK_BEGIN_RE, FIXED_WIDTH_RE,
    FOOTNOTE_DEF_RE, HORIZONTAL_RULE_RE, KEYWORD_RE, LATEX_ENV_BEGIN_RE, Syntax, TABLE_EL_RE,
    TABLE_ORG_RE, heading_stars,
};

/// Whether the line at `pos` starts a non-paragraph element.
pub(crate) fn interrupts_paragraph(
    buf: &Buffer,
    syntax: &Syntax,
    pos: usize,
    limit: usize,
) -> bool {
    let line = buf.line_str(pos);
    if heading_stars(&line).is_some() {
        return true;
    }
    if list::item_line(&line, syntax).is_some() {
        return true;
    }
    if HORIZONTAL_RULE_RE.is_match(&line)
        || TABLE_ORG_RE.is_match(&line)
        || TABLE_EL_RE.is_match(&line)
        || FIXED_WIDTH_RE.is_match(&line)
        || COMMENT_RE.is_match(&line)
        || DIARY_SEXP_RE.is_match(&line)
        || FOOTNOTE_DEF_RE.is_match(&line)
    {
        return true;
    }
    if let Some(caps) = BLOCK_BEGIN_RE.captures(&line) {
        return block::find_block_end(buf, &caps[1], buf.next_line_start(pos), limit).is_some();
    }
    if DYN_BLOCK_BEGIN_RE.is_match(&line) {
        return block::find_dynamic_end(buf, buf.next_line_start(pos), limit).is_some();
    }
    if KEYWORD_RE.is_match(&line) {
        return true;
    }
    if DRAWER_RE.is_match(&line) {
        return drawer::find_drawer_end(buf, buf.next_line_start(pos), limit).is_some();
    }
    if let Some(caps) = LATEX_ENV_BEGIN_RE.captures(&line) {
        return latex::find_environment_end(buf, &caps[1], buf.next_line_start(pos), limit)
            .is_some();
    }
    false
}

/// The paragraph starting at `pos` (which may sit mid-line when it is the
/// first content of an item or footnote definition).
pub(crate) fn paragraph(
    buf: &Buffer,
    syntax: &Syntax,
    begin: usize,
    pos: usize,
    limit: usize,
    affiliated: Option<Box<Affiliated>>,
) -> Node {
    let mut last_line_end = buf.line_end_of(pos).min(limit);
    let mut cur = buf.next_line_start(pos);
    while cur < limit {
        if buf.is_blank_line(cur) || interrupts_paragraph(buf, syntax, cur, limit) {
            break;
        }
        last_line_end = buf.line_end_of(cur).min(limit);
        cur = buf.next_line_start(cur);
    }

    let after = buf.next_line_start(last_line_end).min(limit);
    let mut node = finish_element(buf, NodeData::Paragraph, begin, after, limit);
    node.affiliated = affiliated;
    node.post_affiliated = Some(pos);
    // Contents exclude the final newline; the interpreter restores it.
    node.contents_begin = Some(pos);
    node.contents_end = Some(last_line_end);
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
    fn single_line() {
        let buf = Buffer::from_str("Hello world.\n");
        let node = paragraph(&buf, &syntax(), 0, 0, buf.len(), None);
        assert_eq!(node.kind(), NodeKind::Paragraph);
        assert_eq!(node.contents_begin, Some(0));
        assert_eq!(node.contents_end, Some(12));
        assert_eq!(node.end, 13);
    }

    #[test]
    fn stops_at_blank_line() {
        let buf = Buffer::from_str("one\ntwo\n\nthree\n");
        let node = paragraph(&buf, &syntax(), 0, 0, buf.len(), None);
        assert_eq!(node.contents_end, Some(7));
        assert_eq!(node.post_blank, 1);
        assert_eq!(node.end, 9);
    }

    #[test]
    fn closed_block_interrupts() {
        let buf = Buffer::from_str("text\n#+BEGIN_SRC\nx\n#+END_SRC\n");
        let node = paragraph(&buf, &syntax(), 0, 0, buf.len(), None);
        assert_eq!(node.end, 5);
    }

    #[test]
    fn unclosed_block_does_not_interrupt() {
        let buf = Buffer::from_str("text\n#+BEGIN_SRC\nfoo\n");
        let node = paragraph(&buf, &syntax(), 0, 0, buf.len(), None);
        // The dangling opener folds into the paragraph.
        assert_eq!(node.contents_end, Some(20));
        assert_eq!(node.end, buf.len());
    }

    #[test]
    fn unclosed_drawer_does_not_interrupt() {
        let buf = Buffer::from_str("text\n:LOGBOOK:\nmore\n");
        let node = paragraph(&buf, &syntax(), 0, 0, buf.len(), None);
        assert_eq!(node.end, buf.len());
    }

    #[test]
    fn keyword_line_interrupts() {
        let buf = Buffer::from_str("text\n#+NAME: x\nmore\n");
        let node = paragraph(&buf, &syntax(), 0, 0, buf.len(), None);
        assert_eq!(node.end, 5);
    }

    #[test]
    fn mid_line_start() {
        let buf = Buffer::from_str("- item text\n  cont\n");
        let node = paragraph(&buf, &syntax(), 2, 2, buf.len(), None);
        assert_eq!(node.begin, 2);
        assert_eq!(node.contents_begin, Some(2));
        assert_eq!(node.contents_end, Some(18));
    }
}
