//! Interpreter: convert a tree (or subtree) back into markup text.
//!
//! Elements yield text ending in exactly one newline, then `post_blank`
//! blank lines; objects yield their text plus `post_blank` spaces. The
//! round-trip contract is structural: reparsing the output reproduces the
//! same kinds, properties and post-blank counts.

mod objects;

pub(crate) use objects::format_timestamp;

use crate::ast::{
    Affiliated, Checkbox, Node, NodeData, NodeId, NodeKind, Timestamp, Tree,
};
use crate::syntax::Syntax;

/// Interpret the subtree rooted at `id`.
pub fn interpret(tree: &Tree, syntax: &Syntax, id: NodeId) -> String {
    let Some(node) = tree.get(id) else { return String::new() };
    match node.kind() {
        NodeKind::Document => children_string(tree, syntax, node),
        kind if kind.is_element() => {
            let text = element_text(tree, syntax, id, node);
            format!("{}{}", ensure_final_newline(text), "\n".repeat(node.post_blank))
        }
        _ => objects::interpret_object(tree, syntax, node),
    }
}

fn children_string(tree: &Tree, syntax: &Syntax, node: &Node) -> String {
    node.children.iter().map(|c| interpret(tree, syntax, *c)).collect()
}

fn ensure_final_newline(mut s: String) -> String {
    while s.ends_with('\n') {
        s.pop();
    }
    s.push('\n');
    s
}

fn affiliated_prefix(affiliated: Option<&Affiliated>) -> String {
    let Some(aff) = affiliated else { return String::new() };
    let mut out = String::new();
    for entry in &aff.entries {
        let key = entry.key.to_uppercase();
        match &entry.dual {
            Some(dual) => out.push_str(&format!("#+{key}[{dual}]: {}\n", entry.value)),
            None if entry.value.is_empty() => out.push_str(&format!("#+{key}:\n")),
            None => out.push_str(&format!("#+{key}: {}\n", entry.value)),
        }
    }
    out
}

/// Strip the minimum common leading-space count from every line.
/// `skip_first` leaves the first line alone (it follows a bullet or
/// footnote label on the same line).
fn normalize_indent(s: &str, skip_first: bool) -> String {
    let lines: Vec<&str> = s.split('\n').collect();
    let min = lines
        .iter()
        .enumerate()
        .filter(|(i, l)| !(skip_first && *i == 0) && !l.trim().is_empty())
        .map(|(_, l)| l.len() - l.trim_start_matches(' ').len())
        .min()
        .unwrap_or(0);
    if min == 0 {
        return s.to_owned();
    }
    lines
        .iter()
        .enumerate()
        .map(|(i, l)| {
            if skip_first && i == 0 {
                (*l).to_owned()
            } else if l.len() >= min {
                l[min..].to_owned()
            } else {
                (*l).to_owned()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// True when `id` is the first content of an item or footnote definition.
fn first_in_inset(tree: &Tree, id: NodeId, node: &Node) -> bool {
    node.parent
        .and_then(|p| tree.get(p))
        .is_some_and(|p| {
            matches!(p.kind(), NodeKind::Item | NodeKind::FootnoteDefinition)
                && p.children.first() == Some(&id)
        })
}

fn planning_parts(
    closed: Option<&Timestamp>,
    deadline: Option<&Timestamp>,
    scheduled: Option<&Timestamp>,
) -> String {
    let mut parts = Vec::new();
    if let Some(ts) = closed {
        parts.push(format!("CLOSED: {}", format_timestamp(ts)));
    }
    if let Some(ts) = deadline {
        parts.push(format!("DEADLINE: {}", format_timestamp(ts)));
    }
    if let Some(ts) = scheduled {
        parts.push(format!("SCHEDULED: {}", format_timestamp(ts)));
    }
    parts.join(" ")
}

fn headline_text(tree: &Tree, syntax: &Syntax, node: &Node, stars: usize) -> String {
    let (NodeData::Headline(h) | NodeData::Inlinetask(h)) = &node.data else {
        return String::new();
    };
    let mut line = "*".repeat(stars);
    line.push(' ');
    if let Some(kw) = &h.todo_keyword {
        line.push_str(kw);
        line.push(' ');
    }
    if let Some(p) = h.priority {
        line.push_str(&format!("[#{p}] "));
    }
    if h.commented {
        line.push_str("COMMENT ");
    }
    let title = if h.title.is_empty() {
        h.raw_value.clone()
    } else {
        objects::objects_string(tree, syntax, &h.title)
    };
    line.push_str(&title);

    if !h.tags.is_empty() {
        let tags = format!(":{}:", h.tags.join(":"));
        let col = syntax.tags_column();
        let width = line.chars().count();
        let pad = if col > 0 {
            (col as usize).saturating_sub(width).max(1)
        } else if col < 0 {
            ((-col) as usize)
                .saturating_sub(width + tags.chars().count())
                .max(1)
        } else {
            1
        };
        line.push_str(&" ".repeat(pad));
        line.push_str(&tags);
    }
    line.push('\n');
    line
}

fn item_head(item: &crate::ast::Item, tree: &Tree, syntax: &Syntax) -> String {
    let mut head = item.bullet.clone();
    head.push(' ');
    if let Some(c) = item.counter {
        head.push_str(&format!("[@{c}] "));
    }
    if let Some(cb) = item.checkbox {
        head.push_str(match cb {
            Checkbox::On => "[X] ",
            Checkbox::Off => "[ ] ",
            Checkbox::Trans => "[-] ",
        });
    }
    if !item.tag.is_empty() {
        head.push_str(&objects::objects_string(tree, syntax, &item.tag));
        head.push_str(" :: ");
    }
    head
}

/// Attach `contents` after `head`, indenting continuation lines to the
/// head's width.
fn hang(head: &str, contents: &str) -> String {
    let indent = " ".repeat(head.chars().count());
    let mut out = String::with_capacity(head.len() + contents.len());
    out.push_str(head);
    for (i, line) in contents.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
            if !line.is_empty() {
                out.push_str(&indent);
            }
        }
        out.push_str(line);
    }
    out
}

fn element_text(tree: &Tree, syntax: &Syntax, id: NodeId, node: &Node) -> String {
    let prefix = affiliated_prefix(node.affiliated.as_deref());
    let body = match &node.data {
        NodeData::Section => children_string(tree, syntax, node),
        NodeData::Paragraph => {
            let contents = children_string(tree, syntax, node);
            normalize_indent(&contents, first_in_inset(tree, id, node))
        }
        NodeData::Headline(h) => {
            let mut s = headline_text(tree, syntax, node, h.level);
            s.push_str(&children_string(tree, syntax, node));
            s
        }
        NodeData::Inlinetask(h) => {
            let mut s = headline_text(tree, syntax, node, h.level);
            if !node.children.is_empty() {
                s.push_str(&children_string(tree, syntax, node));
                s.push_str(&"*".repeat(h.level));
                s.push_str(" END\n");
            }
            s
        }
        NodeData::PlainList(_) => children_string(tree, syntax, node),
        NodeData::Item(item) => {
            let head = item_head(item, tree, syntax);
            let contents = children_string(tree, syntax, node);
            hang(&head, contents.trim_end_matches('\n'))
        }
        NodeData::FootnoteDefinition { label } => {
            let contents = children_string(tree, syntax, node);
            format!("[fn:{label}] {contents}")
        }
        NodeData::CenterBlock => wrap_block("CENTER", None, &children_string(tree, syntax, node)),
        NodeData::QuoteBlock => wrap_block("QUOTE", None, &children_string(tree, syntax, node)),
        NodeData::VerseBlock => {
            let contents = children_string(tree, syntax, node);
            wrap_block("VERSE", None, &normalize_indent(&contents, false))
        }
        NodeData::SpecialBlock { block_type, parameters } => wrap_block(
            block_type,
            parameters.as_deref(),
            &children_string(tree, syntax, node),
        ),
        NodeData::CommentBlock { value } => wrap_block("COMMENT", None, value),
        NodeData::ExampleBlock(e) => wrap_block("EXAMPLE", e.switches.as_deref(), &e.value),
        NodeData::ExportBlock { backend, value } => {
            wrap_block("EXPORT", (!backend.is_empty()).then_some(backend.as_str()), value)
        }
        NodeData::SrcBlock(b) => {
            let mut header = String::new();
            for part in [b.language.as_deref(), b.switches.as_deref(), b.parameters.as_deref()]
                .into_iter()
                .flatten()
            {
                header.push(' ');
                header.push_str(part);
            }
            format!("#+BEGIN_SRC{header}\n{}#+END_SRC", finish_value(&b.value))
        }
        NodeData::DynamicBlock { block_name, arguments } => {
            let args = arguments.as_deref().map(|a| format!(" {a}")).unwrap_or_default();
            format!(
                "#+BEGIN: {block_name}{args}\n{}#+END:",
                finish_value(&children_string(tree, syntax, node)),
            )
        }
        NodeData::Drawer { name } => {
            format!(":{name}:\n{}:END:", finish_value(&children_string(tree, syntax, node)))
        }
        NodeData::PropertyDrawer => {
            format!(":PROPERTIES:\n{}:END:", finish_value(&children_string(tree, syntax, node)))
        }
        NodeData::NodeProperty { key, value } => {
            if value.is_empty() {
                format!(":{key}:")
            } else {
                format!(":{key}: {value}")
            }
        }
        NodeData::Keyword { key, value } => {
            if value.is_empty() {
                format!("#+{key}:")
            } else {
                format!("#+{key}: {value}")
            }
        }
        NodeData::BabelCall(c) => format!("#+CALL: {}", c.value),
        NodeData::Planning(p) => {
            planning_parts(p.closed.as_ref(), p.deadline.as_ref(), p.scheduled.as_ref())
        }
        NodeData::Clock(c) => {
            let mut s = "CLOCK: ".to_owned();
            if let Some(ts) = &c.timestamp {
                s.push_str(&format_timestamp(ts));
            }
            if let Some(d) = &c.duration {
                s.push_str(" => ");
                s.push_str(d);
            }
            s
        }
        NodeData::Comment { value } => prefix_lines("#", value),
        NodeData::FixedWidth { value } => prefix_lines(":", value),
        NodeData::HorizontalRule => "-----".to_owned(),
        NodeData::DiarySexp { value } => value.clone(),
        NodeData::LatexEnvironment { value } => value.clone(),
        NodeData::Table(t) => match &t.value {
            Some(raw) => raw.clone(),
            None => {
                let mut s = children_string(tree, syntax, node);
                for f in &t.tblfm {
                    s.push_str(&format!("#+TBLFM: {f}\n"));
                }
                s
            }
        },
        NodeData::TableRow { rule } => {
            if *rule {
                "|-".to_owned()
            } else {
                format!("|{}", children_string(tree, syntax, node))
            }
        }
        other => unreachable!("not an element: {:?}", other.kind()),
    };
    format!("{prefix}{body}")
}

fn finish_value(value: &str) -> String {
    if value.is_empty() || value.ends_with('\n') {
        value.to_owned()
    } else {
        format!("{value}\n")
    }
}

fn wrap_block(name: &str, header: Option<&str>, contents: &str) -> String {
    let header = header.map(|h| format!(" {h}")).unwrap_or_default();
    format!(
        "#+BEGIN_{name}{header}\n{}#+END_{name}",
        finish_value(contents)
    )
}

fn prefix_lines(marker: &str, value: &str) -> String {
    value
        .split('\n')
        .map(|line| {
            if line.is_empty() {
                marker.to_owned()
            } else {
                format!("{marker} {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Buffer;
    use crate::parse::{ParseOptions, parse_buffer};
    use pretty_assertions::assert_eq;

    fn roundtrip(text: &str) -> String {
        let buf = Buffer::from_str(text);
        let syntax = Syntax::default();
        let tree = parse_buffer(&buf, &syntax, &ParseOptions::default());
        interpret(&tree, &syntax, tree.root())
    }

    #[test]
    fn paragraph_exact() {
        assert_eq!(roundtrip("Hello *world*.\n"), "Hello *world*.\n");
    }

    #[test]
    fn blank_lines_preserved() {
        assert_eq!(roundtrip("one\n\n\ntwo\n"), "one\n\n\ntwo\n");
    }

    #[test]
    fn headline_with_tags_keeps_space() {
        let out = roundtrip("* TODO Task :work:\n");
        assert_eq!(out, "* TODO Task :work:\n");
    }

    #[test]
    fn planning_line_reconstruction() {
        let out = roundtrip("* TODO Task\nSCHEDULED: <2024-01-02 Tue>\n");
        assert_eq!(out, "* TODO Task\nSCHEDULED: <2024-01-02 Tue>\n");
    }

    #[test]
    fn src_block_exact() {
        let text = "#+BEGIN_SRC rust\nfn x() {}\n#+END_SRC\n";
        assert_eq!(roundtrip(text), text);
    }

    #[test]
    fn list_reindented_canonically() {
        let text = "- a\n- b\n  - c\n";
        assert_eq!(roundtrip(text), text);
    }

    #[test]
    fn descriptive_item() {
        let text = "- term :: definition\n";
        assert_eq!(roundtrip(text), text);
    }

    #[test]
    fn table_roundtrip() {
        let text = "| a | b |\n|-\n| c | d |\n";
        assert_eq!(roundtrip(text), text);
    }

    #[test]
    fn fixed_width_and_comment() {
        let text = ": line one\n: line two\n";
        assert_eq!(roundtrip(text), text);
        let text = "# a comment\n";
        assert_eq!(roundtrip(text), text);
    }

    #[test]
    fn drawer_roundtrip() {
        let text = ":LOGBOOK:\nnote\n:END:\n";
        assert_eq!(roundtrip(text), text);
    }

    #[test]
    fn affiliated_restored_in_order() {
        let text = "#+NAME: tbl\n#+CAPTION: cap\n| a |\n";
        assert_eq!(roundtrip(text), text);
    }

    #[test]
    fn tags_right_aligned_with_negative_column() {
        let buf = Buffer::from_str("* Task :work:\n");
        let syntax = Syntax::new(crate::syntax::SyntaxOptions {
            tags_column: -20,
            ..Default::default()
        });
        let tree = parse_buffer(&buf, &syntax, &ParseOptions::default());
        let out = interpret(&tree, &syntax, tree.root());
        // ":work:" ends at column 20.
        assert_eq!(out, "* Task        :work:\n");
    }

    #[test]
    fn item_with_multiline_paragraph() {
        let text = "- first\n  second\n";
        assert_eq!(roundtrip(text), text);
    }

    #[test]
    fn unclosed_block_roundtrips_as_paragraph() {
        let text = "#+BEGIN_SRC\nfoo\n";
        assert_eq!(roundtrip(text), text);
    }
}
