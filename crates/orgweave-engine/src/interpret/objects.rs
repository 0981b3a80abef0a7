//! Per-object formatters.

use crate::ast::{Datetime, LinkFormat, Node, NodeData, NodeId, Timestamp, TimestampKind, Tree};
use crate::syntax::Syntax;

pub(crate) fn interpret_object(tree: &Tree, syntax: &Syntax, node: &Node) -> String {
    let contents = || objects_string(tree, syntax, &node.children);
    let body = match &node.data {
        NodeData::PlainText { value } => value.clone(),
        NodeData::Bold => format!("*{}*", contents()),
        NodeData::Italic => format!("/{}/", contents()),
        NodeData::Underline => format!("_{}_", contents()),
        NodeData::StrikeThrough => format!("+{}+", contents()),
        NodeData::Code { value } => format!("~{value}~"),
        NodeData::Verbatim { value } => format!("={value}="),
        NodeData::Entity(e) => {
            if e.use_brackets {
                format!("\\{}{{}}", e.name)
            } else {
                format!("\\{}", e.name)
            }
        }
        NodeData::LatexFragment { value } => value.clone(),
        NodeData::ExportSnippet { backend, value } => format!("@@{backend}:{value}@@"),
        NodeData::FootnoteReference(f) => {
            let label = f.label.as_deref().unwrap_or("");
            if f.inline_definition.is_empty() && f.definition_span.is_none() {
                format!("[fn:{label}]")
            } else {
                let def = objects_string(tree, syntax, &f.inline_definition);
                format!("[fn:{label}:{def}]")
            }
        }
        NodeData::InlineBabelCall(c) => c.value.clone(),
        NodeData::InlineSrcBlock(b) => match &b.parameters {
            Some(p) => format!("src_{}[{}]{{{}}}", b.language, p, b.value),
            None => format!("src_{}{{{}}}", b.language, b.value),
        },
        NodeData::LineBreak => "\\\\\n".to_owned(),
        NodeData::Link(l) => match l.format {
            LinkFormat::Plain => l.raw_link.clone(),
            LinkFormat::Angle => format!("<{}>", l.raw_link),
            LinkFormat::Radio => l.path.clone(),
            LinkFormat::Bracket => {
                if node.children.is_empty() {
                    format!("[[{}]]", l.raw_link)
                } else {
                    format!("[[{}][{}]]", l.raw_link, contents())
                }
            }
        },
        NodeData::Macro(m) => m.value.clone(),
        NodeData::RadioTarget => format!("<<<{}>>>", contents()),
        NodeData::StatisticsCookie { value } => value.clone(),
        NodeData::Target { value } => format!("<<{value}>>"),
        NodeData::Subscript { use_brackets } => script_text('_', *use_brackets, &contents()),
        NodeData::Superscript { use_brackets } => script_text('^', *use_brackets, &contents()),
        NodeData::Timestamp(ts) => format_timestamp(ts),
        NodeData::TableCell => format!(" {} |", contents()),
        other => unreachable!("not an object: {:?}", other.kind()),
    };
    format!("{body}{}", " ".repeat(node.post_blank))
}

fn script_text(marker: char, brackets: bool, contents: &str) -> String {
    if brackets {
        format!("{marker}{{{contents}}}")
    } else {
        format!("{marker}{contents}")
    }
}

/// Interpret a sequence of sibling objects.
pub(crate) fn objects_string(tree: &Tree, syntax: &Syntax, ids: &[NodeId]) -> String {
    let mut out = String::new();
    for id in ids {
        if let Some(node) = tree.get(*id) {
            out.push_str(&interpret_object(tree, syntax, node));
        }
    }
    out
}

fn format_moment(d: &Datetime, time_range_end: Option<&Datetime>) -> String {
    let mut s = format!("{:04}-{:02}-{:02}", d.year, d.month, d.day);
    if let Some(name) = &d.dayname {
        s.push(' ');
        s.push_str(name);
    }
    if let (Some(h), Some(m)) = (d.hour, d.minute) {
        s.push_str(&format!(" {h:02}:{m:02}"));
        if let Some(end) = time_range_end
            && let (Some(eh), Some(em)) = (end.hour, end.minute)
        {
            s.push_str(&format!("-{eh:02}:{em:02}"));
        }
    }
    s
}

fn stamp_suffix(ts: &Timestamp) -> String {
    let mut s = String::new();
    if let Some(rep) = &ts.repeater {
        s.push_str(&format!(" {}{}{}", rep.mark.token(), rep.value, rep.unit.suffix()));
    }
    if let Some(warn) = &ts.warning {
        s.push_str(&format!(" {}{}{}", warn.mark.token(), warn.value, warn.unit.suffix()));
    }
    s
}

/// Reconstruct a timestamp from its parsed fields.
pub(crate) fn format_timestamp(ts: &Timestamp) -> String {
    if ts.kind == TimestampKind::Diary {
        return ts.raw_value.clone();
    }
    let (open, close) = match ts.kind {
        TimestampKind::Active | TimestampKind::ActiveRange => ('<', '>'),
        _ => ('[', ']'),
    };
    let Some(start) = &ts.date_start else {
        return ts.raw_value.clone();
    };
    let end = ts.date_end.as_ref().unwrap_or(start);
    let same_day = (start.year, start.month, start.day) == (end.year, end.month, end.day);
    let ranged = matches!(ts.kind, TimestampKind::ActiveRange | TimestampKind::InactiveRange);

    if !ranged || (same_day && start.hour == end.hour && start.minute == end.minute) {
        format!("{open}{}{}{close}", format_moment(start, None), stamp_suffix(ts))
    } else if same_day && start.hour.is_some() && end.hour.is_some() {
        // Time range inside one stamp.
        format!("{open}{}{}{close}", format_moment(start, Some(end)), stamp_suffix(ts))
    } else {
        format!(
            "{open}{}{}{close}--{open}{}{close}",
            format_moment(start, None),
            stamp_suffix(ts),
            format_moment(end, None),
        )
    }
}
