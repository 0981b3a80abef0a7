//! LaTeX environments: `\begin{env}` … `\end{env}`.

use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{Affiliated, Node, NodeData};
use crate::buffer::Buffer;
use crate::parse::elements::finish_element;
use crate::syntax::LATEX_ENV_BEGIN_RE;

static LATEX_ENV_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ \t]*\\end\{([A-Za-z0-9*]+)\}[ \t]*$").unwrap());

pub(crate) fn find_environment_end(
    buf: &Buffer,
    name: &str,
    from: usize,
    limit: usize,
) -> Option<usize> {
    let mut cur = from;
    while cur < limit {
        if let Some(caps) = LATEX_ENV_END_RE.captures(&buf.line_str(cur))
            && &caps[1] == name
        {
            return Some(cur);
        }
        cur = buf.next_line_start(cur);
    }
    None
}

/// Declines when the matching `\end{…}` line is missing before `limit`.
pub(crate) fn latex_environment(
    buf: &Buffer,
    begin: usize,
    pos: usize,
    limit: usize,
    affiliated: Option<Box<Affiliated>>,
) -> Option<Node> {
    let line = buf.line_str(pos);
    let caps = LATEX_ENV_BEGIN_RE.captures(&line)?;
    let name = caps[1].to_owned();
    let end_line = find_environment_end(buf, &name, buf.next_line_start(pos), limit)?;
    let after = buf.next_line_start(end_line);
    let value = buf.slice(pos, after).into_owned();
    let mut node = finish_element(buf, NodeData::LatexEnvironment { value }, begin, after, limit);
    node.affiliated = affiliated;
    node.post_affiliated = Some(pos);
    Some(node)
}
