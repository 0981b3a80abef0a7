//! Planning lines (`SCHEDULED:`/`DEADLINE:`/`CLOSED:`) and clock lines.

use crate::ast::{Clock, ClockStatus, Node, NodeData, Planning, Timestamp};
use crate::buffer::Buffer;
use crate::objects::timestamp::parse_timestamp;
use crate::parse::elements::finish_element;
use crate::syntax::Syntax;

/// Parse the timestamp following `keyword` on `line`, if present.
fn stamp_after(line: &str, line_start: usize, keyword: &str) -> Option<Timestamp> {
    let at = line.find(keyword)?;
    let rest = &line[at + keyword.len()..];
    let skipped = rest.len() - rest.trim_start_matches([' ', '\t']).len();
    let stamp_rel = at + keyword.len() + skipped;
    parse_timestamp(&line[stamp_rel..], line_start + stamp_rel).map(|(ts, _)| ts)
}

/// Extract the planning slots of `line`; used both by the planning element
/// and by the headline recognizer when copying the slots upward.
pub(crate) fn planning_slots(
    line: &str,
    line_start: usize,
) -> (Option<Timestamp>, Option<Timestamp>, Option<Timestamp>) {
    (
        stamp_after(line, line_start, Syntax::SCHEDULED),
        stamp_after(line, line_start, Syntax::DEADLINE),
        stamp_after(line, line_start, Syntax::CLOSED),
    )
}

pub(crate) fn planning(buf: &Buffer, pos: usize, limit: usize) -> Node {
    let line = buf.line_str(pos);
    let (scheduled, deadline, closed) = planning_slots(&line, pos);
    let after = buf.next_line_start(pos);
    finish_element(
        buf,
        NodeData::Planning(Planning { scheduled, deadline, closed }),
        pos,
        after,
        limit,
    )
}

pub(crate) fn clock(buf: &Buffer, pos: usize, limit: usize) -> Node {
    let line = buf.line_str(pos);
    let timestamp = stamp_after(&line, pos, Syntax::CLOCK);
    let duration = line
        .find("=>")
        .map(|i| line[i + 2..].trim().to_owned())
        .filter(|d| !d.is_empty());
    let status = if duration.is_some() { ClockStatus::Closed } else { ClockStatus::Running };
    let after = buf.next_line_start(pos);
    finish_element(
        buf,
        NodeData::Clock(Clock { timestamp, duration, status }),
        pos,
        after,
        limit,
    )
}
