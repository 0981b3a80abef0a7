//! Per-kind property records.
//!
//! Universal fields (`begin`, `end`, `post_blank`, `parent`, contents)
//! live on [`crate::ast::Node`]; everything specific to one construct is
//! carried by its variant of [`NodeData`]. Secondary strings (a headline
//! title, an item tag, an inline footnote definition) are `Vec<NodeId>`
//! fields on the owner's record, with each member's `parent` pointing back
//! at the owner.

use crate::ast::{NodeId, NodeKind};
use crate::buffer::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TodoType {
    Todo,
    Done,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Headline {
    pub level: usize,
    pub todo_keyword: Option<String>,
    pub todo_type: Option<TodoType>,
    pub priority: Option<char>,
    pub commented: bool,
    pub archived: bool,
    pub footnote_section: bool,
    pub raw_value: String,
    /// Raw title region, used for on-demand secondary parsing.
    pub title_span: Option<Span>,
    /// Secondary string: title objects (object granularity only).
    pub title: Vec<NodeId>,
    pub tags: Vec<String>,
    pub scheduled: Option<Timestamp>,
    pub deadline: Option<Timestamp>,
    pub closed: Option<Timestamp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkbox {
    Off,
    On,
    Trans,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub bullet: String,
    pub indent: usize,
    pub counter: Option<u64>,
    pub checkbox: Option<Checkbox>,
    /// Raw description tag region (text before ` :: `).
    pub tag_span: Option<Span>,
    /// Secondary string: tag objects (object granularity only).
    pub tag: Vec<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListType {
    Ordered,
    Unordered,
    Descriptive,
}

/// One item of a precomputed plain-list structure.
#[derive(Debug, Clone, PartialEq)]
pub struct ListItemRecord {
    pub begin: usize,
    pub indent: usize,
    pub bullet: String,
    pub counter: Option<u64>,
    pub checkbox: Option<Checkbox>,
    pub tag_span: Option<Span>,
    /// First content position, after bullet, counter, checkbox and tag.
    pub contents_begin: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlainList {
    pub list_type: ListType,
    /// Structure of every item at or below this list's indentation, shared
    /// shape-wise with nested lists parsed from the same scan.
    pub structure: Vec<ListItemRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableType {
    Org,
    TableEl,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub table_type: TableType,
    pub tblfm: Vec<String>,
    /// Raw text for `table.el` tables, which carry no rows.
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BabelCall {
    pub call: String,
    pub arguments: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockStatus {
    Running,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Clock {
    pub timestamp: Option<Timestamp>,
    pub duration: Option<String>,
    pub status: ClockStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExampleBlock {
    pub switches: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SrcBlock {
    pub language: Option<String>,
    pub switches: Option<String>,
    pub parameters: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Planning {
    pub scheduled: Option<Timestamp>,
    pub deadline: Option<Timestamp>,
    pub closed: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub name: String,
    pub utf8: String,
    pub use_brackets: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FootnoteRefType {
    Standard,
    Inline,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FootnoteReference {
    pub label: Option<String>,
    pub reference_type: FootnoteRefType,
    /// Raw definition region of an inline reference.
    pub definition_span: Option<Span>,
    /// Secondary string: inline definition objects.
    pub inline_definition: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InlineBabelCall {
    pub call: String,
    pub inside_header: Option<String>,
    pub arguments: String,
    pub end_header: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InlineSrcBlock {
    pub language: String,
    pub parameters: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkFormat {
    Plain,
    Angle,
    Bracket,
    Radio,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    /// Scheme for typed links, `fuzzy` for internal ones, `radio` for radio
    /// links.
    pub link_type: String,
    pub path: String,
    pub format: LinkFormat,
    pub raw_link: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacroObject {
    pub key: String,
    pub args: Vec<String>,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampKind {
    Active,
    ActiveRange,
    Inactive,
    InactiveRange,
    Diary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl TimeUnit {
    pub fn suffix(self) -> char {
        match self {
            TimeUnit::Hour => 'h',
            TimeUnit::Day => 'd',
            TimeUnit::Week => 'w',
            TimeUnit::Month => 'm',
            TimeUnit::Year => 'y',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeaterMark {
    /// `+`
    Cumulate,
    /// `++`
    CatchUp,
    /// `.+`
    Restart,
}

impl RepeaterMark {
    pub fn token(self) -> &'static str {
        match self {
            RepeaterMark::Cumulate => "+",
            RepeaterMark::CatchUp => "++",
            RepeaterMark::Restart => ".+",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Repeater {
    pub mark: RepeaterMark,
    pub value: u32,
    pub unit: TimeUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningMark {
    /// `-`
    All,
    /// `--`
    First,
}

impl WarningMark {
    pub fn token(self) -> &'static str {
        match self {
            WarningMark::All => "-",
            WarningMark::First => "--",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Warning {
    pub mark: WarningMark,
    pub value: u32,
    pub unit: TimeUnit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datetime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    /// Day-of-week text as written, kept so interpretation does not need a
    /// calendar.
    pub dayname: Option<String>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
}

/// A timestamp, usable both as a node payload and as a property value
/// (planning slots, headline scheduling copies).
#[derive(Debug, Clone, PartialEq)]
pub struct Timestamp {
    pub kind: TimestampKind,
    pub raw_value: String,
    pub date_start: Option<Datetime>,
    pub date_end: Option<Datetime>,
    pub repeater: Option<Repeater>,
    pub warning: Option<Warning>,
    /// Buffer region of the timestamp text.
    pub span: Span,
}

/// One collected affiliated line, in original buffer order.
#[derive(Debug, Clone, PartialEq)]
pub struct AffiliatedEntry {
    /// Normalized key: lower-case, aliases translated (`data` → `name`,
    /// `result` → `results`, `headers` → `header`).
    pub key: String,
    /// Bracketed secondary value of dual keys (`#+CAPTION[short]: long`).
    pub dual: Option<String>,
    pub value: String,
    /// Region of the primary value, for on-demand object parsing of parsed
    /// keys.
    pub value_span: Span,
}

/// Affiliated metadata block preceding an element.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Affiliated {
    pub entries: Vec<AffiliatedEntry>,
}

impl Affiliated {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Last value recorded for `key` (multi keys accumulate; the most
    /// recent wins for single-valued access).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }

    pub fn all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a AffiliatedEntry> {
        self.entries.iter().filter(move |e| e.key == key)
    }
}

/// The tagged sum over every construct the grammar produces.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Document,
    PlainText { value: String },

    // Greater elements.
    CenterBlock,
    Drawer { name: String },
    DynamicBlock { block_name: String, arguments: Option<String> },
    FootnoteDefinition { label: String },
    Headline(Headline),
    Inlinetask(Headline),
    Item(Item),
    PlainList(PlainList),
    PropertyDrawer,
    QuoteBlock,
    Section,
    SpecialBlock { block_type: String, parameters: Option<String> },
    Table(Table),

    // Leaf elements.
    BabelCall(BabelCall),
    Clock(Clock),
    Comment { value: String },
    CommentBlock { value: String },
    DiarySexp { value: String },
    ExampleBlock(ExampleBlock),
    ExportBlock { backend: String, value: String },
    FixedWidth { value: String },
    HorizontalRule,
    Keyword { key: String, value: String },
    LatexEnvironment { value: String },
    NodeProperty { key: String, value: String },
    Paragraph,
    Planning(Planning),
    SrcBlock(SrcBlock),
    TableRow { rule: bool },
    VerseBlock,

    // Objects.
    Bold,
    Code { value: String },
    Entity(Entity),
    ExportSnippet { backend: String, value: String },
    FootnoteReference(FootnoteReference),
    InlineBabelCall(InlineBabelCall),
    InlineSrcBlock(InlineSrcBlock),
    Italic,
    LatexFragment { value: String },
    LineBreak,
    Link(Link),
    Macro(MacroObject),
    RadioTarget,
    StatisticsCookie { value: String },
    StrikeThrough,
    Subscript { use_brackets: bool },
    Superscript { use_brackets: bool },
    TableCell,
    Target { value: String },
    Timestamp(Timestamp),
    Underline,
    Verbatim { value: String },
}

impl NodeData {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Document => NodeKind::Document,
            NodeData::PlainText { .. } => NodeKind::PlainText,
            NodeData::CenterBlock => NodeKind::CenterBlock,
            NodeData::Drawer { .. } => NodeKind::Drawer,
            NodeData::DynamicBlock { .. } => NodeKind::DynamicBlock,
            NodeData::FootnoteDefinition { .. } => NodeKind::FootnoteDefinition,
            NodeData::Headline(_) => NodeKind::Headline,
            NodeData::Inlinetask(_) => NodeKind::Inlinetask,
            NodeData::Item(_) => NodeKind::Item,
            NodeData::PlainList(_) => NodeKind::PlainList,
            NodeData::PropertyDrawer => NodeKind::PropertyDrawer,
            NodeData::QuoteBlock => NodeKind::QuoteBlock,
            NodeData::Section => NodeKind::Section,
            NodeData::SpecialBlock { .. } => NodeKind::SpecialBlock,
            NodeData::Table(_) => NodeKind::Table,
            NodeData::BabelCall(_) => NodeKind::BabelCall,
            NodeData::Clock(_) => NodeKind::Clock,
            NodeData::Comment { .. } => NodeKind::Comment,
            NodeData::CommentBlock { .. } => NodeKind::CommentBlock,
            NodeData::DiarySexp { .. } => NodeKind::DiarySexp,
            NodeData::ExampleBlock(_) => NodeKind::ExampleBlock,
            NodeData::ExportBlock { .. } => NodeKind::ExportBlock,
            NodeData::FixedWidth { .. } => NodeKind::FixedWidth,
            NodeData::HorizontalRule => NodeKind::HorizontalRule,
            NodeData::Keyword { .. } => NodeKind::Keyword,
            NodeData::LatexEnvironment { .. } => NodeKind::LatexEnvironment,
            NodeData::NodeProperty { .. } => NodeKind::NodeProperty,
            NodeData::Paragraph => NodeKind::Paragraph,
            NodeData::Planning(_) => NodeKind::Planning,
            NodeData::SrcBlock(_) => NodeKind::SrcBlock,
            NodeData::TableRow { .. } => NodeKind::TableRow,
            NodeData::VerseBlock => NodeKind::VerseBlock,
            NodeData::Bold => NodeKind::Bold,
            NodeData::Code { .. } => NodeKind::Code,
            NodeData::Entity(_) => NodeKind::Entity,
            NodeData::ExportSnippet { .. } => NodeKind::ExportSnippet,
            NodeData::FootnoteReference(_) => NodeKind::FootnoteReference,
            NodeData::InlineBabelCall(_) => NodeKind::InlineBabelCall,
            NodeData::InlineSrcBlock(_) => NodeKind::InlineSrcBlock,
            NodeData::Italic => NodeKind::Italic,
            NodeData::LatexFragment { .. } => NodeKind::LatexFragment,
            NodeData::LineBreak => NodeKind::LineBreak,
            NodeData::Link(_) => NodeKind::Link,
            NodeData::Macro(_) => NodeKind::Macro,
            NodeData::RadioTarget => NodeKind::RadioTarget,
            NodeData::StatisticsCookie { .. } => NodeKind::StatisticsCookie,
            NodeData::StrikeThrough => NodeKind::StrikeThrough,
            NodeData::Subscript { .. } => NodeKind::Subscript,
            NodeData::Superscript { .. } => NodeKind::Superscript,
            NodeData::TableCell => NodeKind::TableCell,
            NodeData::Target { .. } => NodeKind::Target,
            NodeData::Timestamp(_) => NodeKind::Timestamp,
            NodeData::Underline => NodeKind::Underline,
            NodeData::Verbatim { .. } => NodeKind::Verbatim,
        }
    }

    /// Secondary-string fields of this payload, in a fixed order.
    pub fn secondary(&self) -> Vec<&Vec<NodeId>> {
        match self {
            NodeData::Headline(h) | NodeData::Inlinetask(h) => vec![&h.title],
            NodeData::Item(i) => vec![&i.tag],
            NodeData::FootnoteReference(f) => vec![&f.inline_definition],
            _ => Vec::new(),
        }
    }

    pub fn secondary_mut(&mut self) -> Vec<&mut Vec<NodeId>> {
        match self {
            NodeData::Headline(h) | NodeData::Inlinetask(h) => vec![&mut h.title],
            NodeData::Item(i) => vec![&mut i.tag],
            NodeData::FootnoteReference(f) => vec![&mut f.inline_definition],
            _ => Vec::new(),
        }
    }
}
