//! Typed syntax tree: kinds, nodes, arena and algebra.

pub mod algebra;
pub mod node;
pub mod payload;

pub use node::{Node, NodeId, Tree};
pub use payload::*;

/// Every construct the grammar can produce, plus the `Document` and
/// `PlainText` sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    PlainText,

    // Greater elements.
    CenterBlock,
    Drawer,
    DynamicBlock,
    FootnoteDefinition,
    Headline,
    Inlinetask,
    Item,
    PlainList,
    PropertyDrawer,
    QuoteBlock,
    Section,
    SpecialBlock,
    Table,

    // Leaf elements.
    BabelCall,
    Clock,
    Comment,
    CommentBlock,
    DiarySexp,
    ExampleBlock,
    ExportBlock,
    FixedWidth,
    HorizontalRule,
    Keyword,
    LatexEnvironment,
    NodeProperty,
    Paragraph,
    Planning,
    SrcBlock,
    TableRow,
    VerseBlock,

    // Objects.
    Bold,
    Code,
    Entity,
    ExportSnippet,
    FootnoteReference,
    InlineBabelCall,
    InlineSrcBlock,
    Italic,
    LatexFragment,
    LineBreak,
    Link,
    Macro,
    RadioTarget,
    StatisticsCookie,
    StrikeThrough,
    Subscript,
    Superscript,
    TableCell,
    Target,
    Timestamp,
    Underline,
    Verbatim,
}

impl NodeKind {
    /// Container elements whose children are elements, never objects.
    pub fn is_greater_element(self) -> bool {
        matches!(
            self,
            NodeKind::CenterBlock
                | NodeKind::Drawer
                | NodeKind::DynamicBlock
                | NodeKind::FootnoteDefinition
                | NodeKind::Headline
                | NodeKind::Inlinetask
                | NodeKind::Item
                | NodeKind::PlainList
                | NodeKind::PropertyDrawer
                | NodeKind::QuoteBlock
                | NodeKind::Section
                | NodeKind::SpecialBlock
                | NodeKind::Table
        )
    }

    pub fn is_element(self) -> bool {
        self.is_greater_element()
            || matches!(
                self,
                NodeKind::BabelCall
                    | NodeKind::Clock
                    | NodeKind::Comment
                    | NodeKind::CommentBlock
                    | NodeKind::DiarySexp
                    | NodeKind::ExampleBlock
                    | NodeKind::ExportBlock
                    | NodeKind::FixedWidth
                    | NodeKind::HorizontalRule
                    | NodeKind::Keyword
                    | NodeKind::LatexEnvironment
                    | NodeKind::NodeProperty
                    | NodeKind::Paragraph
                    | NodeKind::Planning
                    | NodeKind::SrcBlock
                    | NodeKind::TableRow
                    | NodeKind::VerseBlock
            )
    }

    pub fn is_object(self) -> bool {
        !self.is_element() && !matches!(self, NodeKind::Document)
    }

    /// Objects whose contents are themselves objects.
    pub fn is_recursive_object(self) -> bool {
        matches!(
            self,
            NodeKind::Bold
                | NodeKind::Italic
                | NodeKind::Link
                | NodeKind::RadioTarget
                | NodeKind::StrikeThrough
                | NodeKind::Subscript
                | NodeKind::Superscript
                | NodeKind::TableCell
                | NodeKind::Underline
        )
    }

    /// Elements whose contents are lexed as objects.
    pub fn element_admits_objects(self) -> bool {
        matches!(
            self,
            NodeKind::Paragraph | NodeKind::VerseBlock | NodeKind::TableRow
        )
    }

    /// Greater elements that tolerate arbitrary edits strictly inside their
    /// contents: the synchronizer shifts their ends instead of pruning them.
    /// Headlines are handled separately since outline edits invalidate them.
    pub fn is_robust_container(self) -> bool {
        matches!(
            self,
            NodeKind::CenterBlock
                | NodeKind::Drawer
                | NodeKind::DynamicBlock
                | NodeKind::Inlinetask
                | NodeKind::PropertyDrawer
                | NodeKind::QuoteBlock
                | NodeKind::SpecialBlock
        )
    }

    /// Kind name as printed in tree dumps.
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::PlainText => "plain-text",
            NodeKind::CenterBlock => "center-block",
            NodeKind::Drawer => "drawer",
            NodeKind::DynamicBlock => "dynamic-block",
            NodeKind::FootnoteDefinition => "footnote-definition",
            NodeKind::Headline => "headline",
            NodeKind::Inlinetask => "inlinetask",
            NodeKind::Item => "item",
            NodeKind::PlainList => "plain-list",
            NodeKind::PropertyDrawer => "property-drawer",
            NodeKind::QuoteBlock => "quote-block",
            NodeKind::Section => "section",
            NodeKind::SpecialBlock => "special-block",
            NodeKind::Table => "table",
            NodeKind::BabelCall => "babel-call",
            NodeKind::Clock => "clock",
            NodeKind::Comment => "comment",
            NodeKind::CommentBlock => "comment-block",
            NodeKind::DiarySexp => "diary-sexp",
            NodeKind::ExampleBlock => "example-block",
            NodeKind::ExportBlock => "export-block",
            NodeKind::FixedWidth => "fixed-width",
            NodeKind::HorizontalRule => "horizontal-rule",
            NodeKind::Keyword => "keyword",
            NodeKind::LatexEnvironment => "latex-environment",
            NodeKind::NodeProperty => "node-property",
            NodeKind::Paragraph => "paragraph",
            NodeKind::Planning => "planning",
            NodeKind::SrcBlock => "src-block",
            NodeKind::TableRow => "table-row",
            NodeKind::VerseBlock => "verse-block",
            NodeKind::Bold => "bold",
            NodeKind::Code => "code",
            NodeKind::Entity => "entity",
            NodeKind::ExportSnippet => "export-snippet",
            NodeKind::FootnoteReference => "footnote-reference",
            NodeKind::InlineBabelCall => "inline-babel-call",
            NodeKind::InlineSrcBlock => "inline-src-block",
            NodeKind::Italic => "italic",
            NodeKind::LatexFragment => "latex-fragment",
            NodeKind::LineBreak => "line-break",
            NodeKind::Link => "link",
            NodeKind::Macro => "macro",
            NodeKind::RadioTarget => "radio-target",
            NodeKind::StatisticsCookie => "statistics-cookie",
            NodeKind::StrikeThrough => "strike-through",
            NodeKind::Subscript => "subscript",
            NodeKind::Superscript => "superscript",
            NodeKind::TableCell => "table-cell",
            NodeKind::Target => "target",
            NodeKind::Timestamp => "timestamp",
            NodeKind::Underline => "underline",
            NodeKind::Verbatim => "verbatim",
        }
    }
}

const OBJECT_KINDS: &[NodeKind] = &[
    NodeKind::Bold,
    NodeKind::Code,
    NodeKind::Entity,
    NodeKind::ExportSnippet,
    NodeKind::FootnoteReference,
    NodeKind::InlineBabelCall,
    NodeKind::InlineSrcBlock,
    NodeKind::Italic,
    NodeKind::LatexFragment,
    NodeKind::LineBreak,
    NodeKind::Link,
    NodeKind::Macro,
    NodeKind::RadioTarget,
    NodeKind::StatisticsCookie,
    NodeKind::StrikeThrough,
    NodeKind::Subscript,
    NodeKind::Superscript,
    NodeKind::TableCell,
    NodeKind::Target,
    NodeKind::Timestamp,
    NodeKind::Underline,
    NodeKind::Verbatim,
];

/// Set of object kinds permitted inside a container, as a bit mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Restriction(u32);

impl Restriction {
    pub const EMPTY: Restriction = Restriction(0);

    fn bit(kind: NodeKind) -> Option<u32> {
        OBJECT_KINDS.iter().position(|k| *k == kind).map(|i| 1 << i)
    }

    pub fn of(kinds: &[NodeKind]) -> Restriction {
        let mut mask = 0;
        for kind in kinds {
            if let Some(bit) = Self::bit(*kind) {
                mask |= bit;
            }
        }
        Restriction(mask)
    }

    pub fn allows(self, kind: NodeKind) -> bool {
        Self::bit(kind).is_some_and(|bit| self.0 & bit != 0)
    }

    pub fn without(self, kind: NodeKind) -> Restriction {
        match Self::bit(kind) {
            Some(bit) => Restriction(self.0 & !bit),
            None => self,
        }
    }

    pub fn with(self, kind: NodeKind) -> Restriction {
        match Self::bit(kind) {
            Some(bit) => Restriction(self.0 | bit),
            None => self,
        }
    }

    /// Every object kind except table cells.
    pub fn standard() -> Restriction {
        let mut mask = 0;
        for kind in OBJECT_KINDS {
            if *kind != NodeKind::TableCell {
                mask |= Self::bit(*kind).unwrap_or(0);
            }
        }
        Restriction(mask)
    }

    /// Plain markup only: nothing that resolves to another buffer location.
    pub fn minimal() -> Restriction {
        Restriction::of(&[
            NodeKind::Bold,
            NodeKind::Code,
            NodeKind::Entity,
            NodeKind::Italic,
            NodeKind::LatexFragment,
            NodeKind::StrikeThrough,
            NodeKind::Subscript,
            NodeKind::Superscript,
            NodeKind::Underline,
            NodeKind::Verbatim,
        ])
    }
}

/// `R(kind)`: object kinds allowed directly inside `kind`.
pub fn object_restriction(kind: NodeKind) -> Restriction {
    match kind {
        // Element contents.
        NodeKind::Paragraph | NodeKind::VerseBlock => Restriction::standard(),
        NodeKind::TableRow => Restriction::of(&[NodeKind::TableCell]),
        // Secondary strings.
        NodeKind::Headline | NodeKind::Inlinetask => {
            Restriction::standard().without(NodeKind::LineBreak)
        }
        NodeKind::Item => Restriction::minimal().with(NodeKind::FootnoteReference),
        NodeKind::FootnoteReference => Restriction::standard(),
        NodeKind::Keyword => Restriction::standard().without(NodeKind::FootnoteReference),
        // Recursive objects.
        NodeKind::Bold
        | NodeKind::Italic
        | NodeKind::StrikeThrough
        | NodeKind::Underline
        | NodeKind::Subscript
        | NodeKind::Superscript => Restriction::standard(),
        NodeKind::Link => Restriction::minimal()
            .with(NodeKind::ExportSnippet)
            .with(NodeKind::InlineBabelCall)
            .with(NodeKind::InlineSrcBlock)
            .with(NodeKind::Macro)
            .with(NodeKind::StatisticsCookie),
        NodeKind::RadioTarget => Restriction::minimal(),
        NodeKind::TableCell => Restriction::minimal()
            .with(NodeKind::ExportSnippet)
            .with(NodeKind::FootnoteReference)
            .with(NodeKind::Link)
            .with(NodeKind::Macro)
            .with(NodeKind::RadioTarget)
            .with(NodeKind::Target)
            .with(NodeKind::Timestamp),
        _ => Restriction::EMPTY,
    }
}
