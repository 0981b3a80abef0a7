//! Parser, interpreter and incremental element cache for org-structured
//! markup.
//!
//! The engine consumes a text buffer and produces a typed syntax tree of
//! block-level elements and inline objects, converts trees back to
//! canonical text, and keeps a long-lived [`Document`]'s tree up to date
//! across edits through a staged, resumable synchronization protocol.
//!
//! ```rust
//! use orgweave_engine::{Document, Granularity, NodeKind};
//!
//! let mut doc = Document::from_str("* TODO Ship it :work:\nSome *bold* text.\n");
//! let id = doc.element_at(30);
//! assert_eq!(doc.node(id).unwrap().kind(), NodeKind::Paragraph);
//!
//! // Structural round-trip: reparse of the rendering matches the parse.
//! let rendered = doc.render();
//! assert_eq!(rendered, doc.text());
//!
//! // Trees can also be built without a document.
//! let tree = doc.parse(Granularity::Object);
//! assert!(tree.sexp(tree.root()).contains("headline"));
//! ```

pub mod ast;
pub mod buffer;
pub mod cache;
pub mod editing;
pub mod error;
pub mod host;
pub mod interpret;
pub mod io;
mod objects;
pub mod parse;
pub mod syntax;

pub use ast::{Node, NodeData, NodeId, NodeKind, Restriction, Tree, object_restriction};
pub use buffer::{Buffer, Span};
pub use cache::{CacheKey, ElementCache};
pub use editing::Document;
pub use error::{StructuralError, SyncStatus};
pub use host::{InputProbe, NeverPending, SyncBudget, VisibilityMask};
pub use interpret::interpret;
pub use parse::{Granularity, ParseOptions, parse_buffer};
pub use syntax::{Syntax, SyntaxOptions};
