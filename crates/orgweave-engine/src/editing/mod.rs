//! Long-lived editing support on top of the incremental cache.

pub mod document;

pub use document::Document;
