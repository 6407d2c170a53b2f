//! glint Lexer
//!
//! Scans template markup into a flat stream of events: doctype, open-tag
//! start, attribute, open tag, close tag, text and comment. Every event
//! carries the line and column it started at.
//!
//! Documents that begin with a doctype are scanned in document mode; anything
//! else is a fragment and may have any number of top-level nodes.
//!
//! # Example
//!
//! ```
//! use glint_lexer::{EventKind, Scanner};
//!
//! let events = Scanner::scan("<b>hi</b>").unwrap();
//! assert!(matches!(events[0].kind, EventKind::OpenTagStart(_)));
//! assert_eq!(events.len(), 4); // OpenTagStart, OpenTag, Text, CloseTag
//! ```

pub mod event;
pub mod scanner;

pub use event::{is_void_element, Attribute, Event, EventKind, Span};
pub use scanner::{Scanner, ScannerMode};

/// Lexer error with position information.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Lexer error at line {line}, column {column}: {message}")]
pub struct LexerError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}
