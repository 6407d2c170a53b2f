/// A position in source text, tracking line and column for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }
}

/// A single `name="value"` pair on an open tag.
///
/// Valueless attributes (`<input disabled>`) carry an empty value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
    pub span: Span,
}

/// Event classification for scanned markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// `<!DOCTYPE html>` carries everything after the keyword (`" html"`).
    Doctype(String),

    /// Emitted as soon as a tag name has been read, before its attributes.
    OpenTagStart(String),

    /// One attribute of the tag currently being opened.
    Attribute(Attribute),

    /// A complete open tag. Self-closing tags and HTML void elements are
    /// followed immediately by a matching `CloseTag`.
    OpenTag {
        name: String,
        attributes: Vec<Attribute>,
        self_closing: bool,
    },

    CloseTag(String),

    /// Raw character data, never entity-decoded.
    Text(String),

    /// The content between `<!--` and `-->`.
    Comment(String),
}

/// An event produced by the markup scanner.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub span: Span,
}

impl Event {
    pub fn new(kind: EventKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// HTML5 void elements (self-closing, no children).
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Check if a tag name is an HTML5 void element.
///
/// Matching ignores case, except that names starting with an uppercase letter
/// are component invocations and never void (`<Link>` is not `<link>`).
pub fn is_void_element(tag: &str) -> bool {
    !tag.starts_with(|c: char| c.is_ascii_uppercase())
        && VOID_ELEMENTS.iter().any(|void| void.eq_ignore_ascii_case(tag))
}
