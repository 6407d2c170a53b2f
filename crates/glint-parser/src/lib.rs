//! glint Parser
//!
//! Turns template source into the finalized `TemplateElement` tree:
//!
//! - [`expr_lexer`] and [`expr_parser`] build expression `Clause`s,
//! - [`parser`] reads one file's markup events into a temporary tree and
//!   registers the components it defines or references,
//! - [`loader`] resolves referenced component files through a [`Loader`],
//! - [`compile`] classifies attributes and binds component invocations.
//!
//! # Example
//!
//! ```
//! use glint_parser::{load_template, MemoryLoader};
//!
//! let loader = MemoryLoader::new().with_file("page.html", "<p>{{ title }}</p>");
//! let template = load_template("page.html", &loader).unwrap();
//! assert_eq!(template.len(), 1);
//! ```

pub mod ast;
pub mod compile;
pub mod expr_lexer;
pub mod expr_parser;
pub mod loader;
pub mod parser;
pub mod registry;

pub use ast::{Clause, Location, Segment, TemplateElement};
pub use expr_parser::ExprParser;
pub use loader::{
    load_template, load_template_with_options, FileSystemLoader, LoadOptions, Loader, MemoryLoader,
};
pub use parser::{split_interpolations, FileParser};
pub use registry::Registry;

/// Build a `Clause` from expression source text.
pub fn build_clause(expression: &str) -> Result<Clause, SyntaxError> {
    ExprParser::parse(expression)
}

/// Lexical or syntactic error in an expression.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Syntax error at position {position}: {message}")]
pub struct SyntaxError {
    pub message: String,
    /// 0-based character offset in the expression.
    pub position: usize,
}

/// Template error with file and position information.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Parse error in {file} at line {line}, column {column}: {message}")]
pub struct ParseError {
    pub message: String,
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, file: impl Into<String>, loc: Location) -> Self {
        Self {
            message: message.into(),
            file: file.into(),
            line: loc.line,
            column: loc.col,
        }
    }
}

/// Failure to fetch a template file.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("template \"{path}\" not found")]
    NotFound { path: String },

    #[error("unable to read template \"{path}\": {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("template \"{path}\" is not valid UTF-8")]
    InvalidUtf8 { path: String },

    #[error("template \"{path}\" references itself through its components: {chain}")]
    Cycle { path: String, chain: String },

    #[error("component \"{name}\" is not defined in \"{path}\"")]
    MissingComponent { name: String, path: String },
}

/// Error returned by [`load_template`].
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Load(#[from] LoadError),
}
