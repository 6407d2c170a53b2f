//! glint Renderer
//!
//! Evaluates clauses against a [`Context`] and [`Functions`], and renders
//! compiled templates to strings.
//!
//! ```text
//! template text → load_template() → TemplateElement tree → render() → String
//!                                        ↑
//!                      Clause → Evaluator (Context + Functions) → Value
//! ```
//!
//! # Example
//!
//! ```
//! use glint_render::{render_string, Context, Functions, Value};
//!
//! let ctx = Context::new().with("name", "world");
//! let functions = Functions::new().with("shout", |args| {
//!     let text = args.first().and_then(Value::as_str).unwrap_or_default();
//!     Ok(Value::from(text.to_uppercase()))
//! });
//! let out = render_string("<p>{{ name | shout }}</p>", &ctx, &functions, None).unwrap();
//! assert_eq!(out, "<p>WORLD</p>");
//! ```

pub mod eval;
pub mod functions;
pub mod html;
pub mod value;

use glint_parser::{
    load_template_with_options, Clause, LoadError, LoadOptions, Loader, TemplateElement,
    TemplateError,
};

pub use eval::Evaluator;
pub use functions::{arg, callable, Callable, FunctionEntry, Functions, Output};
pub use glint_parser::build_clause;
pub use html::Renderer;
pub use value::{format_number, Context, Map, Value};

/// Failure while evaluating a clause or rendering a template.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    /// A variable, key, index or function is missing.
    #[error("{0}")]
    NotFound(String),

    /// An operand or value has the wrong kind.
    #[error("{0}")]
    Type(String),

    /// A function was called the wrong way: a namespace called, a filter factory misused.
    #[error("{0}")]
    Call(String),

    /// Raised by a user-supplied callable.
    #[error("{0}")]
    Function(String),
}

/// Error returned by [`render_string`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Evaluate a clause to a [`Value`].
pub fn evaluate_clause(clause: &Clause, ctx: &Context, functions: &Functions) -> Result<Value, EvalError> {
    Evaluator::new(functions).evaluate(clause, ctx)
}

/// Evaluate a clause for output. Strings, numbers and null convert; other kinds are an error.
pub fn evaluate_clause_as_string(
    clause: &Clause,
    ctx: &Context,
    functions: &Functions,
) -> Result<String, EvalError> {
    Evaluator::new(functions).evaluate_as_str(clause, ctx)
}

/// Evaluate a clause as a condition. Empty lists and maps are false.
pub fn evaluate_clause_as_bool(
    clause: &Clause,
    ctx: &Context,
    functions: &Functions,
) -> Result<bool, EvalError> {
    Evaluator::new(functions).evaluate_as_bool(clause, ctx)
}

/// Render a compiled template.
pub fn render(template: &[TemplateElement], ctx: &Context, functions: &Functions) -> Result<String, EvalError> {
    Renderer::new(functions).render(template, ctx)
}

/// Load, compile and render `text` in one step.
///
/// `text` is served under [`LoadOptions::root_name`]; any other path,
/// such as the file of an external component, goes to `loader`.
pub fn render_string(
    text: &str,
    ctx: &Context,
    functions: &Functions,
    loader: Option<&dyn Loader>,
) -> Result<String, Error> {
    render_string_with_options(text, ctx, functions, loader, &LoadOptions::default())
}

/// [`render_string`] with explicit options.
pub fn render_string_with_options(
    text: &str,
    ctx: &Context,
    functions: &Functions,
    loader: Option<&dyn Loader>,
    options: &LoadOptions,
) -> Result<String, Error> {
    let root_name = options.root_name.as_str();
    let string_loader = |path: &str| -> Result<Vec<u8>, LoadError> {
        if path == root_name {
            return Ok(text.as_bytes().to_vec());
        }
        match loader {
            Some(loader) => loader.load(path),
            None => Err(LoadError::NotFound { path: path.into() }),
        }
    };

    let template = load_template_with_options(root_name, &string_loader, options)?;
    Ok(render(&template, ctx, functions)?)
}
