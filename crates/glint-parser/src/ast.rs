//! Abstract Syntax Trees for glint.
//!
//! Contains both expression-level nodes (`Clause`, produced by the clause
//! builder) and the finalized template tree (`TemplateElement`, produced by the
//! template compiler and consumed by the renderer).

// ---------------------------------------------------------------------------
// Expression-level AST
// ---------------------------------------------------------------------------

/// A node in the expression AST.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Variable lookup with an optional access chain: `user.address.?city`
    Var(Var),

    /// String literal: `"hello"`, `'world'`
    Str(String),

    /// Numeric literal: `42`, `1_000.5`
    Num(f64),

    /// Boolean literal: `true`, `False`
    Bool(bool),

    /// Parenthesized group with more than one argument: `(1, 2, 3)`
    List(Vec<Clause>),

    /// Function call: `format_date(created, "short")`
    Func(Func),

    /// Unary modifier: `!active`, `-count`
    Modified {
        op: Modifier,
        element: Box<Clause>,
    },

    /// Operator applied to a left operand and one or more right operands.
    Operation(Operation),
}

/// A variable reference: a symbol plus the access steps that follow it.
#[derive(Debug, Clone, PartialEq)]
pub struct Var {
    pub symbol: String,
    pub chain: Vec<ChainElement>,
}

impl Var {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            chain: Vec::new(),
        }
    }
}

/// One `.key`, `.?key` or `[key]` step of an access path.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainElement {
    pub op: ChainOp,
    pub lookup: Lookup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOp {
    /// `.` and bare `[...]`: a missing key is an error.
    Required,
    /// `.?`: a missing key yields null.
    Optional,
}

/// The key of a chain step.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// `.name` or `["name"]`
    Str(String),
    /// `[0]`
    Num(f64),
    /// `[name]`: the key is the value of `name` in the context.
    Symbol(String),
}

/// A call of the function found at `var` in the functions namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct Func {
    pub var: Var,
    pub args: Vec<Clause>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    /// `!x`, `not x`
    Not,
    /// `-x`
    Negate,
}

/// `args[0]` is the left operand, the rest are right-hand operands.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub operator: Operator,
    pub args: Vec<Clause>,
}

/// Binary operators, listed from tightest to loosest binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Pipe,
    Mult,
    Div,
    Add,
    Sub,
    Eq,
    Neq,
    In,
    NotIn,
    And,
    Or,
}

impl Operator {
    /// Reduction order used by the clause builder. `In` and `NotIn` share a level.
    pub const PRECEDENCE: &'static [&'static [Operator]] = &[
        &[Operator::Pipe],
        &[Operator::Mult],
        &[Operator::Div],
        &[Operator::Add],
        &[Operator::Sub],
        &[Operator::Eq],
        &[Operator::Neq],
        &[Operator::In, Operator::NotIn],
        &[Operator::And],
        &[Operator::Or],
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Pipe => "|",
            Operator::Mult => "*",
            Operator::Div => "/",
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Eq => "==",
            Operator::Neq => "!=",
            Operator::In => "in",
            Operator::NotIn => "not in",
            Operator::And => "&&",
            Operator::Or => "||",
        }
    }

    /// Chained containment (`a in b in c`) is ambiguous and rejected.
    pub fn allows_chaining(self) -> bool {
        !matches!(self, Operator::In | Operator::NotIn)
    }
}

// ---------------------------------------------------------------------------
// Template-level AST
// ---------------------------------------------------------------------------

/// A 1-based position in a template file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    pub line: usize,
    pub col: usize,
}

impl Location {
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

/// A piece of an attribute value or text run: literal text or an embedded clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    Clause(Clause),
}

/// A named value on a tag, a `set:` binding, or a component prop.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: Vec<Segment>,
}

/// Conditional and iteration bindings shared by tags and components.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Directives {
    pub if_clause: Option<Clause>,
    pub for_clause: Option<Clause>,
    /// Per-iteration binding names, empty unless `for_clause` is set.
    pub for_names: Vec<String>,
    pub for_join: Option<Vec<Segment>>,
}

/// A node of the finalized template tree.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateElement {
    Text(String),
    /// A `{{ clause }}` interpolation in text content.
    Clause(Clause),
    /// A comment carrying the keep marker, re-emitted literally.
    Comment(String),
    Doctype(String),
    Tag(TagElement),
    Component(ComponentElement),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TagElement {
    pub name: String,
    pub loc: Location,
    /// `<text>`, `<fragment>` and `<>` render their body only.
    pub fragment: bool,
    /// Written as `<name/>` in the source.
    pub self_closing: bool,
    pub attributes: Vec<Attribute>,
    pub set_attributes: Vec<Attribute>,
    pub body: Vec<TemplateElement>,
    pub directives: Directives,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentElement {
    pub name: String,
    pub loc: Location,
    /// One entry per declared prop, in declaration order.
    pub props: Vec<Attribute>,
    pub directives: Directives,
    pub body: Vec<TemplateElement>,
    /// Content written between the invocation's open and close tags.
    pub children: Option<Vec<TemplateElement>>,
    pub source_file: String,
    pub source_loc: Location,
}
