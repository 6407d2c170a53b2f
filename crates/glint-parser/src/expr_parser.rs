//! Clause builder for glint expressions.
//!
//! Turns expression token streams (from `expr_lexer`) into `Clause` trees in
//! four ordered passes over an intermediate [`Mixed`] sequence:
//!
//! 1. **grouping** nests `()` and `[]` runs and splits them on commas,
//! 2. **chaining** folds symbols and their `.`/`.?`/`[..]` steps into `Var`s,
//! 3. **function binding** joins a `Var` with the `()` group after it,
//! 4. **reduction** resolves `!`/`-` modifiers and collapses binary operators
//!    level by level, in [`Operator::PRECEDENCE`] order.
//!
//! Call binding happens before any operator is reduced, so `a.b(1, 2) + 1`
//! always sees the call as one operand.

use crate::ast::{ChainElement, ChainOp, Clause, Func, Lookup, Modifier, Operation, Operator, Var};
use crate::expr_lexer::{ExprLexer, Token, TokenKind};
use crate::SyntaxError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupKind {
    Paren,
    Bracket,
}

impl GroupKind {
    fn open(self) -> char {
        match self {
            GroupKind::Paren => '(',
            GroupKind::Bracket => '[',
        }
    }

    fn close(self) -> char {
        match self {
            GroupKind::Paren => ')',
            GroupKind::Bracket => ']',
        }
    }
}

/// A bracketed run split into comma-separated arguments.
#[derive(Debug, Clone, PartialEq)]
struct Group {
    kind: GroupKind,
    args: Vec<Vec<Mixed>>,
    position: usize,
}

/// Element of the intermediate sequence the passes rewrite.
#[derive(Debug, Clone, PartialEq)]
enum Mixed {
    Token(Token),
    Group(Group),
    /// A `Var` bound to its argument group, arguments not yet reduced.
    Call(Var, Vec<Vec<Mixed>>),
    Clause(Clause),
}

/// Element of a sequence being reduced: an operand or an operator/modifier token.
#[derive(Debug)]
enum Part {
    Operand(Clause),
    Token(Token),
}

/// glint clause builder.
pub struct ExprParser;

impl ExprParser {
    /// Build a `Clause` from expression source text.
    pub fn parse(source: &str) -> Result<Clause, SyntaxError> {
        tracing::trace!(expression = source, "building clause");
        let tokens = ExprLexer::tokenize(source)?;
        Self::parse_tokens(tokens)
    }

    /// Build a `Clause` from an already tokenized expression.
    pub fn parse_tokens(tokens: Vec<Token>) -> Result<Clause, SyntaxError> {
        let grouped = build_groups(tokens)?;
        let chained = build_chains(grouped)?;
        let bound = build_functions(chained);
        reduce(bound)
    }
}

// ---------------------------------------------------------------------------
// Pass 1: grouping
// ---------------------------------------------------------------------------

fn build_groups(tokens: Vec<Token>) -> Result<Vec<Mixed>, SyntaxError> {
    let mut tokens = tokens.into_iter();
    let mut items = Vec::new();

    while let Some(token) = tokens.next() {
        match token.kind {
            TokenKind::LParen => {
                items.push(Mixed::Group(read_group(&mut tokens, GroupKind::Paren, token.span.start)?))
            }
            TokenKind::LBracket => {
                items.push(Mixed::Group(read_group(&mut tokens, GroupKind::Bracket, token.span.start)?))
            }
            TokenKind::RParen | TokenKind::RBracket => {
                return Err(SyntaxError {
                    message: format!(
                        "unexpected '{}' at position {}, no group is open",
                        token.kind.describe(),
                        token.span.start + 1
                    ),
                    position: token.span.start,
                })
            }
            TokenKind::Comma => {
                return Err(SyntaxError {
                    message: "commas can only occur inside brackets".into(),
                    position: token.span.start,
                })
            }
            _ => items.push(Mixed::Token(token)),
        }
    }

    Ok(items)
}

fn read_group(
    tokens: &mut std::vec::IntoIter<Token>,
    kind: GroupKind,
    position: usize,
) -> Result<Group, SyntaxError> {
    let mut args = Vec::new();
    let mut current = Vec::new();

    loop {
        let Some(token) = tokens.next() else {
            return Err(SyntaxError {
                message: format!(
                    "'{}' opened at position {} was not closed with '{}'",
                    kind.open(),
                    position + 1,
                    kind.close()
                ),
                position,
            });
        };

        match token.kind {
            TokenKind::LParen => {
                current.push(Mixed::Group(read_group(tokens, GroupKind::Paren, token.span.start)?))
            }
            TokenKind::LBracket => {
                current.push(Mixed::Group(read_group(tokens, GroupKind::Bracket, token.span.start)?))
            }
            TokenKind::RParen | TokenKind::RBracket => {
                let expected = match kind {
                    GroupKind::Paren => TokenKind::RParen,
                    GroupKind::Bracket => TokenKind::RBracket,
                };
                if token.kind != expected {
                    return Err(SyntaxError {
                        message: format!(
                            "'{}' opened at position {} closed by '{}', expected '{}'",
                            kind.open(),
                            position + 1,
                            token.kind.describe(),
                            kind.close()
                        ),
                        position: token.span.start,
                    });
                }
                if current.is_empty() {
                    if !args.is_empty() {
                        return Err(empty_argument(token.span.start));
                    }
                } else {
                    args.push(current);
                }
                return Ok(Group { kind, args, position });
            }
            TokenKind::Comma => {
                if current.is_empty() {
                    return Err(empty_argument(token.span.start));
                }
                args.push(std::mem::take(&mut current));
            }
            _ => current.push(Mixed::Token(token)),
        }
    }
}

fn empty_argument(position: usize) -> SyntaxError {
    SyntaxError {
        message: format!("empty argument at position {}", position + 1),
        position,
    }
}

// ---------------------------------------------------------------------------
// Pass 2: chaining
// ---------------------------------------------------------------------------

fn build_chains(items: Vec<Mixed>) -> Result<Vec<Mixed>, SyntaxError> {
    let mut out = Vec::with_capacity(items.len());
    let mut items = items.into_iter().peekable();

    while let Some(item) = items.next() {
        match item {
            Mixed::Token(Token {
                kind: TokenKind::Symbol(symbol),
                ..
            }) => {
                let mut var = Var::new(symbol);
                loop {
                    let op = match items.peek() {
                        Some(Mixed::Token(t)) if t.kind == TokenKind::Dot => Some(ChainOp::Required),
                        Some(Mixed::Token(t)) if t.kind == TokenKind::OptionalDot => {
                            Some(ChainOp::Optional)
                        }
                        Some(Mixed::Group(g)) if g.kind == GroupKind::Bracket => None,
                        _ => break,
                    };

                    let lookup = match op {
                        Some(op) => {
                            let dot = items.next();
                            let position = match &dot {
                                Some(Mixed::Token(t)) => t.span.start,
                                _ => 0,
                            };
                            let lookup = match items.next() {
                                Some(Mixed::Token(Token {
                                    kind: TokenKind::Symbol(key),
                                    ..
                                })) => Lookup::Str(key),
                                Some(Mixed::Group(g)) if g.kind == GroupKind::Bracket => {
                                    bracket_lookup(g)?
                                }
                                _ => {
                                    return Err(SyntaxError {
                                        message: format!(
                                            "'.' at position {} must be followed by a name or [key]",
                                            position + 1
                                        ),
                                        position,
                                    })
                                }
                            };
                            ChainElement { op, lookup }
                        }
                        None => match items.next() {
                            Some(Mixed::Group(g)) => ChainElement {
                                op: ChainOp::Required,
                                lookup: bracket_lookup(g)?,
                            },
                            _ => break,
                        },
                    };
                    var.chain.push(lookup);
                }
                out.push(Mixed::Clause(Clause::Var(var)));
            }
            Mixed::Token(token)
                if matches!(token.kind, TokenKind::Dot | TokenKind::OptionalDot) =>
            {
                return Err(SyntaxError {
                    message: format!(
                        "unexpected '{}' at position {}, chains must start with a name",
                        token.kind.describe(),
                        token.span.start + 1
                    ),
                    position: token.span.start,
                });
            }
            Mixed::Group(group) if group.kind == GroupKind::Bracket => {
                return Err(SyntaxError {
                    message: format!(
                        "'[]' at position {} may only follow a name or a chain step",
                        group.position + 1
                    ),
                    position: group.position,
                });
            }
            Mixed::Group(mut group) => {
                group.args = group
                    .args
                    .into_iter()
                    .map(build_chains)
                    .collect::<Result<_, _>>()?;
                out.push(Mixed::Group(group));
            }
            other => out.push(other),
        }
    }

    Ok(out)
}

/// The key inside `[..]`: a bare name is an indirect lookup, strings and numbers are literal.
fn bracket_lookup(group: Group) -> Result<Lookup, SyntaxError> {
    let position = group.position;
    let mut args = group.args.into_iter();
    if let (Some(arg), None) = (args.next(), args.next()) {
        let mut elements = arg.into_iter();
        if let (Some(Mixed::Token(token)), None) = (elements.next(), elements.next()) {
            match token.kind {
                TokenKind::Symbol(s) => return Ok(Lookup::Symbol(s)),
                TokenKind::Str(s) => return Ok(Lookup::Str(s)),
                TokenKind::Num(n) => return Ok(Lookup::Num(n)),
                _ => {}
            }
        }
    }
    Err(SyntaxError {
        message: format!(
            "'[]' at position {} must contain exactly one name, string or number",
            position + 1
        ),
        position,
    })
}

// ---------------------------------------------------------------------------
// Pass 3: function binding
// ---------------------------------------------------------------------------

fn build_functions(items: Vec<Mixed>) -> Vec<Mixed> {
    let mut out: Vec<Mixed> = Vec::with_capacity(items.len());

    for item in items {
        match item {
            Mixed::Group(mut group) if group.kind == GroupKind::Paren => {
                group.args = group.args.into_iter().map(build_functions).collect();
                match out.pop() {
                    Some(Mixed::Clause(Clause::Var(var))) => out.push(Mixed::Call(var, group.args)),
                    previous => {
                        out.extend(previous);
                        out.push(Mixed::Group(group));
                    }
                }
            }
            other => out.push(other),
        }
    }

    out
}

// ---------------------------------------------------------------------------
// Pass 4: modifiers and operators
// ---------------------------------------------------------------------------

fn reduce(items: Vec<Mixed>) -> Result<Clause, SyntaxError> {
    let mut parts = items
        .into_iter()
        .map(into_part)
        .collect::<Result<Vec<_>, _>>()?;

    for (index, level) in Operator::PRECEDENCE.iter().enumerate() {
        if index == 1 {
            parts = apply_modifiers(parts)?;
        }
        parts = reduce_level(parts, level)?;
    }

    let mut parts = parts.into_iter();
    match (parts.next(), parts.next()) {
        (Some(Part::Operand(clause)), None) => Ok(clause),
        (None, _) => Err(SyntaxError {
            message: "empty expression".into(),
            position: 0,
        }),
        (Some(Part::Token(token)), _) | (Some(Part::Operand(_)), Some(Part::Token(token))) => {
            Err(unexpected(&token))
        }
        (Some(Part::Operand(_)), Some(Part::Operand(_))) => Err(SyntaxError {
            message: "expected an operator between operands".into(),
            position: 0,
        }),
    }
}

fn into_part(item: Mixed) -> Result<Part, SyntaxError> {
    let clause = match item {
        Mixed::Clause(clause) => clause,
        Mixed::Group(group) => {
            let mut args = reduce_args(group.args)?;
            if args.len() == 1 {
                args.remove(0)
            } else {
                Clause::List(args)
            }
        }
        Mixed::Call(var, args) => Clause::Func(Func {
            var,
            args: reduce_args(args)?,
        }),
        Mixed::Token(token) => match token.kind {
            TokenKind::Num(n) => Clause::Num(n),
            TokenKind::Str(s) => Clause::Str(s),
            TokenKind::True => Clause::Bool(true),
            TokenKind::False => Clause::Bool(false),
            _ if operator_of(&token.kind).is_some() || token.kind == TokenKind::Not => {
                return Ok(Part::Token(token))
            }
            _ => return Err(unexpected(&token)),
        },
    };
    Ok(Part::Operand(clause))
}

fn reduce_args(args: Vec<Vec<Mixed>>) -> Result<Vec<Clause>, SyntaxError> {
    args.into_iter().map(reduce).collect()
}

/// Applies `!` and `-` wherever they sit at the start or after another
/// operator, innermost first, until nothing changes. Any `!` left over sits
/// between operands and is an error.
fn apply_modifiers(mut parts: Vec<Part>) -> Result<Vec<Part>, SyntaxError> {
    loop {
        let found = (0..parts.len()).find(|&i| {
            let modifier = matches!(
                &parts[i],
                Part::Token(t) if matches!(t.kind, TokenKind::Not | TokenKind::Minus)
            );
            let eligible = i == 0 || matches!(parts[i - 1], Part::Token(_));
            let operand_follows = matches!(parts.get(i + 1), Some(Part::Operand(_)));
            modifier && eligible && operand_follows
        });

        let Some(index) = found else { break };

        let element = match parts.remove(index + 1) {
            Part::Operand(element) => element,
            Part::Token(token) => return Err(unexpected(&token)),
        };
        let op = match &parts[index] {
            Part::Token(t) if t.kind == TokenKind::Not => Modifier::Not,
            _ => Modifier::Negate,
        };
        parts[index] = Part::Operand(Clause::Modified {
            op,
            element: Box::new(element),
        });
    }

    if let Some(Part::Token(token)) = parts
        .iter()
        .find(|p| matches!(p, Part::Token(t) if t.kind == TokenKind::Not))
    {
        return Err(SyntaxError {
            message: format!(
                "'{}' at position {} must precede an operand",
                token.kind.describe(),
                token.span.start + 1
            ),
            position: token.span.start,
        });
    }

    Ok(parts)
}

/// Collapses every `operand (op operand)+` run of this level into one `Operation`.
fn reduce_level(parts: Vec<Part>, level: &[Operator]) -> Result<Vec<Part>, SyntaxError> {
    let mut out = Vec::with_capacity(parts.len());
    let mut parts = parts.into_iter().peekable();

    while let Some(part) = parts.next() {
        let Part::Operand(left) = part else {
            out.push(part);
            continue;
        };

        let mut operation: Option<Operation> = None;
        let mut left = Some(left);

        while let Some(Part::Token(token)) = parts.peek() {
            let Some(operator) = operator_of(&token.kind).filter(|op| level.contains(op)) else {
                break;
            };
            let Some(Part::Token(token)) = parts.next() else {
                break;
            };

            let right = match parts.next() {
                Some(Part::Operand(clause)) => clause,
                Some(Part::Token(next)) => {
                    return Err(SyntaxError {
                        message: format!(
                            "operator '{}' at position {} followed by '{}'",
                            token.kind.describe(),
                            token.span.start + 1,
                            next.kind.describe()
                        ),
                        position: next.span.start,
                    })
                }
                None => {
                    return Err(SyntaxError {
                        message: format!(
                            "operator '{}' at position {} has no right operand",
                            token.kind.describe(),
                            token.span.start + 1
                        ),
                        position: token.span.start,
                    })
                }
            };

            match operation.as_mut() {
                Some(existing) => {
                    if !operator.allows_chaining() {
                        return Err(SyntaxError {
                            message: format!(
                                "'{}' at position {} cannot be chained",
                                operator.as_str(),
                                token.span.start + 1
                            ),
                            position: token.span.start,
                        });
                    }
                    existing.args.push(right);
                }
                None => {
                    let left = left.take().into_iter();
                    operation = Some(Operation {
                        operator,
                        args: left.chain(std::iter::once(right)).collect(),
                    });
                }
            }
        }

        let clause = match (operation, left) {
            (Some(operation), _) => Clause::Operation(operation),
            (None, Some(left)) => left,
            (None, None) => continue,
        };
        out.push(Part::Operand(clause));
    }

    Ok(out)
}

fn operator_of(kind: &TokenKind) -> Option<Operator> {
    Some(match kind {
        TokenKind::Pipe => Operator::Pipe,
        TokenKind::Star => Operator::Mult,
        TokenKind::Slash => Operator::Div,
        TokenKind::Plus => Operator::Add,
        TokenKind::Minus => Operator::Sub,
        TokenKind::EqEq => Operator::Eq,
        TokenKind::NotEq => Operator::Neq,
        TokenKind::In => Operator::In,
        TokenKind::NotIn => Operator::NotIn,
        TokenKind::And => Operator::And,
        TokenKind::Or => Operator::Or,
        _ => return None,
    })
}

fn unexpected(token: &Token) -> SyntaxError {
    SyntaxError {
        message: format!(
            "unexpected '{}' at position {}",
            token.kind.describe(),
            token.span.start + 1
        ),
        position: token.span.start,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn build(source: &str) -> Clause {
        ExprParser::parse(source).unwrap()
    }

    fn build_err(source: &str) -> String {
        ExprParser::parse(source).unwrap_err().message
    }

    fn var(symbol: &str) -> Clause {
        Clause::Var(Var::new(symbol))
    }

    fn chained(symbol: &str, chain: Vec<(ChainOp, Lookup)>) -> Clause {
        Clause::Var(Var {
            symbol: symbol.into(),
            chain: chain
                .into_iter()
                .map(|(op, lookup)| ChainElement { op, lookup })
                .collect(),
        })
    }

    fn op(operator: Operator, args: Vec<Clause>) -> Clause {
        Clause::Operation(Operation { operator, args })
    }

    fn func(symbol: &str, args: Vec<Clause>) -> Clause {
        Clause::Func(Func {
            var: Var::new(symbol),
            args,
        })
    }

    fn not(element: Clause) -> Clause {
        Clause::Modified {
            op: Modifier::Not,
            element: Box::new(element),
        }
    }

    fn neg(element: Clause) -> Clause {
        Clause::Modified {
            op: Modifier::Negate,
            element: Box::new(element),
        }
    }

    // ===================================================================
    // Grouping
    // ===================================================================

    #[test]
    fn test_group_splits_arguments() {
        let groups = build_groups(ExprLexer::tokenize("foo(a + c, b)").unwrap()).unwrap();
        assert_eq!(groups.len(), 2);
        let Mixed::Group(group) = &groups[1] else {
            panic!("expected group");
        };
        assert_eq!(group.kind, GroupKind::Paren);
        assert_eq!(group.args.len(), 2);
        assert_eq!(group.args[0].len(), 3);
    }

    #[test]
    fn test_nested_groups() {
        let groups = build_groups(ExprLexer::tokenize("((foobar))").unwrap()).unwrap();
        let Mixed::Group(outer) = &groups[0] else {
            panic!("expected group");
        };
        assert!(matches!(outer.args[0][0], Mixed::Group(_)));
    }

    #[test]
    fn test_empty_group() {
        assert_eq!(build("()"), Clause::List(vec![]));
    }

    #[test]
    fn test_comma_outside_group() {
        assert_eq!(build_err("a, b"), "commas can only occur inside brackets");
    }

    #[test]
    fn test_unclosed_group() {
        let msg = build_err("(a + b");
        assert!(msg.contains("not closed with ')'"), "{msg}");
        let msg = build_err("x[1");
        assert!(msg.contains("not closed with ']'"), "{msg}");
    }

    #[test]
    fn test_mismatched_close() {
        assert!(build_err("(a]").contains("expected ')'"));
        assert!(build_err("a)").contains("no group is open"));
    }

    #[test]
    fn test_empty_argument() {
        assert!(build_err("f(a,,b)").contains("empty argument"));
        assert!(build_err("f(a,)").contains("empty argument"));
    }

    // ===================================================================
    // Chaining
    // ===================================================================

    #[test]
    fn test_chain_dots() {
        assert_eq!(
            build("foo.bar.?spam"),
            chained(
                "foo",
                vec![
                    (ChainOp::Required, Lookup::Str("bar".into())),
                    (ChainOp::Optional, Lookup::Str("spam".into())),
                ]
            )
        );
    }

    #[test]
    fn test_chain_brackets() {
        assert_eq!(
            build("foo[other]"),
            chained("foo", vec![(ChainOp::Required, Lookup::Symbol("other".into()))])
        );
        assert_eq!(
            build("foo['foobar']"),
            chained("foo", vec![(ChainOp::Required, Lookup::Str("foobar".into()))])
        );
        assert_eq!(
            build("whatever[1]"),
            chained("whatever", vec![(ChainOp::Required, Lookup::Num(1.0))])
        );
        assert_eq!(
            build("foo.bar[other]"),
            chained(
                "foo",
                vec![
                    (ChainOp::Required, Lookup::Str("bar".into())),
                    (ChainOp::Required, Lookup::Symbol("other".into())),
                ]
            )
        );
    }

    #[test]
    fn test_chain_dot_bracket() {
        assert_eq!(
            build("foo.[other]"),
            chained("foo", vec![(ChainOp::Required, Lookup::Symbol("other".into()))])
        );
        assert_eq!(
            build("foo.?[other]"),
            chained("foo", vec![(ChainOp::Optional, Lookup::Symbol("other".into()))])
        );
    }

    #[test]
    fn test_chain_errors() {
        assert!(build_err("foo.").contains("must be followed by a name"));
        assert!(build_err("foo.1").contains("must be followed by a name"));
        assert!(build_err(".foo").contains("chains must start with a name"));
        assert!(build_err("[1]").contains("may only follow a name"));
        assert!(build_err("(a)[1]").contains("may only follow a name"));
        assert!(build_err("foo[1, 2]").contains("exactly one"));
        assert!(build_err("foo[]").contains("exactly one"));
        assert!(build_err("foo[a + b]").contains("exactly one"));
    }

    // ===================================================================
    // Functions
    // ===================================================================

    #[test]
    fn test_functions() {
        assert_eq!(build("foo()"), func("foo", vec![]));
        assert_eq!(build("foo(1, 2)"), func("foo", vec![Clause::Num(1.0), Clause::Num(2.0)]));
        assert_eq!(build("foobar(spam)"), func("foobar", vec![var("spam")]));
    }

    #[test]
    fn test_function_on_chain() {
        assert_eq!(
            build("fmt.date(x)"),
            Clause::Func(Func {
                var: Var {
                    symbol: "fmt".into(),
                    chain: vec![ChainElement {
                        op: ChainOp::Required,
                        lookup: Lookup::Str("date".into()),
                    }],
                },
                args: vec![var("x")],
            })
        );
    }

    #[test]
    fn test_function_args_reduce() {
        assert_eq!(
            build("foo(1 + 2, x.?[y])"),
            func(
                "foo",
                vec![
                    op(Operator::Add, vec![Clause::Num(1.0), Clause::Num(2.0)]),
                    chained("x", vec![(ChainOp::Optional, Lookup::Symbol("y".into()))]),
                ]
            )
        );
    }

    // ===================================================================
    // Operators
    // ===================================================================

    #[test]
    fn test_literals() {
        assert_eq!(build("\"foobar\""), Clause::Str("foobar".into()));
        assert_eq!(build("bang"), var("bang"));
        assert_eq!(build("42"), Clause::Num(42.0));
        assert_eq!(build("True"), Clause::Bool(true));
    }

    #[test]
    fn test_same_level_collapses() {
        assert_eq!(
            build("a + b + 'c'"),
            op(Operator::Add, vec![var("a"), var("b"), Clause::Str("c".into())])
        );
    }

    #[test]
    fn test_add_binds_tighter_than_sub() {
        assert_eq!(
            build("a + b - 'c'"),
            op(
                Operator::Sub,
                vec![op(Operator::Add, vec![var("a"), var("b")]), Clause::Str("c".into())]
            )
        );
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            build("1 + 2 * 3"),
            op(
                Operator::Add,
                vec![Clause::Num(1.0), op(Operator::Mult, vec![Clause::Num(2.0), Clause::Num(3.0)])]
            )
        );
        assert_eq!(
            build("(1 + 2) / 2"),
            op(
                Operator::Div,
                vec![op(Operator::Add, vec![Clause::Num(1.0), Clause::Num(2.0)]), Clause::Num(2.0)]
            )
        );
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(build("abc == 1"), op(Operator::Eq, vec![var("abc"), Clause::Num(1.0)]));
        assert_eq!(
            build("abc != (1, 2, 3)"),
            op(
                Operator::Neq,
                vec![
                    var("abc"),
                    Clause::List(vec![Clause::Num(1.0), Clause::Num(2.0), Clause::Num(3.0)])
                ]
            )
        );
    }

    #[test]
    fn test_in() {
        assert_eq!(build("12 in apple"), op(Operator::In, vec![Clause::Num(12.0), var("apple")]));
        assert_eq!(
            build("(a, b) in y"),
            op(Operator::In, vec![Clause::List(vec![var("a"), var("b")]), var("y")])
        );
        assert_eq!(build("a not in b"), op(Operator::NotIn, vec![var("a"), var("b")]));
    }

    #[test]
    fn test_in_cannot_chain() {
        assert!(build_err("a in b in c").contains("cannot be chained"));
        assert!(build_err("a in b not in c").contains("cannot be chained"));
    }

    #[test]
    fn test_member_and_index_multiply() {
        assert_eq!(
            build("x.y.z * a[\"x\"]"),
            op(
                Operator::Mult,
                vec![
                    chained(
                        "x",
                        vec![
                            (ChainOp::Required, Lookup::Str("y".into())),
                            (ChainOp::Required, Lookup::Str("z".into())),
                        ]
                    ),
                    chained("a", vec![(ChainOp::Required, Lookup::Str("x".into()))]),
                ]
            )
        );
    }

    #[test]
    fn test_pipes() {
        assert_eq!(build("thing|spam"), op(Operator::Pipe, vec![var("thing"), var("spam")]));
        assert_eq!(
            build("thing|spam|another()"),
            op(Operator::Pipe, vec![var("thing"), var("spam"), func("another", vec![])])
        );
        assert_eq!(
            build("\"bar\"|filter_function(\"foo\")"),
            op(
                Operator::Pipe,
                vec![
                    Clause::Str("bar".into()),
                    func("filter_function", vec![Clause::Str("foo".into())])
                ]
            )
        );
    }

    #[test]
    fn test_logic() {
        assert_eq!(
            build("1 + 3 || foobar(1, spanner)"),
            op(
                Operator::Or,
                vec![
                    op(Operator::Add, vec![Clause::Num(1.0), Clause::Num(3.0)]),
                    func("foobar", vec![Clause::Num(1.0), var("spanner")]),
                ]
            )
        );
        assert_eq!(
            build("a and b or c"),
            op(Operator::Or, vec![op(Operator::And, vec![var("a"), var("b")]), var("c")])
        );
    }

    #[test]
    fn test_operator_errors() {
        assert!(build_err("1 +").contains("no right operand"));
        assert!(build_err("1 + * 2").contains("followed by '*'"));
        assert!(build_err("* 2").contains("unexpected '*'"));
        assert!(build_err("a b").contains("expected an operator"));
        assert_eq!(build_err(""), "empty expression");
    }

    // ===================================================================
    // Modifiers
    // ===================================================================

    #[test]
    fn test_not_modifiers() {
        assert_eq!(build("!modified"), not(var("modified")));
        assert_eq!(build("!!modified"), not(not(var("modified"))));
        assert_eq!(build("!!!modified"), not(not(not(var("modified")))));
        assert_eq!(build("not modified"), not(var("modified")));
    }

    #[test]
    fn test_negate_modifiers() {
        assert_eq!(build("-modified"), neg(var("modified")));
        assert_eq!(build("--modified"), neg(neg(var("modified"))));
    }

    #[test]
    fn test_modifier_binds_after_pipe() {
        assert_eq!(build("!modified()"), not(func("modified", vec![])));
        assert_eq!(
            build("!foo|bar"),
            not(op(Operator::Pipe, vec![var("foo"), var("bar")]))
        );
    }

    #[test]
    fn test_modifier_after_operator() {
        assert_eq!(
            build("a + !modified"),
            op(Operator::Add, vec![var("a"), not(var("modified"))])
        );
        assert_eq!(
            build("a + -modified"),
            op(Operator::Add, vec![var("a"), neg(var("modified"))])
        );
        assert_eq!(
            build("a - -1"),
            op(Operator::Sub, vec![var("a"), neg(Clause::Num(1.0))])
        );
    }

    #[test]
    fn test_modifier_inside_args() {
        assert_eq!(
            build("-modified(a, b, !c)"),
            neg(func("modified", vec![var("a"), var("b"), not(var("c"))]))
        );
    }

    #[test]
    fn test_misplaced_not() {
        assert!(build_err("a ! b").contains("must precede an operand"));
        assert!(build_err("a !").contains("must precede an operand"));
    }
}
