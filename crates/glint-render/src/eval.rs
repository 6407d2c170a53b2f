//! Tree-walking evaluator for glint clauses.
//!
//! Variables resolve against a [`Context`], function calls and filters
//! against a [`Functions`] namespace. Arguments and operands are evaluated
//! strictly left to right; `&&`, `||`, `*` and `/` stop early.

use std::fmt;

use glint_parser::ast::{ChainOp, Clause, Func, Lookup, Modifier, Operation, Operator, Var};

use crate::functions::{Callable, FunctionEntry, Functions, Output};
use crate::value::{format_number, Context, Map, Value};
use crate::EvalError;

/// A resolved chain key.
enum Key {
    Str(String),
    Num(f64),
}

impl Key {
    /// The key as a path step, `["name"]` or `[0]`.
    fn step(&self) -> String {
        match self {
            Key::Str(s) => format!("[{s:?}]"),
            Key::Num(n) => format!("[{}]", format_number(*n)),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Str(s) => f.write_str(s),
            Key::Num(n) => f.write_str(&format_number(*n)),
        }
    }
}

pub struct Evaluator<'f> {
    functions: &'f Functions,
}

impl<'f> Evaluator<'f> {
    pub fn new(functions: &'f Functions) -> Self {
        Self { functions }
    }

    pub fn evaluate(&self, clause: &Clause, ctx: &Context) -> Result<Value, EvalError> {
        match clause {
            Clause::Var(var) => self.lookup_var(var, ctx),
            Clause::Str(s) => Ok(Value::String(s.clone())),
            Clause::Num(n) => Ok(Value::Number(*n)),
            Clause::Bool(b) => Ok(Value::Bool(*b)),
            Clause::List(items) => items
                .iter()
                .map(|item| self.evaluate(item, ctx))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Clause::Func(func) => self.call(func, ctx),
            Clause::Modified { op, element } => {
                let value = self.evaluate(element, ctx)?;
                match (op, value) {
                    (Modifier::Not, value) => Ok(Value::Bool(!value.is_truthy())),
                    (Modifier::Negate, Value::Number(n)) => Ok(Value::Number(-n)),
                    (Modifier::Negate, other) => Err(EvalError::Type(format!(
                        "negative of {} is not valid",
                        other.kind()
                    ))),
                }
            }
            Clause::Operation(operation) => self.operation(operation, ctx),
        }
    }

    /// Evaluate for output: strings as is, numbers formatted, null as empty.
    pub fn evaluate_as_str(&self, clause: &Clause, ctx: &Context) -> Result<String, EvalError> {
        match self.evaluate(clause, ctx)? {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(format_number(n)),
            Value::Null => Ok(String::new()),
            other => Err(EvalError::Type(format!(
                "unable to convert {} to a string",
                other.kind()
            ))),
        }
    }

    /// Evaluate as a condition: empty lists and maps are false.
    pub fn evaluate_as_bool(&self, clause: &Clause, ctx: &Context) -> Result<bool, EvalError> {
        Ok(self.evaluate(clause, ctx)?.is_loop_truthy())
    }

    /// Evaluate a `for` clause into one set of name bindings per iteration.
    ///
    /// - one name binds each list item, or each map value;
    /// - two names over a map bind key and value;
    /// - N names over a list destructure each item, a list or map of exactly N entries.
    pub fn evaluate_as_loop(
        &self,
        clause: &Clause,
        names: &[String],
        ctx: &Context,
    ) -> Result<Vec<Map>, EvalError> {
        let value = self.evaluate(clause, ctx)?;
        let bind = |values: Vec<Value>| -> Map { names.iter().cloned().zip(values).collect() };

        match (value, names.len()) {
            (_, 0) => Err(EvalError::Type("loops need at least one name".into())),
            (Value::List(items), 1) => Ok(items.into_iter().map(|item| bind(vec![item])).collect()),
            (Value::Map(map), 1) => Ok(map.into_values().map(|v| bind(vec![v])).collect()),
            (Value::Map(map), 2) => Ok(map
                .into_iter()
                .map(|(k, v)| bind(vec![Value::String(k), v]))
                .collect()),
            (Value::Map(_), n) => Err(EvalError::Type(format!(
                "looping over a map binds one or two names, got {n}"
            ))),
            (Value::List(items), n) => items
                .into_iter()
                .map(|item| destructure(item, n).map(bind))
                .collect(),
            (other, _) => Err(EvalError::Type(format!(
                "\"for\" loops are only possible over lists and maps, not {}",
                other.kind()
            ))),
        }
    }

    // --- Lookups ---

    fn lookup_var(&self, var: &Var, ctx: &Context) -> Result<Value, EvalError> {
        let mut current = ctx.get(&var.symbol).ok_or_else(|| {
            EvalError::NotFound(format!("\"{}\" not found in context", var.symbol))
        })?;
        let mut path = var.symbol.clone();

        for step in &var.chain {
            let key = self.chain_key(&step.lookup, ctx)?;
            let next = match (current, &key) {
                (Value::List(items), Key::Num(n)) => list_index(items, *n),
                (Value::Map(map), Key::Str(s)) => map.get(s),
                (value, Key::Num(_)) => {
                    return Err(EvalError::Type(format!(
                        "{path}: numeric lookups are only allowed on lists, not {}",
                        value.kind()
                    )))
                }
                (value, Key::Str(_)) => {
                    return Err(EvalError::Type(format!(
                        "{path}: string lookups are only allowed on maps, not {}",
                        value.kind()
                    )))
                }
            };

            match next {
                Some(value) => {
                    path.push_str(&key.step());
                    current = value;
                }
                None if step.op == ChainOp::Optional => return Ok(Value::Null),
                None => {
                    return Err(EvalError::NotFound(format!(
                        "\"{key}\" not found in \"{path}\""
                    )))
                }
            }
        }

        Ok(current.clone())
    }

    /// `[name]` keys are looked up in the context and must be a string or number.
    fn chain_key(&self, lookup: &Lookup, ctx: &Context) -> Result<Key, EvalError> {
        match lookup {
            Lookup::Str(s) => Ok(Key::Str(s.clone())),
            Lookup::Num(n) => Ok(Key::Num(*n)),
            Lookup::Symbol(symbol) => match ctx.get(symbol) {
                Some(Value::String(s)) => Ok(Key::Str(s.clone())),
                Some(Value::Number(n)) => Ok(Key::Num(*n)),
                Some(other) => Err(EvalError::Type(format!(
                    "\"{symbol}\" must be a string or number to be used as a key, not {}",
                    other.kind()
                ))),
                None => Err(EvalError::NotFound(format!("lookup \"{symbol}\" not found"))),
            },
        }
    }

    /// Find the callable named by `var` in the functions namespace.
    fn resolve_function(&self, var: &Var, ctx: &Context) -> Result<(&'f Callable, String), EvalError> {
        let mut entry = self.functions.get(&var.symbol).ok_or_else(|| {
            EvalError::NotFound(format!("function \"{}\" not found", var.symbol))
        })?;
        let mut path = var.symbol.clone();

        for step in &var.chain {
            let key = match self.chain_key(&step.lookup, ctx)? {
                Key::Str(s) => s,
                Key::Num(_) => {
                    return Err(EvalError::Type(format!(
                        "{path}: numeric lookups are not possible on functions"
                    )))
                }
            };
            let FunctionEntry::Namespace(namespace) = entry else {
                return Err(EvalError::Call(format!("\"{path}\" is a function, not a namespace")));
            };
            path = format!("{path}.{key}");
            entry = namespace
                .get(&key)
                .ok_or_else(|| EvalError::NotFound(format!("function \"{path}\" not found")))?;
        }

        match entry {
            FunctionEntry::Callable(callable) => Ok((callable, path)),
            FunctionEntry::Namespace(_) => Err(EvalError::Call(format!(
                "\"{path}\" is a namespace, not a function"
            ))),
        }
    }

    // --- Calls ---

    fn call(&self, func: &Func, ctx: &Context) -> Result<Value, EvalError> {
        let (callable, name) = self.resolve_function(&func.var, ctx)?;
        let args = self.evaluate_args(&func.args, ctx)?;
        tracing::trace!(function = %name, args = args.len(), "calling function");
        match callable(&args)? {
            Output::Value(value) => Ok(value),
            Output::Callable(_) => Err(EvalError::Call(
                "filter functions may not be called directly".into(),
            )),
        }
    }

    fn evaluate_args(&self, args: &[Clause], ctx: &Context) -> Result<Vec<Value>, EvalError> {
        args.iter().map(|arg| self.evaluate(arg, ctx)).collect()
    }

    /// Apply one `| filter` step to the piped value.
    fn filter(&self, value: Value, filter: &Clause, ctx: &Context) -> Result<Value, EvalError> {
        let (callable, name) = match filter {
            Clause::Var(var) => {
                let (callable, name) = self.resolve_function(var, ctx)?;
                (callable.clone(), name)
            }
            Clause::Func(func) => {
                let (factory, name) = self.resolve_function(&func.var, ctx)?;
                let args = self.evaluate_args(&func.args, ctx)?;
                tracing::trace!(function = %name, args = args.len(), "building filter");
                match factory(&args)? {
                    Output::Callable(callable) => (callable, name),
                    Output::Value(_) => {
                        return Err(EvalError::Call(format!(
                            "\"{name}\" must return a filter function when called in a pipe"
                        )))
                    }
                }
            }
            _ => {
                return Err(EvalError::Type(
                    "filters must be function names or function calls".into(),
                ))
            }
        };

        tracing::trace!(filter = %name, "applying filter");
        match callable(&[value])? {
            Output::Value(value) => Ok(value),
            Output::Callable(_) => Err(EvalError::Call(format!(
                "filter \"{name}\" may not return a function"
            ))),
        }
    }

    // --- Operators ---

    fn operation(&self, operation: &Operation, ctx: &Context) -> Result<Value, EvalError> {
        let Some((first, rest)) = operation.args.split_first() else {
            return Err(EvalError::Type(format!(
                "\"{}\" needs operands",
                operation.operator.as_str()
            )));
        };
        let left = self.evaluate(first, ctx)?;

        match operation.operator {
            Operator::Pipe => rest
                .iter()
                .try_fold(left, |value, filter| self.filter(value, filter, ctx)),
            Operator::Mult | Operator::Div => self.mult_div(operation.operator, left, rest, ctx),
            Operator::Add => self.add(left, rest, ctx),
            Operator::Sub => {
                let Value::Number(mut n) = left else {
                    return Err(EvalError::Type(format!(
                        "only numbers can be subtracted, not {}",
                        left.kind()
                    )));
                };
                for arg in rest {
                    n -= self.number_operand(arg, ctx, "only numbers can be subtracted")?;
                }
                Ok(Value::Number(n))
            }
            Operator::Eq => {
                for arg in rest {
                    if self.evaluate(arg, ctx)? != left {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            Operator::Neq => {
                for arg in rest {
                    if self.evaluate(arg, ctx)? == left {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            Operator::In | Operator::NotIn => {
                let mut found = true;
                for arg in rest {
                    found &= contains(&self.evaluate(arg, ctx)?, &left)?;
                }
                Ok(Value::Bool(found == (operation.operator == Operator::In)))
            }
            Operator::And => {
                if !left.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                for arg in rest {
                    if !self.evaluate(arg, ctx)?.is_truthy() {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            Operator::Or => {
                if left.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                for arg in rest {
                    if self.evaluate(arg, ctx)?.is_truthy() {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
        }
    }

    /// A zero (or NaN) left value is returned unchanged without evaluating the rest.
    fn mult_div(
        &self,
        operator: Operator,
        left: Value,
        rest: &[Clause],
        ctx: &Context,
    ) -> Result<Value, EvalError> {
        let op = operator.as_str();
        let Value::Number(mut n) = left else {
            return Err(EvalError::Type(format!(
                "arithmetic operation \"{op}\" only possible on numbers, got {}",
                left.kind()
            )));
        };
        let message = format!("arithmetic operation \"{op}\" only possible on numbers");

        for arg in rest {
            if n == 0.0 || n.is_nan() {
                break;
            }
            let right = self.number_operand(arg, ctx, &message)?;
            if operator == Operator::Mult {
                n *= right;
            } else {
                n /= right;
            }
        }
        Ok(Value::Number(n))
    }

    /// Addition dispatches on the left value: numbers sum, lists concatenate, maps merge.
    fn add(&self, left: Value, rest: &[Clause], ctx: &Context) -> Result<Value, EvalError> {
        match left {
            Value::Number(mut n) => {
                for arg in rest {
                    n += self.number_operand(arg, ctx, "only numbers can be added to numbers")?;
                }
                Ok(Value::Number(n))
            }
            Value::List(mut items) => {
                for arg in rest {
                    match self.evaluate(arg, ctx)? {
                        Value::List(more) => items.extend(more),
                        other => {
                            return Err(EvalError::Type(format!(
                                "only lists can be added to lists, not {}",
                                other.kind()
                            )))
                        }
                    }
                }
                Ok(Value::List(items))
            }
            Value::Map(mut map) => {
                for arg in rest {
                    match self.evaluate(arg, ctx)? {
                        Value::Map(more) => map.extend(more),
                        other => {
                            return Err(EvalError::Type(format!(
                                "only maps can be added to maps, not {}",
                                other.kind()
                            )))
                        }
                    }
                }
                Ok(Value::Map(map))
            }
            other => Err(EvalError::Type(format!("unable to add {}s", other.kind()))),
        }
    }

    fn number_operand(&self, arg: &Clause, ctx: &Context, message: &str) -> Result<f64, EvalError> {
        match self.evaluate(arg, ctx)? {
            Value::Number(n) => Ok(n),
            other => Err(EvalError::Type(format!("{message}, got {}", other.kind()))),
        }
    }
}

fn list_index(items: &[Value], n: f64) -> Option<&Value> {
    if n >= 0.0 && n.fract() == 0.0 {
        items.get(n as usize)
    } else {
        None
    }
}

/// Membership test behind `in`.
fn contains(container: &Value, value: &Value) -> Result<bool, EvalError> {
    match container {
        Value::Map(map) => Ok(value.as_str().is_some_and(|key| map.contains_key(key))),
        Value::List(items) => Ok(items.contains(value)),
        Value::String(s) => Ok(value.as_str().is_some_and(|needle| s.contains(needle))),
        other => Err(EvalError::Type(format!(
            "\"in\" is only possible for maps, lists and strings, not {}",
            other.kind()
        ))),
    }
}

fn destructure(item: Value, n: usize) -> Result<Vec<Value>, EvalError> {
    let values: Vec<Value> = match item {
        Value::List(values) => values,
        Value::Map(map) => map.into_values().collect(),
        other => {
            return Err(EvalError::Type(format!(
                "unable to destructure {} into {n} names",
                other.kind()
            )))
        }
    };
    if values.len() != n {
        return Err(EvalError::Type(format!(
            "unable to destructure {} values into {n} names",
            values.len()
        )));
    }
    Ok(values)
}
