//! The functions namespace: callables and filters available to clauses.
//!
//! A callable receives its evaluated arguments and returns either a value or,
//! for filter factories such as `truncate(10)`, another callable that the
//! pipe operator then applies to the piped value.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::value::Value;
use crate::EvalError;

pub type Callable = Arc<dyn Fn(&[Value]) -> Result<Output, EvalError> + Send + Sync>;

/// What a callable returns.
#[derive(Clone)]
pub enum Output {
    Value(Value),
    Callable(Callable),
}

impl From<Value> for Output {
    fn from(value: Value) -> Self {
        Output::Value(value)
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Output::Callable(_) => f.write_str("Callable"),
        }
    }
}

#[derive(Clone)]
pub enum FunctionEntry {
    Callable(Callable),
    /// A nested namespace, reached with `name.function(...)`.
    Namespace(Functions),
}

/// Named callables and namespaces.
#[derive(Clone, Default)]
pub struct Functions {
    entries: IndexMap<String, FunctionEntry>,
}

impl Functions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function returning a plain value.
    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        let callable: Callable = Arc::new(move |args: &[Value]| f(args).map(Output::Value));
        self.entries.insert(name.into(), FunctionEntry::Callable(callable));
    }

    /// Register a filter factory: calling it returns the filter to apply.
    pub fn register_filter_factory<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&[Value]) -> Result<Callable, EvalError> + Send + Sync + 'static,
    {
        let callable: Callable = Arc::new(move |args: &[Value]| f(args).map(Output::Callable));
        self.entries.insert(name.into(), FunctionEntry::Callable(callable));
    }

    /// Register a callable as is.
    pub fn insert(&mut self, name: impl Into<String>, callable: Callable) {
        self.entries.insert(name.into(), FunctionEntry::Callable(callable));
    }

    pub fn insert_namespace(&mut self, name: impl Into<String>, namespace: Functions) {
        self.entries.insert(name.into(), FunctionEntry::Namespace(namespace));
    }

    pub fn with<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.register(name, f);
        self
    }

    pub fn with_namespace(mut self, name: impl Into<String>, namespace: Functions) -> Self {
        self.insert_namespace(name, namespace);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FunctionEntry> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Functions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

/// Wrap a closure as a [`Callable`] returning a plain value.
pub fn callable<F>(f: F) -> Callable
where
    F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
{
    Arc::new(move |args: &[Value]| f(args).map(Output::Value))
}

/// Fetch argument `index`, or fail naming the function.
pub fn arg<'a>(args: &'a [Value], index: usize, function: &str) -> Result<&'a Value, EvalError> {
    args.get(index).ok_or_else(|| {
        EvalError::Function(format!(
            "{function}() expects at least {} argument(s), got {}",
            index + 1,
            args.len()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn call(entry: Option<&FunctionEntry>, args: &[Value]) -> Output {
        match entry {
            Some(FunctionEntry::Callable(f)) => f(args).unwrap(),
            Some(FunctionEntry::Namespace(_)) => panic!("expected callable, got namespace"),
            None => panic!("function not registered"),
        }
    }

    #[test]
    fn test_register_value_function() {
        let functions = Functions::new().with("answer", |_| Ok(Value::from(42)));
        let Output::Value(v) = call(functions.get("answer"), &[]) else {
            panic!("expected value");
        };
        assert_eq!(v, Value::from(42));
    }

    #[test]
    fn test_register_filter_factory() {
        let mut functions = Functions::new();
        functions.register_filter_factory("prefix", |args| {
            let prefix = arg(args, 0, "prefix")?.clone();
            Ok(callable(move |inner| {
                let text = arg(inner, 0, "prefix")?.as_str().unwrap_or_default();
                Ok(Value::from(format!("{}{text}", prefix.as_str().unwrap_or_default())))
            }))
        });

        let Output::Callable(filter) = call(functions.get("prefix"), &[Value::from("foo")]) else {
            panic!("expected callable");
        };
        let Output::Value(v) = filter(&[Value::from("bar")]).unwrap() else {
            panic!("expected value");
        };
        assert_eq!(v, Value::from("foobar"));
    }

    #[test]
    fn test_namespace() {
        let functions = Functions::new()
            .with_namespace("math", Functions::new().with("one", |_| Ok(Value::from(1))));
        let Some(FunctionEntry::Namespace(math)) = functions.get("math") else {
            panic!("expected namespace");
        };
        assert_eq!(math.len(), 1);
        assert!(matches!(math.get("one"), Some(FunctionEntry::Callable(_))));
    }

    #[test]
    fn test_missing_argument() {
        let err = arg(&[], 0, "upper").unwrap_err();
        assert_eq!(
            err,
            EvalError::Function("upper() expects at least 1 argument(s), got 0".into())
        );
    }

    #[test]
    fn test_debug_lists_names() {
        let functions = Functions::new().with("a", |_| Ok(Value::Null));
        assert_eq!(format!("{functions:?}"), "{\"a\"}");
    }
}
