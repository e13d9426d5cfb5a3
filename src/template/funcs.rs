//! Functions callable from template pipelines

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::exec::{display_value, is_truthy};

/// A function callable as `{{ name arg1 arg2 }}` or `{{ arg | name }}`.
///
/// A piped value is passed as the last argument.
pub type TemplateFn = Arc<dyn Fn(&[Value]) -> Result<Value, String> + Send + Sync>;

/// Named functions available to templates
#[derive(Clone)]
pub struct FuncMap {
    funcs: HashMap<String, TemplateFn>,
}

impl Default for FuncMap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FuncMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.funcs.keys().collect();
        names.sort();
        f.debug_struct("FuncMap").field("funcs", &names).finish()
    }
}

impl FuncMap {
    /// A function map with the built-in functions
    pub fn new() -> Self {
        let mut map = Self::empty();
        map.insert("safe", |args| Ok(Value::String(display_value(single("safe", args)?))))
            .insert("upper", |args| {
                Ok(Value::String(display_value(single("upper", args)?).to_uppercase()))
            })
            .insert("lower", |args| {
                Ok(Value::String(display_value(single("lower", args)?).to_lowercase()))
            })
            .insert("trim", |args| {
                Ok(Value::String(display_value(single("trim", args)?).trim().to_string()))
            })
            .insert("len", |args| {
                let len = match single("len", args)? {
                    Value::String(s) => s.chars().count(),
                    Value::Array(items) => items.len(),
                    Value::Object(map) => map.len(),
                    other => return Err(format!("len of {}", kind_of(other))),
                };
                Ok(Value::from(len))
            })
            .insert("default", |args| match args {
                [fallback, value] => Ok(if is_truthy(value) {
                    value.clone()
                } else {
                    fallback.clone()
                }),
                _ => Err(arity("default", 2, args.len())),
            })
            .insert("eq", |args| match args {
                [first, rest @ ..] if !rest.is_empty() => {
                    Ok(Value::Bool(rest.iter().any(|other| other == first)))
                }
                _ => Err("eq needs at least two arguments".to_string()),
            })
            .insert("ne", |args| match args {
                [a, b] => Ok(Value::Bool(a != b)),
                _ => Err(arity("ne", 2, args.len())),
            })
            .insert("not", |args| Ok(Value::Bool(!is_truthy(single("not", args)?))))
            .insert("and", |args| {
                let last = args.last().ok_or_else(|| arity("and", 1, 0))?;
                Ok(args
                    .iter()
                    .find(|v| !is_truthy(v))
                    .unwrap_or(last)
                    .clone())
            })
            .insert("or", |args| {
                let last = args.last().ok_or_else(|| arity("or", 1, 0))?;
                Ok(args.iter().find(|v| is_truthy(v)).unwrap_or(last).clone())
            })
            .insert("join", |args| match args {
                [Value::String(sep), Value::Array(items)] => Ok(Value::String(
                    items
                        .iter()
                        .map(display_value)
                        .collect::<Vec<_>>()
                        .join(sep.as_str()),
                )),
                [_, other] => Err(format!("join over {}", kind_of(other))),
                _ => Err(arity("join", 2, args.len())),
            })
            .insert("json", |args| {
                serde_json::to_string(single("json", args)?)
                    .map(Value::String)
                    .map_err(|e| e.to_string())
            });
        map
    }

    /// A function map without any functions
    pub fn empty() -> Self {
        Self {
            funcs: HashMap::new(),
        }
    }

    /// Register a function, replacing any function with the same name
    pub fn insert<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.funcs.insert(name.into(), Arc::new(f));
        self
    }

    pub fn get(&self, name: &str) -> Option<&TemplateFn> {
        self.funcs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }
}

fn single<'v>(name: &str, args: &'v [Value]) -> Result<&'v Value, String> {
    match args {
        [value] => Ok(value),
        _ => Err(arity(name, 1, args.len())),
    }
}

fn arity(name: &str, want: usize, got: usize) -> String {
    format!("wrong number of args for {}: want {} got {}", name, want, got)
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "nil",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
