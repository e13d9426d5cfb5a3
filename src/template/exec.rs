//! Template execution
//!
//! Executes a named template against JSON data. Named templates are resolved
//! through a [`TemplateLookup`], which lets a compiled page search its own
//! definitions before the shared component layers.

use serde_json::{Number, Value};
use thiserror::Error;

use super::funcs::{kind_of, FuncMap};
use super::registry::TemplateDefinition;
use crate::parser::{Command, Node, Operand, Pipeline};

/// Maximum nesting of template calls and action bodies (`if`, `with`,
/// `range`), kept low enough for a 2 MiB thread stack in debug builds.
pub const MAX_DEPTH: usize = 128;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecError {
    #[error("template {template:?}: field .{field} not found")]
    MissingField { template: String, field: String },

    #[error("template {template:?}: can't access field .{field} on {kind}")]
    NotAnObject {
        template: String,
        field: String,
        kind: &'static str,
    },

    #[error("template {template:?}: no such template {name:?}")]
    UndefinedTemplate { template: String, name: String },

    #[error("template {template:?}: function {name:?} not defined")]
    UnknownFunction { template: String, name: String },

    #[error("template {template:?}: error calling {name}: {message}")]
    Function {
        template: String,
        name: String,
        message: String,
    },

    #[error("template {template:?}: {kind} can't take arguments")]
    NotCallable { template: String, kind: &'static str },

    #[error("template {template:?}: range can't iterate over {kind}")]
    RangeOver { template: String, kind: &'static str },

    #[error("exceeded maximum template depth ({0})")]
    DepthExceeded(usize),
}

/// Resolves template names to definitions
pub trait TemplateLookup {
    fn lookup(&self, name: &str) -> Option<&TemplateDefinition>;
}

/// Executes templates resolved through a lookup
pub struct Executor<'t, L: TemplateLookup + ?Sized> {
    templates: &'t L,
    funcs: &'t FuncMap,
}

/// Mutable state threaded through one execution
struct Frame<'n> {
    template: &'n str,
    depth: usize,
}

impl<'t, L: TemplateLookup + ?Sized> Executor<'t, L> {
    pub fn new(templates: &'t L, funcs: &'t FuncMap) -> Self {
        Self { templates, funcs }
    }

    /// Execute the template `name` with `data` as dot, appending to `out`
    pub fn execute(&self, name: &str, data: &Value, out: &mut String) -> Result<(), ExecError> {
        let definition =
            self.templates
                .lookup(name)
                .ok_or_else(|| ExecError::UndefinedTemplate {
                    template: name.to_string(),
                    name: name.to_string(),
                })?;
        let frame = Frame {
            template: name,
            depth: 0,
        };
        self.run(&definition.body, data, &frame, out)
    }

    fn run(
        &self,
        nodes: &[Node],
        dot: &Value,
        frame: &Frame<'_>,
        out: &mut String,
    ) -> Result<(), ExecError> {
        let depth = frame.depth + 1;
        if depth > MAX_DEPTH {
            return Err(ExecError::DepthExceeded(MAX_DEPTH));
        }
        let frame = &Frame {
            template: frame.template,
            depth,
        };

        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Output(pipeline) => {
                    let value = self.pipeline(pipeline, dot, frame, false)?;
                    let text = display_value(&value);
                    if pipeline.is_safe() {
                        out.push_str(&text);
                    } else {
                        escape_html(&text, out);
                    }
                }
                Node::If {
                    condition,
                    then,
                    otherwise,
                } => {
                    let value = self.pipeline(condition, dot, frame, true)?;
                    let branch = if is_truthy(&value) { then } else { otherwise };
                    self.run(branch, dot, frame, out)?;
                }
                Node::With {
                    value,
                    body,
                    otherwise,
                } => {
                    let value = self.pipeline(value, dot, frame, true)?;
                    if is_truthy(&value) {
                        self.run(body, &value, frame, out)?;
                    } else {
                        self.run(otherwise, dot, frame, out)?;
                    }
                }
                Node::Range {
                    over,
                    body,
                    otherwise,
                } => {
                    let value = self.pipeline(over, dot, frame, false)?;
                    let items: Vec<&Value> = match &value {
                        Value::Array(items) => items.iter().collect(),
                        Value::Object(map) => map.values().collect(),
                        Value::Null => Vec::new(),
                        other => {
                            return Err(ExecError::RangeOver {
                                template: frame.template.to_string(),
                                kind: kind_of(other),
                            })
                        }
                    };
                    if items.is_empty() {
                        self.run(otherwise, dot, frame, out)?;
                    }
                    for item in items {
                        self.run(body, item, frame, out)?;
                    }
                }
                Node::Define { .. } => {}
                Node::Block { name, data, .. } => {
                    self.call(name, Some(data), dot, frame, out)?;
                }
                Node::Template { name, data } => {
                    self.call(name, data.as_ref(), dot, frame, out)?;
                }
            }
        }
        Ok(())
    }

    fn call(
        &self,
        name: &str,
        data: Option<&Pipeline>,
        dot: &Value,
        frame: &Frame<'_>,
        out: &mut String,
    ) -> Result<(), ExecError> {
        let definition =
            self.templates
                .lookup(name)
                .ok_or_else(|| ExecError::UndefinedTemplate {
                    template: frame.template.to_string(),
                    name: name.to_string(),
                })?;
        let data = match data {
            Some(pipeline) => self.pipeline(pipeline, dot, frame, false)?,
            None => Value::Null,
        };
        let inner = Frame {
            template: name,
            depth: frame.depth,
        };
        self.run(&definition.body, &data, &inner, out)
    }

    /// Evaluate a pipeline. `lenient` turns missing fields into nil, as used by
    /// `if` and `with` conditions.
    fn pipeline(
        &self,
        pipeline: &Pipeline,
        dot: &Value,
        frame: &Frame<'_>,
        lenient: bool,
    ) -> Result<Value, ExecError> {
        let mut piped = None;
        for command in &pipeline.commands {
            piped = Some(self.command(command, dot, piped, frame, lenient)?);
        }
        Ok(piped.unwrap_or(Value::Null))
    }

    fn command(
        &self,
        command: &Command,
        dot: &Value,
        piped: Option<Value>,
        frame: &Frame<'_>,
        lenient: bool,
    ) -> Result<Value, ExecError> {
        if let Some(name) = command.function() {
            let mut args = Vec::with_capacity(command.operands.len());
            for operand in &command.operands[1..] {
                args.push(self.operand(operand, dot, frame, lenient)?);
            }
            args.extend(piped);
            return self.invoke(name, &args, frame);
        }

        match command.operands.as_slice() {
            [operand] if piped.is_none() => self.operand(operand, dot, frame, lenient),
            [operand, ..] => Err(ExecError::NotCallable {
                template: frame.template.to_string(),
                kind: operand_kind(operand),
            }),
            [] => Ok(Value::Null),
        }
    }

    fn operand(
        &self,
        operand: &Operand,
        dot: &Value,
        frame: &Frame<'_>,
        lenient: bool,
    ) -> Result<Value, ExecError> {
        match operand {
            Operand::Dot => Ok(dot.clone()),
            Operand::Field(path) => field(dot, path, frame, lenient),
            Operand::Function(name) => self.invoke(&name.node, &[], frame),
            Operand::String(s) => Ok(Value::String(s.clone())),
            Operand::Number(n) => Ok(number(*n)),
            Operand::Bool(b) => Ok(Value::Bool(*b)),
            Operand::Nil => Ok(Value::Null),
            Operand::Pipeline(inner) => self.pipeline(inner, dot, frame, lenient),
        }
    }

    fn invoke(&self, name: &str, args: &[Value], frame: &Frame<'_>) -> Result<Value, ExecError> {
        let f = self
            .funcs
            .get(name)
            .ok_or_else(|| ExecError::UnknownFunction {
                template: frame.template.to_string(),
                name: name.to_string(),
            })?;
        f(args).map_err(|message| ExecError::Function {
            template: frame.template.to_string(),
            name: name.to_string(),
            message,
        })
    }
}

fn field(
    dot: &Value,
    path: &[String],
    frame: &Frame<'_>,
    lenient: bool,
) -> Result<Value, ExecError> {
    let mut current = dot;
    for (i, segment) in path.iter().enumerate() {
        let next = match current {
            Value::Object(map) => map.get(segment),
            _ if lenient => None,
            other => {
                return Err(ExecError::NotAnObject {
                    template: frame.template.to_string(),
                    field: path[..=i].join("."),
                    kind: kind_of(other),
                })
            }
        };
        match next {
            Some(value) => current = value,
            None if lenient => return Ok(Value::Null),
            None => {
                return Err(ExecError::MissingField {
                    template: frame.template.to_string(),
                    field: path[..=i].join("."),
                })
            }
        }
    }
    Ok(current.clone())
}

fn operand_kind(operand: &Operand) -> &'static str {
    match operand {
        Operand::Dot => "dot",
        Operand::Field(_) => "field",
        Operand::Function(_) => "function",
        Operand::String(_) => "string",
        Operand::Number(_) => "number",
        Operand::Bool(_) => "bool",
        Operand::Nil => "nil",
        Operand::Pipeline(_) => "pipeline",
    }
}

/// Integral literals become integers so that `{{ 3 }}` prints `3`
fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// Go-style truthiness: empty values are false
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Text form of a value as printed by `{{ }}`
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Escape text for element content and quoted attribute values
pub fn escape_html(text: &str, out: &mut String) {
    html_escape::encode_quoted_attribute_to_string(text, out);
}
