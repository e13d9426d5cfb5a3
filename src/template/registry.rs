//! Template registry for storing and retrieving named template definitions
//!
//! Parsing a source under a name defines that name as the source's top-level
//! body, plus one definition for every `define` and `block` inside it. A later
//! parse replaces an existing definition unless its body is blank.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use super::exec::TemplateLookup;
use super::funcs::FuncMap;
use crate::error::{ParseError, Span};
use crate::parser::{self, ast::is_blank_body, visit_functions, Node};

/// Errors that can occur while adding templates to a registry
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TemplateError {
    /// Syntax errors in the template source
    #[error("template {name:?}: {}", format_parse_errors(.errors))]
    Syntax {
        name: String,
        errors: Vec<ParseError>,
    },

    /// Two non-empty definitions of one name in the same source
    #[error("template {template:?}: multiple definition of template {name:?}")]
    MultipleDefinition { template: String, name: String },

    /// A pipeline calls a function that is not in the function map
    #[error("template {template:?}: function {function:?} not defined")]
    UnknownFunction {
        template: String,
        function: String,
        span: Span,
    },
}

impl TemplateError {
    /// Render the error against its source with ariadne, where it has a location
    pub fn report(&self, source: &str, filename: &str) -> String {
        match self {
            TemplateError::Syntax { errors, .. } => errors
                .iter()
                .map(|e| e.format(source, filename))
                .collect::<Vec<_>>()
                .join("\n"),
            TemplateError::UnknownFunction { function, span, .. } => ParseError::Syntax {
                span: span.clone(),
                message: format!("function {:?} not defined", function),
                expected: vec![],
            }
            .format(source, filename),
            other => other.to_string(),
        }
    }
}

fn format_parse_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A stored template definition
#[derive(Debug, Clone)]
pub struct TemplateDefinition {
    /// Template name
    pub name: String,
    /// Body with `define`s removed and `block`s turned into template calls
    pub body: Arc<Vec<Node>>,
}

/// Registry for storing template definitions
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, TemplateDefinition>,
}

impl TemplateRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `source` and add its definitions under `name`.
    ///
    /// On error the registry is left unchanged.
    pub fn parse(&mut self, name: &str, source: &str, funcs: &FuncMap) -> Result<(), TemplateError> {
        let doc = parser::parse(source).map_err(|errors| TemplateError::Syntax {
            name: name.to_string(),
            errors,
        })?;

        let mut unknown = None;
        visit_functions(&doc.nodes, &mut |function| {
            if unknown.is_none() && !funcs.contains(&function.node) {
                unknown = Some(function.clone());
            }
        });
        if let Some(function) = unknown {
            return Err(TemplateError::UnknownFunction {
                template: name.to_string(),
                function: function.node,
                span: function.span,
            });
        }

        let mut found = Definitions::new(name);
        let body = found.hoist(doc.nodes)?;
        found.add(name.to_string(), body)?;

        for (def_name, body) in found.into_ordered() {
            self.associate(def_name, body);
        }
        Ok(())
    }

    /// A blank body never replaces an existing definition
    fn associate(&mut self, name: String, body: Vec<Node>) {
        if is_blank_body(&body) && self.templates.contains_key(&name) {
            return;
        }
        self.templates.insert(
            name.clone(),
            TemplateDefinition {
                name,
                body: Arc::new(body),
            },
        );
    }

    /// Get a template by name
    pub fn get(&self, name: &str) -> Option<&TemplateDefinition> {
        self.templates.get(name)
    }

    /// Check if a template exists
    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// All template names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl TemplateLookup for TemplateRegistry {
    fn lookup(&self, name: &str) -> Option<&TemplateDefinition> {
        self.get(name)
    }
}

/// Definitions collected from a single source, in discovery order
struct Definitions<'a> {
    template: &'a str,
    order: Vec<String>,
    bodies: HashMap<String, Vec<Node>>,
}

impl<'a> Definitions<'a> {
    fn new(template: &'a str) -> Self {
        Self {
            template,
            order: Vec::new(),
            bodies: HashMap::new(),
        }
    }

    /// Pull `define`s and `block`s out of a body, recursively
    fn hoist(&mut self, nodes: Vec<Node>) -> Result<Vec<Node>, TemplateError> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                Node::Define { name, body } => {
                    let body = self.hoist(body)?;
                    self.add(name, body)?;
                }
                Node::Block { name, data, body } => {
                    let body = self.hoist(body)?;
                    self.add(name.clone(), body)?;
                    out.push(Node::Template {
                        name,
                        data: Some(data),
                    });
                }
                Node::If {
                    condition,
                    then,
                    otherwise,
                } => out.push(Node::If {
                    condition,
                    then: self.hoist(then)?,
                    otherwise: self.hoist(otherwise)?,
                }),
                Node::Range {
                    over,
                    body,
                    otherwise,
                } => out.push(Node::Range {
                    over,
                    body: self.hoist(body)?,
                    otherwise: self.hoist(otherwise)?,
                }),
                Node::With {
                    value,
                    body,
                    otherwise,
                } => out.push(Node::With {
                    value,
                    body: self.hoist(body)?,
                    otherwise: self.hoist(otherwise)?,
                }),
                other => out.push(other),
            }
        }
        Ok(out)
    }

    fn add(&mut self, name: String, body: Vec<Node>) -> Result<(), TemplateError> {
        let existing_blank = self.bodies.get(&name).map(|existing| is_blank_body(existing));
        match existing_blank {
            None => {
                self.order.push(name.clone());
                self.bodies.insert(name, body);
            }
            Some(true) => {
                self.bodies.insert(name, body);
            }
            Some(false) if is_blank_body(&body) => {}
            Some(false) => {
                return Err(TemplateError::MultipleDefinition {
                    template: self.template.to_string(),
                    name,
                })
            }
        }
        Ok(())
    }

    fn into_ordered(mut self) -> Vec<(String, Vec<Node>)> {
        self.order
            .into_iter()
            .filter_map(|name| self.bodies.remove(&name).map(|body| (name, body)))
            .collect()
    }
}
