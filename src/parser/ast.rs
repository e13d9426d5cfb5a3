//! Abstract Syntax Tree types for the view template language

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Root AST node - one parsed template source
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub nodes: Vec<Node>,
}

/// A node of a template body
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text, emitted verbatim
    Text(String),
    /// `{{ pipeline }}`: evaluated and printed
    Output(Pipeline),
    /// `{{if p}} ... {{else}} ... {{end}}`
    If {
        condition: Pipeline,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
    /// `{{range p}} ... {{else}} ... {{end}}`
    Range {
        over: Pipeline,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
    /// `{{with p}} ... {{else}} ... {{end}}`
    With {
        value: Pipeline,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
    /// `{{block "name" p}} ... {{end}}`: defines `name` and calls it in place
    Block {
        name: String,
        data: Pipeline,
        body: Vec<Node>,
    },
    /// `{{define "name"}} ... {{end}}`
    Define { name: String, body: Vec<Node> },
    /// `{{template "name" p}}`
    Template {
        name: String,
        data: Option<Pipeline>,
    },
}

impl Node {
    /// Whether the node produces nothing but whitespace when executed.
    ///
    /// Definitions count as empty: they are hoisted out of the body.
    pub fn is_blank(&self) -> bool {
        match self {
            Node::Text(text) => text.trim().is_empty(),
            Node::Define { .. } => true,
            _ => false,
        }
    }
}

/// Returns true if a template body renders only whitespace
pub fn is_blank_body(nodes: &[Node]) -> bool {
    nodes.iter().all(Node::is_blank)
}

/// Commands chained with `|`
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub commands: Vec<Command>,
}

impl Pipeline {
    /// A pipeline that evaluates to the current data (`.`)
    pub fn dot() -> Self {
        Self {
            commands: vec![Command {
                operands: vec![Operand::Dot],
            }],
        }
    }

    /// The pipeline's output is trusted HTML when its last command is `safe`
    pub fn is_safe(&self) -> bool {
        self.commands
            .last()
            .and_then(|cmd| cmd.function())
            .is_some_and(|name| name == "safe")
    }
}

/// One stage of a pipeline: a single operand or a function with arguments
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub operands: Vec<Operand>,
}

impl Command {
    /// The function name, if this command is a function call
    pub fn function(&self) -> Option<&str> {
        match self.operands.first() {
            Some(Operand::Function(name)) => Some(name.node.as_str()),
            _ => None,
        }
    }
}

/// An argument or value inside an action
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// `.`
    Dot,
    /// `.Field.Sub`
    Field(Vec<String>),
    /// A function name
    Function(Spanned<String>),
    String(String),
    Number(f64),
    Bool(bool),
    Nil,
    /// `( pipeline )`
    Pipeline(Box<Pipeline>),
}

/// Visit every function name referenced by a body, including nested ones
pub fn visit_functions<'a>(nodes: &'a [Node], f: &mut impl FnMut(&'a Spanned<String>)) {
    fn pipeline<'a>(p: &'a Pipeline, f: &mut impl FnMut(&'a Spanned<String>)) {
        for cmd in &p.commands {
            for op in &cmd.operands {
                match op {
                    Operand::Function(name) => f(name),
                    Operand::Pipeline(inner) => pipeline(inner, f),
                    _ => {}
                }
            }
        }
    }

    for node in nodes {
        match node {
            Node::Text(_) => {}
            Node::Output(p) => pipeline(p, f),
            Node::If {
                condition,
                then,
                otherwise,
            } => {
                pipeline(condition, f);
                visit_functions(then, f);
                visit_functions(otherwise, f);
            }
            Node::Range {
                over: p,
                body,
                otherwise,
            }
            | Node::With {
                value: p,
                body,
                otherwise,
            } => {
                pipeline(p, f);
                visit_functions(body, f);
                visit_functions(otherwise, f);
            }
            Node::Block { data, body, .. } => {
                pipeline(data, f);
                visit_functions(body, f);
            }
            Node::Define { body, .. } => visit_functions(body, f),
            Node::Template { data, .. } => {
                if let Some(p) = data {
                    pipeline(p, f);
                }
            }
        }
    }
}
