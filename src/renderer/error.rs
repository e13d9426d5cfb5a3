//! Errors reported by the renderer

use std::io;

use thiserror::Error;

use crate::address::AddressError;
use crate::template::{ExecError, TemplateError};
use crate::views::{LoadError, ReloadError};

/// Boxed error returned by data providers
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while creating a renderer or registering data
#[derive(Error, Debug)]
pub enum CreateError {
    #[error("views are not available: {0}")]
    MissingViews(#[source] io::Error),

    #[error("loading shared views: {0}")]
    Load(#[from] LoadError),

    #[error("unknown layout {0:?}")]
    UnknownLayout(String),

    #[error("unknown context {0:?}")]
    UnknownContext(String),
}

/// Errors that can occur while registering a context
#[derive(Error, Debug)]
pub enum ContextError {
    #[error("context name is empty")]
    EmptyName,

    #[error("context name {0:?} contains a reserved character")]
    InvalidName(String),

    #[error("views for context {name:?} are not available: {source}")]
    MissingViews {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("context {0:?} is already registered")]
    AlreadyAdded(String),

    #[error("loading views for context {name:?}: {source}")]
    Load {
        name: String,
        #[source]
        source: LoadError,
    },
}

/// Errors that can occur during a render
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("invalid template reference {reference:?}: {source}")]
    InvalidReference {
        reference: String,
        #[source]
        source: AddressError,
    },

    #[error("unknown context {0:?}")]
    UnknownContext(String),

    #[error("component {name:?} not found in {}", describe(.context))]
    ComponentNotFound { context: String, name: String },

    #[error("page {name:?} not found in {}", describe(.context))]
    PageNotFound { context: String, name: String },

    #[error("fragment {fragment:?} not found in template {key:?}")]
    FragmentNotFound { key: String, fragment: String },

    #[error("layout {name:?} not found in {}", describe(.context))]
    LayoutNotFound { context: String, name: String },

    #[error("parsing {path} in {}: {source}", describe(.context))]
    Parse {
        /// Source the file was read from, empty for shared
        context: String,
        path: String,
        #[source]
        source: TemplateError,
    },

    #[error("executing {key:?}: {source}")]
    Execute {
        key: String,
        #[source]
        source: ExecError,
    },

    #[error("serializing render data: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("data provider for layout {layout:?} failed: {source}")]
    Data {
        layout: String,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    Reload(#[from] ReloadError),

    #[error("writing output: {0}")]
    Write(#[from] io::Error),
}

fn describe(context: &str) -> String {
    if context.is_empty() {
        "shared views".to_string()
    } else {
        format!("context {:?}", context)
    }
}

/// Any error the renderer can report
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Create(#[from] CreateError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl Error {
    /// Whether the error happened while rendering, as opposed to setup
    pub fn is_render_failure(&self) -> bool {
        matches!(self, Error::Render(_))
    }
}
