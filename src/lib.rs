//! Layered views - hierarchical view composition and caching HTML rendering
//!
//! Views are organised in a shared source plus any number of contexts. A page
//! is framed by a base layout (shared) and a context layout, and can pull in
//! reusable components that contexts may override.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use layered_views::{MemoryFs, Renderer, RendererConfig};
//! use serde_json::json;
//!
//! let shared = MemoryFs::from_files([
//!     ("default.base.html", r#"<html>{{block "content" .}}{{end}}</html>"#),
//!     ("pages/hello.html", "<p>Hello {{.Name}}</p>"),
//! ]);
//! let renderer = Renderer::new(Arc::new(shared), RendererConfig::default()).unwrap();
//!
//! let html = renderer
//!     .render_to_string("", "hello", &json!({"Name": "World"}))
//!     .unwrap();
//! assert_eq!(html, "<html><p>Hello World</p></html>");
//! ```

pub mod address;
pub mod error;
pub mod parser;
pub mod renderer;
pub mod template;
pub mod views;

pub use address::{AddressError, TemplateAddress};
pub use error::ParseError;
pub use renderer::{
    BoxError, CompiledTemplate, ConfigError, ContextError, CreateError, DataProvider, Error,
    RenderError, Renderer, RendererConfig,
};
pub use template::{ExecError, FuncMap, TemplateError, TemplateRegistry};
pub use views::{DirFs, LoadError, MemoryFs, ViewFs, ViewSource, Views};
