//! Named, overridable templates
//!
//! View files are parsed into a [`TemplateRegistry`] of named definitions and
//! executed by an [`Executor`] against JSON data. Pages, layouts and components
//! share one namespace per compiled template, so a page can override any block
//! its layout declares.
//!
//! # Example
//!
//! ```rust
//! use layered_views::template::{Executor, FuncMap, TemplateRegistry};
//! use serde_json::json;
//!
//! let funcs = FuncMap::new();
//! let mut registry = TemplateRegistry::new();
//! registry
//!     .parse("root", r#"<h1>{{block "title" .}}{{.Site}}{{end}}</h1>"#, &funcs)
//!     .unwrap();
//!
//! let mut out = String::new();
//! Executor::new(&registry, &funcs)
//!     .execute("root", &json!({"Site": "Home"}), &mut out)
//!     .unwrap();
//! assert_eq!(out, "<h1>Home</h1>");
//! ```

mod exec;
mod funcs;
mod registry;

pub use exec::{display_value, escape_html, is_truthy, ExecError, Executor, TemplateLookup, MAX_DEPTH};
pub use funcs::{FuncMap, TemplateFn};
pub use registry::{TemplateDefinition, TemplateError, TemplateRegistry};
