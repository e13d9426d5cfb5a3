//! Loading one view source from a filesystem

use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;

use thiserror::Error;

use super::fs::{join, ViewFs};
use crate::template::{FuncMap, TemplateError, TemplateRegistry};

pub const COMPONENTS_DIR: &str = "components";
pub const PAGES_DIR: &str = "pages";
pub const TEMPLATE_EXT: &str = ".html";
pub const BASE_LAYOUT_EXT: &str = ".base.html";
pub const CONTEXT_LAYOUT_EXT: &str = ".layout.html";
/// Layout used when several exist and none is chosen explicitly
pub const DEFAULT_LAYOUT: &str = "default";

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("listing {dir:?}: {source}")]
    List {
        dir: String,
        #[source]
        source: io::Error,
    },

    #[error("reading {path:?}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("parsing {path:?}: {source}")]
    Parse {
        path: String,
        contents: String,
        #[source]
        source: TemplateError,
    },
}

impl LoadError {
    /// Human readable report, with source context for parse errors
    pub fn report(&self) -> String {
        match self {
            LoadError::Parse {
                path,
                contents,
                source,
            } => format!("{}\n{}", self, source.report(contents, path)),
            other => other.to_string(),
        }
    }
}

/// Whether a source provides base layouts or context layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Shared,
    Context,
}

impl SourceKind {
    fn layout_ext(self) -> &'static str {
        match self {
            SourceKind::Shared => BASE_LAYOUT_EXT,
            SourceKind::Context => CONTEXT_LAYOUT_EXT,
        }
    }
}

/// The views of one context, or of the shared source
#[derive(Debug)]
pub struct ViewSource {
    origin: Arc<dyn ViewFs>,
    kind: SourceKind,
    components: Arc<TemplateRegistry>,
    pages: BTreeMap<String, String>,
    layouts: BTreeMap<String, String>,
    default_layout: Option<String>,
}

impl ViewSource {
    /// Scan `origin` into a new source. Nothing is returned on failure.
    pub fn load(origin: Arc<dyn ViewFs>, kind: SourceKind, funcs: &FuncMap) -> Result<Self, LoadError> {
        let mut components = TemplateRegistry::new();
        for (name, path) in files(origin.as_ref(), COMPONENTS_DIR, TEMPLATE_EXT)? {
            let contents = read(origin.as_ref(), &path)?;
            components
                .parse(&name, &contents, funcs)
                .map_err(|source| LoadError::Parse {
                    path,
                    contents,
                    source,
                })?;
        }

        let mut pages = BTreeMap::new();
        for (name, path) in files(origin.as_ref(), PAGES_DIR, TEMPLATE_EXT)? {
            pages.insert(name, read(origin.as_ref(), &path)?);
        }

        let mut layouts = BTreeMap::new();
        for (name, path) in files(origin.as_ref(), "", kind.layout_ext())? {
            layouts.insert(name, read(origin.as_ref(), &path)?);
        }

        let default_layout = pick_default(&layouts);

        tracing::debug!(
            ?kind,
            components = components.len(),
            pages = pages.len(),
            layouts = layouts.len(),
            default_layout = default_layout.as_deref().unwrap_or(""),
            "loaded view source"
        );

        Ok(Self {
            origin,
            kind,
            components: Arc::new(components),
            pages,
            layouts,
            default_layout,
        })
    }

    /// Load a fresh copy of this source from its origin
    pub fn reload(&self, funcs: &FuncMap) -> Result<Self, LoadError> {
        Self::load(self.origin.clone(), self.kind, funcs)
    }

    pub fn components(&self) -> &Arc<TemplateRegistry> {
        &self.components
    }

    pub fn page(&self, name: &str) -> Option<&str> {
        self.pages.get(name).map(String::as_str)
    }

    pub fn layout(&self, name: &str) -> Option<&str> {
        self.layouts.get(name).map(String::as_str)
    }

    pub fn has_layout(&self, name: &str) -> bool {
        self.layouts.contains_key(name)
    }

    pub fn default_layout(&self) -> Option<&str> {
        self.default_layout.as_deref()
    }
}

/// `(stem, path)` of every file in `dir` ending with `ext`
fn files(fs: &dyn ViewFs, dir: &str, ext: &str) -> Result<Vec<(String, String)>, LoadError> {
    let names = fs.list(dir).map_err(|source| LoadError::List {
        dir: dir.to_string(),
        source,
    })?;
    Ok(names
        .into_iter()
        .filter_map(|name| {
            let stem = name.strip_suffix(ext)?;
            if stem.is_empty() {
                return None;
            }
            Some((stem.to_string(), join(dir, &name)))
        })
        .collect())
}

fn read(fs: &dyn ViewFs, path: &str) -> Result<String, LoadError> {
    fs.read(path).map_err(|source| LoadError::Read {
        path: path.to_string(),
        source,
    })
}

/// A lone layout is the default; otherwise only one named `default` is
fn pick_default(layouts: &BTreeMap<String, String>) -> Option<String> {
    if layouts.len() == 1 {
        return layouts.keys().next().cloned();
    }
    layouts
        .contains_key(DEFAULT_LAYOUT)
        .then(|| DEFAULT_LAYOUT.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::MemoryFs;

    fn load(files: &[(&str, &str)], kind: SourceKind) -> Result<ViewSource, LoadError> {
        let fs = MemoryFs::from_files(files.iter().copied());
        ViewSource::load(Arc::new(fs), kind, &FuncMap::new())
    }

    #[test]
    fn test_loads_components_pages_and_base_layouts() {
        let source = load(
            &[
                ("default.base.html", "<html>{{block \"content\" .}}{{end}}</html>"),
                ("ignored.layout.html", "x"),
                ("README.md", "x"),
                ("components/card.html", "<div>{{.}}</div>"),
                ("components/notes.txt", "x"),
                ("pages/home.html", "home"),
            ],
            SourceKind::Shared,
        )
        .expect("Should load");

        assert_eq!(source.components().names(), vec!["card"]);
        assert_eq!(source.page("home"), Some("home"));
        assert_eq!(source.page("card"), None);
        assert!(source.has_layout("default"));
        assert!(!source.has_layout("ignored"));
        assert_eq!(source.default_layout(), Some("default"));
    }

    #[test]
    fn test_context_uses_layout_suffix() {
        let source = load(
            &[("blog.layout.html", "L"), ("site.base.html", "B")],
            SourceKind::Context,
        )
        .expect("Should load");
        assert_eq!(source.layout("blog"), Some("L"));
        assert!(!source.has_layout("site"));
    }

    #[test]
    fn test_single_layout_is_default() {
        let source = load(&[("main.base.html", "M")], SourceKind::Shared).expect("Should load");
        assert_eq!(source.default_layout(), Some("main"));
    }

    #[test]
    fn test_default_among_many() {
        let source = load(
            &[("default.base.html", "D"), ("other.base.html", "O")],
            SourceKind::Shared,
        )
        .expect("Should load");
        assert_eq!(source.default_layout(), Some("default"));
    }

    #[test]
    fn test_no_default_among_many() {
        let source = load(
            &[("one.base.html", "1"), ("two.base.html", "2")],
            SourceKind::Shared,
        )
        .expect("Should load");
        assert_eq!(source.default_layout(), None);
    }

    #[test]
    fn test_no_layouts() {
        let source = load(&[("pages/p.html", "p")], SourceKind::Shared).expect("Should load");
        assert_eq!(source.default_layout(), None);
    }

    #[test]
    fn test_component_parse_error_names_the_file() {
        let err = load(&[("components/bad.html", "{{ if }}")], SourceKind::Shared)
            .expect_err("Should fail");
        match &err {
            LoadError::Parse { path, .. } => assert_eq!(path, "components/bad.html"),
            other => panic!("Expected parse error, got {:?}", other),
        }
        assert!(err.report().contains("components/bad.html"));
    }

    #[test]
    fn test_pages_are_not_parsed_at_load() {
        let source =
            load(&[("pages/bad.html", "{{ if }}")], SourceKind::Shared).expect("Should load");
        assert_eq!(source.page("bad"), Some("{{ if }}"));
    }

    #[test]
    fn test_reload_sees_changes() {
        let fs = Arc::new(MemoryFs::from_files([("pages/a.html", "one")]));
        let source = ViewSource::load(fs.clone(), SourceKind::Shared, &FuncMap::new())
            .expect("Should load");
        fs.insert("pages/a.html", "two");
        assert_eq!(source.page("a"), Some("one"));
        let reloaded = source.reload(&FuncMap::new()).expect("Should reload");
        assert_eq!(reloaded.page("a"), Some("two"));
    }
}
