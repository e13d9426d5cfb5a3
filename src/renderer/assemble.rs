//! Linking base layout, context layout, page and components into one template

use std::sync::Arc;

use crate::template::{FuncMap, TemplateDefinition, TemplateLookup, TemplateRegistry};
use crate::views::{Layer, Overlay, Views, BASE_LAYOUT_EXT, CONTEXT_LAYOUT_EXT, PAGES_DIR};

use super::error::RenderError;
use super::resolve::{Resolved, Target};

/// Root used when no base layout is in effect
pub const SYNTHETIC_ROOT: &str = r#"{{block "layout" .}}{{block "content" .}}{{end}}{{end}}"#;
/// Name the context layout is parsed under
pub const LAYOUT_BLOCK: &str = "layout";
/// Name the page body is parsed under
pub const CONTENT_BLOCK: &str = "content";

/// A fully linked template, immutable once built
#[derive(Debug)]
pub struct CompiledTemplate {
    entry: String,
    own: TemplateRegistry,
    layers: Vec<Arc<TemplateRegistry>>,
}

impl CompiledTemplate {
    /// Template executed when no fragment is requested
    pub fn entry(&self) -> &str {
        &self.entry
    }
}

impl TemplateLookup for CompiledTemplate {
    fn lookup(&self, name: &str) -> Option<&TemplateDefinition> {
        self.own
            .get(name)
            .or_else(|| self.layers.iter().find_map(|layer| layer.get(name)))
    }
}

/// Build the template for a resolved request
pub(crate) fn assemble(
    views: &Views,
    resolved: &Resolved,
    funcs: &FuncMap,
) -> Result<CompiledTemplate, RenderError> {
    let overlay = views
        .overlay(resolved.context.name.as_deref())
        .ok_or_else(|| RenderError::UnknownContext(resolved.context_name().to_string()))?;
    let layers = overlay.component_layers();

    let (base, layout, page) = match &resolved.target {
        Target::Component(name) => {
            if !overlay.has_component(name) {
                return Err(RenderError::ComponentNotFound {
                    context: resolved.context_name().to_string(),
                    name: name.clone(),
                });
            }
            return Ok(CompiledTemplate {
                entry: name.clone(),
                own: TemplateRegistry::new(),
                layers,
            });
        }
        Target::Page { base, layout, page } => (base, layout, page),
    };

    let mut own = TemplateRegistry::new();

    match base {
        Some(name) => {
            let source = overlay
                .base_layout(name)
                .ok_or_else(|| RenderError::LayoutNotFound {
                    context: String::new(),
                    name: name.clone(),
                })?;
            parse(
                &mut own,
                &resolved.key,
                source,
                Origin::new("", format!("{}{}", name, BASE_LAYOUT_EXT)),
                funcs,
            )?;
        }
        None => parse(
            &mut own,
            &resolved.key,
            SYNTHETIC_ROOT,
            Origin::new("", "(root)".to_string()),
            funcs,
        )?,
    }

    if let Some((owner, name)) = layout {
        let layout_overlay = layout_overlay(views, &overlay, resolved, owner)?;
        let source = layout_overlay
            .layout(name)
            .ok_or_else(|| RenderError::LayoutNotFound {
                context: owner.clone(),
                name: name.clone(),
            })?;
        parse(
            &mut own,
            LAYOUT_BLOCK,
            source,
            Origin::new(owner, format!("{}{}", name, CONTEXT_LAYOUT_EXT)),
            funcs,
        )?;
    }

    let (layer, source) = overlay.page(page).ok_or_else(|| RenderError::PageNotFound {
        context: resolved.context_name().to_string(),
        name: page.clone(),
    })?;
    let page_context = match layer {
        Layer::Context => resolved.context_name(),
        Layer::Shared => "",
    };
    parse(
        &mut own,
        CONTENT_BLOCK,
        source,
        Origin::new(page_context, format!("{}/{}.html", PAGES_DIR, page)),
        funcs,
    )?;

    tracing::debug!(
        key = %resolved.key,
        templates = ?own.names(),
        "assembled template"
    );

    Ok(CompiledTemplate {
        entry: resolved.key.clone(),
        own,
        layers,
    })
}

/// Admin renders take their layout from the admin context
fn layout_overlay<'v>(
    views: &'v Views,
    overlay: &Overlay<'v>,
    resolved: &Resolved,
    owner: &str,
) -> Result<Overlay<'v>, RenderError> {
    if !resolved.context.admin {
        return Ok(*overlay);
    }
    views
        .overlay(Some(owner))
        .ok_or_else(|| RenderError::LayoutNotFound {
            context: owner.to_string(),
            name: String::new(),
        })
}

/// The view source and file a body was read from
struct Origin {
    context: String,
    path: String,
}

impl Origin {
    fn new(context: &str, path: String) -> Self {
        Self {
            context: context.to_string(),
            path,
        }
    }
}

fn parse(
    registry: &mut TemplateRegistry,
    name: &str,
    source: &str,
    origin: Origin,
    funcs: &FuncMap,
) -> Result<(), RenderError> {
    registry
        .parse(name, source, funcs)
        .map_err(|source| RenderError::Parse {
            context: origin.context,
            path: origin.path,
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::TemplateAddress;
    use crate::renderer::resolve::{resolve, RenderContext};
    use crate::template::Executor;
    use crate::views::{MemoryFs, SourceKind, ViewSource};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn source(files: &[(&str, &str)], kind: SourceKind) -> ViewSource {
        let fs = MemoryFs::from_files(files.iter().copied());
        ViewSource::load(Arc::new(fs), kind, &FuncMap::new()).expect("Should load")
    }

    fn build(views: &Views, context: &str, reference: &str) -> Result<String, RenderError> {
        let funcs = FuncMap::new();
        let address = TemplateAddress::parse(reference).expect("valid reference");
        let context = RenderContext::parse(context, "admin");
        let resolved = resolve(views, &context, &address, "admin")?;
        let compiled = assemble(views, &resolved, &funcs)?;
        let entry = resolved.fragment.as_deref().unwrap_or(compiled.entry());
        let mut out = String::new();
        Executor::new(&compiled, &funcs)
            .execute(entry, &json!({}), &mut out)
            .map_err(|source| RenderError::Execute {
                key: resolved.key.clone(),
                source,
            })?;
        Ok(out)
    }

    #[test]
    fn test_synthetic_root_without_base_layout() {
        let views = Views::new(source(&[("pages/home.html", "Home")], SourceKind::Shared));
        assert_eq!(build(&views, "", "home").expect("renders"), "Home");
    }

    #[test]
    fn test_base_and_context_layouts_nest() {
        let shared = source(
            &[(
                "default.base.html",
                r#"<body>{{block "layout" .}}{{block "content" .}}{{end}}{{end}}</body>"#,
            )],
            SourceKind::Shared,
        );
        let blog = source(
            &[
                ("blog.layout.html", r#"<main>{{template "content" .}}</main>"#),
                ("pages/post.html", "Post"),
            ],
            SourceKind::Context,
        );
        let views = Views::new(shared).with_context("blog", blog);
        assert_eq!(
            build(&views, "blog", "post").expect("renders"),
            "<body><main>Post</main></body>"
        );
    }

    #[test]
    fn test_missing_pieces() {
        let views = Views::new(source(&[("pages/home.html", "Home")], SourceKind::Shared));
        assert!(matches!(
            build(&views, "", "nope"),
            Err(RenderError::PageNotFound { .. })
        ));
        assert!(matches!(
            build(&views, "", "site=>home"),
            Err(RenderError::LayoutNotFound { .. })
        ));
        assert!(matches!(
            build(&views, "", "#nope"),
            Err(RenderError::ComponentNotFound { .. })
        ));
    }

    #[test]
    fn test_page_parse_error_names_the_file() {
        let views = Views::new(source(&[("pages/bad.html", "{{ if }}")], SourceKind::Shared));
        match build(&views, "", "bad") {
            Err(RenderError::Parse { context, path, .. }) => {
                assert_eq!(context, "");
                assert_eq!(path, "pages/bad.html");
            }
            other => panic!("Expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_errors_name_the_source_they_came_from() {
        let shared = source(&[("pages/bad.html", "{{ if }}")], SourceKind::Shared);
        let blog = source(
            &[
                ("blog.layout.html", "{{ end }}"),
                ("pages/post.html", "{{ with }}"),
            ],
            SourceKind::Context,
        );
        let admin = source(&[("admin.layout.html", "{{ range }}")], SourceKind::Context);
        let plain = source(&[], SourceKind::Context);
        let views = Views::new(shared)
            .with_context("blog", blog)
            .with_context("admin", admin)
            .with_context("plain", plain);

        let origin = |context: &str, reference: &str| match build(&views, context, reference) {
            Err(RenderError::Parse { context, path, .. }) => (context, path),
            other => panic!("Expected parse error, got {:?}", other),
        };
        assert_eq!(
            origin("blog", "post"),
            ("blog".to_string(), "blog.layout.html".to_string())
        );
        assert_eq!(
            origin("/admin/blog", "post"),
            ("admin".to_string(), "admin.layout.html".to_string())
        );
        assert_eq!(
            origin("plain", "bad"),
            (String::new(), "pages/bad.html".to_string())
        );
    }

    #[test]
    fn test_context_layouts_never_come_from_shared() {
        let shared = source(
            &[
                ("global.base.html", r#"<html>{{block "layout" .}}{{end}}</html>"#),
                ("print.base.html", r#"<print>{{block "content" .}}{{end}}</print>"#),
            ],
            SourceKind::Shared,
        );
        let blog = source(&[("pages/post.html", "Post")], SourceKind::Context);
        let views = Views::new(shared).with_context("blog", blog);

        for reference in ["print=>post", "global=>print=>post"] {
            assert!(
                matches!(
                    build(&views, "blog", reference),
                    Err(RenderError::LayoutNotFound { ref context, ref name })
                        if context == "blog" && name == "print"
                ),
                "{reference}"
            );
        }
    }

    #[test]
    fn test_context_component_shadows_shared() {
        let shared = source(
            &[
                ("components/card.html", "shared"),
                ("pages/home.html", r#"[{{template "card" .}}]"#),
            ],
            SourceKind::Shared,
        );
        let blog = source(&[("components/card.html", "blog")], SourceKind::Context);
        let views = Views::new(shared).with_context("blog", blog);
        assert_eq!(build(&views, "", "home").expect("renders"), "[shared]");
        assert_eq!(build(&views, "blog", "home").expect("renders"), "[blog]");
    }
}
