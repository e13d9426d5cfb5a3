//! View fixtures shared by the integration tests

#![allow(dead_code)]

use std::sync::Arc;

use layered_views::{FuncMap, MemoryFs, RenderError, Renderer, RendererConfig};

pub const C0_CONTENT: &str = "c0";
pub const C1_CONTENT: &str = "c1";
pub const P0_CONTENT: &str = "p0";
pub const P1_CONTENT: &str = "p1";
pub const P2_CONTENT: &str = "p2";
pub const F0_CONTENT: &str = "f0";
pub const F1_CONTENT: &str = "f1";
pub const BASE_LAYOUT_CONTENT: &str = "baseLayout";
pub const BASE_LAYOUT_PAGE_PLACEHOLDER: &str = "pageLayout placeholder";
pub const BASE_LAYOUT_CONTENT_PLACEHOLDER: &str = "content placeholder";
pub const BASE_DEFAULT_LAYOUT_CONTENT: &str = "defaultBaseLayout";

pub const EXAMPLE_CONTEXT: &str = "example";
pub const C0_CONTEXT_CONTENT: &str = "context component 0";
pub const P0_CONTEXT_CONTENT: &str = "context p0";
pub const CONTEXT_LAYOUT_CONTENT: &str = "defaultContextLayout";
pub const CONTEXT_LAYOUT_CONTENT_PLACEHOLDER: &str = "contentPlaceholder";
pub const ADMIN_LAYOUT_CONTENT: &str = "adminLayout";
pub const ADMIN_LAYOUT_CONTENT_PLACEHOLDER: &str = "adminPlaceholder";

/// Components and pages, no base layout
pub fn shared_views() -> MemoryFs {
    MemoryFs::from_files([
        ("components/c0.html", C0_CONTENT.to_string()),
        ("components/c1.html", C1_CONTENT.to_string()),
        ("pages/p0.html", P0_CONTENT.to_string()),
        ("pages/p1.html", format!(r#"{} {{{{template "c0" .}}}}"#, P1_CONTENT)),
        (
            "pages/p2.html",
            format!(
                r#"{}{{{{block "f0" .}}}}{}{{{{end}}}} {{{{block "f1" .}}}}{}{{{{end}}}}"#,
                P2_CONTENT, F0_CONTENT, F1_CONTENT
            ),
        ),
        ("pages/shared.html", format!(r#"{} {{{{template "c0" .}}}}"#, P0_CONTENT)),
        ("pages/conflict-page.html", P0_CONTENT.to_string()),
    ])
}

fn base_layout(marker: &str) -> String {
    format!(
        r#"{}
    {{{{block "layout" .}}}}
        {}
        {{{{block "content" .}}}}
            {}
        {{{{end}}}}
    {{{{end}}}}"#,
        marker, BASE_LAYOUT_PAGE_PLACEHOLDER, BASE_LAYOUT_CONTENT_PLACEHOLDER
    )
}

/// Shared views with a single base layout named `global`
pub fn shared_views_with_global_base() -> MemoryFs {
    let fs = shared_views();
    fs.insert("global.base.html", base_layout(BASE_LAYOUT_CONTENT));
    fs
}

/// Two base layouts, neither named `default`
pub fn shared_views_with_multi_base() -> MemoryFs {
    let fs = shared_views();
    fs.insert("global.base.html", base_layout("globalLayout"));
    fs.insert("other.base.html", base_layout("otherLayout"));
    fs
}

/// Two base layouts, one named `default`
pub fn shared_views_with_default_base() -> MemoryFs {
    let fs = shared_views_with_global_base();
    fs.insert("default.base.html", base_layout(BASE_DEFAULT_LAYOUT_CONTENT));
    fs
}

/// Shared views whose pages and components use custom functions
pub fn shared_views_with_custom_funcs() -> MemoryFs {
    let fs = shared_views();
    fs.insert("components/use-func-map.html", "{{ customFunc }}");
    fs.insert("pages/use-func-map.html", "{{ hello }} {{ customFunc }}");
    fs
}

pub fn custom_funcs() -> FuncMap {
    let mut funcs = FuncMap::new();
    funcs
        .insert("customFunc", |_| Ok("hello custom func".into()))
        .insert("hello", |_| Ok("hello".into()));
    funcs
}

/// Views of the example context
pub fn context_views() -> MemoryFs {
    MemoryFs::from_files([
        ("components/c0.html", C0_CONTEXT_CONTENT.to_string()),
        (
            "pages/p0.html",
            format!(r#"{} {{{{template "c0" .}}}}"#, P0_CONTEXT_CONTENT),
        ),
        (
            "pages/p1.html",
            r#"context p1 {{block "f" . }}fragment{{end}}"#.to_string(),
        ),
        ("pages/conflict-page.html", "context conflict".to_string()),
        (
            "default.layout.html",
            format!(
                r#"
    {{{{define "layout"}}}}
        {}
        {{{{block "content" .}}}}
            {}
        {{{{end}}}}
    {{{{end}}}}"#,
                CONTEXT_LAYOUT_CONTENT, CONTEXT_LAYOUT_CONTENT_PLACEHOLDER
            ),
        ),
    ])
}

/// Views of the admin context
pub fn admin_views() -> MemoryFs {
    MemoryFs::from_files([(
        "default.layout.html",
        format!(
            r#"
    {{{{define "layout"}}}}
        {}
        {{{{block "content" .}}}}
            {}
        {{{{end}}}}
    {{{{end}}}}"#,
            ADMIN_LAYOUT_CONTENT, ADMIN_LAYOUT_CONTENT_PLACEHOLDER
        ),
    )])
}

pub fn renderer(views: MemoryFs) -> Renderer {
    Renderer::new(Arc::new(views), RendererConfig::default()).expect("Should create renderer")
}

pub fn hot_renderer(views: Arc<MemoryFs>) -> Renderer {
    Renderer::new(views, RendererConfig::new().with_hot_reload(true))
        .expect("Should create renderer")
}

/// Render with no data, returning the result and whatever was written
pub fn render(renderer: &Renderer, context: &str, reference: &str) -> (Result<(), RenderError>, String) {
    let mut buf = Vec::new();
    let result = renderer.render(&mut buf, context, reference, &());
    (result, String::from_utf8(buf).expect("utf-8 output"))
}

/// Render with no data and expect success
pub fn render_ok(renderer: &Renderer, context: &str, reference: &str) -> String {
    let (result, html) = render(renderer, context, reference);
    if let Err(e) = result {
        panic!("rendering {:?} in {:?} failed: {}", reference, context, e);
    }
    html
}
