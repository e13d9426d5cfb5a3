//! Turning a render request into a concrete target with a cache key

use crate::address::{TemplateAddress, FRAGMENT_SEPARATOR, LAYOUT_SEPARATOR};
use crate::views::Views;

use super::error::RenderError;

/// Characters that may not appear in a context name
pub(crate) const RESERVED: [&str; 4] = ["/", ":", FRAGMENT_SEPARATOR, LAYOUT_SEPARATOR];

/// The context part of a render request
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RenderContext {
    /// `None` renders the shared views
    pub name: Option<String>,
    /// Frame the page with the admin context's layout
    pub admin: bool,
}

impl RenderContext {
    /// `""` is shared, `blog` or `/blog` a context, `/admin/blog` a context
    /// rendered in admin chrome.
    pub fn parse(context: &str, admin_context: &str) -> Self {
        let context = context.trim_start_matches('/').trim_end_matches('/');
        if context.is_empty() {
            return Self {
                name: None,
                admin: false,
            };
        }
        match context.split_once('/') {
            Some((head, rest)) if head == admin_context && !rest.is_empty() => Self {
                name: Some(rest.to_string()),
                admin: true,
            },
            _ => Self {
                name: Some(context.to_string()),
                admin: false,
            },
        }
    }

    fn key_prefix(&self) -> String {
        let name = self.name.as_deref().unwrap_or("");
        if self.admin {
            format!("admin:{}", name)
        } else {
            name.to_string()
        }
    }
}

/// What a compiled template is built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Target {
    Component(String),
    Page {
        /// Effective base layout, `None` for the synthetic root
        base: Option<String>,
        /// Effective context layout and the context it is looked up in
        layout: Option<(String, String)>,
        page: String,
    },
}

/// A render request resolved against one views snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Resolved {
    pub context: RenderContext,
    pub target: Target,
    pub fragment: Option<String>,
    pub key: String,
}

impl Resolved {
    /// Context name as used in error messages, empty for shared
    pub fn context_name(&self) -> &str {
        self.context.name.as_deref().unwrap_or("")
    }
}

/// Fill in default layouts and compute the cache key
pub(crate) fn resolve(
    views: &Views,
    context: &RenderContext,
    address: &TemplateAddress,
    admin_context: &str,
) -> Result<Resolved, RenderError> {
    let source = match &context.name {
        None => None,
        Some(name) => Some(
            views
                .context(name)
                .ok_or_else(|| RenderError::UnknownContext(name.clone()))?,
        ),
    };
    let prefix = context.key_prefix();

    let (base_layout, context_layout, page, fragment) = match address {
        TemplateAddress::Component(name) => {
            return Ok(Resolved {
                context: context.clone(),
                target: Target::Component(name.clone()),
                fragment: None,
                key: format!("{}/{}{}", prefix, FRAGMENT_SEPARATOR, name),
            })
        }
        TemplateAddress::Page {
            base_layout,
            context_layout,
            page,
            fragment,
        } => (
            non_empty(base_layout),
            non_empty(context_layout),
            page,
            fragment,
        ),
    };

    let (base, layout) = match source {
        // Shared views have no context layouts; a lone layout names the base
        None => match (base_layout, context_layout) {
            (Some(_), Some(layout)) => {
                return Err(RenderError::LayoutNotFound {
                    context: String::new(),
                    name: layout.to_string(),
                })
            }
            (base, None) | (None, base) => (base, None),
        },
        Some(_) if context.admin => {
            let admin = views
                .context(admin_context)
                .ok_or_else(|| RenderError::LayoutNotFound {
                    context: admin_context.to_string(),
                    name: context_layout.unwrap_or("").to_string(),
                })?;
            let layout = context_layout
                .or_else(|| admin.default_layout())
                .ok_or_else(|| RenderError::LayoutNotFound {
                    context: admin_context.to_string(),
                    name: String::new(),
                })?;
            (base_layout, Some((admin_context.to_string(), layout.to_string())))
        }
        Some(source) => {
            let owner = context.name.clone().unwrap_or_default();
            let layout = context_layout
                .or_else(|| source.default_layout())
                .map(|layout| (owner, layout.to_string()));
            (base_layout, layout)
        }
    };

    let base = base
        .or_else(|| views.shared().default_layout())
        .map(str::to_string);

    let key = format!(
        "{}/{}{}{}{}{}",
        prefix,
        base.as_deref().unwrap_or(""),
        LAYOUT_SEPARATOR,
        layout.as_ref().map(|(_, name)| name.as_str()).unwrap_or(""),
        LAYOUT_SEPARATOR,
        page
    );

    Ok(Resolved {
        context: context.clone(),
        target: Target::Page {
            base,
            layout,
            page: page.clone(),
        },
        fragment: fragment.clone(),
        key,
    })
}

fn non_empty(segment: &Option<String>) -> Option<&str> {
    segment.as_deref().filter(|s| !s.is_empty())
}

/// Whether `name` can be registered as a context
pub(crate) fn has_reserved(name: &str) -> bool {
    RESERVED.iter().any(|reserved| name.contains(reserved))
}
