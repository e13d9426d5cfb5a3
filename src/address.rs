//! Template references
//!
//! A reference names what to render: `[base=>][layout=>]page[#fragment]` for a
//! page, or `#component` for a standalone component.

use std::fmt;

use thiserror::Error;

/// Separates layout segments from the page
pub const LAYOUT_SEPARATOR: &str = "=>";
/// Separates the page from a fragment, or marks a component
pub const FRAGMENT_SEPARATOR: &str = "#";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("too many layouts: at most base=>layout=>page is allowed")]
    TooManyLayouts,

    #[error("too many fragments: at most one '#' is allowed after the page")]
    TooManyFragments,

    #[error("fragment name is empty")]
    EmptyFragment,

    #[error("misplaced separator in {0:?}")]
    MisplacedSeparator(String),
}

/// Structured form of a template reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TemplateAddress {
    /// `#name`
    Component(String),
    /// `[base=>][layout=>]page[#fragment]`
    Page {
        base_layout: Option<String>,
        context_layout: Option<String>,
        page: String,
        fragment: Option<String>,
    },
}

impl TemplateAddress {
    /// Parse a reference string
    pub fn parse(reference: &str) -> Result<Self, AddressError> {
        if let Some(name) = reference.strip_prefix(FRAGMENT_SEPARATOR) {
            let name = clean(name)?;
            if name.is_empty() {
                return Err(AddressError::EmptyFragment);
            }
            return Ok(TemplateAddress::Component(name));
        }

        let segments: Vec<&str> = reference.split(LAYOUT_SEPARATOR).collect();
        let (base_layout, context_layout, page) = match segments.as_slice() {
            [page] => (None, None, *page),
            [layout, page] => (None, Some(*layout), *page),
            [base, layout, page] => (Some(*base), Some(*layout), *page),
            _ => return Err(AddressError::TooManyLayouts),
        };

        let parts: Vec<&str> = page.split(FRAGMENT_SEPARATOR).collect();
        let (page, fragment) = match parts.as_slice() {
            [page] => (*page, None),
            [page, fragment] => (*page, Some(*fragment)),
            _ => return Err(AddressError::TooManyFragments),
        };

        let fragment = match fragment.map(clean).transpose()? {
            Some(fragment) if fragment.is_empty() => return Err(AddressError::EmptyFragment),
            fragment => fragment,
        };

        Ok(TemplateAddress::Page {
            base_layout: base_layout.map(clean).transpose()?,
            context_layout: context_layout.map(clean).transpose()?,
            page: clean(page)?,
            fragment,
        })
    }
}

/// Trim a segment and reject separators left inside it
fn clean(segment: &str) -> Result<String, AddressError> {
    let segment = segment.trim();
    if segment.contains(LAYOUT_SEPARATOR) || segment.contains(FRAGMENT_SEPARATOR) {
        return Err(AddressError::MisplacedSeparator(segment.to_string()));
    }
    Ok(segment.to_string())
}

impl std::str::FromStr for TemplateAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TemplateAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateAddress::Component(name) => write!(f, "{}{}", FRAGMENT_SEPARATOR, name),
            TemplateAddress::Page {
                base_layout,
                context_layout,
                page,
                fragment,
            } => {
                match (base_layout, context_layout) {
                    (Some(base), layout) => write!(
                        f,
                        "{}{}{}{}",
                        base,
                        LAYOUT_SEPARATOR,
                        layout.as_deref().unwrap_or(""),
                        LAYOUT_SEPARATOR
                    )?,
                    (None, Some(layout)) => write!(f, "{}{}", layout, LAYOUT_SEPARATOR)?,
                    (None, None) => {}
                }
                write!(f, "{}", page)?;
                if let Some(fragment) = fragment {
                    write!(f, "{}{}", FRAGMENT_SEPARATOR, fragment)?;
                }
                Ok(())
            }
        }
    }
}
