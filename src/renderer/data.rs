//! Data providers attached to layouts

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::error::{BoxError, RenderError};
use super::resolve::{Resolved, Target};

/// Key the caller's data is exposed under when it is not an object
pub const DATA_KEY: &str = "Data";

/// Supplies extra render data for every page using a layout
pub type DataProvider = Arc<dyn Fn() -> Result<Map<String, Value>, BoxError> + Send + Sync>;

/// Registered providers, in registration order
#[derive(Default)]
pub(crate) struct Providers {
    base: HashMap<String, Vec<DataProvider>>,
    layout: HashMap<(String, String), Vec<DataProvider>>,
}

impl Providers {
    pub fn add_base(&mut self, layout: String, provider: DataProvider) {
        self.base.entry(layout).or_default().push(provider);
    }

    pub fn add_layout(&mut self, context: String, layout: String, provider: DataProvider) {
        self.layout
            .entry((context, layout))
            .or_default()
            .push(provider);
    }

    /// Merge provider output under the caller's data.
    ///
    /// Base layout providers run first, then context layout providers; later
    /// keys win, and the caller's keys win over all of them.
    pub fn merge(&self, resolved: &Resolved, data: Value) -> Result<Value, RenderError> {
        let Target::Page { base, layout, .. } = &resolved.target else {
            return Ok(data);
        };

        let base = base
            .as_ref()
            .and_then(|name| self.base.get(name).map(|list| (name.as_str(), list)));
        let layout = layout.as_ref().and_then(|(context, name)| {
            self.layout
                .get(&(context.clone(), name.clone()))
                .map(|list| (name.as_str(), list))
        });
        if base.is_none() && layout.is_none() {
            return Ok(data);
        }

        let mut merged = Map::new();
        for (name, providers) in base.into_iter().chain(layout) {
            for provider in providers {
                let values = provider().map_err(|source| RenderError::Data {
                    layout: name.to_string(),
                    source,
                })?;
                merged.extend(values);
            }
        }

        match data {
            Value::Object(own) => merged.extend(own),
            Value::Null => {}
            other => {
                merged.insert(DATA_KEY.to_string(), other);
            }
        }
        Ok(Value::Object(merged))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::resolve::RenderContext;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn provider(value: Value) -> DataProvider {
        Arc::new(move || match value.clone() {
            Value::Object(map) => Ok(map),
            _ => Err("not an object".into()),
        })
    }

    fn page(base: Option<&str>, layout: Option<(&str, &str)>) -> Resolved {
        Resolved {
            context: RenderContext {
                name: None,
                admin: false,
            },
            target: Target::Page {
                base: base.map(str::to_string),
                layout: layout.map(|(c, l)| (c.to_string(), l.to_string())),
                page: "home".to_string(),
            },
            fragment: None,
            key: String::new(),
        }
    }

    #[test]
    fn test_no_providers_leaves_data_alone() {
        let providers = Providers::default();
        let data = providers
            .merge(&page(Some("default"), None), json!("plain"))
            .expect("merges");
        assert_eq!(data, json!("plain"));
    }

    #[test]
    fn test_merge_order() {
        let mut providers = Providers::default();
        providers.add_base("default".into(), provider(json!({"a": "base", "b": "base"})));
        providers.add_base("default".into(), provider(json!({"b": "base2"})));
        providers.add_layout(
            "blog".into(),
            "blog".into(),
            provider(json!({"b": "layout", "c": "layout"})),
        );
        providers.add_layout("shop".into(), "blog".into(), provider(json!({"x": 1})));

        let data = providers
            .merge(
                &page(Some("default"), Some(("blog", "blog"))),
                json!({"c": "caller"}),
            )
            .expect("merges");
        assert_eq!(data, json!({"a": "base", "b": "layout", "c": "caller"}));
    }

    #[test]
    fn test_scalar_data_is_wrapped() {
        let mut providers = Providers::default();
        providers.add_base("default".into(), provider(json!({"site": "x"})));
        let data = providers
            .merge(&page(Some("default"), None), json!(42))
            .expect("merges");
        assert_eq!(data, json!({"site": "x", "Data": 42}));
    }

    #[test]
    fn test_provider_failure() {
        let mut providers = Providers::default();
        providers.add_base("default".into(), provider(json!("boom")));
        let err = providers
            .merge(&page(Some("default"), None), Value::Null)
            .expect_err("fails");
        assert!(matches!(err, RenderError::Data { ref layout, .. } if layout == "default"));
    }
}
