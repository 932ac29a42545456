use std::collections::BTreeMap;

use scraper::{Html, Selector};

/// Named form inputs discovered on a page, with a caller payload overlaid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormInputSet {
    inputs: BTreeMap<String, String>,
}

impl FormInputSet {
    /// Every named `<input>` in `html`, with an empty value. Inputs without a
    /// `name` attribute cannot be submitted and are left out.
    pub fn discover(html: &str) -> Self {
        let document = Html::parse_document(html);
        let mut inputs = BTreeMap::new();

        if let Ok(selector) = Selector::parse("input") {
            for input in document.select(&selector) {
                if let Some(name) = input.value().attr("name") {
                    inputs.insert(name.to_string(), String::new());
                }
            }
        }

        Self { inputs }
    }

    /// Payload values win over discovered defaults.
    pub fn overlay<K, V, I>(mut self, payload: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in payload {
            self.inputs.insert(key.into(), value.into());
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.inputs.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Key/value pairs suitable for `RequestBuilder::query`.
    pub fn as_query(&self) -> Vec<(&str, &str)> {
        self.inputs
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}
