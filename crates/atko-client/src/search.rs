//! Client-side deep search over listed resources

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;

use crate::error::{ClientError, ClientResult};
use crate::models::Resource;

/// `column → regex` patterns, all of which must match somewhere in the column's value
#[derive(Debug, Clone, Default)]
pub struct DeepSearch {
    patterns: BTreeMap<String, Regex>,
}

impl DeepSearch {
    /// Parse `key:value` patterns
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidInput`] for a pattern without `:`, with an empty key, or whose
    /// value is not a valid regular expression.
    pub fn parse<S: AsRef<str>>(patterns: &[S]) -> ClientResult<Self> {
        let mut parsed = BTreeMap::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let (key, value) = pattern
                .split_once(':')
                .filter(|(key, _)| !key.trim().is_empty())
                .ok_or_else(|| {
                    ClientError::InvalidInput(format!(
                        "search pattern '{pattern}' must have the form key:value"
                    ))
                })?;
            let regex = Regex::new(value).map_err(|e| {
                ClientError::InvalidInput(format!("search pattern '{pattern}' is not a valid regex: {e}"))
            })?;
            parsed.insert(key.trim().to_string(), regex);
        }
        Ok(Self { patterns: parsed })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Keep the items whose flattened view matches every pattern
    ///
    /// Patterns naming a column no item has are ignored; when no pattern names a known column
    /// the items are returned unchanged.
    pub fn apply<R: Resource>(&self, items: Vec<R>) -> Vec<R> {
        if self.patterns.is_empty() {
            return items;
        }

        let flattened: Vec<BTreeMap<String, String>> = items.iter().map(Resource::flatten).collect();
        let columns: BTreeSet<&str> = flattened
            .iter()
            .flat_map(|flat| flat.keys().map(String::as_str))
            .collect();
        let active: Vec<(&String, &Regex)> = self
            .patterns
            .iter()
            .filter(|(key, _)| columns.contains(key.as_str()))
            .collect();
        if active.is_empty() {
            return items;
        }

        items
            .into_iter()
            .zip(flattened.iter())
            .filter(|(_, flat)| {
                active.iter().all(|(key, regex)| {
                    flat.get(*key)
                        .map_or(regex.as_str().is_empty(), |value| regex.is_match(value))
                })
            })
            .map(|(item, _)| item)
            .collect()
    }
}
