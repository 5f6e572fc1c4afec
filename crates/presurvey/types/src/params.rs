//! Append-only query parameters for the external survey link

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Query parameters accumulated across the pipeline.
///
/// There is no removal API: a key written by an earlier guard
/// survives to the terminal redirect, and may only be overwritten through
/// [`ExtraParams::set`] or [`ExtraParams::transform`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtraParams(BTreeMap<String, String>);

impl ExtraParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Write or overwrite a single parameter
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Merge another set of parameters in; incoming values win
    pub fn merge<I, K, V>(&mut self, params: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in params {
            self.set(k, v);
        }
    }

    /// Rewrite `key` from its current value.
    ///
    /// `f` receives the current value (if any) and returns the replacement;
    /// returning `None` leaves the parameter as it was. Returns whether the
    /// stored value changed.
    pub fn transform<F>(&mut self, key: &str, f: F) -> bool
    where
        F: FnOnce(Option<&str>) -> Option<String>,
    {
        match f(self.get(key)) {
            Some(next) if self.get(key) != Some(next.as_str()) => {
                self.set(key, next);
                true
            }
            _ => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ExtraParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        params.merge(iter);
        params
    }
}
