//! Process environment lookups.
//!
//! Configuration reads variables through [`Env`] so tests can supply a
//! fixed set with [`Env::mock()`] instead of mutating the process
//! environment.

use std::collections::HashMap;

/// Environment variable reader.
///
/// Empty values count as unset. CI systems export unset secrets as empty
/// strings, and an empty token must not shadow a later fallback.
#[derive(Clone, Debug, Default)]
pub struct Env {
    fixed: Option<HashMap<String, String>>,
}

impl Env {
    /// Read from the real process environment.
    pub fn real() -> Self {
        Self { fixed: None }
    }

    #[cfg(test)]
    pub fn mock(vars: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>) -> Self {
        let fixed = vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self { fixed: Some(fixed) }
    }

    /// Value of `name`, or `None` when it is missing, empty or not unicode.
    pub fn get(&self, name: &str) -> Option<String> {
        let value = match &self.fixed {
            Some(map) => map.get(name).cloned(),
            None => std::env::var(name).ok(),
        };
        value.filter(|v| !v.is_empty())
    }

    /// Value of the first variable in `names` that is set.
    pub fn first_of(&self, names: &[&str]) -> Option<String> {
        names.iter().find_map(|name| self.get(name))
    }
}
