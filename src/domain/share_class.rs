//! Collapses dual-listed share classes onto one issuer key.

use std::collections::HashMap;

/// Built-in alias → class pairs.
pub const DEFAULT_SHARE_CLASSES: [(&str, &str); 2] = [("GOOGL", "GOOG"), ("FOXA", "FOX")];

#[derive(Debug, Clone)]
pub struct ShareClassMap {
    aliases: HashMap<String, String>,
}

impl Default for ShareClassMap {
    fn default() -> Self {
        Self::new(DEFAULT_SHARE_CLASSES.iter().map(|&(a, c)| (a.to_string(), c.to_string())))
    }
}

impl ShareClassMap {
    pub fn new<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let aliases = pairs
            .into_iter()
            .map(|(alias, class)| (alias.to_uppercase(), class.to_uppercase()))
            .collect();
        Self { aliases }
    }

    /// Defaults plus `extra`; an extra alias overrides a default one.
    pub fn with_overrides<I>(extra: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut map = Self::default();
        for (alias, class) in extra {
            map.aliases.insert(alias.to_uppercase(), class.to_uppercase());
        }
        map
    }

    /// Economic class of `ticker`; unmapped tickers are their own class.
    pub fn class_of<'a>(&'a self, ticker: &'a str) -> &'a str {
        self.aliases.get(ticker).map(String::as_str).unwrap_or(ticker)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}
