//! Key=value property text
//!
//! Used for timeline processing headers (payload codec parameters) and for
//! voice configuration files. Entries are separated by newlines or `;`.
//! Blank entries and lines starting with `#` are ignored.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::{PhonixError, PhonixResult};

/// Ordered property map
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Properties::default()
    }

    /// Parse property text. Entries without `=` are rejected.
    pub fn parse(text: &str) -> PhonixResult<Self> {
        let mut entries = BTreeMap::new();
        for raw in text.split(|c| c == '\n' || c == ';') {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                PhonixError::MalformedFile(format!("property entry without '=': {:?}", line))
            })?;
            entries.insert(key.trim().to_string(), value.trim().to_string());
        }
        Ok(Properties { entries })
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl ToString) {
        self.entries.insert(key.into(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Get a required property, failing with `MalformedFile` when absent.
    pub fn require(&self, key: &str) -> PhonixResult<&str> {
        self.get(key)
            .ok_or_else(|| PhonixError::MalformedFile(format!("missing property {}", key)))
    }

    /// Parse a required property.
    pub fn parse_value<T: FromStr>(&self, key: &str) -> PhonixResult<T> {
        let raw = self.require(key)?;
        raw.parse().map_err(|_| {
            PhonixError::MalformedFile(format!("property {}={:?} cannot be parsed", key, raw))
        })
    }

    /// Parse an optional property, falling back to `default` when absent.
    pub fn parse_or<T: FromStr>(&self, key: &str, default: T) -> PhonixResult<T> {
        match self.get(key) {
            None => Ok(default),
            Some(_) => self.parse_value(key),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.entries {
            writeln!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lines_and_semicolons() {
        let props = Properties::parse("payload=lpc\nlpc.order=16; lpc.min=-2.5\n\n# note\nlpc.range = 5.0").unwrap();
        assert_eq!(props.get("payload"), Some("lpc"));
        assert_eq!(props.parse_value::<usize>("lpc.order").unwrap(), 16);
        assert_eq!(props.parse_value::<f32>("lpc.min").unwrap(), -2.5);
        assert_eq!(props.parse_value::<f32>("lpc.range").unwrap(), 5.0);
        assert_eq!(props.len(), 4);
    }

    #[test]
    fn test_display_roundtrip() {
        let props = Properties::new().with("mcep.order", 25).with("payload", "mcep");
        let reparsed = Properties::parse(&props.to_string()).unwrap();
        assert_eq!(reparsed, props);
    }

    #[test]
    fn test_missing_and_bad_values() {
        let props = Properties::parse("hnm.noiseModel=abc").unwrap();
        assert!(props.parse_value::<i32>("hnm.noiseModel").is_err());
        assert!(props.require("lpc.order").is_err());
        assert_eq!(props.parse_or("lpc.order", 12usize).unwrap(), 12);
    }

    #[test]
    fn test_entry_without_equals() {
        assert!(Properties::parse("justakey").is_err());
    }

    #[test]
    fn test_value_may_contain_equals() {
        let props = Properties::parse("expr=a=b").unwrap();
        assert_eq!(props.get("expr"), Some("a=b"));
    }
}
