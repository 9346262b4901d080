//! Basename blacklists
//!
//! Markup may exclude recordings from selection with a `blacklist`
//! attribute: whitespace- or comma-separated substrings matched against the
//! basename of each candidate's recording.

/// Markup attribute holding the blacklist
pub const BLACKLIST_ATTRIBUTE: &str = "blacklist";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Blacklist {
    patterns: Vec<String>,
}

impl Blacklist {
    pub fn parse(text: &str) -> Self {
        let patterns = text
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        Blacklist { patterns }
    }

    /// Blacklist in effect for a resolved attribute value. `None` when no
    /// pattern remains.
    pub fn from_attribute(value: Option<&str>) -> Option<Self> {
        let list = Blacklist::parse(value?);
        (!list.is_empty()).then_some(list)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether `basename` contains any blacklisted substring.
    pub fn matches(&self, basename: &str) -> bool {
        self.patterns.iter().any(|p| basename.contains(p.as_str()))
    }
}
