//! Family Filtering
//!
//! Startup-time whitelist/blacklist over family names, and the
//! request-scoped name filter applied to rendered exposition text.

use std::collections::HashSet;

use crate::error::{Error, Result};

/// Decides which metric families are tracked at all
pub trait FamilyFilter: Send + Sync {
    fn is_included(&self, name: &str) -> bool;

    fn is_excluded(&self, name: &str) -> bool {
        !self.is_included(name)
    }
}

/// Mutually exclusive whitelist or blacklist of family names
#[derive(Debug, Clone, Default)]
pub struct WhiteBlackList {
    list: HashSet<String>,
    is_white_list: bool,
}

impl WhiteBlackList {
    /// Build from a whitelist and a blacklist; at most one may be non-empty
    pub fn new(white: HashSet<String>, black: HashSet<String>) -> Result<Self> {
        if !white.is_empty() && !black.is_empty() {
            return Err(Error::ConflictingFilters);
        }

        if !white.is_empty() {
            return Ok(Self {
                list: white,
                is_white_list: true,
            });
        }

        Ok(Self {
            list: black,
            is_white_list: false,
        })
    }

    /// Filter that includes every family
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn is_white_list(&self) -> bool {
        self.is_white_list
    }

    /// True when no filtering happens
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Comma separated, sorted names in the list
    pub fn status(&self) -> String {
        let mut items: Vec<&str> = self.list.iter().map(String::as_str).collect();
        items.sort_unstable();
        items.join(", ")
    }
}

impl FamilyFilter for WhiteBlackList {
    fn is_included(&self, name: &str) -> bool {
        let exists = self.list.contains(name);
        if self.is_white_list {
            exists
        } else {
            !exists
        }
    }
}

// =============================================================================
// Request-scoped filter
// =============================================================================

/// Keep only header and sample lines of the named families.
///
/// An empty name set returns the text unchanged.
pub fn filter_exposition(text: &str, names: &HashSet<String>) -> String {
    if names.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        if let Some(name) = line_family(line) {
            if names.contains(name) {
                out.push_str(line);
            }
        }
    }
    out
}

/// Family names requested through repeated `name[]=` query parameters
pub fn requested_families(query: Option<&str>) -> HashSet<String> {
    let Some(query) = query else {
        return HashSet::new();
    };

    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .filter(|(key, _)| {
            urlencoding::decode(key)
                .map(|k| k == "name[]")
                .unwrap_or(false)
        })
        .filter_map(|(_, value)| {
            urlencoding::decode(&value.replace('+', " "))
                .ok()
                .map(|v| v.into_owned())
        })
        .filter(|value| !value.is_empty())
        .collect()
}

/// Family name a line of exposition text belongs to
fn line_family(line: &str) -> Option<&str> {
    if let Some(rest) = line
        .strip_prefix("# HELP ")
        .or_else(|| line.strip_prefix("# TYPE "))
    {
        return rest.split([' ', '\n']).next();
    }
    if line.starts_with('#') {
        return None;
    }
    let end = line.find(['{', ' ']).unwrap_or(line.len());
    let name = line[..end].trim_end();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}
