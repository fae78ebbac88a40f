//! Hierarchical resource names
//!
//! Names are `/`-separated. A name given as `~x` is private and resolves
//! against the private namespace of its node; `/x` is global; anything else
//! is relative to the current namespace. A `*` stands for a part of the
//! name that could not be resolved statically.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Serialize, Serializer};

use crate::error::ValueError;

static FIRST_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^~?([A-Za-z*][\w*]*)?$").expect("valid name pattern"));
static NAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z*][\w*]*$").expect("valid name pattern"));

/// Fully resolved resource name
#[derive(Debug, Clone)]
pub struct RosName {
    given: String,
    full: String,
    own: String,
    ns: String,
}

impl RosName {
    /// Placeholder for unknown name parts
    pub const WILDCARD: &'static str = "*";

    /// Resolve `name` against namespace `ns` and private namespace `pns`
    pub fn new(name: &str, ns: &str, pns: &str) -> Self {
        let full = Self::resolve(name, ns, pns);
        let (own, namespace) = if full.ends_with('/') {
            (String::new(), full.clone())
        } else {
            match full.rsplit_once('/') {
                Some((ns, own)) if ns.is_empty() => (own.to_string(), "/".to_string()),
                Some((ns, own)) => (own.to_string(), ns.to_string()),
                None => (full.clone(), "/".to_string()),
            }
        };
        Self {
            given: name.to_string(),
            full,
            own,
            ns: namespace,
        }
    }

    /// Name in the global namespace
    pub fn global(name: &str) -> Self {
        Self::new(name, "/", "")
    }

    pub fn resolve(name: &str, ns: &str, pns: &str) -> String {
        if name.is_empty() {
            return ns.to_string();
        }
        if let Some(private) = name.strip_prefix('~') {
            if pns.ends_with('/') {
                return format!("{}{}", pns, private);
            }
            return format!("{}/{}", pns, private);
        }
        if name.starts_with('/') {
            return name.to_string();
        }
        if ns.ends_with('/') {
            return format!("{}{}", ns, name);
        }
        format!("{}/{}", ns, name)
    }

    /// Validate the syntax of `name`.
    ///
    /// `no_ns` rejects any `/` or `~`; `no_empty` rejects empty names and
    /// names ending in `/`.
    pub fn check_valid_name(name: &str, no_ns: bool, no_empty: bool) -> Result<(), ValueError> {
        let invalid = || ValueError::InvalidName(name.to_string());
        if name.is_empty() {
            if no_empty {
                return Err(ValueError::EmptyValue("name".to_string()));
            }
            return Ok(());
        }
        if no_ns {
            if !NAME_CHARS.is_match(name) {
                return Err(invalid());
            }
            return Ok(());
        }
        let parts: Vec<&str> = name.split('/').collect();
        if !FIRST_PART.is_match(parts[0]) {
            return Err(invalid());
        }
        let last = parts.len() - 1;
        if parts.len() > 2 && parts[1..last].iter().any(|p| !NAME_CHARS.is_match(p)) {
            return Err(invalid());
        }
        if no_empty && parts[last].is_empty() {
            return Err(ValueError::EmptyValue("name".to_string()));
        }
        if last > 0 && !parts[last].is_empty() && !NAME_CHARS.is_match(parts[last]) {
            return Err(invalid());
        }
        Ok(())
    }

    pub fn full(&self) -> &str {
        &self.full
    }

    /// Last path segment
    pub fn own(&self) -> &str {
        &self.own
    }

    pub fn namespace(&self) -> &str {
        &self.ns
    }

    /// Name as written before resolution
    pub fn given(&self) -> &str {
        &self.given
    }

    pub fn is_global(&self) -> bool {
        self.given.starts_with('/')
    }

    pub fn is_private(&self) -> bool {
        self.given.starts_with('~')
    }

    pub fn is_unknown(&self) -> bool {
        self.full.contains(Self::WILDCARD)
    }

    /// `name` resolved with this name as namespace and private namespace
    pub fn join(&self, name: &str) -> RosName {
        RosName::new(name, &self.full, &self.full)
    }

    /// Regex source matching every concrete name this one may stand for.
    ///
    /// A segment that is entirely `*` must match at least one character;
    /// a `*` inside a segment may match nothing.
    pub fn to_pattern(&self) -> String {
        let mut pattern = String::from("^");
        let segments: Vec<String> = self
            .full
            .split('/')
            .map(|segment| {
                if segment == Self::WILDCARD {
                    "(.+?)".to_string()
                } else {
                    segment
                        .split(Self::WILDCARD)
                        .map(regex::escape)
                        .collect::<Vec<_>>()
                        .join("(.*?)")
                }
            })
            .collect();
        pattern.push_str(&segments.join("/"));
        pattern.push('$');
        pattern
    }

    pub fn to_regex(&self) -> Result<Regex, regex::Error> {
        Regex::new(&self.to_pattern())
    }
}

impl PartialEq for RosName {
    fn eq(&self, other: &Self) -> bool {
        self.full == other.full
    }
}

impl Eq for RosName {}

impl std::hash::Hash for RosName {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.full.hash(state);
    }
}

impl PartialEq<str> for RosName {
    fn eq(&self, other: &str) -> bool {
        self.full == other
    }
}

impl PartialEq<&str> for RosName {
    fn eq(&self, other: &&str) -> bool {
        self.full == *other
    }
}

impl fmt::Display for RosName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

impl Serialize for RosName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.full)
    }
}
