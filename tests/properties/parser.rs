//! Property tests for launch XML parsing and substitutions.

use std::path::Path;

use proptest::prelude::*;

use launchvar::error::ArgError;
use launchvar::parse_launch_str;
use launchvar::subst::{resolve_text, SubstitutionContext};
use launchvar::ValueType;

/// Knows no arguments, no environment and no packages
struct EmptyContext;

impl SubstitutionContext for EmptyContext {
    fn get_arg(&self, name: &str) -> Result<Option<String>, ArgError> {
        Err(ArgError::Undeclared(name.to_string()))
    }

    fn get_env(&self, _name: &str) -> Option<String> {
        None
    }

    fn get_pkg_path(&self, _name: &str) -> Option<String> {
        None
    }

    fn get_anonymous_name(&self, name: &str) -> String {
        format!("{}_anon", name)
    }

    fn dirpath(&self) -> String {
        "/".to_string()
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 96,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: the parser never panics on arbitrary input.
    #[test]
    fn property_parse_never_panics(content in "(?s).{0,256}") {
        let _ = parse_launch_str(&content, Path::new("fuzz.launch"));
    }

    /// PROPERTY: well-formed node lists parse with one child per node.
    #[test]
    fn property_parse_nodes(names in proptest::collection::vec("[a-z][a-z0-9_]{0,8}", 0..6)) {
        let body: String = names
            .iter()
            .map(|n| format!("  <node pkg=\"p\" type=\"t\" name=\"{}\"/>\n", n))
            .collect();
        let content = format!("<launch>\n{}</launch>\n", body);
        let tree = parse_launch_str(&content, Path::new("nodes.launch")).unwrap();
        prop_assert_eq!(tree.children.len(), names.len());
        for (i, child) in tree.children.iter().enumerate() {
            prop_assert_eq!(child.line, i + 2);
            prop_assert_eq!(child.attr("name"), Some(names[i].as_str()));
        }
    }

    /// PROPERTY: resolving arbitrary attribute text never panics.
    #[test]
    fn property_resolve_never_panics(text in "(?s).{0,128}") {
        let _ = resolve_text(&text, &EmptyContext, ValueType::String);
    }

    /// PROPERTY: text without substitutions resolves to itself.
    #[test]
    fn property_plain_text_is_literal(text in "[^$]{0,64}") {
        let result = resolve_text(&text, &EmptyContext, ValueType::String).unwrap();
        prop_assert!(result.is_resolved());
        prop_assert_eq!(result.as_string(None), text);
    }
}
