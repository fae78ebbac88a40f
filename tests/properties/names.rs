//! Property tests for resource names.

use proptest::prelude::*;

use launchvar::RosName;

fn segment() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-z][a-z0-9_]{0,8}").unwrap()
}

fn namespace() -> impl Strategy<Value = String> {
    proptest::collection::vec(segment(), 0..4).prop_map(|parts| format!("/{}", parts.join("/")))
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 96,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: relative, private and global names all resolve to clean global names.
    #[test]
    fn property_resolved_names_are_global(
        name in segment(),
        ns in namespace(),
        pns in namespace(),
    ) {
        for given in [name.clone(), format!("~{}", name), format!("/{}", name)] {
            let resolved = RosName::new(&given, &ns, &pns);
            prop_assert!(resolved.full().starts_with('/'));
            prop_assert!(!resolved.full().contains("//"), "{}", resolved.full());
            prop_assert_eq!(resolved.own(), name.as_str());
        }
    }

    /// PROPERTY: valid relative names pass validation.
    #[test]
    fn property_generated_names_are_valid(parts in proptest::collection::vec(segment(), 1..4)) {
        prop_assert!(RosName::check_valid_name(&parts.join("/"), false, true).is_ok());
        prop_assert!(RosName::check_valid_name(&parts[0], true, true).is_ok());
    }

    /// PROPERTY: a name with one segment replaced by `*` matches the original.
    #[test]
    fn property_wildcard_matches_concrete_name(
        parts in proptest::collection::vec(segment(), 1..5),
        index in any::<prop::sample::Index>(),
    ) {
        let concrete = RosName::global(&format!("/{}", parts.join("/")));
        let mut masked = parts.clone();
        masked[index.index(parts.len())] = RosName::WILDCARD.to_string();
        let unknown = RosName::global(&format!("/{}", masked.join("/")));

        prop_assert!(unknown.is_unknown());
        prop_assert!(!concrete.is_unknown());
        let regex = unknown.to_regex().unwrap();
        prop_assert!(regex.is_match(concrete.full()));
    }

    /// PROPERTY: a known name only matches itself.
    #[test]
    fn property_known_pattern_is_exact(a in namespace(), b in namespace()) {
        let regex = RosName::global(&a).to_regex().unwrap();
        prop_assert_eq!(regex.is_match(&b), a == b);
    }
}
