//! Property tests for symbolic values and conditional data.

use proptest::prelude::*;

use launchvar::values::{Fragment, UnknownValue};
use launchvar::{ConditionalData, LogicValue, LogicVariable, SolverResult, ValueType, VariableData};

fn condition(n: usize) -> LogicValue {
    let name = format!("c{}", n);
    LogicVariable::named(name.clone(), name.clone(), VariableData::Text(name)).into()
}

fn fragment() -> impl Strategy<Value = Fragment> {
    prop_oneof![
        "[a-z=/ ]{0,6}".prop_map(Fragment::Text),
        "[a-z]{1,6}".prop_map(|name| {
            let text = format!("$(arg {})", name);
            Fragment::Unknown(UnknownValue::new("arg", vec![name], text))
        }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 96,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: an unconditional set makes the data deterministic.
    #[test]
    fn property_true_set_overwrites(
        base in any::<i32>(),
        variants in proptest::collection::vec(any::<i32>(), 0..5),
        value in any::<i32>(),
    ) {
        let mut data = ConditionalData::new(base);
        for (i, v) in variants.into_iter().enumerate() {
            data.set(v, condition(i));
        }
        data.set(value, LogicValue::True);
        prop_assert!(data.is_deterministic());
        prop_assert_eq!(data.get_value().unwrap(), Some(&value));
    }

    /// PROPERTY: a statically false set changes nothing.
    #[test]
    fn property_false_set_is_ignored(
        base in any::<i32>(),
        variants in proptest::collection::vec(any::<i32>(), 0..5),
        value in any::<i32>(),
    ) {
        let mut data = ConditionalData::new(base);
        for (i, v) in variants.into_iter().enumerate() {
            data.set(v, condition(i));
        }
        let before = data.clone();
        data.set(value, LogicValue::False);
        prop_assert_eq!(data, before);
    }

    /// PROPERTY: possible values list variants most recent first, base last.
    #[test]
    fn property_possible_values_order(
        base in any::<i32>(),
        variants in proptest::collection::vec(any::<i32>(), 1..6),
    ) {
        let mut data = ConditionalData::new(base);
        for (i, v) in variants.iter().enumerate() {
            data.set(*v, condition(i));
        }
        let values = data.possible_values();
        prop_assert_eq!(values.len(), variants.len() + 1);
        for (k, (value, cond)) in values.iter().take(variants.len()).enumerate() {
            let i = variants.len() - 1 - k;
            prop_assert_eq!(*value, Some(&variants[i]));
            prop_assert_eq!(cond, &condition(i));
        }
        prop_assert_eq!(values.last().unwrap(), &(Some(&base), LogicValue::True));
    }

    /// PROPERTY: rendering keeps literal text and swaps unknowns for the wildcard.
    #[test]
    fn property_as_string(parts in proptest::collection::vec(fragment(), 1..6)) {
        let has_unknown = parts.iter().any(|p| matches!(p, Fragment::Unknown(_)));
        let result = SolverResult::unresolved(parts.clone(), ValueType::String);
        prop_assert_eq!(result.is_ok(), has_unknown);
        if let Ok(result) = result {
            let original: String = parts
                .iter()
                .map(|p| match p {
                    Fragment::Text(s) => s.clone(),
                    Fragment::Unknown(u) => u.text.clone(),
                })
                .collect();
            let masked: String = parts
                .iter()
                .map(|p| match p {
                    Fragment::Text(s) => s.as_str(),
                    Fragment::Unknown(_) => "*",
                })
                .collect();
            prop_assert_eq!(result.as_string(None), original);
            prop_assert_eq!(result.as_string(Some("*")), masked);
            prop_assert!(!result.is_resolved());
        }
    }
}
