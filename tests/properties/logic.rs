//! Property tests for the logic algebra.

use proptest::prelude::*;

use launchvar::{LogicValue, LogicVariable, VariableData};

fn variable() -> impl Strategy<Value = LogicValue> {
    (1u8..=6).prop_map(|n| {
        let name = format!("v{}", n);
        LogicVariable::named(name.clone(), name.clone(), VariableData::Text(name)).into()
    })
}

/// Constants, variables and negated variables
fn atom() -> impl Strategy<Value = LogicValue> {
    prop_oneof![
        Just(LogicValue::True),
        Just(LogicValue::False),
        variable(),
        variable().prop_map(|v| v.negate()),
    ]
}

/// Arbitrary nested expressions over a handful of variables
fn expression() -> impl Strategy<Value = LogicValue> {
    atom().prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(|x| LogicValue::Not(Box::new(x))),
            proptest::collection::vec(inner.clone(), 1..4).prop_map(LogicValue::And),
            proptest::collection::vec(inner, 1..4).prop_map(LogicValue::Or),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 96,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: `a ∧ ¬a` simplifies to False.
    #[test]
    fn property_contradiction(a in atom()) {
        prop_assert!(a.clone().join(a.negate()).simplify().is_false());
    }

    /// PROPERTY: `a ∨ ¬a` simplifies to True.
    #[test]
    fn property_tautology(a in atom()) {
        prop_assert!(a.clone().disjoin(a.negate()).simplify().is_true());
    }

    /// PROPERTY: True is the identity of conjunction, False of disjunction.
    #[test]
    fn property_identity(a in expression()) {
        prop_assert_eq!(LogicValue::True.join(a.clone()), a.clone());
        prop_assert_eq!(LogicValue::False.disjoin(a.clone()), a);
    }

    /// PROPERTY: False annihilates conjunction, True annihilates disjunction.
    #[test]
    fn property_annihilator(a in expression()) {
        prop_assert!(LogicValue::False.join(a.clone()).is_false());
        prop_assert!(a.disjoin(LogicValue::True).is_true());
    }

    /// PROPERTY: simplification is idempotent.
    #[test]
    fn property_simplify_idempotent(a in expression()) {
        let once = a.simplify();
        prop_assert_eq!(once.simplify(), once);
    }

    /// PROPERTY: operand order does not matter.
    #[test]
    fn property_order_independent(a in expression(), b in expression()) {
        prop_assert_eq!(
            LogicValue::And(vec![a.clone(), b.clone()]),
            LogicValue::And(vec![b.clone(), a.clone()])
        );
        prop_assert_eq!(
            LogicValue::Or(vec![a.clone(), b.clone()]).simplify(),
            LogicValue::Or(vec![b, a]).simplify()
        );
    }

    /// PROPERTY: double negation collapses.
    #[test]
    fn property_double_negation(a in expression()) {
        let simple = a.simplify();
        prop_assert_eq!(simple.negate().negate(), simple.clone());
        let double = LogicValue::Not(Box::new(LogicValue::Not(Box::new(a))));
        prop_assert_eq!(double.simplify(), simple);
    }

    /// PROPERTY: simplification never invents variables.
    #[test]
    fn property_simplify_keeps_variables(a in expression()) {
        let before: Vec<String> = a.variables().map(|v| v.name.clone()).collect();
        for var in a.simplify().variables() {
            prop_assert!(before.contains(&var.name));
        }
    }

    /// PROPERTY: implication with a constant antecedent short-circuits.
    #[test]
    fn property_implies_constants(a in expression()) {
        prop_assert_eq!(LogicValue::True.implies(a.clone()), a.clone());
        prop_assert!(LogicValue::False.implies(a.clone()).is_true());
        prop_assert!(a.implies(LogicValue::True).is_true());
    }
}
