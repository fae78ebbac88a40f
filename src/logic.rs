//! Propositional logic over symbolic launch conditions
//!
//! `LogicValue` is an immutable boolean expression: constants, named
//! variables, negation, conjunction and disjunction. Values are combined with
//! [`LogicValue::join`], [`LogicValue::disjoin`] and [`LogicValue::implies`],
//! and reduced with [`LogicValue::simplify`], which is a syntactic
//! simplification and not a satisfiability check.
//!
//! Equality is structural. Conjunctions and disjunctions compare as sets of
//! operands, variables compare by name.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::values::ScopeCondition;

/// Prefix of session-generated variable names
const VARIABLE_PREFIX: char = '@';

/// Issues unique variable names within one analysis session.
///
/// Names are sequential (`@1`, `@2`, ...), so two sessions over the same
/// input produce the same names.
#[derive(Debug, Clone, Default)]
pub struct NamingContext {
    issued: u64,
}

impl NamingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next unused name
    pub fn fresh_name(&mut self) -> String {
        self.issued += 1;
        format!("{}{}", VARIABLE_PREFIX, self.issued)
    }

    /// Number of names issued so far
    pub fn issued(&self) -> u64 {
        self.issued
    }
}

/// What a symbolic variable stands for
#[derive(Debug, Clone, PartialEq)]
pub enum VariableData {
    /// An `if`/`unless` attribute that could not be resolved
    Condition(Box<ScopeCondition>),
    /// Two partially known values are equal
    Equality { left: String, right: String },
    /// Free-form provenance
    Text(String),
}

impl Serialize for VariableData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            VariableData::Condition(condition) => condition.serialize(serializer),
            VariableData::Equality { left, right } => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element("==")?;
                seq.serialize_element(left)?;
                seq.serialize_element(right)?;
                seq.end()
            }
            VariableData::Text(text) => serializer.serialize_str(text),
        }
    }
}

/// A named boolean unknown
#[derive(Debug, Clone)]
pub struct LogicVariable {
    pub name: String,
    /// Original text the variable was built from
    pub text: String,
    pub data: VariableData,
}

impl LogicVariable {
    /// Variable with a fresh name from `naming`
    pub fn fresh(naming: &mut NamingContext, text: impl Into<String>, data: VariableData) -> Self {
        Self {
            name: naming.fresh_name(),
            text: text.into(),
            data,
        }
    }

    /// Variable with an explicit name
    pub fn named(name: impl Into<String>, text: impl Into<String>, data: VariableData) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            data,
        }
    }
}

impl PartialEq for LogicVariable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for LogicVariable {}

impl Hash for LogicVariable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// Boolean expression over symbolic variables
#[derive(Debug, Clone)]
pub enum LogicValue {
    True,
    False,
    Variable(LogicVariable),
    Not(Box<LogicValue>),
    And(Vec<LogicValue>),
    Or(Vec<LogicValue>),
}

impl Default for LogicValue {
    fn default() -> Self {
        LogicValue::True
    }
}

impl From<bool> for LogicValue {
    fn from(value: bool) -> Self {
        if value {
            LogicValue::True
        } else {
            LogicValue::False
        }
    }
}

impl From<LogicVariable> for LogicValue {
    fn from(var: LogicVariable) -> Self {
        LogicValue::Variable(var)
    }
}

impl LogicValue {
    pub fn is_true(&self) -> bool {
        matches!(self, LogicValue::True)
    }

    pub fn is_false(&self) -> bool {
        matches!(self, LogicValue::False)
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, LogicValue::Variable(_))
    }

    pub fn is_constant(&self) -> bool {
        self.is_true() || self.is_false()
    }

    /// Constant or variable
    pub fn is_atomic(&self) -> bool {
        self.is_constant() || self.is_variable()
    }

    pub fn is_not(&self) -> bool {
        matches!(self, LogicValue::Not(_))
    }

    pub fn is_and(&self) -> bool {
        matches!(self, LogicValue::And(_))
    }

    pub fn is_or(&self) -> bool {
        matches!(self, LogicValue::Or(_))
    }

    /// Logical negation. `¬¬x` collapses to `x`.
    pub fn negate(&self) -> LogicValue {
        match self {
            LogicValue::True => LogicValue::False,
            LogicValue::False => LogicValue::True,
            LogicValue::Not(operand) => (**operand).clone(),
            other => LogicValue::Not(Box::new(other.clone())),
        }
    }

    /// Conjunction (`self ∧ other`)
    pub fn join(self, other: LogicValue) -> LogicValue {
        match (self, other) {
            (LogicValue::True, value) | (value, LogicValue::True) => value,
            (LogicValue::False, _) | (_, LogicValue::False) => LogicValue::False,
            (LogicValue::And(mut operands), LogicValue::And(more)) => {
                operands.extend(more);
                LogicValue::And(operands)
            }
            (LogicValue::And(mut operands), value) => {
                operands.push(value);
                LogicValue::And(operands)
            }
            (value, LogicValue::And(more)) => {
                let mut operands = Vec::with_capacity(more.len() + 1);
                operands.push(value);
                operands.extend(more);
                LogicValue::And(operands)
            }
            (a, b) => LogicValue::And(vec![a, b]),
        }
    }

    /// Disjunction (`self ∨ other`)
    pub fn disjoin(self, other: LogicValue) -> LogicValue {
        match (self, other) {
            (LogicValue::False, value) | (value, LogicValue::False) => value,
            (LogicValue::True, _) | (_, LogicValue::True) => LogicValue::True,
            (LogicValue::Or(mut operands), LogicValue::Or(more)) => {
                operands.extend(more);
                LogicValue::Or(operands)
            }
            (LogicValue::Or(mut operands), value) => {
                operands.push(value);
                LogicValue::Or(operands)
            }
            (value, LogicValue::Or(more)) => {
                let mut operands = Vec::with_capacity(more.len() + 1);
                operands.push(value);
                operands.extend(more);
                LogicValue::Or(operands)
            }
            (a, b) => LogicValue::Or(vec![a, b]),
        }
    }

    /// Material implication (`¬self ∨ other`)
    pub fn implies(self, other: LogicValue) -> LogicValue {
        if self.is_true() {
            return other;
        }
        if self.is_false() || other.is_true() {
            return LogicValue::True;
        }
        if other.is_false() {
            return self.negate();
        }
        self.negate().disjoin(other)
    }

    /// Syntactic simplification.
    ///
    /// Flattens nested operators, drops duplicates and constants, detects
    /// pairwise contradictions (`x ∧ ¬x`) and tautologies (`x ∨ ¬x`), and
    /// trims composite operands subsumed by a smaller one.
    pub fn simplify(&self) -> LogicValue {
        match self {
            LogicValue::True | LogicValue::False | LogicValue::Variable(_) => self.clone(),
            LogicValue::Not(operand) => simplify_not(operand),
            LogicValue::And(operands) => simplify_and(operands),
            LogicValue::Or(operands) => simplify_or(operands),
        }
    }

    /// All variable leaves, depth-first, duplicates included
    pub fn variables(&self) -> Variables<'_> {
        Variables { stack: vec![self] }
    }
}

fn simplify_not(operand: &LogicValue) -> LogicValue {
    if let LogicValue::Not(inner) = operand {
        return inner.simplify();
    }
    match operand.simplify() {
        LogicValue::And(operands) => {
            simplify_or(&operands.iter().map(LogicValue::negate).collect::<Vec<_>>())
        }
        LogicValue::Or(operands) => {
            simplify_and(&operands.iter().map(LogicValue::negate).collect::<Vec<_>>())
        }
        other => other.negate(),
    }
}

fn simplify_and(operands: &[LogicValue]) -> LogicValue {
    let mut flat: Vec<LogicValue> = Vec::with_capacity(operands.len());
    for x in operands {
        match x.simplify() {
            LogicValue::True => {}
            LogicValue::False => return LogicValue::False,
            LogicValue::And(inner) => {
                for y in inner {
                    push_unique(&mut flat, y);
                }
            }
            y => push_unique(&mut flat, y),
        }
    }
    if flat.is_empty() {
        return LogicValue::True;
    }
    if has_complementary_pair(&flat) {
        return LogicValue::False;
    }
    trim_supersets(&mut flat, |x| match x {
        LogicValue::Or(ops) => Some(ops.as_slice()),
        _ => None,
    });
    if flat.len() == 1 {
        flat.pop().unwrap_or(LogicValue::True)
    } else {
        LogicValue::And(flat)
    }
}

fn simplify_or(operands: &[LogicValue]) -> LogicValue {
    let mut flat: Vec<LogicValue> = Vec::with_capacity(operands.len());
    for x in operands {
        match x.simplify() {
            LogicValue::False => {}
            LogicValue::True => return LogicValue::True,
            LogicValue::Or(inner) => {
                for y in inner {
                    push_unique(&mut flat, y);
                }
            }
            y => push_unique(&mut flat, y),
        }
    }
    // Empty disjunction is False, the identity of OR
    if flat.is_empty() {
        return LogicValue::False;
    }
    if has_complementary_pair(&flat) {
        return LogicValue::True;
    }
    trim_supersets(&mut flat, |x| match x {
        LogicValue::And(ops) => Some(ops.as_slice()),
        _ => None,
    });
    if flat.len() == 1 {
        flat.pop().unwrap_or(LogicValue::False)
    } else {
        LogicValue::Or(flat)
    }
}

fn push_unique(operands: &mut Vec<LogicValue>, value: LogicValue) {
    if !operands.contains(&value) {
        operands.push(value);
    }
}

fn has_complementary_pair(operands: &[LogicValue]) -> bool {
    for (i, x) in operands.iter().enumerate() {
        let negated = x.negate();
        if operands[i + 1..].iter().any(|y| *y == negated) {
            return true;
        }
    }
    false
}

/// Pairwise trimming of composite operands.
///
/// For every pair of composites (selected by `composite`), if the operand
/// set of one is contained in the other, the larger one is removed. Walks
/// from the back so earlier removals do not shift pending indices.
fn trim_supersets<F>(operands: &mut Vec<LogicValue>, composite: F)
where
    F: Fn(&LogicValue) -> Option<&[LogicValue]>,
{
    if operands.len() < 2 {
        return;
    }
    for i in (0..operands.len() - 1).rev() {
        let xs: HashSet<LogicValue> = match composite(&operands[i]) {
            Some(ops) => ops.iter().cloned().collect(),
            None => continue,
        };
        let mut j = operands.len() - 1;
        while j > i {
            let relation = composite(&operands[j]).map(|ops| {
                let ys: HashSet<&LogicValue> = ops.iter().collect();
                let xs_in_ys = xs.iter().all(|x| ys.contains(x));
                let ys_in_xs = ys.iter().all(|y| xs.contains(*y));
                (xs_in_ys, ys_in_xs)
            });
            match relation {
                Some((true, _)) => {
                    operands.remove(j);
                }
                Some((false, true)) => {
                    operands.remove(i);
                    break;
                }
                _ => {}
            }
            j -= 1;
        }
    }
}

/// Depth-first iterator over the variables of an expression
pub struct Variables<'a> {
    stack: Vec<&'a LogicValue>,
}

impl<'a> Iterator for Variables<'a> {
    type Item = &'a LogicVariable;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(value) = self.stack.pop() {
            match value {
                LogicValue::Variable(var) => return Some(var),
                LogicValue::Not(operand) => self.stack.push(operand),
                LogicValue::And(operands) | LogicValue::Or(operands) => {
                    self.stack.extend(operands.iter().rev());
                }
                LogicValue::True | LogicValue::False => {}
            }
        }
        None
    }
}

fn same_operand_set(a: &[LogicValue], b: &[LogicValue]) -> bool {
    a.iter().all(|x| b.contains(x)) && b.iter().all(|y| a.contains(y))
}

impl PartialEq for LogicValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (LogicValue::True, LogicValue::True) | (LogicValue::False, LogicValue::False) => true,
            (LogicValue::Variable(a), LogicValue::Variable(b)) => a == b,
            (LogicValue::Not(a), LogicValue::Not(b)) => a == b,
            (LogicValue::And(a), LogicValue::And(b)) | (LogicValue::Or(a), LogicValue::Or(b)) => {
                same_operand_set(a, b)
            }
            _ => false,
        }
    }
}

impl Eq for LogicValue {}

/// Order- and multiplicity-independent digest of an operand set
fn operand_set_digest(operands: &[LogicValue]) -> Vec<u64> {
    let mut digests: Vec<u64> = operands
        .iter()
        .map(|x| {
            let mut hasher = DefaultHasher::new();
            x.hash(&mut hasher);
            hasher.finish()
        })
        .collect();
    digests.sort_unstable();
    digests.dedup();
    digests
}

impl Hash for LogicValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            LogicValue::True | LogicValue::False => {}
            LogicValue::Variable(var) => var.hash(state),
            LogicValue::Not(operand) => operand.hash(state),
            LogicValue::And(operands) | LogicValue::Or(operands) => {
                operand_set_digest(operands).hash(state)
            }
        }
    }
}

fn write_operands(f: &mut fmt::Formatter<'_>, operands: &[LogicValue], op: &str) -> fmt::Result {
    if operands.len() == 1 {
        return write!(f, "{}", operands[0]);
    }
    write!(f, "(")?;
    for (i, x) in operands.iter().enumerate() {
        if i > 0 {
            write!(f, " {} ", op)?;
        }
        write!(f, "{}", x)?;
    }
    write!(f, ")")
}

impl fmt::Display for LogicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicValue::True => write!(f, "True"),
            LogicValue::False => write!(f, "False"),
            LogicValue::Variable(var) => write!(f, "{}", var.name),
            LogicValue::Not(operand) => write!(f, "(not {})", operand),
            LogicValue::And(operands) if operands.is_empty() => write!(f, "True"),
            LogicValue::Or(operands) if operands.is_empty() => write!(f, "False"),
            LogicValue::And(operands) => write_operands(f, operands, "and"),
            LogicValue::Or(operands) => write_operands(f, operands, "or"),
        }
    }
}

impl Serialize for LogicValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            LogicValue::True => serializer.serialize_bool(true),
            LogicValue::False => serializer.serialize_bool(false),
            LogicValue::Variable(var) => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("name", &var.name)?;
                map.serialize_entry("text", &var.text)?;
                map.serialize_entry("data", &var.data)?;
                map.end()
            }
            LogicValue::Not(operand) => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element("not")?;
                seq.serialize_element(operand)?;
                seq.end()
            }
            LogicValue::And(operands) | LogicValue::Or(operands) => {
                let op = if self.is_and() { "and" } else { "or" };
                let mut seq = serializer.serialize_seq(Some(operands.len() + 1))?;
                seq.serialize_element(op)?;
                for x in operands {
                    seq.serialize_element(x)?;
                }
                seq.end()
            }
        }
    }
}
