//! Partially resolved values
//!
//! A [`SolverResult`] is either a literal or an ordered list of literal text
//! fragments and [`UnknownValue`] placeholders. [`ConditionalData`] holds a
//! value that differs per symbolic condition.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::ValueError;
use crate::logic::LogicValue;

/// Wildcard used when rendering unknown parts of a value
pub const VAR_STRING: &str = "$(?)";

/// Declared type of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Bool,
    Int,
    Double,
    String,
    Yaml,
    /// Inferred from the literal text
    Auto,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Double => "double",
            ValueType::String => "string",
            ValueType::Yaml => "yaml",
            ValueType::Auto => "auto",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bool" => Ok(ValueType::Bool),
            "int" => Ok(ValueType::Int),
            "double" => Ok(ValueType::Double),
            "str" | "string" => Ok(ValueType::String),
            "yaml" => Ok(ValueType::Yaml),
            "auto" => Ok(ValueType::Auto),
            _ => Err(ValueError::InvalidValue {
                attr: "type".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// A fully known value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Yaml(serde_yaml_ng::Value),
}

impl Literal {
    /// Type the literal naturally has
    pub fn value_type(&self) -> ValueType {
        match self {
            Literal::Bool(_) => ValueType::Bool,
            Literal::Int(_) => ValueType::Int,
            Literal::Double(_) => ValueType::Double,
            Literal::String(_) => ValueType::String,
            Literal::Yaml(_) => ValueType::Yaml,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Literal::Bool(b) => Some(*b),
            Literal::Yaml(serde_yaml_ng::Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Literal::Double(x) => Some(*x),
            Literal::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Wrap a YAML scalar in the matching literal kind; composites stay YAML
    pub fn from_yaml(value: serde_yaml_ng::Value) -> Self {
        use serde_yaml_ng::Value;
        match value {
            Value::Bool(b) => Literal::Bool(b),
            Value::Number(ref n) if n.is_i64() => n.as_i64().map_or(Literal::Yaml(value.clone()), Literal::Int),
            Value::Number(ref n) if n.is_f64() => n.as_f64().map_or(Literal::Yaml(value.clone()), Literal::Double),
            Value::String(s) => Literal::String(s),
            other => Literal::Yaml(other),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Double(x) => write!(f, "{:?}", x),
            Literal::String(s) => f.write_str(s),
            Literal::Yaml(value) => {
                let text = serde_yaml_ng::to_string(value).map_err(|_| fmt::Error)?;
                f.write_str(text.trim_end())
            }
        }
    }
}

/// Convert literal text to a value of the requested type.
///
/// `Auto` tries a double (only if the text contains `.`), then an int, then
/// `true`/`false`, and falls back to the text itself.
pub fn convert_value(text: &str, var_type: ValueType) -> Result<Literal, ValueError> {
    let conversion = |expected: &str| ValueError::Conversion {
        value: text.to_string(),
        expected: expected.to_string(),
    };
    match var_type {
        ValueType::Auto => {
            let trimmed = text.trim();
            if trimmed.contains('.') {
                if let Ok(x) = trimmed.parse::<f64>() {
                    return Ok(Literal::Double(x));
                }
            } else if let Ok(i) = trimmed.parse::<i64>() {
                return Ok(Literal::Int(i));
            }
            match text.to_lowercase().as_str() {
                "true" => Ok(Literal::Bool(true)),
                "false" => Ok(Literal::Bool(false)),
                _ => Ok(Literal::String(text.to_string())),
            }
        }
        ValueType::String => Ok(Literal::String(text.to_string())),
        ValueType::Int => text
            .trim()
            .parse::<i64>()
            .map(Literal::Int)
            .map_err(|_| conversion("int")),
        ValueType::Double => text
            .trim()
            .parse::<f64>()
            .map(Literal::Double)
            .map_err(|_| conversion("double")),
        ValueType::Bool => match text.trim().to_lowercase().as_str() {
            "true" | "1" => Ok(Literal::Bool(true)),
            "false" | "0" => Ok(Literal::Bool(false)),
            _ => Err(conversion("bool")),
        },
        ValueType::Yaml => serde_yaml_ng::from_str::<serde_yaml_ng::Value>(text)
            .map(Literal::Yaml)
            .map_err(|e| ValueError::Conversion {
                value: e.to_string(),
                expected: "yaml".to_string(),
            }),
    }
}

/// Placeholder for a substitution that could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UnknownValue {
    /// Substitution command (`arg`, `find`, `env`, ...)
    pub cmd: String,
    pub args: Vec<String>,
    /// Original text, e.g. `$(arg robot)`
    pub text: String,
}

impl UnknownValue {
    pub fn new(cmd: impl Into<String>, args: Vec<String>, text: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            args,
            text: text.into(),
        }
    }
}

/// One piece of a partially resolved value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Fragment {
    Text(String),
    Unknown(UnknownValue),
}

impl From<&str> for Fragment {
    fn from(text: &str) -> Self {
        Fragment::Text(text.to_string())
    }
}

impl From<UnknownValue> for Fragment {
    fn from(value: UnknownValue) -> Self {
        Fragment::Unknown(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Resolution {
    Resolved(Literal),
    Unresolved(Vec<Fragment>),
}

/// Looks up values for one substitution command
pub trait ValueLookup {
    fn get(&self, args: &[String]) -> Option<String>;
}

impl ValueLookup for BTreeMap<String, String> {
    fn get(&self, args: &[String]) -> Option<String> {
        BTreeMap::get(self, &args.join(" ")).cloned()
    }
}

impl ValueLookup for HashMap<String, String> {
    fn get(&self, args: &[String]) -> Option<String> {
        HashMap::get(self, &args.join(" ")).cloned()
    }
}

/// Command name → lookup, used by [`SolverResult::replace`]
pub type Bindings<'a> = BTreeMap<&'a str, &'a dyn ValueLookup>;

/// Outcome of resolving an attribute: a literal, or literal text mixed
/// with unknown parts
#[derive(Debug, Clone, PartialEq)]
pub struct SolverResult {
    value: Resolution,
    var_type: ValueType,
}

impl SolverResult {
    /// Resolved value; the literal must match the declared type
    pub fn resolved(value: Literal, var_type: ValueType) -> Result<Self, ValueError> {
        let compatible = match var_type {
            ValueType::Auto | ValueType::Yaml => true,
            other => value.value_type() == other,
        };
        if !compatible {
            return Err(ValueError::TypeMismatch {
                expected: var_type.to_string(),
                got: value.value_type().to_string(),
            });
        }
        let var_type = match var_type {
            ValueType::Auto => value.value_type(),
            other => other,
        };
        Ok(Self {
            value: Resolution::Resolved(value),
            var_type,
        })
    }

    pub fn bool(value: bool) -> Self {
        Self::literal(Literal::Bool(value))
    }

    pub fn int(value: i64) -> Self {
        Self::literal(Literal::Int(value))
    }

    pub fn double(value: f64) -> Self {
        Self::literal(Literal::Double(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::literal(Literal::String(value.into()))
    }

    pub fn yaml(value: serde_yaml_ng::Value) -> Self {
        Self {
            value: Resolution::Resolved(Literal::Yaml(value)),
            var_type: ValueType::Yaml,
        }
    }

    fn literal(value: Literal) -> Self {
        let var_type = value.value_type();
        Self {
            value: Resolution::Resolved(value),
            var_type,
        }
    }

    /// Partially resolved value; at least one part must be unknown
    pub fn unresolved(parts: Vec<Fragment>, var_type: ValueType) -> Result<Self, ValueError> {
        if !parts.iter().any(|p| matches!(p, Fragment::Unknown(_))) {
            return Err(ValueError::NoUnknownParts);
        }
        Ok(Self {
            value: Resolution::Unresolved(parts),
            var_type,
        })
    }

    /// Contents of a file that could not be read
    pub fn unresolved_file_contents(path: &str) -> Self {
        Self::single_unknown(UnknownValue::new("file", vec![path.to_string()], path))
    }

    /// Output of a command that could not be run
    pub fn unresolved_command_line(cmd: &str) -> Self {
        Self::single_unknown(UnknownValue::new("cmd", vec![cmd.to_string()], cmd))
    }

    fn single_unknown(unknown: UnknownValue) -> Self {
        Self {
            value: Resolution::Unresolved(vec![Fragment::Unknown(unknown)]),
            var_type: ValueType::String,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.value, Resolution::Resolved(_))
    }

    pub fn var_type(&self) -> ValueType {
        self.var_type
    }

    /// Same value, declared with another type. Only unresolved values
    /// can be retyped freely; resolved ones are checked.
    pub fn with_type(self, var_type: ValueType) -> Result<Self, ValueError> {
        match self.value {
            Resolution::Resolved(literal) => Self::resolved(literal, var_type),
            Resolution::Unresolved(parts) => Ok(Self {
                value: Resolution::Unresolved(parts),
                var_type,
            }),
        }
    }

    /// The literal, if resolved
    pub fn value(&self) -> Option<&Literal> {
        match &self.value {
            Resolution::Resolved(literal) => Some(literal),
            Resolution::Unresolved(_) => None,
        }
    }

    /// Fragments, if unresolved
    pub fn parts(&self) -> Option<&[Fragment]> {
        match &self.value {
            Resolution::Resolved(_) => None,
            Resolution::Unresolved(parts) => Some(parts),
        }
    }

    /// Unknown placeholders, in order
    pub fn unknown(&self) -> Vec<&UnknownValue> {
        self.parts()
            .unwrap_or_default()
            .iter()
            .filter_map(|p| match p {
                Fragment::Unknown(u) => Some(u),
                Fragment::Text(_) => None,
            })
            .collect()
    }

    /// Text of the unknown parts, comma separated
    pub fn unknown_text(&self) -> String {
        self.unknown()
            .iter()
            .map(|u| u.text.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Render as text. Unknown parts become `wildcard`, or their original
    /// text when `wildcard` is `None`.
    pub fn as_string(&self, wildcard: Option<&str>) -> String {
        match &self.value {
            Resolution::Resolved(literal) => literal.to_string(),
            Resolution::Unresolved(parts) => parts
                .iter()
                .map(|p| match (p, wildcard) {
                    (Fragment::Text(s), _) => s.as_str(),
                    (Fragment::Unknown(_), Some(w)) => w,
                    (Fragment::Unknown(u), None) => u.text.as_str(),
                })
                .collect(),
        }
    }

    /// Try to fill in unknown parts from `bindings`.
    ///
    /// Returns the input unchanged if nothing could be resolved, a resolved
    /// value if every part became literal, and a new partial value otherwise.
    pub fn replace(&self, bindings: &Bindings<'_>) -> SolverResult {
        let parts = match &self.value {
            Resolution::Resolved(_) => return self.clone(),
            Resolution::Unresolved(parts) => parts,
        };
        let mut changed = false;
        let mut still_unknown = false;
        let mut replaced = Vec::with_capacity(parts.len());
        for part in parts {
            let resolved = match part {
                Fragment::Text(_) => {
                    replaced.push(part.clone());
                    continue;
                }
                Fragment::Unknown(u) => bindings
                    .get(u.cmd.as_str())
                    .and_then(|lookup| lookup.get(&u.args))
                    .filter(|value| !value.is_empty()),
            };
            match resolved {
                Some(value) => {
                    changed = true;
                    replaced.push(Fragment::Text(value));
                }
                None => {
                    still_unknown = true;
                    replaced.push(part.clone());
                }
            }
        }
        if !changed {
            return self.clone();
        }
        if still_unknown {
            return Self {
                value: Resolution::Unresolved(replaced),
                var_type: self.var_type,
            };
        }
        let text: String = replaced
            .iter()
            .map(|p| match p {
                Fragment::Text(s) => s.as_str(),
                Fragment::Unknown(u) => u.text.as_str(),
            })
            .collect();
        convert_value(&text, self.var_type)
            .and_then(|literal| Self::resolved(literal, self.var_type))
            .unwrap_or_else(|_| Self::string(text))
    }
}

impl fmt::Display for SolverResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string(Some(VAR_STRING)))
    }
}

impl Serialize for SolverResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("SolverResult", 4)?;
        match &self.value {
            Resolution::Resolved(literal) => {
                state.serialize_field("value", literal)?;
                state.serialize_field("var_type", &self.var_type)?;
                state.serialize_field("is_resolved", &true)?;
                state.serialize_field("unknown", &Option::<()>::None)?;
            }
            Resolution::Unresolved(parts) => {
                state.serialize_field("value", parts)?;
                state.serialize_field("var_type", &self.var_type)?;
                state.serialize_field("is_resolved", &false)?;
                state.serialize_field("unknown", &self.unknown())?;
            }
        }
        state.end()
    }
}

/// Where an entity was declared
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub package: Option<String>,
    pub filepath: String,
    pub line: usize,
    pub column: usize,
}

/// Kind of conditional attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionStatement {
    If,
    Unless,
}

impl fmt::Display for ConditionStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionStatement::If => f.write_str("if"),
            ConditionStatement::Unless => f.write_str("unless"),
        }
    }
}

/// An `if`/`unless` attribute that only partially resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopeCondition {
    pub statement: ConditionStatement,
    pub value: SolverResult,
    pub location: Option<SourceLocation>,
}

impl ScopeCondition {
    pub fn as_string(&self, wildcard: Option<&str>) -> String {
        format!("{} ({})", self.statement, self.value.as_string(wildcard))
    }
}

/// A value with per-condition variants.
///
/// Variants are kept in insertion order; nothing enforces that their
/// conditions are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionalData<T> {
    base: Option<T>,
    variants: Vec<(T, LogicValue)>,
}

impl<T> Default for ConditionalData<T> {
    fn default() -> Self {
        Self {
            base: None,
            variants: Vec::new(),
        }
    }
}

impl<T: Clone> ConditionalData<T> {
    pub fn new(base: T) -> Self {
        Self {
            base: Some(base),
            variants: Vec::new(),
        }
    }

    /// No variants recorded
    pub fn is_deterministic(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn base_value(&self) -> Option<&T> {
        self.base.as_ref()
    }

    /// The single value; fails if there are variants
    pub fn get_value(&self) -> Result<Option<&T>, ValueError> {
        if !self.variants.is_empty() {
            return Err(ValueError::MultipleValues);
        }
        Ok(self.base.as_ref())
    }

    /// Record `value` under `condition`. A true condition overwrites
    /// everything, a false one is ignored.
    pub fn set(&mut self, value: T, condition: LogicValue) {
        if condition.is_true() {
            self.base = Some(value);
            self.variants.clear();
        } else if !condition.is_false() {
            self.variants.push((value, condition));
        }
    }

    /// Variants, most recent first, then the base under `True`
    pub fn possible_values(&self) -> Vec<(Option<&T>, LogicValue)> {
        let mut values: Vec<(Option<&T>, LogicValue)> = self
            .variants
            .iter()
            .rev()
            .map(|(v, c)| (Some(v), c.clone()))
            .collect();
        values.push((self.base.as_ref(), LogicValue::True));
        values
    }
}

/// Name → conditional value table (remaps, environment)
pub type VariantMap<T> = BTreeMap<String, ConditionalData<T>>;
