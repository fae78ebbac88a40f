//! Error types for launchvar
//!
//! Uses `thiserror` for library errors. Tag-level failures (`TagError`) are
//! raised while a single launch tag is processed; the interpreter attaches
//! file and source location to them and reports a file-level `LaunchError`.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for launchvar operations
pub type LaunchResult<T> = Result<T, LaunchError>;

/// File-level error: aborts the interpretation of one launch file
#[derive(Error, Debug)]
pub enum LaunchError {
    /// A tag failed to interpret
    #[error("in {file} <{tag}> [{line}:{column}]: {source}")]
    Interpretation {
        file: PathBuf,
        tag: &'static str,
        line: usize,
        column: usize,
        #[source]
        source: TagError,
    },

    /// Malformed XML
    #[error("invalid launch XML in {file}: {message}")]
    Xml { file: PathBuf, message: String },

    /// Root element is not `<launch>`
    #[error("invalid root tag <{tag}> in {file}")]
    InvalidRoot { file: PathBuf, tag: String },

    /// Element outside the launch vocabulary
    #[error("unknown tag <{tag}> in {file} [{line}:{column}]")]
    UnknownTag {
        file: PathBuf,
        tag: String,
        line: usize,
        column: usize,
    },

    /// Schema violation detected while building the tree
    #[error("in {file} <{tag}> [{line}:{column}]: {source}")]
    Schema {
        file: PathBuf,
        tag: &'static str,
        line: usize,
        column: usize,
        #[source]
        source: SchemaError,
    },

    /// Launch file is outside the allowed directory (strict mode)
    #[error("access to '{path}' denied outside of '{root}'")]
    AccessDenied { path: PathBuf, root: PathBuf },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be parsed
    #[error("invalid configuration in {file}: {message}")]
    InvalidConfig { file: PathBuf, message: String },
}

/// Failure raised while processing one tag
#[derive(Error, Debug)]
pub enum TagError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Substitution(#[from] SubstitutionError),

    #[error(transparent)]
    Arg(#[from] ArgError),

    #[error(transparent)]
    Machine(#[from] MachineError),

    /// A value required to be statically known was not
    #[error("{0}")]
    Sanity(String),

    #[error(transparent)]
    Value(#[from] ValueError),

    /// Error from an included file; already carries its own context
    #[error(transparent)]
    Nested(Box<LaunchError>),
}

impl From<LaunchError> for TagError {
    fn from(err: LaunchError) -> Self {
        TagError::Nested(Box::new(err))
    }
}

impl TagError {
    /// A tag condition could not be resolved to a literal
    pub fn conditional_tag(tag: &str, unknown: &str) -> Self {
        TagError::Sanity(format!(
            "unable to resolve conditional <{}>: unknown {}",
            tag, unknown
        ))
    }

    /// An attribute required to be literal was not
    pub fn cannot_resolve(unknown: &str) -> Self {
        TagError::Sanity(format!("unable to resolve {}", unknown))
    }
}

/// Malformed or incompatible attributes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("missing required attribute '{0}'")]
    MissingAttr(String),

    #[error("unknown attribute '{0}'")]
    UnknownAttr(String),

    #[error("cannot declare both \"if\" and \"unless\" at the same time")]
    BothIfUnless,

    #[error("'{0}' is incompatible with '{1}'")]
    Incompatible(String, String),

    #[error("<{0}> does not allow child tags")]
    NoChildren(String),

    #[error("<{child}> cannot be a child of <{parent}>")]
    InvalidChild { child: String, parent: String },

    #[error("<{tag}> cannot {operation}")]
    Unsupported { tag: String, operation: String },
}

/// Malformed `$(...)` expressions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubstitutionError {
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("$({cmd}) takes {expected} arguments, but received {args:?}")]
    ArgCount {
        cmd: String,
        expected: String,
        args: Vec<String>,
    },

    #[error("\"$\" cannot appear within expression")]
    NestedDollar,

    #[error("$(eval) must span the whole expression")]
    EvalNotWhole,
}

/// Argument contract violations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgError {
    #[error("$(arg {0}): {0} is undeclared")]
    Undeclared(String),

    #[error("$(arg {0}): {0} is already defined")]
    Duplicate(String),
}

/// Remote-target contract violations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MachineError {
    #[error("machine '{0}' is undeclared")]
    Undeclared(String),

    #[error("machine '{0}' is already defined")]
    Duplicate(String),
}

/// Plain value errors (empty names, bad literals, type mismatches)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("'{0}' must not be empty")]
    EmptyValue(String),

    #[error("'{value}' is not a valid value for '{attr}'")]
    InvalidValue { attr: String, value: String },

    #[error("'{value}' is not a valid {expected}")]
    Conversion { value: String, expected: String },

    #[error("expected '{expected}', got '{got}'")]
    TypeMismatch { expected: String, got: String },

    #[error("unresolved value requires at least one unknown part")]
    NoUnknownParts,

    #[error("multiple possible values")]
    MultipleValues,

    #[error("invalid ROS name: {0}")]
    InvalidName(String),
}
