//! `$(...)` substitution expressions
//!
//! Attribute text is split into literal text and substitution commands.
//! Each command is resolved against a [`SubstitutionContext`]; commands
//! whose value is unknown become [`UnknownValue`] placeholders instead of
//! failing, so the result may be only partially resolved.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ArgError, SubstitutionError, TagError};
use crate::values::{convert_value, Fragment, SolverResult, UnknownValue, ValueType};

static SUB_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\(([^$()]+?)\)").expect("valid substitution pattern"));
static ERROR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\([^$()]*?\$[^)]*?\)").expect("valid substitution pattern"));

const EVAL_PREFIX: &str = "$(eval ";

/// Values a substitution may look up
pub trait SubstitutionContext {
    /// Value of a declared argument; `None` if it has no known value
    fn get_arg(&self, name: &str) -> Result<Option<String>, ArgError>;

    fn get_env(&self, name: &str) -> Option<String>;

    fn get_pkg_path(&self, name: &str) -> Option<String>;

    /// Stable anonymous name for `name`
    fn get_anonymous_name(&self, name: &str) -> String;

    /// Directory of the launch file being interpreted
    fn dirpath(&self) -> String;
}

/// Context that reads undeclared arguments as unknown.
///
/// Used for `if`/`unless`, where an argument nobody declared still leaves
/// the element possibly present.
pub struct UndeclaredArgsUnknown<'c>(pub &'c dyn SubstitutionContext);

impl SubstitutionContext for UndeclaredArgsUnknown<'_> {
    fn get_arg(&self, name: &str) -> Result<Option<String>, ArgError> {
        match self.0.get_arg(name) {
            Err(ArgError::Undeclared(_)) => Ok(None),
            other => other,
        }
    }

    fn get_env(&self, name: &str) -> Option<String> {
        self.0.get_env(name)
    }

    fn get_pkg_path(&self, name: &str) -> Option<String> {
        self.0.get_pkg_path(name)
    }

    fn get_anonymous_name(&self, name: &str) -> String {
        self.0.get_anonymous_name(name)
    }

    fn dirpath(&self) -> String {
        self.0.dirpath()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Text(String),
    Arg(String),
    Find(String),
    Anon(String),
    Env(String),
    OptEnv(String, Option<String>),
    Dirname,
    Eval(String),
}

impl Command {
    fn build(name: &str, args: Vec<String>) -> Result<Self, SubstitutionError> {
        let arg_count = |expected: &str, args: Vec<String>| SubstitutionError::ArgCount {
            cmd: name.to_string(),
            expected: expected.to_string(),
            args,
        };
        let single = |args: Vec<String>| -> Result<String, SubstitutionError> {
            match <[String; 1]>::try_from(args) {
                Ok([arg]) => Ok(arg),
                Err(args) => Err(arg_count("exactly 1", args)),
            }
        };
        match name {
            "arg" => single(args).map(Command::Arg),
            "find" => single(args).map(Command::Find),
            "anon" => single(args).map(Command::Anon),
            "env" => single(args).map(Command::Env),
            "eval" => single(args).map(Command::Eval),
            "optenv" => {
                let mut iter = args.clone().into_iter();
                match (iter.next(), iter.next(), iter.next()) {
                    (Some(var), default, None) => Ok(Command::OptEnv(var, default)),
                    (None, _, _) => Err(arg_count("at least 1", args)),
                    _ => Err(arg_count("at most 2", args)),
                }
            }
            "dirname" if args.is_empty() => Ok(Command::Dirname),
            "dirname" => Err(arg_count("no", args)),
            _ => Err(SubstitutionError::InvalidCommand(name.to_string())),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Command::Text(_) => "text",
            Command::Arg(_) => "arg",
            Command::Find(_) => "find",
            Command::Anon(_) => "anon",
            Command::Env(_) => "env",
            Command::OptEnv(..) => "optenv",
            Command::Dirname => "dirname",
            Command::Eval(_) => "eval",
        }
    }

    fn args(&self) -> Vec<String> {
        match self {
            Command::Text(s)
            | Command::Arg(s)
            | Command::Find(s)
            | Command::Anon(s)
            | Command::Env(s)
            | Command::Eval(s) => vec![s.clone()],
            Command::OptEnv(var, default) => {
                std::iter::once(var.clone()).chain(default.clone()).collect()
            }
            Command::Dirname => Vec::new(),
        }
    }

    /// `Ok(None)` when the value is not known statically
    fn resolve(&self, ctx: &dyn SubstitutionContext) -> Result<Option<String>, ArgError> {
        Ok(match self {
            Command::Text(s) => Some(s.clone()),
            Command::Arg(name) => ctx.get_arg(name)?,
            Command::Find(pkg) => ctx.get_pkg_path(pkg),
            Command::Anon(name) => Some(ctx.get_anonymous_name(name)),
            Command::Env(var) => ctx.get_env(var),
            Command::OptEnv(var, default) => Some(
                ctx.get_env(var)
                    .unwrap_or_else(|| default.clone().unwrap_or_default()),
            ),
            Command::Dirname => Some(ctx.dirpath()),
            Command::Eval(_) => None,
        })
    }
}

/// A parsed attribute value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    text: String,
    /// Commands paired with the source text they were parsed from
    commands: Vec<(Command, String)>,
}

impl Substitution {
    pub fn parse(text: &str) -> Result<Self, SubstitutionError> {
        let mut commands = Vec::new();
        if let Some(expr) = text.strip_prefix(EVAL_PREFIX) {
            let expr = expr.strip_suffix(')').ok_or(SubstitutionError::EvalNotWhole)?;
            if expr.contains("$(") {
                return Err(SubstitutionError::NestedDollar);
            }
            commands.push((Command::Eval(expr.to_string()), text.to_string()));
            return Ok(Self {
                text: text.to_string(),
                commands,
            });
        }
        if ERROR_PATTERN.is_match(text) {
            return Err(SubstitutionError::NestedDollar);
        }
        let mut last = 0;
        for caps in SUB_PATTERN.captures_iter(text) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let mut parts = inner.as_str().trim().splitn(2, char::is_whitespace);
            let name = parts.next().unwrap_or_default();
            let args: Vec<String> = parts
                .next()
                .map(|rest| {
                    rest.trim()
                        .splitn(2, char::is_whitespace)
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default();
            let prefix = &text[last..whole.start()];
            if !prefix.is_empty() {
                if name == "eval" {
                    return Err(SubstitutionError::EvalNotWhole);
                }
                commands.push((Command::Text(prefix.to_string()), prefix.to_string()));
            }
            commands.push((Command::build(name, args)?, whole.as_str().to_string()));
            last = whole.end();
        }
        if last < text.len() || commands.is_empty() {
            let rest = &text[last..];
            commands.push((Command::Text(rest.to_string()), rest.to_string()));
        }
        Ok(Self {
            text: text.to_string(),
            commands,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Resolve every command and convert the result to `var_type`
    pub fn resolve(
        &self,
        ctx: &dyn SubstitutionContext,
        var_type: ValueType,
    ) -> Result<SolverResult, TagError> {
        let mut parts = Vec::with_capacity(self.commands.len());
        let mut unknown = false;
        for (command, source) in &self.commands {
            match command.resolve(ctx)? {
                Some(value) if value.is_empty() => {}
                Some(value) => parts.push(Fragment::Text(value)),
                None => {
                    unknown = true;
                    parts.push(Fragment::Unknown(UnknownValue::new(
                        command.name(),
                        command.args(),
                        source.as_str(),
                    )));
                }
            }
        }
        if unknown {
            return Ok(SolverResult::unresolved(parts, var_type)?);
        }
        let text: String = parts
            .iter()
            .filter_map(|p| match p {
                Fragment::Text(s) => Some(s.as_str()),
                Fragment::Unknown(_) => None,
            })
            .collect();
        let literal = convert_value(&text, var_type)?;
        Ok(SolverResult::resolved(literal, var_type)?)
    }
}

/// Parse and resolve `text` in one step
pub fn resolve_text(
    text: &str,
    ctx: &dyn SubstitutionContext,
    var_type: ValueType,
) -> Result<SolverResult, TagError> {
    Substitution::parse(text)?.resolve(ctx, var_type)
}
