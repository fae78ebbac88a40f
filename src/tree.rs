//! Launch description tree
//!
//! A [`Tag`] is one element of a launch file. The vocabulary is closed
//! ([`TagKind`]) and each kind has a fixed attribute schema: allowed and
//! required attributes, attribute types, enumerated values and allowed
//! children. [`Tag::resolve`] turns the raw attributes into a typed
//! [`TagPayload`] by running substitutions against a scope.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::{SchemaError, TagError, ValueError};
use crate::subst::{resolve_text, SubstitutionContext, UndeclaredArgsUnknown};
use crate::values::{Literal, SolverResult, ValueType};

/// Closed set of launch tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    Launch,
    Arg,
    Node,
    Include,
    Remap,
    Param,
    Rosparam,
    Group,
    Env,
    Machine,
    Test,
}

impl TagKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagKind::Launch => "launch",
            TagKind::Arg => "arg",
            TagKind::Node => "node",
            TagKind::Include => "include",
            TagKind::Remap => "remap",
            TagKind::Param => "param",
            TagKind::Rosparam => "rosparam",
            TagKind::Group => "group",
            TagKind::Env => "env",
            TagKind::Machine => "machine",
            TagKind::Test => "test",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "launch" => TagKind::Launch,
            "arg" => TagKind::Arg,
            "node" => TagKind::Node,
            "include" => TagKind::Include,
            "remap" => TagKind::Remap,
            "param" => TagKind::Param,
            "rosparam" => TagKind::Rosparam,
            "group" => TagKind::Group,
            "env" => TagKind::Env,
            "machine" => TagKind::Machine,
            "test" => TagKind::Test,
            _ => return None,
        })
    }

    fn schema(&self) -> &'static TagSchema {
        match self {
            TagKind::Launch => &LAUNCH_SCHEMA,
            TagKind::Arg => &ARG_SCHEMA,
            TagKind::Node => &NODE_SCHEMA,
            TagKind::Include => &INCLUDE_SCHEMA,
            TagKind::Remap => &REMAP_SCHEMA,
            TagKind::Param => &PARAM_SCHEMA,
            TagKind::Rosparam => &ROSPARAM_SCHEMA,
            TagKind::Group => &GROUP_SCHEMA,
            TagKind::Env => &ENV_SCHEMA,
            TagKind::Machine => &MACHINE_SCHEMA,
            TagKind::Test => &TEST_SCHEMA,
        }
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct TagSchema {
    attributes: &'static [(&'static str, ValueType)],
    required: &'static [&'static str],
    enums: &'static [(&'static str, &'static [&'static str])],
    children: &'static [TagKind],
}

const SCOPE_CHILDREN: &[TagKind] = &[
    TagKind::Node,
    TagKind::Include,
    TagKind::Remap,
    TagKind::Param,
    TagKind::Rosparam,
    TagKind::Group,
    TagKind::Arg,
    TagKind::Env,
    TagKind::Machine,
    TagKind::Test,
];

const PROCESS_CHILDREN: &[TagKind] = &[TagKind::Remap, TagKind::Param, TagKind::Rosparam, TagKind::Env];

const CONDITION_ATTRS: &[(&str, ValueType)] = &[("if", ValueType::Bool), ("unless", ValueType::Bool)];

static LAUNCH_SCHEMA: TagSchema = TagSchema {
    attributes: &[],
    required: &[],
    enums: &[],
    children: SCOPE_CHILDREN,
};

static ARG_SCHEMA: TagSchema = TagSchema {
    attributes: &[
        ("name", ValueType::String),
        ("value", ValueType::String),
        ("default", ValueType::String),
        ("doc", ValueType::String),
    ],
    required: &["name"],
    enums: &[],
    children: &[],
};

static NODE_SCHEMA: TagSchema = TagSchema {
    attributes: &[
        ("pkg", ValueType::String),
        ("type", ValueType::String),
        ("name", ValueType::String),
        ("args", ValueType::String),
        ("machine", ValueType::String),
        ("respawn", ValueType::Bool),
        ("respawn_delay", ValueType::Double),
        ("required", ValueType::Bool),
        ("ns", ValueType::String),
        ("clear_params", ValueType::Bool),
        ("output", ValueType::String),
        ("cwd", ValueType::String),
        ("launch-prefix", ValueType::String),
    ],
    required: &["name", "pkg", "type"],
    enums: &[("output", &["screen", "log"]), ("cwd", &["ROS_HOME", "node"])],
    children: PROCESS_CHILDREN,
};

static INCLUDE_SCHEMA: TagSchema = TagSchema {
    attributes: &[
        ("file", ValueType::String),
        ("ns", ValueType::String),
        ("clear_params", ValueType::Bool),
        ("pass_all_args", ValueType::Bool),
    ],
    required: &["file"],
    enums: &[],
    children: &[TagKind::Arg, TagKind::Env],
};

static REMAP_SCHEMA: TagSchema = TagSchema {
    attributes: &[("from", ValueType::String), ("to", ValueType::String)],
    required: &["from", "to"],
    enums: &[],
    children: &[],
};

static PARAM_SCHEMA: TagSchema = TagSchema {
    attributes: &[
        ("name", ValueType::String),
        ("value", ValueType::String),
        ("type", ValueType::String),
        ("textfile", ValueType::String),
        ("binfile", ValueType::String),
        ("command", ValueType::String),
    ],
    required: &["name"],
    enums: &[(
        "type",
        &["bool", "str", "string", "int", "double", "yaml", "auto"],
    )],
    children: &[],
};

static ROSPARAM_SCHEMA: TagSchema = TagSchema {
    attributes: &[
        ("command", ValueType::String),
        ("file", ValueType::String),
        ("param", ValueType::String),
        ("ns", ValueType::String),
        ("subst_value", ValueType::Bool),
    ],
    required: &[],
    enums: &[("command", &["load", "delete", "dump"])],
    children: &[],
};

static GROUP_SCHEMA: TagSchema = TagSchema {
    attributes: &[("ns", ValueType::String), ("clear_params", ValueType::Bool)],
    required: &[],
    enums: &[],
    children: SCOPE_CHILDREN,
};

static ENV_SCHEMA: TagSchema = TagSchema {
    attributes: &[("name", ValueType::String), ("value", ValueType::String)],
    required: &["name", "value"],
    enums: &[],
    children: &[],
};

static MACHINE_SCHEMA: TagSchema = TagSchema {
    attributes: &[
        ("name", ValueType::String),
        ("address", ValueType::String),
        ("ssh-port", ValueType::Int),
        ("env-loader", ValueType::String),
        ("default", ValueType::String),
        ("user", ValueType::String),
        ("password", ValueType::String),
        ("timeout", ValueType::Double),
    ],
    required: &["name", "address"],
    enums: &[],
    children: &[],
};

static TEST_SCHEMA: TagSchema = TagSchema {
    attributes: &[
        ("test-name", ValueType::String),
        ("pkg", ValueType::String),
        ("type", ValueType::String),
        ("name", ValueType::String),
        ("args", ValueType::String),
        ("ns", ValueType::String),
        ("clear_params", ValueType::Bool),
        ("cwd", ValueType::String),
        ("launch-prefix", ValueType::String),
        ("retry", ValueType::Int),
        ("time-limit", ValueType::Double),
    ],
    required: &["test-name", "pkg", "type"],
    enums: &[("cwd", &["ROS_HOME", "node"])],
    children: PROCESS_CHILDREN,
};

/// One launch element with its source position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tag {
    #[serde(rename = "tag")]
    pub kind: TagKind,
    /// Element text; whitespace is stripped except for `<rosparam>`
    pub text: String,
    pub line: usize,
    pub column: usize,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<Tag>,
}

impl Tag {
    /// Build a childless tag, checking its attributes
    pub fn new(
        kind: TagKind,
        text: impl Into<String>,
        attributes: BTreeMap<String, String>,
        line: usize,
        column: usize,
    ) -> Result<Self, SchemaError> {
        let tag = Self {
            kind,
            text: text.into(),
            line: line.max(1),
            column: column.max(1),
            attributes,
            children: Vec::new(),
        };
        tag.check_schema()?;
        Ok(tag)
    }

    pub fn append(&mut self, child: Tag) -> Result<(), SchemaError> {
        if !self.kind.schema().children.contains(&child.kind) {
            return Err(SchemaError::InvalidChild {
                child: child.kind.to_string(),
                parent: self.kind.to_string(),
            });
        }
        self.children.push(child);
        Ok(())
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn is_conditional(&self) -> bool {
        self.attributes.contains_key("if") || self.attributes.contains_key("unless")
    }

    pub fn check_schema(&self) -> Result<(), SchemaError> {
        let schema = self.kind.schema();
        for key in schema.required {
            if self.attr(key).map_or(true, str::is_empty) {
                return Err(SchemaError::MissingAttr(key.to_string()));
            }
        }
        for key in self.attributes.keys() {
            if self.attr_type(key).is_none() {
                return Err(SchemaError::UnknownAttr(key.clone()));
            }
        }
        if self.attributes.contains_key("if") && self.attributes.contains_key("unless") {
            return Err(SchemaError::BothIfUnless);
        }
        if schema.children.is_empty() && !self.children.is_empty() {
            return Err(SchemaError::NoChildren(self.kind.to_string()));
        }
        for child in &self.children {
            if !schema.children.contains(&child.kind) {
                return Err(SchemaError::InvalidChild {
                    child: child.kind.to_string(),
                    parent: self.kind.to_string(),
                });
            }
        }
        self.check_tag_schema()
    }

    fn check_tag_schema(&self) -> Result<(), SchemaError> {
        match self.kind {
            TagKind::Arg => {
                if self.attr("value").is_some() && self.attr("default").is_some() {
                    return Err(SchemaError::Incompatible("value".into(), "default".into()));
                }
            }
            TagKind::Param => {
                let mut defined: Option<&str> = None;
                for attr in ["value", "textfile", "binfile", "command"] {
                    if self.attr(attr).is_none() {
                        continue;
                    }
                    if let Some(previous) = defined {
                        return Err(SchemaError::Incompatible(attr.into(), previous.into()));
                    }
                    defined = Some(attr);
                }
                if defined.is_none() {
                    return Err(SchemaError::MissingAttr("value".into()));
                }
            }
            TagKind::Rosparam => {
                self.check_rosparam_command(self.attr("command").unwrap_or("load"))?;
            }
            _ => {}
        }
        Ok(())
    }

    fn check_rosparam_command(&self, command: &str) -> Result<(), SchemaError> {
        let has_file = self.attr("file").is_some();
        match command {
            "load" if !has_file && self.text.is_empty() => {
                Err(SchemaError::MissingAttr("file".into()))
            }
            "dump" if !has_file => Err(SchemaError::MissingAttr("file".into())),
            "delete" if self.attr("param").is_none() => {
                Err(SchemaError::MissingAttr("param".into()))
            }
            "delete" if has_file => Err(SchemaError::Incompatible("file".into(), "delete".into())),
            _ => Ok(()),
        }
    }

    fn attr_type(&self, attr: &str) -> Option<ValueType> {
        let schema = self.kind.schema();
        let conditions: &[(&str, ValueType)] = match self.kind {
            TagKind::Launch => &[],
            _ => CONDITION_ATTRS,
        };
        schema
            .attributes
            .iter()
            .chain(conditions)
            .find(|(name, _)| *name == attr)
            .map(|(_, ty)| *ty)
    }

    /// Resolve an attribute, falling back to `default` when it is absent.
    ///
    /// Returns `None` only if the attribute is absent and there is no default.
    pub fn resolve_attr(
        &self,
        attr: &str,
        ctx: &dyn SubstitutionContext,
        default: Option<&str>,
        no_empty: bool,
    ) -> Result<Option<SolverResult>, TagError> {
        let Some(text) = self.attr(attr).or(default) else {
            return Ok(None);
        };
        let var_type = self
            .attr_type(attr)
            .ok_or_else(|| SchemaError::UnknownAttr(attr.to_string()))?;
        let result = resolve_text(text, ctx, var_type)?;
        if let Some(value) = result.value() {
            let rendered = value.to_string();
            if no_empty && rendered.is_empty() {
                return Err(ValueError::EmptyValue(attr.to_string()).into());
            }
            let allowed = self
                .kind
                .schema()
                .enums
                .iter()
                .find(|(name, _)| *name == attr)
                .map(|(_, values)| *values);
            if let Some(values) = allowed {
                if !values.contains(&rendered.as_str()) {
                    return Err(ValueError::InvalidValue {
                        attr: attr.to_string(),
                        value: rendered,
                    }
                    .into());
                }
            }
        }
        Ok(Some(result))
    }

    fn resolve_req_attr(
        &self,
        attr: &str,
        ctx: &dyn SubstitutionContext,
        no_empty: bool,
    ) -> Result<SolverResult, TagError> {
        self.resolve_attr(attr, ctx, None, no_empty)?
            .ok_or_else(|| SchemaError::MissingAttr(attr.to_string()).into())
    }

    fn resolve_default(
        &self,
        attr: &str,
        ctx: &dyn SubstitutionContext,
        default: &str,
    ) -> Result<SolverResult, TagError> {
        self.resolve_req_attr_or(attr, ctx, default, false)
    }

    fn resolve_req_attr_or(
        &self,
        attr: &str,
        ctx: &dyn SubstitutionContext,
        default: &str,
        no_empty: bool,
    ) -> Result<SolverResult, TagError> {
        self.resolve_attr(attr, ctx, Some(default), no_empty)?
            .ok_or_else(|| SchemaError::MissingAttr(attr.to_string()).into())
    }

    /// `if`, with undeclared arguments left unknown
    pub fn resolve_if(&self, ctx: &dyn SubstitutionContext) -> Result<Option<SolverResult>, TagError> {
        self.resolve_attr("if", &UndeclaredArgsUnknown(ctx), None, false)
    }

    pub fn resolve_unless(
        &self,
        ctx: &dyn SubstitutionContext,
    ) -> Result<Option<SolverResult>, TagError> {
        self.resolve_attr("unless", &UndeclaredArgsUnknown(ctx), None, false)
    }

    /// `command` of a `<rosparam>`
    pub fn resolve_command(&self, ctx: &dyn SubstitutionContext) -> Result<SolverResult, TagError> {
        self.resolve_default("command", ctx, "load")
    }

    /// `clear_params`, checked against the attributes it depends on
    fn resolve_clear_params(&self, ctx: &dyn SubstitutionContext) -> Result<SolverResult, TagError> {
        let clear = self.resolve_default("clear_params", ctx, "false")?;
        if is_literal_true(&clear) {
            match self.kind {
                TagKind::Node | TagKind::Test => {
                    let name = match self.kind {
                        TagKind::Test => self.attr("name").or(self.attr("test-name")),
                        _ => self.attr("name"),
                    };
                    if name == Some("") {
                        return Err(ValueError::EmptyValue("name".into()).into());
                    }
                }
                _ => {
                    if self.attr("ns").is_none() {
                        return Err(SchemaError::MissingAttr("ns".into()).into());
                    }
                }
            }
        }
        Ok(clear)
    }

    fn resolve_positive(
        &self,
        attr: &str,
        ctx: &dyn SubstitutionContext,
        default: &str,
    ) -> Result<SolverResult, TagError> {
        let result = self.resolve_req_attr_or(attr, ctx, default, true)?;
        if let Some(x) = result.value().and_then(Literal::as_double) {
            if x <= 0.0 {
                return Err(ValueError::InvalidValue {
                    attr: attr.to_string(),
                    value: x.to_string(),
                }
                .into());
            }
        }
        Ok(result)
    }

    /// Resolve every attribute of this tag into its typed payload
    pub fn resolve(&self, ctx: &dyn SubstitutionContext) -> Result<TagPayload, TagError> {
        let opt = |attr: &str| self.resolve_attr(attr, ctx, None, false);
        let opt_non_empty = |attr: &str| self.resolve_attr(attr, ctx, None, true);
        Ok(match self.kind {
            TagKind::Launch => TagPayload::Launch,
            TagKind::Arg => TagPayload::Arg(ArgAttrs {
                name: self.resolve_req_attr("name", ctx, false)?,
                value: opt("value")?,
                default: opt("default")?,
                doc: opt("doc")?,
            }),
            TagKind::Node => TagPayload::Node(NodeAttrs {
                name: self.resolve_req_attr("name", ctx, false)?,
                pkg: self.resolve_req_attr("pkg", ctx, true)?,
                exe: self.resolve_req_attr("type", ctx, true)?,
                clear_params: self.resolve_clear_params(ctx)?,
                ns: opt_non_empty("ns")?,
                machine: opt("machine")?,
                required: self.resolve_default("required", ctx, "false")?,
                respawn: self.resolve_default("respawn", ctx, "false")?,
                respawn_delay: self.resolve_default("respawn_delay", ctx, "0.0")?,
                args: opt("args")?,
                output: self.resolve_default("output", ctx, "log")?,
                cwd: self.resolve_default("cwd", ctx, "ROS_HOME")?,
                launch_prefix: opt("launch-prefix")?,
            }),
            TagKind::Test => {
                let test_name = self.resolve_req_attr("test-name", ctx, false)?;
                let default_name = self.attr("test-name").unwrap_or_default();
                TagPayload::Test(TestAttrs {
                    test_name,
                    name: self.resolve_default("name", ctx, default_name)?,
                    pkg: self.resolve_req_attr("pkg", ctx, true)?,
                    exe: self.resolve_req_attr("type", ctx, true)?,
                    clear_params: self.resolve_clear_params(ctx)?,
                    ns: opt_non_empty("ns")?,
                    args: opt("args")?,
                    cwd: self.resolve_default("cwd", ctx, "ROS_HOME")?,
                    launch_prefix: opt("launch-prefix")?,
                    retry: self.resolve_default("retry", ctx, "0")?,
                    time_limit: self.resolve_positive("time-limit", ctx, "60.0")?,
                })
            }
            TagKind::Include => TagPayload::Include(IncludeAttrs {
                file: self.resolve_req_attr("file", ctx, false)?,
                ns: opt_non_empty("ns")?,
                clear_params: self.resolve_clear_params(ctx)?,
                pass_all_args: self.resolve_default("pass_all_args", ctx, "false")?,
            }),
            TagKind::Remap => TagPayload::Remap(RemapAttrs {
                from: self.resolve_req_attr("from", ctx, true)?,
                to: self.resolve_req_attr("to", ctx, true)?,
            }),
            TagKind::Param => {
                let source = if self.attr("value").is_some() {
                    ParamSource::Value(self.resolve_req_attr("value", ctx, false)?)
                } else if self.attr("textfile").is_some() {
                    ParamSource::TextFile(self.resolve_req_attr("textfile", ctx, true)?)
                } else if self.attr("binfile").is_some() {
                    ParamSource::BinFile(self.resolve_req_attr("binfile", ctx, true)?)
                } else {
                    ParamSource::Command(self.resolve_req_attr("command", ctx, true)?)
                };
                TagPayload::Param(ParamAttrs {
                    name: self.resolve_req_attr("name", ctx, false)?,
                    param_type: self.resolve_default("type", ctx, "auto")?,
                    source,
                })
            }
            TagKind::Rosparam => {
                let command = self.resolve_command(ctx)?;
                if let Some(Literal::String(cmd)) = command.value() {
                    self.check_rosparam_command(cmd)?;
                }
                TagPayload::Rosparam(RosparamAttrs {
                    command,
                    file: opt_non_empty("file")?,
                    param: opt("param")?,
                    ns: opt("ns")?,
                    subst_value: self.resolve_default("subst_value", ctx, "false")?,
                    text: self.text.clone(),
                })
            }
            TagKind::Group => TagPayload::Group(GroupAttrs {
                ns: opt_non_empty("ns")?,
                clear_params: self.resolve_clear_params(ctx)?,
            }),
            TagKind::Env => TagPayload::Env(EnvAttrs {
                name: self.resolve_req_attr("name", ctx, true)?,
                value: self.resolve_req_attr("value", ctx, false)?,
            }),
            TagKind::Machine => TagPayload::Machine(MachineAttrs {
                name: self.resolve_req_attr("name", ctx, false)?,
                address: self.resolve_req_attr("address", ctx, false)?,
                ssh_port: self.resolve_default("ssh-port", ctx, "22")?,
                env_loader: opt("env-loader")?,
                default: self.resolve_default("default", ctx, "false")?,
                user: opt("user")?,
                password: opt("password")?,
                timeout: self.resolve_positive("timeout", ctx, "10.0")?,
            }),
        })
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.kind)?;
        for (key, value) in &self.attributes {
            write!(f, " {}={:?}", key, value)?;
        }
        f.write_str(">")
    }
}

fn is_literal_true(result: &SolverResult) -> bool {
    result.value().and_then(Literal::as_bool) == Some(true)
}

/// Resolved attributes, one variant per tag kind
#[derive(Debug, Clone, PartialEq)]
pub enum TagPayload {
    Launch,
    Arg(ArgAttrs),
    Node(NodeAttrs),
    Test(TestAttrs),
    Include(IncludeAttrs),
    Remap(RemapAttrs),
    Param(ParamAttrs),
    Rosparam(RosparamAttrs),
    Group(GroupAttrs),
    Env(EnvAttrs),
    Machine(MachineAttrs),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArgAttrs {
    pub name: SolverResult,
    pub value: Option<SolverResult>,
    pub default: Option<SolverResult>,
    pub doc: Option<SolverResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeAttrs {
    pub name: SolverResult,
    pub pkg: SolverResult,
    pub exe: SolverResult,
    pub clear_params: SolverResult,
    pub ns: Option<SolverResult>,
    pub machine: Option<SolverResult>,
    pub required: SolverResult,
    pub respawn: SolverResult,
    pub respawn_delay: SolverResult,
    pub args: Option<SolverResult>,
    pub output: SolverResult,
    pub cwd: SolverResult,
    pub launch_prefix: Option<SolverResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestAttrs {
    pub test_name: SolverResult,
    pub name: SolverResult,
    pub pkg: SolverResult,
    pub exe: SolverResult,
    pub clear_params: SolverResult,
    pub ns: Option<SolverResult>,
    pub args: Option<SolverResult>,
    pub cwd: SolverResult,
    pub launch_prefix: Option<SolverResult>,
    pub retry: SolverResult,
    pub time_limit: SolverResult,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IncludeAttrs {
    pub file: SolverResult,
    pub ns: Option<SolverResult>,
    pub clear_params: SolverResult,
    pub pass_all_args: SolverResult,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemapAttrs {
    pub from: SolverResult,
    pub to: SolverResult,
}

/// Where a `<param>` takes its value from
#[derive(Debug, Clone, PartialEq)]
pub enum ParamSource {
    Value(SolverResult),
    TextFile(SolverResult),
    BinFile(SolverResult),
    Command(SolverResult),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamAttrs {
    pub name: SolverResult,
    pub param_type: SolverResult,
    pub source: ParamSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RosparamAttrs {
    pub command: SolverResult,
    pub file: Option<SolverResult>,
    pub param: Option<SolverResult>,
    pub ns: Option<SolverResult>,
    pub subst_value: SolverResult,
    /// Inline YAML, unstripped
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupAttrs {
    pub ns: Option<SolverResult>,
    pub clear_params: SolverResult,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnvAttrs {
    pub name: SolverResult,
    pub value: SolverResult,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MachineAttrs {
    pub name: SolverResult,
    pub address: SolverResult,
    pub ssh_port: SolverResult,
    pub env_loader: Option<SolverResult>,
    pub default: SolverResult,
    pub user: Option<SolverResult>,
    pub password: Option<SolverResult>,
    pub timeout: SolverResult,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ArgError;

    struct NoArgs;

    impl SubstitutionContext for NoArgs {
        fn get_arg(&self, name: &str) -> Result<Option<String>, ArgError> {
            match name {
                "free" => Ok(None),
                "yes" => Ok(Some("true".into())),
                _ => Err(ArgError::Undeclared(name.to_string())),
            }
        }
        fn get_env(&self, _name: &str) -> Option<String> {
            None
        }
        fn get_pkg_path(&self, _name: &str) -> Option<String> {
            None
        }
        fn get_anonymous_name(&self, name: &str) -> String {
            name.to_string()
        }
        fn dirpath(&self) -> String {
            "/".to_string()
        }
    }

    fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn node(pairs: &[(&str, &str)]) -> Result<Tag, SchemaError> {
        Tag::new(TagKind::Node, "", attrs(pairs), 1, 1)
    }

    #[test]
    fn test_required_attributes() {
        assert_eq!(
            node(&[("pkg", "p"), ("type", "t")]),
            Err(SchemaError::MissingAttr("name".into()))
        );
        assert_eq!(
            node(&[("pkg", "p"), ("type", "t"), ("name", "")]),
            Err(SchemaError::MissingAttr("name".into()))
        );
        assert!(node(&[("pkg", "p"), ("type", "t"), ("name", "n")]).is_ok());
    }

    #[test]
    fn test_unknown_attribute() {
        assert_eq!(
            node(&[("pkg", "p"), ("type", "t"), ("name", "n"), ("color", "red")]),
            Err(SchemaError::UnknownAttr("color".into()))
        );
        assert_eq!(
            Tag::new(TagKind::Launch, "", attrs(&[("if", "true")]), 1, 1),
            Err(SchemaError::UnknownAttr("if".into()))
        );
    }

    #[test]
    fn test_if_and_unless() {
        assert_eq!(
            Tag::new(TagKind::Group, "", attrs(&[("if", "1"), ("unless", "0")]), 1, 1),
            Err(SchemaError::BothIfUnless)
        );
    }

    #[test]
    fn test_children() {
        let mut launch = Tag::new(TagKind::Launch, "", BTreeMap::new(), 1, 1).unwrap();
        let mut n = node(&[("pkg", "p"), ("type", "t"), ("name", "n")]).unwrap();
        let group = Tag::new(TagKind::Group, "", BTreeMap::new(), 2, 1).unwrap();
        assert_eq!(
            n.append(group.clone()),
            Err(SchemaError::InvalidChild {
                child: "group".into(),
                parent: "node".into()
            })
        );
        let remap = Tag::new(TagKind::Remap, "", attrs(&[("from", "a"), ("to", "b")]), 3, 1)
            .unwrap();
        assert!(n.append(remap).is_ok());
        assert!(launch.append(n).is_ok());
        assert!(launch.append(group).is_ok());
        assert!(launch.check_schema().is_ok());
    }

    #[test]
    fn test_param_sources_are_exclusive() {
        assert_eq!(
            Tag::new(TagKind::Param, "", attrs(&[("name", "p")]), 1, 1),
            Err(SchemaError::MissingAttr("value".into()))
        );
        assert!(matches!(
            Tag::new(
                TagKind::Param,
                "",
                attrs(&[("name", "p"), ("value", "1"), ("command", "ls")]),
                1,
                1
            ),
            Err(SchemaError::Incompatible(..))
        ));
    }

    #[test]
    fn test_rosparam_commands() {
        assert_eq!(
            Tag::new(TagKind::Rosparam, "", BTreeMap::new(), 1, 1),
            Err(SchemaError::MissingAttr("file".into()))
        );
        assert!(Tag::new(TagKind::Rosparam, "a: 1", BTreeMap::new(), 1, 1).is_ok());
        assert_eq!(
            Tag::new(TagKind::Rosparam, "", attrs(&[("command", "delete")]), 1, 1),
            Err(SchemaError::MissingAttr("param".into()))
        );
        assert!(matches!(
            Tag::new(
                TagKind::Rosparam,
                "",
                attrs(&[("command", "delete"), ("param", "x"), ("file", "f")]),
                1,
                1
            ),
            Err(SchemaError::Incompatible(..))
        ));
    }

    #[test]
    fn test_resolve_node_defaults() {
        let tag = node(&[("pkg", "p"), ("type", "t"), ("name", "n")]).unwrap();
        let TagPayload::Node(attrs) = tag.resolve(&NoArgs).unwrap() else {
            panic!("expected node payload");
        };
        assert_eq!(attrs.respawn, SolverResult::bool(false));
        assert_eq!(attrs.required, SolverResult::bool(false));
        assert_eq!(attrs.respawn_delay, SolverResult::double(0.0));
        assert_eq!(attrs.output, SolverResult::string("log"));
        assert_eq!(attrs.cwd, SolverResult::string("ROS_HOME"));
        assert!(attrs.ns.is_none());
    }

    #[test]
    fn test_resolve_enum_violation() {
        let tag = node(&[("pkg", "p"), ("type", "t"), ("name", "n"), ("output", "file")]).unwrap();
        assert!(matches!(
            tag.resolve(&NoArgs),
            Err(TagError::Value(ValueError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_resolve_clear_params_needs_ns() {
        let tag = Tag::new(TagKind::Group, "", attrs(&[("clear_params", "true")]), 1, 1).unwrap();
        assert!(matches!(
            tag.resolve(&NoArgs),
            Err(TagError::Schema(SchemaError::MissingAttr(ref a))) if a == "ns"
        ));
    }

    #[test]
    fn test_resolve_condition() {
        let tag = Tag::new(TagKind::Group, "", attrs(&[("if", "$(arg yes)")]), 1, 1).unwrap();
        assert_eq!(tag.resolve_if(&NoArgs).unwrap(), Some(SolverResult::bool(true)));
        assert_eq!(tag.resolve_unless(&NoArgs).unwrap(), None);

        let tag = Tag::new(TagKind::Group, "", attrs(&[("unless", "$(arg free)")]), 1, 1).unwrap();
        let unless = tag.resolve_unless(&NoArgs).unwrap().unwrap();
        assert!(!unless.is_resolved());

        let tag = Tag::new(TagKind::Group, "", attrs(&[("if", "$(arg missing)")]), 1, 1).unwrap();
        let cond = tag.resolve_if(&NoArgs).unwrap().unwrap();
        assert_eq!(cond.unknown_text(), "$(arg missing)");
        let tag = Tag::new(TagKind::Group, "", attrs(&[("ns", "$(arg missing)")]), 1, 1).unwrap();
        assert!(matches!(
            tag.resolve(&NoArgs),
            Err(TagError::Arg(ArgError::Undeclared(ref n))) if n == "missing"
        ));
    }

    #[test]
    fn test_machine_timeout_must_be_positive() {
        let tag = Tag::new(
            TagKind::Machine,
            "",
            attrs(&[("name", "m"), ("address", "h"), ("timeout", "0")]),
            1,
            1,
        )
        .unwrap();
        assert!(matches!(
            tag.resolve(&NoArgs),
            Err(TagError::Value(ValueError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_display() {
        let tag = Tag::new(TagKind::Remap, "", attrs(&[("from", "a"), ("to", "b")]), 1, 1).unwrap();
        assert_eq!(tag.to_string(), r#"<remap from="a" to="b">"#);
    }
}
