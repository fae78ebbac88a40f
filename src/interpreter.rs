//! Launch interpreter
//!
//! Walks a launch tree element by element, resolving substitutions
//! against the current [`LaunchScope`] and recording every process,
//! parameter, machine and parameter-store command it meets, each under the
//! condition that decides whether it exists.
//!
//! Conditions that cannot be decided statically become fresh logic
//! variables. Elements whose condition is statically false are skipped
//! unless [`InterpreterOptions::include_absent`] is set.

use std::collections::BTreeMap;
use std::mem;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_yaml_ng::{Mapping, Value as YamlValue};
use tracing::{debug, trace};

use crate::analysis::LaunchData;
use crate::error::{LaunchError, LaunchResult, SchemaError, TagError, ValueError};
use crate::logic::{LogicValue, LogicVariable, NamingContext, VariableData};
use crate::models::{ArgLedger, LaunchModel, ParamStoreCommand, ProcessRole};
use crate::names::RosName;
use crate::scope::{AnonymousCounter, LaunchScope, MachineDecl, ProcessDecl};
use crate::subst::{resolve_text, SubstitutionContext};
use crate::system::SystemInterface;
use crate::tree::{
    ArgAttrs, EnvAttrs, GroupAttrs, IncludeAttrs, MachineAttrs, NodeAttrs, ParamAttrs,
    ParamSource, RemapAttrs, RosparamAttrs, Tag, TagKind, TagPayload, TestAttrs,
};
use crate::values::{
    convert_value, ConditionStatement, Literal, ScopeCondition, SolverResult, SourceLocation,
    ValueType,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterpreterOptions {
    /// Keep elements whose condition is statically false
    pub include_absent: bool,
}

/// Model sizes before a file was interpreted
struct Checkpoint {
    rosparam_cmds: usize,
    nodes: usize,
    parameters: usize,
    machines: usize,
    cmd_line_args: usize,
    included_files: usize,
}

impl Checkpoint {
    fn of(model: &LaunchModel) -> Self {
        Self {
            rosparam_cmds: model.rosparam_cmds.len(),
            nodes: model.nodes.len(),
            parameters: model.parameters.len(),
            machines: model.machines.len(),
            cmd_line_args: model.cmd_line_args.len(),
            included_files: model.included_files.len(),
        }
    }

    fn restore(&self, model: &mut LaunchModel) {
        model.rosparam_cmds.truncate(self.rosparam_cmds);
        model.nodes.truncate(self.nodes);
        model.parameters.truncate(self.parameters);
        model.machines.truncate(self.machines);
        model.cmd_line_args.truncate(self.cmd_line_args);
        model.included_files.truncate(self.included_files);
    }
}

pub struct LaunchInterpreter<'a> {
    iface: &'a dyn SystemInterface,
    options: InterpreterOptions,
    naming: NamingContext,
    anonymous: AnonymousCounter,
    model: LaunchModel,
}

impl<'a> LaunchInterpreter<'a> {
    pub fn new(iface: &'a dyn SystemInterface, options: InterpreterOptions) -> Self {
        Self::with_naming(iface, options, NamingContext::new())
    }

    /// Continue issuing variable names from `naming`
    pub fn with_naming(
        iface: &'a dyn SystemInterface,
        options: InterpreterOptions,
        naming: NamingContext,
    ) -> Self {
        Self {
            iface,
            options,
            naming,
            anonymous: AnonymousCounter::default(),
            model: LaunchModel::default(),
        }
    }

    pub fn options(&self) -> InterpreterOptions {
        self.options
    }

    pub fn model(&self) -> &LaunchModel {
        &self.model
    }

    pub fn into_model(self) -> LaunchModel {
        self.model
    }

    pub fn naming(&self) -> &NamingContext {
        &self.naming
    }

    pub fn naming_mut(&mut self) -> &mut NamingContext {
        &mut self.naming
    }

    /// Interpret a top-level launch file with command-line `args`.
    ///
    /// On failure the model is left as it was before the call.
    pub fn interpret(
        &mut self,
        path: impl AsRef<Path>,
        args: &BTreeMap<String, String>,
    ) -> LaunchResult<()> {
        let path = path.as_ref();
        let checkpoint = Checkpoint::of(&self.model);
        let result = self.interpret_file(path, args);
        if result.is_err() {
            checkpoint.restore(&mut self.model);
        }
        result
    }

    fn interpret_file(
        &mut self,
        path: &Path,
        args: &BTreeMap<String, String>,
    ) -> LaunchResult<()> {
        debug!("interpreting {}", path.display());
        let tree = self.launch_tree(path)?;
        let mut scope =
            LaunchScope::with_counter(path, self.iface, args, Rc::clone(&self.anonymous));
        self.model.cmd_line_args.push(ArgLedger::new(path));
        self.interpret_tree(&tree, &mut scope)?;
        self.model.machines.extend(scope.machines());
        Ok(())
    }

    /// Parse tree of `path`, rooted at a schema-valid `<launch>`
    fn launch_tree(&self, path: &Path) -> LaunchResult<Rc<Tag>> {
        let tree = self.iface.request_parse_tree(path)?;
        if tree.kind != TagKind::Launch {
            return Err(LaunchError::InvalidRoot {
                file: path.to_path_buf(),
                tag: tree.kind.to_string(),
            });
        }
        tree.check_schema().map_err(|source| LaunchError::Schema {
            file: path.to_path_buf(),
            tag: tree.kind.as_str(),
            line: tree.line,
            column: tree.column,
            source,
        })?;
        Ok(tree)
    }

    /// Interpret several top-level files into the same model.
    ///
    /// A failing file does not stop the others; its error is returned.
    pub fn interpret_many<P: AsRef<Path>>(
        &mut self,
        paths: impl IntoIterator<Item = P>,
        args: &BTreeMap<String, String>,
    ) -> Vec<LaunchError> {
        paths
            .into_iter()
            .filter_map(|path| self.interpret(path, args).err())
            .collect()
    }

    /// Interpret each file into a model of its own. Variable and anonymous
    /// names stay unique across all of them.
    pub fn interpret_each<P: AsRef<Path>>(
        &mut self,
        paths: impl IntoIterator<Item = P>,
        args: &BTreeMap<String, String>,
    ) -> Vec<(PathBuf, LaunchResult<LaunchModel>)> {
        paths
            .into_iter()
            .map(|path| {
                let path = path.as_ref().to_path_buf();
                let previous = mem::take(&mut self.model);
                let result = self.interpret(&path, args);
                let model = mem::replace(&mut self.model, previous);
                (path, result.map(|()| model))
            })
            .collect()
    }

    /// Models of the files that could be interpreted, keyed by path
    pub fn interpret_data<P: AsRef<Path>>(
        &mut self,
        paths: impl IntoIterator<Item = P>,
        args: &BTreeMap<String, String>,
    ) -> (LaunchData, Vec<LaunchError>) {
        let mut data = LaunchData::new();
        let mut errors = Vec::new();
        for (path, result) in self.interpret_each(paths, args) {
            match result {
                Ok(model) => {
                    data.insert(path.display().to_string(), model);
                }
                Err(err) => errors.push(err),
            }
        }
        (data, errors)
    }

    fn interpret_tree(&mut self, tree: &Tag, scope: &mut LaunchScope<'a>) -> LaunchResult<()> {
        for tag in &tree.children {
            self.interpret_tag(tag, scope)
                .map_err(|err| fail(tag, scope, err))?;
        }
        self.model.parameters.extend(scope.take_params());
        Ok(())
    }

    fn interpret_tag(&mut self, tag: &Tag, scope: &mut LaunchScope<'a>) -> Result<(), TagError> {
        tag.check_schema()?;
        let condition = self.resolve_condition(tag, scope)?;
        if condition.is_false() && (!self.options.include_absent || leaves_no_trace(tag, scope)?) {
            trace!("skipping {} at {}:{}", tag, tag.line, tag.column);
            return Ok(());
        }
        match tag.resolve(&*scope)? {
            TagPayload::Arg(attrs) => self.arg_tag(scope, condition, attrs),
            TagPayload::Node(attrs) => self.node_tag(tag, scope, condition, attrs),
            TagPayload::Test(attrs) => self.test_tag(tag, scope, condition, attrs),
            TagPayload::Remap(attrs) => remap_tag(scope, condition, attrs),
            TagPayload::Param(attrs) => self.param_tag(tag, scope, condition, attrs),
            TagPayload::Rosparam(attrs) => self.rosparam_tag(tag, scope, condition, attrs),
            TagPayload::Include(attrs) => self.include_tag(tag, scope, condition, attrs),
            TagPayload::Group(attrs) => self.group_tag(tag, scope, condition, attrs),
            TagPayload::Env(attrs) => env_tag(scope, condition, attrs),
            TagPayload::Machine(attrs) => machine_tag(scope, attrs),
            TagPayload::Launch => Err(SchemaError::InvalidChild {
                child: tag.kind.to_string(),
                parent: scope.kind_name().to_string(),
            }
            .into()),
        }
    }

    /// `if` wins over `unless`; a partial value becomes a fresh variable
    fn resolve_condition(
        &mut self,
        tag: &Tag,
        scope: &LaunchScope<'a>,
    ) -> Result<LogicValue, TagError> {
        let (statement, value) = match (tag.resolve_if(scope)?, tag.resolve_unless(scope)?) {
            (Some(value), _) => (ConditionStatement::If, value),
            (None, Some(value)) => (ConditionStatement::Unless, value),
            (None, None) => return Ok(LogicValue::True),
        };
        if value.is_resolved() {
            let present = literal_bool(&value)? == (statement == ConditionStatement::If);
            return Ok(LogicValue::from(present));
        }
        let text = value.to_string();
        let condition = ScopeCondition {
            statement,
            value,
            location: Some(location(scope, tag)),
        };
        let variable = LogicVariable::fresh(
            &mut self.naming,
            text,
            VariableData::Condition(Box::new(condition)),
        );
        Ok(variable.into())
    }

    fn current_ledger(&mut self) -> Option<&mut ArgLedger> {
        self.model.cmd_line_args.last_mut()
    }

    fn arg_tag(
        &mut self,
        scope: &mut LaunchScope<'a>,
        condition: LogicValue,
        attrs: ArgAttrs,
    ) -> Result<(), TagError> {
        if condition.is_false() {
            return Ok(());
        }
        if !condition.is_true() {
            return Err(conditional_error(TagKind::Arg, &condition));
        }
        let name = literal(&attrs.name)?;
        match attrs.value {
            None => {
                let filepath = scope.filepath().to_path_buf();
                if let Some(ledger) = self.current_ledger().filter(|l| l.file == filepath) {
                    ledger.args.insert(name.clone(), attrs.default.clone());
                }
                let default = attrs.default.as_ref().and_then(literal_or_none);
                scope.declare_arg(&name, default)
            }
            Some(value) => scope.set_arg(&name, literal_or_none(&value)),
        }
    }

    fn node_tag(
        &mut self,
        tag: &Tag,
        scope: &mut LaunchScope<'a>,
        condition: LogicValue,
        attrs: NodeAttrs,
    ) -> Result<(), TagError> {
        let executable = literal(&attrs.exe)?;
        let clear = literal_bool(&attrs.clear_params)?;
        let name = process_name(scope, &attrs.name, &executable, clear)?;
        if is_literal_true(&attrs.required) && is_literal_true(&attrs.respawn) {
            return Err(SchemaError::Incompatible("required".into(), "respawn".into()).into());
        }
        let decl = ProcessDecl {
            name,
            ns: rosname_string(attrs.ns.as_ref()),
            package: literal(&attrs.pkg)?,
            executable,
            condition,
            location: Some(location(scope, tag)),
            args: attrs.args,
            output: Some(attrs.output),
            working_dir: Some(attrs.cwd),
            launch_prefix: attrs.launch_prefix,
            role: ProcessRole::Node {
                machine: attrs.machine,
                required: attrs.required,
                respawn: attrs.respawn,
                respawn_delay: attrs.respawn_delay,
            },
        };
        let child = scope.new_process(decl)?;
        self.process_scope(tag, child, clear)
    }

    fn test_tag(
        &mut self,
        tag: &Tag,
        scope: &mut LaunchScope<'a>,
        condition: LogicValue,
        attrs: TestAttrs,
    ) -> Result<(), TagError> {
        let test_name = literal(&attrs.test_name)?;
        let executable = literal(&attrs.exe)?;
        let clear = literal_bool(&attrs.clear_params)?;
        let name = process_name(scope, &attrs.name, &executable, clear)?;
        let decl = ProcessDecl {
            name,
            ns: rosname_string(attrs.ns.as_ref()),
            package: literal(&attrs.pkg)?,
            executable,
            condition,
            location: Some(location(scope, tag)),
            args: attrs.args,
            output: None,
            working_dir: Some(attrs.cwd),
            launch_prefix: attrs.launch_prefix,
            role: ProcessRole::Test {
                test_name,
                retries: attrs.retry,
                time_limit: attrs.time_limit,
            },
        };
        let child = scope.new_process(decl)?;
        self.process_scope(tag, child, clear)
    }

    fn process_scope(
        &mut self,
        tag: &Tag,
        mut child: LaunchScope<'a>,
        clear: bool,
    ) -> Result<(), TagError> {
        if clear {
            let ns = child.private_ns().to_string();
            self.clear_params(ns);
        }
        self.interpret_tree(tag, &mut child)?;
        if let Some(entity) = child.into_process() {
            self.model.nodes.push(entity);
        }
        Ok(())
    }

    fn param_tag(
        &mut self,
        tag: &Tag,
        scope: &mut LaunchScope<'a>,
        condition: LogicValue,
        attrs: ParamAttrs,
    ) -> Result<(), TagError> {
        let name = rosname_string(Some(&attrs.name));
        let param_type: ValueType = literal(&attrs.param_type)?.parse()?;
        let value = match attrs.source {
            ParamSource::Value(value) => value,
            ParamSource::TextFile(path) => self.read_text_file(path),
            ParamSource::BinFile(path) => self.read_binary_file(path),
            ParamSource::Command(cmd) => self.run_command(cmd),
        };
        let value = match value.value() {
            Some(literal) => {
                SolverResult::resolved(convert_value(&literal.to_string(), param_type)?, param_type)?
            }
            None => value.with_type(param_type)?,
        };
        let location = location(scope, tag);
        scope.set_param(&name, value, param_type, condition, "", Some(location))
    }

    fn read_text_file(&self, path: SolverResult) -> SolverResult {
        let Some(file) = path.value().map(Literal::to_string) else {
            return path;
        };
        match self.iface.read_text_file(Path::new(&file)) {
            Ok(text) => SolverResult::string(text),
            Err(err) => {
                debug!("cannot read {}: {}", file, err);
                SolverResult::unresolved_file_contents(&file)
            }
        }
    }

    fn read_binary_file(&self, path: SolverResult) -> SolverResult {
        let Some(file) = path.value().map(Literal::to_string) else {
            return path;
        };
        match self.iface.read_binary_file(Path::new(&file)) {
            Ok(bytes) => SolverResult::string(String::from_utf8_lossy(&bytes)),
            Err(err) => {
                debug!("cannot read {}: {}", file, err);
                SolverResult::unresolved_file_contents(&file)
            }
        }
    }

    fn run_command(&self, cmd: SolverResult) -> SolverResult {
        let Some(command) = cmd.value().map(Literal::to_string) else {
            return cmd;
        };
        match self.iface.execute_command(&command) {
            Ok(output) => SolverResult::string(output),
            Err(err) => {
                debug!("cannot run '{}': {}", command, err);
                SolverResult::unresolved_command_line(&command)
            }
        }
    }

    fn rosparam_tag(
        &mut self,
        tag: &Tag,
        scope: &mut LaunchScope<'a>,
        condition: LogicValue,
        attrs: RosparamAttrs,
    ) -> Result<(), TagError> {
        let command = literal(&attrs.command)?;
        match command.as_str() {
            "load" => self.rosparam_load(tag, scope, condition, attrs),
            "delete" => {
                if condition.is_false() {
                    return Ok(());
                }
                if !condition.is_true() {
                    return Err(conditional_error(TagKind::Rosparam, &condition));
                }
                self.model.rosparam_cmds.push(ParamStoreCommand::Delete {
                    ns: rosname_string(attrs.ns.as_ref()),
                    param: rosname_string(attrs.param.as_ref()),
                });
                Ok(())
            }
            _ => {
                if condition.is_false() {
                    return Ok(());
                }
                if !condition.is_true() {
                    return Err(conditional_error(TagKind::Rosparam, &condition));
                }
                let file = attrs
                    .file
                    .as_ref()
                    .ok_or_else(|| SchemaError::MissingAttr("file".into()))?;
                self.model.rosparam_cmds.push(ParamStoreCommand::Dump {
                    filepath: literal(file)?,
                    ns: rosname_string(attrs.ns.as_ref()),
                    param: rosname_string(attrs.param.as_ref()),
                });
                Ok(())
            }
        }
    }

    fn rosparam_load(
        &mut self,
        tag: &Tag,
        scope: &mut LaunchScope<'a>,
        condition: LogicValue,
        attrs: RosparamAttrs,
    ) -> Result<(), TagError> {
        let yaml_text = match &attrs.file {
            None => Ok(attrs.text.clone()),
            Some(file) => match file.value().map(Literal::to_string) {
                Some(path) => self.iface.read_text_file(Path::new(&path)).map_err(|err| {
                    debug!("cannot read {}: {}", path, err);
                    SolverResult::unresolved_file_contents(&path)
                }),
                None => Err(file.clone()),
            },
        };
        let value = match yaml_text {
            Err(unknown) => unknown.with_type(ValueType::Yaml)?,
            Ok(text) => yaml_value(&text, scope, &attrs.subst_value)?,
        };

        let ns = rosname_string(attrs.ns.as_ref());
        let param = rosname_string(attrs.param.as_ref());
        let is_mapping = matches!(value.value(), Some(Literal::Yaml(YamlValue::Mapping(_))));
        if value.is_resolved() && param.is_empty() && !is_mapping {
            return Err(SchemaError::MissingAttr("param".into()).into());
        }
        let location = location(scope, tag);
        scope.set_param(&param, value, ValueType::Yaml, condition, &ns, Some(location))
    }

    fn include_tag(
        &mut self,
        tag: &Tag,
        scope: &mut LaunchScope<'a>,
        condition: LogicValue,
        attrs: IncludeAttrs,
    ) -> Result<(), TagError> {
        let file = literal(&attrs.file)?;
        let pass_all_args = literal_bool(&attrs.pass_all_args)?;
        let clear = literal_bool(&attrs.clear_params)?;
        let ns = rosname_string(attrs.ns.as_ref());
        let mut include = scope.new_include(&file, &ns, condition, pass_all_args)?;
        if clear {
            self.clear_params(include.ns().full().to_string());
        }
        self.interpret_tree(tag, &mut include)?;

        let mut launch = include.into_launch()?;
        let path = launch.filepath().to_path_buf();
        debug!("including {}", path.display());
        self.model.included_files.push(path.clone());
        let tree = self.launch_tree(&path)?;
        self.interpret_tree(&tree, &mut launch)?;
        Ok(())
    }

    fn group_tag(
        &mut self,
        tag: &Tag,
        scope: &mut LaunchScope<'a>,
        condition: LogicValue,
        attrs: GroupAttrs,
    ) -> Result<(), TagError> {
        let clear = literal_bool(&attrs.clear_params)?;
        let ns = rosname_string(attrs.ns.as_ref());
        let mut group = scope.new_group(&ns, condition)?;
        if clear {
            self.clear_params(group.ns().full().to_string());
        }
        self.interpret_tree(tag, &mut group)?;
        Ok(())
    }

    fn clear_params(&mut self, ns: String) {
        self.model.rosparam_cmds.push(ParamStoreCommand::Delete {
            ns,
            param: String::new(),
        });
    }
}

/// Elements that record nothing when absent, so their attributes are
/// never resolved.
fn leaves_no_trace(tag: &Tag, scope: &LaunchScope<'_>) -> Result<bool, TagError> {
    Ok(match tag.kind {
        TagKind::Arg | TagKind::Remap | TagKind::Env => true,
        TagKind::Rosparam => literal(&tag.resolve_command(scope)?)? != "load",
        _ => false,
    })
}

fn remap_tag(
    scope: &mut LaunchScope<'_>,
    condition: LogicValue,
    attrs: RemapAttrs,
) -> Result<(), TagError> {
    if condition.is_false() {
        return Ok(());
    }
    let from = rosname_string(Some(&attrs.from));
    let to = rosname_string(Some(&attrs.to));
    scope.set_remap(&from, &to, condition)
}

fn env_tag(
    scope: &mut LaunchScope<'_>,
    condition: LogicValue,
    attrs: EnvAttrs,
) -> Result<(), TagError> {
    if condition.is_false() {
        return Ok(());
    }
    let name = literal(&attrs.name)?;
    scope.set_env(&name, attrs.value, condition);
    Ok(())
}

fn machine_tag(scope: &mut LaunchScope<'_>, attrs: MachineAttrs) -> Result<(), TagError> {
    let default = literal(&attrs.default)?.to_lowercase();
    let (is_default, is_assignable) = if default == "never" {
        (false, false)
    } else {
        let is_default = matches!(convert_value(&default, ValueType::Bool)?, Literal::Bool(true));
        (is_default, true)
    };
    scope.add_machine(MachineDecl {
        name: literal(&attrs.name)?,
        address: literal(&attrs.address)?,
        is_default,
        is_assignable,
        env_loader: attrs.env_loader,
        ssh_port: attrs.ssh_port,
        user: attrs.user,
        password: attrs.password,
        timeout: attrs.timeout,
    })
}

/// Name of a node or test; anonymous if it resolved to nothing
fn process_name(
    scope: &LaunchScope<'_>,
    name: &SolverResult,
    executable: &str,
    clear: bool,
) -> Result<String, TagError> {
    let name = rosname_string(Some(name));
    if !name.is_empty() {
        return Ok(name);
    }
    if clear {
        return Err(ValueError::EmptyValue("name".into()).into());
    }
    Ok(scope.get_anonymous_name(executable))
}

/// Attach file and element context, except to errors that already carry
/// the context of an included file
fn fail(tag: &Tag, scope: &LaunchScope<'_>, err: TagError) -> LaunchError {
    match err {
        TagError::Nested(inner) if has_context(&inner) => *inner,
        source => LaunchError::Interpretation {
            file: scope.filepath().to_path_buf(),
            tag: tag.kind.as_str(),
            line: tag.line,
            column: tag.column,
            source,
        },
    }
}

fn has_context(err: &LaunchError) -> bool {
    !matches!(err, LaunchError::Io(_) | LaunchError::AccessDenied { .. })
}

fn location(scope: &LaunchScope<'_>, tag: &Tag) -> SourceLocation {
    SourceLocation {
        package: None,
        filepath: scope.filepath().display().to_string(),
        line: tag.line,
        column: tag.column,
    }
}

fn conditional_error(kind: TagKind, condition: &LogicValue) -> TagError {
    let unknown = match condition {
        LogicValue::Variable(LogicVariable {
            data: VariableData::Condition(cond),
            ..
        }) => cond.value.unknown_text(),
        other => other.to_string(),
    };
    TagError::conditional_tag(kind.as_str(), &unknown)
}

/// `<rosparam>` content, substituted first if `subst_value` is set
fn yaml_value(
    text: &str,
    scope: &LaunchScope<'_>,
    subst_value: &SolverResult,
) -> Result<SolverResult, TagError> {
    if literal_bool(subst_value)? {
        let value = resolve_text(text, scope, ValueType::Yaml)?;
        return Ok(match value.value() {
            Some(Literal::Yaml(YamlValue::Null)) => empty_yaml(),
            _ => value,
        });
    }
    Ok(match convert_value(text, ValueType::Yaml)? {
        Literal::Yaml(YamlValue::Null) => empty_yaml(),
        Literal::Yaml(yaml) => SolverResult::yaml(yaml),
        other => SolverResult::resolved(other, ValueType::Yaml)?,
    })
}

fn empty_yaml() -> SolverResult {
    SolverResult::yaml(YamlValue::Mapping(Mapping::new()))
}

fn literal(result: &SolverResult) -> Result<String, TagError> {
    result
        .value()
        .map(Literal::to_string)
        .ok_or_else(|| TagError::cannot_resolve(&result.unknown_text()))
}

fn literal_bool(result: &SolverResult) -> Result<bool, TagError> {
    match result.value() {
        Some(value) => value.as_bool().ok_or_else(|| {
            ValueError::Conversion {
                value: value.to_string(),
                expected: "bool".into(),
            }
            .into()
        }),
        None => Err(TagError::cannot_resolve(&result.unknown_text())),
    }
}

fn literal_or_none(result: &SolverResult) -> Option<String> {
    result.value().map(Literal::to_string)
}

fn is_literal_true(result: &SolverResult) -> bool {
    result.value().and_then(Literal::as_bool) == Some(true)
}

/// Render a possibly partial name, unknown parts collapsed into one `*`
fn rosname_string(result: Option<&SolverResult>) -> String {
    let Some(result) = result else {
        return String::new();
    };
    let wildcard = RosName::WILDCARD;
    let double = wildcard.repeat(2);
    let mut name = result.as_string(Some(wildcard));
    while name.contains(&double) {
        name = name.replace(&double, wildcard);
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::MemorySystem;
    use crate::values::{Fragment, UnknownValue};
    use std::io;

    /// Serves one hand-built tree for every path
    struct BuiltTree {
        tree: Rc<Tag>,
        inner: MemorySystem,
    }

    impl SystemInterface for BuiltTree {
        fn ros_distro(&self) -> String {
            self.inner.ros_distro()
        }
        fn get_environment_variable(&self, name: &str) -> Option<String> {
            self.inner.get_environment_variable(name)
        }
        fn get_package_path(&self, name: &str) -> Option<PathBuf> {
            self.inner.get_package_path(name)
        }
        fn request_parse_tree(&self, _path: &Path) -> LaunchResult<Rc<Tag>> {
            Ok(Rc::clone(&self.tree))
        }
        fn read_text_file(&self, path: &Path) -> io::Result<String> {
            self.inner.read_text_file(path)
        }
        fn read_binary_file(&self, path: &Path) -> io::Result<Vec<u8>> {
            self.inner.read_binary_file(path)
        }
        fn execute_command(&self, cmd: &str) -> io::Result<String> {
            self.inner.execute_command(cmd)
        }
    }

    #[test]
    fn test_root_schema_checked_before_interpreting() {
        let mut root = Tag::new(TagKind::Launch, "", BTreeMap::new(), 1, 1).unwrap();
        let node = [("pkg", "p"), ("type", "t"), ("name", "n")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        root.children.push(Tag::new(TagKind::Node, "", node, 2, 1).unwrap());
        let nested = Tag::new(TagKind::Launch, "", BTreeMap::new(), 3, 1).unwrap();
        root.children.push(nested);
        let system = BuiltTree {
            tree: Rc::new(root),
            inner: MemorySystem::new(),
        };

        let mut interpreter = LaunchInterpreter::new(&system, InterpreterOptions::default());
        let err = interpreter
            .interpret("/ws/bad.launch", &BTreeMap::new())
            .unwrap_err();
        assert!(matches!(
            err,
            LaunchError::Schema {
                tag: "launch",
                line: 1,
                source: SchemaError::InvalidChild { .. },
                ..
            }
        ));
        assert!(interpreter.model().nodes.is_empty());
    }

    #[test]
    fn test_rosname_string_collapses_wildcards() {
        let partial = SolverResult::unresolved(
            vec![
                Fragment::from("/robot_"),
                Fragment::from(UnknownValue::new("arg", vec!["a".into()], "$(arg a)")),
                Fragment::from(UnknownValue::new("arg", vec!["b".into()], "$(arg b)")),
                Fragment::from("/cam"),
            ],
            ValueType::String,
        )
        .unwrap();
        assert_eq!(rosname_string(Some(&partial)), "/robot_*/cam");
        assert_eq!(rosname_string(None), "");
        assert_eq!(rosname_string(Some(&SolverResult::string("n"))), "n");
    }

    #[test]
    fn test_literal_helpers() {
        assert_eq!(literal(&SolverResult::int(3)).unwrap(), "3");
        assert!(literal_bool(&SolverResult::bool(true)).unwrap());
        assert!(matches!(
            literal_bool(&SolverResult::string("maybe")),
            Err(TagError::Value(ValueError::Conversion { .. }))
        ));
        let unknown = SolverResult::unresolved_command_line("ls");
        assert!(matches!(literal(&unknown), Err(TagError::Sanity(_))));
        assert_eq!(literal_or_none(&unknown), None);
        assert!(is_literal_true(&SolverResult::bool(true)));
        assert!(!is_literal_true(&unknown));
    }
}
