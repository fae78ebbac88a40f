//! Interpretation scopes
//!
//! A scope holds what an element can see and change while it is being
//! interpreted: arguments, namespace, remaps, environment and the
//! parameters declared so far. Scopes nest the way `<launch>`, `<group>`,
//! `<node>`/`<test>` and `<include>` elements nest, and a child scope
//! starts from a copy of its parent's state.
//!
//! Machines, the default machine and anonymous names are shared by every
//! scope descending from the same top-level file.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::mem;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_yaml_ng::{Mapping, Value as YamlValue};
use tracing::trace;

use crate::error::{ArgError, MachineError, SchemaError, TagError, ValueError};
use crate::logic::LogicValue;
use crate::models::{Machine, Parameter, ProcessEntity, ProcessRole};
use crate::names::RosName;
use crate::subst::SubstitutionContext;
use crate::system::SystemInterface;
use crate::values::{Literal, SolverResult, SourceLocation, ValueType, VariantMap};

/// Private namespace of parameters declared outside of any node
const LAUNCH_PRIVATE_NS: &str = "/roslaunch";

/// Counter for anonymous names, shared across a session
pub type AnonymousCounter = Rc<Cell<u64>>;

/// State shared by all scopes of one top-level file
#[derive(Debug, Default)]
struct Registry {
    anonymous: RefCell<BTreeMap<String, String>>,
    counter: AnonymousCounter,
    machines: RefCell<BTreeMap<String, Machine>>,
    default_machine: RefCell<Option<String>>,
}

enum ScopeKind {
    Launch,
    Group,
    Process(Box<ProcessEntity>),
    Include {
        target: PathBuf,
        passed_args: BTreeMap<String, Option<String>>,
    },
}

/// A `<node>` or `<test>` about to be created
#[derive(Debug, Clone)]
pub struct ProcessDecl {
    pub name: String,
    pub ns: String,
    pub package: String,
    pub executable: String,
    pub condition: LogicValue,
    pub location: Option<SourceLocation>,
    pub args: Option<SolverResult>,
    pub output: Option<SolverResult>,
    pub working_dir: Option<SolverResult>,
    pub launch_prefix: Option<SolverResult>,
    pub role: ProcessRole,
}

/// A `<machine>` about to be registered
#[derive(Debug, Clone)]
pub struct MachineDecl {
    pub name: String,
    pub address: String,
    pub is_default: bool,
    pub is_assignable: bool,
    pub env_loader: Option<SolverResult>,
    pub ssh_port: SolverResult,
    pub user: Option<SolverResult>,
    pub password: Option<SolverResult>,
    pub timeout: SolverResult,
}

pub struct LaunchScope<'a> {
    iface: &'a dyn SystemInterface,
    registry: Rc<Registry>,
    kind: ScopeKind,
    filepath: PathBuf,
    ns: RosName,
    /// Arguments with a final value; `None` if the value is unknown
    args: BTreeMap<String, Option<String>>,
    /// Declared arguments and their defaults
    arg_defaults: BTreeMap<String, Option<String>>,
    condition: LogicValue,
    remaps: VariantMap<String>,
    env: VariantMap<SolverResult>,
    params: Vec<Parameter>,
    /// Private parameters waiting for the next node
    fwd_params: Vec<Parameter>,
}

impl<'a> LaunchScope<'a> {
    /// Scope of a top-level launch file
    pub fn new(
        filepath: impl Into<PathBuf>,
        iface: &'a dyn SystemInterface,
        args: &BTreeMap<String, String>,
    ) -> Self {
        Self::with_counter(filepath, iface, args, AnonymousCounter::default())
    }

    /// Like [`LaunchScope::new`], numbering anonymous names from `counter`
    pub fn with_counter(
        filepath: impl Into<PathBuf>,
        iface: &'a dyn SystemInterface,
        args: &BTreeMap<String, String>,
        counter: AnonymousCounter,
    ) -> Self {
        Self {
            iface,
            registry: Rc::new(Registry {
                counter,
                ..Default::default()
            }),
            kind: ScopeKind::Launch,
            filepath: filepath.into(),
            ns: RosName::global("/"),
            args: args
                .iter()
                .map(|(name, value)| (name.clone(), Some(value.clone())))
                .collect(),
            arg_defaults: BTreeMap::new(),
            condition: LogicValue::True,
            remaps: VariantMap::new(),
            env: VariantMap::new(),
            params: Vec::new(),
            fwd_params: Vec::new(),
        }
    }

    fn child(&self, kind: ScopeKind, ns: RosName, condition: LogicValue) -> Self {
        Self {
            iface: self.iface,
            registry: Rc::clone(&self.registry),
            kind,
            filepath: self.filepath.clone(),
            ns,
            args: self.args.clone(),
            arg_defaults: self.arg_defaults.clone(),
            condition,
            remaps: self.remaps.clone(),
            env: self.env.clone(),
            params: Vec::new(),
            fwd_params: self.fwd_params.clone(),
        }
    }

    /// File the elements of this scope were written in
    pub fn filepath(&self) -> &Path {
        &self.filepath
    }

    pub fn ns(&self) -> &RosName {
        &self.ns
    }

    /// Namespace `~` names resolve against: the node name inside a node
    pub fn private_ns(&self) -> &str {
        match &self.kind {
            ScopeKind::Process(entity) => entity.name.full(),
            _ => self.ns.full(),
        }
    }

    pub fn condition(&self) -> &LogicValue {
        &self.condition
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ScopeKind::Launch => "launch",
            ScopeKind::Group => "group",
            ScopeKind::Process(entity) if entity.is_test() => "test",
            ScopeKind::Process(_) => "node",
            ScopeKind::Include { .. } => "include",
        }
    }

    fn unsupported(&self, operation: &str) -> TagError {
        SchemaError::Unsupported {
            tag: self.kind_name().to_string(),
            operation: operation.to_string(),
        }
        .into()
    }

    fn is_container(&self) -> bool {
        matches!(self.kind, ScopeKind::Launch | ScopeKind::Group)
    }

    // Arguments

    pub fn get_arg(&self, name: &str) -> Result<Option<String>, ArgError> {
        let Some(default) = self.arg_defaults.get(name) else {
            return Err(ArgError::Undeclared(name.to_string()));
        };
        Ok(match self.args.get(name) {
            Some(value) => value.clone(),
            None => default.clone(),
        })
    }

    /// Declare an argument. Inside an include this is a no-op.
    pub fn declare_arg(&mut self, name: &str, default: Option<String>) -> Result<(), TagError> {
        match self.kind {
            ScopeKind::Process(_) => Err(self.unsupported("declare_arg")),
            ScopeKind::Include { .. } => Ok(()),
            _ => {
                if self.arg_defaults.contains_key(name) {
                    return Err(ArgError::Duplicate(name.to_string()).into());
                }
                self.arg_defaults.insert(name.to_string(), default);
                Ok(())
            }
        }
    }

    /// Give an argument its final value. Inside an include the value is
    /// passed on to the included file instead.
    pub fn set_arg(&mut self, name: &str, value: Option<String>) -> Result<(), TagError> {
        if let ScopeKind::Include { passed_args, .. } = &mut self.kind {
            if passed_args.contains_key(name) {
                return Err(ArgError::Duplicate(name.to_string()).into());
            }
            passed_args.insert(name.to_string(), value);
            return Ok(());
        }
        if matches!(self.kind, ScopeKind::Process(_)) {
            return Err(self.unsupported("set_arg"));
        }
        self.declare_arg(name, None)?;
        self.args.insert(name.to_string(), value);
        Ok(())
    }

    // Tables

    pub fn set_env(&mut self, name: &str, value: SolverResult, condition: LogicValue) {
        self.env
            .entry(name.to_string())
            .or_default()
            .set(value, condition);
    }

    pub fn set_remap(
        &mut self,
        from: &str,
        to: &str,
        condition: LogicValue,
    ) -> Result<(), TagError> {
        if matches!(self.kind, ScopeKind::Include { .. }) {
            return Err(self.unsupported("set_remap"));
        }
        RosName::check_valid_name(from, false, true)?;
        RosName::check_valid_name(to, false, true)?;
        let source = RosName::resolve(from, self.ns.full(), self.private_ns());
        let target = RosName::resolve(to, self.ns.full(), self.private_ns());
        self.remaps.entry(source).or_default().set(target, condition);
        Ok(())
    }

    /// Declare a parameter (or, for YAML mappings, one per leaf).
    ///
    /// `ns` is resolved against the private namespace. The stored condition
    /// is `condition` joined with the scope condition.
    pub fn set_param(
        &mut self,
        name: &str,
        value: SolverResult,
        param_type: ValueType,
        condition: LogicValue,
        ns: &str,
        location: Option<SourceLocation>,
    ) -> Result<(), TagError> {
        if matches!(self.kind, ScopeKind::Include { .. }) {
            return Err(self.unsupported("set_param"));
        }
        RosName::check_valid_name(ns, false, false)?;
        let private_ns = self.private_ns().to_string();
        let pns = if private_ns == self.ns.full() {
            LAUNCH_PRIVATE_NS.to_string()
        } else {
            private_ns.clone()
        };
        let ns = RosName::resolve(ns, &private_ns, &private_ns);
        let condition = self.condition.clone().join(condition).simplify();

        let params = if param_type == ValueType::Yaml {
            RosName::check_valid_name(name, false, false)?;
            match value.value() {
                Some(Literal::Yaml(YamlValue::Mapping(mapping))) => {
                    yaml_params(name, &ns, &pns, mapping, &condition, &location)?
                }
                _ => vec![Parameter {
                    name: RosName::new(name, &ns, &private_ns),
                    param_type,
                    value,
                    condition,
                    location,
                }],
            }
        } else {
            RosName::check_valid_name(name, false, true)?;
            let param_type = match param_type {
                _ if !value.is_resolved() => param_type,
                ValueType::Auto => value.var_type(),
                declared if declared != value.var_type() => {
                    return Err(ValueError::TypeMismatch {
                        expected: declared.to_string(),
                        got: value.var_type().to_string(),
                    }
                    .into());
                }
                declared => declared,
            };
            vec![Parameter {
                name: RosName::new(name, &ns, &private_ns),
                param_type,
                value,
                condition,
                location,
            }]
        };
        self.store_params(params)
    }

    fn store_params(&mut self, params: Vec<Parameter>) -> Result<(), TagError> {
        let in_process = matches!(self.kind, ScopeKind::Process(_));
        for param in params {
            // unresolved YAML may be a whole namespace: `<rosparam file="$(find x)/a.yaml"/>`
            let whole_ns = param.param_type == ValueType::Yaml && !param.value.is_resolved();
            RosName::check_valid_name(param.name.full(), false, !whole_ns)?;
            if !in_process && param.name.is_private() {
                trace!("forwarding private parameter {}", param.name);
                self.fwd_params.push(param);
            } else {
                self.params.push(param);
            }
        }
        Ok(())
    }

    /// Parameters declared in this scope since the last call
    pub fn take_params(&mut self) -> Vec<Parameter> {
        mem::take(&mut self.params)
    }

    // Machines

    pub fn add_machine(&mut self, decl: MachineDecl) -> Result<(), TagError> {
        if !self.is_container() {
            return Err(self.unsupported("add_machine"));
        }
        let env_loader = decl.env_loader.unwrap_or_else(|| {
            SolverResult::string(format!("/opt/ros/{}/env.sh", self.iface.ros_distro()))
        });
        let machine = Machine {
            name: decl.name.clone(),
            address: decl.address,
            is_assignable: decl.is_assignable,
            env_loader,
            ssh_port: decl.ssh_port,
            user: decl.user,
            password: decl.password,
            timeout: decl.timeout,
        };
        {
            let mut machines = self.registry.machines.borrow_mut();
            if machines.get(&decl.name).is_some_and(|prev| *prev != machine) {
                return Err(MachineError::Duplicate(decl.name).into());
            }
            machines.insert(decl.name.clone(), machine);
        }
        let mut default = self.registry.default_machine.borrow_mut();
        if decl.is_default {
            *default = Some(decl.name);
        } else if default.as_deref() == Some(decl.name.as_str()) {
            *default = None;
        }
        Ok(())
    }

    /// Name of the machine processes are assigned to by default
    pub fn default_machine(&self) -> Option<String> {
        self.registry.default_machine.borrow().clone()
    }

    /// Machines registered so far, by name
    pub fn machines(&self) -> Vec<Machine> {
        self.registry.machines.borrow().values().cloned().collect()
    }

    // Child scopes

    pub fn new_group(&self, ns: &str, condition: LogicValue) -> Result<LaunchScope<'a>, TagError> {
        if !self.is_container() {
            return Err(self.unsupported("new_group"));
        }
        RosName::check_valid_name(ns, false, false)?;
        let ns = RosName::new(ns, self.ns.full(), self.private_ns());
        let condition = self.condition.clone().join(condition).simplify();
        Ok(self.child(ScopeKind::Group, ns, condition))
    }

    /// Scope of a new `<node>` or `<test>`.
    ///
    /// Private parameters pending in this scope are declared again inside
    /// the new one.
    pub fn new_process(&self, decl: ProcessDecl) -> Result<LaunchScope<'a>, TagError> {
        if !self.is_container() {
            return Err(self.unsupported("new_process"));
        }
        RosName::check_valid_name(&decl.name, true, true)?;
        RosName::check_valid_name(&decl.ns, false, false)?;
        let ns = RosName::new(&decl.ns, self.ns.full(), self.private_ns());
        let name = RosName::new(&decl.name, ns.full(), "");
        let condition = self.condition.clone().join(decl.condition).simplify();

        let mut role = decl.role;
        if let ProcessRole::Node { machine, .. } = &mut role {
            match machine {
                None => *machine = self.default_machine().map(SolverResult::string),
                Some(assigned) => {
                    if let Some(machine_name) = assigned.value().map(Literal::to_string) {
                        if !self.registry.machines.borrow().contains_key(&machine_name) {
                            return Err(MachineError::Undeclared(machine_name).into());
                        }
                    }
                }
            }
        }

        let entity = ProcessEntity {
            name,
            package: decl.package,
            executable: decl.executable,
            condition: condition.clone(),
            location: decl.location,
            args: decl.args.unwrap_or_else(|| SolverResult::string("")),
            output: decl.output.unwrap_or_else(|| SolverResult::string("log")),
            working_dir: decl
                .working_dir
                .unwrap_or_else(|| SolverResult::string("ROS_HOME")),
            launch_prefix: decl.launch_prefix,
            remaps: self.remaps.clone(),
            environment: self.env.clone(),
            role,
        };
        let mut scope = self.child(ScopeKind::Process(Box::new(entity)), ns, condition);
        scope.fwd_params.clear();
        for param in &self.fwd_params {
            scope.set_param(
                param.name.given(),
                param.value.clone(),
                param.param_type,
                param.condition.clone(),
                param.name.namespace(),
                param.location.clone(),
            )?;
        }
        Ok(scope)
    }

    /// Scope of an `<include>`; its `<arg>` children set the arguments
    /// passed to `target`
    pub fn new_include(
        &self,
        target: impl Into<PathBuf>,
        ns: &str,
        condition: LogicValue,
        pass_all_args: bool,
    ) -> Result<LaunchScope<'a>, TagError> {
        if !self.is_container() {
            return Err(self.unsupported("new_include"));
        }
        RosName::check_valid_name(ns, false, false)?;
        let ns = RosName::new(ns, self.ns.full(), self.private_ns());
        let condition = self.condition.clone().join(condition).simplify();
        let passed_args = if pass_all_args {
            self.args.clone()
        } else {
            BTreeMap::new()
        };
        let kind = ScopeKind::Include {
            target: target.into(),
            passed_args,
        };
        Ok(self.child(kind, ns, condition))
    }

    /// Top-level scope of the file an include scope points at
    pub fn into_launch(self) -> Result<LaunchScope<'a>, TagError> {
        let kind_error = self.unsupported("into_launch");
        let ScopeKind::Include {
            target,
            passed_args,
        } = self.kind
        else {
            return Err(kind_error);
        };
        Ok(Self {
            iface: self.iface,
            registry: self.registry,
            kind: ScopeKind::Launch,
            filepath: target,
            ns: self.ns,
            args: passed_args,
            arg_defaults: BTreeMap::new(),
            condition: self.condition,
            remaps: self.remaps,
            env: self.env,
            params: Vec::new(),
            fwd_params: self.fwd_params,
        })
    }

    /// File an include scope points at
    pub fn include_target(&self) -> Option<&Path> {
        match &self.kind {
            ScopeKind::Include { target, .. } => Some(target),
            _ => None,
        }
    }

    /// The finished process of a node/test scope
    pub fn into_process(self) -> Option<ProcessEntity> {
        match self.kind {
            ScopeKind::Process(entity) => {
                let mut entity = *entity;
                entity.remaps = self.remaps;
                entity.environment = self.env;
                Some(entity)
            }
            _ => None,
        }
    }
}

impl SubstitutionContext for LaunchScope<'_> {
    fn get_arg(&self, name: &str) -> Result<Option<String>, ArgError> {
        LaunchScope::get_arg(self, name)
    }

    fn get_env(&self, name: &str) -> Option<String> {
        self.iface.get_environment_variable(name)
    }

    fn get_pkg_path(&self, name: &str) -> Option<String> {
        self.iface
            .get_package_path(name)
            .map(|path| path.display().to_string())
    }

    fn get_anonymous_name(&self, name: &str) -> String {
        if let Some(anon) = self.registry.anonymous.borrow().get(name) {
            return anon.clone();
        }
        let n = self.registry.counter.get() + 1;
        self.registry.counter.set(n);
        let anon = format!("{}_anon_{}", name, n).replace(['.', '-', ':'], "_");
        self.registry
            .anonymous
            .borrow_mut()
            .insert(name.to_string(), anon.clone());
        anon
    }

    fn dirpath(&self) -> String {
        self.filepath
            .parent()
            .map(|dir| dir.display().to_string())
            .unwrap_or_default()
    }
}

/// One parameter per leaf of a YAML mapping
fn yaml_params(
    name: &str,
    ns: &str,
    pns: &str,
    mapping: &Mapping,
    condition: &LogicValue,
    location: &Option<SourceLocation>,
) -> Result<Vec<Parameter>, TagError> {
    let mut params = Vec::new();
    for (key, leaf) in unfold(name, mapping) {
        RosName::check_valid_name(&key, false, true)?;
        let value = SolverResult::resolved(Literal::from_yaml(leaf), ValueType::Auto)?;
        params.push(Parameter {
            name: RosName::new(&key, ns, pns),
            param_type: value.var_type(),
            value,
            condition: condition.clone(),
            location: location.clone(),
        });
    }
    Ok(params)
}

/// Leaves of a nested mapping, keyed by their joined path
fn unfold(name: &str, mapping: &Mapping) -> Vec<(String, YamlValue)> {
    let mut leaves = Vec::new();
    unfold_into(name, mapping, &mut leaves);
    leaves
}

fn unfold_into(prefix: &str, mapping: &Mapping, leaves: &mut Vec<(String, YamlValue)>) {
    for (key, value) in mapping.iter() {
        let key = ns_join(&yaml_key(key), prefix);
        match value {
            YamlValue::Mapping(inner) => unfold_into(&key, inner, leaves),
            leaf => leaves.push((key, leaf.clone())),
        }
    }
}

fn yaml_key(key: &YamlValue) -> String {
    match key {
        YamlValue::String(s) => s.clone(),
        other => Literal::from_yaml(other.clone()).to_string(),
    }
}

/// Join the way parameter files nest names; `~x` and `/x` stay as they are
fn ns_join(name: &str, ns: &str) -> String {
    if name.starts_with('~') || name.starts_with('/') {
        name.to_string()
    } else if ns == "~" {
        format!("~{}", name)
    } else if ns.is_empty() {
        name.to_string()
    } else if ns.ends_with('/') {
        format!("{}{}", ns, name)
    } else {
        format!("{}/{}", ns, name)
    }
}
