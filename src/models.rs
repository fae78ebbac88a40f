//! Launch model
//!
//! The entities a launch file declares, as produced by the interpreter:
//! - `ProcessEntity`: a `<node>` or `<test>`
//! - `Parameter`: one parameter server entry
//! - `Machine`: a `<machine>` declaration
//! - `ParamStoreCommand`: `<rosparam>` delete/dump commands
//! - `LaunchModel`: everything collected from one or more launch files

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::logic::LogicValue;
use crate::names::RosName;
use crate::values::{SolverResult, SourceLocation, ValueType, VariantMap};

/// What distinguishes a node from a test
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessRole {
    Node {
        machine: Option<SolverResult>,
        required: SolverResult,
        respawn: SolverResult,
        respawn_delay: SolverResult,
    },
    Test {
        test_name: String,
        retries: SolverResult,
        time_limit: SolverResult,
    },
}

impl ProcessRole {
    /// A plain node that is neither required nor respawned
    pub fn node() -> Self {
        ProcessRole::Node {
            machine: None,
            required: SolverResult::bool(false),
            respawn: SolverResult::bool(false),
            respawn_delay: SolverResult::double(0.0),
        }
    }

    pub fn test(test_name: impl Into<String>) -> Self {
        ProcessRole::Test {
            test_name: test_name.into(),
            retries: SolverResult::int(0),
            time_limit: SolverResult::double(60.0),
        }
    }
}

/// A process started by a launch file
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessEntity {
    pub name: RosName,
    pub package: String,
    pub executable: String,
    pub condition: LogicValue,
    pub location: Option<SourceLocation>,
    pub args: SolverResult,
    pub output: SolverResult,
    pub working_dir: SolverResult,
    pub launch_prefix: Option<SolverResult>,
    pub remaps: VariantMap<String>,
    pub environment: VariantMap<SolverResult>,
    pub role: ProcessRole,
}

impl ProcessEntity {
    pub fn new(name: RosName, package: impl Into<String>, executable: impl Into<String>) -> Self {
        Self {
            name,
            package: package.into(),
            executable: executable.into(),
            condition: LogicValue::True,
            location: None,
            args: SolverResult::string(""),
            output: SolverResult::string("log"),
            working_dir: SolverResult::string("ROS_HOME"),
            launch_prefix: None,
            remaps: VariantMap::new(),
            environment: VariantMap::new(),
            role: ProcessRole::node(),
        }
    }

    pub fn is_test(&self) -> bool {
        matches!(self.role, ProcessRole::Test { .. })
    }

    /// Namespace the process runs in
    pub fn namespace(&self) -> RosName {
        RosName::global(self.name.namespace())
    }
}

impl Serialize for ProcessEntity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ProcessEntity", 17)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("traceability", &self.location)?;
        state.serialize_field("condition", &self.condition)?;
        state.serialize_field("is_test_node", &self.is_test())?;
        state.serialize_field("package", &self.package)?;
        state.serialize_field("executable", &self.executable)?;
        match &self.role {
            ProcessRole::Node {
                machine,
                required,
                respawn,
                respawn_delay,
            } => {
                state.serialize_field("machine", machine)?;
                state.serialize_field("is_required", required)?;
                state.serialize_field("respawns", respawn)?;
                state.serialize_field("respawn_delay", respawn_delay)?;
            }
            ProcessRole::Test {
                test_name,
                retries,
                time_limit,
            } => {
                state.serialize_field("test_name", test_name)?;
                state.serialize_field("retries", retries)?;
                state.serialize_field("time_limit", time_limit)?;
            }
        }
        state.serialize_field("args", &self.args)?;
        state.serialize_field("output", &self.output)?;
        state.serialize_field("working_dir", &self.working_dir)?;
        state.serialize_field("launch_prefix", &self.launch_prefix)?;
        state.serialize_field("remaps", &self.remaps)?;
        state.serialize_field("environment", &self.environment)?;
        state.end()
    }
}

/// A parameter server entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: RosName,
    pub param_type: ValueType,
    pub value: SolverResult,
    pub condition: LogicValue,
    #[serde(rename = "traceability")]
    pub location: Option<SourceLocation>,
}

/// A machine processes can be assigned to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Machine {
    pub name: String,
    pub address: String,
    pub is_assignable: bool,
    pub env_loader: SolverResult,
    pub ssh_port: SolverResult,
    pub user: Option<SolverResult>,
    pub password: Option<SolverResult>,
    pub timeout: SolverResult,
}

/// Parameter server operations other than setting values
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
pub enum ParamStoreCommand {
    Delete { ns: String, param: String },
    Dump { filepath: String, ns: String, param: String },
}

/// Arguments a top-level launch file declares, with their defaults.
///
/// Serialized as a `[file, {name: default}]` pair.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArgLedger {
    pub file: PathBuf,
    pub args: BTreeMap<String, Option<SolverResult>>,
}

impl ArgLedger {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            args: BTreeMap::new(),
        }
    }
}

impl Serialize for ArgLedger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.file, &self.args).serialize(serializer)
    }
}

/// Everything collected by an interpreter
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct LaunchModel {
    #[serde(rename = "rosparam")]
    pub rosparam_cmds: Vec<ParamStoreCommand>,
    pub nodes: Vec<ProcessEntity>,
    pub parameters: Vec<Parameter>,
    pub machines: Vec<Machine>,
    #[serde(rename = "args")]
    pub cmd_line_args: Vec<ArgLedger>,
    #[serde(rename = "includes")]
    pub included_files: Vec<PathBuf>,
}

impl LaunchModel {
    /// Ledger of the given top-level file, if it was interpreted
    pub fn arg_ledger(&self, file: &std::path::Path) -> Option<&ArgLedger> {
        self.cmd_line_args.iter().find(|ledger| ledger.file == file)
    }

    pub fn node(&self, name: &str) -> Option<&ProcessEntity> {
        self.nodes.iter().find(|node| node.name == name)
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|param| param.name == name)
    }
}
