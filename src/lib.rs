//! launchvar - static variability analysis for ROS launch files
//!
//! Interprets launch XML without running it. Whatever cannot be known
//! statically (command-line args, environment, command output) stays
//! symbolic: values become [`SolverResult`]s with unknown parts, and tags
//! guarded by such values get a [`LogicValue`] presence condition. The
//! resulting [`LaunchModel`]s can then be compared for name clashes with
//! [`analysis::list_compatible_files`].

pub mod analysis;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod logic;
pub mod models;
pub mod names;
pub mod parser;
pub mod scope;
pub mod subst;
pub mod system;
pub mod tree;
pub mod values;

// Re-exports for convenience
pub use analysis::{AnalysisOptions, CompatibilityMap, LaunchData};
pub use config::Config;
pub use error::{LaunchError, LaunchResult, TagError};
pub use interpreter::{InterpreterOptions, LaunchInterpreter};
pub use logic::{LogicValue, LogicVariable, NamingContext, VariableData};
pub use models::{LaunchModel, Machine, Parameter, ProcessEntity};
pub use names::RosName;
pub use parser::{parse_launch_file, parse_launch_str};
pub use system::{LocalSystem, MemorySystem, SystemInterface};
pub use values::{ConditionalData, Literal, SolverResult, ValueType};
