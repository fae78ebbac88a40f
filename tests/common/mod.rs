//! Common test utilities for launchvar integration tests.
//!
//! This module provides:
//! - `workspace()`: an in-memory ROS workspace with a few packages
//! - `run` / `run_with`: interpret one file and return its model
//! - Fixtures: reusable launch file contents

#![allow(dead_code)]

pub mod fixtures;

use std::collections::BTreeMap;

use launchvar::{
    InterpreterOptions, LaunchError, LaunchInterpreter, LaunchModel, MemorySystem,
};

pub use fixtures::*;

/// Workspace root used by every fixture
pub const WS: &str = "/ws";

/// In-memory system with `robot_bringup` and `robot_driver` packages
pub fn workspace() -> MemorySystem {
    MemorySystem::new()
        .with_distro("noetic")
        .with_package("robot_bringup", "/ws/src/robot_bringup")
        .with_package("robot_driver", "/ws/src/robot_driver")
}

/// Interpret `path` with default options and no arguments
pub fn run(system: &MemorySystem, path: &str) -> Result<LaunchModel, LaunchError> {
    run_with(system, path, &[], InterpreterOptions::default())
}

pub fn run_with(
    system: &MemorySystem,
    path: &str,
    args: &[(&str, &str)],
    options: InterpreterOptions,
) -> Result<LaunchModel, LaunchError> {
    let args: BTreeMap<String, String> = args
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let mut interpreter = LaunchInterpreter::new(system, options);
    interpreter.interpret(path, &args)?;
    Ok(interpreter.into_model())
}

/// Wrap elements in a `<launch>` root
pub fn launch(body: &str) -> String {
    format!("<launch>\n{}\n</launch>\n", body)
}
