//! Interpreting launch files from a real directory tree.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tempfile::tempdir;

use launchvar::config::{Config, SystemConfig};
use launchvar::{InterpreterOptions, LaunchError, LaunchInterpreter, Literal, LocalSystem};

use crate::common::*;

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn local_workspace_with_packages_and_yaml() {
    let ws = tempdir().unwrap();
    let driver = ws.path().join("src").join("robot_driver");
    write(&driver.join("package.xml"), "<package/>");
    write(&driver.join("launch").join("driver.launch"), DRIVER_LAUNCH);
    write(&driver.join("config").join("limits.yaml"), "max_speed: 2.0\n");
    let main = ws.path().join("main.launch");
    write(
        &main,
        &launch(
            r#"<include file="$(find robot_driver)/launch/driver.launch"/>
<rosparam file="$(find robot_driver)/config/limits.yaml" ns="limits"/>
<param name="notes" textfile="$(dirname)/missing.txt"/>"#,
        ),
    );

    let system = LocalSystem::new(SystemConfig {
        workspace: Some(ws.path().to_path_buf()),
        ..Default::default()
    });
    let mut interpreter = LaunchInterpreter::new(&system, InterpreterOptions::default());
    interpreter.interpret(&main, &BTreeMap::new()).unwrap();
    let model = interpreter.model();

    assert!(model.node("/driver").is_some());
    assert_eq!(
        model.included_files,
        vec![driver.join("launch").join("driver.launch")]
    );
    let limit = model.parameter("/limits/max_speed").unwrap();
    assert_eq!(limit.value.value(), Some(&Literal::Double(2.0)));
    let notes = model.parameter("/notes").unwrap();
    assert_eq!(notes.value.unknown()[0].cmd, "file");
}

#[test]
fn strict_mode_keeps_includes_inside_the_workspace() {
    let ws = tempdir().unwrap();
    let outside = tempdir().unwrap();
    let foreign = outside.path().join("foreign.launch");
    write(&foreign, &launch(r#"<node pkg="p" type="t" name="n"/>"#));
    let main = ws.path().join("main.launch");
    write(
        &main,
        &launch(&format!(r#"<include file="{}"/>"#, foreign.display())),
    );

    let system = LocalSystem::new(SystemConfig {
        workspace: Some(ws.path().to_path_buf()),
        strict: true,
        ..Default::default()
    });
    let mut interpreter = LaunchInterpreter::new(&system, InterpreterOptions::default());
    let err = interpreter.interpret(&main, &BTreeMap::new()).unwrap_err();
    assert!(matches!(
        err,
        LaunchError::Interpretation { tag: "include", .. }
    ), "{:?}", err);
    assert!(interpreter.model().nodes.is_empty());
}

#[test]
fn project_config_drives_the_system() {
    let ws = tempdir().unwrap();
    write(
        &ws.path().join("launchvar.toml"),
        r#"
[system]
ros_distro = "humble"
strict = false

[system.packages]
robot_driver = "/opt/robot_driver"

[analysis]
params_collide = true
"#,
    );

    let config = Config::load(&ws.path().join("launchvar.toml")).unwrap();
    assert!(config.analysis.params_collide);
    let system = LocalSystem::new(config.system);
    let main = ws.path().join("main.launch");
    write(
        &main,
        &launch(r#"<machine name="m" address="host"/><param name="pkg" value="$(find robot_driver)"/>"#),
    );

    let mut interpreter = LaunchInterpreter::new(&system, InterpreterOptions::default());
    interpreter.interpret(&main, &BTreeMap::new()).unwrap();
    let model = interpreter.model();
    assert_eq!(
        model.machines[0].env_loader.as_string(None),
        "/opt/ros/humble/env.sh"
    );
    assert_eq!(
        model.parameter("/pkg").unwrap().value.value(),
        Some(&Literal::String("/opt/robot_driver".into()))
    );
}
