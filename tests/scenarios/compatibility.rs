//! Which launch files of a workspace can run together.

use std::collections::BTreeMap;

use launchvar::analysis::{filter_top_level_files, list_compatible_files, render_compatibility};
use launchvar::{AnalysisOptions, InterpreterOptions, LaunchData, LaunchInterpreter, NamingContext};

use crate::common::*;

fn interpret_all(system: &launchvar::MemorySystem, paths: &[&str]) -> (LaunchData, NamingContext) {
    let mut interpreter = LaunchInterpreter::new(system, InterpreterOptions::default());
    let (data, errors) = interpreter.interpret_data(paths, &BTreeMap::new());
    assert!(errors.is_empty(), "{:?}", errors);
    (data, interpreter.naming().clone())
}

fn full_workspace() -> launchvar::MemorySystem {
    workspace()
        .with_file(BRINGUP_PATH, BRINGUP_LAUNCH)
        .with_file(DRIVER_PATH, DRIVER_LAUNCH)
        .with_file(TELEOP_PATH, TELEOP_LAUNCH)
        .with_file(SIM_PATH, SIM_LAUNCH)
}

#[test]
fn workspace_compatibility() {
    let system = full_workspace();
    let (data, mut naming) = interpret_all(
        &system,
        &[BRINGUP_PATH, DRIVER_PATH, TELEOP_PATH, SIM_PATH],
    );

    let top = filter_top_level_files(&data);
    let files: Vec<&str> = top.keys().map(String::as_str).collect();
    assert_eq!(files, vec![BRINGUP_PATH, SIM_PATH, TELEOP_PATH]);

    let map = list_compatible_files(&top, &AnalysisOptions::default(), &mut naming);
    assert!(map[BRINGUP_PATH][SIM_PATH].is_false());
    assert!(map[BRINGUP_PATH][TELEOP_PATH].is_true());
    assert!(map[SIM_PATH][TELEOP_PATH].is_true());
    for file in top.keys() {
        assert!(map[file][file].is_false());
    }

    let rendered = serde_json::to_string_pretty(&render_compatibility(&map)).unwrap();
    insta::assert_snapshot!(rendered, @r#"
    {
      "/ws/src/robot_bringup/launch/bringup.launch": {
        "/ws/src/robot_bringup/launch/bringup.launch": "False",
        "/ws/src/robot_bringup/launch/sim.launch": "False",
        "/ws/src/robot_bringup/launch/teleop.launch": "True"
      },
      "/ws/src/robot_bringup/launch/sim.launch": {
        "/ws/src/robot_bringup/launch/bringup.launch": "False",
        "/ws/src/robot_bringup/launch/sim.launch": "False",
        "/ws/src/robot_bringup/launch/teleop.launch": "True"
      },
      "/ws/src/robot_bringup/launch/teleop.launch": {
        "/ws/src/robot_bringup/launch/bringup.launch": "True",
        "/ws/src/robot_bringup/launch/sim.launch": "True",
        "/ws/src/robot_bringup/launch/teleop.launch": "False"
      }
    }
    "#);
}

#[test]
fn included_driver_does_not_clash_with_standalone_driver() {
    let system = full_workspace();
    let (data, mut naming) = interpret_all(&system, &[BRINGUP_PATH, DRIVER_PATH]);

    // the standalone driver runs as /driver, the included one as /r1/driver
    let map = list_compatible_files(&data, &AnalysisOptions::default(), &mut naming);
    assert!(map[BRINGUP_PATH][DRIVER_PATH].is_true());

    let options = AnalysisOptions {
        params_collide: true,
    };
    let map = list_compatible_files(&data, &options, &mut naming);
    assert!(map[BRINGUP_PATH][DRIVER_PATH].is_true());
}

#[test]
fn conditional_clash_depends_on_the_argument() {
    let system = workspace()
        .with_file(
            "/ws/a.launch",
            launch(
                r#"<arg name="sim"/>
<node pkg="gazebo_ros" type="gzserver" name="gazebo" if="$(arg sim)"/>"#,
            ),
        )
        .with_file(SIM_PATH, SIM_LAUNCH);
    let (data, mut naming) = interpret_all(&system, &["/ws/a.launch", SIM_PATH]);

    let map = list_compatible_files(&data, &AnalysisOptions::default(), &mut naming);
    let condition = &map["/ws/a.launch"][SIM_PATH];
    let gazebo = &data["/ws/a.launch"].nodes[0].condition;
    assert_eq!(condition, &gazebo.negate());
    assert_eq!(map[SIM_PATH]["/ws/a.launch"], *condition);
}

#[test]
fn unknown_names_produce_equality_variables() {
    let system = workspace()
        .with_file(
            "/ws/a.launch",
            launch(
                r#"<arg name="robot"/>
<node pkg="teleop" type="teleop_node" name="teleop" ns="$(arg robot)"/>"#,
            ),
        )
        .with_file(
            "/ws/b.launch",
            launch(r#"<node pkg="teleop" type="teleop_node" name="teleop" ns="r1"/>"#),
        );
    let (data, mut naming) = interpret_all(&system, &["/ws/a.launch", "/ws/b.launch"]);
    let before = naming.issued();

    let map = list_compatible_files(&data, &AnalysisOptions::default(), &mut naming);
    let condition = &map["/ws/a.launch"]["/ws/b.launch"];
    assert!(condition.is_not());
    let texts: Vec<&str> = condition.variables().map(|v| v.text.as_str()).collect();
    assert_eq!(texts, vec!["/r1/teleop == /*/teleop"]);
    assert_eq!(naming.issued(), before + 1);
}

#[test]
fn parameter_values_decide_parameter_clashes() {
    let system = workspace()
        .with_file("/ws/a.launch", launch(r#"<param name="/use_sim_time" value="true"/>"#))
        .with_file("/ws/b.launch", launch(r#"<param name="/use_sim_time" value="false"/>"#))
        .with_file("/ws/c.launch", launch(r#"<param name="/use_sim_time" value="true"/>"#));
    let (data, mut naming) = interpret_all(&system, &["/ws/a.launch", "/ws/b.launch", "/ws/c.launch"]);

    let options = AnalysisOptions {
        params_collide: true,
    };
    let map = list_compatible_files(&data, &options, &mut naming);
    assert!(map["/ws/a.launch"]["/ws/b.launch"].is_false());
    assert!(map["/ws/a.launch"]["/ws/c.launch"].is_true());
    assert!(map["/ws/b.launch"]["/ws/c.launch"].is_false());
}
