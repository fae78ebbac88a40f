//! A robot bringup that includes its driver, interpreted without arguments.

use std::collections::BTreeMap;

use serde_json::json;

use launchvar::{InterpreterOptions, LaunchInterpreter, LaunchModel};

use crate::common::*;

fn bringup() -> LaunchModel {
    let system = workspace()
        .with_file(BRINGUP_PATH, BRINGUP_LAUNCH)
        .with_file(DRIVER_PATH, DRIVER_LAUNCH);
    let mut interpreter = LaunchInterpreter::new(&system, InterpreterOptions::default());
    interpreter.interpret(BRINGUP_PATH, &BTreeMap::new()).unwrap();
    interpreter.into_model()
}

#[test]
fn bringup_declares_driver_camera_and_conditional_gazebo() {
    let model = bringup();

    let names: Vec<&str> = model.nodes.iter().map(|n| n.name.full()).collect();
    assert_eq!(names, vec!["/r1/driver", "/camera", "/gazebo"]);
    assert!(model.node("/camera").unwrap().condition.is_true());
    assert!(model.node("/gazebo").unwrap().condition.is_variable());

    let params: Vec<&str> = model.parameters.iter().map(|p| p.name.full()).collect();
    assert_eq!(
        params,
        vec![
            "/r1/driver/rate",
            "/r1/driver/frame_id",
            "/r1/driver/limits/max_speed",
            "/r1/driver/limits/reverse",
        ]
    );
}

#[test]
fn bringup_interchange_shape() {
    let value = serde_json::to_value(bringup()).unwrap();

    assert_eq!(value["includes"], json!([DRIVER_PATH]));
    assert_eq!(value["args"][0][0], json!(BRINGUP_PATH));
    assert_eq!(value["args"][0][1]["sim"], json!(null));
    assert_eq!(value["args"][0][1]["robot"]["value"], json!("r1"));
    assert_eq!(value["rosparam"], json!([]));

    let gazebo = &value["nodes"][2];
    assert_eq!(gazebo["name"], json!("/gazebo"));
    assert_eq!(gazebo["condition"]["name"], json!("@1"));
    assert_eq!(gazebo["is_required"]["value"], json!(false));
    assert_eq!(gazebo["traceability"]["line"], json!(11));

    let rate = &value["parameters"][0];
    assert_eq!(rate["name"], json!("/r1/driver/rate"));
    assert_eq!(rate["value"]["value"], json!(50));
    assert_eq!(rate["condition"], json!(true));
}

#[test]
fn bringup_with_arguments() {
    let system = workspace()
        .with_file(BRINGUP_PATH, BRINGUP_LAUNCH)
        .with_file(DRIVER_PATH, DRIVER_LAUNCH);
    let model = run_with(
        &system,
        BRINGUP_PATH,
        &[("robot", "r2"), ("use_camera", "false"), ("sim", "true")],
        InterpreterOptions::default(),
    )
    .unwrap();

    let names: Vec<&str> = model.nodes.iter().map(|n| n.name.full()).collect();
    assert_eq!(names, vec!["/r2/driver", "/gazebo"]);
    assert!(model.nodes.iter().all(|n| n.condition.is_true()));
    assert_eq!(system.parsed_trees(), 2);
}
