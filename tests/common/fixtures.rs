//! Launch file fixtures.

/// Single robot bringup including the driver under the robot's namespace
pub const BRINGUP_LAUNCH: &str = r#"<launch>
  <arg name="robot" default="r1"/>
  <arg name="use_camera" default="true"/>
  <arg name="sim"/>

  <include file="$(find robot_driver)/launch/driver.launch" ns="$(arg robot)">
    <arg name="rate" value="50"/>
  </include>

  <node pkg="usb_cam" type="usb_cam_node" name="camera" if="$(arg use_camera)"/>
  <node pkg="gazebo_ros" type="gzserver" name="gazebo" if="$(arg sim)"/>
</launch>
"#;

pub const BRINGUP_PATH: &str = "/ws/src/robot_bringup/launch/bringup.launch";

/// Driver with a private rate parameter and a YAML configuration
pub const DRIVER_LAUNCH: &str = r#"<launch>
  <arg name="rate" default="10"/>
  <node pkg="robot_driver" type="driver_node" name="driver" output="screen">
    <param name="rate" value="$(arg rate)"/>
    <rosparam>
      frame_id: base_link
      limits:
        max_speed: 1.5
        reverse: false
    </rosparam>
    <remap from="cmd_vel" to="/safety/cmd_vel"/>
  </node>
</launch>
"#;

pub const DRIVER_PATH: &str = "/ws/src/robot_driver/launch/driver.launch";

/// Teleoperation, with a configurable node name
pub const TELEOP_LAUNCH: &str = r#"<launch>
  <arg name="joy_name" default="joy"/>
  <arg name="robot"/>
  <node pkg="joy" type="joy_node" name="$(arg joy_name)"/>
  <node pkg="teleop" type="teleop_node" name="teleop" ns="$(arg robot)"/>
</launch>
"#;

pub const TELEOP_PATH: &str = "/ws/src/robot_bringup/launch/teleop.launch";

/// Simulation, always running its own camera
pub const SIM_LAUNCH: &str = r#"<launch>
  <node pkg="gazebo_ros" type="gzserver" name="gazebo"/>
  <node pkg="usb_cam" type="usb_cam_node" name="camera"/>
</launch>
"#;

pub const SIM_PATH: &str = "/ws/src/robot_bringup/launch/sim.launch";
