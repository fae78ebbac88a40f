use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// launchvar - static variability analysis for ROS launch files
#[derive(Parser, Debug)]
#[command(name = "launchvar")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Directory to look for launchvar.toml in (defaults to the current one)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interpret launch files and print what each one declares
    Interpret {
        /// Top-level launch files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Command-line argument (NAME:=VALUE)
        #[arg(short, long = "arg", value_parser = parse_launch_arg)]
        args: Vec<(String, String)>,

        /// Keep entities whose condition is statically false
        #[arg(long)]
        include_absent: bool,

        /// Package location (NAME=PATH), takes precedence over the workspace
        #[arg(long = "package", value_parser = parse_package)]
        packages: Vec<(String, PathBuf)>,

        /// ROS distribution to assume
        #[arg(long)]
        distro: Option<String>,
    },

    /// Compute under which conditions launch files can run together
    Compat {
        /// Launch files to compare
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Parameters with the same name also clash
        #[arg(long)]
        params: bool,

        /// Ignore files that another given file includes
        #[arg(long)]
        top_level: bool,

        /// Package location (NAME=PATH), takes precedence over the workspace
        #[arg(long = "package", value_parser = parse_package)]
        packages: Vec<(String, PathBuf)>,

        /// ROS distribution to assume
        #[arg(long)]
        distro: Option<String>,
    },
}

/// `name:=value`, as accepted by roslaunch
pub fn parse_launch_arg(text: &str) -> Result<(String, String), String> {
    match text.split_once(":=") {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME:=VALUE, got '{}'", text)),
    }
}

fn parse_package(text: &str) -> Result<(String, PathBuf), String> {
    match text.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => {
            Ok((name.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected NAME=PATH, got '{}'", text)),
    }
}
