//! launchvar CLI - static variability analysis for ROS launch files
//!
//! Usage: launchvar <COMMAND>
//!
//! Commands:
//!   interpret  Print nodes, parameters and machines declared by launch files
//!   compat     Print under which conditions launch files can run together

mod cli;

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::error;

use launchvar::analysis::{
    filter_top_level_files, list_compatible_files, render_compatibility, AnalysisOptions,
};
use launchvar::{Config, InterpreterOptions, LaunchInterpreter, LocalSystem};

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let project = match &cli.project {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("cannot determine the current directory")?,
    };
    let mut config = Config::load_or_default(Some(&project));

    tracing_subscriber::fmt()
        .with_max_level(config.output.verbosity.log_level(cli.verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Interpret {
            files,
            args,
            include_absent,
            packages,
            distro,
        } => {
            config.interpreter.include_absent |= include_absent;
            apply_system_flags(&mut config, packages, distro);
            cmd_interpret(&config, &files, args.into_iter().collect())
        }
        Commands::Compat {
            files,
            params,
            top_level,
            packages,
            distro,
        } => {
            config.analysis.params_collide |= params;
            config.analysis.top_level_only |= top_level;
            apply_system_flags(&mut config, packages, distro);
            cmd_compat(&config, &files)
        }
    }
}

fn apply_system_flags(
    config: &mut Config,
    packages: Vec<(String, PathBuf)>,
    distro: Option<String>,
) {
    config.system.packages.extend(packages);
    if distro.is_some() {
        config.system.ros_distro = distro;
    }
}

fn absolute(files: &[PathBuf]) -> Result<Vec<PathBuf>> {
    files
        .iter()
        .map(|file| {
            std::path::absolute(file).with_context(|| format!("invalid path {}", file.display()))
        })
        .collect()
}

fn cmd_interpret(config: &Config, files: &[PathBuf], args: BTreeMap<String, String>) -> Result<()> {
    let files = absolute(files)?;
    let system = LocalSystem::new(config.system.clone());
    let options = InterpreterOptions {
        include_absent: config.interpreter.include_absent,
    };
    let mut interpreter = LaunchInterpreter::new(&system, options);
    let (data, errors) = interpreter.interpret_data(&files, &args);

    println!("{}", serde_json::to_string_pretty(&data)?);
    report(&errors)
}

fn cmd_compat(config: &Config, files: &[PathBuf]) -> Result<()> {
    let files = absolute(files)?;
    let system = LocalSystem::new(config.system.clone());
    let options = InterpreterOptions {
        include_absent: config.interpreter.include_absent,
    };
    let mut interpreter = LaunchInterpreter::new(&system, options);
    let (mut data, errors) = interpreter.interpret_data(&files, &BTreeMap::new());
    if config.analysis.top_level_only {
        data = filter_top_level_files(&data);
    }

    let analysis = AnalysisOptions {
        params_collide: config.analysis.params_collide,
    };
    let map = list_compatible_files(&data, &analysis, interpreter.naming_mut());

    println!("{}", serde_json::to_string_pretty(&render_compatibility(&map))?);
    report(&errors)
}

fn report(errors: &[launchvar::LaunchError]) -> Result<()> {
    for err in errors {
        error!("{}", err);
    }
    match errors.len() {
        0 => Ok(()),
        1 => bail!("1 launch file could not be interpreted"),
        n => bail!("{} launch files could not be interpreted", n),
    }
}
