//! Configuration for launchvar
//!
//! Resolution order:
//! 1. CLI flags (highest priority)
//! 2. Environment variables (LAUNCHVAR_*)
//! 3. Project config (launchvar.toml)
//! 4. User config (~/.config/launchvar/config.toml)
//! 5. Built-in defaults (lowest priority)

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn, Level};

use crate::error::{LaunchError, LaunchResult};

/// Project-level config file name
pub const PROJECT_CONFIG_FILE: &str = "launchvar.toml";

/// Interpreter settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterpreterConfig {
    /// Keep entities whose condition is statically false
    #[serde(default)]
    pub include_absent: bool,
}

/// Compatibility analysis settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Treat parameters with the same name but different values as a clash
    #[serde(default)]
    pub params_collide: bool,
    /// Only compare files that no other file includes
    #[serde(default)]
    pub top_level_only: bool,
}

/// Host system settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Overrides `ROS_DISTRO`
    #[serde(default)]
    pub ros_distro: Option<String>,
    /// Overrides `ROS_WORKSPACE`
    #[serde(default)]
    pub workspace: Option<PathBuf>,
    /// Refuse to read files outside the workspace
    #[serde(default)]
    pub strict: bool,
    /// Allow `<param command="...">` to run shell commands
    #[serde(default)]
    pub allow_commands: bool,
    /// Extra package locations, name → directory
    #[serde(default)]
    pub packages: BTreeMap<String, PathBuf>,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub verbosity: Verbosity,
}

/// Verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
    Debug,
}

impl Verbosity {
    /// Log level after `steps` extra `-v` flags
    pub fn log_level(self, steps: u8) -> Level {
        const LEVELS: [Level; 5] = [
            Level::ERROR,
            Level::WARN,
            Level::INFO,
            Level::DEBUG,
            Level::TRACE,
        ];
        let base = match self {
            Verbosity::Quiet => 0,
            Verbosity::Normal => 1,
            Verbosity::Verbose => 2,
            Verbosity::Debug => 3,
        };
        LEVELS[(base + usize::from(steps)).min(LEVELS.len() - 1)]
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub interpreter: InterpreterConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub system: SystemConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Keys each section accepts. `[system.packages]` takes any name.
const SECTIONS: &[(&str, &[&str])] = &[
    ("interpreter", &["include_absent"]),
    ("analysis", &["params_collide", "top_level_only"]),
    (
        "system",
        &["ros_distro", "workspace", "strict", "allow_commands", "packages"],
    ),
    ("output", &["verbosity"]),
];

/// Unknown key found while loading a config file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    /// Section holding the key; `None` for an unknown section
    pub section: Option<String>,
    pub key: String,
    pub file: PathBuf,
    pub line: Option<usize>,
    pub suggestion: Option<String>,
}

impl ConfigWarning {
    fn new(path: &str, file: &Path, content: &str) -> Self {
        let (section, key) = match path.split_once('.') {
            Some((section, key)) => (Some(section.to_string()), key.to_string()),
            None => (None, path.to_string()),
        };
        let candidates: Vec<&str> = match section.as_deref() {
            Some(name) => SECTIONS
                .iter()
                .find(|(section, _)| *section == name)
                .map(|(_, keys)| keys.to_vec())
                .unwrap_or_default(),
            None => SECTIONS.iter().map(|(section, _)| *section).collect(),
        };
        Self {
            line: key_line(content, section.as_deref(), &key),
            suggestion: candidates
                .into_iter()
                .find(|candidate| is_typo_of(&key, candidate))
                .map(str::to_string),
            file: file.to_path_buf(),
            section,
            key,
        }
    }
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.section {
            Some(section) => write!(f, "unknown key '{}' in [{}]", self.key, section)?,
            None => write!(f, "unknown section [{}]", self.key)?,
        }
        write!(f, " of {}", self.file.display())?;
        if let Some(line) = self.line {
            write!(f, ":{}", line)?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, " (did you mean '{}'?)", suggestion)?;
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> LaunchResult<Self> {
        let (config, _warnings) = Self::load_with_warnings(path)?;
        Ok(config)
    }

    /// Load configuration and collect unknown keys as warnings
    pub fn load_with_warnings(path: &Path) -> LaunchResult<(Self, Vec<ConfigWarning>)> {
        let content = fs::read_to_string(path)?;

        let mut warnings = Vec::new();
        let deserializer = toml::de::Deserializer::new(&content);
        let config: Self = serde_ignored::deserialize(deserializer, |ignored| {
            warnings.push(ConfigWarning::new(&ignored.to_string(), path, &content));
        })
        .map_err(|e| LaunchError::InvalidConfig {
            file: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok((config, warnings))
    }

    /// Load from project config, user config, or defaults
    pub fn load_or_default(project_root: Option<&Path>) -> Self {
        let candidates = project_root
            .map(|root| root.join(PROJECT_CONFIG_FILE))
            .into_iter()
            .chain(dirs::config_dir().map(|dir| dir.join("launchvar").join("config.toml")));

        for path in candidates {
            if !path.exists() {
                continue;
            }
            match Self::load_with_warnings(&path) {
                Ok((config, warnings)) => {
                    for warning in &warnings {
                        warn!("{}", warning);
                    }
                    debug!("loaded configuration from {}", path.display());
                    return config.with_env_overrides();
                }
                Err(e) => warn!("ignoring configuration: {}", e),
            }
        }

        Self::default().with_env_overrides()
    }

    /// Apply environment variable overrides (LAUNCHVAR_* prefix)
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("LAUNCHVAR_INCLUDE_ABSENT") {
            self.interpreter.include_absent = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("LAUNCHVAR_PARAMS_COLLIDE") {
            self.analysis.params_collide = parse_flag(&val);
        }

        if let Ok(distro) = std::env::var("LAUNCHVAR_ROS_DISTRO") {
            if !distro.trim().is_empty() {
                self.system.ros_distro = Some(distro.trim().to_string());
            }
        }

        if let Ok(verbosity) = std::env::var("LAUNCHVAR_VERBOSITY") {
            self.output.verbosity = match verbosity.to_lowercase().as_str() {
                "quiet" => Verbosity::Quiet,
                "verbose" => Verbosity::Verbose,
                "debug" => Verbosity::Debug,
                _ => Verbosity::Normal,
            };
        }

        self
    }
}

fn parse_flag(val: &str) -> bool {
    !matches!(val.trim().to_lowercase().as_str(), "" | "0" | "false" | "no" | "off")
}

/// Line of `key` inside `[section]`, or of the section header itself
fn key_line(content: &str, section: Option<&str>, key: &str) -> Option<usize> {
    let mut current = "";
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if let Some(header) = line.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
            current = header.trim();
            if section.is_none() && current.split('.').next() == Some(key) {
                return Some(index + 1);
            }
            continue;
        }
        let assigned = line
            .split_once('=')
            .map(|(name, _)| name.trim().trim_matches('"'));
        if section == Some(current) && assigned == Some(key) {
            return Some(index + 1);
        }
    }
    None
}

/// One insertion, deletion, substitution or swap of neighbours apart
fn is_typo_of(typed: &str, known: &str) -> bool {
    let a: Vec<char> = typed.chars().collect();
    let b: Vec<char> = known.chars().collect();
    if a == b || a.len().abs_diff(b.len()) > 1 {
        return false;
    }
    let prefix = a.iter().zip(&b).take_while(|(x, y)| x == y).count();
    let (a, b) = (&a[prefix..], &b[prefix..]);
    match (a.len(), b.len()) {
        (n, m) if n == m + 1 => a[1..] == *b,
        (n, m) if n + 1 == m => *a == b[1..],
        _ => a[1..] == b[1..] || (a.len() >= 2 && a[0] == b[1] && a[1] == b[0] && a[2..] == b[2..]),
    }
}
