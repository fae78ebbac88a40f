//! Host system port
//!
//! The interpreter reaches the outside world only through
//! [`SystemInterface`]: environment variables, package lookup, launch file
//! parsing and the file/command content behind `<param>` and `<rosparam>`.
//!
//! Implementations:
//! - `LocalSystem` - real filesystem and environment
//! - `MemorySystem` - in-memory, for tests and embedding

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::rc::Rc;

use tracing::debug;

use crate::config::SystemConfig;
use crate::error::{LaunchError, LaunchResult};
use crate::parser::{parse_launch_file, parse_launch_str};
use crate::tree::Tag;

/// Distribution assumed when none is configured
pub const DEFAULT_ROS_DISTRO: &str = "melodic";

/// Abstract system interface
pub trait SystemInterface {
    fn ros_distro(&self) -> String;

    fn get_environment_variable(&self, name: &str) -> Option<String>;

    /// Directory of a package, if it can be found
    fn get_package_path(&self, name: &str) -> Option<PathBuf>;

    /// Parse tree of a launch file; parsed at most once per path
    fn request_parse_tree(&self, path: &Path) -> LaunchResult<Rc<Tag>>;

    fn read_text_file(&self, path: &Path) -> io::Result<String>;

    fn read_binary_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Captured standard output of a shell command
    fn execute_command(&self, cmd: &str) -> io::Result<String>;
}

/// Parse trees by path, never invalidated
#[derive(Debug, Default)]
struct TreeCache {
    trees: RefCell<HashMap<PathBuf, Rc<Tag>>>,
}

impl TreeCache {
    fn get_or_parse(
        &self,
        path: &Path,
        parse: impl FnOnce() -> LaunchResult<Tag>,
    ) -> LaunchResult<Rc<Tag>> {
        if let Some(tree) = self.trees.borrow().get(path) {
            return Ok(Rc::clone(tree));
        }
        debug!("parsing {}", path.display());
        let tree = Rc::new(parse()?);
        self.trees
            .borrow_mut()
            .insert(path.to_path_buf(), Rc::clone(&tree));
        Ok(tree)
    }

    fn len(&self) -> usize {
        self.trees.borrow().len()
    }
}

/// Real filesystem, environment and (optionally) shell
#[derive(Debug, Default)]
pub struct LocalSystem {
    config: SystemConfig,
    cache: TreeCache,
}

impl LocalSystem {
    pub fn new(config: SystemConfig) -> Self {
        Self {
            config,
            cache: TreeCache::default(),
        }
    }

    fn workspace(&self) -> Option<PathBuf> {
        self.config
            .workspace
            .clone()
            .or_else(|| env::var_os("ROS_WORKSPACE").map(PathBuf::from))
    }

    fn ros_root_parent(&self) -> Option<PathBuf> {
        env::var_os("ROS_ROOT").and_then(|root| Path::new(&root).parent().map(Path::to_path_buf))
    }

    /// Directory files must live under in strict mode
    fn safe_dir(&self) -> Option<PathBuf> {
        self.workspace().or_else(|| self.ros_root_parent())
    }

    fn check_access(&self, path: &Path) -> Result<(), PathBuf> {
        if !self.config.strict {
            return Ok(());
        }
        match self.safe_dir() {
            Some(root) if !path.starts_with(&root) => Err(root),
            _ => Ok(()),
        }
    }

    fn check_file_access(&self, path: &Path) -> io::Result<()> {
        self.check_access(path).map_err(|root| {
            io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is outside of {}", path.display(), root.display()),
            )
        })
    }
}

fn package_dir(parent: &Path, name: &str) -> Option<PathBuf> {
    let dir = parent.join(name);
    dir.join("package.xml").is_file().then_some(dir)
}

impl SystemInterface for LocalSystem {
    fn ros_distro(&self) -> String {
        self.config
            .ros_distro
            .clone()
            .or_else(|| env::var("ROS_DISTRO").ok())
            .unwrap_or_else(|| DEFAULT_ROS_DISTRO.to_string())
    }

    fn get_environment_variable(&self, name: &str) -> Option<String> {
        env::var(name).ok()
    }

    fn get_package_path(&self, name: &str) -> Option<PathBuf> {
        if let Some(path) = self.config.packages.get(name) {
            return Some(path.clone());
        }
        if let Some(dir) = self
            .workspace()
            .and_then(|ws| package_dir(&ws.join("src"), name))
        {
            return Some(dir);
        }
        self.ros_root_parent()
            .and_then(|parent| package_dir(&parent, name))
    }

    fn request_parse_tree(&self, path: &Path) -> LaunchResult<Rc<Tag>> {
        self.check_access(path)
            .map_err(|root| LaunchError::AccessDenied {
                path: path.to_path_buf(),
                root,
            })?;
        self.cache.get_or_parse(path, || parse_launch_file(path))
    }

    fn read_text_file(&self, path: &Path) -> io::Result<String> {
        self.check_file_access(path)?;
        fs::read_to_string(path)
    }

    fn read_binary_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.check_file_access(path)?;
        fs::read(path)
    }

    fn execute_command(&self, cmd: &str) -> io::Result<String> {
        if !self.config.allow_commands {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, cmd.to_string()));
        }
        debug!("running command: {}", cmd);
        let output = Command::new("sh").arg("-c").arg(cmd).output()?;
        if !output.status.success() {
            return Err(io::Error::other(format!(
                "'{}' exited with {}: {}",
                cmd,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// In-memory system
#[derive(Debug, Default)]
pub struct MemorySystem {
    distro: Option<String>,
    files: BTreeMap<PathBuf, String>,
    binaries: BTreeMap<PathBuf, Vec<u8>>,
    packages: BTreeMap<String, PathBuf>,
    env: BTreeMap<String, String>,
    commands: BTreeMap<String, String>,
    cache: TreeCache,
}

impl MemorySystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_distro(mut self, distro: impl Into<String>) -> Self {
        self.distro = Some(distro.into());
        self
    }

    /// Add a text file (launch files included)
    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    pub fn with_binary(mut self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        self.binaries.insert(path.into(), content.into());
        self
    }

    pub fn with_package(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.packages.insert(name.into(), path.into());
        self
    }

    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }

    /// Register the output of a command; unregistered commands fail
    pub fn with_command(mut self, cmd: impl Into<String>, output: impl Into<String>) -> Self {
        self.commands.insert(cmd.into(), output.into());
        self
    }

    /// Number of distinct launch files parsed so far
    pub fn parsed_trees(&self) -> usize {
        self.cache.len()
    }

    fn not_found(path: &Path) -> io::Error {
        io::Error::new(io::ErrorKind::NotFound, path.display().to_string())
    }
}

impl SystemInterface for MemorySystem {
    fn ros_distro(&self) -> String {
        self.distro
            .clone()
            .unwrap_or_else(|| DEFAULT_ROS_DISTRO.to_string())
    }

    fn get_environment_variable(&self, name: &str) -> Option<String> {
        self.env.get(name).cloned()
    }

    fn get_package_path(&self, name: &str) -> Option<PathBuf> {
        self.packages.get(name).cloned()
    }

    fn request_parse_tree(&self, path: &Path) -> LaunchResult<Rc<Tag>> {
        self.cache.get_or_parse(path, || {
            let content = self.files.get(path).ok_or_else(|| Self::not_found(path))?;
            parse_launch_str(content, path)
        })
    }

    fn read_text_file(&self, path: &Path) -> io::Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| Self::not_found(path))
    }

    fn read_binary_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.binaries
            .get(path)
            .cloned()
            .or_else(|| self.files.get(path).map(|text| text.clone().into_bytes()))
            .ok_or_else(|| Self::not_found(path))
    }

    fn execute_command(&self, cmd: &str) -> io::Result<String> {
        self.commands
            .get(cmd)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::PermissionDenied, cmd.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_system_parses_once() {
        let system = MemorySystem::new().with_file("/a.launch", "<launch/>");
        let first = system.request_parse_tree(Path::new("/a.launch")).unwrap();
        let second = system.request_parse_tree(Path::new("/a.launch")).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(system.parsed_trees(), 1);
    }

    #[test]
    fn test_memory_system_missing_file() {
        let system = MemorySystem::new();
        assert!(matches!(
            system.request_parse_tree(Path::new("/missing.launch")),
            Err(LaunchError::Io(ref e)) if e.kind() == io::ErrorKind::NotFound
        ));
        assert!(system.read_text_file(Path::new("/missing.yaml")).is_err());
        assert!(system.execute_command("ls").is_err());
    }

    #[test]
    fn test_local_system_packages_from_config() {
        let dir = tempdir().unwrap();
        let pkg = dir.path().join("src").join("my_pkg");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join("package.xml"), "<package/>").unwrap();
        fs::create_dir_all(dir.path().join("src").join("not_a_pkg")).unwrap();

        let mut config = SystemConfig {
            workspace: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        config
            .packages
            .insert("pinned".to_string(), PathBuf::from("/opt/pinned"));
        let system = LocalSystem::new(config);

        assert_eq!(system.get_package_path("my_pkg"), Some(pkg));
        assert_eq!(system.get_package_path("pinned"), Some(PathBuf::from("/opt/pinned")));
        assert_eq!(system.get_package_path("not_a_pkg"), None);
    }

    #[test]
    fn test_local_system_strict_mode() {
        let ws = tempdir().unwrap();
        let outside = tempdir().unwrap();
        let file = outside.path().join("x.launch");
        fs::write(&file, "<launch/>").unwrap();

        let system = LocalSystem::new(SystemConfig {
            workspace: Some(ws.path().to_path_buf()),
            strict: true,
            ..Default::default()
        });

        assert!(matches!(
            system.request_parse_tree(&file),
            Err(LaunchError::AccessDenied { .. })
        ));
        let err = system.read_text_file(&file).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_local_system_commands_disabled_by_default() {
        let system = LocalSystem::default();
        let err = system.execute_command("echo hi").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_local_system_configured_distro() {
        let system = LocalSystem::new(SystemConfig {
            ros_distro: Some("noetic".to_string()),
            ..Default::default()
        });
        assert_eq!(system.ros_distro(), "noetic");
    }
}
