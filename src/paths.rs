use std::{
    env,
    path::{Component, Path, PathBuf},
};

use anyhow::Context as _;
use clap::ValueEnum;

/// Host directory where the generated scripts are written.
pub const HOST_TMP_DIR: &str = "/tmp";
/// Mount point of [`HOST_TMP_DIR`] inside the container.
pub const TMP_MOUNT_IN_CONTAINER: &str = "/host_tmp";
/// Prefix under which the host working directory is mirrored inside the
/// container, when using [`MountLayout::HostRoot`].
pub const ROOT_MOUNT_IN_CONTAINER: &str = "/host_root";
/// Mount point of the host working directory inside the container, when
/// using [`MountLayout::WorkDir`].
pub const WORK_DIR_IN_CONTAINER: &str = "/work_dir";

/// Where the host working directory ends up inside the container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum MountLayout {
    /// Mirror the absolute host path under `/host_root`.
    #[default]
    HostRoot,
    /// Mount at the fixed `/work_dir` path.
    WorkDir,
}

/// Host and container paths used for a single run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathInfo {
    pub host_tmp_dir: PathBuf,
    pub cwd: PathBuf,
    pub tmp_mount_in_container: PathBuf,
    pub root_mount_in_container: PathBuf,
}

impl PathInfo {
    /// Returns the path info for the given working directory, with all the
    /// other paths set to their fixed values.
    #[must_use]
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            host_tmp_dir: PathBuf::from(HOST_TMP_DIR),
            cwd: cwd.into(),
            tmp_mount_in_container: PathBuf::from(TMP_MOUNT_IN_CONTAINER),
            root_mount_in_container: PathBuf::from(ROOT_MOUNT_IN_CONTAINER),
        }
    }

    /// Returns the path info for the working directory of the current
    /// process.
    ///
    /// # Errors
    ///
    /// Returns an error if the current working directory is not accessible.
    pub fn current() -> anyhow::Result<Self> {
        let cwd = env::current_dir().context("failed to determine the working directory")?;
        Ok(Self::new(cwd))
    }

    /// Returns the path of the working directory inside the container.
    #[must_use]
    pub fn container_cwd(&self, layout: MountLayout) -> PathBuf {
        match layout {
            MountLayout::HostRoot => nest(&self.root_mount_in_container, &self.cwd),
            MountLayout::WorkDir => PathBuf::from(WORK_DIR_IN_CONTAINER),
        }
    }

    /// Returns the path of the given script file inside the container.
    #[must_use]
    pub fn container_script_path(&self, file_name: &str) -> PathBuf {
        self.tmp_mount_in_container.join(file_name)
    }

    /// Returns the path of the given script file on the host.
    #[must_use]
    pub fn host_script_path(&self, file_name: &str) -> PathBuf {
        self.host_tmp_dir.join(file_name)
    }
}

/// Appends `path` to `prefix`, even if `path` is absolute.
fn nest(prefix: &Path, path: &Path) -> PathBuf {
    let mut nested = prefix.to_path_buf();
    for component in path.components() {
        // Pushing an absolute path replaces the whole buffer.
        if !matches!(component, Component::RootDir) {
            nested.push(component);
        }
    }
    nested
}
