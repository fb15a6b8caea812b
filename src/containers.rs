use std::{
    ffi::{OsStr, OsString},
    os::unix::process::ExitStatusExt as _,
    path::PathBuf,
    process::{Command, ExitCode, ExitStatus, Stdio},
};

use clap::ValueEnum;
use log::{info, warn};
use which::which;

use crate::{
    cli::ProgramArguments, paths::PathInfo, script::RenderedScript, user::UserInfo,
    DockerusrError,
};

/// Supported container engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ContainerEngine {
    Docker,
    Podman,
}

impl ContainerEngine {
    /// Name of the engine's binary.
    #[must_use]
    pub fn binary(self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Podman => "podman",
        }
    }

    /// Autodetects an available container engine.
    ///
    /// # Errors
    ///
    /// Returns an error if no supported container engine is found, or if
    /// looking it up failed for a reason other than its absence.
    pub fn autodetect() -> anyhow::Result<Self> {
        for engine in [Self::Docker, Self::Podman] {
            match which(engine.binary()) {
                Ok(_) => return Ok(engine),
                Err(e) => {
                    if !matches!(e, which::Error::CannotFindBinaryPath) {
                        return Err(e.into());
                    }
                }
            }
        }
        Err(DockerusrError::ContainerEngineNotFound.into())
    }

    /// Returns the explicitly selected engine, or autodetects one. A dry run
    /// never fails here and falls back to docker, since nothing is executed.
    ///
    /// # Errors
    ///
    /// Returns an error if no engine was selected and autodetection failed
    /// outside of a dry run.
    pub fn resolve(args: &ProgramArguments) -> anyhow::Result<Self> {
        match args.engine {
            Some(engine) => Ok(engine),
            None if args.dry_run => Ok(Self::autodetect().unwrap_or(Self::Docker)),
            None => Self::autodetect(),
        }
    }
}

/// A host path mounted into the container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Volume {
    pub host: PathBuf,
    pub container: PathBuf,
}

impl Volume {
    #[must_use]
    pub fn new(host: impl Into<PathBuf>, container: impl Into<PathBuf>) -> Self {
        Self {
            host: host.into(),
            container: container.into(),
        }
    }

    /// Returns the `host:container` argument of `-v`.
    #[must_use]
    pub fn to_os_string(&self) -> OsString {
        let mut volume = self.host.clone().into_os_string();
        volume.push(":");
        volume.push(&self.container);
        volume
    }
}

/// Returns the volumes of a run:
///
/// * The host temp directory, so the script is reachable.
/// * The working directory, placed according to the mount layout.
/// * The home directory at the identical path, if requested.
#[must_use]
pub fn volumes(args: &ProgramArguments, user: &UserInfo, paths: &PathInfo) -> Vec<Volume> {
    let mut volumes = vec![
        Volume::new(&paths.host_tmp_dir, &paths.tmp_mount_in_container),
        Volume::new(&paths.cwd, paths.container_cwd(args.mount_layout)),
    ];
    if args.use_home {
        volumes.push(Volume::new(&user.home_dir, &user.home_dir));
    }
    volumes
}

/// A container engine invocation, kept as a list of words. It is rendered
/// and executed as a single shell command line, without any quoting.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Invocation(Vec<OsString>);

impl Invocation {
    /// Builds the `run` invocation executing the given script.
    #[must_use]
    pub fn container_run(
        engine: ContainerEngine,
        args: &ProgramArguments,
        user: &UserInfo,
        paths: &PathInfo,
        script: &RenderedScript,
    ) -> Self {
        let mut invocation = Self::default();
        invocation.push(engine.binary());
        invocation.push("run");
        if let Some(ref name) = args.container_name {
            invocation.push("--name");
            invocation.push(name);
        }
        if !args.keep_container {
            invocation.push("--rm");
        }
        for volume in volumes(args, user, paths) {
            invocation.push("-v");
            invocation.push(volume.to_os_string());
        }
        invocation.push("-ti");
        invocation.push(&args.image);
        invocation.push(script.interpreter);
        invocation.push(paths.container_script_path(&script.file_name));
        invocation
    }

    pub fn push<S: AsRef<OsStr>>(&mut self, word: S) {
        self.0.push(word.as_ref().to_owned());
    }

    #[must_use]
    pub fn words(&self) -> &[OsString] {
        &self.0
    }

    /// Returns the words joined with single spaces.
    #[must_use]
    pub fn command_line(&self) -> OsString {
        join_words(&self.0)
    }

    /// Runs the invocation through `sh -c`, inheriting the standard streams,
    /// and waits for it to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if the shell could not be spawned.
    pub fn execute(&self) -> anyhow::Result<ExitCode> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(self.command_line())
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        info!("Running container with command: {cmd:?}");

        let status = cmd.status()?;
        if !status.success() {
            warn!("Container command exited unsuccessfully: {status}");
        }
        Ok(ExitCode::from(exit_code(status)))
    }
}

/// Joins the given words with single spaces, keeping their bytes intact.
pub(crate) fn join_words<S: AsRef<OsStr>>(words: &[S]) -> OsString {
    let mut joined = OsString::new();
    for (i, word) in words.iter().enumerate() {
        if i > 0 {
            joined.push(" ");
        }
        joined.push(word);
    }
    joined
}

/// Converts the status of a finished child into our own exit code. Children
/// killed by a signal map to `128 + signal`, the way shells report them.
fn exit_code(status: ExitStatus) -> u8 {
    let code = match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => 1,
    };
    // Exit codes outside of 0-255 are not representable, report a generic
    // failure for them.
    u8::try_from(code).unwrap_or(1)
}
