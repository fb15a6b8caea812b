use nix::errno::Errno;
use thiserror::Error;

pub mod cli;
pub mod containers;
pub mod paths;
pub mod run;
pub mod script;
pub mod user;

/// Environment variable holding the fallback image name.
pub const IMAGE_ENV: &str = "DOCKERUSR_IMAGE";

#[derive(Debug, Error)]
pub enum DockerusrError {
    #[error("need -- delimiter between options and command")]
    MissingDelimiter,
    #[error("need more arguments")]
    TooFewArguments,
    #[error("no command was given after the -- delimiter")]
    EmptyCommand,
    #[error("the -i/--image option was not set and no value for $DOCKERUSR_IMAGE")]
    MissingImage,
    #[error(transparent)]
    Clap(#[from] clap::Error),
    #[error("failed to look up the user with uid {0}: {1}")]
    UserLookup(u32, Errno),
    #[error("no user with uid {0} exists in the user database")]
    UnknownUser(u32),
    #[error("no supported container engine (docker, podman) was found")]
    ContainerEngineNotFound,
}
