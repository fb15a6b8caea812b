use std::{ffi::OsString, process::ExitCode};

use clap::{CommandFactory as _, Parser};

use crate::{
    containers::{join_words, ContainerEngine},
    paths::MountLayout,
    DockerusrError,
};

const USAGE: &str = "usage: dockerusr <options> -- <command>";

/// Launch a container command as the current user.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Parser)]
#[command(name = "dockerusr", version, about, long_about = None)]
struct Cli {
    /// The container image to use. Defaults to the value of $DOCKERUSR_IMAGE.
    #[arg(short = 'i', long)]
    image: Option<OsString>,

    /// Mount and use the user's home directory.
    #[arg(short = 'u', long)]
    usehome: bool,

    /// Do not remove the container after the run.
    #[arg(short = 'k', long)]
    keepcontainer: bool,

    /// Do not remove the script after the run.
    #[arg(short = 's', long)]
    keepscript: bool,

    /// Do not run the container, just print the command.
    #[arg(short = 'd', long)]
    dryrun: bool,

    /// The name of the container.
    #[arg(short = 'n', long)]
    containername: Option<OsString>,

    /// Container engine (if not provided, is going to be autodetected).
    #[arg(short = 'e', long, value_enum)]
    engine: Option<ContainerEngine>,

    /// Where to mount the working directory inside the container.
    #[arg(long, value_enum, default_value_t = MountLayout::HostRoot)]
    mount_layout: MountLayout,
}

/// Validated command line of a single run.
#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgramArguments {
    pub image: OsString,
    /// Everything after `--`, joined with single spaces. Passed to the shell
    /// verbatim, without any quoting.
    pub command: OsString,
    pub use_home: bool,
    pub keep_container: bool,
    pub keep_script: bool,
    pub dry_run: bool,
    pub container_name: Option<OsString>,
    pub engine: Option<ContainerEngine>,
    pub mount_layout: MountLayout,
}

impl ProgramArguments {
    /// Parses the full argument vector (including the program name).
    /// `env_image` is the value of [`crate::IMAGE_ENV`], used when no image
    /// is given on the command line.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    ///
    /// * There is no `--` delimiter.
    /// * There are fewer than 3 arguments.
    /// * The options before `--` are not valid.
    /// * Nothing follows `--`.
    /// * No image was found in either source.
    pub fn parse_from<I, T>(argv: I, env_image: Option<OsString>) -> Result<Self, DockerusrError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let argv: Vec<OsString> = argv.into_iter().map(Into::into).collect();
        let delimiter = argv
            .iter()
            .position(|arg| arg == "--")
            .ok_or(DockerusrError::MissingDelimiter)?;
        if argv.len() < 3 {
            return Err(DockerusrError::TooFewArguments);
        }

        let cli = Cli::try_parse_from(&argv[..delimiter])?;
        let command = join_words(&argv[delimiter + 1..]);
        if command.is_empty() {
            return Err(DockerusrError::EmptyCommand);
        }

        let Cli {
            image,
            usehome,
            keepcontainer,
            keepscript,
            dryrun,
            containername,
            engine,
            mount_layout,
        } = cli;

        Ok(Self {
            image: resolve_image(image, env_image)?,
            command,
            use_home: usehome,
            keep_container: keepcontainer,
            keep_script: keepscript,
            dry_run: dryrun,
            container_name: containername,
            engine,
            mount_layout,
        })
    }
}

/// Picks the first non-empty image, the explicit option winning over the
/// environment.
fn resolve_image(
    option: Option<OsString>,
    env_image: Option<OsString>,
) -> Result<OsString, DockerusrError> {
    option
        .into_iter()
        .chain(env_image)
        .find(|image| !image.is_empty())
        .ok_or(DockerusrError::MissingImage)
}

/// Prints the given parsing error and returns the exit code to terminate
/// with. Errors coming from clap are printed the way clap does it (help and
/// version go to stdout) and keep clap's exit code.
#[must_use]
pub fn report_usage_error(err: &DockerusrError) -> ExitCode {
    match err {
        DockerusrError::Clap(e) => {
            // Nothing more can be reported if the terminal is gone.
            let _ = e.print();
        }
        DockerusrError::TooFewArguments => {
            eprintln!("{err}");
            eprintln!("{USAGE}");
            eprintln!("{}", Cli::command().render_help());
        }
        DockerusrError::MissingImage => eprintln!("{err}"),
        _ => {
            eprintln!("{err}");
            eprintln!("{USAGE}");
        }
    }
    ExitCode::from(usage_exit_code(err))
}

fn usage_exit_code(err: &DockerusrError) -> u8 {
    match err {
        DockerusrError::Clap(e) => u8::try_from(e.exit_code()).unwrap_or(2),
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use std::{
        ffi::{OsStr, OsString},
        os::unix::ffi::OsStrExt as _,
    };

    use clap::CommandFactory as _;
    use test_case::test_case;

    use super::*;

    fn parse(argv: &[&str]) -> Result<ProgramArguments, DockerusrError> {
        ProgramArguments::parse_from(argv.iter().copied(), None)
    }

    #[test]
    fn test_parse_defaults() {
        let args = parse(&["dockerusr", "-i", "myimg", "--", "echo", "hi"]).unwrap();
        assert_eq!(
            args,
            ProgramArguments {
                image: "myimg".into(),
                command: "echo hi".into(),
                use_home: false,
                keep_container: false,
                keep_script: false,
                dry_run: false,
                container_name: None,
                engine: None,
                mount_layout: MountLayout::HostRoot,
            }
        );
    }

    #[test]
    fn test_parse_all_options() {
        let args = parse(&[
            "dockerusr",
            "--image",
            "myimg",
            "--usehome",
            "--keepcontainer",
            "--keepscript",
            "--dryrun",
            "--containername",
            "builder",
            "--engine",
            "podman",
            "--mount-layout",
            "work-dir",
            "--",
            "make",
        ])
        .unwrap();
        assert!(args.use_home);
        assert!(args.keep_container);
        assert!(args.keep_script);
        assert!(args.dry_run);
        assert_eq!(args.container_name.as_deref(), Some(OsStr::new("builder")));
        assert_eq!(args.engine, Some(ContainerEngine::Podman));
        assert_eq!(args.mount_layout, MountLayout::WorkDir);
    }

    #[test]
    fn test_parse_short_options() {
        let args = parse(&[
            "dockerusr", "-i", "myimg", "-u", "-k", "-s", "-d", "-n", "box", "-e", "docker", "--",
            "ls",
        ])
        .unwrap();
        assert!(args.use_home);
        assert!(args.keep_container);
        assert!(args.keep_script);
        assert!(args.dry_run);
        assert_eq!(args.container_name.as_deref(), Some(OsStr::new("box")));
        assert_eq!(args.engine, Some(ContainerEngine::Docker));
    }

    #[test_case(&["dockerusr", "echo", "hi"] ; "no delimiter")]
    #[test_case(&["dockerusr"] ; "no arguments")]
    #[test_case(&["dockerusr", "-i", "myimg", "-u"] ; "options only")]
    #[test_case(&["dockerusr", "--frobnicate", "ls"] ; "unknown option")]
    #[test_case(&["dockerusr", "-i"] ; "missing option value")]
    fn test_parse_missing_delimiter(argv: &[&str]) {
        assert!(matches!(parse(argv), Err(DockerusrError::MissingDelimiter)));
    }

    #[test]
    fn test_parse_too_few_arguments() {
        assert!(matches!(
            parse(&["dockerusr", "--"]),
            Err(DockerusrError::TooFewArguments)
        ));
    }

    #[test]
    fn test_parse_empty_command() {
        assert!(matches!(
            parse(&["dockerusr", "-i", "myimg", "--"]),
            Err(DockerusrError::EmptyCommand)
        ));
    }

    #[test]
    fn test_parse_unknown_option() {
        assert!(matches!(
            parse(&["dockerusr", "-i", "myimg", "--frobnicate", "--", "ls"]),
            Err(DockerusrError::Clap(_))
        ));
    }

    #[test]
    fn test_parse_command_is_verbatim() {
        let args = parse(&[
            "dockerusr",
            "-i",
            "myimg",
            "--",
            "echo",
            "$HOME",
            "&&",
            "ls -la",
            "|",
            "wc",
            "--",
            "-l",
        ])
        .unwrap();
        assert_eq!(args.command, "echo $HOME && ls -la | wc -- -l");
    }

    #[test]
    fn test_parse_command_keeps_non_utf8_bytes() {
        let argv = [
            OsStr::new("dockerusr"),
            OsStr::new("-i"),
            OsStr::new("myimg"),
            OsStr::new("--"),
            OsStr::new("cat"),
            OsStr::from_bytes(b"caf\xe9.txt"),
        ];
        let args = ProgramArguments::parse_from(argv, None).unwrap();
        assert_eq!(args.command.as_bytes(), b"cat caf\xe9.txt");
    }

    #[test]
    fn test_parse_options_after_delimiter_belong_to_command() {
        let args = parse(&["dockerusr", "-i", "myimg", "--", "ls", "-k", "-d"]).unwrap();
        assert_eq!(args.command, "ls -k -d");
        assert!(!args.keep_container);
        assert!(!args.dry_run);
    }

    #[test_case(Some("flag"), Some("env"), Some("flag") ; "option wins")]
    #[test_case(None, Some("env"), Some("env") ; "env fallback")]
    #[test_case(Some(""), Some("env"), Some("env") ; "empty option falls back")]
    #[test_case(None, Some(""), None ; "empty env")]
    #[test_case(None, None, None ; "neither")]
    fn test_resolve_image(option: Option<&str>, env: Option<&str>, expected: Option<&str>) {
        let image = resolve_image(option.map(OsString::from), env.map(OsString::from));
        match expected {
            Some(expected) => assert_eq!(image.unwrap(), expected),
            None => assert!(matches!(image, Err(DockerusrError::MissingImage))),
        }
    }

    #[test]
    fn test_parse_image_from_env() {
        let args = ProgramArguments::parse_from(
            ["dockerusr", "-u", "--", "ls"],
            Some(OsString::from("envimg")),
        )
        .unwrap();
        assert_eq!(args.image, "envimg");
    }

    #[test]
    fn test_parse_missing_image() {
        assert!(matches!(
            parse(&["dockerusr", "-u", "--", "ls"]),
            Err(DockerusrError::MissingImage)
        ));
    }

    #[test_case(&["dockerusr", "--"], 1 ; "too few arguments")]
    #[test_case(&["dockerusr", "ls"], 1 ; "missing delimiter")]
    #[test_case(&["dockerusr", "--frobnicate", "--", "ls"], 2 ; "unknown option")]
    #[test_case(&["dockerusr", "--help", "--", "ls"], 0 ; "help")]
    fn test_usage_exit_code(argv: &[&str], expected: u8) {
        let err = parse(argv).unwrap_err();
        assert_eq!(usage_exit_code(&err), expected);
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }
}
