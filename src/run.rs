use std::{
    fs,
    io::{self, Write as _},
    os::unix::ffi::OsStrExt as _,
    process::ExitCode,
};

use anyhow::Context as _;
use log::{debug, error};

use crate::{
    cli::ProgramArguments,
    containers::{ContainerEngine, Invocation},
    paths::PathInfo,
    script::ScriptRenderer,
    user::UserInfo,
};

/// Renders the script, writes it to the host temp directory and runs it in a
/// container (or only prints the invocation, for a dry run). The script is
/// removed afterwards, unless asked to keep it.
///
/// The returned exit code is the one of the container engine.
///
/// # Errors
///
/// Returns an error if:
///
/// * No container engine is available.
/// * The script could not be written.
/// * The container engine could not be spawned.
pub fn run(
    renderer: ScriptRenderer,
    args: &ProgramArguments,
    user: &UserInfo,
    paths: &PathInfo,
) -> anyhow::Result<ExitCode> {
    let engine = ContainerEngine::resolve(args)?;

    let script = renderer.render(user, args, paths);
    let script_path = paths.host_script_path(&script.file_name);
    debug!("Writing script to {}", script_path.display());
    fs::write(&script_path, script.content.as_bytes())
        .with_context(|| format!("failed to write the script {}", script_path.display()))?;

    let invocation = Invocation::container_run(engine, args, user, paths, &script);
    let res = if args.dry_run {
        print_invocation(&invocation)
            .context("failed to print the container command")
            .map(|()| ExitCode::SUCCESS)
    } else {
        invocation.execute()
    };

    if args.keep_script {
        println!("keeping {}", script_path.display());
    } else if let Err(e) = fs::remove_file(&script_path) {
        error!("Failed to remove the script {}: {e}", script_path.display());
    }

    res
}

/// Prints the command line of the invocation, keeping non-UTF-8 bytes.
fn print_invocation(invocation: &Invocation) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(invocation.command_line().as_bytes())?;
    stdout.write_all(b"\n")?;
    stdout.flush()
}
