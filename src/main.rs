use std::{env, process::ExitCode};

use dockerusr::{
    cli::{report_usage_error, ProgramArguments},
    paths::PathInfo,
    run::run,
    script::ScriptRenderer,
    user::UserInfo,
    IMAGE_ENV,
};

fn main() -> anyhow::Result<ExitCode> {
    let env = env_logger::Env::default().filter_or("RUST_LOG", "warn");
    env_logger::init_from_env(env);

    let args = match ProgramArguments::parse_from(env::args_os(), env::var_os(IMAGE_ENV)) {
        Ok(args) => args,
        Err(e) => return Ok(report_usage_error(&e)),
    };
    let user = UserInfo::current()?;
    let paths = PathInfo::current()?;

    run(ScriptRenderer::default(), &args, &user, &paths)
}
