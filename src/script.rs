use std::{
    ffi::{OsStr, OsString},
    os::unix::ffi::OsStrExt as _,
    path::Path,
};

use sha2::{Digest as _, Sha256};

use crate::{cli::ProgramArguments, paths::PathInfo, user::UserInfo};

/// Strategies of rendering the script executed inside the container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScriptRenderer {
    /// Bash script creating the user with `groupadd` and `useradd` and
    /// dropping privileges with `sudo`.
    #[default]
    BashSudo,
}

impl ScriptRenderer {
    #[must_use]
    pub fn interpreter(self) -> &'static str {
        match self {
            Self::BashSudo => "/bin/bash",
        }
    }

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::BashSudo => "sh",
        }
    }

    /// Renders the script. The result depends only on the given arguments.
    #[must_use]
    pub fn render(
        self,
        user: &UserInfo,
        args: &ProgramArguments,
        paths: &PathInfo,
    ) -> RenderedScript {
        let content = match self {
            Self::BashSudo => BashSudoScript {
                user,
                create_home: !args.use_home,
                cwd: &paths.container_cwd(args.mount_layout),
                command: &args.command,
            }
            .render(),
        };
        let file_name = script_file_name(&user.user_name, &content, self.extension());
        RenderedScript {
            content,
            file_name,
            interpreter: self.interpreter(),
        }
    }
}

/// A script ready to be written to the host temp directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedScript {
    pub content: OsString,
    pub file_name: String,
    pub interpreter: &'static str,
}

struct BashSudoScript<'a> {
    user: &'a UserInfo,
    /// When the home directory is not mounted, `useradd` has to create it.
    create_home: bool,
    cwd: &'a Path,
    command: &'a OsStr,
}

impl BashSudoScript<'_> {
    /// Fills the template. Paths and the command are copied byte by byte.
    fn render(&self) -> OsString {
        let Self {
            user:
                UserInfo {
                    user_name,
                    user_id,
                    group_id,
                    home_dir,
                },
            create_home,
            cwd,
            command,
        } = self;

        let mut script = OsString::from("#!/usr/bin/env bash\n");
        script.push(format!("groupadd -g {group_id} {user_name}\n"));
        script.push(format!("useradd -u {user_id} -g {group_id} "));
        if *create_home {
            script.push("-m -d ");
            script.push(home_dir);
            script.push(" ");
        }
        script.push(format!("{user_name}\n"));
        script.push("cd ");
        script.push(cwd);
        script.push("\n");
        script.push(format!("sudo -u {user_name} HOME="));
        script.push(home_dir);
        script.push(" ");
        script.push(command);
        script.push("\n");
        script
    }
}

/// Returns `dockerusr_run_script_<user>_<sha256 of content>.<extension>`.
fn script_file_name(user_name: &str, content: &OsStr, extension: &str) -> String {
    let hash = hex::encode(Sha256::digest(content.as_bytes()));
    format!("dockerusr_run_script_{user_name}_{hash}.{extension}")
}
