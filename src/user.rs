use std::path::PathBuf;

use log::debug;
use nix::unistd::{Gid, Uid, User};

use crate::DockerusrError;

/// Identity of the user invoking the tool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserInfo {
    pub user_name: String,
    pub user_id: u32,
    pub group_id: u32,
    pub home_dir: PathBuf,
}

impl UserInfo {
    /// Resolves the effective UID and GID of the current process against the
    /// user database.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails or there is no database entry for
    /// the effective UID.
    pub fn current() -> Result<Self, DockerusrError> {
        let uid = Uid::effective();
        let gid = Gid::effective();
        let user = User::from_uid(uid)
            .map_err(|e| DockerusrError::UserLookup(uid.as_raw(), e))?
            .ok_or(DockerusrError::UnknownUser(uid.as_raw()))?;

        let user_info = Self {
            user_name: user.name,
            user_id: uid.as_raw(),
            group_id: gid.as_raw(),
            home_dir: user.dir,
        };
        debug!("Resolved user: {user_info:?}");
        Ok(user_info)
    }
}
