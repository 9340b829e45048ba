// SPDX-License-Identifier: GPL-3.0-only
//! Process level helpers: detaching and dropping root

use std::io;

use crate::error::{AppError, Result};

const UNPRIVILEGED_USER: &std::ffi::CStr = c"nobody";

/// Detach from the terminal and continue in the background
///
/// Standard streams are redirected to /dev/null and the working directory
/// becomes `/`, so anything after this only reaches the journal.
pub fn detach() -> Result<()> {
    if unsafe { libc::daemon(0, 0) } != 0 {
        return Err(AppError::Daemonize(io::Error::last_os_error()));
    }
    Ok(())
}

/// Switch to the `nobody` user once the hardware has been claimed
///
/// Port access granted with ioperm survives the switch. Failure is not
/// fatal, the daemon keeps running with its current identity.
pub fn drop_privileges() {
    let pw = unsafe { libc::getpwnam(UNPRIVILEGED_USER.as_ptr()) };
    if pw.is_null() {
        warn!("No '{}' user, keeping current privileges", UNPRIVILEGED_USER.to_string_lossy());
        return;
    }

    let (uid, gid) = unsafe { ((*pw).pw_uid, (*pw).pw_gid) };

    if unsafe { libc::setgid(gid) } != 0 {
        warn!("setgid({}) failed: {}", gid, io::Error::last_os_error());
    }
    if unsafe { libc::setuid(uid) } != 0 {
        warn!("setuid({}) failed: {}", uid, io::Error::last_os_error());
        return;
    }

    debug!("Running as uid {} gid {}", uid, gid);
}

pub fn is_root() -> bool {
    unsafe { libc::getuid() == 0 }
}
