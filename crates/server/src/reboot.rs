// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Carrying live sockets across an in-place reboot: the state written before `exec`, and read
//! back by the new process image.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::os::fd::RawFd;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::Command;

use demuse_common::Dbref;
use eyre::{WrapErr, eyre};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::args::RESTORE_REBOOT_FLAG;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedDescriptor {
    pub fd: RawFd,
    pub connected_at: i64,
    pub last_time: i64,
    pub player: Dbref,
    pub addr: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebootState {
    /// When the server first came up; uptime survives reboots.
    pub started_at: i64,
    pub listener_fd: RawFd,
    pub descriptors: Vec<SavedDescriptor>,
}

impl RebootState {
    pub fn write(&self, path: &Path) -> Result<(), eyre::Report> {
        let file = File::create(path)
            .wrap_err_with(|| format!("Unable to create reboot file {}", path.display()))?;
        serde_json::to_writer(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Reads the state and removes the file, so a crash later cannot restore stale sockets.
    pub fn read(path: &Path) -> Result<Self, eyre::Report> {
        let file = File::open(path)
            .wrap_err_with(|| format!("Unable to open reboot file {}", path.display()))?;
        let state: RebootState = serde_json::from_reader(BufReader::new(file))
            .wrap_err("Malformed reboot file")?;
        std::fs::remove_file(path)?;
        Ok(state)
    }
}

/// Lets `fd` survive `exec`.
pub fn keep_on_exec(fd: RawFd) -> io::Result<()> {
    // SAFETY: fcntl on a descriptor we own; F_GETFD/F_SETFD take no pointers.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFD, flags & !libc::FD_CLOEXEC) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Replaces this process with a fresh copy of the binary, same arguments plus the restore flag.
/// Only returns on failure.
pub fn exec_self() -> eyre::Report {
    let exe = match std::env::current_exe() {
        Ok(exe) => exe,
        Err(e) => return eyre!("Cannot locate own executable: {e}"),
    };
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    if !args.iter().any(|a| a == RESTORE_REBOOT_FLAG) {
        args.push(RESTORE_REBOOT_FLAG.to_string());
    }
    info!(exe = %exe.display(), "Re-executing");
    let err = Command::new(&exe).args(&args).exec();
    eyre!("exec of {} failed: {err}", exe.display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::net::TcpListener;
    use std::os::fd::AsRawFd;

    #[test]
    fn state_survives_the_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reboot.state");
        let state = RebootState {
            started_at: 1_700_000_000,
            listener_fd: 3,
            descriptors: vec![SavedDescriptor {
                fd: 7,
                connected_at: 1_700_000_100,
                last_time: 1_700_000_200,
                player: Dbref(12),
                addr: "10.0.0.1".to_string(),
            }],
        };
        state.write(&path).unwrap();
        assert_eq!(RebootState::read(&path).unwrap(), state);
        assert!(!path.exists());
        assert!(RebootState::read(&path).is_err());
    }

    #[test]
    fn close_on_exec_is_cleared() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let fd = listener.as_raw_fd();
        let before = unsafe { libc::fcntl(fd, libc::F_GETFD) };
        assert_ne!(before & libc::FD_CLOEXEC, 0);
        keep_on_exec(fd).unwrap();
        let after = unsafe { libc::fcntl(fd, libc::F_GETFD) };
        assert_eq!(after & libc::FD_CLOEXEC, 0);
    }
}
