// Helper class for watching file descriptors
//
// The watcher never owns the descriptors it is given. The
// caller (usually the compositor connection) keeps them
// alive for as long as they are registered.
//
// Austin Shafer - 2020
extern crate nix;

use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use std::convert::TryFrom;
use std::os::fd::BorrowedFd;
use std::os::unix::io::RawFd;

// A file descriptor watcher
pub struct FdWatch {
    // fds to watch for readability
    fdw_fds: Vec<RawFd>,
}

impl FdWatch {
    pub fn new() -> FdWatch {
        FdWatch {
            fdw_fds: Vec::new(),
        }
    }

    pub fn add_fd(&mut self, fd: RawFd) {
        if !self.fdw_fds.contains(&fd) {
            self.fdw_fds.push(fd);
        }
    }

    pub fn remove_fd(&mut self, fd: RawFd) {
        self.fdw_fds.retain(|f| *f != fd);
    }

    // timeout in ms, None blocks
    // returns true if something is ready to be read
    pub fn wait_for_events(&mut self, timeout: Option<usize>) -> bool {
        if self.fdw_fds.is_empty() {
            return false;
        }

        // The fds are registered by callers that guarantee they stay
        // open while they are in this list
        let mut pollfds: Vec<PollFd> = self
            .fdw_fds
            .iter()
            .map(|fd| PollFd::new(unsafe { BorrowedFd::borrow_raw(*fd) }, PollFlags::POLLIN))
            .collect();

        let timeout = match timeout {
            Some(ms) => u16::try_from(ms)
                .map(PollTimeout::from)
                .unwrap_or(PollTimeout::MAX),
            None => PollTimeout::NONE,
        };

        match poll(&mut pollfds, timeout) {
            Ok(n) => n > 0,
            Err(_) => false,
        }
    }
}
