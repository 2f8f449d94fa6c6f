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

use std::fmt::{Display, Formatter};

/// The number of process ids available to queued commands.
pub const MAX_PID: usize = 32768;

/// A process id, as shown by `@ps` and accepted by `@halt`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Pid(pub usize);

impl Display for Pid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Fixed capacity table of in-use process ids. Allocation scans forward from the last id
/// handed out, wrapping around, so recently freed ids are not immediately reused.
#[derive(Debug)]
pub struct PidTable {
    in_use: Vec<bool>,
    last: Option<usize>,
    live: usize,
}

impl Default for PidTable {
    fn default() -> Self {
        Self::with_capacity(MAX_PID)
    }
}

impl PidTable {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            in_use: vec![false; capacity],
            last: None,
            live: 0,
        }
    }

    /// The next free id, or `None` when every id is taken.
    pub fn allocate(&mut self) -> Option<Pid> {
        let capacity = self.in_use.len();
        if capacity == 0 || self.live == capacity {
            return None;
        }
        let start = self.last.map_or(0, |l| (l + 1) % capacity);
        let found = (0..capacity)
            .map(|offset| (start + offset) % capacity)
            .find(|&i| !self.in_use[i])?;
        self.in_use[found] = true;
        self.last = Some(found);
        self.live += 1;
        Some(Pid(found))
    }

    /// Returns `pid` to the table. Releasing a free id does nothing.
    pub fn release(&mut self, pid: Pid) {
        if let Some(slot) = self.in_use.get_mut(pid.0)
            && *slot
        {
            *slot = false;
            self.live -= 1;
        }
    }

    pub fn in_use(&self, pid: Pid) -> bool {
        self.in_use.get(pid.0).copied().unwrap_or(false)
    }

    pub fn live(&self) -> usize {
        self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn scans_forward_and_wraps() {
        let mut pids = PidTable::with_capacity(3);
        assert_eq!(pids.allocate(), Some(Pid(0)));
        assert_eq!(pids.allocate(), Some(Pid(1)));
        pids.release(Pid(0));
        // Continues past the last issued id before reusing freed ones.
        assert_eq!(pids.allocate(), Some(Pid(2)));
        assert_eq!(pids.allocate(), Some(Pid(0)));
        assert_eq!(pids.allocate(), None);
        assert_eq!(pids.live(), 3);
    }

    #[test]
    fn double_release_is_harmless() {
        let mut pids = PidTable::with_capacity(2);
        let pid = pids.allocate().unwrap();
        pids.release(pid);
        pids.release(pid);
        assert_eq!(pids.live(), 0);
        assert!(!pids.in_use(pid));
    }
}
