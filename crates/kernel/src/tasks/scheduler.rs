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

use std::collections::BTreeMap;

use ahash::AHashMap;
use demuse_common::Dbref;

use crate::arena::ArenaKey;
use crate::tasks::pid::{Pid, PidTable};

/// One pending command.
#[derive(Debug)]
pub struct ScheduledCommand {
    pub pid: Pid,
    /// The actor the command runs as, and who pays for it.
    pub player: Dbref,
    pub cause: Dbref,
    /// Lower runs sooner.
    pub priority: i32,
    /// Absolute time at which the command becomes due.
    pub wake: i64,
    pub command: String,
    /// The `%0`-`%9` strings captured when the command was queued, held in the arena.
    pub(crate) env: [Option<ArenaKey>; 10],
}

/// Queue order: priority, then wake time, then insertion order.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
struct QueueKey {
    priority: i32,
    wake: i64,
    seq: u64,
}

/// The ordered queue of pending commands, its process id table, and the per-owner counts of
/// outstanding commands.
#[derive(Debug, Default)]
pub struct Scheduler {
    queue: BTreeMap<QueueKey, ScheduledCommand>,
    by_pid: AHashMap<Pid, QueueKey>,
    pids: PidTable,
    outstanding: AHashMap<Dbref, i64>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scheduler with a smaller process id table.
    pub fn with_pid_capacity(capacity: usize) -> Self {
        Self {
            pids: PidTable::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Is anything queued at all, due or not?
    pub fn test_top(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub(crate) fn allocate_pid(&mut self) -> Option<Pid> {
        self.pids.allocate()
    }

    /// Inserts an entry whose pid was obtained from `allocate_pid`.
    pub(crate) fn insert(&mut self, command: ScheduledCommand) {
        let key = QueueKey {
            priority: command.priority,
            wake: command.wake,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.by_pid.insert(command.pid, key);
        self.queue.insert(key, command);
    }

    /// Unlinks an entry and frees its pid. The caller owns the entry's environment.
    pub(crate) fn remove(&mut self, pid: Pid) -> Option<ScheduledCommand> {
        let key = self.by_pid.remove(&pid)?;
        let command = self.queue.remove(&key)?;
        self.pids.release(pid);
        Some(command)
    }

    pub fn get(&self, pid: Pid) -> Option<&ScheduledCommand> {
        self.by_pid.get(&pid).and_then(|key| self.queue.get(key))
    }

    /// The first entry, in queue order, that is due at `now`.
    pub fn first_due(&self, now: i64) -> Option<Pid> {
        self.queue
            .values()
            .find(|c| c.wake <= now)
            .map(|c| c.pid)
    }

    /// The head of the queue, if it is due and no less urgent than `priority`.
    pub fn first_due_at(&self, now: i64, priority: i32) -> Option<Pid> {
        self.queue
            .values()
            .next()
            .filter(|c| c.priority <= priority && c.wake <= now)
            .map(|c| c.pid)
    }

    /// The earliest wake time of anything queued.
    pub fn next_wake(&self) -> Option<i64> {
        self.queue.values().map(|c| c.wake).min()
    }

    /// Entries in queue order.
    pub fn iter(&self) -> impl Iterator<Item = &ScheduledCommand> {
        self.queue.values()
    }

    pub(crate) fn pids_where(&self, pred: impl Fn(&ScheduledCommand) -> bool) -> Vec<Pid> {
        self.queue
            .values()
            .filter(|c| pred(c))
            .map(|c| c.pid)
            .collect()
    }

    /// How many commands `owner`'s objects have outstanding.
    pub fn outstanding(&self, owner: Dbref) -> i64 {
        self.outstanding.get(&owner).copied().unwrap_or(0)
    }

    pub(crate) fn adjust_outstanding(&mut self, owner: Dbref, delta: i64) -> i64 {
        let count = self.outstanding.entry(owner).or_insert(0);
        *count = (*count + delta).max(0);
        let count = *count;
        if count == 0 {
            self.outstanding.remove(&owner);
        }
        count
    }

    pub(crate) fn reset_outstanding(&mut self, owner: Dbref) {
        self.outstanding.remove(&owner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn command(sched: &mut Scheduler, priority: i32, wake: i64, text: &str) -> Pid {
        let pid = sched.allocate_pid().unwrap();
        sched.insert(ScheduledCommand {
            pid,
            player: Dbref(2),
            cause: Dbref(2),
            priority,
            wake,
            command: text.to_string(),
            env: Default::default(),
        });
        pid
    }

    #[test]
    fn priority_then_wake_then_fifo() {
        let mut sched = Scheduler::new();
        let late = command(&mut sched, 1, 0, "late");
        let first_tie = command(&mut sched, 0, 5, "a");
        let second_tie = command(&mut sched, 0, 5, "b");
        let urgent = command(&mut sched, 0, 0, "urgent");
        let order: Vec<Pid> = sched.iter().map(|c| c.pid).collect();
        assert_eq!(order, vec![urgent, first_tie, second_tie, late]);
    }

    #[test]
    fn future_entries_are_never_due() {
        let mut sched = Scheduler::new();
        let waiting = command(&mut sched, 0, 10, "later");
        let ready = command(&mut sched, 5, 0, "now");
        assert_eq!(sched.first_due(0), Some(ready));
        assert_eq!(sched.first_due_at(0, -20), None);
        sched.remove(ready);
        assert_eq!(sched.first_due(9), None);
        assert_eq!(sched.first_due(10), Some(waiting));
        assert_eq!(sched.next_wake(), Some(10));
    }

    #[test]
    fn removal_frees_the_pid() {
        let mut sched = Scheduler::with_pid_capacity(1);
        let pid = command(&mut sched, 0, 0, "x");
        assert!(sched.allocate_pid().is_none());
        assert!(sched.remove(pid).is_some());
        assert!(sched.remove(pid).is_none());
        assert!(!sched.test_top());
        assert!(sched.allocate_pid().is_some());
    }

    #[test]
    fn outstanding_counts_never_go_negative() {
        let mut sched = Scheduler::new();
        let owner = Dbref(3);
        assert_eq!(sched.adjust_outstanding(owner, 1), 1);
        assert_eq!(sched.adjust_outstanding(owner, 1), 2);
        assert_eq!(sched.adjust_outstanding(owner, -5), 0);
        assert_eq!(sched.outstanding(owner), 0);
    }
}
