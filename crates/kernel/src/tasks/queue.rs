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

//! Admission to, release from, and halting of the command queue.
//!
//! Every queued command costs its actor's owner `queue_cost` pennies, refunded when the command
//! runs or is halted. Owners have a budget of `max_queue` outstanding commands across all their
//! objects; exceeding it halts everything they own and quarantines the offending object.

use ahash::AHashSet;
use demuse_common::model::{ObjFlag, ObjectType, PlayerClass, Power, WorldStateError};
use demuse_common::Dbref;
use tracing::{debug, error, trace, warn};

use crate::Env;
use crate::errors::SchedulerError;
use crate::eval::text::{atol, parse_up, truncate_to};
use crate::runtime::ExecContext;
use crate::tasks::pid::Pid;
use crate::tasks::scheduler::ScheduledCommand;

/// `@wait` never queues less urgently than this.
const MAX_WAIT_PRIORITY: i32 = 20;

impl ExecContext<'_> {
    /// Queues each `;`-separated part of `command` for `player`. The priority comes from the
    /// player's `Nice` attribute, or is 0 when a player caused it and 1 otherwise.
    pub fn parse_que(
        &mut self,
        player: Dbref,
        command: &str,
        cause: Dbref,
    ) -> Result<Vec<Pid>, SchedulerError> {
        if !self.world.valid(player) {
            return Err(WorldStateError::ObjectNotFound(player).into());
        }
        let priority = match self.nice(player) {
            Some(nice) => nice,
            None if self.is_type(cause, ObjectType::Player) => 0,
            None => 1,
        };
        self.parse_que_pri(player, command, cause, priority)
    }

    pub fn parse_que_pri(
        &mut self,
        player: Dbref,
        command: &str,
        cause: Dbref,
        priority: i32,
    ) -> Result<Vec<Pid>, SchedulerError> {
        let mut text = command.to_string();
        truncate_to(&mut text, self.rt.config.net.max_command_len);
        let mut rest = text.as_str();
        let mut pids = vec![];
        while let Some(part) = parse_up(&mut rest, ';') {
            if part.trim().is_empty() {
                continue;
            }
            pids.push(self.big_que(player, part, cause, priority, 0)?);
        }
        Ok(pids)
    }

    /// Queues `command` whole, to run `wait` seconds from now. Waiting commands are a little less
    /// urgent than ordinary ones.
    pub fn wait_que(
        &mut self,
        player: Dbref,
        wait: i64,
        command: &str,
        cause: Dbref,
    ) -> Result<Pid, SchedulerError> {
        if !self.world.valid(player) {
            return Err(WorldStateError::ObjectNotFound(player).into());
        }
        let priority = match self.nice(player) {
            Some(nice) => nice.saturating_add(5).min(MAX_WAIT_PRIORITY),
            None if self.is_type(cause, ObjectType::Player) => 5,
            None => 6,
        };
        self.big_que(player, command, cause, priority, wait.max(0))
    }

    /// Admits one command: charges the fee, counts it against the owner's budget, captures the
    /// current `%0`-`%9` registers and inserts it. Anything urgent enough is run before
    /// returning.
    pub fn big_que(
        &mut self,
        player: Dbref,
        command: &str,
        cause: Dbref,
        priority: i32,
        wait: i64,
    ) -> Result<Pid, SchedulerError> {
        if !self.world.valid(player) {
            return Err(WorldStateError::ObjectNotFound(player).into());
        }
        if self.world.flags_of(player)?.contains(ObjFlag::Haven) {
            return Err(SchedulerError::Halted(player));
        }

        let queue = &self.rt.config.queue;
        let (queue_cost, queue_loss, max_queue, immediate) = (
            queue.queue_cost,
            queue.queue_loss,
            queue.max_queue,
            queue.immediate_priority,
        );
        let surcharge = i64::from(queue_loss != 0 && self.rt.random() & queue_loss == 0);
        let owner = self.owner(player);
        if !self.world.payfor(player, queue_cost + surcharge)? {
            self.notify(owner, &SchedulerError::InsufficientFunds.to_string());
            warn!(player = %player, owner = %owner, "Not enough money to queue command");
            return Err(SchedulerError::InsufficientFunds);
        }

        if self.add_to(player, 1) > max_queue {
            let msg = format!("Run away object ({}), commands halted", self.unparse(player));
            self.notify(owner, &msg);
            warn!(player = %player, owner = %owner, "Run away object, commands halted");
            self.world.giveto(player, queue_cost)?;
            self.halt_player(owner, "");
            self.quarantine(player)?;
            return Err(SchedulerError::RunAway(player));
        }

        let Some(pid) = self.rt.scheduler.allocate_pid() else {
            self.add_to(player, -1);
            self.world.giveto(player, queue_cost)?;
            error!(player = %player, "Queue halted: no process ids left");
            self.halt_player(player, "");
            self.quarantine(player)?;
            return Err(SchedulerError::OutOfPids);
        };

        let captured = self.rt.env.clone();
        let arena = &mut self.rt.arena;
        let env = captured.map(|slot| slot.map(|text| arena.alloc_permanent(&text)));
        let wake = self.rt.now() + wait;
        trace!(pid = %pid, player = %player, priority, wake, command, "Queued");
        self.rt.scheduler.insert(ScheduledCommand {
            pid,
            player,
            cause,
            priority,
            wake,
            command: command.to_string(),
            env,
        });

        self.do_jobs(immediate);
        Ok(pid)
    }

    /// Runs the first due entry. Returns false when nothing was due.
    pub fn do_top(&mut self) -> bool {
        let now = self.rt.now();
        let Some(pid) = self.rt.scheduler.first_due(now) else {
            return false;
        };
        let Some(entry) = self.rt.scheduler.remove(pid) else {
            return false;
        };
        let arena = &mut self.rt.arena;
        let env: Env = entry.env.map(|key| key.and_then(|k| arena.release(k)));

        let player = entry.player;
        if !self.world.valid(player) {
            warn!(pid = %pid, player = %player, "Dropping queue entry for a destroyed object");
            return true;
        }
        let queue_cost = self.rt.config.queue.queue_cost;
        if let Err(e) = self.world.giveto(player, queue_cost) {
            warn!(player = %player, error = ?e, "Could not refund queue cost");
        }
        self.add_to(player, -1);

        let blocked = self
            .world
            .flags_of(player)
            .map_or(true, |f| f.contains(ObjFlag::Haven) || f.contains(ObjFlag::Going));
        if blocked || !self.world.valid(entry.cause) {
            return true;
        }

        self.rt.env = env;
        self.rt.reset_depth();
        debug!(pid = %pid, player = %player, priority = entry.priority, command = %entry.command, "Queue processing");
        let command = self.pronoun_substitute(entry.cause, &entry.command, player);
        self.process_command(player, &command, entry.cause);
        true
    }

    /// Runs due entries for as long as the head of the queue is due and at least as urgent as
    /// `priority`.
    pub fn do_jobs(&mut self, priority: i32) {
        while self
            .rt
            .scheduler
            .first_due_at(self.rt.now(), priority)
            .is_some()
            && self.do_top()
        {}
    }

    /// One scheduler tick, run by the event loop on every pass that finds something due.
    pub fn do_second(&mut self) {
        for _ in 0..self.rt.config.queue.queue_commands_per_tick {
            if !self.do_top() {
                break;
            }
        }
    }

    /// Removes everything `player` (or anything it owns) has queued, refunding each entry, then
    /// optionally queues `ncom` in its place.
    pub fn halt_player(&mut self, player: Dbref, ncom: &str) {
        if !self.world.valid(player) {
            return;
        }
        let owner = self.owner(player);
        if !self.is_quiet(player) {
            if player == owner {
                self.notify(owner, "@halt: Player halted.");
            } else if !self.is_quiet(owner) && !ncom.is_empty() {
                let msg = format!("@halt: {} halted.", self.unparse(player));
                self.notify(owner, &msg);
            }
        }

        let world = &*self.world;
        let pids = self.rt.scheduler.pids_where(|c| {
            c.player == player || world.owner_of(c.player).is_ok_and(|o| o == player)
        });
        let halted = pids.len() as i64;
        for pid in pids {
            self.cancel(pid);
        }
        debug!(player = %player, halted, "Halted queue entries");

        if player == owner {
            self.rt.scheduler.reset_outstanding(player);
            self.mirror_count(player, 0);
        } else {
            self.add_to(player, -halted);
        }

        if !ncom.is_empty()
            && let Err(e) = self.parse_que(player, ncom, player)
        {
            debug!(player = %player, error = %e, "Replacement command not queued");
        }
    }

    /// Halts one process. The requester must be its actor, share its owner, or hold Security.
    pub fn halt_process(&mut self, player: Dbref, pid: Pid) {
        let Some(entry) = self.rt.scheduler.get(pid) else {
            self.notify(player, "@halt: Sorry. That process ID wasn't found.");
            return;
        };
        let target = entry.player;
        if !self.world.valid(target) {
            self.notify(player, "@halt: Invalid process (bad player reference).");
            return;
        }
        let permitted = target == player
            || self.owner(target) == self.owner(player)
            || self.world.has_power(player, Power::Security);
        if !permitted {
            self.notify(player, "@halt: Sorry. You don't control that process.");
            return;
        }
        self.cancel(pid);
        self.add_to(target, -1);
        self.notify(player, &format!("@halt: Terminated process {pid}"));
    }

    /// Empties the queue. Needs the Security power.
    pub fn halt_all(&mut self, player: Dbref) {
        if !self.world.has_power(player, Power::Security) {
            self.notify(player, "You can't halt everything.");
            return;
        }
        let pids = self.rt.scheduler.pids_where(|_| true);
        let mut owners = AHashSet::new();
        for pid in pids {
            if let Some(entry) = self.cancel(pid) {
                owners.insert(self.owner(entry.player));
            }
        }
        for owner in owners {
            self.rt.scheduler.reset_outstanding(owner);
            self.mirror_count(owner, 0);
        }
        warn!(player = %player, "Everything halted");
        self.notify(player, "@halt: Everything halted.");
    }

    /// `@halt [all | pid | player][=command]`
    pub fn do_halt(&mut self, player: Dbref, arg1: &str, arg2: &str) {
        if !self.world.valid(player) {
            return;
        }
        if arg1.is_empty() {
            self.halt_player(player, arg2);
        } else if arg1 == "all" {
            self.halt_all(player);
        } else if atol(arg1) > 0 || arg1 == "0" {
            let pid = usize::try_from(atol(arg1)).unwrap_or(usize::MAX);
            self.halt_process(player, Pid(pid));
        } else if let Some(victim) = self.world.lookup_player(arg1) {
            if !self.world.has_power(player, Power::Security) {
                self.notify(player, "@halt: You do not have the power.");
                return;
            }
            self.halt_player(victim, arg2);
            let msg = format!("@halt: Halted {}", self.unparse(victim));
            self.notify(player, &msg);
        } else {
            self.notify(player, "@halt: Invalid Syntax.");
        }
    }

    /// `@ps`: the entries `player` may see, in queue order.
    pub fn do_queue(&mut self, player: Dbref) {
        if !self.world.valid(player) {
            return;
        }
        if self.rt.scheduler.is_empty() {
            self.notify(player, "@ps: No processes in the queue at this time.");
            return;
        }
        let can_see_all = self.world.has_power(player, Power::Queue);
        let viewer = self.owner(player);
        let now = self.rt.now();
        let rows: Vec<String> = self
            .rt
            .scheduler
            .iter()
            .filter(|c| self.world.valid(c.player))
            .filter(|c| can_see_all || self.owner(c.player) == viewer)
            .map(|c| {
                let mut tag = format!("[{} {:<20.20}", c.player, self.name(c.player));
                if tag.chars().count() > 18 {
                    tag = tag.chars().take(19).collect();
                }
                tag.push(']');
                format!("{:5} {} {:2} {:5} {}", c.pid, tag, c.priority, c.wake - now, c.command)
            })
            .collect();
        self.notify(player, "PID   Player               Pr Wait  Command");
        for row in rows {
            self.notify(player, &row);
        }
    }

    /// Unlinks one entry, frees its registers and refunds its fee. The owner's count is the
    /// caller's business.
    fn cancel(&mut self, pid: Pid) -> Option<ScheduledCommand> {
        let entry = self.rt.scheduler.remove(pid)?;
        for key in entry.env.iter().flatten() {
            self.rt.arena.release(*key);
        }
        if self.world.valid(entry.player) {
            let queue_cost = self.rt.config.queue.queue_cost;
            if let Err(e) = self.world.giveto(entry.player, queue_cost) {
                warn!(player = %entry.player, error = ?e, "Could not refund queue cost");
            }
        }
        Some(entry)
    }

    /// Adjusts the outstanding count of `player`'s owner, returning the new count.
    fn add_to(&mut self, player: Dbref, delta: i64) -> i64 {
        let owner = self.owner(player);
        if !self.world.valid(owner) {
            return 0;
        }
        let count = self.rt.scheduler.adjust_outstanding(owner, delta);
        self.mirror_count(owner, count);
        count
    }

    fn mirror_count(&mut self, owner: Dbref, count: i64) {
        let text = if count > 0 {
            count.to_string()
        } else {
            String::new()
        };
        if let Err(e) = self.world.set_attribute(owner, "Queue", &text) {
            warn!(owner = %owner, error = ?e, "Could not record queue count");
        }
    }

    /// Stops anything not owned by a Director from running queued commands.
    fn quarantine(&mut self, obj: Dbref) -> Result<(), WorldStateError> {
        if self.world.class_of(obj)? == PlayerClass::Director {
            return Ok(());
        }
        let mut flags = self.world.flags_of(obj)?;
        flags.set(ObjFlag::Haven);
        self.world.set_flags_of(obj, flags)
    }

    pub(crate) fn is_quiet(&self, obj: Dbref) -> bool {
        self.world
            .flags_of(obj)
            .is_ok_and(|f| f.contains(ObjFlag::Quiet))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::tasks::pid::Pid;
    use crate::testing::TestWorld;
    use demuse_common::model::{ObjFlag, ObjectType, WorldState};
    use demuse_common::NOTHING;
    use pretty_assertions::assert_eq;

    fn lossless() -> TestWorld {
        let mut config = Config::default();
        config.queue.queue_loss = 0;
        TestWorld::with_config(config)
    }

    #[test]
    fn semicolons_split_into_entries() {
        let mut world = lossless();
        let player = world.player;
        let pids = world
            .exec()
            .parse_que(player, "say one; say two;;", player)
            .unwrap();
        assert_eq!(pids.len(), 2);
        assert_eq!(world.rt.scheduler.len(), 2);
        assert_eq!(world.pennies(player), 10000 - 200);
        assert_eq!(world.attr(player, "Queue"), "2");
        assert_eq!(world.rt.scheduler.get(pids[0]).unwrap().priority, 0);
    }

    #[test]
    fn priority_follows_cause_and_nice() {
        let mut world = lossless();
        let (player, room) = (world.player, world.room);
        let gadget = world.create("gadget", ObjectType::Thing, player, room);
        let pid = world.exec().parse_que(player, "think", gadget).unwrap()[0];
        assert_eq!(world.rt.scheduler.get(pid).unwrap().priority, 1);
        let pid = world.exec().wait_que(player, 3, "think", gadget).unwrap();
        assert_eq!(world.rt.scheduler.get(pid).unwrap().priority, 6);

        world.set_attr(player, "Nice", "18");
        let pid = world.exec().parse_que(player, "think", player).unwrap()[0];
        assert_eq!(world.rt.scheduler.get(pid).unwrap().priority, 18);
        let pid = world.exec().wait_que(player, 3, "think", player).unwrap();
        assert_eq!(world.rt.scheduler.get(pid).unwrap().priority, 20);
    }

    #[test]
    fn urgent_entries_run_on_admission() {
        let mut world = lossless();
        let player = world.player;
        world
            .exec()
            .big_que(player, "think now", player, -20, 0)
            .unwrap();
        assert!(world.rt.scheduler.is_empty());
        assert_eq!(
            world.messages_for(player),
            vec!["Tester . o O ( now )".to_string()]
        );
        assert_eq!(world.pennies(player), 10000);
        assert_eq!(world.attr(player, "Queue"), "");
    }

    #[test]
    fn registers_travel_with_the_entry() {
        let mut world = lossless();
        let player = world.player;
        world.rt.env[0] = Some("captured".to_string());
        world.exec().big_que(player, "think %0", player, 0, 0).unwrap();
        world.rt.env[0] = None;
        assert_eq!(world.rt.arena.live(), 1);
        assert!(world.exec().do_top());
        assert_eq!(world.rt.arena.live(), 0);
        assert_eq!(
            world.messages_for(player),
            vec!["Tester . o O ( captured )".to_string()]
        );
    }

    #[test]
    fn halted_objects_are_not_admitted_or_run() {
        let mut world = lossless();
        let (player, room) = (world.player, world.room);
        let gadget = world.create("gadget", ObjectType::Thing, player, room);
        world.exec().parse_que(gadget, "think hi", player).unwrap();

        let mut flags = world.db.flags_of(gadget).unwrap();
        flags.set(ObjFlag::Haven);
        world.db.set_flags_of(gadget, flags).unwrap();
        assert!(world.exec().parse_que(gadget, "think again", player).is_err());

        assert!(world.exec().do_top());
        assert!(world.messages_for(room).is_empty());
        assert!(world.messages_for(gadget).is_empty());
        assert_eq!(world.pennies(player), 10000);
    }

    #[test]
    fn running_out_of_pids_halts_the_actor() {
        let mut config = Config::default();
        config.queue.queue_loss = 0;
        let mut world = TestWorld::with_config(config);
        world.rt.scheduler = crate::Scheduler::with_pid_capacity(2);
        let (player, room) = (world.player, world.room);
        let gadget = world.create("gadget", ObjectType::Thing, player, room);
        world.exec().parse_que(gadget, "think a; think b", player).unwrap();
        let err = world.exec().parse_que(gadget, "think c", player).unwrap_err();
        assert_eq!(err.to_string(), "OUT OF PIDS");
        assert!(world.rt.scheduler.is_empty());
        assert_eq!(world.pennies(player), 10000);
        assert!(world.db.flags_of(gadget).unwrap().contains(ObjFlag::Haven));
    }

    #[test]
    fn halt_player_and_replacement_command() {
        let mut world = lossless();
        let (player, room) = (world.player, world.room);
        let gadget = world.create("gadget", ObjectType::Thing, player, room);
        world.exec().parse_que(gadget, "think a; think b", player).unwrap();
        world.exec().parse_que(player, "think c", player).unwrap();
        assert_eq!(world.attr(player, "Queue"), "3");

        world.exec().halt_player(gadget, "think d");
        assert_eq!(world.rt.scheduler.len(), 2);
        assert_eq!(world.attr(player, "Queue"), "2");
        assert!(
            world
                .messages_for(player)
                .contains(&format!("@halt: gadget({gadget}) halted."))
        );

        world.exec().halt_player(player, "");
        assert!(world.rt.scheduler.is_empty());
        assert_eq!(world.attr(player, "Queue"), "");
        assert_eq!(world.pennies(player), 10000);
        assert!(world.messages_for(player).contains(&"@halt: Player halted.".to_string()));
    }

    #[test]
    fn halting_by_pid_checks_ownership() {
        let mut world = lossless();
        let player = world.player;
        let other = world.add_player("Other");
        let pid = world.exec().parse_que(player, "think x", player).unwrap()[0];

        world.exec().halt_process(other, pid);
        assert_eq!(
            world.messages_for(other),
            vec!["@halt: Sorry. You don't control that process.".to_string()]
        );
        world.exec().do_halt(player, &pid.to_string(), "");
        assert!(world.messages_for(player).contains(&format!("@halt: Terminated process {pid}")));
        assert_eq!(world.pennies(player), 10000);
        world.exec().halt_process(player, Pid(12345));
        assert!(
            world
                .messages_for(player)
                .contains(&"@halt: Sorry. That process ID wasn't found.".to_string())
        );
    }

    #[test]
    fn halting_everything_needs_security() {
        let mut world = lossless();
        let (player, root) = (world.player, world.root);
        let other = world.add_player("Other");
        world.exec().parse_que(player, "think x", player).unwrap();
        world.exec().parse_que(other, "think y", other).unwrap();

        world.exec().do_halt(player, "all", "");
        assert_eq!(world.rt.scheduler.len(), 2);
        assert!(world.messages_for(player).contains(&"You can't halt everything.".to_string()));
        world.exec().do_halt(player, "Other", "");
        assert!(world.messages_for(player).contains(&"@halt: You do not have the power.".to_string()));
        world.exec().do_halt(player, "nobody-here", "");
        assert!(world.messages_for(player).contains(&"@halt: Invalid Syntax.".to_string()));

        world.exec().do_halt(root, "Other", "");
        assert_eq!(world.rt.scheduler.len(), 1);
        assert!(world.messages_for(root).contains(&format!("@halt: Halted Other({other})")));

        world.exec().do_halt(root, "all", "");
        assert!(world.rt.scheduler.is_empty());
        assert_eq!(world.pennies(player), 10000);
        assert_eq!(world.pennies(other), 10000);
        assert_eq!(world.attr(player, "Queue"), "");
        assert!(world.messages_for(root).contains(&"@halt: Everything halted.".to_string()));
    }

    #[test]
    fn ps_lists_visible_entries() {
        let mut world = lossless();
        let (player, root) = (world.player, world.root);
        let other = world.add_player("Other");
        world.exec().do_queue(player);
        assert_eq!(
            world.take_messages(),
            vec![(player, "@ps: No processes in the queue at this time.".to_string())]
        );

        let mine = world.exec().wait_que(player, 30, "think later", player).unwrap();
        world.exec().parse_que(other, "think theirs", other).unwrap();
        world.exec().do_queue(player);
        let shown = world.messages_for(player);
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[0], "PID   Player               Pr Wait  Command");
        assert_eq!(
            shown[1],
            format!("{mine:>5} [{player} Tester         ]  5    30 think later")
        );

        world.take_messages();
        world.exec().do_queue(root);
        assert_eq!(world.messages_for(root).len(), 3);
        assert_ne!(other, NOTHING);
    }
}
