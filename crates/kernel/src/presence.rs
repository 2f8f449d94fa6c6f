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

//! Arrival, departure and idleness of players as the world sees them: announcements to their
//! surroundings, the CONNECT and IDLE flags, and the action attributes fired along the way.

use demuse_common::Dbref;
use demuse_common::model::{ObjFlag, ObjectType, WorldStateError};
use demuse_common::util::BitEnum;
use tracing::{debug, info, warn};

use crate::builtins::duration_long;
use crate::eval::text::atol;
use crate::runtime::ExecContext;
use crate::zones::zone_first;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Presence {
    Connect,
    Disconnect,
}

impl Presence {
    fn action(self) -> &'static str {
        match self {
            Self::Connect => "Aconnect",
            Self::Disconnect => "Adisconnect",
        }
    }

    fn others(self) -> &'static str {
        match self {
            Self::Connect => "Oconnect",
            Self::Disconnect => "Odisconnect",
        }
    }
}

impl ExecContext<'_> {
    /// Shows `thing`'s `other` message (prefixed by the player's name) to the player's
    /// neighbours, then queues `thing`'s `action` attribute with the player as cause.
    pub fn did_it(&mut self, player: Dbref, thing: Dbref, other: Option<&str>, action: &str) {
        if let Some(other) = other {
            let text = self.attr_text(thing, other);
            if !text.is_empty() {
                let msg = self.pronoun_substitute(player, &text, thing);
                let line = format!("{} {msg}", self.name(player));
                let location = self.location(player);
                self.notify_in(location, player, &line);
            }
        }
        let text = self.attr_text(thing, action);
        if text.is_empty() {
            return;
        }
        if let Err(e) = self.parse_que(thing, &text, player) {
            debug!(thing = %thing, action, error = %e, "Action not queued");
        }
    }

    /// The player itself, where it stands, its zone, and every non-player it carries or stands
    /// beside all get a chance to react.
    fn fire_presence(&mut self, player: Dbref, presence: Presence) {
        let action = presence.action();
        self.did_it(player, player, Some(presence.others()), action);
        let location = self.location(player);
        self.did_it(player, location, None, action);

        let zone = zone_first(&*self.world, player);
        if zone != location && self.world.valid(zone) && !self.is_type(zone, ObjectType::Player) {
            self.did_it(player, zone, None, action);
        }

        let carried = self.world.contents_of(player).unwrap_or_default();
        let nearby = self.world.contents_of(location).unwrap_or_default();
        for thing in carried.into_iter().chain(nearby) {
            if !self.is_type(thing, ObjectType::Player) {
                self.did_it(player, thing, None, action);
            }
        }
    }

    /// Everything the player carries hears it, as does the room.
    fn announce(&mut self, player: Dbref, msg: &str) {
        self.notify_in(player, player, msg);
        let location = self.location(player);
        self.notify_in(location, player, msg);
    }

    fn update_flags(
        &mut self,
        obj: Dbref,
        change: impl FnOnce(&mut BitEnum<ObjFlag>),
    ) -> Result<(), WorldStateError> {
        let mut flags = self.world.flags_of(obj)?;
        change(&mut flags);
        self.world.set_flags_of(obj, flags)
    }

    /// A session of `player` has just authenticated. Connecting clears HAVEN, so a player
    /// halted for running away gets its queue back by logging in.
    pub fn announce_connect(&mut self, player: Dbref) -> Result<(), WorldStateError> {
        let again = self.world.flags_of(player)?.contains(ObjFlag::Connect);
        let cname = self.world.cname_of(player)?;
        let msg = if again {
            format!("{cname} has reconnected.")
        } else {
            format!("{cname} has connected.")
        };
        self.update_flags(player, |f| {
            f.clear(ObjFlag::Idle);
            f.clear(ObjFlag::Haven);
            f.set(ObjFlag::Connect);
        })?;
        self.announce(player, &msg);
        info!(player = %player, reconnect = again, "{msg}");
        if !again {
            self.fire_presence(player, Presence::Connect);
        }
        Ok(())
    }

    /// A session of `player` has closed, leaving `remaining` others open.
    pub fn announce_disconnect(
        &mut self,
        player: Dbref,
        remaining: usize,
    ) -> Result<(), WorldStateError> {
        let cname = self.world.cname_of(player)?;
        let partial = remaining > 0;
        let msg = if partial {
            format!("{cname} has partially disconnected.")
        } else {
            self.update_flags(player, |f| f.clear(ObjFlag::Connect))?;
            format!("{cname} has disconnected.")
        };
        self.announce(player, &msg);
        info!(player = %player, remaining, "{msg}");
        if !partial {
            self.fire_presence(player, Presence::Disconnect);
        }
        Ok(())
    }

    /// Seconds of silence after which `player` counts as idle: its `IdleTime` held between the
    /// configured floor and ceiling, or the ceiling when unset.
    pub fn idle_threshold(&self, player: Dbref) -> i64 {
        let net = &self.rt.config.net;
        let text = self.attr_text(player, "IdleTime");
        if text.trim().is_empty() {
            return net.max_idle;
        }
        atol(&text).clamp(net.min_idle, net.max_idle)
    }

    /// Marks idle every connected player whose sessions have all been quiet past its threshold.
    pub fn check_for_idlers(&mut self) {
        let now = self.rt.now();
        let sessions = self.connections.connected();
        let mut players: Vec<Dbref> = sessions.iter().map(|c| c.player).collect();
        players.sort();
        players.dedup();
        for player in players {
            let already = self
                .world
                .flags_of(player)
                .map_or(true, |f| f.contains(ObjFlag::Idle));
            if already {
                continue;
            }
            let threshold = self.idle_threshold(player);
            let least_idle = sessions
                .iter()
                .filter(|c| c.player == player)
                .map(|c| now - c.last_time)
                .min();
            if let Some(idle) = least_idle
                && idle >= threshold
            {
                self.set_idle(player, idle);
            }
        }
    }

    fn set_idle(&mut self, player: Dbref, idle: i64) {
        if let Err(e) = self.update_flags(player, |f| f.set(ObjFlag::Idle)) {
            warn!(player = %player, error = ?e, "Could not mark player idle");
            return;
        }
        info!(
            player = %player,
            "{} idled after {} minutes inactivity",
            self.name(player),
            idle / 60
        );
        self.did_it(player, player, None, "Aidle");
    }

    /// Input arrived from `player`, previously active at `last_time`.
    pub fn unidle(&mut self, player: Dbref, last_time: i64) {
        let idle = self
            .world
            .flags_of(player)
            .is_ok_and(|f| f.contains(ObjFlag::Idle));
        if !idle {
            return;
        }
        if let Err(e) = self.update_flags(player, |f| f.clear(ObjFlag::Idle)) {
            warn!(player = %player, error = ?e, "Could not clear idle mark");
            return;
        }
        let away = self.rt.now() - last_time;
        info!(
            player = %player,
            "{} unidled after {}.",
            self.name(player),
            duration_long(away)
        );
        self.did_it(player, player, None, "Aunidle");
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::TestWorld;
    use demuse_common::model::{ObjFlag, ObjectType, WorldState};
    use pretty_assertions::assert_eq;

    fn flag(world: &TestWorld, obj: demuse_common::Dbref, flag: ObjFlag) -> bool {
        world.db.flags_of(obj).unwrap().contains(flag)
    }

    #[test]
    fn connecting_announces_and_fires_actions() {
        let mut world = TestWorld::new();
        let (player, room) = (world.player, world.room);
        let watcher = world.add_player("Watcher");
        let lamp = world.create("lamp", ObjectType::Thing, player, room);
        world.set_attr(player, "Aconnect", "think hello");
        world.set_attr(lamp, "Aconnect", "think lit");
        world.set_attr(player, "Oconnect", "waves.");

        world.exec().announce_connect(player).unwrap();
        assert!(flag(&world, player, ObjFlag::Connect));
        assert_eq!(
            world.messages_for(watcher),
            vec!["Tester has connected.".to_string(), "Tester waves.".to_string()]
        );
        let queued: Vec<_> = world
            .rt
            .scheduler
            .iter()
            .map(|c| (c.player, c.cause, c.command.clone()))
            .collect();
        assert_eq!(
            queued,
            vec![
                (player, player, "think hello".to_string()),
                (lamp, player, "think lit".to_string()),
            ]
        );

        world.take_messages();
        world.exec().announce_connect(player).unwrap();
        assert_eq!(
            world.messages_for(watcher),
            vec!["Tester has reconnected.".to_string()]
        );
        assert_eq!(world.rt.scheduler.len(), 2);
    }

    #[test]
    fn connecting_lifts_a_halt() {
        let mut world = TestWorld::new();
        let player = world.player;
        let mut flags = world.db.flags_of(player).unwrap();
        flags.set(ObjFlag::Haven);
        world.db.set_flags_of(player, flags).unwrap();
        world.exec().announce_connect(player).unwrap();
        assert!(!flag(&world, player, ObjFlag::Haven));
    }

    #[test]
    fn only_the_last_session_disconnects() {
        let mut world = TestWorld::new();
        let player = world.player;
        let watcher = world.add_player("Watcher");
        world.exec().announce_connect(player).unwrap();
        world.take_messages();

        world.exec().announce_disconnect(player, 1).unwrap();
        assert!(flag(&world, player, ObjFlag::Connect));
        world.exec().announce_disconnect(player, 0).unwrap();
        assert!(!flag(&world, player, ObjFlag::Connect));
        assert_eq!(
            world.messages_for(watcher),
            vec![
                "Tester has partially disconnected.".to_string(),
                "Tester has disconnected.".to_string(),
            ]
        );
    }

    #[test]
    fn idle_threshold_is_clamped() {
        let mut world = TestWorld::new();
        let player = world.player;
        assert_eq!(world.exec().idle_threshold(player), 3600);
        world.set_attr(player, "IdleTime", "60");
        assert_eq!(world.exec().idle_threshold(player), 1200);
        world.set_attr(player, "IdleTime", "1800");
        assert_eq!(world.exec().idle_threshold(player), 1800);
        world.set_attr(player, "IdleTime", "99999");
        assert_eq!(world.exec().idle_threshold(player), 3600);
    }

    #[test]
    fn idle_needs_every_session_quiet() {
        let mut world = TestWorld::new();
        let player = world.player;
        world.set_attr(player, "IdleTime", "1200");
        world.set_attr(player, "Aidle", "think zzz");
        world.connections.connect(player, 5, 0);
        world.connections.connect(player, 6, 1000);

        world.advance(1300);
        world.exec().check_for_idlers();
        assert!(!flag(&world, player, ObjFlag::Idle));

        world.advance(1000);
        world.exec().check_for_idlers();
        assert!(flag(&world, player, ObjFlag::Idle));
        assert_eq!(world.rt.scheduler.len(), 1);

        world.exec().check_for_idlers();
        assert_eq!(world.rt.scheduler.len(), 1);

        let now = world.rt.now();
        world.exec().unidle(player, now - 60);
        assert!(!flag(&world, player, ObjFlag::Idle));
    }
}
