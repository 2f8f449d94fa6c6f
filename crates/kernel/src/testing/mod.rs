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

//! Testing utilities for the kernel: a session sink that records what each object was told, and
//! a small world with a root, a room and one ordinary player to run evaluations against.

use demuse_common::model::{ConnectionInfo, Connections, ObjectType, PlayerClass, WorldState};
use demuse_common::{Dbref, NOTHING};
use demuse_db::{DatabaseConfig, MemoryDb};

use crate::config::Config;
use crate::runtime::{ExecContext, Runtime};

/// Records every notification, and reports whatever sessions the test says are connected.
#[derive(Debug, Default)]
pub struct RecordingConnections {
    pub messages: Vec<(Dbref, String)>,
    pub sessions: Vec<ConnectionInfo>,
}

impl RecordingConnections {
    /// Pretends `player` connected at `at` on `descriptor`. Later connections sort first.
    pub fn connect(&mut self, player: Dbref, descriptor: i64, at: i64) {
        self.sessions.insert(
            0,
            ConnectionInfo {
                player,
                descriptor,
                connected_at: at,
                last_time: at,
                user: format!("user{descriptor}"),
                addr: "127.0.0.1".to_string(),
            },
        );
    }

    pub fn disconnect(&mut self, player: Dbref) {
        self.sessions.retain(|s| s.player != player);
    }

    /// Drains everything recorded so far.
    pub fn take(&mut self) -> Vec<(Dbref, String)> {
        std::mem::take(&mut self.messages)
    }

    pub fn messages_for(&self, who: Dbref) -> Vec<String> {
        self.messages
            .iter()
            .filter(|(to, _)| *to == who)
            .map(|(_, msg)| msg.clone())
            .collect()
    }
}

impl Connections for RecordingConnections {
    fn notify(&mut self, player: Dbref, msg: &str) {
        self.messages.push((player, msg.to_string()));
    }

    fn connected(&self) -> Vec<ConnectionInfo> {
        self.sessions.clone()
    }
}

pub struct TestWorld {
    pub db: MemoryDb,
    pub connections: RecordingConnections,
    pub rt: Runtime,
    pub root: Dbref,
    pub room: Dbref,
    /// "Tester", an ordinary citizen with plenty of pennies, standing in the room.
    pub player: Dbref,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorld {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let db_config = DatabaseConfig::default();
        let root = db_config.root;
        let room = db_config.player_start;
        let mut db = MemoryDb::minimal(db_config, "potrzebie").unwrap();
        let player = db.create_object("Tester", ObjectType::Player, NOTHING, room);
        db.set_class(player, PlayerClass::Citizen).unwrap();
        db.set_pennies(player, 10000).unwrap();
        Self {
            db,
            connections: RecordingConnections::default(),
            rt: Runtime::with_seed(config, 0x5eed),
            root,
            room,
            player,
        }
    }

    pub fn exec(&mut self) -> ExecContext<'_> {
        ExecContext::new(&mut self.db, &mut self.connections, &mut self.rt)
    }

    /// Evaluates `text` as the test player.
    pub fn eval(&mut self, text: &str) -> String {
        let player = self.player;
        self.eval_as(player, text)
    }

    pub fn eval_as(&mut self, who: Dbref, text: &str) -> String {
        self.rt.reset_depth();
        self.exec().evaluate(text, who, who)
    }

    /// Runs `text` as though `who` had typed it.
    pub fn command(&mut self, who: Dbref, text: &str) {
        self.exec().process_command(who, text, NOTHING);
    }

    /// Releases due queue entries until none are left.
    pub fn run_queue(&mut self) -> usize {
        let mut ran = 0;
        while self.exec().do_top() {
            ran += 1;
        }
        ran
    }

    pub fn create(&mut self, name: &str, otype: ObjectType, owner: Dbref, location: Dbref) -> Dbref {
        self.db.create_object(name, otype, owner, location)
    }

    pub fn set_attr(&mut self, obj: Dbref, name: &str, value: &str) {
        self.db.set_attribute(obj, name, value).unwrap();
    }

    pub fn attr(&self, obj: Dbref, name: &str) -> String {
        self.db
            .attribute(obj, name)
            .unwrap()
            .map(|a| a.value)
            .unwrap_or_default()
    }

    /// Another citizen standing in the room.
    pub fn add_player(&mut self, name: &str) -> Dbref {
        let room = self.room;
        let player = self.db.create_object(name, ObjectType::Player, NOTHING, room);
        self.db.set_class(player, PlayerClass::Citizen).unwrap();
        self.db.set_pennies(player, 10000).unwrap();
        player
    }

    pub fn pennies(&self, obj: Dbref) -> i64 {
        self.db.pennies_of(obj).unwrap()
    }

    /// Moves the clock forward.
    pub fn advance(&mut self, secs: i64) {
        let now = self.rt.now() + secs;
        self.rt.set_now(now);
        self.db.set_now(now);
    }

    pub fn messages_for(&self, who: Dbref) -> Vec<String> {
        self.connections.messages_for(who)
    }

    pub fn take_messages(&mut self) -> Vec<(Dbref, String)> {
        self.connections.take()
    }
}
