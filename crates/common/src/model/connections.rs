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

use crate::model::Dbref;

/// A snapshot of one authenticated session.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ConnectionInfo {
    pub player: Dbref,
    /// The socket descriptor number, reported by `port()`.
    pub descriptor: i64,
    pub connected_at: i64,
    pub last_time: i64,
    pub user: String,
    pub addr: String,
}

/// The session side of the world, as seen by the kernel: delivering text to players, and
/// answering questions about who is connected.
pub trait Connections {
    /// Queue `msg` (one line, without terminator) for every session of `player`.
    fn notify(&mut self, player: Dbref, msg: &str);

    /// All authenticated sessions, most recently active first.
    fn connected(&self) -> Vec<ConnectionInfo>;

    fn is_connected(&self, player: Dbref) -> bool {
        self.connected().iter().any(|c| c.player == player)
    }

    /// The most recently active session of `player`, if any.
    fn connection_of(&self, player: Dbref) -> Option<ConnectionInfo> {
        self.connected().into_iter().find(|c| c.player == player)
    }
}
