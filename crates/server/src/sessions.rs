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
use std::os::fd::RawFd;

use demuse_common::Dbref;
use demuse_common::model::{ConnectionInfo, Connections};

use crate::descriptor::Descriptor;

/// Every open socket, keyed by descriptor number.
#[derive(Default)]
pub struct Sessions {
    descriptors: BTreeMap<RawFd, Descriptor>,
}

impl Sessions {
    pub fn insert(&mut self, descriptor: Descriptor) {
        self.descriptors.insert(descriptor.fd, descriptor);
    }

    pub fn remove(&mut self, fd: RawFd) -> Option<Descriptor> {
        self.descriptors.remove(&fd)
    }

    pub fn get_mut(&mut self, fd: RawFd) -> Option<&mut Descriptor> {
        self.descriptors.get_mut(&fd)
    }

    pub fn fds(&self) -> Vec<RawFd> {
        self.descriptors.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Descriptor> {
        self.descriptors.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Descriptor> {
        self.descriptors.values_mut()
    }

    /// How many authenticated sockets `player` has open.
    pub fn sessions_of(&self, player: Dbref) -> usize {
        self.iter()
            .filter(|d| d.is_connected() && d.player == player)
            .count()
    }

    /// Raw text to every socket, logged in or not.
    pub fn broadcast(&mut self, text: &str) {
        for descriptor in self.iter_mut() {
            descriptor.queue_str(text);
        }
    }
}

impl Connections for Sessions {
    fn notify(&mut self, player: Dbref, msg: &str) {
        for descriptor in self.iter_mut() {
            if descriptor.is_connected() && descriptor.player == player {
                descriptor.queue_line(msg);
            }
        }
    }

    fn connected(&self) -> Vec<ConnectionInfo> {
        let mut infos: Vec<ConnectionInfo> = self.iter().filter_map(Descriptor::info).collect();
        infos.sort_by(|a, b| b.last_time.cmp(&a.last_time));
        infos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ConnState;
    use crate::descriptor::tests::pair;
    use demuse_kernel::config::NetConfig;
    use pretty_assertions::assert_eq;

    #[test]
    fn notify_reaches_every_session_of_the_player() {
        let net = NetConfig::default();
        let mut sessions = Sessions::default();
        let mut clients = vec![];
        for (player, last) in [(3, 10), (3, 50), (4, 30)] {
            let (mut d, client) = pair(&net);
            d.state = ConnState::Connected;
            d.player = Dbref(player);
            d.last_time = last;
            sessions.insert(d);
            clients.push(client);
        }
        let (lurker, client) = pair(&net);
        let lurker_fd = lurker.fd;
        sessions.insert(lurker);
        clients.push(client);

        sessions.notify(Dbref(3), "hi");
        let pending: Vec<_> = sessions.iter().map(|d| (d.player, d.wants_write())).collect();
        assert_eq!(pending.iter().filter(|(_, w)| *w).count(), 2);
        assert!(pending.iter().all(|(p, w)| !*w || *p == Dbref(3)));

        assert_eq!(sessions.sessions_of(Dbref(3)), 2);
        assert!(sessions.is_connected(Dbref(4)));
        let order: Vec<_> = sessions.connected().iter().map(|c| c.last_time).collect();
        assert_eq!(order, vec![50, 30, 10]);
        assert_eq!(sessions.connection_of(Dbref(3)).unwrap().last_time, 50);

        sessions.broadcast("bye\n");
        assert!(sessions.get_mut(lurker_fd).unwrap().wants_write());
        assert!(sessions.remove(lurker_fd).is_some());
        assert_eq!(sessions.len(), 3);
    }
}
