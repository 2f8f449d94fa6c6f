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

//! What an unauthenticated socket may say: `WHO`, `connect`, `create` and the rich client
//! handshake. Anything else earns the welcome screen.

use std::os::fd::RawFd;

use demuse_common::Dbref;
use demuse_common::model::{Connections, PlayerClass, WorldState};
use demuse_kernel::builtins::{duration_long, duration_short};
use demuse_kernel::{ExecContext, Runtime};
use tracing::{info, warn};

use crate::descriptor::ConnState;
use crate::sessions::Sessions;

/// IAC WILL ECHO: the client stops echoing while a password is typed.
const ECHO_OFF: &[u8] = &[255, 251, 1];
/// IAC WONT ECHO.
const ECHO_ON: &[u8] = &[255, 252, 1];

const PASSWORD_PROMPT: &str = "Please enter password:\n";
const PUEBLO_TOKEN: &str = "PUEBLOCLIENT";
const LAST_SITES: usize = 10;

/// Splits a login line into its first three whitespace-separated words.
pub fn parse_connect(msg: &str) -> (&str, &str, &str) {
    let mut words = msg.split_whitespace();
    (
        words.next().unwrap_or(""),
        words.next().unwrap_or(""),
        words.next().unwrap_or(""),
    )
}

/// The pre-login `WHO` listing.
pub fn who_listing(sessions: &Sessions, world: &dyn WorldState, now: i64) -> String {
    let connected = sessions.connected();
    let mut out = String::from("Player Name          On For Idle\n");
    for c in &connected {
        let name = world.name_of(c.player).unwrap_or_default();
        out.push_str(&format!(
            "{name:<20} {:>6} {:>4}\n",
            duration_long(now - c.connected_at),
            duration_short(now - c.last_time)
        ));
    }
    let n = connected.len();
    out.push_str(&format!(
        "{n} {} logged in.\n",
        if n == 1 { "player" } else { "players" }
    ));
    out
}

fn queue(sessions: &mut Sessions, fd: RawFd, text: &str) {
    if let Some(d) = sessions.get_mut(fd) {
        d.queue_str(text);
    }
}

/// Handles one line from a socket that has not logged in yet.
pub fn check_connect(
    world: &mut dyn WorldState,
    sessions: &mut Sessions,
    rt: &mut Runtime,
    fd: RawFd,
    msg: &str,
) {
    let Some(descriptor) = sessions.get_mut(fd) else {
        return;
    };

    // A password prompt was pending: the line is the password for the held name.
    let held;
    let msg = match std::mem::replace(&mut descriptor.state, ConnState::AwaitingConnect) {
        ConnState::AwaitingPassword(name) => {
            descriptor.queue_bytes(ECHO_ON);
            held = format!("connect {name} {}", msg.trim());
            held.as_str()
        }
        other => {
            descriptor.state = other;
            msg
        }
    };

    let (command, user, password) = parse_connect(msg);
    if command == "WHO" {
        let listing = who_listing(sessions, world, rt.now());
        queue(sessions, fd, &listing);
        return;
    }

    if command.starts_with("co") {
        connect(world, sessions, rt, fd, user, password);
        return;
    }

    if command.starts_with("cr") {
        match world.create_player(user, password) {
            Ok(player) => {
                info!(fd, player = %player, "CREATED: {user}");
                login(world, sessions, rt, fd, player);
            }
            Err(e) => {
                info!(fd, error = %e, "FAILED CREATE: {user}");
                let fail = rt.config.messages.create_fail.clone();
                queue(sessions, fd, &fail);
            }
        }
        return;
    }

    if command.starts_with(PUEBLO_TOKEN) {
        if let Some(d) = sessions.get_mut(fd) {
            d.pueblo = true;
        }
        return;
    }

    let pueblo = sessions.get_mut(fd).is_some_and(|d| d.pueblo);
    if !pueblo {
        let welcome = rt.config.messages.welcome.clone();
        queue(sessions, fd, &welcome);
    }
}

fn connect(
    world: &mut dyn WorldState,
    sessions: &mut Sessions,
    rt: &mut Runtime,
    fd: RawFd,
    user: &str,
    password: &str,
) {
    let guest_prefix = rt.config.server.guest_prefix.clone();
    let lowered = user.to_ascii_lowercase();
    let wants_guest = !user.is_empty()
        && (lowered.starts_with(&guest_prefix.to_ascii_lowercase()) || lowered.starts_with("guest"));
    if wants_guest {
        match world.make_guest(&guest_prefix) {
            Ok(guest) => login(world, sessions, rt, fd, guest),
            Err(e) => {
                warn!(fd, error = %e, "Could not make a guest");
                let fail = rt.config.messages.connect_fail.clone();
                queue(sessions, fd, &fail);
            }
        }
        return;
    }

    if let Some(player) = world.connect_player(user, password) {
        login(world, sessions, rt, fd, player);
        return;
    }

    if password.is_empty() {
        if let Some(d) = sessions.get_mut(fd) {
            d.queue_str(PASSWORD_PROMPT);
            d.queue_bytes(ECHO_OFF);
            d.state = ConnState::AwaitingPassword(user.to_string());
        }
        return;
    }

    let (reason, text) = if world.lookup_player(user).is_some() {
        ("bad password", rt.config.messages.bad_password.clone())
    } else {
        ("no such player", rt.config.messages.connect_fail.clone())
    };
    info!(fd, reason, "FAILED CONNECT: {user}");
    queue(sessions, fd, &text);
}

/// Binds the socket to `player` and tells the world.
fn login(
    world: &mut dyn WorldState,
    sessions: &mut Sessions,
    rt: &mut Runtime,
    fd: RawFd,
    player: Dbref,
) {
    let now = rt.now();
    let Some(d) = sessions.get_mut(fd) else {
        return;
    };
    d.state = ConnState::Connected;
    d.player = player;
    d.connected_at = now;
    d.last_time = now;
    let site = format!("{}@{}", d.user, d.addr);
    info!(fd, player = %player, site = %site, "CONNECTED");

    record_site(world, player, &site);

    let mut ctx = ExecContext::new(world, sessions, rt);
    if let Err(e) = ctx.announce_connect(player) {
        warn!(player = %player, error = ?e, "Could not announce connection");
    }
    if ctx.world.class_of(player).is_ok_and(|c| c == PlayerClass::Guest) {
        let msg = format!(
            "Welcome to {}; your name is {}",
            ctx.rt.config.server.muse_name,
            ctx.world.cname_of(player).unwrap_or_default()
        );
        ctx.notify(player, &msg);
    }
}

/// Keeps the last few `user@host` sites a player connected from.
fn record_site(world: &mut dyn WorldState, player: Dbref, site: &str) {
    let previous = world
        .attribute(player, "LastSite")
        .ok()
        .flatten()
        .map(|a| a.value)
        .unwrap_or_default();
    let mut sites: Vec<&str> = previous.split_whitespace().collect();
    if sites.len() >= LAST_SITES {
        sites.drain(..=sites.len() - LAST_SITES);
    }
    sites.push(site);
    if let Err(e) = world.set_attribute(player, "LastSite", &sites.join(" ")) {
        warn!(player = %player, error = ?e, "Could not record login site");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::tests::pair;
    use crate::descriptor::Descriptor;
    use demuse_common::model::{ObjFlag, ObjectType};
    use demuse_db::{DatabaseConfig, MemoryDb};
    use demuse_kernel::Config;
    use pretty_assertions::assert_eq;
    use std::io::Read;
    use std::net::TcpStream;
    use std::time::Duration;
    use test_case::test_case;

    struct Fixture {
        db: MemoryDb,
        sessions: Sessions,
        rt: Runtime,
        fd: RawFd,
        client: TcpStream,
    }

    impl Fixture {
        fn new() -> Self {
            let mut db = MemoryDb::minimal(DatabaseConfig::default(), "potrzebie").unwrap();
            db.create_player("Alice", "secret").unwrap();
            let rt = Runtime::with_seed(Config::default(), 7);
            let (descriptor, client) = pair(&rt.config.net);
            client
                .set_read_timeout(Some(Duration::from_millis(500)))
                .unwrap();
            let fd = descriptor.fd;
            let mut sessions = Sessions::default();
            sessions.insert(descriptor);
            Self {
                db,
                sessions,
                rt,
                fd,
                client,
            }
        }

        fn say(&mut self, line: &str) {
            check_connect(&mut self.db, &mut self.sessions, &mut self.rt, self.fd, line);
        }

        fn descriptor(&mut self) -> &mut Descriptor {
            self.sessions.get_mut(self.fd).unwrap()
        }

        fn output(&mut self) -> Vec<u8> {
            self.descriptor().flush_output().unwrap();
            let mut out = vec![];
            let mut buf = [0u8; 4096];
            while let Ok(n) = self.client.read(&mut buf) {
                out.extend_from_slice(&buf[..n]);
                if n < buf.len() {
                    break;
                }
            }
            out
        }

        fn text(&mut self) -> String {
            String::from_utf8_lossy(&self.output()).into_owned()
        }
    }

    #[test_case("connect Alice secret", ("connect", "Alice", "secret"); "three words")]
    #[test_case("  co   Bob  ", ("co", "Bob", ""); "padded")]
    #[test_case("", ("", "", ""); "empty")]
    #[test_case("cr Bob pw extra", ("cr", "Bob", "pw"); "surplus ignored")]
    fn connect_lines_split(line: &str, expected: (&str, &str, &str)) {
        assert_eq!(parse_connect(line), expected);
    }

    #[test]
    fn connecting_with_a_password() {
        let mut f = Fixture::new();
        f.say("connect Alice secret");
        let d = f.descriptor();
        assert_eq!(d.state, ConnState::Connected);
        let player = d.player;
        assert!(f.db.flags_of(player).unwrap().contains(ObjFlag::Connect));
        let site = f.db.attribute(player, "LastSite").unwrap().unwrap().value;
        assert!(site.ends_with("@127.0.0.1"));
    }

    #[test]
    fn bad_password_and_unknown_player_differ() {
        let mut f = Fixture::new();
        f.say("connect Alice wrong");
        assert_eq!(f.text(), "Incorrect password.\n");
        f.say("connect Nobody wrong");
        assert_eq!(f.text(), "That player does not exist.\n");
        assert_eq!(f.descriptor().state, ConnState::AwaitingConnect);
    }

    #[test]
    fn password_prompt_turns_echo_off_and_back_on() {
        let mut f = Fixture::new();
        f.say("connect Alice");
        assert_eq!(
            f.descriptor().state,
            ConnState::AwaitingPassword("Alice".to_string())
        );
        let mut expected = PASSWORD_PROMPT.as_bytes().to_vec();
        expected.extend_from_slice(ECHO_OFF);
        assert_eq!(f.output(), expected);

        f.say("secret");
        assert_eq!(f.descriptor().state, ConnState::Connected);
        assert!(f.output().starts_with(ECHO_ON));
    }

    #[test]
    fn guests_are_made_on_demand() {
        let mut f = Fixture::new();
        f.say("connect guest");
        let guest = f.descriptor().player;
        assert_eq!(f.db.class_of(guest).unwrap(), PlayerClass::Guest);
        assert_eq!(f.db.name_of(guest).unwrap(), "Guest1");
        assert!(f.text().contains("Welcome to YourMUSE; your name is Guest1"));
    }

    #[test]
    fn creating_logs_in() {
        let mut f = Fixture::new();
        f.say("create Bob pw");
        let bob = f.descriptor().player;
        assert_eq!(f.db.object_type(bob).unwrap(), ObjectType::Player);
        assert_eq!(f.descriptor().state, ConnState::Connected);

        let mut g = Fixture::new();
        g.say("create Alice pw");
        assert_eq!(g.text(), g.rt.config.messages.create_fail.clone());
    }

    #[test]
    fn who_lists_connected_players() {
        let mut f = Fixture::new();
        f.rt.set_now(1000);
        f.say("connect Alice secret");
        f.output();
        f.rt.set_now(1000 + 3 * 3600 + 120);
        f.descriptor().state = ConnState::AwaitingConnect;
        let listing = who_listing(&f.sessions, &f.db, f.rt.now());
        assert_eq!(
            listing,
            "Player Name          On For Idle\n0 players logged in.\n"
        );
        f.descriptor().state = ConnState::Connected;
        let listing = who_listing(&f.sessions, &f.db, f.rt.now());
        assert_eq!(
            listing,
            "Player Name          On For Idle\nAlice                 03:02   3h\n1 player logged in.\n"
        );
    }

    #[test]
    fn pueblo_clients_skip_the_welcome() {
        let mut f = Fixture::new();
        f.say("hello");
        assert_eq!(f.text(), f.rt.config.messages.welcome.clone());
        f.say("PUEBLOCLIENT 2.01");
        assert!(f.descriptor().pueblo);
        f.say("hello");
        assert!(!f.descriptor().wants_write());
    }

    #[test]
    fn sites_are_capped() {
        let mut f = Fixture::new();
        let alice = f.db.lookup_player("Alice").unwrap();
        for i in 0..12 {
            record_site(&mut f.db, alice, &format!("u@h{i}"));
        }
        let sites = f.db.attribute(alice, "LastSite").unwrap().unwrap().value;
        let sites: Vec<&str> = sites.split(' ').collect();
        assert_eq!(sites.len(), LAST_SITES);
        assert_eq!(sites[0], "u@h2");
        assert_eq!(sites[9], "u@h11");
    }
}
