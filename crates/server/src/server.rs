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

//! The single-threaded main loop: one `poll(2)` over the listening socket and every player
//! socket, with command quotas, the scheduler tick, idle checks and periodic dumps in between.

use std::io::{self, ErrorKind};
use std::net::{TcpListener, TcpStream};
use std::os::fd::{AsRawFd, FromRawFd, RawFd};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use chrono::Utc;
use demuse_common::{Dbref, NOTHING};
use demuse_common::model::{ObjFlag, PlayerClass, WorldState};
use demuse_db::{DbError, MemoryDb};
use demuse_kernel::{Config, ExecContext, Runtime};
use eyre::WrapErr;
use tracing::{debug, error, info, trace, warn};

use crate::descriptor::{ConnState, Descriptor, ReadOutcome};
use crate::login::check_connect;
use crate::reboot::{RebootState, SavedDescriptor, exec_self, keep_on_exec};
use crate::sessions::Sessions;

const OUTPUT_PREFIX: &str = "OUTPUTPREFIX";
const OUTPUT_SUFFIX: &str = "OUTPUTSUFFIX";
const QUIT: &str = "QUIT";

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Shutdown,
    Reboot,
}

pub struct Server {
    db: MemoryDb,
    sessions: Sessions,
    rt: Runtime,
    listener: TcpListener,
    output_db: PathBuf,
    started_at: i64,
    last_quota: Instant,
    last_tick: i64,
    last_dump: i64,
    max_descriptors: usize,
    dumper: Option<JoinHandle<Result<(), DbError>>>,
    hup: Arc<AtomicBool>,
    term: Arc<AtomicBool>,
}

fn wall_clock() -> i64 {
    Utc::now().timestamp()
}

/// The soft descriptor limit of this process.
fn descriptor_limit() -> usize {
    let mut limit = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: getrlimit only writes into the struct we pass.
    let rc = unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut limit) };
    if rc != 0 {
        return 1024;
    }
    usize::try_from(limit.rlim_cur).unwrap_or(usize::MAX)
}

impl Server {
    pub fn new(db: MemoryDb, config: Config, listener: TcpListener, output_db: PathBuf) -> Self {
        let now = wall_clock();
        let mut rt = Runtime::new(config);
        rt.set_now(now);
        Self {
            db,
            sessions: Sessions::default(),
            rt,
            listener,
            output_db,
            started_at: now,
            last_quota: Instant::now(),
            last_tick: now,
            last_dump: now,
            max_descriptors: descriptor_limit(),
            dumper: None,
            hup: Arc::new(AtomicBool::new(false)),
            term: Arc::new(AtomicBool::new(false)),
        }
    }

    /// SIGHUP asks for a reboot, SIGTERM for a shutdown. Both are acted on between iterations.
    pub fn install_signals(&self) -> io::Result<()> {
        signal_hook::flag::register(signal_hook::consts::SIGHUP, Arc::clone(&self.hup))?;
        signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&self.term))?;
        Ok(())
    }

    /// Adopts the sockets a previous process image handed over.
    pub fn restore(&mut self, state: RebootState) {
        self.started_at = state.started_at;
        let now = self.rt.now();
        for saved in state.descriptors {
            // SAFETY: the descriptor was kept open across exec for exactly this purpose and
            // nothing else in this process owns it.
            let stream = unsafe { TcpStream::from_raw_fd(saved.fd) };
            if let Err(e) = stream.set_nonblocking(true) {
                warn!(fd = saved.fd, error = ?e, "Dropping restored socket");
                continue;
            }
            let mut d = self.new_descriptor(stream, saved.addr, now);
            d.state = ConnState::Restored;
            d.player = saved.player;
            d.connected_at = saved.connected_at;
            d.last_time = saved.last_time;
            self.sessions.insert(d);
        }
        info!(sessions = self.sessions.len(), "Restored sessions after reboot");
    }

    fn new_descriptor(&self, stream: TcpStream, addr: String, now: i64) -> Descriptor {
        Descriptor::new(
            stream,
            addr,
            now,
            &self.rt.config.net,
            &self.rt.config.messages.flushed,
        )
    }

    fn exec(&mut self) -> ExecContext<'_> {
        ExecContext::new(&mut self.db, &mut self.sessions, &mut self.rt)
    }

    fn set_now(&mut self, now: i64) {
        self.rt.set_now(now);
        self.db.set_now(now);
    }

    /// Work done once the database is loaded and before the first iteration: restored sessions
    /// come back online, flags left over from a crash are cleared, and `Startup` actions run.
    pub fn startup(&mut self) {
        self.set_now(wall_clock());
        let online = format!(
            "{} {}",
            self.rt.config.server.muse_name, self.rt.config.messages.online
        );
        for d in self.sessions.iter_mut() {
            if d.state == ConnState::Restored {
                d.state = ConnState::Connected;
                d.queue_str(&online);
            }
        }

        let top = self.db.db_top();
        let mut stale = vec![];
        let mut startups = vec![];
        for obj in (0..top).map(Dbref) {
            if !self.db.valid(obj) {
                continue;
            }
            let connected = self
                .db
                .flags_of(obj)
                .is_ok_and(|f| f.contains(ObjFlag::Connect));
            if connected && self.sessions.sessions_of(obj) == 0 {
                stale.push(obj);
            }
            if let Ok(Some(attr)) = self.db.attribute(obj, "Startup")
                && !attr.value.is_empty()
            {
                startups.push((obj, attr.value));
            }
        }

        let mut ctx = self.exec();
        for player in stale {
            if let Err(e) = ctx.announce_disconnect(player, 0) {
                warn!(player = %player, error = ?e, "Could not clear stale connection");
            }
        }
        for (obj, text) in startups {
            if let Err(e) = ctx.parse_que(obj, &text, obj) {
                debug!(obj = %obj, error = %e, "Startup action not queued");
            }
        }
        info!("Startup complete");
    }

    pub fn run(&mut self) -> Exit {
        info!(
            port = ?self.listener.local_addr().ok(),
            "Accepting connections"
        );
        loop {
            if self.term.swap(false, Ordering::SeqCst) {
                return Exit::Shutdown;
            }
            if self.hup.swap(false, Ordering::SeqCst) {
                return Exit::Reboot;
            }
            self.step();
        }
    }

    /// One iteration of the loop.
    pub fn step(&mut self) {
        let now = wall_clock();
        self.set_now(now);
        self.refill_quotas();
        self.rt.arena.clear();
        self.process_commands();
        if self.queue_ready() {
            self.exec().do_second();
        }
        self.housekeeping(now);
        let timeout = self.poll_timeout();
        self.poll(timeout);
    }

    fn refill_quotas(&mut self) {
        let net = &self.rt.config.net;
        let interval = Duration::from_millis(net.command_time_msec.max(1));
        let elapsed = self.last_quota.elapsed();
        let ticks = (elapsed.as_millis() / interval.as_millis()) as u32;
        if ticks == 0 {
            return;
        }
        let amount = net.commands_per_time.saturating_mul(ticks as i32);
        let burst = net.command_burst_size;
        for d in self.sessions.iter_mut() {
            d.refill(amount, burst);
        }
        self.last_quota += interval * ticks;
    }

    /// Runs one pending line per socket per pass, until nothing with quota has a line waiting.
    fn process_commands(&mut self) {
        loop {
            let mut ran = false;
            for fd in self.sessions.fds() {
                let Some(d) = self.sessions.get_mut(fd) else {
                    continue;
                };
                if !d.has_work() {
                    continue;
                }
                let Some(line) = d.lines.pop_front() else {
                    continue;
                };
                d.quota -= 1;
                ran = true;
                if !self.do_command(fd, &line) {
                    self.shutdown_descriptor(fd);
                }
            }
            if !ran {
                break;
            }
        }
    }

    /// Returns false when the socket should be closed.
    fn do_command(&mut self, fd: RawFd, line: &str) -> bool {
        let now = self.rt.now();
        let Some(d) = self.sessions.get_mut(fd) else {
            return false;
        };
        let previous = std::mem::replace(&mut d.last_time, now);
        let connected = d.is_connected();
        let player = d.player;

        if line == QUIT {
            let leave = self.rt.config.messages.leave.clone();
            d.queue_str(&leave);
            return false;
        }
        if let Some(rest) = line.strip_prefix(OUTPUT_PREFIX) {
            d.output_prefix = Some(rest.trim_start().to_string()).filter(|s| !s.is_empty());
            return true;
        }
        if let Some(rest) = line.strip_prefix(OUTPUT_SUFFIX) {
            d.output_suffix = Some(rest.trim_start().to_string()).filter(|s| !s.is_empty());
            return true;
        }

        if !connected {
            check_connect(&mut self.db, &mut self.sessions, &mut self.rt, fd, line);
            return true;
        }

        if let Some(prefix) = d.output_prefix.clone() {
            d.queue_line(&prefix);
        }
        trace!(fd, player = %player, command = line, "Command");
        let mut ctx = self.exec();
        ctx.unidle(player, previous);
        ctx.process_command(player, line, NOTHING);
        if let Some(d) = self.sessions.get_mut(fd)
            && let Some(suffix) = d.output_suffix.clone()
        {
            d.queue_line(&suffix);
        }
        true
    }

    /// Closes a socket, telling the world if it belonged to a player. A guest's last session
    /// takes the guest with it.
    fn shutdown_descriptor(&mut self, fd: RawFd) {
        let Some(mut d) = self.sessions.remove(fd) else {
            return;
        };
        if let Err(e) = d.flush_output() {
            debug!(fd, error = ?e, "Could not flush closing socket");
        }
        info!(fd, player = %d.player, addr = %d.addr, "Disconnect");
        if !d.is_connected() {
            return;
        }
        let player = d.player;
        drop(d);

        let remaining = self.sessions.sessions_of(player);
        let mut ctx = self.exec();
        if let Err(e) = ctx.announce_disconnect(player, remaining) {
            warn!(player = %player, error = ?e, "Could not announce disconnection");
        }
        let guest = ctx
            .world
            .class_of(player)
            .is_ok_and(|c| c == PlayerClass::Guest);
        if remaining == 0 && guest {
            ctx.halt_player(player, "");
            if let Err(e) = ctx.world.destroy_guest(player) {
                warn!(player = %player, error = ?e, "Could not destroy guest");
            }
        }
    }

    /// Once per second: the scheduler tick, idle checks and, every so often, a dump.
    fn housekeeping(&mut self, now: i64) {
        self.reap_dumper();
        if now == self.last_tick {
            return;
        }
        self.last_tick = now;
        self.exec().check_for_idlers();

        let interval = self.rt.config.server.dump_interval;
        if interval > 0 && now - self.last_dump >= interval && self.dumper.is_none() {
            self.last_dump = now;
            self.start_dump();
        }
    }

    fn start_dump(&mut self) {
        let snapshot = self.db.clone();
        let path = self.output_db.clone();
        let spawned = std::thread::Builder::new()
            .name("demuse-dump".to_string())
            .spawn(move || snapshot.dump(&path));
        match spawned {
            Ok(handle) => {
                info!(path = %self.output_db.display(), "Dumping database");
                self.dumper = Some(handle);
            }
            Err(e) => error!(error = ?e, "Could not start dump thread"),
        }
    }

    fn reap_dumper(&mut self) {
        if self.dumper.as_ref().is_some_and(JoinHandle::is_finished) {
            self.join_dumper();
        }
    }

    fn join_dumper(&mut self) {
        let Some(handle) = self.dumper.take() else {
            return;
        };
        match handle.join() {
            Ok(Ok(())) => info!("Dump complete"),
            Ok(Err(e)) => error!(error = %e, "Dump failed"),
            Err(_) => error!("Dump thread panicked"),
        }
    }

    /// Something queued has come due.
    fn queue_ready(&self) -> bool {
        let scheduler = &self.rt.scheduler;
        scheduler.test_top() && scheduler.first_due(self.rt.now()).is_some()
    }

    /// Room for another player socket without eating into the reserved descriptors.
    fn has_headroom(&self) -> bool {
        self.sessions.len() + self.rt.config.net.reserved_descriptors < self.max_descriptors
    }

    /// Zero when lines or queued commands are ready to run; otherwise until the next second or
    /// quota refill.
    fn poll_timeout(&self) -> i32 {
        if self.queue_ready() || self.sessions.iter().any(Descriptor::has_work) {
            return 0;
        }
        let subsec = i64::from(Utc::now().timestamp_subsec_millis());
        let to_second = 1000 - subsec;
        let interval = self.rt.config.net.command_time_msec.max(1) as i64;
        let to_refill = interval - self.last_quota.elapsed().as_millis() as i64;
        to_second.min(to_refill).clamp(0, 1000) as i32
    }

    fn poll(&mut self, timeout: i32) {
        let mut fds = vec![];
        if self.has_headroom() {
            fds.push(libc::pollfd {
                fd: self.listener.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            });
        }
        for d in self.sessions.iter() {
            let mut events = 0;
            if d.wants_read() {
                events |= libc::POLLIN;
            }
            if d.wants_write() {
                events |= libc::POLLOUT;
            }
            fds.push(libc::pollfd {
                fd: d.fd,
                events,
                revents: 0,
            });
        }

        // SAFETY: `fds` is a live, correctly sized array of pollfd for the duration of the call.
        let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout) };
        if rc < 0 {
            let e = io::Error::last_os_error();
            if e.kind() != ErrorKind::Interrupted {
                error!(error = ?e, "poll failed");
            }
            return;
        }

        let listener_fd = self.listener.as_raw_fd();
        for pfd in fds.iter().filter(|p| p.revents != 0) {
            if pfd.fd == listener_fd {
                self.accept_connections();
            } else {
                self.service(pfd.fd, pfd.revents);
            }
        }
    }

    fn accept_connections(&mut self) {
        while self.has_headroom() {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    if let Err(e) = stream.set_nonblocking(true) {
                        warn!(error = ?e, "Could not make socket nonblocking");
                        continue;
                    }
                    let mut d = self.new_descriptor(stream, addr.ip().to_string(), self.rt.now());
                    let welcome = self.rt.config.messages.welcome.clone();
                    d.queue_str(&welcome);
                    info!(fd = d.fd, addr = %addr, "Accepted connection");
                    self.sessions.insert(d);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(error = ?e, "accept failed");
                    return;
                }
            }
        }
        debug!(sessions = self.sessions.len(), "Descriptor limit reached; not accepting");
    }

    fn service(&mut self, fd: RawFd, revents: libc::c_short) {
        let Some(d) = self.sessions.get_mut(fd) else {
            return;
        };
        if revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0 {
            match d.read_input() {
                Ok(ReadOutcome::Open) => {}
                Ok(ReadOutcome::Closed) => {
                    self.shutdown_descriptor(fd);
                    return;
                }
                Err(e) => {
                    debug!(fd, error = ?e, "Read failed");
                    self.shutdown_descriptor(fd);
                    return;
                }
            }
        }
        if revents & libc::POLLOUT != 0
            && let Err(e) = d.flush_output()
        {
            debug!(fd, error = ?e, "Write failed");
            self.shutdown_descriptor(fd);
        }
    }

    fn flush_all(&mut self) {
        for d in self.sessions.iter_mut() {
            if let Err(e) = d.flush_output() {
                debug!(fd = d.fd, error = ?e, "Could not flush on exit");
            }
        }
    }

    fn dump_now(&mut self) -> Result<(), eyre::Report> {
        self.join_dumper();
        self.db
            .dump(&self.output_db)
            .wrap_err_with(|| format!("Dump to {} failed", self.output_db.display()))
    }

    /// Says goodbye to everyone and writes the database.
    pub fn shutdown(&mut self) -> Result<(), eyre::Report> {
        info!("Shutting down");
        let msg = format!(
            "{} {}",
            self.rt.config.server.muse_name, self.rt.config.messages.shutdown
        );
        self.sessions.broadcast(&msg);
        self.flush_all();
        self.dump_now()
    }

    /// Dumps, hands the live sockets to a fresh process image and execs it. Only returns if
    /// something went wrong on the way.
    pub fn reboot(&mut self, reboot_file: &Path) -> eyre::Report {
        info!("Rebooting");
        let msg = format!(
            "{} {}",
            self.rt.config.server.muse_name, self.rt.config.messages.reboot
        );
        self.sessions.broadcast(&msg);
        self.flush_all();
        if let Err(e) = self.dump_now() {
            return e;
        }
        let state = match self.reboot_state() {
            Ok(state) => state,
            Err(e) => return e,
        };
        if let Err(e) = state.write(reboot_file) {
            return e;
        }
        exec_self()
    }

    fn reboot_state(&mut self) -> Result<RebootState, eyre::Report> {
        let closing: Vec<RawFd> = self
            .sessions
            .iter()
            .filter(|d| !d.is_connected())
            .map(|d| d.fd)
            .collect();
        for fd in closing {
            self.sessions.remove(fd);
        }

        let listener_fd = self.listener.as_raw_fd();
        keep_on_exec(listener_fd).wrap_err("Could not keep listener across exec")?;
        let mut descriptors = vec![];
        for d in self.sessions.iter() {
            keep_on_exec(d.fd).wrap_err("Could not keep socket across exec")?;
            descriptors.push(SavedDescriptor {
                fd: d.fd,
                connected_at: d.connected_at,
                last_time: d.last_time,
                player: d.player,
                addr: d.addr.clone(),
            });
        }
        Ok(RebootState {
            started_at: self.started_at,
            listener_fd,
            descriptors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use demuse_db::DatabaseConfig;
    use pretty_assertions::assert_eq;
    use std::io::{Read, Write};

    struct Harness {
        server: Server,
        _dir: tempfile::TempDir,
    }

    impl Harness {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let mut db = MemoryDb::minimal(DatabaseConfig::default(), "potrzebie").unwrap();
            db.create_player("Alice", "secret").unwrap();
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.set_nonblocking(true).unwrap();
            let server = Server::new(db, Config::default(), listener, dir.path().join("out.db"));
            Self { server, _dir: dir }
        }

        fn client(&mut self) -> TcpStream {
            let addr = self.server.listener.local_addr().unwrap();
            let client = TcpStream::connect(addr).unwrap();
            client
                .set_read_timeout(Some(Duration::from_millis(50)))
                .unwrap();
            self.spin(|s| !s.sessions.is_empty());
            client
        }

        /// Steps the loop until `done` holds or a few seconds pass.
        fn spin(&mut self, done: impl Fn(&Server) -> bool) {
            for _ in 0..300 {
                if done(&self.server) {
                    return;
                }
                self.server.step();
            }
        }

        /// Steps and reads until `needle` shows up in the client's output.
        fn expect(&mut self, client: &mut TcpStream, needle: &str) -> String {
            let mut seen = String::new();
            let mut buf = [0u8; 4096];
            for _ in 0..100 {
                self.server.step();
                if let Ok(n) = client.read(&mut buf) {
                    seen.push_str(&String::from_utf8_lossy(&buf[..n]));
                }
                if seen.contains(needle) {
                    return seen;
                }
            }
            panic!("never saw {needle:?}; got {seen:?}");
        }
    }

    #[test]
    fn newcomers_are_welcomed() {
        let mut h = Harness::new();
        let mut client = h.client();
        let welcome = h.server.rt.config.messages.welcome.clone();
        h.expect(&mut client, &welcome);
    }

    #[test]
    fn a_session_from_login_to_quit() {
        let mut h = Harness::new();
        let mut client = h.client();
        client.write_all(b"connect Alice secret\n").unwrap();
        h.spin(|s| s.sessions.iter().any(Descriptor::is_connected));
        let alice = h.server.db.lookup_player("Alice").unwrap();
        assert!(h.server.db.flags_of(alice).unwrap().contains(ObjFlag::Connect));

        client.write_all(b"OUTPUTPREFIX <<\nthink hello\n").unwrap();
        let out = h.expect(&mut client, "hello )");
        let prefix = out.find("<<\n").unwrap();
        assert!(prefix < out.find("hello").unwrap());

        client.write_all(b"QUIT\n").unwrap();
        let leave = h.server.rt.config.messages.leave.clone();
        h.expect(&mut client, &leave);
        assert!(h.server.sessions.is_empty());
        assert!(!h.server.db.flags_of(alice).unwrap().contains(ObjFlag::Connect));
    }

    #[test]
    fn hangups_disconnect_players() {
        let mut h = Harness::new();
        let mut client = h.client();
        client.write_all(b"connect guest\n").unwrap();
        h.spin(|s| s.sessions.iter().any(Descriptor::is_connected));
        let guest = h.server.sessions.iter().next().unwrap().player;
        assert!(h.server.db.valid(guest));

        drop(client);
        h.spin(|s| s.sessions.is_empty());
        assert!(h.server.sessions.is_empty());
        assert!(!h.server.db.valid(guest));
    }

    #[test]
    fn quota_limits_commands_per_pass() {
        let mut h = Harness::new();
        let _client = h.client();
        let fd = h.server.sessions.fds()[0];
        let d = h.server.sessions.get_mut(fd).unwrap();
        d.quota = 2;
        for _ in 0..5 {
            d.lines.push_back("WHO".to_string());
        }
        h.server.process_commands();
        let d = h.server.sessions.get_mut(fd).unwrap();
        assert_eq!(d.quota, 0);
        assert_eq!(d.lines.len(), 3);
    }

    #[test]
    fn due_queue_work_runs_without_waiting() {
        let mut h = Harness::new();
        let alice = h.server.db.lookup_player("Alice").unwrap();
        h.server.exec().parse_que(alice, "think now", alice).unwrap();
        assert!(h.server.rt.scheduler.test_top());
        assert_eq!(h.server.poll_timeout(), 0);

        h.server.step();
        assert!(h.server.rt.scheduler.is_empty());
    }

    #[test]
    fn queued_work_not_yet_due_is_waited_for() {
        let mut h = Harness::new();
        let alice = h.server.db.lookup_player("Alice").unwrap();
        h.server.exec().wait_que(alice, 60, "think later", alice).unwrap();
        assert!(h.server.rt.scheduler.test_top());
        assert!(!h.server.queue_ready());
    }

    #[test]
    fn accepting_stops_short_of_the_reserved_descriptors() {
        let mut h = Harness::new();
        h.server.max_descriptors = h.server.rt.config.net.reserved_descriptors + 1;
        let addr = h.server.listener.local_addr().unwrap();
        let _first = TcpStream::connect(addr).unwrap();
        let _second = TcpStream::connect(addr).unwrap();

        h.server.accept_connections();
        assert_eq!(h.server.sessions.len(), 1);

        let fd = h.server.sessions.fds()[0];
        h.server.sessions.remove(fd);
        h.server.accept_connections();
        assert_eq!(h.server.sessions.len(), 1);
    }

    #[test]
    fn shutdown_dumps_the_database() {
        let mut h = Harness::new();
        h.server.shutdown().unwrap();
        let loaded = MemoryDb::load(&h.server.output_db).unwrap();
        assert!(loaded.lookup_player("Alice").is_some());
    }

    #[test]
    fn startup_clears_stale_connections_and_runs_startup_actions() {
        let mut h = Harness::new();
        let alice = h.server.db.lookup_player("Alice").unwrap();
        let mut flags = h.server.db.flags_of(alice).unwrap();
        flags.set(ObjFlag::Connect);
        h.server.db.set_flags_of(alice, flags).unwrap();
        h.server
            .db
            .set_attribute(alice, "Startup", "think booted")
            .unwrap();

        h.server.startup();
        assert!(!h.server.db.flags_of(alice).unwrap().contains(ObjFlag::Connect));
        let queued: Vec<_> = h.server.rt.scheduler.iter().map(|c| c.player).collect();
        assert_eq!(queued, vec![alice]);
    }
}
