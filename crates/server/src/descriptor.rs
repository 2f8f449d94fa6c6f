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

use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read};
use std::net::TcpStream;
use std::os::fd::{AsRawFd, RawFd};

use demuse_common::model::ConnectionInfo;
use demuse_common::{Dbref, NOTHING};
use demuse_kernel::config::NetConfig;

use crate::codec::{LineAssembler, OutputQueue};

/// Where a socket is in the login dance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnState {
    AwaitingConnect,
    /// `connect <name>` was given without a password; the name is held until one arrives.
    AwaitingPassword(String),
    Connected,
    /// Carried over from before an in-place reboot, not yet re-announced.
    Restored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    Open,
    Closed,
}

pub struct Descriptor {
    pub fd: RawFd,
    stream: TcpStream,
    pub state: ConnState,
    pub player: Dbref,
    pub connected_at: i64,
    pub last_time: i64,
    /// Commands this socket may still run before the next refill.
    pub quota: i32,
    pub addr: String,
    pub user: String,
    pub output_prefix: Option<String>,
    pub output_suffix: Option<String>,
    pub pueblo: bool,
    input: LineAssembler,
    pub lines: VecDeque<String>,
    output: OutputQueue,
    max_output: usize,
    max_output_pueblo: usize,
}

impl Descriptor {
    pub fn new(stream: TcpStream, addr: String, now: i64, net: &NetConfig, flushed: &str) -> Self {
        Self {
            fd: stream.as_raw_fd(),
            stream,
            state: ConnState::AwaitingConnect,
            player: NOTHING,
            connected_at: now,
            last_time: now,
            quota: net.command_burst_size,
            addr,
            user: String::new(),
            output_prefix: None,
            output_suffix: None,
            pueblo: false,
            input: LineAssembler::new(net.max_command_len),
            lines: VecDeque::new(),
            output: OutputQueue::new(flushed),
            max_output: net.max_output,
            max_output_pueblo: net.max_output_pueblo,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnState::Connected
    }

    fn budget(&self) -> usize {
        if self.pueblo {
            self.max_output_pueblo
        } else {
            self.max_output
        }
    }

    pub fn queue_bytes(&mut self, bytes: &[u8]) {
        let budget = self.budget();
        self.output.push(bytes, budget);
    }

    pub fn queue_str(&mut self, text: &str) {
        self.queue_bytes(text.as_bytes());
    }

    pub fn queue_line(&mut self, text: &str) {
        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');
        self.queue_bytes(line.as_bytes());
    }

    /// One read from the socket, split into lines. A peer that has gone away reads as `Closed`.
    pub fn read_input(&mut self) -> io::Result<ReadOutcome> {
        let mut buf = [0u8; 4096];
        loop {
            match self.stream.read(&mut buf) {
                Ok(0) => return Ok(ReadOutcome::Closed),
                Ok(n) => {
                    self.input.feed(&buf[..n], &mut self.lines);
                    return Ok(ReadOutcome::Open);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(ReadOutcome::Open),
                Err(e) => return Err(e),
            }
        }
    }

    pub fn flush_output(&mut self) -> io::Result<usize> {
        self.output.write_to(&mut self.stream)
    }

    /// Sockets with whole lines still waiting are not read from until those have run.
    pub fn wants_read(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn wants_write(&self) -> bool {
        !self.output.is_empty()
    }

    /// A line is waiting and the socket may run it now.
    pub fn has_work(&self) -> bool {
        self.quota > 0 && !self.lines.is_empty()
    }

    pub fn refill(&mut self, amount: i32, burst: i32) {
        self.quota = self.quota.saturating_add(amount).min(burst);
    }

    pub fn info(&self) -> Option<ConnectionInfo> {
        self.is_connected().then(|| ConnectionInfo {
            player: self.player,
            descriptor: i64::from(self.fd),
            connected_at: self.connected_at,
            last_time: self.last_time,
            user: self.user.clone(),
            addr: self.addr.clone(),
        })
    }

    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use std::net::TcpListener;

    /// A connected loopback pair: the server-side descriptor and the client's end.
    pub(crate) fn pair(net: &NetConfig) -> (Descriptor, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, addr) = listener.accept().unwrap();
        server.set_nonblocking(true).unwrap();
        let descriptor = Descriptor::new(server, addr.ip().to_string(), 100, net, "<flushed>\n");
        (descriptor, client)
    }

    fn read_lines(descriptor: &mut Descriptor) -> ReadOutcome {
        for _ in 0..200 {
            let outcome = descriptor.read_input().unwrap();
            if outcome == ReadOutcome::Closed || !descriptor.lines.is_empty() {
                return outcome;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        ReadOutcome::Open
    }

    #[test]
    fn reads_lines_and_notices_hangup() {
        let (mut descriptor, mut client) = pair(&NetConfig::default());
        client.write_all(b"WHO\r\n").unwrap();
        assert_eq!(read_lines(&mut descriptor), ReadOutcome::Open);
        assert_eq!(descriptor.lines.pop_front(), Some("WHO".to_string()));
        assert!(descriptor.wants_read());

        drop(client);
        assert_eq!(read_lines(&mut descriptor), ReadOutcome::Closed);
    }

    #[test]
    fn flushes_queued_output() {
        let (mut descriptor, mut client) = pair(&NetConfig::default());
        descriptor.queue_line("hello");
        assert!(descriptor.wants_write());
        assert_eq!(descriptor.flush_output().unwrap(), 6);
        assert!(!descriptor.wants_write());

        let mut buf = [0u8; 6];
        std::io::Read::read_exact(&mut client, &mut buf).unwrap();
        assert_eq!(&buf, b"hello\n");
    }

    #[test]
    fn quota_refills_up_to_the_burst() {
        let net = NetConfig {
            command_burst_size: 3,
            ..NetConfig::default()
        };
        let (mut descriptor, _client) = pair(&net);
        assert_eq!(descriptor.quota, 3);
        descriptor.quota = 0;
        descriptor.lines.push_back("look".to_string());
        assert!(!descriptor.has_work());
        descriptor.refill(1, 3);
        assert!(descriptor.has_work());
        descriptor.refill(10, 3);
        assert_eq!(descriptor.quota, 3);
    }

    #[test]
    fn only_connected_sockets_are_listed() {
        let (mut descriptor, _client) = pair(&NetConfig::default());
        assert!(descriptor.info().is_none());
        descriptor.state = ConnState::Connected;
        descriptor.player = Dbref(7);
        let info = descriptor.info().unwrap();
        assert_eq!(info.player, Dbref(7));
        assert_eq!(info.descriptor, i64::from(descriptor.fd));
    }
}
