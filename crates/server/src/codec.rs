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

//! Byte-level framing for player sockets: newline-delimited input lines in, a bounded queue of
//! text blocks out.

use std::collections::VecDeque;
use std::io::{self, ErrorKind, Write};

/// Assembles raw socket bytes into command lines. Only printable ASCII is kept, so telnet
/// negotiation, carriage returns and other control bytes vanish; overlong lines are cut.
#[derive(Debug)]
pub struct LineAssembler {
    partial: String,
    max_len: usize,
}

impl LineAssembler {
    /// Lines hold at most `max_command_len - 1` characters.
    pub fn new(max_command_len: usize) -> Self {
        Self {
            partial: String::new(),
            max_len: max_command_len.saturating_sub(1),
        }
    }

    pub fn feed(&mut self, bytes: &[u8], lines: &mut VecDeque<String>) {
        for &b in bytes {
            if b == b'\n' {
                lines.push_back(std::mem::take(&mut self.partial));
            } else if (b.is_ascii_graphic() || b == b' ') && self.partial.len() < self.max_len {
                self.partial.push(b as char);
            }
        }
    }

    /// Whether an unterminated line is waiting for more input.
    pub fn has_partial(&self) -> bool {
        !self.partial.is_empty()
    }
}

/// Pending output for one socket. When a write would take it past its budget, the oldest
/// blocks are thrown away and a marker put in their place, so the client knows text was lost.
#[derive(Debug)]
pub struct OutputQueue {
    blocks: VecDeque<Vec<u8>>,
    size: usize,
    marker: Vec<u8>,
}

impl OutputQueue {
    pub fn new(flushed_marker: &str) -> Self {
        Self {
            blocks: VecDeque::new(),
            size: 0,
            marker: flushed_marker.as_bytes().to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Queues `bytes`, dropping the oldest output (and if need be the head of `bytes` itself)
    /// so the queue stays within `budget`.
    pub fn push(&mut self, bytes: &[u8], budget: usize) {
        if bytes.is_empty() {
            return;
        }
        let mut bytes = bytes;
        if self.size + bytes.len() > budget {
            let room = budget.saturating_sub(self.marker.len());
            if bytes.len() > room {
                bytes = &bytes[bytes.len() - room..];
            }
            self.discard((self.size + bytes.len()).saturating_sub(budget));
            if bytes.is_empty() {
                return;
            }
        }
        self.blocks.push_back(bytes.to_vec());
        self.size += bytes.len();
    }

    /// Drops whole blocks from the front until `n` bytes plus room for the marker are gone.
    fn discard(&mut self, n: usize) {
        let mut needed = n + self.marker.len();
        while needed > 0 {
            let Some(block) = self.blocks.pop_front() else {
                break;
            };
            needed = needed.saturating_sub(block.len());
            self.size -= block.len();
        }
        self.blocks.push_front(self.marker.clone());
        self.size += self.marker.len();
    }

    /// Writes as much as `sink` will take. Running into `WouldBlock` is not an error; anything
    /// else is, and leaves the remaining output queued.
    pub fn write_to(&mut self, sink: &mut impl Write) -> io::Result<usize> {
        let mut written = 0;
        while let Some(block) = self.blocks.front_mut() {
            match sink.write(block) {
                Ok(0) => return Err(ErrorKind::WriteZero.into()),
                Ok(n) => {
                    written += n;
                    self.size -= n;
                    if n == block.len() {
                        self.blocks.pop_front();
                    } else {
                        block.drain(..n);
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(written)
    }

    #[cfg(test)]
    fn contents(&self) -> String {
        self.blocks
            .iter()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn feed(assembler: &mut LineAssembler, bytes: &[u8]) -> Vec<String> {
        let mut lines = VecDeque::new();
        assembler.feed(bytes, &mut lines);
        lines.into_iter().collect()
    }

    #[test]
    fn lines_split_on_newline() {
        let mut assembler = LineAssembler::new(1000);
        assert_eq!(feed(&mut assembler, b"look\r\nsay hi\npar"), vec!["look", "say hi"]);
        assert!(assembler.has_partial());
        assert_eq!(feed(&mut assembler, b"tial\n"), vec!["partial"]);
        assert!(!assembler.has_partial());
    }

    #[test]
    fn control_bytes_are_dropped() {
        let mut assembler = LineAssembler::new(1000);
        let bytes = [255, 253, 1, b'h', b'i', 7, b'\t', 0xc3, 0xa9, b'\n'];
        assert_eq!(feed(&mut assembler, &bytes), vec!["hi"]);
    }

    #[test]
    fn long_lines_are_truncated() {
        let mut assembler = LineAssembler::new(6);
        assert_eq!(feed(&mut assembler, b"abcdefghij\nxy\n"), vec!["abcde", "xy"]);
    }

    #[test]
    fn blank_lines_survive() {
        let mut assembler = LineAssembler::new(100);
        assert_eq!(feed(&mut assembler, b"\n\n"), vec!["", ""]);
    }

    #[test]
    fn overflow_replaces_oldest_output_with_a_marker() {
        let mut queue = OutputQueue::new("<flushed>\n");
        for _ in 0..3 {
            queue.push(b"aaaaaaaaa\n", 30);
        }
        assert_eq!(queue.len(), 30);
        queue.push(b"bbbb\n", 30);
        assert_eq!(queue.contents(), "<flushed>\naaaaaaaaa\nbbbb\n");
        assert_eq!(queue.len(), 25);
    }

    #[test]
    fn oversized_blocks_keep_only_their_tail() {
        let mut queue = OutputQueue::new("<flushed>\n");
        queue.push(b"old\n", 30);
        queue.push(b"0123456789abcdefghijklmnopqrstuvwxyz\n", 30);
        assert_eq!(queue.contents(), "<flushed>\nhijklmnopqrstuvwxyz\n");
        assert_eq!(queue.len(), 30);

        let mut fresh = OutputQueue::new("<flushed>\n");
        fresh.push(&[b'x'; 100], 30);
        assert_eq!(fresh.len(), 30);
        assert!(fresh.contents().starts_with("<flushed>\n"));
    }

    #[test]
    fn partial_writes_keep_the_rest() {
        struct Trickle(Vec<u8>);
        impl Write for Trickle {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                if self.0.len() >= 4 {
                    return Err(ErrorKind::WouldBlock.into());
                }
                let n = buf.len().min(3);
                self.0.extend_from_slice(&buf[..n]);
                Ok(n)
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut queue = OutputQueue::new("");
        queue.push(b"hello\n", 100);
        let mut sink = Trickle(vec![]);
        assert_eq!(queue.write_to(&mut sink).unwrap(), 6);
        assert!(queue.is_empty());

        let mut queue = OutputQueue::new("");
        queue.push(b"hello\n", 100);
        queue.push(b"world\n", 100);
        let mut sink = Trickle(vec![]);
        assert_eq!(queue.write_to(&mut sink).unwrap(), 6);
        assert_eq!(queue.contents(), "world\n");
    }
}
