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

//! A generation-counted pool of string buffers.
//!
//! Transient allocations live until the clearing checkpoint run between main loop iterations
//! has counted their timer down to zero. Permanent allocations (the captured `%0`-`%9` strings
//! of queued commands) live until they are explicitly released.

use tracing::warn;

/// How many checkpoints a transient allocation survives.
const TRANSIENT_TTL: u8 = 1;

/// A handle to a live allocation. Handles to reclaimed slots are detected by generation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ArenaKey {
    index: u32,
    generation: u32,
}

#[derive(Debug)]
struct Allocation {
    buf: String,
    permanent: bool,
    ttl: u8,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    allocation: Option<Allocation>,
}

#[derive(Debug, Default)]
pub struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live_bytes: usize,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, text: &str, permanent: bool) -> ArenaKey {
        let allocation = Allocation {
            buf: text.to_string(),
            permanent,
            ttl: TRANSIENT_TTL,
        };
        self.live_bytes += allocation.buf.len();
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.generation = slot.generation.wrapping_add(1);
                slot.allocation = Some(allocation);
                ArenaKey {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    allocation: Some(allocation),
                });
                ArenaKey {
                    index,
                    generation: 0,
                }
            }
        }
    }

    /// Allocate a scratch copy of `text`, reclaimed at the next checkpoint.
    pub fn alloc(&mut self, text: &str) -> ArenaKey {
        self.insert(text, false)
    }

    /// Allocate a copy of `text` that survives checkpoints until released.
    pub fn alloc_permanent(&mut self, text: &str) -> ArenaKey {
        self.insert(text, true)
    }

    fn allocation(&self, key: ArenaKey) -> Option<&Allocation> {
        let slot = self.slots.get(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.allocation.as_ref()
    }

    pub fn get(&self, key: ArenaKey) -> Option<&str> {
        self.allocation(key).map(|a| a.buf.as_str())
    }

    /// Release one allocation, permanent or not. Stale keys are ignored.
    pub fn release(&mut self, key: ArenaKey) -> Option<String> {
        let slot = self.slots.get_mut(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        let allocation = slot.allocation.take()?;
        self.live_bytes -= allocation.buf.len();
        self.free.push(key.index);
        Some(allocation.buf)
    }

    /// The clearing checkpoint: counts transient timers down and reclaims the expired ones.
    /// Must only run between top-level operations.
    pub fn clear(&mut self) -> usize {
        let mut reclaimed = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let expired = match slot.allocation.as_mut() {
                Some(a) if !a.permanent => {
                    a.ttl = a.ttl.saturating_sub(1);
                    a.ttl == 0
                }
                _ => false,
            };
            if expired {
                if let Some(a) = slot.allocation.take() {
                    self.live_bytes -= a.buf.len();
                }
                self.free.push(index as u32);
                reclaimed += 1;
            }
        }
        reclaimed
    }

    /// Drops everything, permanent allocations included. Used at shutdown.
    pub fn release_all(&mut self) {
        let live = self.live();
        if live > 0 {
            warn!(live, "Releasing arena allocations at shutdown");
        }
        self.slots.clear();
        self.free.clear();
        self.live_bytes = 0;
    }

    /// Number of live allocations.
    pub fn live(&self) -> usize {
        self.slots.iter().filter(|s| s.allocation.is_some()).count()
    }

    pub fn live_bytes(&self) -> usize {
        self.live_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn transient_allocations_die_at_checkpoint() {
        let mut arena = Arena::new();
        let scratch = arena.alloc("scratch");
        let kept = arena.alloc_permanent("kept");
        assert_eq!(arena.get(scratch), Some("scratch"));
        assert_eq!(arena.live_bytes(), 11);

        assert_eq!(arena.clear(), 1);
        assert_eq!(arena.get(scratch), None);
        assert_eq!(arena.get(kept), Some("kept"));
        assert_eq!(arena.live(), 1);

        assert_eq!(arena.release(kept).as_deref(), Some("kept"));
        assert_eq!(arena.live(), 0);
        assert_eq!(arena.live_bytes(), 0);
    }

    #[test]
    fn stale_keys_do_not_see_reused_slots() {
        let mut arena = Arena::new();
        let first = arena.alloc_permanent("one");
        arena.release(first);
        let second = arena.alloc_permanent("two");
        assert_eq!(arena.get(first), None);
        assert_eq!(arena.release(first), None);
        assert_eq!(arena.get(second), Some("two"));
    }
}
