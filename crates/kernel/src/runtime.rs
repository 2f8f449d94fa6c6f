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

use demuse_common::model::{Connections, ObjectType, WorldState};
use demuse_common::{Dbref, NOTHING};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::Env;
use crate::arena::Arena;
use crate::builtins::BuiltinRegistry;
use crate::config::Config;
use crate::eval::text::atol;
use crate::tasks::scheduler::Scheduler;

/// Process-wide mutable state of the kernel: the queue, the arena, the active `%0`-`%9`
/// registers and the evaluator's recursion counter. Owned by the server loop and lent to each
/// top-level operation through an [`ExecContext`].
pub struct Runtime {
    pub config: Config,
    pub(crate) builtins: BuiltinRegistry,
    pub scheduler: Scheduler,
    pub arena: Arena,
    pub(crate) env: Env,
    pub(crate) depth: i64,
    now: i64,
    rng: StdRng,
}

impl Runtime {
    pub fn new(config: Config) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// A runtime with reproducible queue surcharges and `rand()` results.
    pub fn with_seed(config: Config, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: Config, rng: StdRng) -> Self {
        Self {
            config,
            builtins: BuiltinRegistry::default(),
            scheduler: Scheduler::new(),
            arena: Arena::new(),
            env: Env::default(),
            depth: 0,
            now: 0,
            rng,
        }
    }

    /// The current time in seconds, sampled once per main loop iteration.
    pub fn now(&self) -> i64 {
        self.now
    }

    pub fn set_now(&mut self, now: i64) {
        self.now = now;
    }

    pub(crate) fn random(&mut self) -> u32 {
        self.rng.random()
    }

    pub fn reset_depth(&mut self) {
        self.depth = 0;
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn set_env(&mut self, env: Env) {
        self.env = env;
    }
}

/// Everything one top-level operation (a command, a released queue entry, a tick) works
/// against: the world, the sessions, and the runtime.
pub struct ExecContext<'a> {
    pub world: &'a mut dyn WorldState,
    pub connections: &'a mut dyn Connections,
    pub rt: &'a mut Runtime,
}

impl<'a> ExecContext<'a> {
    pub fn new(
        world: &'a mut dyn WorldState,
        connections: &'a mut dyn Connections,
        rt: &'a mut Runtime,
    ) -> Self {
        Self {
            world,
            connections,
            rt,
        }
    }

    pub fn notify(&mut self, player: Dbref, msg: &str) {
        self.connections.notify(player, msg);
    }

    /// Tells everything in `location` except `except`.
    pub fn notify_in(&mut self, location: Dbref, except: Dbref, msg: &str) {
        let Ok(contents) = self.world.contents_of(location) else {
            return;
        };
        for obj in contents.into_iter().filter(|o| *o != except) {
            self.connections.notify(obj, msg);
        }
    }

    /// The name of `obj`, or empty text for anything invalid.
    pub fn name(&self, obj: Dbref) -> String {
        self.world.name_of(obj).unwrap_or_default()
    }

    /// `Name(#N)`, as used in log lines and operator messages.
    pub fn unparse(&self, obj: Dbref) -> String {
        format!("{}({obj})", self.name(obj))
    }

    pub(crate) fn owner(&self, obj: Dbref) -> Dbref {
        self.world.owner_of(obj).unwrap_or(NOTHING)
    }

    pub(crate) fn location(&self, obj: Dbref) -> Dbref {
        self.world.location_of(obj).unwrap_or(NOTHING)
    }

    pub(crate) fn is_type(&self, obj: Dbref, otype: ObjectType) -> bool {
        self.world.object_type(obj).is_ok_and(|t| t == otype)
    }

    /// An attribute's text, empty when unset or unreadable.
    pub(crate) fn attr_text(&self, obj: Dbref, name: &str) -> String {
        self.world
            .attribute(obj, name)
            .ok()
            .flatten()
            .map(|a| a.value)
            .unwrap_or_default()
    }

    /// The actor's `Nice` setting, if it has one.
    pub(crate) fn nice(&self, player: Dbref) -> Option<i32> {
        let nice = self.attr_text(player, "Nice");
        (!nice.is_empty()).then(|| atol(&nice).clamp(i32::MIN as i64, i32::MAX as i64) as i32)
    }

    /// Evaluates one unit of `text` (a function call, a braced literal or a bare token) as
    /// `privs`, with `doer` as the subject.
    pub fn evaluate(&mut self, text: &str, privs: Dbref, doer: Dbref) -> String {
        let mut cur = text;
        self.museexec(&mut cur, privs, doer, false)
    }
}
