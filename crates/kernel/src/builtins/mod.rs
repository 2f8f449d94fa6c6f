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

use std::sync::Arc;

use demuse_common::model::{Power, WorldStateError};
use demuse_common::{Dbref, NOTHING};
use lazy_static::lazy_static;
use smallvec::SmallVec;

use crate::builtins::bf_connection::register_bf_connection;
use crate::builtins::bf_logic::register_bf_logic;
use crate::builtins::bf_num::register_bf_num;
use crate::builtins::bf_objects::register_bf_objects;
use crate::builtins::bf_strings::register_bf_strings;
use crate::builtins::bf_subst::register_bf_subst;
use crate::builtins::bf_time::register_bf_time;
use crate::errors::EvalError;
use crate::eval::text::{atof, atol};
use crate::runtime::ExecContext;

mod bf_connection;
mod bf_logic;
mod bf_num;
mod bf_objects;
mod bf_strings;
mod bf_subst;
mod bf_time;

pub use bf_time::{duration_full, duration_long, duration_short};

/// No call ever receives more arguments than this.
pub const MAX_ARGS: usize = 10;

lazy_static! {
    static ref BUILTINS: BuiltinRegistry = BuiltinRegistry::new();
}

/// How many arguments a builtin takes. Variable arity functions check their own count.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Arity {
    Fixed(usize),
    Variable,
}

pub(crate) type BuiltinFunction = fn(&mut BfCallState<'_, '_>) -> Result<String, EvalError>;

#[derive(Clone, Copy, Debug)]
pub struct Builtin {
    pub name: &'static str,
    pub arity: Arity,
    pub(crate) func: BuiltinFunction,
}

impl Builtin {
    pub(crate) const fn new(name: &'static str, arity: Arity, func: BuiltinFunction) -> Self {
        Self { name, arity, func }
    }
}

/// The bundle of builtins, sorted by name so a call can be resolved by binary search.
#[derive(Clone)]
pub struct BuiltinRegistry {
    builtins: Arc<Vec<Builtin>>,
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        BUILTINS.clone()
    }
}

impl BuiltinRegistry {
    pub fn new() -> Self {
        let mut builtins = Vec::with_capacity(160);
        register_bf_num(&mut builtins);
        register_bf_logic(&mut builtins);
        register_bf_strings(&mut builtins);
        register_bf_subst(&mut builtins);
        register_bf_objects(&mut builtins);
        register_bf_connection(&mut builtins);
        register_bf_time(&mut builtins);
        builtins.sort_by(|a, b| a.name.cmp(b.name));

        BuiltinRegistry {
            builtins: Arc::new(builtins),
        }
    }

    /// Case-insensitive lookup.
    pub fn lookup(&self, name: &str) -> Option<Builtin> {
        let name = name.to_ascii_lowercase();
        self.builtins
            .binary_search_by(|b| b.name.cmp(name.as_str()))
            .ok()
            .map(|i| self.builtins[i])
    }

    pub fn len(&self) -> usize {
        self.builtins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builtins.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.builtins.iter().map(|b| b.name)
    }
}

/// The arguments and other state passed to a built-in function.
pub struct BfCallState<'a, 'b> {
    /// The evaluated arguments.
    pub(crate) args: SmallVec<[String; 4]>,
    /// Whose permissions the call runs with.
    pub(crate) privs: Dbref,
    /// The subject of the evaluation: `%n`, `%#`, `me`.
    pub(crate) doer: Dbref,
    pub(crate) exec: &'a mut ExecContext<'b>,
}

impl BfCallState<'_, '_> {
    /// Argument `i`, or empty text if it wasn't supplied.
    pub fn arg(&self, i: usize) -> &str {
        self.args.get(i).map_or("", String::as_str)
    }

    pub fn int(&self, i: usize) -> i64 {
        atol(self.arg(i))
    }

    pub fn float(&self, i: usize) -> f64 {
        atof(self.arg(i))
    }

    pub fn nargs(&self) -> usize {
        self.args.len()
    }

    /// Resolves argument `i` to an object the way commands do. A failed or ambiguous match
    /// tells the caller's privilege object why and yields `NOTHING`.
    pub fn match_thing(&mut self, i: usize) -> Dbref {
        let name = self.arg(i).to_string();
        self.match_name(&name)
    }

    pub(crate) fn match_name(&mut self, name: &str) -> Dbref {
        match self.exec.world.match_thing(self.privs, name) {
            Ok(obj) => obj,
            Err(e) => {
                let msg = match e {
                    WorldStateError::AmbiguousMatch(_) => "I don't know which one you mean!",
                    _ => "I don't see that here.",
                };
                self.exec.notify(self.privs, msg);
                NOTHING
            }
        }
    }

    /// Resolves argument `i` without complaining about failures.
    pub fn match_quietly(&self, i: usize) -> Dbref {
        self.exec
            .world
            .match_thing(self.privs, self.arg(i))
            .unwrap_or(NOTHING)
    }

    pub fn controls(&self, what: Dbref, power: Power) -> bool {
        self.exec.world.controls(self.privs, what, power)
    }
}

/// Space separated dbrefs, cut short with ` #-1` once the list would pass 990 characters.
pub(crate) fn dbref_list(objs: impl IntoIterator<Item = Dbref>) -> String {
    let mut out = String::new();
    for obj in objs {
        let item = if out.is_empty() {
            obj.to_string()
        } else {
            format!(" {obj}")
        };
        if !out.is_empty() && out.len() + item.len() > 990 {
            out.push_str(" #-1");
            break;
        }
        out.push_str(&item);
    }
    out
}
