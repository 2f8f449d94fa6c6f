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

//! The expression evaluator.
//!
//! Evaluation consumes one unit at a time from a cursor into the source text: a braced literal,
//! a bare token, or a `name(args)` call. Calls dispatch to the builtin registry, then to
//! user-defined function attributes, and otherwise reproduce their own text. Every unit is
//! charged against a recursion budget shared by the whole top-level command, so runaway
//! scripts end in `#-1 RECURSION_LIMIT` instead of exhausting the stack.

use demuse_common::Dbref;
use demuse_common::model::{AttrFlag, Attribute, PlayerClass};
use smallvec::SmallVec;
use tracing::trace;

use crate::Env;
use crate::builtins::{Arity, BfCallState, MAX_ARGS};
use crate::errors::EvalError;
use crate::eval::text::{atol, truncate_to};
use crate::runtime::ExecContext;
use crate::zones::zones;

pub mod subst;
pub mod text;
pub mod wild;

fn trim_end(s: &mut String) {
    let len = s.trim_end().len();
    s.truncate(len);
}

fn advance(cur: &mut &str) {
    let s = *cur;
    let mut chars = s.chars();
    chars.next();
    *cur = chars.as_str();
}

/// The length of the balanced `{...}` group that opens `s`, closing brace included. An
/// unterminated group runs to the end.
fn brace_group_len(s: &str) -> usize {
    let mut depth = 0;
    for (i, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
    }
    s.len()
}

/// An unknown call reproduces itself: the name, the open paren, and everything up to the paren
/// that balances it. The cursor is left on that closing paren.
fn literal_call(cur: &mut &str, mut name: String) -> String {
    let s = *cur;
    let mut deep = 2;
    let mut consumed = 0;
    for c in s.chars() {
        if deep == 0 {
            break;
        }
        consumed += c.len_utf8();
        match c {
            '(' => deep += 1,
            ')' => deep -= 1,
            _ => {}
        }
    }
    if consumed < s.len() {
        let last = s[..consumed].chars().next_back().map_or(0, char::len_utf8);
        consumed -= last;
    }
    name.push('(');
    name.push_str(&s[..consumed]);
    *cur = &s[consumed..];
    name
}

impl ExecContext<'_> {
    fn recursion_limit(&self, privs: Dbref) -> i64 {
        let eval = &self.rt.config.eval;
        if self.world.class_of(privs).ok() == Some(PlayerClass::Guest) {
            eval.guest_recursion_limit
        } else {
            eval.recursion_limit
        }
    }

    fn finish(&mut self, mut out: String, refund: i64) -> String {
        self.rt.depth -= refund;
        truncate_to(&mut out, self.rt.config.eval.max_eval_output);
        out
    }

    /// Evaluates one unit from `cur`, advancing it past what was consumed.
    ///
    /// `)` and `]` end a unit and are left for the caller; so is `,` when `comma` is set.
    pub fn museexec(&mut self, cur: &mut &str, privs: Dbref, doer: Dbref, comma: bool) -> String {
        let charge = self.rt.config.eval.recursion_charge;
        self.rt.depth += charge;
        if self.rt.depth > self.recursion_limit(privs) {
            *cur = "";
            return EvalError::RecursionLimit.to_string();
        }

        let src = *cur;
        let s = src.trim_start();
        let mut out = String::new();
        let mut i = 0;
        while let Some(c) = s[i..].chars().next() {
            match c {
                ')' | ']' => {
                    *cur = &s[i..];
                    trim_end(&mut out);
                    return self.finish(out, 1);
                }
                ',' if comma => {
                    *cur = &s[i..];
                    trim_end(&mut out);
                    return self.finish(out, 1);
                }
                '(' => {
                    trim_end(&mut out);
                    *cur = &s[i + 1..];
                    if out.is_empty() {
                        return self.finish(out, 1);
                    }
                    let result = self.do_fun(cur, out, privs, doer);
                    return self.finish(result, 1);
                }
                '{' if out.is_empty() => {
                    let len = brace_group_len(&s[i..]);
                    let group = &s[i + 1..i + len];
                    let mut literal = group.strip_suffix('}').unwrap_or(group).to_string();
                    trim_end(&mut literal);
                    *cur = &s[i + len..];
                    return self.finish(literal, 1);
                }
                '{' => {
                    let len = brace_group_len(&s[i..]);
                    out.push_str(&s[i..i + len]);
                    i += len;
                }
                _ => {
                    out.push(c);
                    i += c.len_utf8();
                }
            }
        }
        *cur = "";
        trim_end(&mut out);
        self.finish(out, charge - 1)
    }

    /// Evaluates up to ten comma separated arguments, consuming the closing paren.
    fn parse_args(&mut self, cur: &mut &str, privs: Dbref, doer: Dbref) -> SmallVec<[String; 4]> {
        let mut args = SmallVec::new();
        while args.len() < MAX_ARGS && !cur.is_empty() && !cur.starts_with(')') {
            let s = *cur;
            if let Some(rest) = s.strip_prefix(',') {
                *cur = rest;
            }
            args.push(self.museexec(cur, privs, doer, true));
        }
        if args.len() == MAX_ARGS && cur.starts_with(',') {
            // Surplus arguments are skipped unevaluated.
            let s = *cur;
            let mut depth = 0;
            let skip = s
                .char_indices()
                .find(|&(_, c)| {
                    match c {
                        '(' => depth += 1,
                        ')' if depth == 0 => return true,
                        ')' => depth -= 1,
                        _ => {}
                    }
                    false
                })
                .map_or(s.len(), |(i, _)| i);
            *cur = &s[skip..];
        }
        if !cur.is_empty() {
            advance(cur);
        }
        args
    }

    /// Dispatches a call to `name`, whose open paren has already been consumed.
    fn do_fun(&mut self, cur: &mut &str, name: String, privs: Dbref, doer: Dbref) -> String {
        let Some(builtin) = self.rt.builtins.lookup(&name) else {
            if let Some(result) = self.udef_fun(cur, &name, privs, doer) {
                return result;
            }
            return literal_call(cur, name);
        };
        let args = self.parse_args(cur, privs, doer);
        if let Arity::Fixed(expected) = builtin.arity
            && expected != args.len()
        {
            return EvalError::WrongArgCount(builtin.name, expected).to_string();
        }
        trace!(function = builtin.name, ?args, "Calling builtin");
        let mut bf_args = BfCallState {
            args,
            privs,
            doer,
            exec: &mut *self,
        };
        match (builtin.func)(&mut bf_args) {
            Ok(result) => result,
            Err(e) => e.to_string(),
        }
    }

    /// Finds the function attribute a call to `name` resolves to: `#N:attr` names one object
    /// explicitly, otherwise the evaluating object and then its zones are searched.
    fn find_user_function(&self, name: &str, privs: Dbref) -> Option<Attribute> {
        let usable = |a: &Attribute| a.has(AttrFlag::Function) && !a.has(AttrFlag::Haven);
        if let Some(rest) = name.strip_prefix('#')
            && let Some((num, attr_name)) = rest.split_once(':')
        {
            let obj = Dbref(atol(num));
            if !self.world.valid(obj) {
                return None;
            }
            let attr = self.world.attribute(obj, attr_name).ok().flatten()?;
            return (usable(&attr) && self.world.can_see_attribute(privs, obj, &attr))
                .then_some(attr);
        }
        if let Some(attr) = self.world.attribute(privs, name).ok().flatten()
            && usable(&attr)
        {
            return Some(attr);
        }
        zones(&*self.world, privs).into_iter().find_map(|zone| {
            self.world
                .attribute(zone, name)
                .ok()
                .flatten()
                .filter(|a| usable(a))
        })
    }

    /// Calls a user-defined function, binding its arguments to `%0`-`%9` for the duration.
    fn udef_fun(&mut self, cur: &mut &str, name: &str, privs: Dbref, doer: Dbref) -> Option<String> {
        let attr = self.find_user_function(name, privs)?;
        let mut args: Env = std::array::from_fn(|_| Some(String::new()));
        let mut parsed = 0;
        while parsed < MAX_ARGS && !cur.is_empty() && !cur.starts_with(')') {
            let s = *cur;
            if let Some(rest) = s.strip_prefix(',') {
                *cur = rest;
            }
            args[parsed] = Some(self.museexec(cur, privs, doer, true));
            parsed += 1;
        }
        if !cur.is_empty() {
            advance(cur);
        }
        trace!(function = name, privs = %privs, "Calling user function");
        let saved = std::mem::replace(&mut self.rt.env, args);
        let result = self.pronoun_substitute(doer, &attr.value, privs);
        self.rt.env = saved;
        Some(result)
    }
}
