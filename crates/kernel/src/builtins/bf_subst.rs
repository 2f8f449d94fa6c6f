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

//! Functions that run pronoun substitution or read registers and attributes.

use demuse_common::model::Power;
use demuse_common::{Dbref, NOTHING};

use crate::Env;
use crate::builtins::Arity::{Fixed, Variable};
use crate::builtins::{BfCallState, Builtin};
use crate::errors::EvalError;
use crate::eval::text::{parse_up, truncate_to};

/// `foreach()` output stops growing past this.
const FOREACH_LIMIT: usize = 1000;

impl BfCallState<'_, '_> {
    /// Substitutes `template` with `%0`-`%9` temporarily replaced by `env`.
    fn substitute_with(&mut self, subject: Dbref, template: &str, privs: Dbref, env: Env) -> String {
        let saved = std::mem::replace(&mut self.exec.rt.env, env);
        let result = self.exec.pronoun_substitute(subject, template, privs);
        self.exec.rt.env = saved;
        result
    }

    /// Arguments `from..` as registers, the rest cleared.
    fn args_as_env(&self, from: usize) -> Env {
        std::array::from_fn(|i| self.args.get(from + i).cloned())
    }

    /// Resolves the subject and privilege object of `s_as()` and `s_as_with()`.
    fn substitution_identity(&mut self) -> Result<(Dbref, Dbref), EvalError> {
        let doer = self.match_thing(1);
        let privs = self.match_thing(2);
        if doer == NOTHING || privs == NOTHING {
            return Err(EvalError::Failed);
        }
        if !self.controls(privs, Power::Modify) {
            return Err(EvalError::PermissionDenied);
        }
        Ok((doer, privs))
    }
}

/// Usage: `s(text)`
/// Pronoun substitution of `text`, with the caller's subject and permissions.
fn bf_s(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let template = bf_args.arg(0).to_string();
    Ok(bf_args
        .exec
        .pronoun_substitute(bf_args.doer, &template, bf_args.privs))
}

/// Usage: `s_with(text, arg0, arg1, ...)`
/// As `s()`, with the remaining arguments bound to `%0`-`%8`.
fn bf_s_with(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    if bf_args.nargs() < 1 {
        return Err(EvalError::Failed);
    }
    let template = bf_args.arg(0).to_string();
    let env = bf_args.args_as_env(1);
    let (doer, privs) = (bf_args.doer, bf_args.privs);
    Ok(bf_args.substitute_with(doer, &template, privs, env))
}

/// Usage: `s_as(text, subject, privs)`
/// Substitutes as another subject and privilege object. The caller must control `privs`.
fn bf_s_as(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let (doer, privs) = bf_args.substitution_identity()?;
    let template = bf_args.arg(0).to_string();
    Ok(bf_args.exec.pronoun_substitute(doer, &template, privs))
}

/// Usage: `s_as_with(text, subject, privs, arg0, ...)`
fn bf_s_as_with(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    if bf_args.nargs() < 3 {
        return Err(EvalError::Failed);
    }
    let (doer, privs) = bf_args.substitution_identity()?;
    let template = bf_args.arg(0).to_string();
    let env = bf_args.args_as_env(3);
    Ok(bf_args.substitute_with(doer, &template, privs, env))
}

/// Usage: `v(name)`
/// A register or one of the caller's attributes. Single characters name registers: `0`-`9`,
/// `n` (subject's name), `c` (subject's coloured name), `#` (subject) and `!` (caller).
fn bf_v(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let name = bf_args.arg(0);
    let mut chars = name.chars();
    let (Some(c), None) = (chars.next(), chars.next()) else {
        if name.is_empty() {
            return Ok(String::new());
        }
        let privs = bf_args.privs;
        let world = &bf_args.exec.world;
        return Ok(match world.attribute(privs, name) {
            Ok(Some(attr)) if world.can_see_attribute(privs, privs, &attr) => attr.value,
            _ => String::new(),
        });
    };
    let doer = bf_args.doer;
    let value = match c {
        '0'..='9' => bf_args.exec.rt.env[c as usize - '0' as usize]
            .clone()
            .unwrap_or_default(),
        'n' | 'N' => bf_args.exec.name(doer),
        'c' | 'C' => bf_args.exec.world.cname_of(doer).unwrap_or_default(),
        '#' => doer.to_string(),
        '!' => bf_args.privs.to_string(),
        _ => String::new(),
    };
    Ok(value)
}

/// Usage: `get(object/attribute)` or `get(object, attribute)`
fn bf_get(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let (object, attr_name) = match bf_args.nargs() {
        1 => match bf_args.arg(0).split_once('/') {
            Some((o, a)) => (o.to_string(), a.to_string()),
            None => return Err(EvalError::NoMatch),
        },
        2 => (bf_args.arg(0).to_string(), bf_args.arg(1).to_string()),
        _ => return Err(EvalError::WrongNumberOfArgs),
    };
    let thing = bf_args.match_name(&object);
    if thing == NOTHING {
        return Err(EvalError::NoMatch);
    }
    let world = &bf_args.exec.world;
    let Some(attr) = world.attribute(thing, &attr_name)? else {
        return Err(EvalError::NoMatch);
    };
    if !world.can_see_attribute(bf_args.privs, thing, &attr) {
        return Err(EvalError::PermissionDenied);
    }
    Ok(attr.value)
}

/// Usage: `foreach(list, template)`
/// Substitutes `template` once per word of `list`, with the word in `%0`.
fn bf_foreach(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let list = bf_args.arg(0).to_string();
    let template = bf_args.arg(1).to_string();
    let (doer, privs) = (bf_args.doer, bf_args.privs);
    let mut out = String::new();
    let mut rest = list.as_str();
    while out.len() < FOREACH_LIMIT
        && let Some(item) = parse_up(&mut rest, ' ')
    {
        let mut env = bf_args.exec.rt.env.clone();
        env[0] = Some(item.to_string());
        let piece = bf_args.substitute_with(doer, &template, privs, env);
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&piece);
    }
    truncate_to(&mut out, FOREACH_LIMIT);
    Ok(out)
}

pub(crate) fn register_bf_subst(builtins: &mut Vec<Builtin>) {
    builtins.extend([
        Builtin::new("s", Fixed(1), bf_s),
        Builtin::new("s_with", Variable, bf_s_with),
        Builtin::new("s_as", Fixed(3), bf_s_as),
        Builtin::new("s_as_with", Variable, bf_s_as_with),
        Builtin::new("v", Fixed(1), bf_v),
        Builtin::new("get", Variable, bf_get),
        Builtin::new("foreach", Fixed(2), bf_foreach),
    ]);
}
