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

use std::cmp::Ordering;

use crate::builtins::Arity::{Fixed, Variable};
use crate::builtins::{BfCallState, Builtin};
use crate::errors::EvalError;
use crate::eval::text::{bool_str, istrue};
use crate::eval::wild::wild_match;

fn bf_land(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    Ok(bool_str(istrue(bf_args.arg(0)) && istrue(bf_args.arg(1))))
}

fn bf_lor(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    Ok(bool_str(istrue(bf_args.arg(0)) || istrue(bf_args.arg(1))))
}

fn bf_lxor(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    Ok(bool_str(istrue(bf_args.arg(0)) != istrue(bf_args.arg(1))))
}

fn bf_lnot(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    Ok(bool_str(!istrue(bf_args.arg(0))))
}

fn bf_truth(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    Ok(bool_str(istrue(bf_args.arg(0))))
}

/// Usage: `if(cond, then)`
/// Empty when `cond` is false. Both arguments have already been evaluated.
fn bf_if(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    if istrue(bf_args.arg(0)) {
        return Ok(bf_args.arg(1).to_string());
    }
    Ok(String::new())
}

/// Usage: `ifelse(cond, then, else)`
fn bf_ifelse(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let branch = if istrue(bf_args.arg(0)) { 1 } else { 2 };
    Ok(bf_args.arg(branch).to_string())
}

/// Usage: `switch(value, pattern1, result1, [pattern2, result2, ...] [default])`
/// The result of the first wildcard pattern matching `value`, else the default (if any).
fn bf_switch(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    if bf_args.nargs() < 2 {
        return Err(EvalError::WrongNumberOfArgs);
    }
    let value = bf_args.arg(0);
    let mut i = 1;
    while i + 1 < bf_args.nargs() {
        if wild_match(bf_args.arg(i), value).is_some() {
            return Ok(bf_args.arg(i + 1).to_string());
        }
        i += 2;
    }
    Ok(bf_args.arg(i).to_string())
}

/// Usage: `scomp(a, b)`
/// Byte-wise string comparison, as `1`, `0` or `-1`.
fn bf_scomp(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let result = match bf_args.arg(0).cmp(bf_args.arg(1)) {
        Ordering::Less => "-1",
        Ordering::Equal => "0",
        Ordering::Greater => "1",
    };
    Ok(result.to_string())
}

pub(crate) fn register_bf_logic(builtins: &mut Vec<Builtin>) {
    builtins.extend([
        Builtin::new("land", Fixed(2), bf_land),
        Builtin::new("lor", Fixed(2), bf_lor),
        Builtin::new("lxor", Fixed(2), bf_lxor),
        Builtin::new("lnot", Fixed(1), bf_lnot),
        Builtin::new("truth", Fixed(1), bf_truth),
        Builtin::new("if", Fixed(2), bf_if),
        Builtin::new("ifelse", Fixed(3), bf_ifelse),
        Builtin::new("switch", Variable, bf_switch),
        Builtin::new("scomp", Fixed(2), bf_scomp),
    ]);
}

#[cfg(test)]
mod tests {
    use crate::testing::TestWorld;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("land(1,#-1)", "0")]
    #[test_case("lor(0,abc)", "1")]
    #[test_case("lxor(1,1)", "0")]
    #[test_case("lnot()", "#-1 Function (lnot) only expects 1 arguments")]
    #[test_case("lnot(0)", "1")]
    #[test_case("truth(#-2)", "0")]
    #[test_case("truth(0abc)", "0")]
    #[test_case("truth(abc)", "1")]
    #[test_case("if(1,yes)", "yes")]
    #[test_case("if(0,yes)", "")]
    #[test_case("ifelse(#-1,yes,no)", "no")]
    #[test_case("switch(banana,a*,first,b*,second,none)", "second")]
    #[test_case("switch(cherry,a*,first,b*,second,none)", "none")]
    #[test_case("switch(cherry,a*,first)", "")]
    #[test_case("switch(x)", "#-1 WRONG NUMBER OF ARGS")]
    #[test_case("scomp(apple,banana)", "-1")]
    #[test_case("scomp(b,B)", "1")]
    fn logic(expr: &str, expected: &str) {
        let mut world = TestWorld::new();
        assert_eq!(world.eval(expr), expected);
    }
}
