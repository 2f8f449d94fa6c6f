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

//! Builtin functions for integer and floating point arithmetic.

use std::cmp::Ordering;

use crate::builtins::Arity::Fixed;
use crate::builtins::{BfCallState, Builtin};
use crate::errors::EvalError;
use crate::eval::text::{atof, fmt_float};

/// `pow()` refuses results past e^54.758627264, about 6e23.
const POW_LIMIT: f64 = 54.758627264;

fn sign_str(ord: Ordering) -> String {
    match ord {
        Ordering::Greater => "1",
        Ordering::Less => "-1",
        Ordering::Equal => "0",
    }
    .to_string()
}

fn checked(result: Option<i64>) -> Result<String, EvalError> {
    result.map(|n| n.to_string()).ok_or(EvalError::Overflow)
}

/// Usage: `add(a, b)`
fn bf_add(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    checked(bf_args.int(0).checked_add(bf_args.int(1)))
}

/// Usage: `sub(a, b)`
fn bf_sub(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    checked(bf_args.int(0).checked_sub(bf_args.int(1)))
}

/// Usage: `mul(a, b)`
fn bf_mul(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    checked(bf_args.int(0).checked_mul(bf_args.int(1)))
}

/// Usage: `div(a, b)`
/// Integer division, truncating toward zero.
fn bf_div(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let bottom = bf_args.int(1);
    if bottom == 0 {
        return Err(EvalError::DivisionByZero);
    }
    checked(bf_args.int(0).checked_div(bottom))
}

/// Usage: `mod(a, b)`
/// The remainder of `div(a, b)`, with the sign of `a`.
fn bf_mod(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let bottom = bf_args.int(1);
    if bottom == 0 {
        return Err(EvalError::DivisionByZero);
    }
    checked(bf_args.int(0).checked_rem(bottom))
}

fn bf_abs(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    checked(bf_args.int(0).checked_abs())
}

fn bf_sgn(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    Ok(bf_args.int(0).signum().to_string())
}

/// Usage: `sqrt(n)`
/// The integer square root of `|n|`.
fn bf_sqrt(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let n = bf_args.int(0).unsigned_abs();
    Ok(((n as f64).sqrt() as i64).to_string())
}

fn bf_band(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    Ok((bf_args.int(0) & bf_args.int(1)).to_string())
}

fn bf_bor(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    Ok((bf_args.int(0) | bf_args.int(1)).to_string())
}

fn bf_bxor(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    Ok((bf_args.int(0) ^ bf_args.int(1)).to_string())
}

fn bf_bnot(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    Ok((!bf_args.int(0)).to_string())
}

/// Usage: `comp(a, b)`
/// `1`, `0` or `-1` as integer `a` is greater than, equal to or less than `b`.
fn bf_comp(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    Ok(sign_str(bf_args.int(0).cmp(&bf_args.int(1))))
}

/// Usage: `rand(n)`
/// A random integer from 0 to n-1.
fn bf_rand(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let modulus = bf_args.int(0).max(1);
    let r = i64::from(bf_args.exec.rt.random() & 0xffff);
    Ok((r % modulus).to_string())
}

/// Converts a number from one base to another, both between 2 and 36.
pub(crate) fn convert_base(num: &str, from: i64, to: i64) -> Result<String, EvalError> {
    if !(2..=36).contains(&from) || !(2..=36).contains(&to) {
        return Err(EvalError::Invalid("BASES MUST BE BETWEEN 2 AND 36"));
    }
    let (negative, digits) = match num.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, num),
    };
    let mut decimal: i64 = 0;
    for c in digits.chars() {
        let Some(digit) = c.to_digit(36) else {
            return Err(EvalError::Invalid("ILLEGAL DIGIT"));
        };
        let digit = i64::from(digit);
        if digit >= from {
            return Err(EvalError::Invalid("DIGIT OUT OF RANGE"));
        }
        decimal = decimal
            .checked_mul(from)
            .and_then(|d| d.checked_add(digit))
            .ok_or(EvalError::Overflow)?;
    }

    let mut out = vec![];
    while decimal > 0 {
        let digit = (decimal % to) as u32;
        out.push(char::from_digit(digit, 36).unwrap_or('?'));
        decimal /= to;
    }
    if out.is_empty() {
        out.push('0');
    }
    if negative {
        out.push('-');
    }
    Ok(out.into_iter().rev().collect())
}

/// Usage: `base(number, from, to)`
fn bf_base(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    convert_base(bf_args.arg(0), bf_args.int(1), bf_args.int(2))
}

fn bf_fadd(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    Ok(fmt_float(bf_args.float(0) + bf_args.float(1)))
}

fn bf_fsub(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    Ok(fmt_float(bf_args.float(0) - bf_args.float(1)))
}

fn bf_fmul(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    Ok(fmt_float(bf_args.float(0) * bf_args.float(1)))
}

fn bf_fdiv(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let bottom = bf_args.float(1);
    if bottom == 0.0 {
        return Err(EvalError::Invalid("Undefined"));
    }
    Ok(fmt_float(bf_args.float(0) / bottom))
}

fn float_sign(x: f64) -> String {
    sign_str(x.partial_cmp(&0.0).unwrap_or(Ordering::Equal))
}

fn bf_fsgn(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    Ok(float_sign(bf_args.float(0)))
}

fn bf_fsqrt(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let x = bf_args.float(0);
    if x < 0.0 {
        return Err(EvalError::Invalid("Complex"));
    }
    Ok(fmt_float(x.sqrt()))
}

/// Usage: `fabs(x)`
/// Non-negative arguments come back exactly as written.
fn bf_fabs(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let x = bf_args.float(0);
    if x < 0.0 {
        return Ok(fmt_float(-x));
    }
    Ok(bf_args.arg(0).to_string())
}

/// Usage: `fcomp(a, b)`
/// Compares to six decimal places.
fn bf_fcomp(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let difference = fmt_float(bf_args.float(0) - bf_args.float(1));
    Ok(float_sign(atof(&difference)))
}

fn bf_exp(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let x = bf_args.float(0);
    if !(-55.0..=55.0).contains(&x) {
        return Err(EvalError::Invalid("Overflow"));
    }
    Ok(fmt_float(x.exp()))
}

/// Usage: `pow(x, y)`
/// A negative base is raised to the floor of `y`.
fn bf_pow(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let x = bf_args.float(0);
    let y = if x < 0.0 {
        bf_args.float(1).floor()
    } else {
        bf_args.float(1)
    };
    let magnitude = x.abs();
    if magnitude > 1.0 && y * magnitude.ln() > POW_LIMIT {
        return Err(EvalError::Invalid("Overflow"));
    }
    Ok(fmt_float(x.powf(y)))
}

fn bf_log(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let x = bf_args.float(0);
    if x <= 0.0 {
        return Err(EvalError::Invalid("Undefined"));
    }
    Ok(fmt_float(x.log10()))
}

fn bf_ln(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let x = bf_args.float(0);
    if x <= 0.0 {
        return Err(EvalError::Invalid("Undefined"));
    }
    Ok(fmt_float(x.ln()))
}

fn unit_domain(x: f64, f: fn(f64) -> f64) -> Result<String, EvalError> {
    if !(-1.0..=1.0).contains(&x) {
        return Err(EvalError::Invalid("Undefined"));
    }
    Ok(fmt_float(f(x)))
}

fn bf_arcsin(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    unit_domain(bf_args.float(0), f64::asin)
}

fn bf_arccos(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    unit_domain(bf_args.float(0), f64::acos)
}

/// Usage: `arctan(x)`
/// Only defined on [-1, 1], like its siblings.
fn bf_arctan(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    unit_domain(bf_args.float(0), f64::atan)
}

fn bf_sin(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    Ok(fmt_float(bf_args.float(0).sin()))
}

fn bf_cos(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    Ok(fmt_float(bf_args.float(0).cos()))
}

fn bf_tan(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    Ok(fmt_float(bf_args.float(0).tan()))
}

pub(crate) fn register_bf_num(builtins: &mut Vec<Builtin>) {
    builtins.extend([
        Builtin::new("add", Fixed(2), bf_add),
        Builtin::new("sub", Fixed(2), bf_sub),
        Builtin::new("mul", Fixed(2), bf_mul),
        Builtin::new("div", Fixed(2), bf_div),
        Builtin::new("mod", Fixed(2), bf_mod),
        Builtin::new("abs", Fixed(1), bf_abs),
        Builtin::new("sgn", Fixed(1), bf_sgn),
        Builtin::new("sqrt", Fixed(1), bf_sqrt),
        Builtin::new("band", Fixed(2), bf_band),
        Builtin::new("bor", Fixed(2), bf_bor),
        Builtin::new("bxor", Fixed(2), bf_bxor),
        Builtin::new("bnot", Fixed(1), bf_bnot),
        Builtin::new("comp", Fixed(2), bf_comp),
        Builtin::new("rand", Fixed(1), bf_rand),
        Builtin::new("base", Fixed(3), bf_base),
        Builtin::new("fadd", Fixed(2), bf_fadd),
        Builtin::new("fsub", Fixed(2), bf_fsub),
        Builtin::new("fmul", Fixed(2), bf_fmul),
        Builtin::new("fdiv", Fixed(2), bf_fdiv),
        Builtin::new("fsgn", Fixed(1), bf_fsgn),
        Builtin::new("fsqrt", Fixed(1), bf_fsqrt),
        Builtin::new("fabs", Fixed(1), bf_fabs),
        Builtin::new("fcomp", Fixed(2), bf_fcomp),
        Builtin::new("exp", Fixed(1), bf_exp),
        Builtin::new("pow", Fixed(2), bf_pow),
        Builtin::new("log", Fixed(1), bf_log),
        Builtin::new("ln", Fixed(1), bf_ln),
        Builtin::new("arcsin", Fixed(1), bf_arcsin),
        Builtin::new("arccos", Fixed(1), bf_arccos),
        Builtin::new("arctan", Fixed(1), bf_arctan),
        Builtin::new("sin", Fixed(1), bf_sin),
        Builtin::new("cos", Fixed(1), bf_cos),
        Builtin::new("tan", Fixed(1), bf_tan),
    ]);
}
