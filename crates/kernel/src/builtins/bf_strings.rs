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

//! String and word list functions. Lists are words separated by spaces.

use crate::builtins::Arity::Fixed;
use crate::builtins::{BfCallState, Builtin};
use crate::errors::EvalError;
use crate::eval::text::words;
use crate::eval::wild::wild_match;

/// Padding and repetition never produce more than this.
const MAX_PAD: i64 = 950;

fn skip_spaces(s: &[u8], mut pos: usize) -> usize {
    while pos < s.len() && s[pos] == b' ' {
        pos += 1;
    }
    pos
}

fn skip_word(s: &[u8], mut pos: usize) -> usize {
    while pos < s.len() && s[pos] != b' ' {
        pos += 1;
    }
    pos
}

fn bf_strlen(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    Ok(bf_args.arg(0).chars().count().to_string())
}

fn bf_strcat(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    Ok(format!("{}{}", bf_args.arg(0), bf_args.arg(1)))
}

/// Usage: `mid(string, first, length)`
/// `length` characters starting at zero-based position `first`.
fn bf_mid(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let (first, len) = (bf_args.int(1), bf_args.int(2));
    if first < 0 || len < 0 {
        return Err(EvalError::Invalid("OUT OF RANGE"));
    }
    Ok(bf_args
        .arg(0)
        .chars()
        .skip(first as usize)
        .take(len as usize)
        .collect())
}

fn bf_first(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let s = bf_args.arg(0).trim_start_matches(' ');
    Ok(s.split(' ').next().unwrap_or("").to_string())
}

fn bf_rest(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let s = bf_args.arg(0).trim_start_matches(' ');
    Ok(s.split_once(' ')
        .map(|(_, rest)| rest.trim_start_matches(' '))
        .unwrap_or("")
        .to_string())
}

/// Usage: `pos(needle, haystack)`
/// The one-based character position of `needle` in `haystack`, or 0.
fn bf_pos(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let (needle, haystack) = (bf_args.arg(0), bf_args.arg(1));
    if haystack.is_empty() {
        return Ok("0".to_string());
    }
    let position = haystack
        .find(needle)
        .map_or(0, |i| haystack[..i].chars().count() + 1);
    Ok(position.to_string())
}

/// Usage: `delete(string, first, length)`
/// The string with `length` characters removed from zero-based position `first`.
fn bf_delete(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let (first, len) = (bf_args.int(1), bf_args.int(2));
    if first < 0 || len < 0 || first.saturating_add(len) >= 1000 {
        return Err(EvalError::Invalid("OUT OF RANGE"));
    }
    let (first, len) = (first as usize, len as usize);
    Ok(bf_args
        .arg(0)
        .chars()
        .enumerate()
        .filter(|(i, _)| *i < first || *i >= first + len)
        .map(|(_, c)| c)
        .collect())
}

/// Usage: `remove(list, word, count)`
/// Removes `count` words starting at one-based word `word`.
fn bf_remove(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let (word, count) = (bf_args.int(1), bf_args.int(2));
    if word < 1 {
        return Err(EvalError::Invalid("OUT OF RANGE"));
    }
    let text = bf_args.arg(0);
    let bytes = text.as_bytes();
    let mut pos = 0;
    for _ in 1..word {
        if pos >= bytes.len() {
            break;
        }
        pos = skip_spaces(bytes, skip_word(bytes, pos));
    }
    let kept = pos;
    for _ in 0..count.max(0) {
        if pos >= bytes.len() {
            break;
        }
        pos = skip_spaces(bytes, skip_word(bytes, pos));
    }
    if pos >= bytes.len() {
        // Nothing follows, so the separator before the removed words goes too.
        let head = &text[..kept];
        return Ok(head.strip_suffix(' ').unwrap_or(head).to_string());
    }
    Ok(format!("{}{}", &text[..kept], &text[pos..]))
}

/// Usage: `match(list, pattern)`
/// The one-based index of the first word matching the wildcard `pattern`, or 0.
fn bf_match(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let pattern = bf_args.arg(1);
    let mut list: Vec<&str> = words(bf_args.arg(0)).collect();
    if list.is_empty() {
        list.push("");
    }
    let index = list
        .iter()
        .position(|w| wild_match(pattern, w).is_some())
        .map_or(0, |i| i + 1);
    Ok(index.to_string())
}

/// Usage: `extract(list, first, count)`
/// `count` words starting at one-based word `first`.
fn bf_extract(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let (first, count) = (bf_args.int(1), bf_args.int(2));
    if first < 1 || count < 1 {
        return Ok(String::new());
    }
    let text = bf_args.arg(0);
    let bytes = text.as_bytes();
    let mut pos = 0;
    for _ in 1..first {
        if pos >= bytes.len() {
            break;
        }
        pos = skip_word(bytes, skip_spaces(bytes, pos));
    }
    let start = skip_spaces(bytes, pos);
    let mut end = start;
    for _ in 0..count {
        if end >= bytes.len() {
            break;
        }
        end = skip_word(bytes, skip_spaces(bytes, end));
    }
    Ok(text[start..end].to_string())
}

/// Usage: `wmatch(list, word)`
/// Like `match()`, but an exact case-insensitive word comparison.
fn bf_wmatch(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let word = bf_args.arg(1);
    let index = bf_args
        .arg(0)
        .split_whitespace()
        .position(|w| w.eq_ignore_ascii_case(word))
        .map_or(0, |i| i + 1);
    Ok(index.to_string())
}

fn bf_wcount(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    Ok(bf_args.arg(0).split_whitespace().count().to_string())
}

fn bf_flip(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    Ok(bf_args.arg(0).chars().rev().collect())
}

fn bf_spc(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let n = bf_args.int(0).clamp(0, MAX_PAD);
    Ok(" ".repeat(n as usize))
}

/// Usage: `lnum(n)`
/// The numbers 0 to n-1. `lnum(0)` is still `0`.
fn bf_lnum(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let n = bf_args.int(0);
    if !(0..=250).contains(&n) {
        return Err(EvalError::Invalid("Number Out Of Range"));
    }
    let mut out = "0".to_string();
    for i in 1..n {
        out.push_str(&format!(" {i}"));
    }
    Ok(out)
}

/// Usage: `string(text, n)`
fn bf_string(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let (text, n) = (bf_args.arg(0), bf_args.int(1));
    let total = n.saturating_mul(text.len() as i64);
    if total <= 0 || total > MAX_PAD {
        return Err(EvalError::Invalid("Out Of Range"));
    }
    Ok(text.repeat(n as usize))
}

fn justify(bf_args: &BfCallState<'_, '_>, left: bool) -> Result<String, EvalError> {
    let width = bf_args.int(1);
    if width <= 0 || width > MAX_PAD {
        return Err(EvalError::Invalid("Number out of range."));
    }
    let text = bf_args.arg(0);
    let width = width as usize;
    let len = text.chars().count();
    if len >= width {
        return Ok(text.chars().take(width).collect());
    }
    let padding = " ".repeat(width - len);
    Ok(if left {
        format!("{text}{padding}")
    } else {
        format!("{padding}{text}")
    })
}

/// Usage: `ljust(text, width)`
/// Pads on the right to `width`; longer text is cut to fit.
fn bf_ljust(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    justify(bf_args, true)
}

/// Usage: `rjust(text, width)`
fn bf_rjust(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    justify(bf_args, false)
}

pub(crate) fn register_bf_strings(builtins: &mut Vec<Builtin>) {
    builtins.extend([
        Builtin::new("strlen", Fixed(1), bf_strlen),
        Builtin::new("strcat", Fixed(2), bf_strcat),
        Builtin::new("mid", Fixed(3), bf_mid),
        Builtin::new("first", Fixed(1), bf_first),
        Builtin::new("rest", Fixed(1), bf_rest),
        Builtin::new("pos", Fixed(2), bf_pos),
        Builtin::new("delete", Fixed(3), bf_delete),
        Builtin::new("remove", Fixed(3), bf_remove),
        Builtin::new("match", Fixed(2), bf_match),
        Builtin::new("extract", Fixed(3), bf_extract),
        Builtin::new("wmatch", Fixed(2), bf_wmatch),
        Builtin::new("wcount", Fixed(1), bf_wcount),
        Builtin::new("flip", Fixed(1), bf_flip),
        Builtin::new("spc", Fixed(1), bf_spc),
        Builtin::new("lnum", Fixed(1), bf_lnum),
        Builtin::new("string", Fixed(2), bf_string),
        Builtin::new("ljust", Fixed(2), bf_ljust),
        Builtin::new("rjust", Fixed(2), bf_rjust),
    ]);
}

#[cfg(test)]
mod tests {
    use crate::testing::TestWorld;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("strlen(hello)", "5"; "strlen")]
    #[test_case("strlen(a,b)", "#-1 Function (strlen) only expects 1 arguments"; "strlen arity")]
    #[test_case("strcat(foo,bar)", "foobar"; "strcat")]
    #[test_case("mid(abcdef,2,3)", "cde"; "mid")]
    #[test_case("mid(abc,5,3)", ""; "mid past the end")]
    #[test_case("mid(abc,-1,3)", "#-1 OUT OF RANGE"; "mid negative")]
    #[test_case("first({  one two three})", "one"; "first")]
    #[test_case("rest(one   two three)", "two three"; "rest")]
    #[test_case("rest(one)", ""; "rest of one word")]
    #[test_case("pos(c,abcabc)", "3"; "pos")]
    #[test_case("pos(z,abc)", "0"; "pos missing")]
    #[test_case("pos(a,)", "0"; "pos in nothing")]
    #[test_case("delete(abcdef,1,2)", "adef"; "delete")]
    #[test_case("delete(abcdef,4,10)", "abcd"; "delete to end")]
    #[test_case("delete(abc,500,600)", "#-1 OUT OF RANGE"; "delete range")]
    #[test_case("remove(a b c d,2,1)", "a c d"; "remove middle")]
    #[test_case("remove(a b c d,3,2)", "a b"; "remove tail")]
    #[test_case("remove(a b,0,1)", "#-1 OUT OF RANGE"; "remove bad index")]
    #[test_case("match(red green blue,gr*)", "2"; "match")]
    #[test_case("match(red green blue,x*)", "0"; "match none")]
    #[test_case("extract(a b c d e,2,3)", "b c d"; "extract")]
    #[test_case("extract(a b c,3,5)", "c"; "extract past the end")]
    #[test_case("extract(a b c,0,1)", ""; "extract bad index")]
    #[test_case("wmatch(Red Green Blue,green)", "2"; "wmatch")]
    #[test_case("wcount(  a  b c )", "3"; "wcount")]
    #[test_case("flip(abc)", "cba"; "flip")]
    #[test_case("strlen(spc(5))", "5"; "spc")]
    #[test_case("spc(-3)", ""; "spc negative")]
    #[test_case("lnum(4)", "0 1 2 3"; "lnum")]
    #[test_case("lnum(0)", "0"; "lnum zero")]
    #[test_case("lnum(251)", "#-1 Number Out Of Range"; "lnum range")]
    #[test_case("string(ab,3)", "ababab"; "string")]
    #[test_case("string(ab,0)", "#-1 Out Of Range"; "string range")]
    #[test_case("strcat(ljust(ab,4),x)", "ab  x"; "ljust")]
    #[test_case("rjust(ab,4)", "  ab"; "rjust")]
    #[test_case("ljust(abcdef,3)", "abc"; "ljust truncates")]
    #[test_case("rjust(ab,0)", "#-1 Number out of range."; "rjust range")]
    fn strings(expr: &str, expected: &str) {
        let mut world = TestWorld::new();
        assert_eq!(world.eval(expr), expected);
    }
}
