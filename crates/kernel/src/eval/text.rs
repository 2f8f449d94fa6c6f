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

//! Lenient text-to-number conversions and the splitting helpers shared by the evaluator, the
//! builtins and the command layer.

/// Splits the first `delim`-separated piece off `rest`, skipping over balanced `{...}` groups.
/// Returns `None` once `rest` is empty. The delimiter itself is consumed.
pub fn parse_up<'a>(rest: &mut &'a str, delim: char) -> Option<&'a str> {
    let s = *rest;
    if s.is_empty() {
        return None;
    }
    let mut chars = s.char_indices();
    let mut end = s.len();
    while let Some((i, c)) = chars.next() {
        if c == delim {
            end = i;
            break;
        }
        if c == '{' {
            let mut depth = 1;
            for (_, c) in chars.by_ref() {
                match c {
                    '{' => depth += 1,
                    '}' => depth -= 1,
                    _ => {}
                }
                if depth == 0 {
                    break;
                }
            }
        }
    }
    let piece = &s[..end];
    *rest = if end < s.len() {
        &s[end + delim.len_utf8()..]
    } else {
        ""
    };
    Some(piece)
}

/// The length of the longest `[ws][+-]digits` prefix, and whether it held any digits.
fn int_prefix(s: &str) -> (&str, bool) {
    let t = s.trim_start();
    let bytes = t.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    (&t[..end], end > digits_start)
}

/// `atol`: the leading integer of `s`, or zero. Saturates instead of overflowing.
pub fn atol(s: &str) -> i64 {
    let (prefix, has_digits) = int_prefix(s);
    if !has_digits {
        return 0;
    }
    match prefix.parse::<i64>() {
        Ok(n) => n,
        Err(_) if prefix.starts_with('-') => i64::MIN,
        Err(_) => i64::MAX,
    }
}

/// `atof`: the leading floating point number of `s`, or zero.
pub fn atof(s: &str) -> f64 {
    let t = s.trim_start();
    let bytes = t.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let mantissa_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    if end == mantissa_start || &t[mantissa_start..end] == "." {
        return 0.0;
    }
    // Only take an exponent if it is complete.
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > digits {
            end = exp_end;
        }
    }
    t[..end].parse().unwrap_or(0.0)
}

/// Renders a float the way `%f` does.
pub fn fmt_float(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    format!("{x:.6}")
}

/// Truthiness of evaluated text: empty, `#-1`, `#-2` and numeric zero are false.
pub fn istrue(s: &str) -> bool {
    !(s.is_empty()
        || s == "#-1"
        || s == "#-2"
        || (atol(s) == 0 && s.as_bytes()[0].is_ascii_digit()))
}

pub fn bool_str(b: bool) -> String {
    if b { "1" } else { "0" }.to_string()
}

/// Words separated by single spaces, as the list functions see them. Runs of spaces produce
/// empty words, which the callers skip.
pub fn words(s: &str) -> impl Iterator<Item = &str> {
    s.split(' ').filter(|w| !w.is_empty())
}

/// Truncates `s` to at most `max` bytes on a character boundary.
pub fn truncate_to(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn parse_up_skips_brace_groups() {
        let mut rest = "say {a;b};pose x;";
        assert_eq!(parse_up(&mut rest, ';'), Some("say {a;b}"));
        assert_eq!(parse_up(&mut rest, ';'), Some("pose x"));
        assert_eq!(parse_up(&mut rest, ';'), None);
    }

    #[test]
    fn parse_up_without_delimiter_takes_everything() {
        let mut rest = "one two";
        assert_eq!(parse_up(&mut rest, '='), Some("one two"));
        assert_eq!(rest, "");
        assert_eq!(parse_up(&mut rest, '='), None);
    }

    #[test_case("42", 42; "plain")]
    #[test_case("  -7xyz", -7; "leading space and junk")]
    #[test_case("abc", 0; "not a number")]
    #[test_case("+", 0; "bare sign")]
    #[test_case("99999999999999999999", i64::MAX; "saturates")]
    fn lenient_integers(s: &str, expected: i64) {
        assert_eq!(atol(s), expected);
    }

    #[test_case("1.5", 1.5; "decimal")]
    #[test_case("-2e3", -2000.0; "exponent")]
    #[test_case("3e", 3.0; "dangling exponent")]
    #[test_case(".", 0.0; "lonely point")]
    #[test_case("x", 0.0; "junk")]
    fn lenient_floats(s: &str, expected: f64) {
        assert_eq!(atof(s), expected);
    }

    #[test_case("", false; "empty")]
    #[test_case("#-1", false; "no object")]
    #[test_case("#-2", false; "ambiguous")]
    #[test_case("0", false; "zero")]
    #[test_case("00", false; "zeroes")]
    #[test_case("-0", true; "signed zero is text")]
    #[test_case("abc", true; "words")]
    #[test_case("#3", true; "object")]
    fn truthiness(s: &str, expected: bool) {
        assert_eq!(istrue(s), expected);
    }

    #[test]
    fn float_formatting() {
        assert_eq!(fmt_float(2.5), "2.500000");
        assert_eq!(fmt_float(-0.1), "-0.100000");
    }
}
