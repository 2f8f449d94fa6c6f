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

//! Wildcard matching for `$command` patterns, `@switch`, `switch()` and `match()`.

use std::cmp::Ordering;

use crate::Env;
use crate::eval::text::atol;

#[derive(Debug)]
enum Token {
    Literal(char),
    /// A run of adjacent wildcards, captured as one.
    Wild { singles: usize, star: bool },
}

fn tokenize(pattern: &str) -> Option<Vec<Token>> {
    let mut tokens = vec![];
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '*' && c != '?' {
            tokens.push(Token::Literal(c));
            continue;
        }
        let mut singles = 0;
        let mut star = false;
        let mut next = Some(c);
        while let Some(w) = next {
            match w {
                '?' => singles += 1,
                '*' => {
                    // `**` never matches anything.
                    if chars.peek() == Some(&'*') {
                        return None;
                    }
                    star = true;
                }
                _ => unreachable!(),
            }
            next = chars.next_if(|c| *c == '*' || *c == '?');
        }
        tokens.push(Token::Wild { singles, star });
    }
    Some(tokens)
}

fn matches_from(
    tokens: &[Token],
    data: &[char],
    captures: &mut Vec<(usize, usize)>,
    at: usize,
) -> bool {
    let Some((token, rest)) = tokens.split_first() else {
        return at == data.len();
    };
    match token {
        Token::Literal(c) => {
            data.get(at).is_some_and(|d| d.eq_ignore_ascii_case(c))
                && matches_from(rest, data, captures, at + 1)
        }
        Token::Wild { singles, star } => {
            let remaining = data.len() - at;
            // `?` swallows a character when there is one, and nothing at the end.
            let shortest = (*singles).min(remaining);
            let longest = if *star { remaining } else { shortest };
            for len in shortest..=longest {
                captures.push((at, at + len));
                if matches_from(rest, data, captures, at + len) {
                    return true;
                }
                captures.pop();
            }
            false
        }
    }
}

fn compare(operand: &str, data: &str) -> Ordering {
    if operand.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
        atol(operand).cmp(&atol(data))
    } else {
        operand.cmp(data)
    }
}

/// Matches `data` against `pattern`, returning the wildcard captures on success.
///
/// Patterns beginning `>` or `<` compare instead of matching: `>5` holds for data greater than
/// five (numerically when the operand looks numeric, lexically otherwise). Comparisons capture
/// nothing.
pub fn wild_match(pattern: &str, data: &str) -> Option<Env> {
    if let Some(operand) = pattern.strip_prefix('>') {
        return (compare(operand, data) == Ordering::Less).then(Env::default);
    }
    if let Some(operand) = pattern.strip_prefix('<') {
        return (compare(operand, data) == Ordering::Greater).then(Env::default);
    }

    let tokens = tokenize(pattern)?;
    let data: Vec<char> = data.chars().collect();
    let mut spans = vec![];
    if !matches_from(&tokens, &data, &mut spans, 0) {
        return None;
    }
    let mut env = Env::default();
    for (slot, (start, end)) in env.iter_mut().zip(spans) {
        *slot = Some(data[start..end].iter().collect());
    }
    Some(env)
}
