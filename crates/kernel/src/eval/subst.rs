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

//! `%`-substitution and embedded `[...]` evaluation of message and command templates.

use demuse_common::Dbref;

use crate::eval::text::atol;
use crate::runtime::ExecContext;

/// Inserted text is dropped once the result would pass this many characters.
pub const SUBST_LIMIT: usize = 950;
/// Hard ceiling on the result, copied text included.
const SUBST_BUF_SIZE: usize = 1024;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Gender {
    /// Pronouns are the subject's own name.
    Literal,
    Neuter,
    Female,
    Male,
    Spivak,
    Plural,
    Either,
}

impl Gender {
    fn from_sex(sex: &str) -> Self {
        match sex.chars().next() {
            Some('M' | 'm') => Self::Male,
            Some('F' | 'f' | 'W' | 'w') => Self::Female,
            Some('P' | 'p') => Self::Plural,
            Some('N' | 'n') => Self::Neuter,
            Some('/') => Self::Either,
            Some('L' | 'l') => Self::Literal,
            _ => Self::Spivak,
        }
    }

    fn subjective(self) -> &'static str {
        match self {
            Self::Literal => "",
            Self::Neuter => "it",
            Self::Female => "she",
            Self::Male => "he",
            Self::Spivak => "e",
            Self::Plural => "they",
            Self::Either => "he/she",
        }
    }

    fn possessive(self) -> &'static str {
        match self {
            Self::Literal => "",
            Self::Neuter => "its",
            Self::Female => "her",
            Self::Male => "his",
            Self::Spivak => "eir",
            Self::Plural => "their",
            Self::Either => "his/her",
        }
    }

    fn objective(self) -> &'static str {
        match self {
            Self::Literal => "",
            Self::Neuter => "it",
            Self::Female => "her",
            Self::Male => "him",
            Self::Spivak => "em",
            Self::Plural => "them",
            Self::Either => "him/her",
        }
    }
}

/// The result under construction. Limits count the subject's name and the space after it,
/// which are not part of what is returned.
struct Output {
    buf: String,
    base: usize,
}

impl Output {
    fn total(&self) -> usize {
        self.base + self.buf.len()
    }

    /// Appends substituted text, defanged so it can't be re-parsed as a call or a command
    /// separator: a `(` before any punctuation becomes `<`, and `,` `;` `[` become spaces.
    fn insert(&mut self, text: &str) {
        if self.total() + text.len() > SUBST_LIMIT {
            return;
        }
        let mut has_non_alpha = false;
        for c in text.chars() {
            if c == '(' && !has_non_alpha {
                self.buf.push('<');
                continue;
            }
            let c = if matches!(c, ',' | ';' | '[') { ' ' } else { c };
            if !c.is_ascii_alphabetic() && c != '#' && c != '.' {
                has_non_alpha = true;
            }
            self.buf.push(c);
        }
    }
}

fn capitalize_from(buf: &mut String, start: usize) {
    if let Some(first) = buf[start..].chars().next() {
        let upper: String = first.to_uppercase().collect();
        buf.replace_range(start..start + first.len_utf8(), &upper);
    }
}

impl ExecContext<'_> {
    /// Expands `template` for `subject`, with `privs` supplying permissions for embedded
    /// expressions and attribute references. Returns the expanded text alone, without the
    /// subject's name in front.
    pub fn pronoun_substitute(&mut self, subject: Dbref, template: &str, privs: Dbref) -> String {
        if !self.world.valid(subject) {
            return String::new();
        }
        let privs = if self.world.valid(privs) {
            privs
        } else {
            subject
        };
        let gender = Gender::from_sex(&self.attr_text(subject, "Sex"));
        let name = self.name(subject);
        let cname = self.world.cname_of(subject).unwrap_or_else(|_| name.clone());
        let mut out = Output {
            buf: String::new(),
            base: name.len() + 1,
        };

        let mut rest = template;
        while out.total() < SUBST_BUF_SIZE - 1 {
            let mut chars = rest.chars();
            let Some(c) = chars.next() else {
                break;
            };
            match c {
                '[' => {
                    rest = chars.as_str();
                    let value = self.museexec(&mut rest, privs, subject, false);
                    if value.len() + out.total() <= SUBST_LIMIT {
                        out.buf.push_str(&value);
                    }
                    if let Some(after) = rest.strip_prefix(']') {
                        rest = after;
                    }
                }
                '%' => {
                    let Some(code) = chars.next() else {
                        rest = "";
                        continue;
                    };
                    rest = chars.as_str();
                    let start = out.buf.len();
                    match code {
                        '0'..='9' => {
                            let slot = code as usize - '0' as usize;
                            if let Some(value) = self.rt.env[slot].clone() {
                                out.insert(&value);
                            }
                        }
                        'v' | 'V' => {
                            if let Some(letter) = rest.chars().next()
                                && letter.is_ascii_alphabetic()
                            {
                                rest = &rest[1..];
                                let register = format!("V{}", letter.to_ascii_uppercase());
                                out.insert(&self.attr_text(privs, &register));
                            }
                        }
                        's' | 'S' => match gender {
                            Gender::Literal => out.insert(&cname),
                            g => out.insert(g.subjective()),
                        },
                        'p' | 'P' => match gender {
                            Gender::Literal => {
                                out.insert(&cname);
                                out.insert("'s");
                            }
                            g => out.insert(g.possessive()),
                        },
                        'o' | 'O' => match gender {
                            Gender::Literal => out.insert(&cname),
                            g => out.insert(g.objective()),
                        },
                        'n' | 'N' => out.insert(&name),
                        '#' => {
                            if out.total() <= SUBST_BUF_SIZE - 20 {
                                out.buf.push_str(&subject.to_string());
                            }
                        }
                        '/' => {
                            if let Some((reference, after)) = rest.split_once('/') {
                                rest = after;
                                let (thing, attr_name) = match reference.split_once(':') {
                                    // The object is written `#N`; its first character is skipped.
                                    Some((obj, attr)) => {
                                        (Dbref(atol(obj.get(1..).unwrap_or(""))), attr)
                                    }
                                    None => (privs, reference),
                                };
                                if self.world.valid(thing)
                                    && let Ok(Some(attr)) = self.world.attribute(thing, attr_name)
                                    && self.world.can_see_attribute(privs, thing, &attr)
                                {
                                    out.insert(&attr.value);
                                }
                            }
                        }
                        'r' | 'R' => out.insert("\n"),
                        't' | 'T' => out.insert("\t"),
                        'a' | 'A' => out.insert("\x07"),
                        other => {
                            if out.total() <= SUBST_BUF_SIZE - 2 {
                                out.buf.push(other);
                            }
                        }
                    }
                    if code.is_ascii_uppercase() && code != 'N' {
                        capitalize_from(&mut out.buf, start);
                    }
                }
                '\\' => {
                    let escaped = chars.next();
                    rest = chars.as_str();
                    match escaped {
                        Some(e) => out.buf.push(e),
                        None => out.buf.push('\\'),
                    }
                }
                _ => {
                    rest = chars.as_str();
                    out.buf.push(c);
                }
            }
        }
        out.buf
    }
}
