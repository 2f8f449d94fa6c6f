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

use enum_primitive_derive::Primitive;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::util::BitEnum;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum ObjectType {
    Room,
    Thing,
    Exit,
    Universe,
    Channel,
    Player,
}

impl ObjectType {
    /// The leading character `flags()` prints for this type, if any.
    pub fn type_code(&self) -> Option<char> {
        match self {
            Self::Room => Some('R'),
            Self::Thing => Some('T'),
            Self::Exit => Some('E'),
            Self::Universe => Some('U'),
            Self::Channel => None,
            Self::Player => Some('P'),
        }
    }
}

#[derive(Debug, Ord, PartialOrd, Copy, Clone, Eq, PartialEq, Hash, Primitive, EnumIter)]
pub enum ObjFlag {
    Going = 0,
    Puppet = 1,
    Sticky = 2,
    Dark = 3,
    LinkOk = 4,
    Haven = 5,
    ChownOk = 6,
    EnterOk = 7,
    SeeOk = 8,
    Opaque = 9,
    InheritPowers = 10,
    Quiet = 11,
    Bearing = 12,
    Connect = 13,
    Terse = 14,
    Idle = 15,
    Light = 16,
}

impl ObjFlag {
    /// The character used when listing flags. Opaque exits print as `T`.
    pub fn code(&self, otype: ObjectType) -> Option<char> {
        let c = match self {
            Self::Going => 'G',
            Self::Puppet => 'p',
            Self::Sticky => 'S',
            Self::Dark => 'D',
            Self::LinkOk => 'L',
            Self::Haven => 'H',
            Self::ChownOk => 'C',
            Self::EnterOk => 'e',
            Self::SeeOk => 'v',
            Self::Opaque if otype == ObjectType::Exit => 'T',
            Self::Opaque => 'o',
            Self::InheritPowers => 'I',
            Self::Quiet => 'q',
            Self::Bearing => 'b',
            Self::Connect => 'c',
            Self::Terse if otype == ObjectType::Player => 't',
            Self::Idle if otype == ObjectType::Player => 'i',
            Self::Light if otype == ObjectType::Exit => 'l',
            _ => return None,
        };
        Some(c)
    }
}

/// Renders a type and flag set the way `flags()` and `@ps` style listings show them.
pub fn unparse_flags(otype: ObjectType, flags: BitEnum<ObjFlag>) -> String {
    use strum::IntoEnumIterator;
    let mut out = String::new();
    if let Some(c) = otype.type_code() {
        out.push(c);
    }
    for flag in ObjFlag::iter() {
        if flags.contains(flag)
            && let Some(c) = flag.code(otype)
        {
            out.push(c);
        }
    }
    out
}

/// Player classes, lowest to highest. The discriminant is the class level.
#[derive(
    Debug,
    Ord,
    PartialOrd,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Primitive,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum PlayerClass {
    Guest = 1,
    Visitor = 2,
    Citizen = 3,
    Builder = 4,
    #[strum(serialize = "VIP")]
    Vip = 5,
    Guide = 6,
    Counselor = 7,
    Judge = 8,
    Admin = 9,
    Director = 10,
}

impl PlayerClass {
    pub fn level(&self) -> i64 {
        *self as i64
    }
}

/// The subset of the power table consulted by the evaluator and the scheduler.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Primitive, Serialize, Deserialize, Display, EnumIter,
)]
pub enum Power {
    Examine = 0,
    Functions = 1,
    Modify = 2,
    Money = 3,
    Queue = 4,
    Security = 5,
    SeeAtr = 6,
    Stats = 7,
    Who = 8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    #[test]
    fn flag_listing() {
        let flags = BitEnum::new_with(ObjFlag::Dark) | ObjFlag::Connect | ObjFlag::Opaque;
        assert_eq!(unparse_flags(ObjectType::Player, flags), "PDoc");
        assert_eq!(unparse_flags(ObjectType::Exit, flags), "EDTc");
        assert_eq!(unparse_flags(ObjectType::Channel, BitEnum::new()), "");
    }

    #[test]
    fn class_names() {
        assert_eq!(PlayerClass::Vip.to_string(), "VIP");
        assert_eq!(PlayerClass::from_str("director").unwrap(), PlayerClass::Director);
        assert!(PlayerClass::Guest < PlayerClass::Visitor);
    }
}
