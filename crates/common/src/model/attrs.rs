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
use strum::{Display, EnumIter};

use crate::model::Dbref;
use crate::util::BitEnum;

#[derive(Debug, Ord, PartialOrd, Copy, Clone, Eq, PartialEq, Hash, Primitive, Display, EnumIter)]
pub enum AttrFlag {
    /// Visible to players other than the owner.
    Osee = 0,
    /// Visible to no one without examine rights.
    Dark = 1,
    Wizard = 2,
    Unimportant = 3,
    NoModify = 4,
    Date = 5,
    Inherit = 6,
    /// Interpreted as a lock; never searched for `$commands`.
    Lock = 7,
    /// A user-defined function body.
    Function = 8,
    Builtin = 9,
    ShowDbref = 10,
    NoMemory = 11,
    Time = 12,
    /// Present but disabled for functions and `$command` matching.
    Haven = 13,
}

/// An attribute as seen by the evaluator: its resolved value together with the flags of its
/// definition, and the object that defined it (`NOTHING` for server-defined attributes).
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
    pub flags: BitEnum<AttrFlag>,
    pub defined_on: Dbref,
}

impl Attribute {
    pub fn has(&self, flag: AttrFlag) -> bool {
        self.flags.contains(flag)
    }
}
