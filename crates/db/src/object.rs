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

use demuse_common::model::{AttrFlag, ObjFlag, ObjectType, PlayerClass};
use demuse_common::util::BitEnum;
use demuse_common::{Dbref, NOTHING};
use serde::{Deserialize, Serialize};

/// A value set on an object. Its flags come from the matching definition.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct AttrValue {
    pub name: String,
    pub value: String,
}

/// A user attribute definition (`@defattr`), inherited by children of the defining object.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct AttrDef {
    pub name: String,
    pub flags: BitEnum<AttrFlag>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub otype: ObjectType,
    pub owner: Dbref,
    #[serde(default = "nothing")]
    pub location: Dbref,
    #[serde(default = "nothing")]
    pub zone: Dbref,
    #[serde(default = "nothing")]
    pub link: Dbref,
    #[serde(default)]
    pub contents: Vec<Dbref>,
    #[serde(default)]
    pub exits: Vec<Dbref>,
    #[serde(default)]
    pub parents: Vec<Dbref>,
    #[serde(default)]
    pub children: Vec<Dbref>,
    #[serde(default)]
    pub flags: BitEnum<ObjFlag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<PlayerClass>,
    #[serde(default)]
    pub pennies: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub attrs: Vec<AttrValue>,
    #[serde(default)]
    pub attr_defs: Vec<AttrDef>,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub modified: i64,
}

fn nothing() -> Dbref {
    NOTHING
}

impl ObjectRecord {
    pub fn new(name: &str, otype: ObjectType, owner: Dbref) -> Self {
        Self {
            name: name.to_string(),
            otype,
            owner,
            location: NOTHING,
            zone: NOTHING,
            link: NOTHING,
            contents: vec![],
            exits: vec![],
            parents: vec![],
            children: vec![],
            flags: BitEnum::new(),
            class: None,
            pennies: 0,
            password: None,
            attrs: vec![],
            attr_defs: vec![],
            created: 0,
            modified: 0,
        }
    }

    pub fn local_attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.iter().find(|a| a.name.eq_ignore_ascii_case(name))
    }

    pub fn local_def(&self, name: &str) -> Option<&AttrDef> {
        self.attr_defs
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
    }

    /// Exit names carry `;`-separated aliases; the first is the display name.
    pub fn main_name(&self) -> &str {
        if self.otype == ObjectType::Exit {
            self.name.split(';').next().unwrap_or(&self.name)
        } else {
            &self.name
        }
    }

    /// Rough storage accounting: the record itself plus its strings.
    pub fn bytes(&self) -> usize {
        let attrs: usize = self
            .attrs
            .iter()
            .map(|a| a.name.len() + a.value.len() + 2)
            .sum();
        let defs: usize = self.attr_defs.iter().map(|d| d.name.len() + 8).sum();
        std::mem::size_of::<Self>() + self.name.len() + 1 + attrs + defs
    }
}
