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

//! Server-defined attributes and their flags.

use demuse_common::model::AttrFlag;
use demuse_common::model::AttrFlag::*;
use demuse_common::util::BitEnum;

const BUILTIN_ATTRS: &[(&str, &[AttrFlag])] = &[
    ("Desc", &[Osee, Inherit]),
    ("Sex", &[Osee, Inherit]),
    ("Nice", &[Osee, Wizard]),
    ("Queue", &[Unimportant, Wizard, NoModify]),
    ("Password", &[Dark, Wizard, NoModify]),
    ("Quota", &[Wizard, Osee]),
    ("Rquota", &[Wizard]),
    ("Aconnect", &[Inherit]),
    ("Adisconnect", &[Inherit]),
    ("Oconnect", &[Inherit]),
    ("Odisconnect", &[Inherit]),
    ("IdleTime", &[Osee]),
    ("Aidle", &[Inherit]),
    ("Aunidle", &[Inherit]),
    ("TZ", &[Osee]),
    ("Lock", &[Lock]),
    ("Elock", &[Lock]),
    ("Ulock", &[Lock]),
    ("Listen", &[Inherit]),
    ("Ahear", &[Inherit]),
    ("Startup", &[Inherit]),
    ("Cname", &[Osee]),
    ("LastSite", &[Wizard, NoModify]),
];

/// Flags of a server-defined attribute, or `None` if `name` is not one. `VA`..`VZ` are the
/// general-purpose registers read by `%va`..`%vz`.
pub(crate) fn builtin_attr_flags(name: &str) -> Option<BitEnum<AttrFlag>> {
    if name.len() == 2 {
        let mut chars = name.chars();
        if let (Some(v), Some(c)) = (chars.next(), chars.next())
            && v.eq_ignore_ascii_case(&'v')
            && c.is_ascii_alphabetic()
        {
            return Some(BitEnum::new_with(Inherit));
        }
    }
    BUILTIN_ATTRS
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, flags)| {
            flags
                .iter()
                .fold(BitEnum::new(), |acc, f| acc | *f)
        })
}

/// Canonical spelling of a server attribute name, for storage.
pub(crate) fn canonical_name(name: &str) -> Option<String> {
    if name.len() == 2 && builtin_attr_flags(name).is_some() && name[..1].eq_ignore_ascii_case("v")
    {
        return Some(name.to_ascii_uppercase());
    }
    BUILTIN_ATTRS
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(n, _)| n.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v_registers_and_builtins() {
        assert!(builtin_attr_flags("va").is_some());
        assert!(builtin_attr_flags("VZ").is_some());
        assert!(builtin_attr_flags("v1").is_none());
        let lock = builtin_attr_flags("lock").unwrap();
        assert!(lock.contains(Lock));
        assert_eq!(canonical_name("nice").as_deref(), Some("Nice"));
        assert_eq!(canonical_name("vq").as_deref(), Some("VQ"));
        assert_eq!(canonical_name("Whatever"), None);
    }
}
