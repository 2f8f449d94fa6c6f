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

//! The class-based power table and the `controls` oracle.

use demuse_common::model::{AttrFlag, Attribute, ObjFlag, ObjectType, PlayerClass, Power};
use demuse_common::{Dbref, NOTHING};

use crate::memory_db::MemoryDb;

/// How far a power reaches over other objects.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum PowerLevel {
    No,
    /// Over objects of strictly lower class.
    YesLt,
    /// Over objects of lower or equal class.
    YesEq,
    Yes,
}

use PowerLevel::{No, Yes, YesEq, YesLt};

/// Columns: Director, Admin, Judge, Counselor, Citizen, Visitor, Guest, Guide, Builder/VIP.
fn power_row(power: Power) -> [PowerLevel; 9] {
    match power {
        Power::Examine => [Yes, YesEq, YesEq, YesEq, No, No, No, YesLt, YesLt],
        Power::Functions => [Yes, Yes, Yes, Yes, No, No, No, No, No],
        Power::Modify => [YesEq, YesEq, YesEq, YesEq, No, No, No, YesLt, YesLt],
        Power::Money => [Yes, Yes, Yes, No, No, No, No, No, No],
        Power::Queue => [Yes, YesEq, YesLt, YesLt, No, No, No, No, No],
        Power::Security => [Yes, No, No, No, No, No, No, No, No],
        Power::SeeAtr => [Yes, YesEq, YesEq, YesEq, No, No, No, YesLt, YesLt],
        Power::Stats => [Yes, Yes, Yes, Yes, No, No, No, No, No],
        Power::Who => [Yes, YesLt, YesLt, YesLt, No, No, No, No, No],
    }
}

fn column(class: PlayerClass) -> usize {
    match class {
        PlayerClass::Director => 0,
        PlayerClass::Admin => 1,
        PlayerClass::Judge => 2,
        PlayerClass::Counselor => 3,
        PlayerClass::Citizen => 4,
        PlayerClass::Visitor => 5,
        PlayerClass::Guest => 6,
        PlayerClass::Guide => 7,
        PlayerClass::Builder | PlayerClass::Vip => 8,
    }
}

pub(crate) fn power_level(class: PlayerClass, power: Power) -> PowerLevel {
    power_row(power)[column(class)]
}

impl MemoryDb {
    /// The object whose class supplies `who`'s powers: players themselves, objects with
    /// inherited powers their owner, and nothing for plain objects.
    fn power_source(&self, who: Dbref) -> Option<Dbref> {
        let rec = self.record(who).ok()?;
        if rec.otype == ObjectType::Player {
            Some(who)
        } else if rec.flags.contains(ObjFlag::InheritPowers) {
            Some(rec.owner)
        } else {
            None
        }
    }

    fn level_of(&self, obj: Dbref) -> i64 {
        let Ok(rec) = self.record(obj) else {
            return 0;
        };
        let source = if rec.otype == ObjectType::Player {
            obj
        } else {
            rec.owner
        };
        self.record(source)
            .ok()
            .and_then(|r| r.class)
            .map(|c| c.level())
            .unwrap_or(PlayerClass::Visitor.level())
    }

    /// `has_pow`: does `who` hold `power` over `recipient` (or at all, for `NOTHING`)?
    pub(crate) fn has_pow(&self, who: Dbref, recipient: Dbref, power: Power) -> bool {
        if !self.is_valid(who) {
            return false;
        }
        if who == self.config.root {
            return true;
        }
        let Some(source) = self.power_source(who) else {
            return false;
        };
        let Some(class) = self.record(source).ok().and_then(|r| r.class) else {
            return false;
        };
        match power_level(class, power) {
            Yes => true,
            No => false,
            level if recipient == NOTHING => matches!(level, YesLt | YesEq),
            _ if !self.is_valid(recipient) => false,
            YesLt => self.level_of(recipient) < class.level(),
            YesEq => self.level_of(recipient) <= class.level(),
        }
    }

    pub(crate) fn controls_obj(&self, who: Dbref, what: Dbref, power: Power) -> bool {
        if !self.is_valid(who) {
            return false;
        }
        if what == NOTHING {
            return self.has_pow(who, what, power);
        }
        let (Ok(who_rec), Ok(what_rec)) = (self.record(who), self.record(what)) else {
            return false;
        };
        if matches!(power, Power::Examine | Power::SeeAtr) && what_rec.flags.contains(ObjFlag::SeeOk)
        {
            return true;
        }

        if who_rec.owner == what_rec.owner {
            if who_rec.owner == who || who_rec.flags.contains(ObjFlag::InheritPowers) {
                return true;
            }
            // A plain object doesn't control its owner's privileged objects.
            let privileged_owner = self
                .record(what_rec.owner)
                .ok()
                .and_then(|r| r.class)
                .is_some_and(|c| c > PlayerClass::Citizen);
            if (what_rec.flags.contains(ObjFlag::InheritPowers) || what_rec.owner == what)
                && privileged_owner
            {
                return false;
            }
            return true;
        }

        let what = if what_rec.flags.contains(ObjFlag::InheritPowers) {
            what_rec.owner
        } else {
            what
        };
        if !self.is_valid(what) {
            return false;
        }
        if who == self.config.root {
            return true;
        }
        let what_owner = self.record(what).map(|r| r.owner).unwrap_or(NOTHING);
        if what == self.config.root || what_owner == self.config.root {
            return false;
        }
        self.has_pow(who, what, power)
    }

    pub(crate) fn can_see_attr(&self, who: Dbref, what: Dbref, attr: &Attribute) -> bool {
        if !self.is_valid(who) || !self.is_valid(what) {
            return false;
        }
        if attr.name.eq_ignore_ascii_case("Password") && who != self.config.root {
            return false;
        }
        let see_ok = self
            .record(what)
            .is_ok_and(|r| r.flags.contains(ObjFlag::SeeOk));
        if !attr.has(AttrFlag::Osee) && !self.controls_obj(who, what, Power::SeeAtr) && !see_ok {
            return false;
        }
        if attr.has(AttrFlag::Dark) {
            if attr.defined_on == NOTHING {
                return self.has_pow(who, NOTHING, Power::Examine);
            }
            return self.controls_obj(who, attr.defined_on, Power::SeeAtr);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(PlayerClass::Director, Power::Security, Yes)]
    #[test_case(PlayerClass::Admin, Power::Security, No)]
    #[test_case(PlayerClass::Admin, Power::Queue, YesEq)]
    #[test_case(PlayerClass::Guide, Power::Examine, YesLt)]
    #[test_case(PlayerClass::Citizen, Power::Functions, No)]
    #[test_case(PlayerClass::Judge, Power::Money, Yes)]
    fn table_lookup(class: PlayerClass, power: Power, expected: PowerLevel) {
        assert_eq!(power_level(class, power), expected);
    }
}
