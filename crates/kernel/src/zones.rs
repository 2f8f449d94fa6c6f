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

//! The zone chain: the zone an object sits in (found by walking outward through locations),
//! then each zone's own zone, ending at the universal zone held by object #0.

use demuse_common::model::{ObjectType, WorldState};
use demuse_common::{Dbref, NOTHING};

/// Both the outward location walk and the chain itself stop after this many steps.
pub const MAX_ZONE_DEPTH: usize = 10;

fn universal_zone(world: &dyn WorldState) -> Dbref {
    world.zone_of(Dbref(0)).unwrap_or(NOTHING)
}

/// The first zone of `obj`.
pub fn zone_first(world: &dyn WorldState, obj: Dbref) -> Dbref {
    let universal = universal_zone(world);
    let mut location = obj;
    for _ in 0..MAX_ZONE_DEPTH {
        if !world.valid(location) {
            break;
        }
        if location == universal {
            return universal;
        }
        let mut zone = world.zone_of(location).unwrap_or(NOTHING);
        // Unzoned rooms and things belong to the universal zone.
        let defaults = location != Dbref(0)
            && world
                .object_type(location)
                .is_ok_and(|t| matches!(t, ObjectType::Room | ObjectType::Thing));
        if zone == NOTHING && defaults {
            zone = universal;
        }
        if zone != NOTHING {
            return zone;
        }
        location = world.location_of(location).unwrap_or(NOTHING);
    }
    universal
}

/// The zone after `zone` in a chain.
pub fn zone_next(world: &dyn WorldState, zone: Dbref) -> Dbref {
    if !world.valid(zone) {
        return NOTHING;
    }
    let universal = universal_zone(world);
    match world.zone_of(zone).unwrap_or(NOTHING) {
        NOTHING if zone != universal => universal,
        next => next,
    }
}

/// The whole zone chain of `obj`, innermost first.
pub fn zones(world: &dyn WorldState, obj: Dbref) -> Vec<Dbref> {
    let mut chain = vec![];
    let mut zone = zone_first(world, obj);
    while zone != NOTHING && chain.len() < MAX_ZONE_DEPTH {
        chain.push(zone);
        zone = zone_next(world, zone);
    }
    chain
}

pub fn is_in_zone(world: &dyn WorldState, obj: Dbref, zone: Dbref) -> bool {
    world.valid(obj) && world.valid(zone) && zones(world, obj).contains(&zone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use demuse_db::{DatabaseConfig, MemoryDb};
    use pretty_assertions::assert_eq;

    #[test]
    fn chain_walks_out_to_the_universal_zone() {
        let mut db = MemoryDb::minimal(DatabaseConfig::default(), "pw").unwrap();
        let root = db.config().root;
        let universe = db.create_object("Universe", ObjectType::Thing, root, Dbref(0));
        let region = db.create_object("Region", ObjectType::Thing, root, Dbref(0));
        let room = db.create_object("Hall", ObjectType::Room, root, NOTHING);
        let visitor = db.create_object("visitor", ObjectType::Player, NOTHING, room);
        let box_ = db.create_object("box", ObjectType::Thing, root, room);
        db.set_zone(Dbref(0), universe).unwrap();
        db.set_zone(room, region).unwrap();

        // Players inherit the zone of where they stand; unzoned things are universal.
        assert_eq!(zone_first(&db, visitor), region);
        assert_eq!(zones(&db, visitor), vec![region, universe]);
        assert_eq!(zones(&db, box_), vec![universe]);
        assert_eq!(zones(&db, Dbref(0)), vec![universe]);
        assert!(is_in_zone(&db, room, universe));
        assert!(!is_in_zone(&db, Dbref(0), region));
    }

    #[test]
    fn cycles_are_bounded() {
        let mut db = MemoryDb::minimal(DatabaseConfig::default(), "pw").unwrap();
        let root = db.config().root;
        let a = db.create_object("a", ObjectType::Thing, root, Dbref(0));
        let b = db.create_object("b", ObjectType::Thing, root, Dbref(0));
        db.set_zone(a, b).unwrap();
        db.set_zone(b, a).unwrap();
        assert_eq!(zones(&db, a).len(), MAX_ZONE_DEPTH);
    }
}
