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

use ahash::AHashMap;
use demuse_common::model::{
    AttrFlag, Attribute, ObjFlag, ObjectType, PlayerClass, Power, WorldState, WorldStateError,
};
use demuse_common::util::BitEnum;
use demuse_common::{Dbref, NOTHING};
use tracing::{debug, info};

use crate::builtin_attrs::{builtin_attr_flags, canonical_name};
use crate::config::DatabaseConfig;
use crate::object::{AttrDef, AttrValue, ObjectRecord};
use crate::passwords::{hash_password, verify_password};

/// How far parent chains are followed when resolving inherited attributes.
const MAX_PARENT_DEPTH: usize = 10;

/// The whole object database, held in memory between dumps.
#[derive(Debug, Clone)]
pub struct MemoryDb {
    pub(crate) objects: Vec<Option<ObjectRecord>>,
    pub(crate) config: DatabaseConfig,
    /// Lowercased player names.
    players: AHashMap<String, Dbref>,
    now: i64,
}

impl MemoryDb {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            objects: vec![],
            config,
            players: AHashMap::new(),
            now: 0,
        }
    }

    /// Rebuilds a database from loaded object slots.
    pub(crate) fn from_objects(config: DatabaseConfig, objects: Vec<Option<ObjectRecord>>) -> Self {
        let mut db = Self::new(config);
        db.objects = objects;
        db.reindex();
        db
    }

    fn reindex(&mut self) {
        self.players = self
            .objects
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| {
                let rec = slot.as_ref()?;
                (rec.otype == ObjectType::Player)
                    .then(|| (rec.name.to_ascii_lowercase(), Dbref(i as i64)))
            })
            .collect();
    }

    /// A database with just a starting room (#0) and the root player (#1, a Director).
    pub fn minimal(config: DatabaseConfig, root_password: &str) -> Result<Self, WorldStateError> {
        let mut db = Self::new(config);
        let limbo = db.create_object("Limbo", ObjectType::Room, Dbref(1), NOTHING);
        let root = db.create_object("Root", ObjectType::Player, Dbref(1), limbo);
        db.config.root = root;
        db.config.player_start = limbo;
        {
            let rec = db.record_mut(root)?;
            rec.class = Some(PlayerClass::Director);
            rec.link = limbo;
            rec.password = Some(hash_password(root_password)?);
        }
        Ok(db)
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Stamps created/modified times with the server's notion of now.
    pub fn set_now(&mut self, now: i64) {
        self.now = now;
    }

    pub(crate) fn is_valid(&self, obj: Dbref) -> bool {
        self.record(obj)
            .is_ok_and(|r| !r.flags.contains(ObjFlag::Going))
    }

    pub fn record(&self, obj: Dbref) -> Result<&ObjectRecord, WorldStateError> {
        usize::try_from(obj.0)
            .ok()
            .and_then(|i| self.objects.get(i))
            .and_then(|slot| slot.as_ref())
            .ok_or(WorldStateError::ObjectNotFound(obj))
    }

    pub fn record_mut(&mut self, obj: Dbref) -> Result<&mut ObjectRecord, WorldStateError> {
        usize::try_from(obj.0)
            .ok()
            .and_then(|i| self.objects.get_mut(i))
            .and_then(|slot| slot.as_mut())
            .ok_or(WorldStateError::ObjectNotFound(obj))
    }

    /// Creates an object in `location` (exits are attached to it as exits instead).
    pub fn create_object(
        &mut self,
        name: &str,
        otype: ObjectType,
        owner: Dbref,
        location: Dbref,
    ) -> Dbref {
        let id = Dbref(self.objects.len() as i64);
        let mut rec = ObjectRecord::new(name, otype, owner);
        rec.created = self.now;
        rec.modified = self.now;
        rec.location = location;
        if owner == NOTHING {
            rec.owner = id;
        }
        self.objects.push(Some(rec));
        if otype == ObjectType::Player {
            self.players.insert(name.to_ascii_lowercase(), id);
        }
        if let Ok(loc) = self.record_mut(location) {
            if otype == ObjectType::Exit {
                loc.exits.push(id);
            } else {
                loc.contents.push(id);
            }
        }
        id
    }

    /// Moves a non-exit object to a new location.
    pub fn move_object(&mut self, obj: Dbref, to: Dbref) -> Result<(), WorldStateError> {
        let from = self.record(obj)?.location;
        if let Ok(old) = self.record_mut(from) {
            old.contents.retain(|o| *o != obj);
        }
        self.record_mut(to)?.contents.push(obj);
        self.record_mut(obj)?.location = to;
        Ok(())
    }

    pub fn set_class(&mut self, obj: Dbref, class: PlayerClass) -> Result<(), WorldStateError> {
        self.record_mut(obj)?.class = Some(class);
        Ok(())
    }

    pub fn set_pennies(&mut self, obj: Dbref, pennies: i64) -> Result<(), WorldStateError> {
        self.record_mut(obj)?.pennies = pennies;
        Ok(())
    }

    pub fn set_zone(&mut self, obj: Dbref, zone: Dbref) -> Result<(), WorldStateError> {
        self.record_mut(obj)?.zone = zone;
        Ok(())
    }

    pub fn set_link(&mut self, obj: Dbref, link: Dbref) -> Result<(), WorldStateError> {
        self.record_mut(obj)?.link = link;
        Ok(())
    }

    pub fn add_parent(&mut self, obj: Dbref, parent: Dbref) -> Result<(), WorldStateError> {
        self.record_mut(parent)?.children.push(obj);
        self.record_mut(obj)?.parents.push(parent);
        Ok(())
    }

    /// Defines (or redefines) a user attribute on `obj`.
    pub fn define_attribute(
        &mut self,
        obj: Dbref,
        name: &str,
        flags: BitEnum<AttrFlag>,
    ) -> Result<(), WorldStateError> {
        let rec = self.record_mut(obj)?;
        rec.attr_defs.retain(|d| !d.name.eq_ignore_ascii_case(name));
        rec.attr_defs.push(AttrDef {
            name: name.to_string(),
            flags,
        });
        Ok(())
    }

    pub fn set_password(&mut self, player: Dbref, password: &str) -> Result<(), WorldStateError> {
        let hashed = hash_password(password)?;
        self.record_mut(player)?.password = Some(hashed);
        Ok(())
    }

    pub(crate) fn find_player(&self, name: &str) -> Option<Dbref> {
        let name = name.trim();
        if let Some(obj) = Dbref::parse_literal(name) {
            return self
                .record(obj)
                .is_ok_and(|r| r.otype == ObjectType::Player)
                .then_some(obj);
        }
        self.players
            .get(&name.to_ascii_lowercase())
            .copied()
            .filter(|p| self.is_valid(*p))
    }

    /// Resolves the flags (and defining object) for `name` as seen on `obj`: server attributes
    /// first, then definitions on the object and its ancestors.
    fn resolve_definition(&self, obj: Dbref, name: &str) -> (BitEnum<AttrFlag>, Dbref) {
        if let Some(flags) = builtin_attr_flags(name) {
            return (flags, NOTHING);
        }
        let mut frontier = vec![obj];
        for _ in 0..MAX_PARENT_DEPTH {
            let mut next = vec![];
            for o in frontier {
                let Ok(rec) = self.record(o) else {
                    continue;
                };
                if let Some(def) = rec.local_def(name) {
                    return (def.flags, o);
                }
                next.extend(rec.parents.iter().copied());
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        (BitEnum::new(), obj)
    }

    fn stored_name(&self, obj: Dbref, name: &str) -> String {
        if let Some(canonical) = canonical_name(name) {
            return canonical;
        }
        let (_, defined_on) = self.resolve_definition(obj, name);
        self.record(defined_on)
            .ok()
            .and_then(|r| r.local_def(name))
            .map(|d| d.name.clone())
            .unwrap_or_else(|| name.to_string())
    }

    fn make_attribute(&self, obj: Dbref, stored: &AttrValue) -> Attribute {
        let (flags, defined_on) = self.resolve_definition(obj, &stored.name);
        Attribute {
            name: stored.name.clone(),
            value: stored.value.clone(),
            flags,
            defined_on,
        }
    }

    fn touch(&mut self, obj: Dbref) {
        let now = self.now;
        if let Ok(rec) = self.record_mut(obj) {
            rec.modified = now;
        }
    }
}

impl WorldState for MemoryDb {
    fn valid(&self, obj: Dbref) -> bool {
        self.is_valid(obj)
    }

    fn db_top(&self) -> i64 {
        self.objects.len() as i64
    }

    fn name_of(&self, obj: Dbref) -> Result<String, WorldStateError> {
        Ok(self.record(obj)?.main_name().to_string())
    }

    fn cname_of(&self, obj: Dbref) -> Result<String, WorldStateError> {
        self.name_of(obj)
    }

    fn object_type(&self, obj: Dbref) -> Result<ObjectType, WorldStateError> {
        Ok(self.record(obj)?.otype)
    }

    fn owner_of(&self, obj: Dbref) -> Result<Dbref, WorldStateError> {
        Ok(self.record(obj)?.owner)
    }

    fn location_of(&self, obj: Dbref) -> Result<Dbref, WorldStateError> {
        Ok(self.record(obj)?.location)
    }

    fn zone_of(&self, obj: Dbref) -> Result<Dbref, WorldStateError> {
        Ok(self.record(obj)?.zone)
    }

    fn link_of(&self, obj: Dbref) -> Result<Dbref, WorldStateError> {
        Ok(self.record(obj)?.link)
    }

    fn contents_of(&self, obj: Dbref) -> Result<Vec<Dbref>, WorldStateError> {
        Ok(self.record(obj)?.contents.clone())
    }

    fn exits_of(&self, obj: Dbref) -> Result<Vec<Dbref>, WorldStateError> {
        Ok(self.record(obj)?.exits.clone())
    }

    fn parents_of(&self, obj: Dbref) -> Result<Vec<Dbref>, WorldStateError> {
        Ok(self.record(obj)?.parents.clone())
    }

    fn children_of(&self, obj: Dbref) -> Result<Vec<Dbref>, WorldStateError> {
        Ok(self.record(obj)?.children.clone())
    }

    fn flags_of(&self, obj: Dbref) -> Result<BitEnum<ObjFlag>, WorldStateError> {
        Ok(self.record(obj)?.flags)
    }

    fn set_flags_of(
        &mut self,
        obj: Dbref,
        flags: BitEnum<ObjFlag>,
    ) -> Result<(), WorldStateError> {
        self.record_mut(obj)?.flags = flags;
        Ok(())
    }

    fn class_of(&self, obj: Dbref) -> Result<PlayerClass, WorldStateError> {
        let rec = self.record(obj)?;
        let source = if rec.otype == ObjectType::Player {
            rec
        } else {
            self.record(rec.owner)?
        };
        Ok(source.class.unwrap_or(self.config.default_class))
    }

    fn pennies_of(&self, obj: Dbref) -> Result<i64, WorldStateError> {
        Ok(self.record(obj)?.pennies)
    }

    fn payfor(&mut self, who: Dbref, cost: i64) -> Result<bool, WorldStateError> {
        if !self.is_valid(who) {
            return Ok(false);
        }
        let owner = self.record(who)?.owner;
        if self.class_of(who)? == PlayerClass::Guest || self.has_pow(owner, NOTHING, Power::Money)
        {
            return Ok(true);
        }
        let rec = self.record_mut(owner)?;
        if rec.pennies >= cost {
            rec.pennies -= cost;
            return Ok(true);
        }
        Ok(false)
    }

    fn giveto(&mut self, who: Dbref, pennies: i64) -> Result<(), WorldStateError> {
        if !self.is_valid(who) {
            return Ok(());
        }
        let owner = self.record(who)?.owner;
        if self.class_of(who)? == PlayerClass::Guest || self.has_pow(owner, NOTHING, Power::Money)
        {
            return Ok(());
        }
        let rec = self.record_mut(owner)?;
        rec.pennies = rec.pennies.saturating_add(pennies).max(0);
        Ok(())
    }

    fn attribute(&self, obj: Dbref, name: &str) -> Result<Option<Attribute>, WorldStateError> {
        let rec = self.record(obj)?;
        if let Some(stored) = rec.local_attr(name) {
            return Ok(Some(self.make_attribute(obj, stored)));
        }
        let (flags, _) = self.resolve_definition(obj, name);
        if !flags.contains(AttrFlag::Inherit) {
            return Ok(None);
        }
        let mut frontier = rec.parents.clone();
        for _ in 0..MAX_PARENT_DEPTH {
            let mut next = vec![];
            for p in frontier {
                let Ok(prec) = self.record(p) else {
                    continue;
                };
                if let Some(stored) = prec.local_attr(name) {
                    return Ok(Some(self.make_attribute(obj, stored)));
                }
                next.extend(prec.parents.iter().copied());
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        Ok(None)
    }

    fn set_attribute(
        &mut self,
        obj: Dbref,
        name: &str,
        value: &str,
    ) -> Result<(), WorldStateError> {
        let stored_name = self.stored_name(obj, name);
        let rec = self.record_mut(obj)?;
        rec.attrs.retain(|a| !a.name.eq_ignore_ascii_case(name));
        if !value.is_empty() {
            rec.attrs.push(AttrValue {
                name: stored_name,
                value: value.to_string(),
            });
        }
        self.touch(obj);
        Ok(())
    }

    fn attributes_of(&self, obj: Dbref) -> Result<Vec<Attribute>, WorldStateError> {
        let rec = self.record(obj)?;
        Ok(rec
            .attrs
            .iter()
            .map(|a| self.make_attribute(obj, a))
            .collect())
    }

    fn attribute_definitions(&self, obj: Dbref) -> Result<Vec<String>, WorldStateError> {
        Ok(self
            .record(obj)?
            .attr_defs
            .iter()
            .map(|d| d.name.clone())
            .collect())
    }

    fn can_see_attribute(&self, who: Dbref, obj: Dbref, attr: &Attribute) -> bool {
        self.can_see_attr(who, obj, attr)
    }

    fn controls(&self, who: Dbref, what: Dbref, power: Power) -> bool {
        self.controls_obj(who, what, power)
    }

    fn has_power(&self, who: Dbref, power: Power) -> bool {
        self.has_pow(who, NOTHING, power)
    }

    fn match_thing(&self, who: Dbref, name: &str) -> Result<Dbref, WorldStateError> {
        self.match_name(who, name)
    }

    fn lookup_player(&self, name: &str) -> Option<Dbref> {
        self.find_player(name)
    }

    fn created_at(&self, obj: Dbref) -> Result<i64, WorldStateError> {
        Ok(self.record(obj)?.created)
    }

    fn modified_at(&self, obj: Dbref) -> Result<i64, WorldStateError> {
        Ok(self.record(obj)?.modified)
    }

    fn object_bytes(&self, obj: Dbref) -> Result<usize, WorldStateError> {
        Ok(self.record(obj)?.bytes())
    }

    fn connect_player(&self, name: &str, password: &str) -> Option<Dbref> {
        let player = self.find_player(name)?;
        let stored = self.record(player).ok()?.password.as_ref()?;
        verify_password(stored, password).then_some(player)
    }

    fn create_player(&mut self, name: &str, password: &str) -> Result<Dbref, WorldStateError> {
        let name = name.trim();
        let bad_name = name.is_empty()
            || name.contains(char::is_whitespace)
            || name.starts_with(['#', '*'])
            || name.contains([';', '=', ','])
            || name.eq_ignore_ascii_case("me")
            || name.eq_ignore_ascii_case("here");
        if bad_name {
            return Err(WorldStateError::InvalidName(name.to_string()));
        }
        if self.find_player(name).is_some() {
            return Err(WorldStateError::DuplicatePlayerName(name.to_string()));
        }
        let start = self.config.player_start;
        let player = self.create_object(name, ObjectType::Player, NOTHING, start);
        let hashed = hash_password(password)?;
        let class = self.config.default_class;
        let credits = self.config.initial_credits;
        let rec = self.record_mut(player)?;
        rec.class = Some(class);
        rec.pennies = credits;
        rec.link = start;
        rec.password = Some(hashed);
        info!(player = %player, name, "Created player");
        Ok(player)
    }

    fn make_guest(&mut self, prefix: &str) -> Result<Dbref, WorldStateError> {
        let name = (1..)
            .map(|i| format!("{prefix}{i}"))
            .find(|n| self.find_player(n).is_none())
            .ok_or_else(|| WorldStateError::InvalidName(prefix.to_string()))?;
        let start = self.config.player_start;
        let guest = self.create_object(&name, ObjectType::Player, NOTHING, start);
        let credits = self.config.initial_credits;
        let rec = self.record_mut(guest)?;
        rec.class = Some(PlayerClass::Guest);
        rec.pennies = credits;
        rec.link = start;
        debug!(guest = %guest, name, "Made guest");
        Ok(guest)
    }

    fn destroy_guest(&mut self, guest: Dbref) -> Result<(), WorldStateError> {
        let rec = self.record(guest)?;
        if rec.class != Some(PlayerClass::Guest) {
            return Err(WorldStateError::ObjectPermissionDenied);
        }
        let location = rec.location;
        let contents = rec.contents.clone();
        let key = rec.name.to_ascii_lowercase();
        self.players.remove(&key);
        if let Ok(loc) = self.record_mut(location) {
            loc.contents.retain(|o| *o != guest);
        }
        // Whatever the guest carried goes back to the start room.
        let start = self.config.player_start;
        for obj in contents {
            self.move_object(obj, start)?;
        }
        if let Some(slot) = usize::try_from(guest.0)
            .ok()
            .and_then(|i| self.objects.get_mut(i))
        {
            *slot = None;
        }
        debug!(guest = %guest, "Destroyed guest");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn world() -> (MemoryDb, Dbref, Dbref) {
        let mut db = MemoryDb::minimal(DatabaseConfig::default(), "rootpw").unwrap();
        let alice = db.create_player("Alice", "pw").unwrap();
        let root = db.config().root;
        (db, root, alice)
    }

    #[test]
    fn payfor_and_giveto() {
        let (mut db, _, alice) = world();
        db.set_pennies(alice, 150).unwrap();
        assert!(db.payfor(alice, 100).unwrap());
        assert_eq!(db.pennies_of(alice).unwrap(), 50);
        assert!(!db.payfor(alice, 100).unwrap());
        assert_eq!(db.pennies_of(alice).unwrap(), 50);
        db.giveto(alice, 100).unwrap();
        assert_eq!(db.pennies_of(alice).unwrap(), 150);
    }

    #[test]
    fn guests_neither_pay_nor_collect() {
        let (mut db, _, _) = world();
        let guest = db.make_guest("Guest").unwrap();
        let before = db.pennies_of(guest).unwrap();
        assert!(db.payfor(guest, 100).unwrap());
        db.giveto(guest, 100).unwrap();
        assert_eq!(db.pennies_of(guest).unwrap(), before);
    }

    #[test]
    fn objects_pay_from_owner() {
        let (mut db, _, alice) = world();
        let ball = db.create_object("ball", ObjectType::Thing, alice, alice);
        db.set_pennies(alice, 100).unwrap();
        assert!(db.payfor(ball, 100).unwrap());
        assert_eq!(db.pennies_of(alice).unwrap(), 0);
        assert_eq!(db.pennies_of(ball).unwrap(), 0);
    }

    #[test]
    fn root_controls_everything_but_nobody_controls_root() {
        let (db, root, alice) = world();
        assert!(db.controls(root, alice, Power::Modify));
        assert!(!db.controls(alice, root, Power::Modify));
        assert!(db.controls(alice, alice, Power::Modify));
    }

    #[test]
    fn inherited_attributes() {
        let (mut db, _, alice) = world();
        let parent = db.create_object("parent", ObjectType::Thing, alice, alice);
        let child = db.create_object("child", ObjectType::Thing, alice, alice);
        db.add_parent(child, parent).unwrap();
        db.set_attribute(parent, "Desc", "A thing.").unwrap();
        db.set_attribute(parent, "Secret", "hidden").unwrap();
        let desc = db.attribute(child, "desc").unwrap().unwrap();
        assert_eq!(desc.value, "A thing.");
        assert_eq!(desc.name, "Desc");
        assert!(db.attribute(child, "Secret").unwrap().is_none());
    }

    #[test]
    fn user_function_definitions() {
        let (mut db, _, alice) = world();
        let thing = db.create_object("thing", ObjectType::Thing, alice, alice);
        db.define_attribute(thing, "double", BitEnum::new_with(AttrFlag::Function))
            .unwrap();
        db.set_attribute(thing, "DOUBLE", "[mul(%0,2)]").unwrap();
        let attr = db.attribute(thing, "double").unwrap().unwrap();
        assert!(attr.has(AttrFlag::Function));
        assert_eq!(attr.defined_on, thing);
        assert_eq!(attr.name, "double");
    }

    #[test]
    fn connect_and_guests() {
        let (mut db, _, alice) = world();
        assert_eq!(db.connect_player("alice", "pw"), Some(alice));
        assert_eq!(db.connect_player("alice", "nope"), None);
        assert!(matches!(
            db.create_player("Alice", "x"),
            Err(WorldStateError::DuplicatePlayerName(_))
        ));
        let g = db.make_guest("Guest").unwrap();
        assert_eq!(db.name_of(g).unwrap(), "Guest1");
        assert_eq!(db.class_of(g).unwrap(), PlayerClass::Guest);
        db.destroy_guest(g).unwrap();
        assert!(!db.valid(g));
        assert!(db.destroy_guest(alice).is_err());
    }
}
