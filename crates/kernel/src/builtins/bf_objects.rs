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

//! Functions that inspect objects: where they are, what they hold, who owns and controls
//! them, and their attributes.

use demuse_common::model::{AttrFlag, ObjFlag, ObjectType, Power, WorldState, unparse_flags};
use demuse_common::{Dbref, NOTHING};
use strum::IntoEnumIterator;

use crate::builtins::Arity::{Fixed, Variable};
use crate::builtins::{BfCallState, Builtin, dbref_list};
use crate::errors::EvalError;
use crate::eval::text::{atol, bool_str};
use crate::zones::{is_in_zone, zone_first, zones};

/// How deep `is_a()` follows parents.
const MAX_PARENT_DEPTH: usize = 20;

/// `lattr()` gives up a little earlier than the other lists.
const LATTR_LIMIT: usize = 960;

/// Display names of attribute flags, in the order `attropts()` lists them.
const ATTR_OPTION_NAMES: &[(AttrFlag, &str)] = &[
    (AttrFlag::Wizard, "Wizard"),
    (AttrFlag::Unimportant, "Unsaved"),
    (AttrFlag::Osee, "Osee"),
    (AttrFlag::Inherit, "Inherit"),
    (AttrFlag::Dark, "Dark"),
    (AttrFlag::Date, "Date"),
    (AttrFlag::Lock, "Lock"),
    (AttrFlag::Function, "Function"),
    (AttrFlag::ShowDbref, "Dbref"),
    (AttrFlag::NoMemory, "Nomem"),
    (AttrFlag::Haven, "Haven"),
];

/// Is `thing` `parent`, or descended from it?
pub(crate) fn is_a(world: &dyn WorldState, thing: Dbref, parent: Dbref) -> bool {
    let mut frontier = vec![thing];
    for _ in 0..=MAX_PARENT_DEPTH {
        if frontier.contains(&parent) {
            return true;
        }
        frontier = frontier
            .iter()
            .flat_map(|o| world.parents_of(*o).unwrap_or_default())
            .collect();
        if frontier.is_empty() {
            return false;
        }
    }
    // Past the depth limit everything counts as related.
    true
}

/// Joins names (or anything else) with spaces, cut short with ` #-1` past `limit`.
fn capped_list(items: impl IntoIterator<Item = String>, limit: usize) -> String {
    let mut out = String::new();
    for item in items {
        let extra = usize::from(!out.is_empty()) + item.len();
        if !out.is_empty() && out.len() + extra > limit {
            out.push_str(" #-1");
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&item);
    }
    out
}

fn dbref_text(obj: Dbref) -> String {
    obj.to_string()
}

impl BfCallState<'_, '_> {
    fn world(&self) -> &dyn WorldState {
        &*self.exec.world
    }

    /// Exits of `obj`'s list from `from` on, skipping dark ones the caller doesn't control.
    fn visible_exit(&self, exits: &[Dbref], from: usize) -> Dbref {
        exits
            .iter()
            .skip(from)
            .copied()
            .find(|e| {
                let dark = self
                    .world()
                    .flags_of(*e)
                    .is_ok_and(|f| f.contains(ObjFlag::Dark));
                !dark || self.controls(*e, Power::Functions)
            })
            .unwrap_or(NOTHING)
    }

    /// The object after `obj` in its location's contents or exits.
    fn next_sibling(&self, obj: Dbref) -> Dbref {
        let location = self.exec.location(obj);
        if self.exec.is_type(obj, ObjectType::Exit) {
            let exits = self.world().exits_of(location).unwrap_or_default();
            return match exits.iter().position(|e| *e == obj) {
                Some(i) => self.visible_exit(&exits, i + 1),
                None => NOTHING,
            };
        }
        let contents = self.world().contents_of(location).unwrap_or_default();
        contents
            .iter()
            .position(|o| *o == obj)
            .and_then(|i| contents.get(i + 1))
            .copied()
            .unwrap_or(NOTHING)
    }

    /// May the caller list the contents or exits of `it`?
    fn can_look_inside(&self, it: Dbref) -> bool {
        self.controls(it, Power::Functions)
            || self.exec.location(self.privs) == it
            || it == self.doer
    }

    /// May the caller walk the list that `it` is part of?
    fn can_walk_siblings_of(&self, it: Dbref) -> bool {
        let location = self.exec.location(it);
        self.controls(location, Power::Functions)
            || location == self.doer
            || location == self.exec.location(self.privs)
    }

    fn all_objects(&self) -> impl Iterator<Item = Dbref> + '_ {
        (0..self.world().db_top())
            .map(Dbref)
            .filter(|o| self.world().valid(*o))
    }
}

fn bf_num(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    Ok(dbref_text(bf_args.match_thing(0)))
}

/// Usage: `con(object)`
/// The first thing inside `object`.
fn bf_con(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let it = bf_args.match_thing(0);
    if it == NOTHING || !bf_args.can_look_inside(it) {
        return Err(EvalError::Failed);
    }
    let first = bf_args.world().contents_of(it)?.first().copied();
    Ok(dbref_text(first.unwrap_or(NOTHING)))
}

/// Usage: `exit(room)`
/// The first exit out of `room` the caller can see.
fn bf_exit(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let it = bf_args.match_thing(0);
    if it == NOTHING || !bf_args.can_look_inside(it) {
        return Err(EvalError::Failed);
    }
    let exits = bf_args.world().exits_of(it)?;
    Ok(dbref_text(bf_args.visible_exit(&exits, 0)))
}

/// Usage: `next(object)`
/// The object after `object` in the contents (or exits) list it is part of.
fn bf_next(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let it = bf_args.match_thing(0);
    if it == NOTHING {
        return Err(EvalError::Failed);
    }
    if !bf_args.exec.is_type(it, ObjectType::Exit) && !bf_args.can_walk_siblings_of(it) {
        return Err(EvalError::Failed);
    }
    Ok(dbref_text(bf_args.next_sibling(it)))
}

/// Usage: `objlist(object)`
/// `object` and everything after it in its list.
fn bf_objlist(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let mut it = bf_args.match_thing(0);
    if it == NOTHING {
        return Ok(String::new());
    }
    if !bf_args.exec.is_type(it, ObjectType::Exit)
        && !bf_args.can_walk_siblings_of(it)
        && bf_args.exec.location(it) != bf_args.privs
    {
        return Ok(String::new());
    }
    let mut list = vec![];
    while it != NOTHING && !list.contains(&it) {
        list.push(it);
        it = bf_args.next_sibling(it);
    }
    Ok(dbref_list(list))
}

fn bf_loc(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let it = bf_args.match_thing(0);
    if it == NOTHING {
        return Err(EvalError::Failed);
    }
    let location = bf_args.exec.location(it);
    let world = bf_args.world();
    let visible_player = bf_args.exec.is_type(it, ObjectType::Player)
        && !world.flags_of(it).is_ok_and(|f| f.contains(ObjFlag::Dark));
    let allowed = bf_args.controls(it, Power::Functions)
        || bf_args.controls(location, Power::Functions)
        || zones(world, it)
            .into_iter()
            .any(|z| bf_args.controls(z, Power::Functions))
        || world.has_power(bf_args.privs, Power::Functions)
        || it == bf_args.doer
        || visible_player;
    if !allowed {
        return Err(EvalError::Failed);
    }
    Ok(dbref_text(location))
}

/// Usage: `link(object)`
/// Home of a player or thing, destination of an exit, drop-to of a room.
fn bf_link(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let it = bf_args.match_thing(0);
    if it == NOTHING {
        return Err(EvalError::Failed);
    }
    let location = bf_args.exec.location(it);
    if !(bf_args.controls(it, Power::Functions)
        || bf_args.controls(location, Power::Functions)
        || it == bf_args.doer)
    {
        return Err(EvalError::Failed);
    }
    Ok(dbref_text(bf_args.world().link_of(it)?))
}

/// Usage: `linkup(object)`
/// Everything linked to `object`.
fn bf_linkup(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let it = bf_args.match_thing(0);
    if it == NOTHING {
        return Err(EvalError::Failed);
    }
    let location = bf_args.exec.location(it);
    if !(bf_args.controls(it, Power::Functions)
        || bf_args.controls(location, Power::Functions)
        || it == bf_args.privs)
    {
        return Err(EvalError::Failed);
    }
    let world = bf_args.world();
    Ok(dbref_list(
        bf_args
            .all_objects()
            .filter(|o| world.link_of(*o).is_ok_and(|l| l == it)),
    ))
}

fn bf_owner(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let it = bf_args.match_thing(0);
    Ok(dbref_text(bf_args.exec.owner(it)))
}

fn bf_name(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let it = bf_args.match_thing(0);
    Ok(bf_args.exec.name(it))
}

fn bf_cname(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let it = bf_args.match_thing(0);
    Ok(bf_args.world().cname_of(it).unwrap_or_default())
}

/// Usage: `class(object)`
/// A player's class; for anything else, its type.
fn bf_class(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let it = bf_args.match_thing(0);
    if it == NOTHING {
        return Ok(String::new());
    }
    let world = bf_args.world();
    match world.object_type(it)? {
        ObjectType::Player => Ok(world.class_of(it)?.to_string()),
        otype => Ok(otype.to_string()),
    }
}

fn bf_type(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let it = bf_args.match_thing(0);
    if it == NOTHING {
        return Err(EvalError::Failed);
    }
    Ok(bf_args.world().object_type(it)?.to_string())
}

/// Usage: `is_a(thing, parent)`
fn bf_is_a(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let thing = bf_args.match_thing(0);
    let parent = bf_args.match_thing(1);
    if thing == NOTHING || parent == NOTHING {
        return Err(EvalError::Failed);
    }
    Ok(bool_str(is_a(bf_args.world(), thing, parent)))
}

/// Usage: `has(holder, object)`
fn bf_has(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let holder = bf_args.match_thing(0);
    let obj = bf_args.match_thing(1);
    if holder == NOTHING || obj == NOTHING {
        return Err(EvalError::Failed);
    }
    Ok(bool_str(bf_args.world().contents_of(holder)?.contains(&obj)))
}

/// Usage: `has_a(holder, parent)`
/// Is anything `holder` carries descended from `parent`?
fn bf_has_a(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let holder = bf_args.match_thing(0);
    let parent = bf_args.match_thing(1);
    if holder == NOTHING || parent == NOTHING {
        return Err(EvalError::Failed);
    }
    let world = bf_args.world();
    let found = world
        .contents_of(holder)?
        .into_iter()
        .any(|o| is_a(world, o, parent));
    Ok(bool_str(found))
}

/// Usage: `flags(object)`
/// The flag letters of `object`, or nothing if it can't be found. Never complains.
fn bf_flags(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let it = bf_args.match_quietly(0);
    if it == NOTHING {
        return Ok(String::new());
    }
    let world = bf_args.world();
    Ok(unparse_flags(world.object_type(it)?, world.flags_of(it)?))
}

fn bf_modtime(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let it = bf_args.match_thing(0);
    if it == NOTHING {
        return Err(EvalError::Failed);
    }
    Ok(bf_args.world().modified_at(it)?.to_string())
}

fn bf_ctime(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let it = bf_args.match_thing(0);
    if it == NOTHING {
        return Err(EvalError::Failed);
    }
    Ok(bf_args.world().created_at(it)?.to_string())
}

/// Usage: `credits(player)`
fn bf_credits(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let who = bf_args.match_thing(0);
    if who == NOTHING {
        return Err(EvalError::Failed);
    }
    if !bf_args.world().has_power(bf_args.privs, Power::Functions)
        && !bf_args.controls(who, Power::Functions)
    {
        return Err(EvalError::Failed);
    }
    Ok(bf_args.world().pennies_of(who)?.to_string())
}

/// Resolves a player whose quota the caller may see.
fn quota_subject(bf_args: &mut BfCallState<'_, '_>) -> Result<Dbref, EvalError> {
    let who = bf_args.match_thing(0);
    if who == NOTHING || !bf_args.controls(who, Power::Functions) {
        return Err(EvalError::Failed);
    }
    Ok(who)
}

fn bf_quota(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let who = quota_subject(bf_args)?;
    Ok(bf_args.exec.attr_text(who, "Quota"))
}

fn bf_quota_left(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let who = quota_subject(bf_args)?;
    Ok(atol(&bf_args.exec.attr_text(who, "Rquota")).to_string())
}

/// The objects related to `it` that the caller may know about.
fn related(bf_args: &BfCallState<'_, '_>, it: Dbref, relatives: Vec<Dbref>) -> Vec<Dbref> {
    let sees = |o: Dbref| {
        bf_args.controls(o, Power::Examine) || bf_args.controls(o, Power::Functions)
    };
    let sees_it = sees(it);
    relatives
        .into_iter()
        .filter(|r| sees_it || sees(*r))
        .collect()
}

fn bf_parents(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let it = bf_args.match_thing(0);
    if it == NOTHING {
        return Err(EvalError::Failed);
    }
    let parents = bf_args.world().parents_of(it)?;
    let visible = related(bf_args, it, parents);
    Ok(capped_list(visible.into_iter().map(dbref_text), usize::MAX))
}

fn bf_children(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let it = bf_args.match_thing(0);
    if it == NOTHING {
        return Err(EvalError::Failed);
    }
    let children = bf_args.world().children_of(it)?;
    Ok(dbref_list(related(bf_args, it, children)))
}

/// Usage: `zone(object)`
/// The zone set directly on `object`.
fn bf_zone(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let it = bf_args.match_thing(0);
    if it == NOTHING {
        return Err(EvalError::Failed);
    }
    Ok(dbref_text(bf_args.world().zone_of(it)?))
}

/// Usage: `getzone(object)`
/// The innermost zone `object` is in, found through its locations.
fn bf_getzone(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let it = bf_args.match_thing(0);
    if it == NOTHING {
        return Err(EvalError::Failed);
    }
    Ok(dbref_text(zone_first(bf_args.world(), it)))
}

fn bf_lzone(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let it = bf_args.match_thing(0);
    if it == NOTHING {
        return Ok(String::new());
    }
    Ok(dbref_list(zones(bf_args.world(), it)))
}

/// Usage: `inzone(zone)`
/// Every room in `zone`.
fn bf_inzone(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let zone = bf_args.match_thing(0);
    if !bf_args.controls(zone, Power::Examine) {
        return Err(EvalError::Failed);
    }
    let world = bf_args.world();
    Ok(dbref_list(bf_args.all_objects().filter(|o| {
        bf_args.exec.is_type(*o, ObjectType::Room) && is_in_zone(world, *o, zone)
    })))
}

/// Usage: `zwho(zone)`
/// Every player in `zone`.
fn bf_zwho(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let zone = bf_args.match_thing(0);
    if !bf_args.controls(zone, Power::Functions) {
        return Err(EvalError::Failed);
    }
    let world = bf_args.world();
    Ok(dbref_list(bf_args.all_objects().filter(|o| {
        bf_args.exec.is_type(*o, ObjectType::Player) && is_in_zone(world, *o, zone)
    })))
}

/// Usage: `entrances(object)`
/// The exits leading to `object`.
fn bf_entrances(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let it = bf_args.match_thing(0);
    if it == NOTHING {
        return Err(EvalError::Failed);
    }
    let control_here = bf_args.controls(it, Power::Examine);
    let world = bf_args.world();
    let entrances: Vec<Dbref> = bf_args
        .all_objects()
        .filter(|o| {
            bf_args.exec.is_type(*o, ObjectType::Exit)
                && world.link_of(*o).is_ok_and(|l| l == it)
                && (control_here
                    || bf_args.controls(*o, Power::Functions)
                    || bf_args.controls(*o, Power::Examine))
        })
        .collect();
    Ok(capped_list(entrances.into_iter().map(dbref_text), usize::MAX))
}

/// Usage: `controls(who, what, power)`
/// Does `who` control `what` with the named power?
fn bf_controls(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let who = bf_args.match_thing(0);
    let what = bf_args.match_thing(1);
    let power = Power::iter().find(|p| p.to_string().eq_ignore_ascii_case(bf_args.arg(2)));
    let Some(power) = power else {
        return Err(EvalError::Failed);
    };
    if who == NOTHING || what == NOTHING {
        return Err(EvalError::Failed);
    }
    Ok(bool_str(bf_args.world().controls(who, what, power)))
}

/// Usage: `rmatch(who, name)`
/// What `name` means from `who`'s point of view.
fn bf_rmatch(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let who = bf_args.match_thing(0);
    if !bf_args.controls(who, Power::Examine) && who != bf_args.doer {
        let privs = bf_args.privs;
        bf_args.exec.notify(privs, "Permission denied.");
        return Err(EvalError::Failed);
    }
    Ok(dbref_text(bf_args.world().match_thing(who, bf_args.arg(1))?))
}

/// Usage: `lattr(object)`
/// The names of the attributes set on `object` that the caller can see.
fn bf_lattr(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let it = bf_args.match_thing(0);
    if it == NOTHING {
        return Ok(String::new());
    }
    let world = bf_args.world();
    let names = world
        .attributes_of(it)?
        .into_iter()
        .filter(|a| world.can_see_attribute(bf_args.privs, it, a))
        .map(|a| a.name);
    Ok(capped_list(names, LATTR_LIMIT))
}

/// Usage: `lattrdef(object)`
/// The attributes `object` defines for itself and its children.
fn bf_lattrdef(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let it = bf_args.match_thing(0);
    if it == NOTHING {
        return Ok(String::new());
    }
    let world = bf_args.world();
    let see_ok = world.flags_of(it)?.contains(ObjFlag::SeeOk);
    if !see_ok && !bf_args.controls(it, Power::Examine) {
        return Ok(String::new());
    }
    Ok(capped_list(world.attribute_definitions(it)?, 990))
}

/// Usage: `attropts(object/attribute)` or `attropts(object, attribute)`
/// The option flags of an attribute, by name.
fn bf_attropts(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let (object, attr_name) = match bf_args.nargs() {
        1 => match bf_args.arg(0).split_once('/') {
            Some((o, a)) => (o.to_string(), a.to_string()),
            None => return Err(EvalError::NoMatch),
        },
        2 => (bf_args.arg(0).to_string(), bf_args.arg(1).to_string()),
        _ => return Err(EvalError::WrongNumberOfArgs),
    };
    let thing = bf_args.match_name(&object);
    if thing == NOTHING {
        return Err(EvalError::NoMatch);
    }
    let world = bf_args.world();
    let Some(attr) = world.attribute(thing, &attr_name)? else {
        return Err(EvalError::NoMatch);
    };
    if !world.can_see_attribute(bf_args.privs, thing, &attr) {
        return Err(EvalError::PermissionDenied);
    }
    let names: Vec<&str> = ATTR_OPTION_NAMES
        .iter()
        .filter(|(flag, _)| attr.has(*flag))
        .map(|(_, name)| *name)
        .collect();
    Ok(names.join(" "))
}

/// Usage: `objmem(object)`
/// Approximate bytes used by `object`.
fn bf_objmem(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let it = bf_args.match_thing(0);
    if it == NOTHING || !bf_args.controls(it, Power::Stats) {
        return Err(EvalError::Failed);
    }
    Ok(bf_args.world().object_bytes(it)?.to_string())
}

/// Usage: `playmem(player)`
/// Approximate bytes used by everything `player` owns.
fn bf_playmem(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let it = bf_args.match_thing(0);
    let world = bf_args.world();
    if it == NOTHING
        || !bf_args.controls(it, Power::Stats)
        || !world.has_power(bf_args.privs, Power::Stats)
    {
        return Err(EvalError::Failed);
    }
    let mut total = 0;
    for obj in world.owned_by(it)? {
        total += world.object_bytes(obj)?;
    }
    Ok(total.to_string())
}

pub(crate) fn register_bf_objects(builtins: &mut Vec<Builtin>) {
    builtins.extend([
        Builtin::new("num", Fixed(1), bf_num),
        Builtin::new("con", Fixed(1), bf_con),
        Builtin::new("exit", Fixed(1), bf_exit),
        Builtin::new("next", Fixed(1), bf_next),
        Builtin::new("objlist", Fixed(1), bf_objlist),
        Builtin::new("loc", Fixed(1), bf_loc),
        Builtin::new("link", Fixed(1), bf_link),
        Builtin::new("linkup", Fixed(1), bf_linkup),
        Builtin::new("owner", Fixed(1), bf_owner),
        Builtin::new("name", Fixed(1), bf_name),
        Builtin::new("cname", Fixed(1), bf_cname),
        Builtin::new("class", Fixed(1), bf_class),
        Builtin::new("type", Fixed(1), bf_type),
        Builtin::new("is_a", Fixed(2), bf_is_a),
        Builtin::new("has", Fixed(2), bf_has),
        Builtin::new("has_a", Fixed(2), bf_has_a),
        Builtin::new("flags", Fixed(1), bf_flags),
        Builtin::new("modtime", Fixed(1), bf_modtime),
        Builtin::new("ctime", Fixed(1), bf_ctime),
        Builtin::new("credits", Fixed(1), bf_credits),
        Builtin::new("quota", Fixed(1), bf_quota),
        Builtin::new("quota_left", Fixed(1), bf_quota_left),
        Builtin::new("parents", Fixed(1), bf_parents),
        Builtin::new("children", Fixed(1), bf_children),
        Builtin::new("zone", Fixed(1), bf_zone),
        Builtin::new("getzone", Fixed(1), bf_getzone),
        Builtin::new("lzone", Fixed(1), bf_lzone),
        Builtin::new("inzone", Fixed(1), bf_inzone),
        Builtin::new("zwho", Fixed(1), bf_zwho),
        Builtin::new("entrances", Fixed(1), bf_entrances),
        Builtin::new("controls", Fixed(3), bf_controls),
        Builtin::new("rmatch", Fixed(2), bf_rmatch),
        Builtin::new("lattr", Fixed(1), bf_lattr),
        Builtin::new("lattrdef", Fixed(1), bf_lattrdef),
        Builtin::new("attropts", Variable, bf_attropts),
        Builtin::new("objmem", Fixed(1), bf_objmem),
        Builtin::new("playmem", Fixed(1), bf_playmem),
    ]);
}
